//! Per-order idempotency keys that survive retries.
//!
//! A caller that wants exactly-once delivery for a logical order asks the
//! ledger for that order's key before each attempt; the same order code maps
//! to the same key until the entry expires.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use neomart_core::AppConfig;
use uuid::Uuid;

/// Default lifetime of a remembered key.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct LedgerEntry {
    key: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct IdempotencyLedger {
    ttl: chrono::Duration,
    entries: Mutex<HashMap<String, LedgerEntry>>,
}

impl Default for IdempotencyLedger {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl IdempotencyLedger {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Uses `NEOMART_IDEMPOTENCY_TTL_SECS` as the key lifetime.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Duration::from_secs(config.idempotency_ttl_secs))
    }

    /// Returns the key for `order_code`, minting one if none is live.
    pub fn key_for(&self, order_code: &str, now: DateTime<Utc>) -> String {
        let mut entries = self.lock();
        if let Some(entry) = entries.get(order_code) {
            if !self.is_expired(entry, now) {
                tracing::debug!(order_code, "reusing idempotency key");
                return entry.key.clone();
            }
        }
        let key = Uuid::new_v4().to_string();
        tracing::debug!(order_code, "minted idempotency key");
        entries.insert(
            order_code.to_owned(),
            LedgerEntry {
                key: key.clone(),
                created_at: now,
            },
        );
        key
    }

    /// Drops the key for `order_code`, e.g. once the order was accepted.
    pub fn forget(&self, order_code: &str) -> bool {
        self.lock().remove(order_code).is_some()
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn is_expired(&self, entry: &LedgerEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.created_at) >= self.ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, LedgerEntry>> {
        // Entries are inserted whole, so a poisoned map is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
