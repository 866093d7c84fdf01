use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const BUILTIN_STORES: &[(&str, &str)] = &[
    ("hawranj", "hawranj-store-id"),
    ("sara", "sara-store-id"),
    ("techno", "techno-store-id"),
    ("digital", "digital-store-id"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct StoresFile {
    pub stores: Vec<StoreEntry>,
}

/// Store name → store id lookup consulted when assigning line items.
///
/// Names are matched case-insensitively after trimming.
#[derive(Debug, Clone)]
pub struct StoreDirectory {
    by_name: HashMap<String, String>,
}

impl Default for StoreDirectory {
    fn default() -> Self {
        Self::from_entries(BUILTIN_STORES.iter().map(|(name, id)| StoreEntry {
            name: (*name).to_string(),
            id: (*id).to_string(),
        }))
    }
}

impl StoreDirectory {
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = StoreEntry>) -> Self {
        let by_name = entries
            .into_iter()
            .map(|e| (normalize_name(&e.name), e.id))
            .collect();
        Self { by_name }
    }

    #[must_use]
    pub fn store_id(&self, store_name: &str) -> Option<&str> {
        self.by_name
            .get(&normalize_name(store_name))
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Load and validate a store directory from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_store_directory(path: &Path) -> Result<StoreDirectory, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::StoresFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_store_directory(&content)
}

fn parse_store_directory(content: &str) -> Result<StoreDirectory, ConfigError> {
    let file: StoresFile = serde_yaml::from_str(content).map_err(ConfigError::StoresFileParse)?;
    validate_stores(&file)?;
    Ok(StoreDirectory::from_entries(file.stores))
}

fn validate_stores(file: &StoresFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for store in &file.stores {
        if store.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store name must be non-empty".to_string(),
            ));
        }
        if store.id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "store '{}' has an empty id",
                store.name
            )));
        }
        if !seen.insert(normalize_name(&store.name)) {
            return Err(ConfigError::Validation(format!(
                "duplicate store name: '{}'",
                store.name
            )));
        }
    }
    Ok(())
}
