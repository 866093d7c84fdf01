use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Order-intake function URL. Only commands that submit need it.
    pub order_intake_url: Option<String>,
    /// Backend function key, sent as `apikey` and bearer token.
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub default_delivery_cost: i64,
    /// Optional YAML file replacing the built-in store table.
    pub stores_path: Option<PathBuf>,
    pub submit_max_retries: u32,
    pub submit_retry_backoff_base_ms: u64,
    pub idempotency_ttl_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("order_intake_url", &self.order_intake_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("default_delivery_cost", &self.default_delivery_cost)
            .field("stores_path", &self.stores_path)
            .field("submit_max_retries", &self.submit_max_retries)
            .field(
                "submit_retry_backoff_base_ms",
                &self.submit_retry_backoff_base_ms,
            )
            .field("idempotency_ttl_secs", &self.idempotency_ttl_secs)
            .finish()
    }
}
