use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it from a
/// `HashMap` without touching process state.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("NEOMART_ENV", "development"))?;
    let log_level = or_default("NEOMART_LOG_LEVEL", "info");

    let order_intake_url = optional("NEOMART_ORDER_INTAKE_URL");
    if let Some(url) = &order_intake_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid(
                "NEOMART_ORDER_INTAKE_URL",
                format!("'{url}' is not an http(s) URL"),
            ));
        }
    }
    let api_key = optional("NEOMART_API_KEY");

    let request_timeout_secs = parse_u64("NEOMART_REQUEST_TIMEOUT_SECS", "30")?;
    if request_timeout_secs == 0 {
        return Err(invalid(
            "NEOMART_REQUEST_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let user_agent = or_default("NEOMART_USER_AGENT", "neomart/0.1 (order-intake)");

    let default_delivery_cost = or_default("NEOMART_DEFAULT_DELIVERY_COST", "5000")
        .parse::<i64>()
        .map_err(|e| invalid("NEOMART_DEFAULT_DELIVERY_COST", e.to_string()))?;
    if default_delivery_cost < 0 {
        return Err(invalid(
            "NEOMART_DEFAULT_DELIVERY_COST",
            "must not be negative".to_string(),
        ));
    }

    let stores_path = optional("NEOMART_STORES_PATH").map(PathBuf::from);
    let submit_max_retries = parse_u32("NEOMART_SUBMIT_MAX_RETRIES", "0")?;
    let submit_retry_backoff_base_ms = parse_u64("NEOMART_SUBMIT_RETRY_BACKOFF_BASE_MS", "1000")?;
    let idempotency_ttl_secs = parse_u64("NEOMART_IDEMPOTENCY_TTL_SECS", "86400")?;

    Ok(AppConfig {
        env,
        log_level,
        order_intake_url,
        api_key,
        request_timeout_secs,
        user_agent,
        default_delivery_cost,
        stores_path,
        submit_max_retries,
        submit_retry_backoff_base_ms,
        idempotency_ttl_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "development" | "dev" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" | "prod" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "NEOMART_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
