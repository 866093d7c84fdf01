pub mod app_config;
pub mod config;
pub mod orders;
pub mod stores;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use orders::{
    generate_idempotency_key, generate_order_code, generate_product_id, is_valid_order_code,
    LineItem, Order, ShippingType, DEFAULT_DELIVERY_COST,
};
pub use stores::{load_store_directory, StoreDirectory, StoreEntry};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read stores file {path}: {source}")]
    StoresFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse stores file: {0}")]
    StoresFileParse(#[source] serde_yaml::Error),

    #[error("stores file validation failed: {0}")]
    Validation(String),
}
