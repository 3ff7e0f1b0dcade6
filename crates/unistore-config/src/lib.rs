//! Configuration for unistore stores
//!
//! This crate provides:
//! - Config file discovery (CWD first, then home directory)
//! - Store configuration (StoreConfig)
//! - Config errors (ConfigError)

pub mod config_file;
pub mod error;
pub mod store_config;

pub use config_file::{load_config_file, CONFIG_FILE};
pub use error::ConfigError;
pub use store_config::StoreConfig;
