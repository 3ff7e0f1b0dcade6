//! Error types for the store engine

use thiserror::Error;
use unistore_config::ConfigError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store (or a substore's parent) went away before the dispatch
    /// completed, or a middleware dropped the action
    #[error("store released before the dispatch completed")]
    Released,

    #[error("no tokio runtime available; build the store inside a runtime or pass a handle")]
    NoRuntime,

    #[error("failed to load store configuration")]
    Config(#[from] ConfigError),
}
