//! Crawld: a multi-client crawl coordination server
//!
//! This crate implements a line-oriented TCP command server that drives a
//! breadth-first web crawler. Each connected client holds an interactive
//! session against a shared SQLite-backed store and can initialize schema,
//! start and stop crawls, pause and resume them across restarts, and switch
//! between logical databases.

pub mod command;
pub mod config;
pub mod fetch;
pub mod server;
pub mod session;
pub mod store;

use thiserror::Error;

/// Main error type for crawld operations
#[derive(Debug, Error)]
pub enum CrawldError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("unsupported command")]
    UnknownCommand,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for crawld operations
pub type Result<T> = std::result::Result<T, CrawldError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{HttpLinkProvider, LinkProvider};
pub use server::Server;
pub use store::{Store, DEFAULT_DATABASE, MAX_SITE_LENGTH};
