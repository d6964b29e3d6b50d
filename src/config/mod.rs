//! Configuration loading and validation
//!
//! Configuration is read from an optional TOML file; every field has a
//! default so the server runs with no file at all.

mod parser;
mod types;

pub use parser::load_config;
pub use types::{Config, CrawlerConfig, ServerConfig};
