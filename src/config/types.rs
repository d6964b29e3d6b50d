use serde::Deserialize;

/// Main configuration structure for crawld
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// TCP port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding one SQLite file per logical database
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: String,

    /// Seed URL list read by the init command, one URL per line
    #[serde(rename = "seed-file", default = "default_seed_file")]
    pub seed_file: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Grace window given to in-flight workers during stop/pause (milliseconds)
    #[serde(rename = "grace-period-ms", default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Per-request timeout for page fetches (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// User-Agent header sent with every fetch
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

fn default_port() -> u16 {
    4949
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_seed_file() -> String {
    "./seedSites.txt".to_string()
}

fn default_grace_period_ms() -> u64 {
    200
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("crawld/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            data_dir: default_data_dir(),
            seed_file: default_seed_file(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}
