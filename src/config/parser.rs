use crate::config::types::Config;
use crate::ConfigError;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let config: Config = toml::from_str(&content)?;

    validate(&config)?;

    Ok(config)
}

/// Validates a configuration, returning the first problem found
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "server.data-dir must not be empty".to_string(),
        ));
    }

    if config.server.seed_file.is_empty() {
        return Err(ConfigError::Validation(
            "server.seed-file must not be empty".to_string(),
        ));
    }

    if config.crawler.grace_period_ms == 0 || config.crawler.grace_period_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "crawler.grace-period-ms must be between 1 and 60000, got {}",
            config.crawler.grace_period_ms
        )));
    }

    if config.crawler.fetch_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "crawler.fetch-timeout-secs must be greater than 0".to_string(),
        ));
    }

    if config.crawler.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "crawler.user-agent must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[server]
port = 5050
data-dir = "/tmp/crawld"
seed-file = "./seeds.txt"

[crawler]
grace-period-ms = 100
fetch-timeout-secs = 10
user-agent = "test-crawler/1.0"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.server.port, 5050);
        assert_eq!(config.server.data_dir, "/tmp/crawld");
        assert_eq!(config.crawler.grace_period_ms, 100);
        assert_eq!(config.crawler.user_agent, "test-crawler/1.0");
    }

    #[test]
    fn test_defaults_apply_for_empty_file() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.server.port, 4949);
        assert_eq!(config.server.seed_file, "./seedSites.txt");
        assert_eq!(config.crawler.grace_period_ms, 200);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_grace_period_rejected() {
        let config_content = r#"
[crawler]
grace-period-ms = 0
"#;
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_empty_data_dir_rejected() {
        let config_content = r#"
[server]
data-dir = ""
"#;
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }
}
