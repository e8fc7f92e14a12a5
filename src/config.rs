use crate::models::AppConfig;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Arc<AppConfig>, String> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    let config: AppConfig = serde_yaml::from_str(&contents)
        .map_err(|e| format!("Failed to parse YAML config: {}", e))?;

    config.validate()?;

    info!(
        "Configuration loaded: {} digit codes, {}s validity, {} tries",
        config.otp.code_length, config.otp.validity_secs, config.otp.max_tries
    );

    Ok(Arc::new(config))
}

/// Load configuration with fallback options.
/// Tries ATS_AUTH_CONFIG, then conventional file locations, then defaults.
pub fn load_config_with_fallback() -> Arc<AppConfig> {
    if let Ok(config_path) = std::env::var("ATS_AUTH_CONFIG") {
        match load_config(&config_path) {
            Ok(config) => return config,
            Err(e) => warn!(
                "Failed to load config from ATS_AUTH_CONFIG ({}): {}",
                config_path, e
            ),
        }
    }

    let paths = ["config.yaml", "config.yml", "./config.yaml", "./config.yml"];

    for path in paths {
        if Path::new(path).exists() {
            match load_config(path) {
                Ok(config) => return config,
                Err(e) => warn!("Failed to load config from '{}': {}", path, e),
            }
        }
    }

    info!("No configuration file found, using defaults");
    Arc::new(AppConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoreConfig;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
otp:
  code_length: 6
  validity_secs: 600
  confirm_window_secs: 180
  max_tries: 3
store:
  type: redis
  url: "redis://localhost:6379"
dispatch:
  queue_capacity: 128
  sender_name: "Mutaengine Careers"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.otp.max_tries, 3);
        assert_eq!(config.dispatch.queue_capacity, 128);
        assert!(matches!(config.store, StoreConfig::Redis { .. }));
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.otp.code_length, 6);
        assert!(matches!(config.store, StoreConfig::Memory));
    }

    #[test]
    fn test_invalid_config_fails_validation() {
        let yaml = r#"
otp:
  max_tries: 0
"#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("max_tries"));
    }
}
