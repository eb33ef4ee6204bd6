//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::DispatchConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Secret used to sign subscriber notifications.
pub const ENV_WEBHOOK_SECRET: &str = "CLIENT_WEBHOOK_SECRET";
/// Fallback notification URL.
pub const ENV_WEBHOOK_URL: &str = "CLIENT_WEBHOOK_URL";
/// Intake server bind address.
pub const ENV_BIND_ADDRESS: &str = "DISPATCH_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Validation(Vec<ValidationError>),
}

/// Load, override from the process environment, and validate a TOML file.
pub fn load_config(path: &Path) -> Result<DispatchConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: DispatchConfig = toml::from_str(&content)?;
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Like [`load_config`], but a missing path yields validated defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<DispatchConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = DispatchConfig::default();
            apply_overrides(&mut config, |key| std::env::var(key).ok());
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Apply environment overrides through `lookup`.
///
/// Empty values are ignored.
pub fn apply_overrides<F>(config: &mut DispatchConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(secret) = lookup(ENV_WEBHOOK_SECRET) {
        config.notification.secret = secret;
    }
    if let Some(url) = lookup(ENV_WEBHOOK_URL) {
        config.notification.default_url = Some(url);
    }
    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.server.bind_address = addr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_overrides_replace_configured_values() {
        let env: HashMap<&str, &str> = [
            (ENV_WEBHOOK_SECRET, "s3cret"),
            (ENV_WEBHOOK_URL, "https://hooks.example/in"),
            (ENV_BIND_ADDRESS, "127.0.0.1:9000"),
        ]
        .into_iter()
        .collect();

        let mut config = DispatchConfig::default();
        apply_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.notification.secret, "s3cret");
        assert_eq!(config.notification.default_url.as_deref(), Some("https://hooks.example/in"));
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let mut config = DispatchConfig::default();
        apply_overrides(&mut config, |k| (k == ENV_WEBHOOK_SECRET).then(|| "  ".to_string()));
        assert_eq!(config.notification.secret, "default-secret");
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let path = std::env::temp_dir().join(format!("dispatch-bad-{}.toml", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[server\nbind_address = 1").unwrap();

        let result = load_config(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let path = std::env::temp_dir().join(format!("dispatch-invalid-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[workers]\nmax_concurrent = 0\n").unwrap();

        let result = load_config(&path);
        fs::remove_file(&path).ok();
        match result {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.field == "workers.max_concurrent"));
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_config(Path::new("/nonexistent/dispatch.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
