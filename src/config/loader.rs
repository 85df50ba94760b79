//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, overlay and validate configuration from a TOML file.
///
/// The environment is taken from `environment` when given, otherwise from the
/// base file's `environment` key. Settings from `<stem>.<environment>.toml`
/// next to the base file are merged over the base settings when that file
/// exists.
pub fn load_config(path: &Path, environment: Option<&str>) -> Result<GatewayConfig, ConfigError> {
    let mut merged = read_table(path)?;

    let environment = environment
        .map(str::to_string)
        .or_else(|| merged.get("environment").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| GatewayConfig::default().environment);

    let overlay_path = overlay_path(path, &environment);
    if overlay_path.is_file() {
        let overlay = read_table(&overlay_path)?;
        merge_values(&mut merged, overlay);
        tracing::info!(
            base = %path.display(),
            overlay = %overlay_path.display(),
            environment = %environment,
            "Loaded environment settings"
        );
    } else {
        tracing::warn!(
            base = %path.display(),
            environment = %environment,
            "No environment settings found, using base configuration"
        );
    }

    let mut config: GatewayConfig = merged.try_into().map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.environment = environment;

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Defaults for the given environment, validated like a loaded file.
pub fn default_config(environment: Option<&str>) -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig::default();
    if let Some(environment) = environment {
        config.environment = environment.to_string();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn read_table(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table: toml::Table = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Value::Table(table))
}

fn overlay_path(base: &Path, environment: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("config");
    base.with_file_name(format!("{stem}.{environment}.toml"))
}

/// Tables merge key by key; any other value in `overlay` replaces the base.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base), Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn overlay_merges_nested_tables() {
        let dir = tempfile::tempdir().unwrap();
        let base = write_file(
            dir.path(),
            "config.toml",
            r#"
            web_port = 4000
            [backend]
            host = "base-host"
            port = 9000
            "#,
        );
        write_file(
            dir.path(),
            "config.production.toml",
            r#"
            [backend]
            host = "prod-host"
            "#,
        );

        let config = load_config(&base, Some("production")).unwrap();
        assert_eq!(config.web_port, 4000);
        assert_eq!(config.backend.host, "prod-host");
        assert_eq!(config.backend.port, 9000);
        assert_eq!(config.environment, "production");
    }

    #[test]
    fn environment_can_come_from_base_file() {
        let dir = tempfile::tempdir().unwrap();
        let base = write_file(dir.path(), "gateway.toml", "environment = \"staging\"\n");
        write_file(dir.path(), "gateway.staging.toml", "web_port = 5555\n");

        let config = load_config(&base, None).unwrap();
        assert_eq!(config.environment, "staging");
        assert_eq!(config.web_port, 5555);
    }

    #[test]
    fn missing_overlay_uses_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = write_file(dir.path(), "config.toml", "web_port = 4100\n");

        let config = load_config(&base, Some("test")).unwrap();
        assert_eq!(config.web_port, 4100);
        assert_eq!(config.environment, "test");
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let base = write_file(dir.path(), "config.toml", "[limits]\nmax_body_bytes = 0\n");

        match load_config(&base, None) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors[0].field, "limits.max_body_bytes");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/config.toml"), None).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
