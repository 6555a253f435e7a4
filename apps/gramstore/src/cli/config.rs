//! # CLI Configuration
//!
//! Optional TOML file naming the database and the model settings:
//!
//! ```toml
//! database = "corpus.redb"
//!
//! [model]
//! orders = [3, 2, 1]
//! save_threshold = 300000
//! ```
//!
//! Command-line flags override file values.

use gramstore_core::{GramError, ModelConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Database used when neither the config file nor `--database` names one.
pub const DEFAULT_DATABASE: &str = "gramstore.redb";

/// Settings read from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: PathBuf,
    pub model: ModelConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            model: ModelConfig::default(),
        }
    }
}

/// Parse configuration text. Missing keys take their defaults.
pub fn parse_config(text: &str) -> Result<AppConfig, GramError> {
    let config: AppConfig =
        toml::from_str(text).map_err(|e| GramError::InvalidConfig(e.to_string()))?;
    let model = config.model.validate()?;
    Ok(AppConfig { model, ..config })
}

/// Load the configuration file, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, GramError> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| GramError::Io(format!("Cannot read config {}: {}", path.display(), e)))?;
    parse_config(&text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(parse_config("").unwrap(), AppConfig::default());
    }

    #[test]
    fn full_file() {
        let config = parse_config(
            r#"
            database = "corpus.redb"

            [model]
            orders = [1, 3]
            save_threshold = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.database, PathBuf::from("corpus.redb"));
        assert_eq!(config.model.orders, vec![3, 1]);
        assert_eq!(config.model.save_threshold, 10);
    }

    #[test]
    fn partial_model_table_keeps_defaults() {
        let config = parse_config("[model]\nsave_threshold = 5\n").unwrap();
        assert_eq!(config.model.orders, vec![3, 2, 1]);
        assert_eq!(config.database, PathBuf::from(DEFAULT_DATABASE));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(matches!(
            parse_config("databse = \"x\""),
            Err(GramError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse_config("[model]\norders = [2, 2]"),
            Err(GramError::InvalidOrders(_))
        ));
        assert!(matches!(
            parse_config("[model]\nsave_threshold = 0"),
            Err(GramError::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gramstore.toml");
        std::fs::write(&path, "database = \"m.redb\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.database, PathBuf::from("m.redb"));

        let missing = load_config(Some(&dir.path().join("missing.toml")));
        assert!(matches!(missing, Err(GramError::Io(_))));
    }
}
