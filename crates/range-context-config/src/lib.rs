use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Named formats and where formatting must stop.
///
/// ```toml
/// editing_host = "article"
///
/// [formats]
/// bold = "strong"
/// strike = "s"
/// ```
///
/// Entries in `[formats]` are merged over the built-in `bold`, `italic` and
/// `underline` formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Element name treated as an upper boundary, in addition to the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editing_host: Option<String>,

    #[serde(default = "default_formats", deserialize_with = "merge_formats")]
    pub formats: BTreeMap<String, String>,
}

fn default_formats() -> BTreeMap<String, String> {
    [("bold", "b"), ("italic", "i"), ("underline", "u")]
        .into_iter()
        .map(|(name, element)| (name.to_string(), element.to_string()))
        .collect()
}

fn merge_formats<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let mut formats = default_formats();
    formats.extend(BTreeMap::<String, String>::deserialize(deserializer)?);
    Ok(formats)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editing_host: None,
            formats: default_formats(),
        }
    }
}

impl Config {
    /// Element name for a format, or the name itself when it is not a
    /// configured format (so `range-context em ...` works without config).
    pub fn element_for<'a>(&'a self, format: &'a str) -> &'a str {
        self.formats.get(format).map_or(format, String::as_str)
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/range-context");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Expand `~` and environment variables in a user-supplied path.
    pub fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/range-context/config.toml"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.element_for("bold"), "b");
        assert_eq!(config.element_for("italic"), "i");
        assert_eq!(config.element_for("underline"), "u");
        assert_eq!(config.editing_host, None);
    }

    #[test]
    fn test_unknown_format_is_its_own_element() {
        assert_eq!(Config::default().element_for("em"), "em");
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_formats_merge_over_defaults() {
        let config_content = r#"
editing_host = "article"

[formats]
bold = "strong"
strike = "s"
"#;
        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.element_for("bold"), "strong");
        assert_eq!(config.element_for("strike"), "s");
        assert_eq!(config.element_for("italic"), "i");
        assert_eq!(config.editing_host.as_deref(), Some("article"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut original = Config::default();
        original.formats.insert("code".into(), "tt".into());
        original.editing_host = Some("section".into());

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/config.toml");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/config.toml"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("RANGE_CONTEXT_TEST_DIR", "/test/env/path");
        }

        let path = PathBuf::from("$RANGE_CONTEXT_TEST_DIR/config.toml");
        let expanded = Config::expand_path(&path).unwrap();

        assert_eq!(expanded, PathBuf::from("/test/env/path/config.toml"));

        unsafe {
            env::remove_var("RANGE_CONTEXT_TEST_DIR");
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "formats = 3").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut test_config = Config::default();
        test_config.editing_host = Some("main".into());

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }
}
