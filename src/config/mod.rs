//! Configuration for Tidepool.
//!
//! Read from `~/.config/tidepool/config.toml` at startup. If the file
//! doesn't exist, a default configuration with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site base URL; endpoints are joined onto this.
    pub base_url: String,
    /// Stories/comments per paging window.
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://lobste.rs/".to_string(),
            page_size: 25,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// Creates a commented default file when none exists. Missing fields
    /// fall back to defaults; an invalid file is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Default config file path: `~/.config/tidepool/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("tidepool").join("config.toml"))
    }

    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# Tidepool configuration

# Site base URL. Point this at another Lobsters-engine site to read it
# instead (e.g. "https://tilde.news/").
base_url = "https://lobste.rs/"

# Stories/comments loaded per paging window.
page_size = 25
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.base_url, "https://lobste.rs/");
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn test_partial_config() {
        let content = r#"base_url = "https://tilde.news/""#;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.base_url, "https://tilde.news/");
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.base_url, "https://lobste.rs/");
    }
}
