use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub display: DisplayConfig,
    pub history: HistoryConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend base URL
    pub url: String,

    /// Request timeout for queries and uploads, in seconds
    pub timeout_secs: u64,

    /// Seconds between background health checks
    pub health_interval_secs: u64,

    /// Timeout for a single health check, in seconds
    pub health_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Rows shown per page
    pub page_size: usize,

    /// Colored output
    pub use_color: bool,

    /// Highlight the SQL the backend generated
    pub syntax_highlighting: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Record questions at all
    pub enabled: bool,

    /// Maximum remembered questions
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Keep local copies of answers for offline replay
    pub enabled: bool,

    /// Override the cache directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            display: DisplayConfig::default(),
            history: HistoryConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            health_interval_secs: 30,
            health_timeout_secs: 5,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            page_size: 25,
            use_color: true,
            syntax_highlighting: true,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 50,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

impl Config {
    /// Load from the default location, writing a commented default file
    /// on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&config_path, Self::create_default_with_comments())?;
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;
        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("autobi").join("config.toml"))
    }

    /// Default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# AutoBI CLI Configuration File
# Location: ~/.config/autobi/config.toml (Linux/macOS)
#           %APPDATA%\autobi\config.toml (Windows)

[api]
# Backend base URL (AUTOBI_API_URL overrides this)
url = "http://localhost:8000"
# Request timeout for queries and uploads, in seconds
timeout_secs = 30
# Seconds between background health checks
health_interval_secs = 30
# Timeout for a single health check, in seconds
health_timeout_secs = 5

[display]
# Rows shown per page
page_size = 25
# Colored output
use_color = true
# Highlight the SQL the backend generated
syntax_highlighting = true

[history]
# Record questions at all
enabled = true
# Maximum remembered questions
limit = 50

[cache]
# Keep local copies of answers for offline replay
enabled = true
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.display.page_size, 25);
        assert_eq!(config.history.limit, 50);
        assert_eq!(config.api.health_interval_secs, 30);
        assert_eq!(config.api.health_timeout_secs, 5);
    }

    #[test]
    fn test_commented_template_parses_to_defaults() {
        let template = Config::create_default_with_comments();
        let parsed: Config = toml::from_str(&template).unwrap();
        assert_eq!(parsed.display.page_size, Config::default().display.page_size);
        assert_eq!(parsed.api.url, Config::default().api.url);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[display]\npage_size = 10\n").unwrap();
        assert_eq!(parsed.display.page_size, 10);
        assert_eq!(parsed.history.limit, 50);
    }
}
