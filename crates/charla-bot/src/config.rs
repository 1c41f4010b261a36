//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration for charla
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat model to use
    pub model: Option<String>,
    /// Gemini API key (alternative to the GEMINI_API_KEY env var)
    pub api_key: Option<String>,
    /// Exchanges remembered per user
    pub max_history: usize,
    /// Minutes of inactivity before a conversation is forgotten
    pub timeout_minutes: i64,
    /// Iteration bound for the tool-selection agent
    pub agent_max_iterations: u32,
    /// Override for the exchange-rate service base URL
    pub currency_base_url: Option<String>,
    /// Override for the primary translation backend URL
    pub libre_base_url: Option<String>,
    /// Override for the secondary translation backend URL
    pub mymemory_base_url: Option<String>,
    /// Override for the lyrics service base URL
    pub lyrics_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: None,
            api_key: None,
            max_history: 10,
            timeout_minutes: 30,
            agent_max_iterations: 4,
            currency_base_url: None,
            libre_base_url: None,
            mymemory_base_url: None,
            lyrics_base_url: None,
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("charla")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for CHARLA_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("CHARLA_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        Config::default().save()?;
        Ok(path)
    }

    /// Get the API key, checking config then environment
    pub fn get_api_key(&self) -> Option<String> {
        if self.api_key.is_some() {
            return self.api_key.clone();
        }
        std::env::var("GEMINI_API_KEY").ok()
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# charla configuration file
# Place at ~/.config/charla/config.toml (Linux/Mac) or %APPDATA%\charla\config.toml (Windows)

# Chat model to use
model = "gemini-2.0-flash"

# Exchanges remembered per user (entries kept = 2x this)
max_history = 10

# Minutes of inactivity before a conversation is forgotten
timeout_minutes = 30

# Iteration bound for the tool-selection agent
agent_max_iterations = 4

# API key (optional - the GEMINI_API_KEY environment variable is preferred)
# api_key = "..."

# Service URL overrides (optional)
# currency_base_url = "https://api.exchangerate-api.com/v4/latest"
# libre_base_url = "https://libretranslate.com/translate"
# mymemory_base_url = "https://api.mymemory.translated.net/get"
# lyrics_base_url = "https://api.lyrics.ovh/v1"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_history, 10);
        assert_eq!(config.timeout_minutes, 30);
        assert_eq!(config.agent_max_iterations, 4);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.max_history, 10);
        assert!(config.model.is_none());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: Config = toml::from_str("max_history = 5\nmodel = \"gemini-2.0-flash\"\n")
            .unwrap();
        assert_eq!(config.max_history, 5);
        assert_eq!(config.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.timeout_minutes, 30);
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.max_history, 10);
    }
}
