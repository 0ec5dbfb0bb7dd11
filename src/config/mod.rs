use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that supplies (or overrides) the backend credential.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Generation backend configuration
    pub backend: BackendConfig,

    /// Whisper transcription configuration
    pub whisper: WhisperConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Chat-completions endpoint URL
    pub endpoint: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Bearer credential; normally supplied via OPENROUTER_API_KEY
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperConfig {
    /// Path to the ggml Whisper model file
    pub model_path: PathBuf,

    /// Language code ("auto" = detect)
    pub language: String,

    /// Number of inference threads (auto-detect if unset)
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default output format
    pub default_output_format: String,

    /// Keep the downloaded audio file after the run
    pub keep_audio: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
                model: "google/gemini-2.0-pro-exp-02-05:free".to_string(),
                api_key: String::new(),
                request_timeout_secs: 120,
            },
            whisper: WhisperConfig {
                model_path: PathBuf::from("models/ggml-base.bin"),
                language: "auto".to_string(),
                threads: None,
            },
            app: AppConfig {
                default_output_format: "text".to_string(),
                keep_audio: false,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default.
    ///
    /// The bearer credential is taken from the environment when present so it
    /// never has to live in the config file.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content =
                fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            serde_yaml::from_str::<Config>(&content).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save()?;
            config
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                config.backend.api_key = key;
            }
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        // The credential stays out of the file; it comes from the environment.
        let mut on_disk = self.clone();
        on_disk.backend.api_key = String::new();

        let content = serde_yaml::to_string(&on_disk).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("studytube").join("config.yaml"))
    }

    /// Validate configuration before running the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.backend.api_key.is_empty() {
            anyhow::bail!(
                "No backend credential configured. Set the {} environment variable.",
                API_KEY_ENV
            );
        }

        if self.backend.endpoint.is_empty() {
            anyhow::bail!("Backend endpoint must be configured");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Backend endpoint: {}", self.backend.endpoint);
        println!("  Backend model: {}", self.backend.model);
        println!(
            "  Backend credential: {}",
            if self.backend.api_key.is_empty() {
                "(not set)"
            } else {
                "(set)"
            }
        );
        println!("  Request timeout: {}s", self.backend.request_timeout_secs);
        println!("  Whisper model: {}", self.whisper.model_path.display());
        println!("  Whisper language: {}", self.whisper.language);
        println!("  Keep audio: {}", self.app.keep_audio);
        println!("  Default format: {}", self.app.default_output_format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_no_embedded_credential() {
        let config = Config::default();
        assert!(config.backend.api_key.is_empty());
    }

    #[test]
    fn test_default_config_points_at_chat_completions() {
        let config = Config::default();
        assert!(config.backend.endpoint.ends_with("/chat/completions"));
        assert!(!config.backend.model.is_empty());
    }

    #[test]
    fn test_validate_rejects_missing_credential() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_credential() {
        let mut config = Config::default();
        config.backend.api_key = "sk-test".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrips_through_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.backend.endpoint, config.backend.endpoint);
        assert_eq!(parsed.whisper.model_path, config.whisper.model_path);
    }
}
