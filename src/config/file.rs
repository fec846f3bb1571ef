//! Configuration file management for voxmemo.
//!
//! Device, codec, synthesizer and provider endpoints live in a TOML file in the
//! user's config directory. Per-user preferences that the app edits itself
//! (quality, auto-save, theme) live in the key-value store instead, see
//! [`crate::config::settings`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Audio capture and encoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `voxmemo list-devices`
    /// - device name from `voxmemo list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Requested capture sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// ffmpeg audio codec for saved recordings ("pcm_s16le" keeps plain WAV)
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// Container extension handed to ffmpeg
    #[serde(default = "default_container")]
    pub container: String,
    /// Audio file shared by the seeded sample recordings
    #[serde(default)]
    pub demo_audio: Option<PathBuf>,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_output_format() -> String {
    "libopus".to_string()
}

fn default_container() -> String {
    "webm".to_string()
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            output_format: default_output_format(),
            container: default_container(),
            demo_audio: None,
        }
    }
}

/// System speech synthesizer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Synthesizer program; detected from `espeak-ng`, `espeak`, `say` when unset
    #[serde(default)]
    pub synthesizer: Option<String>,
    /// Directory holding trained voice samples (`<voice>.<ext>`)
    #[serde(default)]
    pub voices_dir: Option<PathBuf>,
}

/// Endpoint and credentials for one premium speech provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    /// Base URL; each provider has a built-in default
    #[serde(default)]
    pub endpoint: Option<String>,
    /// API key; `VOXMEMO_<PROVIDER>_API_KEY` takes precedence
    #[serde(default)]
    pub api_key: Option<String>,
}

/// All premium provider configurations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub elevenlabs: ProviderEndpoint,
    #[serde(default)]
    pub google: ProviderEndpoint,
    #[serde(default)]
    pub amazon: ProviderEndpoint,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoxConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl VoxConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        let config_path = config_path()?;
        let config_content = fs::read_to_string(&config_path)?;
        Self::parse(&config_content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: VoxConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Resolves the API key for a provider, preferring the environment.
    pub fn api_key(&self, provider: &str) -> Option<String> {
        let env_var = format!("VOXMEMO_{}_API_KEY", provider.to_uppercase());
        if let Ok(key) = std::env::var(&env_var) {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }

        self.provider(provider)
            .and_then(|p| p.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    /// Configured endpoint override for a provider.
    pub fn endpoint(&self, provider: &str) -> Option<String> {
        self.provider(provider).and_then(|p| p.endpoint.clone())
    }

    fn provider(&self, provider: &str) -> Option<&ProviderEndpoint> {
        match provider {
            "elevenlabs" => Some(&self.providers.elevenlabs),
            "google" => Some(&self.providers.google),
            "amazon" => Some(&self.providers.amazon),
            _ => None,
        }
    }
}

/// Retrieves the path to the config file, creating its directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?
        .join(".config")
        .join("voxmemo");
    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("voxmemo.toml"))
}
