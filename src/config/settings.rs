//! User preferences stored next to the recordings.
//!
//! Settings and theme are small JSON documents in the key-value store, loaded
//! once at start and rewritten on every change.

use crate::error::Result;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SETTINGS_KEY: &str = "voice_recorder_settings";
pub const THEME_KEY: &str = "voice_recorder_theme";

/// Encoding quality for new recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Low,
    Medium,
    #[default]
    High,
    #[value(name = "veryhigh")]
    VeryHigh,
}

impl AudioQuality {
    pub const ALL: [AudioQuality; 4] = [
        AudioQuality::Low,
        AudioQuality::Medium,
        AudioQuality::High,
        AudioQuality::VeryHigh,
    ];

    /// Encoder bitrate in bits per second.
    pub fn bitrate(self) -> u32 {
        match self {
            AudioQuality::Low => 32_000,
            AudioQuality::Medium => 96_000,
            AudioQuality::High => 128_000,
            AudioQuality::VeryHigh => 192_000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AudioQuality::Low => "Low",
            AudioQuality::Medium => "Medium",
            AudioQuality::High => "High",
            AudioQuality::VeryHigh => "Very High",
        }
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} kbps)", self.label(), self.bitrate() / 1000)
    }
}

/// Application-wide user settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub audio_quality: AudioQuality,
    #[serde(default = "default_auto_save")]
    pub auto_save: bool,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_auto_save() -> bool {
    true
}

fn default_language() -> String {
    "english".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio_quality: AudioQuality::default(),
            auto_save: default_auto_save(),
            language: default_language(),
        }
    }
}

/// Color scheme for the terminal UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Guesses the terminal background from `COLORFGBG` ("fg;bg").
    pub fn detect() -> Self {
        Self::from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())
    }

    fn from_colorfgbg(value: Option<&str>) -> Self {
        let background = value
            .and_then(|v| v.rsplit(';').next())
            .and_then(|bg| bg.trim().parse::<u8>().ok());
        match background {
            Some(7) | Some(15) => Theme::Light,
            _ => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

/// Settings and theme, backed by a key-value store.
pub struct Preferences<K> {
    kv: K,
    settings: Settings,
    theme: Theme,
}

impl<K: KeyValueStore> Preferences<K> {
    /// Loads settings and theme. Unreadable documents fall back to defaults.
    pub fn load(kv: K) -> Self {
        let settings = match read_json::<Settings>(&kv, SETTINGS_KEY) {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                tracing::warn!("Failed to load settings, using defaults: {}", e);
                Settings::default()
            }
        };
        let theme = match read_json::<Theme>(&kv, THEME_KEY) {
            Ok(Some(theme)) => theme,
            Ok(None) => Theme::detect(),
            Err(e) => {
                tracing::warn!("Failed to load theme: {}", e);
                Theme::detect()
            }
        };
        tracing::debug!("Loaded settings {:?}, theme {}", settings, theme);
        Self { kv, settings, theme }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Applies `change` to the settings and persists the result.
    pub fn update_settings(&mut self, change: impl FnOnce(&mut Settings)) -> Result<()> {
        change(&mut self.settings);
        let json = serde_json::to_string(&self.settings)?;
        self.kv.set(SETTINGS_KEY, &json)?;
        tracing::info!("Settings updated: {:?}", self.settings);
        Ok(())
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.theme = theme;
        let json = serde_json::to_string(&theme)?;
        self.kv.set(THEME_KEY, &json)?;
        tracing::info!("Theme set to {}", theme);
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let next = self.theme.toggled();
        self.set_theme(next)?;
        Ok(next)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(kv: &impl KeyValueStore, key: &str) -> Result<Option<T>> {
    match kv.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonFileStore;

    #[test]
    fn quality_table_matches_bitrates() {
        let bitrates: Vec<u32> = AudioQuality::ALL.iter().map(|q| q.bitrate()).collect();
        assert_eq!(bitrates, vec![32_000, 96_000, 128_000, 192_000]);
    }

    #[test]
    fn partial_settings_take_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"audioQuality":"low"}"#).unwrap();
        assert_eq!(settings.audio_quality, AudioQuality::Low);
        assert!(settings.auto_save);
        assert_eq!(settings.language, "english");
    }

    #[test]
    fn settings_serialize_in_camel_case() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert_eq!(json, r#"{"audioQuality":"high","autoSave":true,"language":"english"}"#);
    }

    #[test]
    fn colorfgbg_light_background() {
        assert_eq!(Theme::from_colorfgbg(Some("0;15")), Theme::Light);
        assert_eq!(Theme::from_colorfgbg(Some("15;0")), Theme::Dark);
        assert_eq!(Theme::from_colorfgbg(None), Theme::Dark);
    }

    #[test]
    fn changes_persist_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut prefs = Preferences::load(JsonFileStore::open(dir.path()).unwrap());
            prefs
                .update_settings(|s| {
                    s.auto_save = false;
                    s.audio_quality = AudioQuality::Medium;
                })
                .unwrap();
            prefs.set_theme(Theme::Light).unwrap();
            assert_eq!(prefs.toggle_theme().unwrap(), Theme::Dark);
        }

        let prefs = Preferences::load(JsonFileStore::open(dir.path()).unwrap());
        assert!(!prefs.settings().auto_save);
        assert_eq!(prefs.settings().audio_quality, AudioQuality::Medium);
        assert_eq!(prefs.theme(), Theme::Dark);
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut kv = JsonFileStore::open(dir.path()).unwrap();
        kv.set(SETTINGS_KEY, "not json").unwrap();

        let prefs = Preferences::load(kv);
        assert_eq!(prefs.settings(), &Settings::default());
    }
}
