//! Configuration management for voxmemo.
//!
//! Two layers: the TOML file in the user's config directory (devices, codecs,
//! synthesizer, provider endpoints and keys) and the in-app preferences
//! (settings and theme) persisted in the key-value store.

pub mod file;
pub mod settings;

pub use file::{config_path, AudioConfig, SpeechConfig, VoxConfig};
pub use settings::{AudioQuality, Preferences, Theme};
