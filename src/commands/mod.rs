//! Application command handlers for voxmemo.
//!
//! Each submodule handles one command (or a small family of them).
//!
//! # Commands
//! - `record`: Microphone recording into the library (default)
//! - `library`: Browse, play, rename and delete recordings
//! - `play`: Play one recording
//! - `manage`: Rename or delete a recording from the command line
//! - `speak`: Read text aloud, list available voices
//! - `settings`: Audio quality, auto-save, language and theme
//! - `config`: Open configuration file in user's preferred editor
//! - `list_devices`: List available audio input devices
//! - `logs`: Display recent log entries

pub mod config;
pub mod context;
pub mod library;
pub mod list_devices;
pub mod logs;
pub mod manage;
pub mod play;
pub mod record;
pub mod settings;
pub mod speak;

pub use config::handle_config;
pub use library::handle_list;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use manage::{handle_delete, handle_rename};
pub use play::handle_play;
pub use record::handle_record;
pub use settings::{handle_auto_save, handle_language, handle_quality, handle_settings_show, handle_theme};
pub use speak::{handle_speak, handle_voices, SpeakArgs};
