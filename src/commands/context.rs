//! Shared loading for command handlers: configuration, preferences, the
//! recording store and recording lookup.

use crate::config::{Preferences, VoxConfig};
use crate::recording::{Recording, RecordingStore, SeedAudio};
use crate::storage::JsonFileStore;
use crate::ui::{ErrorScreen, Palette};
use std::path::PathBuf;

/// Configuration and per-user preferences for one command run.
pub struct AppContext {
    pub config: VoxConfig,
    pub data_dir: PathBuf,
    pub preferences: Preferences<JsonFileStore>,
}

impl AppContext {
    /// Loads the config file and preferences, showing a full-screen error if
    /// the config does not parse.
    pub fn load() -> anyhow::Result<Self> {
        let data_dir = crate::storage::data_dir()?;
        let preferences = Preferences::load(JsonFileStore::open(&data_dir)?);

        let config = match VoxConfig::load() {
            Ok(config) => config,
            Err(err) => {
                tracing::error!("Failed to load configuration: {err}");
                show_error(
                    Palette::for_theme(preferences.theme()),
                    &format!(
                        "Configuration Error:\n\n{err}\n\nPlease check your ~/.config/voxmemo/voxmemo.toml file and try again."
                    ),
                );
                return Err(anyhow::anyhow!("Configuration error: {err}"));
            }
        };

        Ok(Self {
            config,
            data_dir,
            preferences,
        })
    }

    pub fn palette(&self) -> Palette {
        Palette::for_theme(self.preferences.theme())
    }

    /// Opens the on-disk recording store.
    pub fn open_store(&self) -> anyhow::Result<RecordingStore> {
        let seed = match &self.config.audio.demo_audio {
            Some(path) => SeedAudio::File(path.clone()),
            None => SeedAudio::Chime,
        };
        Ok(RecordingStore::open(&self.data_dir, seed)?)
    }
}

/// Shows `message` full-screen until a key is pressed. Failures only get logged.
pub fn show_error(palette: Palette, message: &str) {
    let shown = ErrorScreen::new(palette).and_then(|mut screen| {
        screen.show_error(message)?;
        screen.cleanup()
    });
    if let Err(e) = shown {
        tracing::warn!("Could not show error screen: {}", e);
        eprintln!("{message}");
    }
}

/// Index of the recording named by `selector`: an exact id, or a 1-based
/// position in list order.
pub fn find_recording(recordings: &[Recording], selector: &str) -> Option<usize> {
    let selector = selector.trim();
    recordings
        .iter()
        .position(|r| r.id == selector)
        .or_else(|| match selector.parse::<usize>() {
            Ok(n) if (1..=recordings.len()).contains(&n) => Some(n - 1),
            _ => None,
        })
}

/// Looks up `selector` in the store, listing the valid range on failure.
pub fn resolve_recording(store: &mut RecordingStore, selector: &str) -> anyhow::Result<Recording> {
    let recordings = store.list();
    if recordings.is_empty() {
        return Err(anyhow::anyhow!("No recordings found"));
    }
    find_recording(recordings, selector)
        .map(|index| recordings[index].clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No recording '{selector}'. Use an id or a number between 1 and {}",
                recordings.len()
            )
        })
}
