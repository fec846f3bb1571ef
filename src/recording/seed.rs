//! Sample recordings used to populate an empty library on first run.

use crate::error::{Result, VoxError};
use crate::media::{wav, AudioBlob, AudioContainer};
use crate::recording::Recording;
use chrono::{DateTime, Duration, Local};
use std::path::PathBuf;

/// Ids of the seeded sample recordings; they all share one demo clip.
pub const SAMPLE_IDS: [&str; 3] = ["sample_1", "sample_2", "sample_3"];

/// Where the shared demo clip comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedAudio {
    /// An audio file on disk (configured `demo_audio`)
    File(PathBuf),
    /// A synthesized chime bundled with the binary
    Chime,
}

impl SeedAudio {
    pub fn load(&self) -> Result<AudioBlob> {
        match self {
            SeedAudio::File(path) => {
                let bytes = std::fs::read(path).map_err(|e| {
                    VoxError::not_found(format!("Demo audio {} ({e})", path.display()))
                })?;
                let mime = AudioContainer::sniff(&bytes).mime();
                Ok(AudioBlob::new(bytes, mime))
            }
            SeedAudio::Chime => wav::demo_chime(3, 22_050),
        }
    }
}

/// The three sample recordings, dated relative to `now`.
pub fn sample_recordings(now: DateTime<Local>) -> Vec<Recording> {
    let entries = [
        ("Welcome to Voice Recorder", 45_u32, Duration::days(2)),
        ("Recording Demo", 30, Duration::days(1)),
        ("Voice Memo Example", 25, Duration::zero()),
    ];

    SAMPLE_IDS
        .iter()
        .zip(entries)
        .map(|(id, (name, duration, age))| Recording {
            id: id.to_string(),
            name: name.to_string(),
            duration,
            date: now - age,
            url: String::new(),
        })
        .collect()
}
