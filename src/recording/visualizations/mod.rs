//! Live level display for the recorder screen.

pub mod waveform;

pub use waveform::{level_percent, LevelHistory};
