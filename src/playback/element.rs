//! The media element a playback session drives.

use crate::error::Result;
use crate::media::AudioBlob;

/// Notifications raised by a media element as playback progresses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    /// The clip is decoded and its length is known
    LoadedMetadata { duration: f64 },
    /// Playback position moved
    TimeUpdate { position: f64 },
    /// Playback reached the end of the clip
    Ended,
}

/// A single-clip audio player.
///
/// Metadata and progress arrive as [`MediaEvent`]s from [`poll_event`], not as
/// return values, so callers must pump events to learn the duration.
///
/// [`poll_event`]: PlaybackElement::poll_event
pub trait PlaybackElement {
    /// Replaces the current clip.
    fn load(&mut self, blob: &AudioBlob) -> Result<()>;

    /// Drops the current clip and any output stream.
    fn unload(&mut self);

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    /// Moves the play head to `position` seconds.
    fn seek(&mut self, position: f64);

    /// Output gain, 0.0..=1.0.
    fn set_volume(&mut self, volume: f32);

    /// Next pending event, if any.
    fn poll_event(&mut self) -> Option<MediaEvent>;
}
