//! Playback of stored recordings.
//!
//! A [`PlaybackSession`] owns the object URL for the selected recording and
//! drives a [`PlaybackElement`]; [`CpalElement`] is the real output device.

pub mod element;
pub mod output;
pub mod session;
pub mod ui;

pub use element::{MediaEvent, PlaybackElement};
pub use output::CpalElement;
pub use session::{PlaybackSession, SEEK_STEP, VOLUME_STEP};
pub use ui::{PlayerCommand, PlayerTui, PlayerView};
