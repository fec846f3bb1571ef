//! Audio payload types and the codecs used to move them between containers.
//!
//! Recordings, voice samples and provider responses all travel as [`AudioBlob`]s.
//! WAV handling is done in-process with `hound`; every other container goes
//! through ffmpeg.

pub mod blob;
pub mod ffmpeg;
pub mod wav;

pub use blob::{AudioBlob, AudioContainer};
pub use ffmpeg::transcode;
pub use wav::PcmBuffer;
