//! Recording library and microphone capture.
//!
//! The store keeps recording metadata and audio; a capture session turns the
//! microphone into one finished audio blob that the store can take.

pub mod capture;
pub mod microphone;
pub mod model;
pub mod seed;
pub mod store;
pub mod ui;
pub mod visualizations;

pub use capture::{CaptureSession, CaptureState, SystemClock};
pub use microphone::MicrophoneSource;
pub use model::{default_recording_name, format_duration, NewRecording, Recording};
pub use seed::SeedAudio;
pub use store::{AudioResolver, RecordingStore};
pub use ui::{RecorderCommand, RecorderTui, RecorderView};
