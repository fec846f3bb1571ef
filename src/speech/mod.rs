//! Text-to-speech across the system synthesizer, trained voice samples and
//! premium HTTP providers.
//!
//! Every provider implements [`SpeechBackend`](backend::SpeechBackend); a
//! [`SpeechSession`] owns the registered backends and the single active output.

pub mod backend;
pub mod clip;
pub mod conversion;
pub mod provider;
pub mod remote;
pub mod session;
pub mod system;
pub mod text;
pub mod trained;
pub mod ui;
pub mod voices;

pub use backend::{SpeechRequest, VoiceParams};
pub use clip::ElementFactory;
pub use conversion::FfmpegConverter;
pub use provider::{SpeechProvider, PREMIUM_VOICES};
pub use remote::RemoteBackend;
pub use session::{SpeechSession, SpeechState};
pub use system::SystemSynthesizer;
pub use text::{TextOptions, TextProcessor};
pub use trained::{list_trained_voices, TrainedVoiceBackend};
pub use ui::{SpeakerCommand, SpeakerTui, SpeakerView};
pub use voices::pick_default_voice;
