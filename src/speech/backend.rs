//! The contract every speech provider implements.

use crate::error::Result;
use crate::speech::provider::SpeechProvider;
use async_trait::async_trait;

pub const DEFAULT_RATE: f32 = 0.9;
pub const DEFAULT_PITCH: f32 = 1.0;
pub const DEFAULT_VOLUME: f32 = 1.0;

/// Voice parameters, clamped to the ranges every backend accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            pitch: DEFAULT_PITCH,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl VoiceParams {
    pub fn new(rate: f32, pitch: f32, volume: f32) -> Self {
        Self {
            rate: rate.clamp(0.5, 1.5),
            pitch: pitch.clamp(0.8, 1.2),
            volume: volume.clamp(0.0, 1.0),
        }
    }
}

/// One utterance to synthesize.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    /// Backend-specific voice id; `None` picks the backend default
    pub voice: Option<String>,
    pub params: VoiceParams,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            params: VoiceParams::default(),
        }
    }

    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_params(mut self, params: VoiceParams) -> Self {
        self.params = params;
        self
    }
}

/// What a pause request actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused,
    /// The output cannot pause and was stopped instead
    Stopped,
}

/// Audio that a backend has started producing.
pub trait SpeechOutput {
    fn pause(&mut self) -> Result<PauseOutcome>;

    fn resume(&mut self) -> Result<()>;

    /// Stops output for good. Safe to call more than once.
    fn stop(&mut self);

    /// Whether the utterance ran to its natural end.
    fn is_finished(&mut self) -> bool;
}

/// A speech provider.
///
/// `start` resolves once audio is playing; network providers suspend while the
/// clip downloads.
#[async_trait(?Send)]
pub trait SpeechBackend {
    fn provider(&self) -> SpeechProvider;

    async fn start(&mut self, request: &SpeechRequest) -> Result<Box<dyn SpeechOutput>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_are_clamped() {
        let params = VoiceParams::new(3.0, 0.1, -1.0);
        assert_eq!(params.rate, 1.5);
        assert_eq!(params.pitch, 0.8);
        assert_eq!(params.volume, 0.0);
    }

    #[test]
    fn defaults_match_the_speech_page() {
        let request = SpeechRequest::new("hi");
        assert_eq!(request.params.rate, 0.9);
        assert_eq!(request.params.pitch, 1.0);
        assert!(request.voice.is_none());
    }
}
