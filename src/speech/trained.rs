//! Trained voices: pre-recorded samples kept in the voice library directory.
//!
//! Each voice is a single audio file named after the voice, e.g.
//! `voices/narrator.webm`. Samples may be in any container, so they go through
//! the conversion chain before playback.

use crate::error::{Result, VoxError};
use crate::media::AudioBlob;
use crate::speech::backend::{SpeechBackend, SpeechOutput, SpeechRequest};
use crate::speech::clip::{ClipOutput, ElementFactory};
use crate::speech::conversion::{prepare_playable, AudioConverter};
use crate::speech::provider::SpeechProvider;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

const SAMPLE_EXTENSIONS: [&str; 7] = ["wav", "mp3", "ogg", "oga", "flac", "webm", "m4a"];

/// Voice names available in `dir`, sorted.
pub fn list_trained_voices(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| VoxError::not_found(format!("Voice library {} ({e})", dir.display())))?;
    let mut voices: Vec<String> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_sample(path))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    voices.sort();
    voices.dedup();
    Ok(voices)
}

fn is_sample(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_ascii_lowercase();
                SAMPLE_EXTENSIONS.contains(&ext.as_str())
            })
            .unwrap_or(false)
}

/// Backend for [`SpeechProvider::Trained`].
pub struct TrainedVoiceBackend {
    voices_dir: Option<PathBuf>,
    converter: Box<dyn AudioConverter>,
    elements: ElementFactory,
}

impl TrainedVoiceBackend {
    pub fn new(voices_dir: Option<PathBuf>, converter: Box<dyn AudioConverter>, elements: ElementFactory) -> Self {
        Self {
            voices_dir,
            converter,
            elements,
        }
    }

    fn load_sample(&self, voice: Option<&str>) -> Result<AudioBlob> {
        let dir = self
            .voices_dir
            .as_deref()
            .ok_or_else(|| VoxError::not_found("Voice library (set [speech] voices_dir)"))?;

        let voice = match voice {
            Some(voice) => voice.to_string(),
            None => list_trained_voices(dir)?
                .into_iter()
                .next()
                .ok_or_else(|| VoxError::not_found(format!("Trained voice in {}", dir.display())))?,
        };

        let path = SAMPLE_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{voice}.{ext}")))
            .find(|p| p.is_file())
            .ok_or_else(|| VoxError::not_found(format!("Voice sample '{voice}'")))?;

        let bytes = std::fs::read(&path)
            .map_err(|e| VoxError::storage(format!("Failed to read {}: {e}", path.display())))?;
        let mime = crate::media::AudioContainer::sniff(&bytes).mime();
        tracing::debug!("Loaded voice sample {} ({} bytes)", path.display(), bytes.len());
        Ok(AudioBlob::new(bytes, mime))
    }
}

#[async_trait(?Send)]
impl SpeechBackend for TrainedVoiceBackend {
    fn provider(&self) -> SpeechProvider {
        SpeechProvider::Trained
    }

    async fn start(&mut self, request: &SpeechRequest) -> Result<Box<dyn SpeechOutput>> {
        let sample = self.load_sample(request.voice.as_deref())?;
        let prepared = prepare_playable(&sample, self.converter.as_ref());
        tracing::info!("Trained voice ready after {:?}", prepared.attempts);
        let output = ClipOutput::start((self.elements)(), &prepared.clip, request.params.volume)?;
        Ok(Box::new(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::clip::tests::LoggingElement;
    use crate::speech::conversion::tests::FakeConverter;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    fn backend(dir: Option<PathBuf>, converter: FakeConverter) -> (TrainedVoiceBackend, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let events = Rc::new(RefCell::new(VecDeque::new()));
        let factory = LoggingElement::factory(Rc::clone(&log), events);
        (TrainedVoiceBackend::new(dir, Box::new(converter), factory), log)
    }

    #[test]
    fn lists_audio_files_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("narrator.webm"), b"x").unwrap();
        std::fs::write(dir.path().join("alice.wav"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        assert_eq!(list_trained_voices(dir.path()).unwrap(), vec!["alice", "narrator"]);
    }

    #[tokio::test]
    async fn missing_library_is_not_found() {
        let (mut backend, _) = backend(None, FakeConverter::default());
        let err = backend.start(&SpeechRequest::new("hi")).await.err().unwrap();
        assert!(matches!(err, VoxError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unplayable_sample_is_converted_before_playing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("narrator.webm"), [0x1A, 0x45, 0xDF, 0xA3, 0x9F]).unwrap();
        let converter = FakeConverter {
            wav: true,
            ..Default::default()
        };
        let (mut backend, log) = backend(Some(dir.path().to_path_buf()), converter);

        let request = SpeechRequest::new("hi").with_voice(Some("narrator".into()));
        let _output = backend.start(&request).await.unwrap();
        assert_eq!(log.borrow()[0], "load wav");
    }

    #[tokio::test]
    async fn first_voice_is_used_when_none_requested() {
        let dir = tempfile::tempdir().unwrap();
        let wav = crate::media::wav::silent_clip(1, 8_000).unwrap();
        std::fs::write(dir.path().join("zed.wav"), wav.bytes()).unwrap();
        std::fs::write(dir.path().join("amy.mp3"), b"ID3\x04\0\0").unwrap();
        let (mut backend, log) = backend(Some(dir.path().to_path_buf()), FakeConverter::default());

        let _output = backend.start(&SpeechRequest::new("hi")).await.unwrap();
        assert_eq!(log.borrow()[0], "load mp3");
    }
}
