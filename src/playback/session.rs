//! Playback of one selected recording at a time.
//!
//! Selecting a recording resolves its audio to an object URL owned by the
//! session. The URL is revoked when another recording is selected, when the
//! session is closed, and when the session is dropped.

use crate::error::{Result, VoxError};
use crate::playback::element::{MediaEvent, PlaybackElement};
use crate::recording::{AudioResolver, Recording};
use crate::storage::ObjectUrl;

/// Volume step used by the player controls.
pub const VOLUME_STEP: f32 = 0.1;
/// Seek step used by the player controls, in seconds.
pub const SEEK_STEP: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackState {
    /// Nothing selected
    Idle,
    /// Resolving the selected recording's audio
    Loading,
    /// Audio resolved and loaded into the element
    Ready,
    /// Resolution or decoding failed
    Failed(String),
}

/// Transport controls over a [`PlaybackElement`] for one recording.
pub struct PlaybackSession<E: PlaybackElement> {
    element: E,
    url: Option<ObjectUrl>,
    recording: Option<Recording>,
    state: PlaybackState,
    duration: Option<f64>,
    current_time: f64,
    is_playing: bool,
    volume: f32,
}

impl<E: PlaybackElement> PlaybackSession<E> {
    pub fn new(element: E) -> Self {
        Self {
            element,
            url: None,
            recording: None,
            state: PlaybackState::Idle,
            duration: None,
            current_time: 0.0,
            is_playing: false,
            volume: 1.0,
        }
    }

    /// Switches to `recording`, releasing whatever was selected before.
    ///
    /// # Errors
    /// - [`VoxError::NotFound`] if the recording has no stored audio
    /// - a conversion or device error if the element cannot load it
    ///
    /// The session is left in [`PlaybackState::Failed`] on error.
    pub fn select(&mut self, resolver: &impl AudioResolver, recording: &Recording) -> Result<()> {
        self.release_current();
        self.recording = Some(recording.clone());
        self.state = PlaybackState::Loading;
        tracing::debug!("Loading audio for {}", recording.id);

        match self.load(resolver, &recording.id) {
            Ok(url) => {
                self.url = Some(url);
                self.state = PlaybackState::Ready;
                self.element.set_volume(self.volume);
                self.pump();
                tracing::info!("Ready to play {} ({})", recording.id, recording.name);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error loading audio for {}: {}", recording.id, e);
                self.state = PlaybackState::Failed(format!("Failed to load audio: {e}"));
                Err(e)
            }
        }
    }

    fn load(&mut self, resolver: &impl AudioResolver, id: &str) -> Result<ObjectUrl> {
        let url = resolver.resolve_audio_url(id)?;
        let blob = url
            .fetch()
            .ok_or_else(|| VoxError::not_found(format!("Object URL {}", url.as_str())))?;
        self.element.load(&blob)?;
        Ok(url)
    }

    /// Starts or pauses playback. Returns whether audio is now playing.
    pub fn toggle_play(&mut self) -> Result<bool> {
        if self.state != PlaybackState::Ready {
            return Err(VoxError::InvalidTransition {
                action: "play",
                state: self.state_name(),
            });
        }

        if self.is_playing {
            self.element.pause();
            self.is_playing = false;
        } else {
            self.element.play()?;
            self.is_playing = true;
        }
        tracing::debug!("Playing: {}", self.is_playing);
        Ok(self.is_playing)
    }

    /// Moves the play head, clamped to `[0, duration]`. Before metadata has
    /// loaded the duration counts as zero.
    pub fn seek(&mut self, position: f64) -> f64 {
        let duration = self.duration.unwrap_or(0.0);
        let clamped = if position.is_nan() {
            0.0
        } else {
            position.clamp(0.0, duration)
        };
        if self.state == PlaybackState::Ready {
            self.element.seek(clamped);
        }
        self.current_time = clamped;
        clamped
    }

    pub fn seek_by(&mut self, delta: f64) -> f64 {
        self.seek(self.current_time + delta)
    }

    /// Sets the output volume, clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let clamped = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.volume = clamped;
        self.element.set_volume(clamped);
        clamped
    }

    /// Applies pending element events to the session.
    pub fn pump(&mut self) {
        while let Some(event) = self.element.poll_event() {
            match event {
                MediaEvent::LoadedMetadata { duration } => {
                    tracing::debug!("Duration known: {:.2}s", duration);
                    self.duration = Some(duration);
                }
                MediaEvent::TimeUpdate { position } => self.current_time = position,
                MediaEvent::Ended => {
                    tracing::debug!("Playback ended");
                    self.is_playing = false;
                    self.current_time = 0.0;
                }
            }
        }
    }

    /// Releases the selected recording and its URL.
    pub fn close(&mut self) {
        if self.recording.is_some() || self.url.is_some() {
            tracing::debug!("Closing playback session");
        }
        self.release_current();
        self.recording = None;
        self.state = PlaybackState::Idle;
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn release_current(&mut self) {
        if self.is_playing {
            self.element.pause();
        }
        self.element.unload();
        if let Some(url) = self.url.take() {
            url.revoke();
        }
        self.duration = None;
        self.current_time = 0.0;
        self.is_playing = false;
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Failed(_) => "failed",
        }
    }
}

impl<E: PlaybackElement> Drop for PlaybackSession<E> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::AudioBlob;
    use crate::recording::{NewRecording, RecordingStore, SeedAudio};
    use crate::storage::{JsonFileStore, ObjectUrlRegistry, SqliteBlobStore};
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Element that reports a fixed duration and records calls.
    #[derive(Default)]
    struct FakeElement {
        events: VecDeque<MediaEvent>,
        calls: Vec<String>,
        reject: bool,
    }

    impl PlaybackElement for FakeElement {
        fn load(&mut self, blob: &AudioBlob) -> Result<()> {
            if self.reject {
                return Err(VoxError::conversion("unplayable"));
            }
            self.calls.push(format!("load {}", blob.len()));
            self.events.push_back(MediaEvent::LoadedMetadata { duration: 12.0 });
            Ok(())
        }

        fn unload(&mut self) {
            self.calls.push("unload".to_string());
        }

        fn play(&mut self) -> Result<()> {
            self.calls.push("play".to_string());
            Ok(())
        }

        fn pause(&mut self) {
            self.calls.push("pause".to_string());
        }

        fn seek(&mut self, position: f64) {
            self.calls.push(format!("seek {position}"));
        }

        fn set_volume(&mut self, volume: f32) {
            self.calls.push(format!("volume {volume}"));
        }

        fn poll_event(&mut self) -> Option<MediaEvent> {
            self.events.pop_front()
        }
    }

    fn store_with(
        dir: &std::path::Path,
        registry: Arc<ObjectUrlRegistry>,
    ) -> RecordingStore<JsonFileStore, SqliteBlobStore> {
        RecordingStore::new(
            JsonFileStore::open(dir).unwrap(),
            SqliteBlobStore::in_memory().unwrap(),
            registry,
            SeedAudio::Chime,
        )
    }

    #[test]
    fn selecting_loads_metadata_and_owns_one_url() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ObjectUrlRegistry::new();
        let mut store = store_with(dir.path(), Arc::clone(&registry));
        let first = store.list()[0].clone();

        let mut session = PlaybackSession::new(FakeElement::default());
        session.select(&store, &first).unwrap();

        assert_eq!(session.state(), &PlaybackState::Ready);
        assert_eq!(session.duration(), Some(12.0));
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn reselecting_revokes_previous_url() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ObjectUrlRegistry::new();
        let mut store = store_with(dir.path(), Arc::clone(&registry));
        let list = store.list().to_vec();

        let mut session = PlaybackSession::new(FakeElement::default());
        session.select(&store, &list[0]).unwrap();
        session.select(&store, &list[1]).unwrap();

        assert_eq!(registry.created_count(), 2);
        assert_eq!(registry.revoked_count(), 1);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn close_revokes_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ObjectUrlRegistry::new();
        let mut store = store_with(dir.path(), Arc::clone(&registry));
        let first = store.list()[0].clone();

        let mut session = PlaybackSession::new(FakeElement::default());
        session.select(&store, &first).unwrap();
        session.close();
        session.close();
        drop(session);

        assert_eq!(registry.revoked_count(), 1);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn drop_revokes_active_url() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ObjectUrlRegistry::new();
        let mut store = store_with(dir.path(), Arc::clone(&registry));
        let first = store.list()[0].clone();

        {
            let mut session = PlaybackSession::new(FakeElement::default());
            session.select(&store, &first).unwrap();
        }
        assert_eq!(registry.revoked_count(), 1);
    }

    #[test]
    fn missing_audio_fails_selection() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ObjectUrlRegistry::new();
        let mut store = store_with(dir.path(), Arc::clone(&registry));
        let silent = store.add(NewRecording::new("no audio", 3), None).unwrap();

        let mut session = PlaybackSession::new(FakeElement::default());
        let err = session.select(&store, &silent).unwrap_err();

        assert!(matches!(err, VoxError::NotFound { .. }));
        assert!(matches!(session.state(), PlaybackState::Failed(_)));
        assert!(session.toggle_play().is_err());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn undecodable_audio_releases_url() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ObjectUrlRegistry::new();
        let mut store = store_with(dir.path(), Arc::clone(&registry));
        let first = store.list()[0].clone();

        let mut session = PlaybackSession::new(FakeElement {
            reject: true,
            ..FakeElement::default()
        });
        assert!(session.select(&store, &first).is_err());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn seek_and_volume_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_with(dir.path(), ObjectUrlRegistry::new());
        let first = store.list()[0].clone();

        let mut session = PlaybackSession::new(FakeElement::default());
        assert_eq!(session.seek(3.0), 0.0);

        session.select(&store, &first).unwrap();
        assert_eq!(session.seek(-4.0), 0.0);
        assert_eq!(session.seek(40.0), 12.0);
        assert_eq!(session.seek_by(-SEEK_STEP), 7.0);
        assert_eq!(session.set_volume(1.7), 1.0);
        assert_eq!(session.set_volume(-0.2), 0.0);
    }

    #[test]
    fn ended_resets_position_and_playing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_with(dir.path(), ObjectUrlRegistry::new());
        let first = store.list()[0].clone();

        let mut session = PlaybackSession::new(FakeElement::default());
        session.select(&store, &first).unwrap();
        assert!(session.toggle_play().unwrap());

        session.element.events.push_back(MediaEvent::TimeUpdate { position: 11.5 });
        session.pump();
        assert_eq!(session.current_time(), 11.5);

        session.element.events.push_back(MediaEvent::Ended);
        session.pump();
        assert!(!session.is_playing());
        assert_eq!(session.current_time(), 0.0);
    }

    #[test]
    fn toggle_pauses_the_element() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_with(dir.path(), ObjectUrlRegistry::new());
        let first = store.list()[0].clone();

        let mut session = PlaybackSession::new(FakeElement::default());
        session.select(&store, &first).unwrap();
        assert!(session.toggle_play().unwrap());
        assert!(!session.toggle_play().unwrap());

        let calls = &session.element.calls;
        let tail: Vec<&str> = calls.iter().rev().take(2).rev().map(String::as_str).collect();
        assert_eq!(tail, vec!["play", "pause"]);
    }
}
