//! One control surface over every speech backend.
//!
//! The session holds at most one active [`SpeechOutput`]. A new `speak` stops
//! the previous output before the next backend starts, and any failure leaves
//! the session idle.

use crate::error::{Result, VoxError};
use crate::speech::backend::{PauseOutcome, SpeechBackend, SpeechOutput, SpeechRequest};
use crate::speech::provider::SpeechProvider;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpeechState {
    #[default]
    Idle,
    Speaking,
    Paused,
}

impl SpeechState {
    fn name(self) -> &'static str {
        match self {
            SpeechState::Idle => "idle",
            SpeechState::Speaking => "speaking",
            SpeechState::Paused => "paused",
        }
    }
}

/// Which backend ended up speaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeakOutcome {
    pub provider: SpeechProvider,
    /// The requested provider failed and the system voice took over
    pub fell_back: bool,
}

#[derive(Default)]
pub struct SpeechSession {
    backends: HashMap<SpeechProvider, Box<dyn SpeechBackend>>,
    output: Option<Box<dyn SpeechOutput>>,
    state: SpeechState,
    active: Option<SpeechProvider>,
    last_error: Option<String>,
}

impl SpeechSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the backend for its provider.
    pub fn register(&mut self, backend: Box<dyn SpeechBackend>) {
        self.backends.insert(backend.provider(), backend);
    }

    pub fn has_provider(&self, provider: SpeechProvider) -> bool {
        self.backends.contains_key(&provider)
    }

    pub fn state(&self) -> SpeechState {
        self.state
    }

    /// Provider behind the current output.
    pub fn active_provider(&self) -> Option<SpeechProvider> {
        self.active
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Speaks `request` with `provider`, cancelling whatever is playing.
    ///
    /// A failing provider other than the system voice gets one retry on the
    /// system voice, unless the failure rules out a fallback.
    pub async fn speak(&mut self, provider: SpeechProvider, request: &SpeechRequest) -> Result<SpeakOutcome> {
        self.stop();
        self.last_error = None;
        tracing::info!("Speaking {} chars with {}", request.text.chars().count(), provider.name());

        let (output, outcome) = match self.start_with(provider, request).await {
            Ok(output) => (
                output,
                SpeakOutcome {
                    provider,
                    fell_back: false,
                },
            ),
            Err(e) if self.can_fall_back(provider, &e) => {
                tracing::warn!("{} failed ({}), falling back to the system voice", provider.name(), e);
                let fallback = request.clone().with_voice(None);
                match self.start_with(SpeechProvider::System, &fallback).await {
                    Ok(output) => (
                        output,
                        SpeakOutcome {
                            provider: SpeechProvider::System,
                            fell_back: true,
                        },
                    ),
                    Err(fallback_err) => {
                        tracing::error!("System voice fallback failed: {}", fallback_err);
                        return Err(self.fail(e));
                    }
                }
            }
            Err(e) => return Err(self.fail(e)),
        };

        self.output = Some(output);
        self.active = Some(outcome.provider);
        self.state = SpeechState::Speaking;
        tracing::debug!("Speech state: speaking ({})", outcome.provider.name());
        Ok(outcome)
    }

    fn can_fall_back(&self, provider: SpeechProvider, error: &VoxError) -> bool {
        provider != SpeechProvider::System
            && !error.is_fatal_to_request()
            && self.has_provider(SpeechProvider::System)
    }

    async fn start_with(&mut self, provider: SpeechProvider, request: &SpeechRequest) -> Result<Box<dyn SpeechOutput>> {
        let backend = self.backends.get_mut(&provider).ok_or_else(|| VoxError::Unsupported {
            reason: format!("{} is not available", provider.name()),
        })?;
        backend.start(request).await
    }

    fn fail(&mut self, error: VoxError) -> VoxError {
        tracing::error!("Speech failed: {}", error);
        self.output = None;
        self.active = None;
        self.state = SpeechState::Idle;
        self.last_error = Some(error.to_string());
        error
    }

    pub fn pause(&mut self) -> Result<()> {
        let Some(output) = self.output.as_mut().filter(|_| self.state == SpeechState::Speaking) else {
            return Err(VoxError::InvalidTransition {
                action: "pause",
                state: self.state.name(),
            });
        };
        match output.pause()? {
            PauseOutcome::Paused => {
                self.state = SpeechState::Paused;
                tracing::debug!("Speech state: paused");
            }
            PauseOutcome::Stopped => {
                tracing::debug!("Output cannot pause, speech stopped");
                self.stop();
            }
        }
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        let Some(output) = self.output.as_mut().filter(|_| self.state == SpeechState::Paused) else {
            return Err(VoxError::InvalidTransition {
                action: "resume",
                state: self.state.name(),
            });
        };
        output.resume()?;
        self.state = SpeechState::Speaking;
        tracing::debug!("Speech state: speaking");
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<()> {
        match self.state {
            SpeechState::Paused => self.resume(),
            _ => self.pause(),
        }
    }

    /// Stops any output and returns to idle. A no-op when idle.
    pub fn stop(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.stop();
            tracing::debug!("Speech stopped");
        }
        self.active = None;
        self.state = SpeechState::Idle;
    }

    /// Notices a natural end of speech and returns the current state.
    pub fn poll(&mut self) -> SpeechState {
        let finished = self
            .output
            .as_mut()
            .map(|output| output.is_finished())
            .unwrap_or(false);
        if finished {
            tracing::debug!("Speech finished");
            self.stop();
        }
        self.state
    }
}

impl Drop for SpeechSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct FakeOutput {
        id: usize,
        log: Log,
        pausable: bool,
        finished: Rc<Cell<bool>>,
        stopped: bool,
    }

    impl SpeechOutput for FakeOutput {
        fn pause(&mut self) -> Result<PauseOutcome> {
            self.log.borrow_mut().push(format!("pause {}", self.id));
            if self.pausable {
                Ok(PauseOutcome::Paused)
            } else {
                self.stop();
                Ok(PauseOutcome::Stopped)
            }
        }

        fn resume(&mut self) -> Result<()> {
            self.log.borrow_mut().push(format!("resume {}", self.id));
            Ok(())
        }

        fn stop(&mut self) {
            if !self.stopped {
                self.stopped = true;
                self.log.borrow_mut().push(format!("stop {}", self.id));
            }
        }

        fn is_finished(&mut self) -> bool {
            self.stopped || self.finished.get()
        }
    }

    struct FakeBackend {
        provider: SpeechProvider,
        log: Log,
        counter: Rc<Cell<usize>>,
        failure: Option<fn() -> VoxError>,
        pausable: bool,
        finished: Rc<Cell<bool>>,
    }

    #[async_trait(?Send)]
    impl SpeechBackend for FakeBackend {
        fn provider(&self) -> SpeechProvider {
            self.provider
        }

        async fn start(&mut self, request: &SpeechRequest) -> Result<Box<dyn SpeechOutput>> {
            if let Some(failure) = self.failure {
                self.log.borrow_mut().push(format!("fail {}", self.provider.id()));
                return Err(failure());
            }
            let id = self.counter.get() + 1;
            self.counter.set(id);
            self.log
                .borrow_mut()
                .push(format!("start {} {} {:?}", self.provider.id(), id, request.voice));
            Ok(Box::new(FakeOutput {
                id,
                log: Rc::clone(&self.log),
                pausable: self.pausable,
                finished: Rc::clone(&self.finished),
                stopped: false,
            }))
        }
    }

    struct Harness {
        session: SpeechSession,
        log: Log,
        finished: Rc<Cell<bool>>,
    }

    fn harness(premium_failure: Option<fn() -> VoxError>, pausable: bool) -> Harness {
        let log: Log = Rc::default();
        let counter = Rc::new(Cell::new(0));
        let finished = Rc::new(Cell::new(false));
        let mut session = SpeechSession::new();
        for (provider, failure) in [
            (SpeechProvider::System, None),
            (SpeechProvider::ElevenLabs, premium_failure),
        ] {
            session.register(Box::new(FakeBackend {
                provider,
                log: Rc::clone(&log),
                counter: Rc::clone(&counter),
                failure,
                pausable,
                finished: Rc::clone(&finished),
            }));
        }
        Harness {
            session,
            log,
            finished,
        }
    }

    fn voiced(text: &str) -> SpeechRequest {
        SpeechRequest::new(text).with_voice(Some("eleven_rachel".into()))
    }

    #[tokio::test]
    async fn new_speech_cancels_the_previous_one_first() {
        let mut h = harness(None, true);
        h.session.speak(SpeechProvider::System, &SpeechRequest::new("one")).await.unwrap();
        h.session.speak(SpeechProvider::ElevenLabs, &voiced("two")).await.unwrap();

        assert_eq!(
            *h.log.borrow(),
            vec![
                "start browser 1 None",
                "stop 1",
                "start elevenlabs 2 Some(\"eleven_rachel\")",
            ]
        );
        assert_eq!(h.session.state(), SpeechState::Speaking);
        assert_eq!(h.session.active_provider(), Some(SpeechProvider::ElevenLabs));
    }

    #[tokio::test]
    async fn provider_failure_falls_back_to_system_voice() {
        let mut h = harness(Some(|| VoxError::RateLimited { provider: "ElevenLabs".into() }), true);
        let outcome = h
            .session
            .speak(SpeechProvider::ElevenLabs, &voiced("hello"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SpeakOutcome {
                provider: SpeechProvider::System,
                fell_back: true,
            }
        );
        assert_eq!(*h.log.borrow(), vec!["fail elevenlabs", "start browser 1 None"]);
        assert_eq!(h.session.state(), SpeechState::Speaking);
    }

    #[tokio::test]
    async fn missing_api_key_is_not_retried() {
        let mut h = harness(Some(|| VoxError::MissingApiKey { provider: "ElevenLabs".into() }), true);
        let err = h
            .session
            .speak(SpeechProvider::ElevenLabs, &voiced("hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, VoxError::MissingApiKey { .. }));
        assert_eq!(*h.log.borrow(), vec!["fail elevenlabs"]);
        assert_eq!(h.session.state(), SpeechState::Idle);
        assert!(h.session.last_error().unwrap().contains("No API key"));
    }

    #[tokio::test]
    async fn failure_while_speaking_leaves_session_idle() {
        let mut h = harness(Some(|| VoxError::MissingApiKey { provider: "ElevenLabs".into() }), true);
        h.session.speak(SpeechProvider::System, &SpeechRequest::new("one")).await.unwrap();
        assert!(h.session.speak(SpeechProvider::ElevenLabs, &voiced("two")).await.is_err());

        assert_eq!(h.session.state(), SpeechState::Idle);
        assert!(h.session.active_provider().is_none());
        assert_eq!(h.log.borrow()[1], "stop 1");
    }

    #[tokio::test]
    async fn unregistered_provider_falls_back() {
        let mut h = harness(None, true);
        let outcome = h
            .session
            .speak(SpeechProvider::Google, &SpeechRequest::new("hi"))
            .await
            .unwrap();
        assert!(outcome.fell_back);
    }

    #[tokio::test]
    async fn pause_resume_and_stop() {
        let mut h = harness(None, true);
        assert!(matches!(
            h.session.pause(),
            Err(VoxError::InvalidTransition { action: "pause", state: "idle" })
        ));

        h.session.speak(SpeechProvider::System, &SpeechRequest::new("hi")).await.unwrap();
        h.session.toggle_pause().unwrap();
        assert_eq!(h.session.state(), SpeechState::Paused);
        assert!(h.session.pause().is_err());
        h.session.toggle_pause().unwrap();
        assert_eq!(h.session.state(), SpeechState::Speaking);
        h.session.stop();
        assert_eq!(h.session.state(), SpeechState::Idle);
        assert!(h.session.resume().is_err());

        assert_eq!(
            *h.log.borrow(),
            vec!["start browser 1 None", "pause 1", "resume 1", "stop 1"]
        );
    }

    #[tokio::test]
    async fn pause_without_true_pause_stops() {
        let mut h = harness(None, false);
        h.session.speak(SpeechProvider::System, &SpeechRequest::new("hi")).await.unwrap();
        h.session.pause().unwrap();
        assert_eq!(h.session.state(), SpeechState::Idle);
        assert_eq!(h.log.borrow().iter().filter(|l| l.starts_with("stop")).count(), 1);
    }

    #[tokio::test]
    async fn natural_end_returns_to_idle() {
        let mut h = harness(None, true);
        h.session.speak(SpeechProvider::System, &SpeechRequest::new("hi")).await.unwrap();
        assert_eq!(h.session.poll(), SpeechState::Speaking);
        h.finished.set(true);
        assert_eq!(h.session.poll(), SpeechState::Idle);
    }
}
