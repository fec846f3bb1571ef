//! Microphone capture session: one device acquisition, one finished blob.
//!
//! The session is a small state machine over a [`CaptureSource`]. Elapsed time
//! is tracked against a [`Clock`] and only advances while recording, so pausing
//! freezes the counter in lockstep with the source.

use crate::config::AudioQuality;
use crate::error::{Result, VoxError};
use crate::media::AudioBlob;
use std::time::{Duration, Instant};

/// Lifecycle of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Paused,
    /// Terminal; a new session is needed to record again
    Stopped,
}

impl CaptureState {
    fn name(self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Recording => "recording",
            CaptureState::Paused => "paused",
            CaptureState::Stopped => "stopped",
        }
    }
}

/// Fixed capture preferences plus the encoder bitrate for the chosen quality.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturePreferences {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub channels: u16,
    pub sample_rate: u32,
    pub bitrate: u32,
}

impl CapturePreferences {
    pub fn for_quality(quality: AudioQuality) -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            channels: 1,
            sample_rate: 44_100,
            bitrate: quality.bitrate(),
        }
    }
}

/// Something that can turn microphone input into an encoded blob.
pub trait CaptureSource {
    /// Acquires the device and starts buffering.
    fn open(&mut self, preferences: &CapturePreferences) -> Result<()>;

    /// Stops or restarts buffering without releasing the device.
    fn set_paused(&mut self, paused: bool);

    /// Finalizes the pipeline and returns everything buffered as one blob.
    fn finish(&mut self) -> Result<AudioBlob>;

    /// Releases the device. Must be safe to call more than once.
    fn release(&mut self);
}

/// Monotonic time source for the elapsed-time counter.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Result of a completed capture.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub blob: AudioBlob,
    /// Active (non-paused) recording time in whole seconds
    pub elapsed_secs: u32,
}

/// One microphone recording from start to finished blob.
pub struct CaptureSession<S: CaptureSource, C: Clock = SystemClock> {
    source: S,
    clock: C,
    preferences: CapturePreferences,
    state: CaptureState,
    active: Duration,
    running_since: Option<Instant>,
    device_held: bool,
}

impl<S: CaptureSource, C: Clock> CaptureSession<S, C> {
    pub fn new(source: S, clock: C, quality: AudioQuality) -> Self {
        Self {
            source,
            clock,
            preferences: CapturePreferences::for_quality(quality),
            state: CaptureState::Idle,
            active: Duration::ZERO,
            running_since: None,
            device_held: false,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Acquires the microphone and starts recording.
    ///
    /// # Errors
    /// - [`VoxError::InvalidTransition`] unless the session is idle
    /// - the source's permission or device error; the session stays idle
    pub fn start(&mut self) -> Result<()> {
        self.expect_state(&[CaptureState::Idle], "start recording")?;

        if let Err(e) = self.source.open(&self.preferences) {
            tracing::error!("Error accessing microphone: {}", e);
            self.source.release();
            return Err(e);
        }
        self.device_held = true;
        self.running_since = Some(self.clock.now());
        self.state = CaptureState::Recording;
        tracing::info!(
            "Recording started ({} kbps)",
            self.preferences.bitrate / 1000
        );
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.expect_state(&[CaptureState::Recording], "pause")?;
        self.source.set_paused(true);
        self.stop_timer();
        self.state = CaptureState::Paused;
        tracing::debug!("Recording paused at {}s", self.elapsed_secs());
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.expect_state(&[CaptureState::Paused], "resume")?;
        self.source.set_paused(false);
        self.running_since = Some(self.clock.now());
        self.state = CaptureState::Recording;
        tracing::debug!("Recording resumed");
        Ok(())
    }

    /// Pauses when recording, resumes when paused.
    pub fn toggle_pause(&mut self) -> Result<()> {
        match self.state {
            CaptureState::Paused => self.resume(),
            _ => self.pause(),
        }
    }

    /// Finalizes the recording and releases the microphone.
    ///
    /// The device is released even when finalizing fails; the session is
    /// stopped either way.
    pub fn stop(&mut self) -> Result<CaptureOutcome> {
        self.expect_state(&[CaptureState::Recording, CaptureState::Paused], "stop")?;
        self.stop_timer();
        let elapsed_secs = self.elapsed_secs();

        let finished = self.source.finish();
        self.release_device();
        self.state = CaptureState::Stopped;

        let blob = finished?;
        tracing::info!("Recording stopped: {}s, {} bytes", elapsed_secs, blob.len());
        Ok(CaptureOutcome { blob, elapsed_secs })
    }

    /// Abandons the recording, releasing the device without producing a blob.
    pub fn cancel(&mut self) {
        if matches!(self.state, CaptureState::Recording | CaptureState::Paused) {
            self.stop_timer();
            self.release_device();
            self.state = CaptureState::Stopped;
            tracing::info!("Recording cancelled");
        }
    }

    /// Whole seconds spent recording, excluding pauses.
    pub fn elapsed_secs(&self) -> u32 {
        let running = self
            .running_since
            .map(|since| self.clock.now().saturating_duration_since(since))
            .unwrap_or_default();
        u32::try_from((self.active + running).as_secs()).unwrap_or(u32::MAX)
    }

    fn stop_timer(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.active += self.clock.now().saturating_duration_since(since);
        }
    }

    fn release_device(&mut self) {
        if self.device_held {
            self.source.release();
            self.device_held = false;
            tracing::debug!("Microphone released");
        }
    }

    fn expect_state(&self, allowed: &[CaptureState], action: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(VoxError::InvalidTransition {
                action,
                state: self.state.name(),
            })
        }
    }
}

impl<S: CaptureSource, C: Clock> Drop for CaptureSession<S, C> {
    fn drop(&mut self) {
        if self.device_held {
            tracing::debug!("Capture session dropped while {}", self.state.name());
            self.release_device();
        }
    }
}
