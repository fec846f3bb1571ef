//! The platform speech synthesizer, driven as a child process.
//!
//! espeak-ng and espeak take rate, pitch and amplitude flags. macOS `say` only
//! takes a words-per-minute rate, so volume goes in as an embedded command.
//! Pause and resume stop and continue the process.

use crate::config::SpeechConfig;
use crate::error::{Result, VoxError};
use crate::speech::backend::{PauseOutcome, SpeechBackend, SpeechOutput, SpeechRequest, VoiceParams};
use crate::speech::provider::SpeechProvider;
use crate::speech::text::{TextOptions, TextProcessor};
use crate::speech::voices::{self, SystemVoice};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

const PROGRAMS: [&str; 3] = ["espeak-ng", "espeak", "say"];

/// Speaking rate of the synthesizers at `rate = 1.0`, in words per minute.
const BASE_WPM: f32 = 175.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthKind {
    Espeak,
    Say,
}

impl SynthKind {
    fn for_program(program: &str) -> Self {
        let name = std::path::Path::new(program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name == "say" {
            SynthKind::Say
        } else {
            SynthKind::Espeak
        }
    }
}

pub(crate) fn is_on_path(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Backend for [`SpeechProvider::System`].
#[derive(Debug, Clone)]
pub struct SystemSynthesizer {
    program: PathBuf,
    kind: SynthKind,
    text: TextProcessor,
    options: TextOptions,
}

impl SystemSynthesizer {
    pub fn new(program: impl Into<String>, text: TextProcessor, options: TextOptions) -> Self {
        let program = program.into();
        Self {
            kind: SynthKind::for_program(&program),
            program: PathBuf::from(program),
            text,
            options,
        }
    }

    /// Uses the configured program, or the first of espeak-ng, espeak, say found on `PATH`.
    pub fn detect(config: &SpeechConfig, text: TextProcessor, options: TextOptions) -> Result<Self> {
        let program = match &config.synthesizer {
            Some(program) if !program.trim().is_empty() => program.clone(),
            _ => PROGRAMS
                .iter()
                .find(|p| is_on_path(p))
                .map(|p| p.to_string())
                .ok_or_else(|| VoxError::Unsupported {
                    reason: "no speech synthesizer found; install espeak-ng".to_string(),
                })?,
        };
        tracing::debug!("Using speech synthesizer: {}", program);
        Ok(Self::new(program, text, options))
    }

    #[cfg(test)]
    pub fn kind(&self) -> SynthKind {
        self.kind
    }

    /// Lists installed voices.
    pub fn voices(&self) -> Result<Vec<SystemVoice>> {
        let mut command = Command::new(&self.program);
        match self.kind {
            SynthKind::Espeak => command.arg("--voices"),
            SynthKind::Say => command.args(["-v", "?"]),
        };
        let output = command
            .output()
            .map_err(|e| VoxError::device(format!("Failed to run {}: {e}", self.program.display())))?;
        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(match self.kind {
            SynthKind::Espeak => voices::parse_espeak_voices(&listing),
            SynthKind::Say => voices::parse_say_voices(&listing),
        })
    }

    /// Arguments for one utterance, text last.
    pub fn command_args(&self, voice: Option<&str>, params: VoiceParams, text: &str) -> Vec<String> {
        let wpm = (BASE_WPM * params.rate).round() as u32;
        let mut args = Vec::new();
        if let Some(voice) = voice {
            args.push("-v".to_string());
            args.push(voice.to_string());
        }
        match self.kind {
            SynthKind::Espeak => {
                // espeak pitch is 0..99 around 50, amplitude 0..200 around 100
                let pitch = (50.0 * params.pitch).round().clamp(0.0, 99.0) as u32;
                let amplitude = (100.0 * params.volume).round() as u32;
                args.extend([
                    "-s".to_string(),
                    wpm.to_string(),
                    "-p".to_string(),
                    pitch.to_string(),
                    "-a".to_string(),
                    amplitude.to_string(),
                    "--".to_string(),
                    text.to_string(),
                ]);
            }
            SynthKind::Say => {
                args.extend([
                    "-r".to_string(),
                    wpm.to_string(),
                    format!("[[volm {:.2}]] {text}", params.volume),
                ]);
            }
        }
        args
    }

    fn default_voice(&self) -> Option<String> {
        match self.voices() {
            Ok(voices) => voices::pick_default_voice(&voices).map(|v| v.name.clone()),
            Err(e) => {
                tracing::warn!("Could not list system voices: {}", e);
                None
            }
        }
    }
}

#[async_trait(?Send)]
impl SpeechBackend for SystemSynthesizer {
    fn provider(&self) -> SpeechProvider {
        SpeechProvider::System
    }

    async fn start(&mut self, request: &SpeechRequest) -> Result<Box<dyn SpeechOutput>> {
        let voice = request.voice.clone().or_else(|| self.default_voice());
        let text = self.text.for_system(&request.text, self.options);
        let args = self.command_args(voice.as_deref(), request.params, &text);
        tracing::debug!(
            "Speaking {} chars with {} (voice {:?})",
            text.len(),
            self.program.display(),
            voice
        );

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VoxError::device(format!("Failed to start {}: {e}", self.program.display())))?;
        Ok(Box::new(ProcessOutput { child, done: false }))
    }
}

/// A running synthesizer process.
struct ProcessOutput {
    child: Child,
    done: bool,
}

impl ProcessOutput {
    #[cfg(unix)]
    fn signal(&self, signal: libc::c_int) -> Result<()> {
        let pid = libc::pid_t::try_from(self.child.id())
            .map_err(|_| VoxError::device("synthesizer pid out of range"))?;
        // SAFETY: kill has no memory-safety preconditions; pid is our own child.
        let rc = unsafe { libc::kill(pid, signal) };
        if rc == 0 {
            Ok(())
        } else {
            Err(VoxError::device(format!(
                "Failed to signal synthesizer: {}",
                std::io::Error::last_os_error()
            )))
        }
    }
}

impl SpeechOutput for ProcessOutput {
    #[cfg(unix)]
    fn pause(&mut self) -> Result<PauseOutcome> {
        self.signal(libc::SIGSTOP)?;
        Ok(PauseOutcome::Paused)
    }

    #[cfg(not(unix))]
    fn pause(&mut self) -> Result<PauseOutcome> {
        self.stop();
        Ok(PauseOutcome::Stopped)
    }

    #[cfg(unix)]
    fn resume(&mut self) -> Result<()> {
        self.signal(libc::SIGCONT)
    }

    #[cfg(not(unix))]
    fn resume(&mut self) -> Result<()> {
        Err(VoxError::Unsupported {
            reason: "resuming the system voice on this platform".to_string(),
        })
    }

    fn stop(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if let Err(e) = self.child.kill() {
            tracing::debug!("Synthesizer already exited: {}", e);
        }
        let _ = self.child.wait();
    }

    fn is_finished(&mut self) -> bool {
        if self.done {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!("Synthesizer exited: {}", status);
                self.done = true;
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Lost track of synthesizer: {}", e);
                self.done = true;
                true
            }
        }
    }
}

impl Drop for ProcessOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
