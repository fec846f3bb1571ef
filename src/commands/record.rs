//! Microphone recording into the library.
//!
//! Shows the live level waveform and elapsed time while recording. Supports an
//! external save trigger via the SIGUSR1 signal.

use crate::commands::context::{show_error, AppContext};
use crate::config::AudioQuality;
use crate::recording::{
    default_recording_name, format_duration, CaptureSession, CaptureState, MicrophoneSource,
    NewRecording, RecorderCommand, RecorderTui, RecorderView, SystemClock,
};
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Input samples handed to the level meter per frame.
const METER_WINDOW: usize = 2048;

/// Records from the configured microphone and saves the result to the library.
///
/// `quality` overrides the saved audio quality setting for this recording and
/// `name` skips the naming prompt.
pub async fn handle_record(quality: Option<AudioQuality>, name: Option<String>) -> anyhow::Result<()> {
    tracing::info!("=== voxmemo Recorder Started ===");

    let context = AppContext::load()?;
    let palette = context.palette();
    let settings = context.preferences.settings().clone();
    let quality = quality.unwrap_or(settings.audio_quality);
    tracing::info!(
        "Configuration loaded: device={}, sample_rate={}Hz, codec={}, quality={}",
        context.config.audio.device,
        context.config.audio.sample_rate,
        context.config.audio.output_format,
        quality
    );

    let mut store = context.open_store()?;
    let started_at = Local::now();
    let mut session = CaptureSession::new(MicrophoneSource::new(&context.config.audio), SystemClock, quality);

    if let Err(e) = session.start() {
        show_error(
            palette,
            &format!("Recording Error:\n\n{e}\n\nPlease check your microphone and audio configuration."),
        );
        return Err(e.into());
    }

    let mut tui = RecorderTui::new(palette).map_err(|e| anyhow::anyhow!("Failed to initialize UI: {e}"))?;

    let external_save = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&external_save))
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    tracing::debug!("Entering recording loop. Press 'Enter' to save or 'Escape'/'q' to discard.");
    let keep = loop {
        if external_save.load(Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: saving via external trigger");
            break true;
        }

        match tui.handle_input()? {
            RecorderCommand::Continue => {}
            RecorderCommand::Save => break true,
            RecorderCommand::Cancel => break false,
            RecorderCommand::TogglePause => {
                if let Err(e) = session.toggle_pause() {
                    tracing::warn!("Pause toggle ignored: {}", e);
                }
            }
        }

        let samples = session.source().recent_levels(METER_WINDOW);
        tui.render(&RecorderView {
            elapsed_secs: session.elapsed_secs(),
            paused: session.state() == CaptureState::Paused,
            samples: &samples,
            quality,
        })
        .map_err(|e| anyhow::anyhow!("Render failed: {e}"))?;
    };

    if !keep {
        session.cancel();
        tui.cleanup()?;
        tracing::info!("=== voxmemo Recorder Exited, recording discarded ===");
        return Ok(());
    }

    let outcome = match session.stop() {
        Ok(outcome) => outcome,
        Err(e) => {
            tui.cleanup().ok();
            show_error(palette, &format!("Error: Failed to finish the recording\n\n{e}"));
            return Err(e.into());
        }
    };

    if !settings.auto_save && !tui.confirm_save(outcome.elapsed_secs)? {
        tui.cleanup()?;
        tracing::info!("Recording discarded at the save prompt");
        return Ok(());
    }

    let default_name = default_recording_name(started_at);
    let name = match name {
        Some(name) => name,
        None => tui.prompt_name(&default_name)?.unwrap_or(default_name),
    };
    tui.cleanup()?;

    let recording = store
        .add(NewRecording::new(name, outcome.elapsed_secs), Some(outcome.blob))
        .map_err(|e| {
            tracing::error!("Failed to save recording: {}", e);
            e
        })?;
    if let Some(error) = store.last_error() {
        eprintln!("Warning: the recording list could not be written: {error}");
    }

    println!(
        "Saved \"{}\" ({}) as {}",
        recording.name,
        format_duration(u64::from(recording.duration)),
        recording.id
    );
    tracing::info!("=== voxmemo Recorder Exited Successfully ===");
    Ok(())
}
