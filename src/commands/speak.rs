//! Reading text aloud and listing the available voices.

use crate::commands::context::{show_error, AppContext};
use crate::config::VoxConfig;
use crate::playback::{CpalElement, PlaybackElement};
use crate::speech::{
    list_trained_voices, pick_default_voice, ElementFactory, FfmpegConverter, RemoteBackend,
    SpeakerCommand, SpeakerTui, SpeakerView, SpeechProvider, SpeechRequest, SpeechSession, SpeechState,
    SystemSynthesizer, TextOptions, TextProcessor, TrainedVoiceBackend, VoiceParams, PREMIUM_VOICES,
};
use crate::speech::backend::{DEFAULT_PITCH, DEFAULT_RATE, DEFAULT_VOLUME};
use std::path::PathBuf;
use std::time::Duration;

/// Options for one `speak` run.
#[derive(Debug, Clone, Default)]
pub struct SpeakArgs {
    pub text: Option<String>,
    pub file: Option<PathBuf>,
    pub provider: Option<String>,
    pub voice: Option<String>,
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    /// Speak without the speaker screen and exit when done
    pub plain: bool,
    pub no_ssml: bool,
    pub no_pauses: bool,
}

impl SpeakArgs {
    fn text_options(&self) -> TextOptions {
        TextOptions {
            natural_pauses: !self.no_pauses,
            ssml: !self.no_ssml,
        }
    }

    fn params(&self) -> VoiceParams {
        VoiceParams::new(
            self.rate.unwrap_or(DEFAULT_RATE),
            self.pitch.unwrap_or(DEFAULT_PITCH),
            self.volume.unwrap_or(DEFAULT_VOLUME),
        )
    }

    fn load_text(&self) -> anyhow::Result<String> {
        let text = match (&self.text, &self.file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?,
            (None, None) => return Err(anyhow::anyhow!("Nothing to speak. Pass text or --file <path>")),
        };
        if text.trim().is_empty() {
            return Err(anyhow::anyhow!("Nothing to speak: the text is empty"));
        }
        Ok(text)
    }
}

fn parse_provider(id: Option<&str>) -> anyhow::Result<SpeechProvider> {
    match id {
        None => Ok(SpeechProvider::System),
        Some(id) => SpeechProvider::from_id(&id.trim().to_ascii_lowercase()).ok_or_else(|| {
            let known: Vec<&str> = SpeechProvider::all().iter().map(|p| p.id()).collect();
            anyhow::anyhow!("Unknown provider '{id}'. Choose one of: {}", known.join(", "))
        }),
    }
}

fn element_factory() -> ElementFactory {
    std::rc::Rc::new(|| Box::new(CpalElement::new()) as Box<dyn PlaybackElement>)
}

/// Registers every backend that can be built from `config`.
///
/// Returns the session and the system synthesizer, when one was found.
fn build_session(
    config: &VoxConfig,
    options: TextOptions,
) -> anyhow::Result<(SpeechSession, Option<SystemSynthesizer>)> {
    let text = TextProcessor::new()?;
    let elements = element_factory();
    let mut session = SpeechSession::new();

    let system = match SystemSynthesizer::detect(&config.speech, text.clone(), options) {
        Ok(system) => {
            session.register(Box::new(system.clone()));
            Some(system)
        }
        Err(e) => {
            tracing::warn!("System voice unavailable: {}", e);
            None
        }
    };

    session.register(Box::new(TrainedVoiceBackend::new(
        config.speech.voices_dir.clone(),
        Box::new(FfmpegConverter),
        elements.clone(),
    )));

    for provider in SpeechProvider::all().iter().filter(|p| p.is_premium()) {
        session.register(Box::new(RemoteBackend::from_config(
            *provider,
            config,
            text.clone(),
            options,
            Box::new(FfmpegConverter),
            elements.clone(),
        )));
    }

    Ok((session, system))
}

/// Reads text aloud with the chosen provider.
pub async fn handle_speak(args: SpeakArgs) -> anyhow::Result<()> {
    tracing::info!("=== voxmemo Speak Command ===");
    let text = args.load_text()?;
    let provider = parse_provider(args.provider.as_deref())?;
    let context = AppContext::load()?;
    let (mut session, system) = build_session(&context.config, args.text_options())?;

    let voice = match (&args.voice, provider, &system) {
        (Some(voice), _, _) => Some(voice.clone()),
        (None, SpeechProvider::System, Some(system)) => system
            .voices()
            .ok()
            .and_then(|voices| pick_default_voice(&voices).map(|v| v.name.clone())),
        _ => None,
    };
    let request = SpeechRequest::new(text.clone())
        .with_voice(voice.clone())
        .with_params(args.params());

    if args.plain {
        let outcome = session.speak(provider, &request).await?;
        if outcome.fell_back {
            eprintln!("{} failed, using the system voice instead", provider.name());
        }
        while session.poll() != SpeechState::Idle {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        return Ok(());
    }

    let palette = context.palette();
    let mut notice: Option<String> = None;
    let mut spoken_voice = voice.clone();

    let outcome = match session.speak(provider, &request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            show_error(palette, &format!("Speech Error:\n\n{e}"));
            return Err(e.into());
        }
    };
    if outcome.fell_back {
        notice = Some(format!("{} failed, using the system voice instead", provider.name()));
        spoken_voice = None;
    }

    let mut tui = SpeakerTui::new(palette)?;
    loop {
        session.poll();
        tui.render(&SpeakerView {
            text: &text,
            state: session.state(),
            provider: session.active_provider(),
            voice: spoken_voice.as_deref(),
            notice: notice.as_deref(),
        })?;

        match tui.handle_input()? {
            SpeakerCommand::Continue => {}
            SpeakerCommand::TogglePause => {
                if let Err(e) = session.toggle_pause() {
                    tracing::debug!("Pause toggle ignored: {}", e);
                }
            }
            SpeakerCommand::Restart => match session.speak(provider, &request).await {
                Ok(outcome) => {
                    notice = outcome
                        .fell_back
                        .then(|| format!("{} failed, using the system voice instead", provider.name()));
                    spoken_voice = if outcome.fell_back { None } else { voice.clone() };
                }
                Err(e) => {
                    tracing::warn!("Restart failed: {}", e);
                    notice = session.last_error().map(|error| format!("Speech failed: {error}"));
                }
            },
            SpeakerCommand::Close => break,
        }
    }

    session.stop();
    tui.cleanup()?;
    tracing::info!("Speaker closed");
    Ok(())
}

/// Lists system voices, trained voice samples and the premium catalog,
/// or only the voices of `provider`.
pub async fn handle_voices(provider: Option<&str>) -> anyhow::Result<()> {
    let only = provider.map(|id| parse_provider(Some(id))).transpose()?;
    let wanted = |p: SpeechProvider| only.map_or(true, |only| only == p);
    let context = AppContext::load()?;
    let config = &context.config;

    if wanted(SpeechProvider::System) {
        println!("System voices:");
        match SystemSynthesizer::detect(&config.speech, TextProcessor::new()?, TextOptions::default())
            .and_then(|system| system.voices())
        {
            Ok(voices) if voices.is_empty() => println!("  (none reported)"),
            Ok(voices) => {
                let default = pick_default_voice(&voices).map(|v| v.name.clone());
                for voice in &voices {
                    let marker = if Some(&voice.name) == default.as_ref() { "*" } else { " " };
                    println!(" {marker} {:<24} {}", voice.name, voice.lang);
                }
            }
            Err(e) => println!("  unavailable: {e}"),
        }
        println!();
    }

    if wanted(SpeechProvider::Trained) {
        println!("Trained voices:");
        match config.speech.voices_dir.as_deref() {
            None => println!("  (set [speech] voices_dir to use trained voices)"),
            Some(dir) => match list_trained_voices(dir) {
                Ok(voices) if voices.is_empty() => println!("  (no samples in {})", dir.display()),
                Ok(voices) => voices.iter().for_each(|v| println!("   {v}")),
                Err(e) => println!("  unavailable: {e}"),
            },
        }
        println!();
    }

    let premium: Vec<_> = PREMIUM_VOICES.iter().filter(|v| wanted(v.provider)).collect();
    if !premium.is_empty() {
        println!("Premium voices:");
        for voice in premium {
            let key = if config.api_key(voice.provider.id()).is_some() { "" } else { "  (no API key)" };
            println!(
                "   {:<18} {:<8} {:<13} {}{key}",
                voice.id,
                format!("{:?}", voice.gender).to_lowercase(),
                voice.provider.name(),
                voice.description
            );
        }
    }
    Ok(())
}
