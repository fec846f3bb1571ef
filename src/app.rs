//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::config::{AudioQuality, Theme};
use crate::logging;
use anyhow::anyhow;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// Writes the default configuration on first run.
fn check_and_run_setup() -> Result<(), anyhow::Error> {
    match crate::setup::ensure_setup() {
        Ok(true) => tracing::info!("First run: default configuration created"),
        Ok(false) => tracing::debug!("Configuration present"),
        Err(e) => {
            tracing::error!("Setup failed: {e}");
            return Err(anyhow!("Setup failed: {e}"));
        }
    }
    Ok(())
}

/// A terminal voice recorder with playback and text-to-speech
#[derive(Parser)]
#[command(name = "voxmemo")]
#[command(version)]
#[command(about = "A terminal voice recorder with playback and text-to-speech")]
#[command(long_about = "A terminal voice recorder with playback and text-to-speech.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n    Record options (-q, -n) can be used without explicitly saying 'record'.\n\nEXAMPLES:\n    # Record a memo and name it\n    $ voxmemo -n \"Standup notes\"\n\n    # Browse the library\n    $ voxmemo list\n\n    # Play the second recording\n    $ voxmemo play 2\n\n    # Read a script aloud with a premium voice\n    $ voxmemo speak --file script.txt --provider elevenlabs --voice eleven_rachel\n\n    # Edit configuration file\n    $ voxmemo config")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/voxmemo/voxmemo.toml\n    Recordings:         ~/.local/share/voxmemo/\n    Logs:               ~/.local/state/voxmemo/voxmemo.log.*"
)]
struct Cli {
    /// Audio quality for this recording (record default command)
    #[arg(short, long, value_enum, global = true)]
    quality: Option<AudioQuality>,

    /// Name for the new recording instead of prompting (record default command)
    #[arg(short, long, value_name = "NAME", global = true)]
    name: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record audio with a live level waveform (default)
    ///
    /// Press Enter to save, Space to pause/resume, Escape/q to discard.
    /// Sending SIGUSR1 saves from outside the terminal.
    #[command(visible_alias = "r")]
    Record {
        /// Audio quality for this recording
        #[arg(short, long, value_enum)]
        quality: Option<AudioQuality>,

        /// Name for the new recording instead of prompting
        #[arg(short, long, value_name = "NAME")]
        name: Option<String>,
    },

    /// Browse the recording library
    ///
    /// Use arrow keys to navigate, Enter to play, r to rename, d to delete.
    #[command(visible_alias = "ls")]
    List {
        /// Print the list instead of opening the browser
        #[arg(long)]
        plain: bool,
    },

    /// Play a recording
    ///
    /// Space play/pause, Left/Right seek 5 s, Up/Down volume, q to close.
    #[command(visible_alias = "p")]
    Play {
        /// Recording id or number from `voxmemo list`
        #[arg(value_name = "ID|N")]
        recording: String,
    },

    /// Rename a recording
    Rename {
        /// Recording id or number from `voxmemo list`
        #[arg(value_name = "ID|N")]
        recording: String,

        /// New name
        #[arg(value_name = "NAME")]
        new_name: String,
    },

    /// Delete a recording and its audio
    #[command(visible_alias = "rm")]
    Delete {
        /// Recording id or number from `voxmemo list`
        #[arg(value_name = "ID|N")]
        recording: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Read text aloud
    ///
    /// Uses the system synthesizer unless another provider is chosen. A failing
    /// provider falls back to the system voice, except for a missing API key.
    ///
    /// Examples:
    ///   voxmemo speak "Hello there"
    ///   voxmemo speak --file notes.txt --rate 1.2
    ///   voxmemo speak "Welcome" --provider google --voice google_wavenet_f
    #[command(visible_alias = "s")]
    Speak {
        /// Text to speak
        text: Option<String>,

        /// Read the text from a file
        #[arg(short, long, value_name = "FILE", conflicts_with = "text")]
        file: Option<PathBuf>,

        /// browser (system), trained, elevenlabs, google or amazon
        #[arg(short, long)]
        provider: Option<String>,

        /// Voice name or premium voice id (see `voxmemo voices`)
        #[arg(short, long)]
        voice: Option<String>,

        /// Speaking rate, 0.5 to 1.5
        #[arg(long)]
        rate: Option<f32>,

        /// Pitch, 0.8 to 1.2
        #[arg(long)]
        pitch: Option<f32>,

        /// Volume, 0 to 1
        #[arg(long)]
        volume: Option<f32>,

        /// Speak without the speaker screen and exit when done
        #[arg(long)]
        plain: bool,

        /// Send plain text to premium providers instead of SSML
        #[arg(long)]
        no_ssml: bool,

        /// Leave punctuation as written
        #[arg(long)]
        no_pauses: bool,
    },

    /// List voices for every provider
    Voices {
        /// Only list voices of this provider
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Switch between the light and dark theme
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Edit audio devices, codecs, synthesizer and provider credentials.
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in voxmemo.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   voxmemo completions bash > voxmemo.bash
    ///   voxmemo completions zsh > _voxmemo
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings (default)
    Show,
    /// Audio quality for new recordings
    Quality {
        #[arg(value_enum)]
        level: Option<AudioQuality>,
    },
    /// Save recordings without asking
    AutoSave {
        #[arg(value_parser = clap::builder::BoolishValueParser::new())]
        enabled: Option<bool>,
    },
    /// Interface language
    Language { language: Option<String> },
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Flip between light and dark (default)
    Toggle,
    Light,
    Dark,
}

/// Treats prompt cancellation as a quiet exit; cliclack has already said so.
fn exit_quietly_if_cancelled(result: anyhow::Result<()>) -> anyhow::Result<()> {
    if let Err(e) = &result {
        let err_msg = e.to_string();
        if err_msg.contains("cancelled") || err_msg.contains("interrupted") {
            process::exit(0);
        }
    }
    result
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If setup fails
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Handle commands that don't need logging or config setup
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "voxmemo", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    logging::init_logging()?;
    check_and_run_setup()?;

    match cli.command {
        None => commands::handle_record(cli.quality, cli.name).await?,
        Some(Commands::Record { quality, name }) => {
            // Explicit record options take precedence over the top-level ones
            commands::handle_record(quality.or(cli.quality), name.or(cli.name)).await?;
        }
        Some(Commands::List { plain }) => commands::handle_list(plain).await?,
        Some(Commands::Play { recording }) => commands::handle_play(&recording).await?,
        Some(Commands::Rename { recording, new_name }) => commands::handle_rename(&recording, &new_name).await?,
        Some(Commands::Delete { recording, yes }) => {
            exit_quietly_if_cancelled(commands::handle_delete(&recording, yes).await)?;
        }
        Some(Commands::Speak {
            text,
            file,
            provider,
            voice,
            rate,
            pitch,
            volume,
            plain,
            no_ssml,
            no_pauses,
        }) => {
            commands::handle_speak(commands::SpeakArgs {
                text,
                file,
                provider,
                voice,
                rate,
                pitch,
                volume,
                plain,
                no_ssml,
                no_pauses,
            })
            .await?;
        }
        Some(Commands::Voices { provider }) => commands::handle_voices(provider.as_deref()).await?,
        Some(Commands::Settings { action }) => {
            let result = match action {
                None | Some(SettingsAction::Show) => commands::handle_settings_show(),
                Some(SettingsAction::Quality { level }) => commands::handle_quality(level),
                Some(SettingsAction::AutoSave { enabled }) => commands::handle_auto_save(enabled),
                Some(SettingsAction::Language { language }) => commands::handle_language(language),
            };
            exit_quietly_if_cancelled(result)?;
        }
        Some(Commands::Theme { action }) => {
            let theme = match action {
                None | Some(ThemeAction::Toggle) => None,
                Some(ThemeAction::Light) => Some(Theme::Light),
                Some(ThemeAction::Dark) => Some(Theme::Dark),
            };
            commands::handle_theme(theme)?;
        }
        Some(Commands::Config) => commands::handle_config()?,
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
