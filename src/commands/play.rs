//! Plays one recording from the library.

use crate::commands::context::{resolve_recording, AppContext};
use crate::playback::{
    CpalElement, PlaybackSession, PlayerCommand, PlayerTui, PlayerView, SEEK_STEP, VOLUME_STEP,
};
use crate::recording::{AudioResolver, Recording};
use crate::ui::Palette;

/// Plays the recording named by `selector` (id or 1-based position).
pub async fn handle_play(selector: &str) -> anyhow::Result<()> {
    tracing::info!("=== voxmemo Play Command ===");
    let context = AppContext::load()?;
    let mut store = context.open_store()?;
    let recording = resolve_recording(&mut store, selector)?;
    run_player(&store, &recording, context.palette())
}

/// Runs the player screen for `recording` until the user closes it.
///
/// A recording whose audio cannot be loaded still opens the player, which
/// shows the failure instead of the transport.
pub(crate) fn run_player(resolver: &impl AudioResolver, recording: &Recording, palette: Palette) -> anyhow::Result<()> {
    let mut session = PlaybackSession::new(CpalElement::new());
    let autoplay = session.select(resolver, recording).is_ok();
    let mut tui = PlayerTui::new(palette)?;

    if autoplay {
        if let Err(e) = session.toggle_play() {
            tracing::warn!("Could not start playback: {}", e);
        }
    }

    loop {
        session.pump();
        tui.render(&PlayerView {
            name: &recording.name,
            state: session.state(),
            current_time: session.current_time(),
            duration: session.duration(),
            is_playing: session.is_playing(),
            volume: session.volume(),
        })?;

        match tui.handle_input()? {
            PlayerCommand::Continue => {}
            PlayerCommand::TogglePlay => {
                if let Err(e) = session.toggle_play() {
                    tracing::warn!("Play toggle ignored: {}", e);
                }
            }
            PlayerCommand::SeekBack => {
                session.seek_by(-SEEK_STEP);
            }
            PlayerCommand::SeekForward => {
                session.seek_by(SEEK_STEP);
            }
            PlayerCommand::VolumeUp => {
                session.set_volume(session.volume() + VOLUME_STEP);
            }
            PlayerCommand::VolumeDown => {
                session.set_volume(session.volume() - VOLUME_STEP);
            }
            PlayerCommand::Close => break,
        }
    }

    session.close();
    tui.cleanup()?;
    Ok(())
}
