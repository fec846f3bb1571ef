//! Browsing the recording library.

use crate::commands::context::AppContext;
use crate::commands::play::run_player;
use crate::recording::{format_duration, RecordingStore};
use crate::ui::{LibraryAction, LibraryViewer};

/// Opens the library browser, or prints the list with `plain`.
///
/// The browser returns to the list after playing, renaming or deleting, with
/// the touched entry still selected where possible.
pub async fn handle_list(plain: bool) -> anyhow::Result<()> {
    tracing::info!("=== voxmemo Library ===");
    let context = AppContext::load()?;
    let mut store = context.open_store()?;

    if plain {
        if let Some(error) = store.list().is_empty().then(|| store.last_error()).flatten() {
            return Err(anyhow::anyhow!("Failed to load recordings: {error}"));
        }
        for (index, recording) in store.list().iter().enumerate() {
            println!(
                "{:>3}  {}  {:>5}  {}  {}",
                index + 1,
                recording.date.format("%Y-%m-%d %H:%M"),
                format_duration(u64::from(recording.duration)),
                recording.id,
                recording.name
            );
        }
        return Ok(());
    }

    let palette = context.palette();
    let mut selected: Option<usize> = None;
    let mut filter = String::new();
    let mut status = store.last_error().map(|e| format!("Failed to load recordings: {e}"));

    loop {
        let recordings = store.list().to_vec();
        let action = {
            let mut viewer = LibraryViewer::new(recordings.clone(), selected, &filter, palette, status.take())?;
            let action = viewer.run()?;
            filter = viewer.filter().to_string();
            action
        };
        let position = |id: &str| recordings.iter().position(|r| r.id == id);

        match action {
            LibraryAction::Play(id) => {
                selected = position(&id);
                if let Some(recording) = recordings.iter().find(|r| r.id == id) {
                    tracing::info!("Playing {} from the library", id);
                    run_player(&store, recording, palette)?;
                }
            }
            LibraryAction::Rename { id, name } => {
                selected = position(&id);
                status = if rename_recording(&mut store, &id, &name) {
                    Some(format!("Renamed to \"{name}\""))
                } else {
                    Some("Recording no longer exists".to_string())
                };
            }
            LibraryAction::Delete(id) => {
                selected = position(&id).map(|i| i.saturating_sub(1));
                status = if store.delete(&id) {
                    Some("Recording deleted".to_string())
                } else {
                    Some("Recording no longer exists".to_string())
                };
            }
            LibraryAction::Exit => break,
        }

        if let Some(error) = store.last_error() {
            status = Some(format!("Warning: {error}"));
        }
    }

    tracing::info!("Library closed");
    Ok(())
}

/// Renames recording `id` in place; false when it no longer exists.
fn rename_recording(store: &mut RecordingStore, id: &str, name: &str) -> bool {
    let renamed = store.get(id).cloned().map(|mut recording| {
        recording.name = name.to_string();
        recording
    });
    match renamed {
        Some(recording) => store.update(recording),
        None => false,
    }
}
