//! Renaming and deleting recordings from the command line.

use crate::commands::context::{resolve_recording, AppContext};
use cliclack::{confirm, intro, outro};

/// Renames the recording named by `selector`. The audio is left untouched.
pub async fn handle_rename(selector: &str, name: &str) -> anyhow::Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow::anyhow!("Recording name cannot be empty"));
    }

    let context = AppContext::load()?;
    let mut store = context.open_store()?;
    let mut recording = resolve_recording(&mut store, selector)?;
    let previous = std::mem::replace(&mut recording.name, name.to_string());
    let id = recording.id.clone();

    if !store.update(recording) {
        return Err(anyhow::anyhow!("Recording {id} no longer exists"));
    }
    if let Some(error) = store.last_error() {
        return Err(anyhow::anyhow!("{error}"));
    }

    tracing::info!("Renamed {} from \"{}\" to \"{}\"", id, previous, name);
    println!("Renamed \"{previous}\" to \"{name}\"");
    Ok(())
}

/// Deletes the recording named by `selector` after confirmation, unless `yes`.
pub async fn handle_delete(selector: &str, yes: bool) -> anyhow::Result<()> {
    let context = AppContext::load()?;
    let mut store = context.open_store()?;
    let recording = resolve_recording(&mut store, selector)?;

    if !yes {
        intro(" delete ")?;
        let confirmed = confirm(format!("Delete \"{}\"?", recording.name))
            .initial_value(false)
            .interact()
            .map_err(|e| anyhow::anyhow!("Deletion cancelled: {e}"))?;
        if !confirmed {
            outro("Nothing deleted")?;
            return Ok(());
        }
    }

    if !store.delete(&recording.id) {
        return Err(anyhow::anyhow!("Recording {} no longer exists", recording.id));
    }
    if let Some(error) = store.last_error() {
        return Err(anyhow::anyhow!("{error}"));
    }

    if yes {
        println!("Deleted \"{}\"", recording.name);
    } else {
        outro(format!("Deleted \"{}\"", recording.name))?;
    }
    Ok(())
}
