//! Viewing and changing the stored settings and theme.

use crate::commands::context::AppContext;
use crate::config::{AudioQuality, Theme};
use cliclack::{confirm, intro, outro, select};

/// Languages offered for the `language` setting.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("english", "English"),
    ("korean", "Korean"),
    ("spanish", "Spanish"),
    ("french", "French"),
    ("german", "German"),
    ("japanese", "Japanese"),
];

/// Prints the current settings and theme.
pub fn handle_settings_show() -> anyhow::Result<()> {
    let context = AppContext::load()?;
    let settings = context.preferences.settings();
    println!("Audio quality:  {}", settings.audio_quality);
    println!("Auto-save:      {}", if settings.auto_save { "on" } else { "off" });
    println!("Language:       {}", language_label(&settings.language));
    println!("Theme:          {}", context.preferences.theme());
    Ok(())
}

/// Sets the recording quality, asking when `quality` is not given.
pub fn handle_quality(quality: Option<AudioQuality>) -> anyhow::Result<()> {
    let mut context = AppContext::load()?;
    let quality = match quality {
        Some(quality) => quality,
        None => {
            intro(" settings ")?;
            let mut prompt = select("Audio quality for new recordings:")
                .initial_value(context.preferences.settings().audio_quality);
            for quality in AudioQuality::ALL {
                prompt = prompt.item(quality, quality.label(), format!("{} kbps", quality.bitrate() / 1000));
            }
            prompt
                .interact()
                .map_err(|e| anyhow::anyhow!("Selection cancelled: {e}"))?
        }
    };

    context.preferences.update_settings(|s| s.audio_quality = quality)?;
    println!("Audio quality set to {quality}");
    Ok(())
}

/// Turns auto-save on or off, asking when `enabled` is not given.
pub fn handle_auto_save(enabled: Option<bool>) -> anyhow::Result<()> {
    let mut context = AppContext::load()?;
    let enabled = match enabled {
        Some(enabled) => enabled,
        None => {
            intro(" settings ")?;
            confirm("Save recordings without asking?")
                .initial_value(context.preferences.settings().auto_save)
                .interact()
                .map_err(|e| anyhow::anyhow!("Selection cancelled: {e}"))?
        }
    };

    context.preferences.update_settings(|s| s.auto_save = enabled)?;
    println!("Auto-save {}", if enabled { "on" } else { "off" });
    Ok(())
}

/// Sets the interface language, asking when `language` is not given.
pub fn handle_language(language: Option<String>) -> anyhow::Result<()> {
    let mut context = AppContext::load()?;
    let language = match language {
        Some(language) => normalize_language(&language)?,
        None => {
            intro(" settings ")?;
            let current = context.preferences.settings().language.clone();
            let mut prompt = select("Language:");
            if LANGUAGES.iter().any(|(id, _)| *id == current) {
                prompt = prompt.initial_value(current.as_str());
            }
            for (id, label) in LANGUAGES {
                prompt = prompt.item(*id, *label, "");
            }
            prompt
                .interact()
                .map_err(|e| anyhow::anyhow!("Selection cancelled: {e}"))?
                .to_string()
        }
    };

    context.preferences.update_settings(|s| s.language = language.clone())?;
    println!("Language set to {}", language_label(&language));
    Ok(())
}

/// Switches to `theme`, or flips the current theme when none is given.
pub fn handle_theme(theme: Option<Theme>) -> anyhow::Result<()> {
    let mut context = AppContext::load()?;
    let theme = match theme {
        Some(theme) => {
            context.preferences.set_theme(theme)?;
            theme
        }
        None => context.preferences.toggle_theme()?,
    };
    outro(format!("Theme set to {theme}"))?;
    Ok(())
}

fn normalize_language(input: &str) -> anyhow::Result<String> {
    let wanted = input.trim().to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(id, label)| *id == wanted || label.eq_ignore_ascii_case(&wanted))
        .map(|(id, _)| id.to_string())
        .ok_or_else(|| {
            let known: Vec<&str> = LANGUAGES.iter().map(|(id, _)| *id).collect();
            anyhow::anyhow!("Unknown language '{input}'. Choose one of: {}", known.join(", "))
        })
}

fn language_label(id: &str) -> &str {
    LANGUAGES
        .iter()
        .find(|(known, _)| *known == id)
        .map(|(_, label)| *label)
        .unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_accepts_id_or_label() {
        assert_eq!(normalize_language("korean").unwrap(), "korean");
        assert_eq!(normalize_language(" French ").unwrap(), "french");
        assert!(normalize_language("klingon").is_err());
    }

    #[test]
    fn unknown_stored_language_is_shown_as_is() {
        assert_eq!(language_label("german"), "German");
        assert_eq!(language_label("esperanto"), "esperanto");
    }
}
