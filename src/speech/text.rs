//! Text shaping for more natural-sounding speech.
//!
//! The system synthesizer gets plain text with stretched punctuation. Premium
//! providers get SSML breaks and emphasis, or the same text with the markup
//! stripped when SSML is off.

use crate::error::{Result, VoxError};
use regex::Regex;

/// How text is prepared before synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOptions {
    pub natural_pauses: bool,
    pub ssml: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            natural_pauses: true,
            ssml: true,
        }
    }
}

/// Compiled rewrite rules.
#[derive(Debug, Clone)]
pub struct TextProcessor {
    emphasis: Regex,
    sentence_end: Regex,
    markup: Regex,
}

impl TextProcessor {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| VoxError::conversion(format!("text rule {pattern}: {e}")))
        };
        Ok(Self {
            emphasis: compile(r"\*([^*]+)\*")?,
            sentence_end: compile(r"([.?!])")?,
            markup: compile(r#"<break time="[^"]+"/?>|</?emphasis>"#)?,
        })
    }

    /// Plain text for the system synthesizer.
    ///
    /// Periods become long pauses, commas get a trailing space, and `*word*`
    /// is stressed by repetition.
    pub fn for_system(&self, text: &str, options: TextOptions) -> String {
        if !options.natural_pauses {
            return text.to_string();
        }
        let stretched = text.replace('.', "... ").replace(',', ", ");
        self.emphasis.replace_all(&stretched, "$1 $1").into_owned()
    }

    /// Text for a premium provider, SSML or plain depending on `options`.
    pub fn for_premium(&self, text: &str, options: TextOptions) -> String {
        if !options.natural_pauses {
            return text.to_string();
        }

        let paused = text.replace(',', r#", <break time="200ms"/>"#);
        let paused = self
            .sentence_end
            .replace_all(&paused, r#"$1 <break time="400ms"/>"#);
        let emphasized = self
            .emphasis
            .replace_all(&paused, "<emphasis>$1</emphasis>");

        if options.ssml {
            format!("<speak>{emphasized}</speak>")
        } else {
            self.markup.replace_all(&emphasized, "").into_owned()
        }
    }
}

/// Whether `text` is already wrapped in SSML.
pub fn is_ssml(text: &str) -> bool {
    text.trim_start().starts_with("<speak>")
}
