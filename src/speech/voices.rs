//! Installed system voices.

use regex::Regex;

/// A voice offered by the system synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemVoice {
    pub name: String,
    /// Language tag such as `en-us` or `en_GB`
    pub lang: String,
}

impl SystemVoice {
    pub fn is_english(&self) -> bool {
        self.lang.to_ascii_lowercase().starts_with("en")
    }
}

/// Parses the table printed by `espeak-ng --voices` (or `espeak --voices`).
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File          Other Languages
///  5  af              --/M      Afrikaans          gmw/af
///  2  en-us           --/M      English_(America)  gmw/en-US     (en 3)
/// ```
pub fn parse_espeak_voices(output: &str) -> Vec<SystemVoice> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("Pty"))
        .skip(1)
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let _priority = columns.next()?;
            let lang = columns.next()?;
            let _age_gender = columns.next()?;
            let name = columns.next()?;
            Some(SystemVoice {
                name: name.to_string(),
                lang: lang.to_string(),
            })
        })
        .collect()
}

/// Parses the listing printed by macOS `say -v '?'`.
///
/// ```text
/// Alex                en_US    # Most people recognize me by my voice.
/// Bad News            en_US    # The light you see at the end of the tunnel...
/// ```
pub fn parse_say_voices(output: &str) -> Vec<SystemVoice> {
    let Ok(line_re) = Regex::new(r"^(.+?)\s{2,}([A-Za-z]{2,3}[_-][A-Za-z0-9]+)\s+#") else {
        return Vec::new();
    };
    output
        .lines()
        .filter_map(|line| {
            let caps = line_re.captures(line)?;
            Some(SystemVoice {
                name: caps[1].trim().to_string(),
                lang: caps[2].to_string(),
            })
        })
        .collect()
}

/// Picks the voice used when none is requested.
///
/// Prefers an English voice marketed as high quality, then any English voice,
/// then whatever comes first.
pub fn pick_default_voice(voices: &[SystemVoice]) -> Option<&SystemVoice> {
    const QUALITY_MARKERS: [&str; 3] = ["Google", "Neural", "Premium"];

    voices
        .iter()
        .find(|v| v.is_english() && QUALITY_MARKERS.iter().any(|m| v.name.contains(m)))
        .or_else(|| voices.iter().find(|v| v.is_english()))
        .or_else(|| voices.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESPEAK: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  de              --/M      German             gmw/de
 2  en-us           --/M      English_(America)  gmw/en-US            (en 3)
";

    const SAY: &str = "\
Amélie              fr_CA    # Bonjour, je m’appelle Amélie.
Bad News            en_US    # The light you see at the end of the tunnel is the headlamp of a fast approaching train.
Samantha (Premium)  en_US    # Hello, my name is Samantha.
";

    #[test]
    fn espeak_table_is_parsed_after_header() {
        let voices = parse_espeak_voices(ESPEAK);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[2].name, "English_(America)");
        assert_eq!(voices[2].lang, "en-us");
    }

    #[test]
    fn say_listing_keeps_multi_word_names() {
        let voices = parse_say_voices(SAY);
        assert_eq!(voices.len(), 3);
        assert_eq!(voices[1].name, "Bad News");
        assert_eq!(voices[0].lang, "fr_CA");
    }

    #[test]
    fn default_prefers_premium_english() {
        let voices = parse_say_voices(SAY);
        assert_eq!(pick_default_voice(&voices).unwrap().name, "Samantha (Premium)");
    }

    #[test]
    fn default_falls_back_to_english_then_first() {
        let voices = parse_espeak_voices(ESPEAK);
        assert_eq!(pick_default_voice(&voices).unwrap().lang, "en-us");

        let german = vec![SystemVoice {
            name: "German".into(),
            lang: "de".into(),
        }];
        assert_eq!(pick_default_voice(&german).unwrap().name, "German");
        assert!(pick_default_voice(&[]).is_none());
    }
}
