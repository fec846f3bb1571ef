//! Speech providers and the premium voice catalog.

use serde::{Deserialize, Serialize};

/// A pluggable speech backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeechProvider {
    /// The platform synthesizer (espeak-ng, espeak or say)
    System,
    /// Pre-recorded voice samples from the voice library
    Trained,
    ElevenLabs,
    Google,
    Amazon,
}

impl SpeechProvider {
    pub fn id(&self) -> &'static str {
        match self {
            SpeechProvider::System => "browser",
            SpeechProvider::Trained => "trained",
            SpeechProvider::ElevenLabs => "elevenlabs",
            SpeechProvider::Google => "google",
            SpeechProvider::Amazon => "amazon",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpeechProvider::System => "System voice",
            SpeechProvider::Trained => "Trained voice",
            SpeechProvider::ElevenLabs => "ElevenLabs",
            SpeechProvider::Google => "Google",
            SpeechProvider::Amazon => "Amazon Polly",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "browser" | "system" => Some(SpeechProvider::System),
            "trained" => Some(SpeechProvider::Trained),
            "elevenlabs" => Some(SpeechProvider::ElevenLabs),
            "google" => Some(SpeechProvider::Google),
            "amazon" => Some(SpeechProvider::Amazon),
            _ => None,
        }
    }

    /// Whether the provider is a paid API that needs a key.
    pub fn is_premium(&self) -> bool {
        matches!(
            self,
            SpeechProvider::ElevenLabs | SpeechProvider::Google | SpeechProvider::Amazon
        )
    }

    /// Built-in endpoint, if the provider has a public one.
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            SpeechProvider::ElevenLabs => Some("https://api.elevenlabs.io/v1/text-to-speech"),
            SpeechProvider::Google => Some("https://texttospeech.googleapis.com/v1/text:synthesize"),
            _ => None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            SpeechProvider::System,
            SpeechProvider::Trained,
            SpeechProvider::ElevenLabs,
            SpeechProvider::Google,
            SpeechProvider::Amazon,
        ]
    }
}

impl std::fmt::Display for SpeechProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Female,
    Male,
}

/// A voice offered by a premium provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PremiumVoice {
    pub id: &'static str,
    pub name: &'static str,
    pub gender: Gender,
    pub provider: SpeechProvider,
    pub description: &'static str,
    /// Identifier the provider's API expects
    pub api_voice_id: &'static str,
}

pub const PREMIUM_VOICES: &[PremiumVoice] = &[
    PremiumVoice {
        id: "eleven_rachel",
        name: "Rachel",
        gender: Gender::Female,
        provider: SpeechProvider::ElevenLabs,
        description: "Warm, natural female voice with American accent",
        api_voice_id: "21m00Tcm4TlvDq8ikWAM",
    },
    PremiumVoice {
        id: "eleven_josh",
        name: "Josh",
        gender: Gender::Male,
        provider: SpeechProvider::ElevenLabs,
        description: "Deep, authoritative male voice with British accent",
        api_voice_id: "TxGEqnHWrfWFTfGW9XjX",
    },
    PremiumVoice {
        id: "google_wavenet_f",
        name: "Wavenet Female",
        gender: Gender::Female,
        provider: SpeechProvider::Google,
        description: "Highly natural female voice using neural networks",
        api_voice_id: "en-US-Wavenet-F",
    },
    PremiumVoice {
        id: "google_wavenet_m",
        name: "Wavenet Male",
        gender: Gender::Male,
        provider: SpeechProvider::Google,
        description: "Authentic-sounding male voice with natural pauses",
        api_voice_id: "en-US-Wavenet-D",
    },
    PremiumVoice {
        id: "amazon_joanna",
        name: "Joanna",
        gender: Gender::Female,
        provider: SpeechProvider::Amazon,
        description: "Professional female voice with natural intonation",
        api_voice_id: "Joanna",
    },
    PremiumVoice {
        id: "amazon_matthew",
        name: "Matthew",
        gender: Gender::Male,
        provider: SpeechProvider::Amazon,
        description: "Clear and articulate male voice with American accent",
        api_voice_id: "Matthew",
    },
];

impl PremiumVoice {
    pub fn find(id: &str) -> Option<&'static PremiumVoice> {
        PREMIUM_VOICES.iter().find(|v| v.id == id)
    }

    pub fn for_provider(provider: SpeechProvider) -> impl Iterator<Item = &'static PremiumVoice> {
        PREMIUM_VOICES.iter().filter(move |v| v.provider == provider)
    }

    /// The voice to use for `provider` when none (or a foreign one) was asked for.
    pub fn resolve(provider: SpeechProvider, requested: Option<&str>) -> Option<&'static PremiumVoice> {
        requested
            .and_then(Self::find)
            .filter(|v| v.provider == provider)
            .or_else(|| Self::for_provider(provider).next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for provider in SpeechProvider::all() {
            assert_eq!(SpeechProvider::from_id(provider.id()), Some(*provider));
        }
        assert_eq!(SpeechProvider::from_id("system"), Some(SpeechProvider::System));
    }

    #[test]
    fn each_premium_provider_has_two_voices() {
        for provider in SpeechProvider::all().iter().filter(|p| p.is_premium()) {
            assert_eq!(PremiumVoice::for_provider(*provider).count(), 2);
        }
    }

    #[test]
    fn resolve_ignores_voices_of_other_providers() {
        let voice = PremiumVoice::resolve(SpeechProvider::Google, Some("eleven_josh")).unwrap();
        assert_eq!(voice.id, "google_wavenet_f");
        let voice = PremiumVoice::resolve(SpeechProvider::Amazon, Some("amazon_matthew")).unwrap();
        assert_eq!(voice.api_voice_id, "Matthew");
        assert!(PremiumVoice::resolve(SpeechProvider::System, None).is_none());
    }
}
