//! Encoded audio bytes plus their container type.

use std::fmt;

/// Raw encoded audio bytes for one recording, voice sample or synthesized clip.
///
/// Created once and never mutated; conversions produce new blobs.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioBlob {
    bytes: Vec<u8>,
    mime: String,
}

impl AudioBlob {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Container detected from the leading bytes, ignoring the declared mime type.
    pub fn container(&self) -> AudioContainer {
        AudioContainer::sniff(&self.bytes)
    }
}

impl fmt::Debug for AudioBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBlob")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Audio container families recognised from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioContainer {
    Wav,
    Mp3,
    Ogg,
    Flac,
    WebM,
    Unknown,
}

impl AudioContainer {
    pub fn sniff(bytes: &[u8]) -> Self {
        match bytes {
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Self::Wav,
            [b'I', b'D', b'3', ..] => Self::Mp3,
            [0xFF, second, ..] if second & 0xE0 == 0xE0 => Self::Mp3,
            [b'O', b'g', b'g', b'S', ..] => Self::Ogg,
            [b'f', b'L', b'a', b'C', ..] => Self::Flac,
            [0x1A, 0x45, 0xDF, 0xA3, ..] => Self::WebM,
            _ => Self::Unknown,
        }
    }

    /// Whether a playback element can take this container without conversion.
    pub fn is_directly_playable(&self) -> bool {
        matches!(self, Self::Wav | Self::Mp3)
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Ogg => "audio/ogg",
            Self::Flac => "audio/flac",
            Self::WebM => "audio/webm",
            Self::Unknown => "application/octet-stream",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
            Self::WebM => "webm",
            Self::Unknown => "bin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_containers() {
        let mut wav = b"RIFF\0\0\0\0WAVEfmt ".to_vec();
        wav.extend_from_slice(&[0; 8]);
        assert_eq!(AudioContainer::sniff(&wav), AudioContainer::Wav);
        assert_eq!(AudioContainer::sniff(b"ID3\x04\0"), AudioContainer::Mp3);
        assert_eq!(AudioContainer::sniff(&[0xFF, 0xFB, 0x90]), AudioContainer::Mp3);
        assert_eq!(AudioContainer::sniff(b"OggS\0\x02"), AudioContainer::Ogg);
        assert_eq!(
            AudioContainer::sniff(&[0x1A, 0x45, 0xDF, 0xA3, 0x9F]),
            AudioContainer::WebM
        );
        assert_eq!(AudioContainer::sniff(b"hello"), AudioContainer::Unknown);
        assert_eq!(AudioContainer::sniff(&[]), AudioContainer::Unknown);
    }

    #[test]
    fn only_wav_and_mp3_are_directly_playable() {
        assert!(AudioContainer::Wav.is_directly_playable());
        assert!(AudioContainer::Mp3.is_directly_playable());
        assert!(!AudioContainer::WebM.is_directly_playable());
        assert!(!AudioContainer::Unknown.is_directly_playable());
    }

    #[test]
    fn debug_output_omits_payload() {
        let blob = AudioBlob::new(vec![1, 2, 3], "audio/webm");
        let shown = format!("{blob:?}");
        assert!(shown.contains("len: 3"));
        assert!(shown.contains("audio/webm"));
    }
}
