//! Turning arbitrary voice audio into something the player can take.
//!
//! Voice samples and provider responses arrive in whatever container their
//! source produced. [`prepare_playable`] walks a fixed chain of attempts and
//! always ends with a clip, substituting silence when nothing else works.

use crate::error::{Result, VoxError};
use crate::media::{self, AudioBlob, PcmBuffer};

/// Sample rate used by the PCM decode pipeline and the silent placeholder.
const GRAPH_SAMPLE_RATE: u32 = 22_050;

/// Container conversions used by the fallback chain.
pub trait AudioConverter {
    fn to_wav(&self, blob: &AudioBlob) -> Result<AudioBlob>;

    fn to_mp3(&self, blob: &AudioBlob) -> Result<AudioBlob>;

    /// Decodes straight to PCM, bypassing container muxers.
    fn decode(&self, blob: &AudioBlob) -> Result<PcmBuffer>;
}

/// ffmpeg-backed converter.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegConverter;

impl AudioConverter for FfmpegConverter {
    fn to_wav(&self, blob: &AudioBlob) -> Result<AudioBlob> {
        media::transcode(blob, "wav", &["-acodec".to_string(), "pcm_s16le".to_string()])
    }

    fn to_mp3(&self, blob: &AudioBlob) -> Result<AudioBlob> {
        media::transcode(blob, "mp3", &["-acodec".to_string(), "libmp3lame".to_string()])
    }

    fn decode(&self, blob: &AudioBlob) -> Result<PcmBuffer> {
        let args: Vec<String> = ["-f", "f32le", "-ac", "1", "-ar"]
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once(GRAPH_SAMPLE_RATE.to_string()))
            .collect();
        let raw = media::transcode(blob, "raw", &args)?;
        let samples: Vec<f32> = raw
            .bytes()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        if samples.is_empty() {
            return Err(VoxError::conversion("decoder produced no samples"));
        }
        Ok(PcmBuffer {
            samples,
            sample_rate: GRAPH_SAMPLE_RATE,
            channels: 1,
        })
    }
}

/// One attempt in the fallback chain, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStep {
    AsIs,
    Wav,
    Mp3,
    /// Decode to PCM and re-encode
    Graph,
    Silent,
}

/// A clip ready to hand to a player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayableClip {
    /// Played on a media element with a true pause
    Element(AudioBlob),
    /// Re-encoded PCM played as a one-shot source; pausing stops it
    Graph(AudioBlob),
}

impl PlayableClip {
    pub fn blob(&self) -> &AudioBlob {
        match self {
            PlayableClip::Element(blob) | PlayableClip::Graph(blob) => blob,
        }
    }

    pub fn supports_pause(&self) -> bool {
        matches!(self, PlayableClip::Element(_))
    }
}

/// Result of the fallback chain.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub clip: PlayableClip,
    /// Every step tried, the last one being the step that produced `clip`
    pub attempts: Vec<ConversionStep>,
}

fn is_playable(blob: &AudioBlob) -> bool {
    !blob.is_empty() && blob.container().is_directly_playable()
}

/// Makes `blob` playable: as-is, then WAV, then MP3, then decoded PCM, then silence.
pub fn prepare_playable(blob: &AudioBlob, converter: &dyn AudioConverter) -> Prepared {
    let mut attempts = vec![ConversionStep::AsIs];
    if is_playable(blob) {
        return Prepared {
            clip: PlayableClip::Element(blob.clone()),
            attempts,
        };
    }
    tracing::debug!("{:?} clip is not directly playable, converting", blob.container());

    for step in [ConversionStep::Wav, ConversionStep::Mp3] {
        attempts.push(step);
        let converted = if step == ConversionStep::Wav {
            converter.to_wav(blob)
        } else {
            converter.to_mp3(blob)
        };
        match converted {
            Ok(converted) if is_playable(&converted) => {
                tracing::debug!("Converted voice clip via {:?}", step);
                return Prepared {
                    clip: PlayableClip::Element(converted),
                    attempts,
                };
            }
            Ok(converted) => {
                tracing::warn!("{:?} conversion produced an unplayable {:?} clip", step, converted.container())
            }
            Err(e) => tracing::warn!("{:?} conversion failed: {}", step, e),
        }
    }

    attempts.push(ConversionStep::Graph);
    match converter.decode(blob).and_then(|pcm| media::wav::encode_pcm(&pcm)) {
        Ok(reencoded) => {
            tracing::debug!("Re-encoded voice clip from decoded PCM");
            return Prepared {
                clip: PlayableClip::Graph(reencoded),
                attempts,
            };
        }
        Err(e) => tracing::warn!("PCM decode failed: {}", e),
    }

    attempts.push(ConversionStep::Silent);
    tracing::error!("All conversions failed, substituting silence");
    let silence = media::wav::silent_clip(1, GRAPH_SAMPLE_RATE).unwrap_or_else(|e| {
        tracing::error!("Could not build silent clip: {}", e);
        AudioBlob::new(Vec::new(), "audio/wav")
    });
    Prepared {
        clip: PlayableClip::Element(silence),
        attempts,
    }
}
