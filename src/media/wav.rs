//! In-memory WAV encoding and decoding.

use crate::error::{Result, VoxError};
use crate::media::AudioBlob;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

/// Decoded PCM audio, interleaved f32 samples in [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmBuffer {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }

    /// Folds all channels into one by averaging.
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(self.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }
}

/// Encodes mono 16-bit PCM as a WAV blob.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<AudioBlob> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(AudioBlob::new(cursor.into_inner(), "audio/wav"))
}

/// Re-encodes decoded PCM as a mono 16-bit WAV blob.
pub fn encode_pcm(pcm: &PcmBuffer) -> Result<AudioBlob> {
    let samples: Vec<i16> = pcm
        .to_mono()
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect();
    encode_wav(&samples, pcm.sample_rate)
}

/// Decodes a WAV blob into f32 PCM.
pub fn decode_wav(blob: &AudioBlob) -> Result<PcmBuffer> {
    let reader = WavReader::new(Cursor::new(blob.bytes()))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    if spec.channels == 0 {
        return Err(VoxError::conversion("WAV declares zero channels"));
    }

    Ok(PcmBuffer {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Silent placeholder clip used as the last playback fallback.
pub fn silent_clip(duration_secs: u32, sample_rate: u32) -> Result<AudioBlob> {
    let samples = vec![0i16; (duration_secs * sample_rate) as usize];
    encode_wav(&samples, sample_rate)
}

/// Short two-tone chime used as the bundled demo audio.
pub fn demo_chime(duration_secs: u32, sample_rate: u32) -> Result<AudioBlob> {
    let total = (duration_secs * sample_rate) as usize;
    let samples: Vec<i16> = (0..total)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let freq = if t < duration_secs as f32 / 2.0 { 660.0 } else { 880.0 };
            let envelope = (1.0 - (t % 1.0)).max(0.0) * 0.3;
            ((2.0 * std::f32::consts::PI * freq * t).sin() * envelope * i16::MAX as f32) as i16
        })
        .collect();
    encode_wav(&samples, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::AudioContainer;

    #[test]
    fn encoded_wav_decodes_to_same_length() {
        let samples: Vec<i16> = (0..4410).map(|i| (i % 100) as i16 * 100).collect();
        let blob = encode_wav(&samples, 44_100).unwrap();
        assert_eq!(blob.container(), AudioContainer::Wav);

        let pcm = decode_wav(&blob).unwrap();
        assert_eq!(pcm.sample_rate, 44_100);
        assert_eq!(pcm.channels, 1);
        assert_eq!(pcm.frames(), 4410);
        assert!((pcm.duration_secs() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn silent_clip_is_all_zero() {
        let pcm = decode_wav(&silent_clip(1, 8000).unwrap()).unwrap();
        assert_eq!(pcm.frames(), 8000);
        assert!(pcm.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn decode_rejects_non_wav() {
        let blob = AudioBlob::new(b"not audio at all".to_vec(), "audio/wav");
        assert!(matches!(decode_wav(&blob), Err(VoxError::Conversion { .. })));
    }

    #[test]
    fn to_mono_averages_channels() {
        let pcm = PcmBuffer {
            samples: vec![1.0, 0.0, 0.5, 0.5],
            sample_rate: 10,
            channels: 2,
        };
        assert_eq!(pcm.to_mono(), vec![0.5, 0.5]);
    }

    #[test]
    fn demo_chime_has_requested_length() {
        let pcm = decode_wav(&demo_chime(3, 8000).unwrap()).unwrap();
        assert_eq!(pcm.frames(), 24_000);
        assert!(pcm.samples.iter().any(|&s| s != 0.0));
    }
}
