//! [`PlaybackElement`] that plays decoded PCM on the default cpal output device.
//!
//! WAV clips are decoded with hound directly; any other container goes through
//! ffmpeg to WAV first. The output callback reads from a shared cursor so seek,
//! pause and volume take effect on the next buffer.

use crate::error::{Result, VoxError};
use crate::media::{self, AudioBlob, AudioContainer, PcmBuffer};
use crate::playback::element::{MediaEvent, PlaybackElement};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Minimum play-head movement, in seconds, reported as a time update.
const TIME_UPDATE_STEP: f64 = 0.25;

/// Decodes any supported blob to PCM, transcoding through ffmpeg when needed.
pub fn decode_blob(blob: &AudioBlob) -> Result<PcmBuffer> {
    match blob.container() {
        AudioContainer::Wav => media::wav::decode_wav(blob),
        other => {
            tracing::debug!("Transcoding {:?} clip to WAV for playback", other);
            let wav = media::transcode(blob, "wav", &["-acodec".to_string(), "pcm_s16le".to_string()])?;
            media::wav::decode_wav(&wav)
        }
    }
}

#[derive(Debug, Default)]
struct Transport {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    /// Fractional frame index into `samples`
    cursor: f64,
    playing: bool,
    volume: f32,
    ended: bool,
}

impl Transport {
    fn position_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.cursor / f64::from(self.sample_rate)
        }
    }

    /// Fills one interleaved output buffer, advancing by `step` frames per output frame.
    fn fill(&mut self, out: &mut [f32], channels: usize, step: f64) {
        for frame in out.chunks_mut(channels.max(1)) {
            let value = if self.playing {
                let index = self.cursor as usize;
                match self.samples.get(index) {
                    Some(&sample) => {
                        self.cursor += step;
                        sample * self.volume
                    }
                    None => {
                        self.playing = false;
                        self.ended = true;
                        0.0
                    }
                }
            } else {
                0.0
            };
            frame.iter_mut().for_each(|s| *s = value);
        }
    }
}

/// Audio element backed by a cpal output stream.
pub struct CpalElement {
    transport: Arc<Mutex<Transport>>,
    stream: Option<cpal::Stream>,
    events: VecDeque<MediaEvent>,
    last_reported: f64,
}

impl Default for CpalElement {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalElement {
    pub fn new() -> Self {
        Self {
            transport: Arc::new(Mutex::new(Transport {
                volume: 1.0,
                ..Transport::default()
            })),
            stream: None,
            events: VecDeque::new(),
            last_reported: 0.0,
        }
    }

    fn with_transport<T>(&self, f: impl FnOnce(&mut Transport) -> T) -> Option<T> {
        self.transport.lock().ok().map(|mut t| f(&mut t))
    }

    fn open_stream(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| VoxError::device("No audio output device available"))?;
        let config = device
            .default_output_config()
            .map_err(|e| VoxError::device(format!("Output device configuration: {e}")))?;
        let channels = usize::from(config.channels());
        let device_rate = config.sample_rate().0;
        let clip_rate = self.with_transport(|t| t.sample_rate).unwrap_or(device_rate);
        let step = f64::from(clip_rate) / f64::from(device_rate.max(1));
        tracing::debug!(
            "Output stream: {}Hz, {} channels, step {:.3}",
            device_rate,
            channels,
            step
        );

        let transport = Arc::clone(&self.transport);
        let on_error = |err| tracing::error!("Playback stream error: {}", err);
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if let Ok(mut t) = transport.lock() {
                        t.fill(out, channels, step);
                    }
                },
                on_error,
                None,
            ),
            cpal::SampleFormat::I16 => device.build_output_stream(
                &config.into(),
                move |out: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    let mut buffer = vec![0.0_f32; out.len()];
                    if let Ok(mut t) = transport.lock() {
                        t.fill(&mut buffer, channels, step);
                    }
                    for (dst, src) in out.iter_mut().zip(buffer) {
                        *dst = (src.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
                    }
                },
                on_error,
                None,
            ),
            other => {
                return Err(VoxError::Unsupported {
                    reason: format!("output sample format {other:?}"),
                })
            }
        }
        .map_err(|e| VoxError::device(format!("Failed to open output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| VoxError::device(format!("Failed to start output stream: {e}")))?;
        self.stream = Some(stream);
        Ok(())
    }
}

impl PlaybackElement for CpalElement {
    fn load(&mut self, blob: &AudioBlob) -> Result<()> {
        self.unload();
        let pcm = decode_blob(blob)?;
        let duration = pcm.duration_secs();
        let mono = pcm.to_mono();

        self.with_transport(|t| {
            t.samples = Arc::new(mono);
            t.sample_rate = pcm.sample_rate;
            t.cursor = 0.0;
            t.playing = false;
            t.ended = false;
        });
        self.events.push_back(MediaEvent::LoadedMetadata { duration });
        self.last_reported = 0.0;
        tracing::debug!("Loaded clip: {:.2}s at {}Hz", duration, pcm.sample_rate);
        Ok(())
    }

    fn unload(&mut self) {
        self.stream = None;
        self.events.clear();
        self.with_transport(|t| {
            t.samples = Arc::new(Vec::new());
            t.cursor = 0.0;
            t.playing = false;
            t.ended = false;
        });
    }

    fn play(&mut self) -> Result<()> {
        self.open_stream()?;
        self.with_transport(|t| {
            if t.ended || t.cursor as usize >= t.samples.len() {
                t.cursor = 0.0;
            }
            t.ended = false;
            t.playing = true;
        });
        Ok(())
    }

    fn pause(&mut self) {
        self.with_transport(|t| t.playing = false);
    }

    fn seek(&mut self, position: f64) {
        let moved = self.with_transport(|t| {
            t.cursor = (position.max(0.0) * f64::from(t.sample_rate)).floor();
            t.ended = false;
            t.position_secs()
        });
        if let Some(position) = moved {
            self.last_reported = position;
            self.events.push_back(MediaEvent::TimeUpdate { position });
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.with_transport(|t| t.volume = volume.clamp(0.0, 1.0));
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }

        let (ended, position) = self.with_transport(|t| {
            let ended = std::mem::take(&mut t.ended);
            if ended {
                t.cursor = 0.0;
            }
            (ended, t.position_secs())
        })?;

        if ended {
            self.last_reported = 0.0;
            return Some(MediaEvent::Ended);
        }
        if (position - self.last_reported).abs() >= TIME_UPDATE_STEP {
            self.last_reported = position;
            return Some(MediaEvent::TimeUpdate { position });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(samples: Vec<f32>) -> Transport {
        Transport {
            samples: Arc::new(samples),
            sample_rate: 4,
            cursor: 0.0,
            playing: true,
            volume: 0.5,
            ended: false,
        }
    }

    #[test]
    fn fill_duplicates_mono_across_channels_with_volume() {
        let mut t = transport(vec![1.0, -1.0]);
        let mut out = [9.0_f32; 4];
        t.fill(&mut out, 2, 1.0);
        assert_eq!(out, [0.5, 0.5, -0.5, -0.5]);
        assert_eq!(t.cursor, 2.0);
    }

    #[test]
    fn fill_marks_end_and_outputs_silence() {
        let mut t = transport(vec![1.0]);
        let mut out = [9.0_f32; 3];
        t.fill(&mut out, 1, 1.0);
        assert_eq!(out, [0.5, 0.0, 0.0]);
        assert!(t.ended);
        assert!(!t.playing);
    }

    #[test]
    fn paused_transport_is_silent() {
        let mut t = transport(vec![1.0, 1.0]);
        t.playing = false;
        let mut out = [9.0_f32; 2];
        t.fill(&mut out, 1, 1.0);
        assert_eq!(out, [0.0, 0.0]);
        assert_eq!(t.cursor, 0.0);
    }

    #[test]
    fn load_emits_metadata_then_seek_reports_position() {
        let mut element = CpalElement::new();
        let clip = media::wav::silent_clip(2, 8_000).unwrap();
        element.load(&clip).unwrap();

        match element.poll_event() {
            Some(MediaEvent::LoadedMetadata { duration }) => assert!((duration - 2.0).abs() < 1e-6),
            other => panic!("unexpected event {other:?}"),
        }
        element.seek(1.5);
        assert_eq!(element.poll_event(), Some(MediaEvent::TimeUpdate { position: 1.5 }));
        assert_eq!(element.poll_event(), None);
    }
}
