//! cpal microphone input.
//!
//! Samples arrive on the audio callback thread, are folded down to mono i16 and
//! buffered until [`CaptureSource::finish`], which WAV-encodes them and hands the
//! result to ffmpeg for the configured codec and bitrate.

use crate::config::AudioConfig;
use crate::error::{Result, VoxError};
use crate::media::{self, ffmpeg::encode_args, AudioBlob};
use crate::recording::capture::{CapturePreferences, CaptureSource};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Codec that is stored as plain WAV without running ffmpeg.
const PASSTHROUGH_CODEC: &str = "pcm_s16le";

/// [`CaptureSource`] reading from a cpal input device.
pub struct MicrophoneSource {
    device_name: String,
    codec: String,
    container: String,
    sample_rate: u32,
    bitrate: u32,
    samples: Arc<Mutex<Vec<i16>>>,
    paused: Arc<AtomicBool>,
    stream: Option<cpal::Stream>,
}

impl MicrophoneSource {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            device_name: config.device.clone(),
            codec: config.output_format.clone(),
            container: config.container.clone(),
            sample_rate: config.sample_rate,
            bitrate: 0,
            samples: Arc::new(Mutex::new(Vec::new())),
            paused: Arc::new(AtomicBool::new(false)),
            stream: None,
        }
    }

    /// Most recent `count` samples scaled to -1.0..=1.0, oldest first.
    pub fn recent_levels(&self, count: usize) -> Vec<f32> {
        let Ok(samples) = self.samples.lock() else {
            return Vec::new();
        };
        let start = samples.len().saturating_sub(count);
        samples[start..]
            .iter()
            .map(|&s| f32::from(s) / f32::from(i16::MAX))
            .collect()
    }

    fn build_stream(&mut self, device: &cpal::Device) -> Result<cpal::Stream> {
        let device_config = device
            .default_input_config()
            .map_err(|e| classify_stream_error(e.to_string()))?;
        let device_sample_rate = device_config.sample_rate().0;
        let channels = usize::from(device_config.channels());

        if device_sample_rate != self.sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
                self.sample_rate,
                device_sample_rate
            );
        }
        tracing::debug!(
            "Device configuration: {}Hz, {} channels, {:?}",
            device_sample_rate,
            channels,
            device_config.sample_format()
        );
        self.sample_rate = device_sample_rate;

        let samples = Arc::clone(&self.samples);
        let paused = Arc::clone(&self.paused);
        let on_error = |err| tracing::error!("Audio stream error: {}", err);

        let stream = match device_config.sample_format() {
            cpal::SampleFormat::I16 => device.build_input_stream(
                &device_config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if !paused.load(Ordering::Relaxed) {
                        push_mono(data, channels, &samples);
                    }
                },
                on_error,
                None,
            ),
            cpal::SampleFormat::F32 => device.build_input_stream(
                &device_config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !paused.load(Ordering::Relaxed) {
                        let converted: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                        push_mono(&converted, channels, &samples);
                    }
                },
                on_error,
                None,
            ),
            other => {
                return Err(VoxError::Unsupported {
                    reason: format!("input sample format {other:?}"),
                })
            }
        };

        stream.map_err(|e| classify_stream_error(e.to_string()))
    }
}

impl CaptureSource for MicrophoneSource {
    fn open(&mut self, preferences: &CapturePreferences) -> Result<()> {
        tracing::debug!(
            "Capture preferences: echo cancellation {}, noise suppression {}, auto gain {}, {} channel(s)",
            preferences.echo_cancellation,
            preferences.noise_suppression,
            preferences.auto_gain_control,
            preferences.channels
        );
        self.bitrate = preferences.bitrate;

        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or_else(|| VoxError::device("No audio input device available"))
            } else {
                find_device_by_name(&host, &self.device_name)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_name);

        let stream = self.build_stream(&device)?;
        stream
            .play()
            .map_err(|e| classify_stream_error(e.to_string()))?;
        self.stream = Some(stream);
        tracing::debug!("Audio stream started");
        Ok(())
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    fn finish(&mut self) -> Result<AudioBlob> {
        self.stream = None;

        let samples = match self.samples.lock() {
            Ok(mut samples) => std::mem::take(&mut *samples),
            Err(_) => return Err(VoxError::device("sample buffer poisoned")),
        };
        if samples.is_empty() {
            tracing::warn!("Recording stopped with no samples captured");
        }
        tracing::info!(
            "Captured {:.2}s ({} samples at {}Hz)",
            samples.len() as f32 / self.sample_rate.max(1) as f32,
            samples.len(),
            self.sample_rate
        );

        let wav = media::wav::encode_wav(&samples, self.sample_rate)?;
        if self.codec == PASSTHROUGH_CODEC {
            return Ok(wav);
        }
        media::transcode(&wav, &self.container, &encode_args(&self.codec, self.bitrate))
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Audio stream closed");
        }
    }
}

/// Folds interleaved samples down to mono by averaging channels.
fn push_mono(data: &[i16], channels: usize, samples: &Arc<Mutex<Vec<i16>>>) {
    let Ok(mut samples) = samples.lock() else {
        return;
    };
    match channels {
        0 | 1 => samples.extend_from_slice(data),
        n => samples.extend(data.chunks_exact(n).map(|frame| {
            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
            (sum / n as i32) as i16
        })),
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Maps host errors to permission or device failures.
fn classify_stream_error(message: String) -> VoxError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not permitted") {
        VoxError::Permission { reason: message }
    } else {
        VoxError::Device { reason: message }
    }
}

/// Finds an audio input device by name or numeric index.
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| VoxError::device(format!("Failed to enumerate devices: {e}")))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            VoxError::device(format!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            ))
        });
    }

    devices
        .into_iter()
        .find(|device| device.name().map(|n| n == device_spec).unwrap_or(false))
        .ok_or_else(|| {
            VoxError::device(format!(
                "Audio input device '{device_spec}' not found. Use 'voxmemo list-devices' to see available devices."
            ))
        })
}

/// Temporarily redirects stderr to /dev/null to silence ALSA probing noise.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| VoxError::device(format!("Failed to open /dev/null: {e}")))?;

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return f();
    }
    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(old_stderr) };
        return f();
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }
    result
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_frames_are_averaged() {
        let samples = Arc::new(Mutex::new(Vec::new()));
        push_mono(&[100, 300, -50, 50, 7], 2, &samples);
        assert_eq!(*samples.lock().unwrap(), vec![200, 0]);
    }

    #[test]
    fn mono_passes_through() {
        let samples = Arc::new(Mutex::new(Vec::new()));
        push_mono(&[1, 2, 3], 1, &samples);
        assert_eq!(*samples.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn float_samples_are_clamped() {
        assert_eq!(f32_to_i16(2.0), i16::MAX);
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(-1.0), -i16::MAX);
    }

    #[test]
    fn permission_messages_are_classified() {
        assert!(matches!(
            classify_stream_error("Permission denied".to_string()),
            VoxError::Permission { .. }
        ));
        assert!(matches!(
            classify_stream_error("device busy".to_string()),
            VoxError::Device { .. }
        ));
    }

    #[test]
    fn passthrough_codec_skips_ffmpeg() {
        let config = AudioConfig {
            output_format: PASSTHROUGH_CODEC.to_string(),
            container: "wav".to_string(),
            ..AudioConfig::default()
        };
        let mut source = MicrophoneSource::new(&config);
        source.samples.lock().unwrap().extend_from_slice(&[0, 1000, -1000]);

        let blob = source.finish().unwrap();
        assert_eq!(blob.container(), crate::media::AudioContainer::Wav);
    }

    #[test]
    fn recent_levels_are_normalized() {
        let source = MicrophoneSource::new(&AudioConfig::default());
        source.samples.lock().unwrap().extend_from_slice(&[0, i16::MAX, 0, i16::MAX]);
        assert_eq!(source.recent_levels(2), vec![0.0, 1.0]);
        assert_eq!(source.recent_levels(10).len(), 4);
    }
}
