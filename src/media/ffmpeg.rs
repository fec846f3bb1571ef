//! ffmpeg discovery and blob-to-blob transcoding.
//!
//! ffmpeg works on files, so each transcode writes the input blob to a scratch
//! file in the temp directory, runs ffmpeg, reads the output back and removes both.

use crate::error::{Result, VoxError};
use crate::media::{AudioBlob, AudioContainer};
use std::path::PathBuf;
use std::process::Command;

/// Locates the ffmpeg binary, checking well-known install paths before `PATH`.
pub fn find_ffmpeg() -> Result<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/opt/homebrew/bin/ffmpeg",
            "/usr/local/bin/ffmpeg",
            "/usr/bin/ffmpeg",
        ]
    } else if cfg!(target_os = "linux") {
        &["/usr/bin/ffmpeg", "/usr/local/bin/ffmpeg", "/snap/bin/ffmpeg"]
    } else if cfg!(target_os = "windows") {
        &[
            "C:\\ffmpeg\\bin\\ffmpeg.exe",
            "C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe",
        ]
    } else {
        &[]
    };

    if let Some(path) = candidates.iter().map(PathBuf::from).find(|p| p.exists()) {
        tracing::debug!("Found ffmpeg at: {}", path.display());
        return Ok(path);
    }

    let search_cmd = if cfg!(target_os = "windows") { "where" } else { "which" };
    let output = Command::new(search_cmd)
        .arg("ffmpeg")
        .output()
        .map_err(|e| VoxError::conversion(format!("Failed to search PATH for ffmpeg: {e}")))?;

    if output.status.success() {
        let path = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        if !path.as_os_str().is_empty() {
            tracing::debug!("Found ffmpeg in PATH at: {}", path.display());
            return Ok(path);
        }
    }

    Err(VoxError::conversion(
        "ffmpeg not found. Install it with 'brew install ffmpeg' or 'apt install ffmpeg'",
    ))
}

/// Transcodes `input` into the container named by `extension`.
///
/// `codec_args` are passed to ffmpeg between the input and output paths,
/// e.g. `["-acodec", "libopus", "-b:a", "128k"]`.
pub fn transcode(input: &AudioBlob, extension: &str, codec_args: &[String]) -> Result<AudioBlob> {
    let ffmpeg = find_ffmpeg()?;
    let token = uuid::Uuid::new_v4().simple().to_string();
    let temp_dir = std::env::temp_dir();
    let input_path = temp_dir.join(format!(
        "voxmemo_{token}_in.{}",
        input.container().extension()
    ));
    let output_path = temp_dir.join(format!("voxmemo_{token}_out.{extension}"));

    std::fs::write(&input_path, input.bytes())
        .map_err(|e| VoxError::conversion(format!("Failed to stage audio for ffmpeg: {e}")))?;

    let result = Command::new(&ffmpeg)
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(&input_path)
        .args(codec_args)
        .arg("-y")
        .arg(&output_path)
        .output();

    let converted = match result {
        Ok(output) if output.status.success() => std::fs::read(&output_path)
            .map_err(|e| VoxError::conversion(format!("Failed to read ffmpeg output: {e}"))),
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!("ffmpeg conversion failed: {}", stderr);
            Err(VoxError::conversion(format!("ffmpeg: {}", stderr.trim())))
        }
        Err(e) => Err(VoxError::conversion(format!("Failed to run ffmpeg: {e}"))),
    };

    for path in [&input_path, &output_path] {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::debug!("Failed to remove temp file {}: {}", path.display(), e);
            }
        }
    }

    let bytes = converted?;
    let container = AudioContainer::sniff(&bytes);
    let mime = match container {
        AudioContainer::Unknown => format!("audio/{extension}"),
        known => known.mime().to_string(),
    };
    tracing::debug!("Transcoded {} bytes to {} ({} bytes)", input.len(), extension, bytes.len());
    Ok(AudioBlob::new(bytes, mime))
}

/// Builds ffmpeg arguments for a mono encode with the given codec and bitrate.
pub fn encode_args(codec: &str, bitrate: u32) -> Vec<String> {
    let mut args = vec![
        "-acodec".to_string(),
        codec.to_string(),
        "-ac".to_string(),
        "1".to_string(),
    ];
    if codec != "pcm_s16le" {
        args.push("-b:a".to_string());
        args.push(format!("{}k", bitrate / 1000));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_ffmpeg() {
        match find_ffmpeg() {
            Ok(path) => println!("Found ffmpeg at: {}", path.display()),
            Err(e) => println!("ffmpeg not found (expected on CI): {e}"),
        }
    }

    #[test]
    fn encode_args_carry_bitrate_in_kbps() {
        let args = encode_args("libopus", 128_000);
        assert_eq!(args, vec!["-acodec", "libopus", "-ac", "1", "-b:a", "128k"]);
    }

    #[test]
    fn pcm_encode_has_no_bitrate() {
        let args = encode_args("pcm_s16le", 32_000);
        assert!(!args.iter().any(|a| a == "-b:a"));
    }
}
