//! File logging via `tracing`.
//!
//! Log lines go to a daily-rotated file under the XDG state directory and never
//! to the terminal, which belongs to the TUI. Only the newest week of files is kept.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;

/// Prefix of every log file name; rotation appends `.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "voxmemo.log";

const MAX_LOG_FILES: usize = 7;

/// Keeps the non-blocking writer flushing for the life of the process.
static APPENDER_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Installs the global subscriber.
///
/// The level comes from `RUST_LOG` and defaults to `info`.
///
/// # Errors
/// - If the log directory cannot be determined or created
/// - If logging was already initialized
pub fn init_logging() -> anyhow::Result<()> {
    let log_dir = log_dir()?;

    if let Err(e) = prune_old_logs(&log_dir, MAX_LOG_FILES) {
        eprintln!("Warning: Failed to clean up old logs: {e}");
    }

    let file_appender = rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    APPENDER_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging to {}", log_dir.display());
    Ok(())
}

/// `$XDG_STATE_HOME/voxmemo`, or `~/.local/state/voxmemo`. Created if missing.
pub fn log_dir() -> anyhow::Result<PathBuf> {
    let log_dir = match std::env::var("XDG_STATE_HOME") {
        Ok(xdg_state) if !xdg_state.is_empty() => PathBuf::from(xdg_state).join("voxmemo"),
        _ => dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
            .join(".local/state/voxmemo"),
    };
    fs::create_dir_all(&log_dir)?;
    Ok(log_dir)
}

/// Rotated log files in `log_dir`, newest first.
pub fn log_files(log_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let name = path.file_name()?.to_string_lossy().to_string();
            if !is_rotated_log(&name) {
                return None;
            }
            let modified = fs::metadata(&path).ok()?.modified().ok()?;
            Some((path, name, modified))
        })
        .collect();

    // Date suffix first, mtime to break ties.
    files.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)));
    Ok(files.into_iter().map(|(path, _, _)| path).collect())
}

fn is_rotated_log(name: &str) -> bool {
    name.strip_prefix(LOG_FILE_PREFIX)
        .and_then(|rest| rest.strip_prefix('.'))
        .map(|date| date.len() == 10 && date.matches('-').count() == 2)
        .unwrap_or(false)
}

fn prune_old_logs(log_dir: &Path, keep: usize) -> anyhow::Result<()> {
    for path in log_files(log_dir)?.iter().skip(keep) {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Failed to delete old log file {}: {}", path.display(), e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rotated_files_match() {
        assert!(is_rotated_log("voxmemo.log.2024-05-01"));
        assert!(!is_rotated_log("voxmemo.log"));
        assert!(!is_rotated_log("other.log.2024-05-01"));
        assert!(!is_rotated_log("voxmemo.log.backup"));
    }

    #[test]
    fn prune_keeps_newest_files() {
        let dir = tempfile::tempdir().unwrap();
        for day in 1..=9 {
            let name = format!("{LOG_FILE_PREFIX}.2024-05-0{day}");
            fs::write(dir.path().join(name), "line\n").unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        prune_old_logs(dir.path(), 7).unwrap();

        let remaining = log_files(dir.path()).unwrap();
        assert_eq!(remaining.len(), 7);
        assert!(remaining[0].ends_with("voxmemo.log.2024-05-09"));
        assert!(!dir.path().join("voxmemo.log.2024-05-01").exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
