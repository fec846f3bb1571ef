//! Local persistence substrates.
//!
//! Two independent stores share the recording id namespace: a key-value store of
//! JSON documents (recording list, settings, theme) and a SQLite blob store for
//! audio bytes. Transient object URLs hand resolved blobs to playback.

pub mod blobs;
pub mod kv;
pub mod urls;

pub use blobs::{BlobStore, SqliteBlobStore};
pub use kv::{JsonFileStore, KeyValueStore};
pub use urls::{ObjectUrl, ObjectUrlRegistry};

use std::path::PathBuf;

/// Returns the voxmemo data directory (`~/.local/share/voxmemo`), creating it if needed.
pub fn data_dir() -> anyhow::Result<PathBuf> {
    let data_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".local")
        .join("share")
        .join("voxmemo");
    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}
