//! Audio blob storage using SQLite.
//!
//! Holds the encoded bytes for each recording, keyed by recording id. Metadata
//! lives elsewhere; this table only knows ids, mime types and bytes.

use crate::error::Result;
use crate::media::AudioBlob;
use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Binary object store addressed by recording id.
pub trait BlobStore {
    /// Stores `blob` under `id`, replacing any existing bytes.
    fn put(&mut self, id: &str, blob: &AudioBlob) -> Result<()>;

    /// Reads the blob for `id`, or `None` if absent.
    fn get(&self, id: &str) -> Result<Option<AudioBlob>>;

    /// Removes the blob for `id`. Returns whether anything was removed.
    fn delete(&mut self, id: &str) -> Result<bool>;
}

/// [`BlobStore`] backed by a single SQLite database file.
pub struct SqliteBlobStore {
    connection: Connection,
}

impl SqliteBlobStore {
    /// Opens `<data_dir>/audio_blobs.db`, creating the table if necessary.
    ///
    /// # Errors
    /// - If the database file cannot be opened
    /// - If table creation fails
    pub fn open(data_dir: &Path) -> Result<Self> {
        let connection = Connection::open(data_dir.join("audio_blobs.db"))?;
        Self::with_connection(connection)
    }

    /// Opens a private in-memory database.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS audio_blobs (
                id TEXT PRIMARY KEY,
                mime TEXT NOT NULL,
                bytes BLOB NOT NULL,
                stored_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self { connection })
    }

    /// Number of stored blobs.
    #[cfg(test)]
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM audio_blobs", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl BlobStore for SqliteBlobStore {
    fn put(&mut self, id: &str, blob: &AudioBlob) -> Result<()> {
        self.connection.execute(
            "INSERT OR REPLACE INTO audio_blobs (id, mime, bytes, stored_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, blob.mime(), blob.bytes(), Local::now().to_rfc3339()],
        )?;
        tracing::debug!("Stored audio blob for {} ({} bytes)", id, blob.len());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<AudioBlob>> {
        let blob = self
            .connection
            .query_row(
                "SELECT mime, bytes FROM audio_blobs WHERE id = ?1",
                params![id],
                |row| {
                    let mime = row.get::<_, String>(0)?;
                    let bytes = row.get::<_, Vec<u8>>(1)?;
                    Ok(AudioBlob::new(bytes, mime))
                },
            )
            .optional()?;
        Ok(blob)
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        let removed = self
            .connection
            .execute("DELETE FROM audio_blobs WHERE id = ?1", params![id])?;
        tracing::debug!("Deleted audio blob for {} (rows: {})", id, removed);
        Ok(removed > 0)
    }
}
