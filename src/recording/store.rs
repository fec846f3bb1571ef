//! Recording library: metadata in the key-value store, audio in the blob store.
//!
//! The whole recording list is rewritten to the key-value store after every
//! mutation. Metadata write failures are logged and surfaced through
//! [`RecordingStore::last_error`] but never roll back the in-memory change, so the
//! in-memory list may run ahead of what is on disk.

use crate::error::{Result, VoxError};
use crate::media::AudioBlob;
use crate::recording::model::{generate_recording_id, NewRecording, Recording};
use crate::recording::seed::{sample_recordings, SeedAudio};
use crate::storage::{
    BlobStore, JsonFileStore, KeyValueStore, ObjectUrl, ObjectUrlRegistry, SqliteBlobStore,
};
use chrono::Local;
use std::path::Path;
use std::sync::Arc;

/// Key under which the recording list is persisted.
pub const RECORDINGS_KEY: &str = "voice_recorder_recordings";

/// Copy of a stored list that failed to load, kept before it is overwritten.
pub const RECORDINGS_BACKUP_KEY: &str = "voice_recorder_recordings_unreadable";

/// Resolves a recording id to a playable object URL.
pub trait AudioResolver {
    fn resolve_audio_url(&self, id: &str) -> Result<ObjectUrl>;
}

/// Persistent mapping from recording id to metadata and audio.
pub struct RecordingStore<K = JsonFileStore, B = SqliteBlobStore> {
    kv: K,
    blobs: B,
    urls: Arc<ObjectUrlRegistry>,
    seed: SeedAudio,
    recordings: Vec<Recording>,
    loaded: bool,
    /// Set when the stored list could not be loaded or backed up; writes are refused
    read_only: bool,
    last_error: Option<String>,
}

impl RecordingStore {
    /// Opens the default on-disk stores under `data_dir`.
    pub fn open(data_dir: &Path, seed: SeedAudio) -> Result<Self> {
        let kv = JsonFileStore::open(data_dir)?;
        let blobs = SqliteBlobStore::open(data_dir)?;
        Ok(Self::new(kv, blobs, ObjectUrlRegistry::new(), seed))
    }
}

impl<K: KeyValueStore, B: BlobStore> RecordingStore<K, B> {
    pub fn new(kv: K, blobs: B, urls: Arc<ObjectUrlRegistry>, seed: SeedAudio) -> Self {
        Self {
            kv,
            blobs,
            urls,
            seed,
            recordings: Vec::new(),
            loaded: false,
            read_only: false,
            last_error: None,
        }
    }

    /// All recordings in insertion order.
    ///
    /// The first call loads the persisted list; if nothing is stored yet, three
    /// sample recordings are seeded (with the shared demo clip) before returning.
    pub fn list(&mut self) -> &[Recording] {
        self.ensure_loaded();
        &self.recordings
    }

    /// Looks up a recording by id.
    pub fn get(&mut self, id: &str) -> Option<&Recording> {
        self.ensure_loaded();
        self.recordings.iter().find(|r| r.id == id)
    }

    /// Adds a recording under a freshly generated id.
    ///
    /// The audio blob, if given, is stored first; a blob write failure aborts the
    /// add. A metadata write failure does not: the recording stays in the list.
    pub fn add(&mut self, recording: NewRecording, audio: Option<AudioBlob>) -> Result<Recording> {
        self.ensure_loaded();
        self.last_error = None;

        let mut id = generate_recording_id();
        while self.recordings.iter().any(|r| r.id == id) {
            id = generate_recording_id();
        }

        if let Some(blob) = audio {
            if let Err(e) = self.blobs.put(&id, &blob) {
                tracing::error!("Error adding recording: {}", e);
                self.last_error = Some("Failed to add recording. Please try again.".to_string());
                return Err(e);
            }
        }

        let recording = recording.with_id(id);
        self.recordings.push(recording.clone());
        self.persist();

        tracing::info!(
            "Recording added: {} ({}, {}s)",
            recording.id,
            recording.name,
            recording.duration
        );
        Ok(recording)
    }

    /// Replaces the metadata entry with the same id. The audio is untouched.
    ///
    /// Returns whether an entry matched; an unknown id leaves the list unchanged.
    pub fn update(&mut self, recording: Recording) -> bool {
        self.ensure_loaded();
        self.last_error = None;

        let Some(slot) = self.recordings.iter_mut().find(|r| r.id == recording.id) else {
            tracing::debug!("Update ignored, no recording with id {}", recording.id);
            return false;
        };
        *slot = recording;
        self.persist();
        true
    }

    /// Deletes the audio blob (best-effort) and then the metadata entry.
    ///
    /// Returns whether a metadata entry was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        self.ensure_loaded();
        self.last_error = None;

        match self.blobs.delete(id) {
            Ok(true) => {}
            Ok(false) => tracing::debug!("No audio blob stored for {}", id),
            Err(e) => tracing::warn!("Failed to delete audio for {}: {}", id, e),
        }

        let before = self.recordings.len();
        self.recordings.retain(|r| r.id != id);
        let removed = self.recordings.len() != before;
        if removed {
            self.persist();
            tracing::info!("Recording deleted: {}", id);
        }
        removed
    }

    /// Most recent surfaced storage error, cleared by the next mutation.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Registry that owns the URLs handed out by [`AudioResolver::resolve_audio_url`].
    #[cfg(test)]
    pub fn url_registry(&self) -> &Arc<ObjectUrlRegistry> {
        &self.urls
    }

    fn ensure_loaded(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        match self.load_from_storage() {
            Ok(Some(recordings)) if !recordings.is_empty() => {
                tracing::debug!("Loaded {} recordings from storage", recordings.len());
                self.recordings = recordings;
            }
            Ok(_) => self.seed_samples(),
            Err(e) => {
                tracing::error!("Error loading recordings from storage: {}", e);
                self.preserve_unreadable();
                self.last_error =
                    Some("Failed to load recordings. Please try again later.".to_string());
            }
        }
    }

    /// Copies the stored list aside so the next write cannot destroy it.
    /// If that is impossible, the store stops writing the list altogether.
    fn preserve_unreadable(&mut self) {
        let raw = match self.kv.get(RECORDINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("Cannot read stored recordings, refusing to overwrite them: {}", e);
                self.read_only = true;
                return;
            }
        };
        match self.kv.set(RECORDINGS_BACKUP_KEY, &raw) {
            Ok(()) => tracing::warn!(
                "Unreadable recording list saved under '{}'",
                RECORDINGS_BACKUP_KEY
            ),
            Err(e) => {
                tracing::error!("Failed to back up unreadable recordings, refusing to overwrite them: {}", e);
                self.read_only = true;
            }
        }
    }

    fn load_from_storage(&self) -> Result<Option<Vec<Recording>>> {
        let Some(stored) = self.kv.get(RECORDINGS_KEY)? else {
            return Ok(None);
        };
        let recordings: Vec<Recording> = serde_json::from_str(&stored)?;
        if recordings.iter().any(|r| r.id.trim().is_empty()) {
            return Err(VoxError::storage("stored recording is missing an id"));
        }
        Ok(Some(recordings))
    }

    fn seed_samples(&mut self) {
        let samples = sample_recordings(Local::now());

        match self.seed.load() {
            Ok(blob) => {
                for sample in &samples {
                    if let Err(e) = self.blobs.put(&sample.id, &blob) {
                        tracing::warn!("Failed to store sample audio for {}: {}", sample.id, e);
                    }
                }
                tracing::info!("Sample recordings initialized successfully");
            }
            Err(e) => tracing::error!("Failed to initialize sample recordings: {}", e),
        }

        self.recordings = samples;
        self.persist();
    }

    fn persist(&mut self) {
        if self.read_only {
            tracing::warn!("Recording list not saved: stored list is unreadable");
            self.last_error =
                Some("Recordings cannot be saved until the stored list is repaired.".to_string());
            return;
        }
        let result = serde_json::to_string(&self.recordings)
            .map_err(VoxError::from)
            .and_then(|json| self.kv.set(RECORDINGS_KEY, &json));

        if let Err(e) = result {
            tracing::error!("Error saving recordings to storage: {}", e);
            self.last_error = Some(format!("Failed to save recordings: {e}"));
        }
    }
}

impl<K: KeyValueStore, B: BlobStore> AudioResolver for RecordingStore<K, B> {
    fn resolve_audio_url(&self, id: &str) -> Result<ObjectUrl> {
        match self.blobs.get(id)? {
            Some(blob) => Ok(self.urls.create(blob)),
            None => {
                tracing::error!("Error getting audio for recording {}: not found", id);
                Err(VoxError::not_found(format!("Audio data for {id}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::rc::Rc;

    fn open_store(dir: &Path) -> RecordingStore {
        RecordingStore::open(dir, SeedAudio::Chime).unwrap()
    }

    fn blob() -> AudioBlob {
        AudioBlob::new(vec![0x1A, 0x45, 0xDF, 0xA3, 1, 2, 3], "audio/webm")
    }

    /// Key-value store whose writes can be switched off.
    struct FlakyKv {
        inner: JsonFileStore,
        fail_writes: Rc<Cell<bool>>,
    }

    impl KeyValueStore for FlakyKv {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes.get() {
                return Err(VoxError::storage("quota exceeded"));
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn empty_store_seeds_three_samples() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        let list = store.list().to_vec();
        let names: Vec<&str> = list.iter().map(|r| r.name.as_str()).collect();
        let durations: Vec<u32> = list.iter().map(|r| r.duration).collect();
        assert_eq!(
            names,
            vec!["Welcome to Voice Recorder", "Recording Demo", "Voice Memo Example"]
        );
        assert_eq!(durations, vec![45, 30, 25]);

        for sample in &list {
            assert!(store.resolve_audio_url(&sample.id).is_ok());
        }
    }

    #[test]
    fn seeding_survives_missing_demo_audio() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RecordingStore::open(
            dir.path(),
            SeedAudio::File(dir.path().join("missing.mp3")),
        )
        .unwrap();

        assert_eq!(store.list().len(), 3);
        assert!(matches!(
            store.resolve_audio_url("sample_1"),
            Err(VoxError::NotFound { .. })
        ));
    }

    #[test]
    fn add_returns_recording_with_resolvable_audio() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());

        let added = store.add(NewRecording::new("Test", 10), Some(blob())).unwrap();
        assert_eq!(added.name, "Test");
        assert_eq!(added.duration, 10);

        let url = store.resolve_audio_url(&added.id).unwrap();
        assert_eq!(url.fetch().unwrap().bytes(), blob().bytes());
    }

    #[test]
    fn added_ids_are_unique_and_appear_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());
        let mut seen: HashSet<String> = store.list().iter().map(|r| r.id.clone()).collect();

        for i in 0..20 {
            let added = store.add(NewRecording::new(format!("memo {i}"), i), None).unwrap();
            assert!(seen.insert(added.id.clone()), "id {} reused", added.id);
            let matches = store.list().iter().filter(|r| r.id == added.id).count();
            assert_eq!(matches, 1);
        }
    }

    #[test]
    fn list_preserves_insertion_order_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let (first, second) = {
            let mut store = open_store(dir.path());
            let a = store.add(NewRecording::new("first", 1), None).unwrap();
            let b = store.add(NewRecording::new("second", 2), None).unwrap();
            (a, b)
        };

        let mut reopened = open_store(dir.path());
        let list = reopened.list();
        assert_eq!(list.len(), 5);
        assert_eq!(list[3], first);
        assert_eq!(list[4], second);
    }

    #[test]
    fn delete_removes_metadata_and_audio() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());
        let added = store.add(NewRecording::new("gone", 3), Some(blob())).unwrap();

        assert!(store.delete(&added.id));
        assert!(store.get(&added.id).is_none());
        assert!(matches!(
            store.resolve_audio_url(&added.id),
            Err(VoxError::NotFound { .. })
        ));
        assert!(!store.delete(&added.id));
    }

    #[test]
    fn update_replaces_metadata_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());
        let mut added = store.add(NewRecording::new("draft", 4), Some(blob())).unwrap();

        added.name = "final".to_string();
        assert!(store.update(added.clone()));
        assert_eq!(store.get(&added.id).unwrap().name, "final");
        assert!(store.resolve_audio_url(&added.id).is_ok());
    }

    #[test]
    fn update_of_unknown_id_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());
        let before = store.list().to_vec();

        let mut ghost = before[0].clone();
        ghost.id = "rec_0_missing".to_string();
        ghost.name = "ghost".to_string();
        assert!(!store.update(ghost));
        assert_eq!(store.list(), before.as_slice());
    }

    #[test]
    fn metadata_write_failure_keeps_in_memory_append() {
        let dir = tempfile::tempdir().unwrap();
        let fail = Rc::new(Cell::new(false));
        let kv = FlakyKv {
            inner: JsonFileStore::open(dir.path()).unwrap(),
            fail_writes: Rc::clone(&fail),
        };
        let mut store = RecordingStore::new(
            kv,
            SqliteBlobStore::in_memory().unwrap(),
            ObjectUrlRegistry::new(),
            SeedAudio::Chime,
        );
        store.list();

        fail.set(true);
        let added = store.add(NewRecording::new("unsaved", 2), None).unwrap();
        assert!(store.get(&added.id).is_some());
        assert!(store.last_error().is_some());
    }

    #[test]
    fn stored_entry_without_id_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut kv = JsonFileStore::open(dir.path()).unwrap();
        kv.set(
            RECORDINGS_KEY,
            r#"[{"id":"","name":"x","duration":1,"date":"2024-01-01T00:00:00Z"}]"#,
        )
        .unwrap();

        let mut store = open_store(dir.path());
        assert!(store.list().is_empty());
        assert!(store.last_error().is_some());
    }

    #[test]
    fn add_after_failed_load_keeps_unreadable_list() {
        let dir = tempfile::tempdir().unwrap();
        let stored = r#"[{"id":"rec_1_keepme","name":"keep","duration":1,"date":"2024-01-01T00:00:00Z"},{"id":"","name":"x","duration":1,"date":"2024-01-01T00:00:00Z"}]"#;
        JsonFileStore::open(dir.path())
            .unwrap()
            .set(RECORDINGS_KEY, stored)
            .unwrap();

        let mut store = open_store(dir.path());
        assert!(store.list().is_empty());
        store.add(NewRecording::new("new memo", 2), None).unwrap();

        let kv = JsonFileStore::open(dir.path()).unwrap();
        let backup = kv.get(RECORDINGS_BACKUP_KEY).unwrap().unwrap();
        assert!(backup.contains("rec_1_keepme"));
    }

    #[test]
    fn failed_backup_blocks_overwriting_the_stored_list() {
        let dir = tempfile::tempdir().unwrap();
        let stored = r#"[{"id":"rec_1_keepme","name":"keep","duration":1,"date":"2024-01-01T00:00:00Z"},{"id":"","name":"x","duration":1,"date":"2024-01-01T00:00:00Z"}]"#;
        let mut inner = JsonFileStore::open(dir.path()).unwrap();
        inner.set(RECORDINGS_KEY, stored).unwrap();
        let fail = Rc::new(Cell::new(true));
        let mut store = RecordingStore::new(
            FlakyKv {
                inner,
                fail_writes: Rc::clone(&fail),
            },
            SqliteBlobStore::in_memory().unwrap(),
            ObjectUrlRegistry::new(),
            SeedAudio::Chime,
        );
        assert!(store.list().is_empty());

        fail.set(false);
        store.add(NewRecording::new("new memo", 2), None).unwrap();
        assert!(store.last_error().is_some());

        let kv = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(kv.get(RECORDINGS_KEY).unwrap().as_deref(), Some(stored));
    }

    #[test]
    fn resolved_url_is_revoked_once_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_store(dir.path());
        let id = store.list()[0].id.clone();

        let url = store.resolve_audio_url(&id).unwrap();
        assert_eq!(store.url_registry().live_count(), 1);
        drop(url);
        assert_eq!(store.url_registry().live_count(), 0);
        assert_eq!(store.url_registry().revoked_count(), 1);
    }
}
