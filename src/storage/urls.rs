//! Transient object URLs for resolved audio blobs.
//!
//! A URL is live from [`ObjectUrlRegistry::create`] until its [`ObjectUrl`] handle
//! is revoked or dropped. Revocation consumes the handle, so a URL cannot be
//! revoked twice, and dropping an unrevoked handle revokes it.

use crate::media::AudioBlob;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Registry of live object URLs.
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    live: Mutex<HashMap<String, Arc<AudioBlob>>>,
    created: AtomicUsize,
    revoked: AtomicUsize,
}

impl ObjectUrlRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `blob` and returns an owning handle to its URL.
    pub fn create(self: &Arc<Self>, blob: AudioBlob) -> ObjectUrl {
        let url = format!("blob:voxmemo/{}", uuid::Uuid::new_v4());
        if let Ok(mut live) = self.live.lock() {
            live.insert(url.clone(), Arc::new(blob));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Created object URL {}", url);
        ObjectUrl {
            url,
            registry: Arc::clone(self),
            revoked: false,
        }
    }

    /// Looks up the blob behind a live URL.
    pub fn fetch(&self, url: &str) -> Option<Arc<AudioBlob>> {
        self.live.lock().ok()?.get(url).cloned()
    }

    /// Number of URLs created and not yet revoked.
    #[cfg(test)]
    pub fn live_count(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn revoked_count(&self) -> usize {
        self.revoked.load(Ordering::SeqCst)
    }

    fn revoke(&self, url: &str) {
        let removed = self
            .live
            .lock()
            .map(|mut live| live.remove(url).is_some())
            .unwrap_or(false);
        if removed {
            self.revoked.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("Revoked object URL {}", url);
        }
    }
}

impl Drop for ObjectUrlRegistry {
    fn drop(&mut self) {
        tracing::debug!(
            "Object URL registry closed: {} created, {} revoked",
            self.created.load(Ordering::SeqCst),
            self.revoked.load(Ordering::SeqCst)
        );
    }
}

/// Owning handle to a live object URL.
#[derive(Debug)]
pub struct ObjectUrl {
    url: String,
    registry: Arc<ObjectUrlRegistry>,
    revoked: bool,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Fetches the blob behind this URL.
    pub fn fetch(&self) -> Option<Arc<AudioBlob>> {
        self.registry.fetch(&self.url)
    }

    /// Revokes the URL now.
    pub fn revoke(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.revoked {
            self.revoked = true;
            self.registry.revoke(&self.url);
        }
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob() -> AudioBlob {
        AudioBlob::new(vec![1, 2, 3], "audio/webm")
    }

    #[test]
    fn created_url_resolves_until_revoked() {
        let registry = ObjectUrlRegistry::new();
        let url = registry.create(blob());
        let text = url.as_str().to_string();
        assert!(text.starts_with("blob:voxmemo/"));
        assert_eq!(registry.fetch(&text).unwrap().bytes(), &[1, 2, 3]);

        url.revoke();
        assert!(registry.fetch(&text).is_none());
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.revoked_count(), 1);
    }

    #[test]
    fn dropping_handle_revokes_exactly_once() {
        let registry = ObjectUrlRegistry::new();
        {
            let _url = registry.create(blob());
            assert_eq!(registry.live_count(), 1);
        }
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.created_count(), 1);
        assert_eq!(registry.revoked_count(), 1);
    }

    #[test]
    fn urls_are_unique() {
        let registry = ObjectUrlRegistry::new();
        let a = registry.create(blob());
        let b = registry.create(blob());
        assert_ne!(a.as_str(), b.as_str());
        assert_eq!(registry.live_count(), 2);
    }
}
