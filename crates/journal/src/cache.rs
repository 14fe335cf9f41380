//! Single-owner key/value store driven by messages
//!
//! The map lives inside one spawned task. Handles send read, write, update
//! and delete requests over an unbounded channel, so every mutation is
//! applied by that task alone and in the order it was sent. Handles are
//! cheap to clone; the task exits when the last handle is dropped.

use ahash::AHashMap;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache actor has shut down")]
    Closed,
}

type UpdateFn<V> = Box<dyn FnOnce(Option<&V>) -> Option<V> + Send>;

enum Request<V> {
    Read {
        key: String,
        reply: oneshot::Sender<Option<V>>,
    },
    Write {
        key: String,
        value: V,
    },
    Update {
        key: String,
        apply: UpdateFn<V>,
    },
    Delete {
        key: String,
    },
}

/// Handle to a cache actor
pub struct Cache<V> {
    tx: mpsc::UnboundedSender<Request<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<V> std::fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<V: Clone + Send + 'static> Cache<V> {
    /// Spawn an empty cache; must be called inside a tokio runtime
    pub fn new() -> Self {
        Self::from_entries(std::iter::empty())
    }

    /// Spawn a cache seeded with `entries`
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, V)>,
    {
        let store: AHashMap<String, V> = entries.into_iter().collect();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(store, rx));
        Self { tx }
    }

    /// Fetch a copy of the value under `key`
    pub async fn read(&self, key: &str) -> Result<Option<V>, CacheError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Read {
            key: key.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| CacheError::Closed)
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn write(&self, key: impl Into<String>, value: V) -> Result<(), CacheError> {
        self.send(Request::Write {
            key: key.into(),
            value,
        })
    }

    /// Atomically replace the value under `key` with `apply(current)`
    ///
    /// Returning `None` from `apply` leaves the entry as it was.
    pub fn update<F>(&self, key: impl Into<String>, apply: F) -> Result<(), CacheError>
    where
        F: FnOnce(Option<&V>) -> Option<V> + Send + 'static,
    {
        self.send(Request::Update {
            key: key.into(),
            apply: Box::new(apply),
        })
    }

    pub fn delete(&self, key: impl Into<String>) -> Result<(), CacheError> {
        self.send(Request::Delete { key: key.into() })
    }

    fn send(&self, request: Request<V>) -> Result<(), CacheError> {
        self.tx.send(request).map_err(|_| CacheError::Closed)
    }
}

impl<V: Clone + Send + 'static> Default for Cache<V> {
    fn default() -> Self {
        Self::new()
    }
}

async fn run<V: Clone>(mut store: AHashMap<String, V>, mut rx: mpsc::UnboundedReceiver<Request<V>>) {
    while let Some(request) = rx.recv().await {
        match request {
            Request::Read { key, reply } => {
                // Reader may have given up; nothing to do then
                let _ = reply.send(store.get(&key).cloned());
            }
            Request::Write { key, value } => {
                store.insert(key, value);
            }
            Request::Update { key, apply } => {
                if let Some(value) = apply(store.get(&key)) {
                    store.insert(key, value);
                }
            }
            Request::Delete { key } => {
                store.remove(&key);
            }
        }
    }
    debug!("cache actor stopped with {} entries", store.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_missing_key() {
        let cache: Cache<u32> = Cache::new();
        assert_eq!(cache.read("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let cache = Cache::new();
        cache.write("a", 1u32).unwrap();
        cache.write("a", 2u32).unwrap();

        assert_eq!(cache.read("a").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = Cache::from_entries([("a".to_string(), 1u32)]);
        cache.delete("a").unwrap();
        cache.delete("never-there").unwrap();

        assert_eq!(cache.read("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_seeded_entries() {
        let seed = vec![("a".to_string(), 1u32), ("b".to_string(), 2u32)];
        let cache = Cache::from_entries(seed.clone());

        assert_eq!(cache.read("a").await.unwrap(), Some(1));
        assert_eq!(cache.read("b").await.unwrap(), Some(2));
        // The seed is copied, not shared
        assert_eq!(seed.len(), 2);
    }

    #[tokio::test]
    async fn test_update_can_decline() {
        let cache = Cache::from_entries([("a".to_string(), 10u32)]);

        cache.update("a", |current| current.map(|v| v + 1)).unwrap();
        cache.update("a", |_| None).unwrap();
        cache.update("b", |current| current.map(|v| v + 1)).unwrap();

        assert_eq!(cache.read("a").await.unwrap(), Some(11));
        assert_eq!(cache.read("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_writers_serialize() {
        let cache: Cache<u32> = Cache::from_entries([("n".to_string(), 0)]);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..10 {
                    cache.update("n", |v| v.map(|n| n + 1)).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.read("n").await.unwrap(), Some(160));
    }

    #[tokio::test]
    async fn test_handles_share_one_store() {
        let first: Cache<String> = Cache::new();
        let second = first.clone();
        first.write("k", "v".to_string()).unwrap();

        assert_eq!(second.read("k").await.unwrap(), Some("v".to_string()));
    }
}
