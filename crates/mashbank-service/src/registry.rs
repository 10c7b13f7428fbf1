//! The in-memory topic registry and the keyed per-topic write locks.
//!
//! Ingest serializes within a topic but runs freely across topics, so
//! the write locks live in a map keyed by topic name (an outer DashMap
//! shard lock guards lock creation). A single flat lock here would kill
//! cross-topic ingest throughput.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use mashbank_core::errors::{MashResult, ServiceError};
use mashbank_core::models::TopicName;
use mashbank_storage::TopicDb;

/// One registered topic: its directory, database handle, and health.
pub struct TopicHandle {
    pub name: TopicName,
    pub dir: PathBuf,
    pub db: TopicDb,
    healthy: AtomicBool,
}

impl TopicHandle {
    pub fn open(workdir: &Path, name: TopicName) -> MashResult<Self> {
        let dir = workdir.join(name.as_str());
        let db = TopicDb::open(&dir, name.as_str())?;
        Ok(Self {
            name,
            dir,
            db,
            healthy: AtomicBool::new(true),
        })
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn mark_unhealthy(&self) {
        self.healthy.store(false, Ordering::Relaxed);
    }
}

/// Thread-safe topic registry with keyed write locks.
#[derive(Default)]
pub struct TopicRegistry {
    topics: DashMap<String, Arc<TopicHandle>>,
    write_locks: DashMap<String, Arc<Mutex<()>>>,
    /// Serializes topic creation so two creates cannot race the same
    /// directory.
    pub creation_lock: Mutex<()>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: Arc<TopicHandle>) {
        self.topics.insert(handle.name.as_str().to_string(), handle);
    }

    /// Remove a topic from the registry. Idempotent.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.topics.remove(name).is_some();
        self.write_locks.remove(name);
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<TopicHandle>> {
        self.topics.get(name).map(|r| r.clone())
    }

    /// Resolve a topic or fail with `topic_not_found`.
    pub fn require(&self, name: &str) -> MashResult<Arc<TopicHandle>> {
        self.get(name).ok_or_else(|| {
            ServiceError::TopicNotFound {
                topic: name.to_string(),
            }
            .into()
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.topics.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// The write lock for one topic, created on demand.
    pub fn write_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_lock_is_per_topic() {
        let registry = TopicRegistry::new();
        let a1 = registry.write_lock("alpha");
        let a2 = registry.write_lock("alpha");
        let b = registry.write_lock("beta");
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = TopicRegistry::new();
        assert!(!registry.unregister("ghost"));
        assert!(!registry.unregister("ghost"));
    }
}
