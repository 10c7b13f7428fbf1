//! Two-tier stats cache: per-topic snapshots plus the service aggregate.
//!
//! Snapshots are read-only; every mutation rebuilds the affected topic
//! snapshots and recomputes the aggregate while holding the write lock,
//! so readers only ever see complete states.

use std::collections::HashMap;
use std::sync::RwLock;

use mashbank_core::models::{ServiceInfo, TopicStats};
use mashbank_storage::topic::{asset_ops, chain_ops};

use crate::bank::now;
use crate::registry::{TopicHandle, TopicRegistry};

#[derive(Default)]
struct StatsInner {
    topics: HashMap<String, TopicStats>,
    service: ServiceInfo,
}

/// The cache. All mutation paths call back into the registry to
/// recompute from topic databases.
#[derive(Default)]
pub struct StatsCache {
    inner: RwLock<StatsInner>,
}

fn snapshot_topic(handle: &TopicHandle) -> TopicStats {
    let computed = handle.db.pool.with_reader(|conn| {
        let (asset_count, total_bytes) = asset_ops::count_and_size(conn)?;
        let containers = chain_ops::list_containers(conn)?;
        Ok((asset_count, total_bytes, containers.len() as u64))
    });
    match computed {
        Ok((asset_count, total_bytes, container_count)) => TopicStats {
            topic: handle.name.as_str().to_string(),
            asset_count,
            total_bytes,
            container_count,
            healthy: handle.is_healthy(),
            computed_at: now(),
        },
        Err(e) => {
            tracing::warn!(topic = %handle.name, error = %e, "stats snapshot failed");
            handle.mark_unhealthy();
            TopicStats {
                topic: handle.name.as_str().to_string(),
                healthy: false,
                computed_at: now(),
                ..Default::default()
            }
        }
    }
}

fn aggregate(topics: &HashMap<String, TopicStats>) -> ServiceInfo {
    let mut info = ServiceInfo {
        computed_at: now(),
        ..Default::default()
    };
    for stats in topics.values() {
        if !stats.healthy {
            info.unhealthy_topics.push(stats.topic.clone());
            continue;
        }
        info.topic_count += 1;
        info.asset_count += stats.asset_count;
        info.total_bytes += stats.total_bytes;
        info.container_count += stats.container_count;
    }
    info.unhealthy_topics.sort();
    info
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every topic snapshot and the aggregate.
    pub fn build_all(&self, registry: &TopicRegistry) {
        let mut fresh = HashMap::new();
        for name in registry.names() {
            if let Some(handle) = registry.get(&name) {
                fresh.insert(name, snapshot_topic(&handle));
            }
        }
        let service = aggregate(&fresh);
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.topics = fresh;
        inner.service = service;
    }

    /// Recompute one topic's snapshot (and the aggregate).
    pub fn invalidate_topic(&self, registry: &TopicRegistry, name: &str) {
        self.invalidate_topics_batch(registry, &[name.to_string()]);
    }

    /// Recompute a batch of topics with a single aggregate rebuild.
    /// Bulk metadata writes use this to avoid N recomputations.
    pub fn invalidate_topics_batch(&self, registry: &TopicRegistry, names: &[String]) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        for name in names {
            match registry.get(name) {
                Some(handle) => {
                    inner.topics.insert(name.clone(), snapshot_topic(&handle));
                }
                None => {
                    inner.topics.remove(name);
                }
            }
        }
        inner.service = aggregate(&inner.topics);
    }

    /// Drop a topic's snapshot entirely (reconciliation).
    pub fn remove_topic(&self, name: &str) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.topics.remove(name);
        inner.service = aggregate(&inner.topics);
    }

    pub fn get_topic_stats(&self, name: &str) -> Option<TopicStats> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.topics.get(name).cloned()
    }

    pub fn get_service_info(&self) -> ServiceInfo {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.service.clone()
    }
}
