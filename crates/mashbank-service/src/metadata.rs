//! Metadata reads and writes over the per-topic journal.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use mashbank_core::errors::{MashResult, ServiceError};
use mashbank_core::hashing;
use mashbank_core::models::{
    Action, ActionContext, ComputedMetadata, Identity, MetadataEntry, MetadataOp,
};
use mashbank_storage::topic::metadata_ops;

use crate::bank::{now, Bank};

/// One requested metadata change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataChange {
    pub key: String,
    pub op: MetadataOp,
    pub value: Option<String>,
}

/// One item of a cross-topic batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub hash: String,
    #[serde(flatten)]
    pub change: MetadataChange,
}

impl Bank {
    /// Computed metadata of one asset.
    pub fn get_metadata(
        &self,
        identity: Option<&Identity>,
        hash: &str,
    ) -> MashResult<Vec<ComputedMetadata>> {
        let hash = hashing::canonical_hash(hash)?;
        let (_, topic_dir) = self.locate_asset(&hash)?;
        let topic = dir_name(&topic_dir);

        let ctx = ActionContext {
            topic: Some(topic.clone()),
            ..Default::default()
        };
        self.authorize(identity, Action::Metadata, &ctx)?;

        let handle = self.registry.require(&topic)?;
        handle
            .db
            .pool
            .with_reader(|conn| metadata_ops::get_computed(conn, &hash))
    }

    /// Apply a set of changes to one asset, journaled in one transaction.
    pub fn set_metadata(
        &self,
        identity: Option<&Identity>,
        hash: &str,
        changes: &[MetadataChange],
        processor: &str,
        processor_version: &str,
    ) -> MashResult<u64> {
        let hash = hashing::canonical_hash(hash)?;
        self.validate_changes(changes)?;
        let (_, topic_dir) = self.locate_asset(&hash)?;
        let topic = dir_name(&topic_dir);

        let ctx = ActionContext {
            topic: Some(topic.clone()),
            ..Default::default()
        };
        self.authorize(identity, Action::Metadata, &ctx)?;

        let handle = self.registry.require(&topic)?;
        let timestamp = now();
        let written = handle.db.pool.writer.with_conn_sync(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| mashbank_core::errors::to_storage_err(e.to_string()))?;
            for change in changes {
                let entry = MetadataEntry {
                    asset_hash: hash.clone(),
                    key: change.key.clone(),
                    op: change.op,
                    value: change.value.clone(),
                    processor: processor.to_string(),
                    processor_version: processor_version.to_string(),
                    timestamp,
                };
                metadata_ops::append_entry_inner(&tx, &entry)?;
            }
            tx.commit()
                .map_err(|e| mashbank_core::errors::to_storage_err(e.to_string()))?;
            Ok(changes.len() as u64)
        })?;

        if let Some(identity) = identity {
            self.note_success(identity, Action::Metadata, 0);
        }
        self.stats.invalidate_topic(&self.registry, &topic);
        Ok(written)
    }

    /// Apply changes across many assets in potentially many topics,
    /// grouped so each topic commits once and the stats cache is
    /// invalidated in one batch.
    pub fn batch_metadata(
        &self,
        identity: Option<&Identity>,
        items: &[BatchItem],
        processor: &str,
        processor_version: &str,
    ) -> MashResult<u64> {
        let changes: Vec<MetadataChange> = items.iter().map(|i| i.change.clone()).collect();
        self.validate_changes(&changes)?;

        // Resolve every hash to its owning topic first.
        let mut by_topic: HashMap<String, Vec<(String, MetadataChange)>> = HashMap::new();
        for item in items {
            let hash = hashing::canonical_hash(&item.hash)?;
            let (_, topic_dir) = self.locate_asset(&hash)?;
            by_topic
                .entry(dir_name(&topic_dir))
                .or_default()
                .push((hash, item.change.clone()));
        }

        // Every touched topic must pass the grant's topic constraint.
        for topic in by_topic.keys() {
            let ctx = ActionContext {
                topic: Some(topic.clone()),
                ..Default::default()
            };
            self.authorize(identity, Action::Metadata, &ctx)?;
        }

        let timestamp = now();
        let mut written = 0u64;
        for (topic, changes) in &by_topic {
            let handle = self.registry.require(topic)?;
            written += handle.db.pool.writer.with_conn_sync(|conn| {
                let tx = conn
                    .unchecked_transaction()
                    .map_err(|e| mashbank_core::errors::to_storage_err(e.to_string()))?;
                for (hash, change) in changes {
                    let entry = MetadataEntry {
                        asset_hash: hash.clone(),
                        key: change.key.clone(),
                        op: change.op,
                        value: change.value.clone(),
                        processor: processor.to_string(),
                        processor_version: processor_version.to_string(),
                        timestamp,
                    };
                    metadata_ops::append_entry_inner(&tx, &entry)?;
                }
                tx.commit()
                    .map_err(|e| mashbank_core::errors::to_storage_err(e.to_string()))?;
                Ok(changes.len() as u64)
            })?;
        }

        if let Some(identity) = identity {
            self.note_success(identity, Action::Metadata, 0);
        }
        let topics: Vec<String> = by_topic.keys().cloned().collect();
        self.stats.invalidate_topics_batch(&self.registry, &topics);
        Ok(written)
    }

    /// Resolve assets via a query preset, then apply one change to each.
    pub fn apply_metadata(
        &self,
        identity: Option<&Identity>,
        preset: &str,
        params: &BTreeMap<String, serde_json::Value>,
        change: &MetadataChange,
        processor: &str,
        processor_version: &str,
    ) -> MashResult<u64> {
        let rows = self.run_query(identity, preset, params)?;
        let items: Vec<BatchItem> = rows
            .into_iter()
            .map(|row| BatchItem {
                hash: row.hash,
                change: change.clone(),
            })
            .collect();
        if items.is_empty() {
            return Ok(0);
        }
        self.batch_metadata(identity, &items, processor, processor_version)
    }

    fn validate_changes(&self, changes: &[MetadataChange]) -> MashResult<()> {
        for change in changes {
            if change.key.is_empty() {
                return Err(ServiceError::MissingParam {
                    param: "key".into(),
                }
                .into());
            }
            if change.op == MetadataOp::Set {
                let Some(value) = &change.value else {
                    return Err(ServiceError::MissingParam {
                        param: "value".into(),
                    }
                    .into());
                };
                if value.chars().count() > self.config.metadata_value_max_len {
                    return Err(ServiceError::MetadataValueTooLong {
                        len: value.chars().count(),
                        limit: self.config.metadata_value_max_len,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn dir_name(dir: &std::path::Path) -> String {
    dir.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}
