//! The asset ingest pipeline.
//!
//! authorize → spool-and-hash → global dedup → per-topic write lock →
//! rotation decision → container append → atomic topic-DB commit (asset
//! row + chain advance) ordered with the orchestrator index insert →
//! quota increment → stats invalidation.
//!
//! The topic-DB transaction stays open across the orchestrator insert:
//! losing the index-uniqueness race rolls the topic rows back, leaving
//! only a tolerated orphan entry at the container tail.

use std::io::{Read, Seek, SeekFrom, Write};

use serde::Serialize;

use mashbank_container::header::EntryHeader;
use mashbank_container::{append_from_reader, chain, select_container};
use mashbank_core::constants::INTERNAL_DIR;
use mashbank_core::errors::{ErrorCode, MashError, MashResult, ServiceError, StorageError};
use mashbank_core::hashing::ContentHasher;
use mashbank_core::models::{Action, ActionContext, Asset, Identity};
use mashbank_storage::orchestrator::index_ops;
use mashbank_storage::topic::{asset_ops, chain_ops};

use crate::bank::{now, Bank};

/// What an upload returned.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub hash: String,
    pub size_bytes: u64,
    /// True when the bytes already lived somewhere; nothing was written.
    pub skipped: bool,
    /// Owning topic when `skipped`.
    pub existing_topic: Option<String>,
    pub container: Option<String>,
    pub byte_offset: Option<u64>,
}

impl Bank {
    /// Ingest one asset into a topic.
    pub fn upload<R: Read>(
        &self,
        identity: Option<&Identity>,
        topic: &str,
        stream: &mut R,
        declared_size: u64,
        declared_filename: &str,
        parent_hash: Option<&str>,
    ) -> MashResult<IngestOutcome> {
        let extension = Asset::extension_of(declared_filename);

        // Step 1: authorize before touching anything.
        let ctx = ActionContext::for_upload(topic, &extension, declared_size);
        self.authorize(identity, Action::Upload, &ctx)?;

        if declared_size > self.config.max_file_size {
            return Err(ServiceError::AssetTooLarge {
                size: declared_size,
                limit: self.config.max_file_size,
            }
            .into());
        }
        self.check_disk_cap()?;

        let handle = self.registry.require(topic)?;
        if !handle.is_healthy() {
            return Err(ServiceError::TopicUnhealthy {
                topic: topic.to_string(),
                reason: "topic database unavailable".into(),
            }
            .into());
        }

        // Step 2: spool to a temp file while hashing. A declared/actual
        // size mismatch rejects here, before any container byte exists,
        // so the orchestrator never observes a partial.
        let workdir = self.config.require_workdir()?;
        let mut spool = tempfile::tempfile_in(workdir.join(INTERNAL_DIR))?;
        let (content_hash, actual_size) = spool_and_hash(
            stream,
            &mut spool,
            self.config.max_file_size,
        )?;
        if actual_size != declared_size {
            return Err(MashError::new(
                ErrorCode::InvalidRequest,
                format!("declared size {declared_size} but stream carried {actual_size} bytes"),
            ));
        }

        // Step 3: global dedup. Duplicates touch nothing — no storage,
        // no quota, no metadata.
        let existing = self
            .orchestrator
            .pool
            .with_reader(|conn| index_ops::check_hash(conn, &content_hash))?;
        if let Some(row) = existing {
            tracing::debug!(hash = %content_hash, topic = %row.topic, "dedup hit");
            return Ok(IngestOutcome {
                hash: content_hash,
                size_bytes: actual_size,
                skipped: true,
                existing_topic: Some(row.topic),
                container: None,
                byte_offset: None,
            });
        }

        if let Some(parent) = parent_hash {
            if !mashbank_core::hashing::is_hex64(parent) {
                return Err(MashError::new(
                    ErrorCode::InvalidHash,
                    format!("invalid parent hash {parent:?}"),
                ));
            }
        }

        // Steps 4-9 under the per-topic write lock: rotation decision,
        // append, and the DB commits.
        let lock = self.registry.write_lock(topic);
        let guard = lock.lock().map_err(|_| {
            MashError::new(ErrorCode::InternalError, "topic write lock poisoned")
        })?;

        let choice = select_container(&handle.dir, actual_size, self.config.max_container_size)?;
        spool.seek(SeekFrom::Start(0))?;
        let byte_offset =
            append_from_reader(&choice.path, &content_hash, actual_size, &mut spool)?;

        let asset = Asset {
            hash: content_hash.clone(),
            original_filename: declared_filename.to_string(),
            extension,
            size_bytes: actual_size,
            created_at: now(),
            parent_hash: parent_hash.map(str::to_string),
            container_name: choice.name.clone(),
            byte_offset,
        };

        let header_bytes = EntryHeader::new(&content_hash, actual_size)?.serialize()?;
        let commit = handle.db.pool.writer.with_conn_sync(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| mashbank_core::errors::to_storage_err(e.to_string()))?;

            asset_ops::insert_asset(&tx, &asset)?;

            let (count, prev_chain) = chain_ops::get_chain(&tx, &choice.name)?;
            spool.seek(SeekFrom::Start(0))?;
            let next_chain =
                chain::advance_chain_from_reader(&prev_chain, &header_bytes, &mut spool)?;
            chain_ops::upsert_chain(&tx, &choice.name, count + 1, &next_chain, now())?;

            // Index insert before the topic commit: losing the global
            // uniqueness race rolls everything back and the appended
            // entry stays as an orphan tail, invisible to readers.
            self.orchestrator.pool.writer.with_conn_sync(|orch| {
                index_ops::insert_row(orch, &content_hash, topic, &choice.name)
            })?;

            tx.commit()
                .map_err(|e| mashbank_core::errors::to_storage_err(e.to_string()))?;
            Ok(())
        });
        drop(guard);

        if let Err(e) = commit {
            if let MashError::Storage(StorageError::DuplicateHash { .. }) = &e {
                tracing::warn!(hash = %content_hash, "lost dedup race; append retained as orphan");
            }
            return Err(e);
        }

        // Steps 10-11: post-success bookkeeping.
        if let Some(identity) = identity {
            self.note_success(identity, Action::Upload, actual_size);
        }
        self.stats.invalidate_topic(&self.registry, topic);
        tracing::info!(
            topic,
            hash = %content_hash,
            container = %choice.name,
            byte_offset,
            size = actual_size,
            "asset ingested"
        );

        Ok(IngestOutcome {
            hash: content_hash,
            size_bytes: actual_size,
            skipped: false,
            existing_topic: None,
            container: Some(choice.name),
            byte_offset: Some(byte_offset),
        })
    }

    /// Reject writes when the workdir sits above the configured cap.
    /// A probe failure under a configured cap also rejects (fail closed).
    fn check_disk_cap(&self) -> MashResult<()> {
        let cap = self.config.disk_usage_cap_bytes;
        if cap == 0 {
            return Ok(());
        }
        let workdir = self.config.require_workdir()?;
        match directory_size(workdir) {
            Some(used) if used <= cap => Ok(()),
            Some(used) => Err(ServiceError::DiskLimitExceeded { used, cap }.into()),
            None => Err(ServiceError::DiskLimitExceeded { used: 0, cap }.into()),
        }
    }
}

/// Stream the upload into the spool file while hashing, bounded by the
/// configured maximum.
fn spool_and_hash<R: Read>(
    stream: &mut R,
    spool: &mut std::fs::File,
    max_size: u64,
) -> MashResult<(String, u64)> {
    let mut hasher = ContentHasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        if hasher.count() > max_size {
            return Err(ServiceError::AssetTooLarge {
                size: hasher.count(),
                limit: max_size,
            }
            .into());
        }
        spool.write_all(&buf[..n])?;
    }
    spool.flush()?;
    let size = hasher.count();
    Ok((hasher.finish_hex(), size))
}

/// Best-effort recursive directory size; `None` when the walk fails.
fn directory_size(dir: &std::path::Path) -> Option<u64> {
    let mut total = 0u64;
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries {
        let entry = entry.ok()?;
        let meta = entry.metadata().ok()?;
        if meta.is_dir() {
            total += directory_size(&entry.path())?;
        } else {
            total += meta.len();
        }
    }
    Some(total)
}
