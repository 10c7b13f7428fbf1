//! Bulk export: resolve a set of assets (by hash list or preset query)
//! and stream them into a ZIP archive.
//!
//! Two shapes: a synchronous call returning the finished archive, and an
//! asynchronous session — start returns a session id, a background task
//! moves through resolve → package emitting progress events, and the
//! client fetches the completed archive by id within a bounded TTL.
//!
//! Assets that resolve to nothing are reported inside the archive in a
//! `MISSING.txt` manifest entry, always.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mashbank_container::read_data;
use mashbank_core::cancel::CancelFlag;
use mashbank_core::errors::{ErrorCode, MashError, MashResult, ServiceError};
use mashbank_core::hashing;
use mashbank_core::models::{Action, ActionContext, Asset, FilenameFormat, Identity};

use crate::bank::Bank;

/// The two accepted bulk inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkInput {
    /// Explicit hash list.
    Ids(Vec<String>),
    /// Resolve via a query preset.
    Query {
        preset: String,
        #[serde(default)]
        params: BTreeMap<String, serde_json::Value>,
    },
}

/// One asset the resolver pinned down (or failed to).
#[derive(Debug, Clone)]
struct ResolvedAsset {
    hash: String,
    found: Option<(Asset, std::path::PathBuf)>,
}

/// Result of a bulk packaging run. Cancellation is a first-class
/// outcome, not an error: partial archives are discarded and the caller
/// sees how far packaging got.
#[derive(Debug, Clone)]
pub enum BulkOutcome {
    /// The finished archive bytes.
    Ready(Vec<u8>),
    /// The cancel flag was observed after `entries_done` entries.
    Cancelled { entries_done: u64 },
}

/// Phase of an asynchronous bulk session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum BulkPhase {
    Resolving,
    Packaging { done: u64, total: u64 },
    Ready { size_bytes: u64 },
    Failed { code: ErrorCode, message: String },
    Cancelled,
}

/// A progress event emitted while a session advances.
#[derive(Debug, Clone, Serialize)]
pub struct BulkProgress {
    pub at: i64,
    #[serde(flatten)]
    pub phase: BulkPhase,
}

struct BulkSession {
    phase: Mutex<BulkPhase>,
    events: Mutex<Vec<BulkProgress>>,
    archive: Mutex<Option<Vec<u8>>>,
    cancel: CancelFlag,
}

impl BulkSession {
    fn new() -> Self {
        Self {
            phase: Mutex::new(BulkPhase::Resolving),
            events: Mutex::new(Vec::new()),
            archive: Mutex::new(None),
            cancel: CancelFlag::new(),
        }
    }

    fn advance(&self, phase: BulkPhase) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase.clone();
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(BulkProgress {
                at: crate::bank::now(),
                phase,
            });
    }
}

/// TTL-bounded store of asynchronous bulk sessions.
pub(crate) struct BulkSessionStore {
    sessions: moka::sync::Cache<String, Arc<BulkSession>>,
}

impl BulkSessionStore {
    pub(crate) fn new(ttl_secs: u64) -> Self {
        Self {
            sessions: moka::sync::Cache::builder()
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
        }
    }

    fn insert(&self, id: &str, session: Arc<BulkSession>) {
        self.sessions.insert(id.to_string(), session);
    }

    fn get(&self, id: &str) -> MashResult<Arc<BulkSession>> {
        self.sessions.get(id).ok_or_else(|| {
            ServiceError::SessionNotFound {
                session: id.to_string(),
            }
            .into()
        })
    }
}

impl Bank {
    /// Synchronous bulk download: resolve, authorize, package. A
    /// cancelled run comes back as [`BulkOutcome::Cancelled`] with no
    /// quota charge; only a completed archive counts as the session's
    /// one request.
    pub fn bulk_download(
        &self,
        identity: Option<&Identity>,
        input: &BulkInput,
        cancel: &CancelFlag,
    ) -> MashResult<BulkOutcome> {
        let resolved = self.resolve_bulk(identity, input)?;
        let volume = self.authorize_bulk(identity, &resolved)?;

        let outcome = package_zip(&resolved, cancel)?;

        // A bulk of N assets is one request against the count quota; the
        // volume counter carries the sum of packaged sizes.
        if let (Some(identity), BulkOutcome::Ready(_)) = (identity, &outcome) {
            self.note_success(identity, Action::BulkDownload, volume);
        }
        Ok(outcome)
    }

    /// Start an asynchronous bulk session. Returns the session id; the
    /// packaging work runs on a blocking task, leaving progress events
    /// for the client to poll and the archive to fetch.
    pub fn bulk_start(
        self: &Arc<Self>,
        identity: Option<&Identity>,
        input: &BulkInput,
    ) -> MashResult<String> {
        // Resolve and authorize up front so a denied start fails the
        // request, not the background task.
        let resolved = self.resolve_bulk(identity, input)?;
        let volume = self.authorize_bulk(identity, &resolved)?;

        let session_id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(BulkSession::new());
        self.bulk_sessions.insert(&session_id, session.clone());

        let bank = Arc::clone(self);
        let identity = identity.cloned();
        tokio::task::spawn_blocking(move || {
            session.advance(BulkPhase::Packaging {
                done: 0,
                total: resolved.len() as u64,
            });
            let outcome = package_zip_with_progress(&resolved, &session.cancel, |done| {
                session.advance(BulkPhase::Packaging {
                    done,
                    total: resolved.len() as u64,
                });
            });
            match outcome {
                Ok(BulkOutcome::Ready(archive)) => {
                    if let Some(identity) = &identity {
                        bank.note_success(identity, Action::BulkDownload, volume);
                    }
                    session.advance(BulkPhase::Ready {
                        size_bytes: archive.len() as u64,
                    });
                    *session.archive.lock().unwrap_or_else(|e| e.into_inner()) = Some(archive);
                }
                Ok(BulkOutcome::Cancelled { .. }) => {
                    session.advance(BulkPhase::Cancelled);
                }
                Err(e) => {
                    session.advance(BulkPhase::Failed {
                        code: e.code(),
                        message: e.to_string(),
                    });
                }
            }
        });

        Ok(session_id)
    }

    /// Progress events of a session, oldest first. Expired or unknown
    /// ids answer `session_not_found`.
    pub fn bulk_progress(&self, session_id: &str) -> MashResult<Vec<BulkProgress>> {
        let session = self.bulk_sessions.get(session_id)?;
        let events = session.events.lock().unwrap_or_else(|e| e.into_inner());
        Ok(events.clone())
    }

    /// Fetch the completed archive. Not ready yet or already expired
    /// both resolve to errors the client can distinguish.
    pub fn bulk_fetch(&self, session_id: &str) -> MashResult<Vec<u8>> {
        let session = self.bulk_sessions.get(session_id)?;
        let archive = session.archive.lock().unwrap_or_else(|e| e.into_inner());
        archive.clone().ok_or_else(|| {
            let phase = session.phase.lock().unwrap_or_else(|e| e.into_inner());
            match &*phase {
                BulkPhase::Failed { code, message } => MashError::new(*code, message.clone()),
                BulkPhase::Cancelled => {
                    MashError::new(ErrorCode::InvalidRequest, "bulk session was cancelled")
                }
                _ => MashError::new(
                    ErrorCode::InvalidRequest,
                    "bulk session is not ready yet",
                ),
            }
        })
    }

    /// Cancel a running session cooperatively.
    pub fn bulk_cancel(&self, session_id: &str) -> MashResult<()> {
        let session = self.bulk_sessions.get(session_id)?;
        session.cancel.cancel();
        Ok(())
    }

    fn resolve_bulk(
        &self,
        identity: Option<&Identity>,
        input: &BulkInput,
    ) -> MashResult<Vec<ResolvedAsset>> {
        let hashes: Vec<String> = match input {
            BulkInput::Ids(ids) => {
                let mut hashes = Vec::with_capacity(ids.len());
                for id in ids {
                    hashes.push(hashing::canonical_hash(id)?);
                }
                hashes
            }
            BulkInput::Query { preset, params } => self
                .run_query(identity, preset, params)?
                .into_iter()
                .map(|row| row.hash)
                .collect(),
        };

        if hashes.is_empty() {
            return Err(ServiceError::InvalidRequest {
                reason: "bulk request resolved no assets".into(),
            }
            .into());
        }
        if hashes.len() > self.config.max_bulk_assets {
            return Err(ServiceError::BulkTooLarge {
                count: hashes.len(),
                limit: self.config.max_bulk_assets,
            }
            .into());
        }

        Ok(hashes
            .into_iter()
            .map(|hash| {
                let found = self.locate_asset(&hash).ok();
                ResolvedAsset { hash, found }
            })
            .collect())
    }

    /// Run the evaluator with the resolved count and volume. Returns the
    /// total volume in bytes.
    fn authorize_bulk(
        &self,
        identity: Option<&Identity>,
        resolved: &[ResolvedAsset],
    ) -> MashResult<u64> {
        let volume: u64 = resolved
            .iter()
            .filter_map(|r| r.found.as_ref().map(|(a, _)| a.size_bytes))
            .sum();
        let ctx = ActionContext::for_bulk(resolved.len() as u64, volume);
        self.authorize(identity, Action::BulkDownload, &ctx)?;
        Ok(volume)
    }
}

fn package_zip(resolved: &[ResolvedAsset], cancel: &CancelFlag) -> MashResult<BulkOutcome> {
    package_zip_with_progress(resolved, cancel, |_| {})
}

/// Write the archive: one entry per found asset (hash_original naming,
/// collision-proof), plus the `MISSING.txt` manifest when any hash
/// resolved to nothing. Observing the cancel flag between entries drops
/// the partial archive and returns the `Cancelled` outcome.
fn package_zip_with_progress(
    resolved: &[ResolvedAsset],
    cancel: &CancelFlag,
    mut progress: impl FnMut(u64),
) -> MashResult<BulkOutcome> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    let zip_err =
        |e: zip::result::ZipError| MashError::new(ErrorCode::InternalError, format!("zip: {e}"));

    let mut missing = Vec::new();
    let mut done = 0u64;
    for item in resolved {
        if cancel.is_cancelled() {
            return Ok(BulkOutcome::Cancelled { entries_done: done });
        }
        match &item.found {
            Some((asset, topic_dir)) => {
                let data = read_data(
                    &topic_dir.join(&asset.container_name),
                    asset.byte_offset,
                    asset.size_bytes,
                )?;
                let name = asset.download_filename(FilenameFormat::HashOriginal);
                writer.start_file(name, options).map_err(zip_err)?;
                writer.write_all(&data)?;
            }
            None => missing.push(item.hash.clone()),
        }
        done += 1;
        progress(done);
    }

    if !missing.is_empty() {
        writer.start_file("MISSING.txt", options).map_err(zip_err)?;
        writer.write_all(missing.join("\n").as_bytes())?;
        writer.write_all(b"\n")?;
    }

    let cursor = writer.finish().map_err(zip_err)?;
    Ok(BulkOutcome::Ready(cursor.into_inner()))
}
