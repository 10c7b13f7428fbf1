//! Reconciliation: the filesystem is ground truth in the removal
//! direction. Topics referenced by the orchestrator index whose
//! directories have vanished are purged from the index, unregistered,
//! and evicted from the stats cache, with an audit entry per topic.
//! Directories on disk that nothing references are left alone.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use mashbank_core::errors::{ErrorCode, MashError, MashResult};
use mashbank_storage::orchestrator::index_ops;

use crate::bank::Bank;

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    /// (topic, index rows purged) per vanished topic.
    pub removed: Vec<(String, u64)>,
    /// Topics checked in total.
    pub checked: u64,
}

impl Bank {
    /// Run one reconciliation pass. Passes serialize on an internal
    /// mutex — overlapping invocations queue rather than interleave —
    /// and the pass is idempotent: a second run observes nothing to
    /// purge and writes no audit entries.
    pub fn reconcile(&self) -> MashResult<ReconcileReport> {
        let _guard = self
            .reconcile_lock
            .lock()
            .map_err(|_| MashError::new(ErrorCode::InternalError, "reconcile lock poisoned"))?;

        let workdir = self.config.require_workdir()?.to_path_buf();
        let topics = self
            .orchestrator
            .pool
            .with_reader(|conn| index_ops::list_topics(conn))?;

        let mut report = ReconcileReport::default();
        for topic in topics {
            report.checked += 1;
            if workdir.join(&topic).is_dir() {
                continue;
            }

            let purged = self
                .orchestrator
                .pool
                .writer
                .with_conn_sync(|conn| index_ops::delete_by_topic(conn, &topic))?;
            self.registry.unregister(&topic);
            self.stats.remove_topic(&topic);
            self.audit(
                "system",
                "reconcile_topic_removed",
                serde_json::json!({ "topic": topic, "entries_purged": purged }),
            );
            tracing::info!(topic = %topic, entries_purged = purged, "reconciled vanished topic");
            report.removed.push((topic, purged));
        }
        Ok(report)
    }

    /// Spawn the periodic maintenance loop on the tokio runtime: a
    /// reconciliation pass plus a sweep of expired auth sessions.
    pub fn spawn_reconciler(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let bank = Arc::clone(self);
        let period = Duration::from_secs(bank.config.reconcile_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let bank = Arc::clone(&bank);
                let outcome = tokio::task::spawn_blocking(move || {
                    let report = bank.reconcile()?;
                    let swept = bank.sweep_expired_sessions()?;
                    Ok::<_, mashbank_core::errors::MashError>((report, swept))
                })
                .await;
                match outcome {
                    Ok(Ok((report, swept))) => {
                        if !report.removed.is_empty() || swept > 0 {
                            tracing::info!(
                                removed = report.removed.len(),
                                sessions_swept = swept,
                                "maintenance pass"
                            );
                        }
                    }
                    Ok(Err(e)) => tracing::warn!(error = %e, "maintenance pass failed"),
                    Err(e) => tracing::warn!(error = %e, "maintenance task panicked"),
                }
            }
        })
    }

    /// Drop sessions past their absolute expiry.
    pub fn sweep_expired_sessions(&self) -> MashResult<u64> {
        self.orchestrator.pool.writer.with_conn_sync(|conn| {
            mashbank_auth::store::session_ops::delete_expired(conn, crate::bank::now())
        })
    }
}
