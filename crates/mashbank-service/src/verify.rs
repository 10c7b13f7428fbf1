//! Verification: replay container hash chains against the stored
//! records, and cross-check the orchestrator index against topic
//! databases.

use mashbank_container::chain::{replay_chain, ReplayOutcome};
use mashbank_core::cancel::CancelFlag;
use mashbank_core::errors::MashResult;
use mashbank_core::models::{
    Action, ActionContext, ContainerReport, Identity, IndexIssue, IndexIssueKind, VerifyStatus,
};
use mashbank_storage::orchestrator::index_ops;
use mashbank_storage::topic::{asset_ops, chain_ops};

use crate::bank::Bank;

/// Entries between progress callbacks during a replay.
const REPORT_EVERY: u64 = 256;

impl Bank {
    /// Replay one container and compare to the stored (count, chain).
    /// `progress` receives the running entry count; cancellation answers
    /// with a `cancelled` report rather than an error.
    pub fn verify_container(
        &self,
        identity: Option<&Identity>,
        topic: &str,
        container: &str,
        cancel: &CancelFlag,
        mut progress: impl FnMut(u64),
    ) -> MashResult<ContainerReport> {
        self.authorize(identity, Action::Verify, &ActionContext::default())?;
        let report = self.verify_container_inner(topic, container, cancel, &mut progress)?;
        if let Some(identity) = identity {
            self.note_success(identity, Action::Verify, 0);
        }
        Ok(report)
    }

    fn verify_container_inner(
        &self,
        topic: &str,
        container: &str,
        cancel: &CancelFlag,
        progress: &mut dyn FnMut(u64),
    ) -> MashResult<ContainerReport> {
        let handle = self.registry.require(topic)?;
        let (stored_count, stored_chain) = handle
            .db
            .pool
            .with_reader(|conn| chain_ops::get_chain(conn, container))?;

        let outcome = replay_chain(&handle.dir.join(container), REPORT_EVERY, |done| {
            progress(done);
            !cancel.is_cancelled()
        })?;

        let report = match outcome {
            ReplayOutcome::Cancelled { entries_done } => ContainerReport {
                topic: topic.to_string(),
                container: container.to_string(),
                status: VerifyStatus::Cancelled,
                stored_count,
                replayed_count: entries_done,
                stored_chain,
                replayed_chain: String::new(),
                detail: Some("verification cancelled".into()),
            },
            ReplayOutcome::Complete { chain_hex, count } => {
                let (status, detail) = if count != stored_count {
                    (
                        VerifyStatus::CountMismatch,
                        Some(format!(
                            "entry count mismatch (stored {stored_count}, computed {count})"
                        )),
                    )
                } else if chain_hex != stored_chain {
                    (
                        VerifyStatus::HashMismatch,
                        Some("chain hash mismatch".to_string()),
                    )
                } else {
                    (VerifyStatus::Ok, None)
                };
                ContainerReport {
                    topic: topic.to_string(),
                    container: container.to_string(),
                    status,
                    stored_count,
                    replayed_count: count,
                    stored_chain,
                    replayed_chain: chain_hex,
                    detail,
                }
            }
        };

        if !report.is_ok() && report.status != VerifyStatus::Cancelled {
            tracing::warn!(
                topic,
                container,
                status = ?report.status,
                "container verification failed"
            );
        }
        Ok(report)
    }

    /// Verify every recorded container of a topic. Stops early when
    /// cancelled; the partial report list is returned as-is.
    pub fn verify_topic(
        &self,
        identity: Option<&Identity>,
        topic: &str,
        cancel: &CancelFlag,
        mut progress: impl FnMut(&str, u64),
    ) -> MashResult<Vec<ContainerReport>> {
        self.authorize(identity, Action::Verify, &ActionContext::default())?;

        let handle = self.registry.require(topic)?;
        let containers = handle
            .db
            .pool
            .with_reader(|conn| chain_ops::list_containers(conn))?;

        let mut reports = Vec::with_capacity(containers.len());
        for container in containers {
            if cancel.is_cancelled() {
                break;
            }
            let mut scoped = |done: u64| progress(&container, done);
            reports.push(self.verify_container_inner(topic, &container, cancel, &mut scoped)?);
        }
        if let Some(identity) = identity {
            self.note_success(identity, Action::Verify, 0);
        }
        Ok(reports)
    }

    /// Cross-check every orchestrator index row against its topic DB.
    /// Discrepancies: `orphan` (topic missing/unhealthy), `missing`
    /// (asset row absent), `mismatch` (container disagrees). The issue
    /// list is capped by configuration.
    pub fn verify_index(
        &self,
        identity: Option<&Identity>,
        cancel: &CancelFlag,
    ) -> MashResult<Vec<IndexIssue>> {
        self.authorize(identity, Action::Verify, &ActionContext::default())?;

        let cap = self.config.max_index_issues;
        let topics = self
            .orchestrator
            .pool
            .with_reader(|conn| index_ops::list_topics(conn))?;

        let mut issues = Vec::new();
        'topics: for topic in topics {
            if cancel.is_cancelled() || issues.len() >= cap {
                break;
            }
            let rows = self
                .orchestrator
                .pool
                .with_reader(|conn| index_ops::list_by_topic(conn, &topic))?;

            let handle = self.registry.get(&topic).filter(|h| h.is_healthy());
            let Some(handle) = handle else {
                for row in rows {
                    if issues.len() >= cap {
                        break 'topics;
                    }
                    issues.push(IndexIssue {
                        kind: IndexIssueKind::Orphan,
                        hash: row.hash,
                        topic: topic.clone(),
                        detail: "topic missing or unhealthy".into(),
                    });
                }
                continue;
            };

            for row in rows {
                if cancel.is_cancelled() || issues.len() >= cap {
                    break 'topics;
                }
                let asset = handle
                    .db
                    .pool
                    .with_reader(|conn| asset_ops::get_asset(conn, &row.hash))?;
                match asset {
                    None => issues.push(IndexIssue {
                        kind: IndexIssueKind::Missing,
                        hash: row.hash,
                        topic: topic.clone(),
                        detail: "asset row absent from topic db".into(),
                    }),
                    Some(asset) if asset.container_name != row.container_filename => {
                        issues.push(IndexIssue {
                            kind: IndexIssueKind::Mismatch,
                            hash: row.hash,
                            topic: topic.clone(),
                            detail: format!(
                                "orchestrator says {} but topic db says {}",
                                row.container_filename, asset.container_name
                            ),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        if let Some(identity) = identity {
            self.note_success(identity, Action::Verify, 0);
        }
        Ok(issues)
    }
}
