//! The service facade.

use std::path::Path;
use std::sync::{Arc, Mutex};

use mashbank_auth::store::{quota_ops, seed_bootstrap};
use mashbank_auth::{identity as auth_identity, policy};
use mashbank_core::config::BankConfig;
use mashbank_core::constants::INTERNAL_DIR;
use mashbank_core::errors::{MashError, MashResult};
use mashbank_core::models::{Action, ActionContext, Identity, TopicName};
use mashbank_storage::OrchestratorDb;

use crate::bulk::BulkSessionStore;
use crate::queries::PresetRegistry;
use crate::registry::{TopicHandle, TopicRegistry};
use crate::stats::StatsCache;

/// The asset bank: one working directory, one orchestrator database,
/// and the registered topics. HTTP handlers hold an `Arc<Bank>` and call
/// the pipeline methods spread across this crate's modules.
pub struct Bank {
    pub config: BankConfig,
    pub orchestrator: OrchestratorDb,
    pub registry: TopicRegistry,
    pub stats: StatsCache,
    pub presets: PresetRegistry,
    pub(crate) bulk_sessions: BulkSessionStore,
    pub(crate) reconcile_lock: Mutex<()>,
}

impl Bank {
    /// Open the bank over a configured working directory: build the
    /// `.internal/` layout, open the orchestrator database, register
    /// every topic directory found on disk, and prime the stats cache.
    pub fn open(config: BankConfig) -> MashResult<Arc<Self>> {
        let workdir = config.require_workdir()?.to_path_buf();
        std::fs::create_dir_all(workdir.join(INTERNAL_DIR))?;

        let orchestrator = OrchestratorDb::open(&workdir)?;
        let registry = TopicRegistry::new();
        register_existing_topics(&workdir, &registry);

        let bulk_sessions = BulkSessionStore::new(config.bulk_session_ttl_secs);
        let bank = Arc::new(Self {
            config,
            orchestrator,
            registry,
            stats: StatsCache::new(),
            presets: PresetRegistry::builtin(),
            bulk_sessions,
            reconcile_lock: Mutex::new(()),
        });
        bank.stats.build_all(&bank.registry);
        tracing::info!(
            workdir = %workdir.display(),
            topics = bank.registry.len(),
            "bank opened"
        );
        Ok(bank)
    }

    /// Seed the bootstrap admin if absent. Returns the plaintext API key
    /// on first creation, shown once.
    pub fn seed_bootstrap(&self, username: &str, password: &str) -> MashResult<Option<String>> {
        self.orchestrator
            .pool
            .writer
            .with_conn_sync(|conn| seed_bootstrap(conn, username, password, now()))
    }

    /// Resolve an extracted credential to an identity. Errors are the
    /// specific 401-class codes; callers treat any failure as
    /// unauthenticated (fail closed).
    pub fn resolve_identity(
        &self,
        credential: &auth_identity::Credential,
    ) -> MashResult<Identity> {
        self.orchestrator.pool.writer.with_conn_sync(|conn| {
            auth_identity::resolve_identity(
                conn,
                credential,
                self.config.session_inactivity_secs,
                now(),
            )
        })
    }

    /// Password login, creating a session. Returns the identity and the
    /// plaintext session token.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        ip: &str,
        user_agent: &str,
    ) -> MashResult<(Identity, String)> {
        self.orchestrator.pool.writer.with_conn_sync(|conn| {
            let identity = auth_identity::login_password(
                conn,
                username,
                password,
                self.config.lockout_threshold,
                self.config.lockout_minutes,
                now(),
            )?;
            let (_, token) = mashbank_auth::store::session_ops::create_session(
                conn,
                identity.user_id,
                ip,
                user_agent,
                self.config.session_expiry_secs,
                now(),
            )?;
            Ok((identity, token))
        })
    }

    /// Run the policy evaluator; a denial becomes the tagged error the
    /// handler renders. Returns the matched grant id on success.
    pub(crate) fn authorize(
        &self,
        identity: Option<&Identity>,
        action: Action,
        ctx: &ActionContext,
    ) -> MashResult<i64> {
        let result = self
            .orchestrator
            .pool
            .writer
            .with_conn_sync(|conn| policy::evaluate(conn, identity, action, ctx, now()))?;
        if result.allowed {
            Ok(result.matched_grant.unwrap_or_default())
        } else {
            Err(MashError::new(
                result
                    .denied_code
                    .unwrap_or(mashbank_core::errors::ErrorCode::Forbidden),
                result.reason.unwrap_or_else(|| "denied".into()),
            ))
        }
    }

    /// Post-success quota hook: fire-and-forget. The authorization that
    /// preceded the action already decided; a failed increment is logged
    /// and swallowed.
    pub(crate) fn note_success(&self, identity: &Identity, action: Action, bytes: u64) {
        let date = mashbank_core::models::utc_today();
        let outcome = self.orchestrator.pool.writer.with_conn_sync(|conn| {
            quota_ops::increment(conn, identity.user_id, action, &date, bytes, now())
        });
        if let Err(e) = outcome {
            tracing::warn!(
                user = %identity.username,
                action = %action,
                error = %e,
                "quota increment failed after successful action"
            );
        }
    }

    /// Append one audit row (best-effort for background services).
    pub(crate) fn audit(&self, actor: &str, action: &str, detail: serde_json::Value) {
        let outcome = self.orchestrator.pool.writer.with_conn_sync(|conn| {
            mashbank_storage::orchestrator::audit_ops::append(conn, actor, action, &detail, now())
        });
        if let Err(e) = outcome {
            tracing::warn!(action, error = %e, "audit append failed");
        }
    }
}

/// Scan the workdir for topic directories and register each one that
/// opens cleanly. A directory that fails to open is skipped and logged;
/// accessing it later reports `topic_unhealthy`.
fn register_existing_topics(workdir: &Path, registry: &TopicRegistry) {
    let Ok(entries) = std::fs::read_dir(workdir) else {
        return;
    };
    for entry in entries.flatten() {
        if !entry.path().is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Ok(topic_name) = TopicName::new(name) else {
            continue;
        };
        match TopicHandle::open(workdir, topic_name) {
            Ok(handle) => registry.register(Arc::new(handle)),
            Err(e) => {
                tracing::warn!(topic = name, error = %e, "failed to open topic at startup");
            }
        }
    }
}

/// Current unix time in seconds.
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
