//! Topic creation and listing.

use std::sync::Arc;

use mashbank_core::errors::{MashResult, ServiceError};
use mashbank_core::models::{Action, ActionContext, Identity, SubAction, TopicName, TopicStats};

use crate::bank::Bank;
use crate::registry::TopicHandle;

impl Bank {
    /// Create a topic: validate the name, take the global creation lock,
    /// build the directory with its `.internal/` database, register it,
    /// and audit. Racing creates resolve to `topic_already_exists`.
    pub fn create_topic(&self, identity: Option<&Identity>, name: &str) -> MashResult<TopicStats> {
        let ctx = ActionContext {
            topic: Some(name.to_string()),
            sub_action: Some(SubAction::Create),
            ..Default::default()
        };
        self.authorize(identity, Action::ManageTopics, &ctx)?;

        let topic_name = TopicName::new(name)?;
        let workdir = self.config.require_workdir()?;

        let _creation = self
            .registry
            .creation_lock
            .lock()
            .map_err(|_| ServiceError::InvalidRequest {
                reason: "creation lock poisoned".into(),
            })?;

        if self.registry.contains(name) || workdir.join(name).exists() {
            return Err(ServiceError::TopicAlreadyExists {
                topic: name.to_string(),
            }
            .into());
        }

        std::fs::create_dir_all(workdir.join(name))?;
        let handle = Arc::new(TopicHandle::open(workdir, topic_name)?);
        self.registry.register(handle);
        drop(_creation);

        self.stats.invalidate_topic(&self.registry, name);
        if let Some(identity) = identity {
            self.audit(
                &identity.username,
                "topic_created",
                serde_json::json!({ "topic": name }),
            );
        }
        tracing::info!(topic = name, "topic created");

        self.stats
            .get_topic_stats(name)
            .ok_or_else(|| {
                ServiceError::TopicUnhealthy {
                    topic: name.to_string(),
                    reason: "stats unavailable after create".into(),
                }
                .into()
            })
    }

    /// All registered topics with their cached stats, name order.
    pub fn list_topics(&self) -> Vec<TopicStats> {
        self.registry
            .names()
            .into_iter()
            .filter_map(|name| self.stats.get_topic_stats(&name))
            .collect()
    }

    /// Configuration status for `GET /api/config`.
    pub fn config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "configured": self.config.workdir.is_some(),
            "workdir": self.config.workdir,
            "max_container_size": self.config.max_container_size,
            "max_file_size": self.config.max_file_size,
            "max_bulk_assets": self.config.max_bulk_assets,
            "topic_count": self.registry.len(),
        })
    }
}

/// Set the working directory for `POST /api/config`: create it, persist
/// the configuration inside it, and hand back the config the caller
/// opens a [`Bank`] over.
pub fn configure_workdir(path: &std::path::Path) -> MashResult<mashbank_core::BankConfig> {
    std::fs::create_dir_all(path)?;
    let mut config = mashbank_core::BankConfig::load(path)?;
    config.workdir = Some(path.to_path_buf());
    config.save()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mashbank_core::config::BankConfig;
    use mashbank_core::errors::ErrorCode;

    fn open_bank(dir: &std::path::Path) -> Arc<Bank> {
        let mut config = BankConfig::default();
        config.workdir = Some(dir.to_path_buf());
        Bank::open(config).unwrap()
    }

    fn admin(bank: &Bank) -> Identity {
        bank.seed_bootstrap("root", "rootpw").unwrap();
        bank.orchestrator
            .pool
            .writer
            .with_conn_sync(|conn| {
                let user = mashbank_auth::store::user_ops::get_by_username(conn, "root")?
                    .expect("bootstrap exists");
                Ok(Identity {
                    user_id: user.id,
                    username: user.username,
                    is_active: true,
                    is_bootstrap: true,
                })
            })
            .unwrap()
    }

    #[test]
    fn test_create_topic_and_relist() {
        let dir = tempfile::tempdir().unwrap();
        let bank = open_bank(dir.path());
        let identity = admin(&bank);

        let stats = bank.create_topic(Some(&identity), "docs").unwrap();
        assert_eq!(stats.topic, "docs");
        assert_eq!(stats.asset_count, 0);
        assert!(dir.path().join("docs/.internal/docs.db").exists());

        let err = bank.create_topic(Some(&identity), "docs").unwrap_err();
        assert_eq!(err.code(), ErrorCode::TopicAlreadyExists);

        let err = bank.create_topic(Some(&identity), "Bad Name").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTopicName);

        // A fresh bank over the same workdir re-registers from disk.
        drop(bank);
        let bank = open_bank(dir.path());
        assert!(bank.registry.contains("docs"));
        assert_eq!(bank.list_topics().len(), 1);
    }

    #[test]
    fn test_create_topic_requires_grant() {
        let dir = tempfile::tempdir().unwrap();
        let bank = open_bank(dir.path());
        let err = bank.create_topic(None, "docs").unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuthRequired);
    }
}
