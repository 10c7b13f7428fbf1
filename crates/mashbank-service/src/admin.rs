//! User and grant administration, and audit-log viewing.

use mashbank_auth::store::{grant_ops, user_ops};
use mashbank_core::errors::MashResult;
use mashbank_core::models::{
    Action, ActionContext, AuditEntry, Grant, GrantLogEntry, Identity, SubAction, User,
};
use mashbank_storage::orchestrator::audit_ops;

use crate::bank::{now, Bank};

impl Bank {
    /// Create a user. Requires a manage_users grant with `can_create`.
    /// Returns the new user and their plaintext API key, shown once.
    pub fn create_user(
        &self,
        identity: Option<&Identity>,
        username: &str,
        display_name: &str,
        password: &str,
    ) -> MashResult<(User, String)> {
        let ctx = ActionContext {
            sub_action: Some(SubAction::Create),
            ..Default::default()
        };
        self.authorize(identity, Action::ManageUsers, &ctx)?;

        let actor = identity.map(|i| i.username.clone()).unwrap_or_default();
        let created = self.orchestrator.pool.writer.with_conn_sync(|conn| {
            user_ops::create_user(conn, username, display_name, password, &actor, false, now())
        })?;
        self.audit(
            &actor,
            "user_created",
            serde_json::json!({ "username": username }),
        );
        Ok(created)
    }

    /// Disable or re-enable a user. The bootstrap user is protected.
    pub fn set_user_active(
        &self,
        identity: Option<&Identity>,
        user_id: i64,
        active: bool,
    ) -> MashResult<()> {
        let ctx = ActionContext {
            sub_action: Some(if active {
                SubAction::Edit
            } else {
                SubAction::Disable
            }),
            ..Default::default()
        };
        self.authorize(identity, Action::ManageUsers, &ctx)?;

        self.orchestrator
            .pool
            .writer
            .with_conn_sync(|conn| user_ops::set_active(conn, user_id, active, now()))?;
        let actor = identity.map(|i| i.username.clone()).unwrap_or_default();
        self.audit(
            &actor,
            if active { "user_enabled" } else { "user_disabled" },
            serde_json::json!({ "user_id": user_id }),
        );
        Ok(())
    }

    /// Grant an action to a user. Escalation rules apply: the manager's
    /// grant decides whether actions they do not hold may be given out.
    pub fn create_grant(
        &self,
        identity: Option<&Identity>,
        user_id: i64,
        action: Action,
        constraints_json: Option<&str>,
    ) -> MashResult<Grant> {
        let ctx = ActionContext {
            sub_action: Some(SubAction::Edit),
            granting_actions: Some(vec![action]),
            ..Default::default()
        };
        self.authorize(identity, Action::ManageUsers, &ctx)?;

        let actor = identity.map(|i| i.username.clone()).unwrap_or_default();
        let grant = self.orchestrator.pool.writer.with_conn_sync(|conn| {
            grant_ops::create_grant(conn, user_id, action, constraints_json, &actor, now())
        })?;
        self.audit(
            &actor,
            "grant_created",
            serde_json::json!({ "user_id": user_id, "action": action.as_str() }),
        );
        Ok(grant)
    }

    /// Replace a grant's constraints (grant-logged).
    pub fn update_grant_constraints(
        &self,
        identity: Option<&Identity>,
        grant_id: i64,
        constraints_json: Option<&str>,
    ) -> MashResult<()> {
        let ctx = ActionContext {
            sub_action: Some(SubAction::Edit),
            ..Default::default()
        };
        self.authorize(identity, Action::ManageUsers, &ctx)?;

        let actor = identity.map(|i| i.username.clone()).unwrap_or_default();
        self.orchestrator.pool.writer.with_conn_sync(|conn| {
            grant_ops::update_constraints(conn, grant_id, constraints_json, &actor, now())
        })?;
        self.audit(
            &actor,
            "grant_updated",
            serde_json::json!({ "grant_id": grant_id }),
        );
        Ok(())
    }

    /// Soft-revoke a grant (grant-logged).
    pub fn revoke_grant(&self, identity: Option<&Identity>, grant_id: i64) -> MashResult<()> {
        let ctx = ActionContext {
            sub_action: Some(SubAction::Edit),
            ..Default::default()
        };
        self.authorize(identity, Action::ManageUsers, &ctx)?;

        let actor = identity.map(|i| i.username.clone()).unwrap_or_default();
        self.orchestrator
            .pool
            .writer
            .with_conn_sync(|conn| grant_ops::revoke(conn, grant_id, &actor, now()))?;
        self.audit(
            &actor,
            "grant_revoked",
            serde_json::json!({ "grant_id": grant_id }),
        );
        Ok(())
    }

    /// The change history of one grant, oldest first.
    pub fn grant_history(
        &self,
        identity: Option<&Identity>,
        grant_id: i64,
    ) -> MashResult<Vec<GrantLogEntry>> {
        self.authorize(identity, Action::ViewAudit, &ActionContext::default())?;
        self.orchestrator
            .pool
            .with_reader(|conn| grant_ops::log_for_grant(conn, grant_id))
    }

    /// Recent action audit entries, newest first.
    pub fn view_audit(
        &self,
        identity: Option<&Identity>,
        limit: u64,
    ) -> MashResult<Vec<AuditEntry>> {
        self.authorize(identity, Action::ViewAudit, &ActionContext::default())?;
        self.orchestrator
            .pool
            .with_reader(|conn| audit_ops::recent(conn, limit))
    }
}
