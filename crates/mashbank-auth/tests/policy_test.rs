//! Integration tests: the three-phase policy evaluator.

use mashbank_auth::policy::evaluate;
use mashbank_auth::store::{grant_ops, quota_ops, user_ops};
use mashbank_core::errors::ErrorCode;
use mashbank_core::models::{Action, ActionContext, Identity, SubAction};
use mashbank_storage::OrchestratorDb;

const NOW: i64 = 1_754_006_400; // 2025-08-01 00:00:00 UTC
const TODAY: &str = "2025-08-01";

struct Fixture {
    db: OrchestratorDb,
    identity: Identity,
}

impl Fixture {
    fn new() -> Self {
        let db = OrchestratorDb::open_in_memory().unwrap();
        let identity = db
            .pool
            .writer
            .with_conn_sync(|conn| {
                let (user, _) =
                    user_ops::create_user(conn, "worker", "", "pw", "", false, NOW).unwrap();
                Ok(Identity {
                    user_id: user.id,
                    username: user.username,
                    is_active: true,
                    is_bootstrap: false,
                })
            })
            .unwrap();
        Self { db, identity }
    }

    fn grant(&self, action: Action, constraints: Option<&str>) -> i64 {
        self.db
            .pool
            .writer
            .with_conn_sync(|conn| {
                grant_ops::create_grant(conn, self.identity.user_id, action, constraints, "t", NOW)
            })
            .unwrap()
            .id
    }

    fn eval(&self, action: Action, ctx: &ActionContext) -> mashbank_core::models::PolicyResult {
        self.db
            .pool
            .writer
            .with_conn_sync(|conn| evaluate(conn, Some(&self.identity), action, ctx, NOW))
            .unwrap()
    }
}

#[test]
fn test_missing_identity_fails_phase_one() {
    let fx = Fixture::new();
    let result = fx
        .db
        .pool
        .writer
        .with_conn_sync(|conn| {
            evaluate(conn, None, Action::Upload, &ActionContext::default(), NOW)
        })
        .unwrap();
    assert!(!result.allowed);
    assert_eq!(result.denied_code, Some(ErrorCode::AuthRequired));
}

#[test]
fn test_inactive_identity_fails_phase_one() {
    let fx = Fixture::new();
    let mut disabled = fx.identity.clone();
    disabled.is_active = false;
    let result = fx
        .db
        .pool
        .writer
        .with_conn_sync(|conn| {
            evaluate(conn, Some(&disabled), Action::Upload, &ActionContext::default(), NOW)
        })
        .unwrap();
    assert_eq!(result.denied_code, Some(ErrorCode::UserDisabled));
}

#[test]
fn test_no_grant_fails_phase_two() {
    let fx = Fixture::new();
    let result = fx.eval(Action::Upload, &ActionContext::for_upload("docs", "txt", 1));
    assert_eq!(result.denied_code, Some(ErrorCode::Forbidden));
}

#[test]
fn test_unconstrained_grant_passes() {
    let fx = Fixture::new();
    let grant_id = fx.grant(Action::Upload, None);
    let result = fx.eval(Action::Upload, &ActionContext::for_upload("docs", "txt", 1));
    assert!(result.allowed);
    assert_eq!(result.matched_grant, Some(grant_id));
}

#[test]
fn test_first_passing_grant_wins() {
    // Grants: upload{allowed_topics:["alpha"]} then upload{}. An upload
    // to "beta" fails the first and matches the second.
    let fx = Fixture::new();
    let _first = fx.grant(Action::Upload, Some(r#"{"allowed_topics": ["alpha"]}"#));
    let second = fx.grant(Action::Upload, None);

    let result = fx.eval(Action::Upload, &ActionContext::for_upload("beta", "txt", 1));
    assert!(result.allowed);
    assert_eq!(result.matched_grant, Some(second));
}

#[test]
fn test_all_failing_returns_last_denial() {
    let fx = Fixture::new();
    fx.grant(Action::Upload, Some(r#"{"allowed_topics": ["alpha"]}"#));
    fx.grant(Action::Upload, Some(r#"{"allowed_extensions": ["png"]}"#));

    let result = fx.eval(Action::Upload, &ActionContext::for_upload("beta", "txt", 1));
    assert!(!result.allowed);
    assert_eq!(result.denied_code, Some(ErrorCode::ConstraintViolation));
    // The last grant's failure is the surfaced reason.
    assert!(result.reason.unwrap().contains("allowed_extensions"));
}

#[test]
fn test_extension_check_is_case_insensitive() {
    let fx = Fixture::new();
    fx.grant(Action::Upload, Some(r#"{"allowed_extensions": ["PNG"]}"#));
    assert!(fx
        .eval(Action::Upload, &ActionContext::for_upload("docs", "png", 1))
        .allowed);
    assert!(!fx
        .eval(Action::Upload, &ActionContext::for_upload("docs", "jpg", 1))
        .allowed);
    // Empty extension bypasses the filter entirely.
    assert!(fx
        .eval(Action::Upload, &ActionContext::for_upload("docs", "", 1))
        .allowed);
}

#[test]
fn test_topic_check_is_case_sensitive() {
    let fx = Fixture::new();
    fx.grant(Action::Upload, Some(r#"{"allowed_topics": ["docs"]}"#));
    assert!(fx
        .eval(Action::Upload, &ActionContext::for_upload("docs", "txt", 1))
        .allowed);
    // Topic names are lowercase by construction, but the comparison
    // itself must not fold case.
    assert!(!fx
        .eval(Action::Upload, &ActionContext::for_upload("Docs", "txt", 1))
        .allowed);
}

#[test]
fn test_size_ceiling_zero_means_unconfigured() {
    let fx = Fixture::new();
    fx.grant(Action::Upload, Some(r#"{"max_file_size_bytes": 0}"#));
    assert!(fx
        .eval(Action::Upload, &ActionContext::for_upload("docs", "bin", u64::MAX / 2))
        .allowed);
}

#[test]
fn test_size_ceiling_enforced() {
    let fx = Fixture::new();
    fx.grant(Action::Upload, Some(r#"{"max_file_size_bytes": 100}"#));
    assert!(fx
        .eval(Action::Upload, &ActionContext::for_upload("docs", "bin", 100))
        .allowed);
    let result = fx.eval(Action::Upload, &ActionContext::for_upload("docs", "bin", 101));
    assert_eq!(result.denied_code, Some(ErrorCode::ConstraintViolation));
}

#[test]
fn test_daily_count_quota_exhaustion() {
    // Three 1-byte uploads succeed; the fourth is quota_exceeded with
    // "3/3" in the message.
    let fx = Fixture::new();
    fx.grant(Action::Upload, Some(r#"{"daily_count_limit": 3}"#));
    let ctx = ActionContext::for_upload("docs", "txt", 1);

    for _ in 0..3 {
        let result = fx.eval(Action::Upload, &ctx);
        assert!(result.allowed);
        // The post-success hook the pipeline runs after each upload.
        fx.db
            .pool
            .writer
            .with_conn_sync(|conn| {
                quota_ops::increment(conn, fx.identity.user_id, Action::Upload, TODAY, 1, NOW)
            })
            .unwrap();
    }

    let result = fx.eval(Action::Upload, &ctx);
    assert!(!result.allowed);
    assert_eq!(result.denied_code, Some(ErrorCode::QuotaExceeded));
    assert!(result.reason.unwrap().contains("3/3"));
}

#[test]
fn test_daily_volume_quota_allows_equality() {
    let fx = Fixture::new();
    fx.grant(Action::Upload, Some(r#"{"daily_volume_bytes": 1000}"#));

    fx.db
        .pool
        .writer
        .with_conn_sync(|conn| {
            quota_ops::increment(conn, fx.identity.user_id, Action::Upload, TODAY, 900, NOW)
        })
        .unwrap();

    // usage + request == limit is permitted.
    assert!(fx
        .eval(Action::Upload, &ActionContext::for_upload("docs", "txt", 100))
        .allowed);
    // One byte over is not.
    let result = fx.eval(Action::Upload, &ActionContext::for_upload("docs", "txt", 101));
    assert_eq!(result.denied_code, Some(ErrorCode::QuotaExceeded));
}

#[test]
fn test_malformed_constraints_deny() {
    let fx = Fixture::new();
    // Bypass write-time validation by inserting the row directly, as a
    // corrupted deployment would.
    fx.db
        .pool
        .writer
        .with_conn_sync(|conn| {
            conn.execute(
                "INSERT INTO grants (user_id, action, constraints_json, is_active, created_at, created_by)
                 VALUES (?1, 'upload', '{not json', 1, ?2, '')",
                rusqlite::params![fx.identity.user_id, NOW],
            )
            .map_err(|e| mashbank_core::errors::to_storage_err(e.to_string()))?;
            Ok(())
        })
        .unwrap();

    let result = fx.eval(Action::Upload, &ActionContext::for_upload("docs", "txt", 1));
    assert!(!result.allowed);
    assert_eq!(result.denied_code, Some(ErrorCode::ConstraintViolation));
}

#[test]
fn test_bulk_asset_count_cap() {
    let fx = Fixture::new();
    fx.grant(
        Action::BulkDownload,
        Some(r#"{"max_assets_per_request": 10}"#),
    );

    assert!(fx
        .eval(Action::BulkDownload, &ActionContext::for_bulk(10, 1000))
        .allowed);
    let result = fx.eval(Action::BulkDownload, &ActionContext::for_bulk(11, 1000));
    assert_eq!(result.denied_code, Some(ErrorCode::BulkTooLarge));
}

#[test]
fn test_manage_users_sub_actions() {
    let fx = Fixture::new();
    fx.grant(
        Action::ManageUsers,
        Some(r#"{"can_create": true, "can_disable": false}"#),
    );

    let mut ctx = ActionContext::default();
    ctx.sub_action = Some(SubAction::Create);
    assert!(fx.eval(Action::ManageUsers, &ctx).allowed);

    ctx.sub_action = Some(SubAction::Disable);
    let result = fx.eval(Action::ManageUsers, &ctx);
    assert_eq!(result.denied_code, Some(ErrorCode::ConstraintViolation));
}

#[test]
fn test_escalation_denied_without_held_action() {
    let fx = Fixture::new();
    fx.grant(
        Action::ManageUsers,
        Some(r#"{"escalation_allowed": false}"#),
    );
    // The manager holds manage_users but not verify.
    let mut ctx = ActionContext::default();
    ctx.granting_actions = Some(vec![Action::Verify]);

    let result = fx.eval(Action::ManageUsers, &ctx);
    assert_eq!(result.denied_code, Some(ErrorCode::EscalationDenied));

    // Granting an action the manager holds is fine.
    ctx.granting_actions = Some(vec![Action::ManageUsers]);
    assert!(fx.eval(Action::ManageUsers, &ctx).allowed);
}

#[test]
fn test_query_preset_allowlist() {
    let fx = Fixture::new();
    fx.grant(Action::Query, Some(r#"{"allowed_presets": ["by-extension"]}"#));

    assert!(fx
        .eval(Action::Query, &ActionContext::for_query("by-extension"))
        .allowed);
    let result = fx.eval(Action::Query, &ActionContext::for_query("all-assets"));
    assert_eq!(result.denied_code, Some(ErrorCode::ConstraintViolation));
}
