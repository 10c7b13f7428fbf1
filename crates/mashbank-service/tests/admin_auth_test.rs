//! Administration and authorization end-to-end tests.

mod common;

use std::io::Cursor;

use common::{admin, open_bank, upload_bytes};
use mashbank_auth::identity::Credential;
use mashbank_auth::store::grant_ops;
use mashbank_core::errors::ErrorCode;
use mashbank_core::models::{Action, Identity};

fn identity_of(user: &mashbank_core::models::User) -> Identity {
    Identity {
        user_id: user.id,
        username: user.username.clone(),
        is_active: user.is_active,
        is_bootstrap: user.is_bootstrap,
    }
}

#[test]
fn test_admin_creates_constrained_uploader() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    let root = admin(&bank);
    bank.create_topic(Some(&root), "public").unwrap();
    bank.create_topic(Some(&root), "private").unwrap();

    let (worker, _key) = bank
        .create_user(Some(&root), "worker", "Worker", "workerpw")
        .unwrap();
    bank.create_grant(
        Some(&root),
        worker.id,
        Action::Upload,
        Some(r#"{"allowed_topics": ["public"], "allowed_extensions": ["txt"]}"#),
    )
    .unwrap();
    let worker_id = identity_of(&worker);

    // Allowed: txt into public.
    let ok = bank
        .upload(
            Some(&worker_id),
            "public",
            &mut Cursor::new(b"fine".as_slice()),
            4,
            "note.txt",
            None,
        )
        .unwrap();
    assert!(!ok.skipped);

    // Wrong topic.
    let err = bank
        .upload(
            Some(&worker_id),
            "private",
            &mut Cursor::new(b"nope".as_slice()),
            4,
            "note.txt",
            None,
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConstraintViolation);

    // Wrong extension.
    let err = bank
        .upload(
            Some(&worker_id),
            "public",
            &mut Cursor::new(b"nope".as_slice()),
            4,
            "binary.exe",
            None,
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConstraintViolation);

    // No download grant at all.
    let err = bank
        .download(
            Some(&worker_id),
            &ok.hash,
            mashbank_core::models::FilenameFormat::Hash,
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[test]
fn test_revoked_grant_stops_matching() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    let root = admin(&bank);
    bank.create_topic(Some(&root), "docs").unwrap();

    let (worker, _) = bank.create_user(Some(&root), "worker", "", "pw").unwrap();
    let grant = bank
        .create_grant(Some(&root), worker.id, Action::Upload, None)
        .unwrap();
    let worker_id = identity_of(&worker);

    upload_bytes(&bank, &worker_id, "docs", b"before", "a.txt");

    bank.revoke_grant(Some(&root), grant.id).unwrap();
    let err = bank
        .upload(
            Some(&worker_id),
            "docs",
            &mut Cursor::new(b"after".as_slice()),
            5,
            "b.txt",
            None,
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);

    // The grant history shows created then revoked.
    let history = bank.grant_history(Some(&root), grant.id).unwrap();
    assert_eq!(history.len(), 2);
}

#[test]
fn test_grant_escalation_rules() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    let root = admin(&bank);

    // A manager allowed to create users but not to escalate.
    let (manager, _) = bank.create_user(Some(&root), "manager", "", "pw").unwrap();
    bank.orchestrator
        .pool
        .writer
        .with_conn_sync(|conn| {
            grant_ops::create_grant(
                conn,
                manager.id,
                Action::ManageUsers,
                Some(r#"{"can_create": true, "can_edit": true, "escalation_allowed": false}"#),
                "root",
                0,
            )
            .map(|_| ())
        })
        .unwrap();
    let manager_id = identity_of(&manager);

    let (minion, _) = bank
        .create_user(Some(&manager_id), "minion", "", "pw")
        .unwrap();

    // Manager holds manage_users, so handing it out is allowed.
    bank.create_grant(Some(&manager_id), minion.id, Action::ManageUsers, None)
        .unwrap();

    // Manager does not hold verify: escalation denied.
    let err = bank
        .create_grant(Some(&manager_id), minion.id, Action::Verify, None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::EscalationDenied);

    // The bootstrap admin escalates freely (unconstrained grant).
    bank.create_grant(Some(&root), minion.id, Action::Verify, None)
        .unwrap();
}

#[test]
fn test_disable_user_and_bootstrap_protection() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    let root = admin(&bank);

    let (victim, _) = bank.create_user(Some(&root), "victim", "", "pw").unwrap();
    bank.set_user_active(Some(&root), victim.id, false).unwrap();

    // A disabled identity fails phase one even with a valid grant shape.
    let disabled = Identity {
        is_active: false,
        ..identity_of(&victim)
    };
    let err = bank.view_audit(Some(&disabled), 10).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UserDisabled);

    let root_user = bank
        .orchestrator
        .pool
        .with_reader(|conn| mashbank_auth::store::user_ops::get_by_username(conn, "root"))
        .unwrap()
        .unwrap();
    let err = bank
        .set_user_active(Some(&root), root_user.id, false)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[test]
fn test_api_key_identity_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    let root = admin(&bank);

    let (worker, api_key) = bank.create_user(Some(&root), "worker", "", "pw").unwrap();

    let resolved = bank
        .resolve_identity(&Credential::ApiKey(api_key.clone()))
        .unwrap();
    assert_eq!(resolved.user_id, worker.id);

    let err = bank
        .resolve_identity(&Credential::ApiKey("mbk_bogus".into()))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidCredentials);

    // Disabled accounts fail resolution regardless of credential.
    bank.set_user_active(Some(&root), worker.id, false).unwrap();
    let err = bank
        .resolve_identity(&Credential::ApiKey(api_key))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::UserDisabled);
}

#[test]
fn test_login_session_roundtrip_and_lockout() {
    let dir = tempfile::tempdir().unwrap();
    let bank = common::open_bank_with(dir.path(), |c| {
        c.lockout_threshold = 2;
        c.lockout_minutes = 15;
    });
    let root = admin(&bank);
    bank.create_user(Some(&root), "worker", "", "goodpw").unwrap();

    let (identity, token) = bank.login("worker", "goodpw", "10.0.0.9", "test").unwrap();
    assert_eq!(identity.username, "worker");

    let resolved = bank
        .resolve_identity(&Credential::SessionToken(token))
        .unwrap();
    assert_eq!(resolved.username, "worker");

    // Two bad passwords lock the account; the third correct attempt
    // still fails while locked.
    assert!(bank.login("worker", "bad", "", "").is_err());
    assert!(bank.login("worker", "bad", "", "").is_err());
    let err = bank.login("worker", "goodpw", "", "").unwrap_err();
    assert_eq!(err.code(), ErrorCode::AccountLocked);
}

#[test]
fn test_audit_records_admin_actions() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    let root = admin(&bank);
    bank.create_topic(Some(&root), "docs").unwrap();
    bank.create_user(Some(&root), "worker", "", "pw").unwrap();

    let entries = bank.view_audit(Some(&root), 50).unwrap();
    let actions: Vec<&str> = entries.iter().map(|e| e.action.as_str()).collect();
    assert!(actions.contains(&"topic_created"));
    assert!(actions.contains(&"user_created"));

    // Audit viewing itself requires a grant.
    let err = bank.view_audit(None, 10).unwrap_err();
    assert_eq!(err.code(), ErrorCode::AuthRequired);
}
