//! Reconciliation and verification end-to-end tests.

mod common;

use common::{admin, open_bank, upload_bytes};
use mashbank_core::cancel::CancelFlag;
use mashbank_core::models::{IndexIssueKind, VerifyStatus};
use mashbank_storage::orchestrator::index_ops;

#[test]
fn test_reconciliation_purges_vanished_topic() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    let identity = admin(&bank);
    bank.create_topic(Some(&identity), "alpha").unwrap();
    bank.create_topic(Some(&identity), "beta").unwrap();

    upload_bytes(&bank, &identity, "alpha", b"a1", "a1.bin");
    upload_bytes(&bank, &identity, "beta", b"b1", "b1.bin");
    upload_bytes(&bank, &identity, "beta", b"b2", "b2.bin");

    // Simulate a manual topic removal.
    std::fs::remove_dir_all(dir.path().join("beta")).unwrap();

    let report = bank.reconcile().unwrap();
    assert_eq!(report.removed, vec![("beta".to_string(), 2)]);
    assert!(!bank.registry.contains("beta"));
    assert!(bank.stats.get_topic_stats("beta").is_none());

    // Alpha untouched; index holds only alpha's row.
    assert!(bank.registry.contains("alpha"));
    assert_eq!(
        bank.orchestrator
            .pool
            .with_reader(|conn| index_ops::count_hashes(conn))
            .unwrap(),
        1
    );

    // One audit entry with the purge count.
    let audit = bank
        .orchestrator
        .pool
        .with_reader(|conn| {
            mashbank_storage::orchestrator::audit_ops::by_action(
                conn,
                "reconcile_topic_removed",
                10,
            )
        })
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].detail["topic"], "beta");
    assert_eq!(audit[0].detail["entries_purged"], 2);

    // Idempotent: a second pass changes nothing and audits nothing.
    let report = bank.reconcile().unwrap();
    assert!(report.removed.is_empty());
    let audit = bank
        .orchestrator
        .pool
        .with_reader(|conn| {
            mashbank_storage::orchestrator::audit_ops::by_action(
                conn,
                "reconcile_topic_removed",
                10,
            )
        })
        .unwrap();
    assert_eq!(audit.len(), 1);
}

#[test]
fn test_reconciliation_leaves_unregistered_directories_alone() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    // A directory nothing references: present on disk, absent from the
    // index. The filesystem is authoritative only for removal.
    std::fs::create_dir(dir.path().join("stray")).unwrap();

    let report = bank.reconcile().unwrap();
    assert!(report.removed.is_empty());
    assert!(dir.path().join("stray").exists());
}

#[test]
fn test_verify_container_clean() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    let identity = admin(&bank);
    bank.create_topic(Some(&identity), "docs").unwrap();
    upload_bytes(&bank, &identity, "docs", &[1u8; 300], "a.bin");
    upload_bytes(&bank, &identity, "docs", &[2u8; 300], "b.bin");

    let report = bank
        .verify_container(Some(&identity), "docs", "001.dat", &CancelFlag::new(), |_| {})
        .unwrap();
    assert_eq!(report.status, VerifyStatus::Ok);
    assert_eq!(report.stored_count, 2);
    assert_eq!(report.replayed_count, 2);
    assert_eq!(report.stored_chain, report.replayed_chain);
}

#[test]
fn test_verify_detects_truncation() {
    // Truncating one byte off the final entry drops it from the replay:
    // the stored count no longer matches, while earlier entries stay
    // readable.
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    let identity = admin(&bank);
    bank.create_topic(Some(&identity), "docs").unwrap();
    let first = upload_bytes(&bank, &identity, "docs", &[1u8; 300], "a.bin");
    upload_bytes(&bank, &identity, "docs", &[2u8; 300], "b.bin");

    let container = dir.path().join("docs/001.dat");
    let raw = std::fs::read(&container).unwrap();
    std::fs::write(&container, &raw[..raw.len() - 1]).unwrap();

    let report = bank
        .verify_container(Some(&identity), "docs", "001.dat", &CancelFlag::new(), |_| {})
        .unwrap();
    assert_eq!(report.status, VerifyStatus::CountMismatch);
    assert_eq!(report.stored_count, 2);
    assert_eq!(report.replayed_count, 1);
    assert!(report.detail.as_deref().unwrap().contains("entry count mismatch"));

    // Prior entries remain downloadable.
    let reply = bank
        .download(
            Some(&identity),
            &first.hash,
            mashbank_core::models::FilenameFormat::Hash,
        )
        .unwrap();
    assert_eq!(reply.data, vec![1u8; 300]);
}

#[test]
fn test_verify_detects_corrupted_byte() {
    // Flipping a data byte keeps the entry count but breaks the chain.
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    let identity = admin(&bank);
    bank.create_topic(Some(&identity), "docs").unwrap();
    upload_bytes(&bank, &identity, "docs", &[7u8; 256], "a.bin");

    let container = dir.path().join("docs/001.dat");
    let mut raw = std::fs::read(&container).unwrap();
    raw[110 + 100] ^= 0xff;
    std::fs::write(&container, &raw).unwrap();

    let report = bank
        .verify_container(Some(&identity), "docs", "001.dat", &CancelFlag::new(), |_| {})
        .unwrap();
    assert_eq!(report.status, VerifyStatus::HashMismatch);
}

#[test]
fn test_verify_topic_covers_all_containers() {
    let dir = tempfile::tempdir().unwrap();
    let bank = common::open_bank_with(dir.path(), |c| c.max_container_size = 1024);
    let identity = admin(&bank);
    bank.create_topic(Some(&identity), "docs").unwrap();
    for i in 0..4u8 {
        upload_bytes(&bank, &identity, "docs", &vec![i + 1; 400], &format!("{i}.bin"));
    }

    let reports = bank
        .verify_topic(Some(&identity), "docs", &CancelFlag::new(), |_, _| {})
        .unwrap();
    assert!(reports.len() >= 2);
    assert!(reports.iter().all(|r| r.status == VerifyStatus::Ok));
}

#[test]
fn test_verify_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    let identity = admin(&bank);
    bank.create_topic(Some(&identity), "docs").unwrap();
    for i in 0..600u32 {
        upload_bytes(&bank, &identity, "docs", &i.to_le_bytes(), &format!("{i}.bin"));
    }

    let cancel = CancelFlag::new();
    cancel.cancel();
    let report = bank
        .verify_container(Some(&identity), "docs", "001.dat", &cancel, |_| {})
        .unwrap();
    assert_eq!(report.status, VerifyStatus::Cancelled);
}

#[test]
fn test_verify_index_categorizes_discrepancies() {
    let dir = tempfile::tempdir().unwrap();
    let bank = open_bank(dir.path());
    let identity = admin(&bank);
    bank.create_topic(Some(&identity), "alpha").unwrap();
    let kept = upload_bytes(&bank, &identity, "alpha", b"kept", "kept.bin");

    // missing: an index row whose asset row never existed.
    // mismatch: an index row pointing at the wrong container.
    // orphan: rows of a topic that is not registered at all.
    bank.orchestrator
        .pool
        .writer
        .with_conn_sync(|conn| {
            index_ops::insert_row(conn, &"aa".repeat(32), "alpha", "001.dat")?;
            index_ops::insert_row(conn, &"bb".repeat(32), "ghost", "001.dat")?;
            conn.execute(
                "UPDATE asset_index SET container_filename = '009.dat' WHERE hash = ?1",
                rusqlite::params![kept.hash],
            )
            .map_err(|e| mashbank_core::errors::to_storage_err(e.to_string()))?;
            Ok(())
        })
        .unwrap();

    let issues = bank
        .verify_index(Some(&identity), &CancelFlag::new())
        .unwrap();
    assert_eq!(issues.len(), 3);
    let kind_of = |hash: &str| {
        issues
            .iter()
            .find(|i| i.hash == hash)
            .map(|i| i.kind)
            .unwrap()
    };
    assert_eq!(kind_of(&"aa".repeat(32)), IndexIssueKind::Missing);
    assert_eq!(kind_of(&"bb".repeat(32)), IndexIssueKind::Orphan);
    assert_eq!(kind_of(&kept.hash), IndexIssueKind::Mismatch);
}
