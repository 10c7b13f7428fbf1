//! Shared fixtures for service integration tests.

use std::io::Cursor;
use std::sync::Arc;

use mashbank_core::config::BankConfig;
use mashbank_core::models::Identity;
use mashbank_service::{Bank, IngestOutcome};

/// Open a bank over a temp workdir with test-friendly sizing.
pub fn open_bank(dir: &std::path::Path) -> Arc<Bank> {
    open_bank_with(dir, |_| {})
}

pub fn open_bank_with(dir: &std::path::Path, tweak: impl FnOnce(&mut BankConfig)) -> Arc<Bank> {
    let mut config = BankConfig::default();
    config.workdir = Some(dir.to_path_buf());
    tweak(&mut config);
    Bank::open(config).unwrap()
}

/// Seed the bootstrap admin and return its identity.
pub fn admin(bank: &Bank) -> Identity {
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

pub fn upload_bytes(
    bank: &Bank,
    identity: &Identity,
    topic: &str,
    data: &[u8],
    filename: &str,
) -> IngestOutcome {
    bank.upload(
        Some(identity),
        topic,
        &mut Cursor::new(data),
        data.len() as u64,
        filename,
        None,
    )
    .unwrap()
}
