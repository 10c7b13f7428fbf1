//! Orchestrator database migrations, tracked via `PRAGMA user_version`.

mod v001_index_audit;
mod v002_auth_tables;

use rusqlite::Connection;

use mashbank_core::errors::{to_storage_err, MashResult, StorageError};

const MIGRATIONS: &[(u32, fn(&Connection) -> MashResult<()>)] = &[
    (1, v001_index_audit::migrate),
    (2, v002_auth_tables::migrate),
];

/// Apply any outstanding migrations.
pub fn run_migrations(conn: &Connection) -> MashResult<()> {
    let current: u32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;

    for (version, migrate) in MIGRATIONS {
        if *version <= current {
            continue;
        }
        migrate(conn).map_err(|e| {
            mashbank_core::errors::MashError::Storage(StorageError::MigrationFailed {
                version: *version,
                reason: e.to_string(),
            })
        })?;
        conn.pragma_update(None, "user_version", version)
            .map_err(|e| to_storage_err(e.to_string()))?;
        tracing::debug!(version, "orchestrator db migrated");
    }
    Ok(())
}
