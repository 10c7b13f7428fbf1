//! v001: asset_index, audit_log.

use rusqlite::Connection;

use mashbank_core::errors::{to_storage_err, MashResult};

pub fn migrate(conn: &Connection) -> MashResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS asset_index (
            hash               TEXT PRIMARY KEY,
            topic              TEXT NOT NULL,
            container_filename TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_asset_index_topic ON asset_index(topic);

        CREATE TABLE IF NOT EXISTS audit_log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            actor     TEXT NOT NULL DEFAULT 'system',
            action    TEXT NOT NULL,
            detail    TEXT NOT NULL DEFAULT '{}',
            timestamp INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_audit_action ON audit_log(action);
        CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
