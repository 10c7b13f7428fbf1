//! v001: assets, metadata_log, computed_metadata, container_hashes.

use rusqlite::Connection;

use mashbank_core::errors::{to_storage_err, MashResult};

pub fn migrate(conn: &Connection) -> MashResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS assets (
            hash              TEXT PRIMARY KEY,
            original_filename TEXT NOT NULL,
            extension         TEXT NOT NULL DEFAULT '',
            size_bytes        INTEGER NOT NULL,
            created_at        INTEGER NOT NULL,
            parent_hash       TEXT,
            container_name    TEXT NOT NULL,
            byte_offset       INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_assets_container ON assets(container_name);
        CREATE INDEX IF NOT EXISTS idx_assets_created ON assets(created_at);
        CREATE INDEX IF NOT EXISTS idx_assets_extension ON assets(extension);

        CREATE TABLE IF NOT EXISTS metadata_log (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            asset_hash        TEXT NOT NULL,
            key               TEXT NOT NULL,
            op                TEXT NOT NULL,
            value             TEXT,
            processor         TEXT NOT NULL,
            processor_version TEXT NOT NULL DEFAULT '',
            timestamp         INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_metadata_log_asset ON metadata_log(asset_hash, key);

        CREATE TABLE IF NOT EXISTS computed_metadata (
            asset_hash TEXT NOT NULL,
            key        TEXT NOT NULL,
            value      TEXT NOT NULL,
            processor  TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (asset_hash, key)
        );

        CREATE TABLE IF NOT EXISTS container_hashes (
            container_name TEXT PRIMARY KEY,
            entry_count    INTEGER NOT NULL DEFAULT 0,
            chain_hash     TEXT NOT NULL DEFAULT '',
            updated_at     INTEGER NOT NULL
        );
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
