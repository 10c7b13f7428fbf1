//! Asset row operations on a topic database.

use rusqlite::{params, Connection, OptionalExtension};

use mashbank_core::errors::{to_storage_err, MashResult};
use mashbank_core::models::Asset;

/// Insert one asset row. Runs on the caller's connection or transaction;
/// ingest wraps this together with the chain-hash update so the two
/// commit atomically.
pub fn insert_asset(conn: &Connection, asset: &Asset) -> MashResult<()> {
    conn.execute(
        "INSERT INTO assets (
            hash, original_filename, extension, size_bytes, created_at,
            parent_hash, container_name, byte_offset
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            asset.hash,
            asset.original_filename,
            asset.extension,
            asset.size_bytes,
            asset.created_at,
            asset.parent_hash,
            asset.container_name,
            asset.byte_offset,
        ],
    )
    .map_err(|e| to_storage_err(format!("insert asset: {e}")))?;
    Ok(())
}

fn row_to_asset(row: &rusqlite::Row<'_>) -> rusqlite::Result<Asset> {
    Ok(Asset {
        hash: row.get(0)?,
        original_filename: row.get(1)?,
        extension: row.get(2)?,
        size_bytes: row.get(3)?,
        created_at: row.get(4)?,
        parent_hash: row.get(5)?,
        container_name: row.get(6)?,
        byte_offset: row.get(7)?,
    })
}

const ASSET_COLS: &str = "hash, original_filename, extension, size_bytes, created_at, \
                          parent_hash, container_name, byte_offset";

pub fn get_asset(conn: &Connection, hash: &str) -> MashResult<Option<Asset>> {
    conn.query_row(
        &format!("SELECT {ASSET_COLS} FROM assets WHERE hash = ?1"),
        params![hash],
        row_to_asset,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

pub fn asset_exists(conn: &Connection, hash: &str) -> MashResult<bool> {
    let n: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM assets WHERE hash = ?1",
            params![hash],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n > 0)
}

/// Newest-first page of assets.
pub fn list_assets(conn: &Connection, limit: u64, offset: u64) -> MashResult<Vec<Asset>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ASSET_COLS} FROM assets ORDER BY created_at DESC, hash LIMIT ?1 OFFSET ?2"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![limit, offset], row_to_asset)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// All assets stored in one container, in offset order. Verification
/// cross-checks these against a replay of the container file.
pub fn list_assets_in_container(conn: &Connection, container: &str) -> MashResult<Vec<Asset>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ASSET_COLS} FROM assets WHERE container_name = ?1 ORDER BY byte_offset"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![container], row_to_asset)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// (count, total bytes) for stats snapshots.
pub fn count_and_size(conn: &Connection) -> MashResult<(u64, u64)> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0) FROM assets",
        [],
        |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64)),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
