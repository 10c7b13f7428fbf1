//! Container hash-chain records.

use rusqlite::{params, Connection, OptionalExtension};

use mashbank_core::errors::{to_storage_err, MashResult};

/// Stored (entry_count, chain_hash) for one container. A container with
/// no record yet reads as (0, "").
pub fn get_chain(conn: &Connection, container: &str) -> MashResult<(u64, String)> {
    let row = conn
        .query_row(
            "SELECT entry_count, chain_hash FROM container_hashes WHERE container_name = ?1",
            params![container],
            |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(row.unwrap_or((0, String::new())))
}

/// Write the advanced chain state. Runs on the caller's transaction so
/// it commits atomically with the asset insert.
pub fn upsert_chain(
    conn: &Connection,
    container: &str,
    entry_count: u64,
    chain_hash: &str,
    now: i64,
) -> MashResult<()> {
    conn.execute(
        "INSERT INTO container_hashes (container_name, entry_count, chain_hash, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(container_name) DO UPDATE SET
             entry_count = excluded.entry_count,
             chain_hash = excluded.chain_hash,
             updated_at = excluded.updated_at",
        params![container, entry_count as i64, chain_hash, now],
    )
    .map_err(|e| to_storage_err(format!("upsert chain: {e}")))?;
    Ok(())
}

/// Containers with a chain record, in name order.
pub fn list_containers(conn: &Connection) -> MashResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT container_name FROM container_hashes ORDER BY container_name")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
