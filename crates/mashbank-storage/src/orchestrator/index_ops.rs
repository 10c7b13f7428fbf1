//! The cross-topic asset index: hash -> (topic, container).

use rusqlite::{params, Connection, ErrorCode as SqliteCode, OptionalExtension};

use mashbank_core::errors::{to_storage_err, MashError, MashResult, StorageError};

/// Where an asset lives, per the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub hash: String,
    pub topic: String,
    pub container_filename: String,
}

/// Global dedup lookup: which topic (if any) owns this hash.
pub fn check_hash(conn: &Connection, hash: &str) -> MashResult<Option<IndexRow>> {
    conn.query_row(
        "SELECT hash, topic, container_filename FROM asset_index WHERE hash = ?1",
        params![hash],
        |row| {
            Ok(IndexRow {
                hash: row.get(0)?,
                topic: row.get(1)?,
                container_filename: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Insert the index row for a freshly ingested asset. A hash already
/// owned anywhere fails with `asset_duplicate`; uniqueness here is what
/// enforces single-topic ownership.
pub fn insert_row(conn: &Connection, hash: &str, topic: &str, container: &str) -> MashResult<()> {
    let result = conn.execute(
        "INSERT INTO asset_index (hash, topic, container_filename) VALUES (?1, ?2, ?3)",
        params![hash, topic, container],
    );
    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == SqliteCode::ConstraintViolation =>
        {
            let owner = check_hash(conn, hash)?
                .map(|r| r.topic)
                .unwrap_or_default();
            Err(MashError::Storage(StorageError::DuplicateHash {
                hash: hash.to_string(),
                topic: owner,
            }))
        }
        Err(e) => Err(to_storage_err(format!("insert index row: {e}"))),
    }
}

/// Distinct topic names referenced by the index.
pub fn list_topics(conn: &Connection) -> MashResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT topic FROM asset_index ORDER BY topic")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Purge every row of one topic. Reconciliation only.
pub fn delete_by_topic(conn: &Connection, topic: &str) -> MashResult<u64> {
    let purged = conn
        .execute("DELETE FROM asset_index WHERE topic = ?1", params![topic])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(purged as u64)
}

pub fn count_hashes(conn: &Connection) -> MashResult<u64> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM asset_index", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n as u64)
}

/// All rows of one topic, for index verification.
pub fn list_by_topic(conn: &Connection, topic: &str) -> MashResult<Vec<IndexRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT hash, topic, container_filename FROM asset_index
             WHERE topic = ?1 ORDER BY hash",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![topic], |row| {
            Ok(IndexRow {
                hash: row.get(0)?,
                topic: row.get(1)?,
                container_filename: row.get(2)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
