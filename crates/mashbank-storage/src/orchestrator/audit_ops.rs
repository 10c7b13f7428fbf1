//! The append-only action audit log.

use rusqlite::{params, Connection};

use mashbank_core::errors::{to_storage_err, MashResult};
use mashbank_core::models::AuditEntry;

/// Append one audit row.
pub fn append(
    conn: &Connection,
    actor: &str,
    action: &str,
    detail: &serde_json::Value,
    now: i64,
) -> MashResult<()> {
    conn.execute(
        "INSERT INTO audit_log (actor, action, detail, timestamp) VALUES (?1, ?2, ?3, ?4)",
        params![actor, action, detail.to_string(), now],
    )
    .map_err(|e| to_storage_err(format!("append audit: {e}")))?;
    Ok(())
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
    let detail_raw: String = row.get(3)?;
    Ok(AuditEntry {
        id: row.get(0)?,
        actor: row.get(1)?,
        action: row.get(2)?,
        detail: serde_json::from_str(&detail_raw).unwrap_or(serde_json::Value::Null),
        timestamp: row.get(4)?,
    })
}

/// Newest-first page of the audit log.
pub fn recent(conn: &Connection, limit: u64) -> MashResult<Vec<AuditEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, actor, action, detail, timestamp FROM audit_log
             ORDER BY id DESC LIMIT ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![limit], row_to_entry)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Newest-first entries of one action kind.
pub fn by_action(conn: &Connection, action: &str, limit: u64) -> MashResult<Vec<AuditEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, actor, action, detail, timestamp FROM audit_log
             WHERE action = ?1 ORDER BY id DESC LIMIT ?2",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![action, limit], row_to_entry)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
