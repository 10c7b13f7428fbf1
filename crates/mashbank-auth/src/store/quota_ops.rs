//! The atomic daily-usage upsert.

use rusqlite::{params, Connection, OptionalExtension};

use mashbank_core::errors::{to_storage_err, MashResult};
use mashbank_core::models::{Action, QuotaUsage};

/// Record one successful action: +1 request, +`bytes` volume for
/// (user, action, date). One statement — insert-or-increment on the
/// composite key, never read-modify-write.
pub fn increment(
    conn: &Connection,
    user_id: i64,
    action: Action,
    date: &str,
    bytes: u64,
    now: i64,
) -> MashResult<()> {
    conn.execute(
        "INSERT INTO quota_usage (user_id, action, date, request_count, total_bytes, updated_at)
         VALUES (?1, ?2, ?3, 1, ?4, ?5)
         ON CONFLICT(user_id, action, date) DO UPDATE SET
             request_count = request_count + 1,
             total_bytes = total_bytes + excluded.total_bytes,
             updated_at = excluded.updated_at",
        params![user_id, action.as_str(), date, bytes as i64, now],
    )
    .map_err(|e| to_storage_err(format!("quota upsert: {e}")))?;
    Ok(())
}

/// Current counters for (user, action, date); zeros when no row yet.
pub fn get_usage(
    conn: &Connection,
    user_id: i64,
    action: Action,
    date: &str,
) -> MashResult<(u64, u64)> {
    let row = conn
        .query_row(
            "SELECT request_count, total_bytes FROM quota_usage
             WHERE user_id = ?1 AND action = ?2 AND date = ?3",
            params![user_id, action.as_str(), date],
            |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64)),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(row.unwrap_or((0, 0)))
}

/// All rows for one user, newest date first (operator inspection).
pub fn list_for_user(conn: &Connection, user_id: i64) -> MashResult<Vec<QuotaUsage>> {
    let mut stmt = conn
        .prepare(
            "SELECT user_id, action, date, request_count, total_bytes, updated_at
             FROM quota_usage WHERE user_id = ?1 ORDER BY date DESC, action",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            let action_raw: String = row.get(1)?;
            Ok(QuotaUsage {
                user_id: row.get(0)?,
                action: Action::parse(&action_raw).unwrap_or(Action::Upload),
                date: row.get(2)?,
                request_count: row.get::<_, i64>(3)? as u64,
                total_bytes: row.get::<_, i64>(4)? as u64,
                updated_at: row.get(5)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Drop rows older than `before_date` (offline garbage collection).
pub fn prune_before(conn: &Connection, before_date: &str) -> MashResult<u64> {
    let n = conn
        .execute("DELETE FROM quota_usage WHERE date < ?1", params![before_date])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n as u64)
}
