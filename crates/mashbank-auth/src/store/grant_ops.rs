//! Grants and their append-only change log.
//!
//! Every mutation (create, update, revoke) writes its grant-log row in
//! the same transaction as the grant row; the log is the authoritative
//! audit trail of permission changes.

use rusqlite::{params, Connection, OptionalExtension};

use mashbank_core::errors::{to_storage_err, MashResult};
use mashbank_core::models::{Action, Constraints, Grant, GrantChangeType, GrantLogEntry};

const GRANT_COLS: &str = "id, user_id, action, constraints_json, is_active, created_at, created_by";

fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Grant> {
    let action_str: String = row.get(2)?;
    Ok(Grant {
        id: row.get(0)?,
        user_id: row.get(1)?,
        action: Action::parse(&action_str).unwrap_or(Action::Upload),
        constraints_json: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        created_by: row.get(6)?,
    })
}

fn append_log(
    conn: &Connection,
    grant_id: i64,
    change_type: GrantChangeType,
    old_constraints: Option<&str>,
    new_constraints: Option<&str>,
    changed_by: &str,
    now: i64,
) -> MashResult<()> {
    conn.execute(
        "INSERT INTO grant_log (
            grant_id, change_type, old_constraints_json, new_constraints_json,
            changed_at, changed_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            grant_id,
            change_type.as_str(),
            old_constraints,
            new_constraints,
            now,
            changed_by
        ],
    )
    .map_err(|e| to_storage_err(format!("append grant log: {e}")))?;
    Ok(())
}

/// Create a grant. Constraint JSON is validated strictly against the
/// action's schema before anything is written.
pub fn create_grant(
    conn: &Connection,
    user_id: i64,
    action: Action,
    constraints_json: Option<&str>,
    created_by: &str,
    now: i64,
) -> MashResult<Grant> {
    if let Some(json) = constraints_json {
        Constraints::parse(action, json)?;
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("create grant begin: {e}")))?;
    let result = (|| -> MashResult<i64> {
        tx.execute(
            "INSERT INTO grants (user_id, action, constraints_json, is_active, created_at, created_by)
             VALUES (?1, ?2, ?3, 1, ?4, ?5)",
            params![user_id, action.as_str(), constraints_json, now, created_by],
        )
        .map_err(|e| to_storage_err(format!("insert grant: {e}")))?;
        let grant_id = tx.last_insert_rowid();
        append_log(
            &tx,
            grant_id,
            GrantChangeType::Created,
            None,
            constraints_json,
            created_by,
            now,
        )?;
        Ok(grant_id)
    })();

    match result {
        Ok(grant_id) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("create grant commit: {e}")))?;
            get_grant(conn, grant_id)?
                .ok_or_else(|| to_storage_err(format!("grant {grant_id} vanished after insert")))
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Replace a grant's constraints. Validated strictly; logged with the
/// old and new blobs.
pub fn update_constraints(
    conn: &Connection,
    grant_id: i64,
    new_constraints: Option<&str>,
    changed_by: &str,
    now: i64,
) -> MashResult<()> {
    let grant = get_grant(conn, grant_id)?
        .ok_or_else(|| to_storage_err(format!("grant {grant_id} not found")))?;
    if let Some(json) = new_constraints {
        Constraints::parse(grant.action, json)?;
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("update grant begin: {e}")))?;
    let result = (|| -> MashResult<()> {
        tx.execute(
            "UPDATE grants SET constraints_json = ?2 WHERE id = ?1",
            params![grant_id, new_constraints],
        )
        .map_err(|e| to_storage_err(format!("update grant: {e}")))?;
        append_log(
            &tx,
            grant_id,
            GrantChangeType::Updated,
            grant.constraints_json.as_deref(),
            new_constraints,
            changed_by,
            now,
        )
    })();

    match result {
        Ok(()) => tx
            .commit()
            .map_err(|e| to_storage_err(format!("update grant commit: {e}"))),
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Soft-revoke a grant. The row stays; `is_active` drops; the log gains
/// a `revoked` entry.
pub fn revoke(conn: &Connection, grant_id: i64, changed_by: &str, now: i64) -> MashResult<()> {
    let grant = get_grant(conn, grant_id)?
        .ok_or_else(|| to_storage_err(format!("grant {grant_id} not found")))?;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("revoke grant begin: {e}")))?;
    let result = (|| -> MashResult<()> {
        tx.execute(
            "UPDATE grants SET is_active = 0 WHERE id = ?1",
            params![grant_id],
        )
        .map_err(|e| to_storage_err(format!("revoke grant: {e}")))?;
        append_log(
            &tx,
            grant_id,
            GrantChangeType::Revoked,
            grant.constraints_json.as_deref(),
            grant.constraints_json.as_deref(),
            changed_by,
            now,
        )
    })();

    match result {
        Ok(()) => tx
            .commit()
            .map_err(|e| to_storage_err(format!("revoke grant commit: {e}"))),
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

pub fn get_grant(conn: &Connection, grant_id: i64) -> MashResult<Option<Grant>> {
    conn.query_row(
        &format!("SELECT {GRANT_COLS} FROM grants WHERE id = ?1"),
        params![grant_id],
        row_to_grant,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Active grants of one user for one action, in creation order. The
/// evaluator walks these first-to-last.
pub fn list_active(conn: &Connection, user_id: i64, action: Action) -> MashResult<Vec<Grant>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {GRANT_COLS} FROM grants
             WHERE user_id = ?1 AND action = ?2 AND is_active = 1 ORDER BY id"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![user_id, action.as_str()], row_to_grant)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Distinct actions a user actively holds (for escalation checks).
pub fn active_actions(conn: &Connection, user_id: i64) -> MashResult<Vec<Action>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT action FROM grants WHERE user_id = ?1 AND is_active = 1")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![user_id], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut actions = Vec::new();
    for raw in rows {
        let raw = raw.map_err(|e| to_storage_err(e.to_string()))?;
        if let Some(action) = Action::parse(&raw) {
            actions.push(action);
        }
    }
    Ok(actions)
}

/// The full change log of one grant, oldest first.
pub fn log_for_grant(conn: &Connection, grant_id: i64) -> MashResult<Vec<GrantLogEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, grant_id, change_type, old_constraints_json, new_constraints_json,
                    changed_at, changed_by
             FROM grant_log WHERE grant_id = ?1 ORDER BY id",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![grant_id], |row| {
            let change_raw: String = row.get(2)?;
            Ok(GrantLogEntry {
                id: row.get(0)?,
                grant_id: row.get(1)?,
                change_type: GrantChangeType::parse(&change_raw)
                    .unwrap_or(GrantChangeType::Created),
                old_constraints_json: row.get(3)?,
                new_constraints_json: row.get(4)?,
                changed_at: row.get(5)?,
                changed_by: row.get(6)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}
