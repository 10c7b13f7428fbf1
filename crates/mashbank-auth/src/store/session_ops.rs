//! Hashed-token sessions.

use rusqlite::{params, Connection, OptionalExtension};

use mashbank_core::errors::{to_storage_err, MashResult};
use mashbank_core::models::Session;

use crate::tokens;

const SESSION_COLS: &str = "id, token_hash, token_prefix, user_id, ip, user_agent, \
                            created_at, expires_at, last_active_at";

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_prefix: row.get(2)?,
        user_id: row.get(3)?,
        ip: row.get(4)?,
        user_agent: row.get(5)?,
        created_at: row.get(6)?,
        expires_at: row.get(7)?,
        last_active_at: row.get(8)?,
    })
}

/// Create a session, returning it with the plaintext token (shown once).
pub fn create_session(
    conn: &Connection,
    user_id: i64,
    ip: &str,
    user_agent: &str,
    expiry_secs: i64,
    now: i64,
) -> MashResult<(Session, String)> {
    let token = tokens::generate_session_token();
    conn.execute(
        "INSERT INTO sessions (
            token_hash, token_prefix, user_id, ip, user_agent,
            created_at, expires_at, last_active_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?6)",
        params![
            tokens::hash_token(&token),
            tokens::token_prefix(&token),
            user_id,
            ip,
            user_agent,
            now,
            now + expiry_secs,
        ],
    )
    .map_err(|e| to_storage_err(format!("insert session: {e}")))?;

    let session = conn
        .query_row(
            &format!("SELECT {SESSION_COLS} FROM sessions WHERE id = ?1"),
            params![conn.last_insert_rowid()],
            row_to_session,
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok((session, token))
}

/// Resolve a session by token hash. Requires the absolute expiry and the
/// inactivity window to both hold; touches `last_active_at` best-effort
/// on success.
pub fn resolve(
    conn: &Connection,
    token_hash: &str,
    inactivity_timeout_secs: i64,
    now: i64,
) -> MashResult<Option<Session>> {
    let session = conn
        .query_row(
            &format!("SELECT {SESSION_COLS} FROM sessions WHERE token_hash = ?1"),
            params![token_hash],
            row_to_session,
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let Some(session) = session else {
        return Ok(None);
    };
    if !session.is_live(now, inactivity_timeout_secs) {
        return Ok(None);
    }

    // Best-effort activity touch: a failure here must not fail resolution.
    if let Err(e) = conn.execute(
        "UPDATE sessions SET last_active_at = ?2 WHERE id = ?1",
        params![session.id, now],
    ) {
        tracing::warn!(session_id = session.id, error = %e, "failed to touch session activity");
    }

    Ok(Some(session))
}

/// Drop sessions past their absolute expiry. Returns the count removed.
pub fn delete_expired(conn: &Connection, now: i64) -> MashResult<u64> {
    let n = conn
        .execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(n as u64)
}

/// Terminate one session by id (logout).
pub fn delete_session(conn: &Connection, session_id: i64) -> MashResult<()> {
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
