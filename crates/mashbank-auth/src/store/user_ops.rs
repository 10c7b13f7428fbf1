//! User rows: creation, lookup, lockout bookkeeping.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rusqlite::{params, Connection, OptionalExtension};

use mashbank_core::errors::{to_storage_err, AuthError, MashResult};
use mashbank_core::models::User;

use crate::tokens;

const USER_COLS: &str = "id, username, display_name, password_hash, api_key_hash, \
                         api_key_prefix, is_active, is_bootstrap, failed_login_count, \
                         locked_until, created_at, updated_at, created_by";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        password_hash: row.get(3)?,
        api_key_hash: row.get(4)?,
        api_key_prefix: row.get(5)?,
        is_active: row.get(6)?,
        is_bootstrap: row.get(7)?,
        failed_login_count: row.get(8)?,
        locked_until: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        created_by: row.get(12)?,
    })
}

/// Hash a password with argon2id and a fresh salt.
pub fn hash_password(password: &str) -> MashResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| to_storage_err(format!("hash password: {e}")))
}

/// Verify a password against its stored argon2 hash.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Create a user with a freshly minted API key. Returns the user and the
/// plaintext key (shown once, stored only by hash).
pub fn create_user(
    conn: &Connection,
    username: &str,
    display_name: &str,
    password: &str,
    created_by: &str,
    is_bootstrap: bool,
    now: i64,
) -> MashResult<(User, String)> {
    let api_key = tokens::generate_api_key();
    let password_hash = hash_password(password)?;

    let result = conn.execute(
        "INSERT INTO users (
            username, display_name, password_hash, api_key_hash, api_key_prefix,
            is_active, is_bootstrap, created_at, updated_at, created_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?7, ?8)",
        params![
            username,
            display_name,
            password_hash,
            tokens::hash_token(&api_key),
            tokens::token_prefix(&api_key),
            is_bootstrap,
            now,
            created_by,
        ],
    );
    match result {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            return Err(AuthError::UserExists {
                username: username.to_string(),
            }
            .into());
        }
        Err(e) => return Err(to_storage_err(format!("insert user: {e}"))),
    }

    let user = get_by_username(conn, username)?.ok_or_else(|| {
        to_storage_err(format!("user {username} vanished after insert"))
    })?;
    Ok((user, api_key))
}

pub fn get_by_username(conn: &Connection, username: &str) -> MashResult<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLS} FROM users WHERE username = ?1"),
        params![username],
        row_to_user,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

pub fn get_by_id(conn: &Connection, id: i64) -> MashResult<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
        params![id],
        row_to_user,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

pub fn get_by_api_key_hash(conn: &Connection, key_hash: &str) -> MashResult<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLS} FROM users WHERE api_key_hash = ?1"),
        params![key_hash],
        row_to_user,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

pub fn list_users(conn: &Connection) -> MashResult<Vec<User>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {USER_COLS} FROM users ORDER BY username"))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], row_to_user)
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Enable or disable an account. The bootstrap user cannot be disabled.
pub fn set_active(conn: &Connection, user_id: i64, active: bool, now: i64) -> MashResult<()> {
    if !active {
        let user = get_by_id(conn, user_id)?;
        if matches!(user, Some(u) if u.is_bootstrap) {
            return Err(AuthError::Forbidden {
                reason: "the bootstrap user cannot be disabled".into(),
            }
            .into());
        }
    }
    conn.execute(
        "UPDATE users SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
        params![user_id, active, now],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Bump the failed-login counter; lock the account once it reaches the
/// threshold.
pub fn record_login_failure(
    conn: &Connection,
    user_id: i64,
    threshold: u32,
    lockout_minutes: u32,
    now: i64,
) -> MashResult<()> {
    let failures: u32 = conn
        .query_row(
            "UPDATE users SET failed_login_count = failed_login_count + 1, updated_at = ?2
             WHERE id = ?1 RETURNING failed_login_count",
            params![user_id, now],
            |row| row.get(0),
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    if failures >= threshold {
        let until = now + (lockout_minutes as i64) * 60;
        conn.execute(
            "UPDATE users SET locked_until = ?2 WHERE id = ?1",
            params![user_id, until],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        tracing::warn!(user_id, failures, until, "account locked after failed logins");
    }
    Ok(())
}

/// Reset the failure counter and clear any lockout.
pub fn record_login_success(conn: &Connection, user_id: i64, now: i64) -> MashResult<()> {
    conn.execute(
        "UPDATE users SET failed_login_count = 0, locked_until = NULL, updated_at = ?2
         WHERE id = ?1",
        params![user_id, now],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Rotate a user's API key, returning the new plaintext once.
pub fn rotate_api_key(conn: &Connection, user_id: i64, now: i64) -> MashResult<String> {
    let api_key = tokens::generate_api_key();
    conn.execute(
        "UPDATE users SET api_key_hash = ?2, api_key_prefix = ?3, updated_at = ?4 WHERE id = ?1",
        params![
            user_id,
            tokens::hash_token(&api_key),
            tokens::token_prefix(&api_key),
            now
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(api_key)
}
