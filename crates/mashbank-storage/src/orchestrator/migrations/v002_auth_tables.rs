//! v002: users, grants, grant_log, sessions, quota_usage.

use rusqlite::Connection;

use mashbank_core::errors::{to_storage_err, MashResult};

pub fn migrate(conn: &Connection) -> MashResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            username           TEXT NOT NULL UNIQUE,
            display_name       TEXT NOT NULL DEFAULT '',
            password_hash      TEXT NOT NULL DEFAULT '',
            api_key_hash       TEXT NOT NULL DEFAULT '',
            api_key_prefix     TEXT NOT NULL DEFAULT '',
            is_active          INTEGER NOT NULL DEFAULT 1,
            is_bootstrap       INTEGER NOT NULL DEFAULT 0,
            failed_login_count INTEGER NOT NULL DEFAULT 0,
            locked_until       INTEGER,
            created_at         INTEGER NOT NULL,
            updated_at         INTEGER NOT NULL,
            created_by         TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_users_api_key ON users(api_key_hash);

        CREATE TABLE IF NOT EXISTS grants (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id          INTEGER NOT NULL REFERENCES users(id),
            action           TEXT NOT NULL,
            constraints_json TEXT,
            is_active        INTEGER NOT NULL DEFAULT 1,
            created_at       INTEGER NOT NULL,
            created_by       TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_grants_user_action ON grants(user_id, action);

        CREATE TABLE IF NOT EXISTS grant_log (
            id                   INTEGER PRIMARY KEY AUTOINCREMENT,
            grant_id             INTEGER NOT NULL REFERENCES grants(id),
            change_type          TEXT NOT NULL,
            old_constraints_json TEXT,
            new_constraints_json TEXT,
            changed_at           INTEGER NOT NULL,
            changed_by           TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_grant_log_grant ON grant_log(grant_id);

        CREATE TABLE IF NOT EXISTS sessions (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            token_hash     TEXT NOT NULL UNIQUE,
            token_prefix   TEXT NOT NULL,
            user_id        INTEGER NOT NULL REFERENCES users(id),
            ip             TEXT NOT NULL DEFAULT '',
            user_agent     TEXT NOT NULL DEFAULT '',
            created_at     INTEGER NOT NULL,
            expires_at     INTEGER NOT NULL,
            last_active_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
        CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);

        CREATE TABLE IF NOT EXISTS quota_usage (
            user_id       INTEGER NOT NULL,
            action        TEXT NOT NULL,
            date          TEXT NOT NULL,
            request_count INTEGER NOT NULL DEFAULT 0,
            total_bytes   INTEGER NOT NULL DEFAULT 0,
            updated_at    INTEGER NOT NULL,
            PRIMARY KEY (user_id, action, date)
        );
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
