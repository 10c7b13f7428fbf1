//! Query modules for the auth tables of the orchestrator database.

pub mod grant_ops;
pub mod quota_ops;
pub mod session_ops;
pub mod user_ops;

use rusqlite::Connection;

use mashbank_core::errors::MashResult;
use mashbank_core::models::Action;

/// Seed the bootstrap admin: one user holding an unconstrained grant for
/// every action. Idempotent — an existing user of that name is returned
/// untouched with no plaintext key.
pub fn seed_bootstrap(
    conn: &Connection,
    username: &str,
    password: &str,
    now: i64,
) -> MashResult<Option<String>> {
    if user_ops::get_by_username(conn, username)?.is_some() {
        return Ok(None);
    }
    let (user, api_key) =
        user_ops::create_user(conn, username, "Bootstrap Admin", password, "", true, now)?;
    for action in Action::all() {
        grant_ops::create_grant(conn, user.id, action, None, username, now)?;
    }
    tracing::info!(username, "bootstrap user seeded");
    Ok(Some(api_key))
}
