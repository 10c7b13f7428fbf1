//! Credential extraction and identity resolution.
//!
//! Three credential routes, checked in priority order: the `X-API-Key`
//! header, `Authorization: Bearer` (where the token's prefix says
//! whether it is an API key or a session token), and the `token` query
//! parameter for browser download/SSE clients that cannot set headers.
//! All three resolve to the same identity object.

use rusqlite::Connection;

use mashbank_core::errors::{AuthError, MashResult};
use mashbank_core::models::Identity;

use crate::store::{session_ops, user_ops};
use crate::tokens;

/// An extracted, not-yet-verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    ApiKey(String),
    SessionToken(String),
}

/// Pick the credential from the three transport routes, in priority
/// order. Returns `None` when no route carries one.
pub fn extract_credential(
    api_key_header: Option<&str>,
    authorization: Option<&str>,
    token_param: Option<&str>,
) -> Option<Credential> {
    if let Some(key) = api_key_header.filter(|s| !s.is_empty()) {
        return Some(Credential::ApiKey(key.to_string()));
    }
    if let Some(auth) = authorization {
        if let Some(token) = auth.strip_prefix("Bearer ").filter(|s| !s.is_empty()) {
            return Some(if tokens::is_api_key(token) {
                Credential::ApiKey(token.to_string())
            } else {
                Credential::SessionToken(token.to_string())
            });
        }
    }
    if let Some(token) = token_param.filter(|s| !s.is_empty()) {
        return Some(if tokens::is_api_key(token) {
            Credential::ApiKey(token.to_string())
        } else {
            Credential::SessionToken(token.to_string())
        });
    }
    None
}

fn identity_of(user: &mashbank_core::models::User) -> Identity {
    Identity {
        user_id: user.id,
        username: user.username.clone(),
        is_active: user.is_active,
        is_bootstrap: user.is_bootstrap,
    }
}

/// Resolve a credential to an identity. Disabled and locked accounts
/// fail regardless of which credential was presented. Callers treat any
/// error as unauthenticated (fail closed).
pub fn resolve_identity(
    conn: &Connection,
    credential: &Credential,
    inactivity_timeout_secs: i64,
    now: i64,
) -> MashResult<Identity> {
    let user = match credential {
        Credential::ApiKey(key) => {
            user_ops::get_by_api_key_hash(conn, &tokens::hash_token(key))?
                .ok_or(AuthError::InvalidCredentials)?
        }
        Credential::SessionToken(token) => {
            let session =
                session_ops::resolve(conn, &tokens::hash_token(token), inactivity_timeout_secs, now)?
                    .ok_or(AuthError::InvalidCredentials)?;
            user_ops::get_by_id(conn, session.user_id)?.ok_or(AuthError::InvalidCredentials)?
        }
    };

    if !user.is_active {
        return Err(AuthError::UserDisabled.into());
    }
    if user.is_locked(now) {
        return Err(AuthError::AccountLocked {
            until: user.locked_until.unwrap_or(now),
        }
        .into());
    }
    Ok(identity_of(&user))
}

/// Password login with lockout bookkeeping: N consecutive failures lock
/// the account; success resets the counter and clears any lockout.
pub fn login_password(
    conn: &Connection,
    username: &str,
    password: &str,
    lockout_threshold: u32,
    lockout_minutes: u32,
    now: i64,
) -> MashResult<Identity> {
    let Some(user) = user_ops::get_by_username(conn, username)? else {
        return Err(AuthError::InvalidCredentials.into());
    };
    if user.is_locked(now) {
        return Err(AuthError::AccountLocked {
            until: user.locked_until.unwrap_or(now),
        }
        .into());
    }
    if !user.is_active {
        return Err(AuthError::UserDisabled.into());
    }
    if !user_ops::verify_password(password, &user.password_hash) {
        user_ops::record_login_failure(conn, user.id, lockout_threshold, lockout_minutes, now)?;
        return Err(AuthError::InvalidCredentials.into());
    }
    user_ops::record_login_success(conn, user.id, now)?;
    Ok(identity_of(&user))
}
