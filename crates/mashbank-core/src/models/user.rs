use serde::{Deserialize, Serialize};

/// A registered operator or API client.
///
/// Opaque credentials (password, API key) are stored only by their hash;
/// `api_key_prefix` keeps 8 plaintext characters for identification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub api_key_hash: String,
    pub api_key_prefix: String,
    pub is_active: bool,
    /// The seed admin; protected from disable and holds all grants.
    pub is_bootstrap: bool,
    pub failed_login_count: u32,
    /// Unix seconds until which password logins are rejected.
    pub locked_until: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Username of the creator; empty for the bootstrap user.
    pub created_by: String,
}

impl User {
    /// Whether the account is locked out at `now` (unix seconds).
    pub fn is_locked(&self, now: i64) -> bool {
        matches!(self.locked_until, Some(until) if until > now)
    }
}
