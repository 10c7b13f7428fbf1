use serde::{Deserialize, Serialize};

/// A browser/API session, stored by token hash only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// First characters of the plaintext token, for operator display.
    pub token_prefix: String,
    pub user_id: i64,
    pub ip: String,
    pub user_agent: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub last_active_at: i64,
}

impl Session {
    /// Whether the session resolves at `now` given the inactivity window.
    pub fn is_live(&self, now: i64, inactivity_timeout_secs: i64) -> bool {
        self.expires_at > now && now - self.last_active_at <= inactivity_timeout_secs
    }
}
