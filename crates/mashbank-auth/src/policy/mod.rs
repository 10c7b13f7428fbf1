//! The three-phase policy evaluator.
//!
//! Phase 1 gates on identity (present, active). Phase 2 collects the
//! caller's active grants for the action; none means `forbidden`.
//! Phase 3 walks the grants in creation order; the first grant passing
//! every constraint and quota check wins. When all fail, the last denial
//! is returned — the most specific reason for operator diagnosis.

mod checks;

use rusqlite::Connection;

use mashbank_core::errors::{ErrorCode, MashResult};
use mashbank_core::models::{Action, ActionContext, Constraints, Identity, PolicyResult};

use crate::store::grant_ops;

/// UTC date key derived from a unix timestamp.
fn date_of(now: i64) -> String {
    chrono::DateTime::from_timestamp(now, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d")
        .to_string()
}

/// Evaluate one action attempt. Never mutates state; the caller commits
/// the action and then increments the quota.
pub fn evaluate(
    conn: &Connection,
    identity: Option<&Identity>,
    action: Action,
    ctx: &ActionContext,
    now: i64,
) -> MashResult<PolicyResult> {
    // Phase 1: identity gate.
    let Some(identity) = identity else {
        return Ok(PolicyResult::deny(
            ErrorCode::AuthRequired,
            "authentication required",
        ));
    };
    if !identity.is_active {
        return Ok(PolicyResult::deny(
            ErrorCode::UserDisabled,
            "user account is disabled",
        ));
    }

    // Phase 2: grant gate.
    let grants = grant_ops::list_active(conn, identity.user_id, action)?;
    if grants.is_empty() {
        return Ok(PolicyResult::deny(
            ErrorCode::Forbidden,
            format!("no active {action} grant"),
        ));
    }

    // Phase 3: constraint + quota gate, first passing grant wins.
    let date = date_of(now);
    let mut last_denial = (ErrorCode::Forbidden, format!("no {action} grant passed"));
    for grant in &grants {
        let verdict = match grant.constraints_json.as_deref() {
            // Null or empty constraints always pass.
            None | Some("") => Ok(()),
            Some(json) => match Constraints::parse(action, json) {
                Ok(constraints) => {
                    checks::check_constraints(conn, identity.user_id, &constraints, ctx, &date)?
                }
                // Malformed constraint JSON denies, never silently passes.
                Err(e) => Err((ErrorCode::ConstraintViolation, e.to_string())),
            },
        };
        match verdict {
            Ok(()) => {
                tracing::debug!(
                    user = %identity.username,
                    action = %action,
                    grant_id = grant.id,
                    "action authorized"
                );
                return Ok(PolicyResult::allow(grant.id));
            }
            Err(denial) => last_denial = denial,
        }
    }

    tracing::debug!(
        user = %identity.username,
        action = %action,
        code = %last_denial.0,
        reason = %last_denial.1,
        "action denied"
    );
    Ok(PolicyResult::deny(last_denial.0, last_denial.1))
}
