//! Per-action constraint checks. Each returns `Err((code, reason))` on
//! the first failed check so the evaluator can surface the most specific
//! denial.

use rusqlite::Connection;

use mashbank_core::errors::{ErrorCode, MashResult};
use mashbank_core::models::{
    allowlist_permits, allowlist_permits_ci, Action, ActionContext, Constraints, SubAction,
};

use crate::store::{grant_ops, quota_ops};

pub type CheckResult = Result<(), (ErrorCode, String)>;

/// `usage + 1 <= limit` for the day's request count. 0 = unconfigured.
fn check_count_quota(
    conn: &Connection,
    user_id: i64,
    action: Action,
    date: &str,
    limit: u64,
) -> MashResult<CheckResult> {
    if limit == 0 {
        return Ok(Ok(()));
    }
    let (used, _) = quota_ops::get_usage(conn, user_id, action, date)?;
    if used + 1 > limit {
        return Ok(Err((
            ErrorCode::QuotaExceeded,
            format!("daily {action} count {used}/{limit}"),
        )));
    }
    Ok(Ok(()))
}

/// `usage + request <= limit` for the day's byte volume; equality is
/// permitted. Skipped when the request declares no volume.
fn check_volume_quota(
    conn: &Connection,
    user_id: i64,
    action: Action,
    date: &str,
    limit: u64,
    request_bytes: Option<u64>,
) -> MashResult<CheckResult> {
    if limit == 0 {
        return Ok(Ok(()));
    }
    let Some(bytes) = request_bytes else {
        return Ok(Ok(()));
    };
    let (_, used_bytes) = quota_ops::get_usage(conn, user_id, action, date)?;
    if used_bytes + bytes > limit {
        return Ok(Err((
            ErrorCode::QuotaExceeded,
            format!(
                "daily {action} volume {}/{limit} bytes",
                used_bytes + bytes
            ),
        )));
    }
    Ok(Ok(()))
}

fn topic_check(list: &[String], ctx: &ActionContext) -> CheckResult {
    if allowlist_permits(list, ctx.topic.as_deref()) {
        Ok(())
    } else {
        Err((
            ErrorCode::ConstraintViolation,
            format!(
                "topic {:?} not in allowed_topics",
                ctx.topic.as_deref().unwrap_or_default()
            ),
        ))
    }
}

/// Evaluate one grant's parsed constraints against the context.
pub fn check_constraints(
    conn: &Connection,
    user_id: i64,
    constraints: &Constraints,
    ctx: &ActionContext,
    date: &str,
) -> MashResult<CheckResult> {
    match constraints {
        Constraints::Upload(c) => {
            if !allowlist_permits_ci(&c.allowed_extensions, ctx.extension.as_deref()) {
                return Ok(Err((
                    ErrorCode::ConstraintViolation,
                    format!(
                        "extension {:?} not in allowed_extensions",
                        ctx.extension.as_deref().unwrap_or_default()
                    ),
                )));
            }
            if let Err(denied) = topic_check(&c.allowed_topics, ctx) {
                return Ok(Err(denied));
            }
            if c.max_file_size_bytes > 0 {
                if let Some(size) = ctx.size_bytes {
                    if size > c.max_file_size_bytes {
                        return Ok(Err((
                            ErrorCode::ConstraintViolation,
                            format!(
                                "file size {size} exceeds max_file_size_bytes {}",
                                c.max_file_size_bytes
                            ),
                        )));
                    }
                }
            }
            if let Err(denied) =
                check_count_quota(conn, user_id, Action::Upload, date, c.daily_count_limit)?
            {
                return Ok(Err(denied));
            }
            check_volume_quota(
                conn,
                user_id,
                Action::Upload,
                date,
                c.daily_volume_bytes,
                ctx.volume_bytes,
            )
        }
        Constraints::Download(c) => {
            if let Err(denied) = topic_check(&c.allowed_topics, ctx) {
                return Ok(Err(denied));
            }
            if let Err(denied) =
                check_count_quota(conn, user_id, Action::Download, date, c.daily_count_limit)?
            {
                return Ok(Err(denied));
            }
            check_volume_quota(
                conn,
                user_id,
                Action::Download,
                date,
                c.daily_volume_bytes,
                ctx.volume_bytes,
            )
        }
        Constraints::Query(c) => {
            if !allowlist_permits(&c.allowed_presets, ctx.preset.as_deref()) {
                return Ok(Err((
                    ErrorCode::ConstraintViolation,
                    format!(
                        "preset {:?} not in allowed_presets",
                        ctx.preset.as_deref().unwrap_or_default()
                    ),
                )));
            }
            if let Err(denied) = topic_check(&c.allowed_topics, ctx) {
                return Ok(Err(denied));
            }
            check_count_quota(conn, user_id, Action::Query, date, c.daily_count_limit)
        }
        Constraints::ManageUsers(c) => {
            match ctx.sub_action {
                Some(SubAction::Create) if !c.can_create => {
                    return Ok(Err((
                        ErrorCode::ConstraintViolation,
                        "user creation not permitted by grant".into(),
                    )))
                }
                Some(SubAction::Edit) if !c.can_edit => {
                    return Ok(Err((
                        ErrorCode::ConstraintViolation,
                        "user editing not permitted by grant".into(),
                    )))
                }
                Some(SubAction::Disable) if !c.can_disable => {
                    return Ok(Err((
                        ErrorCode::ConstraintViolation,
                        "user disabling not permitted by grant".into(),
                    )))
                }
                _ => {}
            }
            if let Some(granting) = &ctx.granting_actions {
                if !c.can_grant_actions.is_empty() {
                    for action in granting {
                        if !c.can_grant_actions.contains(action) {
                            return Ok(Err((
                                ErrorCode::ConstraintViolation,
                                format!("granting {action} not permitted by grant"),
                            )));
                        }
                    }
                }
                if !c.escalation_allowed {
                    let held = grant_ops::active_actions(conn, user_id)?;
                    for action in granting {
                        if !held.contains(action) {
                            return Ok(Err((
                                ErrorCode::EscalationDenied,
                                format!("cannot grant {action} without holding it"),
                            )));
                        }
                    }
                }
            }
            Ok(Ok(()))
        }
        Constraints::ManageTopics(c) => {
            if let Err(denied) = topic_check(&c.allowed_topics, ctx) {
                return Ok(Err(denied));
            }
            match ctx.sub_action {
                Some(SubAction::Create) if !c.can_create => Ok(Err((
                    ErrorCode::ConstraintViolation,
                    "topic creation not permitted by grant".into(),
                ))),
                Some(SubAction::Delete) if !c.can_delete => Ok(Err((
                    ErrorCode::ConstraintViolation,
                    "topic deletion not permitted by grant".into(),
                ))),
                _ => Ok(Ok(())),
            }
        }
        Constraints::Metadata(c) => {
            if let Err(denied) = topic_check(&c.allowed_topics, ctx) {
                return Ok(Err(denied));
            }
            check_count_quota(conn, user_id, Action::Metadata, date, c.daily_count_limit)
        }
        Constraints::BulkDownload(c) => {
            if c.max_assets_per_request > 0 {
                if let Some(count) = ctx.asset_count {
                    if count > c.max_assets_per_request {
                        return Ok(Err((
                            ErrorCode::BulkTooLarge,
                            format!(
                                "{count} assets exceeds max_assets_per_request {}",
                                c.max_assets_per_request
                            ),
                        )));
                    }
                }
            }
            if let Err(denied) =
                check_count_quota(conn, user_id, Action::BulkDownload, date, c.daily_count_limit)?
            {
                return Ok(Err(denied));
            }
            check_volume_quota(
                conn,
                user_id,
                Action::BulkDownload,
                date,
                c.daily_volume_bytes,
                ctx.volume_bytes,
            )
        }
        Constraints::ViewAudit(c) => match ctx.sub_action {
            Some(SubAction::Stream) if !c.can_stream => Ok(Err((
                ErrorCode::ConstraintViolation,
                "audit streaming not permitted by grant".into(),
            ))),
            _ => Ok(Ok(())),
        },
        Constraints::Verify(c) => {
            check_count_quota(conn, user_id, Action::Verify, date, c.daily_count_limit)
        }
        Constraints::ManageConfig => Ok(Ok(())),
    }
}
