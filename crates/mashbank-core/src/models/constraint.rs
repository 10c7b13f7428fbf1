use serde::{Deserialize, Serialize};

use super::Action;
use crate::errors::{AuthError, MashResult};

/// Upload constraints. Zero / empty fields mean "not configured".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct UploadConstraints {
    /// Lowercased extensions without the dot.
    pub allowed_extensions: Vec<String>,
    pub max_file_size_bytes: u64,
    pub allowed_topics: Vec<String>,
    pub daily_count_limit: u64,
    pub daily_volume_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DownloadConstraints {
    pub allowed_topics: Vec<String>,
    pub daily_count_limit: u64,
    pub daily_volume_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct QueryConstraints {
    pub allowed_presets: Vec<String>,
    pub allowed_topics: Vec<String>,
    pub daily_count_limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ManageUsersConstraints {
    pub can_create: bool,
    pub can_edit: bool,
    pub can_disable: bool,
    /// Actions this manager may grant to others. Empty means any.
    pub can_grant_actions: Vec<Action>,
    /// Whether granting an action the manager does not hold is allowed.
    pub escalation_allowed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ManageTopicsConstraints {
    pub allowed_topics: Vec<String>,
    pub can_create: bool,
    pub can_delete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MetadataConstraints {
    pub allowed_topics: Vec<String>,
    pub daily_count_limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BulkDownloadConstraints {
    pub max_assets_per_request: u64,
    pub daily_count_limit: u64,
    pub daily_volume_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ViewAuditConstraints {
    pub can_view_all: bool,
    pub can_stream: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct VerifyConstraints {
    pub daily_count_limit: u64,
}

/// The typed constraint body attached to a grant, dispatched by action.
///
/// Written with strict schema validation (unknown fields rejected) so a
/// typo in an operator-authored blob fails loudly instead of silently
/// never matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraints {
    Upload(UploadConstraints),
    Download(DownloadConstraints),
    Query(QueryConstraints),
    ManageUsers(ManageUsersConstraints),
    ManageTopics(ManageTopicsConstraints),
    Metadata(MetadataConstraints),
    BulkDownload(BulkDownloadConstraints),
    ViewAudit(ViewAuditConstraints),
    Verify(VerifyConstraints),
    /// manage_config takes no constraints.
    ManageConfig,
}

impl Constraints {
    /// Parse a constraint blob for the given action. Unknown fields and
    /// type mismatches are rejected.
    pub fn parse(action: Action, json: &str) -> MashResult<Self> {
        let violation = |e: serde_json::Error| AuthError::ConstraintViolation {
            reason: format!("invalid {action} constraints: {e}"),
        };
        Ok(match action {
            Action::Upload => Constraints::Upload(serde_json::from_str(json).map_err(violation)?),
            Action::Download => {
                Constraints::Download(serde_json::from_str(json).map_err(violation)?)
            }
            Action::Query => Constraints::Query(serde_json::from_str(json).map_err(violation)?),
            Action::ManageUsers => {
                Constraints::ManageUsers(serde_json::from_str(json).map_err(violation)?)
            }
            Action::ManageTopics => {
                Constraints::ManageTopics(serde_json::from_str(json).map_err(violation)?)
            }
            Action::Metadata => {
                Constraints::Metadata(serde_json::from_str(json).map_err(violation)?)
            }
            Action::BulkDownload => {
                Constraints::BulkDownload(serde_json::from_str(json).map_err(violation)?)
            }
            Action::ViewAudit => {
                Constraints::ViewAudit(serde_json::from_str(json).map_err(violation)?)
            }
            Action::Verify => Constraints::Verify(serde_json::from_str(json).map_err(violation)?),
            Action::ManageConfig => {
                // Accept only an empty object (or null) for manage_config.
                let v: serde_json::Value = serde_json::from_str(json).map_err(violation)?;
                match v {
                    serde_json::Value::Null => Constraints::ManageConfig,
                    serde_json::Value::Object(m) if m.is_empty() => Constraints::ManageConfig,
                    _ => {
                        return Err(AuthError::ConstraintViolation {
                            reason: "manage_config accepts no constraints".into(),
                        }
                        .into())
                    }
                }
            }
        })
    }

    /// The action this constraint body belongs to.
    pub fn action(&self) -> Action {
        match self {
            Constraints::Upload(_) => Action::Upload,
            Constraints::Download(_) => Action::Download,
            Constraints::Query(_) => Action::Query,
            Constraints::ManageUsers(_) => Action::ManageUsers,
            Constraints::ManageTopics(_) => Action::ManageTopics,
            Constraints::Metadata(_) => Action::Metadata,
            Constraints::BulkDownload(_) => Action::BulkDownload,
            Constraints::ViewAudit(_) => Action::ViewAudit,
            Constraints::Verify(_) => Action::Verify,
            Constraints::ManageConfig => Action::ManageConfig,
        }
    }
}

/// Allowlist membership per the common rules: the check is skipped when
/// the list is empty or the value is absent/empty. Case-sensitive.
pub fn allowlist_permits(list: &[String], value: Option<&str>) -> bool {
    match value {
        None | Some("") => true,
        Some(v) => list.is_empty() || list.iter().any(|item| item == v),
    }
}

/// Case-insensitive variant used for extensions.
pub fn allowlist_permits_ci(list: &[String], value: Option<&str>) -> bool {
    match value {
        None | Some("") => true,
        Some(v) => {
            let v = v.to_ascii_lowercase();
            list.is_empty() || list.iter().any(|item| item.to_ascii_lowercase() == v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_field_rejected() {
        let err = Constraints::parse(
            Action::Upload,
            r#"{"allowed_extenions": ["png"]}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_partial_body_fills_defaults() {
        let c = Constraints::parse(Action::Upload, r#"{"daily_count_limit": 3}"#).unwrap();
        match c {
            Constraints::Upload(u) => {
                assert_eq!(u.daily_count_limit, 3);
                assert_eq!(u.max_file_size_bytes, 0);
                assert!(u.allowed_extensions.is_empty());
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_manage_config_rejects_any_body() {
        assert!(Constraints::parse(Action::ManageConfig, "{}").is_ok());
        assert!(Constraints::parse(Action::ManageConfig, "null").is_ok());
        assert!(Constraints::parse(Action::ManageConfig, r#"{"x":1}"#).is_err());
    }

    #[test]
    fn test_allowlist_rules() {
        let list = vec!["A".to_string(), "B".to_string()];
        assert!(allowlist_permits(&list, Some("A")));
        assert!(!allowlist_permits(&list, Some("a")));
        assert!(allowlist_permits(&list, None));
        assert!(allowlist_permits(&list, Some("")));
        assert!(allowlist_permits(&[], Some("anything")));

        let exts = vec!["PNG".to_string()];
        assert!(allowlist_permits_ci(&exts, Some("png")));
        assert!(!allowlist_permits_ci(&exts, Some("jpg")));
    }
}
