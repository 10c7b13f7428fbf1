use serde::{Deserialize, Serialize};

/// Grantable action classes. A grant authorizes exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Upload,
    Download,
    Query,
    ManageUsers,
    ManageTopics,
    Metadata,
    BulkDownload,
    ViewAudit,
    Verify,
    ManageConfig,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Upload => "upload",
            Action::Download => "download",
            Action::Query => "query",
            Action::ManageUsers => "manage_users",
            Action::ManageTopics => "manage_topics",
            Action::Metadata => "metadata",
            Action::BulkDownload => "bulk_download",
            Action::ViewAudit => "view_audit",
            Action::Verify => "verify",
            Action::ManageConfig => "manage_config",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "upload" => Action::Upload,
            "download" => Action::Download,
            "query" => Action::Query,
            "manage_users" => Action::ManageUsers,
            "manage_topics" => Action::ManageTopics,
            "metadata" => Action::Metadata,
            "bulk_download" => Action::BulkDownload,
            "view_audit" => Action::ViewAudit,
            "verify" => Action::Verify,
            "manage_config" => Action::ManageConfig,
            _ => return None,
        })
    }

    /// Every grantable action, in declaration order.
    pub fn all() -> [Action; 10] {
        [
            Action::Upload,
            Action::Download,
            Action::Query,
            Action::ManageUsers,
            Action::ManageTopics,
            Action::Metadata,
            Action::BulkDownload,
            Action::ViewAudit,
            Action::Verify,
            Action::ManageConfig,
        ]
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-action qualifier for management and audit actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubAction {
    Create,
    Edit,
    Disable,
    Stream,
    Delete,
}
