use serde::{Deserialize, Serialize};

/// Operation kinds in the metadata log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataOp {
    Set,
    Delete,
}

impl MetadataOp {
    pub fn as_str(self) -> &'static str {
        match self {
            MetadataOp::Set => "set",
            MetadataOp::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "set" => Some(MetadataOp::Set),
            "delete" => Some(MetadataOp::Delete),
            _ => None,
        }
    }
}

/// One entry of the append-only per-topic metadata journal.
/// The journal is the source of truth; the computed view is rebuildable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub asset_hash: String,
    pub key: String,
    pub op: MetadataOp,
    /// Present for `set`, ignored for `delete`.
    pub value: Option<String>,
    /// Writing processor, e.g. `thumbnailer`.
    pub processor: String,
    pub processor_version: String,
    pub timestamp: i64,
}

/// Latest-wins reduction of the metadata log for one (asset, key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputedMetadata {
    pub asset_hash: String,
    pub key: String,
    pub value: String,
    pub processor: String,
    pub updated_at: i64,
}
