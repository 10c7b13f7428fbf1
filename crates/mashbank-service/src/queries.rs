//! Preset queries: validated parameter templates fanned out across
//! topic databases, merged with topic attribution.
//!
//! Presets are fixed SQL over the topic schema with positional binds —
//! callers supply parameter values, never SQL.

use std::collections::BTreeMap;

use rusqlite::types::Value as SqlValue;
use serde::Serialize;

use mashbank_core::errors::{ErrorCode, MashError, MashResult, ServiceError};
use mashbank_core::models::{Action, ActionContext, Constraints, Identity};

use crate::bank::Bank;

/// Parameter type accepted by a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Text,
    Integer,
}

/// One declared preset parameter.
#[derive(Debug, Clone, Serialize)]
pub struct PresetParam {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

/// A named, parameterized cross-topic query.
#[derive(Debug, Clone, Serialize)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<PresetParam>,
    #[serde(skip)]
    sql: &'static str,
}

/// One merged result row, tagged with its topic.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRow {
    pub topic: String,
    pub hash: String,
    pub original_filename: String,
    pub extension: String,
    pub size_bytes: u64,
    pub created_at: i64,
}

/// The built-in preset catalog.
pub struct PresetRegistry {
    presets: Vec<Preset>,
}

impl PresetRegistry {
    pub fn builtin() -> Self {
        let presets = vec![
            Preset {
                name: "recent",
                description: "Most recently ingested assets",
                params: vec![PresetParam {
                    name: "limit",
                    kind: ParamKind::Integer,
                    required: false,
                }],
                sql: "SELECT hash, original_filename, extension, size_bytes, created_at
                      FROM assets ORDER BY created_at DESC, hash LIMIT COALESCE(?1, 100)",
            },
            Preset {
                name: "by-extension",
                description: "Assets with a given file extension",
                params: vec![PresetParam {
                    name: "extension",
                    kind: ParamKind::Text,
                    required: true,
                }],
                sql: "SELECT hash, original_filename, extension, size_bytes, created_at
                      FROM assets WHERE extension = lower(?1) ORDER BY created_at DESC",
            },
            Preset {
                name: "by-filename",
                description: "Assets whose original filename matches a LIKE pattern",
                params: vec![PresetParam {
                    name: "pattern",
                    kind: ParamKind::Text,
                    required: true,
                }],
                sql: "SELECT hash, original_filename, extension, size_bytes, created_at
                      FROM assets WHERE original_filename LIKE ?1 ORDER BY created_at DESC",
            },
            Preset {
                name: "larger-than",
                description: "Assets larger than a byte threshold",
                params: vec![PresetParam {
                    name: "min_bytes",
                    kind: ParamKind::Integer,
                    required: true,
                }],
                sql: "SELECT hash, original_filename, extension, size_bytes, created_at
                      FROM assets WHERE size_bytes > ?1 ORDER BY size_bytes DESC",
            },
            Preset {
                name: "by-metadata",
                description: "Assets whose computed metadata carries key=value",
                params: vec![
                    PresetParam {
                        name: "key",
                        kind: ParamKind::Text,
                        required: true,
                    },
                    PresetParam {
                        name: "value",
                        kind: ParamKind::Text,
                        required: true,
                    },
                ],
                sql: "SELECT a.hash, a.original_filename, a.extension, a.size_bytes, a.created_at
                      FROM assets a JOIN computed_metadata m ON m.asset_hash = a.hash
                      WHERE m.key = ?1 AND m.value = ?2 ORDER BY a.created_at DESC",
            },
            Preset {
                name: "versions-of",
                description: "Assets whose parent hash is the given asset",
                params: vec![PresetParam {
                    name: "parent",
                    kind: ParamKind::Text,
                    required: true,
                }],
                sql: "SELECT hash, original_filename, extension, size_bytes, created_at
                      FROM assets WHERE parent_hash = ?1 ORDER BY created_at",
            },
        ];
        Self { presets }
    }

    pub fn list(&self) -> &[Preset] {
        &self.presets
    }

    pub fn get(&self, name: &str) -> MashResult<&Preset> {
        self.presets
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| {
                ServiceError::PresetNotFound {
                    preset: name.to_string(),
                }
                .into()
            })
    }
}

/// Validate the supplied params against the preset's declarations and
/// produce the positional bind list.
fn bind_params(
    preset: &Preset,
    params: &BTreeMap<String, serde_json::Value>,
) -> MashResult<Vec<SqlValue>> {
    for key in params.keys() {
        if !preset.params.iter().any(|p| p.name == key) {
            return Err(MashError::new(
                ErrorCode::InvalidRequest,
                format!("unknown parameter {key:?} for preset {}", preset.name),
            ));
        }
    }

    let mut binds = Vec::with_capacity(preset.params.len());
    for decl in &preset.params {
        match params.get(decl.name) {
            None | Some(serde_json::Value::Null) => {
                if decl.required {
                    return Err(ServiceError::MissingParam {
                        param: decl.name.to_string(),
                    }
                    .into());
                }
                binds.push(SqlValue::Null);
            }
            Some(value) => match (decl.kind, value) {
                (ParamKind::Text, serde_json::Value::String(s)) => {
                    binds.push(SqlValue::Text(s.clone()));
                }
                (ParamKind::Integer, serde_json::Value::Number(n)) if n.is_i64() => {
                    binds.push(SqlValue::Integer(n.as_i64().unwrap_or_default()));
                }
                _ => {
                    return Err(MashError::new(
                        ErrorCode::InvalidRequest,
                        format!(
                            "parameter {:?} must be a {:?}",
                            decl.name, decl.kind
                        ),
                    ));
                }
            },
        }
    }
    Ok(binds)
}

impl Bank {
    /// The preset catalog, for `GET /api/queries`.
    pub fn list_presets(&self) -> &[Preset] {
        self.presets.list()
    }

    /// Execute a preset across every registered (or grant-allowed)
    /// topic, merging rows tagged by topic.
    pub fn run_query(
        &self,
        identity: Option<&Identity>,
        preset_name: &str,
        params: &BTreeMap<String, serde_json::Value>,
    ) -> MashResult<Vec<QueryRow>> {
        let ctx = ActionContext::for_query(preset_name);
        let grant_id = self.authorize(identity, Action::Query, &ctx)?;

        let preset = self.presets.get(preset_name)?;
        let binds = bind_params(preset, params)?;
        let topic_filter = self.grant_topic_filter(grant_id, Action::Query)?;

        let mut merged = Vec::new();
        for name in self.registry.names() {
            if let Some(allowed) = &topic_filter {
                if !allowed.contains(&name) {
                    continue;
                }
            }
            let Some(handle) = self.registry.get(&name) else {
                continue;
            };
            if !handle.is_healthy() {
                continue;
            }
            let rows = run_on_topic(&handle, preset.sql, &binds).map_err(|e| {
                MashError::new(
                    ErrorCode::QueryError,
                    format!("preset {preset_name} on topic {name}: {e}"),
                )
            })?;
            merged.extend(rows);
        }

        if let Some(identity) = identity {
            self.note_success(identity, Action::Query, 0);
        }
        Ok(merged)
    }

    /// The `allowed_topics` list of the matched grant, if it has one.
    /// Used to scope cross-topic fan-outs.
    pub(crate) fn grant_topic_filter(
        &self,
        grant_id: i64,
        action: Action,
    ) -> MashResult<Option<Vec<String>>> {
        if grant_id == 0 {
            return Ok(None);
        }
        let grant = self
            .orchestrator
            .pool
            .with_reader(|conn| mashbank_auth::store::grant_ops::get_grant(conn, grant_id))?;
        let Some(grant) = grant else {
            return Ok(None);
        };
        let Some(json) = grant.constraints_json.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let list = match Constraints::parse(action, json)? {
            Constraints::Query(c) => c.allowed_topics,
            Constraints::Download(c) => c.allowed_topics,
            Constraints::Upload(c) => c.allowed_topics,
            Constraints::Metadata(c) => c.allowed_topics,
            Constraints::ManageTopics(c) => c.allowed_topics,
            _ => Vec::new(),
        };
        Ok(if list.is_empty() { None } else { Some(list) })
    }
}

fn run_on_topic(
    handle: &crate::registry::TopicHandle,
    sql: &str,
    binds: &[SqlValue],
) -> MashResult<Vec<QueryRow>> {
    handle.db.pool.with_reader(|conn| {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| mashbank_core::errors::to_storage_err(e.to_string()))?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(binds.iter()), |row| {
                Ok(QueryRow {
                    topic: handle.name.as_str().to_string(),
                    hash: row.get(0)?,
                    original_filename: row.get(1)?,
                    extension: row.get(2)?,
                    size_bytes: row.get::<_, i64>(3)? as u64,
                    created_at: row.get(4)?,
                })
            })
            .map_err(|e| mashbank_core::errors::to_storage_err(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| mashbank_core::errors::to_storage_err(e.to_string()))
    })
}
