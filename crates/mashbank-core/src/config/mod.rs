//! Service configuration, persisted as TOML under `<workdir>/.internal/`.

pub mod defaults;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_INDEX_ISSUES, INTERNAL_DIR};
use crate::errors::{ErrorCode, MashError, MashResult};

/// Bank-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Root of the on-disk layout. `None` until configured.
    pub workdir: Option<PathBuf>,
    /// Rotation threshold per container file.
    pub max_container_size: u64,
    /// Largest accepted single upload in bytes.
    pub max_file_size: u64,
    /// Server-wide ceiling on assets per bulk request.
    pub max_bulk_assets: usize,
    /// Cap on issues returned by one index verification.
    pub max_index_issues: usize,
    /// Consecutive failed logins before lockout.
    pub lockout_threshold: u32,
    pub lockout_minutes: u32,
    pub session_expiry_secs: i64,
    pub session_inactivity_secs: i64,
    pub bulk_session_ttl_secs: u64,
    pub reconcile_interval_secs: u64,
    /// Reject writes when workdir usage exceeds this. 0 = uncapped.
    pub disk_usage_cap_bytes: u64,
    pub metadata_value_max_len: usize,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            workdir: None,
            max_container_size: defaults::DEFAULT_MAX_CONTAINER_SIZE,
            max_file_size: defaults::DEFAULT_MAX_FILE_SIZE,
            max_bulk_assets: defaults::DEFAULT_MAX_BULK_ASSETS,
            max_index_issues: DEFAULT_MAX_INDEX_ISSUES,
            lockout_threshold: defaults::DEFAULT_LOCKOUT_THRESHOLD,
            lockout_minutes: defaults::DEFAULT_LOCKOUT_MINUTES,
            session_expiry_secs: defaults::DEFAULT_SESSION_EXPIRY_SECS,
            session_inactivity_secs: defaults::DEFAULT_SESSION_INACTIVITY_SECS,
            bulk_session_ttl_secs: defaults::DEFAULT_BULK_SESSION_TTL_SECS,
            reconcile_interval_secs: defaults::DEFAULT_RECONCILE_INTERVAL_SECS,
            disk_usage_cap_bytes: 0,
            metadata_value_max_len: defaults::DEFAULT_METADATA_VALUE_MAX_LEN,
        }
    }
}

impl BankConfig {
    /// The configured workdir, or `not_configured`.
    pub fn require_workdir(&self) -> MashResult<&Path> {
        self.workdir
            .as_deref()
            .ok_or_else(|| MashError::new(ErrorCode::NotConfigured, "working directory not set"))
    }

    /// Path of the persisted config file inside a workdir.
    pub fn file_path(workdir: &Path) -> PathBuf {
        workdir.join(INTERNAL_DIR).join("config.toml")
    }

    /// Load from `<workdir>/.internal/config.toml`; defaults if absent.
    pub fn load(workdir: &Path) -> MashResult<Self> {
        let path = Self::file_path(workdir);
        if !path.exists() {
            let mut cfg = Self::default();
            cfg.workdir = Some(workdir.to_path_buf());
            return Ok(cfg);
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| MashError::new(ErrorCode::InternalError, format!("read config: {e}")))?;
        let mut cfg: BankConfig = toml::from_str(&raw)
            .map_err(|e| MashError::new(ErrorCode::InternalError, format!("parse config: {e}")))?;
        cfg.workdir = Some(workdir.to_path_buf());
        Ok(cfg)
    }

    /// Persist atomically: write a sibling temp file, then rename over.
    pub fn save(&self) -> MashResult<()> {
        let workdir = self.require_workdir()?;
        let path = Self::file_path(workdir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                MashError::new(ErrorCode::InternalError, format!("create {parent:?}: {e}"))
            })?;
        }
        let raw = toml::to_string_pretty(self)
            .map_err(|e| MashError::new(ErrorCode::InternalError, format!("encode config: {e}")))?;
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, raw)
            .map_err(|e| MashError::new(ErrorCode::InternalError, format!("write config: {e}")))?;
        fs::rename(&tmp, &path)
            .map_err(|e| MashError::new(ErrorCode::InternalError, format!("commit config: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = BankConfig::default();
        cfg.workdir = Some(dir.path().to_path_buf());
        cfg.max_container_size = 2048;
        cfg.save().unwrap();

        let loaded = BankConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.max_container_size, 2048);
        assert_eq!(loaded.workdir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BankConfig::load(dir.path()).unwrap();
        assert_eq!(
            cfg.max_container_size,
            defaults::DEFAULT_MAX_CONTAINER_SIZE
        );
    }

    #[test]
    fn test_unconfigured_workdir_errors() {
        let cfg = BankConfig::default();
        let err = cfg.require_workdir().unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotConfigured);
    }
}
