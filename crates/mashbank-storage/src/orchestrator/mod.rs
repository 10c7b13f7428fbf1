//! The single cross-topic orchestrator database.

pub mod audit_ops;
pub mod index_ops;
pub mod migrations;

use std::path::{Path, PathBuf};

use mashbank_core::constants::{INTERNAL_DIR, ORCHESTRATOR_DB};
use mashbank_core::errors::MashResult;

use crate::pool::ConnectionPool;

/// Handle to the orchestrator database at
/// `<workdir>/.internal/orchestrator.db`.
pub struct OrchestratorDb {
    pub pool: ConnectionPool,
}

impl OrchestratorDb {
    pub fn db_path(workdir: &Path) -> PathBuf {
        workdir.join(INTERNAL_DIR).join(ORCHESTRATOR_DB)
    }

    /// Open (creating and migrating if needed) the orchestrator database.
    pub fn open(workdir: &Path) -> MashResult<Self> {
        let path = Self::db_path(workdir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pool = ConnectionPool::open(&path)?;
        let db = Self { pool };
        db.initialize()?;
        Ok(db)
    }

    /// In-memory orchestrator database for tests.
    pub fn open_in_memory() -> MashResult<Self> {
        let db = Self {
            pool: ConnectionPool::open_in_memory()?,
        };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> MashResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| migrations::run_migrations(conn))
    }
}
