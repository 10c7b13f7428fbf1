//! The per-topic database: asset rows, the metadata journal with its
//! computed view, and container hash-chain records.

pub mod asset_ops;
pub mod chain_ops;
pub mod metadata_ops;
pub mod migrations;

use std::path::{Path, PathBuf};

use mashbank_core::constants::INTERNAL_DIR;
use mashbank_core::errors::MashResult;

use crate::pool::ConnectionPool;

/// Handle to one topic's database, at `<topic>/.internal/<topic>.db`.
pub struct TopicDb {
    pub pool: ConnectionPool,
}

impl TopicDb {
    /// Path of the database file for a topic directory.
    pub fn db_path(topic_dir: &Path, topic_name: &str) -> PathBuf {
        topic_dir.join(INTERNAL_DIR).join(format!("{topic_name}.db"))
    }

    /// Open (creating and migrating if needed) the topic database.
    pub fn open(topic_dir: &Path, topic_name: &str) -> MashResult<Self> {
        let path = Self::db_path(topic_dir, topic_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pool = ConnectionPool::open(&path)?;
        let db = Self { pool };
        db.initialize()?;
        Ok(db)
    }

    /// In-memory topic database for tests.
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

