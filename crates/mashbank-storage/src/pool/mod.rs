//! Database connection handling: one guarded writer plus a small set of
//! read-only connections dispatched idle-first.

pub mod pragmas;
pub mod write_connection;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::Connection;

use mashbank_core::errors::{to_storage_err, MashResult};

pub use write_connection::WriteConnection;

/// Read connections opened per file-backed pool. Download and stats
/// traffic is short-query-heavy; a handful of WAL readers is plenty.
const READER_COUNT: usize = 4;

/// Connections for one database file: the sole writer plus read-only
/// readers. A reader request takes the first idle read connection and
/// only blocks (on a rotating pick) when every reader is busy. In
/// in-memory mode there are no readers and reads route through the
/// writer, because separate in-memory connections would be separate
/// databases.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    pub db_path: Option<PathBuf>,
    readers: Vec<Mutex<Connection>>,
    turn: AtomicUsize,
}

impl ConnectionPool {
    /// Open the writer and the readers for a database file.
    pub fn open(path: &Path) -> MashResult<Self> {
        let writer = WriteConnection::open(path)?;
        let mut readers = Vec::with_capacity(READER_COUNT);
        for _ in 0..READER_COUNT {
            let conn = Connection::open_with_flags(
                path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
            )
            .map_err(|e| to_storage_err(format!("open reader: {e}")))?;
            pragmas::apply_read_pragmas(&conn)?;
            readers.push(Mutex::new(conn));
        }
        Ok(Self {
            writer,
            db_path: Some(path.to_path_buf()),
            readers,
            turn: AtomicUsize::new(0),
        })
    }

    /// In-memory pool for tests: writer only, reads share it.
    pub fn open_in_memory() -> MashResult<Self> {
        Ok(Self {
            writer: WriteConnection::open_in_memory()?,
            db_path: None,
            readers: Vec::new(),
            turn: AtomicUsize::new(0),
        })
    }

    /// Run a read-only query. Prefers an idle reader so concurrent reads
    /// never queue behind each other while a slot is free.
    pub fn with_reader<F, T>(&self, f: F) -> MashResult<T>
    where
        F: FnOnce(&Connection) -> MashResult<T>,
    {
        if self.readers.is_empty() {
            return self.writer.with_conn_sync(f);
        }
        for slot in &self.readers {
            if let Ok(guard) = slot.try_lock() {
                return f(&guard);
            }
        }
        // All busy: wait our turn on one picked by rotation.
        let turn = self.turn.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let guard = self.readers[turn]
            .lock()
            .map_err(|e| to_storage_err(format!("reader lock poisoned: {e}")))?;
        f(&guard)
    }

    /// Number of dedicated read connections (0 in in-memory mode).
    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }
}
