//! The single write connection. SQLite serializes writers anyway; one
//! mutex-guarded connection keeps lock contention out of the database.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use mashbank_core::errors::{to_storage_err, MashResult};

use super::pragmas::apply_pragmas;

/// Mutex-guarded owner of the sole writable connection.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    pub fn open(path: &Path) -> MashResult<Self> {
        let conn = Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> MashResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a closure against the write connection.
    pub fn with_conn_sync<F, T>(&self, f: F) -> MashResult<T>
    where
        F: FnOnce(&Connection) -> MashResult<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| to_storage_err(format!("write connection lock poisoned: {e}")))?;
        f(&guard)
    }
}
