//! The append-only metadata journal and its latest-wins computed view.

use rusqlite::{params, Connection, OptionalExtension};

use mashbank_core::errors::{to_storage_err, MashResult};
use mashbank_core::models::{ComputedMetadata, MetadataEntry, MetadataOp};

/// Append one journal entry and rewrite the affected computed row, in
/// one transaction. The journal is the source of truth; the computed
/// view is a rebuildable reduction.
pub fn append_entry(conn: &Connection, entry: &MetadataEntry) -> MashResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("metadata begin: {e}")))?;
    match append_entry_inner(&tx, entry) {
        Ok(()) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("metadata commit: {e}")))?;
            Ok(())
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Journal + view update on the caller's transaction (for batch ops).
pub fn append_entry_inner(conn: &Connection, entry: &MetadataEntry) -> MashResult<()> {
    conn.execute(
        "INSERT INTO metadata_log (
            asset_hash, key, op, value, processor, processor_version, timestamp
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.asset_hash,
            entry.key,
            entry.op.as_str(),
            entry.value,
            entry.processor,
            entry.processor_version,
            entry.timestamp,
        ],
    )
    .map_err(|e| to_storage_err(format!("append metadata log: {e}")))?;

    match entry.op {
        MetadataOp::Set => {
            conn.execute(
                "INSERT INTO computed_metadata (asset_hash, key, value, processor, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(asset_hash, key) DO UPDATE SET
                     value = excluded.value,
                     processor = excluded.processor,
                     updated_at = excluded.updated_at",
                params![
                    entry.asset_hash,
                    entry.key,
                    entry.value.as_deref().unwrap_or(""),
                    entry.processor,
                    entry.timestamp,
                ],
            )
            .map_err(|e| to_storage_err(format!("update computed metadata: {e}")))?;
        }
        MetadataOp::Delete => {
            // A delete tombstones the key: the journal keeps the event,
            // the computed view drops the row.
            conn.execute(
                "DELETE FROM computed_metadata WHERE asset_hash = ?1 AND key = ?2",
                params![entry.asset_hash, entry.key],
            )
            .map_err(|e| to_storage_err(format!("tombstone computed metadata: {e}")))?;
        }
    }
    Ok(())
}

/// The computed view for one asset, in key order.
pub fn get_computed(conn: &Connection, asset_hash: &str) -> MashResult<Vec<ComputedMetadata>> {
    let mut stmt = conn
        .prepare(
            "SELECT asset_hash, key, value, processor, updated_at
             FROM computed_metadata WHERE asset_hash = ?1 ORDER BY key",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![asset_hash], |row| {
            Ok(ComputedMetadata {
                asset_hash: row.get(0)?,
                key: row.get(1)?,
                value: row.get(2)?,
                processor: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))
}

/// One computed value.
pub fn get_computed_value(
    conn: &Connection,
    asset_hash: &str,
    key: &str,
) -> MashResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM computed_metadata WHERE asset_hash = ?1 AND key = ?2",
        params![asset_hash, key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Rebuild the computed view from the journal, latest-wins per
/// (asset, key). Used by offline repair.
pub fn rebuild_computed(conn: &Connection) -> MashResult<u64> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| to_storage_err(format!("rebuild begin: {e}")))?;
    tx.execute("DELETE FROM computed_metadata", [])
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rebuilt = tx
        .execute(
            "INSERT INTO computed_metadata (asset_hash, key, value, processor, updated_at)
             SELECT asset_hash, key, value, processor, timestamp FROM metadata_log l
             WHERE op = 'set'
               AND id = (SELECT MAX(id) FROM metadata_log
                         WHERE asset_hash = l.asset_hash AND key = l.key)",
            [],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    tx.commit()
        .map_err(|e| to_storage_err(format!("rebuild commit: {e}")))?;
    Ok(rebuilt as u64)
}
