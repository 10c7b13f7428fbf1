//! # mashbank-container
//!
//! The on-disk append-only container format: a `.dat` file is a
//! concatenation of entries, each a fixed 110-byte header followed by the
//! raw asset bytes. This crate owns serialization, appending, scanning,
//! validation, hash-chain replay, and the size-capped rotation policy.
//!
//! Nothing here takes locks: append is not concurrency-safe alone, and
//! callers must hold the per-topic write lock.

pub mod append;
pub mod chain;
pub mod header;
pub mod read;
pub mod rotate;
pub mod scan;
pub mod validate;

pub use append::append_from_reader;
pub use chain::{replay_chain, ReplayOutcome};
pub use header::EntryHeader;
pub use read::read_data;
pub use rotate::{select_container, ContainerChoice};
pub use scan::scan;
pub use validate::validate_entry;
