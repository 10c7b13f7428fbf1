//! # mashbank-storage
//!
//! SQLite persistence for the asset bank: the per-topic databases (the
//! truth about a topic's contents) and the single orchestrator database
//! (the cross-topic fast-path index plus audit and auth tables).
//!
//! Query modules are free functions over `&rusqlite::Connection`, so
//! callers compose them into transactions however the pipeline needs.

pub mod orchestrator;
pub mod pool;
pub mod topic;

pub use orchestrator::OrchestratorDb;
pub use pool::ConnectionPool;
pub use topic::TopicDb;
