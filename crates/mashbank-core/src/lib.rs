//! # mashbank-core
//!
//! Foundation crate for the mashbank asset bank.
//! Defines all types, models, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod cancel;
pub mod config;
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod models;

// Re-export the most commonly used types at the crate root.
pub use cancel::CancelFlag;
pub use config::BankConfig;
pub use errors::{ErrorCode, MashError, MashResult};
pub use models::{Action, ActionContext, Asset, PolicyResult, TopicName};
