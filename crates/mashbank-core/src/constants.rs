/// Mashbank system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Magic bytes at the start of every container entry header.
pub const ENTRY_MAGIC: [u8; 4] = *b"MSHB";

/// Current container entry format version.
pub const ENTRY_FORMAT_VERSION: u16 = 1;

/// Fixed size of a container entry header in bytes.
pub const ENTRY_HEADER_LEN: u64 = 110;

/// File extension of append-only containers.
pub const CONTAINER_EXT: &str = "dat";

/// Name of the hidden bookkeeping directory inside the workdir and each topic.
pub const INTERNAL_DIR: &str = ".internal";

/// Filename of the cross-topic orchestrator database.
pub const ORCHESTRATOR_DB: &str = "orchestrator.db";

/// Number of plaintext prefix characters stored for opaque tokens.
pub const TOKEN_PREFIX_LEN: usize = 8;

/// Prefix convention distinguishing web API keys from session tokens.
pub const API_KEY_PREFIX: &str = "mbk_";

/// Maximum entries reported by a single index verification run.
pub const DEFAULT_MAX_INDEX_ISSUES: usize = 1000;
