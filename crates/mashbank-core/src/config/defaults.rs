//! Default configuration values.

/// Container rotation threshold: 1 GiB.
pub const DEFAULT_MAX_CONTAINER_SIZE: u64 = 1024 * 1024 * 1024;

/// Largest accepted single upload: 256 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Server-wide ceiling on assets per bulk request.
pub const DEFAULT_MAX_BULK_ASSETS: usize = 500;

/// Consecutive failed password logins before lockout.
pub const DEFAULT_LOCKOUT_THRESHOLD: u32 = 5;

/// Lockout duration in minutes.
pub const DEFAULT_LOCKOUT_MINUTES: u32 = 15;

/// Absolute session lifetime in seconds (24h).
pub const DEFAULT_SESSION_EXPIRY_SECS: i64 = 24 * 3600;

/// Session inactivity window in seconds (2h).
pub const DEFAULT_SESSION_INACTIVITY_SECS: i64 = 2 * 3600;

/// Completed bulk ZIP retention in seconds.
pub const DEFAULT_BULK_SESSION_TTL_SECS: u64 = 15 * 60;

/// Interval between scheduled reconciliation passes in seconds.
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 10 * 60;

/// Longest accepted metadata value, in characters.
pub const DEFAULT_METADATA_VALUE_MAX_LEN: usize = 64 * 1024;
