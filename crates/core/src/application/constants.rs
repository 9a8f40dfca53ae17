// Engine constants (ADR: No magic values)

/// Default number of ranked results
pub const DEFAULT_RESULT_LIMIT: usize = 10;

/// Upper bound on results accepted from callers
pub const DEFAULT_MAX_LIMIT: usize = 50;

/// Time allowed for the scorer to load its model and answer the liveness probe (2 minutes)
pub const DEFAULT_STARTUP_TIMEOUT_MS: u64 = 120_000;

/// Time allowed for one scoring request (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Graceful process shutdown timeout (5 seconds)
/// SIGTERM first, SIGKILL once this elapses
pub const GRACEFUL_SHUTDOWN_TIMEOUT_MS: u64 = 5_000;

/// Job lists at least this long are scored across blocking worker threads
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

/// Tokens shown per text by the inspection endpoint
pub const DEFAULT_INSPECT_SAMPLE_SIZE: usize = 30;
