//! Structured logging field name constants for tagfeed.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, cache hits/misses, reconciliation outcomes |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "session", "db"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "attach", "detach", "prime", "list_chats"
pub const OPERATION: &str = "op";

/// Acting user's opaque identity.
pub const USER_ID: &str = "user_id";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Chat UUID being operated on.
pub const CHAT_ID: &str = "chat_id";

/// Tag UUID being operated on.
pub const TAG_ID: &str = "tag_id";

/// Tag name (create/rename flows).
pub const TAG_NAME: &str = "tag_name";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a query or snapshot.
pub const RESULT_COUNT: &str = "result_count";

/// Number of independent store calls confirmed in a bulk operation.
pub const APPLIED_COUNT: &str = "applied_count";

/// Number of independent store calls that failed in a bulk operation.
pub const FAILED_COUNT: &str = "failed_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
