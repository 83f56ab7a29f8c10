//! Engine tuning knobs.

use chrono::Duration;

/// Configuration for [`crate::LedgerEngine`].
///
/// Wiring these from the environment or a config file is the caller's job.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// How long a memoized mutating response satisfies replays.
    pub idempotency_ttl: Duration,
    /// History page size when the caller does not ask for one.
    pub default_history_limit: u32,
    /// Upper clamp for history page sizes.
    pub max_history_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idempotency_ttl: Duration::hours(24),
            default_history_limit: 10,
            max_history_limit: 100,
        }
    }
}
