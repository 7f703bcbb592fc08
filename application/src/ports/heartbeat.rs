//! Heartbeat port
//!
//! Liveness signal emitted while long plans execute. Implementations are
//! expected to throttle emissions per worker name unless `force` is set.

use async_trait::async_trait;
use serde_json::Value;

/// Liveness signal sink
#[async_trait]
pub trait Heartbeat: Send + Sync {
    /// Emit a heartbeat for `worker_name`.
    ///
    /// Returns whether the heartbeat was actually sent (throttled
    /// implementations may drop it).
    async fn emit(&self, worker_name: &str, metadata: Value, force: bool) -> bool;
}

/// Heartbeat that drops every signal
pub struct NoHeartbeat;

#[async_trait]
impl Heartbeat for NoHeartbeat {
    async fn emit(&self, _worker_name: &str, _metadata: Value, _force: bool) -> bool {
        false
    }
}
