//! Heartbeat configuration from TOML (`[heartbeat]` section)

use conductor_domain::ConfigIssue;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// # Example
///
/// ```toml
/// [heartbeat]
/// interval_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHeartbeatConfig {
    /// Minimum seconds between two unforced emissions for one worker
    pub interval_secs: u64,
}

impl Default for FileHeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
        }
    }
}

impl FileHeartbeatConfig {
    pub fn to_interval(&self) -> (Duration, Vec<ConfigIssue>) {
        if self.interval_secs == 0 {
            return (
                Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
                vec![ConfigIssue::constraint(
                    "heartbeat.interval_secs",
                    "heartbeat.interval_secs must be at least 1",
                )],
            );
        }
        (Duration::from_secs(self.interval_secs), vec![])
    }
}
