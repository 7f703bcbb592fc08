//! Throttled liveness signal.
//!
//! [`ThrottledHeartbeat`] implements the [`Heartbeat`] port by writing one
//! `tracing` event per emission under the `heartbeat` target. Unforced
//! emissions for the same worker are dropped until the interval has passed.
//! Per-worker telemetry is kept for status displays.

use async_trait::async_trait;
use chrono::Utc;
use conductor_application::Heartbeat;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;

/// Runtime snapshot of one worker's heartbeat.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatSnapshot {
    pub name: String,
    pub interval_secs: u64,
    pub last_emitted_at: Option<String>,
    pub emitted: u64,
    pub suppressed: u64,
    pub last_metadata: Value,
}

impl HeartbeatSnapshot {
    fn new(name: &str, interval: Duration) -> Self {
        Self {
            name: name.to_string(),
            interval_secs: interval.as_secs(),
            last_emitted_at: None,
            emitted: 0,
            suppressed: 0,
            last_metadata: Value::Null,
        }
    }
}

struct WorkerBeat {
    last_emit: Option<Instant>,
    snapshot: HeartbeatSnapshot,
}

pub struct ThrottledHeartbeat {
    interval: Duration,
    workers: Mutex<HashMap<String, WorkerBeat>>,
}

impl ThrottledHeartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            workers: Mutex::new(HashMap::new()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record an emission attempt; returns whether it went out.
    fn record(&self, worker_name: &str, metadata: Value, force: bool, now: Instant) -> bool {
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        let beat = workers
            .entry(worker_name.to_string())
            .or_insert_with(|| WorkerBeat {
                last_emit: None,
                snapshot: HeartbeatSnapshot::new(worker_name, self.interval),
            });

        let due = beat
            .last_emit
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if !force && !due {
            beat.snapshot.suppressed += 1;
            return false;
        }

        info!(
            target: "heartbeat",
            worker = worker_name,
            forced = force,
            metadata = %metadata,
            "alive"
        );
        beat.last_emit = Some(now);
        beat.snapshot.emitted += 1;
        beat.snapshot.last_emitted_at = Some(Utc::now().to_rfc3339());
        beat.snapshot.last_metadata = metadata;
        true
    }

    pub fn snapshots(&self) -> Vec<HeartbeatSnapshot> {
        let workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        let mut rows: Vec<HeartbeatSnapshot> =
            workers.values().map(|b| b.snapshot.clone()).collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }
}

#[async_trait]
impl Heartbeat for ThrottledHeartbeat {
    async fn emit(&self, worker_name: &str, metadata: Value, force: bool) -> bool {
        self.record(worker_name, metadata, force, Instant::now())
    }
}
