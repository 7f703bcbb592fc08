//! Mock ports shared by the use case tests.

use crate::ports::context_persistence::{ContextPersistence, PersistError};
use crate::ports::heartbeat::Heartbeat;
use crate::ports::llm_provider::{ChatResponse, LlmProvider, ProviderError};
use crate::ports::summarizer::{SummarizeError, Summarizer};
use crate::ports::worker_dispatcher::{DispatchError, WorkerDispatcher};
use async_trait::async_trait;
use conductor_domain::{
    ContextMetrics, Message, StepId, WorkerInput, WorkerResult, WorkerType,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ==================== Test Mocks ====================

/// Provider that replays scripted replies and records every request.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    pub requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<ChatResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|t| Ok(ChatResponse::from_text(*t)))
                .collect(),
        )
    }

    pub fn failing() -> Self {
        Self::new(vec![Err(ProviderError::Timeout)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(
        &self,
        messages: &[Message],
        _tools: &[Value],
    ) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Other("no scripted response".into())))
    }
}

/// Dispatcher that succeeds unless the step is listed as failing, and
/// records which steps ran and what dependency results they saw.
#[derive(Default)]
pub struct RecordingDispatcher {
    failing: HashSet<StepId>,
    delay: Option<Duration>,
    pub calls: Mutex<Vec<StepId>>,
    pub seen_dependencies: Mutex<HashMap<StepId, Vec<StepId>>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(StepId::new(id));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn called(&self) -> Vec<StepId> {
        self.calls.lock().unwrap().clone()
    }

    pub fn dependencies_seen_by(&self, id: &str) -> Vec<StepId> {
        let mut seen = self
            .seen_dependencies
            .lock()
            .unwrap()
            .get(&StepId::new(id))
            .cloned()
            .unwrap_or_default();
        seen.sort();
        seen
    }
}

#[async_trait]
impl WorkerDispatcher for RecordingDispatcher {
    async fn dispatch(
        &self,
        _worker_type: WorkerType,
        input: WorkerInput,
    ) -> Result<WorkerResult, DispatchError> {
        let step_id = input.step.id.clone();
        self.calls.lock().unwrap().push(step_id.clone());
        self.seen_dependencies.lock().unwrap().insert(
            step_id.clone(),
            input.dependency_results.keys().cloned().collect(),
        );

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&step_id) {
            return Err(DispatchError::Failed("boom".into()));
        }
        Ok(WorkerResult::success(
            step_id.clone(),
            format!("- Finding: output of {}", step_id),
            1,
        ))
    }
}

/// Summarizer with a fixed outcome.
pub struct FixedSummarizer(pub Option<String>);

#[async_trait]
impl Summarizer for FixedSummarizer {
    async fn summarize(&self, _transcript: &str) -> Result<String, SummarizeError> {
        self.0
            .clone()
            .ok_or_else(|| SummarizeError::Provider(ProviderError::Timeout))
    }
}

/// Persistence that records saves, or fails every save.
#[derive(Default)]
pub struct RecordingPersistence {
    fail: bool,
    pub saved: Mutex<Vec<(String, String)>>,
}

impl RecordingPersistence {
    pub fn failing() -> Self {
        Self {
            fail: true,
            saved: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ContextPersistence for RecordingPersistence {
    async fn save(
        &self,
        session_id: &str,
        summary: &str,
        _metrics: &ContextMetrics,
    ) -> Result<(), PersistError> {
        if self.fail {
            return Err(PersistError::Unavailable("disk full".into()));
        }
        self.saved
            .lock()
            .unwrap()
            .push((session_id.to_string(), summary.to_string()));
        Ok(())
    }
}

/// Heartbeat that records `(worker, force)` for every emission.
#[derive(Default)]
pub struct RecordingHeartbeat {
    pub emitted: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl Heartbeat for RecordingHeartbeat {
    async fn emit(&self, worker_name: &str, _metadata: Value, force: bool) -> bool {
        self.emitted
            .lock()
            .unwrap()
            .push((worker_name.to_string(), force));
        true
    }
}
