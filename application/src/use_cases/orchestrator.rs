//! Message orchestrator.
//!
//! Runs one inbound message through the whole pipeline for its session:
//!
//! ```text
//! sweep expiries → classify → route ─┬─ HITL gate (request / reply)
//!                                    ├─ simple responder
//!                                    └─ plan → execute → aggregate
//!                → append turn → compact
//! ```
//!
//! The session lock is held for the whole message, so transitions for one
//! session are applied strictly in arrival order.

use crate::config::OrchestratorConfig;
use crate::ports::context_persistence::ContextPersistence;
use crate::ports::heartbeat::{Heartbeat, NoHeartbeat};
use crate::ports::llm_provider::LlmProvider;
use crate::ports::progress::ProgressSender;
use crate::ports::summarizer::Summarizer;
use crate::ports::worker_dispatcher::WorkerDispatcher;
use crate::use_cases::classify_query::{ClassificationTier, ClassifyQueryUseCase};
use crate::use_cases::compact_context::{CompactContextInput, CompactContextUseCase};
use crate::use_cases::create_plan::{CreatePlanUseCase, PlanningError};
use crate::use_cases::execute_plan::{ExecutePlanError, ExecutePlanInput, ExecutePlanUseCase};
use crate::use_cases::hitl_gate::{GateDecision, HitlGate, ReplyOutcome};
use crate::use_cases::session_registry::SessionRegistry;
use chrono::Utc;
use conductor_domain::classification::{
    ClassificationContext, Complexity, QueryCategory, QueryClassification, QueryType,
};
use conductor_domain::context::{format_transcript, monitor};
use conductor_domain::hitl::{ConfirmationPrompt, ToolConfirmation};
use conductor_domain::worker::aggregate_results;
use conductor_domain::{
    AggregationResult, DomainError, Message, PlanValidationError, RouteTarget, SessionState,
    route,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tool name of confirmations that hold back a whole request
pub const DEFERRED_REQUEST_TOOL: &str = "deferred_request";

/// Admin commands the orchestrator runs itself once approved
const SESSION_RESET_COMMANDS: &[&str] = &["clear", "reset", "forget", "wipe"];

/// Recent turns handed to the planner and workers as context
const CONTEXT_MESSAGES: usize = 6;

const SIMPLE_FALLBACK_REPLY: &str = "Hello! How can I help you today?";
const UNAVAILABLE_REPLY: &str = "Sorry, I can't answer that right now. Please try again shortly.";
const HELP_REPLY: &str = "Send me a question or a task. \
    Commands: /help, /status, /settings, /clear (asks for confirmation).";
const ABOUT_REPLY: &str = "I classify each message, plan multi-step work for specialised workers, \
    and ask before anything risky runs.";

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Invalid plan: {0}")]
    InvalidPlan(#[from] PlanValidationError),

    #[error("Plan execution cancelled")]
    Cancelled,

    #[error("HITL error: {0}")]
    Hitl(#[from] DomainError),
}

impl From<PlanningError> for OrchestratorError {
    fn from(e: PlanningError) -> Self {
        match e {
            PlanningError::InvalidPlan(e) => OrchestratorError::InvalidPlan(e),
        }
    }
}

impl From<ExecutePlanError> for OrchestratorError {
    fn from(e: ExecutePlanError) -> Self {
        match e {
            ExecutePlanError::InvalidPlan(e) => OrchestratorError::InvalidPlan(e),
            ExecutePlanError::Cancelled { .. } => OrchestratorError::Cancelled,
        }
    }
}

/// What the delivery layer gets back for one message
#[derive(Debug, Clone)]
pub struct OrchestratorResponse {
    pub text: String,
    pub route: RouteTarget,
    /// Absent for button callbacks, which skip classification
    pub classification: Option<QueryClassification>,
    pub tier: Option<ClassificationTier>,
    /// Confirmation prompt to show, when something awaits approval
    pub prompt: Option<ConfirmationPrompt>,
    /// Approved tool calls the caller must run and report back through
    /// [`MessageOrchestrator::record_tool_execution`]
    pub approved: Vec<ToolConfirmation>,
    pub aggregation: Option<AggregationResult>,
    pub compacted: bool,
}

impl OrchestratorResponse {
    fn new(text: impl Into<String>, route: RouteTarget) -> Self {
        Self {
            text: text.into(),
            route,
            classification: None,
            tier: None,
            prompt: None,
            approved: Vec::new(),
            aggregation: None,
            compacted: false,
        }
    }
}

/// Result of asking permission for a tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallGate {
    Allowed,
    AwaitingConfirmation {
        confirmation: ToolConfirmation,
        prompt: ConfirmationPrompt,
    },
}

pub struct MessageOrchestrator {
    config: OrchestratorConfig,
    classifier: ClassifyQueryUseCase,
    planner: CreatePlanUseCase,
    dispatcher: Arc<dyn WorkerDispatcher>,
    responder: Option<Arc<dyn LlmProvider>>,
    gate: HitlGate,
    compactor: CompactContextUseCase,
    heartbeat: Arc<dyn Heartbeat>,
    progress: Option<ProgressSender>,
    cancellation: Option<CancellationToken>,
    sessions: SessionRegistry,
    session_idle_ttl: Option<Duration>,
}

impl MessageOrchestrator {
    /// Orchestrator without an LLM: fast-path classification, template
    /// plans and the heuristic summarizer.
    pub fn new(config: OrchestratorConfig, dispatcher: Arc<dyn WorkerDispatcher>) -> Self {
        Self {
            classifier: ClassifyQueryUseCase::new(),
            planner: CreatePlanUseCase::new(),
            gate: HitlGate::from_params(&config.hitl),
            compactor: CompactContextUseCase::new(config.compaction.clone()),
            dispatcher,
            responder: None,
            heartbeat: Arc::new(NoHeartbeat),
            progress: None,
            cancellation: None,
            sessions: SessionRegistry::new(),
            session_idle_ttl: None,
            config,
        }
    }

    // ==================== Builder Methods ====================

    /// Use `provider` for classification fallback, planning and simple replies.
    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.classifier = ClassifyQueryUseCase::new()
            .with_provider(Arc::clone(&provider))
            .with_llm_fallback(self.config.classifier.llm_fallback);
        self.planner = CreatePlanUseCase::new().with_provider(Arc::clone(&provider));
        self.responder = Some(provider);
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.compactor = self.compactor.with_summarizer(summarizer);
        self
    }

    pub fn with_persistence(mut self, persistence: Arc<dyn ContextPersistence>) -> Self {
        self.compactor = self.compactor.with_persistence(persistence);
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Arc<dyn Heartbeat>) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Evict sessions idle for `ttl` whenever a message arrives.
    pub fn with_session_idle_ttl(mut self, ttl: Duration) -> Self {
        self.session_idle_ttl = Some(ttl);
        self
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    // ==================== Entry Points ====================

    /// Handle one user message for `session_id`.
    pub async fn handle_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<OrchestratorResponse, OrchestratorError> {
        let handle = self.sessions.session(session_id);
        if let Some(ttl) = self.session_idle_ttl {
            self.sessions.evict_idle(ttl);
        }
        let mut session = handle.lock().await;
        let now = Utc::now();

        let (swept, expired) = self.gate.sweep_expired(&session.hitl, now);
        session.hitl = swept;
        if !expired.is_empty() {
            debug!("Session {}: expired {:?}", session_id, expired);
        }

        let history_tokens = monitor(
            &session.messages,
            &self.config.system_prompt,
            &[],
            &self.config.compaction,
        )
        .total_tokens;
        let context = ClassificationContext::new(session.hitl.awaiting_count(), history_tokens)
            .with_large_context_tokens(self.config.classifier.large_context_tokens);

        let outcome = self.classifier.classify(text, Some(&context)).await;
        let classification = outcome.classification;
        let target = route(&classification);
        info!(
            "Session {}: {} via {} → {}",
            session_id, classification.category, outcome.tier, target
        );

        let mut response = if target.uses_planner() {
            // Nothing is recorded until the plan has run.
            let prior_context = recent_context(&session);
            let aggregation = self
                .run_plan(target, text, &classification, &prior_context, session_id)
                .await?;
            session.push(Message::user(text));
            let mut response = OrchestratorResponse::new(aggregation.response.clone(), target);
            response.aggregation = Some(aggregation);
            response
        } else {
            session.push(Message::user(text));
            match target {
                RouteTarget::HitlGate
                    if classification.query_type == QueryType::ToolConfirmation =>
                {
                    let reply = self.gate.apply_reply(&session.hitl, text, now);
                    self.settle_reply(&mut session, reply).await
                }
                RouteTarget::HitlGate => {
                    self.hold_for_approval(&mut session, text, &classification)
                }
                _ => {
                    let reply = self.simple_reply(&session, text, &classification).await;
                    OrchestratorResponse::new(reply, target)
                }
            }
        };
        response.route = target;
        response.classification = Some(classification);
        response.tier = Some(outcome.tier);

        session.push(Message::assistant(response.text.clone()));
        response.compacted = self.compact_session(&mut session).await;
        Ok(response)
    }

    /// Handle an inline-button press for `session_id`.
    pub async fn handle_callback(&self, session_id: &str, data: &str) -> OrchestratorResponse {
        let handle = self.sessions.session(session_id);
        let mut session = handle.lock().await;
        let now = Utc::now();

        let (swept, _) = self.gate.sweep_expired(&session.hitl, now);
        session.hitl = swept;

        let reply = self.gate.apply_callback(&session.hitl, data, now);
        let mut response = self.settle_reply(&mut session, reply).await;
        if !response.text.is_empty() {
            session.push(Message::assistant(response.text.clone()));
        }
        response.compacted = self.compact_session(&mut session).await;
        response
    }

    /// Ask whether a tool call may run now, queueing a confirmation if not.
    pub async fn request_tool_confirmation(
        &self,
        session_id: &str,
        tool_name: &str,
        args: Value,
        description: &str,
    ) -> ToolCallGate {
        let handle = self.sessions.session(session_id);
        let mut session = handle.lock().await;
        let now = Utc::now();

        match self
            .gate
            .gate_tool_call(&session.hitl, tool_name, args, description, now)
        {
            GateDecision::Allowed { .. } => ToolCallGate::Allowed,
            GateDecision::ConfirmationRequired {
                state,
                confirmation,
            } => {
                session.hitl = state;
                let prompt = self
                    .gate
                    .prompt(&session.hitl, now)
                    .unwrap_or_else(|| ConfirmationPrompt {
                        text: confirmation.description.clone(),
                        buttons: Vec::new(),
                    });
                ToolCallGate::AwaitingConfirmation {
                    confirmation,
                    prompt,
                }
            }
        }
    }

    /// Report the outcome of an approved tool call the caller ran.
    pub async fn record_tool_execution(
        &self,
        session_id: &str,
        confirmation_id: &str,
        outcome: Result<String, String>,
    ) -> Result<(), OrchestratorError> {
        let handle = self.sessions.session(session_id);
        let mut session = handle.lock().await;
        session.hitl =
            self.gate
                .record_execution(&session.hitl, confirmation_id, outcome, Utc::now())?;
        Ok(())
    }

    // ==================== Pipeline Stages ====================

    /// Queue the whole request behind a confirmation.
    fn hold_for_approval(
        &self,
        session: &mut SessionState,
        text: &str,
        classification: &QueryClassification,
    ) -> OrchestratorResponse {
        let now = Utc::now();
        let (tool_name, args, description) = match admin_command(text) {
            Some(command) => (
                command.clone(),
                json!({ "command": command }),
                format!("Run /{}", command),
            ),
            None => (
                DEFERRED_REQUEST_TOOL.to_string(),
                json!({ "text": text, "category": classification.category.as_str() }),
                format!("Run request: {}", text),
            ),
        };

        let (state, confirmation) =
            self.gate
                .request(&session.hitl, &tool_name, args, &description, now);
        session.hitl = state;

        let prompt = self.gate.prompt(&session.hitl, now);
        let text = prompt
            .as_ref()
            .map(|p| p.text.clone())
            .unwrap_or_else(|| format!("Confirmation {} requested", confirmation.id));
        let mut response = OrchestratorResponse::new(text, RouteTarget::HitlGate);
        response.prompt = prompt;
        response
    }

    /// Run what the core can run itself and hand the rest to the caller.
    async fn settle_reply(
        &self,
        session: &mut SessionState,
        reply: ReplyOutcome,
    ) -> OrchestratorResponse {
        session.hitl = reply.state.clone();
        let mut lines = vec![reply.message.clone()];
        let mut for_caller = Vec::new();

        for confirmation in reply.approved {
            let now = Utc::now();
            let outcome = if SESSION_RESET_COMMANDS.contains(&confirmation.tool_name.as_str()) {
                session.messages.clear();
                session.summary = None;
                lines.push("Conversation cleared.".to_string());
                Ok("conversation cleared".to_string())
            } else if confirmation.tool_name == DEFERRED_REQUEST_TOOL {
                let result = self.resume_deferred(&confirmation, &session.id).await;
                match &result {
                    Ok(text) => lines.push(text.clone()),
                    Err(e) => lines.push(format!("⚠️ {}", e)),
                }
                result
            } else {
                for_caller.push(confirmation);
                continue;
            };

            match self
                .gate
                .record_execution(&session.hitl, &confirmation.id, outcome, now)
            {
                Ok(state) => session.hitl = state,
                Err(e) => warn!("Could not record execution of {}: {}", confirmation.id, e),
            }
        }

        let text = lines
            .into_iter()
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        let mut response = OrchestratorResponse::new(text, RouteTarget::HitlGate);
        response.prompt = self.gate.prompt(&session.hitl, Utc::now());
        response.approved = for_caller;
        response
    }

    /// Run a request that was held for approval.
    async fn resume_deferred(
        &self,
        confirmation: &ToolConfirmation,
        session_id: &str,
    ) -> Result<String, String> {
        let text = confirmation
            .tool_args
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let category = confirmation
            .tool_args
            .get("category")
            .and_then(Value::as_str)
            .and_then(|c| c.parse::<QueryCategory>().ok())
            .unwrap_or(QueryCategory::General);
        let classification =
            QueryClassification::new(QueryType::Complex, category, Complexity::Medium)
                .with_reasoning("approved request");

        self.run_plan(route(&classification), text, &classification, "", session_id)
            .await
            .map(|aggregation| aggregation.response)
            .map_err(|e| e.to_string())
    }

    async fn simple_reply(
        &self,
        session: &SessionState,
        text: &str,
        classification: &QueryClassification,
    ) -> String {
        if classification.category == QueryCategory::Admin
            && let Some(reply) = self.admin_reply(session, text)
        {
            return reply;
        }

        let Some(provider) = &self.responder else {
            return SIMPLE_FALLBACK_REPLY.to_string();
        };
        let messages: Vec<Message> =
            std::iter::once(Message::system(self.config.system_prompt.clone()))
                .chain(session.messages.iter().cloned())
                .collect();
        match provider.chat(&messages, &[]).await {
            Ok(response) if !response.content.trim().is_empty() => response.content,
            Ok(_) => {
                warn!("Simple responder returned an empty reply");
                UNAVAILABLE_REPLY.to_string()
            }
            Err(e) => {
                warn!("Simple responder failed: {}", e);
                UNAVAILABLE_REPLY.to_string()
            }
        }
    }

    /// Built-in answers to read-only admin commands.
    fn admin_reply(&self, session: &SessionState, text: &str) -> Option<String> {
        let command = admin_command(text)?;
        let reply = match command.as_str() {
            "help" | "start" => HELP_REPLY.to_string(),
            "about" => ABOUT_REPLY.to_string(),
            "status" => {
                let metrics = monitor(
                    &session.messages,
                    &self.config.system_prompt,
                    &[],
                    &self.config.compaction,
                );
                format!(
                    "Session {}: {} message(s), {} pending confirmation(s), context at {:.0}% of budget.",
                    session.id,
                    session.messages.len(),
                    session.hitl.awaiting_count(),
                    metrics.utilization * 100.0
                )
            }
            "settings" => format!(
                "LLM fallback: {}. Max parallel steps: {}. Confirmation threshold: {}. Confirmations expire after {}s.",
                if self.config.classifier.llm_fallback { "on" } else { "off" },
                self.config.execution.max_parallelism,
                self.config.hitl.confirmation_threshold,
                self.config.hitl.confirmation_ttl_secs
            ),
            _ => return None,
        };
        Some(reply)
    }

    /// Plan, execute and aggregate.
    ///
    /// The research pipeline always runs the full multi-source research
    /// template. Every other target asks the planner, whose fallback
    /// template is sized to the request's complexity.
    async fn run_plan(
        &self,
        target: RouteTarget,
        text: &str,
        classification: &QueryClassification,
        context: &str,
        trace_prefix: &str,
    ) -> Result<AggregationResult, OrchestratorError> {
        let planned = match target {
            RouteTarget::ResearchPipeline => {
                self.planner.template(text, QueryCategory::Research)?
            }
            _ => self.planner.execute(text, classification, context).await?,
        };

        let mut executor = ExecutePlanUseCase::new(Arc::clone(&self.dispatcher))
            .with_max_parallelism(self.config.execution.max_parallelism)
            .with_heartbeat(Arc::clone(&self.heartbeat));
        if let Some(progress) = &self.progress {
            executor = executor.with_progress(progress.clone());
        }
        if let Some(token) = &self.cancellation {
            executor = executor.with_cancellation(token.child_token());
        }

        let trace_id = format!("{}-{}", trace_prefix, conductor_domain::core::ids::short_id());
        let results = executor
            .execute(
                ExecutePlanInput::new(planned.plan.clone())
                    .with_context(context)
                    .with_trace_id(trace_id),
            )
            .await?;
        Ok(aggregate_results(&results, &planned.plan))
    }

    /// Compact the session in place; returns whether anything changed.
    async fn compact_session(&self, session: &mut SessionState) -> bool {
        let result = self
            .compactor
            .execute(
                CompactContextInput::new(&session.id, &session.messages)
                    .with_system_prompt(&self.config.system_prompt),
            )
            .await;
        if !result.was_compacted {
            return false;
        }
        if result.was_summarized() {
            session.summary = Some(result.summary.clone());
        }
        session.messages = result.into_messages();
        true
    }
}

/// `/clear now` → `clear`; bare `reset the history` → `reset`.
fn admin_command(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let word = trimmed
        .strip_prefix('/')
        .unwrap_or(trimmed)
        .split_whitespace()
        .next()?
        .trim_end_matches(['!', '.', '?'])
        .to_lowercase();
    let known = SESSION_RESET_COMMANDS.contains(&word.as_str())
        || ["help", "status", "start", "about", "settings"].contains(&word.as_str());
    known.then_some(word)
}

/// Summary plus the last few turns, as planner and worker context.
fn recent_context(session: &SessionState) -> String {
    let start = session.messages.len().saturating_sub(CONTEXT_MESSAGES);
    let transcript = format_transcript(&session.messages[start..]);
    match &session.summary {
        Some(summary) if !summary.is_empty() => format!("{}\n{}", summary, transcript),
        _ => transcript,
    }
}
