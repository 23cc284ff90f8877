//! Understanding Module
//!
//! Turns free-form chat text into structured study actions and runs them.
//! Text is typo-normalized, split into clauses and classified by rule tables;
//! when that fast path is unsure (or a compound message has an ambiguous
//! clause) the LLM parser takes over, with the heuristic result kept as the
//! fallback. Topics are then resolved across clauses and the executor applies
//! the actions to storage in order.

pub mod action;
pub mod classifier;
pub mod confirmation;
pub mod executor;
pub mod json_extract;
pub mod llm_parser;
pub mod normalizer;
pub mod request;
pub mod resolver;
pub mod schemas;
pub mod splitter;
pub mod time_expr;

// Re-export main types for convenience
pub use action::{Action, ActionData, ActionStatus, ActionType, PartialAction, Target};
pub use confirmation::{ConfirmationLedger, PendingConfirmation};
pub use executor::{ActionExecutor, ActionOutcome, Artifacts, ExecutionResult};
pub use llm_parser::{LlmParser, RetryState};
pub use normalizer::{normalize, Correction, Normalized};
pub use request::TaskRequest;

use crate::config::{AppConfig, ConversationConfig, ParserConfig};
use crate::content::{ContentGenerator, LlmContentGenerator, TemplateGenerator};
use crate::context::ConversationMemory;
use crate::error::Error;
use crate::llm::LlmClient;
use crate::storage::StorageCollaborator;
use classifier::{classify, classify_with_inherited_verb, is_vague_topic, mentions_confirmation};
use resolver::resolve_with_seed;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Confidence of a first clause with no verb that was read as a create request
const BARE_REQUEST_CONFIDENCE: f32 = 0.5;

/// Confidence ceiling when some clause could not be classified at all
const UNCLASSIFIED_CONFIDENCE: f32 = 0.3;

/// Turns of conversation offered to the LLM as context
const PROMPT_HISTORY_TURNS: usize = 5;

/// Result of the heuristic fast path for one message
#[derive(Debug, Clone)]
pub struct HeuristicParse {
    pub request: TaskRequest,
    pub clauses: usize,
    pub unclassified: usize,
    /// Some clause borrowed its verb or had no concrete topic of its own
    pub ambiguous: bool,
}

impl HeuristicParse {
    pub fn needs_llm(&self, config: &ParserConfig) -> bool {
        self.unclassified > 0
            || self.request.is_empty()
            || self.request.confidence < config.confidence_threshold
            || (config.llm_for_compound && self.clauses >= 2 && self.ambiguous)
    }
}

/// What the caller gets back for one message
#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    /// Human-readable, never empty
    pub summary: String,
    pub actions: Vec<Action>,
    pub artifacts: Artifacts,
    pub confidence: f32,
    pub outcomes: Vec<ActionOutcome>,
    pub pending_confirmations: Vec<PendingConfirmation>,
    /// Concrete topics of the request, for conversation memory
    pub topics: Vec<String>,
    pub cancelled: bool,
}

impl AgentResponse {
    fn from_execution(request: TaskRequest, result: ExecutionResult) -> Self {
        Self {
            pending_confirmations: result.pending_confirmations(),
            summary: result.summary,
            topics: request.topics(),
            confidence: request.confidence,
            actions: request.actions,
            artifacts: result.artifacts,
            outcomes: result.outcomes,
            cancelled: result.cancelled,
        }
    }

    fn message(summary: String) -> Self {
        Self {
            summary,
            actions: Vec::new(),
            artifacts: Artifacts::default(),
            confidence: 0.0,
            outcomes: Vec::new(),
            pending_confirmations: Vec::new(),
            topics: Vec::new(),
            cancelled: false,
        }
    }

    fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::message("⏹️ Request cancelled; nothing was changed.".to_string())
        }
    }
}

/// Main facade: parse a chat message and carry it out
pub struct StudyAgent {
    parser: Option<LlmParser>,
    executor: ActionExecutor,
    parser_config: ParserConfig,
    conversation: ConversationConfig,
}

impl StudyAgent {
    /// Heuristic-only agent with template content
    pub fn new(storage: Arc<dyn StorageCollaborator>, config: &AppConfig) -> Self {
        Self {
            parser: None,
            executor: ActionExecutor::new(
                storage,
                Arc::new(TemplateGenerator::new()),
                config.executor.clone(),
            ),
            parser_config: config.parser.clone(),
            conversation: config.conversation.clone(),
        }
    }

    /// Agent that consults the LLM for uncertain parses and for content
    pub fn with_llm_client(
        storage: Arc<dyn StorageCollaborator>,
        client: Arc<dyn LlmClient>,
        config: &AppConfig,
    ) -> Self {
        let mut agent = Self::new(storage, config)
            .with_content_generator(Arc::new(LlmContentGenerator::new(client.clone())));
        agent.parser = Some(LlmParser::new(client, config.parser.clone()));
        agent
    }

    pub fn with_content_generator(mut self, content: Arc<dyn ContentGenerator>) -> Self {
        self.executor = self.executor.with_content_generator(content);
        self
    }

    pub fn is_offline(&self) -> bool {
        self.parser.is_none()
    }

    /// Rule-based parse of already normalized text
    pub fn parse_heuristically(&self, corrected: &str, seed: Option<&str>) -> HeuristicParse {
        let clauses = splitter::split(corrected);
        let mut partials = Vec::with_capacity(clauses.len());
        let mut unclassified = 0;
        let mut previous_verb: Option<ActionType> = None;

        for (index, clause) in clauses.iter().enumerate() {
            let partial = classify(clause)
                .or_else(|| previous_verb.and_then(|verb| classify_with_inherited_verb(clause, verb)))
                .or_else(|| {
                    // "flashcards on cells" on its own reads as a create request
                    (index == 0)
                        .then(|| classify_with_inherited_verb(clause, ActionType::Create))
                        .flatten()
                        .map(|mut p| {
                            p.confidence = p.confidence.min(BARE_REQUEST_CONFIDENCE);
                            p
                        })
                });

            match partial {
                Some(partial) => {
                    previous_verb = Some(partial.action_type);
                    partials.push(partial);
                }
                None => {
                    debug!("{}", Error::ParseAmbiguous { clause: clause.clone() });
                    unclassified += 1;
                }
            }
        }

        let ambiguous = partials.iter().any(|p| {
            p.inherited_verb || (!p.all && p.topic.as_deref().map_or(true, is_vague_topic))
        });
        let resolution = resolve_with_seed(&partials, seed);
        let mut confidence = resolution.confidence;
        if unclassified > 0 {
            confidence = confidence.min(UNCLASSIFIED_CONFIDENCE);
        }

        HeuristicParse {
            request: TaskRequest::new(resolution.actions, confidence),
            clauses: clauses.len(),
            unclassified,
            ambiguous,
        }
    }

    /// Parse a message, consulting the LLM only when the heuristics are unsure
    pub async fn understand(&self, text: &str, memory: Option<&ConversationMemory>) -> TaskRequest {
        let normalized = normalize(text);
        if normalized.changed() {
            debug!("Normalized '{}' -> '{}'", text, normalized.corrected_text);
        }

        let heuristic = self.parse_heuristically(&normalized.corrected_text, self.seed(memory));
        if !heuristic.needs_llm(&self.parser_config) || self.parser.is_none() {
            info!(
                "Heuristic parse: {} actions (confidence {:.2})",
                heuristic.request.actions.len(),
                heuristic.request.confidence
            );
            return heuristic.request;
        }

        self.llm_or_fallback(&normalized, heuristic, memory).await
    }

    /// Parse a message with the LLM, falling back to the heuristic result when
    /// the LLM is unavailable or exhausts its attempts
    pub async fn parse_with_llm(
        &self,
        text: &str,
        memory: Option<&ConversationMemory>,
    ) -> TaskRequest {
        let normalized = normalize(text);
        let heuristic = self.parse_heuristically(&normalized.corrected_text, self.seed(memory));
        self.llm_or_fallback(&normalized, heuristic, memory).await
    }

    async fn llm_or_fallback(
        &self,
        normalized: &Normalized,
        heuristic: HeuristicParse,
        memory: Option<&ConversationMemory>,
    ) -> TaskRequest {
        let Some(parser) = &self.parser else {
            return heuristic.request;
        };

        let history = memory.and_then(|m| m.format_for_prompt(PROMPT_HISTORY_TURNS));
        let parsed = parser
            .parse(
                &normalized.original,
                &normalized.corrected_text,
                history.as_deref(),
            )
            .await;

        match parsed {
            Ok(mut partials) => {
                let confirmed = mentions_confirmation(&normalized.corrected_text);
                for partial in &mut partials {
                    partial.confirm = confirmed && partial.action_type == ActionType::Delete;
                }
                let resolution = resolve_with_seed(&partials, self.seed(memory));
                if heuristic.unclassified == 0
                    && resolution.actions.len() < heuristic.request.actions.len()
                {
                    warn!(
                        "LLM returned {} actions for {} clauses; keeping the heuristic parse",
                        resolution.actions.len(),
                        heuristic.request.actions.len()
                    );
                    return heuristic.request;
                }
                TaskRequest::new(resolution.actions, resolution.confidence)
            }
            Err(e) => {
                warn!("LLM parse unavailable, using heuristic parse: {}", e);
                heuristic.request
            }
        }
    }

    pub async fn understand_and_execute(
        &self,
        text: &str,
        memory: Option<&ConversationMemory>,
    ) -> AgentResponse {
        self.understand_and_execute_with_cancel(text, memory, &CancellationToken::new())
            .await
    }

    /// Like [`Self::understand_and_execute`]; once `cancel` fires, no further
    /// action is started and an in-flight LLM call is abandoned.
    pub async fn understand_and_execute_with_cancel(
        &self,
        text: &str,
        memory: Option<&ConversationMemory>,
        cancel: &CancellationToken,
    ) -> AgentResponse {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Request cancelled while parsing");
                return AgentResponse::cancelled();
            }
            request = self.understand(text, memory) => request,
        };

        let result = self.executor.execute(&request.actions, Some(cancel)).await;
        AgentResponse::from_execution(request, result)
    }

    /// Carry out a parked destructive action
    pub async fn confirm(&self, token: &str) -> AgentResponse {
        let Some(pending) = self.executor.take_confirmation(token) else {
            return AgentResponse::message(format!(
                "There is nothing waiting for confirmation under '{}'.",
                token.trim()
            ));
        };

        let mut action = pending.action.clone();
        action.data.confirm = Some(true);
        let request = TaskRequest::new(vec![action], 1.0);
        let result = self.executor.execute_confirmed(pending).await;
        AgentResponse::from_execution(request, result)
    }

    pub fn pending_confirmations(&self) -> Vec<PendingConfirmation> {
        self.executor.pending_confirmations()
    }

    fn seed<'a>(&self, memory: Option<&'a ConversationMemory>) -> Option<&'a str> {
        if self.conversation.inherit_topics_across_turns {
            memory.and_then(ConversationMemory::last_topic)
        } else {
            None
        }
    }
}
