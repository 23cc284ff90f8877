//! LLM-backed structured parsing with an escalating token budget.
//!
//! Each request walks a small state machine:
//! `Attempt(n, budget) -> Success | Attempt(n + 1, budget * 2) | GiveUp`.
//! Attempts are sequential; the budget is capped by configuration.

use crate::config::ParserConfig;
use crate::error::{Error, Result};
use crate::llm::{CompletionOptions, LlmClient, OpenRouterClient};
use crate::prompts::PromptManager;
use crate::understanding::action::PartialAction;
use crate::understanding::json_extract::extract_json;
use crate::understanding::schemas::LlmAction;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempt { number: u32, budget: u32 },
    GiveUp,
}

impl RetryState {
    pub fn first(budget: u32) -> Self {
        RetryState::Attempt { number: 1, budget }
    }

    pub fn next(self, max_attempts: u32, budget_cap: u32) -> Self {
        match self {
            RetryState::Attempt { number, budget } if number < max_attempts => {
                RetryState::Attempt {
                    number: number + 1,
                    budget: budget.saturating_mul(2).min(budget_cap),
                }
            }
            _ => RetryState::GiveUp,
        }
    }
}

/// Turns a user message into partial actions via the LLM
pub struct LlmParser {
    client: Arc<dyn LlmClient>,
    config: ParserConfig,
}

impl LlmParser {
    pub fn new(client: Arc<dyn LlmClient>, config: ParserConfig) -> Self {
        Self { client, config }
    }

    /// Parse `original` (and its typo-corrected form).
    ///
    /// Truncated and malformed responses are retried with a doubled budget.
    /// When every attempt fails, actions salvaged from a truncated response are
    /// returned if there were any; otherwise the last error.
    pub async fn parse(
        &self,
        original: &str,
        corrected: &str,
        recent_conversation: Option<&str>,
    ) -> Result<Vec<PartialAction>> {
        let messages = vec![
            OpenRouterClient::create_system_message(&PromptManager::get_task_parse_system_prompt()),
            OpenRouterClient::create_user_message(&PromptManager::create_task_parse_user_message(
                original,
                corrected,
                recent_conversation,
            )),
        ];

        let max_attempts = self.config.max_attempts.max(1);
        let mut state = RetryState::first(self.config.initial_max_tokens);
        let mut salvaged: Option<Vec<PartialAction>> = None;
        let mut last_error = Error::LlmUnavailable {
            message: "no attempt was made".to_string(),
        };

        while let RetryState::Attempt { number, budget } = state {
            let options = CompletionOptions::json(budget, self.config.temperature);
            debug!("LLM parse attempt {}/{} with max_tokens={}", number, max_attempts, budget);

            match self.client.complete(&messages, &options).await {
                Ok(text) => match actions_from_text(&text) {
                    Some(actions) => {
                        info!(
                            "LLM parse succeeded on attempt {}/{} (max_tokens={}, {} actions)",
                            number,
                            max_attempts,
                            budget,
                            actions.len()
                        );
                        return Ok(actions);
                    }
                    None => {
                        warn!("LLM attempt {} returned no usable actions", number);
                        last_error = Error::MalformedLlmOutput {
                            message: PromptManager::truncate_text(&text, 120),
                        };
                    }
                },
                Err(Error::LlmTruncated { max_tokens, partial }) => {
                    warn!("LLM attempt {} truncated at {} tokens", number, max_tokens);
                    if let Some(actions) = actions_from_text(&partial) {
                        salvaged = Some(actions);
                    }
                    last_error = Error::LlmTruncated {
                        max_tokens,
                        partial,
                    };
                }
                Err(e) if e.is_retryable() => {
                    warn!("LLM attempt {} failed: {}", number, e);
                    last_error = e;
                }
                Err(e) => return Err(e),
            }

            state = state.next(max_attempts, self.config.max_tokens_cap);
        }

        match salvaged {
            Some(actions) => {
                info!(
                    "LLM parse gave up after {} attempts; using {} actions salvaged from a truncated response",
                    max_attempts,
                    actions.len()
                );
                Ok(actions)
            }
            None => {
                warn!("LLM parse gave up after {} attempts: {}", max_attempts, last_error);
                Err(last_error)
            }
        }
    }
}

/// Usable actions in raw model output, or `None` when there are none
fn actions_from_text(text: &str) -> Option<Vec<PartialAction>> {
    let actions: Vec<PartialAction> = extract_json(text)?
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<LlmAction>(item) {
            Ok(action) => action.into_partial(),
            Err(e) => {
                debug!("Skipping malformed LLM action: {}", e);
                None
            }
        })
        .collect();

    (!actions.is_empty()).then_some(actions)
}
