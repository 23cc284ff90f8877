use crate::error::{Error, Result};
use crate::llm::{CompletionOptions, LlmClient, Message};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Test double that replays canned responses in order and records every call.
pub(crate) struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<(Vec<Message>, CompletionOptions)>>,
}

impl ScriptedLlm {
    pub(crate) fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn budgets(&self) -> Vec<u32> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, options)| options.max_tokens)
            .collect()
    }

    pub(crate) fn last_user_message(&self) -> Option<String> {
        self.calls.lock().unwrap().last().and_then(|(messages, _)| {
            messages
                .iter()
                .rev()
                .find(|m| m.role == "user")
                .map(|m| m.content.clone())
        })
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), options.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(Error::LlmUnavailable {
                    message: "script exhausted".to_string(),
                })
            })
    }
}
