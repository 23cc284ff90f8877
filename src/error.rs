//! Error types shared across the crate.
//!
//! Parsing and LLM failures are recovered inside the understanding layer and
//! only ever show up to the caller as a lower confidence. Storage failures and
//! unconfirmed destructive actions are the outcomes a user actually sees.

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Heuristics could not classify a clause; the LLM path should take over.
    #[error("could not classify '{clause}'")]
    ParseAmbiguous { clause: String },

    #[error("LLM unavailable: {message}")]
    LlmUnavailable { message: String },

    /// The provider stopped because the completion hit `max_tokens`.
    #[error("LLM response truncated at {max_tokens} tokens")]
    LlmTruncated { max_tokens: u32, partial: String },

    #[error("malformed LLM output: {message}")]
    MalformedLlmOutput { message: String },

    #[error("deleting all {target} requires confirmation")]
    DestructiveActionUnconfirmed { target: String },

    #[error("storage operation failed: {message}")]
    StorageOperationFailed { message: String },

    #[error("request cancelled")]
    Cancelled,

    #[error("{message}")]
    InvalidConfig { message: String },

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageOperationFailed {
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether a retry against the LLM provider could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::LlmUnavailable { .. }
                | Self::LlmTruncated { .. }
                | Self::MalformedLlmOutput { .. }
                | Self::Reqwest(_)
        )
    }
}
