//! Content Generation Module
//!
//! Produces the bodies of notes and flashcards for a topic. The executor only
//! sees the `ContentGenerator` trait; the template generator works offline and
//! the LLM generator falls back to it whenever the model lets it down.

pub mod llm_generator;
pub mod template;

use crate::error::Result;
use crate::storage::{ItemKind, NewItem};
use async_trait::async_trait;

// Re-export main types
pub use llm_generator::LlmContentGenerator;
pub use template::TemplateGenerator;

/// Source of study material for create and update actions
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Up to `count` new items of `kind` about `topic`. Schedule entries are
    /// not generated content, so implementations return none for them.
    async fn generate(&self, kind: ItemKind, topic: &str, count: usize) -> Result<Vec<NewItem>>;
}
