//! Study Buddy - natural-language intent parsing for a study assistant
//!
//! Turns chat messages such as "make 5 flashcards for ninja then 2 for
//! daredevil" into ordered, structured actions over notes, flashcards and
//! schedule entries, then carries them out against a storage collaborator.
//!
//! # Pipeline
//!
//! 1. **Normalize** - whole-word typo correction ("flasghcard" -> "flashcard")
//! 2. **Split** - compound messages become ordered clauses
//! 3. **Classify** - rule tables pick verb, target, count, topic and time
//! 4. **LLM fallback** - low-confidence parses go to the model with escalating
//!    token budgets; malformed or truncated JSON is salvaged where possible
//! 5. **Resolve** - pronouns and bare adjectives inherit the previous topic
//! 6. **Execute** - actions run in order; mass deletes wait for confirmation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use study_buddy::config::AppConfig;
//! use study_buddy::storage::InMemoryStore;
//! use study_buddy::understanding::StudyAgent;
//!
//! # async fn demo() {
//! let agent = StudyAgent::new(Arc::new(InMemoryStore::new()), &AppConfig::default());
//! let response = agent
//!     .understand_and_execute("make 5 flashcards about photosynthesis", None)
//!     .await;
//! println!("{}", response.summary);
//! # }
//! ```

pub mod config;
pub mod content;
pub mod context;
pub mod error;
pub mod llm;
pub mod logging;
pub mod prompts;
pub mod storage;
pub mod understanding;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use context::ConversationMemory;
pub use error::{Error, Result};
pub use llm::{LlmClient, OpenRouterClient};
pub use storage::{InMemoryStore, JsonFileStore, StorageCollaborator};
pub use understanding::{Action, AgentResponse, StudyAgent, TaskRequest};
