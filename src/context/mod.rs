pub mod memory;

// Re-export the conversation memory types for convenience
pub use memory::{ConversationMemory, MemoryEntry};
