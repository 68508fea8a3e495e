pub mod memory;
pub mod provider;
pub mod tool;

pub use memory::{MemoryStore, Role, Turn};
pub use provider::{ChatMessage, ChatRequest, Provider};
pub use tool::{Tool, ToolSpec};
