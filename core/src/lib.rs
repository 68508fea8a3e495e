pub mod agent;
pub mod config;
pub mod memory;
pub mod providers;
pub mod session;
pub mod text;
pub mod tools;
pub mod traits;

pub use agent::{
    AgentConfig, AgentError, AgentEvent, AgentExecutor, CancelFlag, RunOutcome, Step, Strategy,
    ToolRegistry, ToolSet,
};
pub use config::*;
pub use memory::*;
pub use providers::*;
pub use session::{ProviderFactory, Session, Submission};
pub use tools::*;
pub use traits::*;
