pub mod directive;
pub mod error;
pub mod executor;
pub mod plan;
pub mod prompt;
pub mod registry;
pub mod strategy;
pub mod trace;

pub use directive::{Directive, MalformedOutput, parse_directive};
pub use error::AgentError;
pub use executor::{AgentConfig, AgentExecutor, CancelFlag, RunOutcome};
pub use plan::Plan;
pub use prompt::{PromptBuilder, PromptState};
pub use registry::{Selection, ToolRegistry, ToolSet};
pub use strategy::Strategy;
pub use trace::{AgentEvent, Step};
