use thiserror::Error;

/// Loop-terminal conditions of a query, plus the tool failure that the loop
/// converts into an observation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("could not complete the question within {steps} steps")]
    StepLimitExceeded { steps: usize },

    #[error("tool '{tool}' failed: {cause}")]
    ToolFailure { tool: String, cause: String },

    #[error("model request failed: {cause}")]
    ModelFailure { cause: String },

    #[error("model output was malformed after {retries} corrective retries: {output}")]
    ParseFailure { retries: usize, output: String },

    #[error("unknown reasoning strategy '{0}' (expected zero-shot-react or plan-and-solve)")]
    UnknownStrategy(String),

    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("invalid agent configuration: {0}")]
    InvalidConfig(String),

    #[error("memory store failed: {0}")]
    Memory(String),

    #[error("query cancelled")]
    Cancelled,
}
