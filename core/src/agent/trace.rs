use serde::{Deserialize, Serialize};

/// One iteration of the loop as recorded in the scratch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub thought: String,
    pub action: Option<String>,
    pub action_input: Option<String>,
    pub observation: Option<String>,
}

/// Progress notifications for a presentation layer rendering a run live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    Planned { subgoals: Vec<String> },
    Thought { step: usize, text: String },
    Action { step: usize, tool: String, input: String },
    Observation { step: usize, text: String },
    Corrective { message: String },
    Finished { answer: String },
}
