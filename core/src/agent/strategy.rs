use crate::agent::AgentError;
use crate::agent::prompt::{PlanAndSolvePrompt, PromptBuilder, ReactPrompt};
use std::str::FromStr;

/// Control policy of the query loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Decide one action at a time from the scratch state alone.
    ZeroShotReact,
    /// Ask for an ordered plan first, then run the loop seeded with it.
    PlanAndSolve,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::PlanAndSolve, Strategy::ZeroShotReact];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZeroShotReact => "zero-shot-react",
            Self::PlanAndSolve => "plan-and-solve",
        }
    }

    pub fn prompt_builder(&self) -> Box<dyn PromptBuilder> {
        match self {
            Self::ZeroShotReact => Box::new(ReactPrompt),
            Self::PlanAndSolve => Box::new(PlanAndSolvePrompt),
        }
    }
}

impl FromStr for Strategy {
    type Err = AgentError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim() {
            "zero-shot-react" => Ok(Self::ZeroShotReact),
            "plan-and-solve" => Ok(Self::PlanAndSolve),
            other => Err(AgentError::UnknownStrategy(other.to_string())),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
