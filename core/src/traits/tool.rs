use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Name and description of a tool as presented to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

/// A capability the agent can call by name with a single text input.
///
/// Implementations own their timeout policy; the executor awaits `invoke`
/// without imposing one of its own. An `Err` is reported back to the model
/// as an observation, not treated as fatal.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn invoke(&self, input: &str) -> anyhow::Result<String>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}
