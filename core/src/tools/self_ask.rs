use crate::agent::{AgentConfig, AgentExecutor, Strategy, ToolSet};
use crate::memory::create_memory;
use crate::traits::{Provider, Tool};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{Instrument, debug, info_span};

const SUB_AGENT_MAX_STEPS: usize = 5;
const SUB_AGENT_PARSE_RETRIES: usize = 3;

/// Answers a complicated question by running a nested zero-shot agent that
/// may only search. Each call starts from empty memory.
pub struct CriticalSearchTool {
    provider: Arc<dyn Provider>,
    search: Arc<dyn Tool>,
}

impl CriticalSearchTool {
    pub fn new(provider: Arc<dyn Provider>, search: Arc<dyn Tool>) -> Self {
        Self { provider, search }
    }

    fn sub_agent_config(&self) -> AgentConfig {
        AgentConfig {
            strategy: Strategy::ZeroShotReact.as_str().to_string(),
            model: self.provider.model().to_string(),
            enabled_tools: vec![self.search.name().to_string()],
            max_steps: SUB_AGENT_MAX_STEPS,
            max_parse_retries: SUB_AGENT_PARSE_RETRIES,
            plan_requires_all_subgoals: false,
        }
    }
}

#[async_trait]
impl Tool for CriticalSearchTool {
    fn name(&self) -> &str {
        "critical_search"
    }

    fn description(&self) -> &str {
        "A tool to answer complicated questions. Useful for when you need to answer questions \
         about current events. Input should be a question."
    }

    async fn invoke(&self, input: &str) -> Result<String> {
        let executor = AgentExecutor::new(
            self.sub_agent_config(),
            self.provider.clone(),
            ToolSet::new(vec![self.search.clone()]),
            create_memory(),
        )?;

        let span = info_span!("critical_search", search = self.search.name());
        let answer = executor.run(input).instrument(span).await?;
        debug!(answer = %answer, "sub-agent answered");
        Ok(answer)
    }
}

/// Stands in for a search tool when none could be configured.
pub struct UnavailableSearch;

#[async_trait]
impl Tool for UnavailableSearch {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search"
    }

    async fn invoke(&self, _input: &str) -> Result<String> {
        Ok("Search tool not available".to_string())
    }
}
