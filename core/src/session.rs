use crate::agent::{
    AgentConfig, AgentError, AgentEvent, AgentExecutor, CancelFlag, Plan, Step, Strategy,
    ToolRegistry,
};
use crate::config::Config;
use crate::providers::create_provider;
use crate::tools::model_backed_tool;
use crate::traits::{MemoryStore, Provider, Turn};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;

pub type ProviderFactory = Arc<dyn Fn(&str) -> Result<Arc<dyn Provider>> + Send + Sync>;

/// What the presentation layer gets back for one submitted question.
#[derive(Debug, Clone)]
pub struct Submission {
    pub answer: String,
    pub steps: Vec<Step>,
    pub plan: Option<Plan>,
    /// Requested tool names that are not available in this process.
    pub unknown_tools: Vec<String>,
}

/// One conversation: a memory store plus the shared, read-only registry and
/// model backends. Overlapping submissions are serialized so turns stay in
/// submission order.
pub struct Session {
    registry: Arc<ToolRegistry>,
    memory: Arc<dyn MemoryStore>,
    provider_factory: ProviderFactory,
    providers: Mutex<HashMap<String, Arc<dyn Provider>>>,
    run_lock: tokio::sync::Mutex<()>,
    cancel: CancelFlag,
    /// Rebuild `llm-math` and `critical_search` on each submission's model.
    tools_follow_chat_model: bool,
}

impl Session {
    pub fn new(config: Arc<Config>, registry: Arc<ToolRegistry>, memory: Arc<dyn MemoryStore>) -> Self {
        let follow = config.agent.tool_model.is_none();
        let factory: ProviderFactory = Arc::new(move |model: &str| create_provider(&config, model));
        Self::with_provider_factory(registry, memory, factory).with_tools_following_chat_model(follow)
    }

    pub fn with_provider_factory(
        registry: Arc<ToolRegistry>,
        memory: Arc<dyn MemoryStore>,
        provider_factory: ProviderFactory,
    ) -> Self {
        Self {
            registry,
            memory,
            provider_factory,
            providers: Mutex::new(HashMap::new()),
            run_lock: tokio::sync::Mutex::new(()),
            cancel: CancelFlag::new(),
            tools_follow_chat_model: false,
        }
    }

    /// When set, model-backed tools use the model of the submission that
    /// calls them instead of the one they were registered with.
    pub fn with_tools_following_chat_model(mut self, follow: bool) -> Self {
        self.tools_follow_chat_model = follow;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Flag that aborts the running submission at its next step boundary.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub async fn history(&self) -> Result<Vec<Turn>> {
        self.memory.turns().await
    }

    pub async fn clear_history(&self) -> Result<()> {
        let _guard = self.run_lock.lock().await;
        self.memory.clear().await
    }

    pub async fn submit(
        &self,
        question: &str,
        config: AgentConfig,
    ) -> Result<Submission, AgentError> {
        self.submit_with_events(question, config, None).await
    }

    pub async fn submit_with_events(
        &self,
        question: &str,
        config: AgentConfig,
        events: Option<UnboundedSender<AgentEvent>>,
    ) -> Result<Submission, AgentError> {
        // Unknown strategies fail before a backend is even built.
        config.strategy.parse::<Strategy>()?;

        let _guard = self.run_lock.lock().await;
        let result = self.run_locked(question, config, events).await;
        // Cleared after the run so a cancel raised while queued still lands.
        self.cancel.reset();
        result
    }

    async fn run_locked(
        &self,
        question: &str,
        config: AgentConfig,
        events: Option<UnboundedSender<AgentEvent>>,
    ) -> Result<Submission, AgentError> {
        let provider = self.provider(&config.model)?;
        let selection = if self.tools_follow_chat_model {
            self.registry.select_with(&config.enabled_tools, |name| {
                model_backed_tool(name, provider.clone(), &self.registry)
                    .or_else(|| self.registry.get(name))
            })
        } else {
            self.registry.select(&config.enabled_tools)
        };

        let mut executor = AgentExecutor::new(config, provider, selection.tools, self.memory.clone())?
            .with_cancel(self.cancel.clone());
        if let Some(events) = events {
            executor = executor.with_events(events);
        }

        let outcome = executor.run_with_trace(question).await;
        let answer = outcome.result?;

        Ok(Submission {
            answer,
            steps: outcome.steps,
            plan: outcome.plan,
            unknown_tools: selection.unknown,
        })
    }

    fn provider(&self, model: &str) -> Result<Arc<dyn Provider>, AgentError> {
        let mut providers = self
            .providers
            .lock()
            .map_err(|_| AgentError::ModelFailure {
                cause: "provider cache lock poisoned".to_string(),
            })?;

        if let Some(provider) = providers.get(model) {
            return Ok(provider.clone());
        }

        let provider = (self.provider_factory)(model).map_err(|e| AgentError::ModelFailure {
            cause: format!("{e:#}"),
        })?;
        providers.insert(model.to_string(), provider.clone());
        Ok(provider)
    }
}
