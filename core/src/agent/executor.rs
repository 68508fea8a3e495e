use crate::agent::directive::{Directive, parse_directive};
use crate::agent::plan::Plan;
use crate::agent::prompt::{Correction, PromptBuilder, PromptState};
use crate::agent::registry::ToolSet;
use crate::agent::trace::{AgentEvent, Step};
use crate::agent::{AgentError, Strategy};
use crate::config::Config;
use crate::traits::{ChatMessage, ChatRequest, MemoryStore, Provider, Turn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

const STOP_SEQUENCES: &[&str] = &["\nObservation:"];

/// Per-query settings, fixed for the lifetime of one executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub strategy: String,
    pub model: String,
    pub enabled_tools: Vec<String>,
    pub max_steps: usize,
    /// Malformed model replies tolerated per query before `ParseFailure`.
    pub max_parse_retries: usize,
    pub plan_requires_all_subgoals: bool,
}

impl AgentConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            strategy: config.agent.strategy.clone(),
            model: config.model.clone(),
            enabled_tools: config.agent.tools.clone(),
            max_steps: config.agent.max_steps,
            max_parse_retries: config.agent.max_parse_retries,
            plan_requires_all_subgoals: config.agent.plan_requires_all_subgoals,
        }
    }
}

/// Advisory cancellation, honoured at the next step boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of one query together with its trace.
#[derive(Debug)]
pub struct RunOutcome {
    pub result: Result<String, AgentError>,
    pub steps: Vec<Step>,
    pub plan: Option<Plan>,
    /// Underlying completion calls, including planning and corrective retries.
    pub completions: usize,
}

#[derive(Default)]
struct Trace {
    steps: Vec<Step>,
    plan: Option<Plan>,
    completions: usize,
}

/// Mediates between a model and a set of tools until the model produces a
/// final answer or the step budget runs out.
///
/// One executor handles one `run` at a time; callers sharing a memory store
/// across queries must serialize them (see [`crate::session::Session`]).
pub struct AgentExecutor {
    config: AgentConfig,
    strategy: Strategy,
    prompt: Box<dyn PromptBuilder>,
    provider: Arc<dyn Provider>,
    tools: ToolSet,
    memory: Arc<dyn MemoryStore>,
    events: Option<UnboundedSender<AgentEvent>>,
    cancel: CancelFlag,
}

impl AgentExecutor {
    /// Resolves the strategy up front, so an unknown name fails here without
    /// touching the provider or any tool.
    pub fn new(
        config: AgentConfig,
        provider: Arc<dyn Provider>,
        tools: ToolSet,
        memory: Arc<dyn MemoryStore>,
    ) -> Result<Self, AgentError> {
        let strategy: Strategy = config.strategy.parse()?;
        if config.max_steps == 0 {
            return Err(AgentError::InvalidConfig(
                "max_steps must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            prompt: strategy.prompt_builder(),
            strategy,
            config,
            provider,
            tools,
            memory,
            events: None,
            cancel: CancelFlag::new(),
        })
    }

    pub fn with_events(mut self, events: UnboundedSender<AgentEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub async fn run(&self, question: &str) -> Result<String, AgentError> {
        self.run_with_trace(question).await.result
    }

    /// Runs one query. On success the question, one tool turn per executed
    /// action, and the answer are appended to memory as one block; a failed
    /// query leaves memory untouched.
    pub async fn run_with_trace(&self, question: &str) -> RunOutcome {
        let mut trace = Trace::default();
        let mut result = self.execute(question.trim(), &mut trace).await;

        match &result {
            Ok(answer) => {
                if let Err(e) = self.commit(question.trim(), &trace.steps, answer).await {
                    result = Err(e);
                }
            }
            Err(e) => warn!(
                strategy = %self.strategy,
                steps = trace.steps.len(),
                "query ended without an answer: {}",
                e
            ),
        }

        RunOutcome {
            result,
            steps: trace.steps,
            plan: trace.plan,
            completions: trace.completions,
        }
    }

    async fn execute(&self, question: &str, trace: &mut Trace) -> Result<String, AgentError> {
        if question.is_empty() {
            return Err(AgentError::EmptyQuestion);
        }

        let history = self
            .memory
            .turns()
            .await
            .map_err(|e| AgentError::Memory(e.to_string()))?;
        let tools = self.tools.list_available();

        info!(
            strategy = %self.strategy,
            model = self.provider.model(),
            tools = tools.len(),
            "running query"
        );

        let planning = self
            .prompt
            .planning_messages(&PromptState::new(question, &tools, &history, &[]));
        if let Some(messages) = planning {
            self.check_cancelled()?;
            let output = self.complete(&messages, &[], trace).await?;
            let plan = Plan::parse(&output);
            debug!(subgoals = plan.subgoals.len(), "plan ready");
            self.emit(AgentEvent::Planned {
                subgoals: plan.subgoals.clone(),
            });
            trace.plan = Some(plan);
        }

        let mut step = 0;
        let mut retries_left = self.config.max_parse_retries;
        let mut corrections: Vec<Correction> = Vec::new();

        while step < self.config.max_steps {
            self.check_cancelled()?;

            let messages = self.prompt.step_messages(
                &PromptState::new(question, &tools, &history, &trace.steps)
                    .with_plan(trace.plan.as_ref())
                    .with_corrections(&corrections),
            );
            let output = self.complete(&messages, STOP_SEQUENCES, trace).await?;

            let directive = match parse_directive(&output) {
                Ok(directive) => directive,
                Err(malformed) => {
                    if retries_left == 0 {
                        return Err(AgentError::ParseFailure {
                            retries: self.config.max_parse_retries,
                            output,
                        });
                    }
                    retries_left -= 1;
                    debug!(retries_left, "malformed model output: {}", malformed);
                    self.emit(AgentEvent::Corrective {
                        message: malformed.to_string(),
                    });
                    corrections.push(Correction {
                        output,
                        message: malformed.to_string(),
                    });
                    continue;
                }
            };

            corrections.clear();
            step += 1;

            match directive {
                Directive::FinalAnswer { thought, answer } => {
                    self.emit(AgentEvent::Thought {
                        step,
                        text: thought.clone(),
                    });
                    let require_all = self.config.plan_requires_all_subgoals;
                    if self.prompt.accepts_final_answer(trace.plan.as_ref(), require_all) {
                        info!(steps = step, "final answer");
                        self.emit(AgentEvent::Finished {
                            answer: answer.clone(),
                        });
                        return Ok(answer);
                    }

                    let outstanding = trace
                        .plan
                        .as_ref()
                        .map(|p| p.outstanding().join("; "))
                        .unwrap_or_default();
                    let observation = format!(
                        "The plan is not finished yet. Address these steps before answering: {outstanding}"
                    );
                    self.emit(AgentEvent::Observation {
                        step,
                        text: observation.clone(),
                    });
                    trace.steps.push(Step {
                        thought,
                        action: None,
                        action_input: None,
                        observation: Some(observation),
                    });
                }
                Directive::Action {
                    thought,
                    tool,
                    input,
                } => {
                    self.emit(AgentEvent::Thought {
                        step,
                        text: thought.clone(),
                    });
                    let observation = self.act(step, &tool, &input, trace.plan.as_mut()).await;
                    trace.steps.push(Step {
                        thought,
                        action: Some(tool),
                        action_input: Some(input),
                        observation: Some(observation),
                    });
                }
            }
        }

        Err(AgentError::StepLimitExceeded { steps: step })
    }

    async fn act(&self, step: usize, tool_name: &str, input: &str, plan: Option<&mut Plan>) -> String {
        self.emit(AgentEvent::Action {
            step,
            tool: tool_name.to_string(),
            input: input.to_string(),
        });

        let observation = match self.tools.lookup(tool_name) {
            None => format!(
                "{} is not a valid tool, try one of [{}].",
                tool_name,
                self.tools.names().join(", ")
            ),
            Some(tool) => match tool.invoke(input).await {
                Ok(output) => {
                    if let Some(plan) = plan {
                        if let Some(subgoal) = plan.current() {
                            debug!(subgoal, "sub-goal addressed");
                        }
                        plan.advance();
                    }
                    if output.trim().is_empty() {
                        "(no output)".to_string()
                    } else {
                        output
                    }
                }
                Err(e) => {
                    let failure = AgentError::ToolFailure {
                        tool: tool_name.to_string(),
                        cause: format!("{e:#}"),
                    };
                    warn!(tool = tool_name, "{}", failure);
                    format!("{failure}. Try a different tool or rephrase the input.")
                }
            },
        };

        self.emit(AgentEvent::Observation {
            step,
            text: observation.clone(),
        });
        observation
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        stop: &[&str],
        trace: &mut Trace,
    ) -> Result<String, AgentError> {
        trace.completions += 1;
        self.provider
            .complete(ChatRequest::new(messages).with_stop(stop))
            .await
            .map_err(|e| AgentError::ModelFailure {
                cause: format!("{e:#}"),
            })
    }

    async fn commit(&self, question: &str, steps: &[Step], answer: &str) -> Result<(), AgentError> {
        let mut turns = Vec::with_capacity(steps.len() + 2);
        turns.push(Turn::user(question));
        for step in steps {
            if let Some(action) = &step.action {
                turns.push(Turn::tool(format!(
                    "{}({}) -> {}",
                    action,
                    step.action_input.as_deref().unwrap_or_default(),
                    step.observation.as_deref().unwrap_or_default()
                )));
            }
        }
        turns.push(Turn::agent(answer));

        self.memory
            .append(turns)
            .await
            .map_err(|e| AgentError::Memory(e.to_string()))
    }

    fn check_cancelled(&self) -> Result<(), AgentError> {
        if self.cancel.is_cancelled() {
            Err(AgentError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::BufferMemory;
    use crate::traits::{Role, Tool};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    /// Replies in order, repeating the last reply once the script runs out.
    struct ScriptedProvider {
        replies: Vec<String>,
        calls: AtomicUsize,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: replies.iter().map(|r| r.to_string()).collect(),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: ChatRequest<'_>) -> anyhow::Result<String> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.messages.to_vec());
            let reply = self.replies.get(idx).or(self.replies.last()).cloned();
            Ok(reply.unwrap_or_default())
        }
    }

    struct DownProvider;

    #[async_trait]
    impl Provider for DownProvider {
        fn model(&self) -> &str {
            "down"
        }

        async fn complete(&self, _request: ChatRequest<'_>) -> anyhow::Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    struct CountingTool {
        name: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl CountingTool {
        fn ok(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn broken(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "counts invocations"
        }

        async fn invoke(&self, input: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("service unavailable")
            }
            Ok(format!("echo: {input}"))
        }
    }

    fn agent_config(strategy: &str, max_steps: usize) -> AgentConfig {
        AgentConfig {
            strategy: strategy.to_string(),
            model: "scripted".to_string(),
            enabled_tools: vec!["echo".to_string()],
            max_steps,
            max_parse_retries: 3,
            plan_requires_all_subgoals: true,
        }
    }

    fn executor(
        config: AgentConfig,
        provider: Arc<dyn Provider>,
        tool: Arc<dyn Tool>,
        memory: Arc<dyn MemoryStore>,
    ) -> AgentExecutor {
        AgentExecutor::new(config, provider, ToolSet::new(vec![tool]), memory).unwrap()
    }

    #[tokio::test]
    async fn immediate_final_answer_takes_one_step() {
        let provider = ScriptedProvider::new(&["Thought: easy\nFinal Answer: X"]);
        let tool = CountingTool::ok("echo");
        let memory = Arc::new(BufferMemory::new());
        let agent = executor(
            agent_config("zero-shot-react", 5),
            provider.clone(),
            tool.clone(),
            memory.clone(),
        );

        let outcome = agent.run_with_trace("anything").await;

        assert_eq!(outcome.result.unwrap(), "X");
        assert_eq!(outcome.completions, 1);
        assert_eq!(provider.calls(), 1);
        assert_eq!(tool.calls(), 0);

        let turns = memory.turns().await.unwrap();
        let agent_turns: Vec<_> = turns.iter().filter(|t| t.role == Role::Agent).collect();
        assert_eq!(agent_turns.len(), 1);
        assert_eq!(agent_turns[0].content, "X");
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "anything");
    }

    #[tokio::test]
    async fn step_limit_is_exact() {
        for n in 1..=4 {
            let provider = ScriptedProvider::new(&["Thought: again\nAction: echo\nAction Input: hi"]);
            let tool = CountingTool::ok("echo");
            let memory = Arc::new(BufferMemory::new());
            let agent = executor(
                agent_config("zero-shot-react", n),
                provider.clone(),
                tool.clone(),
                memory.clone(),
            );

            let outcome = agent.run_with_trace("loop forever").await;

            assert_eq!(outcome.result, Err(AgentError::StepLimitExceeded { steps: n }));
            assert_eq!(outcome.steps.len(), n);
            assert_eq!(provider.calls(), n);
            assert_eq!(tool.calls(), n);
            assert!(memory.is_empty().await.unwrap());
        }
    }

    #[tokio::test]
    async fn tool_failure_never_aborts_the_loop() {
        let provider = ScriptedProvider::new(&["Action: echo\nAction Input: hi"]);
        let tool = CountingTool::broken("echo");
        let agent = executor(
            agent_config("zero-shot-react", 3),
            provider,
            tool.clone(),
            Arc::new(BufferMemory::new()),
        );

        let outcome = agent.run_with_trace("try it").await;

        assert_eq!(outcome.result, Err(AgentError::StepLimitExceeded { steps: 3 }));
        assert_eq!(tool.calls(), 3);
        assert_eq!(outcome.steps.len(), 3);
        for step in &outcome.steps {
            let observation = step.observation.as_deref().unwrap();
            assert!(observation.contains("tool 'echo' failed"));
            assert!(observation.contains("service unavailable"));
        }
    }

    #[tokio::test]
    async fn unknown_strategy_makes_no_calls() {
        let provider = ScriptedProvider::new(&["Final Answer: X"]);
        let tool = CountingTool::ok("echo");

        let result = AgentExecutor::new(
            agent_config("does-not-exist", 5),
            provider.clone(),
            ToolSet::new(vec![tool.clone() as Arc<dyn Tool>]),
            Arc::new(BufferMemory::new()),
        );

        assert!(matches!(result, Err(AgentError::UnknownStrategy(ref name)) if name == "does-not-exist"));
        assert_eq!(provider.calls(), 0);
        assert_eq!(tool.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_output_is_corrected_without_spending_steps() {
        let provider = ScriptedProvider::new(&[
            "I think the answer is obvious.",
            "Still just prose.",
            "Final Answer: done",
        ]);
        let agent = executor(
            agent_config("zero-shot-react", 1),
            provider.clone(),
            CountingTool::ok("echo"),
            Arc::new(BufferMemory::new()),
        );

        let outcome = agent.run_with_trace("q").await;

        assert_eq!(outcome.result.unwrap(), "done");
        assert_eq!(provider.calls(), 3);
        assert!(outcome.steps.is_empty());

        let requests = provider.requests.lock().unwrap();
        let last_prompt = &requests[2].last().unwrap().content;
        assert!(last_prompt.contains("Still just prose."));
        assert!(last_prompt.contains("Observation: Invalid Format"));
    }

    #[tokio::test]
    async fn parse_failure_after_retry_budget() {
        let provider = ScriptedProvider::new(&["no directive here"]);
        let mut config = agent_config("zero-shot-react", 5);
        config.max_parse_retries = 2;
        let agent = executor(
            config,
            provider.clone(),
            CountingTool::ok("echo"),
            Arc::new(BufferMemory::new()),
        );

        let result = agent.run("q").await;

        assert!(matches!(result, Err(AgentError::ParseFailure { retries: 2, .. })));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn memory_preserves_submission_order() {
        let provider = ScriptedProvider::new(&["Final Answer: a1", "Final Answer: a2"]);
        let memory = Arc::new(BufferMemory::new());
        let agent = executor(
            agent_config("zero-shot-react", 3),
            provider.clone(),
            CountingTool::ok("echo"),
            memory.clone(),
        );

        assert_eq!(agent.run("q1").await.unwrap(), "a1");
        assert_eq!(agent.run("q2").await.unwrap(), "a2");

        let turns = memory.turns().await.unwrap();
        let log: Vec<_> = turns
            .iter()
            .map(|t| (t.role, t.content.as_str()))
            .collect();
        assert_eq!(
            log,
            [
                (Role::User, "q1"),
                (Role::Agent, "a1"),
                (Role::User, "q2"),
                (Role::Agent, "a2"),
            ]
        );

        let requests = provider.requests.lock().unwrap();
        let second = &requests[1];
        assert!(second.iter().any(|m| m.role == "assistant" && m.content == "a1"));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_observation() {
        let provider = ScriptedProvider::new(&[
            "Action: python_repl\nAction Input: print(1)",
            "Action: echo\nAction Input: hello",
            "Final Answer: ok",
        ]);
        let memory = Arc::new(BufferMemory::new());
        let agent = executor(
            agent_config("zero-shot-react", 5),
            provider,
            CountingTool::ok("echo"),
            memory.clone(),
        );

        let outcome = agent.run_with_trace("q").await;

        assert_eq!(outcome.result.unwrap(), "ok");
        assert_eq!(
            outcome.steps[0].observation.as_deref(),
            Some("python_repl is not a valid tool, try one of [echo].")
        );
        assert_eq!(outcome.steps[1].observation.as_deref(), Some("echo: hello"));

        let roles: Vec<_> = memory.turns().await.unwrap().iter().map(|t| t.role).collect();
        assert_eq!(roles, [Role::User, Role::Tool, Role::Tool, Role::Agent]);
    }

    #[tokio::test]
    async fn model_failure_is_fatal() {
        let memory = Arc::new(BufferMemory::new());
        let agent = executor(
            agent_config("zero-shot-react", 5),
            Arc::new(DownProvider),
            CountingTool::ok("echo"),
            memory.clone(),
        );

        let result = agent.run("q").await;

        assert!(matches!(result, Err(AgentError::ModelFailure { ref cause }) if cause.contains("connection refused")));
        assert!(memory.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn plan_and_solve_requires_outstanding_subgoals() {
        let provider = ScriptedProvider::new(&[
            "Plan:\n1. Search for it\n2. Answer the question\n<END_OF_PLAN>",
            "Final Answer: too early",
            "Action: echo\nAction Input: search",
            "Final Answer: done",
        ]);
        let agent = executor(
            agent_config("plan-and-solve", 5),
            provider.clone(),
            CountingTool::ok("echo"),
            Arc::new(BufferMemory::new()),
        );
        assert_eq!(agent.strategy(), Strategy::PlanAndSolve);

        let outcome = agent.run_with_trace("q").await;

        assert_eq!(outcome.result.unwrap(), "done");
        assert_eq!(outcome.completions, 4);
        assert_eq!(outcome.steps.len(), 2);
        assert!(outcome.steps[0].action.is_none());
        assert!(
            outcome.steps[0]
                .observation
                .as_deref()
                .unwrap()
                .contains("Search for it")
        );
        let plan = outcome.plan.unwrap();
        assert_eq!(plan.subgoals.len(), 2);
        assert_eq!(plan.addressed, 1);

        let requests = provider.requests.lock().unwrap();
        assert!(requests[1][0].content.contains("1. [>] Search for it"));
    }

    #[tokio::test]
    async fn plan_and_solve_can_answer_early_when_not_enforced() {
        let provider = ScriptedProvider::new(&["Plan:\n1. Search\n2. Answer\n", "Final Answer: quick"]);
        let mut config = agent_config("plan-and-solve", 5);
        config.plan_requires_all_subgoals = false;
        let agent = executor(
            config,
            provider.clone(),
            CountingTool::ok("echo"),
            Arc::new(BufferMemory::new()),
        );

        assert_eq!(agent.run("q").await.unwrap(), "quick");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn cancellation_stops_at_step_boundary() {
        let provider = ScriptedProvider::new(&["Final Answer: X"]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let agent = executor(
            agent_config("zero-shot-react", 5),
            provider.clone(),
            CountingTool::ok("echo"),
            Arc::new(BufferMemory::new()),
        )
        .with_cancel(cancel);

        assert_eq!(agent.run("q").await, Err(AgentError::Cancelled));
        assert_eq!(provider.calls(), 0);
    }

    struct CancellingTool(CancelFlag);

    #[async_trait]
    impl Tool for CancellingTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "raises the cancel flag"
        }

        async fn invoke(&self, _input: &str) -> anyhow::Result<String> {
            self.0.cancel();
            Ok("stopping".to_string())
        }
    }

    #[tokio::test]
    async fn cancellation_raised_mid_run_ends_before_next_completion() {
        let provider = ScriptedProvider::new(&[
            "Action: echo\nAction Input: a",
            "Final Answer: should not be reached",
        ]);
        let cancel = CancelFlag::new();
        let memory = Arc::new(BufferMemory::new());
        let agent = executor(
            agent_config("zero-shot-react", 5),
            provider.clone(),
            Arc::new(CancellingTool(cancel.clone())),
            memory.clone(),
        )
        .with_cancel(cancel);

        let outcome = agent.run_with_trace("q").await;

        assert_eq!(outcome.result, Err(AgentError::Cancelled));
        assert_eq!(provider.calls(), 1);
        assert_eq!(outcome.steps.len(), 1);
        assert!(memory.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn empty_reply_is_corrected_like_malformed_output() {
        let provider = ScriptedProvider::new(&["", "Thought: got it\nFinal Answer: fine"]);
        let agent = executor(
            agent_config("zero-shot-react", 1),
            provider.clone(),
            CountingTool::ok("echo"),
            Arc::new(BufferMemory::new()),
        );

        let outcome = agent.run_with_trace("q").await;

        assert_eq!(outcome.result.unwrap(), "fine");
        assert_eq!(provider.calls(), 2);
        let requests = provider.requests.lock().unwrap();
        assert!(requests[1].last().unwrap().content.contains("Observation: Invalid Format"));
    }

    #[tokio::test]
    async fn rejects_empty_question_and_zero_steps() {
        let provider = ScriptedProvider::new(&["Final Answer: X"]);
        let agent = executor(
            agent_config("zero-shot-react", 5),
            provider.clone(),
            CountingTool::ok("echo"),
            Arc::new(BufferMemory::new()),
        );
        assert_eq!(agent.run("   ").await, Err(AgentError::EmptyQuestion));
        assert_eq!(provider.calls(), 0);

        let result = AgentExecutor::new(
            agent_config("zero-shot-react", 0),
            provider,
            ToolSet::default(),
            Arc::new(BufferMemory::new()),
        );
        assert!(matches!(result, Err(AgentError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn emits_progress_events() {
        let provider = ScriptedProvider::new(&[
            "Thought: look\nAction: echo\nAction Input: a",
            "Final Answer: b",
        ]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let agent = executor(
            agent_config("zero-shot-react", 5),
            provider,
            CountingTool::ok("echo"),
            Arc::new(BufferMemory::new()),
        )
        .with_events(tx);

        agent.run("q").await.unwrap();
        drop(agent);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            [
                AgentEvent::Thought { step: 1, text: "look".to_string() },
                AgentEvent::Action { step: 1, tool: "echo".to_string(), input: "a".to_string() },
                AgentEvent::Observation { step: 1, text: "echo: a".to_string() },
                AgentEvent::Thought { step: 2, text: String::new() },
                AgentEvent::Finished { answer: "b".to_string() },
            ]
        );
    }
}
