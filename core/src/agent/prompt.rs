use crate::agent::plan::Plan;
use crate::agent::trace::Step;
use crate::text::truncate_chars;
use crate::traits::{ChatMessage, Role, ToolSpec, Turn};
use std::fmt::Write;

const OBSERVATION_MAX_CHARS: usize = 4_000;

/// A model reply that could not be parsed, kept so the next prompt can show
/// it together with the corrective observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub output: String,
    pub message: String,
}

/// Everything a prompt may draw from at one point of a query.
#[derive(Debug, Clone, Copy)]
pub struct PromptState<'a> {
    pub question: &'a str,
    pub tools: &'a [ToolSpec],
    pub history: &'a [Turn],
    pub scratch: &'a [Step],
    pub plan: Option<&'a Plan>,
    pub corrections: &'a [Correction],
}

impl<'a> PromptState<'a> {
    pub fn new(
        question: &'a str,
        tools: &'a [ToolSpec],
        history: &'a [Turn],
        scratch: &'a [Step],
    ) -> Self {
        Self {
            question,
            tools,
            history,
            scratch,
            plan: None,
            corrections: &[],
        }
    }

    pub fn with_plan(mut self, plan: Option<&'a Plan>) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_corrections(mut self, corrections: &'a [Correction]) -> Self {
        self.corrections = corrections;
        self
    }
}

/// Strategy-specific prompt construction and final-answer trigger.
pub trait PromptBuilder: Send + Sync {
    /// Messages for the extra planning call, if the strategy plans up front.
    fn planning_messages(&self, state: &PromptState<'_>) -> Option<Vec<ChatMessage>>;

    fn step_messages(&self, state: &PromptState<'_>) -> Vec<ChatMessage>;

    fn accepts_final_answer(&self, plan: Option<&Plan>, require_all_subgoals: bool) -> bool;
}

pub struct ReactPrompt;

impl PromptBuilder for ReactPrompt {
    fn planning_messages(&self, _state: &PromptState<'_>) -> Option<Vec<ChatMessage>> {
        None
    }

    fn step_messages(&self, state: &PromptState<'_>) -> Vec<ChatMessage> {
        assemble(react_instructions(state.tools), state)
    }

    fn accepts_final_answer(&self, _plan: Option<&Plan>, _require_all_subgoals: bool) -> bool {
        true
    }
}

pub struct PlanAndSolvePrompt;

impl PromptBuilder for PlanAndSolvePrompt {
    fn planning_messages(&self, state: &PromptState<'_>) -> Option<Vec<ChatMessage>> {
        let mut system = String::from(
            "Let's first understand the problem and devise a plan to solve it. \
             Output the plan starting with the header 'Plan:' followed by a numbered list of steps. \
             Use the minimum number of steps needed to answer the question accurately. \
             If the task is a question, the final step should almost always be \
             'Given the above steps taken, respond to the user's original question'. \
             At the end of the plan, write '<END_OF_PLAN>'.\n\n",
        );
        system.push_str("Tools available to carry out the plan:\n");
        system.push_str(&tool_section(state.tools));

        let mut messages = vec![ChatMessage::system(system)];
        messages.extend(history_messages(state.history));
        messages.push(ChatMessage::user(state.question));
        Some(messages)
    }

    fn step_messages(&self, state: &PromptState<'_>) -> Vec<ChatMessage> {
        let mut system = react_instructions(state.tools);
        if let Some(plan) = state.plan.filter(|p| !p.subgoals.is_empty()) {
            system.push_str("\n\n## Plan\n\n");
            system.push_str(&plan_section(plan));
            system.push_str(
                "\nWork through the plan in order; [>] marks the current step. \
                 Each successful Action completes the current step. \
                 Reply with 'Final Answer:' once only the last step remains.",
            );
        }
        assemble(system, state)
    }

    fn accepts_final_answer(&self, plan: Option<&Plan>, require_all_subgoals: bool) -> bool {
        !require_all_subgoals || plan.is_none_or(Plan::is_settled)
    }
}

fn react_instructions(tools: &[ToolSpec]) -> String {
    let mut instructions = String::new();

    if tools.is_empty() {
        instructions.push_str(
            "Answer the following questions as best you can. No tools are available, \
             so answer from your own knowledge.\n\n",
        );
    } else {
        instructions.push_str(
            "Answer the following questions as best you can. You have access to the following tools:\n\n",
        );
        instructions.push_str(&tool_section(tools));
        instructions.push('\n');
    }

    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    instructions.push_str("Use the following format:\n\n");
    instructions.push_str("Question: the input question you must answer\n");
    instructions.push_str("Thought: reason about what to do next\n");
    let _ = writeln!(
        instructions,
        "Action: the tool to use, exactly one of [{}]",
        names.join(", ")
    );
    instructions.push_str("Action Input: the input to pass to the tool\n");
    instructions.push_str("Observation: the result of the tool\n");
    instructions.push_str("... (Thought/Action/Action Input/Observation can repeat)\n");
    instructions.push_str("Thought: I now know the final answer\n");
    instructions.push_str("Final Answer: the final answer to the original input question\n\n");
    instructions.push_str(
        "Write exactly one Action per reply and stop after 'Action Input:'; \
         the Observation will be provided to you.",
    );

    instructions
}

fn tool_section(tools: &[ToolSpec]) -> String {
    let mut section = String::new();
    for tool in tools {
        let _ = writeln!(section, "{}: {}", tool.name, tool.description);
    }
    section
}

fn plan_section(plan: &Plan) -> String {
    let mut section = String::new();
    for (idx, subgoal) in plan.subgoals.iter().enumerate() {
        let marker = if idx < plan.addressed {
            "[x]"
        } else if idx == plan.addressed {
            "[>]"
        } else {
            "[ ]"
        };
        let _ = writeln!(section, "{}. {} {}", idx + 1, marker, subgoal);
    }
    section
}

fn history_messages(history: &[Turn]) -> impl Iterator<Item = ChatMessage> + '_ {
    history.iter().filter_map(|turn| match turn.role {
        Role::User => Some(ChatMessage::user(turn.content.clone())),
        Role::Agent => Some(ChatMessage::assistant(turn.content.clone())),
        Role::Tool => None,
    })
}

fn scratchpad(state: &PromptState<'_>) -> String {
    let mut pad = String::new();

    for step in state.scratch {
        let _ = writeln!(pad, "Thought: {}", step.thought);
        if let Some(action) = &step.action {
            let _ = writeln!(pad, "Action: {}", action);
            let _ = writeln!(
                pad,
                "Action Input: {}",
                step.action_input.as_deref().unwrap_or_default()
            );
        }
        if let Some(observation) = &step.observation {
            let _ = writeln!(
                pad,
                "Observation: {}",
                truncate_chars(observation, OBSERVATION_MAX_CHARS)
            );
        }
    }

    for correction in state.corrections {
        let _ = writeln!(pad, "{}", correction.output.trim());
        let _ = writeln!(pad, "Observation: {}", correction.message);
    }

    pad.push_str("Thought:");
    pad
}

fn assemble(system: String, state: &PromptState<'_>) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(system)];
    messages.extend(history_messages(state.history));
    messages.push(ChatMessage::user(format!(
        "Question: {}\n{}",
        state.question,
        scratchpad(state)
    )));
    messages
}
