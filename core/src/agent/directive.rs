//! Parsing of model output into the next move of the query loop.
//!
//! The primary format is the ReAct text protocol:
//!
//! ```text
//! Thought: I should look this up
//! Action: wikipedia
//! Action Input: Alan Turing
//! ```
//!
//! or `Final Answer: ...`. Models that prefer structured calls may instead
//! emit `<tool_call>{"name": "...", "arguments": {"input": "..."}}</tool_call>`.

const FINAL_ANSWER: &str = "Final Answer:";
const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";
const THOUGHT: &str = "Thought:";
const OBSERVATION: &str = "Observation:";

const TOOL_CALL_OPEN_TAG: &str = "<tool_call>";
const TOOL_CALL_CLOSE_TAG: &str = "</tool_call>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    FinalAnswer { thought: String, answer: String },
    Action { thought: String, tool: String, input: String },
}

/// Why an output could not be read. The message is shown to the model as
/// a corrective observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedOutput {
    pub message: String,
}

impl MalformedOutput {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for MalformedOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid Format: {}", self.message)
    }
}

pub fn parse_directive(output: &str) -> Result<Directive, MalformedOutput> {
    if let Some(directive) = parse_tool_call_tag(output) {
        return Ok(directive);
    }

    let final_idx = output.find(FINAL_ANSWER);
    let action_idx = output.find(ACTION);
    // Only a complete `Action:` ... `Action Input:` pair counts as a tool call.
    let call_idx = action_idx.filter(|&idx| output[idx + ACTION.len()..].contains(ACTION_INPUT));

    match (call_idx, final_idx) {
        (Some(call), Some(answer)) if call < answer => Err(MalformedOutput::new(
            "Output contains both a final answer and an action. Give exactly one of them.",
        )),
        (Some(idx), None) => parse_action(output, idx),
        (_, Some(idx)) => {
            let answer = output[idx + FINAL_ANSWER.len()..].trim();
            if answer.is_empty() {
                return Err(MalformedOutput::new("'Final Answer:' must be followed by the answer."));
            }
            Ok(Directive::FinalAnswer {
                thought: extract_thought(&output[..idx]),
                answer: answer.to_string(),
            })
        }
        (None, None) if action_idx.is_some() => Err(MalformedOutput::new(
            "Missing 'Action Input:' after 'Action:'.",
        )),
        (None, None) if output.contains(ACTION_INPUT) => Err(MalformedOutput::new(
            "Missing 'Action:' before 'Action Input:'.",
        )),
        (None, None) => Err(MalformedOutput::new(
            "Missing 'Action:' after 'Thought:'. Either call a tool with 'Action:' and \
             'Action Input:' or reply with 'Final Answer:'.",
        )),
    }
}

fn parse_action(output: &str, action_idx: usize) -> Result<Directive, MalformedOutput> {
    let after_action = &output[action_idx + ACTION.len()..];
    let input_idx = after_action
        .find(ACTION_INPUT)
        .ok_or_else(|| MalformedOutput::new("Missing 'Action Input:' after 'Action:'."))?;

    let tool = after_action[..input_idx].trim();
    if tool.is_empty() {
        return Err(MalformedOutput::new("'Action:' must name one of the available tools."));
    }

    let mut input = &after_action[input_idx + ACTION_INPUT.len()..];
    if let Some(observation_idx) = input.find(OBSERVATION) {
        input = &input[..observation_idx];
    }

    Ok(Directive::Action {
        thought: extract_thought(&output[..action_idx]),
        tool: tool.trim_matches('`').to_string(),
        input: strip_quotes(input.trim()).to_string(),
    })
}

fn extract_thought(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix(THOUGHT).unwrap_or(text).trim().to_string()
}

fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    text
}

fn parse_tool_call_tag(output: &str) -> Option<Directive> {
    let start = output.find(TOOL_CALL_OPEN_TAG)?;
    let after_open = &output[start + TOOL_CALL_OPEN_TAG.len()..];
    let close_idx = after_open.find(TOOL_CALL_CLOSE_TAG)?;
    let inner = &after_open[..close_idx];

    let value = extract_json_values(inner).into_iter().next()?;
    let tool = value.get("name")?.as_str()?.to_string();
    let input = match value.get("arguments") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Object(map)) => match map.get("input") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => map
                .values()
                .next()
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        },
        Some(other) => other.to_string(),
        None => String::new(),
    };

    Some(Directive::Action {
        thought: extract_thought(&output[..start]),
        tool,
        input,
    })
}

fn extract_json_values(text: &str) -> Vec<serde_json::Value> {
    let mut values = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string && depth > 0 => {
                depth -= 1;
                if depth == 0
                    && let Some(s) = start.take()
                    && let Ok(value) = serde_json::from_str(&text[s..=i])
                {
                    values.push(value);
                }
            }
            _ => {}
        }
    }

    values
}
