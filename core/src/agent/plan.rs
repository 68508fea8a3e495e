use serde::{Deserialize, Serialize};

const PLAN_HEADER: &str = "Plan:";
const END_OF_PLAN: &str = "<END_OF_PLAN>";

/// Ordered sub-goals produced by the planning call of plan-and-solve, and
/// how many of them have been addressed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub subgoals: Vec<String>,
    pub addressed: usize,
}

impl Plan {
    /// Reads a numbered (or bulleted) list, ignoring anything before a
    /// `Plan:` header and after `<END_OF_PLAN>`.
    pub fn parse(text: &str) -> Self {
        let body = match text.find(PLAN_HEADER) {
            Some(idx) => &text[idx + PLAN_HEADER.len()..],
            None => text,
        };
        let body = body.split(END_OF_PLAN).next().unwrap_or_default();

        let subgoals = body
            .lines()
            .filter_map(list_item)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            subgoals,
            addressed: 0,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.subgoals.get(self.addressed).map(String::as_str)
    }

    pub fn advance(&mut self) {
        if self.addressed < self.subgoals.len() {
            self.addressed += 1;
        }
    }

    /// Sub-goals that still need work before the final answer. The last
    /// sub-goal is answering the question itself, so it never blocks.
    pub fn outstanding(&self) -> &[String] {
        let answerable_from = self.subgoals.len().saturating_sub(1);
        if self.addressed >= answerable_from {
            &[]
        } else {
            &self.subgoals[self.addressed..answerable_from]
        }
    }

    pub fn is_settled(&self) -> bool {
        self.outstanding().is_empty()
    }
}

fn list_item(line: &str) -> Option<&str> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some(rest.trim());
    }

    let rest = line.strip_prefix("Step ").unwrap_or(line);
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = &rest[digits..];
    let rest = rest
        .strip_prefix('.')
        .or_else(|| rest.strip_prefix(')'))
        .or_else(|| rest.strip_prefix(':'))?;
    Some(rest.trim())
}
