use crate::traits::{ChatMessage, ChatRequest, Provider, Tool};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const TRANSLATE_PROMPT: &str = "Translate a math problem into a single expression that can be \
evaluated by a simple calculator. The calculator understands numbers, + - * / % ^, parentheses, \
the functions sqrt sin cos tan ln log exp abs floor ceil and the constants pi and e.

Reply using exactly this format:

Question: ${Question with math problem.}
```text
${single line mathematical expression that solves the problem}
```

If the problem needs no calculation, reply with \"Answer: \" followed by the answer.";

/// Calculator that evaluates arithmetic directly and asks a model to turn
/// word problems into an expression first.
pub struct CalculatorTool {
    provider: Option<Arc<dyn Provider>>,
}

impl CalculatorTool {
    pub fn new(provider: Option<Arc<dyn Provider>>) -> Self {
        Self { provider }
    }

    async fn translate(&self, question: &str) -> Result<String> {
        let Some(provider) = &self.provider else {
            bail!("'{}' is not an expression and no model is configured to translate it", question);
        };

        let messages = [
            ChatMessage::system(TRANSLATE_PROMPT),
            ChatMessage::user(format!("Question: {}", question)),
        ];
        let reply = provider
            .complete(ChatRequest::new(&messages).with_stop(&["```output"]))
            .await
            .context("Calculator model request failed")?;
        debug!(reply = %reply, "calculator translation");

        match extract_reply(&reply) {
            Some(Reply::Expression(expr)) => {
                let value = evaluate(&expr)
                    .with_context(|| format!("Could not evaluate '{}'", expr))?;
                Ok(format!("Answer: {}", format_number(value)))
            }
            Some(Reply::Answer(answer)) => Ok(format!("Answer: {}", answer)),
            None => bail!("Unknown format from calculator model: {}", reply.trim()),
        }
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "llm-math"
    }

    fn description(&self) -> &str {
        "Useful for when you need to answer questions about math. \
         Input should be a math expression or a math word problem."
    }

    async fn invoke(&self, input: &str) -> Result<String> {
        let input = input.trim();
        if input.is_empty() {
            bail!("An expression is required");
        }

        match evaluate(input) {
            Ok(value) => Ok(format!("Answer: {}", format_number(value))),
            Err(_) => self.translate(input).await,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Reply {
    Expression(String),
    Answer(String),
}

fn extract_reply(reply: &str) -> Option<Reply> {
    if let Some(start) = reply.find("```text") {
        let rest = &reply[start + "```text".len()..];
        let end = rest.find("```").unwrap_or(rest.len());
        let expr = rest[..end].trim();
        if !expr.is_empty() {
            return Some(Reply::Expression(expr.to_string()));
        }
    }

    reply
        .find("Answer:")
        .map(|idx| reply[idx + "Answer:".len()..].trim())
        .filter(|answer| !answer.is_empty())
        .map(|answer| Reply::Answer(answer.to_string()))
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || chars[i] == '.'
                        || (chars[i] == ',' && is_digit_group(&chars, i)))
                {
                    i += 1;
                }
                // Scientific notation such as 1.5e3.
                if i + 1 < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if chars[j] == '+' || chars[j] == '-' {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().filter(|c| **c != ',').collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| anyhow::anyhow!("Invalid number '{}'", text))?;
                tokens.push(Token::Number(value));
            }
            'a'..='z' | 'A'..='Z' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect::<String>().to_lowercase()));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                // `**` is accepted as exponentiation.
                if c == '*' && chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Op('^'));
                    i += 2;
                } else {
                    tokens.push(Token::Op(c));
                    i += 1;
                }
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => bail!("Unexpected character '{}'", other),
        }
    }

    Ok(tokens)
}

/// A comma between digits followed by exactly three digits is a thousands separator.
fn is_digit_group(chars: &[char], i: usize) -> bool {
    i > 0
        && chars[i - 1].is_ascii_digit()
        && chars.len() >= i + 4
        && chars[i + 1..i + 4].iter().all(|c| c.is_ascii_digit())
        && chars.get(i + 4).is_none_or(|c| !c.is_ascii_digit())
}

const MAX_NESTING: usize = 128;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn nested(&mut self, rule: fn(&mut Self) -> Result<f64>) -> Result<f64> {
        if self.depth >= MAX_NESTING {
            bail!("Expression is nested too deeply");
        }
        self.depth += 1;
        let value = rule(self);
        self.depth -= 1;
        value
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                '/' => {
                    if rhs == 0.0 {
                        bail!("Division by zero");
                    }
                    value / rhs
                }
                _ => {
                    if rhs == 0.0 {
                        bail!("Division by zero");
                    }
                    value % rhs
                }
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.nested(Self::unary)?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.power(),
        }
    }

    // Right-associative, binds tighter than unary minus on its left.
    fn power(&mut self) -> Result<f64> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.nested(Self::unary)?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.nested(Self::expr)?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => bail!("Missing closing parenthesis"),
                }
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "pi" => Ok(std::f64::consts::PI),
                "e" => Ok(std::f64::consts::E),
                _ => {
                    let arg = match self.peek() {
                        Some(Token::LParen) => self.nested(Self::primary)?,
                        _ => bail!("Unknown identifier '{}'", name),
                    };
                    apply(&name, arg)
                }
            },
            Some(token) => bail!("Unexpected token {:?}", token),
            None => bail!("Unexpected end of expression"),
        }
    }
}

fn apply(function: &str, arg: f64) -> Result<f64> {
    let value = match function {
        "sqrt" => {
            if arg < 0.0 {
                bail!("Square root of a negative number");
            }
            arg.sqrt()
        }
        "sin" => arg.sin(),
        "cos" => arg.cos(),
        "tan" => arg.tan(),
        "ln" => arg.ln(),
        "log" => arg.log10(),
        "exp" => arg.exp(),
        "abs" => arg.abs(),
        "floor" => arg.floor(),
        "ceil" => arg.ceil(),
        other => bail!("Unknown function '{}'", other),
    };
    Ok(value)
}

/// Evaluates an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        bail!("Empty expression");
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        bail!("Unexpected trailing input");
    }
    if !value.is_finite() {
        bail!("Result is not a finite number");
    }
    Ok(value)
}
