use anyhow::Result;
use console::style;
use ferret_core::config::{self, KNOWN_MODELS};
use ferret_core::{AgentConfig, AgentError, AgentEvent, Role, Session, Strategy, Submission};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use termimad::MadSkin;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const HELP: &str = "\
Commands:
  /strategy [NAME]   show or switch the reasoning strategy
  /model [NAME]      show or switch the chat model
  /tools [a,b,...]   show or set the enabled tools
  /clear             clear the message history
  /history           show the message history
  /help              show this help
Ctrl-C cancels a running question, Ctrl-D exits.";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Strategy(Option<String>),
    Model(Option<String>),
    Tools(Option<Vec<String>>),
    Clear,
    History,
    Help,
    Unknown(String),
}

/// Parses a `/command`. Plain questions return `None`.
fn parse_command(line: &str) -> Option<Command> {
    let rest = line.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };

    let command = match name {
        "strategy" => Command::Strategy(arg.map(str::to_string)),
        "model" => Command::Model(arg.map(str::to_string)),
        "tools" => Command::Tools(arg.map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })),
        "clear" => Command::Clear,
        "history" => Command::History,
        "help" | "?" => Command::Help,
        other => Command::Unknown(other.to_string()),
    };
    Some(command)
}

fn history_path() -> Option<PathBuf> {
    match config::ensure_ferret_dir() {
        Ok(dir) => Some(dir.join("history")),
        Err(e) => {
            debug!("No line history: {:#}", e);
            None
        }
    }
}

pub async fn run_chat(session: &Session, mut agent_config: AgentConfig) -> Result<()> {
    println!("🦡 {}", style("ferret").cyan().bold());
    print_settings(&agent_config);
    for issue in session.registry().issues() {
        println!("  {} {}", style("!").yellow(), style(issue).dim());
    }
    if session.registry().is_empty() {
        println!("  {} no tools are available; answers come from the model alone", style("!").yellow());
    }
    println!("Type a question, /help for commands (Ctrl+D to exit):\n");

    let skin = MadSkin::default();
    let mut editor = DefaultEditor::new()?;
    let history = history_path();
    if let Some(path) = &history {
        let _ = editor.load_history(path);
    }

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                println!("\n👋 Goodbye!");
                break;
            }
            Err(e) => {
                warn!("Input error: {}", e);
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        match parse_command(input) {
            Some(command) => handle_command(session, &mut agent_config, command).await,
            None => {
                match ask(session, input, agent_config.clone()).await {
                    Ok(submission) => {
                        println!();
                        skin.print_text(&submission.answer);
                    }
                    Err(e) => eprintln!("❌ Error: {}", e),
                }
                println!();
            }
        }
    }

    if let Some(path) = &history {
        let _ = editor.save_history(path);
    }
    Ok(())
}

/// One-shot mode for `ferret chat -m`. The error is reported once, by `main`.
pub async fn answer_once(session: &Session, message: &str, agent_config: AgentConfig) -> Result<()> {
    let submission = ask(session, message, agent_config).await?;
    MadSkin::default().print_text(&submission.answer);
    Ok(())
}

/// Submits a question while rendering its trace. Ctrl-C raises the
/// session's cancel flag; the run stops at its next step boundary.
async fn ask(session: &Session, question: &str, agent_config: AgentConfig) -> Result<Submission, AgentError> {
    println!("\n🤔 Processing...\n");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let cancel = session.cancel_flag();
    let run = session.submit_with_events(question, agent_config, Some(tx));
    tokio::pin!(run);

    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    println!("{}", style("Cancelling after the current step...").yellow());
                    cancel.cancel();
                }
            }
        }
    };
    let _ = printer.await;

    if let Ok(submission) = &result {
        for name in &submission.unknown_tools {
            println!("{} unknown tool '{}' was ignored", style("!").yellow(), name);
        }
    }
    result
}

fn print_event(event: &AgentEvent) {
    match event {
        AgentEvent::Planned { subgoals } => {
            println!("{}", style("Plan:").magenta().bold());
            for (i, goal) in subgoals.iter().enumerate() {
                println!("  {}. {}", i + 1, goal);
            }
        }
        AgentEvent::Thought { step, text } => {
            println!("{} {}", style(format!("[{}] Thought:", step)).cyan(), text);
        }
        AgentEvent::Action { tool, input, .. } => {
            println!("    {} {}({})", style("→").green(), style(tool).bold(), input);
        }
        AgentEvent::Observation { text, .. } => {
            let preview = ferret_core::text::truncate_chars(text, 300);
            println!("    {} {}", style("←").dim(), style(preview).dim());
        }
        AgentEvent::Corrective { message } => {
            println!("    {} {}", style("!").yellow(), style(message).yellow());
        }
        AgentEvent::Finished { .. } => {}
    }
}

async fn handle_command(session: &Session, agent_config: &mut AgentConfig, command: Command) {
    match command {
        Command::Strategy(None) => {
            let names: Vec<&str> = Strategy::ALL.iter().map(|s| s.as_str()).collect();
            println!("strategy: {} (available: {})", agent_config.strategy, names.join(", "));
        }
        Command::Strategy(Some(name)) => match name.parse::<Strategy>() {
            Ok(strategy) => {
                agent_config.strategy = strategy.as_str().to_string();
                println!("{} strategy set to {}", style("✓").green(), strategy);
            }
            Err(e) => eprintln!("❌ {}", e),
        },
        Command::Model(None) => {
            println!("model: {} (known: {})", agent_config.model, KNOWN_MODELS.join(", "));
        }
        Command::Model(Some(model)) => {
            if !KNOWN_MODELS.contains(&model.as_str()) {
                println!("{} '{}' is not a known model, forwarding it as-is", style("!").yellow(), model);
            }
            println!("{} model set to {}", style("✓").green(), model);
            agent_config.model = model;
        }
        Command::Tools(None) => {
            println!("enabled: {}", agent_config.enabled_tools.join(", "));
            println!("available: {}", session.registry().names().join(", "));
        }
        Command::Tools(Some(tools)) => {
            let selection = session.registry().select(&tools);
            for name in &selection.unknown {
                println!("{} '{}' is not available", style("!").yellow(), name);
            }
            agent_config.enabled_tools = tools;
            println!("{} tools set to {}", style("✓").green(), agent_config.enabled_tools.join(", "));
        }
        Command::Clear => match session.clear_history().await {
            Ok(()) => println!("{} history cleared", style("✓").green()),
            Err(e) => eprintln!("❌ Error: {}", e),
        },
        Command::History => match session.history().await {
            Ok(turns) if turns.is_empty() => println!("(no messages yet)"),
            Ok(turns) => {
                for turn in turns {
                    let who = match turn.role {
                        Role::User => style("user").cyan(),
                        Role::Agent => style("agent").green(),
                        Role::Tool => style("tool").dim(),
                    };
                    println!(
                        "{} {}: {}",
                        style(turn.timestamp.format("%H:%M:%S")).dim(),
                        who,
                        turn.content
                    );
                }
            }
            Err(e) => eprintln!("❌ Error: {}", e),
        },
        Command::Help => println!("{}", HELP),
        Command::Unknown(name) => println!("Unknown command '/{}'. Try /help.", name),
    }
}

fn print_settings(agent_config: &AgentConfig) {
    println!(
        "  {} {}  {} {}",
        style("strategy").dim(),
        agent_config.strategy,
        style("model").dim(),
        agent_config.model
    );
    println!("  {} {}", style("tools").dim(), agent_config.enabled_tools.join(", "));
}
