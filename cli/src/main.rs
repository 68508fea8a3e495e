use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use ferret_core::{AgentConfig, Config, Session, config, memory, providers, tools};
use std::sync::Arc;
use tracing::warn;

mod onboard;
mod shell;
mod telemetry;

#[derive(Parser)]
#[command(name = "ferret")]
#[command(about = "ferret - a tool-using research assistant in your terminal", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the model backend, strategy and tool credentials
    Onboard,
    /// Chat with the agent, or answer a single message with -m
    Chat {
        #[arg(short, long)]
        message: Option<String>,
        /// zero-shot-react or plan-and-solve
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Comma-separated tool names
        #[arg(long, value_delimiter = ',')]
        tools: Option<Vec<String>>,
        #[arg(long)]
        max_steps: Option<usize>,
    },
    /// List the tool catalog and which tools are available
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_logging(cli.verbose);

    let command = cli.command.unwrap_or_else(|| {
        if !config::config_exists() {
            Commands::Onboard
        } else {
            Commands::Chat {
                message: None,
                strategy: None,
                model: None,
                tools: None,
                max_steps: None,
            }
        }
    });

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                anyhow::anyhow!("Onboarding failed: {}", e)
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Tools => {
            let config = Config::load_or_init()?;
            let registry = tools::load_tools(&config, tool_model(&config));
            print_catalog(&config, &registry);
        }
        Commands::Chat {
            message,
            strategy,
            model,
            tools: enabled,
            max_steps,
        } => {
            let config = Arc::new(Config::load_or_init()?);

            let mut agent_config = AgentConfig::from_config(&config);
            if let Some(strategy) = strategy {
                agent_config.strategy = strategy;
            }
            if let Some(model) = model {
                agent_config.model = model;
            }
            if let Some(enabled) = enabled {
                agent_config.enabled_tools = enabled;
            }
            if let Some(max_steps) = max_steps {
                agent_config.max_steps = max_steps;
            }

            let registry = Arc::new(tools::load_tools(&config, tool_model(&config)));
            let session = Session::new(config.clone(), registry, memory::create_memory());

            match message {
                Some(msg) => shell::answer_once(&session, &msg, agent_config).await?,
                None => shell::run_chat(&session, agent_config).await?,
            }
        }
    }

    Ok(())
}

/// Backend for `llm-math` and `critical_search`. Tools stay usable without it.
fn tool_model(config: &Config) -> Option<Arc<dyn ferret_core::Provider>> {
    match providers::create_provider(config, config.tool_model()) {
        Ok(provider) => Some(provider),
        Err(e) => {
            warn!("No model for tools: {:#}", e);
            None
        }
    }
}

fn print_catalog(config: &Config, registry: &ferret_core::ToolRegistry) {
    println!("{}", style("Tools").white().bold());
    println!();

    for name in tools::CATALOG {
        let enabled = config.agent.tools.iter().any(|t| t.as_str() == *name);
        let marker = if enabled { "*" } else { " " };
        match registry.get(name) {
            Some(tool) => println!(
                "  {} {} {}",
                style(marker).green(),
                style(name).cyan().bold(),
                style(tool.description()).dim()
            ),
            None => {
                let reason = registry
                    .issues()
                    .iter()
                    .find(|issue| issue.tool == *name)
                    .map(|issue| issue.message.as_str())
                    .unwrap_or("unavailable");
                println!(
                    "  {} {} {}",
                    style(marker).yellow(),
                    style(name).dim(),
                    style(format!("({})", reason)).yellow()
                );
            }
        }
    }

    println!();
    println!("  {} enabled by default (change with `ferret onboard` or --tools)", style("*").green());
}
