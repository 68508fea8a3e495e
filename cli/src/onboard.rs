use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, MultiSelect, Password, Select};
use ferret_core::config::{Config, Credentials, DEFAULT_TOOLS, KNOWN_MODELS};
use ferret_core::{Strategy, tools};

const BANNER: &str = r"
    -------------------------------------

     ___  ___  ___  ___  ___  _____
    | __|| __|| _ \| _ \| __||_   _|
    | _| | _| |   /|   /| _|   | |
    |_|  |___||_|_\|_|_\|___|  |_|

    -------------------------------------
";

const PROVIDERS: &[&str] = &["openai", "ollama"];
const TOTAL_STEPS: usize = 5;

fn print_step(step: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, TOTAL_STEPS, title))
            .cyan()
            .bold()
    );
    println!();
}

fn setup_provider() -> Result<(String, String, Option<String>)> {
    let selection = Select::new()
        .with_prompt("Select your model backend")
        .items(PROVIDERS)
        .default(0)
        .interact()
        .context("Failed to select provider")?;
    let provider = PROVIDERS[selection].to_string();

    if provider == "ollama" {
        let base_url: String = Input::new()
            .with_prompt("Ollama URL")
            .default("http://localhost:11434".to_string())
            .interact_text()
            .context("Failed to read Ollama URL")?;
        return Ok((provider, String::new(), Some(base_url)));
    }

    let api_key: String = Password::new()
        .with_prompt("Enter your OpenAI-compatible API key")
        .interact()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        return Err(anyhow::anyhow!("API key cannot be empty"));
    }

    let base_url: String = Input::new()
        .with_prompt("API base URL (empty for api.openai.com)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read base URL")?;
    let base_url = Some(base_url.trim().to_string()).filter(|u| !u.is_empty());

    Ok((provider, api_key.trim().to_string(), base_url))
}

fn setup_model() -> Result<String> {
    let mut items: Vec<&str> = KNOWN_MODELS.to_vec();
    items.push("other...");

    let selection = Select::new()
        .with_prompt("Select your model")
        .items(&items)
        .default(0)
        .interact()
        .context("Failed to select model")?;

    if selection < KNOWN_MODELS.len() {
        return Ok(KNOWN_MODELS[selection].to_string());
    }

    let model: String = Input::new()
        .with_prompt("Model id")
        .interact_text()
        .context("Failed to read model id")?;
    Ok(model.trim().to_string())
}

fn setup_strategy() -> Result<String> {
    let names: Vec<&str> = Strategy::ALL.iter().map(|s| s.as_str()).collect();
    let selection = Select::new()
        .with_prompt("Select the reasoning strategy")
        .items(&names)
        .default(names.iter().position(|n| *n == "zero-shot-react").unwrap_or(0))
        .interact()
        .context("Failed to select strategy")?;
    Ok(names[selection].to_string())
}

fn setup_tools() -> Result<Vec<String>> {
    let defaults: Vec<bool> = tools::CATALOG
        .iter()
        .map(|name| DEFAULT_TOOLS.contains(name))
        .collect();

    let chosen = MultiSelect::new()
        .with_prompt("Enable tools (space to toggle)")
        .items(tools::CATALOG)
        .defaults(&defaults)
        .interact()
        .context("Failed to select tools")?;

    Ok(chosen
        .into_iter()
        .map(|i| tools::CATALOG[i].to_string())
        .collect())
}

fn ask_secret(prompt: &str) -> Result<Option<String>> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .with_context(|| format!("Failed to read {}", prompt))?;
    Ok(Some(value.trim().to_string()).filter(|v| !v.is_empty()))
}

fn setup_credentials(enabled: &[String]) -> Result<Credentials> {
    let wants = |tool: &str| enabled.iter().any(|t| t == tool);
    let mut credentials = Credentials::default();

    if wants("openweathermap") {
        credentials.owm_api_key = ask_secret("OpenWeatherMap API key (OWM_API_KEY)")?;
    }
    if wants("wolfram-alpha") {
        credentials.wolfram_alpha_appid = ask_secret("Wolfram Alpha app id (WOLFRAM_ALPHA_APPID)")?;
    }
    if wants("google-search") {
        credentials.google_api_key = ask_secret("Google API key (GOOGLE_API_KEY)")?;
        credentials.google_cse_id = ask_secret("Google search engine id (GOOGLE_CSE_ID)")?;
    }

    Ok(credentials)
}

pub fn run_onboard() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());

    println!("  {}", style("Welcome to ferret!").white().bold());
    println!(
        "  {}",
        style("This wizard connects a model and picks the tools your agent may use.").dim()
    );
    println!();

    if ferret_core::config::config_exists() {
        let overwrite = Confirm::new()
            .with_prompt("A configuration already exists. Overwrite it?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !overwrite {
            anyhow::bail!("kept the existing configuration");
        }
    }

    print_step(1, "Model Backend");
    let (provider, api_key, base_url) = setup_provider()?;

    print_step(2, "Model Selection");
    let model = setup_model()?;

    print_step(3, "Reasoning Strategy");
    let strategy = setup_strategy()?;

    print_step(4, "Tools");
    let enabled = setup_tools()?;

    print_step(5, "Tool Credentials");
    let credentials = setup_credentials(&enabled)?;
    println!(
        "  {}",
        style("Credentials can also come from environment variables at runtime.").dim()
    );

    let mut config = Config {
        provider: Some(provider),
        api_key,
        base_url,
        model,
        credentials,
        ..Default::default()
    };
    config.agent.strategy = strategy;
    config.agent.tools = enabled;

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(ferret_core::config::get_config_path().display()).cyan()
    );
    println!();
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("ferret chat").cyan().bold()
    );
    println!();

    Ok(config)
}
