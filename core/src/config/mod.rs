use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FERRET_DIR: &str = ".ferret";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_STRATEGY: &str = "zero-shot-react";

/// Models offered by the chat shell. Any other id is forwarded as-is.
pub const KNOWN_MODELS: &[&str] = &["gpt-3.5-turbo", "gpt-4", "Qwen/Qwen3-8B", "Qwen/Qwen2.5-7B"];

pub const DEFAULT_TOOLS: &[&str] = &["ddg-search", "wikipedia", "arxiv", "openweathermap"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentDefaults {
    pub strategy: String,
    pub tools: Vec<String>,
    pub max_steps: usize,
    pub max_parse_retries: usize,
    pub plan_requires_all_subgoals: bool,
    /// Model backing the tools that consult an LLM themselves
    /// (`llm-math`, `critical_search`). Falls back to the chat model.
    pub tool_model: Option<String>,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_STRATEGY.to_string(),
            tools: DEFAULT_TOOLS.iter().map(|t| t.to_string()).collect(),
            max_steps: 15,
            max_parse_retries: 3,
            plan_requires_all_subgoals: true,
            tool_model: None,
        }
    }
}

/// Per-tool credentials. A missing credential disables its tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Credentials {
    pub owm_api_key: Option<String>,
    pub wolfram_alpha_appid: Option<String>,
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub request_timeout_secs: u64,
    pub agent: AgentDefaults,
    pub credentials: Credentials,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 120,
            agent: AgentDefaults::default(),
            credentials: Credentials::default(),
        }
    }
}

/// A tool that could not be made available, reported instead of failing startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub tool: String,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.tool, self.message)
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let config = if config_exists() {
            load_config()?
        } else {
            Config::default()
        };
        Ok(config.with_env_overrides(|name| std::env::var(name).ok()))
    }

    /// Applies credential and endpoint overrides. `FERRET_`-prefixed names win
    /// over the bare ones, and both win over the config file.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(&format!("FERRET_{name}"))
                .or_else(|| lookup(name))
                .filter(|v| !v.trim().is_empty())
        };

        if let Some(key) = read("OPENAI_API_KEY") {
            self.api_key = key;
        }
        if let Some(url) = read("OPENAI_BASE_URL") {
            self.base_url = Some(url);
        }

        let creds = &mut self.credentials;
        for (name, slot) in [
            ("OWM_API_KEY", &mut creds.owm_api_key),
            ("WOLFRAM_ALPHA_APPID", &mut creds.wolfram_alpha_appid),
            ("GOOGLE_API_KEY", &mut creds.google_api_key),
            ("GOOGLE_CSE_ID", &mut creds.google_cse_id),
        ] {
            if let Some(value) = read(name) {
                *slot = Some(value);
            }
        }

        self
    }

    pub fn tool_model(&self) -> &str {
        self.agent.tool_model.as_deref().unwrap_or(&self.model)
    }
}

pub fn get_ferret_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(FERRET_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_ferret_dir().join("config.toml")
}

pub fn ensure_ferret_dir() -> Result<PathBuf> {
    let ferret_dir = get_ferret_dir();

    if !ferret_dir.exists() {
        std::fs::create_dir_all(&ferret_dir).with_context(|| {
            format!(
                "Failed to create ferret directory at {}",
                ferret_dir.display()
            )
        })?;
    }

    Ok(ferret_dir)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(config_path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "Config file not found. Run 'ferret onboard' to set up your configuration."
            )
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_ferret_dir()?;
    save_config_to(config, &get_config_path())
}

pub fn save_config_to(config: &Config, config_path: &Path) -> Result<()> {
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_shell_defaults() {
        let config = Config::default();
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.agent.strategy, "zero-shot-react");
        assert_eq!(config.agent.max_steps, 15);
        assert_eq!(
            config.agent.tools,
            ["ddg-search", "wikipedia", "arxiv", "openweathermap"]
        );
    }

    #[test]
    fn save_and_load_through_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        config.model = "gpt-4".to_string();
        config.agent.max_steps = 4;
        config.credentials.owm_api_key = Some("owm".to_string());
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.model, "gpt-4");
        assert_eq!(loaded.agent.max_steps, 4);
        assert_eq!(loaded.credentials.owm_api_key.as_deref(), Some("owm"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "model = \"Qwen/Qwen3-8B\"\n[agent]\nmax_steps = 3\n").unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.model, "Qwen/Qwen3-8B");
        assert_eq!(loaded.agent.max_steps, 3);
        assert_eq!(loaded.agent.max_parse_retries, 3);
        assert_eq!(loaded.request_timeout_secs, 120);
    }

    #[test]
    fn missing_file_points_to_onboarding() {
        let tmp = TempDir::new().unwrap();
        let err = load_config_from(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("ferret onboard"));
    }

    #[test]
    fn env_overrides_credentials() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-bare"),
            ("FERRET_OPENAI_API_KEY", "sk-prefixed"),
            ("OPENAI_BASE_URL", "https://api.siliconflow.cn/v1"),
            ("OWM_API_KEY", "owm"),
            ("GOOGLE_API_KEY", ""),
        ]);

        let config = Config::default()
            .with_env_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_key, "sk-prefixed");
        assert_eq!(
            config.base_url.as_deref(),
            Some("https://api.siliconflow.cn/v1")
        );
        assert_eq!(config.credentials.owm_api_key.as_deref(), Some("owm"));
        assert_eq!(config.credentials.google_api_key, None);
    }

    #[test]
    fn tool_model_falls_back_to_chat_model() {
        let mut config = Config::default();
        assert_eq!(config.tool_model(), "gpt-3.5-turbo");
        config.agent.tool_model = Some("gpt-4".to_string());
        assert_eq!(config.tool_model(), "gpt-4");
    }
}
