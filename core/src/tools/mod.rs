use crate::agent::ToolRegistry;
use crate::config::Config;
use crate::traits::{Provider, Tool};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod arxiv;
pub mod calculator;
pub mod duckduckgo;
pub mod google;
pub mod self_ask;
pub mod weather;
pub mod wikipedia;
pub mod wolfram;

pub use arxiv::ArxivTool;
pub use calculator::{CalculatorTool, evaluate};
pub use duckduckgo::DuckDuckGoSearchTool;
pub use google::GoogleSearchTool;
pub use self_ask::{CriticalSearchTool, UnavailableSearch};
pub use weather::OpenWeatherMapTool;
pub use wikipedia::WikipediaTool;
pub use wolfram::WolframAlphaTool;

const USER_AGENT: &str = concat!("ferret/", env!("CARGO_PKG_VERSION"));
const TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Every tool name the catalog knows, in display order.
pub const CATALOG: &[&str] = &[
    "ddg-search",
    "wikipedia",
    "arxiv",
    "openweathermap",
    "wolfram-alpha",
    "google-search",
    "llm-math",
    "critical_search",
];

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(TOOL_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Builds the registry once at startup. Tools whose credentials are missing
/// are left out and reported as config issues.
///
/// `tool_model` backs the tools that consult a model themselves. Without it
/// `llm-math` only evaluates plain expressions and `critical_search` is
/// unavailable.
pub fn load_tools(config: &Config, tool_model: Option<Arc<dyn Provider>>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let creds = &config.credentials;

    add(&mut registry, Arc::new(DuckDuckGoSearchTool::new()));
    add(&mut registry, Arc::new(WikipediaTool::new()));
    add(&mut registry, Arc::new(ArxivTool::new()));

    match &creds.owm_api_key {
        Some(key) => add(&mut registry, Arc::new(OpenWeatherMapTool::new(key))),
        None => registry.report_issue("openweathermap", "OWM_API_KEY is not set"),
    }

    match &creds.wolfram_alpha_appid {
        Some(app_id) => add(&mut registry, Arc::new(WolframAlphaTool::new(app_id))),
        None => registry.report_issue("wolfram-alpha", "WOLFRAM_ALPHA_APPID is not set"),
    }

    match (&creds.google_api_key, &creds.google_cse_id) {
        (Some(key), Some(cse)) => add(&mut registry, Arc::new(GoogleSearchTool::new(key, cse))),
        _ => registry.report_issue(
            "google-search",
            "GOOGLE_API_KEY and GOOGLE_CSE_ID must both be set",
        ),
    }

    add(&mut registry, Arc::new(CalculatorTool::new(tool_model.clone())));

    match tool_model {
        Some(provider) => {
            let search = search_tool(&registry);
            add(&mut registry, Arc::new(CriticalSearchTool::new(provider, search)));
        }
        None => registry.report_issue("critical_search", "no model is configured for tools"),
    }

    info!(
        count = registry.len(),
        tools = ?registry.names(),
        issues = registry.issues().len(),
        "tool registry ready"
    );
    registry
}

/// Search backing `critical_search`: DuckDuckGo, then Google, then a stub.
fn search_tool(registry: &ToolRegistry) -> Arc<dyn Tool> {
    registry
        .get("ddg-search")
        .or_else(|| registry.get("google-search"))
        .unwrap_or_else(|| Arc::new(UnavailableSearch))
}

/// Builds a fresh instance of a tool that consults `provider` itself.
/// Returns `None` for tools that do not use a model.
pub fn model_backed_tool(
    name: &str,
    provider: Arc<dyn Provider>,
    registry: &ToolRegistry,
) -> Option<Arc<dyn Tool>> {
    match name {
        "llm-math" => Some(Arc::new(CalculatorTool::new(Some(provider)))),
        "critical_search" => Some(Arc::new(CriticalSearchTool::new(
            provider,
            search_tool(registry),
        ))),
        _ => None,
    }
}

fn add(registry: &mut ToolRegistry, tool: Arc<dyn Tool>) {
    if let Err(e) = registry.register(tool) {
        warn!("Skipping tool: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::traits::ChatRequest;
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl Provider for Silent {
        fn model(&self) -> &str {
            "silent"
        }

        async fn complete(&self, _request: ChatRequest<'_>) -> anyhow::Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn missing_credentials_become_issues() {
        let registry = load_tools(&Config::default(), None);

        assert_eq!(registry.names(), ["ddg-search", "wikipedia", "arxiv", "llm-math"]);
        let flagged: Vec<&str> = registry.issues().iter().map(|i| i.tool.as_str()).collect();
        assert_eq!(
            flagged,
            ["openweathermap", "wolfram-alpha", "google-search", "critical_search"]
        );
    }

    #[test]
    fn credentials_enable_the_full_catalog() {
        let config = Config {
            credentials: Credentials {
                owm_api_key: Some("owm".into()),
                wolfram_alpha_appid: Some("wa".into()),
                google_api_key: Some("gk".into()),
                google_cse_id: Some("cse".into()),
            },
            ..Config::default()
        };

        let registry = load_tools(&config, Some(Arc::new(Silent)));

        assert!(registry.issues().is_empty());
        assert_eq!(registry.names(), CATALOG);
    }

    #[test]
    fn model_backed_tools_are_rebuilt_for_a_provider() {
        let registry = load_tools(&Config::default(), None);
        let provider: Arc<dyn Provider> = Arc::new(Silent);

        let math = model_backed_tool("llm-math", provider.clone(), &registry).unwrap();
        let search = model_backed_tool("critical_search", provider.clone(), &registry).unwrap();

        assert_eq!(math.name(), "llm-math");
        assert_eq!(search.name(), "critical_search");
        assert!(model_backed_tool("wikipedia", provider, &registry).is_none());
    }

    #[test]
    fn google_needs_both_credentials() {
        let config = Config {
            credentials: Credentials {
                google_api_key: Some("gk".into()),
                ..Credentials::default()
            },
            ..Config::default()
        };

        let registry = load_tools(&config, None);
        assert!(registry.get("google-search").is_none());
    }
}
