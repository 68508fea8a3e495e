use crate::config::Config;
use crate::providers::{OllamaProvider, OpenAIProvider};
use crate::traits::Provider;
use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Duration;

/// Builds the backend named by `config.provider`, bound to `model`.
pub fn create_provider(config: &Config, model: &str) -> Result<Arc<dyn Provider>> {
    let provider_name = config.provider.as_deref().unwrap_or("openai");

    match provider_name.to_lowercase().as_str() {
        "ollama" => {
            let mut provider = OllamaProvider::new()
                .with_model(model)
                .with_timeout(Duration::from_secs(config.request_timeout_secs));
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        "openai" => {
            let api_key = resolve_api_key(&config.api_key)?;
            let mut provider = OpenAIProvider::new(api_key)
                .with_model(model)
                .with_timeout(Duration::from_secs(config.request_timeout_secs));
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        _ => Err(anyhow!(
            "Unknown provider: {}. Available: openai, ollama",
            provider_name
        )),
    }
}

fn resolve_api_key(config_key: &str) -> Result<String> {
    if config_key.trim().is_empty() {
        Err(anyhow!(
            "No API key found. Set OPENAI_API_KEY or run 'ferret onboard'."
        ))
    } else {
        Ok(config_key.to_string())
    }
}
