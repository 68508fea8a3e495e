use crate::tools::http_client;
use crate::traits::Tool;
use anyhow::Context;
use async_trait::async_trait;

/// Wolfram|Alpha short answers: one plain-text line per query.
pub struct WolframAlphaTool {
    client: reqwest::Client,
    app_id: String,
    base_url: String,
}

impl WolframAlphaTool {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            app_id: app_id.into(),
            base_url: "https://api.wolframalpha.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Tool for WolframAlphaTool {
    fn name(&self) -> &str {
        "wolfram-alpha"
    }

    fn description(&self) -> &str {
        "A wrapper around Wolfram Alpha. Useful for when you need to answer questions about Math, \
         Science, Technology, Culture, Society and Everyday Life. Input should be a search query."
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .get(format!("{}/v1/result", self.base_url))
            .query(&[("appid", self.app_id.as_str()), ("i", input.trim())])
            .send()
            .await
            .context("Wolfram Alpha request failed")?;

        let status = response.status();
        let body = response.text().await?;

        // 501 means the input was understood but has no short answer.
        if status == reqwest::StatusCode::NOT_IMPLEMENTED {
            return Ok("Wolfram Alpha wasn't able to answer it".to_string());
        }
        if !status.is_success() {
            anyhow::bail!("Wolfram Alpha error ({}): {}", status, body.trim());
        }

        Ok(format!("Answer: {}", body.trim()))
    }
}
