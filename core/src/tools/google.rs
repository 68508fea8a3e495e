use crate::tools::http_client;
use crate::traits::Tool;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

const NUM_RESULTS: usize = 5;
/// Restricts results to the last twelve months.
const DATE_RESTRICT: &str = "m12";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

pub struct GoogleSearchTool {
    client: reqwest::Client,
    api_key: String,
    cse_id: String,
    base_url: String,
}

impl GoogleSearchTool {
    pub fn new(api_key: impl Into<String>, cse_id: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            api_key: api_key.into(),
            cse_id: cse_id.into(),
            base_url: "https://www.googleapis.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Tool for GoogleSearchTool {
    fn name(&self) -> &str {
        "google-search"
    }

    fn description(&self) -> &str {
        "A wrapper around Google Search. Useful for when you need to answer questions about \
         current events. Input should be a search query."
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<String> {
        let num = NUM_RESULTS.to_string();
        let response: SearchResponse = self
            .client
            .get(format!("{}/customsearch/v1", self.base_url))
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", input.trim()),
                ("num", num.as_str()),
                ("dateRestrict", DATE_RESTRICT),
            ])
            .send()
            .await
            .context("Google search failed")?
            .error_for_status()
            .context("Google search failed")?
            .json()
            .await
            .context("Google returned an unreadable response")?;

        if response.items.is_empty() {
            return Ok("No good Google Search Result was found".to_string());
        }

        let snippets: Vec<String> = response
            .items
            .iter()
            .take(NUM_RESULTS)
            .map(|item| format!("{}: {}", item.title, item.snippet.replace('\n', " ")))
            .collect();
        Ok(snippets.join("\n"))
    }
}
