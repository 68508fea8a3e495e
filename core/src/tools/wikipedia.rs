use crate::text::truncate_chars;
use crate::tools::http_client;
use crate::traits::Tool;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

const TOP_K_RESULTS: usize = 3;
const DOC_CONTENT_CHARS_MAX: usize = 4_000;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryPages>,
}

#[derive(Debug, Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    index: usize,
    #[serde(default)]
    extract: String,
}

/// Page summaries from the top English Wikipedia search hits.
pub struct WikipediaTool {
    client: reqwest::Client,
    api_url: String,
}

impl WikipediaTool {
    pub fn new() -> Self {
        Self {
            client: http_client(),
            api_url: "https://en.wikipedia.org/w/api.php".to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

impl Default for WikipediaTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "A wrapper around Wikipedia. Useful for when you need to answer general questions about \
         people, places, companies, facts, historical events, or other subjects. \
         Input should be a search query."
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<String> {
        let limit = TOP_K_RESULTS.to_string();
        let response: QueryResponse = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("generator", "search"),
                ("gsrsearch", input),
                ("gsrlimit", limit.as_str()),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exlimit", limit.as_str()),
                ("redirects", "1"),
            ])
            .send()
            .await
            .context("Wikipedia request failed")?
            .error_for_status()
            .context("Wikipedia request failed")?
            .json()
            .await
            .context("Wikipedia returned an unreadable response")?;

        let mut pages = response.query.map(|q| q.pages).unwrap_or_default();
        pages.retain(|p| !p.extract.trim().is_empty());
        pages.sort_by_key(|p| p.index);

        if pages.is_empty() {
            return Ok("No good Wikipedia Search Result was found".to_string());
        }

        let summaries: Vec<String> = pages
            .iter()
            .take(TOP_K_RESULTS)
            .map(|p| format!("Page: {}\nSummary: {}", p.title, p.extract.trim()))
            .collect();

        Ok(truncate_chars(&summaries.join("\n\n"), DOC_CONTENT_CHARS_MAX))
    }
}
