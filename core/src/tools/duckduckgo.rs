use crate::tools::http_client;
use crate::traits::Tool;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

const MAX_RESULTS: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default)]
    answer: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

/// Either a single topic or a named group of topics.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Topic {
        #[serde(rename = "Text")]
        text: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

impl RelatedTopic {
    fn collect_texts(&self, out: &mut Vec<String>) {
        match self {
            Self::Topic { text } => out.push(text.clone()),
            Self::Group { topics } => topics.iter().for_each(|t| t.collect_texts(out)),
        }
    }
}

pub struct DuckDuckGoSearchTool {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoSearchTool {
    pub fn new() -> Self {
        Self {
            client: http_client(),
            base_url: "https://api.duckduckgo.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn format(answer: InstantAnswer) -> String {
        let mut results = Vec::new();

        if !answer.answer.trim().is_empty() {
            results.push(answer.answer.trim().to_string());
        }
        if !answer.abstract_text.trim().is_empty() {
            let title = if answer.heading.is_empty() {
                "Summary"
            } else {
                answer.heading.as_str()
            };
            results.push(format!("{}: {}", title, answer.abstract_text.trim()));
        }

        let mut topics = Vec::new();
        for topic in &answer.related_topics {
            topic.collect_texts(&mut topics);
        }
        results.extend(
            topics
                .into_iter()
                .filter(|t| !t.trim().is_empty())
                .map(|t| match t.split_once(" - ") {
                    Some((title, body)) => format!("{}: {}", title.trim(), body.trim()),
                    None => t,
                }),
        );

        results.truncate(MAX_RESULTS);
        results.join("\n")
    }
}

impl Default for DuckDuckGoSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for DuckDuckGoSearchTool {
    fn name(&self) -> &str {
        "ddg-search"
    }

    fn description(&self) -> &str {
        "Search the web using DuckDuckGo. Input should be a search query."
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<String> {
        let answer: InstantAnswer = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", input),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .context("Search failed")?
            .error_for_status()
            .context("Search failed")?
            .json()
            .await
            .context("Search failed: unreadable response")?;

        let formatted = Self::format(answer);
        if formatted.is_empty() {
            Ok("No good DuckDuckGo Search Result was found".to_string())
        } else {
            Ok(formatted)
        }
    }
}
