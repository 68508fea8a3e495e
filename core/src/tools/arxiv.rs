use crate::text::{collapse_whitespace, truncate_chars};
use crate::tools::http_client;
use crate::traits::Tool;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

const TOP_K_RESULTS: usize = 3;
const DOC_CONTENT_CHARS_MAX: usize = 4_000;

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    published: String,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

/// Searches arXiv and returns the newest matching abstracts.
pub struct ArxivTool {
    client: reqwest::Client,
    api_url: String,
}

impl ArxivTool {
    pub fn new() -> Self {
        Self {
            client: http_client(),
            api_url: "https://export.arxiv.org/api/query".to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// arXiv treats `:` and `-` as query syntax.
    fn sanitize_query(input: &str) -> String {
        collapse_whitespace(&input.replace([':', '-'], " "))
    }

    fn parse_feed(xml: &str) -> anyhow::Result<Vec<Entry>> {
        let feed: Feed = quick_xml::de::from_str(xml).context("arXiv returned malformed Atom")?;
        Ok(feed.entries)
    }

    fn format_entry(entry: &Entry) -> String {
        let authors: Vec<&str> = entry.authors.iter().map(|a| a.name.trim()).collect();
        let published = entry.published.get(..10).unwrap_or(&entry.published);
        format!(
            "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
            published,
            collapse_whitespace(&entry.title),
            authors.join(", "),
            collapse_whitespace(&entry.summary)
        )
    }
}

impl Default for ArxivTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ArxivTool {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn description(&self) -> &str {
        "A wrapper around Arxiv.org. Useful for when you need to answer questions about physics, \
         mathematics, computer science, quantitative biology, quantitative finance, statistics, \
         electrical engineering, and economics from scientific articles on arxiv.org. \
         Input should be a search query."
    }

    async fn invoke(&self, input: &str) -> anyhow::Result<String> {
        let search = format!("all:{}", Self::sanitize_query(input));
        let max_results = TOP_K_RESULTS.to_string();

        let body = self
            .client
            .get(&self.api_url)
            .query(&[
                ("search_query", search.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await
            .context("arXiv request failed")?
            .error_for_status()
            .context("arXiv request failed")?
            .text()
            .await?;

        let entries = Self::parse_feed(&body)?;
        if entries.is_empty() {
            return Ok("No good Arxiv Result was found".to_string());
        }

        let docs: Vec<String> = entries
            .iter()
            .take(TOP_K_RESULTS)
            .map(Self::format_entry)
            .collect();
        Ok(truncate_chars(&docs.join("\n\n"), DOC_CONTENT_CHARS_MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:attention</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>  The dominant sequence transduction models are based on
      recurrent networks.</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <link href="http://arxiv.org/abs/1706.03762v7" rel="alternate" type="text/html"/>
  </entry>
</feed>"#;

    #[test]
    fn parses_atom_entries() {
        let entries = ArxivTool::parse_feed(FEED).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            ArxivTool::format_entry(&entries[0]),
            "Published: 2017-06-12\nTitle: Attention Is All You Need\n\
             Authors: Ashish Vaswani, Noam Shazeer\n\
             Summary: The dominant sequence transduction models are based on recurrent networks."
        );
    }

    #[test]
    fn sanitizes_query_syntax() {
        assert_eq!(ArxivTool::sanitize_query("self-attention: survey"), "self attention survey");
    }

    #[tokio::test]
    async fn queries_the_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("search_query", "all:attention"))
            .and(query_param("max_results", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let tool = ArxivTool::new().with_api_url(server.uri());
        let output = tool.invoke("attention").await.unwrap();
        assert!(output.starts_with("Published: 2017-06-12\nTitle: Attention Is All You Need"));
    }

    #[tokio::test]
    async fn empty_feed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>none</title></feed>"#,
            ))
            .mount(&server)
            .await;

        let tool = ArxivTool::new().with_api_url(server.uri());
        assert_eq!(tool.invoke("nothing").await.unwrap(), "No good Arxiv Result was found");
    }
}
