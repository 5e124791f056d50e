//! Web search over the Oxylabs realtime API

use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::SearchSettings;
use crate::error::{Result, ToolFetchError};
use crate::tool::{InputContract, ToolHandler, ToolInvoker};

use super::text_field;

pub const SEARCH_TOOL: &str = "search_tool";

/// Returned whenever the search yields nothing renderable.
pub const NO_ORGANIC_RESULTS: &str = "No organic results found.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchArgs {
    /// A human-style search query, e.g. "<product> real world review reddit"
    pub query: String,
}

/// Google search through the Oxylabs realtime endpoint.
#[derive(Debug, Clone)]
pub struct SearchTool {
    client: Client,
    settings: SearchSettings,
}

impl SearchTool {
    pub fn new(settings: SearchSettings) -> Self {
        Self::with_client(Client::new(), settings)
    }

    pub fn with_client(client: Client, settings: SearchSettings) -> Self {
        Self { client, settings }
    }

    /// Wrap this handler into a registered tool.
    pub fn into_invoker(self, timeout: Duration) -> Result<ToolInvoker> {
        Ok(ToolInvoker::new(
            SEARCH_TOOL,
            "Search Google and return the top organic results (title, link, snippet).",
            InputContract::of::<SearchArgs>("query")?,
            Arc::new(self),
            timeout,
        ))
    }

    fn payload(&self, query: &str) -> Value {
        json!({
            "source": "google_search",
            "query": query,
            "geo_location": self.settings.geo_location,
            "parse": true,
            "limit": self.settings.limit,
        })
    }
}

#[async_trait]
impl ToolHandler for SearchTool {
    async fn fetch(&self, input: &str) -> std::result::Result<String, ToolFetchError> {
        let response = self
            .client
            .post(&self.settings.endpoint)
            .basic_auth(
                self.settings.username.as_deref().unwrap_or_default(),
                self.settings.password.as_deref(),
            )
            .json(&self.payload(input))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolFetchError::Status(status.as_u16()));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ToolFetchError::Malformed(e.to_string()))?;

        render_organic_results(&data, self.settings.top_n).ok_or(ToolFetchError::NoData)
    }

    fn no_data(&self, _input: &str) -> String {
        NO_ORGANIC_RESULTS.to_string()
    }
}

/// Render `results[0].content.results.organic`, top `top_n` entries.
///
/// Returns `None` when the path is missing or no entry carries a title,
/// link or snippet.
pub fn render_organic_results(payload: &Value, top_n: usize) -> Option<String> {
    let organic = payload
        .get("results")?
        .as_array()?
        .first()?
        .get("content")?
        .get("results")?
        .get("organic")?
        .as_array()?;

    let blocks: Vec<String> = organic
        .iter()
        .filter(|entry| {
            ["title", "url", "desc"]
                .iter()
                .any(|key| text_field(entry, key).is_some())
        })
        .take(top_n)
        .map(|entry| {
            format!(
                "Title: {}\nLink: {}\nSnippet: {}",
                text_field(entry, "title").unwrap_or("N/A"),
                text_field(entry, "url").unwrap_or("N/A"),
                text_field(entry, "desc").unwrap_or("N/A"),
            )
        })
        .collect();

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}
