//! Keyword metrics over the DataForSEO Labs API

use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::KeywordSettings;
use crate::error::{Result, ToolFetchError};
use crate::tool::{InputContract, ToolHandler, ToolInvoker};

use super::text_field;

pub const KEYWORD_TOOL: &str = "keyword_data_tool";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct KeywordArgs {
    /// A broad keyword, e.g. "electric baby swing"
    pub keyword: String,
}

/// Sentinel for a keyword with no usable metrics.
pub fn no_keyword_data(keyword: &str) -> String {
    format!("No data found for '{}'.", keyword)
}

/// Search volume and intent for a single keyword.
#[derive(Debug, Clone)]
pub struct KeywordDataTool {
    client: Client,
    settings: KeywordSettings,
}

impl KeywordDataTool {
    pub fn new(settings: KeywordSettings) -> Self {
        Self::with_client(Client::new(), settings)
    }

    pub fn with_client(client: Client, settings: KeywordSettings) -> Self {
        Self { client, settings }
    }

    pub fn into_invoker(self, timeout: Duration) -> Result<ToolInvoker> {
        Ok(ToolInvoker::new(
            KEYWORD_TOOL,
            "Look up monthly search volume and search intent for one keyword.",
            InputContract::of::<KeywordArgs>("keyword")?,
            Arc::new(self),
            timeout,
        ))
    }

    fn payload(&self, keyword: &str) -> Value {
        // keyword_overview takes a `keywords` list per task, even for one keyword
        json!([{
            "location_code": self.settings.location_code,
            "language_code": self.settings.language_code,
            "keywords": [keyword],
        }])
    }
}

#[async_trait]
impl ToolHandler for KeywordDataTool {
    async fn fetch(&self, input: &str) -> std::result::Result<String, ToolFetchError> {
        let response = self
            .client
            .post(&self.settings.endpoint)
            .basic_auth(
                self.settings.login.as_deref().unwrap_or_default(),
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

        render_keyword_metrics(input, &data).ok_or(ToolFetchError::NoData)
    }

    fn no_data(&self, input: &str) -> String {
        no_keyword_data(input)
    }
}

/// Render `tasks[0].result[0].items[0]` as `Keyword: K | Vol: V | Intent: I`.
pub fn render_keyword_metrics(keyword: &str, payload: &Value) -> Option<String> {
    let item = payload.pointer("/tasks/0/result/0/items/0")?;
    if !item.is_object() {
        return None;
    }

    let volume = match item.pointer("/keyword_info/search_volume") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => "N/A".to_string(),
    };
    let intent = item
        .get("search_intent_info")
        .and_then(|info| text_field(info, "label").or_else(|| text_field(info, "main_intent")))
        .unwrap_or("N/A");

    Some(format!(
        "Keyword: {} | Vol: {} | Intent: {}",
        keyword, volume, intent
    ))
}
