//! HTTP-backed data tools used by the research agent.

pub mod keyword;
pub mod search;

pub use keyword::{KeywordDataTool, KEYWORD_TOOL};
pub use search::{SearchTool, NO_ORGANIC_RESULTS, SEARCH_TOOL};

use serde_json::Value;

/// Non-blank string field of a JSON object.
pub(crate) fn text_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
