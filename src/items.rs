//! Items representing messages, tool calls, and model responses
//!
//! `Message` is what flows between the runner and the model binding and what
//! the session store keeps. `RunItem`s are the diagnostic transcript of one
//! run: every assistant message, tool call, tool output and handoff in order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::plain(Role::Assistant, content)
        }
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }

    /// Whether this entry belongs in the externally visible history.
    pub fn is_public(&self) -> bool {
        matches!(self.role, Role::User | Role::Assistant) && self.tool_calls.is_none()
    }
}

/// A tool call made by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }
}

/// Response from the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub id: String,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ModelResponse {
    pub fn new_message(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: Some(content.into()),
            tool_calls: vec![],
            finish_reason: Some("stop".to_string()),
            created_at: Utc::now(),
        }
    }

    pub fn new_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: None,
            tool_calls,
            finish_reason: Some("tool_calls".to_string()),
            created_at: Utc::now(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The text content, if any non-blank text was produced.
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|content| !content.trim().is_empty())
    }
}

/// A run item representing a single step in the run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunItem {
    Message(MessageItem),
    ToolCall(ToolCallItem),
    ToolOutput(ToolOutputItem),
    Handoff(HandoffItem),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageItem {
    pub id: String,
    pub agent: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallItem {
    pub id: String,
    pub agent: String,
    pub tool_name: String,
    pub arguments: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutputItem {
    pub id: String,
    pub tool_call_id: String,
    pub output: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffItem {
    pub id: String,
    pub from_agent: String,
    pub to_agent: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RunItem {
    pub(crate) fn message(agent: &str, content: impl Into<String>) -> Self {
        RunItem::Message(MessageItem {
            id: Uuid::new_v4().to_string(),
            agent: agent.to_string(),
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        })
    }

    pub(crate) fn tool_call(agent: &str, call: &ToolCall) -> Self {
        RunItem::ToolCall(ToolCallItem {
            id: call.id.clone(),
            agent: agent.to_string(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            created_at: Utc::now(),
        })
    }

    pub(crate) fn tool_output(tool_call_id: &str, output: impl Into<String>) -> Self {
        RunItem::ToolOutput(ToolOutputItem {
            id: Uuid::new_v4().to_string(),
            tool_call_id: tool_call_id.to_string(),
            output: output.into(),
            created_at: Utc::now(),
        })
    }

    pub(crate) fn handoff(from: &str, to: &str, reason: Option<String>) -> Self {
        RunItem::Handoff(HandoffItem {
            id: Uuid::new_v4().to_string(),
            from_agent: from.to_string(),
            to_agent: to.to_string(),
            reason,
            created_at: Utc::now(),
        })
    }
}

/// Helper functions for working with items
pub struct ItemHelpers;

impl ItemHelpers {
    /// Names of the tools called during a run, in call order.
    pub fn tool_names(items: &[RunItem]) -> Vec<&str> {
        items
            .iter()
            .filter_map(|item| match item {
                RunItem::ToolCall(call) => Some(call.tool_name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// All handoffs of a run, in order.
    pub fn handoffs(items: &[RunItem]) -> Vec<&HandoffItem> {
        items
            .iter()
            .filter_map(|item| match item {
                RunItem::Handoff(h) => Some(h),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_message_creation() {
        let sys_msg = Message::system("You are a helpful assistant");
        assert_eq!(sys_msg.role, Role::System);
        assert!(sys_msg.tool_call_id.is_none());
        assert!(!sys_msg.is_public());

        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, Role::User);
        assert!(user_msg.is_public());

        let tool_msg = Message::tool("Result", "call_123");
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_call_id, Some("call_123".to_string()));
        assert!(!tool_msg.is_public());

        let calls = Message::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("search_tool", serde_json::json!({"query": "x"}))],
        );
        assert!(!calls.is_public());
    }

    #[test]
    fn test_model_response_text() {
        let response = ModelResponse::new_message("Hello, how can I help?");
        assert_eq!(response.text(), Some("Hello, how can I help?"));
        assert!(!response.has_tool_calls());

        let blank = ModelResponse::new_message("   ");
        assert_eq!(blank.text(), None);

        let tool_response = ModelResponse::new_tool_calls(vec![ToolCall::new(
            "keyword_data_tool",
            serde_json::json!({"keyword": "baby swing"}),
        )]);
        assert_eq!(tool_response.text(), None);
        assert!(tool_response.has_tool_calls());
    }

    #[test]
    fn test_tool_call_ids_are_unique() {
        let a = ToolCall::new("t", Value::Null);
        let b = ToolCall::new("t", Value::Null);
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("call_"));
    }

    #[test]
    fn test_run_item_serialization() {
        let item = RunItem::handoff("Trend Scout", "Topical Architect", Some("done".into()));
        let serialized = serde_json::to_string(&item).unwrap();
        assert!(serialized.contains("\"type\":\"Handoff\""));
        assert!(serialized.contains("\"from_agent\":\"Trend Scout\""));
    }

    #[test]
    fn test_item_helpers() {
        let call = ToolCall::new("search_tool", serde_json::json!({"query": "q"}));
        let items = vec![
            RunItem::tool_call("Trend Scout", &call),
            RunItem::tool_output(&call.id, "Title: x"),
            RunItem::handoff("Trend Scout", "Topical Architect", None),
            RunItem::message("SEO Wordsmith", "# Post"),
        ];

        assert_eq!(ItemHelpers::tool_names(&items), vec!["search_tool"]);
        let handoffs = ItemHelpers::handoffs(&items);
        assert_eq!(handoffs.len(), 1);
        assert_eq!(handoffs[0].to_agent, "Topical Architect");
    }

    #[test]
    fn test_role_serialization() {
        let serialized = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(serialized, "\"assistant\"");

        let deserialized: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(deserialized, Role::User);
    }
}
