//! # Agent Handoff Edges
//!
//! A handoff lets one agent transfer the active conversation to a named
//! successor within the same run. Edges are directed: `A → B` grants nothing
//! to `B`. An edge only names its target; the [`AgentRegistry`] checks at
//! build time that every target actually exists.
//!
//! To the model an edge looks like an ordinary function,
//! `transfer_to_<snake_case_target>`, with an optional `reason` argument. The
//! runner intercepts those calls instead of executing them.
//!
//! ```rust
//! use agent_relay::{Agent, Handoff};
//!
//! let scout = Agent::simple("Trend Scout", "Research the product.")
//!     .with_handoff(Handoff::to("Topical Architect", "Plans the blog structure."));
//!
//! assert_eq!(scout.handoffs()[0].target, "Topical Architect");
//! assert_eq!(scout.handoffs()[0].tool_name(), "transfer_to_topical_architect");
//! ```
//!
//! [`AgentRegistry`]: crate::registry::AgentRegistry

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tool::FunctionSpec;

/// A directed edge from the owning agent to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handoff {
    /// Name of the agent that takes over.
    pub target: String,

    /// When the model should use this edge; shown to the owning agent.
    pub description: String,
}

impl Handoff {
    pub fn to(target: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            description: description.into(),
        }
    }

    /// Function name advertised to the model.
    pub fn tool_name(&self) -> String {
        handoff_tool_name(&self.target)
    }

    /// Function signature advertised to the model.
    pub fn function_spec(&self) -> FunctionSpec {
        FunctionSpec {
            name: self.tool_name(),
            description: format!(
                "Handoff to the {} agent to handle the request. {}",
                self.target, self.description
            )
            .trim_end()
            .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "reason": {"type": "string", "description": "Reason for handoff"}
                }
            }),
        }
    }
}

/// `transfer_to_` followed by the agent name in snake case.
///
/// Function names must match `^[a-zA-Z0-9_-]+$`, so anything else collapses
/// into single underscores.
pub fn handoff_tool_name(agent_name: &str) -> String {
    let mut out = String::from("transfer_to_");
    let mut pending_sep = false;
    for c in agent_name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.ends_with('_') {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// The `reason` argument of a handoff call, if the model gave one.
pub fn handoff_reason(arguments: &Value) -> Option<String> {
    arguments
        .get("reason")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

/// Tool output fed back to the model when a handoff is accepted.
pub fn handoff_ack(target: &str) -> String {
    serde_json::json!({ "assistant": target }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handoff_creation() {
        let handoff = Handoff::to("SEO Wordsmith", "Writes the post");
        assert_eq!(handoff.target, "SEO Wordsmith");
        assert_eq!(handoff.description, "Writes the post");
        assert_eq!(handoff.tool_name(), "transfer_to_seo_wordsmith");
    }

    #[test]
    fn test_tool_name_normalisation() {
        assert_eq!(handoff_tool_name("Topical Architect"), "transfer_to_topical_architect");
        assert_eq!(handoff_tool_name("  trend--scout!! v2 "), "transfer_to_trend_scout_v2");
        assert_eq!(handoff_tool_name("A"), "transfer_to_a");
    }

    #[test]
    fn test_function_spec() {
        let spec = Handoff::to("Topical Architect", "Chooses one angle.").function_spec();
        assert_eq!(spec.name, "transfer_to_topical_architect");
        assert!(spec.description.contains("Topical Architect"));
        assert!(spec.description.contains("Chooses one angle."));
        assert_eq!(spec.parameters["properties"]["reason"]["type"], "string");
    }

    #[test]
    fn test_handoff_reason() {
        assert_eq!(
            handoff_reason(&serde_json::json!({"reason": " research done "})),
            Some("research done".to_string())
        );
        assert_eq!(handoff_reason(&serde_json::json!({"reason": ""})), None);
        assert_eq!(handoff_reason(&serde_json::json!(null)), None);
    }

    #[test]
    fn test_handoff_ack() {
        let ack: Value = serde_json::from_str(&handoff_ack("SEO Wordsmith")).unwrap();
        assert_eq!(ack["assistant"], "SEO Wordsmith");
    }
}
