//! # Agent
//!
//! An `Agent` is a named, instruction-bound participant in the relay: it owns
//! a set of tool names, a set of outgoing [`Handoff`] edges and an optional
//! model binding. Agents are built once at startup, registered in an
//! [`AgentRegistry`], and shared read-only across every session.
//!
//! One call to [`Agent::step`] is one model completion. The completion is
//! mapped onto an [`Action`]; the runner decides what to do with it.
//!
//! [`AgentRegistry`]: crate::registry::AgentRegistry

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RelayError, Result};
use crate::handoff::{handoff_reason, Handoff};
use crate::items::{Message, ModelResponse, ToolCall};
use crate::model::{ModelProvider, ModelRequest};
use crate::registry::AgentRegistry;
use crate::tool::FunctionSpec;
use crate::usage::Usage;

/// Defines the complete configuration for an [`Agent`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique name within a registry
    pub name: String,

    /// System prompt, forwarded to the model verbatim
    pub instructions: String,

    /// Names of the registered tools this agent may call
    pub tools: Vec<String>,

    /// Outgoing handoff edges
    pub handoffs: Vec<Handoff>,

    /// Model identifier; `None` uses the registry default
    pub model: Option<String>,

    pub temperature: Option<f32>,
}

/// A configured agent.
///
/// ```rust
/// use agent_relay::{Agent, Handoff};
///
/// let architect = Agent::simple("Topical Architect", "Pick one angle.")
///     .with_model("gpt-4o")
///     .with_handoff(Handoff::to("SEO Wordsmith", "Writes the final post."))
///     .with_temperature(0.3);
///
/// assert_eq!(architect.config.model.as_deref(), Some("gpt-4o"));
/// assert_eq!(architect.handoffs().len(), 1);
/// assert!(architect.tools().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Agent {
    pub config: AgentConfig,
}

/// What the active agent decided to do this turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Plain text with no calls; ends the run.
    FinalAnswer(String),

    /// Ordinary tool calls, executed in order.
    ToolCalls(Vec<ToolCall>),

    /// Transfer control. `call` is the function call that requested it.
    HandOff {
        call: ToolCall,
        target: String,
        reason: Option<String>,
    },
}

/// The result of one [`Agent::step`].
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub action: Action,
    /// Text produced alongside tool calls, if any.
    pub content: Option<String>,
    pub model: String,
    pub usage: Usage,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    pub fn simple(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self::new(AgentConfig {
            name: name.into(),
            instructions: instructions.into(),
            ..Default::default()
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.config.tools.push(tool.into());
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.tools.extend(tools.into_iter().map(Into::into));
        self
    }

    pub fn with_handoff(mut self, handoff: Handoff) -> Self {
        self.config.handoffs.push(handoff);
        self
    }

    pub fn with_handoffs(mut self, handoffs: Vec<Handoff>) -> Self {
        self.config.handoffs.extend(handoffs);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn instructions(&self) -> &str {
        &self.config.instructions
    }

    pub fn tools(&self) -> &[String] {
        &self.config.tools
    }

    pub fn handoffs(&self) -> &[Handoff] {
        &self.config.handoffs
    }

    pub fn owns_tool(&self, name: &str) -> bool {
        self.config.tools.iter().any(|t| t == name)
    }

    /// Whether an outgoing edge leads to `target`.
    pub fn can_hand_off_to(&self, target: &str) -> bool {
        self.config.handoffs.iter().any(|h| h.target == target)
    }

    /// Build the system message: instructions plus tool and handoff listings.
    pub fn build_system_message(&self, registry: &AgentRegistry) -> Message {
        let mut content = self.config.instructions.clone();

        let tools: Vec<_> = self
            .config
            .tools
            .iter()
            .filter_map(|name| registry.tools().get(name))
            .collect();
        if !tools.is_empty() {
            content.push_str("\n\nYou have access to the following tools:\n");
            for tool in tools {
                content.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
            }
        }

        if !self.config.handoffs.is_empty() {
            content.push_str("\n\nYou can hand off to the following agents:\n");
            for handoff in &self.config.handoffs {
                content.push_str(&format!("- {}: {}\n", handoff.target, handoff.description));
            }
        }

        Message::system(content)
    }

    /// Functions advertised to the model: owned tools first, then handoffs.
    pub fn function_specs(&self, registry: &AgentRegistry) -> Vec<FunctionSpec> {
        self.config
            .tools
            .iter()
            .filter_map(|name| registry.tools().get(name))
            .map(|tool| tool.function_spec())
            .chain(self.config.handoffs.iter().map(Handoff::function_spec))
            .collect()
    }

    /// Run one model completion over `context` and classify the response.
    pub async fn step(
        &self,
        provider: &dyn ModelProvider,
        registry: &AgentRegistry,
        context: &[Message],
    ) -> Result<StepOutput> {
        let mut messages = Vec::with_capacity(context.len() + 1);
        messages.push(self.build_system_message(registry));
        messages.extend_from_slice(context);

        let model = registry.model_for(self).to_string();
        let request = ModelRequest {
            agent: self.config.name.clone(),
            model: model.clone(),
            messages,
            tools: self.function_specs(registry),
            temperature: registry.temperature_for(self),
        };

        let (response, usage) = provider.complete(request).await?;
        let content = response.text().map(str::to_string);
        let action = self.classify(response, registry)?;
        debug!(agent = %self.config.name, action = action_kind(&action), "Step classified");

        Ok(StepOutput {
            action,
            content,
            model,
            usage,
        })
    }

    fn classify(&self, response: ModelResponse, registry: &AgentRegistry) -> Result<Action> {
        let handoff = response.tool_calls.iter().find_map(|call| {
            self.config
                .handoffs
                .iter()
                .find(|h| h.tool_name() == call.name)
                .map(|h| h.target.clone())
                .or_else(|| registry.resolve_handoff_tool(&call.name).map(str::to_string))
                .map(|target| (call, target))
        });

        if let Some((call, target)) = handoff {
            return Ok(Action::HandOff {
                reason: handoff_reason(&call.arguments),
                call: call.clone(),
                target,
            });
        }

        if response.has_tool_calls() {
            return Ok(Action::ToolCalls(response.tool_calls));
        }

        match response.text() {
            Some(text) => Ok(Action::FinalAnswer(text.to_string())),
            None => Err(RelayError::model(format!(
                "agent '{}' received a completion with neither text nor tool calls",
                self.config.name
            ))),
        }
    }
}

fn action_kind(action: &Action) -> &'static str {
    match action {
        Action::FinalAnswer(_) => "final_answer",
        Action::ToolCalls(_) => "tool_calls",
        Action::HandOff { .. } => "handoff",
    }
}
