//! Immutable agent registry
//!
//! The registry is assembled once at startup by [`RegistryBuilder`], which
//! checks the wiring (unique names, tool references, handoff targets, entry
//! agent) and fails fast with a configuration error. Afterwards it is shared
//! by `Arc` and never mutated.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::agent::Agent;
use crate::error::{RelayError, Result};
use crate::handoff::handoff_tool_name;
use crate::tool::ToolRegistry;

/// Validated set of agents plus the tools they reference.
#[derive(Debug)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Arc<Agent>>,
    entry: String,
    tools: Arc<ToolRegistry>,
    /// handoff function name -> agent name, over every registered agent
    handoff_index: HashMap<String, String>,
    default_model: String,
    default_temperature: Option<f32>,
}

impl AgentRegistry {
    pub fn builder(tools: impl Into<Arc<ToolRegistry>>) -> RegistryBuilder {
        RegistryBuilder::new(tools)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Agent>> {
        self.agents.get(name)
    }

    /// The agent every run starts from.
    pub fn entry(&self) -> &Arc<Agent> {
        // presence checked in `RegistryBuilder::build`
        &self.agents[&self.entry]
    }

    pub fn entry_name(&self) -> &str {
        &self.entry
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Agent whose handoff function is called `tool_name`, if any.
    pub fn resolve_handoff_tool(&self, tool_name: &str) -> Option<&str> {
        self.handoff_index.get(tool_name).map(String::as_str)
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn model_for<'a>(&'a self, agent: &'a Agent) -> &'a str {
        agent.config.model.as_deref().unwrap_or(&self.default_model)
    }

    pub fn temperature_for(&self, agent: &Agent) -> Option<f32> {
        agent.config.temperature.or(self.default_temperature)
    }
}

/// Builder that validates the agent graph.
pub struct RegistryBuilder {
    agents: Vec<Agent>,
    entry: Option<String>,
    tools: Arc<ToolRegistry>,
    default_model: String,
    default_temperature: Option<f32>,
}

impl RegistryBuilder {
    pub fn new(tools: impl Into<Arc<ToolRegistry>>) -> Self {
        Self {
            agents: Vec::new(),
            entry: None,
            tools: tools.into(),
            default_model: "gpt-4o-mini".to_string(),
            default_temperature: None,
        }
    }

    pub fn agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn agents(mut self, agents: impl IntoIterator<Item = Agent>) -> Self {
        self.agents.extend(agents);
        self
    }

    pub fn entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn default_temperature(mut self, temperature: Option<f32>) -> Self {
        self.default_temperature = temperature;
        self
    }

    pub fn build(self) -> Result<AgentRegistry> {
        let mut agents = BTreeMap::new();
        let mut handoff_index = HashMap::new();

        for agent in self.agents {
            let name = agent.name().to_string();
            if name.trim().is_empty() {
                return Err(RelayError::config("agent name must not be empty"));
            }

            let fn_name = handoff_tool_name(&name);
            if let Some(existing) = handoff_index.get(&fn_name) {
                return Err(if existing == &name {
                    RelayError::config(format!("agent '{}' registered twice", name))
                } else {
                    RelayError::config(format!(
                        "agents '{}' and '{}' both map to handoff function '{}'",
                        existing, name, fn_name
                    ))
                });
            }
            if self.tools.contains(&fn_name) {
                return Err(RelayError::config(format!(
                    "tool '{}' shadows the handoff function of agent '{}'",
                    fn_name, name
                )));
            }

            handoff_index.insert(fn_name, name.clone());
            agents.insert(name, Arc::new(agent));
        }

        for agent in agents.values() {
            for tool in agent.tools() {
                if !self.tools.contains(tool) {
                    return Err(RelayError::config(format!(
                        "agent '{}' references unknown tool '{}'",
                        agent.name(),
                        tool
                    )));
                }
            }
            for handoff in agent.handoffs() {
                if !agents.contains_key(&handoff.target) {
                    return Err(RelayError::config(format!(
                        "agent '{}' hands off to unknown agent '{}'",
                        agent.name(),
                        handoff.target
                    )));
                }
            }
        }

        let entry = self
            .entry
            .ok_or_else(|| RelayError::config("no entry agent configured"))?;
        if !agents.contains_key(&entry) {
            return Err(RelayError::config(format!(
                "entry agent '{}' is not registered",
                entry
            )));
        }

        Ok(AgentRegistry {
            agents,
            entry,
            tools: self.tools,
            handoff_index,
            default_model: self.default_model,
            default_temperature: self.default_temperature,
        })
    }
}
