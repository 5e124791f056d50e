//! # agent-relay
//!
//! A handoff-driven multi-agent pipeline. Three role-specialised agents
//! (Trend Scout → Topical Architect → SEO Wordsmith) pass one conversation
//! down a chain of explicit handoffs, calling a web search tool and a keyword
//! metrics tool along the way, until the last agent writes a blog post.
//!
//! ## Core Concepts
//!
//! - **Agent**: name, instructions, tool names and outgoing handoff edges
//! - **Handoff**: a directed edge, advertised to the model as `transfer_to_<agent>`
//! - **Tool invoker**: string in, string out; upstream failures become a "no data" sentence
//! - **Orchestrator**: runs the step → tool / handoff / answer loop under hop, turn and time bounds
//! - **Session store**: the visible per-session history, one user and one assistant entry per turn
//!
//! ## Getting Started
//!
//! Set `OPENAI_API_KEY`, `OXYLABS_USERNAME`, `OXYLABS_PASSWORD`,
//! `DATAFORSEO_LOGIN` and `DATAFORSEO_PASSWORD`, then:
//!
//! ```rust,no_run
//! use agent_relay::{config, ChatService};
//!
//! # async fn example() -> agent_relay::Result<()> {
//! let service = ChatService::from_config(&config::from_env())?;
//! let (session, welcome) = service.on_session_start();
//! println!("{}", welcome);
//!
//! let post = service.on_message(&session, "Mastela electric baby swing").await;
//! println!("{}", post);
//! # Ok(())
//! # }
//! ```
//!
//! Offline, any [`ModelProvider`] can stand in for the OpenAI binding:
//!
//! ```rust
//! use agent_relay::{Agent, AgentRegistry, Orchestrator, RunConfig, ScriptedProvider, ToolRegistry};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> agent_relay::Result<()> {
//! let registry = AgentRegistry::builder(ToolRegistry::new())
//!     .agent(Agent::simple("Writer", "Write a haiku."))
//!     .entry("Writer")
//!     .build()?;
//! let provider = ScriptedProvider::new().with_message("old pond / a frog jumps in");
//! let orchestrator = Orchestrator::new(Arc::new(registry), Arc::new(provider), RunConfig::default());
//!
//! let outcome = orchestrator.run(&[], "a haiku please").await?;
//! assert_eq!(outcome.last_agent, "Writer");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod chat;
pub mod config;
pub mod error;
pub mod handoff;
pub mod items;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod runner;
pub mod session;
pub mod tool;
pub mod tools;
pub mod trace;
pub mod usage;

pub use agent::{Action, Agent, AgentConfig, StepOutput};
pub use chat::{welcome_message, ChatService, GENERIC_FAILURE};
pub use config::{ConfigBuilder, RelayConfig};
pub use error::{RelayError, Result, ToolFetchError};
pub use handoff::Handoff;
pub use items::{Message, ModelResponse, Role, RunItem, ToolCall};
pub use model::{FnProvider, ModelProvider, ModelRequest, OpenAIProvider, ScriptedProvider};
pub use registry::{AgentRegistry, RegistryBuilder};
pub use runner::{Orchestrator, RunConfig, RunOutcome};
pub use session::{InMemorySessionStore, SessionId, SessionStore};
pub use tool::{FnHandler, ToolHandler, ToolInvoker, ToolRegistry};
pub use usage::{Usage, UsageStats};
