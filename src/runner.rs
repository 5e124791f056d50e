//! # Orchestrator
//!
//! The `Orchestrator` drives one run: it starts at the registry's entry agent
//! with the external history plus the new user message, and loops
//! step → tool calls / handoff / final answer until some agent answers with
//! plain text. The context is threaded unchanged through every handoff, so a
//! successor sees everything its predecessors saw, including tool results.
//!
//! A run is bounded three ways: by hop count (agent-to-agent transitions), by
//! turn count (model calls), and by an overall soft timeout.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::agent::{Action, Agent};
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::handoff::handoff_ack;
use crate::items::{Message, Role, RunItem, ToolCall};
use crate::model::ModelProvider;
use crate::registry::AgentRegistry;
use crate::trace::{gen_trace_id, LogExporter, RunTrace, SpanKind, TraceExporter};
use crate::usage::UsageStats;

fn truncate_for_log(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let mut out: String = s.chars().take(max).collect();
        out.push('…');
        out
    } else {
        s.to_string()
    }
}

fn format_messages_for_log(messages: &[Message]) -> String {
    let mut lines = Vec::new();
    for (idx, m) in messages.iter().enumerate() {
        match m.role {
            Role::User => {
                lines.push(format!(
                    "{:02} USER     | {}",
                    idx,
                    truncate_for_log(&m.content, 160)
                ));
            }
            Role::System => {
                lines.push(format!(
                    "{:02} SYSTEM   | {}",
                    idx,
                    truncate_for_log(&m.content, 160)
                ));
            }
            Role::Assistant => {
                if let Some(tool_calls) = &m.tool_calls {
                    let calls: Vec<String> = tool_calls
                        .iter()
                        .map(|tc| format!("id={}, name={}", tc.id, tc.name))
                        .collect();
                    lines.push(format!(
                        "{:02} ASSIST   | tool_calls=[{}] content=\"{}\"",
                        idx,
                        calls.join(", "),
                        truncate_for_log(&m.content, 120)
                    ));
                } else {
                    lines.push(format!(
                        "{:02} ASSIST   | {}",
                        idx,
                        truncate_for_log(&m.content, 160)
                    ));
                }
            }
            Role::Tool => {
                let tcid = m
                    .tool_call_id
                    .as_deref()
                    .unwrap_or("<missing tool_call_id>");
                lines.push(format!(
                    "{:02} TOOL     | tool_call_id={} payload={}",
                    idx,
                    tcid,
                    truncate_for_log(&m.content, 120)
                ));
            }
        }
    }
    lines.join("\n")
}

/// Runner-level knobs, usually derived from [`RelayConfig`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum agent-to-agent transitions per run
    pub max_hops: usize,

    /// Maximum model calls per run
    pub max_turns: usize,

    /// Soft timeout for the whole run; `None` disables it
    pub run_timeout: Option<Duration>,

    /// Dump the message list at `info` instead of `debug`
    pub verbose: bool,

    /// Record a [`RunTrace`] and export it at the end of the run
    pub tracing: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_hops: 6,
            max_turns: 24,
            run_timeout: Some(Duration::from_secs(300)),
            verbose: false,
            tracing: false,
        }
    }
}

impl From<&RelayConfig> for RunConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            max_hops: config.max_hops,
            max_turns: config.max_turns,
            run_timeout: (config.run_timeout_secs > 0).then(|| config.run_timeout()),
            verbose: config.verbose_logging,
            tracing: config.tracing_enabled,
        }
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub final_output: String,
    /// The agent that produced `final_output`
    pub last_agent: String,
    pub items: Vec<RunItem>,
    /// Agents in activation order, starting with the entry agent
    pub chain: Vec<String>,
    pub usage: UsageStats,
    pub trace_id: String,
    pub trace: Option<RunTrace>,
}

impl RunOutcome {
    pub fn hop_count(&self) -> usize {
        self.chain.len().saturating_sub(1)
    }
}

/// Ephemeral state of one run.
struct RunState {
    active_agent: Arc<Agent>,
    context: Vec<Message>,
    hop_count: usize,
    turn_count: usize,
    chain: Vec<String>,
    items: Vec<RunItem>,
    usage: UsageStats,
    trace: Option<RunTrace>,
}

impl RunState {
    fn span(&mut self, kind: SpanKind) -> Option<String> {
        self.trace.as_mut().map(|t| t.start_span(kind))
    }

    fn end(&mut self, span: Option<String>) {
        if let (Some(trace), Some(id)) = (self.trace.as_mut(), span) {
            trace.end_span(&id);
        }
    }
}

/// Drives agent runs against a shared registry and model binding.
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    provider: Arc<dyn ModelProvider>,
    config: RunConfig,
    exporter: Arc<dyn TraceExporter>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AgentRegistry>,
        provider: Arc<dyn ModelProvider>,
        config: RunConfig,
    ) -> Self {
        Self {
            registry,
            provider,
            config,
            exporter: Arc::new(LogExporter),
        }
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn TraceExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the chain for one user message.
    ///
    /// `history` is the externally visible conversation so far; it is not
    /// modified. On success the outcome carries the final text and the last
    /// active agent; on failure the typed error is returned after being logged
    /// together with the hop chain.
    pub async fn run(&self, history: &[Message], user_input: &str) -> Result<RunOutcome> {
        let entry = self.registry.entry().clone();
        let trace_id = gen_trace_id();
        info!(agent = %entry.name(), trace_id = %trace_id, "Starting agent run");

        let mut context = history.to_vec();
        context.push(Message::user(user_input));

        let mut state = RunState {
            chain: vec![entry.name().to_string()],
            active_agent: entry,
            context,
            hop_count: 0,
            turn_count: 0,
            items: Vec::new(),
            usage: UsageStats::new(),
            trace: self
                .config
                .tracing
                .then(|| RunTrace::with_id(trace_id.clone())),
        };

        let result = match self.config.run_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.drive(&mut state)).await {
                Ok(result) => result,
                Err(_) => Err(RelayError::RunTimeout {
                    secs: limit.as_secs(),
                }),
            },
            None => self.drive(&mut state).await,
        };

        if let Some(trace) = state.trace.as_mut() {
            if let Err(err) = &result {
                trace.abort_open(&err.to_string());
            }
            self.exporter.export(trace);
        }

        match result {
            Ok(final_output) => {
                info!(
                    agent = %state.active_agent.name(),
                    hops = state.hop_count,
                    turns = state.turn_count,
                    usage = %state.usage.summary(),
                    "Run completed"
                );
                Ok(RunOutcome {
                    final_output,
                    last_agent: state.active_agent.name().to_string(),
                    items: state.items,
                    chain: state.chain,
                    usage: state.usage,
                    trace_id,
                    trace: state.trace,
                })
            }
            Err(err) => {
                error!(
                    error = %err,
                    agent = %state.active_agent.name(),
                    chain = %state.chain.join(" -> "),
                    turns = state.turn_count,
                    trace_id = %trace_id,
                    "Run failed"
                );
                Err(err)
            }
        }
    }

    async fn drive(&self, state: &mut RunState) -> Result<String> {
        loop {
            state.turn_count += 1;
            if state.turn_count > self.config.max_turns {
                return Err(RelayError::MaxTurnsExceeded {
                    max_turns: self.config.max_turns,
                });
            }

            let agent = state.active_agent.clone();
            debug!(turn = state.turn_count, agent = %agent.name(), "Starting turn");
            self.log_messages("Sending to provider", agent.name(), &state.context);

            let agent_span = state.span(SpanKind::Agent {
                agent: agent.name().to_string(),
            });
            let gen_span = state.span(SpanKind::Generation {
                model: self.registry.model_for(&agent).to_string(),
                prompt_tokens: 0,
                completion_tokens: 0,
            });

            let step = agent
                .step(self.provider.as_ref(), &self.registry, &state.context)
                .await?;

            if let (Some(trace), Some(id)) = (state.trace.as_mut(), gen_span) {
                trace.end_generation(&id, &step.usage);
            }
            state.usage.record(&step.model, agent.name(), step.usage);

            match step.action {
                Action::FinalAnswer(text) => {
                    state.context.push(Message::assistant(text.clone()));
                    state.items.push(RunItem::message(agent.name(), text.clone()));
                    state.end(agent_span);
                    return Ok(text);
                }
                Action::ToolCalls(calls) => {
                    state.context.push(Message::assistant_with_tool_calls(
                        step.content.unwrap_or_default(),
                        calls.clone(),
                    ));
                    for call in &calls {
                        state.items.push(RunItem::tool_call(agent.name(), call));
                        let tool_span = state.span(SpanKind::Tool {
                            tool: call.name.clone(),
                            arguments: call.arguments.clone(),
                        });
                        let output = self.invoke_tool(&agent, call).await;
                        state.end(tool_span);
                        state.context.push(Message::tool(output.clone(), call.id.clone()));
                        state.items.push(RunItem::tool_output(&call.id, output));
                    }
                    self.log_messages("Appended tool results", agent.name(), &state.context);
                    state.end(agent_span);
                }
                Action::HandOff {
                    call,
                    target,
                    reason,
                } => {
                    if !agent.can_hand_off_to(&target) {
                        return Err(RelayError::config(format!(
                            "agent '{}' has no handoff edge to '{}'",
                            agent.name(),
                            target
                        )));
                    }
                    let next = self.registry.get(&target).cloned().ok_or_else(|| {
                        RelayError::config(format!("handoff target '{}' is not registered", target))
                    })?;

                    state.context.push(Message::assistant_with_tool_calls(
                        step.content.unwrap_or_default(),
                        vec![call.clone()],
                    ));
                    state.items.push(RunItem::tool_call(agent.name(), &call));
                    state
                        .items
                        .push(RunItem::handoff(agent.name(), &target, reason.clone()));

                    state.hop_count += 1;
                    state.chain.push(target.clone());
                    if state.hop_count > self.config.max_hops {
                        return Err(RelayError::HandoffLimitExceeded {
                            max_hops: self.config.max_hops,
                            chain: state.chain.clone(),
                        });
                    }

                    let ack = handoff_ack(&target);
                    state.context.push(Message::tool(ack.clone(), call.id.clone()));
                    state.items.push(RunItem::tool_output(&call.id, ack));
                    if let Some(trace) = state.trace.as_mut() {
                        trace.mark(SpanKind::Handoff {
                            from_agent: agent.name().to_string(),
                            to_agent: target.clone(),
                            reason: reason.clone(),
                        });
                    }
                    state.end(agent_span);

                    info!(
                        from = %agent.name(),
                        to = %target,
                        reason = reason.as_deref().unwrap_or(""),
                        hop = state.hop_count,
                        "Handoff"
                    );
                    state.active_agent = next;
                }
            }
        }
    }

    async fn invoke_tool(&self, agent: &Agent, call: &ToolCall) -> String {
        let tool = agent
            .owns_tool(&call.name)
            .then(|| self.registry.tools().get(&call.name))
            .flatten();
        match tool {
            Some(tool) => tool.invoke_with_args(&call.arguments).await,
            None => {
                warn!(agent = %agent.name(), tool = %call.name, "Agent called a tool it does not own");
                format!("Error: unknown tool '{}'", call.name)
            }
        }
    }

    fn log_messages(&self, header: &str, agent: &str, messages: &[Message]) {
        if self.config.verbose {
            info!(
                target: "runner::messages",
                "\n=== {} (agent: {}) ===\n{}\n=== end ===",
                header,
                agent,
                format_messages_for_log(messages)
            );
        } else {
            debug!(
                target: "runner::messages",
                "\n=== {} (agent: {}) ===\n{}\n=== end ===",
                header,
                agent,
                format_messages_for_log(messages)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::Handoff;
    use crate::model::ScriptedProvider;
    use crate::registry::RegistryBuilder;
    use crate::tool::{FnHandler, InputContract, ToolInvoker, ToolRegistry};
    use crate::tools::search::SearchArgs;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tools() -> ToolRegistry {
        let handler = FnHandler::new(
            |q: String| async move { Ok(format!("Title: {}", q)) },
            |_q: &str| "No organic results found.".to_string(),
        );
        ToolRegistry::new()
            .with(ToolInvoker::new(
                "search_tool",
                "Search",
                InputContract::of::<SearchArgs>("query").unwrap(),
                Arc::new(handler),
                Duration::from_secs(1),
            ))
            .unwrap()
    }

    fn orchestrator(provider: ScriptedProvider, config: RunConfig) -> (Orchestrator, Arc<ScriptedProvider>) {
        let registry = RegistryBuilder::new(tools())
            .agent(
                Agent::simple("Scout", "research")
                    .with_tool("search_tool")
                    .with_handoff(Handoff::to("Writer", "")),
            )
            .agent(Agent::simple("Writer", "write"))
            .entry("Scout")
            .build()
            .unwrap();
        let provider = Arc::new(provider);
        let orchestrator = Orchestrator::new(Arc::new(registry), provider.clone(), config);
        (orchestrator, provider)
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("abc", 5), "abc");
        assert_eq!(truncate_for_log("abcdef", 3), "abc…");
        assert_eq!(truncate_for_log("ééé", 2), "éé…");
    }

    #[test]
    fn test_format_messages_for_log() {
        let call = ToolCall::new("search_tool", json!({}));
        let dump = format_messages_for_log(&[
            Message::user("hi"),
            Message::assistant_with_tool_calls("", vec![call.clone()]),
            Message::tool("out", call.id.clone()),
        ]);
        assert!(dump.contains("00 USER     | hi"));
        assert!(dump.contains("name=search_tool"));
        assert!(dump.contains(&format!("tool_call_id={}", call.id)));
    }

    #[test]
    fn test_run_config_from_relay_config() {
        let relay = crate::config::ConfigBuilder::new()
            .max_hops(2)
            .run_timeout(Duration::from_secs(0))
            .verbose(true)
            .build();
        let config = RunConfig::from(&relay);
        assert_eq!(config.max_hops, 2);
        assert_eq!(config.run_timeout, None);
        assert!(config.verbose);
    }

    #[tokio::test]
    async fn test_tool_then_handoff_then_answer() {
        let (orchestrator, provider) = orchestrator(
            ScriptedProvider::new()
                .with_tool_call("search_tool", json!({"query": "cribs"}))
                .with_handoff("Writer", "done")
                .with_message("the post"),
            RunConfig {
                tracing: true,
                ..Default::default()
            },
        );

        let outcome = orchestrator.run(&[], "write about cribs").await.unwrap();
        assert_eq!(outcome.final_output, "the post");
        assert_eq!(outcome.last_agent, "Writer");
        assert_eq!(outcome.chain, vec!["Scout", "Writer"]);
        assert_eq!(outcome.hop_count(), 1);
        assert_eq!(outcome.usage.total.request_count, 3);

        let requests = provider.requests();
        let writer_ctx = &requests[2].messages;
        assert_eq!(writer_ctx[0].role, Role::System);
        assert_eq!(writer_ctx[0].content, "write");
        assert!(writer_ctx
            .iter()
            .any(|m| m.role == Role::Tool && m.content == "Title: cribs"));

        let trace = outcome.trace.unwrap();
        assert_eq!(trace.trace_id(), outcome.trace_id);
        assert!(trace.spans().iter().all(|s| s.end_time.is_some()));
    }

    #[tokio::test]
    async fn test_unowned_tool_yields_error_result() {
        let (orchestrator, provider) = orchestrator(
            ScriptedProvider::new()
                .with_tool_call("keyword_data_tool", json!({"keyword": "x"}))
                .with_message("answer"),
            RunConfig::default(),
        );

        let outcome = orchestrator.run(&[], "go").await.unwrap();
        assert_eq!(outcome.final_output, "answer");
        let second = &provider.requests()[1].messages;
        let last = second.last().unwrap();
        assert_eq!(last.role, Role::Tool);
        assert_eq!(last.content, "Error: unknown tool 'keyword_data_tool'");
    }

    #[tokio::test]
    async fn test_max_turns() {
        let mut script = ScriptedProvider::new();
        for _ in 0..5 {
            script = script.with_tool_call("search_tool", json!({"query": "again"}));
        }
        let (orchestrator, _) = orchestrator(
            script,
            RunConfig {
                max_turns: 3,
                ..Default::default()
            },
        );
        let err = orchestrator.run(&[], "loop").await.unwrap_err();
        assert!(matches!(err, RelayError::MaxTurnsExceeded { max_turns: 3 }));
    }
}
