//! # Run traces
//!
//! When tracing is enabled in the run configuration, every run records a
//! [`RunTrace`]: one trace id and a flat list of spans, each pointing at its
//! parent. Agent steps open a span; generations, tool calls and handoffs nest
//! under it. At the end of the run the trace goes to a [`TraceExporter`].
//!
//! ```rust
//! use agent_relay::trace::{RunTrace, SpanKind};
//!
//! let mut trace = RunTrace::new();
//! let step = trace.start_span(SpanKind::Agent { agent: "Trend Scout".into() });
//! let tool = trace.start_span(SpanKind::Tool {
//!     tool: "search_tool".into(),
//!     arguments: serde_json::json!({"query": "Mastela reviews"}),
//! });
//! trace.end_span(&tool);
//! trace.end_span(&step);
//!
//! assert_eq!(trace.spans().len(), 2);
//! assert_eq!(trace.spans()[1].parent_id.as_deref(), Some(step.as_str()));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::usage::Usage;

pub type TraceId = String;
pub type SpanId = String;

pub fn gen_trace_id() -> TraceId {
    format!("trace_{}", Uuid::new_v4().simple())
}

fn gen_span_id() -> SpanId {
    format!("span_{}", Uuid::new_v4().simple())
}

/// The operation a span covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpanKind {
    /// One step of an agent
    Agent { agent: String },
    /// A model completion
    Generation {
        model: String,
        prompt_tokens: usize,
        completion_tokens: usize,
    },
    /// A tool invocation
    Tool {
        tool: String,
        arguments: serde_json::Value,
    },
    /// A transfer of control
    Handoff {
        from_agent: String,
        to_agent: String,
        reason: Option<String>,
    },
}

impl SpanKind {
    fn label(&self) -> &'static str {
        match self {
            SpanKind::Agent { .. } => "agent",
            SpanKind::Generation { .. } => "generation",
            SpanKind::Tool { .. } => "tool",
            SpanKind::Handoff { .. } => "handoff",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub id: SpanId,
    pub parent_id: Option<SpanId>,
    pub kind: SpanKind,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Span {
    fn new(parent_id: Option<SpanId>, kind: SpanKind) -> Self {
        Self {
            id: gen_span_id(),
            parent_id,
            kind,
            start_time: Utc::now(),
            end_time: None,
            error: None,
        }
    }

    pub fn complete(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn fail(&mut self, error: String) {
        self.error = Some(error);
        self.complete();
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds())
    }
}

/// Spans collected during a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTrace {
    trace_id: TraceId,
    #[serde(skip)]
    current: Option<SpanId>,
    spans: Vec<Span>,
}

impl RunTrace {
    pub fn new() -> Self {
        Self::with_id(gen_trace_id())
    }

    pub fn with_id(trace_id: TraceId) -> Self {
        debug!(trace_id = %trace_id, "Starting new trace");
        Self {
            trace_id,
            current: None,
            spans: Vec::new(),
        }
    }

    /// Open a span as a child of the currently open one.
    pub fn start_span(&mut self, kind: SpanKind) -> SpanId {
        let span = Span::new(self.current.clone(), kind);
        let id = span.id.clone();
        debug!(span_id = %id, kind = span.kind.label(), "Starting span");
        self.spans.push(span);
        self.current = Some(id.clone());
        id
    }

    pub fn end_span(&mut self, span_id: &str) {
        if let Some(span) = self.spans.iter_mut().find(|s| s.id == span_id) {
            span.complete();
            if self.current.as_deref() == Some(span_id) {
                self.current = span.parent_id.clone();
            }
        }
    }

    pub fn fail_span(&mut self, span_id: &str, error: String) {
        if let Some(span) = self.spans.iter_mut().find(|s| s.id == span_id) {
            span.fail(error);
            if self.current.as_deref() == Some(span_id) {
                self.current = span.parent_id.clone();
            }
        }
    }

    /// Close a generation span, recording the token counts.
    pub fn end_generation(&mut self, span_id: &str, usage: &Usage) {
        if let Some(span) = self.spans.iter_mut().find(|s| s.id == span_id) {
            if let SpanKind::Generation {
                prompt_tokens,
                completion_tokens,
                ..
            } = &mut span.kind
            {
                *prompt_tokens = usage.prompt_tokens;
                *completion_tokens = usage.completion_tokens;
            }
        }
        self.end_span(span_id);
    }

    /// Record an instantaneous span, e.g. a handoff.
    pub fn mark(&mut self, kind: SpanKind) -> SpanId {
        let id = self.start_span(kind);
        self.end_span(&id);
        id
    }

    /// Fail every span still open; used when a run aborts mid-step.
    pub fn abort_open(&mut self, error: &str) {
        for span in self.spans.iter_mut().filter(|s| s.end_time.is_none()) {
            span.fail(error.to_string());
        }
        self.current = None;
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }
}

impl Default for RunTrace {
    fn default() -> Self {
        Self::new()
    }
}

/// Destination for finished traces.
pub trait TraceExporter: Send + Sync {
    fn export(&self, trace: &RunTrace);
}

/// Writes each span as a structured `tracing` event under the `relay::trace` target.
pub struct LogExporter;

impl TraceExporter for LogExporter {
    fn export(&self, trace: &RunTrace) {
        info!(
            target: "relay::trace",
            trace_id = %trace.trace_id(),
            spans = trace.spans().len(),
            "Trace finished"
        );
        for span in trace.spans() {
            let detail = serde_json::to_string(&span.kind).unwrap_or_default();
            match &span.error {
                Some(error) => warn!(
                    target: "relay::trace",
                    trace_id = %trace.trace_id(),
                    span_id = %span.id,
                    parent = span.parent_id.as_deref().unwrap_or("-"),
                    duration_ms = span.duration_ms().unwrap_or(0),
                    %error,
                    "{}",
                    detail
                ),
                None => info!(
                    target: "relay::trace",
                    trace_id = %trace.trace_id(),
                    span_id = %span.id,
                    parent = span.parent_id.as_deref().unwrap_or("-"),
                    duration_ms = span.duration_ms().unwrap_or(0),
                    "{}",
                    detail
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_ids_are_unique() {
        let a = gen_trace_id();
        let b = gen_trace_id();
        assert_ne!(a, b);
        assert!(a.starts_with("trace_"));
    }

    #[test]
    fn test_nested_spans() {
        let mut trace = RunTrace::new();
        let agent = trace.start_span(SpanKind::Agent {
            agent: "Trend Scout".into(),
        });
        let gen = trace.start_span(SpanKind::Generation {
            model: "gpt-4o-mini".into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        });
        trace.end_generation(&gen, &Usage::new(120, 30));
        let tool = trace.start_span(SpanKind::Tool {
            tool: "search_tool".into(),
            arguments: serde_json::json!({"query": "q"}),
        });
        trace.end_span(&tool);
        trace.end_span(&agent);

        let spans = trace.spans();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].parent_id.as_deref(), Some(agent.as_str()));
        assert_eq!(spans[2].parent_id.as_deref(), Some(agent.as_str()));
        assert!(spans.iter().all(|s| s.end_time.is_some()));
        match &spans[1].kind {
            SpanKind::Generation { prompt_tokens, completion_tokens, .. } => {
                assert_eq!((*prompt_tokens, *completion_tokens), (120, 30));
            }
            other => panic!("unexpected span {:?}", other),
        }
    }

    #[test]
    fn test_mark_and_abort() {
        let mut trace = RunTrace::new();
        let agent = trace.start_span(SpanKind::Agent { agent: "A".into() });
        trace.mark(SpanKind::Handoff {
            from_agent: "A".into(),
            to_agent: "B".into(),
            reason: None,
        });
        trace.start_span(SpanKind::Agent { agent: "B".into() });
        trace.abort_open("run timed out");

        let spans = trace.spans();
        assert_eq!(spans[1].parent_id.as_deref(), Some(agent.as_str()));
        assert!(spans[1].error.is_none());
        assert_eq!(spans[0].error.as_deref(), Some("run timed out"));
        assert_eq!(spans[2].error.as_deref(), Some("run timed out"));
    }

    #[test]
    fn test_span_fail() {
        let mut trace = RunTrace::new();
        let id = trace.start_span(SpanKind::Agent { agent: "A".into() });
        trace.fail_span(&id, "model error".into());
        assert_eq!(trace.spans()[0].error.as_deref(), Some("model error"));
        assert!(trace.spans()[0].duration_ms().is_some());
    }
}
