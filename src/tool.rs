//! Tool invokers
//!
//! A tool invoker wraps one external data fetch behind a string-in,
//! string-out contract. Whatever happens upstream (connection refused,
//! timeout, non-2xx status, unexpected JSON) the caller gets text back: either
//! the rendered data or the handler's "no data" sentence.
//!
//! Tools are registered explicitly in a [`ToolRegistry`] at startup and
//! referenced by name from agent definitions.

use async_trait::async_trait;
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tower::{BoxError, ServiceBuilder, ServiceExt};
use tracing::{debug, warn};

use crate::error::{RelayError, Result, ToolFetchError};

/// Function signature advertised to the model binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The single string parameter a tool accepts, with its JSON schema.
#[derive(Debug, Clone)]
pub struct InputContract {
    /// Name of the string property the query is read from
    pub param: &'static str,
    /// JSON schema advertised to the model
    pub schema: Value,
}

impl InputContract {
    /// Derive the contract from a typed args struct.
    pub fn of<A: JsonSchema>(param: &'static str) -> Result<Self> {
        let root = schemars::schema_for!(A);
        let schema = serde_json::to_value(root.schema)?;
        let has_param = schema
            .get("properties")
            .and_then(|p| p.get(param))
            .is_some();
        if !has_param {
            return Err(RelayError::config(format!(
                "input schema has no property named '{}'",
                param
            )));
        }
        Ok(Self { param, schema })
    }

    /// Pull the query string out of the model's arguments.
    ///
    /// A bare string is taken as the query unless it looks like JSON, in
    /// which case it must parse and carry the parameter.
    pub fn extract<'a>(&self, arguments: &'a Value) -> Option<Cow<'a, str>> {
        match arguments {
            Value::String(raw) => {
                let trimmed = raw.trim_start();
                if trimmed.starts_with('{') || trimmed.starts_with('[') {
                    let parsed: Value = serde_json::from_str(raw).ok()?;
                    parsed
                        .get(self.param)
                        .and_then(|v| v.as_str())
                        .map(|q| Cow::Owned(q.to_string()))
                } else {
                    Some(Cow::Borrowed(raw.as_str()))
                }
            }
            other => other
                .get(self.param)
                .and_then(|v| v.as_str())
                .map(Cow::Borrowed),
        }
    }
}

/// The external call behind a tool invoker.
#[async_trait]
pub trait ToolHandler: Send + Sync + Debug {
    /// Perform the fetch and render the result as text.
    async fn fetch(&self, input: &str) -> std::result::Result<String, ToolFetchError>;

    /// The sentence returned whenever no usable data is available.
    fn no_data(&self, input: &str) -> String;
}

/// A registered tool: name, input contract, handler and timeout.
#[derive(Clone)]
pub struct ToolInvoker {
    name: String,
    description: String,
    input: InputContract,
    handler: Arc<dyn ToolHandler>,
    timeout: Duration,
}

impl std::fmt::Debug for ToolInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInvoker")
            .field("name", &self.name)
            .field("param", &self.input.param)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ToolInvoker {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input: InputContract,
        handler: Arc<dyn ToolHandler>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input,
            handler,
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn function_spec(&self) -> FunctionSpec {
        FunctionSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.input.schema.clone(),
        }
    }

    /// Invoke with the raw JSON arguments produced by the model.
    pub async fn invoke_with_args(&self, arguments: &Value) -> String {
        match self.input.extract(arguments) {
            Some(query) => self.invoke(&query).await,
            None => {
                warn!(tool = %self.name, %arguments, "Tool called without its '{}' argument", self.input.param);
                self.handler.no_data("")
            }
        }
    }

    /// Invoke with a query string. Never fails and never returns blank text.
    pub async fn invoke(&self, query: &str) -> String {
        let query = query.trim();
        if query.is_empty() {
            warn!(tool = %self.name, "Tool called with an empty query");
            return self.handler.no_data(query);
        }

        let handler = self.handler.clone();
        let service = ServiceBuilder::new()
            .timeout(self.timeout)
            .service_fn(move |input: String| {
                let handler = handler.clone();
                async move { handler.fetch(&input).await }
            });

        debug!(tool = %self.name, query, "Invoking tool");
        match service.oneshot(query.to_string()).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(tool = %self.name, query, "Tool rendered blank output");
                self.handler.no_data(query)
            }
            Err(err) => {
                let err = classify(err, self.timeout);
                warn!(tool = %self.name, query, error = %err, "Tool fetch failed");
                self.handler.no_data(query)
            }
        }
    }
}

fn classify(err: BoxError, timeout: Duration) -> ToolFetchError {
    match err.downcast::<ToolFetchError>() {
        Ok(fetch) => *fetch,
        Err(other) if other.is::<tower::timeout::error::Elapsed>() => {
            ToolFetchError::Timeout(timeout)
        }
        Err(other) => ToolFetchError::Malformed(other.to_string()),
    }
}

type FetchFn =
    dyn Fn(String) -> BoxFuture<'static, std::result::Result<String, ToolFetchError>> + Send + Sync;

/// A handler built from closures, for offline pipelines and tests.
#[derive(Clone)]
pub struct FnHandler {
    fetch: Arc<FetchFn>,
    no_data: Arc<dyn Fn(&str) -> String + Send + Sync>,
}

impl FnHandler {
    pub fn new<F, Fut, N>(fetch: F, no_data: N) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = std::result::Result<String, ToolFetchError>>
            + Send
            + 'static,
        N: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            fetch: Arc::new(
                move |input: String| -> BoxFuture<'static, std::result::Result<String, ToolFetchError>> {
                    Box::pin(fetch(input))
                },
            ),
            no_data: Arc::new(no_data),
        }
    }
}

impl std::fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish()
    }
}

#[async_trait]
impl ToolHandler for FnHandler {
    async fn fetch(&self, input: &str) -> std::result::Result<String, ToolFetchError> {
        (self.fetch)(input.to_string()).await
    }

    fn no_data(&self, input: &str) -> String {
        (self.no_data)(input)
    }
}

/// Explicit name → invoker table, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<ToolInvoker>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool; names must be unique.
    pub fn register(&mut self, tool: ToolInvoker) -> Result<()> {
        if self.tools.contains_key(tool.name()) {
            return Err(RelayError::config(format!(
                "tool '{}' registered twice",
                tool.name()
            )));
        }
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, tool: ToolInvoker) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ToolInvoker>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
