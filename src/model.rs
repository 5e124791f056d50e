//! Model binding for agent-LLM communication
//!
//! [`ModelProvider`] is the seam between the runner and the inference
//! endpoint. The production binding wraps `async-openai` chat completions;
//! [`ScriptedProvider`] and [`FnProvider`] stand in for it in tests and
//! offline runs.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
        CreateChatCompletionRequestArgs, FunctionCall, FunctionObjectArgs,
    },
    Client,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{RelayError, Result};
use crate::handoff::handoff_tool_name;
use crate::items::{Message, ModelResponse, Role, ToolCall};
use crate::tool::FunctionSpec;
use crate::usage::Usage;

/// Everything the binding needs for one completion.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Agent on whose behalf the call is made; informational.
    pub agent: String,
    pub model: String,
    /// System message first, then the run context.
    pub messages: Vec<Message>,
    pub tools: Vec<FunctionSpec>,
    pub temperature: Option<f32>,
}

impl ModelRequest {
    /// Whether a function with this name is offered to the model.
    pub fn offers(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }
}

/// Trait for model providers
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Generate a completion
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)>;
}

/// OpenAI chat-completions binding
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Build a client for the given key; `None` falls back to `OPENAI_API_KEY`.
    pub fn new(api_key: Option<&str>) -> Self {
        let config = match api_key {
            Some(key) => OpenAIConfig::new().with_api_key(key),
            None => OpenAIConfig::new(),
        };
        Self::with_client(Client::with_config(config))
    }

    pub fn with_client(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }

    fn convert_message(msg: &Message) -> Result<ChatCompletionRequestMessage> {
        let converted = match msg.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(msg.content.clone())
                .build()?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(msg.content.clone())
                .build()?
                .into(),
            Role::Assistant => {
                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                if !msg.content.is_empty() || msg.tool_calls.is_none() {
                    builder.content(msg.content.clone());
                }
                if let Some(tool_calls) = &msg.tool_calls {
                    let calls: Vec<ChatCompletionMessageToolCall> = tool_calls
                        .iter()
                        .map(|tc| ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: tc.name.clone(),
                                arguments: wire_arguments(&tc.arguments),
                            },
                        })
                        .collect();
                    builder.tool_calls(calls);
                }
                builder.build()?.into()
            }
            Role::Tool => ChatCompletionRequestToolMessageArgs::default()
                .content(msg.content.clone())
                .tool_call_id(msg.tool_call_id.clone().unwrap_or_default())
                .build()?
                .into(),
        };
        Ok(converted)
    }

    fn convert_tools(tools: &[FunctionSpec]) -> Result<Vec<ChatCompletionTool>> {
        tools
            .iter()
            .map(|spec| -> Result<ChatCompletionTool> {
                let function = FunctionObjectArgs::default()
                    .name(spec.name.clone())
                    .description(spec.description.clone())
                    .parameters(spec.parameters.clone())
                    .build()?;
                Ok(ChatCompletionToolArgs::default()
                    .r#type(ChatCompletionToolType::Function)
                    .function(function)
                    .build()?)
            })
            .collect()
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)> {
        let messages = request
            .messages
            .iter()
            .map(Self::convert_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&request.model).messages(messages);
        if !request.tools.is_empty() {
            args.tools(Self::convert_tools(&request.tools)?);
        }
        if let Some(temp) = request.temperature {
            args.temperature(temp);
        }

        let response = self.client.chat().create(args.build()?).await?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| RelayError::model("no choices in response"))?;

        let tool_calls = choice
            .message
            .tool_calls
            .as_ref()
            .map(|calls| {
                calls
                    .iter()
                    .map(|tc| ToolCall {
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                        arguments: parse_arguments(&tc.function.arguments),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let model_response = ModelResponse {
            id: response.id.clone(),
            content: choice.message.content.clone(),
            tool_calls,
            finish_reason: choice.finish_reason.as_ref().map(|r| format!("{:?}", r)),
            created_at: chrono::Utc::now(),
        };

        let usage = response
            .usage
            .map(|u| Usage::new(u.prompt_tokens as usize, u.completion_tokens as usize))
            .unwrap_or_else(Usage::empty);

        Ok((model_response, usage))
    }
}

/// Arguments that are not valid JSON are kept verbatim as a string.
fn parse_arguments(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Inverse of [`parse_arguments`]: a kept raw string goes back unquoted.
fn wire_arguments(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

enum Scripted {
    Respond(ModelResponse),
    Fail(String),
}

/// Provider replaying a fixed script, one entry per model call.
///
/// Every request is recorded so tests can inspect what each agent saw.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: ModelResponse) -> Self {
        self.script.lock().push_back(Scripted::Respond(response));
        self
    }

    pub fn with_message(self, content: impl Into<String>) -> Self {
        self.with_response(ModelResponse::new_message(content))
    }

    pub fn with_tool_call(self, tool_name: impl Into<String>, args: Value) -> Self {
        self.with_response(ModelResponse::new_tool_calls(vec![ToolCall::new(
            tool_name, args,
        )]))
    }

    /// Script a call of the handoff function leading to `target`.
    pub fn with_handoff(self, target: &str, reason: &str) -> Self {
        self.with_tool_call(
            handoff_tool_name(target),
            serde_json::json!({ "reason": reason }),
        )
    }

    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.script.lock().push_back(Scripted::Fail(message.into()));
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)> {
        self.requests.lock().push(request);
        match self.script.lock().pop_front() {
            Some(Scripted::Respond(response)) => Ok((response, Usage::new(10, 5))),
            Some(Scripted::Fail(message)) => Err(RelayError::model(message)),
            None => Err(RelayError::model("script exhausted")),
        }
    }
}

type ResponderFn = dyn Fn(&ModelRequest) -> Result<ModelResponse> + Send + Sync;

/// Provider answering each request through a closure.
#[derive(Clone)]
pub struct FnProvider {
    responder: Arc<ResponderFn>,
}

impl FnProvider {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ModelRequest) -> Result<ModelResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
        }
    }
}

#[async_trait]
impl ModelProvider for FnProvider {
    async fn complete(&self, request: ModelRequest) -> Result<(ModelResponse, Usage)> {
        let response = (self.responder)(&request)?;
        Ok((response, Usage::new(10, 5)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ModelRequest {
        ModelRequest {
            agent: "Trend Scout".into(),
            model: "gpt-4o-mini".into(),
            messages: vec![Message::system("sys"), Message::user("hi")],
            tools: vec![FunctionSpec {
                name: "search_tool".into(),
                description: "search".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
            temperature: None,
        }
    }

    #[test]
    fn test_message_conversion() {
        let call = ToolCall::new("search_tool", serde_json::json!({"query": "q"}));
        for msg in [
            Message::system("You are helpful"),
            Message::user("Hello"),
            Message::assistant("Hi there"),
            Message::assistant_with_tool_calls("", vec![call.clone()]),
            Message::tool("Result", &call.id),
        ] {
            assert!(OpenAIProvider::convert_message(&msg).is_ok());
        }
    }

    #[test]
    fn test_unparseable_arguments_round_trip_verbatim() {
        let raw = r#"{"query": "x""#;
        let parsed = parse_arguments(raw);
        assert_eq!(parsed, Value::String(raw.to_string()));
        assert_eq!(wire_arguments(&parsed), raw);

        let valid = parse_arguments(r#"{"query":"x"}"#);
        assert_eq!(valid, serde_json::json!({"query": "x"}));
        assert_eq!(wire_arguments(&valid), r#"{"query":"x"}"#);
    }

    #[test]
    fn test_tool_conversion() {
        let converted = OpenAIProvider::convert_tools(&request().tools).unwrap();
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].function.name, "search_tool");
        assert_eq!(converted[0].function.description.as_deref(), Some("search"));
    }

    #[test]
    fn test_request_offers() {
        let req = request();
        assert!(req.offers("search_tool"));
        assert!(!req.offers("keyword_data_tool"));
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new()
            .with_tool_call("search_tool", serde_json::json!({"query": "q"}))
            .with_handoff("Topical Architect", "research done")
            .with_message("final");

        let (first, usage) = provider.complete(request()).await.unwrap();
        assert_eq!(first.tool_calls[0].name, "search_tool");
        assert_eq!(usage.total_tokens, 15);

        let (second, _) = provider.complete(request()).await.unwrap();
        assert_eq!(second.tool_calls[0].name, "transfer_to_topical_architect");

        let (third, _) = provider.complete(request()).await.unwrap();
        assert_eq!(third.text(), Some("final"));

        assert!(provider.complete(request()).await.is_err());
        assert_eq!(provider.requests().len(), 4);
        assert_eq!(provider.remaining(), 0);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let provider = ScriptedProvider::new().with_failure("upstream 500");
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, RelayError::ModelBindingError { .. }));
        assert!(err.to_string().contains("upstream 500"));
    }

    #[tokio::test]
    async fn test_fn_provider() {
        let provider = FnProvider::new(|req| {
            Ok(ModelResponse::new_message(format!("hello from {}", req.agent)))
        });
        let (resp, _) = provider.complete(request()).await.unwrap();
        assert_eq!(resp.text(), Some("hello from Trend Scout"));
    }
}
