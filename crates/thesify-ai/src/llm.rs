//! Chat-completion function calling over HTTP.
//!
//! [`ToolCaller`] is the seam between the classifiers and the network: it
//! takes a system prompt, a user prompt and one function schema, forces the
//! model to call that function, and hands back the raw JSON arguments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thesify_core::FunctionSchema;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reply contained no call to function '{0}'")]
    NoToolCall(String),
    #[error("no API key configured")]
    MissingApiKey,
}

/// One forced function call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub system: String,
    pub user: String,
    pub function: FunctionSchema,
}

/// Anything that can execute a [`ToolRequest`] and return the function-call
/// arguments as a JSON string.
#[async_trait]
pub trait ToolCaller: Send + Sync {
    async fn call_tool(&self, request: &ToolRequest) -> Result<String, LlmError>;
}

#[async_trait]
impl<T: ToolCaller + ?Sized> ToolCaller for &T {
    async fn call_tool(&self, request: &ToolRequest) -> Result<String, LlmError> {
        (**self).call_tool(request).await
    }
}

// ── Wire format ──

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    tools: [Tool<'a>; 1],
    tool_choice: ToolChoice<'a>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Tool<'a> {
    Function { function: &'a FunctionSchema },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolChoice<'a> {
    Function { function: FunctionName<'a> },
}

#[derive(Serialize)]
struct FunctionName<'a> {
    name: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, request: &'a ToolRequest) -> Self {
        Self {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            tools: [Tool::Function {
                function: &request.function,
            }],
            tool_choice: ToolChoice::Function {
                function: FunctionName {
                    name: &request.function.name,
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

impl ChatResponse {
    /// Arguments of the first call to `function` in the first choice.
    fn into_arguments(self, function: &str) -> Result<String, LlmError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| {
                choice
                    .message
                    .tool_calls
                    .unwrap_or_default()
                    .into_iter()
                    .find(|call| call.function.name == function)
            })
            .map(|call| call.function.arguments)
            .ok_or_else(|| LlmError::NoToolCall(function.to_string()))
    }
}

// ── Client ──

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// `base_url` should be like `https://api.openai.com/v1` (no trailing slash needed).
    pub fn new(base_url: &str, api_key: String, model: String) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ToolCaller for OpenAiClient {
    async fn call_tool(&self, request: &ToolRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest::new(&self.model, request);

        debug!(url = %url, model = %self.model, function = %request.function.name, "calling model");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = resp.json().await?;
        reply.into_arguments(&request.function.name)
    }
}
