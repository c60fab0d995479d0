//! OpenAI-compatible chat completion client.
//!
//! One request per call, no retries and no conversation memory: each call
//! sends the optional system prompt and the current user message only.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::endpoint::{AccessClass, Endpoint};
use crate::error::CliError;
use crate::params::GenerationParams;

/// Timeout for a single chat completion request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions framing the conversation.
    System,
    /// The operator.
    User,
    /// The model.
    Assistant,
}

/// A single message in a chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// System prompt (optional) followed by the user message.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Completion token limit.
    pub max_tokens: u32,
    /// Nucleus sampling threshold.
    pub top_p: f64,
}

impl ChatCompletionRequest {
    /// Build the request for one user turn.
    #[must_use]
    pub fn new(message: &str, params: &GenerationParams) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(prompt) = params.system_prompt() {
            messages.push(ChatMessage::new(Role::System, prompt));
        }
        messages.push(ChatMessage::new(Role::User, message));
        Self {
            messages,
            temperature: params.temperature(),
            max_tokens: params.max_tokens(),
            top_p: params.top_p(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Extract `choices[0].message.content`, trimmed.
///
/// # Errors
///
/// Returns [`CliError::ResponseFormat`] if the body does not have that shape.
pub fn parse_reply(body: &str) -> Result<String, CliError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| CliError::ResponseFormat(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| CliError::ResponseFormat("no message content in choices[0]".into()))
}

/// Something that can answer a chat message.
pub trait ChatBackend: Send + Sync {
    /// Send one user message and return the assistant reply.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Request`], [`CliError::ApiStatus`] or
    /// [`CliError::ResponseFormat`].
    fn send_message(
        &self,
        endpoint: &Endpoint,
        message: &str,
        params: &GenerationParams,
    ) -> impl Future<Output = Result<String, CliError>> + Send;
}

/// [`ChatBackend`] speaking HTTP to an OpenAI-compatible server.
///
/// Requests to a local port-forward never go through `HTTP_PROXY`; other
/// endpoints follow the proxy environment.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    direct: reqwest::Client,
}

impl InferenceClient {
    /// Create a client with the default 30 second timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, CliError> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self, CliError> {
        let build = |builder: reqwest::ClientBuilder| {
            builder
                .timeout(timeout)
                .build()
                .map_err(|e| CliError::Request(e.to_string()))
        };
        Ok(Self {
            http: build(reqwest::Client::builder())?,
            direct: build(reqwest::Client::builder().no_proxy())?,
        })
    }

    fn client_for(&self, endpoint: &Endpoint) -> &reqwest::Client {
        match endpoint.access {
            AccessClass::LocalPortForward => &self.direct,
            AccessClass::ClusterInternal | AccessClass::ExternalLoadBalancer => &self.http,
        }
    }
}

impl ChatBackend for InferenceClient {
    async fn send_message(
        &self,
        endpoint: &Endpoint,
        message: &str,
        params: &GenerationParams,
    ) -> Result<String, CliError> {
        let url = endpoint.chat_completions_url();
        let request = ChatCompletionRequest::new(message, params);
        debug!(%url, messages = request.messages.len(), "Sending chat completion");

        let resp = self
            .client_for(endpoint)
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CliError::Request(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| CliError::Request(format!("failed to read response: {e}")))?;
        trace!(%status, bytes = body.len(), "Chat completion answered");

        if status != StatusCode::OK {
            return Err(CliError::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        parse_reply(&body)
    }
}
