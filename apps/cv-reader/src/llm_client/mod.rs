//! LLM Client — the single point of entry for Azure OpenAI calls in cv-reader.
//!
//! One request per call. Failures are returned to the caller as-is; there is
//! no retry and no backoff.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned no choices")]
    NoChoices,

    #[error("LLM returned empty content (finish_reason: {finish_reason})")]
    EmptyContent { finish_reason: String },
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    presence_penalty: f64,
    frequency_penalty: f64,
    n: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AzureError {
    error: AzureErrorBody,
}

#[derive(Debug, Deserialize)]
struct AzureErrorBody {
    message: String,
}

/// Text of the first choice plus whatever usage the service reported.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: Option<Usage>,
}

/// A chat model that turns one prompt into one completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat_completion(&self, prompt: &str, system: &str) -> Result<Completion, LlmError>;
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy)]
struct SamplingParams {
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    presence_penalty: f64,
}

#[derive(Debug, Clone)]
enum Credential {
    ApiKey(String),
    AdToken(String),
}

/// Azure OpenAI chat completions client bound to one deployment.
#[derive(Clone)]
pub struct AzureOpenAiClient {
    client: Client,
    url: String,
    credential: Credential,
    params: SamplingParams,
}

impl AzureOpenAiClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self::with_http_client(config, builder.build()?))
    }

    fn with_http_client(config: &Config, client: Client) -> Self {
        let credential = match &config.ad_token {
            Some(token) => Credential::AdToken(token.clone()),
            None => Credential::ApiKey(config.api_key.clone()),
        };

        Self {
            client,
            url: completions_url(&config.endpoint, &config.deployment_name, &config.api_version),
            credential,
            params: SamplingParams {
                temperature: config.temperature,
                top_p: config.top_p,
                max_tokens: config.max_tokens,
                presence_penalty: config.presence_penalty,
            },
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Assembles the POST with body and credential header, without sending it.
    fn build_http_request(&self, prompt: &str, system: &str) -> Result<reqwest::Request, LlmError> {
        let body = build_request(prompt, system, self.params);

        let request = self.client.post(&self.url).json(&body);
        let request = match &self.credential {
            Credential::ApiKey(key) => request.header("api-key", key.as_str()),
            Credential::AdToken(token) => request.bearer_auth(token),
        };

        Ok(request.build()?)
    }
}

#[async_trait]
impl ChatModel for AzureOpenAiClient {
    async fn chat_completion(&self, prompt: &str, system: &str) -> Result<Completion, LlmError> {
        let request = self.build_http_request(prompt, system)?;

        debug!("POST {}", self.url);
        let response = self.client.execute(request).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await?;
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(body),
            });
        }

        let response: ChatResponse = response.json().await?;
        let completion = first_completion(response)?;

        if let Some(usage) = completion.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(completion)
    }
}

fn completions_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint.trim_end_matches('/'),
        deployment,
        api_version
    )
}

fn build_request<'a>(prompt: &'a str, system: &'a str, params: SamplingParams) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if !system.is_empty() {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: prompt,
    });

    ChatRequest {
        messages,
        temperature: params.temperature,
        top_p: params.top_p,
        max_tokens: params.max_tokens,
        presence_penalty: params.presence_penalty,
        frequency_penalty: 0.0,
        n: 1,
    }
}

/// Prefers the service's `error.message`, falling back to the raw body.
fn api_error_message(body: String) -> String {
    serde_json::from_str::<AzureError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

fn first_completion(response: ChatResponse) -> Result<Completion, LlmError> {
    let usage = response.usage;
    let choice = response.choices.into_iter().next().ok_or(LlmError::NoChoices)?;

    match choice.message.content {
        Some(content) if !content.trim().is_empty() => Ok(Completion { content, usage }),
        _ => Err(LlmError::EmptyContent {
            finish_reason: choice.finish_reason.unwrap_or_else(|| "unknown".to_string()),
        }),
    }
}
