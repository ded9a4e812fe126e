//! Chat completion client abstraction

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::http::{build_client, post_json, DEFAULT_API_BASE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A language model that turns one prompt into one reply
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}

const SYSTEM_PROMPT: &str = "You are an expert contract analysis assistant.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatRequestMessage<'a>; 2],
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
}

impl OpenAIChatModel {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatRequestMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatRequestMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response: ChatResponse = post_json(
            &self.client,
            &url,
            &self.api_key,
            &request,
            self.max_retries,
            |message| AppError::CompletionError { message },
        )
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::CompletionError {
                message: "Empty completion".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Offline model that summarises what it was given
pub struct MockChatModel;

#[async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let contracts = prompt
            .lines()
            .filter(|line| line.starts_with("Contract ") && line.ends_with(':'))
            .count();
        let question = prompt
            .lines()
            .find_map(|line| line.trim().strip_prefix("User Question:"))
            .map(str::trim)
            .unwrap_or_default();

        Ok(format!(
            "Based on {} contract(s) in context, here is what I found regarding \"{}\". \
             Configure an LLM provider for a full analysis.",
            contracts, question
        ))
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

/// Create a chat model based on configuration
pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "openai" => {
            let key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
                message: "llm.api_key is required for the openai provider".to_string(),
            })?;
            Ok(Arc::new(OpenAIChatModel::new(key, config)?))
        }
        "mock" => Ok(Arc::new(MockChatModel)),
        other => {
            tracing::warn!(provider = other, "Unknown LLM provider, using mock");
            Ok(Arc::new(MockChatModel))
        }
    }
}
