//! Contract chat
//!
//! Answers questions over the uploaded contracts:
//! - retrieves the contracts nearest to the question
//! - prompts the completion model with their full text
//! - appends both turns to the chat log

mod retriever;

pub use retriever::{ContextRetriever, ContractContext};

use crate::config::ChatConfig;
use crate::db::models::{ChatMessage, ChatRole};
use crate::db::ContractStore;
use crate::embeddings::Embedder;
use crate::errors::{AppError, Result};
use crate::llm::ChatModel;
use crate::metrics::record_chat;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Reply used when the completion model fails
pub const APOLOGY: &str =
    "I'm sorry, I couldn't generate an answer right now. Please try again in a moment.";

/// The assistant turn plus the contracts it was grounded on
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub message: ChatMessage,
    pub context: Vec<ContractContext>,
    /// True when the model failed and the apology was returned
    pub fallback: bool,
}

/// Analyst prompt over the retrieved contracts
pub fn build_prompt(question: &str, contexts: &[ContractContext]) -> String {
    let context = contexts
        .iter()
        .map(|c| c.block.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Analyze the following contracts and answer the user's question.\n\n\
         Context:\n{}\n\n\
         User Question: {}\n\n\
         Instructions:\n\
         1. Provide a detailed analysis\n\
         2. Cite specific clauses when relevant\n\
         3. Compare terms between contracts if applicable\n\
         4. Highlight any potential issues or risks\n\
         5. Use bullet points or numbered lists for clarity when appropriate",
        context, question
    )
}

pub struct ChatService {
    store: Arc<dyn ContractStore>,
    retriever: ContextRetriever,
    model: Arc<dyn ChatModel>,
    history_limit: u64,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn ContractStore>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            retriever: ContextRetriever::new(store.clone(), embedder, config.top_k),
            store,
            model,
            history_limit: config.history_limit,
        }
    }

    /// Ask a question, optionally restricted to some documents
    #[instrument(skip(self, question, document_ids), fields(question_len = question.len()))]
    pub async fn ask(&self, question: &str, document_ids: Option<&[Uuid]>) -> Result<ChatReply> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation {
                message: "Message must not be empty".to_string(),
                field: Some("message".to_string()),
            });
        }

        let start = Instant::now();
        self.store.append_chat_message(ChatRole::User, question).await?;

        let context = self.retriever.retrieve(question, document_ids).await;
        let prompt = build_prompt(question, &context);

        let (answer, fallback) = match self.model.complete(&prompt).await {
            Ok(answer) => (answer, false),
            Err(e) => {
                warn!(error = %e, model = self.model.model_name(), "Completion failed");
                (APOLOGY.to_string(), true)
            }
        };

        let message = self
            .store
            .append_chat_message(ChatRole::Assistant, &answer)
            .await?;

        record_chat(start.elapsed().as_secs_f64(), fallback);
        info!(
            context_documents = context.len(),
            fallback,
            "Chat answered"
        );

        Ok(ChatReply {
            message,
            context,
            fallback,
        })
    }

    /// The chat log in chronological order, capped at the configured limit
    pub async fn history(&self, limit: Option<u64>) -> Result<Vec<ChatMessage>> {
        let limit = limit
            .unwrap_or(self.history_limit)
            .clamp(1, self.history_limit.max(1));
        self.store.recent_chat_messages(limit).await
    }
}
