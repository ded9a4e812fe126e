//! Persistence seam shared by the pipeline and the read-side views

use crate::analysis::{ContractFields, ExtractionStrategy};
use crate::db::models::{ChatMessage, ChatRole, ContractAnalysis, Document, DocumentStatus};
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fields of a document row at insert time
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub original_name: String,
    pub storage_locator: String,
    pub size_bytes: i64,
    pub raw_text: Option<String>,
    pub page_count: Option<i32>,
}

/// One chunk ready to be stored with its embedding
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub index: i32,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Result of a similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub document_name: String,
    pub content: String,
    pub chunk_index: i32,
    pub score: f64,
}

/// A document paired with its analysis, if one was stored
pub type AnalyzedDocument = (Document, Option<ContractAnalysis>);

/// Relational backend for documents, analyses, chunks and the chat log
#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Insert a document with status `uploading`
    async fn insert_document(&self, document: NewDocument) -> Result<Document>;

    async fn set_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        error_message: Option<String>,
    ) -> Result<Document>;

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>>;

    /// Most recent first
    async fn recent_documents(&self, limit: u64) -> Result<Vec<Document>>;

    /// Insert or overwrite the single analysis row of a document
    async fn upsert_analysis(
        &self,
        document_id: Uuid,
        fields: &ContractFields,
        score: u8,
        strategy: ExtractionStrategy,
    ) -> Result<ContractAnalysis>;

    async fn find_analysis(&self, document_id: Uuid) -> Result<Option<ContractAnalysis>>;

    /// Most recent documents with their analyses, most recent first
    async fn recent_analyzed(&self, limit: u64) -> Result<Vec<AnalyzedDocument>>;

    /// The given documents with their analyses, most recent first; unknown ids are skipped
    async fn analyzed_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AnalyzedDocument>>;

    /// Replace every chunk of a document
    async fn replace_chunks(
        &self,
        document_id: Uuid,
        chunks: Vec<NewChunk>,
        embedding_model: &str,
    ) -> Result<usize>;

    async fn count_chunks(&self, document_id: Uuid) -> Result<u64>;

    /// Nearest chunks by cosine similarity, optionally restricted to some documents
    async fn similar_chunks(
        &self,
        embedding: &[f32],
        limit: usize,
        document_ids: Option<&[Uuid]>,
    ) -> Result<Vec<ChunkMatch>>;

    async fn append_chat_message(&self, role: ChatRole, content: &str) -> Result<ChatMessage>;

    /// The last `limit` messages in chronological order
    async fn recent_chat_messages(&self, limit: u64) -> Result<Vec<ChatMessage>>;
}
