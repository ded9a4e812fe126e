//! In-memory [`ContractStore`] for tests and database-less local runs

use crate::analysis::{ContractFields, ExtractionStrategy};
use crate::db::models::{ChatMessage, ChatRole, ContractAnalysis, Document, DocumentStatus};
use crate::db::store::{AnalyzedDocument, ChunkMatch, ContractStore, NewChunk, NewDocument};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredChunk {
    id: Uuid,
    document_id: Uuid,
    index: i32,
    content: String,
    embedding: Vec<f32>,
}

#[derive(Default)]
struct State {
    /// Insertion order doubles as recency order
    documents: Vec<Document>,
    analyses: HashMap<Uuid, ContractAnalysis>,
    chunks: Vec<StoredChunk>,
    chat: Vec<ChatMessage>,
}

impl State {
    fn document_mut(&mut self, id: Uuid) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == id)
    }

    fn with_analysis(&self, document: &Document) -> AnalyzedDocument {
        (document.clone(), self.analyses.get(&document.id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl ContractStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_document(&self, document: NewDocument) -> Result<Document> {
        let now = chrono::Utc::now();
        let model = Document {
            id: Uuid::new_v4(),
            original_name: document.original_name,
            storage_locator: document.storage_locator,
            status: String::from(DocumentStatus::Uploading),
            size_bytes: document.size_bytes,
            extracted_at: document.raw_text.as_ref().map(|_| now.into()),
            raw_text: document.raw_text,
            page_count: document.page_count,
            error_message: None,
            created_at: now.into(),
            updated_at: now.into(),
        };

        self.state.write().await.documents.push(model.clone());
        Ok(model)
    }

    async fn set_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        error_message: Option<String>,
    ) -> Result<Document> {
        let mut state = self.state.write().await;
        let document = state
            .document_mut(id)
            .ok_or_else(|| AppError::DocumentNotFound { id: id.to_string() })?;

        document.status = String::from(status);
        document.error_message = error_message;
        document.updated_at = chrono::Utc::now().into();
        Ok(document.clone())
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>> {
        let state = self.state.read().await;
        Ok(state.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn recent_documents(&self, limit: u64) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn upsert_analysis(
        &self,
        document_id: Uuid,
        fields: &ContractFields,
        score: u8,
        strategy: ExtractionStrategy,
    ) -> Result<ContractAnalysis> {
        let mut state = self.state.write().await;
        if state.document_mut(document_id).is_none() {
            return Err(AppError::DocumentNotFound {
                id: document_id.to_string(),
            });
        }

        let analysis = ContractAnalysis::from_parts(
            document_id,
            fields,
            score,
            strategy,
            chrono::Utc::now().into(),
        );
        state.analyses.insert(document_id, analysis.clone());
        Ok(analysis)
    }

    async fn find_analysis(&self, document_id: Uuid) -> Result<Option<ContractAnalysis>> {
        Ok(self.state.read().await.analyses.get(&document_id).cloned())
    }

    async fn recent_analyzed(&self, limit: u64) -> Result<Vec<AnalyzedDocument>> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .iter()
            .rev()
            .take(limit as usize)
            .map(|d| state.with_analysis(d))
            .collect())
    }

    async fn analyzed_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AnalyzedDocument>> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .iter()
            .rev()
            .filter(|d| ids.contains(&d.id))
            .map(|d| state.with_analysis(d))
            .collect())
    }

    async fn replace_chunks(
        &self,
        document_id: Uuid,
        chunks: Vec<NewChunk>,
        _embedding_model: &str,
    ) -> Result<usize> {
        let mut state = self.state.write().await;
        state.chunks.retain(|c| c.document_id != document_id);

        let count = chunks.len();
        state.chunks.extend(chunks.into_iter().map(|chunk| StoredChunk {
            id: Uuid::new_v4(),
            document_id,
            index: chunk.index,
            content: chunk.content,
            embedding: chunk.embedding,
        }));
        Ok(count)
    }

    async fn count_chunks(&self, document_id: Uuid) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .count() as u64)
    }

    async fn similar_chunks(
        &self,
        embedding: &[f32],
        limit: usize,
        document_ids: Option<&[Uuid]>,
    ) -> Result<Vec<ChunkMatch>> {
        let state = self.state.read().await;

        let mut matches: Vec<ChunkMatch> = state
            .chunks
            .iter()
            .filter(|c| document_ids.map_or(true, |ids| ids.contains(&c.document_id)))
            .filter_map(|c| {
                let document = state.documents.iter().find(|d| d.id == c.document_id)?;
                Some(ChunkMatch {
                    chunk_id: c.id,
                    document_id: c.document_id,
                    document_name: document.original_name.clone(),
                    content: c.content.clone(),
                    chunk_index: c.index,
                    score: cosine_similarity(embedding, &c.embedding),
                })
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn append_chat_message(&self, role: ChatRole, content: &str) -> Result<ChatMessage> {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            role: role.as_str().to_string(),
            content: content.to_string(),
            created_at: chrono::Utc::now().into(),
        };
        self.state.write().await.chat.push(message.clone());
        Ok(message)
    }

    async fn recent_chat_messages(&self, limit: u64) -> Result<Vec<ChatMessage>> {
        let state = self.state.read().await;
        let skip = state.chat.len().saturating_sub(limit as usize);
        Ok(state.chat[skip..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ContractField, NOT_SPECIFIED};

    fn new_document(name: &str) -> NewDocument {
        NewDocument {
            original_name: name.to_string(),
            storage_locator: format!("mem://{}", name),
            size_bytes: 42,
            raw_text: Some(format!("text of {}", name)),
            page_count: Some(1),
        }
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let store = MemoryStore::new();
        let doc = store.insert_document(new_document("a.pdf")).await.unwrap();
        assert_eq!(doc.document_status(), DocumentStatus::Uploading);
        assert!(doc.extracted_at.is_some());

        let doc = store
            .set_document_status(doc.id, DocumentStatus::Processed, None)
            .await
            .unwrap();
        assert_eq!(doc.document_status(), DocumentStatus::Processed);

        let missing = store
            .set_document_status(Uuid::new_v4(), DocumentStatus::Error, None)
            .await;
        assert!(matches!(missing, Err(AppError::DocumentNotFound { .. })));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_single_row() {
        let store = MemoryStore::new();
        let doc = store.insert_document(new_document("a.pdf")).await.unwrap();

        let mut fields = ContractFields::unspecified();
        store
            .upsert_analysis(doc.id, &fields, 70, ExtractionStrategy::Auto)
            .await
            .unwrap();

        fields.set(ContractField::GoverningLaw, "Delaware");
        store
            .upsert_analysis(doc.id, &fields, 73, ExtractionStrategy::KeyValue)
            .await
            .unwrap();

        let analysis = store.find_analysis(doc.id).await.unwrap().unwrap();
        assert_eq!(analysis.score(), 73);
        assert_eq!(analysis.fields().governing_law, "Delaware");
        assert_eq!(analysis.fields().arbitration, NOT_SPECIFIED);
        assert_eq!(analysis.extraction_strategy(), ExtractionStrategy::KeyValue);
    }

    #[tokio::test]
    async fn test_recent_is_most_recent_first() {
        let store = MemoryStore::new();
        let first = store.insert_document(new_document("first.pdf")).await.unwrap();
        let second = store.insert_document(new_document("second.pdf")).await.unwrap();

        let recent = store.recent_analyzed(10).await.unwrap();
        assert_eq!(recent[0].0.id, second.id);
        assert_eq!(recent[1].0.id, first.id);
        assert!(recent[0].1.is_none());

        assert_eq!(store.recent_documents(1).await.unwrap().len(), 1);

        let selected = store.analyzed_by_ids(&[first.id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0.id, first.id);
    }

    #[tokio::test]
    async fn test_similar_chunks_ranks_and_filters() {
        let store = MemoryStore::new();
        let a = store.insert_document(new_document("a.pdf")).await.unwrap();
        let b = store.insert_document(new_document("b.pdf")).await.unwrap();

        store
            .replace_chunks(
                a.id,
                vec![NewChunk { index: 0, content: "alpha".into(), embedding: vec![1.0, 0.0] }],
                "mock",
            )
            .await
            .unwrap();
        store
            .replace_chunks(
                b.id,
                vec![NewChunk { index: 0, content: "beta".into(), embedding: vec![0.0, 1.0] }],
                "mock",
            )
            .await
            .unwrap();

        let hits = store.similar_chunks(&[0.9, 0.1], 2, None).await.unwrap();
        assert_eq!(hits[0].document_id, a.id);
        assert_eq!(hits[0].document_name, "a.pdf");

        let filtered = store
            .similar_chunks(&[0.9, 0.1], 2, Some(&[b.id]))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].content, "beta");

        store.replace_chunks(a.id, vec![], "mock").await.unwrap();
        assert_eq!(store.count_chunks(a.id).await.unwrap(), 0);
        assert_eq!(store.count_chunks(b.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_chat_history_is_chronological() {
        let store = MemoryStore::new();
        store.append_chat_message(ChatRole::User, "one").await.unwrap();
        store.append_chat_message(ChatRole::Assistant, "two").await.unwrap();
        store.append_chat_message(ChatRole::User, "three").await.unwrap();

        let last_two = store.recent_chat_messages(2).await.unwrap();
        let contents: Vec<_> = last_two.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three"]);
        assert_eq!(last_two[0].chat_role(), ChatRole::Assistant);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }
}
