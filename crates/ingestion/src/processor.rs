//! Upload processor
//!
//! Runs each uploaded PDF through extraction, storage, analysis and
//! indexing, one file at a time in submission order.

use crate::chunker::{chunk_text, ChunkingConfig};
use crate::errors::IngestionError;
use crate::pdf::{extract_pdf, ExtractedPdf};
use contractforge_common::analysis::{Analysis, ContractAnalyzer, ContractFields};
use contractforge_common::config::UploadConfig;
use contractforge_common::db::models::{Document, DocumentStatus};
use contractforge_common::db::{ContractStore, NewChunk, NewDocument};
use contractforge_common::embeddings::Embedder;
use contractforge_common::errors::AppError;
use contractforge_common::metrics::{record_analysis, record_embedding, record_upload_item};
use contractforge_common::storage::{storage_name, ObjectStore};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// One file as received from a client
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes,
        }
    }

    /// Read a file from disk
    pub async fn from_path(path: &Path) -> Result<Self, IngestionError> {
        if !path.exists() {
            return Err(IngestionError::FileNotFound(path.display().to_string()));
        }
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.pdf".to_string());
        Ok(Self::new(name, None, bytes))
    }

    fn looks_like_pdf(&self) -> bool {
        self.name.to_lowercase().ends_with(".pdf")
            || self
                .content_type
                .as_deref()
                .map_or(false, |ct| ct.eq_ignore_ascii_case(PDF_CONTENT_TYPE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Done,
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Done => "done",
            ItemStatus::Error => "error",
        }
    }
}

/// Outcome for one uploaded file
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub file_name: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ContractFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemReport {
    fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            status: ItemStatus::Error,
            document_id: None,
            locator: None,
            page_count: None,
            score: None,
            fields: None,
            chunks: None,
            text_preview: None,
            error: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == ItemStatus::Done
    }
}

/// Per-file outcomes in submission order
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    fn new(items: Vec<ItemReport>) -> Self {
        let succeeded = items.iter().filter(|i| i.is_done()).count();
        Self {
            failed: items.len() - succeeded,
            succeeded,
            items,
        }
    }
}

/// Upload processor
pub struct UploadProcessor {
    store: Arc<dyn ContractStore>,
    objects: Arc<dyn ObjectStore>,
    embedder: Arc<dyn Embedder>,
    analyzer: Arc<ContractAnalyzer>,
    config: UploadConfig,
    chunking: ChunkingConfig,
}

impl UploadProcessor {
    pub fn new(
        store: Arc<dyn ContractStore>,
        objects: Arc<dyn ObjectStore>,
        embedder: Arc<dyn Embedder>,
        analyzer: Arc<ContractAnalyzer>,
        config: UploadConfig,
    ) -> Self {
        let chunking = ChunkingConfig {
            chunk_size: config.chunk_size,
        };
        Self {
            store,
            objects,
            embedder,
            analyzer,
            config,
            chunking,
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Process a batch of 1..=max_files files, strictly in order.
    /// Batch-level violations reject everything; file-level failures
    /// become error items and the rest continue.
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn process_batch(&self, files: Vec<UploadFile>) -> Result<BatchReport, AppError> {
        if files.is_empty() {
            return Err(AppError::MissingField {
                field: "files".to_string(),
            });
        }
        if files.len() > self.config.max_files {
            return Err(AppError::TooManyFiles {
                count: files.len(),
                limit: self.config.max_files,
            });
        }

        let mut items = Vec::with_capacity(files.len());
        for file in files {
            items.push(self.process_file(file).await);
        }

        let report = BatchReport::new(items);
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "Upload batch processed"
        );
        Ok(report)
    }

    /// Run a batch on its own task and wait for it. Dropping the returned
    /// future does not cancel the batch, so every stored document still
    /// settles to processed or error.
    pub async fn submit_batch(
        self: Arc<Self>,
        files: Vec<UploadFile>,
    ) -> Result<BatchReport, AppError> {
        tokio::spawn(async move { self.process_batch(files).await })
            .await
            .map_err(|e| AppError::Internal {
                message: format!("Upload task failed: {}", e),
            })?
    }

    /// Process one file; failures are reported in the item, never returned
    #[instrument(skip(self, file), fields(file = %file.name, size = file.bytes.len()))]
    pub async fn process_file(&self, file: UploadFile) -> ItemReport {
        let start = Instant::now();
        let mut report = ItemReport::new(&file.name);

        match self.ingest(file, &mut report).await {
            Ok(()) => {
                report.status = ItemStatus::Done;
                info!(document_id = ?report.document_id, score = ?report.score, "File processed");
            }
            Err(e) => {
                report.status = ItemStatus::Error;
                report.error = Some(e.to_string());
                error!(error = %e, document_id = ?report.document_id, "Failed to process file");
            }
        }

        record_upload_item(
            start.elapsed().as_secs_f64(),
            report.status.as_str(),
            report.chunks.unwrap_or(0),
        );
        report
    }

    async fn ingest(&self, file: UploadFile, report: &mut ItemReport) -> Result<(), IngestionError> {
        self.validate(&file)?;

        let UploadFile { name, bytes, .. } = file;
        let (bytes, extracted) = extract_blocking(bytes, name.clone()).await?;
        report.page_count = Some(extracted.page_count);
        report.text_preview = Some(extracted.text.chars().take(self.config.preview_chars).collect());

        let object_name = storage_name(&name, chrono::Utc::now().timestamp_millis());
        let locator = self.objects.put(&object_name, &bytes).await?;
        report.locator = Some(locator.clone());

        let inserted = self
            .store
            .insert_document(NewDocument {
                original_name: name,
                storage_locator: locator.clone(),
                size_bytes: bytes.len() as i64,
                raw_text: Some(extracted.text),
                page_count: Some(extracted.page_count as i32),
            })
            .await;
        let document = match inserted {
            Ok(document) => document,
            Err(e) => {
                // no row points at the object any more
                if let Err(delete_err) = self.objects.delete(&locator).await {
                    warn!(error = %delete_err, locator = %locator, "Failed to remove orphaned object");
                }
                report.locator = None;
                return Err(e.into());
            }
        };
        report.document_id = Some(document.id);

        self.finish(&document, document.text(), report).await
    }

    fn validate(&self, file: &UploadFile) -> Result<(), IngestionError> {
        let reject = |reason: String| IngestionError::Rejected {
            name: file.name.clone(),
            reason,
        };

        if !file.looks_like_pdf() {
            return Err(reject("only PDF files are accepted".to_string()));
        }
        if file.bytes.is_empty() {
            return Err(reject("file is empty".to_string()));
        }
        if file.bytes.len() > self.config.max_file_size {
            return Err(reject(format!(
                "file is {} bytes, limit is {} bytes",
                file.bytes.len(),
                self.config.max_file_size
            )));
        }
        Ok(())
    }

    /// Analyse, persist and index a stored document, then settle its status
    async fn finish(
        &self,
        document: &Document,
        text: &str,
        report: &mut ItemReport,
    ) -> Result<(), IngestionError> {
        match self.analyze_and_index(document.id, text).await {
            Ok((analysis, chunks)) => {
                self.store
                    .set_document_status(document.id, DocumentStatus::Processed, None)
                    .await?;
                report.score = Some(analysis.score);
                report.fields = Some(analysis.fields);
                report.chunks = Some(chunks);
                Ok(())
            }
            Err(e) => {
                if let Err(mark_err) = self
                    .store
                    .set_document_status(document.id, DocumentStatus::Error, Some(e.to_string()))
                    .await
                {
                    warn!(error = %mark_err, document_id = %document.id, "Failed to mark document as errored");
                }
                Err(e)
            }
        }
    }

    async fn analyze_and_index(
        &self,
        document_id: Uuid,
        text: &str,
    ) -> Result<(Analysis, usize), IngestionError> {
        let analysis = self.analyzer.analyze(text);
        record_analysis(analysis.strategy.as_str(), analysis.score);

        self.store
            .upsert_analysis(document_id, &analysis.fields, analysis.score, analysis.strategy)
            .await?;

        let chunks = self.embed_chunks(text).await?;
        let count = self
            .store
            .replace_chunks(document_id, chunks, self.embedder.model_name())
            .await?;

        Ok((analysis, count))
    }

    async fn embed_chunks(&self, text: &str) -> Result<Vec<NewChunk>, IngestionError> {
        let chunks = chunk_text(text, &self.chunking);
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let start = Instant::now();
        let embeddings = self.embedder.embed_batch(&texts).await;
        record_embedding(
            start.elapsed().as_secs_f64(),
            self.embedder.model_name(),
            embeddings.is_ok(),
        );
        let embeddings = embeddings?;

        if embeddings.len() != chunks.len() {
            return Err(AppError::EmbeddingError {
                message: format!(
                    "Expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                ),
            }
            .into());
        }

        Ok(chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| NewChunk {
                index: chunk.index,
                content: chunk.content,
                embedding,
            })
            .collect())
    }

    /// Re-run analysis and indexing for a stored document. Text comes from
    /// the document row, or from the stored PDF when extraction never finished.
    #[instrument(skip(self))]
    pub async fn reprocess(&self, document_id: Uuid) -> Result<ItemReport, AppError> {
        let document = self
            .store
            .find_document(document_id)
            .await?
            .ok_or_else(|| AppError::DocumentNotFound {
                id: document_id.to_string(),
            })?;

        let start = Instant::now();
        let mut report = ItemReport::new(&document.original_name);
        report.document_id = Some(document.id);
        report.locator = Some(document.storage_locator.clone());
        report.page_count = document.page_count.map(|p| p as usize);

        let text = match document.raw_text.clone() {
            Some(text) if !text.is_empty() => text,
            _ => {
                let bytes = self.objects.get(&document.storage_locator).await?;
                let (_, extracted) = extract_blocking(bytes, document.original_name.clone()).await?;
                report.page_count = Some(extracted.page_count);
                extracted.text
            }
        };
        report.text_preview = Some(text.chars().take(self.config.preview_chars).collect());

        match self.finish(&document, &text, &mut report).await {
            Ok(()) => report.status = ItemStatus::Done,
            Err(e) => {
                report.status = ItemStatus::Error;
                report.error = Some(e.to_string());
            }
        }

        record_upload_item(
            start.elapsed().as_secs_f64(),
            report.status.as_str(),
            report.chunks.unwrap_or(0),
        );
        info!(status = report.status.as_str(), "Document reprocessed");
        Ok(report)
    }

    /// Process every PDF in a directory, in file-name order
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn process_directory(&self, dir: &Path) -> Result<Vec<ItemReport>, IngestionError> {
        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path
                .extension()
                .map_or(false, |e| e.eq_ignore_ascii_case("pdf"))
            {
                paths.push(path);
            }
        }
        paths.sort();

        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            let file = UploadFile::from_path(&path).await?;
            reports.push(self.process_file(file).await);
        }

        info!(total = reports.len(), "Directory processing complete");
        Ok(reports)
    }
}

/// Run PDF parsing off the async workers; hands the bytes back
async fn extract_blocking(
    bytes: Vec<u8>,
    name: String,
) -> Result<(Vec<u8>, ExtractedPdf), IngestionError> {
    let (bytes, result) = tokio::task::spawn_blocking(move || {
        let result = extract_pdf(&bytes, &name);
        (bytes, result)
    })
    .await
    .map_err(|e| AppError::Internal {
        message: format!("PDF extraction task failed: {}", e),
    })?;

    Ok((bytes, result?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::render_text_pdf;
    use async_trait::async_trait;
    use contractforge_common::analysis::comparison::{ComparisonService, ScoreCell};
    use contractforge_common::analysis::ExtractionStrategy;
    use contractforge_common::config::ComparisonConfig;
    use contractforge_common::db::models::{ChatMessage, ChatRole, ContractAnalysis};
    use contractforge_common::db::{AnalyzedDocument, ChunkMatch, MemoryStore};
    use std::time::Duration;
    use contractforge_common::embeddings::MockEmbedder;
    use contractforge_common::errors::Result as AppResult;
    use contractforge_common::storage::MemoryObjectStore;

    /// Fails every put whose name contains `needle`
    struct FlakyObjectStore {
        inner: MemoryObjectStore,
        needle: &'static str,
    }

    #[async_trait]
    impl ObjectStore for FlakyObjectStore {
        async fn put(&self, name: &str, bytes: &[u8]) -> AppResult<String> {
            if name.contains(self.needle) {
                return Err(AppError::Storage {
                    message: "bucket unavailable".to_string(),
                });
            }
            self.inner.put(name, bytes).await
        }

        async fn get(&self, locator: &str) -> AppResult<Vec<u8>> {
            self.inner.get(locator).await
        }

        async fn delete(&self, locator: &str) -> AppResult<()> {
            self.inner.delete(locator).await
        }
    }

    /// Memory store whose document inserts always fail
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl ContractStore for ReadOnlyStore {
        async fn ping(&self) -> AppResult<()> {
            self.inner.ping().await
        }
        async fn insert_document(&self, _document: NewDocument) -> AppResult<Document> {
            Err(AppError::DatabaseConnection {
                message: "primary is read-only".to_string(),
            })
        }
        async fn set_document_status(
            &self,
            id: Uuid,
            status: DocumentStatus,
            error_message: Option<String>,
        ) -> AppResult<Document> {
            self.inner.set_document_status(id, status, error_message).await
        }
        async fn find_document(&self, id: Uuid) -> AppResult<Option<Document>> {
            self.inner.find_document(id).await
        }
        async fn recent_documents(&self, limit: u64) -> AppResult<Vec<Document>> {
            self.inner.recent_documents(limit).await
        }
        async fn upsert_analysis(
            &self,
            document_id: Uuid,
            fields: &ContractFields,
            score: u8,
            strategy: ExtractionStrategy,
        ) -> AppResult<ContractAnalysis> {
            self.inner.upsert_analysis(document_id, fields, score, strategy).await
        }
        async fn find_analysis(&self, document_id: Uuid) -> AppResult<Option<ContractAnalysis>> {
            self.inner.find_analysis(document_id).await
        }
        async fn recent_analyzed(&self, limit: u64) -> AppResult<Vec<AnalyzedDocument>> {
            self.inner.recent_analyzed(limit).await
        }
        async fn analyzed_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<AnalyzedDocument>> {
            self.inner.analyzed_by_ids(ids).await
        }
        async fn replace_chunks(
            &self,
            document_id: Uuid,
            chunks: Vec<NewChunk>,
            embedding_model: &str,
        ) -> AppResult<usize> {
            self.inner.replace_chunks(document_id, chunks, embedding_model).await
        }
        async fn count_chunks(&self, document_id: Uuid) -> AppResult<u64> {
            self.inner.count_chunks(document_id).await
        }
        async fn similar_chunks(
            &self,
            embedding: &[f32],
            limit: usize,
            document_ids: Option<&[Uuid]>,
        ) -> AppResult<Vec<ChunkMatch>> {
            self.inner.similar_chunks(embedding, limit, document_ids).await
        }
        async fn append_chat_message(&self, role: ChatRole, content: &str) -> AppResult<ChatMessage> {
            self.inner.append_chat_message(role, content).await
        }
        async fn recent_chat_messages(&self, limit: u64) -> AppResult<Vec<ChatMessage>> {
            self.inner.recent_chat_messages(limit).await
        }
    }

    /// Embeds correctly after a fixed delay
    struct SlowEmbedder {
        inner: MockEmbedder,
        delay: Duration,
    }

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
            tokio::time::sleep(self.delay).await;
            self.inner.embed(text).await
        }
        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            tokio::time::sleep(self.delay).await;
            self.inner.embed_batch(texts).await
        }
        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _text: &str) -> AppResult<Vec<f32>> {
            Err(AppError::EmbeddingError { message: "quota exceeded".to_string() })
        }
        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Err(AppError::EmbeddingError { message: "quota exceeded".to_string() })
        }
        fn model_name(&self) -> &str {
            "broken"
        }
        fn dimension(&self) -> usize {
            4
        }
    }

    fn contract_pdf(lines: &[&str]) -> Vec<u8> {
        render_text_pdf(&[lines.iter().map(|s| s.to_string()).collect()]).unwrap()
    }

    fn pdf_file(name: &str, lines: &[&str]) -> UploadFile {
        UploadFile::new(name, Some("application/pdf".to_string()), contract_pdf(lines))
    }

    fn processor_with(
        store: Arc<dyn ContractStore>,
        objects: Arc<dyn ObjectStore>,
        embedder: Arc<dyn Embedder>,
    ) -> UploadProcessor {
        UploadProcessor::new(
            store,
            objects,
            embedder,
            Arc::new(ContractAnalyzer::default()),
            UploadConfig::default(),
        )
    }

    fn processor(store: Arc<MemoryStore>) -> UploadProcessor {
        processor_with(
            store,
            Arc::new(MemoryObjectStore::new()),
            Arc::new(MockEmbedder::new(32)),
        )
    }

    #[tokio::test]
    async fn test_single_file_is_processed() {
        let store = Arc::new(MemoryStore::new());
        let processor = processor(store.clone());

        let report = processor
            .process_batch(vec![pdf_file(
                "Supply Agreement.pdf",
                &["Contract Number: 7", "Payment Terms: Net 30 days"],
            )])
            .await
            .unwrap();

        assert_eq!(report.succeeded, 1);
        let item = &report.items[0];
        assert_eq!(item.status, ItemStatus::Done);
        assert_eq!(item.page_count, Some(1));
        assert!(item.score.unwrap() >= 75);
        assert_eq!(item.fields.as_ref().unwrap().payment_terms, "Net 30 days");
        assert!(item.locator.as_ref().unwrap().ends_with("-Supply_Agreement.pdf"));
        assert_eq!(
            item.text_preview.as_deref(),
            Some("Contract Number: 7\nPayment Terms: Net 30 days")
        );

        let document_id = item.document_id.unwrap();
        let document = store.find_document(document_id).await.unwrap().unwrap();
        assert_eq!(document.document_status(), DocumentStatus::Processed);
        assert_eq!(store.count_chunks(document_id).await.unwrap(), 1);
        assert!(store.find_analysis(document_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_storage_failure_in_middle_of_batch() {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(FlakyObjectStore {
            inner: MemoryObjectStore::new(),
            needle: "broken",
        });
        let processor = processor_with(store.clone(), objects, Arc::new(MockEmbedder::new(32)));

        let report = processor
            .process_batch(vec![
                pdf_file("first.pdf", &["Governing Law: Texas"]),
                pdf_file("broken.pdf", &["Arbitration: ICC"]),
                pdf_file("third.pdf", &["Effective Date: 2024-01-01"]),
            ])
            .await
            .unwrap();

        let statuses: Vec<_> = report.items.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![ItemStatus::Done, ItemStatus::Error, ItemStatus::Done]
        );
        assert!(report.items[1].document_id.is_none());
        assert!(report.items[1].error.as_ref().unwrap().contains("bucket unavailable"));
        assert_eq!((report.succeeded, report.failed), (2, 1));

        let comparison = ComparisonService::new(store, ComparisonConfig::default())
            .recent(None)
            .await
            .unwrap();
        assert_eq!(comparison.len(), 2);
        let names: Vec<_> = comparison.contracts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["third.pdf", "first.pdf"]);
        assert!(comparison
            .contracts
            .iter()
            .all(|c| matches!(c.score, ScoreCell::Scored(_))));
    }

    #[tokio::test]
    async fn test_batch_size_policy() {
        let processor = processor(Arc::new(MemoryStore::new()));

        assert!(matches!(
            processor.process_batch(vec![]).await,
            Err(AppError::MissingField { .. })
        ));

        let files = (0..6)
            .map(|i| pdf_file(&format!("{}.pdf", i), &["Arbitration: AAA"]))
            .collect();
        assert!(matches!(
            processor.process_batch(files).await,
            Err(AppError::TooManyFiles { count: 6, limit: 5 })
        ));
    }

    #[tokio::test]
    async fn test_invalid_files_become_error_items() {
        let store = Arc::new(MemoryStore::new());
        let processor = UploadProcessor::new(
            store.clone(),
            Arc::new(MemoryObjectStore::new()),
            Arc::new(MockEmbedder::new(32)),
            Arc::new(ContractAnalyzer::default()),
            UploadConfig {
                max_file_size: 64,
                ..UploadConfig::default()
            },
        );

        let report = processor
            .process_batch(vec![
                UploadFile::new("notes.txt", Some("text/plain".to_string()), b"hello".to_vec()),
                UploadFile::new("empty.pdf", None, Vec::new()),
                pdf_file("large.pdf", &["Arbitration: AAA"]),
                UploadFile::new("scan", Some("application/pdf".to_string()), b"garbage".to_vec()),
            ])
            .await
            .unwrap();

        assert_eq!(report.failed, 4);
        assert!(report.items[0].error.as_ref().unwrap().contains("only PDF"));
        assert!(report.items[1].error.as_ref().unwrap().contains("empty"));
        assert!(report.items[2].error.as_ref().unwrap().contains("limit is 64 bytes"));
        assert!(report.items[3].error.as_ref().unwrap().contains("PDF parse error"));
        assert!(store.recent_documents(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_indexing_failure_marks_document_error() {
        let store = Arc::new(MemoryStore::new());
        let processor = processor_with(
            store.clone(),
            Arc::new(MemoryObjectStore::new()),
            Arc::new(BrokenEmbedder),
        );

        let item = processor
            .process_file(pdf_file("msa.pdf", &["Governing Law: Ontario"]))
            .await;

        assert_eq!(item.status, ItemStatus::Error);
        let document = store
            .find_document(item.document_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(document.document_status(), DocumentStatus::Error);
        assert!(document.error_message.unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_reprocess_recovers_errored_document() {
        let store = Arc::new(MemoryStore::new());
        let objects: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());

        let failing = processor_with(store.clone(), objects.clone(), Arc::new(BrokenEmbedder));
        let item = failing
            .process_file(pdf_file("msa.pdf", &["Payment Terms: Net 30"]))
            .await;
        let document_id = item.document_id.unwrap();

        let healthy = processor_with(store.clone(), objects, Arc::new(MockEmbedder::new(32)));
        let report = healthy.reprocess(document_id).await.unwrap();

        assert_eq!(report.status, ItemStatus::Done);
        assert_eq!(report.fields.unwrap().payment_terms, "Net 30");
        let document = store.find_document(document_id).await.unwrap().unwrap();
        assert_eq!(document.document_status(), DocumentStatus::Processed);
        assert!(document.error_message.is_none());

        assert!(matches!(
            healthy.reprocess(Uuid::new_v4()).await,
            Err(AppError::DocumentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_process_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), contract_pdf(&["Arbitration: AAA"])).unwrap();
        std::fs::write(dir.path().join("a.PDF"), contract_pdf(&["Governing Law: Texas"])).unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"skip me").unwrap();

        let processor = processor(Arc::new(MemoryStore::new()));
        let reports = processor.process_directory(dir.path()).await.unwrap();

        let names: Vec<_> = reports.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
        assert!(reports.iter().all(ItemReport::is_done));
    }

    #[tokio::test]
    async fn test_submitted_batch_settles_after_caller_gives_up() {
        let store = Arc::new(MemoryStore::new());
        let embedder = Arc::new(SlowEmbedder {
            inner: MockEmbedder::new(32),
            delay: Duration::from_millis(300),
        });
        let processor = Arc::new(processor_with(
            store.clone(),
            Arc::new(MemoryObjectStore::new()),
            embedder,
        ));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            processor
                .clone()
                .submit_batch(vec![pdf_file("slow.pdf", &["Governing Law: Texas"])]),
        )
        .await;
        assert!(abandoned.is_err());

        let mut settled = None;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let documents = store.recent_documents(10).await.unwrap();
            if let Some(document) = documents.first() {
                if document.document_status() != DocumentStatus::Uploading {
                    settled = Some(document.clone());
                    break;
                }
            }
        }

        let document = settled.expect("document never left uploading");
        assert_eq!(document.document_status(), DocumentStatus::Processed);
        assert_eq!(store.count_chunks(document.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_submit_batch_returns_report() {
        let processor = Arc::new(processor(Arc::new(MemoryStore::new())));
        let report = processor
            .submit_batch(vec![pdf_file("msa.pdf", &["Arbitration: AAA"])])
            .await
            .unwrap();
        assert_eq!(report.succeeded, 1);
    }

    #[tokio::test]
    async fn test_failed_insert_removes_stored_object() {
        let objects = Arc::new(MemoryObjectStore::new());
        let processor = processor_with(
            Arc::new(ReadOnlyStore {
                inner: MemoryStore::new(),
            }),
            objects.clone(),
            Arc::new(MockEmbedder::new(32)),
        );

        let item = processor
            .process_file(pdf_file("msa.pdf", &["Governing Law: Ontario"]))
            .await;

        assert_eq!(item.status, ItemStatus::Error);
        assert!(item.error.as_ref().unwrap().contains("read-only"));
        assert!(item.document_id.is_none());
        assert!(item.locator.is_none());
        assert_eq!(objects.len().await, 0);
    }
}
