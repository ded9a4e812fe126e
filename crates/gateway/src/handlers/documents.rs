//! Document handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, FixedOffset};
use contractforge_common::{
    analysis::{ContractFields, ExtractionStrategy},
    db::models::{ContractAnalysis, Document, DocumentStatus},
    errors::{AppError, Result},
};
use contractforge_ingestion::ItemReport;
use serde::Serialize;
use uuid::Uuid;

use super::LimitQuery;
use crate::AppState;

/// Document row without its extracted text
#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub name: String,
    pub status: DocumentStatus,
    pub size_bytes: i64,
    pub page_count: Option<i32>,
    pub created_at: DateTime<FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Document> for DocumentSummary {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id,
            name: document.original_name.clone(),
            status: document.document_status(),
            size_bytes: document.size_bytes,
            page_count: document.page_count,
            created_at: document.created_at,
            error: document.error_message.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub fields: ContractFields,
    pub score: u8,
    pub strategy: ExtractionStrategy,
    pub edited_at: DateTime<FixedOffset>,
}

impl From<ContractAnalysis> for AnalysisResponse {
    fn from(analysis: ContractAnalysis) -> Self {
        Self {
            fields: analysis.fields(),
            score: analysis.score(),
            strategy: analysis.extraction_strategy(),
            edited_at: analysis.edited_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: DocumentSummary,
    pub text_preview: String,
    pub analysis: Option<AnalysisResponse>,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
    pub total: usize,
}

/// Most recent documents first
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<DocumentListResponse>> {
    let limit = state.comparison.effective_limit(query.limit);
    let documents: Vec<DocumentSummary> = state
        .store
        .recent_documents(limit)
        .await?
        .iter()
        .map(DocumentSummary::from)
        .collect();

    Ok(Json(DocumentListResponse {
        total: documents.len(),
        documents,
    }))
}

/// One document with its stored analysis, if any
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>> {
    let document = state
        .store
        .find_document(id)
        .await?
        .ok_or_else(|| AppError::DocumentNotFound { id: id.to_string() })?;

    let analysis = state.store.find_analysis(id).await?;
    let preview_chars = state.config.upload.preview_chars;

    Ok(Json(DocumentResponse {
        document: DocumentSummary::from(&document),
        text_preview: document.text().chars().take(preview_chars).collect(),
        analysis: analysis.map(AnalysisResponse::from),
    }))
}

/// Stored analysis of one document
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>> {
    if state.store.find_document(id).await?.is_none() {
        return Err(AppError::DocumentNotFound { id: id.to_string() });
    }

    let analysis = state
        .store
        .find_analysis(id)
        .await?
        .ok_or_else(|| AppError::AnalysisNotFound { id: id.to_string() })?;

    Ok(Json(AnalysisResponse::from(analysis)))
}

/// Re-run analysis and indexing for a stored document
pub async fn reprocess_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemReport>> {
    let report = state.processor.reprocess(id).await?;
    Ok(Json(report))
}
