//! Comparison handlers

use axum::{
    extract::{Query, State},
    Json,
};
use contractforge_common::{
    analysis::comparison::{Comparison, ComparisonTable, ComparisonView, ContractCard},
    errors::Result,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ComparisonQuery {
    pub limit: Option<u64>,
    #[serde(default)]
    pub view: ComparisonView,
}

/// Compare an explicit selection of documents
#[derive(Debug, Deserialize, Validate)]
pub struct CompareRequest {
    #[validate(length(min = 1, message = "at least one document id is required"))]
    pub document_ids: Vec<Uuid>,

    #[serde(default)]
    pub view: ComparisonView,
}

/// One rendering of the comparison; only the requested view is filled
#[derive(Debug, Serialize)]
pub struct ComparisonResponse {
    pub view: ComparisonView,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<ComparisonTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<ContractCard>>,
}

impl ComparisonResponse {
    fn render(comparison: &Comparison, view: ComparisonView) -> Self {
        let (table, cards) = match view {
            ComparisonView::Table => (Some(comparison.table()), None),
            ComparisonView::Cards => (None, Some(comparison.cards())),
        };

        Self {
            view,
            total: comparison.len(),
            table,
            cards,
        }
    }
}

/// The most recent documents, newest first
pub async fn recent_comparison(
    State(state): State<AppState>,
    Query(query): Query<ComparisonQuery>,
) -> Result<Json<ComparisonResponse>> {
    let comparison = state.comparison.recent(query.limit).await?;
    Ok(Json(ComparisonResponse::render(&comparison, query.view)))
}

pub async fn compare(
    State(state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<ComparisonResponse>> {
    request.validate()?;

    let comparison = state.comparison.compare(&request.document_ids).await?;
    Ok(Json(ComparisonResponse::render(&comparison, request.view)))
}
