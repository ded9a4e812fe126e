//! Side-by-side comparison of stored analyses
//!
//! Documents without an analysis still appear, with sentinel fields and a
//! `"N/A"` score.

use super::fields::{ContractField, ContractFields};
use crate::config::ComparisonConfig;
use crate::db::models::{ContractAnalysis, Document};
use crate::db::ContractStore;
use crate::errors::{AppError, Result};
use crate::metrics::record_comparison;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Placeholder shown for documents that were never analysed
pub const SCORE_PLACEHOLDER: &str = "N/A";

/// A score, or the placeholder when there is no analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreCell {
    Scored(u8),
    NotAvailable,
}

impl fmt::Display for ScoreCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreCell::Scored(score) => write!(f, "{}", score),
            ScoreCell::NotAvailable => f.write_str(SCORE_PLACEHOLDER),
        }
    }
}

impl Serialize for ScoreCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ScoreCell::Scored(score) => serializer.serialize_u8(*score),
            ScoreCell::NotAvailable => serializer.serialize_str(SCORE_PLACEHOLDER),
        }
    }
}

/// How the comparison is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonView {
    #[default]
    Table,
    Cards,
}

/// One document as it takes part in a comparison
#[derive(Debug, Clone, Serialize)]
pub struct ComparedContract {
    pub document_id: Uuid,
    pub name: String,
    pub status: String,
    pub created_at: DateTime<FixedOffset>,
    pub score: ScoreCell,
    pub fields: ContractFields,
}

impl ComparedContract {
    pub fn new(document: Document, analysis: Option<ContractAnalysis>) -> Self {
        let (fields, score) = match analysis {
            Some(analysis) => (analysis.fields(), ScoreCell::Scored(analysis.score())),
            None => (ContractFields::unspecified(), ScoreCell::NotAvailable),
        };

        Self {
            document_id: document.id,
            name: document.original_name,
            status: document.status,
            created_at: document.created_at,
            score,
            fields,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableColumn {
    pub document_id: Uuid,
    pub name: String,
}

/// One criterion across every compared document
#[derive(Debug, Clone, Serialize)]
pub struct TableRow {
    pub criterion: String,
    pub label: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonTable {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContractCard {
    pub document_id: Uuid,
    pub name: String,
    pub score: ScoreCell,
    pub fields: Vec<CardField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardField {
    pub criterion: String,
    pub label: String,
    pub value: String,
}

/// Compared documents, most recent first
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub contracts: Vec<ComparedContract>,
}

impl Comparison {
    pub fn assemble(rows: Vec<(Document, Option<ContractAnalysis>)>) -> Self {
        Self {
            contracts: rows
                .into_iter()
                .map(|(document, analysis)| ComparedContract::new(document, analysis))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Criteria as rows, documents as columns, score row last
    pub fn table(&self) -> ComparisonTable {
        let columns = self
            .contracts
            .iter()
            .map(|c| TableColumn {
                document_id: c.document_id,
                name: c.name.clone(),
            })
            .collect();

        let mut rows: Vec<TableRow> = ContractField::COMPARISON_ORDER
            .into_iter()
            .map(|field| TableRow {
                criterion: field.key().to_string(),
                label: field.label().to_string(),
                values: self
                    .contracts
                    .iter()
                    .map(|c| c.fields.get(field).to_string())
                    .collect(),
            })
            .collect();

        rows.push(TableRow {
            criterion: "score".to_string(),
            label: "Score".to_string(),
            values: self.contracts.iter().map(|c| c.score.to_string()).collect(),
        });

        ComparisonTable { columns, rows }
    }

    pub fn cards(&self) -> Vec<ContractCard> {
        self.contracts
            .iter()
            .map(|c| ContractCard {
                document_id: c.document_id,
                name: c.name.clone(),
                score: c.score,
                fields: ContractField::COMPARISON_ORDER
                    .into_iter()
                    .map(|field| CardField {
                        criterion: field.key().to_string(),
                        label: field.label().to_string(),
                        value: c.fields.get(field).to_string(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Read-side service behind the comparison view
#[derive(Clone)]
pub struct ComparisonService {
    store: Arc<dyn ContractStore>,
    config: ComparisonConfig,
}

impl ComparisonService {
    pub fn new(store: Arc<dyn ContractStore>, config: ComparisonConfig) -> Self {
        Self { store, config }
    }

    /// Effective limit: default when absent, clamped to `1..=max_limit`
    pub fn effective_limit(&self, limit: Option<u64>) -> u64 {
        limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit.max(1))
    }

    /// The most recent documents
    #[tracing::instrument(skip(self))]
    pub async fn recent(&self, limit: Option<u64>) -> Result<Comparison> {
        let limit = self.effective_limit(limit);
        let comparison = Comparison::assemble(self.store.recent_analyzed(limit).await?);

        record_comparison("recent", comparison.len());
        Ok(comparison)
    }

    /// An explicit selection of documents
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn compare(&self, ids: &[Uuid]) -> Result<Comparison> {
        if ids.is_empty() {
            return Err(AppError::Validation {
                message: "At least one document id is required".to_string(),
                field: Some("document_ids".to_string()),
            });
        }
        if ids.len() as u64 > self.config.max_limit {
            return Err(AppError::Validation {
                message: format!("At most {} documents can be compared", self.config.max_limit),
                field: Some("document_ids".to_string()),
            });
        }

        let comparison = Comparison::assemble(self.store.analyzed_by_ids(ids).await?);

        record_comparison("selected", comparison.len());
        Ok(comparison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ContractAnalyzer, NOT_SPECIFIED};
    use crate::db::{MemoryStore, NewDocument};

    async fn seed(store: &MemoryStore, name: &str, text: Option<&str>) -> Document {
        let document = store
            .insert_document(NewDocument {
                original_name: name.to_string(),
                storage_locator: format!("mem://{}", name),
                size_bytes: 10,
                raw_text: text.map(str::to_string),
                page_count: Some(1),
            })
            .await
            .unwrap();

        if let Some(text) = text {
            let analysis = ContractAnalyzer::default().analyze(text);
            store
                .upsert_analysis(document.id, &analysis.fields, analysis.score, analysis.strategy)
                .await
                .unwrap();
        }
        document
    }

    fn service(store: Arc<MemoryStore>) -> ComparisonService {
        ComparisonService::new(store, ComparisonConfig::default())
    }

    #[tokio::test]
    async fn test_persisted_analysis_reads_back_identically() {
        let store = Arc::new(MemoryStore::new());
        let text = "Effective Date: January 1, 2024\nPayment Terms: Net 30 days\nArbitration: Binding arbitration in Geneva";
        let expected = ContractAnalyzer::default().analyze(text);
        seed(&store, "msa.pdf", Some(text)).await;

        let comparison = service(store).recent(None).await.unwrap();
        assert_eq!(comparison.len(), 1);

        let contract = &comparison.contracts[0];
        assert_eq!(contract.fields, expected.fields);
        assert_eq!(contract.score, ScoreCell::Scored(expected.score));
    }

    #[tokio::test]
    async fn test_missing_analysis_uses_placeholders() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "scanned.pdf", None).await;

        let comparison = service(store).recent(None).await.unwrap();
        let contract = &comparison.contracts[0];
        assert_eq!(contract.score, ScoreCell::NotAvailable);
        assert_eq!(contract.fields, ContractFields::unspecified());

        let table = comparison.table();
        let score_row = table.rows.last().unwrap();
        assert_eq!(score_row.criterion, "score");
        assert_eq!(score_row.values, vec!["N/A".to_string()]);
        assert_eq!(
            serde_json::to_value(contract.score).unwrap(),
            serde_json::json!("N/A")
        );
    }

    #[tokio::test]
    async fn test_table_rows_follow_comparison_order() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "a.pdf", Some("Governing Law: Texas")).await;
        seed(&store, "b.pdf", Some("Payment Terms: Net 60")).await;

        let table = service(store).recent(None).await.unwrap().table();

        let criteria: Vec<_> = table.rows.iter().map(|r| r.criterion.as_str()).collect();
        assert_eq!(
            criteria,
            vec![
                "effective_date",
                "payment_terms",
                "late_penalty",
                "termination_clause",
                "confidentiality_clause",
                "arbitration",
                "delivery_timeline",
                "governing_law",
                "score",
            ]
        );

        // most recent first
        assert_eq!(table.columns[0].name, "b.pdf");
        assert_eq!(table.rows[1].values, vec!["Net 60".to_string(), NOT_SPECIFIED.to_string()]);
        assert_eq!(table.rows[7].values, vec![NOT_SPECIFIED.to_string(), "Texas".to_string()]);
    }

    #[tokio::test]
    async fn test_limit_defaults_and_clamps() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..12 {
            seed(&store, &format!("{}.pdf", i), Some("")).await;
        }
        let service = service(store);

        assert_eq!(service.recent(None).await.unwrap().len(), 10);
        assert_eq!(service.recent(Some(3)).await.unwrap().len(), 3);
        assert_eq!(service.recent(Some(0)).await.unwrap().len(), 1);
        assert_eq!(service.effective_limit(Some(500)), 50);
    }

    #[tokio::test]
    async fn test_compare_selected_ids() {
        let store = Arc::new(MemoryStore::new());
        let a = seed(&store, "a.pdf", Some("Arbitration: AAA")).await;
        seed(&store, "b.pdf", None).await;
        let c = seed(&store, "c.pdf", None).await;
        let service = service(store);

        let comparison = service.compare(&[a.id, c.id]).await.unwrap();
        let names: Vec<_> = comparison.contracts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["c.pdf", "a.pdf"]);

        let cards = comparison.cards();
        assert_eq!(cards[1].fields.len(), 8);
        assert_eq!(cards[1].fields[5].criterion, "arbitration");
        assert_eq!(cards[1].fields[5].value, "AAA");

        assert!(matches!(
            service.compare(&[]).await,
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_view_parses_lowercase() {
        let view: ComparisonView = serde_json::from_str("\"cards\"").unwrap();
        assert_eq!(view, ComparisonView::Cards);
        assert_eq!(ComparisonView::default(), ComparisonView::Table);
    }
}
