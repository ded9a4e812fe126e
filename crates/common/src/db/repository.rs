//! Repository pattern for database operations
//!
//! SeaORM entities for the relational tables, raw SQL where pgvector
//! types are involved.

use crate::analysis::{ContractFields, ExtractionStrategy};
use crate::db::models::*;
use crate::db::store::{AnalyzedDocument, ChunkMatch, ContractStore, NewChunk, NewDocument};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    DbErr, PaginatorTrait, QueryFilter, QueryOrder, QueryResult, QuerySelect, Set, Statement,
    TransactionTrait,
};
use uuid::Uuid;

/// Postgres-backed [`ContractStore`]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }
}

/// Decode one row of the similarity query
fn chunk_match(row: &QueryResult) -> std::result::Result<ChunkMatch, DbErr> {
    Ok(ChunkMatch {
        chunk_id: row.try_get("", "chunk_id")?,
        document_id: row.try_get("", "document_id")?,
        document_name: row.try_get("", "document_name")?,
        content: row.try_get("", "content")?,
        chunk_index: row.try_get("", "chunk_index")?,
        score: row.try_get("", "score")?,
    })
}

#[async_trait]
impl ContractStore for Repository {
    // ========================================================================
    // Health Check
    // ========================================================================

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Document Operations
    // ========================================================================

    async fn insert_document(&self, document: NewDocument) -> Result<Document> {
        let now = chrono::Utc::now();
        let extracted_at = document.raw_text.as_ref().map(|_| now.into());

        let model = DocumentActiveModel {
            id: Set(Uuid::new_v4()),
            original_name: Set(document.original_name),
            storage_locator: Set(document.storage_locator),
            status: Set(String::from(DocumentStatus::Uploading)),
            size_bytes: Set(document.size_bytes),
            raw_text: Set(document.raw_text),
            page_count: Set(document.page_count),
            extracted_at: Set(extracted_at),
            error_message: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    async fn set_document_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        error_message: Option<String>,
    ) -> Result<Document> {
        let mut document: DocumentActiveModel = DocumentEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::DocumentNotFound { id: id.to_string() })?
            .into();

        document.status = Set(String::from(status));
        document.error_message = Set(error_message);
        document.updated_at = Set(chrono::Utc::now().into());

        document.update(self.write_conn()).await.map_err(Into::into)
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>> {
        DocumentEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn recent_documents(&self, limit: u64) -> Result<Vec<Document>> {
        DocumentEntity::find()
            .order_by_desc(DocumentColumn::CreatedAt)
            .limit(limit)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Analysis Operations
    // ========================================================================

    async fn upsert_analysis(
        &self,
        document_id: Uuid,
        fields: &ContractFields,
        score: u8,
        strategy: ExtractionStrategy,
    ) -> Result<ContractAnalysis> {
        let analysis = ContractAnalysisActiveModel {
            document_id: Set(document_id),
            effective_date: Set(fields.effective_date.clone()),
            termination_clause: Set(fields.termination_clause.clone()),
            payment_terms: Set(fields.payment_terms.clone()),
            late_penalty: Set(fields.late_penalty.clone()),
            delivery_timeline: Set(fields.delivery_timeline.clone()),
            governing_law: Set(fields.governing_law.clone()),
            confidentiality_clause: Set(fields.confidentiality_clause.clone()),
            arbitration: Set(fields.arbitration.clone()),
            score: Set(i32::from(score)),
            strategy: Set(strategy.as_str().to_string()),
            edited_at: Set(chrono::Utc::now().into()),
        };

        let on_conflict = OnConflict::column(ContractAnalysisColumn::DocumentId)
            .update_columns([
                ContractAnalysisColumn::EffectiveDate,
                ContractAnalysisColumn::TerminationClause,
                ContractAnalysisColumn::PaymentTerms,
                ContractAnalysisColumn::LatePenalty,
                ContractAnalysisColumn::DeliveryTimeline,
                ContractAnalysisColumn::GoverningLaw,
                ContractAnalysisColumn::ConfidentialityClause,
                ContractAnalysisColumn::Arbitration,
                ContractAnalysisColumn::Score,
                ContractAnalysisColumn::Strategy,
                ContractAnalysisColumn::EditedAt,
            ])
            .to_owned();

        ContractAnalysisEntity::insert(analysis)
            .on_conflict(on_conflict)
            .exec_with_returning(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_analysis(&self, document_id: Uuid) -> Result<Option<ContractAnalysis>> {
        ContractAnalysisEntity::find_by_id(document_id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn recent_analyzed(&self, limit: u64) -> Result<Vec<AnalyzedDocument>> {
        DocumentEntity::find()
            .find_also_related(ContractAnalysisEntity)
            .order_by_desc(DocumentColumn::CreatedAt)
            .limit(limit)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn analyzed_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AnalyzedDocument>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        DocumentEntity::find()
            .filter(DocumentColumn::Id.is_in(ids.to_vec()))
            .find_also_related(ContractAnalysisEntity)
            .order_by_desc(DocumentColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Chunk Operations
    // ========================================================================

    async fn replace_chunks(
        &self,
        document_id: Uuid,
        chunks: Vec<NewChunk>,
        embedding_model: &str,
    ) -> Result<usize> {
        let txn = self.write_conn().begin().await?;

        DocumentChunkEntity::delete_many()
            .filter(DocumentChunkColumn::DocumentId.eq(document_id))
            .exec(&txn)
            .await?;

        let count = chunks.len();
        for chunk in chunks {
            // Use raw SQL for pgvector type
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                r#"
                INSERT INTO document_chunks (
                    id, document_id, chunk_index, content, embedding,
                    embedding_model, created_at
                )
                VALUES ($1, $2, $3, $4, $5::vector, $6, NOW())
                "#,
                vec![
                    Uuid::new_v4().into(),
                    document_id.into(),
                    chunk.index.into(),
                    chunk.content.into(),
                    to_vector_literal(&chunk.embedding).into(),
                    embedding_model.into(),
                ],
            );

            txn.execute(stmt).await?;
        }

        txn.commit().await?;
        Ok(count)
    }

    async fn count_chunks(&self, document_id: Uuid) -> Result<u64> {
        DocumentChunkEntity::find()
            .filter(DocumentChunkColumn::DocumentId.eq(document_id))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn similar_chunks(
        &self,
        embedding: &[f32],
        limit: usize,
        document_ids: Option<&[Uuid]>,
    ) -> Result<Vec<ChunkMatch>> {
        let document_filter = document_ids
            .map(|_| "AND c.document_id = ANY($3::uuid[])")
            .unwrap_or("");

        let sql = format!(
            r#"
            SELECT
                c.id as chunk_id,
                c.document_id,
                d.original_name as document_name,
                c.content,
                c.chunk_index,
                1 - (c.embedding <=> $1::vector) as score
            FROM document_chunks c
            JOIN documents d ON c.document_id = d.id
            WHERE c.embedding IS NOT NULL
            {}
            ORDER BY c.embedding <=> $1::vector
            LIMIT $2
            "#,
            document_filter
        );

        let mut values: Vec<sea_orm::Value> = vec![
            to_vector_literal(embedding).into(),
            (limit as i64).into(),
        ];

        if let Some(ids) = document_ids {
            let array = format!(
                "{{{}}}",
                ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",")
            );
            values.push(array.into());
        }

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, &sql, values);

        let rows = self.read_conn().query_all(stmt).await?;
        let results = rows
            .iter()
            .map(chunk_match)
            .collect::<std::result::Result<Vec<_>, DbErr>>()?;

        Ok(results)
    }

    // ========================================================================
    // Chat Operations
    // ========================================================================

    async fn append_chat_message(&self, role: ChatRole, content: &str) -> Result<ChatMessage> {
        let message = ChatMessageActiveModel {
            id: Set(Uuid::new_v4()),
            role: Set(role.as_str().to_string()),
            content: Set(content.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        message.insert(self.write_conn()).await.map_err(Into::into)
    }

    async fn recent_chat_messages(&self, limit: u64) -> Result<Vec<ChatMessage>> {
        let mut messages = ChatMessageEntity::find()
            .order_by_desc(ChatMessageColumn::CreatedAt)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        messages.reverse();
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{MockDatabase, Value};
    use std::collections::BTreeMap;

    fn repository(rows: Vec<BTreeMap<String, Value>>) -> Repository {
        let primary = MockDatabase::new(DbBackend::Postgres)
            .append_query_results([rows])
            .into_connection();
        Repository::new(DbPool {
            primary,
            replica: None,
        })
    }

    fn chunk_row(document_id: Uuid, score: Value) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("chunk_id".to_string(), Uuid::new_v4().into()),
            ("document_id".to_string(), document_id.into()),
            ("document_name".to_string(), "msa.pdf".into()),
            ("content".to_string(), "Governing Law: Texas".into()),
            ("chunk_index".to_string(), 0i32.into()),
            ("score".to_string(), score),
        ])
    }

    #[tokio::test]
    async fn test_similar_chunks_decodes_rows() {
        let document_id = Uuid::new_v4();
        let repo = repository(vec![chunk_row(document_id, 0.92f64.into())]);

        let matches = repo.similar_chunks(&[0.1, 0.2], 3, None).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].document_id, document_id);
        assert_eq!(matches[0].document_name, "msa.pdf");
        assert!((matches[0].score - 0.92).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_similar_chunks_reports_undecodable_rows() {
        let repo = repository(vec![
            chunk_row(Uuid::new_v4(), 0.92f64.into()),
            chunk_row(Uuid::new_v4(), "high".into()),
        ]);

        let result = repo.similar_chunks(&[0.1, 0.2], 3, None).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
