//! Contract analysis entity: one row per document, upserted on re-analysis

use crate::analysis::{ContractFields, ExtractionStrategy};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contract_analysis")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub document_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub effective_date: String,

    #[sea_orm(column_type = "Text")]
    pub termination_clause: String,

    #[sea_orm(column_type = "Text")]
    pub payment_terms: String,

    #[sea_orm(column_type = "Text")]
    pub late_penalty: String,

    #[sea_orm(column_type = "Text")]
    pub delivery_timeline: String,

    #[sea_orm(column_type = "Text")]
    pub governing_law: String,

    #[sea_orm(column_type = "Text")]
    pub confidentiality_clause: String,

    #[sea_orm(column_type = "Text")]
    pub arbitration: String,

    pub score: i32,

    /// Extraction strategy that produced the fields
    #[sea_orm(column_type = "Text")]
    pub strategy: String,

    pub edited_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn fields(&self) -> ContractFields {
        ContractFields {
            effective_date: self.effective_date.clone(),
            termination_clause: self.termination_clause.clone(),
            payment_terms: self.payment_terms.clone(),
            late_penalty: self.late_penalty.clone(),
            delivery_timeline: self.delivery_timeline.clone(),
            governing_law: self.governing_law.clone(),
            confidentiality_clause: self.confidentiality_clause.clone(),
            arbitration: self.arbitration.clone(),
        }
    }

    pub fn score(&self) -> u8 {
        self.score.clamp(0, 100) as u8
    }

    pub fn extraction_strategy(&self) -> ExtractionStrategy {
        ExtractionStrategy::from(self.strategy.clone())
    }

    /// Build a row from analysis output
    pub fn from_parts(
        document_id: Uuid,
        fields: &ContractFields,
        score: u8,
        strategy: ExtractionStrategy,
        edited_at: DateTimeWithTimeZone,
    ) -> Self {
        Self {
            document_id,
            effective_date: fields.effective_date.clone(),
            termination_clause: fields.termination_clause.clone(),
            payment_terms: fields.payment_terms.clone(),
            late_penalty: fields.late_penalty.clone(),
            delivery_timeline: fields.delivery_timeline.clone(),
            governing_law: fields.governing_law.clone(),
            confidentiality_clause: fields.confidentiality_clause.clone(),
            arbitration: fields.arbitration.clone(),
            score: i32::from(score),
            strategy: strategy.as_str().to_string(),
            edited_at,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document::Entity",
        from = "Column::DocumentId",
        to = "super::document::Column::Id",
        on_delete = "Cascade"
    )]
    Document,
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
