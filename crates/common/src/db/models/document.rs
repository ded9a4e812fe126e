//! Uploaded document entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Processing status of an uploaded document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploading,
    Processed,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Processed => "processed",
            DocumentStatus::Error => "error",
        }
    }
}

impl From<String> for DocumentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "processed" => DocumentStatus::Processed,
            "error" => DocumentStatus::Error,
            _ => DocumentStatus::Uploading,
        }
    }
}

impl From<DocumentStatus> for String {
    fn from(status: DocumentStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub original_name: String,

    /// Object storage locator of the original PDF
    #[sea_orm(column_type = "Text")]
    pub storage_locator: String,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub size_bytes: i64,

    /// Full extracted text
    #[sea_orm(column_type = "Text", nullable)]
    pub raw_text: Option<String>,

    pub page_count: Option<i32>,

    pub extracted_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn document_status(&self) -> DocumentStatus {
        DocumentStatus::from(self.status.clone())
    }

    /// Extracted text, empty when extraction never completed
    pub fn text(&self) -> &str {
        self.raw_text.as_deref().unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::contract_analysis::Entity")]
    Analysis,

    #[sea_orm(has_many = "super::document_chunk::Entity")]
    Chunks,
}

impl Related<super::contract_analysis::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analysis.def()
    }
}

impl Related<super::document_chunk::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chunks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
