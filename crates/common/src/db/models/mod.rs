//! SeaORM entity models
//!
//! Database entities for ContractForge

mod chat_message;
mod contract_analysis;
mod document;
mod document_chunk;

pub use document::{
    Entity as DocumentEntity,
    Model as Document,
    ActiveModel as DocumentActiveModel,
    Column as DocumentColumn,
    DocumentStatus,
};

pub use contract_analysis::{
    Entity as ContractAnalysisEntity,
    Model as ContractAnalysis,
    ActiveModel as ContractAnalysisActiveModel,
    Column as ContractAnalysisColumn,
};

pub use document_chunk::{
    Entity as DocumentChunkEntity,
    Model as DocumentChunk,
    ActiveModel as DocumentChunkActiveModel,
    Column as DocumentChunkColumn,
    parse_vector_literal,
    to_vector_literal,
};

pub use chat_message::{
    Entity as ChatMessageEntity,
    Model as ChatMessage,
    ActiveModel as ChatMessageActiveModel,
    Column as ChatMessageColumn,
    ChatRole,
};
