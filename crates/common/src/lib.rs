//! ContractForge Common Library
//!
//! Shared code for the ContractForge services including:
//! - Contract analysis (field extraction, scoring, comparison)
//! - Database models and the `ContractStore` seam
//! - Object storage, embedding and chat-completion clients
//! - Contract chat over retrieved context
//! - Error types, configuration, metrics

pub mod analysis;
pub mod chat;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
mod http;
pub mod llm;
pub mod metrics;
pub mod storage;

// Re-export commonly used types
pub use analysis::{Analysis, ContractAnalyzer, ContractFields, NOT_SPECIFIED};
pub use config::AppConfig;
pub use db::{ContractStore, MemoryStore, Repository};
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use llm::ChatModel;
pub use storage::ObjectStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
