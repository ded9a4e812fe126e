//! ContractForge ingestion
//!
//! PDF text extraction, chunking and the upload pipeline shared by the
//! HTTP gateway and the `ingestion` CLI.

pub mod chunker;
pub mod errors;
pub mod pdf;
pub mod processor;

pub use errors::IngestionError;
pub use pdf::{extract_pdf, ExtractedPdf};
pub use processor::{BatchReport, ItemReport, ItemStatus, UploadFile, UploadProcessor};
