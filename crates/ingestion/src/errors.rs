//! Ingestion error types

use contractforge_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("PDF parse error for {name}: {message}")]
    PdfParse { name: String, message: String },

    #[error("File {name} rejected: {reason}")]
    Rejected { name: String, reason: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::PdfParse { name, message } => AppError::PdfExtraction {
                message: format!("{}: {}", name, message),
            },
            IngestionError::Rejected { name, reason } => AppError::Validation {
                message: format!("{}: {}", name, reason),
                field: Some("files".to_string()),
            },
            IngestionError::FileNotFound(path) => AppError::NotFound {
                resource_type: "file".to_string(),
                id: path,
            },
            IngestionError::Io(e) => AppError::from(e),
            IngestionError::App(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keeps_category() {
        let err: AppError = IngestionError::PdfParse {
            name: "a.pdf".to_string(),
            message: "bad xref".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::PdfExtraction { .. }));

        let err: AppError = IngestionError::Rejected {
            name: "a.txt".to_string(),
            reason: "not a PDF".to_string(),
        }
        .into();
        assert!(err.is_client_error());

        let inner = AppError::Storage { message: "disk full".to_string() };
        let err: AppError = IngestionError::from(inner).into();
        assert!(matches!(err, AppError::Storage { .. }));
    }
}
