//! Batch upload handler

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use contractforge_common::errors::{AppError, Result};
use contractforge_ingestion::{BatchReport, UploadFile};

use crate::AppState;

/// Accept up to `upload.max_files` PDFs as multipart file parts.
///
/// Parts without a file name are ignored. Extra parts beyond the limit are
/// counted but never buffered, and the whole batch is rejected.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchReport>> {
    let limit = state.processor.config().max_files;
    let body_limit = state.config.max_upload_body();

    let mut files = Vec::new();
    let mut count = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, body_limit))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        count += 1;
        if count > limit {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, body_limit))?;

        files.push(UploadFile::new(file_name, content_type, bytes.to_vec()));
    }

    if count > limit {
        return Err(AppError::TooManyFiles { count, limit });
    }

    tracing::info!(files = files.len(), "Upload batch received");

    // runs on its own task so a request timeout cannot strand documents mid-pipeline
    let report = state.processor.clone().submit_batch(files).await?;
    Ok(Json(report))
}

fn multipart_error(err: MultipartError, body_limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        // the stream is cut at the limit, so the real size is unknown
        AppError::PayloadTooLarge {
            size: body_limit + 1,
            limit: body_limit,
        }
    } else {
        AppError::InvalidFormat {
            message: err.body_text(),
        }
    }
}
