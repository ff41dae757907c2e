//! File relay — forwards uploaded attachments to the provider's file store
//! and registers them with the shared vector store.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::future::try_join_all;
use tracing::{debug, error, info, warn};

use crate::routes::error_response;
use crate::state::AppState;
use chatrelay_chat::{
    ensure_vector_store, AttachedFile, FileService, FileUpload, UploadResponse, UploadedFile,
};
use chatrelay_core::{Error, Result};

/// Multipart field carrying the attachments.
pub const FILES_FIELD: &str = "files";

const FILES_ERROR: &str = "There was an error processing your files";
const INVALID_BODY: &str = "Invalid request body";

pub fn routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/files", post(upload_files))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /api/files — upload every `files` part, all or nothing.
async fn upload_files(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            warn!("Rejected file upload: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, INVALID_BODY);
        }
    };

    let attachments = match read_attachments(multipart).await {
        Ok(a) => a,
        Err(e) => {
            error!("Error processing files: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, FILES_ERROR);
        }
    };

    if attachments.is_empty() {
        return upload_success(Vec::new());
    }

    match relay_files(&state, attachments).await {
        Ok(files) => {
            info!("Uploaded {} file(s) to {}", files.len(), state.config.vector_store_name);
            upload_success(files)
        }
        Err(e) => {
            error!("Error processing files: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, FILES_ERROR)
        }
    }
}

fn upload_success(files: Vec<UploadedFile>) -> Response {
    (
        StatusCode::OK,
        Json(UploadResponse {
            success: true,
            files,
        }),
    )
        .into_response()
}

/// Read every `files` part. A part without a file name fails the batch.
async fn read_attachments(mut multipart: Multipart) -> Result<Vec<AttachedFile>> {
    let mut attachments = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidUpload(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(FILES_FIELD) {
            debug!("Ignoring form field {:?}", field.name());
            continue;
        }

        let index = attachments.len();
        let name = match field.file_name() {
            Some(name) => name.to_string(),
            None => {
                return Err(Error::InvalidUpload(format!(
                    "Item at index {} is not a file",
                    index
                )))
            }
        };
        let content_type = field.content_type().unwrap_or_default().to_string();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidUpload(format!("{}: read failed: {}", name, e)))?;

        attachments.push(AttachedFile::new(name, content_type, bytes));
    }

    Ok(attachments)
}

/// Upload the batch concurrently. The first failure fails the whole batch.
async fn relay_files(state: &AppState, attachments: Vec<AttachedFile>) -> Result<Vec<UploadedFile>> {
    let files = state.files.as_ref();
    let store = ensure_vector_store(files, &state.config.vector_store_name).await?;

    let uploads = attachments
        .into_iter()
        .map(|attachment| upload_one(files, &store.id, attachment));

    try_join_all(uploads).await
}

async fn upload_one(
    files: &dyn FileService,
    vector_store_id: &str,
    mut attachment: AttachedFile,
) -> Result<UploadedFile> {
    let bytes = attachment
        .take_bytes()
        .ok_or_else(|| Error::InvalidUpload(format!("{} was already uploaded", attachment.name)))?;
    let upload = FileUpload {
        filename: attachment.name.clone(),
        content_type: attachment.content_type.clone(),
        bytes,
    };

    let remote = files.upload_file(upload).await?;
    attachment.mark_uploaded(remote.id.clone());

    files.attach_file(vector_store_id, &remote.id).await?;
    debug!("Registered {} as {} in {}", attachment.name, remote.id, vector_store_id);

    Ok(attachment.to_uploaded())
}
