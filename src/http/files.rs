//! File endpoints over the files container.

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::http::response::Flash;
use crate::http::server::AppState;
use crate::storage::StoreError;

/// Form body of `POST /upload`.
#[derive(Debug, Default, Deserialize)]
pub struct UploadForm {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_content: Option<String>,
}

/// Body of `GET /files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListing {
    pub container: String,
    pub files: Vec<String>,
}

/// POST /upload
pub async fn upload_file(
    State(state): State<AppState>,
    form: Result<Form<UploadForm>, FormRejection>,
) -> Response {
    let form = form.map(|Form(f)| f).unwrap_or_default();
    let (Some(filename), Some(content)) = (
        form.filename.filter(|f| !f.trim().is_empty()),
        form.file_content.filter(|c| !c.is_empty()),
    ) else {
        return Flash::error("Both filename and content are required.")
            .redirect("/")
            .into_response();
    };

    let container = state.config().storage.files_container.clone();
    let result = async {
        state.blobs.ensure_container(&container).await?;
        state
            .blobs
            .put_object(&container, &filename, content.into_bytes())
            .await
    }
    .await;

    let flash = match result {
        Ok(()) => {
            tracing::info!(container = %container, filename = %filename, "File uploaded");
            Flash::success(format!("File {filename} uploaded successfully!"))
        }
        Err(e) => {
            tracing::error!(container = %container, filename = %filename, error = %e, "Upload failed");
            Flash::error(format!("Error uploading file: {e}"))
        }
    };
    flash.redirect("/").into_response()
}

/// GET /files
pub async fn list_files(State(state): State<AppState>) -> Response {
    let container = state.config().storage.files_container.clone();
    let files = match state.blobs.list_objects(&container).await {
        Ok(files) => files,
        Err(StoreError::ContainerNotFound(_)) => Vec::new(),
        Err(e) => {
            tracing::error!(container = %container, error = %e, "Listing failed");
            return Flash::error(format!("Error listing files: {e}"))
                .redirect("/")
                .into_response();
        }
    };
    Json(FileListing { container, files }).into_response()
}

/// GET /files/{filename}
pub async fn view_file(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let container = state.config().storage.files_container.clone();
    let text = match state.blobs.get_object(&container, &filename).await {
        Ok(bytes) => String::from_utf8(bytes).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match text {
        Ok(text) => ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response(),
        Err(e) => {
            tracing::warn!(container = %container, filename = %filename, error = %e, "View failed");
            Flash::error(format!("Error viewing file: {e}"))
                .redirect("/files")
                .into_response()
        }
    }
}
