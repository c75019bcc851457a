//! Upload API endpoints
//!
//! Handles image uploads for recipes. Files land under the configured
//! upload directory as `{uuid}.{ext}` and get an `images` row whose ID
//! can later be attached to a recipe.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::Image;

/// Response for a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: i64,
    pub url: String,
    pub filename: String,
    pub size: i64,
    pub content_type: String,
}

/// Build the upload router
pub fn router() -> Router<AppState> {
    Router::new().route("/image", post(upload_image))
}

/// POST /api/v1/upload/image - Upload a single image
///
/// Requires the writer role (enforced by the route layer). Accepts
/// multipart/form-data with a single field named "file".
async fn upload_image(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let config = &state.upload_config;

    ensure_upload_dir(&config.path).await?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if !config.is_type_allowed(&content_type) {
            return Err(ApiError::validation_error(format!(
                "Invalid file type: {}. Allowed types: {:?}",
                content_type, config.allowed_types
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to read file: {}", e)))?;

        if data.len() as u64 > config.max_file_size {
            return Err(ApiError::validation_error(format!(
                "File too large. Maximum size: {} bytes ({} MB)",
                config.max_file_size,
                config.max_file_size / 1024 / 1024
            )));
        }

        let ext = config.get_extension(&content_type);
        let new_filename = format!("{}.{}", Uuid::new_v4(), ext);
        let file_path = config.path.join(&new_filename);

        fs::write(&file_path, &data)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to save file: {}", e)))?;

        let image = Image::new(
            new_filename.clone(),
            format!("/uploads/{}", new_filename),
            data.len() as i64,
            content_type.clone(),
        );

        let created = state
            .image_repo
            .create(&image)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to record image: {}", e)))?;

        return Ok(Json(UploadResponse {
            id: created.id,
            url: created.url,
            filename: created.filename,
            size: created.size,
            content_type: created.content_type,
        }));
    }

    Err(ApiError::validation_error("No file provided"))
}

/// Ensure the upload directory exists
async fn ensure_upload_dir(path: &Path) -> Result<(), ApiError> {
    if !path.exists() {
        fs::create_dir_all(path)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to create upload dir: {}", e)))?;
    }
    Ok(())
}
