//! Upload Routes
//!
//! Server side of the chunked image upload protocol.
//!
//! Endpoints:
//! - GET /api/upload/chunk/verify - Is chunk N of an identifier stored with this MD5?
//! - POST /api/upload/chunk - Store one chunk (multipart)
//! - POST /api/upload/chunk/merge/image - Assemble all chunks into an asset
//! - POST /api/upload/single - Store a whole image (or avatar) in one request
//!
//! All endpoints require a signed-in user.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{require_user, CurrentUser};
use crate::envelope::ApiResponse;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::upload::{ChunkStatus, MergeRequest, StoredUrl};

// ============================================================================
// Router
// ============================================================================

/// Create the upload router; bodies up to `max_body_bytes` are accepted
pub fn router(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/chunk/verify", get(verify_chunk))
        .route("/chunk", post(upload_chunk))
        .route("/chunk/merge/image", post(merge_image))
        .route("/single", post(upload_single))
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

// ============================================================================
// Multipart
// ============================================================================

/// File part of a multipart form
struct FormFile {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

/// Text fields plus the `file` part
struct UploadForm {
    fields: HashMap<String, String>,
    file: Option<FormFile>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut fields = HashMap::new();
        let mut file = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read file: {}", e)))?;
                file = Some(FormFile {
                    file_name,
                    content_type,
                    data,
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read {}: {}", name, e)))?;
                fields.insert(name, value);
            }
        }

        Ok(Self { fields, file })
    }

    fn text(&self, name: &str) -> Result<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::BadRequest(format!("missing field: {}", name)))
    }

    fn number(&self, name: &str) -> Result<u32> {
        self.text(name)?
            .trim()
            .parse()
            .map_err(|_| AppError::BadRequest(format!("invalid number: {}", name)))
    }

    fn flag(&self, name: &str) -> bool {
        matches!(self.fields.get(name).map(String::as_str), Some("true") | Some("1"))
    }

    fn take_file(&mut self) -> Result<FormFile> {
        self.file
            .take()
            .ok_or_else(|| AppError::BadRequest("no file uploaded".to_string()))
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyQuery {
    pub identifier: String,
    pub chunk_number: u32,
    pub md5: String,
}

/// GET /api/upload/chunk/verify
async fn verify_chunk(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<ApiResponse<ChunkStatus>>> {
    require_user(&user)?;

    let status = state
        .chunks()
        .verify(&query.identifier, query.chunk_number, &query.md5)
        .await?;

    Ok(Json(ApiResponse::success(status)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkReceipt {
    pub chunk_number: u32,
    pub total_chunks: u32,
    pub md5: String,
}

/// POST /api/upload/chunk
async fn upload_chunk(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ChunkReceipt>>> {
    let user = require_user(&user)?;
    let mut form = UploadForm::read(multipart).await?;

    let identifier = form.text("identifier")?.to_string();
    let chunk_number = form.number("chunkNumber")?;
    let total_chunks = form.number("totalChunks")?;
    let file = form.take_file()?;

    let metadata = state
        .chunks()
        .store_chunk(&identifier, chunk_number, total_chunks, &file.data)
        .await?;

    tracing::debug!(
        user_id = user.id,
        identifier = %identifier,
        chunk = chunk_number,
        total_chunks = total_chunks,
        filename = form.fields.get("filename").map(String::as_str).unwrap_or_default(),
        "Chunk received"
    );

    Ok(Json(ApiResponse::success(ChunkReceipt {
        chunk_number,
        total_chunks,
        md5: metadata.hash,
    })))
}

/// POST /api/upload/chunk/merge/image
async fn merge_image(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(request): Json<MergeRequest>,
) -> Result<Json<ApiResponse<StoredUrl>>> {
    let user = require_user(&user)?;

    tracing::info!(
        user_id = user.id,
        identifier = %request.identifier,
        total_chunks = request.total_chunks,
        filename = %request.filename,
        watermark = request.watermark,
        watermark_opacity = ?request.watermark_opacity,
        "Merging chunks"
    );

    let data = state
        .chunks()
        .assemble(&request.identifier, request.total_chunks)
        .await?;

    let asset = state.assets().store(&data, &request.filename).await?;

    if let Err(e) = state.chunks().delete_chunks(&request.identifier).await {
        tracing::warn!(identifier = %request.identifier, error = %e, "Failed to clean up chunks");
    }

    tracing::info!(
        identifier = %request.identifier,
        url = %asset.url,
        size = asset.size,
        "Chunks merged"
    );

    Ok(Json(ApiResponse::success(StoredUrl { url: asset.url })))
}

/// POST /api/upload/single
async fn upload_single(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<StoredUrl>>> {
    let user = require_user(&user)?;
    let mut form = UploadForm::read(multipart).await?;
    let file = form.take_file()?;

    let file_name = file.file_name.unwrap_or_else(|| "upload".to_string());
    let content_type = file
        .content_type
        .unwrap_or_else(|| mime_guess::from_path(&file_name).first_or_octet_stream().to_string());

    if !content_type.starts_with("image/") {
        return Err(AppError::BadRequest(format!(
            "only image uploads are accepted, got {}",
            content_type
        )));
    }
    if file.data.is_empty() {
        return Err(AppError::BadRequest("empty file".to_string()));
    }

    let asset = state.assets().store(&file.data, &file_name).await?;

    tracing::info!(
        user_id = user.id,
        file_name = %file_name,
        size = asset.size,
        is_avatar = form.flag("isAvatar"),
        watermark = form.flag("watermark"),
        watermark_opacity = ?form.fields.get("watermarkOpacity"),
        url = %asset.url,
        "Single upload stored"
    );

    Ok(Json(ApiResponse::success(StoredUrl { url: asset.url })))
}
