//! Upload transports
//!
//! The client talks to the server through [`UploadTransport`]. The HTTP
//! implementation speaks the `/api/upload` endpoints with reqwest.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

use crate::envelope::ApiResponse;

use super::error::UploadError;
use super::types::{
    ChunkPayload, ChunkStatus, MergeRequest, SingleUpload, SingleUploadKind, StoredUrl,
    UploadClientConfig,
};

/// Transport trait for the upload wire protocol
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Whether a bearer token is available
    fn has_credentials(&self) -> bool;

    /// Ask whether chunk `chunk_number` of `identifier` is stored with hash `md5`
    async fn verify_chunk(
        &self,
        identifier: &str,
        chunk_number: u32,
        md5: &str,
    ) -> Result<ChunkStatus, UploadError>;

    /// Send one chunk
    async fn upload_chunk(&self, chunk: ChunkPayload<'_>) -> Result<(), UploadError>;

    /// Ask the server to assemble all chunks; returns the asset URL
    async fn merge_chunks(&self, request: &MergeRequest) -> Result<String, UploadError>;

    /// Upload a whole file in one request; returns the asset URL
    async fn upload_single(&self, upload: SingleUpload) -> Result<String, UploadError>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &UploadClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Reuse an existing reqwest client (connection pool, proxies)
    pub fn with_client(client: reqwest::Client, config: &UploadClientConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Check HTTP status, then the envelope's application code
    async fn read_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
        context: &str,
    ) -> Result<Option<T>, UploadError> {
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Http {
                status: status.as_u16(),
                context: context.to_string(),
            });
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| UploadError::MalformedResponse(format!("{}: {}", context, e)))?;

        if !envelope.is_success() {
            let message = if envelope.message.is_empty() {
                context.to_string()
            } else {
                format!("{}: {}", context, envelope.message)
            };
            return Err(UploadError::Api(message));
        }

        Ok(envelope.data)
    }

    fn file_part(data: Vec<u8>, filename: &str, mime_type: &str) -> Result<Part, UploadError> {
        Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|e| UploadError::Network(format!("invalid MIME type {}: {}", mime_type, e)))
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    fn has_credentials(&self) -> bool {
        self.token.is_some()
    }

    async fn verify_chunk(
        &self,
        identifier: &str,
        chunk_number: u32,
        md5: &str,
    ) -> Result<ChunkStatus, UploadError> {
        let url = format!(
            "{}?identifier={}&chunkNumber={}&md5={}",
            self.url("/api/upload/chunk/verify"),
            urlencoding::encode(identifier),
            chunk_number,
            md5
        );

        let response = self.authorize(self.client.get(&url)).send().await?;
        let context = format!("chunk {} verify failed", chunk_number);
        let status: Option<ChunkStatus> = Self::read_envelope(response, &context).await?;

        Ok(status.unwrap_or_default())
    }

    async fn upload_chunk(&self, chunk: ChunkPayload<'_>) -> Result<(), UploadError> {
        let part = Self::file_part(
            chunk.data,
            &format!("chunk_{}", chunk.chunk_number),
            "application/octet-stream",
        )?;

        let form = Form::new()
            .part("file", part)
            .text("identifier", chunk.identifier.to_string())
            .text("chunkNumber", chunk.chunk_number.to_string())
            .text("totalChunks", chunk.total_chunks.to_string())
            .text("filename", chunk.filename.to_string());

        let response = self
            .authorize(self.client.post(self.url("/api/upload/chunk")))
            .multipart(form)
            .send()
            .await?;

        let context = format!("chunk {} upload failed", chunk.chunk_number);
        Self::read_envelope::<serde_json::Value>(response, &context).await?;
        Ok(())
    }

    async fn merge_chunks(&self, request: &MergeRequest) -> Result<String, UploadError> {
        let response = self
            .authorize(self.client.post(self.url("/api/upload/chunk/merge/image")))
            .json(request)
            .send()
            .await?;

        let stored: Option<StoredUrl> = Self::read_envelope(response, "image merge failed").await?;
        stored
            .map(|s| s.url)
            .ok_or_else(|| UploadError::MalformedResponse("merge response without url".into()))
    }

    async fn upload_single(&self, upload: SingleUpload) -> Result<String, UploadError> {
        let part = Self::file_part(upload.data, &upload.filename, &upload.mime_type)?;
        let mut form = Form::new().part("file", part);

        match upload.kind {
            SingleUploadKind::Image {
                watermark,
                watermark_opacity,
            } => {
                form = form.text("watermark", watermark.to_string());
                if let Some(opacity) = watermark_opacity {
                    form = form.text("watermarkOpacity", opacity.to_string());
                }
            }
            SingleUploadKind::Avatar => {
                form = form.text("isAvatar", "true");
            }
        }

        let response = self
            .authorize(self.client.post(self.url("/api/upload/single")))
            .multipart(form)
            .send()
            .await?;

        let stored: Option<StoredUrl> = Self::read_envelope(response, "upload failed").await?;
        stored
            .map(|s| s.url)
            .ok_or_else(|| UploadError::MalformedResponse("upload response without url".into()))
    }
}
