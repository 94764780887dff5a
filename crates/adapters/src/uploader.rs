// SPDX-License-Identifier: MIT

//! Gzip-and-upload a batch of JSONL records to a presigned artifact URL.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;

use sg_client::ControlPlaneClient;
use sg_core::limits::{truncate_filename, MAX_ARTIFACT_SIZE_BYTES};

use crate::error::UploadError;

/// What a single-attachment transfer needs from [`Uploader::stream_upload`]: a live HTTP body
/// and, when known, its length.
#[async_trait]
pub trait StreamUploadSink: Send + Sync {
    async fn stream_upload(
        &self,
        item_type: &str,
        body: reqwest::Body,
        content_length: Option<u64>,
    ) -> Result<UploadedArtifact, UploadError>;
}

/// One successfully uploaded artifact, as recorded against a repository's item type.
#[derive(Debug, Clone)]
pub struct UploadedArtifact {
    pub id: String,
    pub item_type: String,
    pub item_count: usize,
}

/// What a repository needs from an uploader: hand it a batch, get back an artifact record.
#[async_trait]
pub trait UploadSink: Send + Sync {
    async fn upload_batch(
        &self,
        item_type: &str,
        records: &[serde_json::Value],
    ) -> Result<UploadedArtifact, UploadError>;
}

/// Gzip-JSONL-over-presigned-URL uploader.
pub struct Uploader<C: ControlPlaneClient> {
    client: std::sync::Arc<C>,
    http: reqwest::Client,
    token: String,
    is_local_development: bool,
    local_dev_dir: PathBuf,
}

impl<C: ControlPlaneClient> Uploader<C> {
    pub fn new(client: std::sync::Arc<C>, token: impl Into<String>) -> Self {
        Self {
            client,
            // Presigned uploads are opaque, single-shot PUTs/POSTs; redirects must not be
            // followed silently since that would resend the body to an unverified host.
            http: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap_or_default(),
            token: token.into(),
            is_local_development: false,
            local_dev_dir: PathBuf::from("extracted_files"),
        }
    }

    pub fn with_local_development(mut self, enabled: bool) -> Self {
        self.is_local_development = enabled;
        self
    }

    fn gzip_jsonl(records: &[serde_json::Value]) -> Result<Vec<u8>, UploadError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        for record in records {
            let line = serde_json::to_string(record).map_err(|e| UploadError::Compression(e.to_string()))?;
            encoder.write_all(line.as_bytes()).map_err(|e| UploadError::Compression(e.to_string()))?;
            encoder.write_all(b"\n").map_err(|e| UploadError::Compression(e.to_string()))?;
        }
        encoder.finish().map_err(|e| UploadError::Compression(e.to_string()))
    }

    async fn write_local_copy(&self, item_type: &str, body: &[u8]) -> Result<(), UploadError> {
        if !self.is_local_development {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.local_dev_dir)
            .await
            .map_err(|e| UploadError::LocalDevelopment(e.to_string()))?;
        let path = self.local_dev_dir.join(format!("{item_type}.jsonl.gz"));
        tokio::fs::write(path, body).await.map_err(|e| UploadError::LocalDevelopment(e.to_string()))
    }

    async fn put_presigned(&self, descriptor: &sg_client::ArtifactUploadDescriptor, body: Vec<u8>) -> Result<(), UploadError> {
        let mut form = reqwest::multipart::Form::new();
        for (key, value) in &descriptor.form_data {
            form = form.text(key.clone(), value.clone());
        }
        form = form.part("file", reqwest::multipart::Part::bytes(body));

        let resp = self
            .http
            .post(&descriptor.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            Err(UploadError::Transport(format!("presigned upload returned status {status}")))
        }
    }
}

#[async_trait]
impl<C: ControlPlaneClient> StreamUploadSink for Uploader<C> {
    /// Streams a single live HTTP body straight to a presigned artifact URL, without buffering
    /// it in memory. Used for attachment transfers, as opposed to [`UploadSink::upload_batch`]'s
    /// in-memory gzip-JSONL batches.
    ///
    /// When `content_length` is `None` the outgoing request declares
    /// [`MAX_ARTIFACT_SIZE_BYTES`] as a conservative upper bound, per the contract. `body` is
    /// moved into the outgoing request and therefore dropped (closed) on every exit path,
    /// including the early-return error paths below.
    async fn stream_upload(
        &self,
        item_type: &str,
        body: reqwest::Body,
        content_length: Option<u64>,
    ) -> Result<UploadedArtifact, UploadError> {
        if let Some(len) = content_length {
            if len > MAX_ARTIFACT_SIZE_BYTES {
                return Err(UploadError::TooLarge { max_bytes: MAX_ARTIFACT_SIZE_BYTES });
            }
        }

        let file_name = truncate_filename(item_type);
        let declared_size = content_length.unwrap_or(MAX_ARTIFACT_SIZE_BYTES);
        let descriptor = self
            .client
            .get_artifact_upload_url(&self.token, &file_name, "application/octet-stream", Some(declared_size))
            .await?;

        let mut form = reqwest::multipart::Form::new();
        for (key, value) in &descriptor.form_data {
            form = form.text(key.clone(), value.clone());
        }
        let part = match content_length {
            Some(len) => reqwest::multipart::Part::stream_with_length(body, len),
            None => reqwest::multipart::Part::stream_with_length(body, MAX_ARTIFACT_SIZE_BYTES),
        };
        form = form.part("file", part.file_name(file_name));

        let resp = self
            .http
            .post(&descriptor.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = resp.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(UploadError::Transport(format!("presigned upload returned status {status}")));
        }

        self.client.confirm_artifact_upload(&self.token, &descriptor.id).await?;
        Ok(UploadedArtifact { id: descriptor.id, item_type: item_type.to_string(), item_count: 1 })
    }
}

#[async_trait]
impl<C: ControlPlaneClient> UploadSink for Uploader<C> {
    async fn upload_batch(
        &self,
        item_type: &str,
        records: &[serde_json::Value],
    ) -> Result<UploadedArtifact, UploadError> {
        let body = Self::gzip_jsonl(records)?;
        if body.len() as u64 > MAX_ARTIFACT_SIZE_BYTES {
            return Err(UploadError::TooLarge { max_bytes: MAX_ARTIFACT_SIZE_BYTES });
        }

        self.write_local_copy(item_type, &body).await?;

        let file_name = truncate_filename(&format!("{item_type}.jsonl.gz"));
        let descriptor =
            self.client.get_artifact_upload_url(&self.token, &file_name, "application/x-gzip", Some(body.len() as u64)).await?;

        self.put_presigned(&descriptor, body).await?;
        self.client.confirm_artifact_upload(&self.token, &descriptor.id).await?;

        Ok(UploadedArtifact { id: descriptor.id, item_type: item_type.to_string(), item_count: records.len() })
    }
}

#[cfg(test)]
#[path = "uploader_tests.rs"]
mod tests;
