// SPDX-License-Identifier: MIT

//! Uploader/attachment-pool errors.

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("artifact exceeds the maximum size of {max_bytes} bytes")]
    TooLarge { max_bytes: u64 },

    #[error("control-plane request failed: {0}")]
    ControlPlane(#[from] sg_client::ClientError),

    #[error("compressing batch failed: {0}")]
    Compression(String),

    #[error("uploading artifact body failed: {0}")]
    Transport(String),

    #[error("writing local development copy failed: {0}")]
    LocalDevelopment(String),
}
