// SPDX-License-Identifier: MIT

//! Errors surfaced by the worker adapter; wraps the lower layers it composes.

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    Fatal(#[from] sg_core::FatalError),

    #[error(transparent)]
    Upload(#[from] sg_adapters::UploadError),

    #[error(transparent)]
    Client(#[from] sg_client::ClientError),

    #[error("no repository initialized for item type {0:?}")]
    UnknownItemType(String),
}
