// SPDX-License-Identifier: MIT

//! Artifact upload (gzip JSONL batches over a presigned URL) and the bounded-concurrency
//! attachment streaming pool.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod attachments;
pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
pub mod uploader;

pub use attachments::{
    AttachmentOutcome, AttachmentPool, AttachmentRecord, AttachmentResult, AttachmentStreamer,
    AttachmentTask, HttpAttachmentStreamer,
};
pub use error::UploadError;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeUploadSink;
pub use uploader::{StreamUploadSink, UploadSink, UploadedArtifact, Uploader};
