// SPDX-License-Identifier: MIT

//! A retrying HTTP client for the control-plane endpoints an invocation talks to: state
//! get/put, terminal-event callback, artifact upload/download URLs, and initial domain
//! mapping install.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod dto;
pub mod error;
pub mod http_client;
pub mod retry;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use dto::{ArtifactUploadDescriptor, TerminalEventPayload};
pub use error::ClientError;
pub use http_client::{ControlPlaneClient, Endpoints, HttpControlPlaneClient};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeControlPlaneClient;
