// SPDX-License-Identifier: MIT

//! Control-plane client errors.

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("resource not found")]
    NotFound,

    #[error("request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("retry budget exhausted after {attempts} attempts, last error: {last}")]
    RetriesExhausted { attempts: u32, last: Box<ClientError> },

    #[error("response body was not valid JSON: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }
}
