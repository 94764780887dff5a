// SPDX-License-Identifier: MIT

//! The `ControlPlaneClient` trait and its `reqwest`-backed production implementation.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::dto::{
    ArtifactDownloadUrlResponse, ArtifactUploadDescriptor, ArtifactUploadUrlRequest,
    ConfirmArtifactUploadRequest, GetStateRequest, GetStateResponse,
    InstallInitialDomainMappingRequest, PutStateRequest, TerminalEventPayload,
};
use crate::error::ClientError;
use crate::retry::{attempts_remaining, backoff_for_attempt, retry_after_for_429};

/// Everything the worker/supervisor need to talk to the control plane.
#[async_trait]
pub trait ControlPlaneClient: Send + Sync {
    /// Fetch the sync unit's persisted state document. `Ok(None)` means the control plane
    /// returned 404 (no state has ever been saved for this sync unit).
    async fn get_state(&self, token: &str, sync_unit_id: &str, request_id: &str) -> Result<Option<String>, ClientError>;

    /// Persist a new state document, replacing whatever was there.
    async fn put_state(&self, token: &str, sync_unit_id: &str, request_id: &str, raw_state: &str) -> Result<(), ClientError>;

    /// POST a terminal (or progress/delayed) event to the invocation's callback URL.
    async fn emit(&self, callback_url: &str, token: &str, payload: &TerminalEventPayload) -> Result<(), ClientError>;

    /// Request a presigned upload target for a new artifact.
    async fn get_artifact_upload_url(
        &self,
        token: &str,
        file_name: &str,
        file_type: &str,
        file_size: Option<u64>,
    ) -> Result<ArtifactUploadDescriptor, ClientError>;

    /// Confirm a completed upload so the control plane marks the artifact ready.
    async fn confirm_artifact_upload(&self, token: &str, artifact_id: &str) -> Result<(), ClientError>;

    /// Fetch a presigned download URL for an existing artifact.
    async fn get_artifact_download_url(&self, token: &str, artifact_id: &str) -> Result<String, ClientError>;

    /// Install the initial domain mapping for a snap-in version that has never had one
    /// installed.
    async fn install_initial_domain_mapping(
        &self,
        token: &str,
        snap_in_version_id: &str,
        mapping: &serde_json::Value,
    ) -> Result<(), ClientError>;
}

/// Base URLs for the control-plane endpoints. The concrete path strings are an external-system
/// contract detail; callers may override any of them.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub platform_endpoint: String,
}

impl Endpoints {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.platform_endpoint.trim_end_matches('/'), path)
    }

    fn state_url(&self) -> String {
        self.url("/internal/sync.state")
    }

    fn artifact_upload_url_url(&self) -> String {
        self.url("/internal/sync.artifacts.upload-url")
    }

    fn artifact_confirm_url(&self) -> String {
        self.url("/internal/sync.artifacts.confirm")
    }

    fn artifact_download_url_url(&self) -> String {
        self.url("/internal/sync.artifacts.download-url")
    }

    fn initial_domain_mapping_url(&self) -> String {
        self.url("/internal/recipe.initial-domain-mappings.install")
    }
}

pub struct HttpControlPlaneClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpControlPlaneClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self { http: reqwest::Client::new(), endpoints }
    }

    pub fn with_client(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let mut attempt: u32 = 0;
        loop {
            match build().send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() || status == StatusCode::FOUND || status == StatusCode::MOVED_PERMANENTLY {
                        return Ok(resp);
                    }
                    if status == StatusCode::NOT_FOUND {
                        return Err(ClientError::NotFound);
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| retry_after_for_429(Some(v)));
                        match retry_after {
                            Some(delay) => {
                                tokio::time::sleep(delay).await;
                                attempt += 1;
                                continue;
                            }
                            None => return Err(Self::http_error(resp).await),
                        }
                    }
                    if status.is_server_error() {
                        let err = Self::http_error(resp).await;
                        if !attempts_remaining(attempt + 1) {
                            return Err(err);
                        }
                        tokio::time::sleep(backoff_for_attempt(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(Self::http_error(resp).await);
                }
                Err(e) => {
                    let err = ClientError::Network(e.to_string());
                    if !err.is_retryable() || !attempts_remaining(attempt + 1) {
                        return Err(ClientError::RetriesExhausted { attempts: attempt + 1, last: Box::new(err) });
                    }
                    tokio::time::sleep(backoff_for_attempt(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn http_error(resp: reqwest::Response) -> ClientError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        ClientError::Http { status, body }
    }
}

#[async_trait]
impl ControlPlaneClient for HttpControlPlaneClient {
    async fn get_state(&self, token: &str, sync_unit_id: &str, request_id: &str) -> Result<Option<String>, ClientError> {
        let url = self.endpoints.state_url();
        let body = GetStateRequest { sync_unit_id, request_id };
        let resp = self
            .send_with_retry(|| {
                self.http
                    .get(&url)
                    .header("Authorization", token)
                    .query(&[("sync_unit_id", body.sync_unit_id), ("request_id", body.request_id)])
            })
            .await;
        match resp {
            Ok(r) => {
                let parsed: GetStateResponse =
                    r.json().await.map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
                Ok(Some(parsed.state))
            }
            Err(ClientError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_state(&self, token: &str, sync_unit_id: &str, request_id: &str, raw_state: &str) -> Result<(), ClientError> {
        let url = self.endpoints.state_url();
        let req = PutStateRequest { sync_unit_id, request_id, state: raw_state };
        self.send_with_retry(|| self.http.put(&url).header("Authorization", token).json(&req)).await?;
        Ok(())
    }

    async fn emit(&self, callback_url: &str, token: &str, payload: &TerminalEventPayload) -> Result<(), ClientError> {
        // Callback and state endpoints take the raw token, unlike artifact endpoints below which
        // use Bearer-prefixed auth.
        self.send_with_retry(|| self.http.post(callback_url).header("Authorization", token).json(payload)).await?;
        Ok(())
    }

    async fn get_artifact_upload_url(
        &self,
        token: &str,
        file_name: &str,
        file_type: &str,
        file_size: Option<u64>,
    ) -> Result<ArtifactUploadDescriptor, ClientError> {
        let url = self.endpoints.artifact_upload_url_url();
        let req = ArtifactUploadUrlRequest { file_name, file_type, file_size };
        let resp = self.send_with_retry(|| self.http.post(&url).bearer_auth(token).json(&req)).await?;
        resp.json().await.map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    async fn confirm_artifact_upload(&self, token: &str, artifact_id: &str) -> Result<(), ClientError> {
        let url = self.endpoints.artifact_confirm_url();
        let req = ConfirmArtifactUploadRequest { artifact_id };
        self.send_with_retry(|| self.http.post(&url).bearer_auth(token).json(&req)).await?;
        Ok(())
    }

    async fn get_artifact_download_url(&self, token: &str, artifact_id: &str) -> Result<String, ClientError> {
        let url = self.endpoints.artifact_download_url_url();
        let resp = self
            .send_with_retry(|| self.http.get(&url).bearer_auth(token).query(&[("artifact_id", artifact_id)]))
            .await?;
        let parsed: ArtifactDownloadUrlResponse =
            resp.json().await.map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(parsed.url)
    }

    async fn install_initial_domain_mapping(
        &self,
        token: &str,
        snap_in_version_id: &str,
        mapping: &serde_json::Value,
    ) -> Result<(), ClientError> {
        let url = self.endpoints.initial_domain_mapping_url();
        let req = InstallInitialDomainMappingRequest { snap_in_version_id, mapping };
        self.send_with_retry(|| self.http.post(&url).bearer_auth(token).json(&req)).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "http_client_tests.rs"]
mod tests;
