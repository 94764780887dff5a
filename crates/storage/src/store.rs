// SPDX-License-Identifier: MIT

//! Fetch-or-seed state initialization and save-back, generic over any [`ControlPlaneClient`].

use sg_client::ControlPlaneClient;
use sg_core::{AdapterState, Clock, Event, EventType, FatalError};

/// The outcome of initializing state for one invocation.
#[derive(Debug, Clone)]
pub struct InitialState {
    pub state: AdapterState,
    /// Whether the initial domain mapping was (re)installed this invocation, because the
    /// event's snap-in version differs from the one recorded in the persisted state.
    pub installed_initial_domain_mapping: bool,
}

/// Drives state fetch/seed/version-check/save against a [`ControlPlaneClient`].
pub struct StateStore<'a, C: ControlPlaneClient> {
    client: &'a C,
}

impl<'a, C: ControlPlaneClient> StateStore<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Initialize state for `event`.
    ///
    /// - Stateless event types never fetch or persist state; they start from a fresh default.
    /// - Stateful event types fetch state, seeding a default document (and persisting it) on a
    ///   404.
    /// - If the fetched (or seeded) state's recorded snap-in version differs from the event's,
    ///   the initial domain mapping is (re)installed, which is fatal to skip: a missing mapping
    ///   for a version change is [`FatalError::MissingInitialDomainMapping`], and an install
    ///   failure is [`FatalError::InitialDomainMappingInstall`].
    /// - `last_sync_started` is stamped only when the event is the start of a full extraction
    ///   pass (`EXTRACTION_DATA_START`), not on every invocation.
    pub async fn initialize(
        &self,
        event: &Event,
        initial_domain_mapping: Option<&serde_json::Value>,
        clock: &impl Clock,
    ) -> Result<InitialState, FatalError> {
        let sync_unit_id = event.event_context.sync_unit_id.as_str();
        let request_id = event.event_context.request_id.as_str();
        let token = event.context.secrets.service_account_token.as_str();

        let mut state = if event.event_type.is_stateless() {
            AdapterState::default()
        } else {
            match self.client.get_state(token, sync_unit_id, request_id).await {
                Ok(Some(raw)) => {
                    serde_json::from_str(&raw).map_err(|e| FatalError::StateParse(e.to_string()))?
                }
                Ok(None) => {
                    let seeded = AdapterState::default();
                    let raw = serde_json::to_string(&seeded)
                        .map_err(|e| FatalError::StateParse(e.to_string()))?;
                    self.client
                        .put_state(token, sync_unit_id, request_id, &raw)
                        .await
                        .map_err(|e| FatalError::StateSave(e.to_string()))?;
                    seeded
                }
                Err(e) => return Err(FatalError::StateFetch(e.to_string())),
            }
        };

        let mut installed_initial_domain_mapping = false;
        if !event.event_type.is_stateless() {
            let current_version = event.context.snap_in_version_id.as_str();
            let version_changed = state.snap_in_version_id.as_deref() != Some(current_version);
            if version_changed {
                let mapping = initial_domain_mapping.ok_or_else(|| FatalError::MissingInitialDomainMapping {
                    version: current_version.to_string(),
                })?;
                self.client
                    .install_initial_domain_mapping(token, current_version, mapping)
                    .await
                    .map_err(|e| FatalError::InitialDomainMappingInstall(e.to_string()))?;
                state.snap_in_version_id = Some(current_version.to_string());
                installed_initial_domain_mapping = true;
            }
        }

        if event.event_type == EventType::ExtractionDataStart && state.last_sync_started.is_none() {
            state.last_sync_started = Some(rfc3339(clock));
        }

        Ok(InitialState { state, installed_initial_domain_mapping })
    }

    /// Persist `state` back to the control plane.
    pub async fn save(&self, event: &Event, state: &AdapterState) -> Result<(), FatalError> {
        let raw = serde_json::to_string(state).map_err(|e| FatalError::StateSave(e.to_string()))?;
        let token = event.context.secrets.service_account_token.as_str();
        self.client
            .put_state(token, event.event_context.sync_unit_id.as_str(), event.event_context.request_id.as_str(), &raw)
            .await
            .map_err(|e| FatalError::StateSave(e.to_string()))
    }
}

fn rfc3339(clock: &impl Clock) -> String {
    let millis = clock.epoch_ms();
    let secs = (millis / 1000) as i64;
    let nanos = ((millis % 1000) * 1_000_000) as u32;
    chrono::DateTime::from_timestamp(secs, nanos).unwrap_or(chrono::DateTime::UNIX_EPOCH).to_rfc3339()
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
