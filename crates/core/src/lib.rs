// SPDX-License-Identifier: MIT

//! Shared types for the sync-step runtime: event/state data model, id newtypes,
//! shared constants, and a testable clock abstraction.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

#[macro_use]
mod macros;

pub mod clock;
pub mod error;
pub mod event;
pub mod ids;
pub mod limits;
pub mod state;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::FatalError;
pub use event::{
    Context, Event, EventContext, EventType, ExecutionMetadata, Mode, Secrets, TerminalEventType,
};
pub use ids::{ArtifactId, RequestId, RunId, SyncUnitId};
pub use state::{AdapterState, AttachmentsMetadata, ExtractionState, LoadingState, ProcessedAttachment};
