// SPDX-License-Identifier: MIT

//! The per-invocation state store: fetch-or-seed on startup, compare-and-install the initial
//! domain mapping on a version change, and persist back on `emit`.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod store;

pub use store::{InitialState, StateStore};
