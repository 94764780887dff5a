// SPDX-License-Identifier: MIT

//! The newline-delimited JSON protocol spoken between the supervisor and the worker process
//! over the child's stdout (worker → supervisor) and stdin (supervisor → worker).
//!
//! Deliberately simpler than a length-prefixed binary framing: these messages are small,
//! line-oriented, and flow in one direction per channel, so one JSON object per line is
//! sufficient and trivially debuggable from a terminal.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireLogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<sg_engine::LogLevel> for WireLogLevel {
    fn from(level: sg_engine::LogLevel) -> Self {
        match level {
            sg_engine::LogLevel::Debug => WireLogLevel::Debug,
            sg_engine::LogLevel::Info => WireLogLevel::Info,
            sg_engine::LogLevel::Warn => WireLogLevel::Warn,
            sg_engine::LogLevel::Error => WireLogLevel::Error,
        }
    }
}

/// One line the worker writes to its stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    Log { level: WireLogLevel, message: String },
    Emitted,
}

/// One line the supervisor writes to the worker's stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SupervisorMessage {
    /// The soft-timeout fired: the worker should finish in-flight work and emit a
    /// progress/delayed/error event at its next natural yield point.
    Exit,
}

/// The worker's first stdin line: the invocation event plus whatever the supervisor already
/// resolved on its behalf before spawning (the initial domain mapping, when one is carried by
/// the connector registration rather than fetched by the worker itself).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStartPayload {
    pub event: sg_core::Event,
    #[serde(default)]
    pub initial_domain_mapping: Option<serde_json::Value>,
}

pub fn encode_line<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    Ok(line)
}
