// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message envelope: one tracked request/reply unit on the bus.

use crate::instance::InstanceId;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a message envelope.
    pub struct MessageId;
}

/// Who sent a message: another instance, or an external RPC client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum MessageSource {
    Instance(InstanceId),
    External,
}

impl MessageSource {
    /// The sending instance, when there is one.
    pub fn instance_id(&self) -> Option<&InstanceId> {
        match self {
            MessageSource::Instance(id) => Some(id),
            MessageSource::External => None,
        }
    }
}

impl fmt::Display for MessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSource::Instance(id) => write!(f, "{}", id),
            MessageSource::External => write!(f, "external"),
        }
    }
}

/// Envelope status over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Created, not yet written into the target pane.
    Pending,
    /// Written into the target pane; awaiting a reply.
    Delivered,
    /// Explicit reply attached.
    Replied,
    /// No reply within the deadline.
    TimedOut,
    /// Pane write aborted or cancelled.
    Failed,
}

impl MessageStatus {
    /// Whether the envelope can still receive a reply.
    pub fn is_open(&self) -> bool {
        matches!(self, MessageStatus::Pending | MessageStatus::Delivered)
    }
}

/// One request/reply unit, exclusively owned by the message bus.
///
/// The envelope record outlives the outstanding-request table entry: it is
/// written to the communication journal regardless of how it resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub id: MessageId,
    pub source: MessageSource,
    pub target: InstanceId,
    pub payload: String,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replied_at_ms: Option<u64>,
    pub status: MessageStatus,
}

impl MessageEnvelope {
    pub fn new(
        id: MessageId,
        source: MessageSource,
        target: InstanceId,
        payload: impl Into<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            source,
            target,
            payload: payload.into(),
            created_at_ms,
            delivered_at_ms: None,
            reply: None,
            replied_at_ms: None,
            status: MessageStatus::Pending,
        }
    }

    /// Reply latency in seconds, when both timestamps are present.
    pub fn response_time_secs(&self) -> Option<f64> {
        let replied = self.replied_at_ms?;
        Some(replied.saturating_sub(self.created_at_ms) as f64 / 1000.0)
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
