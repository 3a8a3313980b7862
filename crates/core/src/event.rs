// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the monitor feed and the audit journal.

use crate::envelope::MessageId;
use crate::instance::{InstanceId, LifecycleState};
use crate::progress::ProgressClass;
use serde::{Deserialize, Serialize};

/// Events pushed to monitor-feed subscribers.
///
/// Serializes with `{"type": "event_name", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedEvent {
    #[serde(rename = "instance_state_changed")]
    InstanceStateChanged {
        instance_id: InstanceId,
        from: LifecycleState,
        to: LifecycleState,
        at_ms: u64,
    },

    #[serde(rename = "message_exchange")]
    MessageExchange {
        instance_id: InstanceId,
        message_id: MessageId,
        /// `"sent"` when the orchestrator wrote into the pane, `"received"`
        /// when a reply came back.
        direction: String,
        at_ms: u64,
    },

    #[serde(rename = "progress_update")]
    ProgressUpdate {
        instance_id: InstanceId,
        classification: ProgressClass,
        at_ms: u64,
    },

    #[serde(rename = "health_check")]
    HealthCheck {
        live_instances: usize,
        at_ms: u64,
    },
}

impl FeedEvent {
    /// The tag this event serializes under; used for subscription matching.
    pub fn type_name(&self) -> &'static str {
        match self {
            FeedEvent::InstanceStateChanged { .. } => "instance_state_changed",
            FeedEvent::MessageExchange { .. } => "message_exchange",
            FeedEvent::ProgressUpdate { .. } => "progress_update",
            FeedEvent::HealthCheck { .. } => "health_check",
        }
    }
}

/// Audit journal event kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    InstanceSpawn,
    MessageExchange,
    InstanceTerminate,
}

/// One line of the daily audit journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// ISO-8601 UTC timestamp.
    pub time: String,
    pub event_type: AuditEvent,
    pub instance_id: InstanceId,
    pub details: serde_json::Value,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
