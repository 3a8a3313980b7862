// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured events extracted from captured pane output.

use serde::{Deserialize, Serialize};

/// One structured event from an instance's transcript.
///
/// Every variant carries `at_ms`, stamped with the orchestrator's clock at
/// extraction time. Timestamps embedded in the captured JSON are not trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptEvent {
    UserText {
        text: String,
        at_ms: u64,
    },
    AssistantText {
        text: String,
        at_ms: u64,
    },
    ToolCall {
        name: String,
        input: serde_json::Value,
        call_id: String,
        at_ms: u64,
    },
    ToolResult {
        call_id: String,
        content: String,
        is_error: bool,
        at_ms: u64,
    },
}

impl TranscriptEvent {
    pub fn at_ms(&self) -> u64 {
        match self {
            TranscriptEvent::UserText { at_ms, .. }
            | TranscriptEvent::AssistantText { at_ms, .. }
            | TranscriptEvent::ToolCall { at_ms, .. }
            | TranscriptEvent::ToolResult { at_ms, .. } => *at_ms,
        }
    }

    /// Whether this event counts as a tool use for progress baselines.
    pub fn is_tool_use(&self) -> bool {
        matches!(self, TranscriptEvent::ToolCall { .. })
    }

    /// Whether this event indicates an error.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            TranscriptEvent::ToolResult { is_error: true, .. }
        )
    }
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
