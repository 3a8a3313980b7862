// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor progress model: signals mined from transcripts and the
//! per-instance classification derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a transcript line (or its absence) indicates about an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// "done", "finished", "completed"
    Completion,
    /// "working", "analyzing", "processing"
    Active,
    /// "blocked", "stuck", "waiting for"
    Blocked,
    /// "error", "failed", "exception"
    Error,
    /// A structured tool_use event.
    ToolUse,
}

/// One extracted progress signal with the pattern's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    /// Pattern confidence, one of 0.8 / 0.85 / 0.9 / 0.95.
    pub confidence: f64,
    pub at_ms: u64,
}

/// Seven-way classification of an instance's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressClass {
    /// Fresh instance, no anomaly observed yet.
    Healthy,
    /// Producing work signals at or above its baseline.
    Active,
    /// Alive but quiet; below baseline without crossing the stuck threshold.
    Idle,
    /// Last work signal was a completion and nothing new since.
    Waiting,
    /// No new signals past the stuck threshold.
    Stuck,
    /// Reduced output rate with intermittent errors.
    Degraded,
    /// Repeated error signals within the error-loop window.
    ErrorLoop,
}

impl ProgressClass {
    /// Whether the supervisor should consider intervening.
    pub fn needs_attention(&self) -> bool {
        matches!(
            self,
            ProgressClass::Waiting
                | ProgressClass::Stuck
                | ProgressClass::Degraded
                | ProgressClass::ErrorLoop
        )
    }
}

impl fmt::Display for ProgressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProgressClass::Healthy => "healthy",
            ProgressClass::Active => "active",
            ProgressClass::Idle => "idle",
            ProgressClass::Waiting => "waiting",
            ProgressClass::Stuck => "stuck",
            ProgressClass::Degraded => "degraded",
            ProgressClass::ErrorLoop => "error-loop",
        };
        write!(f, "{}", s)
    }
}

/// Per-instance supervisor state, updated every evaluation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub classification: ProgressClass,
    /// Timestamp of the most recent work signal.
    pub last_activity_ms: u64,
    pub tool_use_count: u64,
    pub error_count: u64,
    /// How many interventions the supervisor has issued for this instance.
    pub interventions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_intervention_ms: Option<u64>,
    /// Set once the intervention cap is exhausted; no further automatic
    /// action is taken, the instance is flagged for external attention.
    #[serde(default)]
    pub escalated: bool,
}

impl ProgressSnapshot {
    pub fn new(now_ms: u64) -> Self {
        Self {
            classification: ProgressClass::Healthy,
            last_activity_ms: now_ms,
            tool_use_count: 0,
            error_count: 0,
            interventions: 0,
            last_intervention_ms: None,
            escalated: false,
        }
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
