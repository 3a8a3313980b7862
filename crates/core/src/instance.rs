// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance identity, lifecycle, and bookkeeping types.
//!
//! An instance is one running assistant CLI inside its own terminal pane.
//! The pane id is internal to the engine; consumers address instances by
//! [`InstanceId`] only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for an assistant instance (UUID-shaped, opaque).
    pub struct InstanceId;
}

/// Which assistant front-end an instance runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceKind {
    /// Claude-style CLI: supports both HTTP and stdio tool transports,
    /// configured via a JSON file in the workspace.
    Claude,
    /// Codex-style CLI: stdio tool transport only, configured via in-pane
    /// `tool add` commands before launch.
    Codex,
}

impl InstanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceKind::Claude => "claude",
            InstanceKind::Codex => "codex",
        }
    }

    /// Parse a kind name. Accepts the canonical snake_case names only.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "claude" => Some(InstanceKind::Claude),
            "codex" => Some(InstanceKind::Codex),
            _ => None,
        }
    }
}

impl fmt::Display for InstanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of an instance.
///
/// `Busy` and `Idle` are sub-states of a running instance driven by message
/// traffic. `Error` is terminal and only reachable before the instance ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Creating,
    Initializing,
    Running,
    Busy,
    Idle,
    Terminating,
    Terminated,
    Error,
}

impl LifecycleState {
    /// Whether the legal transition graph contains the edge `self → next`.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Creating, Initializing)
                | (Creating, Error)
                | (Initializing, Running)
                | (Initializing, Error)
                | (Running, Busy)
                | (Running, Idle)
                | (Running, Terminating)
                | (Busy, Idle)
                | (Busy, Terminating)
                | (Idle, Busy)
                | (Idle, Terminating)
                | (Terminating, Terminated)
        )
    }

    /// Whether the instance still owns a live pane.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            LifecycleState::Running | LifecycleState::Busy | LifecycleState::Idle
        )
    }

    /// Whether the state is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Terminated | LifecycleState::Error)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Creating => "creating",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Running => "running",
            LifecycleState::Busy => "busy",
            LifecycleState::Idle => "idle",
            LifecycleState::Terminating => "terminating",
            LifecycleState::Terminated => "terminated",
            LifecycleState::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Running totals for one instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceStats {
    /// Number of messages delivered into the instance.
    pub requests: u64,
    /// Cumulative token estimate across all exchanges.
    pub tokens_estimate: u64,
    /// Cumulative cost estimate in USD.
    pub cost_estimate: f64,
    pub created_at_ms: u64,
    pub last_activity_ms: u64,
}

/// Authoritative record of one assistant instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: InstanceId,
    pub name: String,
    pub kind: InstanceKind,
    /// Free-form role tag ("general", "debugger", ...).
    pub role: String,
    /// Fresh per-instance working directory under the workspace root.
    pub workspace: PathBuf,
    /// Parent instance, if this instance was spawned by another.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<InstanceId>,
    /// Pane handle. Retained after termination for log correlation.
    pub pane_id: String,
    pub state: LifecycleState,
    /// Model override passed to the assistant CLI, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// System prompt passed at launch, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub stats: InstanceStats,
    /// Final scrollback capture, persisted at termination so `get_output`
    /// keeps working on terminated instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<String>,
}

impl InstanceRecord {
    /// Display name and short id for log lines: `"builder (4f1d2c3a)"`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.id.short(8))
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
