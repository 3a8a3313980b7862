// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn record(state: LifecycleState) -> InstanceRecord {
    InstanceRecord {
        id: InstanceId::new("4f1d2c3a-0000-0000-0000-000000000000"),
        name: "builder".to_string(),
        kind: InstanceKind::Claude,
        role: "general".to_string(),
        workspace: PathBuf::from("/tmp/ws"),
        parent_id: None,
        pane_id: "fm-builder-abcd".to_string(),
        state,
        model: None,
        system_prompt: None,
        stats: InstanceStats::default(),
        final_output: None,
    }
}

#[parameterized(
    creating_to_initializing = { LifecycleState::Creating, LifecycleState::Initializing },
    creating_to_error = { LifecycleState::Creating, LifecycleState::Error },
    initializing_to_running = { LifecycleState::Initializing, LifecycleState::Running },
    initializing_to_error = { LifecycleState::Initializing, LifecycleState::Error },
    running_to_busy = { LifecycleState::Running, LifecycleState::Busy },
    busy_to_idle = { LifecycleState::Busy, LifecycleState::Idle },
    idle_to_busy = { LifecycleState::Idle, LifecycleState::Busy },
    idle_to_terminating = { LifecycleState::Idle, LifecycleState::Terminating },
    terminating_to_terminated = { LifecycleState::Terminating, LifecycleState::Terminated },
)]
fn legal_transitions(from: LifecycleState, to: LifecycleState) {
    assert!(from.can_transition_to(to));
}

#[parameterized(
    running_to_error = { LifecycleState::Running, LifecycleState::Error },
    terminated_is_terminal = { LifecycleState::Terminated, LifecycleState::Running },
    error_is_terminal = { LifecycleState::Error, LifecycleState::Initializing },
    no_skip_to_running = { LifecycleState::Creating, LifecycleState::Running },
    no_resurrect = { LifecycleState::Terminating, LifecycleState::Running },
)]
fn illegal_transitions(from: LifecycleState, to: LifecycleState) {
    assert!(!from.can_transition_to(to));
}

#[test]
fn live_states() {
    assert!(LifecycleState::Running.is_live());
    assert!(LifecycleState::Busy.is_live());
    assert!(LifecycleState::Idle.is_live());
    assert!(!LifecycleState::Creating.is_live());
    assert!(!LifecycleState::Terminated.is_live());
}

#[test]
fn terminal_states() {
    assert!(LifecycleState::Terminated.is_terminal());
    assert!(LifecycleState::Error.is_terminal());
    assert!(!LifecycleState::Terminating.is_terminal());
}

#[test]
fn kind_parse_round_trips() {
    assert_eq!(InstanceKind::parse("claude"), Some(InstanceKind::Claude));
    assert_eq!(InstanceKind::parse("codex"), Some(InstanceKind::Codex));
    assert_eq!(InstanceKind::parse("Claude"), None);
    assert_eq!(InstanceKind::Claude.as_str(), "claude");
}

#[test]
fn record_label_uses_short_id() {
    let r = record(LifecycleState::Running);
    assert_eq!(r.label(), "builder (4f1d2c3a)");
}

#[test]
fn record_serializes_without_empty_optionals() {
    let r = record(LifecycleState::Idle);
    let json = serde_json::to_value(&r).unwrap();
    assert!(json.get("parent_id").is_none());
    assert!(json.get("model").is_none());
    assert_eq!(json["state"], "idle");
    assert_eq!(json["kind"], "claude");
}
