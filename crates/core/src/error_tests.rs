// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    not_found = { OrchestratorError::NotFound("i1".into()), ErrorKind::NotFound },
    spawn_failed = { OrchestratorError::SpawnFailed("boom".into()), ErrorKind::SpawnFailed },
    pane_gone = { OrchestratorError::PaneGone("fm-x".into()), ErrorKind::PaneGone },
    send_failed = { OrchestratorError::SendFailed("offset 42".into()), ErrorKind::SendFailed },
    timeout = { OrchestratorError::Timeout(30_000), ErrorKind::Timeout },
    queue_full = { OrchestratorError::QueueFull("i1".into()), ErrorKind::QueueFull },
    internal = { OrchestratorError::Internal("bug".into()), ErrorKind::Internal },
)]
fn kind_mapping(err: OrchestratorError, kind: ErrorKind) {
    assert_eq!(err.kind(), kind);
}

#[test]
fn capacity_exceeded_message_includes_counts() {
    let err = OrchestratorError::CapacityExceeded {
        current: 10,
        max: 10,
    };
    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
    assert!(err.to_string().contains("10 of 10"));
}

#[test]
fn invalid_argument_body_carries_hint() {
    let err = OrchestratorError::invalid_argument(
        "unknown model 'davinci'",
        "valid models: gpt-5-codex, gpt-5",
    );
    let body = err.to_body();
    assert_eq!(body.kind, ErrorKind::InvalidArgument);
    assert!(body.message.contains("davinci"));
    assert_eq!(body.hint.as_deref(), Some("valid models: gpt-5-codex, gpt-5"));
}

#[test]
fn non_invalid_argument_body_has_no_hint() {
    let body = OrchestratorError::Timeout(500).to_body();
    assert!(body.hint.is_none());
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["kind"], "timeout");
    assert!(json.get("hint").is_none());
}

#[test]
fn body_round_trips_through_json() {
    let body = RpcErrorBody {
        kind: ErrorKind::QueueFull,
        message: "inbound queue full for instance i1".to_string(),
        hint: None,
    };
    let back: RpcErrorBody = serde_json::from_str(&serde_json::to_string(&body).unwrap()).unwrap();
    assert_eq!(back, body);
}
