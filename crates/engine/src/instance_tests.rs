// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{rig, spawn_child, spawn_ready};
use foreman_core::LifecycleState;

#[tokio::test]
async fn spawn_creates_workspace_and_running_record() {
    let rig = rig().await;
    let record = spawn_ready(&rig, "builder").await;

    assert_eq!(record.state, LifecycleState::Running);
    assert!(record.workspace.exists());
    assert_eq!(record.id.as_str(), "inst-1");

    let pane = rig.panes.get_pane(&record.pane_id).unwrap();
    assert!(pane.cmd.starts_with("claude "));
    assert!(pane.cmd.contains("--dangerously-skip-permissions"));
}

#[tokio::test]
async fn spawn_writes_claude_tool_config_into_workspace() {
    let rig = rig().await;
    let record = spawn_ready(&rig, "builder").await;

    let config_path = record.workspace.join(".assistant_tools.json");
    let body: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(config_path).unwrap()).unwrap();
    assert_eq!(body["foreman"]["url"], "http://127.0.0.1:7433/rpc");
}

#[tokio::test]
async fn spawn_codex_configures_tools_in_pane_before_launch() {
    let rig = rig().await;
    let mut request = SpawnRequest::new("worker", InstanceKind::Codex);
    request.wait_for_ready = true;
    let record = rig.orch.spawn_instance(request).await.unwrap();

    let pane = rig.panes.get_pane(&record.pane_id).unwrap();
    // Pane starts as a shell; tool add lines precede the CLI launch
    assert_eq!(pane.cmd, "bash");
    assert!(pane.written[0].starts_with("tool add foreman foreman stdio"));
    assert!(pane.written[1].starts_with("codex --full-auto"));
}

#[tokio::test]
async fn spawn_passes_initial_prompt_as_argument() {
    let rig = rig().await;
    let mut request = SpawnRequest::new("prompted", InstanceKind::Claude);
    request.wait_for_ready = true;
    request.initial_prompt = Some("read the README first".to_string());
    let record = rig.orch.spawn_instance(request).await.unwrap();

    let pane = rig.panes.get_pane(&record.pane_id).unwrap();
    assert!(pane.cmd.ends_with("'read the README first'"));
    // Nothing was typed into the pane for the initial prompt
    assert!(pane.written.is_empty());
}

#[tokio::test]
async fn spawn_links_parent_and_child() {
    let rig = rig().await;
    let parent = spawn_ready(&rig, "parent").await;
    let child = spawn_child(&rig, "child", &parent).await;

    assert_eq!(child.parent_id, Some(parent.id.clone()));
    let children = rig.orch.registry.children_of(&parent.id, false);
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, child.id);
}

#[tokio::test]
async fn spawn_with_unknown_parent_fails() {
    let rig = rig().await;
    let mut request = SpawnRequest::new("orphan", InstanceKind::Claude);
    request.parent_id = Some(InstanceId::new("ghost"));
    let result = rig.orch.spawn_instance(request).await;
    assert!(matches!(result, Err(OrchestratorError::NotFound(_))));
}

#[tokio::test]
async fn spawn_beyond_capacity_is_refused() {
    let rig = rig().await;
    for i in 0..10 {
        spawn_ready(&rig, &format!("w{}", i)).await;
    }

    let result = rig
        .orch
        .spawn_instance(SpawnRequest::new("overflow", InstanceKind::Claude))
        .await;
    assert!(matches!(
        result,
        Err(OrchestratorError::CapacityExceeded { current: 10, max: 10 })
    ));
}

#[tokio::test]
async fn terminated_instances_free_capacity() {
    let rig = rig().await;
    for i in 0..10 {
        spawn_ready(&rig, &format!("w{}", i)).await;
    }
    rig.orch
        .terminate_instance(&InstanceId::new("inst-1"), true)
        .await
        .unwrap();

    let mut request = SpawnRequest::new("replacement", InstanceKind::Claude);
    request.wait_for_ready = true;
    assert!(rig.orch.spawn_instance(request).await.is_ok());
}

#[tokio::test]
async fn codex_legacy_model_is_invalid_argument_with_hint() {
    let rig = rig().await;
    let mut request = SpawnRequest::new("old", InstanceKind::Codex);
    request.model = Some("code-davinci-002".to_string());

    let result = rig.orch.spawn_instance(request).await;
    match result {
        Err(OrchestratorError::InvalidArgument { hint, .. }) => {
            assert!(hint.contains("gpt-5-codex"));
        }
        other => panic!("expected InvalidArgument, got {:?}", other),
    }
}

#[tokio::test]
async fn send_wraps_payload_with_correlation_tag() {
    let rig = rig().await;
    let record = spawn_ready(&rig, "a").await;

    let outcome = rig
        .orch
        .send_message(
            &record.id,
            "what is 2+2?",
            MessageSource::External,
            false,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    let pane = rig.panes.get_pane(&record.pane_id).unwrap();
    let expected = format!("[MSG:{}] what is 2+2?", outcome.message_id);
    assert_eq!(pane.written, vec![expected]);
}

#[tokio::test]
async fn send_updates_stats_and_marks_busy() {
    let rig = rig().await;
    let record = spawn_ready(&rig, "a").await;

    rig.orch
        .send_message(
            &record.id,
            "hello there",
            MessageSource::External,
            false,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    let updated = rig.orch.registry.get(&record.id, false).unwrap();
    assert_eq!(updated.stats.requests, 1);
    assert!(updated.stats.tokens_estimate > 0);
    assert!(updated.stats.cost_estimate > 0.0);
    assert_eq!(updated.state, LifecycleState::Busy);
}

#[tokio::test]
async fn send_to_unknown_instance_is_not_found() {
    let rig = rig().await;
    let result = rig
        .orch
        .send_message(
            &InstanceId::new("ghost"),
            "x",
            MessageSource::External,
            false,
            Duration::from_secs(1),
        )
        .await;
    assert!(matches!(result, Err(OrchestratorError::NotFound(_))));
}

#[tokio::test]
async fn send_to_terminated_instance_is_not_found() {
    let rig = rig().await;
    let record = spawn_ready(&rig, "a").await;
    rig.orch.terminate_instance(&record.id, true).await.unwrap();

    let result = rig
        .orch
        .send_message(
            &record.id,
            "x",
            MessageSource::External,
            false,
            Duration::from_secs(1),
        )
        .await;
    assert!(matches!(result, Err(OrchestratorError::NotFound(_))));
}

#[tokio::test]
async fn send_surfaces_write_failure_as_send_failed() {
    let rig = rig().await;
    let record = spawn_ready(&rig, "a").await;
    rig.panes.fail_writes_after(0);

    let result = rig
        .orch
        .send_message(
            &record.id,
            "doomed",
            MessageSource::External,
            false,
            Duration::from_secs(1),
        )
        .await;
    assert!(matches!(result, Err(OrchestratorError::SendFailed(_))));

    let env = rig.orch.bus.envelope(&MessageId::new("inst-2")).unwrap();
    assert_eq!(env.status, foreman_core::MessageStatus::Failed);
}

#[tokio::test]
async fn explicit_reply_resolves_waiting_send() {
    let rig = std::sync::Arc::new(rig().await);
    let record = spawn_ready(&rig, "a").await;

    let sender = {
        let rig = std::sync::Arc::clone(&rig);
        let target = record.id.clone();
        tokio::spawn(async move {
            rig.orch
                .send_message(
                    &target,
                    "what is 2+2?",
                    MessageSource::External,
                    true,
                    Duration::from_secs(10),
                )
                .await
        })
    };

    // Wait until the message reaches the pane, then reply explicitly
    let message_id = MessageId::new("inst-2");
    for _ in 0..200 {
        let delivered = rig
            .orch
            .bus
            .envelope(&message_id)
            .is_some_and(|e| e.status == foreman_core::MessageStatus::Delivered);
        if delivered {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    rig.orch.reply_to_message(&message_id, "4").await.unwrap();

    let outcome = sender.await.unwrap().unwrap();
    assert_eq!(outcome.reply.as_deref(), Some("4"));

    // Reply accounting: instance went back to idle, tokens counted
    let updated = rig.orch.registry.get(&record.id, false).unwrap();
    assert_eq!(updated.state, LifecycleState::Idle);
}

#[tokio::test]
async fn timed_out_send_falls_back_to_scrollback() {
    let rig = rig().await;
    let record = spawn_ready(&rig, "a").await;

    // The assistant "answers" in the pane without using the RPC path
    let panes = rig.panes.clone();
    let pane_id = record.pane_id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        panes.push_output(&pane_id, &["[MSG:inst-2] what is 2+2?", "The answer is 4."]);
    });

    let outcome = rig
        .orch
        .send_message(
            &record.id,
            "what is 2+2?",
            MessageSource::External,
            true,
            Duration::from_millis(400),
        )
        .await
        .unwrap();

    assert_eq!(outcome.reply.as_deref(), Some("The answer is 4."));
}

#[tokio::test]
async fn timed_out_send_with_empty_pane_is_timeout() {
    let rig = rig().await;
    let record = spawn_ready(&rig, "a").await;
    // Pane only ever shows chrome lines
    rig.panes.set_output(&record.pane_id, vec!["? for shortcuts".to_string()]);

    let result = rig
        .orch
        .send_message(
            &record.id,
            "anyone home?",
            MessageSource::External,
            true,
            Duration::from_millis(150),
        )
        .await;
    assert!(matches!(result, Err(OrchestratorError::Timeout(_))));

    let env = rig.orch.bus.envelope(&MessageId::new("inst-2")).unwrap();
    assert_eq!(env.status, foreman_core::MessageStatus::TimedOut);
}

#[tokio::test]
async fn terminate_preserves_artifacts_and_keeps_record() {
    let rig = rig().await;
    let record = spawn_ready(&rig, "a").await;
    tokio::fs::write(record.workspace.join("summary.md"), "result")
        .await
        .unwrap();

    let finished = rig.orch.terminate_instance(&record.id, false).await.unwrap();
    assert_eq!(finished.state, LifecycleState::Terminated);

    // Workspace deleted, artifacts preserved
    assert!(!record.workspace.exists());
    let preserved = rig
        .orch
        .config()
        .artifacts_root
        .join(record.id.as_str());
    assert!(preserved.join("summary.md").exists());
    assert!(preserved.join("_metadata.json").exists());

    // Record stays queryable with the flag
    assert!(rig.orch.registry.get(&record.id, false).is_none());
    assert!(rig.orch.registry.get(&record.id, true).is_some());
}

#[tokio::test]
async fn terminate_twice_is_not_found() {
    let rig = rig().await;
    let record = spawn_ready(&rig, "a").await;
    rig.orch.terminate_instance(&record.id, true).await.unwrap();

    let again = rig.orch.terminate_instance(&record.id, true).await;
    assert!(matches!(again, Err(OrchestratorError::NotFound(_))));
}

#[tokio::test]
async fn get_output_live_and_terminated() {
    let rig = rig().await;
    let record = spawn_ready(&rig, "a").await;
    rig.panes.push_output(&record.pane_id, &["alpha", "beta"]);

    let live = rig.orch.get_output(&record.id, 10).await.unwrap();
    assert!(live.contains("beta"));

    rig.orch.terminate_instance(&record.id, true).await.unwrap();
    let after = rig.orch.get_output(&record.id, 10).await.unwrap();
    assert!(after.contains("beta"));

    // Tail honors the line limit
    let tail = rig.orch.get_output(&record.id, 1).await.unwrap();
    assert_eq!(tail, "beta");
}

#[tokio::test]
async fn strip_reply_drops_echo_and_chrome() {
    let capture = "some earlier noise\n[MSG:m1] what is 2+2?\n> thinking\nThe answer is 4.\n? for shortcuts";
    let reply = strip_reply(capture, &MessageId::new("m1")).unwrap();
    assert_eq!(reply, "The answer is 4.");
}

#[tokio::test]
async fn strip_reply_without_echo_uses_whole_capture() {
    let capture = "╭────╮\n│ box │\nplain answer line";
    let reply = strip_reply(capture, &MessageId::new("m1")).unwrap();
    assert_eq!(reply, "plain answer line");
}

#[tokio::test]
async fn strip_reply_with_only_chrome_is_none() {
    let capture = "> \n? for shortcuts\n";
    assert!(strip_reply(capture, &MessageId::new("m1")).is_none());
}

#[tokio::test]
async fn shutdown_all_terminates_every_live_instance() {
    let rig = rig().await;
    spawn_ready(&rig, "a").await;
    spawn_ready(&rig, "b").await;

    rig.orch.shutdown_all().await;

    assert_eq!(rig.orch.registry.occupancy(), 0);
    assert_eq!(rig.orch.registry.list(true).len(), 2);
}

#[test]
fn tail_of_respects_zero_and_bounds() {
    assert_eq!(tail_of("a\nb\nc", 0), "a\nb\nc");
    assert_eq!(tail_of("a\nb\nc", 2), "b\nc");
    assert_eq!(tail_of("a\nb\nc", 10), "a\nb\nc");
}
