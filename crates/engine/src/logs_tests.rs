// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use foreman_core::AuditEvent;

async fn wait_for_file(path: &Path) {
    for _ in 0..100 {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("file never appeared: {}", path.display());
}

fn comm_record(message_id: &str) -> CommRecord {
    CommRecord {
        time: "2026-08-01T09:30:05.000Z".to_string(),
        event: CommDirection::Sent,
        message_id: message_id.to_string(),
        direction: "out".to_string(),
        content: "hello".to_string(),
        tokens: Some(2),
        cost: Some(0.000006),
        response_time: None,
    }
}

#[tokio::test]
async fn comm_records_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let logs = LogPlane::start(dir.path()).await.unwrap();
    let id = InstanceId::new("i1");

    logs.log_comm(&id, comm_record("m1")).await;
    logs.log_comm(&id, comm_record("m2")).await;

    let path = dir
        .path()
        .join("instances/i1/communication.jsonl");
    wait_for_file(&path).await;

    // Writer task is async; poll until both records land
    for _ in 0..100 {
        if logs.read_comm(&id, 0).await.unwrap().len() == 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let records = logs.read_comm(&id, 0).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].message_id, "m1");
    assert_eq!(records[1].message_id, "m2");
}

#[tokio::test]
async fn comm_read_tail_limit() {
    let dir = tempfile::tempdir().unwrap();
    let logs = LogPlane::start(dir.path()).await.unwrap();
    let id = InstanceId::new("i1");

    for i in 0..5 {
        logs.log_comm(&id, comm_record(&format!("m{}", i))).await;
    }
    for _ in 0..100 {
        if logs.read_comm(&id, 0).await.unwrap().len() == 5 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let tail = logs.read_comm(&id, 2).await.unwrap();
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].message_id, "m3");
    assert_eq!(tail[1].message_id, "m4");
}

#[tokio::test]
async fn comm_writer_also_writes_human_log() {
    let dir = tempfile::tempdir().unwrap();
    let logs = LogPlane::start(dir.path()).await.unwrap();
    let id = InstanceId::new("i1");

    logs.log_comm(&id, comm_record("m1")).await;

    let path = dir.path().join("instances/i1/instance.log");
    wait_for_file(&path).await;
    let mut body = String::new();
    for _ in 0..100 {
        body = tokio::fs::read_to_string(&path).await.unwrap();
        if !body.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(body.contains("m1"));
    assert!(body.contains("out"));
}

#[tokio::test]
async fn audit_journal_is_daily_and_readable() {
    let dir = tempfile::tempdir().unwrap();
    let logs = LogPlane::start(dir.path()).await.unwrap();

    // 2026-08-01
    let now_ms: u64 = 1_785_576_605_123;
    logs.log_audit(
        now_ms,
        AuditRecord {
            time: foreman_core::format_iso_utc(now_ms),
            event_type: AuditEvent::InstanceSpawn,
            instance_id: InstanceId::new("i1"),
            details: serde_json::json!({"name": "builder"}),
        },
    )
    .await;

    let path = dir.path().join("audit/audit-20260801.jsonl");
    wait_for_file(&path).await;

    let mut records = Vec::new();
    for _ in 0..100 {
        records = logs.read_audit("20260801", 0).await.unwrap();
        if !records.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_type, AuditEvent::InstanceSpawn);
}

#[tokio::test]
async fn raw_capture_appends() {
    let dir = tempfile::tempdir().unwrap();
    let logs = LogPlane::start(dir.path()).await.unwrap();
    let id = InstanceId::new("i1");

    logs.log_raw_capture(&id, "first capture").await;
    logs.log_raw_capture(&id, "second capture").await;

    let path = dir.path().join("instances/i1/tmux_output.log");
    wait_for_file(&path).await;
    for _ in 0..100 {
        let body = tokio::fs::read_to_string(&path).await.unwrap_or_default();
        if body.contains("second capture") {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("second capture never landed");
}

#[tokio::test]
async fn partial_trailing_garbage_does_not_break_reads() {
    let dir = tempfile::tempdir().unwrap();
    let logs = LogPlane::start(dir.path()).await.unwrap();
    let id = InstanceId::new("i1");

    logs.log_comm(&id, comm_record("m1")).await;
    let path = dir.path().join("instances/i1/communication.jsonl");
    wait_for_file(&path).await;

    // Simulate a torn write after the last complete record
    let mut body = tokio::fs::read_to_string(&path).await.unwrap();
    body.push_str("{\"time\":\"2026-");
    tokio::fs::write(&path, body).await.unwrap();

    let records = logs.read_comm(&id, 0).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn retention_sweep_removes_only_expired_journals() {
    let dir = tempfile::tempdir().unwrap();
    let logs = LogPlane::start(dir.path()).await.unwrap();
    let audit_dir = dir.path().join("audit");

    tokio::fs::write(audit_dir.join("audit-20260601.jsonl"), "{}\n")
        .await
        .unwrap();
    tokio::fs::write(audit_dir.join("audit-20260730.jsonl"), "{}\n")
        .await
        .unwrap();
    tokio::fs::write(audit_dir.join("not-an-audit.txt"), "x")
        .await
        .unwrap();

    // Now = 2026-08-01; 30-day cutoff keeps July 30, drops June 1
    let removed = logs.sweep_audit_retention(1_785_576_605_123).await.unwrap();
    assert_eq!(removed, 1);
    assert!(!audit_dir.join("audit-20260601.jsonl").exists());
    assert!(audit_dir.join("audit-20260730.jsonl").exists());
    assert!(audit_dir.join("not-an-audit.txt").exists());
}
