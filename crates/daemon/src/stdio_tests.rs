// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::rig;
use serde_json::json;
use tokio::io::AsyncReadExt;

/// Drive the stdio loop with scripted input lines; returns the parsed
/// response frames.
async fn exchange(input: &str) -> Vec<RpcResponse> {
    let rig = rig().await;
    let (client_write, server_read) = tokio::io::duplex(64 * 1024);
    let (mut server_write, mut client_read) = tokio::io::duplex(64 * 1024);

    let task = {
        let state = Arc::clone(&rig.state);
        tokio::spawn(async move { run(state, server_read, &mut server_write).await })
    };

    {
        use tokio::io::AsyncWriteExt;
        let mut writer = client_write;
        writer.write_all(input.as_bytes()).await.unwrap();
        writer.shutdown().await.unwrap();
        // Dropping the writer closes the stream; run() sees EOF
    }

    task.await.unwrap().unwrap();

    let mut output = String::new();
    client_read.read_to_string(&mut output).await.unwrap();
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn one_response_per_request_line() {
    let responses = exchange(
        "{\"id\": 1, \"op\": \"health_check\", \"params\": {}}\n\
         {\"id\": 2, \"op\": \"get_capacity\", \"params\": {}}\n",
    )
    .await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].id, json!(1));
    assert_eq!(
        responses[0].result.as_ref().unwrap()["live_instances"],
        json!(0)
    );
    assert_eq!(responses[1].id, json!(2));
}

#[tokio::test]
async fn blank_lines_are_skipped() {
    let responses =
        exchange("\n\n{\"id\": 7, \"op\": \"health_check\", \"params\": {}}\n\n").await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].id, json!(7));
}

#[tokio::test]
async fn malformed_frames_get_error_responses() {
    let responses = exchange("this is not json\n").await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].id, json!(null));
    let error = responses[0].error.as_ref().unwrap();
    assert_eq!(error.kind, foreman_core::ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn spawn_works_over_stdio() {
    let responses = exchange(
        "{\"id\": 1, \"op\": \"spawn\", \"params\": {\"name\": \"w\", \"kind\": \"claude\", \"wait_for_ready\": true}}\n",
    )
    .await;

    assert_eq!(responses.len(), 1);
    let result = responses[0].result.as_ref().unwrap();
    assert_eq!(result["instance_id"], "inst-1");
}

#[tokio::test]
async fn unknown_operations_error_identically_to_http() {
    let responses = exchange("{\"id\": 1, \"op\": \"warp_drive\", \"params\": {}}\n").await;
    let error = responses[0].error.as_ref().unwrap();
    assert_eq!(error.kind, foreman_core::ErrorKind::InvalidArgument);
    assert!(error.hint.as_ref().unwrap().contains("spawn"));
}
