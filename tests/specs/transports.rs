//! Scenario: the HTTP and stdio transports expose the same operations
//! with the same observable behavior.

use crate::prelude::*;
use axum_test::TestServer;
use foreman_daemon::{http, stdio, RpcState};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn http_call(server: &TestServer, op: &str, params: Value) -> Value {
    let response = server
        .post("/rpc")
        .json(&json!({"id": 1, "op": op, "params": params}))
        .await;
    response.json()
}

async fn stdio_exchange<P, C, G>(state: &Arc<RpcState<P, C, G>>, frame: &str) -> Value
where
    P: foreman_adapters::PaneAdapter,
    C: foreman_core::Clock,
    G: foreman_core::IdGen,
{
    let (mut client_write, server_read) = tokio::io::duplex(64 * 1024);
    let (mut server_write, mut client_read) = tokio::io::duplex(64 * 1024);
    let task = {
        let state = Arc::clone(state);
        tokio::spawn(async move { stdio::run(state, server_read, &mut server_write).await })
    };
    client_write.write_all(frame.as_bytes()).await.unwrap();
    client_write.write_all(b"\n").await.unwrap();
    client_write.shutdown().await.unwrap();
    task.await.unwrap().unwrap();

    let mut output = String::new();
    client_read.read_to_string(&mut output).await.unwrap();
    serde_json::from_str(output.trim()).unwrap()
}

#[tokio::test]
async fn both_transports_list_identical_operation_names() {
    let rig = rig().await;
    let state = Arc::new(RpcState::new(Arc::clone(&rig.orch)));
    let server = TestServer::new(http::build_router(Arc::clone(&state))).unwrap();

    let http_ops: Value = server.get("/rpc/ops").await.json();
    let stdio_ops = stdio_exchange(
        &state,
        r#"{"id": 1, "op": "list_operations", "params": {}}"#,
    )
    .await;

    let names_of = |ops: &Value| -> Vec<String> {
        ops.as_array()
            .unwrap()
            .iter()
            .map(|o| o["name"].as_str().unwrap().to_string())
            .collect()
    };
    let http_names = names_of(&http_ops["operations"]);
    let stdio_names = names_of(&stdio_ops["result"]["operations"]);
    assert_eq!(http_names, stdio_names);
    assert!(http_names.contains(&"spawn".to_string()));
}

#[tokio::test]
async fn same_call_same_shape_on_both_transports() {
    let rig = rig().await;
    let state = Arc::new(RpcState::new(Arc::clone(&rig.orch)));
    let server = TestServer::new(http::build_router(Arc::clone(&state))).unwrap();

    // Same spawn via each transport: same reply shape, same effect
    let via_http = http_call(
        &server,
        "spawn",
        json!({"name": "h", "kind": "claude", "wait_for_ready": true}),
    )
    .await;
    let via_stdio = stdio_exchange(
        &state,
        r#"{"id": 1, "op": "spawn", "params": {"name": "s", "kind": "claude", "wait_for_ready": true}}"#,
    )
    .await;

    let http_result = &via_http["result"];
    let stdio_result = &via_stdio["result"];
    let keys = |v: &Value| {
        let mut k: Vec<String> = v.as_object().unwrap().keys().cloned().collect();
        k.sort();
        k
    };
    assert_eq!(keys(http_result), keys(stdio_result));
    assert_eq!(http_result["state"], stdio_result["state"]);

    // Both instances are visible regardless of which transport looks
    let listed_http = http_call(&server, "list_instances", json!({})).await;
    assert_eq!(listed_http["result"]["instances"].as_array().unwrap().len(), 2);
    let listed_stdio = stdio_exchange(
        &state,
        r#"{"id": 2, "op": "list_instances", "params": {}}"#,
    )
    .await;
    assert_eq!(
        listed_stdio["result"]["instances"].as_array().unwrap().len(),
        2
    );
}

#[tokio::test]
async fn errors_have_identical_shape_on_both_transports() {
    let rig = rig().await;
    let state = Arc::new(RpcState::new(Arc::clone(&rig.orch)));
    let server = TestServer::new(http::build_router(Arc::clone(&state))).unwrap();

    let via_http = http_call(&server, "get_instance", json!({"instance_id": "ghost"})).await;
    let via_stdio = stdio_exchange(
        &state,
        r#"{"id": 1, "op": "get_instance", "params": {"instance_id": "ghost"}}"#,
    )
    .await;

    assert_eq!(via_http["error"]["kind"], "not_found");
    assert_eq!(via_http["error"]["kind"], via_stdio["error"]["kind"]);
    assert_eq!(via_http["error"]["message"], via_stdio["error"]["message"]);
}
