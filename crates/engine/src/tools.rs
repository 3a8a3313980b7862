// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tool surface: an explicit registry of typed operation descriptors.
//!
//! Both RPC transports iterate this registry and dispatch through it, so
//! the operation set and semantics cannot drift between HTTP and stdio.
//! Handlers are closures that receive the orchestrator as an explicit
//! `(ctx, input)` pair - the transport layer never sees a receiver.

use crate::coordinator::CoordinateMode;
use crate::instance::SpawnRequest;
use crate::orchestrator::Orchestrator;
use foreman_adapters::PaneAdapter;
use foreman_core::{
    format_day_stamp, Clock, IdGen, InstanceId, InstanceKind, MessageId, MessageSource,
    OrchestratorError,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Default reply deadline when the caller does not pass one.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, OrchestratorError>> + Send>>;

type Handler<P, C, G> =
    Box<dyn Fn(Arc<Orchestrator<P, C, G>>, Value) -> HandlerFuture + Send + Sync>;

/// One operation of the tool surface.
pub struct ToolDescriptor<P: PaneAdapter, C: Clock, G: IdGen> {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub output_schema: Value,
    pub handler: Handler<P, C, G>,
}

/// Parse an operation's params, mapping serde errors to `InvalidArgument`.
/// Omitted params arrive as null and are treated as an empty object.
fn params<T: DeserializeOwned>(op: &str, value: Value) -> Result<T, OrchestratorError> {
    let value = if value.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        value
    };
    serde_json::from_value(value).map_err(|e| {
        OrchestratorError::invalid_argument(
            format!("bad params for {}: {}", op, e),
            format!("see the input schema of {}", op),
        )
    })
}

fn object_schema(required: &[&str], properties: Value) -> Value {
    json!({
        "type": "object",
        "required": required,
        "properties": properties,
    })
}

fn instance_id_of(s: &str) -> InstanceId {
    InstanceId::new(s)
}

/// Dispatch one operation by name through the registry.
pub async fn dispatch<P: PaneAdapter, C: Clock, G: IdGen>(
    registry: &[ToolDescriptor<P, C, G>],
    orch: &Arc<Orchestrator<P, C, G>>,
    op: &str,
    params: Value,
) -> Result<Value, OrchestratorError> {
    // list_operations reads the registry itself, so it is answered here
    // rather than from inside a handler.
    if op == "list_operations" {
        return Ok(json!({ "operations": describe(registry) }));
    }
    let descriptor = registry.iter().find(|d| d.name == op).ok_or_else(|| {
        OrchestratorError::invalid_argument(
            format!("unknown operation '{}'", op),
            format!("valid operations: {}", operation_names(registry).join(", ")),
        )
    })?;
    (descriptor.handler)(Arc::clone(orch), params).await
}

/// Operation names in registry order.
pub fn operation_names<P: PaneAdapter, C: Clock, G: IdGen>(
    registry: &[ToolDescriptor<P, C, G>],
) -> Vec<String> {
    registry.iter().map(|d| d.name.to_string()).collect()
}

#[derive(Deserialize)]
struct SpawnParams {
    name: String,
    kind: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    initial_prompt: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    wait_for_ready: bool,
}

#[derive(Deserialize)]
struct InstanceParams {
    instance_id: String,
    #[serde(default)]
    include_terminated: bool,
}

#[derive(Deserialize)]
struct TerminateParams {
    instance_id: String,
    #[serde(default)]
    force: bool,
}

#[derive(Deserialize)]
struct SendParams {
    instance_id: String,
    payload: String,
    #[serde(default)]
    wait_for_reply: bool,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    source_instance: Option<String>,
}

#[derive(Deserialize)]
struct OutputParams {
    instance_id: String,
    #[serde(default)]
    tail_lines: Option<u32>,
}

#[derive(Deserialize)]
struct ListParams {
    #[serde(default)]
    include_terminated: bool,
}

#[derive(Deserialize)]
struct BroadcastParams {
    parent_id: String,
    payload: String,
}

#[derive(Deserialize)]
struct CoordinateParams {
    targets: Vec<String>,
    mode: String,
    payload: String,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

#[derive(Deserialize)]
struct ReplyParams {
    message_id: String,
    reply: String,
}

#[derive(Deserialize)]
struct CancelParams {
    message_id: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct RootParams {
    root_id: String,
}

#[derive(Deserialize)]
struct LimitParams {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct InstanceLimitParams {
    instance_id: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct AuditParams {
    #[serde(default)]
    day: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

macro_rules! tool {
    ($name:literal, $description:literal, $input:expr, $output:expr, $handler:expr) => {
        ToolDescriptor {
            name: $name,
            description: $description,
            input_schema: $input,
            output_schema: $output,
            handler: Box::new($handler),
        }
    };
}

/// Build the full operation registry. Called once per transport process;
/// both transports share the returned descriptors.
#[allow(clippy::too_many_lines)]
pub fn registry<P: PaneAdapter, C: Clock, G: IdGen>() -> Vec<ToolDescriptor<P, C, G>> {
    vec![
        tool!(
            "spawn",
            "Spawn a new assistant instance",
            object_schema(
                &["name", "kind"],
                json!({
                    "name": {"type": "string"},
                    "kind": {"type": "string", "enum": ["claude", "codex"]},
                    "role": {"type": "string"},
                    "parent_id": {"type": "string"},
                    "system_prompt": {"type": "string"},
                    "initial_prompt": {"type": "string"},
                    "model": {"type": "string"},
                    "wait_for_ready": {"type": "boolean"},
                })
            ),
            object_schema(&["instance_id"], json!({"instance_id": {"type": "string"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: SpawnParams = params("spawn", value)?;
                    let kind = InstanceKind::parse(&p.kind).ok_or_else(|| {
                        OrchestratorError::invalid_argument(
                            format!("unknown kind '{}'", p.kind),
                            "valid kinds: claude, codex",
                        )
                    })?;
                    let mut request = SpawnRequest::new(p.name, kind);
                    if let Some(role) = p.role {
                        request.role = role;
                    }
                    request.parent_id = p.parent_id.map(InstanceId::new);
                    request.system_prompt = p.system_prompt;
                    request.initial_prompt = p.initial_prompt;
                    request.model = p.model;
                    request.wait_for_ready = p.wait_for_ready;
                    let record = orch.spawn_instance(request).await?;
                    Ok(json!({
                        "instance_id": record.id.as_str(),
                        "name": record.name,
                        "state": record.state,
                        "workspace": record.workspace.display().to_string(),
                    }))
                })
            }
        ),
        tool!(
            "terminate",
            "Terminate an instance, preserving artifacts",
            object_schema(
                &["instance_id"],
                json!({
                    "instance_id": {"type": "string"},
                    "force": {"type": "boolean"},
                })
            ),
            object_schema(&[], json!({"instance_id": {"type": "string"}, "stats": {"type": "object"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: TerminateParams = params("terminate", value)?;
                    let record = orch
                        .terminate_instance(&instance_id_of(&p.instance_id), p.force)
                        .await?;
                    Ok(json!({
                        "instance_id": record.id.as_str(),
                        "state": record.state,
                        "stats": record.stats,
                    }))
                })
            }
        ),
        tool!(
            "send",
            "Send a message to an instance, optionally awaiting the reply",
            object_schema(
                &["instance_id", "payload"],
                json!({
                    "instance_id": {"type": "string"},
                    "payload": {"type": "string"},
                    "wait_for_reply": {"type": "boolean"},
                    "timeout_ms": {"type": "integer"},
                    "source_instance": {"type": "string"},
                })
            ),
            object_schema(
                &["message_id"],
                json!({"message_id": {"type": "string"}, "reply": {"type": "string"}})
            ),
            |orch, value| {
                Box::pin(async move {
                    let p: SendParams = params("send", value)?;
                    let source = match p.source_instance {
                        Some(id) => MessageSource::Instance(InstanceId::new(id)),
                        None => MessageSource::External,
                    };
                    let timeout =
                        Duration::from_millis(p.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS));
                    let outcome = orch
                        .send_message(
                            &instance_id_of(&p.instance_id),
                            &p.payload,
                            source,
                            p.wait_for_reply,
                            timeout,
                        )
                        .await?;
                    Ok(json!({
                        "message_id": outcome.message_id.as_str(),
                        "reply": outcome.reply,
                    }))
                })
            }
        ),
        tool!(
            "get_output",
            "Capture an instance's recent pane output",
            object_schema(
                &["instance_id"],
                json!({
                    "instance_id": {"type": "string"},
                    "tail_lines": {"type": "integer"},
                })
            ),
            object_schema(&["output"], json!({"output": {"type": "string"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: OutputParams = params("get_output", value)?;
                    let output = orch
                        .get_output(&instance_id_of(&p.instance_id), p.tail_lines.unwrap_or(100))
                        .await?;
                    Ok(json!({ "output": output }))
                })
            }
        ),
        tool!(
            "list_instances",
            "List instance records",
            object_schema(&[], json!({"include_terminated": {"type": "boolean"}})),
            object_schema(&["instances"], json!({"instances": {"type": "array"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: ListParams = params("list_instances", value)?;
                    let records = orch.registry.list(p.include_terminated);
                    Ok(json!({ "instances": records }))
                })
            }
        ),
        tool!(
            "get_instance",
            "Fetch one instance record",
            object_schema(
                &["instance_id"],
                json!({
                    "instance_id": {"type": "string"},
                    "include_terminated": {"type": "boolean"},
                })
            ),
            object_schema(&["instance"], json!({"instance": {"type": "object"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: InstanceParams = params("get_instance", value)?;
                    let record = orch
                        .registry
                        .get_required(&instance_id_of(&p.instance_id), p.include_terminated)?;
                    Ok(json!({ "instance": record }))
                })
            }
        ),
        tool!(
            "get_children",
            "List an instance's direct children",
            object_schema(
                &["instance_id"],
                json!({
                    "instance_id": {"type": "string"},
                    "include_terminated": {"type": "boolean"},
                })
            ),
            object_schema(&["children"], json!({"children": {"type": "array"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: InstanceParams = params("get_children", value)?;
                    let id = instance_id_of(&p.instance_id);
                    orch.registry.get_required(&id, true)?;
                    let children = orch.registry.children_of(&id, p.include_terminated);
                    Ok(json!({ "children": children }))
                })
            }
        ),
        tool!(
            "purge_instance",
            "Drop a terminated instance's record",
            object_schema(&["instance_id"], json!({"instance_id": {"type": "string"}})),
            object_schema(&[], json!({})),
            |orch, value| {
                Box::pin(async move {
                    let p: InstanceParams = params("purge_instance", value)?;
                    orch.purge_instance(&instance_id_of(&p.instance_id))?;
                    Ok(json!({ "purged": true }))
                })
            }
        ),
        tool!(
            "broadcast",
            "Deliver a payload to every child of a parent",
            object_schema(
                &["parent_id", "payload"],
                json!({
                    "parent_id": {"type": "string"},
                    "payload": {"type": "string"},
                })
            ),
            object_schema(&["results"], json!({"results": {"type": "array"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: BroadcastParams = params("broadcast", value)?;
                    let results = orch
                        .broadcast(&instance_id_of(&p.parent_id), &p.payload)
                        .await?;
                    Ok(json!({ "results": results }))
                })
            }
        ),
        tool!(
            "coordinate",
            "Run a sequential, parallel, or consensus workflow over targets",
            object_schema(
                &["targets", "mode", "payload"],
                json!({
                    "targets": {"type": "array", "items": {"type": "string"}},
                    "mode": {"type": "string", "enum": ["sequential", "parallel", "consensus"]},
                    "payload": {"type": "string"},
                    "timeout_ms": {"type": "integer"},
                })
            ),
            object_schema(&["replies"], json!({"replies": {"type": "array"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: CoordinateParams = params("coordinate", value)?;
                    let mode = CoordinateMode::parse(&p.mode).ok_or_else(|| {
                        OrchestratorError::invalid_argument(
                            format!("unknown mode '{}'", p.mode),
                            "valid modes: sequential, parallel, consensus",
                        )
                    })?;
                    let targets: Vec<InstanceId> =
                        p.targets.iter().map(|t| InstanceId::new(t.clone())).collect();
                    let timeout =
                        Duration::from_millis(p.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS));
                    let outcome = orch.coordinate(&targets, mode, &p.payload, timeout).await?;
                    serde_json::to_value(outcome)
                        .map_err(|e| OrchestratorError::Internal(e.to_string()))
                })
            }
        ),
        tool!(
            "reply_to_caller",
            "Attach an explicit reply to an outstanding message",
            object_schema(
                &["message_id", "reply"],
                json!({
                    "message_id": {"type": "string"},
                    "reply": {"type": "string"},
                })
            ),
            object_schema(&[], json!({})),
            |orch, value| {
                Box::pin(async move {
                    let p: ReplyParams = params("reply_to_caller", value)?;
                    orch.reply_to_message(&MessageId::new(p.message_id), &p.reply)
                        .await?;
                    Ok(json!({ "replied": true }))
                })
            }
        ),
        tool!(
            "check_messages",
            "List open messages awaiting a reply from an instance",
            object_schema(&["instance_id"], json!({"instance_id": {"type": "string"}})),
            object_schema(&["messages"], json!({"messages": {"type": "array"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: InstanceParams = params("check_messages", value)?;
                    let open = orch.bus.open_for_target(&instance_id_of(&p.instance_id));
                    Ok(json!({ "messages": open }))
                })
            }
        ),
        tool!(
            "cancel_message",
            "Cancel an outstanding message",
            object_schema(
                &["message_id"],
                json!({
                    "message_id": {"type": "string"},
                    "reason": {"type": "string"},
                })
            ),
            object_schema(&[], json!({})),
            |orch, value| {
                Box::pin(async move {
                    let p: CancelParams = params("cancel_message", value)?;
                    orch.bus
                        .cancel(&MessageId::new(p.message_id), p.reason.as_deref());
                    Ok(json!({ "cancelled": true }))
                })
            }
        ),
        tool!(
            "collect_team_artifacts",
            "Gather artifacts from every descendant of a team root",
            object_schema(&["root_id"], json!({"root_id": {"type": "string"}})),
            object_schema(&["entries"], json!({"entries": {"type": "array"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: RootParams = params("collect_team_artifacts", value)?;
                    let manifest = orch
                        .collect_team_artifacts(&instance_id_of(&p.root_id))
                        .await?;
                    serde_json::to_value(manifest)
                        .map_err(|e| OrchestratorError::Internal(e.to_string()))
                })
            }
        ),
        tool!(
            "get_progress",
            "Supervisor progress snapshot for one instance",
            object_schema(&["instance_id"], json!({"instance_id": {"type": "string"}})),
            object_schema(&["progress"], json!({"progress": {"type": "object"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: InstanceParams = params("get_progress", value)?;
                    let id = instance_id_of(&p.instance_id);
                    let snapshot = orch.progress_of(&id).ok_or_else(|| {
                        OrchestratorError::NotFound(format!("instance {}", id))
                    })?;
                    Ok(json!({ "progress": snapshot }))
                })
            }
        ),
        tool!(
            "list_progress",
            "Progress snapshots for all instances",
            object_schema(&[], json!({})),
            object_schema(&["progress"], json!({"progress": {"type": "object"}})),
            |orch, _value| {
                Box::pin(async move {
                    let map: serde_json::Map<String, Value> = orch
                        .progress_all()
                        .into_iter()
                        .filter_map(|(id, snapshot)| {
                            serde_json::to_value(snapshot)
                                .ok()
                                .map(|v| (id.to_string(), v))
                        })
                        .collect();
                    Ok(json!({ "progress": map }))
                })
            }
        ),
        tool!(
            "evaluate_network",
            "Run one supervisor evaluation cycle now",
            object_schema(&[], json!({})),
            object_schema(&[], json!({})),
            |orch, _value| {
                Box::pin(async move {
                    orch.supervise_cycle().await;
                    Ok(json!({ "evaluated": true }))
                })
            }
        ),
        tool!(
            "get_transcript",
            "Structured transcript history for an instance",
            object_schema(
                &["instance_id"],
                json!({
                    "instance_id": {"type": "string"},
                    "limit": {"type": "integer"},
                })
            ),
            object_schema(&["events"], json!({"events": {"type": "array"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: InstanceLimitParams = params("get_transcript", value)?;
                    let id = instance_id_of(&p.instance_id);
                    orch.registry.get_required(&id, true)?;
                    let events = orch.transcript_of(&id, p.limit.unwrap_or(100));
                    Ok(json!({ "events": events }))
                })
            }
        ),
        tool!(
            "read_communication_log",
            "Tail an instance's communication journal",
            object_schema(
                &["instance_id"],
                json!({
                    "instance_id": {"type": "string"},
                    "limit": {"type": "integer"},
                })
            ),
            object_schema(&["records"], json!({"records": {"type": "array"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: InstanceLimitParams = params("read_communication_log", value)?;
                    let records = orch
                        .logs
                        .read_comm(&instance_id_of(&p.instance_id), p.limit.unwrap_or(100))
                        .await
                        .map_err(|e| OrchestratorError::Internal(e.to_string()))?;
                    Ok(json!({ "records": records }))
                })
            }
        ),
        tool!(
            "read_audit_log",
            "Tail a day's audit journal (defaults to today)",
            object_schema(
                &[],
                json!({
                    "day": {"type": "string", "description": "YYYYMMDD"},
                    "limit": {"type": "integer"},
                })
            ),
            object_schema(&["records"], json!({"records": {"type": "array"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: AuditParams = params("read_audit_log", value)?;
                    let day = p
                        .day
                        .unwrap_or_else(|| format_day_stamp(orch.clock().epoch_ms()));
                    let records = orch
                        .logs
                        .read_audit(&day, p.limit.unwrap_or(100))
                        .await
                        .map_err(|e| OrchestratorError::Internal(e.to_string()))?;
                    Ok(json!({ "day": day, "records": records }))
                })
            }
        ),
        tool!(
            "monitor_recent",
            "Recent monitor-feed events from the ring buffer",
            object_schema(&[], json!({"limit": {"type": "integer"}})),
            object_schema(&["events"], json!({"events": {"type": "array"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: LimitParams = params("monitor_recent", value)?;
                    let events = orch.feed.recent(p.limit.unwrap_or(100));
                    Ok(json!({ "events": events }))
                })
            }
        ),
        tool!(
            "health_check",
            "Orchestrator health and occupancy",
            object_schema(&[], json!({})),
            object_schema(
                &["live_instances"],
                json!({
                    "live_instances": {"type": "integer"},
                    "max_instances": {"type": "integer"},
                    "uptime_secs": {"type": "integer"},
                })
            ),
            |orch, _value| {
                Box::pin(async move {
                    let (live, max) = orch.health_check();
                    Ok(json!({
                        "live_instances": live,
                        "max_instances": max,
                        "uptime_secs": orch.uptime_secs(),
                    }))
                })
            }
        ),
        tool!(
            "get_capacity",
            "Current occupancy against the instance cap",
            object_schema(&[], json!({})),
            object_schema(
                &["live_instances", "max_instances"],
                json!({
                    "live_instances": {"type": "integer"},
                    "max_instances": {"type": "integer"},
                })
            ),
            |orch, _value| {
                Box::pin(async move {
                    Ok(json!({
                        "live_instances": orch.registry.occupancy(),
                        "max_instances": orch.config().max_instances,
                    }))
                })
            }
        ),
        tool!(
            "get_stats",
            "Running totals for one instance",
            object_schema(&["instance_id"], json!({"instance_id": {"type": "string"}})),
            object_schema(&["stats"], json!({"stats": {"type": "object"}})),
            |orch, value| {
                Box::pin(async move {
                    let p: InstanceParams = params("get_stats", value)?;
                    let record = orch
                        .registry
                        .get_required(&instance_id_of(&p.instance_id), true)?;
                    Ok(json!({ "stats": record.stats }))
                })
            }
        ),
        tool!(
            "list_operations",
            "Names and schemas of every operation on this surface",
            object_schema(&[], json!({})),
            object_schema(&["operations"], json!({"operations": {"type": "array"}})),
            |_orch, _value| {
                // Answered by dispatch(), which holds the registry; this
                // descriptor exists so both surfaces list the operation.
                Box::pin(async move { Ok(json!({ "operations": [] })) })
            }
        ),
    ]
}

/// Serializable descriptor listing for `list_operations` and `GET /rpc/ops`.
pub fn describe<P: PaneAdapter, C: Clock, G: IdGen>(
    registry: &[ToolDescriptor<P, C, G>],
) -> Value {
    Value::Array(
        registry
            .iter()
            .map(|d| {
                json!({
                    "name": d.name,
                    "description": d.description,
                    "input_schema": d.input_schema,
                    "output_schema": d.output_schema,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
