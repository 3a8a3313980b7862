// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::config::Config;
use crate::instance::SpawnRequest;
use crate::orchestrator::Orchestrator;
use foreman_adapters::FakePaneAdapter;
use foreman_core::{FakeClock, InstanceKind, InstanceRecord, SequentialIdGen};
use std::sync::Arc;
use tempfile::TempDir;

pub type TestOrchestrator = Orchestrator<FakePaneAdapter, FakeClock, SequentialIdGen>;

pub struct TestRig {
    pub orch: Arc<TestOrchestrator>,
    pub panes: FakePaneAdapter,
    pub clock: FakeClock,
    // Held so the on-disk roots outlive the test
    pub _dir: TempDir,
}

/// Orchestrator over fake panes, a fake clock, and sequential ids, rooted
/// in a temp directory. New panes boot "ready" so spawns with
/// `wait_for_ready` complete synchronously.
pub async fn rig() -> TestRig {
    let dir = tempfile::tempdir().expect("tempdir");
    let panes = FakePaneAdapter::new();
    panes.set_default_output(vec![
        "? for shortcuts".to_string(),
        "Ctrl+C to exit".to_string(),
    ]);
    let clock = FakeClock::new();
    let orch = Orchestrator::start(
        Config::for_root(dir.path()),
        panes.clone(),
        clock.clone(),
        SequentialIdGen::new("inst"),
    )
    .await
    .expect("orchestrator start");

    TestRig {
        orch,
        panes,
        clock,
        _dir: dir,
    }
}

/// Spawn a ready Claude-style instance.
pub async fn spawn_ready(rig: &TestRig, name: &str) -> InstanceRecord {
    let mut request = SpawnRequest::new(name, InstanceKind::Claude);
    request.wait_for_ready = true;
    rig.orch.spawn_instance(request).await.expect("spawn")
}

/// Spawn a ready instance with a parent link.
pub async fn spawn_child(rig: &TestRig, name: &str, parent: &InstanceRecord) -> InstanceRecord {
    let mut request = SpawnRequest::new(name, InstanceKind::Claude);
    request.wait_for_ready = true;
    request.parent_id = Some(parent.id.clone());
    rig.orch.spawn_instance(request).await.expect("spawn child")
}
