// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for transport tests.

use crate::rpc::RpcState;
use foreman_adapters::FakePaneAdapter;
use foreman_core::{FakeClock, SequentialIdGen};
use foreman_engine::{Config, Orchestrator};
use std::sync::Arc;
use tempfile::TempDir;

pub type TestState = RpcState<FakePaneAdapter, FakeClock, SequentialIdGen>;

pub struct TestRig {
    pub state: Arc<TestState>,
    pub panes: FakePaneAdapter,
    pub _dir: TempDir,
}

/// RPC state over fake panes, ready-on-boot, rooted in a temp directory.
pub async fn rig() -> TestRig {
    let dir = tempfile::tempdir().expect("tempdir");
    let panes = FakePaneAdapter::new();
    panes.set_default_output(vec![
        "? for shortcuts".to_string(),
        "Ctrl+C to exit".to_string(),
    ]);
    let orch = Orchestrator::start(
        Config::for_root(dir.path()),
        panes.clone(),
        FakeClock::new(),
        SequentialIdGen::new("inst"),
    )
    .await
    .expect("orchestrator start");

    TestRig {
        state: Arc::new(RpcState::new(orch)),
        panes,
        _dir: dir,
    }
}
