//! Shared fixtures for the behavioral specs.

use foreman_adapters::FakePaneAdapter;
use foreman_core::{FakeClock, InstanceId, InstanceKind, InstanceRecord, SequentialIdGen};
use foreman_engine::{Config, Orchestrator, SpawnRequest};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub type SpecOrchestrator = Orchestrator<FakePaneAdapter, FakeClock, SequentialIdGen>;

pub struct Rig {
    pub orch: Arc<SpecOrchestrator>,
    pub panes: FakePaneAdapter,
    pub clock: FakeClock,
    pub _dir: TempDir,
}

/// Orchestrator over fake panes that boot ready, rooted in a tempdir.
pub async fn rig() -> Rig {
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

    Rig {
        orch,
        panes,
        clock,
        _dir: dir,
    }
}

/// Spawn a ready Claude-style instance.
pub async fn spawn(rig: &Rig, name: &str) -> InstanceRecord {
    let mut request = SpawnRequest::new(name, InstanceKind::Claude);
    request.wait_for_ready = true;
    rig.orch.spawn_instance(request).await.expect("spawn")
}

/// Spawn a ready child of `parent`.
pub async fn spawn_under(rig: &Rig, name: &str, parent: &InstanceId) -> InstanceRecord {
    let mut request = SpawnRequest::new(name, InstanceKind::Claude);
    request.wait_for_ready = true;
    request.parent_id = Some(parent.clone());
    rig.orch.spawn_instance(request).await.expect("spawn child")
}

/// Background task answering every delivered message to `target` with a
/// fixed reply, the way a cooperative assistant uses reply_to_caller.
pub fn auto_respond(orch: Arc<SpecOrchestrator>, target: InstanceId, reply: &str) {
    let reply = reply.to_string();
    tokio::spawn(async move {
        for _ in 0..2000 {
            for env in orch.bus.open_for_target(&target) {
                if env.status == foreman_core::MessageStatus::Delivered {
                    let _ = orch.reply_to_message(&env.id, &reply).await;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });
}
