//! Scenario: the staged stuck-instance intervention ladder.

use crate::prelude::*;
use foreman_core::ProgressClass;
use std::time::Duration;

fn written(rig: &Rig, pane_id: &str) -> Vec<String> {
    rig.panes.get_pane(pane_id).unwrap().written
}

#[tokio::test]
async fn stuck_instance_gets_staged_interventions_then_escalation() {
    let rig = rig().await;
    let a = spawn(&rig, "a").await;

    // No tool_use or text events for 310s
    rig.clock.advance(Duration::from_secs(310));
    rig.orch.supervise_cycle().await;

    // Cycle 1: exactly one status-check message
    let messages = written(&rig, &a.pane_id);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Status check"));

    // Cycle 2: a follow-up help offer
    rig.clock.advance(Duration::from_secs(310));
    rig.orch.supervise_cycle().await;
    let messages = written(&rig, &a.pane_id);
    assert_eq!(messages.len(), 2);
    assert!(messages[1].contains("help"));

    // Cycle 3: a debugger helper appears, sharing A's parent
    rig.clock.advance(Duration::from_secs(310));
    rig.orch.supervise_cycle().await;
    let helper = rig
        .orch
        .registry
        .list(false)
        .into_iter()
        .find(|r| r.role == "debugger")
        .expect("helper spawned");
    assert_eq!(helper.parent_id, a.parent_id);
    let messages = written(&rig, &a.pane_id);
    assert_eq!(messages.len(), 3);

    // Cycle 4: escalation - no further intervention reaches A
    rig.clock.advance(Duration::from_secs(310));
    rig.orch.supervise_cycle().await;
    assert_eq!(written(&rig, &a.pane_id).len(), 3);

    let snapshot = rig.orch.progress_of(&a.id).unwrap();
    assert!(snapshot.escalated);
    assert_eq!(snapshot.classification, ProgressClass::Stuck);
}

#[tokio::test]
async fn active_instances_are_left_alone() {
    let rig = rig().await;
    let a = spawn(&rig, "a").await;
    rig.panes.push_output(
        &a.pane_id,
        &[r#"{"type":"tool_use","name":"Bash","id":"c1","input":{"command":"ls"}}"#],
    );

    rig.clock.advance(Duration::from_secs(30));
    rig.orch.supervise_cycle().await;

    assert!(written(&rig, &a.pane_id).is_empty());
    assert_eq!(
        rig.orch.progress_of(&a.id).unwrap().classification,
        ProgressClass::Active
    );
}
