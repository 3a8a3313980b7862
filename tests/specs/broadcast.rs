//! Scenario: broadcasting to a team with a terminated member, then
//! collecting the team's artifacts.

use crate::prelude::*;
use foreman_core::ErrorKind;
use foreman_engine::ArtifactSource;

#[tokio::test]
async fn broadcast_and_artifacts_survive_a_terminated_child() {
    let rig = rig().await;
    let p = spawn(&rig, "p").await;
    let c1 = spawn_under(&rig, "c1", &p.id).await;
    let c2 = spawn_under(&rig, "c2", &p.id).await;

    // C1 produced an artifact, then terminated (preservation on)
    tokio::fs::write(c1.workspace.join("findings.md"), "c1 findings")
        .await
        .unwrap();
    rig.orch.terminate_instance(&c1.id, true).await.unwrap();

    // Broadcast reaches C2 and reports C1 as an error, not a skip
    let results = rig.orch.broadcast(&p.id, "status").await.unwrap();
    assert_eq!(results.len(), 2);

    let c1_result = results
        .iter()
        .find(|r| r.instance_id == c1.id.as_str())
        .unwrap();
    assert_eq!(c1_result.error.as_ref().unwrap().kind, ErrorKind::NotFound);

    let c2_result = results
        .iter()
        .find(|r| r.instance_id == c2.id.as_str())
        .unwrap();
    assert!(c2_result.error.is_none());
    let pane = rig.panes.get_pane(&c2.pane_id).unwrap();
    assert!(pane.written[0].contains("status"));

    // Artifact collection still returns a C1 entry, served from the
    // preserved artifacts directory
    let manifest = rig.orch.collect_team_artifacts(&p.id).await.unwrap();
    let c1_entry = manifest
        .entries
        .iter()
        .find(|e| e.instance_id == c1.id.as_str())
        .unwrap();
    assert_eq!(c1_entry.source, ArtifactSource::Preserved);
    assert_eq!(c1_entry.files, vec!["findings.md"]);
}
