//! Scenario: a single request/reply round trip, journaled on both halves.

use crate::prelude::*;
use foreman_core::MessageSource;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn round_trip_reply_and_journal() {
    let rig = rig().await;
    let a = spawn(&rig, "a").await;
    auto_respond(Arc::clone(&rig.orch), a.id.clone(), "2+2 equals 4");

    let outcome = rig
        .orch
        .send_message(
            &a.id,
            "what is 2+2?",
            MessageSource::External,
            true,
            Duration::from_secs(30),
        )
        .await
        .unwrap();

    assert!(outcome.reply.unwrap().contains('4'));

    // The communication journal holds exactly one sent and one received
    // record with the same message id and a non-negative response time.
    let mut records = Vec::new();
    for _ in 0..200 {
        records = rig.orch.logs.read_comm(&a.id, 0).await.unwrap();
        if records.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(records.len(), 2);

    let sent: Vec<_> = records.iter().filter(|r| r.direction == "out").collect();
    let received: Vec<_> = records.iter().filter(|r| r.direction == "in").collect();
    assert_eq!(sent.len(), 1);
    assert_eq!(received.len(), 1);
    assert_eq!(sent[0].message_id, received[0].message_id);
    assert_eq!(sent[0].message_id, outcome.message_id.as_str());
    assert!(received[0].response_time.unwrap() >= 0.0);
}

#[tokio::test]
async fn round_trip_message_visible_in_pane_with_tag() {
    let rig = rig().await;
    let a = spawn(&rig, "a").await;
    auto_respond(Arc::clone(&rig.orch), a.id.clone(), "ack");

    let outcome = rig
        .orch
        .send_message(
            &a.id,
            "hello worker",
            MessageSource::External,
            true,
            Duration::from_secs(30),
        )
        .await
        .unwrap();

    let pane = rig.panes.get_pane(&a.pane_id).unwrap();
    assert_eq!(
        pane.written,
        vec![format!("[MSG:{}] hello worker", outcome.message_id)]
    );
}
