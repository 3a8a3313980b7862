//! Scenario: sequential and parallel multi-instance workflows.

use crate::prelude::*;
use foreman_core::{AuditEvent, Clock};
use foreman_engine::CoordinateMode;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn sequential_contacts_targets_strictly_in_order() {
    let rig = rig().await;
    let a = spawn(&rig, "a").await;
    let b = spawn(&rig, "b").await;
    auto_respond(Arc::clone(&rig.orch), a.id.clone(), "PONG from a");
    auto_respond(Arc::clone(&rig.orch), b.id.clone(), "PONG from b");

    let outcome = rig
        .orch
        .coordinate(
            &[a.id.clone(), b.id.clone()],
            CoordinateMode::Sequential,
            "echo PING",
            Duration::from_secs(30),
        )
        .await
        .unwrap();

    let replies: Vec<&str> = outcome
        .replies
        .iter()
        .map(|r| r.reply.as_deref().unwrap())
        .collect();
    assert_eq!(replies, vec!["PONG from a", "PONG from b"]);

    // A's exchange was fully resolved before B was contacted: B's message
    // embeds A's reply, and the audit journal shows A's exchange first.
    let pane_b = rig.panes.get_pane(&b.pane_id).unwrap();
    assert!(pane_b.written[0].contains("PONG from a"));

    let mut audits = Vec::new();
    for _ in 0..200 {
        audits = rig
            .orch
            .logs
            .read_audit(&foreman_core::format_day_stamp(rig.clock.epoch_ms()), 0)
            .await
            .unwrap();
        let exchanges = audits
            .iter()
            .filter(|r| r.event_type == AuditEvent::MessageExchange)
            .count();
        if exchanges == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let exchange_targets: Vec<&str> = audits
        .iter()
        .filter(|r| r.event_type == AuditEvent::MessageExchange)
        .map(|r| r.instance_id.as_str())
        .collect();
    assert_eq!(exchange_targets, vec![a.id.as_str(), b.id.as_str()]);
}

#[tokio::test]
async fn parallel_returns_all_replies_in_any_order() {
    let rig = rig().await;
    let a = spawn(&rig, "a").await;
    let b = spawn(&rig, "b").await;
    let c = spawn(&rig, "c").await;
    for record in [&a, &b, &c] {
        auto_respond(
            Arc::clone(&rig.orch),
            record.id.clone(),
            &format!("done: {}", record.name),
        );
    }

    let outcome = rig
        .orch
        .coordinate(
            &[a.id.clone(), b.id.clone(), c.id.clone()],
            CoordinateMode::Parallel,
            "report status",
            Duration::from_secs(30),
        )
        .await
        .unwrap();

    let mut replies: Vec<String> = outcome
        .replies
        .iter()
        .map(|r| r.reply.clone().unwrap())
        .collect();
    replies.sort();
    assert_eq!(replies, vec!["done: a", "done: b", "done: c"]);
}
