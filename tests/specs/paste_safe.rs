//! Scenario: a large multiline payload is delivered keystroke-paced, as
//! typed input, and submitted exactly once.

use crate::prelude::*;
use foreman_adapters::PaneKey;
use foreman_core::MessageSource;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn large_payload_is_paced_above_the_paste_threshold() {
    let rig = rig().await;
    let a = spawn(&rig, "a").await;

    // 200 lines, ~3.5 KB in total: the slowest pacing tier
    let payload = (0..200)
        .map(|i| format!("line {:03} of the payload", i))
        .collect::<Vec<_>>()
        .join("\n");
    assert!(payload.len() >= 3072);

    let started = tokio::time::Instant::now();
    rig.orch
        .send_message(
            &a.id,
            &payload,
            MessageSource::External,
            false,
            Duration::from_secs(30),
        )
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // 200 line writes + 199 newline keys, each followed by a 20ms pause
    let floor = Duration::from_millis(399 * 20);
    assert!(
        elapsed >= floor,
        "delivery took {:?}, below the pacing floor {:?}",
        elapsed,
        floor
    );

    let pane = rig.panes.get_pane(&a.pane_id).unwrap();
    // Every line arrived, in order; exactly one submit at the very end
    assert_eq!(pane.written.len(), 200);
    assert!(pane.written[0].ends_with("line 000 of the payload"));
    assert_eq!(pane.written[199], "line 199 of the payload");
    let submits = pane
        .keys
        .iter()
        .filter(|k| **k == PaneKey::Submit)
        .count();
    assert_eq!(submits, 1);
    assert_eq!(*pane.keys.last().unwrap(), PaneKey::Submit);

    // The assistant treated it as typed input: nothing was held back as a
    // queued paste
    let scrollback = rig
        .panes
        .get_pane(&a.pane_id)
        .unwrap()
        .output
        .join("\n");
    assert!(!scrollback.contains("queued; press up to edit"));
}
