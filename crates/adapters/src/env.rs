// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Override for the per-keystroke pause of the paste-safe writer.
///
/// When unset, the pause adapts to payload size (10/15/20 ms).
pub fn key_pause_override() -> Option<Duration> {
    parse_duration_ms("FOREMAN_KEY_PAUSE_MS")
}

/// Settle pause before the final submit key (default: 50ms).
pub fn settle_ms() -> Duration {
    parse_duration_ms("FOREMAN_SETTLE_MS").unwrap_or(Duration::from_millis(50))
}

/// Ready-sentinel poll interval during spawn (default: 200ms).
pub fn ready_poll_ms() -> Duration {
    parse_duration_ms("FOREMAN_READY_POLL_MS").unwrap_or(Duration::from_millis(200))
}

/// Startup prompt detection total poll budget (default: 3000ms).
/// Returns the number of poll attempts at the ready-poll interval.
pub fn prompt_poll_max_attempts() -> usize {
    parse_duration_ms("FOREMAN_PROMPT_POLL_MS")
        .map(|d| (d.as_millis() / 200).max(1) as usize)
        .unwrap_or(15)
}
