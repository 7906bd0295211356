use std::time::Duration;

use tracing::{debug, info, warn};

#[derive(Clone, Copy)]
enum Severity {
    Debug,
    Info,
    Warn,
}

// ordered by descending threshold; first match wins
const ELAPSED_TABLE: &[(Duration, Severity, &str)] = &[
    (Duration::from_secs(10), Severity::Warn, "over 10s"),
    (Duration::from_secs(7), Severity::Info, "7-10s"),
    (Duration::from_secs(4), Severity::Info, "4-7s"),
    (Duration::from_secs(3), Severity::Info, "3-4s"),
    (Duration::from_secs(2), Severity::Info, "2-3s"),
    (Duration::from_secs(1), Severity::Info, "1-2s"),
    (Duration::from_millis(500), Severity::Info, "0.5-1s"),
];

fn bucket(elapsed: Duration) -> (Severity, &'static str) {
    ELAPSED_TABLE
        .iter()
        .find(|(threshold, _, _)| elapsed >= *threshold)
        .map(|(_, severity, label)| (*severity, *label))
        .unwrap_or((Severity::Debug, "under 0.5s"))
}

pub fn log_round_elapsed(round: usize, elapsed: Duration) {
    let (severity, bucket) = bucket(elapsed);
    let elapsed_ms = elapsed.as_millis() as u64;
    match severity {
        Severity::Debug => debug!(round, elapsed_ms, bucket, "round start finished"),
        Severity::Info => info!(round, elapsed_ms, bucket, "round start finished"),
        Severity::Warn => warn!(round, elapsed_ms, bucket, "round start finished"),
    }
}
