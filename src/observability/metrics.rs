//! Metrics collection.
//!
//! # Metrics
//! - `cloudha_probe_attempts_total` (counter): probe attempts by test, result
//! - `cloudha_unsupported_checks_total` (counter): addresses that cast no vote
//! - `cloudha_device_down` (gauge): 1=down, 0=up, by group and device
//! - `cloudha_group_down` (gauge): 1=down, 0=up, by group
//! - `cloudha_route_mutations_total` (counter): by kind and outcome
//! - `cloudha_failover_requests_total` (counter): by action and status code
//!
//! # Design Decisions
//! - Emitted through the `metrics` facade; the embedding process installs
//!   the recorder, so without one every call is a no-op

use metrics::{counter, gauge};

pub fn record_probe(kind: &'static str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("cloudha_probe_attempts_total", "test" => kind, "result" => result).increment(1);
}

pub fn record_unsupported_check() {
    counter!("cloudha_unsupported_checks_total").increment(1);
}

pub fn record_device_state(group: &str, device: &str, down: bool) {
    gauge!(
        "cloudha_device_down",
        "group" => group.to_string(),
        "device" => device.to_string()
    )
    .set(if down { 1.0 } else { 0.0 });
}

pub fn record_group_state(group: &str, down: bool) {
    gauge!("cloudha_group_down", "group" => group.to_string()).set(if down { 1.0 } else { 0.0 });
}

pub fn record_route_mutation(kind: &'static str, outcome: &'static str) {
    counter!("cloudha_route_mutations_total", "kind" => kind, "outcome" => outcome).increment(1);
}

pub fn record_failover_request(action: &'static str, status_code: u16) {
    counter!(
        "cloudha_failover_requests_total",
        "action" => action,
        "status" => status_code.to_string()
    )
    .increment(1);
}
