//! Address and device evaluation.
//!
//! An address is probed `count` times and is down once `failure` attempts
//! have failed. A device aggregates its addresses under its failover mode.
//! Every aggregation owns its own counters; nothing leaks between sibling
//! devices or groups.

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;

use crate::config::schema::{Address, Device};
use crate::health::probe::{Check, Prober};
use crate::observability::metrics;
use crate::resilience::Deadline;

/// Outcome of evaluating one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressVote {
    Up,
    Down,
    /// The address could not be probed and casts no vote.
    Abstain,
}

impl AddressVote {
    pub fn is_down(self) -> bool {
        self == AddressVote::Down
    }
}

/// Everything a single evaluation needs besides the configuration.
#[derive(Clone, Copy)]
pub struct ProbeContext<'a> {
    pub prober: &'a dyn Prober,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Overall deadline for the evaluation.
    pub deadline: Deadline,
    /// Evaluate siblings concurrently.
    pub parallel: bool,
}

impl ProbeContext<'_> {
    /// Await every future, concurrently or one after another. Results keep
    /// input order either way.
    pub(crate) async fn run_all<I, F>(&self, futures: I) -> Vec<F::Output>
    where
        I: IntoIterator<Item = F>,
        F: Future,
    {
        if self.parallel {
            join_all(futures).await
        } else {
            let mut results = Vec::new();
            for future in futures {
                results.push(future.await);
            }
            results
        }
    }
}

/// Probe one address repeatedly and apply its failure threshold.
pub async fn evaluate_address(ctx: &ProbeContext<'_>, device: &str, address: &Address) -> AddressVote {
    let check = match Check::from_address(address) {
        Ok(check) => check,
        Err(reason) => {
            tracing::error!(device, address = ?address, %reason, "Unable to run test for address");
            metrics::record_unsupported_check();
            return AddressVote::Abstain;
        }
    };

    tracing::trace!(
        device,
        check = %check,
        count = address.count,
        failure = address.failure,
        "Testing address"
    );

    let mut failures = 0;
    for attempt in 1..=address.count {
        let success = ctx
            .deadline
            .guard(ctx.prober.probe(&check, ctx.timeout))
            .await
            .unwrap_or(false);
        metrics::record_probe(check.kind(), success);

        if success {
            tracing::trace!(device, check = %check, attempt, "Probe succeeded");
        } else {
            failures += 1;
            tracing::trace!(device, check = %check, attempt, "Probe failed");
            if failures >= address.failure {
                break;
            }
        }
    }

    if failures >= address.failure {
        tracing::debug!(device, check = %check, failures, "Address is down");
        AddressVote::Down
    } else {
        AddressVote::Up
    }
}

/// Aggregate a device's addresses under its failover mode.
pub async fn evaluate_device(ctx: &ProbeContext<'_>, group: &str, device: &Device) -> bool {
    tracing::info!(
        group,
        device = %device.name,
        failover_mode = %device.failover_mode,
        "Checking device"
    );

    let votes = ctx
        .run_all(
            device
                .addresses
                .iter()
                .map(|address| evaluate_address(ctx, &device.name, address)),
        )
        .await;

    let evaluated = votes.iter().filter(|v| **v != AddressVote::Abstain).count();
    let down = votes.iter().filter(|v| v.is_down()).count();
    let is_down = device.failover_mode.is_down(down, evaluated);

    if is_down {
        tracing::warn!(
            group,
            device = %device.name,
            failover_mode = %device.failover_mode,
            down,
            evaluated,
            "Device failed its tests"
        );
    } else {
        tracing::trace!(group, device = %device.name, down, evaluated, "Device passed");
    }
    metrics::record_device_state(group, &device.name, is_down);

    is_down
}
