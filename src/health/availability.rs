//! Group availability engine.
//!
//! # Responsibilities
//! - Evaluate every device of a group and aggregate under the group's
//!   failover mode
//! - Report the set of groups currently classified down
//!
//! # Design Decisions
//! - Stateless: every call probes afresh, nothing is cached between calls
//! - `any`/`all` aggregation is order-independent, so devices and groups
//!   may be evaluated concurrently and reduced afterwards
//! - The overall deadline is shared by every probe of one call

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::config::schema::{Configuration, Group, ProbeSettings};
use crate::health::evaluator::{evaluate_device, ProbeContext};
use crate::health::probe::{NetworkProber, ProbeSetupError, Prober};
use crate::observability::metrics;
use crate::resilience::Deadline;

/// Errors from availability checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvailabilityError {
    #[error("Group {0} not found in configuration")]
    UnknownGroup(String),
}

/// Names of the groups that failed their checks.
pub type DownGroups = BTreeSet<String>;

/// Decides whether groups are up or down by probing their devices.
#[derive(Clone)]
pub struct AvailabilityEngine {
    prober: Arc<dyn Prober>,
    settings: ProbeSettings,
}

impl AvailabilityEngine {
    pub fn new(prober: Arc<dyn Prober>, settings: ProbeSettings) -> Self {
        Self { prober, settings }
    }

    /// Engine backed by real network probes.
    pub fn with_network_prober(settings: ProbeSettings) -> Result<Self, ProbeSetupError> {
        Ok(Self::new(Arc::new(NetworkProber::new()?), settings))
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Start the overall deadline configured in `probe.deadline-secs`.
    pub fn start_deadline(&self) -> Deadline {
        Deadline::from_budget(self.settings.deadline())
    }

    fn context(&self, deadline: Deadline) -> ProbeContext<'_> {
        ProbeContext {
            prober: self.prober.as_ref(),
            timeout: self.settings.timeout(),
            deadline,
            parallel: self.settings.parallel,
        }
    }

    /// Whether `group_name` is currently down.
    pub async fn evaluate(
        &self,
        config: &Configuration,
        group_name: &str,
    ) -> Result<bool, AvailabilityError> {
        self.evaluate_within(config, group_name, self.start_deadline())
            .await
    }

    /// Like [`evaluate`](Self::evaluate), bounded by a deadline the caller
    /// shares across several evaluations.
    pub async fn evaluate_within(
        &self,
        config: &Configuration,
        group_name: &str,
        deadline: Deadline,
    ) -> Result<bool, AvailabilityError> {
        let group = config
            .group(group_name)
            .ok_or_else(|| AvailabilityError::UnknownGroup(group_name.to_string()))?;

        Ok(evaluate_group(&self.context(deadline), group_name, group).await)
    }

    /// Check one group, or every group when `group_name` is `None`, and
    /// return the names of those that are down.
    pub async fn check_availability(
        &self,
        config: &Configuration,
        group_name: Option<&str>,
    ) -> Result<DownGroups, AvailabilityError> {
        let targets: Vec<(&str, &Group)> = match group_name {
            Some(name) => {
                let group = config
                    .group(name)
                    .ok_or_else(|| AvailabilityError::UnknownGroup(name.to_string()))?;
                vec![(name, group)]
            }
            None => config
                .groups
                .iter()
                .map(|(name, group)| (name.as_str(), group))
                .collect(),
        };

        let ctx = self.context(self.start_deadline());
        let results = ctx
            .run_all(
                targets
                    .iter()
                    .map(|(name, group)| evaluate_group(&ctx, name, group)),
            )
            .await;

        Ok(targets
            .iter()
            .zip(results)
            .filter(|(_, down)| *down)
            .map(|((name, _), _)| name.to_string())
            .collect())
    }
}

impl std::fmt::Debug for AvailabilityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

async fn evaluate_group(ctx: &ProbeContext<'_>, name: &str, group: &Group) -> bool {
    tracing::info!(
        group = name,
        failover_mode = %group.failover_mode,
        devices = group.devices.len(),
        "Checking group"
    );

    let results = ctx
        .run_all(group.devices.iter().map(|device| evaluate_device(ctx, name, device)))
        .await;

    let total = results.len();
    let down = results.iter().filter(|d| **d).count();
    let is_down = group.failover_mode.is_down(down, total);

    if is_down {
        tracing::warn!(
            group = name,
            failover_mode = %group.failover_mode,
            down,
            total,
            "Group is down"
        );
    } else {
        tracing::info!(group = name, down, total, "Group is up");
    }
    metrics::record_group_state(name, is_down);

    is_down
}
