//! Failover controller.
//!
//! # States
//! - HEALTHY: traffic flows through the group's healthy targets
//! - SICK: traffic flows through the sick (standby) targets
//!
//! States are derived on demand from the availability engine; nothing is
//! persisted between invocations.
//!
//! # State Transitions
//! ```text
//! up:   group not down                     → rewrite to healthy targets
//!       group down                         → no-op
//! down: group down and peer (if any) up    → rewrite to sick targets
//!       group not down                     → refused
//!       peer down                          → refused (split-brain guard)
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::schema::{Configuration, Group};
use crate::failover::error::FailoverError;
use crate::failover::response::FailoverResponse;
use crate::health::AvailabilityEngine;
use crate::observability::metrics;
use crate::resilience::Deadline;
use crate::routing::{MutationOutcome, RouteBackend, RouteMutator};

/// Requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Send traffic back through the group.
    Up,
    /// Steer traffic away from the group.
    Down,
}

impl FromStr for Action {
    type Err = FailoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(FailoverError::MissingAction),
            "up" => Ok(Action::Up),
            "down" => Ok(Action::Down),
            other => Err(FailoverError::InvalidAction(other.to_string())),
        }
    }
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Down => "down",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric label for a raw action string. Anything unparseable collapses
/// into `invalid` so caller input cannot mint new series.
fn action_label(action: &str) -> &'static str {
    action
        .parse::<Action>()
        .map(Action::as_str)
        .unwrap_or("invalid")
}

/// Evaluates groups and enacts permitted transitions.
#[derive(Debug, Clone)]
pub struct FailoverController {
    engine: AvailabilityEngine,
    mutator: RouteMutator,
}

impl FailoverController {
    pub fn new(engine: AvailabilityEngine, backend: Arc<dyn RouteBackend>) -> Self {
        Self {
            engine,
            mutator: RouteMutator::new(backend),
        }
    }

    pub fn engine(&self) -> &AvailabilityEngine {
        &self.engine
    }

    /// Handle one trigger and build the response.
    pub async fn handle(
        &self,
        action: &str,
        group_name: &str,
        config: &Configuration,
    ) -> FailoverResponse {
        let response = match self.execute(action, group_name, config).await {
            Ok(status) => {
                tracing::info!(group = group_name, action, "Failover request completed");
                FailoverResponse::ok(status)
            }
            Err(e) if e.is_guard_violation() => {
                tracing::warn!(group = group_name, action, error = %e, "Failover refused");
                FailoverResponse::from_error(&e)
            }
            Err(e) => {
                tracing::error!(group = group_name, action, error = %e, "Failover request failed");
                FailoverResponse::from_error(&e)
            }
        };

        metrics::record_failover_request(action_label(action), response.status_code);
        response
    }

    /// Validate the request, evaluate, and mutate routes. Returns the
    /// accumulated status text.
    pub async fn execute(
        &self,
        action: &str,
        group_name: &str,
        config: &Configuration,
    ) -> Result<String, FailoverError> {
        let group_name = group_name.trim();
        if group_name.is_empty() {
            return Err(FailoverError::MissingGroup);
        }
        let action: Action = action.parse()?;

        let group = config
            .group(group_name)
            .ok_or_else(|| FailoverError::UnknownGroup(group_name.to_string()))?;
        let peer = resolve_peer(config, group_name, group)?;
        let deadline = self.engine.start_deadline();

        match action {
            Action::Up => self.up(config, group_name, group, deadline).await,
            Action::Down => self.down(config, group_name, group, peer, deadline).await,
        }
    }

    async fn up(
        &self,
        config: &Configuration,
        name: &str,
        group: &Group,
        deadline: Deadline,
    ) -> Result<String, FailoverError> {
        if self.engine.evaluate_within(config, name, deadline).await? {
            tracing::warn!(group = name, "Group is still down, leaving routes untouched");
            return Ok(format!("Group {} is still down; no changes made\n", name));
        }

        self.apply(name, group, Action::Up).await
    }

    async fn down(
        &self,
        config: &Configuration,
        name: &str,
        group: &Group,
        peer: Option<&str>,
        deadline: Deadline,
    ) -> Result<String, FailoverError> {
        if !self.engine.evaluate_within(config, name, deadline).await? {
            return Err(FailoverError::GroupNotDown(name.to_string()));
        }

        if let Some(peer) = peer {
            if self.engine.evaluate_within(config, peer, deadline).await? {
                return Err(FailoverError::PeerGroupDown {
                    group: name.to_string(),
                    peer: peer.to_string(),
                });
            }
        }

        self.apply(name, group, Action::Down).await
    }

    /// Rewrite every configured subnet association, then every route, in
    /// order. Stops at the first failure.
    async fn apply(&self, name: &str, group: &Group, action: Action) -> Result<String, FailoverError> {
        let mut status = String::new();

        for spec in &group.subnets {
            let table = match action {
                Action::Up => &spec.healthy_route_table,
                Action::Down => &spec.sick_route_table,
            };

            match self.mutator.reassociate_subnet(&spec.subnet, table).await {
                Ok(MutationOutcome::Changed) => {
                    status.push_str(&format!(
                        "Changed route table for {} to {}\n",
                        spec.subnet, table
                    ));
                }
                Ok(MutationOutcome::Unchanged) => {
                    status.push_str(&format!(
                        "Route table for {} already {}\n",
                        spec.subnet, table
                    ));
                }
                Err(source) => {
                    return Err(FailoverError::Mutation {
                        step: format!("changing route table for {} to {}", spec.subnet, table),
                        completed: status,
                        source,
                    });
                }
            }
        }

        for table in &group.route_tables {
            for route in &table.routes {
                let target = match action {
                    Action::Up => &route.healthy_target,
                    Action::Down => &route.sick_target,
                };

                match self
                    .mutator
                    .replace_route(&table.table_id, &route.destination, target)
                    .await
                {
                    Ok(MutationOutcome::Changed) => {
                        status.push_str(&format!(
                            "Changed route {} in {} to {}\n",
                            route.destination, table.table_id, target
                        ));
                    }
                    Ok(MutationOutcome::Unchanged) => {
                        status.push_str(&format!(
                            "Route {} in {} already targets {}\n",
                            route.destination, table.table_id, target
                        ));
                    }
                    Err(source) => {
                        return Err(FailoverError::Mutation {
                            step: format!(
                                "changing route {} in {} to {}",
                                route.destination, table.table_id, target
                            ),
                            completed: status,
                            source,
                        });
                    }
                }
            }
        }

        if status.is_empty() {
            status = format!("Group {} has no routes configured\n", name);
        }
        tracing::info!(group = name, action = %action, "Routes updated");

        Ok(status)
    }
}

/// Resolve the peer group by name. An unresolved reference is an error.
fn resolve_peer<'a>(
    config: &Configuration,
    name: &str,
    group: &'a Group,
) -> Result<Option<&'a str>, FailoverError> {
    match group.peer_group.as_deref() {
        Some(peer) if config.group(peer).is_none() => Err(FailoverError::UnknownPeerGroup {
            group: name.to_string(),
            peer: peer.to_string(),
        }),
        peer => Ok(peer),
    }
}
