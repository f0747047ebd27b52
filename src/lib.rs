//! High-availability failover for cloud routing.
//!
//! Probes groups of network devices and, when a group is down, steers
//! traffic to its standby by rewriting subnet associations and routes.

// Core subsystems
pub mod config;
pub mod failover;
pub mod health;
pub mod routing;

// Cross-cutting concerns
pub mod observability;
pub mod resilience;

pub use config::schema::Configuration;
pub use failover::{FailoverController, FailoverResponse};
pub use health::AvailabilityEngine;
