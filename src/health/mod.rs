//! Health checking subsystem (the availability engine).
//!
//! # Data Flow
//! ```text
//! availability.rs (group)
//!     → evaluate each device under the group's failover mode
//!     → evaluator.rs (device)
//!         → evaluate each address under the device's failover mode
//!         → evaluator.rs (address)
//!             → probe.rs: run `count` attempts, down at `failure` failures
//!                 → tcp_ping / ssl_ping (tls.rs) / http_ping
//! ```
//!
//! # Design Decisions
//! - Aggregation is bottom-up and each level owns its counters
//! - Probe errors are normalized to "failed attempt", never raised
//! - Unknown test kinds are logged and abstain from the vote

pub mod availability;
pub mod evaluator;
pub mod probe;
pub mod tls;

pub use availability::{AvailabilityEngine, AvailabilityError, DownGroups};
pub use evaluator::{evaluate_address, evaluate_device, AddressVote, ProbeContext};
pub use probe::{Check, NetworkProber, ProbeSetupError, Prober, UnsupportedCheck};
