//! Failover decisions.
//!
//! # Data Flow
//! ```text
//! trigger (action, group)
//!     → controller.rs: validate request, resolve group and peer
//!     → health::AvailabilityEngine: is the group (and its peer) down?
//!     → routing::RouteMutator: apply healthy or sick targets in order
//!     → response.rs: 200 with status lines, or 500 with an error message
//! ```
//!
//! # Design Decisions
//! - A `down` trigger only acts when the group really is down and its peer
//!   is not, so the two sides of a pair never steer traffic at each other
//! - An `up` trigger while the group is still down changes nothing
//! - Partial progress is reported on failure; nothing is rolled back

pub mod controller;
pub mod error;
pub mod response;

pub use controller::{Action, FailoverController};
pub use error::FailoverError;
pub use response::{FailoverResponse, ResponseBody};
