//! Routing subsystem: rewrites cloud routing state on failover.
//!
//! # Data Flow
//! ```text
//! Failover decision (healthy or sick)
//!     → mutator.rs
//!         - subnet: describe association → reassociate to healthy/sick table
//!         - route:  read next hop → replace with healthy/sick target
//!     → backend.rs (RouteBackend trait)
//!         → provider API, or memory.rs for local state
//! ```
//!
//! # Design Decisions
//! - Mutations are idempotent: the target already in place is a no-op
//! - Mutations are applied one at a time, in configured order
//! - No rollback: callers report how far a sequence got

pub mod backend;
pub mod memory;
pub mod mutator;

pub use backend::{RouteBackend, RouteError, RouteResult};
pub use memory::{InMemoryRouteBackend, RouteSnapshot};
pub use mutator::{MutationOutcome, RouteMutator};
