//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Probes, evaluators, route mutator, controller produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges)
//! ```
//!
//! # Design Decisions
//! - Probe failures are logged at debug, per-attempt results at trace
//! - Group decisions and route changes are logged at info
//! - Refused transitions and mutation failures are logged at warn/error

pub mod logging;
pub mod metrics;
