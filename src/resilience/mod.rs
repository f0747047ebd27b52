//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Probe attempt:
//!     → per-attempt timeout (inside the prober)
//!     → timeouts.rs (overall evaluation deadline)
//!     → unfinished attempt counted as failure
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every probe has a deadline
//! - No automatic retries: repetition is the address evaluator's `count`,
//!   and failed invocations are re-triggered externally

pub mod timeouts;

pub use timeouts::Deadline;
