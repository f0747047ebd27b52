//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config document (JSON/TOML)
//!     → loader.rs (fetch, parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Configuration (validated, immutable)
//!     → borrowed by the availability engine and failover controller
//! ```
//!
//! # Design Decisions
//! - A fresh Configuration is built per invocation and never mutated
//! - All optional fields have defaults to allow minimal documents
//! - Validation separates syntactic (serde) from semantic checks
//! - Peer groups are referenced by name, never by handle

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigSource, FileConfigSource};
pub use schema::{
    Address, Configuration, Device, FailoverMode, Group, ObservabilityConfig, ProbeSettings,
    RouteEntry, RouteTableSpec, SubnetSpec, Verbosity,
};
pub use validation::{validate_config, ValidationError};
