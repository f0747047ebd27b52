//! Cloud routing backend abstraction.
//!
//! The backend owns all durable state. Implementations talk to a provider
//! API; `InMemoryRouteBackend` keeps the same state locally.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by route backends and the route mutator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("No route table association found for subnet {0}")]
    NoAssociation(String),

    #[error("Unknown route table association {0}")]
    UnknownAssociation(String),

    #[error("Unknown route table {0}")]
    UnknownTable(String),

    #[error("Route {destination} not found in route table {table}")]
    UnknownRoute { table: String, destination: String },

    #[error("Backend rejected {operation}")]
    Rejected { operation: String },

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for routing operations.
pub type RouteResult<T> = Result<T, RouteError>;

/// Operations the failover core needs from the routing provider.
///
/// Write operations return `Ok(false)` when the provider refused the change.
#[async_trait]
pub trait RouteBackend: Send + Sync {
    /// Association id binding `subnet` to its current route table.
    async fn describe_associations(&self, subnet: &str) -> RouteResult<Option<String>>;

    /// Route table currently bound by `association_id`.
    async fn associated_table(&self, association_id: &str) -> RouteResult<Option<String>>;

    /// Point an existing association at `table_id`.
    async fn reassociate(&self, association_id: &str, table_id: &str) -> RouteResult<bool>;

    /// Next hop of `destination` in `table_id`.
    async fn route_target(&self, table_id: &str, destination: &str) -> RouteResult<Option<String>>;

    /// Rewrite the next hop of one route, leaving other entries untouched.
    async fn replace_route(
        &self,
        table_id: &str,
        destination: &str,
        target: &str,
    ) -> RouteResult<bool>;
}
