//! Idempotent route mutation.
//!
//! # Responsibilities
//! - Repoint subnet associations to another route table
//! - Rewrite a single route's next hop
//! - Treat "already in place" as success without writing
//!
//! # Design Decisions
//! - Current state is read before every write so repeated invocations
//!   issue no writes
//! - A refused write is an error, never silently swallowed

use std::sync::Arc;

use crate::observability::metrics;
use crate::routing::backend::{RouteBackend, RouteError, RouteResult};

/// What a mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The backend state was rewritten.
    Changed,
    /// The requested target was already in place.
    Unchanged,
}

impl MutationOutcome {
    fn label(self) -> &'static str {
        match self {
            MutationOutcome::Changed => "changed",
            MutationOutcome::Unchanged => "unchanged",
        }
    }
}

/// Applies routing changes through a backend.
#[derive(Clone)]
pub struct RouteMutator {
    backend: Arc<dyn RouteBackend>,
}

impl RouteMutator {
    pub fn new(backend: Arc<dyn RouteBackend>) -> Self {
        Self { backend }
    }

    /// Point `association_id` at `table_id`.
    pub async fn reassociate(
        &self,
        association_id: &str,
        table_id: &str,
    ) -> RouteResult<MutationOutcome> {
        let result = self.try_reassociate(association_id, table_id).await;
        record("reassociate", &result);
        result
    }

    async fn try_reassociate(
        &self,
        association_id: &str,
        table_id: &str,
    ) -> RouteResult<MutationOutcome> {
        let current = self.backend.associated_table(association_id).await?;
        if current.as_deref() == Some(table_id) {
            tracing::debug!(association_id, table_id, "Association already in place");
            return Ok(MutationOutcome::Unchanged);
        }

        if !self.backend.reassociate(association_id, table_id).await? {
            return Err(RouteError::Rejected {
                operation: format!("reassociation of {} to {}", association_id, table_id),
            });
        }

        tracing::info!(
            association_id,
            from = current.as_deref().unwrap_or("none"),
            to = table_id,
            "Route table association changed"
        );
        Ok(MutationOutcome::Changed)
    }

    /// Look up the association of `subnet` and point it at `table_id`.
    pub async fn reassociate_subnet(
        &self,
        subnet: &str,
        table_id: &str,
    ) -> RouteResult<MutationOutcome> {
        let association_id = match self.backend.describe_associations(subnet).await? {
            Some(id) => id,
            None => {
                metrics::record_route_mutation("reassociate", "error");
                return Err(RouteError::NoAssociation(subnet.to_string()));
            }
        };
        self.reassociate(&association_id, table_id).await
    }

    /// Set the next hop of `destination` in `table_id` to `target`.
    pub async fn replace_route(
        &self,
        table_id: &str,
        destination: &str,
        target: &str,
    ) -> RouteResult<MutationOutcome> {
        let result = self.try_replace_route(table_id, destination, target).await;
        record("replace_route", &result);
        result
    }

    async fn try_replace_route(
        &self,
        table_id: &str,
        destination: &str,
        target: &str,
    ) -> RouteResult<MutationOutcome> {
        let current = self.backend.route_target(table_id, destination).await?;
        if current.as_deref() == Some(target) {
            tracing::debug!(table_id, destination, target, "Route already in place");
            return Ok(MutationOutcome::Unchanged);
        }

        if !self.backend.replace_route(table_id, destination, target).await? {
            tracing::error!(table_id, destination, target, "Unable to replace route");
            return Err(RouteError::Rejected {
                operation: format!(
                    "replacement of route {} in {} to {}",
                    destination, table_id, target
                ),
            });
        }

        tracing::info!(
            table_id,
            destination,
            from = current.as_deref().unwrap_or("none"),
            to = target,
            "Route replaced"
        );
        Ok(MutationOutcome::Changed)
    }
}

impl std::fmt::Debug for RouteMutator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMutator").finish_non_exhaustive()
    }
}

fn record(kind: &'static str, result: &RouteResult<MutationOutcome>) {
    let outcome = match result {
        Ok(outcome) => outcome.label(),
        Err(_) => "error",
    };
    metrics::record_route_mutation(kind, outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::memory::InMemoryRouteBackend;

    fn setup() -> (InMemoryRouteBackend, RouteMutator) {
        let backend = InMemoryRouteBackend::new();
        backend.add_association("rtbassoc-1", "subnet-a", "rtb-healthy");
        backend.add_table("rtb-sick");
        backend.add_route("rtb-main", "0.0.0.0/0", "eni-a");
        let mutator = RouteMutator::new(Arc::new(backend.clone()));
        (backend, mutator)
    }

    #[tokio::test]
    async fn test_replace_route_is_idempotent() {
        let (backend, mutator) = setup();

        let first = mutator.replace_route("rtb-main", "0.0.0.0/0", "eni-b").await;
        assert_eq!(first, Ok(MutationOutcome::Changed));
        let second = mutator.replace_route("rtb-main", "0.0.0.0/0", "eni-b").await;
        assert_eq!(second, Ok(MutationOutcome::Unchanged));

        assert_eq!(backend.write_count(), 1);
        assert_eq!(backend.target("rtb-main", "0.0.0.0/0").as_deref(), Some("eni-b"));
    }

    #[tokio::test]
    async fn test_reassociate_subnet_is_idempotent() {
        let (backend, mutator) = setup();

        assert_eq!(
            mutator.reassociate_subnet("subnet-a", "rtb-healthy").await,
            Ok(MutationOutcome::Unchanged)
        );
        assert_eq!(backend.write_count(), 0);

        assert_eq!(
            mutator.reassociate_subnet("subnet-a", "rtb-sick").await,
            Ok(MutationOutcome::Changed)
        );
        assert_eq!(backend.table_for_subnet("subnet-a").as_deref(), Some("rtb-sick"));
    }

    #[tokio::test]
    async fn test_missing_association() {
        let (_, mutator) = setup();
        assert_eq!(
            mutator.reassociate_subnet("subnet-z", "rtb-sick").await,
            Err(RouteError::NoAssociation("subnet-z".into()))
        );
    }

    #[tokio::test]
    async fn test_rejection_is_reported() {
        let (backend, mutator) = setup();
        backend.reject_table("rtb-main");

        let result = mutator.replace_route("rtb-main", "0.0.0.0/0", "eni-b").await;
        assert!(matches!(result, Err(RouteError::Rejected { .. })));

        backend.reject_table("rtb-sick");
        let result = mutator.reassociate("rtbassoc-1", "rtb-sick").await;
        assert!(matches!(result, Err(RouteError::Rejected { .. })));
    }
}
