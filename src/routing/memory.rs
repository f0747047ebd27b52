//! In-memory route backend.
//!
//! Holds subnet associations and route tables in concurrent maps. Used by
//! tests and by the CLI, which loads and saves the state as a JSON file.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::backend::{RouteBackend, RouteError, RouteResult};

/// A subnet bound to a route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AssociationRecord {
    pub subnet: String,
    pub route_table: String,
}

/// Serializable copy of the backend state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RouteSnapshot {
    /// Associations keyed by association id.
    pub associations: BTreeMap<String, AssociationRecord>,
    /// Route tables keyed by id, each mapping destination CIDR to next hop.
    pub route_tables: BTreeMap<String, BTreeMap<String, String>>,
}

/// Errors reading or writing a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
struct Inner {
    associations: DashMap<String, AssociationRecord>,
    tables: DashMap<String, BTreeMap<String, String>>,
    rejected_tables: DashSet<String>,
    writes: AtomicUsize,
}

/// Route backend kept entirely in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRouteBackend {
    inner: Arc<Inner>,
}

impl InMemoryRouteBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: RouteSnapshot) -> Self {
        let backend = Self::new();
        for (id, record) in snapshot.associations {
            backend.add_association(id, record.subnet, record.route_table);
        }
        for (table, routes) in snapshot.route_tables {
            let mut entry = backend.inner.tables.entry(table).or_default();
            entry.extend(routes);
        }
        backend
    }

    pub fn snapshot(&self) -> RouteSnapshot {
        RouteSnapshot {
            associations: self
                .inner
                .associations
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            route_tables: self
                .inner
                .tables
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        }
    }

    /// Load state from a JSON snapshot file.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: RouteSnapshot = serde_json::from_str(&content)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Write state to a JSON snapshot file.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let content = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Bind `subnet` to `table` under `association_id`.
    pub fn add_association(
        &self,
        association_id: impl Into<String>,
        subnet: impl Into<String>,
        table: impl Into<String>,
    ) {
        let table = table.into();
        self.inner.tables.entry(table.clone()).or_default();
        self.inner.associations.insert(
            association_id.into(),
            AssociationRecord {
                subnet: subnet.into(),
                route_table: table,
            },
        );
    }

    /// Register an empty route table.
    pub fn add_table(&self, table: impl Into<String>) {
        self.inner.tables.entry(table.into()).or_default();
    }

    /// Add or overwrite a route.
    pub fn add_route(
        &self,
        table: impl Into<String>,
        destination: impl Into<String>,
        target: impl Into<String>,
    ) {
        self.inner
            .tables
            .entry(table.into())
            .or_default()
            .insert(destination.into(), target.into());
    }

    /// Refuse every write touching `table` from now on.
    pub fn reject_table(&self, table: impl Into<String>) {
        self.inner.rejected_tables.insert(table.into());
    }

    /// Number of write calls received.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Current route table of `subnet`.
    pub fn table_for_subnet(&self, subnet: &str) -> Option<String> {
        self.inner
            .associations
            .iter()
            .find(|e| e.value().subnet == subnet)
            .map(|e| e.value().route_table.clone())
    }

    /// Current next hop of `destination` in `table`.
    pub fn target(&self, table: &str, destination: &str) -> Option<String> {
        self.inner
            .tables
            .get(table)
            .and_then(|routes| routes.get(destination).cloned())
    }
}

#[async_trait]
impl RouteBackend for InMemoryRouteBackend {
    async fn describe_associations(&self, subnet: &str) -> RouteResult<Option<String>> {
        Ok(self
            .inner
            .associations
            .iter()
            .find(|e| e.value().subnet == subnet)
            .map(|e| e.key().clone()))
    }

    async fn associated_table(&self, association_id: &str) -> RouteResult<Option<String>> {
        Ok(self
            .inner
            .associations
            .get(association_id)
            .map(|record| record.route_table.clone()))
    }

    async fn reassociate(&self, association_id: &str, table_id: &str) -> RouteResult<bool> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);

        if !self.inner.tables.contains_key(table_id) {
            return Err(RouteError::UnknownTable(table_id.to_string()));
        }
        if self.inner.rejected_tables.contains(table_id) {
            return Ok(false);
        }

        let mut record = self
            .inner
            .associations
            .get_mut(association_id)
            .ok_or_else(|| RouteError::UnknownAssociation(association_id.to_string()))?;
        record.route_table = table_id.to_string();
        Ok(true)
    }

    async fn route_target(&self, table_id: &str, destination: &str) -> RouteResult<Option<String>> {
        let routes = self
            .inner
            .tables
            .get(table_id)
            .ok_or_else(|| RouteError::UnknownTable(table_id.to_string()))?;
        Ok(routes.get(destination).cloned())
    }

    async fn replace_route(
        &self,
        table_id: &str,
        destination: &str,
        target: &str,
    ) -> RouteResult<bool> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);

        if self.inner.rejected_tables.contains(table_id) {
            return Ok(false);
        }

        let mut routes = self
            .inner
            .tables
            .get_mut(table_id)
            .ok_or_else(|| RouteError::UnknownTable(table_id.to_string()))?;
        let entry = routes
            .get_mut(destination)
            .ok_or_else(|| RouteError::UnknownRoute {
                table: table_id.to_string(),
                destination: destination.to_string(),
            })?;
        *entry = target.to_string();
        Ok(true)
    }
}
