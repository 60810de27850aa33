//! Storage seams for catalog reference data and project aggregates.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CatalogEntry, CatalogItem, CatalogKind, Project};
use crate::error::EngineResult;

pub mod memory;

pub use memory::{CatalogSeed, InMemoryCatalog, InMemoryProjectStore};

/// Read-mostly component catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_id(&self, kind: CatalogKind, id: Uuid) -> EngineResult<CatalogItem>;
    async fn find_all(&self, kind: CatalogKind) -> EngineResult<Vec<CatalogItem>>;
}

/// Whole-aggregate project persistence with an optimistic version check.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> EngineResult<Project>;

    /// Persist `project` if the stored version still equals
    /// `expected_version`; returns the stored copy with its new version.
    async fn save(&self, project: Project, expected_version: u64) -> EngineResult<Project>;
}

/// Typed lookup of a single catalog record.
pub async fn fetch<T: CatalogEntry>(store: &dyn CatalogStore, id: Uuid) -> EngineResult<T> {
    store.find_by_id(T::KIND, id).await?.try_into()
}

/// Typed listing of every catalog record of one kind.
pub async fn fetch_all<T: CatalogEntry>(store: &dyn CatalogStore) -> EngineResult<Vec<T>> {
    store
        .find_all(T::KIND)
        .await?
        .into_iter()
        .map(T::try_from)
        .collect()
}
