//! In-process stores, seeded from JSON files at startup.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{CatalogStore, ProjectStore};
use crate::domain::{Battery, CatalogItem, CatalogKind, Controller, Inverter, Project, SolarPanel};
use crate::error::{EngineError, EngineResult};

/// On-disk layout of a catalog seed file.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub solar_panels: Vec<SolarPanel>,
    #[serde(default)]
    pub batteries: Vec<Battery>,
    #[serde(default)]
    pub inverters: Vec<Inverter>,
    #[serde(default)]
    pub controllers: Vec<Controller>,
}

impl CatalogSeed {
    fn into_items(self) -> impl Iterator<Item = CatalogItem> {
        self.solar_panels
            .into_iter()
            .map(CatalogItem::from)
            .chain(self.batteries.into_iter().map(CatalogItem::from))
            .chain(self.inverters.into_iter().map(CatalogItem::from))
            .chain(self.controllers.into_iter().map(CatalogItem::from))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: RwLock<HashMap<(CatalogKind, Uuid), CatalogItem>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        let items = seed.into_items().map(|item| ((item.kind(), item.id()), item)).collect();
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn from_json_file(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Storage(format!("failed to read catalog {}: {e}", path.display())))?;
        let seed: CatalogSeed = serde_json::from_str(&content)
            .map_err(|e| EngineError::Storage(format!("failed to parse catalog {}: {e}", path.display())))?;
        let catalog = Self::from_seed(seed);
        info!(path = %path.display(), "catalog loaded");
        Ok(catalog)
    }

    pub async fn insert(&self, item: impl Into<CatalogItem>) {
        let item = item.into();
        self.items.write().await.insert((item.kind(), item.id()), item);
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn find_by_id(&self, kind: CatalogKind, id: Uuid) -> EngineResult<CatalogItem> {
        self.items
            .read()
            .await
            .get(&(kind, id))
            .cloned()
            .ok_or_else(|| EngineError::not_found(kind.name(), id))
    }

    async fn find_all(&self, kind: CatalogKind) -> EngineResult<Vec<CatalogItem>> {
        let items = self.items.read().await;
        let mut found: Vec<CatalogItem> = items
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, item)| item.clone())
            .collect();
        found.sort_by_key(CatalogItem::id);
        Ok(found)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<HashMap<Uuid, Project>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Storage(format!("failed to read projects {}: {e}", path.display())))?;
        let projects: Vec<Project> = serde_json::from_str(&content)
            .map_err(|e| EngineError::Storage(format!("failed to parse projects {}: {e}", path.display())))?;
        info!(path = %path.display(), count = projects.len(), "projects loaded");
        Ok(Self {
            projects: RwLock::new(projects.into_iter().map(|p| (p.id, p)).collect()),
        })
    }

    /// Insert or replace without a version check.
    pub async fn insert(&self, project: Project) {
        self.projects.write().await.insert(project.id, project);
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn find_by_id(&self, id: Uuid) -> EngineResult<Project> {
        self.projects
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found("Project", id))
    }

    async fn save(&self, mut project: Project, expected_version: u64) -> EngineResult<Project> {
        let mut projects = self.projects.write().await;
        let current = projects
            .get(&project.id)
            .ok_or_else(|| EngineError::not_found("Project", project.id))?;
        if current.version != expected_version {
            return Err(EngineError::Conflict {
                project_id: project.id,
                expected: expected_version,
                found: current.version,
            });
        }
        project.version = expected_version + 1;
        debug!(project_id = %project.id, version = project.version, "project saved");
        projects.insert(project.id, project.clone());
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{fetch, fetch_all};

    fn inverter() -> Inverter {
        Inverter {
            id: Uuid::new_v4(),
            manufacturer: "Acme".into(),
            model: "PI-1000".into(),
            voltage_v: 24,
            continuous_power_25c_w: 1000.0,
            continuous_power_40c_w: 900.0,
            continuous_power_65c_w: 700.0,
            max_power_w: 2000.0,
            efficiency_percent: 92.0,
        }
    }

    #[tokio::test]
    async fn test_catalog_typed_fetch() {
        let catalog = InMemoryCatalog::new();
        let inv = inverter();
        catalog.insert(inv.clone()).await;

        let got: Inverter = fetch(&catalog, inv.id).await.unwrap();
        assert_eq!(got, inv);

        let all: Vec<Inverter> = fetch_all(&catalog).await.unwrap();
        assert_eq!(all.len(), 1);
        let none: Vec<Battery> = fetch_all(&catalog).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_kind_is_part_of_key() {
        let catalog = InMemoryCatalog::new();
        let inv = inverter();
        catalog.insert(inv.clone()).await;
        let err = fetch::<Battery>(&catalog, inv.id).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Battery", .. }));
    }

    #[tokio::test]
    async fn test_missing_panel_reports_entity_name() {
        let catalog = InMemoryCatalog::new();
        let err = fetch::<SolarPanel>(&catalog, Uuid::nil()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Solar panel", .. }));
    }

    #[test]
    fn test_seed_parses() {
        let seed: CatalogSeed = serde_json::from_str(
            r#"{
                "controllers": [{
                    "id": "00000000-0000-0000-0000-0000000000c1",
                    "manufacturer": "Acme",
                    "model": "PWM-30",
                    "type": "PWM",
                    "current_rating_a": 30.0
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(seed.controllers.len(), 1);
        assert!(seed.batteries.is_empty());
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let store = InMemoryProjectStore::new();
        let project = Project::new(Uuid::new_v4(), Uuid::new_v4(), "cabin");
        store.insert(project.clone()).await;

        let saved = store.save(project.clone(), 0).await.unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(store.find_by_id(project.id).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_stale_save_conflicts() {
        let store = InMemoryProjectStore::new();
        let project = Project::new(Uuid::new_v4(), Uuid::new_v4(), "cabin");
        store.insert(project.clone()).await;

        store.save(project.clone(), 0).await.unwrap();
        let err = store.save(project.clone(), 0).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict { expected: 0, found: 1, .. }));
    }

    #[tokio::test]
    async fn test_missing_project_not_found() {
        let store = InMemoryProjectStore::new();
        let err = store.find_by_id(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Project", .. }));
    }
}
