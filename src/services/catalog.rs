use std::sync::Arc;

use crate::models::package::{fallback_packages, Package};
use crate::store::{CatalogStore, StoreResult};

/// Read side of the package catalog with the fallback set applied.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn CatalogStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn list_packages(&self) -> StoreResult<Vec<Package>> {
        let stored = self.store.list_packages().await?;
        if stored.is_empty() {
            return Ok(fallback_packages());
        }
        Ok(stored)
    }

    pub async fn find_package(&self, package_id: &str) -> StoreResult<Option<Package>> {
        Ok(self
            .list_packages()
            .await?
            .into_iter()
            .find(|p| p.id == package_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    #[tokio::test]
    async fn empty_catalog_serves_fallback_verbatim() {
        let catalog = Catalog::new(Arc::new(InMemoryStore::new()));
        let first = catalog.list_packages().await.expect("list");
        let second = catalog.list_packages().await.expect("list");
        assert_eq!(first, fallback_packages());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn stored_packages_replace_fallback() {
        let store = Arc::new(InMemoryStore::new());
        store
            .upsert_package(Package::new("day-1", "Day Pass", 5.0, "24 hours"))
            .await
            .expect("upsert");
        let catalog = Catalog::new(store);

        let packages = catalog.list_packages().await.expect("list");
        assert_eq!(packages.len(), 1);
        assert!(catalog.find_package("bronze-1w").await.expect("find").is_none());
        assert!(catalog.find_package("day-1").await.expect("find").is_some());
    }
}
