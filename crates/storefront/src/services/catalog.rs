//! Product catalog reads.
//!
//! The whole `products` collection is small enough to fetch at once. It is
//! cached for a minute and every filter runs in process.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::instrument;

use gamewar_core::{CatalogFilter, Category, Product, ProductId, UserId, catalog};

use crate::backend::{Backend, BackendError};

const PRODUCTS_TTL: Duration = Duration::from_secs(60);
const PRODUCTS_KEY: &str = "products";

/// Products shown per category on the home page.
pub const HOME_SECTION_SIZE: usize = 4;

/// Cached access to the product collection.
#[derive(Clone)]
pub struct CatalogService {
    backend: Backend,
    cache: Cache<&'static str, Arc<Vec<Product>>>,
}

impl CatalogService {
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(PRODUCTS_TTL)
            .build();
        Self { backend, cache }
    }

    /// Every product, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, BackendError> {
        if let Some(products) = self.cache.get(PRODUCTS_KEY).await {
            tracing::debug!("Catalog cache hit");
            return Ok(products);
        }

        let mut products = self.backend.list_products().await?;
        catalog::sort_newest_first(&mut products);
        let products = Arc::new(products);
        self.cache.insert(PRODUCTS_KEY, Arc::clone(&products)).await;
        Ok(products)
    }

    /// Current version of one product, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the product cannot be read.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, BackendError> {
        self.backend.get_product(id).await
    }

    /// Products matching the search box and category dropdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub async fn search(&self, filter: &CatalogFilter) -> Result<Vec<Product>, BackendError> {
        let products = self.products().await?;
        Ok(filter.apply(&products).into_iter().cloned().collect())
    }

    /// Home page sections, a few products per home category.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub async fn home_sections(&self) -> Result<Vec<(Category, Vec<Product>)>, BackendError> {
        let products = self.products().await?;
        Ok(catalog::home_sections(&products, HOME_SECTION_SIZE)
            .into_iter()
            .map(|(category, items)| (category, items.into_iter().cloned().collect()))
            .collect())
    }

    /// Products created by `uid`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn created_by(&self, uid: &UserId) -> Result<Vec<Product>, BackendError> {
        let mut products = self.backend.products_by_creator(uid).await?;
        catalog::sort_newest_first(&mut products);
        Ok(products)
    }

    /// Forget the cached list after a product write.
    pub async fn invalidate(&self) {
        self.cache.invalidate(PRODUCTS_KEY).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use gamewar_core::{Dinars, Localized, ProductDraft};

    use super::*;
    use crate::backend::MemoryBackend;

    fn product(id: &str, category: Category, age_days: i64) -> Product {
        let draft = ProductDraft {
            name: Localized::new(format!("Produit {id}"), format!("منتج {id}")),
            price: Dinars::from_whole(1000),
            stock: 5,
            category,
            ..ProductDraft::default()
        };
        Product::new(
            ProductId::new(id),
            draft,
            None,
            Utc::now() - ChronoDuration::days(age_days),
        )
    }

    #[tokio::test]
    async fn test_products_are_newest_first_and_cached() {
        let memory = MemoryBackend::new();
        memory.insert_product(product("old", Category::Cables, 5)).await;
        memory.insert_product(product("new", Category::Cables, 1)).await;
        let catalog = CatalogService::new(Backend::from(memory.clone()));

        let ids: Vec<_> = catalog
            .products()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id.to_string())
            .collect();
        assert_eq!(ids, ["new", "old"]);

        memory.insert_product(product("newest", Category::Wifi, 0)).await;
        assert_eq!(catalog.products().await.unwrap().len(), 2);

        catalog.invalidate().await;
        assert_eq!(catalog.products().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_home_sections_skip_accessories() {
        let memory = MemoryBackend::new();
        memory.insert_product(product("a", Category::Accessories, 1)).await;
        memory.insert_product(product("c", Category::Controllers, 1)).await;
        let catalog = CatalogService::new(Backend::from(memory));

        let sections = catalog.home_sections().await.unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections.first().unwrap().0, Category::Controllers);
    }
}
