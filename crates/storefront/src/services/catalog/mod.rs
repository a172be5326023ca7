//! Catalog service.
//!
//! Loads the full product list once per cache window and runs the shop view
//! query against it in memory. Admin writes invalidate the cache.

mod filter;

pub use filter::{
    CatalogPage, CatalogQuery, DEFAULT_PAGE_SIZE, PRICE_THRESHOLD, PriceMode, SortOrder,
    filter_and_sort,
};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::RepositoryError;
use crate::db::products::ProductRepository;
use crate::models::Product;

const CACHE_TTL: Duration = Duration::from_secs(60);

/// Cached product catalog.
#[derive(Clone)]
pub struct CatalogService {
    cache: Cache<(), Arc<Vec<Product>>>,
}

impl Default for CatalogService {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogService {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(CACHE_TTL)
            .build();

        Self { cache }
    }

    /// All products in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the products cannot be loaded. The cached
    /// value, if any, is left as it was.
    pub async fn products(&self, pool: &PgPool) -> Result<Arc<Vec<Product>>, RepositoryError> {
        self.load_with(|| async { ProductRepository::new(pool).list_all().await })
            .await
    }

    /// Run a shop view query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the products cannot be loaded.
    #[instrument(skip(self, pool))]
    pub async fn search(
        &self,
        pool: &PgPool,
        query: &CatalogQuery,
    ) -> Result<CatalogPage, RepositoryError> {
        let products = self.products(pool).await?;
        Ok(filter_and_sort(&products, query))
    }

    async fn load_with<F, Fut>(&self, fetch: F) -> Result<Arc<Vec<Product>>, RepositoryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Product>, RepositoryError>>,
    {
        if let Some(products) = self.cache.get(&()).await {
            debug!("Cache hit for catalog");
            return Ok(products);
        }

        let products = Arc::new(fetch().await?);
        self.cache.insert((), Arc::clone(&products)).await;
        debug!(count = products.len(), "Catalog loaded");

        Ok(products)
    }

    /// Drop the cached catalog so the next read goes to the database.
    pub async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use clothify_core::ProductId;
    use rust_decimal::Decimal;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::from(id),
            name: format!("Product {id}"),
            price: Decimal::from(100),
            quantity: 1,
            image: String::new(),
            categories: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let service = CatalogService::new();

        let first = service
            .load_with(|| async { Ok(vec![product("a")]) })
            .await
            .unwrap();
        let second = service
            .load_with(|| async { Ok(vec![product("b")]) })
            .await
            .unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second[0].id.as_str(), "a");
    }

    #[tokio::test]
    async fn test_failed_load_keeps_nothing_cached() {
        let service = CatalogService::new();

        let failed = service
            .load_with(|| async { Err(RepositoryError::NotFound) })
            .await;
        assert!(failed.is_err());

        let loaded = service
            .load_with(|| async { Ok(vec![product("a"), product("b")]) })
            .await
            .unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let service = CatalogService::new();
        service
            .load_with(|| async { Ok(vec![product("a")]) })
            .await
            .unwrap();

        service.invalidate().await;

        let reloaded = service
            .load_with(|| async { Ok(vec![product("b")]) })
            .await
            .unwrap();
        assert_eq!(reloaded[0].id.as_str(), "b");
    }
}
