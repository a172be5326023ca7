//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::broadcast;

use crate::config::StorefrontConfig;
use crate::razorpay::GatewayLoader;
use crate::services::catalog::CatalogService;
use crate::services::wishlist::PgWishlistStore;

/// Capacity of the logout notification channel.
const AUTH_EVENT_CAPACITY: usize = 64;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: CatalogService,
    gateway: GatewayLoader,
    wishlist: Arc<PgWishlistStore>,
    logouts: broadcast::Sender<String>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Nothing here touches the network: the gateway client loads on first
    /// use and the wishlist listener connects on the first subscription.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let gateway = GatewayLoader::new(config.razorpay.clone());
        let wishlist = Arc::new(PgWishlistStore::new(pool.clone()));
        let (logouts, _) = broadcast::channel(AUTH_EVENT_CAPACITY);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog: CatalogService::new(),
                gateway,
                wishlist,
                logouts,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Cached product catalog.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Lazily loaded payment gateway client.
    #[must_use]
    pub fn gateway(&self) -> &GatewayLoader {
        &self.inner.gateway
    }

    /// Shared wishlist store with its live feed.
    #[must_use]
    pub fn wishlist_store(&self) -> Arc<PgWishlistStore> {
        Arc::clone(&self.inner.wishlist)
    }

    /// Announce that the session with this id signed out.
    pub fn notify_logout(&self, session_id: String) {
        // No receivers simply means no live streams are open.
        let _ = self.inner.logouts.send(session_id);
    }

    /// Listen for sign-outs, keyed by session id.
    #[must_use]
    pub fn logout_events(&self) -> broadcast::Receiver<String> {
        self.inner.logouts.subscribe()
    }
}
