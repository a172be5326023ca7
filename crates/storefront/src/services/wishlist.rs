//! Wishlist state manager.
//!
//! A [`WishlistManager`] keeps a local mirror of one user's wishlist. The
//! mirror is seeded from the store's initial snapshot and then follows the
//! store's live feed; local toggles update it immediately and the feed
//! converges it afterwards (last write wins).
//!
//! The `PostgreSQL` store drives its feed from `LISTEN wishlist_changed`,
//! which a trigger on `wishlist_items` fires on every write.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_stream::stream;
use futures::StreamExt;
use futures::stream::BoxStream;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use clothify_core::{ProductId, UserId};

use crate::db::RepositoryError;
use crate::db::wishlist::{WISHLIST_CHANNEL, WishlistRepository};
use crate::models::{Product, WishlistEntry};

const LISTENER_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Errors from wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// No user is signed in.
    #[error("sign in to use your wishlist")]
    AuthenticationRequired,

    #[error("wishlist store error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("wishlist store unavailable: {0}")]
    Unavailable(String),
}

/// Snapshots of one user's wishlist: the current state first, then one
/// snapshot per change.
pub type WishlistFeed = BoxStream<'static, Vec<WishlistEntry>>;

/// Remote per-user wishlist storage with a live feed.
pub trait WishlistStore: Send + Sync + 'static {
    /// Subscribe to a user's wishlist.
    fn subscribe(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<WishlistFeed, WishlistError>> + Send;

    fn insert(
        &self,
        user_id: UserId,
        entry: &WishlistEntry,
    ) -> impl Future<Output = Result<(), WishlistError>> + Send;

    fn remove(
        &self,
        user_id: UserId,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<(), WishlistError>> + Send;
}

// =============================================================================
// PostgreSQL store
// =============================================================================

/// `PostgreSQL`-backed wishlist store.
///
/// One shared `LISTEN` connection fans change notifications out to every
/// subscriber; it is opened on the first subscription. `None` on the
/// broadcast channel means "reload everything" and is sent after the
/// listener reconnects, since notifications may have been missed.
pub struct PgWishlistStore {
    pool: PgPool,
    changes: broadcast::Sender<Option<UserId>>,
    listener: OnceCell<JoinHandle<()>>,
}

impl PgWishlistStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            pool,
            changes,
            listener: OnceCell::new(),
        }
    }

    async fn ensure_listener(&self) {
        self.listener
            .get_or_init(|| async {
                let pool = self.pool.clone();
                let changes = self.changes.clone();
                tokio::spawn(listen_for_changes(pool, changes))
            })
            .await;
    }
}

impl Drop for PgWishlistStore {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get() {
            handle.abort();
        }
    }
}

async fn listen_for_changes(pool: PgPool, changes: broadcast::Sender<Option<UserId>>) {
    let mut connected_before = false;

    loop {
        let mut listener = match PgListener::connect_with(&pool).await {
            Ok(listener) => listener,
            Err(e) => {
                warn!(error = %e, "Wishlist listener failed to connect, retrying");
                tokio::time::sleep(LISTENER_RETRY_DELAY).await;
                continue;
            }
        };

        if let Err(e) = listener.listen(WISHLIST_CHANNEL).await {
            warn!(error = %e, "Wishlist LISTEN failed, retrying");
            tokio::time::sleep(LISTENER_RETRY_DELAY).await;
            continue;
        }

        info!(channel = WISHLIST_CHANNEL, "Wishlist listener connected");
        if connected_before {
            let _ = changes.send(None);
        }
        connected_before = true;

        loop {
            match listener.recv().await {
                Ok(notification) => match notification.payload().parse::<i32>() {
                    Ok(id) => {
                        let _ = changes.send(Some(UserId::new(id)));
                    }
                    Err(_) => {
                        warn!(payload = notification.payload(), "Ignoring malformed wishlist notification");
                    }
                },
                Err(e) => {
                    error!(error = %e, "Wishlist listener lost its connection");
                    break;
                }
            }
        }
    }
}

impl WishlistStore for PgWishlistStore {
    #[instrument(skip(self))]
    async fn subscribe(&self, user_id: UserId) -> Result<WishlistFeed, WishlistError> {
        self.ensure_listener().await;

        // Subscribe before reading so no change between the two is lost.
        let mut rx = self.changes.subscribe();
        let initial = WishlistRepository::new(&self.pool)
            .list_for_user(user_id)
            .await?;
        let pool = self.pool.clone();

        Ok(stream! {
            yield initial;

            loop {
                match rx.recv().await {
                    Ok(Some(changed)) if changed != user_id => continue,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                match WishlistRepository::new(&pool).list_for_user(user_id).await {
                    Ok(entries) => yield entries,
                    Err(e) => warn!(error = %e, user_id = %user_id, "Failed to reload wishlist"),
                }
            }
        }
        .boxed())
    }

    async fn insert(&self, user_id: UserId, entry: &WishlistEntry) -> Result<(), WishlistError> {
        WishlistRepository::new(&self.pool)
            .insert(user_id, entry)
            .await?;
        Ok(())
    }

    async fn remove(&self, user_id: UserId, product_id: &ProductId) -> Result<(), WishlistError> {
        WishlistRepository::new(&self.pool)
            .remove(user_id, product_id)
            .await?;
        Ok(())
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// In-memory wishlist store backed by one watch channel per user.
#[derive(Clone, Default)]
pub struct MemoryWishlistStore {
    users: Arc<Mutex<HashMap<UserId, watch::Sender<Vec<WishlistEntry>>>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryWishlistStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), WishlistError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(WishlistError::Unavailable("store offline".to_string()))
        } else {
            Ok(())
        }
    }

    async fn channel(&self, user_id: UserId) -> watch::Sender<Vec<WishlistEntry>> {
        self.users
            .lock()
            .await
            .entry(user_id)
            .or_insert_with(|| watch::channel(Vec::new()).0)
            .clone()
    }
}

impl WishlistStore for MemoryWishlistStore {
    async fn subscribe(&self, user_id: UserId) -> Result<WishlistFeed, WishlistError> {
        self.check()?;
        let mut rx = self.channel(user_id).await.subscribe();

        Ok(stream! {
            loop {
                let snapshot = rx.borrow_and_update().clone();
                yield snapshot;
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
        .boxed())
    }

    async fn insert(&self, user_id: UserId, entry: &WishlistEntry) -> Result<(), WishlistError> {
        self.check()?;
        self.channel(user_id).await.send_if_modified(|entries| {
            if entries.iter().any(|e| e.product_id == entry.product_id) {
                false
            } else {
                entries.push(entry.clone());
                true
            }
        });
        Ok(())
    }

    async fn remove(&self, user_id: UserId, product_id: &ProductId) -> Result<(), WishlistError> {
        self.check()?;
        self.channel(user_id).await.send_if_modified(|entries| {
            let before = entries.len();
            entries.retain(|e| &e.product_id != product_id);
            entries.len() != before
        });
        Ok(())
    }
}

// =============================================================================
// Manager
// =============================================================================

/// The local mirror, tagged with the subscription it belongs to.
#[derive(Debug, Clone, Default)]
pub struct MirrorState {
    generation: u64,
    entries: Vec<WishlistEntry>,
}

impl MirrorState {
    #[must_use]
    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }
}

/// Local mirror of the signed-in user's wishlist.
///
/// Dropping the manager cancels its live subscription.
pub struct WishlistManager<S: WishlistStore> {
    store: Arc<S>,
    user: Option<UserId>,
    mirror: watch::Sender<MirrorState>,
    feed: Option<JoinHandle<()>>,
}

impl<S: WishlistStore> WishlistManager<S> {
    /// A manager with no user and an empty mirror.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            user: None,
            mirror: watch::Sender::new(MirrorState::default()),
            feed: None,
        }
    }

    /// Switch users.
    ///
    /// The previous subscription is torn down and the mirror reset to empty.
    /// For `Some(user)` the initial snapshot is awaited before returning and
    /// later snapshots are applied in the background. Snapshots that arrive
    /// for an earlier user are discarded.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError` if the subscription cannot be opened; the
    /// mirror stays empty.
    #[instrument(skip(self))]
    pub async fn set_user(&mut self, user: Option<UserId>) -> Result<(), WishlistError> {
        if let Some(feed) = self.feed.take() {
            feed.abort();
        }

        let generation = self.mirror.borrow().generation.wrapping_add(1);
        self.mirror.send_replace(MirrorState {
            generation,
            entries: Vec::new(),
        });
        self.user = user;

        let Some(user_id) = user else {
            return Ok(());
        };

        let mut feed = self.store.subscribe(user_id).await?;

        if let Some(initial) = feed.next().await {
            self.apply(generation, initial);
        }

        let mirror = self.mirror.clone();
        self.feed = Some(tokio::spawn(async move {
            while let Some(entries) = feed.next().await {
                apply_snapshot(&mirror, generation, entries);
            }
            debug!(user_id = %user_id, "Wishlist feed ended");
        }));

        Ok(())
    }

    fn apply(&self, generation: u64, entries: Vec<WishlistEntry>) {
        apply_snapshot(&self.mirror, generation, entries);
    }

    /// Add `product` if absent, remove it if present.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product is now in the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::AuthenticationRequired` with no user, or the
    /// store error if the remote write fails. Either way nothing changes.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn toggle(&self, product: &Product) -> Result<bool, WishlistError> {
        let user_id = self.user.ok_or(WishlistError::AuthenticationRequired)?;

        if self.is_in_wishlist(&product.id) {
            self.store.remove(user_id, &product.id).await?;
            self.mirror.send_if_modified(|state| {
                let before = state.entries.len();
                state.entries.retain(|e| e.product_id != product.id);
                state.entries.len() != before
            });
            Ok(false)
        } else {
            let entry = WishlistEntry::snapshot(product);
            self.store.insert(user_id, &entry).await?;
            self.mirror.send_if_modified(|state| {
                if state.entries.iter().any(|e| e.product_id == product.id) {
                    false
                } else {
                    state.entries.push(entry);
                    true
                }
            });
            Ok(true)
        }
    }

    #[must_use]
    pub fn is_in_wishlist(&self, product_id: &ProductId) -> bool {
        self.mirror
            .borrow()
            .entries
            .iter()
            .any(|e| &e.product_id == product_id)
    }

    #[must_use]
    pub fn entries(&self) -> Vec<WishlistEntry> {
        self.mirror.borrow().entries.clone()
    }

    #[must_use]
    pub const fn user(&self) -> Option<UserId> {
        self.user
    }

    /// Watch the mirror.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MirrorState> {
        self.mirror.subscribe()
    }
}

impl<S: WishlistStore> Drop for WishlistManager<S> {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.abort();
        }
    }
}

fn apply_snapshot(mirror: &watch::Sender<MirrorState>, generation: u64, entries: Vec<WishlistEntry>) {
    mirror.send_if_modified(|state| {
        if state.generation != generation || state.entries == entries {
            return false;
        }
        state.entries = entries;
        true
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use rust_decimal::Decimal;

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::from(id),
            name: format!("Product {id}"),
            price: Decimal::from(799),
            quantity: 10,
            image: format!("/img/{id}.jpg"),
            categories: Vec::new(),
        }
    }

    async fn wait_for<F>(rx: &mut watch::Receiver<MirrorState>, mut done: F)
    where
        F: FnMut(&MirrorState) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| done(s)))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_state() {
        let store = Arc::new(MemoryWishlistStore::new());
        let mut manager = WishlistManager::new(Arc::clone(&store));
        manager.set_user(Some(UserId::new(1))).await.unwrap();
        let jacket = product("jacket");

        assert!(manager.toggle(&jacket).await.unwrap());
        assert!(manager.is_in_wishlist(&jacket.id));

        assert!(!manager.toggle(&jacket).await.unwrap());
        assert!(!manager.is_in_wishlist(&jacket.id));
        assert!(manager.entries().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_without_user_requires_auth() {
        let store = Arc::new(MemoryWishlistStore::new());
        let manager = WishlistManager::new(store);

        let result = manager.toggle(&product("cap")).await;

        assert!(matches!(result, Err(WishlistError::AuthenticationRequired)));
        assert!(manager.entries().is_empty());
    }

    #[tokio::test]
    async fn test_initial_snapshot_loaded_on_set_user() {
        let store = Arc::new(MemoryWishlistStore::new());
        let user = UserId::new(7);
        store
            .insert(user, &WishlistEntry::snapshot(&product("scarf")))
            .await
            .unwrap();

        let mut manager = WishlistManager::new(Arc::clone(&store));
        manager.set_user(Some(user)).await.unwrap();

        assert!(manager.is_in_wishlist(&ProductId::from("scarf")));
    }

    #[tokio::test]
    async fn test_remote_change_converges_mirror() {
        let store = Arc::new(MemoryWishlistStore::new());
        let user = UserId::new(3);

        let mut watcher = WishlistManager::new(Arc::clone(&store));
        watcher.set_user(Some(user)).await.unwrap();
        let mut rx = watcher.subscribe();

        let mut other_tab = WishlistManager::new(Arc::clone(&store));
        other_tab.set_user(Some(user)).await.unwrap();
        other_tab.toggle(&product("boots")).await.unwrap();

        wait_for(&mut rx, |s| s.entries().len() == 1).await;
        assert!(watcher.is_in_wishlist(&ProductId::from("boots")));
    }

    #[tokio::test]
    async fn test_set_user_none_clears_and_ignores_old_feed() {
        let store = Arc::new(MemoryWishlistStore::new());
        let user = UserId::new(4);

        let mut manager = WishlistManager::new(Arc::clone(&store));
        manager.set_user(Some(user)).await.unwrap();
        manager.toggle(&product("hat")).await.unwrap();

        manager.set_user(None).await.unwrap();
        assert!(manager.entries().is_empty());

        store
            .insert(user, &WishlistEntry::snapshot(&product("gloves")))
            .await
            .unwrap();
        tokio::task::yield_now().await;

        assert!(manager.entries().is_empty());
        assert!(matches!(
            manager.toggle(&product("hat")).await,
            Err(WishlistError::AuthenticationRequired)
        ));
    }

    #[tokio::test]
    async fn test_switching_users_isolates_mirrors() {
        let store = Arc::new(MemoryWishlistStore::new());
        let alice = UserId::new(10);
        let bob = UserId::new(11);
        store
            .insert(alice, &WishlistEntry::snapshot(&product("dress")))
            .await
            .unwrap();

        let mut manager = WishlistManager::new(Arc::clone(&store));
        manager.set_user(Some(alice)).await.unwrap();
        assert_eq!(manager.entries().len(), 1);

        manager.set_user(Some(bob)).await.unwrap();
        assert!(manager.entries().is_empty());

        store
            .insert(alice, &WishlistEntry::snapshot(&product("skirt")))
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert!(manager.entries().is_empty());
    }

    #[tokio::test]
    async fn test_failed_remote_write_leaves_mirror() {
        let store = Arc::new(MemoryWishlistStore::new());
        let mut manager = WishlistManager::new(Arc::clone(&store));
        manager.set_user(Some(UserId::new(5))).await.unwrap();

        store.set_unavailable(true);
        let result = manager.toggle(&product("belt")).await;

        assert!(matches!(result, Err(WishlistError::Unavailable(_))));
        assert!(!manager.is_in_wishlist(&ProductId::from("belt")));
    }
}
