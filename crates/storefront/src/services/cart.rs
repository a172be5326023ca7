//! Cart state manager.
//!
//! The cart lives in the visitor's session as a serialized list of
//! [`CartLine`]s. Every mutation is persisted before it is committed in
//! memory, so a failed write leaves the cart exactly as it was.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_sessions::Session;
use tracing::{debug, warn};

use clothify_core::ProductId;

use crate::models::session_keys;
use crate::models::{CartLine, CartLineView, CartView, Product};

/// Errors from cart persistence.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("cart storage error: {0}")]
    Store(String),

    #[error("cart serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where the serialized cart is kept.
pub trait CartStore: Send + Sync {
    /// The raw serialized cart, if one was saved.
    fn read(&self) -> impl Future<Output = Result<Option<String>, CartError>> + Send;

    /// Replace the saved cart.
    fn write(&self, payload: String) -> impl Future<Output = Result<(), CartError>> + Send;

    /// Remove the saved cart.
    fn erase(&self) -> impl Future<Output = Result<(), CartError>> + Send;
}

/// Session-backed cart storage under the `clothify-cart` key.
#[derive(Debug, Clone)]
pub struct SessionCartStore(Session);

impl SessionCartStore {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self(session)
    }
}

impl CartStore for SessionCartStore {
    async fn read(&self) -> Result<Option<String>, CartError> {
        self.0
            .get::<String>(session_keys::CART)
            .await
            .map_err(|e| CartError::Store(e.to_string()))
    }

    async fn write(&self, payload: String) -> Result<(), CartError> {
        self.0
            .insert(session_keys::CART, payload)
            .await
            .map_err(|e| CartError::Store(e.to_string()))
    }

    async fn erase(&self) -> Result<(), CartError> {
        self.0
            .remove::<String>(session_keys::CART)
            .await
            .map(|_| ())
            .map_err(|e| CartError::Store(e.to_string()))
    }
}

/// In-memory cart storage with switchable write failures.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStore {
    payload: Arc<Mutex<Option<String>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryCartStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `payload` already saved.
    #[must_use]
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Arc::new(Mutex::new(Some(payload.into()))),
            failing: Arc::default(),
        }
    }

    /// Make every subsequent operation fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The currently saved payload.
    pub async fn payload(&self) -> Option<String> {
        self.payload.lock().await.clone()
    }

    fn check(&self) -> Result<(), CartError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CartError::Store("storage unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl CartStore for MemoryCartStore {
    async fn read(&self) -> Result<Option<String>, CartError> {
        self.check()?;
        Ok(self.payload.lock().await.clone())
    }

    async fn write(&self, payload: String) -> Result<(), CartError> {
        self.check()?;
        *self.payload.lock().await = Some(payload);
        Ok(())
    }

    async fn erase(&self) -> Result<(), CartError> {
        self.check()?;
        *self.payload.lock().await = None;
        Ok(())
    }
}

/// What [`CartManager::add_to_cart`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was created with quantity 1.
    Added,
    /// An existing line went up by one.
    Incremented,
    /// The line is already at the stock ceiling; nothing changed.
    Capped,
}

/// The visitor's cart.
#[derive(Debug)]
pub struct CartManager<S> {
    store: S,
    lines: Vec<CartLine>,
}

impl<S: CartStore> CartManager<S> {
    /// Load the saved cart. Missing or malformed data yields an empty cart.
    pub async fn load(store: S) -> Self {
        let lines = match store.read().await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding malformed saved cart");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read saved cart");
                Vec::new()
            }
        };

        Self { store, lines }
    }

    async fn commit(&mut self, lines: Vec<CartLine>) -> Result<(), CartError> {
        let payload = serde_json::to_string(&lines)?;
        self.store.write(payload).await?;
        self.lines = lines;
        Ok(())
    }

    /// Add one unit of `product`.
    ///
    /// An existing line is incremented only while it is below the product's
    /// stock; at the ceiling the call is a silent no-op. A new line always
    /// starts at quantity 1, even for a product with no stock.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the cart cannot be saved.
    pub async fn add_to_cart(&mut self, product: &Product) -> Result<AddOutcome, CartError> {
        let mut lines = self.lines.clone();

        let outcome = if let Some(line) = lines.iter_mut().find(|l| l.id == product.id) {
            line.stock = product.quantity;
            if line.quantity >= product.quantity {
                debug!(product_id = %product.id, "Add capped at stock");
                return Ok(AddOutcome::Capped);
            }
            line.quantity += 1;
            AddOutcome::Incremented
        } else {
            lines.push(CartLine::from_product(product));
            AddOutcome::Added
        };

        self.commit(lines).await?;
        Ok(outcome)
    }

    /// Remove a line. Absent ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the cart cannot be saved.
    pub async fn remove_from_cart(&mut self, id: &ProductId) -> Result<(), CartError> {
        if self.line(id).is_none() {
            return Ok(());
        }

        let lines = self.lines.iter().filter(|l| &l.id != id).cloned().collect();
        self.commit(lines).await
    }

    /// Set a line's quantity, clamped into `[1, max]`.
    ///
    /// A `max` of zero is treated as 1 so a line never reaches zero.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the cart cannot be saved.
    pub async fn update_quantity(
        &mut self,
        id: &ProductId,
        new_quantity: i64,
        max: u32,
    ) -> Result<(), CartError> {
        let ceiling = max.max(1);
        let clamped = u32::try_from(new_quantity.clamp(1, i64::from(ceiling))).unwrap_or(1);

        let mut lines = self.lines.clone();
        let Some(line) = lines.iter_mut().find(|l| &l.id == id) else {
            return Ok(());
        };
        line.quantity = clamped;

        self.commit(lines).await
    }

    /// Empty the cart and erase the saved copy.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the saved cart cannot be erased.
    pub async fn clear_cart(&mut self) -> Result<(), CartError> {
        self.store.erase().await?;
        self.lines.clear();
        Ok(())
    }

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Client-facing view with per-line stock flags.
    #[must_use]
    pub fn view(&self) -> CartView {
        CartView {
            items: self.lines.iter().map(CartLineView::from).collect(),
            item_count: self.item_count(),
            total_amount: self.total_amount(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, price: i64, stock: u32) -> Product {
        Product {
            id: ProductId::from(id),
            name: format!("Product {id}"),
            price: Decimal::from(price),
            quantity: stock,
            image: String::new(),
            categories: Vec::new(),
        }
    }

    async fn empty_cart() -> (MemoryCartStore, CartManager<MemoryCartStore>) {
        let store = MemoryCartStore::new();
        let cart = CartManager::load(store.clone()).await;
        (store, cart)
    }

    #[tokio::test]
    async fn test_add_new_then_increment() {
        let (_, mut cart) = empty_cart().await;
        let shirt = product("p1", 500, 3);

        assert_eq!(cart.add_to_cart(&shirt).await.unwrap(), AddOutcome::Added);
        assert_eq!(cart.add_to_cart(&shirt).await.unwrap(), AddOutcome::Incremented);
        assert_eq!(cart.line(&shirt.id).unwrap().quantity, 2);
        assert_eq!(cart.total_amount(), Decimal::from(1000));
    }

    #[tokio::test]
    async fn test_zero_stock_add_is_capped() {
        let (_, mut cart) = empty_cart().await;
        let sold_out = product("p1", 500, 0);

        assert_eq!(cart.add_to_cart(&sold_out).await.unwrap(), AddOutcome::Added);
        assert_eq!(cart.add_to_cart(&sold_out).await.unwrap(), AddOutcome::Capped);
        assert_eq!(cart.line(&sold_out.id).unwrap().quantity, 1);

        let view = cart.view();
        assert!(view.items[0].out_of_stock);
        assert!(view.items[0].max_reached);
    }

    #[tokio::test]
    async fn test_update_quantity_clamps() {
        let (_, mut cart) = empty_cart().await;
        let shirt = product("p1", 100, 5);
        cart.add_to_cart(&shirt).await.unwrap();

        cart.update_quantity(&shirt.id, 0, 5).await.unwrap();
        assert_eq!(cart.line(&shirt.id).unwrap().quantity, 1);

        cart.update_quantity(&shirt.id, 99, 5).await.unwrap();
        assert_eq!(cart.line(&shirt.id).unwrap().quantity, 5);

        cart.update_quantity(&shirt.id, -3, 0).await.unwrap();
        assert_eq!(cart.line(&shirt.id).unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn test_item_count_counts_lines() {
        let (_, mut cart) = empty_cart().await;
        let a = product("a", 100, 10);
        let b = product("b", 100, 10);

        cart.add_to_cart(&a).await.unwrap();
        cart.add_to_cart(&a).await.unwrap();
        cart.add_to_cart(&b).await.unwrap();

        assert_eq!(cart.item_count(), 2);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let (_, mut cart) = empty_cart().await;
        cart.add_to_cart(&product("a", 100, 10)).await.unwrap();

        cart.remove_from_cart(&ProductId::from("missing")).await.unwrap();
        assert_eq!(cart.item_count(), 1);

        cart.remove_from_cart(&ProductId::from("a")).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_clear_then_reload_is_empty() {
        let (store, mut cart) = empty_cart().await;
        cart.add_to_cart(&product("a", 100, 10)).await.unwrap();
        assert!(store.payload().await.is_some());

        cart.clear_cart().await.unwrap();
        assert!(store.payload().await.is_none());

        let reloaded = CartManager::load(store).await;
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn test_reload_restores_lines() {
        let (store, mut cart) = empty_cart().await;
        cart.add_to_cart(&product("a", 250, 10)).await.unwrap();
        cart.add_to_cart(&product("a", 250, 10)).await.unwrap();

        let reloaded = CartManager::load(store).await;
        assert_eq!(reloaded.lines(), cart.lines());
        assert_eq!(reloaded.total_amount(), Decimal::from(500));
    }

    #[tokio::test]
    async fn test_malformed_payload_loads_empty() {
        let store = MemoryCartStore::with_payload("{not json");
        let cart = CartManager::load(store).await;
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cart_unchanged() {
        let (store, mut cart) = empty_cart().await;
        let shirt = product("p1", 100, 5);
        cart.add_to_cart(&shirt).await.unwrap();

        store.set_failing(true);
        assert!(cart.add_to_cart(&shirt).await.is_err());
        assert!(cart.remove_from_cart(&shirt.id).await.is_err());
        assert!(cart.clear_cart().await.is_err());

        assert_eq!(cart.line(&shirt.id).unwrap().quantity, 1);
        assert_eq!(cart.item_count(), 1);
    }
}
