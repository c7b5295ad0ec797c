//! Cart state manager.
//!
//! Holds the signed-in user's cart in memory and mirrors every change to
//! the `carts/{uid}` document.
//!
//! # Consistency
//!
//! Changes are applied locally first and published with
//! [`CartStatus::Saving`]. The write is conditional on the document revision
//! last read or written:
//!
//! - revision conflict: re-read the document, replay the mutation on the
//!   fresh items, try again
//! - transient failure: back off exponentially and try again
//! - attempts exhausted or permanent failure: revert to the last confirmed
//!   items and return [`CartError::Persistence`]

mod error;

pub use error::CartError;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::instrument;

use emporium_core::backend::{
    BackendError, CARTS, Document, DocumentStore, Identity, Precondition, Revision,
};
use emporium_core::{CartItems, CartMutation, Product, ProductId, Uid};

use crate::config::CartRetryConfig;

/// Field of the cart document holding the line items.
pub const ITEMS_FIELD: &str = "items";

/// Whether the published items are confirmed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Reading the cart of a newly signed-in user.
    Loading,
    /// Items match the stored document.
    Ready,
    /// Items include a change that has not been confirmed yet.
    Saving,
}

/// Items and status as published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSnapshot {
    pub items: CartItems,
    pub status: CartStatus,
}

/// Outcome of a cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartWrite {
    /// Nobody is signed in; nothing changed.
    Skipped,
    /// The change is stored at `revision`.
    Confirmed { revision: Revision },
}

/// Cart of one browser session.
pub struct CartManager {
    store: Arc<dyn DocumentStore>,
    retry: CartRetryConfig,
    owner: Option<Uid>,
    /// Items as last read from or written to the backend.
    confirmed: CartItems,
    /// Revision of `confirmed`. `None` while the owner's cart is not loaded.
    revision: Option<Revision>,
    snapshot: watch::Sender<CartSnapshot>,
}

fn parse_items(doc: &Document) -> Result<CartItems, CartError> {
    match doc.data.get(ITEMS_FIELD) {
        None | Some(Value::Null) => Ok(CartItems::new()),
        Some(items) => serde_json::from_value(items.clone())
            .map_err(|e| CartError::Malformed(format!("carts/{}: {e}", doc.id))),
    }
}

impl CartManager {
    /// Empty cart with no owner.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, retry: CartRetryConfig) -> Self {
        let (snapshot, _) = watch::channel(CartSnapshot {
            items: CartItems::new(),
            status: CartStatus::Ready,
        });
        Self {
            store,
            retry,
            owner: None,
            confirmed: CartItems::new(),
            revision: None,
            snapshot,
        }
    }

    /// Subscribe to item and status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.snapshot.subscribe()
    }

    /// Current items, including an unconfirmed change in flight.
    #[must_use]
    pub fn items(&self) -> CartItems {
        self.snapshot.borrow().items.clone()
    }

    /// Sum of price times quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.snapshot.borrow().items.total()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.snapshot.borrow().items.item_count()
    }

    /// Current load/save state of the cart.
    #[must_use]
    pub fn status(&self) -> CartStatus {
        self.snapshot.borrow().status
    }

    /// Uid whose cart is held.
    #[must_use]
    pub const fn owner(&self) -> Option<&Uid> {
        self.owner.as_ref()
    }

    fn publish(&self, items: CartItems, status: CartStatus) {
        self.snapshot.send_replace(CartSnapshot { items, status });
    }

    /// Follow an identity change.
    ///
    /// Without a user the cart is emptied. For a different user the previous
    /// cart is dropped before the new one is read; a missing cart document is
    /// created with no items.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Load` if the cart cannot be read or created. The
    /// cart stays empty and the next mutation retries the load.
    #[instrument(skip_all, fields(uid = user.map(|u| u.uid.as_str())))]
    pub async fn sync_identity(&mut self, user: Option<&Identity>) -> Result<(), CartError> {
        let uid = user.map(|u| u.uid.clone());
        if uid.is_some() && uid == self.owner && self.revision.is_some() {
            return Ok(());
        }

        self.owner.clone_from(&uid);
        self.confirmed = CartItems::new();
        self.revision = None;

        let Some(uid) = uid else {
            self.publish(CartItems::new(), CartStatus::Ready);
            return Ok(());
        };

        self.publish(CartItems::new(), CartStatus::Loading);
        let loaded = self.load(&uid).await;
        match loaded {
            Ok((items, revision)) => {
                tracing::debug!(lines = items.len(), "Cart loaded");
                self.confirmed = items.clone();
                self.revision = Some(revision);
                self.publish(items, CartStatus::Ready);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cart load failed");
                self.publish(CartItems::new(), CartStatus::Ready);
                Err(e)
            }
        }
    }

    /// Read the cart document, creating it when absent.
    async fn load(&self, uid: &Uid) -> Result<(CartItems, Revision), CartError> {
        if let Some(doc) = self
            .store
            .get(CARTS, uid.as_str())
            .await
            .map_err(CartError::Load)?
        {
            return Ok((parse_items(&doc)?, doc.revision));
        }

        let mut data = Map::new();
        data.insert(ITEMS_FIELD.to_string(), Value::Array(Vec::new()));
        match self.store.create(CARTS, Some(uid.as_str()), data, &[]).await {
            Ok(doc) => Ok((CartItems::new(), doc.revision)),
            Err(BackendError::Conflict(_)) => {
                // Another session created it between the read and the create.
                let doc = self
                    .store
                    .get(CARTS, uid.as_str())
                    .await
                    .map_err(CartError::Load)?
                    .ok_or_else(|| {
                        CartError::Load(BackendError::NotFound(format!("carts/{uid}")))
                    })?;
                Ok((parse_items(&doc)?, doc.revision))
            }
            Err(e) => Err(CartError::Load(e)),
        }
    }

    /// Add `quantity` of `product`, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence` if the change could not be stored.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(
        &mut self,
        product: &Product,
        quantity: i64,
    ) -> Result<CartWrite, CartError> {
        self.apply(CartMutation::Add {
            product: product.clone(),
            quantity,
        })
        .await
    }

    /// Remove the line for `product_id`. Removing an absent id changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence` if the change could not be stored.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&mut self, product_id: &ProductId) -> Result<CartWrite, CartError> {
        self.apply(CartMutation::Remove(product_id.clone())).await
    }

    /// Replace the quantity of a line verbatim.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence` if the change could not be stored.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<CartWrite, CartError> {
        self.apply(CartMutation::SetQuantity {
            id: product_id.clone(),
            quantity,
        })
        .await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Persistence` if the change could not be stored.
    #[instrument(skip(self))]
    pub async fn clear_cart(&mut self) -> Result<CartWrite, CartError> {
        self.apply(CartMutation::Clear).await
    }

    async fn apply(&mut self, mutation: CartMutation) -> Result<CartWrite, CartError> {
        let Some(uid) = self.owner.clone() else {
            tracing::debug!(mutation = mutation.name(), "No user, cart unchanged");
            return Ok(CartWrite::Skipped);
        };

        if self.revision.is_none() {
            let (items, revision) = self.load(&uid).await?;
            self.confirmed = items;
            self.revision = Some(revision);
        }

        let mut attempt = 0;
        let mut delay = self.retry.base_delay;
        loop {
            attempt += 1;
            let mut next = self.confirmed.clone();
            mutation.apply(&mut next);
            self.publish(next.clone(), CartStatus::Saving);

            let precondition = self
                .revision
                .clone()
                .map_or(Precondition::Exists, Precondition::Revision);
            let value = serde_json::to_value(&next)
                .map_err(|e| CartError::Malformed(e.to_string()))?;

            let err = match self
                .store
                .set_field(CARTS, uid.as_str(), ITEMS_FIELD, value, precondition)
                .await
            {
                Ok(revision) => {
                    self.confirmed = next.clone();
                    self.revision = Some(revision.clone());
                    self.publish(next, CartStatus::Ready);
                    return Ok(CartWrite::Confirmed { revision });
                }
                Err(err) => err,
            };

            let retryable = matches!(err, BackendError::Conflict(_) | BackendError::NotFound(_))
                || err.is_transient();
            if !retryable || attempt >= self.retry.attempts {
                tracing::error!(
                    error = %err,
                    attempts = attempt,
                    mutation = mutation.name(),
                    "Cart write failed, reverting"
                );
                self.publish(self.confirmed.clone(), CartStatus::Ready);
                return Err(CartError::Persistence {
                    attempts: attempt,
                    source: err,
                });
            }

            if matches!(err, BackendError::Conflict(_) | BackendError::NotFound(_)) {
                tracing::info!(attempt, "Cart changed elsewhere, re-reading");
                match self.load(&uid).await {
                    Ok((items, revision)) => {
                        self.confirmed = items;
                        self.revision = Some(revision);
                    }
                    Err(e) => tracing::warn!(error = %e, "Re-read after conflict failed"),
                }
            } else {
                tracing::warn!(error = %err, attempt, ?delay, "Cart write failed, retrying");
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use emporium_core::backend::IdentityProvider;
    use emporium_core::{Claims, Email, Price};

    use super::*;
    use crate::memory::MemoryBackend;

    fn retry() -> CartRetryConfig {
        CartRetryConfig {
            attempts: 3,
            base_delay: Duration::ZERO,
        }
    }

    fn product(id: &str, price: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Produkt {id}"),
            description: String::new(),
            price: Price::new(Decimal::from(price)).unwrap(),
            stock: 5,
            image_url: String::new(),
            category: "akcesoria".to_string(),
            created_at: None,
            is_new: false,
            extra: serde_json::Map::new(),
        }
    }

    fn identity(uid: &str) -> Identity {
        Identity {
            uid: Uid::new(uid),
            email: None,
            claims: Claims::default(),
        }
    }

    async fn signed_in(backend: &MemoryBackend, uid: &str) -> CartManager {
        let mut cart = CartManager::new(Arc::new(backend.clone()), retry());
        cart.sync_identity(Some(&identity(uid))).await.unwrap();
        cart
    }

    #[tokio::test]
    async fn test_missing_cart_document_is_created_empty() {
        let backend = MemoryBackend::new();
        let cart = signed_in(&backend, "u1").await;
        assert!(cart.items().is_empty());
        let doc = backend.get(CARTS, "u1").await.unwrap().unwrap();
        assert_eq!(doc.data[ITEMS_FIELD], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_add_is_additive_and_persisted() {
        let backend = MemoryBackend::new();
        let mut cart = signed_in(&backend, "u1").await;
        let p = product("p1", 100);

        cart.add_to_cart(&p, 2).await.unwrap();
        let write = cart.add_to_cart(&p, 3).await.unwrap();
        assert!(matches!(write, CartWrite::Confirmed { .. }));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.total(), Decimal::from(500));
        assert_eq!(cart.status(), CartStatus::Ready);

        let stored = backend.get(CARTS, "u1").await.unwrap().unwrap();
        let items: CartItems = serde_json::from_value(stored.data[ITEMS_FIELD].clone()).unwrap();
        assert_eq!(items, cart.items());
    }

    #[tokio::test]
    async fn test_stored_snapshot_keeps_unmodelled_product_fields() {
        let backend = MemoryBackend::new();
        let mut cart = signed_in(&backend, "u1").await;
        let promo: Product = serde_json::from_value(serde_json::json!({
            "id": "p9",
            "name": "Pad",
            "price": 59.0,
            "promo": true,
            "oldPrice": 79.0,
            "details": {"size": "XL"}
        }))
        .unwrap();

        cart.add_to_cart(&promo, 1).await.unwrap();

        let stored = backend.get(CARTS, "u1").await.unwrap().unwrap();
        let line = &stored.data[ITEMS_FIELD][0];
        assert_eq!(line["promo"], serde_json::json!(true));
        assert_eq!(line["oldPrice"], serde_json::json!(79.0));
        assert_eq!(line["details"]["size"], "XL");

        let reread = signed_in(&backend, "u1").await;
        let item = reread.items().get(&promo.id).unwrap().clone();
        assert_eq!(item.product.extra, promo.extra);
    }

    #[tokio::test]
    async fn test_add_update_remove_scenario() {
        let backend = MemoryBackend::new();
        let mut cart = signed_in(&backend, "u1").await;
        let p1 = product("p1", 10);

        cart.add_to_cart(&p1, 2).await.unwrap();
        cart.update_quantity(&p1.id, 5).await.unwrap();
        assert_eq!(cart.items().get(&p1.id).unwrap().quantity, 5);
        cart.remove_from_cart(&p1.id).await.unwrap();
        assert!(cart.items().is_empty());
    }

    #[tokio::test]
    async fn test_clear_then_read_is_empty() {
        let backend = MemoryBackend::new();
        let mut cart = signed_in(&backend, "u1").await;
        cart.add_to_cart(&product("p1", 10), 1).await.unwrap();
        cart.add_to_cart(&product("p2", 20), 1).await.unwrap();
        cart.clear_cart().await.unwrap();
        assert!(cart.items().is_empty());

        let reread = signed_in(&backend, "u1").await;
        assert!(reread.items().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_without_user_are_skipped() {
        let backend = MemoryBackend::new();
        let mut cart = CartManager::new(Arc::new(backend.clone()), retry());
        cart.sync_identity(None).await.unwrap();

        let write = cart.add_to_cart(&product("p1", 10), 1).await.unwrap();
        assert_eq!(write, CartWrite::Skipped);
        assert_eq!(
            cart.update_quantity(&ProductId::new("p1"), 3).await.unwrap(),
            CartWrite::Skipped
        );
        assert!(cart.items().is_empty());
        assert_eq!(backend.count(CARTS).await, 0);
    }

    #[tokio::test]
    async fn test_identity_switch_drops_previous_cart() {
        let backend = MemoryBackend::new();
        let mut cart = signed_in(&backend, "user-a").await;
        cart.add_to_cart(&product("a1", 10), 1).await.unwrap();

        let mut other = signed_in(&backend, "user-b").await;
        other.add_to_cart(&product("b1", 20), 4).await.unwrap();

        cart.sync_identity(Some(&identity("user-b"))).await.unwrap();
        let items = cart.items();
        assert_eq!(items.len(), 1);
        assert!(items.get(&ProductId::new("a1")).is_none());
        assert_eq!(items.get(&ProductId::new("b1")).unwrap().quantity, 4);

        cart.sync_identity(None).await.unwrap();
        assert!(cart.items().is_empty());
        assert!(cart.owner().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_writer_is_not_lost() {
        let backend = MemoryBackend::new();
        let mut phone = signed_in(&backend, "u1").await;
        let mut laptop = signed_in(&backend, "u1").await;

        phone.add_to_cart(&product("p1", 10), 1).await.unwrap();
        // The laptop still holds the revision from before the phone's write.
        laptop.add_to_cart(&product("p2", 20), 2).await.unwrap();

        let items = laptop.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items.get(&ProductId::new("p1")).unwrap().quantity, 1);
        assert_eq!(items.get(&ProductId::new("p2")).unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let backend = MemoryBackend::new();
        let mut cart = signed_in(&backend, "u1").await;
        backend.fail_next_writes(2);

        let write = cart.add_to_cart(&product("p1", 10), 1).await.unwrap();
        assert!(matches!(write, CartWrite::Confirmed { .. }));
        assert_eq!(cart.item_count(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_revert_local_cart() {
        let backend = MemoryBackend::new();
        let mut cart = signed_in(&backend, "u1").await;
        cart.add_to_cart(&product("p1", 10), 1).await.unwrap();
        let before = cart.items();

        backend.fail_next_writes(3);
        let err = cart.add_to_cart(&product("p2", 10), 1).await.unwrap_err();
        assert!(matches!(err, CartError::Persistence { attempts: 3, .. }));
        assert_eq!(cart.items(), before);
        assert_eq!(cart.status(), CartStatus::Ready);
    }

    #[tokio::test]
    async fn test_saving_status_is_published() {
        let backend = MemoryBackend::new();
        let mut cart = signed_in(&backend, "u1").await;
        let mut rx = cart.subscribe();
        rx.mark_unchanged();

        cart.add_to_cart(&product("p1", 10), 1).await.unwrap();
        // The last published snapshot is the confirmed one.
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, CartStatus::Ready);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried_on_next_mutation() {
        let backend = MemoryBackend::new();
        backend.fail_next_writes(1);
        let mut cart = CartManager::new(Arc::new(backend.clone()), retry());
        assert!(cart.sync_identity(Some(&identity("u1"))).await.is_err());

        let write = cart.add_to_cart(&product("p1", 10), 1).await.unwrap();
        assert!(matches!(write, CartWrite::Confirmed { .. }));
        assert_eq!(cart.item_count(), 1);
    }

    #[tokio::test]
    async fn test_signed_in_user_cart_via_identity_provider() {
        let backend = MemoryBackend::new();
        let session = backend
            .sign_up(&Email::parse("ala@example.com").unwrap(), "Sklep123!")
            .await
            .unwrap();
        let mut cart = CartManager::new(Arc::new(backend.clone()), retry());
        cart.sync_identity(Some(&session.identity)).await.unwrap();
        cart.add_to_cart(&product("p1", 10), 1).await.unwrap();
        assert!(
            backend
                .get(CARTS, session.identity.uid.as_str())
                .await
                .unwrap()
                .is_some()
        );
    }
}
