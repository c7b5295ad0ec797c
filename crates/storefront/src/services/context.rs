//! Per-browser session contexts.
//!
//! Each browser session owns one [`SessionContext`] holding its
//! [`AuthSession`] and [`CartManager`]. Contexts live in a `moka` cache keyed
//! by a random id kept in the session cookie and expire after an idle period.
//! The tokens needed to rebuild a context after expiry or a restart are
//! stored in the HTTP session itself.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::Mutex;
use uuid::Uuid;

use emporium_core::backend::{DocumentStore, Identity, IdentityProvider, IdentitySession};

use super::auth::{AuthError, AuthSession, AuthState};
use super::cart::CartManager;
use crate::config::CartRetryConfig;

/// Upper bound on live contexts.
const MAX_CONTEXTS: u64 = 10_000;

/// Auth and cart state of one browser session.
pub struct SessionContext {
    pub auth: AuthSession,
    pub cart: CartManager,
}

impl SessionContext {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        retry: CartRetryConfig,
    ) -> Self {
        Self {
            auth: AuthSession::new(identity),
            cart: CartManager::new(store, retry),
        }
    }

    /// Whether the initial auth resolution has run.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.auth.state().is_resolved()
    }

    /// Resolve auth from stored tokens and load the matching cart.
    pub async fn resolve(&mut self, stored: Option<IdentitySession>) -> AuthState {
        let state = self.auth.resolve(stored).await;
        self.follow_identity().await;
        state
    }

    /// Sign in and switch the cart to the new user.
    ///
    /// # Errors
    ///
    /// Propagates [`AuthSession::login`] errors; the cart is emptied then.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let result = self.auth.login(email, password).await;
        self.follow_identity().await;
        result
    }

    /// Sign out and empty the cart.
    pub async fn logout(&mut self) {
        self.auth.logout();
        self.follow_identity().await;
    }

    /// Bring the cart in line with the signed-in user.
    ///
    /// A failed load leaves the cart empty; the next mutation retries it.
    async fn follow_identity(&mut self) {
        let user = self.auth.user();
        if let Err(e) = self.cart.sync_identity(user.as_ref()).await {
            tracing::warn!(error = %e, "Cart not loaded after identity change");
        }
    }
}

/// Registry of live contexts.
#[derive(Clone)]
pub struct SessionContexts {
    cache: Cache<Uuid, Arc<Mutex<SessionContext>>>,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    retry: CartRetryConfig,
}

impl SessionContexts {
    /// Registry whose contexts expire after `idle` without access.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        retry: CartRetryConfig,
        idle: Duration,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CONTEXTS)
            .time_to_idle(idle)
            .build();
        Self {
            cache,
            identity,
            store,
            retry,
        }
    }

    /// The context for `id`, created unresolved if absent.
    pub async fn get_or_create(&self, id: Uuid) -> Arc<Mutex<SessionContext>> {
        self.cache
            .get_with(id, async {
                tracing::debug!(context_id = %id, "New session context");
                Arc::new(Mutex::new(SessionContext::new(
                    Arc::clone(&self.identity),
                    Arc::clone(&self.store),
                    self.retry,
                )))
            })
            .await
    }

    /// Drop the context for `id`.
    pub async fn remove(&self, id: &Uuid) {
        self.cache.invalidate(id).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::backend::IdentityProvider;
    use emporium_core::{Email, Price, Product, ProductId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::memory::MemoryBackend;

    const PASSWORD: &str = "Sklep123!";

    fn registry(backend: &MemoryBackend) -> SessionContexts {
        SessionContexts::new(
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            CartRetryConfig {
                attempts: 3,
                base_delay: Duration::ZERO,
            },
            Duration::from_secs(60),
        )
    }

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: id.to_string(),
            description: String::new(),
            price: Price::new(Decimal::from(10)).unwrap(),
            stock: 1,
            image_url: String::new(),
            category: "dom".to_string(),
            created_at: None,
            is_new: false,
            extra: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn test_same_id_returns_same_context() {
        let backend = MemoryBackend::new();
        let contexts = registry(&backend);
        let id = Uuid::new_v4();

        let first = contexts.get_or_create(id).await;
        let second = contexts.get_or_create(id).await;
        assert!(Arc::ptr_eq(&first, &second));

        let other = contexts.get_or_create(Uuid::new_v4()).await;
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn test_login_loads_cart_and_logout_clears_it() {
        let backend = MemoryBackend::new();
        backend
            .sign_up(&Email::parse("ala@example.com").unwrap(), PASSWORD)
            .await
            .unwrap();
        let contexts = registry(&backend);
        let context = contexts.get_or_create(Uuid::new_v4()).await;
        let mut ctx = context.lock().await;

        ctx.resolve(None).await;
        assert!(ctx.is_resolved());
        ctx.login("ala@example.com", PASSWORD).await.unwrap();
        ctx.cart.add_to_cart(&product("p1"), 2).await.unwrap();
        assert_eq!(ctx.cart.item_count(), 2);

        ctx.logout().await;
        assert!(ctx.cart.items().is_empty());
        assert!(!ctx.auth.is_admin());
    }

    #[tokio::test]
    async fn test_resolve_restores_cart_in_fresh_context() {
        let backend = MemoryBackend::new();
        backend
            .sign_up(&Email::parse("ala@example.com").unwrap(), PASSWORD)
            .await
            .unwrap();
        let contexts = registry(&backend);

        let first_id = Uuid::new_v4();
        let stored = {
            let context = contexts.get_or_create(first_id).await;
            let mut ctx = context.lock().await;
            ctx.login("ala@example.com", PASSWORD).await.unwrap();
            ctx.cart.add_to_cart(&product("p1"), 1).await.unwrap();
            ctx.auth.tokens().cloned().unwrap()
        };
        contexts.remove(&first_id).await;

        let context = contexts.get_or_create(Uuid::new_v4()).await;
        let mut ctx = context.lock().await;
        ctx.resolve(Some(stored)).await;
        assert_eq!(ctx.cart.item_count(), 1);
    }
}
