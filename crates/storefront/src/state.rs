//! Application state shared across handlers.

use std::sync::Arc;

use emporium_core::backend::{DocumentStore, IdentityProvider};

use crate::config::{BackendConfig, StorefrontConfig};
use crate::firebase::{FirebaseBackend, FirebaseError};
use crate::memory::MemoryBackend;
use crate::services::{Catalog, Orders, ProductAdmin, SessionContexts};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Catalog,
    products: ProductAdmin,
    orders: Orders,
    contexts: SessionContexts,
}

impl AppState {
    /// State over explicit backend collaborators.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let contexts = SessionContexts::new(
            identity,
            Arc::clone(&store),
            config.cart_retry,
            config.session_idle,
        );
        Self {
            inner: Arc::new(AppStateInner {
                catalog: Catalog::new(Arc::clone(&store)),
                products: ProductAdmin::new(Arc::clone(&store)),
                orders: Orders::new(store),
                contexts,
                config,
            }),
        }
    }

    /// State over the backend named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Firebase HTTP client cannot be built.
    pub fn from_config(config: StorefrontConfig) -> Result<Self, FirebaseError> {
        match &config.backend {
            BackendConfig::Firebase(firebase) => {
                let backend = FirebaseBackend::new(firebase)?;
                tracing::info!(project_id = %firebase.project_id, "Using Firebase backend");
                Ok(Self::new(config, Arc::new(backend.clone()), Arc::new(backend)))
            }
            BackendConfig::Memory => {
                let backend = MemoryBackend::new();
                tracing::warn!("Using in-memory backend, data is lost on restart");
                Ok(Self::new(config, Arc::new(backend.clone()), Arc::new(backend)))
            }
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    #[must_use]
    pub fn products(&self) -> &ProductAdmin {
        &self.inner.products
    }

    #[must_use]
    pub fn orders(&self) -> &Orders {
        &self.inner.orders
    }

    /// Live per-browser session contexts.
    #[must_use]
    pub fn contexts(&self) -> &SessionContexts {
        &self.inner.contexts
    }
}
