//! Application state shared across admin handlers.

use std::sync::Arc;

use emporium_core::backend::{DocumentStore, IdentityAdmin};
use emporium_storefront::config::BackendConfig;
use emporium_storefront::firebase::{FirebaseBackend, FirebaseError};
use emporium_storefront::memory::MemoryBackend;

use crate::config::AdminConfig;

/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityAdmin>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AdminConfig,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityAdmin>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                identity,
            }),
        }
    }

    /// State over the backend named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Firebase HTTP client cannot be built.
    pub fn from_config(config: AdminConfig) -> Result<Self, FirebaseError> {
        match &config.backend {
            BackendConfig::Firebase(firebase) => {
                let backend = FirebaseBackend::new(firebase)?;
                Ok(Self::new(config, Arc::new(backend.clone()), Arc::new(backend)))
            }
            BackendConfig::Memory => {
                tracing::warn!("Using in-memory backend, nobody can authenticate");
                let backend = MemoryBackend::new();
                Ok(Self::new(config, Arc::new(backend.clone()), Arc::new(backend)))
            }
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    /// Privileged identity operations.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityAdmin {
        self.inner.identity.as_ref()
    }
}
