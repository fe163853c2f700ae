//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::Backend;
use crate::config::StorefrontConfig;
use crate::services::{
    BackOffice, CatalogService, CheckoutService, OrderService, ProfileResolver,
};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds the backend client and the services
/// that keep caches; per-request services borrow from it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: Backend,
    profiles: ProfileResolver,
    catalog: CatalogService,
}

impl AppState {
    /// State using the backend named by the configuration.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let backend = Backend::from_config(&config.backend);
        Self::with_backend(config, backend)
    }

    /// State around an existing backend, e.g. a seeded memory backend.
    #[must_use]
    pub fn with_backend(config: StorefrontConfig, backend: Backend) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                profiles: ProfileResolver::new(backend.clone()),
                catalog: CatalogService::new(backend.clone()),
                config,
                backend,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    #[must_use]
    pub fn profiles(&self) -> &ProfileResolver {
        &self.inner.profiles
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(&self.inner.backend)
    }

    #[must_use]
    pub fn checkout(&self) -> CheckoutService<'_> {
        CheckoutService::new(&self.inner.backend)
    }

    #[must_use]
    pub fn back_office(&self) -> BackOffice<'_> {
        BackOffice::new(&self.inner.backend, &self.inner.profiles, &self.inner.catalog)
    }
}
