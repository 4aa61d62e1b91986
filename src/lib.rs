//! Product catalog client.
//!
//! A typed client for the catalog REST API with client-side stores for the
//! session and the product list, and a view-model layer that turns every
//! failure into a displayable outcome.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod models;
pub mod store;
pub mod view;

use std::sync::Arc;

use api::{ApiClient, ProductsApi};
use auth::{AuthStorage, AuthStore, FileStorage};
use config::Config;
use errors::ClientResult;
use models::ProductFilters;
use store::ProductsStore;
use view::{AuthView, ProductsView};

/// Everything a front-end needs, built once at startup and handed to
/// consumers. Clones share the same stores.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub api: ApiClient,
    pub auth: AuthStore,
    pub products: ProductsStore,
}

impl AppContext {
    /// Build the context with the auth blob stored in the configured file.
    pub fn new(config: Config) -> ClientResult<Self> {
        let storage = Arc::new(FileStorage::new(config.auth_storage_path.clone()));
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn AuthStorage>) -> ClientResult<Self> {
        let api = ApiClient::new(&config, storage)?;
        let auth = AuthStore::new(api.clone());
        let products = ProductsStore::new(
            ProductsApi::new(api.clone()),
            ProductFilters::with_page_size(config.default_page_size),
        );

        Ok(Self {
            config: Arc::new(config),
            api,
            auth,
            products,
        })
    }

    pub fn products_view(&self) -> ProductsView {
        ProductsView::new(self.products.clone())
    }

    pub fn auth_view(&self) -> AuthView {
        AuthView::new(self.auth.clone())
    }
}

#[cfg(test)]
mod tests;
