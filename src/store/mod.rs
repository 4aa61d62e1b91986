//! Client-side products store.
//!
//! Holds the current page of products, pagination metadata, the effective
//! filters and a single `loading`/`error` pair shared by every action. After
//! a successful mutation the local list is patched immediately; create and
//! delete also spawn a reconciling refetch so totals and cross-page shifts
//! come from the server.
//!
//! List fetches are sequenced: each takes a number when dispatched, and a
//! page is applied only if no later-dispatched fetch has been applied yet.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::ProductsApi;
use crate::errors::{ClientError, ClientResult};
use crate::models::{
    CreateProductInput, FilterPatch, PaginationMeta, Product, ProductFilters, Thumbnail,
    UpdateProductInput,
};

/// Fallback messages per action, used when an error has nothing better.
pub mod messages {
    pub const LOAD_PRODUCTS: &str = "Erro ao carregar produtos";
    pub const LOAD_PRODUCT: &str = "Erro ao carregar produto";
    pub const CREATE_PRODUCT: &str = "Erro ao criar produto";
    pub const UPDATE_PRODUCT: &str = "Erro ao atualizar produto";
    pub const UPDATE_THUMBNAIL: &str = "Erro ao atualizar thumbnail";
    pub const DELETE_PRODUCT: &str = "Erro ao deletar produto";
}

/// Snapshot of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductsState {
    pub products: Vec<Product>,
    pub current_product: Option<Product>,
    pub meta: Option<PaginationMeta>,
    pub loading: bool,
    pub error: Option<String>,
    pub filters: ProductFilters,
    /// Sequence number of the last list fetch applied.
    applied_fetch: u64,
}

impl ProductsState {
    pub fn with_filters(filters: ProductFilters) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.products.iter().any(|p| p.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.products.iter().position(|p| p.id == id)
    }

    fn replace(&mut self, id: &str, product: &Product) {
        for slot in self.products.iter_mut().filter(|p| p.id == id) {
            *slot = product.clone();
        }
        if self.current_product.as_ref().is_some_and(|p| p.id == id) {
            self.current_product = Some(product.clone());
        }
    }
}

/// Handle to the products store. Clones share the same state.
#[derive(Debug, Clone)]
pub struct ProductsStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    api: ProductsApi,
    state: watch::Sender<ProductsState>,
    fetch_seq: AtomicU64,
    reconciles: Mutex<Vec<JoinHandle<()>>>,
}

impl ProductsStore {
    pub fn new(api: ProductsApi, filters: ProductFilters) -> Self {
        let (state, _) = watch::channel(ProductsState::with_filters(filters));
        Self {
            inner: Arc::new(StoreInner {
                api,
                state,
                fetch_seq: AtomicU64::new(0),
                reconciles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn api(&self) -> &ProductsApi {
        &self.inner.api
    }

    pub fn snapshot(&self) -> ProductsState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ProductsState> {
        self.inner.state.subscribe()
    }

    pub fn filters(&self) -> ProductFilters {
        self.inner.state.borrow().filters.clone()
    }

    /// Fetch a page. With `None` the stored filters are used; otherwise the
    /// given filters become the stored ones once the page is applied.
    pub async fn fetch_products(&self, filters: Option<ProductFilters>) -> ClientResult<()> {
        let seq = self.next_fetch();
        let filters = filters.unwrap_or_else(|| self.filters());
        self.run_fetch(seq, filters).await
    }

    async fn run_fetch(&self, seq: u64, filters: ProductFilters) -> ClientResult<()> {
        self.begin();

        match self.inner.api.list(&filters).await {
            Ok(page) => {
                let count = page.data.len();
                let applied = self.inner.state.send_if_modified(|state| {
                    if state.applied_fetch > seq {
                        return false;
                    }
                    state.applied_fetch = seq;
                    state.products = page.data;
                    state.meta = Some(page.meta);
                    state.filters = filters;
                    state.loading = false;
                    state.error = None;
                    true
                });
                if applied {
                    tracing::debug!("Applied product page (fetch {}, {} items)", seq, count);
                } else {
                    tracing::debug!("Dropped stale product page (fetch {})", seq);
                }
                Ok(())
            }
            Err(err) => {
                let message = err.user_message_or(messages::LOAD_PRODUCTS);
                tracing::warn!("{}: {}", messages::LOAD_PRODUCTS, message);
                self.inner.state.send_if_modified(|state| {
                    if state.applied_fetch > seq {
                        return false;
                    }
                    // Older fetches still in flight must not replace the
                    // filters that just failed.
                    state.applied_fetch = seq;
                    state.error = Some(message);
                    state.loading = false;
                    true
                });
                Err(err)
            }
        }
    }

    /// Load a single product into `current_product`.
    pub async fn fetch_product(&self, id: &str) -> ClientResult<Product> {
        self.begin();
        match self.inner.api.get(id).await {
            Ok(product) => {
                self.inner.state.send_modify(|state| {
                    state.current_product = Some(product.clone());
                    state.loading = false;
                });
                Ok(product)
            }
            Err(err) => Err(self.fail(err, messages::LOAD_PRODUCT)),
        }
    }

    /// Create a product, prepend it locally and reconcile in the background.
    pub async fn create_product(&self, input: CreateProductInput) -> ClientResult<Product> {
        self.begin();
        match self.inner.api.create(input).await {
            Ok(product) => {
                tracing::info!("Created product {}", product.id);
                self.inner.state.send_modify(|state| {
                    state.products.insert(0, product.clone());
                    state.loading = false;
                });
                self.spawn_reconcile();
                Ok(product)
            }
            Err(err) => Err(self.fail(err, messages::CREATE_PRODUCT)),
        }
    }

    /// Update metadata and replace the product in place.
    pub async fn update_product(&self, id: &str, input: &UpdateProductInput) -> ClientResult<Product> {
        self.begin();
        match self.inner.api.update(id, input).await {
            Ok(product) => {
                tracing::info!("Updated product {}", id);
                self.inner.state.send_modify(|state| {
                    state.replace(id, &product);
                    state.loading = false;
                });
                Ok(product)
            }
            Err(err) => Err(self.fail(err, messages::UPDATE_PRODUCT)),
        }
    }

    /// Replace the thumbnail and the product in place.
    pub async fn update_product_thumbnail(
        &self,
        id: &str,
        thumbnail: Thumbnail,
    ) -> ClientResult<Product> {
        self.begin();
        match self.inner.api.update_thumbnail(id, thumbnail).await {
            Ok(product) => {
                tracing::info!("Updated thumbnail of product {}", id);
                self.inner.state.send_modify(|state| {
                    state.replace(id, &product);
                    state.loading = false;
                });
                Ok(product)
            }
            Err(err) => Err(self.fail(err, messages::UPDATE_THUMBNAIL)),
        }
    }

    /// Delete a product, drop it locally and reconcile in the background.
    pub async fn delete_product(&self, id: &str) -> ClientResult<()> {
        self.begin();
        match self.inner.api.delete(id).await {
            Ok(()) => {
                tracing::info!("Deleted product {}", id);
                self.inner.state.send_modify(|state| {
                    state.products.retain(|p| p.id != id);
                    if state.current_product.as_ref().is_some_and(|p| p.id == id) {
                        state.current_product = None;
                    }
                    state.loading = false;
                });
                self.spawn_reconcile();
                Ok(())
            }
            Err(err) => Err(self.fail(err, messages::DELETE_PRODUCT)),
        }
    }

    /// Merge into the stored filters. Does not fetch.
    pub fn set_filters(&self, patch: &FilterPatch) {
        self.inner.state.send_modify(|state| state.filters.merge(patch));
    }

    pub fn set_current_product(&self, product: Option<Product>) {
        self.inner
            .state
            .send_modify(|state| state.current_product = product);
    }

    pub fn clear_error(&self) {
        self.inner.state.send_modify(|state| state.error = None);
    }

    /// Wait for every reconciling refetch spawned so far.
    pub async fn settle(&self) {
        loop {
            let handles = std::mem::take(
                &mut *self
                    .inner
                    .reconciles
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!("Reconciling refetch task failed: {}", e);
                }
            }
        }
    }

    fn next_fetch(&self) -> u64 {
        self.inner.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Refetch with the current filters without waiting for it. The sequence
    /// number is taken here, so any fetch dispatched afterwards wins.
    fn spawn_reconcile(&self) {
        let seq = self.next_fetch();
        let filters = self.filters();
        let store = self.clone();

        let handle = tokio::spawn(async move {
            if let Err(e) = store.run_fetch(seq, filters).await {
                tracing::warn!("Reconciling refetch failed: {}", e);
            }
        });

        let mut reconciles = self
            .inner
            .reconciles
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        reconciles.retain(|h| !h.is_finished());
        reconciles.push(handle);
    }

    fn begin(&self) {
        self.inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    fn fail(&self, err: ClientError, default_message: &str) -> ClientError {
        let message = err.user_message_or(default_message);
        tracing::warn!("{}: {}", default_message, message);
        self.inner.state.send_modify(|state| {
            state.error = Some(message);
            state.loading = false;
        });
        err
    }
}
