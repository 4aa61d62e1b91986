//! Products view-model.

use std::sync::atomic::{AtomicBool, Ordering};

use super::ActionOutcome;
use crate::models::{
    CreateProductInput, FilterPatch, PaginationMeta, Product, ProductFilters, Thumbnail,
    UpdateProductInput,
};
use crate::store::{messages, ProductsState, ProductsStore};

const UPDATE_IMAGE: &str = "Erro ao atualizar imagem";

/// Outcome of the two-step edit (metadata, then thumbnail). The steps are
/// not atomic: a thumbnail failure leaves the metadata committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Updated(Product),
    MetadataFailed { error: String },
    ThumbnailFailed { product: Product, error: String },
}

impl EditOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EditOutcome::Updated(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            EditOutcome::Updated(_) => None,
            EditOutcome::MetadataFailed { error } | EditOutcome::ThumbnailFailed { error, .. } => {
                Some(error)
            }
        }
    }
}

/// Actions and derived values over a [`ProductsStore`].
#[derive(Debug)]
pub struct ProductsView {
    store: ProductsStore,
    mounted: AtomicBool,
}

impl ProductsView {
    pub fn new(store: ProductsStore) -> Self {
        Self {
            store,
            mounted: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &ProductsStore {
        &self.store
    }

    pub fn state(&self) -> ProductsState {
        self.store.snapshot()
    }

    /// Initial load. Runs once per view; later calls return `false` without
    /// fetching.
    pub async fn mount(&self, initial: Option<ProductFilters>) -> bool {
        if self.mounted.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Some(filters) = &initial {
            self.store.set_filters(&FilterPatch::from(filters.clone()));
        }
        let filters = initial.unwrap_or_else(|| self.store.filters());
        if let Err(e) = self.store.fetch_products(Some(filters)).await {
            tracing::debug!("Initial product fetch failed: {}", e);
        }
        true
    }

    /// Reload with the current filters.
    pub async fn refresh(&self) -> ActionOutcome<()> {
        let result = self.store.fetch_products(Some(self.store.filters())).await;
        ActionOutcome::from_result(result, messages::LOAD_PRODUCTS)
    }

    /// Apply new filters and go back to the first page.
    pub async fn search(&self, patch: FilterPatch) -> ActionOutcome<()> {
        let mut filters = self.store.filters();
        filters.merge(&patch);
        filters.page = 1;
        self.load(filters).await
    }

    /// Move to another page, keeping the other filters.
    pub async fn change_page(&self, page: u32) -> ActionOutcome<()> {
        let mut filters = self.store.filters();
        filters.page = page;
        self.load(filters).await
    }

    async fn load(&self, filters: ProductFilters) -> ActionOutcome<()> {
        if let Err(err) = filters.validate() {
            return ActionOutcome::failed(err.user_message());
        }
        self.store.set_filters(&FilterPatch::from(filters.clone()));
        let result = self.store.fetch_products(Some(filters)).await;
        ActionOutcome::from_result(result, messages::LOAD_PRODUCTS)
    }

    pub async fn create(&self, input: CreateProductInput) -> ActionOutcome<Product> {
        if let Err(err) = input.validate() {
            return ActionOutcome::failed(err.user_message());
        }
        let result = self.store.create_product(input).await;
        ActionOutcome::from_result(result, messages::CREATE_PRODUCT)
    }

    pub async fn update(&self, id: &str, input: &UpdateProductInput) -> ActionOutcome<Product> {
        if let Err(err) = input.validate() {
            return ActionOutcome::failed(err.user_message());
        }
        let result = self.store.update_product(id, input).await;
        ActionOutcome::from_result(result, messages::UPDATE_PRODUCT)
    }

    pub async fn update_thumbnail(&self, id: &str, thumbnail: Thumbnail) -> ActionOutcome<Product> {
        if let Err(err) = thumbnail.validate() {
            return ActionOutcome::failed(err.user_message());
        }
        let result = self.store.update_product_thumbnail(id, thumbnail).await;
        ActionOutcome::from_result(result, UPDATE_IMAGE)
    }

    pub async fn remove(&self, id: &str) -> ActionOutcome<()> {
        let result = self.store.delete_product(id).await;
        ActionOutcome::from_result(result, messages::DELETE_PRODUCT)
    }

    /// Update metadata, then the thumbnail when one is given. No rollback is
    /// attempted if the second step fails.
    pub async fn edit(
        &self,
        id: &str,
        input: &UpdateProductInput,
        thumbnail: Option<Thumbnail>,
    ) -> EditOutcome {
        if let Some(Err(err)) = thumbnail.as_ref().map(Thumbnail::validate) {
            return EditOutcome::MetadataFailed {
                error: err.user_message(),
            };
        }

        let product = match self.update(id, input).await.into_result() {
            Ok(product) => product,
            Err(error) => return EditOutcome::MetadataFailed { error },
        };

        let Some(thumbnail) = thumbnail else {
            return EditOutcome::Updated(product);
        };

        match self.update_thumbnail(id, thumbnail).await.into_result() {
            Ok(product) => EditOutcome::Updated(product),
            Err(error) => {
                tracing::warn!("Product {} saved but its thumbnail was not: {}", id, error);
                EditOutcome::ThumbnailFailed { product, error }
            }
        }
    }

    pub fn clear_error(&self) {
        self.store.clear_error();
    }

    pub fn has_products(&self) -> bool {
        !self.store.snapshot().products.is_empty()
    }

    pub fn meta(&self) -> Option<PaginationMeta> {
        self.store.snapshot().meta
    }

    pub fn total_pages(&self) -> u32 {
        self.meta().map(|m| m.total_pages).unwrap_or(0)
    }

    pub fn current_page(&self) -> u32 {
        match self.store.filters().page {
            0 => 1,
            page => page,
        }
    }

    pub fn is_first_page(&self) -> bool {
        self.current_page() == 1
    }

    pub fn is_last_page(&self) -> bool {
        let last = match self.total_pages() {
            0 => 1,
            pages => pages,
        };
        self.current_page() == last
    }
}
