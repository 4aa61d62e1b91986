//! Products resource client.

use reqwest::multipart::Form;
use reqwest::Method;

use super::ApiClient;
use crate::errors::ClientResult;
use crate::models::{
    CreateProductInput, Product, ProductFilters, ProductsPage, Thumbnail, UpdateProductInput,
};

/// Maps product operations onto the REST API. Nothing is cached and no
/// error is swallowed.
#[derive(Debug, Clone)]
pub struct ProductsApi {
    client: ApiClient,
}

impl ProductsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn products(&self) -> &str {
        &self.client.endpoints().products
    }

    /// GET /products?page&pageSize&filter
    pub async fn list(&self, filters: &ProductFilters) -> ClientResult<ProductsPage> {
        let request = self
            .client
            .request(Method::GET, self.products())
            .query(&filters.to_query());
        self.client.send_json(request).await
    }

    /// GET /products/{id}
    pub async fn get(&self, id: &str) -> ClientResult<Product> {
        let request = self.client.request_at(Method::GET, self.products(), &[id])?;
        self.client.send_json(request).await
    }

    /// POST /products as multipart.
    pub async fn create(&self, input: CreateProductInput) -> ClientResult<Product> {
        let thumbnail = input.thumbnail.resolve(self.client.http()).await?;
        let form = Form::new()
            .text("title", input.title)
            .text("description", input.description)
            .part("thumbnail", thumbnail.into_part()?);

        let request = self
            .client
            .request(Method::POST, self.products())
            .multipart(form);
        self.client.send_json(request).await
    }

    /// PUT /products/{id} with title, description and status. The thumbnail
    /// is not touched.
    pub async fn update(&self, id: &str, input: &UpdateProductInput) -> ClientResult<Product> {
        let request = self
            .client
            .request_at(Method::PUT, self.products(), &[id])?
            .json(input);
        self.client.send_json(request).await
    }

    /// PATCH /products/thumbnail/{id} as multipart.
    pub async fn update_thumbnail(&self, id: &str, thumbnail: Thumbnail) -> ClientResult<Product> {
        let thumbnail = thumbnail.resolve(self.client.http()).await?;
        let form = Form::new().part("thumbnail", thumbnail.into_part()?);

        let request = self
            .client
            .request_at(Method::PATCH, self.products(), &["thumbnail", id])?
            .multipart(form);
        self.client.send_json(request).await
    }

    /// DELETE /products/{id}
    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        let request = self.client.request_at(Method::DELETE, self.products(), &[id])?;
        self.client.send_empty(request).await
    }
}
