//! Product model matching the catalog API's JSON contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::errors::{ClientError, ClientResult};

use super::Thumbnail;

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MIN: usize = 10;
pub const DESCRIPTION_MAX: usize = 500;
pub const PAGE_SIZE_MAX: u32 = 100;

/// A catalog product as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: bool,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl Product {
    /// `updated_at` parsed as RFC 3339, when the server sent a parseable stamp.
    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.updated_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Pagination metadata, computed server-side and trusted as-is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
}

/// One page of the product list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductsPage {
    pub data: Vec<Product>,
    pub meta: PaginationMeta,
}

/// Effective list filters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilters {
    /// 1-based page number
    #[validate(range(min = 1, message = "Página deve ser maior ou igual a 1"))]
    pub page: u32,
    #[validate(range(
        min = 1,
        max = 100,
        message = "Itens por página deve estar entre 1 e 100"
    ))]
    pub page_size: u32,
    /// Substring match on title
    pub filter: String,
}

impl Default for ProductFilters {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            filter: String::new(),
        }
    }
}

impl ProductFilters {
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    /// Merge a partial update into these filters.
    pub fn merge(&mut self, patch: &FilterPatch) {
        if let Some(page) = patch.page {
            self.page = page;
        }
        if let Some(page_size) = patch.page_size {
            self.page_size = page_size;
        }
        if let Some(filter) = &patch.filter {
            self.filter = filter.clone();
        }
    }

    /// Query pairs for the list endpoint. Only present keys are included:
    /// zero page numbers and an empty filter are left out.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::with_capacity(3);
        if self.page > 0 {
            query.push(("page", self.page.to_string()));
        }
        if self.page_size > 0 {
            query.push(("pageSize", self.page_size.to_string()));
        }
        if !self.filter.is_empty() {
            query.push(("filter", self.filter.clone()));
        }
        query
    }

    pub fn validate(&self) -> ClientResult<()> {
        Ok(Validate::validate(self)?)
    }
}

/// Partial filter update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub filter: Option<String>,
}

impl FilterPatch {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    pub fn filter(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            ..Self::default()
        }
    }
}

impl From<ProductFilters> for FilterPatch {
    fn from(filters: ProductFilters) -> Self {
        Self {
            page: Some(filters.page),
            page_size: Some(filters.page_size),
            filter: Some(filters.filter),
        }
    }
}

/// Input for creating a product. Always sent as multipart.
#[derive(Debug, Clone, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 3, max = 100))]
    pub title: String,
    #[validate(length(min = 10, max = 500))]
    pub description: String,
    pub thumbnail: Thumbnail,
}

impl CreateProductInput {
    pub fn validate(&self) -> ClientResult<()> {
        Validate::validate(self).map_err(|errors| {
            text_error(
                errors,
                &[title_field(&self.title), description_field(&self.description)],
            )
        })?;
        self.thumbnail.validate()
    }
}

/// Metadata-only update, sent as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 3, max = 100))]
    pub title: String,
    #[validate(length(min = 10, max = 500))]
    pub description: String,
    pub status: bool,
}

impl UpdateProductInput {
    pub fn validate(&self) -> ClientResult<()> {
        Validate::validate(self).map_err(|errors| {
            text_error(
                errors,
                &[title_field(&self.title), description_field(&self.description)],
            )
        })
    }
}

impl From<&Product> for UpdateProductInput {
    fn from(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            description: product.description.clone(),
            status: product.status,
        }
    }
}

/// Length-checked text field, as named in messages.
struct TextField<'a> {
    name: &'static str,
    label: &'static str,
    required: &'static str,
    min: usize,
    max: usize,
    value: &'a str,
}

fn title_field(value: &str) -> TextField<'_> {
    TextField {
        name: "title",
        label: "Título",
        required: "Título é obrigatório",
        min: TITLE_MIN,
        max: TITLE_MAX,
        value,
    }
}

fn description_field(value: &str) -> TextField<'_> {
    TextField {
        name: "description",
        label: "Descrição",
        required: "Descrição é obrigatória",
        min: DESCRIPTION_MIN,
        max: DESCRIPTION_MAX,
        value,
    }
}

/// First failed length rule among `fields`, in the given order. Empty input
/// reports the field as required, otherwise the violated bound is named.
fn text_error(errors: ValidationErrors, fields: &[TextField<'_>]) -> ClientError {
    let failed = {
        let field_errors = errors.field_errors();
        let found = fields.iter().find(|field| field_errors.contains_key(field.name));
        found
    };
    let Some(field) = failed else {
        return ClientError::from(errors);
    };

    let len = field.value.chars().count();
    let message = if len == 0 {
        field.required.to_string()
    } else if len < field.min {
        format!("{} deve ter pelo menos {} caracteres", field.label, field.min)
    } else {
        format!("{} deve ter no máximo {} caracteres", field.label, field.max)
    };
    ClientError::Validation(message)
}
