use bookstore_db::{BookQuery, BookSortField, SortDirection};
use bookstore_http::error::AppError;
use bookstore_kernel::settings::PaginationSettings;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

/// Request model for creating a new book.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBook {
    /// Display name of the book
    pub name: String,
    /// Current catalog price
    pub price: Decimal,
    /// Units in stock when the book is catalogued
    pub inventory: u32,
}

impl CreateBook {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut details = Vec::new();
        if self.name.trim().is_empty() {
            details.push(json!({"field": "name", "error": "required"}));
        }
        if self.price < Decimal::ZERO {
            details.push(json!({"field": "price", "error": "must not be negative"}));
        }
        if details.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(details, "invalid book"))
        }
    }
}

/// Partial update of a book's catalog fields. Stock is only ever changed
/// through order lines, so `inventory` is rejected here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBook {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub archived: Option<bool>,
}

impl UpdateBook {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut details = Vec::new();
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            details.push(json!({"field": "name", "error": "must not be empty"}));
        }
        if self.price.is_some_and(|price| price < Decimal::ZERO) {
            details.push(json!({"field": "price", "error": "must not be negative"}));
        }
        if details.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(details, "invalid book update"))
        }
    }
}

/// Query string accepted by `GET /api/books`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBooksParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub name: Option<String>,
    pub include_archived: Option<bool>,
    pub sort: Option<BookSortField>,
    pub order: Option<SortDirection>,
}

impl ListBooksParams {
    pub fn into_query(self, pagination: &PaginationSettings) -> Result<BookQuery, AppError> {
        let page = self.page.unwrap_or(1);
        let page_size = self.page_size.unwrap_or(pagination.default_page_size);

        let mut details = Vec::new();
        if page == 0 {
            details.push(json!({"field": "page", "error": "must be at least 1"}));
        }
        if page_size == 0 || page_size > pagination.max_page_size {
            details.push(json!({
                "field": "page_size",
                "error": format!("must be between 1 and {}", pagination.max_page_size)
            }));
        }
        if !details.is_empty() {
            return Err(AppError::validation(details, "invalid pagination"));
        }

        Ok(BookQuery {
            name_contains: self.name.filter(|name| !name.trim().is_empty()),
            include_archived: self.include_archived.unwrap_or(false),
            sort: self.sort.unwrap_or_default(),
            direction: self.order.unwrap_or_default(),
            page,
            page_size,
        })
    }
}
