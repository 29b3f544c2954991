//! Listing queries over committed books.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::Book;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSortField {
    #[default]
    CreatedAt,
    Name,
    Price,
    Inventory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Filter, sort and page selection for `list_books`.
///
/// Pages are 1-based. Callers validate `page` and `page_size` before
/// building a query; the store clamps a zero page size to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub name_contains: Option<String>,
    pub include_archived: bool,
    pub sort: BookSortField,
    pub direction: SortDirection,
    pub page: u32,
    pub page_size: u32,
}

impl Default for BookQuery {
    fn default() -> Self {
        Self {
            name_contains: None,
            include_archived: false,
            sort: BookSortField::default(),
            direction: SortDirection::default(),
            page: 1,
            page_size: 20,
        }
    }
}

/// A single page of results plus the size of the unpaged result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl BookQuery {
    fn matches(&self, book: &Book) -> bool {
        if book.archived && !self.include_archived {
            return false;
        }
        match &self.name_contains {
            Some(needle) => book
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }

    fn compare(&self, a: &Book, b: &Book) -> Ordering {
        let ordering = match self.sort {
            BookSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            BookSortField::Name => a.name.cmp(&b.name),
            BookSortField::Price => a.price.cmp(&b.price),
            BookSortField::Inventory => a.inventory.cmp(&b.inventory),
        }
        // ids are v7, so ties fall back to creation order
        .then_with(|| a.id.cmp(&b.id));

        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    /// Apply the filter, ordering and paging to a full scan of books.
    pub fn apply(&self, books: impl IntoIterator<Item = Book>) -> Page<Book> {
        let mut selected: Vec<Book> = books.into_iter().filter(|b| self.matches(b)).collect();
        selected.sort_by(|a, b| self.compare(a, b));

        let total = selected.len() as u64;
        let page = self.page.max(1);
        let page_size = self.page_size.max(1);
        let offset = (page as usize - 1).saturating_mul(page_size as usize);

        let items = selected
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .collect();

        Page {
            items,
            page,
            page_size,
            total,
        }
    }
}
