pub mod books;
pub mod orders;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use bookstore_db::{EntityStore, StoreError};
use bookstore_http::error::AppError;
use bookstore_kernel::{settings::Settings, ModuleRegistry};

use orders::workflow::OrderWorkflow;

/// Register all bookstore modules with the registry, sharing one store
pub fn register_all(
    registry: &mut ModuleRegistry,
    store: &Arc<dyn EntityStore>,
    settings: &Settings,
) {
    let workflow = OrderWorkflow::new(store.clone(), settings.orders.transaction_timeout());

    registry.register(books::create_module(store.clone(), settings.pagination.clone()));
    registry.register(orders::create_module(store.clone(), workflow));
}

/// Map a store failure from a plain read or write onto the HTTP taxonomy.
/// Infrastructure failures surface as 500.
pub(crate) fn store_error(err: StoreError) -> AppError {
    match err {
        StoreError::BookNotFound(id) => {
            AppError::not_found(format!("book not found: {id}")).with_code("book_not_found")
        }
        StoreError::OrderNotFound(id) => {
            AppError::not_found(format!("order not found: {id}")).with_code("order_not_found")
        }
        err @ StoreError::OrderNotAcceptingItems { .. } => {
            AppError::bad_request(err.to_string()).with_code("order_not_accepting_items")
        }
        err @ StoreError::BookNotAtOrder { .. } => {
            AppError::bad_request(err.to_string()).with_code("book_not_at_order")
        }
        other => AppError::Internal(anyhow::Error::new(other)),
    }
}
