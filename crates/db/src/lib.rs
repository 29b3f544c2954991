//! Entity store for the bookstore: books, orders and order lines behind a
//! transactional, backend-agnostic interface.

use std::sync::Arc;

pub mod error;
pub mod memory;
pub mod models;
pub mod query;
pub mod redb_backend;
pub mod settings;
pub mod staged;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use models::{Book, Order, OrderItem, OrderStatus};
pub use query::{BookQuery, BookSortField, Page, SortDirection};
pub use redb_backend::RedbStore;
pub use settings::{DatabaseSettings, StoreBackend};
pub use store::{EntityStore, StoreTransaction};

/// Build the store selected by `settings`.
pub fn connect(settings: &DatabaseSettings) -> StoreResult<Arc<dyn EntityStore>> {
    let store: Arc<dyn EntityStore> = match settings.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::in_memory()),
        StoreBackend::Redb => {
            if let Some(parent) = settings.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Arc::new(RedbStore::open(&settings.path)?)
        }
    };

    tracing::info!(
        target: "bookstore-db",
        backend = store.backend_name(),
        path = %settings.path.display(),
        "entity store ready"
    );
    Ok(store)
}
