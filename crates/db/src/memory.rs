//! Process-local backend for development and tests.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{Book, Order};
use crate::staged::{Backend, Store, WriteSet};

#[derive(Default)]
struct Tables {
    books: HashMap<Uuid, Book>,
    orders: HashMap<Uuid, Order>,
}

/// Committed tables behind a single reader/writer lock.
#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
}

impl Backend for MemoryBackend {
    const NAME: &'static str = "memory";

    fn load_book(&self, id: Uuid) -> StoreResult<Option<Book>> {
        Ok(self.tables.read().books.get(&id).cloned())
    }

    fn load_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.tables.read().orders.get(&id).cloned())
    }

    fn scan_books(&self) -> StoreResult<Vec<Book>> {
        Ok(self.tables.read().books.values().cloned().collect())
    }

    fn scan_orders(&self) -> StoreResult<Vec<Order>> {
        Ok(self.tables.read().orders.values().cloned().collect())
    }

    fn apply(&self, writes: WriteSet) -> StoreResult<()> {
        let mut tables = self.tables.write();
        tables.books.extend(writes.books);
        tables.orders.extend(writes.orders);
        Ok(())
    }
}

pub type MemoryStore = Store<MemoryBackend>;

impl Store<MemoryBackend> {
    pub fn in_memory() -> Self {
        Store::new(MemoryBackend::default())
    }
}
