//! redb-backed durable storage.
//!
//! # Tables
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `books` | book id | JSON-serialized `Book` |
//! | `orders` | order id | JSON-serialized `Order`, lines included |
//!
//! A transaction's write set is applied inside a single redb write
//! transaction, so a commit either lands completely or not at all, even
//! across a crash.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{Book, Order};
use crate::staged::{Backend, Store, WriteSet};

const BOOKS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("books");

const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

pub struct RedbBackend {
    db: Database,
}

impl RedbBackend {
    /// Open or create the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open a database that lives only in memory (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(BOOKS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }
}

impl Backend for RedbBackend {
    const NAME: &'static str = "redb";

    fn load_book(&self, id: Uuid) -> StoreResult<Option<Book>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BOOKS_TABLE)?;
        let key = id.to_string();

        let book = match table.get(key.as_str())? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(book)
    }

    fn load_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let key = id.to_string();

        let order = match table.get(key.as_str())? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(order)
    }

    fn scan_books(&self) -> StoreResult<Vec<Book>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BOOKS_TABLE)?;

        let mut books = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            books.push(serde_json::from_slice(value.value())?);
        }
        Ok(books)
    }

    fn scan_orders(&self) -> StoreResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }

    fn apply(&self, writes: WriteSet) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut books = write_txn.open_table(BOOKS_TABLE)?;
            for (id, book) in &writes.books {
                let value = serde_json::to_vec(book)?;
                books.insert(id.to_string().as_str(), value.as_slice())?;
            }

            let mut orders = write_txn.open_table(ORDERS_TABLE)?;
            for (id, order) in &writes.orders {
                let value = serde_json::to_vec(order)?;
                orders.insert(id.to_string().as_str(), value.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

pub type RedbStore = Store<RedbBackend>;

impl Store<RedbBackend> {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Store::new(RedbBackend::open(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Store::new(RedbBackend::open_in_memory()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::OrderItem;
    use crate::query::{BookQuery, BookSortField};
    use crate::store::EntityStore;
    use rust_decimal::Decimal;
    use time::OffsetDateTime;

    #[tokio::test]
    async fn commit_persists_books_and_orders() {
        let store = RedbStore::open_in_memory().unwrap();
        let mut tx = store.begin().await.unwrap();
        let book = tx
            .insert_book(Book::new("Cryptonomicon", Decimal::new(1899, 2), 3))
            .await
            .unwrap();
        let order = tx.insert_order(Order::new("reader-1")).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.find_book(book.id).await.unwrap(), book);
        assert_eq!(store.find_order(order.id).await.unwrap(), order);
        assert_eq!(store.backend_name(), "redb");
    }

    #[tokio::test]
    async fn rollback_leaves_file_untouched() {
        let store = RedbStore::open_in_memory().unwrap();
        let mut tx = store.begin().await.unwrap();
        let book = tx
            .insert_book(Book::new("Seveneves", Decimal::new(1700, 2), 6))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let err = store.find_book(book.id).await.unwrap_err();
        assert!(matches!(err, StoreError::BookNotFound(id) if id == book.id));
    }

    #[tokio::test]
    async fn reopened_database_keeps_committed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookstore.redb");
        let (book, order) = {
            let store = RedbStore::open(&path).unwrap();
            let mut tx = store.begin().await.unwrap();
            let book = tx
                .insert_book(Book::new("Reamde", Decimal::new(1000, 2), 2))
                .await
                .unwrap();
            let order = tx.insert_order(Order::new("reader-2")).await.unwrap();
            let now = OffsetDateTime::now_utc();
            tx.upsert_order_item(
                order.id,
                OrderItem {
                    order_id: order.id,
                    book_id: book.id,
                    book_name: book.name.clone(),
                    book_units: 2,
                    unit_price_at_order: book.price,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await
            .unwrap();
            tx.commit().await.unwrap();
            (book, order)
        };

        let reopened = RedbStore::open(&path).unwrap();
        let stored = reopened.find_order(order.id).await.unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].book_id, book.id);
        assert_eq!(stored.total_price(), Decimal::new(2000, 2));
    }

    #[tokio::test]
    async fn list_books_scans_committed_rows() {
        let store = RedbStore::open_in_memory().unwrap();
        let mut tx = store.begin().await.unwrap();
        for (name, stock) in [("Quicksilver", 1), ("The Confusion", 2), ("The System of the World", 3)] {
            tx.insert_book(Book::new(name, Decimal::ONE, stock)).await.unwrap();
        }
        tx.commit().await.unwrap();

        let page = store
            .list_books(&BookQuery {
                sort: BookSortField::Inventory,
                page_size: 2,
                ..BookQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<_> = page.items.into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["Quicksilver", "The Confusion"]);
    }
}
