//! Store and transaction capabilities shared by every backend.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{Book, Order, OrderItem, OrderStatus};
use crate::query::{BookQuery, Page};

/// Durable keyed storage for books and orders.
///
/// Reads through the store see committed state only. Every mutation goes
/// through a [`StoreTransaction`] obtained from [`EntityStore::begin`].
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Short name of the backing engine, used in logs.
    fn backend_name(&self) -> &'static str;

    /// Open a write transaction.
    ///
    /// Write transactions are serialized: this waits until no other
    /// transaction is open on the store.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    async fn find_book(&self, id: Uuid) -> StoreResult<Book>;

    async fn list_books(&self, query: &BookQuery) -> StoreResult<Page<Book>>;

    async fn find_order(&self, id: Uuid) -> StoreResult<Order>;

    /// Orders oldest first, optionally restricted to one purchaser.
    async fn list_orders(&self, purchaser_id: Option<&str>) -> StoreResult<Vec<Order>>;
}

/// A scoped unit of work against an [`EntityStore`].
///
/// Writes stay private to the handle until [`commit`](Self::commit).
/// Dropping the handle without committing discards them.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn get_book(&mut self, id: Uuid) -> StoreResult<Book>;

    async fn insert_book(&mut self, book: Book) -> StoreResult<Book>;

    /// Overwrite a book's mutable fields. `created_at` is kept from the
    /// stored record.
    async fn update_book(&mut self, book: Book) -> StoreResult<Book>;

    async fn get_order(&mut self, id: Uuid) -> StoreResult<Order>;

    async fn insert_order(&mut self, order: Order) -> StoreResult<Order>;

    /// Assert the order still accepts items and refresh its `updated_at`.
    async fn touch_order(&mut self, id: Uuid) -> StoreResult<()>;

    async fn set_order_status(&mut self, id: Uuid, status: OrderStatus) -> StoreResult<Order>;

    async fn get_order_item(&mut self, order_id: Uuid, book_id: Uuid) -> StoreResult<OrderItem>;

    /// Insert the line or overwrite units, price, name and `updated_at` of
    /// the existing one. The original `created_at` survives an overwrite.
    async fn upsert_order_item(&mut self, order_id: Uuid, item: OrderItem)
        -> StoreResult<OrderItem>;

    /// Remove the line if present.
    async fn delete_order_item(&mut self, order_id: Uuid, book_id: Uuid) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
