//! Write-set transactions over a synchronous [`Backend`].
//!
//! A transaction holds the store's writer slot for its whole lifetime and
//! records every mutation in a private [`WriteSet`]. Reads consult the write
//! set first and fall back to committed state. Commit hands the write set to
//! the backend in one call, so there is no suspension point between the
//! first and the last record becoming visible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{Book, Order, OrderItem, OrderStatus};
use crate::query::{BookQuery, Page};
use crate::store::{EntityStore, StoreTransaction};

/// Committed-state access implemented by each storage engine.
pub trait Backend: Send + Sync + 'static {
    const NAME: &'static str;

    fn load_book(&self, id: Uuid) -> StoreResult<Option<Book>>;

    fn load_order(&self, id: Uuid) -> StoreResult<Option<Order>>;

    fn scan_books(&self) -> StoreResult<Vec<Book>>;

    fn scan_orders(&self) -> StoreResult<Vec<Order>>;

    /// Make every record in `writes` visible at once, or none of them.
    fn apply(&self, writes: WriteSet) -> StoreResult<()>;
}

/// Records staged by an open transaction.
#[derive(Debug, Default)]
pub struct WriteSet {
    pub books: HashMap<Uuid, Book>,
    pub orders: HashMap<Uuid, Order>,
}

impl WriteSet {
    pub fn len(&self) -> usize {
        self.books.len() + self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An [`EntityStore`] over a concrete backend.
pub struct Store<B> {
    backend: Arc<B>,
    writer: Arc<Mutex<()>>,
    next_tx: AtomicU64,
}

impl<B: Backend> Store<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            writer: Arc::new(Mutex::new(())),
            next_tx: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl<B: Backend> EntityStore for Store<B> {
    fn backend_name(&self) -> &'static str {
        B::NAME
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let slot = self.writer.clone().lock_owned().await;
        let id = self.next_tx.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(tx = id, backend = B::NAME, "transaction started");

        Ok(Box::new(StagedTransaction {
            id,
            backend: self.backend.clone(),
            writes: WriteSet::default(),
            finished: false,
            _slot: slot,
        }))
    }

    async fn find_book(&self, id: Uuid) -> StoreResult<Book> {
        self.backend
            .load_book(id)?
            .ok_or(StoreError::BookNotFound(id))
    }

    async fn list_books(&self, query: &BookQuery) -> StoreResult<Page<Book>> {
        let books = self.backend.scan_books()?;
        Ok(query.apply(books))
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Order> {
        self.backend
            .load_order(id)?
            .ok_or(StoreError::OrderNotFound(id))
    }

    async fn list_orders(&self, purchaser_id: Option<&str>) -> StoreResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .backend
            .scan_orders()?
            .into_iter()
            .filter(|order| purchaser_id.map_or(true, |p| order.purchaser_id == p))
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(orders)
    }
}

struct StagedTransaction<B: Backend> {
    id: u64,
    backend: Arc<B>,
    writes: WriteSet,
    finished: bool,
    _slot: OwnedMutexGuard<()>,
}

impl<B: Backend> StagedTransaction<B> {
    fn book(&self, id: Uuid) -> StoreResult<Book> {
        match self.writes.books.get(&id) {
            Some(book) => Ok(book.clone()),
            None => self
                .backend
                .load_book(id)?
                .ok_or(StoreError::BookNotFound(id)),
        }
    }

    fn order(&self, id: Uuid) -> StoreResult<Order> {
        match self.writes.orders.get(&id) {
            Some(order) => Ok(order.clone()),
            None => self
                .backend
                .load_order(id)?
                .ok_or(StoreError::OrderNotFound(id)),
        }
    }

    fn stage_book(&mut self, book: Book) {
        self.writes.books.insert(book.id, book);
    }

    fn stage_order(&mut self, order: Order) {
        self.writes.orders.insert(order.id, order);
    }
}

#[async_trait]
impl<B: Backend> StoreTransaction for StagedTransaction<B> {
    async fn get_book(&mut self, id: Uuid) -> StoreResult<Book> {
        self.book(id)
    }

    async fn insert_book(&mut self, book: Book) -> StoreResult<Book> {
        self.stage_book(book.clone());
        Ok(book)
    }

    async fn update_book(&mut self, mut book: Book) -> StoreResult<Book> {
        let stored = self.book(book.id)?;
        book.created_at = stored.created_at;
        self.stage_book(book.clone());
        Ok(book)
    }

    async fn get_order(&mut self, id: Uuid) -> StoreResult<Order> {
        self.order(id)
    }

    async fn insert_order(&mut self, order: Order) -> StoreResult<Order> {
        self.stage_order(order.clone());
        Ok(order)
    }

    async fn touch_order(&mut self, id: Uuid) -> StoreResult<()> {
        let mut order = self.order(id)?;
        if !order.status.accepts_items() {
            return Err(StoreError::OrderNotAcceptingItems {
                id,
                status: order.status,
            });
        }
        order.updated_at = OffsetDateTime::now_utc();
        self.stage_order(order);
        Ok(())
    }

    async fn set_order_status(&mut self, id: Uuid, status: OrderStatus) -> StoreResult<Order> {
        let mut order = self.order(id)?;
        order.status = status;
        order.updated_at = OffsetDateTime::now_utc();
        self.stage_order(order.clone());
        Ok(order)
    }

    async fn get_order_item(&mut self, order_id: Uuid, book_id: Uuid) -> StoreResult<OrderItem> {
        let order = self.order(order_id)?;
        order
            .item(book_id)
            .cloned()
            .ok_or(StoreError::BookNotAtOrder { order_id, book_id })
    }

    async fn upsert_order_item(
        &mut self,
        order_id: Uuid,
        mut item: OrderItem,
    ) -> StoreResult<OrderItem> {
        if item.book_units == 0 {
            return Err(StoreError::InvariantViolation(format!(
                "line for book {} on order {order_id} would hold zero units",
                item.book_id
            )));
        }

        let mut order = self.order(order_id)?;
        item.order_id = order_id;

        match order.items.iter_mut().find(|line| line.book_id == item.book_id) {
            Some(line) => {
                item.created_at = line.created_at;
                *line = item.clone();
            }
            None => order.items.push(item.clone()),
        }

        self.stage_order(order);
        Ok(item)
    }

    async fn delete_order_item(&mut self, order_id: Uuid, book_id: Uuid) -> StoreResult<()> {
        let mut order = self.order(order_id)?;
        let before = order.items.len();
        order.items.retain(|line| line.book_id != book_id);
        if order.items.len() != before {
            self.stage_order(order);
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut tx = self;
        let writes = std::mem::take(&mut tx.writes);
        let staged = writes.len();
        tx.finished = true;

        tx.backend.apply(writes)?;
        tracing::trace!(tx = tx.id, backend = B::NAME, records = staged, "transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let mut tx = self;
        let discarded = std::mem::take(&mut tx.writes).len();
        tx.finished = true;
        tracing::debug!(tx = tx.id, backend = B::NAME, discarded, "transaction rolled back");
        Ok(())
    }
}

impl<B: Backend> Drop for StagedTransaction<B> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                tx = self.id,
                backend = B::NAME,
                discarded = self.writes.len(),
                "transaction dropped without commit"
            );
        }
    }
}
