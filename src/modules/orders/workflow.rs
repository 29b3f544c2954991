//! Order-line mutations that keep book stock and order lines in balance.
//!
//! Every call runs in one store transaction: the order line and the book's
//! inventory move together or not at all.

use std::num::NonZeroI32;
use std::sync::Arc;
use std::time::Duration;

use bookstore_db::{EntityStore, OrderItem, StoreError, StoreTransaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::OrderError;

/// Signed, non-zero change in the units of a book held by an order.
/// Positive values take stock from the book, negative values return it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitDelta(NonZeroI32);

impl UnitDelta {
    /// `None` for zero.
    pub fn new(units: i32) -> Option<Self> {
        NonZeroI32::new(units).map(Self)
    }

    pub fn get(self) -> i32 {
        self.0.get()
    }
}

impl From<NonZeroI32> for UnitDelta {
    fn from(units: NonZeroI32) -> Self {
        Self(units)
    }
}

/// State of an order line after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLine {
    Present(OrderItem),
    /// The line dropped to zero units and was deleted.
    Removed { order_id: Uuid, book_id: Uuid },
}

impl OrderLine {
    pub fn order_id(&self) -> Uuid {
        match self {
            OrderLine::Present(item) => item.order_id,
            OrderLine::Removed { order_id, .. } => *order_id,
        }
    }

    pub fn book_id(&self) -> Uuid {
        match self {
            OrderLine::Present(item) => item.book_id,
            OrderLine::Removed { book_id, .. } => *book_id,
        }
    }

    /// Units now on the line; zero once removed.
    pub fn book_units(&self) -> u32 {
        match self {
            OrderLine::Present(item) => item.book_units,
            OrderLine::Removed { .. } => 0,
        }
    }

    pub fn into_item(self) -> Option<OrderItem> {
        match self {
            OrderLine::Present(item) => Some(item),
            OrderLine::Removed { .. } => None,
        }
    }
}

/// Applies unit deltas to order lines against an injected store.
#[derive(Clone)]
pub struct OrderWorkflow {
    store: Arc<dyn EntityStore>,
    deadline: Duration,
}

impl OrderWorkflow {
    /// `deadline` bounds each call from `begin` through `commit`.
    pub fn new(store: Arc<dyn EntityStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Add (positive delta) or remove (negative delta) units of `book_id`
    /// on `order_id`, moving the same number of units out of or back into
    /// the book's inventory.
    pub async fn apply_unit_delta(
        &self,
        order_id: Uuid,
        book_id: Uuid,
        delta: UnitDelta,
    ) -> Result<OrderLine, OrderError> {
        self.apply_unit_delta_within(order_id, book_id, delta, self.deadline)
            .await
    }

    /// Same as [`apply_unit_delta`](Self::apply_unit_delta) with an explicit
    /// deadline. When the deadline passes the open transaction is dropped,
    /// which discards its writes.
    pub async fn apply_unit_delta_within(
        &self,
        order_id: Uuid,
        book_id: Uuid,
        delta: UnitDelta,
        deadline: Duration,
    ) -> Result<OrderLine, OrderError> {
        match tokio::time::timeout(deadline, self.run(order_id, book_id, delta)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    %order_id,
                    %book_id,
                    delta = delta.get(),
                    deadline_ms = deadline.as_millis() as u64,
                    "order line update timed out"
                );
                Err(OrderError::DeadlineExceeded(deadline))
            }
        }
    }

    async fn run(
        &self,
        order_id: Uuid,
        book_id: Uuid,
        delta: UnitDelta,
    ) -> Result<OrderLine, OrderError> {
        let mut tx = self.store.begin().await?;

        match stage(&mut *tx, order_id, book_id, delta).await {
            Ok(line) => {
                tx.commit().await?;
                tracing::info!(
                    %order_id,
                    %book_id,
                    delta = delta.get(),
                    book_units = line.book_units(),
                    "order line updated"
                );
                Ok(line)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(
                        %order_id,
                        %book_id,
                        error = %rollback_err,
                        "rollback failed"
                    );
                }
                tracing::debug!(
                    %order_id,
                    %book_id,
                    delta = delta.get(),
                    error = %err,
                    "order line update rejected"
                );
                Err(err)
            }
        }
    }
}

/// Stage the line and stock changes inside `tx` without committing.
async fn stage(
    tx: &mut dyn StoreTransaction,
    order_id: Uuid,
    book_id: Uuid,
    delta: UnitDelta,
) -> Result<OrderLine, OrderError> {
    tx.touch_order(order_id).await?;

    let mut book = tx.get_book(book_id).await?;
    if book.archived {
        return Err(OrderError::BookIsArchived(book_id));
    }

    let existing = match tx.get_order_item(order_id, book_id).await {
        Ok(item) => Some(item),
        Err(StoreError::BookNotAtOrder { .. }) => None,
        Err(err) => return Err(err.into()),
    };

    let change = i64::from(delta.get());
    let current_units = existing.as_ref().map_or(0, |item| item.book_units);

    let new_units = i64::from(current_units) + change;
    if new_units < 0 {
        return Err(OrderError::BookNotAtOrder { order_id, book_id });
    }

    let new_inventory = i64::from(book.inventory) - change;
    if new_inventory < 0 {
        return Err(OrderError::InsufficientInventory {
            book_id,
            requested: delta.get().unsigned_abs(),
            available: book.inventory,
        });
    }

    let new_units = to_units(new_units, "order line units")?;
    let new_inventory = to_units(new_inventory, "book inventory")?;
    let now = OffsetDateTime::now_utc();

    let line = if new_units == 0 {
        tx.delete_order_item(order_id, book_id).await?;
        OrderLine::Removed { order_id, book_id }
    } else {
        let item = match existing {
            Some(mut item) => {
                item.book_units = new_units;
                item.updated_at = now;
                item
            }
            None => OrderItem {
                order_id,
                book_id,
                book_name: book.name.clone(),
                book_units: new_units,
                unit_price_at_order: book.price,
                created_at: now,
                updated_at: now,
            },
        };
        OrderLine::Present(tx.upsert_order_item(order_id, item).await?)
    };

    book.inventory = new_inventory;
    book.updated_at = now;
    tx.update_book(book).await?;

    Ok(line)
}

fn to_units(value: i64, what: &str) -> Result<u32, OrderError> {
    u32::try_from(value).map_err(|_| {
        OrderError::Store(StoreError::InvariantViolation(format!(
            "{what} out of range: {value}"
        )))
    })
}
