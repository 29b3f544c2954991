use thiserror::Error;
use uuid::Uuid;

use crate::models::OrderStatus;

/// Errors surfaced by the entity store.
///
/// The first group describes the state of the data; everything after
/// `BookNotAtOrder` is an infrastructure failure of the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("book not found: {0}")]
    BookNotFound(Uuid),

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("order {id} is {status} and no longer accepts items")]
    OrderNotAcceptingItems { id: Uuid, status: OrderStatus },

    #[error("book {book_id} is not on order {order_id}")]
    BookNotAtOrder { order_id: Uuid, book_id: Uuid },

    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl StoreError {
    /// True for failures of the store itself rather than of the request.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(
            self,
            StoreError::BookNotFound(_)
                | StoreError::OrderNotFound(_)
                | StoreError::OrderNotAcceptingItems { .. }
                | StoreError::BookNotAtOrder { .. }
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
