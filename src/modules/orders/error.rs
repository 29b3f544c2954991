use std::time::Duration;

use bookstore_db::{OrderStatus, StoreError};
use bookstore_http::error::AppError;
use thiserror::Error;
use uuid::Uuid;

/// Failure of an order-line mutation.
///
/// Every variant is reported after the transaction has been rolled back.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("book not found: {0}")]
    BookNotFound(Uuid),

    #[error("order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("order {order_id} is {status} and no longer accepts items")]
    OrderNotAcceptingItems { order_id: Uuid, status: OrderStatus },

    #[error("book {0} is archived")]
    BookIsArchived(Uuid),

    #[error("book {book_id} has {available} units available, {requested} requested")]
    InsufficientInventory {
        book_id: Uuid,
        requested: u32,
        available: u32,
    },

    #[error("cannot remove more units of book {book_id} than order {order_id} holds")]
    BookNotAtOrder { order_id: Uuid, book_id: Uuid },

    #[error("order transaction exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("store failure: {0}")]
    Store(#[source] StoreError),
}

/// Coarse classification used by callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request conflicts with the current state of the data.
    Client,
    NotFound,
    Timeout,
    Infrastructure,
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::BookNotFound(_) | OrderError::OrderNotFound(_) => ErrorKind::NotFound,
            OrderError::OrderNotAcceptingItems { .. }
            | OrderError::BookIsArchived(_)
            | OrderError::InsufficientInventory { .. }
            | OrderError::BookNotAtOrder { .. } => ErrorKind::Client,
            OrderError::DeadlineExceeded(_) => ErrorKind::Timeout,
            OrderError::Store(_) => ErrorKind::Infrastructure,
        }
    }

    /// Whether repeating the same call could succeed without any other
    /// change to the data.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Timeout | ErrorKind::Infrastructure
        )
    }

    /// Stable machine-readable code reported to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::BookNotFound(_) => "book_not_found",
            OrderError::OrderNotFound(_) => "order_not_found",
            OrderError::OrderNotAcceptingItems { .. } => "order_not_accepting_items",
            OrderError::BookIsArchived(_) => "book_is_archived",
            OrderError::InsufficientInventory { .. } => "insufficient_inventory",
            OrderError::BookNotAtOrder { .. } => "book_not_at_order",
            OrderError::DeadlineExceeded(_) => "deadline_exceeded",
            OrderError::Store(_) => "internal_error",
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BookNotFound(id) => OrderError::BookNotFound(id),
            StoreError::OrderNotFound(id) => OrderError::OrderNotFound(id),
            StoreError::OrderNotAcceptingItems { id, status } => {
                OrderError::OrderNotAcceptingItems {
                    order_id: id,
                    status,
                }
            }
            StoreError::BookNotAtOrder { order_id, book_id } => {
                OrderError::BookNotAtOrder { order_id, book_id }
            }
            other => OrderError::Store(other),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let code = err.code();
        match err.kind() {
            ErrorKind::NotFound => AppError::not_found(err.to_string()).with_code(code),
            ErrorKind::Client => AppError::bad_request(err.to_string()).with_code(code),
            ErrorKind::Timeout => AppError::gateway_timeout(err.to_string()),
            ErrorKind::Infrastructure => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}
