use bookstore_db::{Order, OrderItem, OrderStatus};
use bookstore_http::error::AppError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::workflow::{OrderLine, UnitDelta};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrder {
    pub purchaser_id: String,
}

impl CreateOrder {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.purchaser_id.trim().is_empty() {
            return Err(AppError::validation(
                vec![json!({"field": "purchaser_id", "error": "required"})],
                "invalid order",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListOrdersParams {
    pub purchaser_id: Option<String>,
}

/// Body of `POST /api/orders/{id}/items`. Negative units return stock.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddItemRequest {
    pub book_id: Uuid,
    pub units_to_add: i32,
}

impl AddItemRequest {
    pub fn delta(&self) -> Result<UnitDelta, AppError> {
        UnitDelta::new(self.units_to_add).ok_or_else(|| {
            AppError::validation(
                vec![json!({"field": "units_to_add", "error": "must not be zero"})],
                "invalid order item",
            )
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// An order with its lines and the sum of their snapshotted prices.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub total_price: Decimal,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let total_price = order.total_price();
        Self { order, total_price }
    }
}

/// Result of an order-line mutation; `line` is null once the line is gone.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLineResponse {
    pub order_id: Uuid,
    pub book_id: Uuid,
    pub book_units: u32,
    pub line: Option<OrderItem>,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            order_id: line.order_id(),
            book_id: line.book_id(),
            book_units: line.book_units(),
            line: line.into_item(),
        }
    }
}
