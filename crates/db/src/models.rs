//! Records owned by the entity store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A catalog entry together with its available stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    /// Units available for new order lines.
    pub inventory: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub archived: bool,
}

impl Book {
    /// Build a fresh, unarchived book with a time-ordered identifier.
    pub fn new(name: impl Into<String>, price: Decimal, inventory: u32) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            price,
            inventory,
            created_at: now,
            updated_at: now,
            archived: false,
        }
    }
}

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    AcceptingItems,
    Submitted,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    /// Whether lines on an order in this status may change.
    pub fn accepts_items(self) -> bool {
        matches!(self, OrderStatus::AcceptingItems)
    }

    /// Allowed forward moves of the order lifecycle.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (AcceptingItems, Submitted)
                | (AcceptingItems, Cancelled)
                | (Submitted, Fulfilled)
                | (Submitted, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::AcceptingItems => "accepting_items",
            OrderStatus::Submitted => "submitted",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One book's quantity and snapshotted price within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: Uuid,
    pub book_id: Uuid,
    pub book_name: String,
    /// Always greater than zero while the line exists.
    pub book_units: u32,
    pub unit_price_at_order: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price_at_order * Decimal::from(self.book_units)
    }
}

/// An order and its lines, kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub purchaser_id: String,
    pub status: OrderStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Open a new order in `accepting_items`.
    pub fn new(purchaser_id: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::now_v7(),
            purchaser_id: purchaser_id.into(),
            status: OrderStatus::AcceptingItems,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        }
    }

    /// Sum of `unit_price_at_order × book_units` over every line.
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    pub fn item(&self, book_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.book_id == book_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(order: &Order, units: u32, price: Decimal) -> OrderItem {
        let now = OffsetDateTime::now_utc();
        OrderItem {
            order_id: order.id,
            book_id: Uuid::now_v7(),
            book_name: "Dune".to_string(),
            book_units: units,
            unit_price_at_order: price,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn total_price_sums_snapshotted_lines() {
        let mut order = Order::new("reader-1");
        let first = line(&order, 2, Decimal::new(1050, 2));
        let second = line(&order, 1, Decimal::new(499, 2));
        order.items.push(first);
        order.items.push(second);

        assert_eq!(order.total_price(), Decimal::new(2599, 2));
    }

    #[test]
    fn empty_order_totals_zero() {
        assert_eq!(Order::new("reader-1").total_price(), Decimal::ZERO);
    }

    #[test]
    fn status_transitions_only_move_forward() {
        assert!(OrderStatus::AcceptingItems.can_transition_to(OrderStatus::Submitted));
        assert!(OrderStatus::Submitted.can_transition_to(OrderStatus::Fulfilled));
        assert!(!OrderStatus::Fulfilled.can_transition_to(OrderStatus::AcceptingItems));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Submitted));
        assert!(!OrderStatus::AcceptingItems.can_transition_to(OrderStatus::Fulfilled));
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&OrderStatus::AcceptingItems).unwrap();
        assert_eq!(json, "\"accepting_items\"");
        assert!(OrderStatus::AcceptingItems.accepts_items());
        assert!(!OrderStatus::Submitted.accepts_items());
    }
}
