//! Orders and order totals.
//!
//! Totals are always computed here from the priced lines and the applied
//! discount, never accepted from a client, so a stored order satisfies
//! `total = sum(line subtotals) - discount` by construction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Email, OrderId, OrderItemId, OrderStatus, ProductId, UserId, round_currency};

/// A priced line ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderLine {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        round_currency(self.unit_price * Decimal::from(self.quantity))
    }
}

/// Subtotal, discount and total for a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Compute totals, clamping the discount to `[0, subtotal]`.
    #[must_use]
    pub fn compute(lines: &[OrderLine], discount: Decimal) -> Self {
        let subtotal: Decimal = lines.iter().map(OrderLine::subtotal).sum();
        let discount_amount = round_currency(discount.clamp(Decimal::ZERO, subtotal.max(Decimal::ZERO)));
        Self {
            subtotal,
            discount_amount,
            total: subtotal - discount_amount,
        }
    }
}

/// Contact and shipping details captured with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// An order ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub customer: CustomerInfo,
    pub lines: Vec<OrderLine>,
    pub discount_code: Option<String>,
    pub affiliate_code: Option<String>,
    pub totals: OrderTotals,
}

/// A stored line item. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

/// A stored order with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub discount_code: Option<String>,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub affiliate_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Whether the stored totals agree with the stored items.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let items_sum: Decimal = self
            .items
            .iter()
            .map(|item| round_currency(item.price * Decimal::from(item.quantity)))
            .sum();
        items_sum == self.subtotal && self.subtotal - self.discount_amount == self.total
    }
}
