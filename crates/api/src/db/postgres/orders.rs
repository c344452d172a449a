//! Orders and line items.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use joestar_core::order::{CustomerInfo, NewOrder, Order, OrderItem};
use joestar_core::{Email, OrderId, OrderItemId, OrderStatus, ProductId, UserId};

use super::PgStore;
use crate::db::{OrderStore, RepositoryError};

const ORDER_COLUMNS: &str = "id, user_id, status, customer_name, customer_email, customer_phone, \
     customer_address, subtotal, discount_code, discount_amount, total, affiliate_code, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    customer_name: String,
    customer_email: Email,
    customer_phone: Option<String>,
    customer_address: Option<String>,
    subtotal: Decimal,
    discount_code: Option<String>,
    discount_amount: Decimal,
    total: Decimal,
    affiliate_code: Option<String>,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            user_id: self.user_id,
            status: self.status,
            customer: CustomerInfo {
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
                address: self.customer_address,
            },
            items,
            subtotal: self.subtotal,
            discount_code: self.discount_code,
            discount_amount: self.discount_amount,
            total: self.total,
            affiliate_code: self.affiliate_code,
            created_at: self.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
    price: Decimal,
}

impl From<ItemRow> for OrderItem {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            price: row.price,
        }
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let row: OrderRow = sqlx::query_as(&format!(
            r"
            INSERT INTO shop.orders
                (user_id, customer_name, customer_email, customer_phone, customer_address,
                 subtotal, discount_code, discount_amount, total, affiliate_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(&order.customer.name)
        .bind(&order.customer.email)
        .bind(&order.customer.phone)
        .bind(&order.customer.address)
        .bind(order.totals.subtotal)
        .bind(&order.discount_code)
        .bind(order.totals.discount_amount)
        .bind(order.totals.total)
        .bind(&order.affiliate_code)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(order.lines.len());
        for line in order.lines {
            let item: ItemRow = sqlx::query_as(
                r"
                INSERT INTO shop.order_items (order_id, product_id, product_name, quantity, price)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, order_id, product_id, product_name, quantity, price
                ",
            )
            .bind(row.id)
            .bind(&line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderItem::from(item));
        }

        tx.commit().await?;

        Ok(row.into_order(items))
    }

    async fn list_orders(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM shop.orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();
        let item_rows: Vec<ItemRow> = sqlx::query_as(
            r"
            SELECT id, order_id, product_id, product_name, quantity, price
            FROM shop.order_items
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&order_ids)
        .fetch_all(self.pool())
        .await?;

        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in item_rows {
            items_by_order
                .entry(item.order_id)
                .or_default()
                .push(OrderItem::from(item));
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }
}
