//! Order placement.
//!
//! Prices come from the catalog and totals are computed server-side. The
//! order of operations matters:
//!
//! 1. Validate input and price every line from the catalog
//! 2. Resolve the affiliate code (nothing has been written yet)
//! 3. Consume one use of the discount code
//! 4. Store the order
//! 5. Credit the affiliate with the order total

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use joestar_core::affiliate::AffiliateProfile;
use joestar_core::catalog::Product;
use joestar_core::order::{CustomerInfo, NewOrder, Order, OrderLine, OrderTotals};
use joestar_core::{Email, ProductId, UserId};

use crate::db::{CreditedReferral, Store};
use crate::error::AppError;
use crate::services::discounts::DiscountService;

/// Most recent orders returned by the order history.
pub const ORDER_HISTORY_LIMIT: i64 = 10;

/// Customer details as submitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// One requested line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Order request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub customer: CustomerInput,
    #[serde(default)]
    pub items: Vec<OrderItemInput>,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub affiliate_code: Option<String>,
}

/// A stored order and the referral it produced, if any.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub referral: Option<CreditedReferral>,
}

/// Order service.
pub struct OrderService<'a> {
    store: &'a dyn Store,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Place an order for `user_id`.
    ///
    /// A failure to credit the affiliate after the order is stored is
    /// reported to Sentry but does not fail the request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for malformed input or out-of-stock
    /// products, `AppError::NotFound` for unknown products or affiliate codes
    /// and `AppError::Discount` when the discount code is rejected.
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: OrderRequest,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, AppError> {
        let customer = validate_customer(request.customer)?;
        let lines = self.price_lines(&request.items).await?;

        let affiliate_code = non_blank(request.affiliate_code);
        if let Some(code) = affiliate_code.as_deref() {
            self.resolve_affiliate(code, user_id).await?;
        }

        let subtotal = OrderTotals::compute(&lines, Decimal::ZERO).subtotal;
        let discount_code = non_blank(request.discount_code);
        let (discount_code, discount) = match discount_code {
            Some(code) => {
                let applied = DiscountService::new(self.store)
                    .apply(&code, subtotal, now)
                    .await?;
                (Some(applied.code.code), applied.quote.discount_amount)
            }
            None => (None, Decimal::ZERO),
        };

        let totals = OrderTotals::compute(&lines, discount);
        let order = self
            .store
            .create_order(NewOrder {
                user_id,
                customer,
                lines,
                discount_code,
                affiliate_code: affiliate_code.clone(),
                totals,
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            total = %order.total,
            items = order.items.len(),
            "Order placed"
        );

        let referral = match affiliate_code {
            Some(code) if order.total > Decimal::ZERO => {
                self.credit_affiliate(&code, &order, now).await
            }
            _ => None,
        };

        Ok(PlacedOrder { order, referral })
    }

    /// The user's most recent orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn history(&self, user_id: UserId) -> Result<Vec<Order>, AppError> {
        Ok(self
            .store
            .list_orders(user_id, ORDER_HISTORY_LIMIT)
            .await?)
    }

    async fn price_lines(&self, items: &[OrderItemInput]) -> Result<Vec<OrderLine>, AppError> {
        if items.is_empty() {
            return Err(AppError::Validation(
                "Order must contain at least one item".to_string(),
            ));
        }
        if items.iter().any(|item| item.quantity < 1) {
            return Err(AppError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let ids: Vec<ProductId> = items.iter().map(|item| item.product_id.clone()).collect();
        let products: HashMap<ProductId, Product> = self
            .store
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        items
            .iter()
            .map(|item| {
                let product = products.get(&item.product_id).ok_or_else(|| {
                    AppError::NotFound(format!("Product not found: {}", item.product_id))
                })?;
                if !product.in_stock {
                    return Err(AppError::Validation(format!(
                        "{} is out of stock",
                        product.name
                    )));
                }
                Ok(OrderLine {
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    quantity: item.quantity,
                    unit_price: product.price,
                })
            })
            .collect()
    }

    async fn resolve_affiliate(
        &self,
        code: &str,
        user_id: UserId,
    ) -> Result<AffiliateProfile, AppError> {
        let affiliate = self
            .store
            .find_affiliate_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound("Invalid affiliate code".to_string()))?;
        if affiliate.user_id == user_id {
            return Err(AppError::Validation(
                "You cannot use your own affiliate code".to_string(),
            ));
        }
        Ok(affiliate)
    }

    async fn credit_affiliate(
        &self,
        code: &str,
        order: &Order,
        now: DateTime<Utc>,
    ) -> Option<CreditedReferral> {
        match self
            .store
            .credit_referral(code, order.total, Some(order.user_id), now)
            .await
        {
            Ok(credited) => {
                tracing::info!(
                    order_id = %order.id,
                    affiliate_id = %credited.profile.user_id,
                    commission = %credited.credit.commission,
                    "Affiliate credited for order"
                );
                Some(credited)
            }
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(
                    order_id = %order.id,
                    error = %e,
                    sentry_event_id = %event_id,
                    "Failed to credit affiliate for stored order"
                );
                None
            }
        }
    }
}

fn validate_customer(input: CustomerInput) -> Result<CustomerInfo, AppError> {
    let name = input.name.trim();
    if name.is_empty() || input.email.trim().is_empty() {
        return Err(AppError::Validation(
            "Customer name and email are required".to_string(),
        ));
    }
    let email = Email::parse(&input.email)
        .map_err(|_| AppError::Validation("Invalid email address".to_string()))?;

    Ok(CustomerInfo {
        name: name.to_string(),
        email,
        phone: non_blank(input.phone),
        address: non_blank(input.address),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
