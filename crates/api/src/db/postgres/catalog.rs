//! Products and discount codes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use joestar_core::catalog::{Product, ProductQuery, ProductSort};
use joestar_core::discount::DiscountCode;
use joestar_core::{DiscountId, DiscountKind, ProductId};

use super::{PgStore, conflict_on_unique, escape_like};
use crate::db::{CatalogStore, DiscountStore, RepositoryError};

const PRODUCT_COLUMNS: &str = "id, name, category, description, price, original_price, dosage, \
     purity, lab_tested, in_stock, featured, image, benefits, usage, tags, created_at";

const DISCOUNT_COLUMNS: &str =
    "id, code, discount, kind, max_uses, used_count, valid_until, active, description";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    category: String,
    description: String,
    price: Decimal,
    original_price: Option<Decimal>,
    dosage: Option<String>,
    purity: Option<String>,
    lab_tested: bool,
    in_stock: bool,
    featured: bool,
    image: Option<String>,
    benefits: Vec<String>,
    usage: Option<String>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category: row.category,
            description: row.description,
            price: row.price,
            original_price: row.original_price,
            dosage: row.dosage,
            purity: row.purity,
            lab_tested: row.lab_tested,
            in_stock: row.in_stock,
            featured: row.featured,
            image: row.image,
            benefits: row.benefits,
            usage: row.usage,
            tags: row.tags,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DiscountRow {
    id: DiscountId,
    code: String,
    discount: Decimal,
    kind: DiscountKind,
    max_uses: i32,
    used_count: i32,
    valid_until: Option<DateTime<Utc>>,
    active: bool,
    description: Option<String>,
}

impl From<DiscountRow> for DiscountCode {
    fn from(row: DiscountRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            discount: row.discount,
            kind: row.kind,
            max_uses: row.max_uses,
            used_count: row.used_count,
            valid_until: row.valid_until,
            active: row.active,
            description: row.description,
        }
    }
}

/// `ORDER BY` clause for a sort. Ties break on id like the in-memory sort.
const fn order_clause(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Newest => "created_at DESC, id",
        ProductSort::PriceAsc => "price ASC, id",
        ProductSort::PriceDesc => "price DESC, id",
        ProductSort::Name => "LOWER(name), id",
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM shop.products
            WHERE ($1::text IS NULL OR LOWER(category) = LOWER($1))
              AND ($2::boolean IS NULL OR featured = $2)
              AND ($3::text IS NULL
                   OR name ILIKE $3
                   OR description ILIKE $3
                   OR category ILIKE $3
                   OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE $3))
            ORDER BY {}
            ",
            order_clause(query.sort)
        ))
        .bind(query.category.as_deref())
        .bind(query.featured)
        .bind(pattern)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Product::from))
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<&str> = ids.iter().map(ProductId::as_str).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM shop.products WHERE id = ANY($1)"
        ))
        .bind(&keys)
        .fetch_all(self.pool())
        .await?;

        let mut found: Vec<Product> = rows.into_iter().map(Product::from).collect();
        let mut ordered = Vec::with_capacity(found.len());
        for id in ids {
            if let Some(pos) = found.iter().position(|p| &p.id == id) {
                ordered.push(found.swap_remove(pos));
            }
        }
        Ok(ordered)
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.products
                (id, name, category, description, price, original_price, dosage, purity,
                 lab_tested, in_stock, featured, image, benefits, usage, tags, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                category = EXCLUDED.category,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                original_price = EXCLUDED.original_price,
                dosage = EXCLUDED.dosage,
                purity = EXCLUDED.purity,
                lab_tested = EXCLUDED.lab_tested,
                in_stock = EXCLUDED.in_stock,
                featured = EXCLUDED.featured,
                image = EXCLUDED.image,
                benefits = EXCLUDED.benefits,
                usage = EXCLUDED.usage,
                tags = EXCLUDED.tags
            ",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.original_price)
        .bind(&product.dosage)
        .bind(&product.purity)
        .bind(product.lab_tested)
        .bind(product.in_stock)
        .bind(product.featured)
        .bind(&product.image)
        .bind(&product.benefits)
        .bind(&product.usage)
        .bind(&product.tags)
        .bind(product.created_at)
        .execute(self.pool())
        .await?;

        Ok(())
    }
}

#[async_trait]
impl DiscountStore for PgStore {
    async fn find_discount(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
        let row: Option<DiscountRow> = sqlx::query_as(&format!(
            r"
            SELECT {DISCOUNT_COLUMNS}
            FROM shop.discount_codes
            WHERE LOWER(code) = LOWER($1) AND active
            "
        ))
        .bind(code.trim())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(DiscountCode::from))
    }

    async fn record_discount_use(
        &self,
        id: &DiscountId,
        now: DateTime<Utc>,
    ) -> Result<Option<DiscountCode>, RepositoryError> {
        // Check and increment in one statement; the row lock taken by UPDATE
        // keeps concurrent redemptions from overshooting max_uses.
        let row: Option<DiscountRow> = sqlx::query_as(&format!(
            r"
            UPDATE shop.discount_codes
            SET used_count = used_count + 1
            WHERE id = $1
              AND active
              AND used_count < max_uses
              AND (valid_until IS NULL OR valid_until >= $2)
            RETURNING {DISCOUNT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(DiscountCode::from))
    }

    async fn insert_discount(&self, discount: &DiscountCode) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.discount_codes
                (id, code, discount, kind, max_uses, used_count, valid_until, active, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(&discount.id)
        .bind(&discount.code)
        .bind(discount.discount)
        .bind(discount.kind)
        .bind(discount.max_uses)
        .bind(discount.used_count)
        .bind(discount.valid_until)
        .bind(discount.active)
        .bind(&discount.description)
        .execute(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "discount code already exists"))?;

        Ok(())
    }
}
