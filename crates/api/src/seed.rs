//! Seed data for the catalog and engagement tables.
//!
//! Seed files live in one directory (`JOESTAR_SEED_DIR`):
//!
//! - `products.json` - `[Product]`
//! - `discount-codes.json` - `[DiscountCode]`
//! - `ebooks.json` - `[Ebook]`
//! - `testimonials.json` - `[NewTestimonial]`
//!
//! A missing file counts as an empty list. Applying seed data is
//! idempotent: products and e-books are upserted, existing discount codes
//! are left alone and testimonials are only inserted into an empty table.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use joestar_core::catalog::Product;
use joestar_core::discount::DiscountCode;

use crate::db::{RepositoryError, Store};
use crate::models::{Ebook, NewTestimonial};

const PRODUCTS_FILE: &str = "products.json";
const DISCOUNTS_FILE: &str = "discount-codes.json";
const EBOOKS_FILE: &str = "ebooks.json";
const TESTIMONIALS_FILE: &str = "testimonials.json";

/// Errors while loading or applying seed data.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Parsed seed files.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub products: Vec<Product>,
    pub discounts: Vec<DiscountCode>,
    pub ebooks: Vec<Ebook>,
    pub testimonials: Vec<NewTestimonial>,
}

/// What `SeedData::apply` wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub products: usize,
    pub discounts_inserted: usize,
    pub discounts_skipped: usize,
    pub ebooks: usize,
    pub testimonials: usize,
}

impl SeedData {
    /// Read every seed file in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Io` if a present file cannot be read and
    /// `SeedError::Parse` if its JSON does not match the expected shape.
    pub async fn load(dir: &Path) -> Result<Self, SeedError> {
        Ok(Self {
            products: read_list(&dir.join(PRODUCTS_FILE)).await?,
            discounts: read_list(&dir.join(DISCOUNTS_FILE)).await?,
            ebooks: read_list(&dir.join(EBOOKS_FILE)).await?,
            testimonials: read_list(&dir.join(TESTIMONIALS_FILE)).await?,
        })
    }

    /// Write the seed data into a store.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Repository` on the first store failure other than
    /// a duplicate discount code.
    pub async fn apply(&self, store: &dyn Store) -> Result<SeedReport, SeedError> {
        let mut report = SeedReport::default();

        for product in &self.products {
            store.upsert_product(product).await?;
            report.products += 1;
        }

        for discount in &self.discounts {
            match store.insert_discount(discount).await {
                Ok(()) => report.discounts_inserted += 1,
                Err(RepositoryError::Conflict(_)) => {
                    tracing::debug!(code = %discount.code, "Discount code already present");
                    report.discounts_skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        for ebook in &self.ebooks {
            store.upsert_ebook(ebook).await?;
            report.ebooks += 1;
        }

        if store.count_testimonials().await? == 0 {
            for testimonial in &self.testimonials {
                store.create_testimonial(testimonial.clone()).await?;
                report.testimonials += 1;
            }
        }

        tracing::info!(
            products = report.products,
            discounts_inserted = report.discounts_inserted,
            discounts_skipped = report.discounts_skipped,
            ebooks = report.ebooks,
            testimonials = report.testimonials,
            "Seed data applied"
        );

        Ok(report)
    }
}

async fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SeedError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Seed file not found, skipping");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(SeedError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
