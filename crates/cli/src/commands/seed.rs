//! Seed the database with catalog and engagement data.
//!
//! Reads the JSON seed files (products, discount codes, e-books,
//! testimonials) and writes them through the store. Running it twice is
//! safe: existing discount codes and testimonials are left alone.

use std::path::Path;

use tracing::info;

use joestar_api::seed::SeedData;

use super::{CommandError, connect_store};

/// Seed from the files in `dir`.
///
/// # Errors
///
/// Returns an error if the files cannot be parsed, the database is
/// unreachable or a write fails.
pub async fn run(dir: &Path) -> Result<(), CommandError> {
    info!(dir = %dir.display(), "Loading seed data");

    // Parse everything before connecting to the database
    let data = SeedData::load(dir).await?;
    info!(
        products = data.products.len(),
        discounts = data.discounts.len(),
        ebooks = data.ebooks.len(),
        testimonials = data.testimonials.len(),
        "Parsed seed files"
    );

    let store = connect_store().await?;
    let report = data.apply(&store).await?;

    info!(
        skipped_discounts = report.discounts_skipped,
        "Seeding complete!"
    );
    Ok(())
}
