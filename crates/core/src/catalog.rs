//! Product catalog types and filtering.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub purity: Option<String>,
    #[serde(default)]
    pub lab_tested: bool,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

const fn default_in_stock() -> bool {
    true
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    /// Most recently added first.
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl std::str::FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "price-low" => Ok(Self::PriceAsc),
            "price-high" => Ok(Self::PriceDesc),
            "name" => Ok(Self::Name),
            _ => Err(format!(
                "invalid sort: {s} (expected newest, price-low, price-high or name)"
            )),
        }
    }
}

impl ProductSort {
    /// Order two products by this sort, breaking ties by id.
    #[must_use]
    pub fn compare(self, a: &Product, b: &Product) -> std::cmp::Ordering {
        let primary = match self {
            Self::Newest => b.created_at.cmp(&a.created_at),
            Self::PriceAsc => a.price.cmp(&b.price),
            Self::PriceDesc => b.price.cmp(&a.price),
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Catalog listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Case-insensitive exact category match.
    pub category: Option<String>,
    /// Case-insensitive substring over name, description, category and tags.
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub sort: ProductSort,
}

impl ProductQuery {
    /// Whether `product` passes every filter in this query.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category.as_deref()
            && !product.category.eq_ignore_ascii_case(category)
        {
            return false;
        }

        if let Some(featured) = self.featured
            && product.featured != featured
        {
            return false;
        }

        if let Some(search) = self.search.as_deref() {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !product_contains(product, &needle) {
                return false;
            }
        }

        true
    }

    /// Filter and sort a set of products.
    #[must_use]
    pub fn apply<'a>(&self, products: impl IntoIterator<Item = &'a Product>) -> Vec<Product> {
        let mut matched: Vec<Product> = products
            .into_iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        matched.sort_by(|a, b| self.sort.compare(a, b));
        matched
    }
}

fn product_contains(product: &Product, needle: &str) -> bool {
    product.name.to_lowercase().contains(needle)
        || product.description.to_lowercase().contains(needle)
        || product.category.to_lowercase().contains(needle)
        || product
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn product(id: &str, name: &str, category: &str, price: i64, day: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_owned(),
            category: category.to_owned(),
            description: format!("{name} research peptide"),
            price: Decimal::from(price),
            original_price: None,
            dosage: None,
            purity: None,
            lab_tested: true,
            in_stock: true,
            featured: false,
            image: None,
            benefits: Vec::new(),
            usage: None,
            tags: vec!["recovery".to_owned()],
            created_at: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap(),
        }
    }

    fn catalog() -> Vec<Product> {
        let mut tb = product("tb-500", "TB-500", "recovery", 850_000, 3);
        tb.featured = true;
        let mut sema = product("semaglutide", "Semaglutide", "weight-loss", 1_200_000, 2);
        sema.tags = vec!["glp-1".to_owned()];
        vec![product("bpc-157", "BPC-157", "recovery", 650_000, 1), tb, sema]
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let products = catalog();
        let result = ProductQuery::default().apply(&products);
        assert_eq!(ids(&result), ["tb-500", "semaglutide", "bpc-157"]);
    }

    #[test]
    fn test_category_filter_case_insensitive() {
        let products = catalog();
        let query = ProductQuery {
            category: Some("Recovery".to_owned()),
            ..ProductQuery::default()
        };
        assert_eq!(ids(&query.apply(&products)), ["tb-500", "bpc-157"]);
    }

    #[test]
    fn test_search_covers_tags() {
        let products = catalog();
        let query = ProductQuery {
            search: Some("GLP".to_owned()),
            ..ProductQuery::default()
        };
        assert_eq!(ids(&query.apply(&products)), ["semaglutide"]);
    }

    #[test]
    fn test_featured_filter() {
        let products = catalog();
        let query = ProductQuery {
            featured: Some(true),
            ..ProductQuery::default()
        };
        assert_eq!(ids(&query.apply(&products)), ["tb-500"]);
    }

    #[test]
    fn test_price_sorts() {
        let products = catalog();
        let low = ProductQuery {
            sort: ProductSort::PriceAsc,
            ..ProductQuery::default()
        };
        assert_eq!(
            ids(&low.apply(&products)),
            ["bpc-157", "tb-500", "semaglutide"]
        );

        let high = ProductQuery {
            sort: ProductSort::PriceDesc,
            ..ProductQuery::default()
        };
        assert_eq!(
            ids(&high.apply(&products)),
            ["semaglutide", "tb-500", "bpc-157"]
        );
    }

    #[test]
    fn test_sort_from_str() {
        assert_eq!("price-low".parse::<ProductSort>().unwrap(), ProductSort::PriceAsc);
        assert_eq!("name".parse::<ProductSort>().unwrap(), ProductSort::Name);
        assert!("cheapest".parse::<ProductSort>().is_err());
    }
}
