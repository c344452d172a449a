//! Wishlist: an insertion-ordered set of product ids.

use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Errors from wishlist mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WishlistError {
    #[error("Product already in wishlist")]
    AlreadyPresent,
    #[error("Product not in wishlist")]
    NotPresent,
}

/// A user's wishlist. Order is insertion order; ids are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist(Vec<ProductId>);

impl Wishlist {
    /// Build a wishlist from stored ids, dropping duplicates.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = ProductId>) -> Self {
        let mut list = Self::default();
        for id in ids {
            let _ = list.add(id);
        }
        list
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.0.contains(id)
    }

    /// Append a product.
    ///
    /// # Errors
    ///
    /// Returns [`WishlistError::AlreadyPresent`] if the product is already listed.
    pub fn add(&mut self, id: ProductId) -> Result<(), WishlistError> {
        if self.contains(&id) {
            return Err(WishlistError::AlreadyPresent);
        }
        self.0.push(id);
        Ok(())
    }

    /// Remove a product.
    ///
    /// # Errors
    ///
    /// Returns [`WishlistError::NotPresent`] if the product is not listed.
    pub fn remove(&mut self, id: &ProductId) -> Result<(), WishlistError> {
        let pos = self
            .0
            .iter()
            .position(|existing| existing == id)
            .ok_or(WishlistError::NotPresent)?;
        self.0.remove(pos);
        Ok(())
    }

    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_ids(self) -> Vec<ProductId> {
        self.0
    }
}
