//! # Sale Applicability Index & Catalog Price Resolver
//!
//! Built once per pricing pass from the sales active at that instant.
//!
//! ## Why An Index?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Sale Lookup Per Variant                                │
//! │                                                                         │
//! │  Naive: for each variant, scan every sale's scope     O(lines × sales) │
//! │                                                                         │
//! │  Index: one pass over active sales builds                              │
//! │    product_id    ──► [sale, ...]                                        │
//! │    category_id   ──► [sale, ...]                                        │
//! │    collection_id ──► [sale, ...]                                        │
//! │  then each variant unions three O(1) lookups          O(sales+matches) │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Best-For-Customer Rule
//! Sales never stack on one unit: every applicable sale is priced
//! independently and the **minimum** wins, ties broken by lowest sale
//! id so repeated passes agree.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

use atlas_core::money::Money;
use atlas_core::types::{CategoryId, CollectionId, ProductId, ProductVariantRef, Sale};

// =============================================================================
// Sale Index
// =============================================================================

/// Per-pass lookup structure over active sales.
#[derive(Debug)]
pub struct SaleIndex {
    /// Active sales, ordered by id (the tie-break order).
    sales: Vec<Sale>,
    by_product: HashMap<ProductId, Vec<usize>>,
    by_category: HashMap<CategoryId, Vec<usize>>,
    by_collection: HashMap<CollectionId, Vec<usize>>,
}

impl SaleIndex {
    /// Builds the index from the sales active at `at`.
    ///
    /// Inactive sales are dropped here so the rest of the pass never
    /// has to re-check activity windows.
    pub fn build(sales: Vec<Sale>, at: DateTime<Utc>) -> Self {
        let mut active: Vec<Sale> = sales.into_iter().filter(|s| s.is_active(at)).collect();
        active.sort_by_key(|s| s.id);

        let mut by_product: HashMap<ProductId, Vec<usize>> = HashMap::new();
        let mut by_category: HashMap<CategoryId, Vec<usize>> = HashMap::new();
        let mut by_collection: HashMap<CollectionId, Vec<usize>> = HashMap::new();

        for (idx, sale) in active.iter().enumerate() {
            for product in &sale.scope.product_ids {
                by_product.entry(*product).or_default().push(idx);
            }
            for category in &sale.scope.category_ids {
                by_category.entry(*category).or_default().push(idx);
            }
            for collection in &sale.scope.collection_ids {
                by_collection.entry(*collection).or_default().push(idx);
            }
        }

        debug!(active = active.len(), "built sale index");
        SaleIndex {
            sales: active,
            by_product,
            by_category,
            by_collection,
        }
    }

    /// Number of active sales in the index.
    pub fn len(&self) -> usize {
        self.sales.len()
    }

    /// True when no sale is active.
    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }

    /// All sales touching `variant`, deduplicated, in id order.
    pub fn sales_for(&self, variant: &ProductVariantRef) -> Vec<&Sale> {
        let mut hits: BTreeSet<usize> = BTreeSet::new();

        if let Some(indices) = self.by_product.get(&variant.product_id) {
            hits.extend(indices);
        }
        for category in &variant.category_ids {
            if let Some(indices) = self.by_category.get(category) {
                hits.extend(indices);
            }
        }
        for collection in &variant.collection_ids {
            if let Some(indices) = self.by_collection.get(collection) {
                hits.extend(indices);
            }
        }

        hits.into_iter().filter_map(|i| self.sales.get(i)).collect()
    }
}

// =============================================================================
// Catalog Price Resolver
// =============================================================================

/// A resolved unit price plus the sale that produced it, if any.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedUnit<'a> {
    /// Post-sale unit price.
    pub price: Money,
    /// The winning sale; `None` when no sale improved on the base price.
    pub winning_sale: Option<&'a Sale>,
}

/// Resolves the discounted unit price for one variant.
///
/// Starts from the frozen base price and applies every applicable sale
/// independently, keeping the minimum result. Never goes below zero
/// (the sale math itself clamps).
pub fn resolve_unit<'a>(
    variant: &ProductVariantRef,
    base_price: Money,
    index: &'a SaleIndex,
) -> ResolvedUnit<'a> {
    let mut best = ResolvedUnit {
        price: base_price,
        winning_sale: None,
    };
    for sale in index.sales_for(variant) {
        let candidate = sale.apply_to(&base_price);
        // Strict comparison: on a tie the earlier (lowest-id) sale
        // already holds the price, and id order is iteration order.
        if candidate.amount() < best.price.amount() {
            best = ResolvedUnit {
                price: candidate,
                winning_sale: Some(sale),
            };
        }
    }
    best
}

/// [`resolve_unit`] when only the price matters.
pub fn resolve_unit_price(
    variant: &ProductVariantRef,
    base_price: Money,
    index: &SaleIndex,
) -> Money {
    resolve_unit(variant, base_price, index).price
}

// =============================================================================
// Unit Tests
// =============================================================================
