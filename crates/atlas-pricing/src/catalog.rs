//! # Catalog Source & Clock
//!
//! External collaborator interfaces consumed by the engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Where Catalog Data Comes From                        │
//! │                                                                         │
//! │  Embedding application                                                  │
//! │  ├── SQL / ORM / cache — its own business                              │
//! │  └── implements CatalogSource returning immutable value objects        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  PricingEngine                                                          │
//! │  ├── list_active_sales(at) ──► SaleIndex (one per pricing pass)        │
//! │  ├── lookup_voucher(code)  ──► voucher evaluation                      │
//! │  └── variant(id)           ──► cart line construction                  │
//! │                                                                         │
//! │  The engine NEVER issues a query itself. Sales and vouchers are        │
//! │  read-mostly; each pass works on a fresh immutable snapshot.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use atlas_core::types::{ProductVariantRef, Sale, VariantId, Voucher, VoucherCode};

// =============================================================================
// Clock
// =============================================================================

/// Injected time source.
///
/// Every activity-window decision goes through this trait so tests can
/// freeze the clock and assert byte-identical pricing passes.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time. The production default.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a fixed instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// =============================================================================
// Catalog Source
// =============================================================================

/// Read access to sales, vouchers and variants.
///
/// Implementations must be cheap to call repeatedly (idempotent, cached
/// upstream) and must hand out already-validated definitions; see
/// `atlas_core::validation`.
pub trait CatalogSource: Send + Sync {
    /// All sales whose activity window covers `at`.
    fn list_active_sales(&self, at: DateTime<Utc>) -> Vec<Sale>;

    /// Looks up a voucher by normalized code.
    fn lookup_voucher(&self, code: &VoucherCode) -> Option<Voucher>;

    /// Resolves a variant reference by id.
    fn variant(&self, id: VariantId) -> Option<ProductVariantRef>;
}

// =============================================================================
// In-Memory Catalog
// =============================================================================

/// A `CatalogSource` backed by in-memory maps.
///
/// Serves tests and small deployments; production callers typically
/// implement `CatalogSource` over their own storage instead.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    sales: RwLock<Vec<Sale>>,
    vouchers: RwLock<HashMap<VoucherCode, Voucher>>,
    variants: RwLock<HashMap<VariantId, ProductVariantRef>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a sale.
    pub fn upsert_sale(&self, sale: Sale) {
        let mut sales = match self.sales.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = sales.iter_mut().find(|s| s.id == sale.id) {
            *existing = sale;
        } else {
            sales.push(sale);
        }
    }

    /// Removes a sale by id.
    pub fn remove_sale(&self, id: atlas_core::SaleId) {
        let mut sales = match self.sales.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sales.retain(|s| s.id != id);
    }

    /// Adds or replaces a voucher, keyed by its normalized code.
    pub fn upsert_voucher(&self, voucher: Voucher) {
        let mut vouchers = match self.vouchers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        vouchers.insert(voucher.code.clone(), voucher);
    }

    /// Adds or replaces a variant reference.
    pub fn upsert_variant(&self, variant: ProductVariantRef) {
        let mut variants = match self.variants.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        variants.insert(variant.id, variant);
    }
}

impl CatalogSource for InMemoryCatalog {
    fn list_active_sales(&self, at: DateTime<Utc>) -> Vec<Sale> {
        let sales = match self.sales.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sales.iter().filter(|s| s.is_active(at)).cloned().collect()
    }

    fn lookup_voucher(&self, code: &VoucherCode) -> Option<Voucher> {
        let vouchers = match self.vouchers.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        vouchers.get(code).cloned()
    }

    fn variant(&self, id: VariantId) -> Option<ProductVariantRef> {
        let variants = match self.variants.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        variants.get(&id).cloned()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
