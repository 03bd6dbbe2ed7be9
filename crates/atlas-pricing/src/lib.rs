//! # atlas-pricing: The Pricing, Discount & Voucher Engine
//!
//! Everything between "a cart of variants" and "a priced checkout the
//! customer can pay": sale resolution, voucher eligibility, tax
//! adaptation, discount composition and usage accounting.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Atlas Pricing Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Embedding application (storefront / API / jobs)        │   │
//! │  └───────┬──────────────────────────────────────────────▲──────────┘   │
//! │          │ CartSnapshot                    PricingOutcome              │
//! │  ┌───────▼──────────────────────────────────────────────┴──────────┐   │
//! │  │              ★ atlas-pricing (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   engine ──► pipeline ──► sales     (index + min-wins resolve) │   │
//! │  │                 │    ├──► voucher   (ordered eligibility)      │   │
//! │  │                 │    ├──► tax       (degrade-and-flag adapter) │   │
//! │  │                 │    └──► compose   (clamp + total equation)   │   │
//! │  │                 │                                               │   │
//! │  │   ledger (reserve / commit / release — the only mutable state) │   │
//! │  │   catalog (CatalogSource + Clock seams, in-memory impl)        │   │
//! │  └───────┬─────────────────────────────────────────────────────────┘   │
//! │          │                                                              │
//! │  ┌───────▼─────────────────────────────────────────────────────────┐   │
//! │  │   atlas-core: Money • TaxedMoney • Sale • Voucher • rejections │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use atlas_core::types::CartSnapshot;
//! use atlas_pricing::catalog::InMemoryCatalog;
//! use atlas_pricing::engine::PricingEngine;
//!
//! let catalog = Arc::new(InMemoryCatalog::new());
//! let engine = PricingEngine::new(catalog);
//!
//! let cart = CartSnapshot::default();
//! let outcome = engine.price_checkout(&cart).unwrap();
//! assert!(outcome.checkout.total.gross().is_zero());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod compose;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod sales;
pub mod tax;
pub mod voucher;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{CatalogSource, Clock, FixedClock, InMemoryCatalog, SystemClock};
pub use engine::PricingEngine;
pub use error::{LedgerError, PricingError, PricingResult, TaxError};
pub use ledger::{NoUsage, UsageLedger, UsageTotals, UsageView};
pub use pipeline::{EngineConfig, PricingOutcome};
pub use sales::{resolve_unit, resolve_unit_price, ResolvedUnit, SaleIndex};
pub use tax::{FlatRateTax, IdentityTax, TaxAdapter, TaxPlugin};
pub use voucher::{evaluate, Discount, EvaluationContext};
