//! # atlas-core: Pure Value Types for the Atlas Pricing Engine
//!
//! This crate is the **vocabulary** of the pricing engine. It contains
//! money arithmetic, catalog and voucher value types, and definition
//! validation, all as pure code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Atlas Pricing Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Embedding application (storefront / API / jobs)        │   │
//! │  │    cart recalculation ─► checkout ─► order placement ─► refund │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    atlas-pricing (the Engine)                   │   │
//! │  │    sale index • voucher evaluator • pipeline • usage ledger    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ atlas-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │   types   │  │   error   │  │ validation│  │   │
//! │  │   │   Money   │  │  Voucher  │  │ rejection │  │   rules   │  │   │
//! │  │   │TaxedMoney │  │   Sale    │  │   tags    │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure Values**: everything here is an immutable value object
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Decimal Money**: amounts are `decimal(12,4)`; floats never touch money
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use atlas_core::money::{Currency, Money, TaxedMoney};
//! use rust_decimal::Decimal;
//!
//! let unit = Money::from_major(10, Currency::USD);
//! let taxed = TaxedMoney::from_net(unit);
//! let line = taxed.mul_quantity(2);
//! assert_eq!(line.gross(), Money::from_major(20, Currency::USD));
//!
//! // 10% off, rounded half-up at 4 places:
//! let discounted = line.apply_percentage_discount(Decimal::from(10));
//! assert_eq!(discounted.gross(), Money::from_major(18, Currency::USD));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use atlas_core::Money` instead of
// `use atlas_core::money::Money`

pub use error::{MoneyError, MoneyResult, ValidationError, VoucherRejection};
pub use money::{Currency, Money, TaxedMoney, TaxedMoneyRange, MONEY_SCALE};
pub use types::*;
