//! # Error Types
//!
//! Domain-specific error types for atlas-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  atlas-core errors (this file)                                         │
//! │  ├── MoneyError       - Currency arithmetic violations                 │
//! │  ├── ValidationError  - Sale/Voucher definition violations             │
//! │  └── VoucherRejection - Applicability outcomes (NOT errors)            │
//! │                                                                         │
//! │  atlas-pricing errors (separate crate)                                 │
//! │  ├── PricingError     - Pipeline input errors & invariant breaches     │
//! │  ├── LedgerError      - Usage reservation failures                     │
//! │  └── TaxError         - Tax plugin failures                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (currency codes, limits, etc.)
//! 3. Errors are enum variants, never String
//! 4. A `VoucherRejection` is a first-class result, not a failure: the
//!    pipeline returns it alongside a valid, sans-discount checkout

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::{Currency, Money};

// =============================================================================
// Money Error
// =============================================================================

/// Violations of the currency arithmetic contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Two amounts in different currencies met in one operation.
    ///
    /// Mixed-currency arithmetic is rejected outright; the engine never
    /// converts between currencies.
    #[error("currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },

    /// A non-discount construction would produce a negative amount.
    ///
    /// Discount paths clamp at zero instead of failing; everything else
    /// must stay non-negative.
    #[error("amount must not be negative: {amount}")]
    NegativeAmount { amount: Decimal },

    /// A net/gross pair was constructed with net above gross.
    #[error("net amount {net} exceeds gross amount {gross}")]
    NetAboveGross { net: Decimal, gross: Decimal },

    /// A taxed range was constructed with start above stop (on gross).
    #[error("range start {start} exceeds range stop {stop}")]
    RangeInverted { start: Decimal, stop: Decimal },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Sale/Voucher definition validation errors.
///
/// These occur when a discount definition coming from the catalog breaks
/// its own invariants, before any cart is priced against it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// A value that must be non-negative is negative.
    #[error("{field} must not be negative, got {value}")]
    MustBeNonNegative { field: &'static str, value: Decimal },

    /// A percentage value is outside [0, 100].
    #[error("{field} must be between 0 and 100, got {value}")]
    PercentOutOfRange { field: &'static str, value: Decimal },

    /// An end date precedes (or equals) its start date.
    #[error("end date must be after start date")]
    WindowInverted,

    /// A voucher was defined with more recorded uses than its limit.
    #[error("used count {used_count} exceeds usage limit {usage_limit}")]
    UsageAboveLimit { used_count: u32, usage_limit: u32 },
}

// =============================================================================
// Voucher Rejection
// =============================================================================

/// Why a voucher does not apply to a given cart.
///
/// ## Not An Error
/// Rejections are first-class results: the pricing pipeline still emits a
/// valid checkout without the discount and hands the rejection back so the
/// caller decides whether to surface it. The checks run in a fixed order,
/// so the same invalid cart always yields the same tag.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum VoucherRejection {
    /// The voucher's activity window has ended.
    #[error("this voucher has expired")]
    Expired,

    /// The voucher's activity window has not begun.
    #[error("this voucher is not active yet")]
    NotStarted,

    /// Usage limit reached, counting live reservations.
    #[error("this voucher has been used up")]
    ExhaustedUses,

    /// Customer already holds a reservation and the voucher is
    /// once-per-customer.
    #[error("this voucher was already used by this customer")]
    AlreadyUsed,

    /// Cart subtotal (after sales) is below the voucher's minimum spend.
    #[error("spend at least {min_spent} to use this voucher")]
    MinSpendNotMet { min_spent: Money },

    /// Cart holds fewer items than the voucher requires.
    #[error("add at least {min_quantity} items to use this voucher")]
    MinItemsNotMet { min_quantity: u32 },

    /// Shipping destination is outside the voucher's country list.
    #[error("this voucher is not valid in your country")]
    CountryNotCovered,

    /// No cart line falls inside a product-scoped voucher's scope.
    #[error("this offer is only valid for selected items")]
    NoMatchingProducts,

    /// The voucher's minimum spend is denominated in another currency.
    #[error("this voucher is not valid for the cart currency")]
    CurrencyMismatch,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with MoneyError.
pub type MoneyResult<T> = Result<T, MoneyError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_money_error_messages() {
        let err = MoneyError::CurrencyMismatch {
            expected: Currency::USD,
            found: Currency::EUR,
        };
        assert_eq!(err.to_string(), "currency mismatch: expected USD, found EUR");
    }

    #[test]
    fn test_rejection_messages_are_user_facing() {
        assert_eq!(
            VoucherRejection::ExhaustedUses.to_string(),
            "this voucher has been used up"
        );
        assert_eq!(
            VoucherRejection::MinItemsNotMet { min_quantity: 3 }.to_string(),
            "add at least 3 items to use this voucher"
        );
    }

    #[test]
    fn test_rejection_serializes_with_tag() {
        let json = serde_json::to_string(&VoucherRejection::NotStarted).unwrap();
        assert!(json.contains("not_started"));
    }
}
