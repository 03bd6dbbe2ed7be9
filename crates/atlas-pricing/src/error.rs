//! # Error Types
//!
//! Engine-level errors for atlas-pricing.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Input errors (surface to caller)     PricingError::UnknownVariant     │
//! │                                       PricingError::UnknownVoucherCode │
//! │                                       PricingError::Money (mismatch)   │
//! │                                                                         │
//! │  Applicability rejections             VoucherRejection (atlas-core) —  │
//! │  (NOT errors; first-class results)    returned beside a valid checkout │
//! │                                                                         │
//! │  Transient (retryable)                TaxError::Timeout — pipeline     │
//! │                                       degrades to identity tax + flag  │
//! │                                                                         │
//! │  Fatal (bug indicator)                PricingError::InvariantViolation │
//! │                                       — abort, never emit a malformed  │
//! │                                       PricedCheckout                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use atlas_core::{MoneyError, VariantId};

// =============================================================================
// Ledger Error
// =============================================================================

/// Usage ledger operation failures.
///
/// These are explicit protocol results, not bugs: concurrent order
/// placement is expected to hit `Exhausted` on popular vouchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The usage limit is fully taken by committed uses and live
    /// reservations.
    #[error("voucher usage limit exhausted")]
    Exhausted,

    /// No reservation exists for the given (voucher, order) pair.
    #[error("no reservation found for this voucher and order")]
    NotFound,
}

// =============================================================================
// Tax Error
// =============================================================================

/// Tax plugin failures.
///
/// The tax adapter degrades every failure to identity tax and flags the
/// pricing outcome; these errors never escape the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxError {
    /// The plugin did not answer within its bounded timeout.
    #[error("tax plugin timed out")]
    Timeout,

    /// The plugin answered with a failure of its own.
    #[error("tax plugin failed: {0}")]
    Plugin(String),
}

// =============================================================================
// Pricing Error
// =============================================================================

/// Errors a pricing or ledger call can surface to the caller.
#[derive(Debug, Error)]
pub enum PricingError {
    /// A cart line references a variant the catalog does not know.
    #[error("unknown variant: {0}")]
    UnknownVariant(VariantId),

    /// The attached voucher code matches no voucher.
    #[error("unknown voucher code: {0}")]
    UnknownVoucherCode(String),

    /// Currency arithmetic failed (mixed currencies, negative amount).
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Ledger reservation protocol result.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A pricing invariant broke mid-pass. This is a bug indicator; the
    /// pass is aborted rather than emitting a malformed checkout.
    #[error("pricing invariant violated: {0}")]
    InvariantViolation(&'static str),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with PricingError.
pub type PricingResult<T> = Result<T, PricingError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_messages() {
        assert_eq!(
            LedgerError::Exhausted.to_string(),
            "voucher usage limit exhausted"
        );
        assert_eq!(
            LedgerError::NotFound.to_string(),
            "no reservation found for this voucher and order"
        );
    }

    #[test]
    fn test_money_error_converts_to_pricing_error() {
        let err: PricingError = MoneyError::NegativeAmount {
            amount: rust_decimal::Decimal::from(-1),
        }
        .into();
        assert!(matches!(err, PricingError::Money(_)));
    }
}
