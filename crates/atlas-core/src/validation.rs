//! # Validation Module
//!
//! Definition validation for Sales and Vouchers.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Catalog source (caller's persistence)                        │
//! │  ├── UNIQUE constraints on voucher codes                               │
//! │  └── NOT NULL / foreign keys                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE — definition invariants                          │
//! │  ├── percentage values inside [0, 100]                                 │
//! │  ├── activity windows ordered                                          │
//! │  └── used_count within usage_limit                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Pricing pass — applicability checks (per cart)               │
//! │                                                                         │
//! │  A broken definition is a catalog bug; it never reaches a cart.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use atlas_core::validation::validate_sale;
//! # let sale: atlas_core::types::Sale = unimplemented!();
//!
//! validate_sale(&sale).expect("catalog produced an invalid sale");
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::types::{DiscountValueType, Sale, Voucher};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn validate_discount_value(
    field: &'static str,
    value_type: DiscountValueType,
    value: Decimal,
) -> ValidationResult<()> {
    if value.is_sign_negative() {
        return Err(ValidationError::MustBeNonNegative { field, value });
    }
    if value_type == DiscountValueType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::PercentOutOfRange { field, value });
    }
    Ok(())
}

/// Validates a Sale definition.
///
/// ## Rules
/// - value ≥ 0; percentage value ≤ 100
/// - end date, when present, after the start date
pub fn validate_sale(sale: &Sale) -> ValidationResult<()> {
    validate_discount_value("value", sale.discount_type, sale.value)?;
    if let Some(end) = sale.end_date {
        if end <= sale.start_date {
            return Err(ValidationError::WindowInverted);
        }
    }
    Ok(())
}

/// Validates a Voucher definition.
///
/// ## Rules
/// - code non-empty after normalization
/// - discount value ≥ 0; percentage value ≤ 100
/// - end date, when present, after the start date
/// - `used_count ≤ usage_limit` when a limit is set
/// - `min_spent`, when set, non-negative (enforced by `Money` itself)
pub fn validate_voucher(voucher: &Voucher) -> ValidationResult<()> {
    if voucher.code.is_empty() {
        return Err(ValidationError::Required { field: "code" });
    }
    validate_discount_value(
        "discount_value",
        voucher.discount_value_type,
        voucher.discount_value,
    )?;
    if let Some(end) = voucher.end_date {
        if end <= voucher.start_date {
            return Err(ValidationError::WindowInverted);
        }
    }
    if let Some(limit) = voucher.usage_limit {
        if voucher.used_count > limit {
            return Err(ValidationError::UsageAboveLimit {
                used_count: voucher.used_count,
                usage_limit: limit,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
