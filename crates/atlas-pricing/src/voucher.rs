//! # Voucher Applicability Evaluator
//!
//! Decides whether a voucher applies to a priced cart, and for how much.
//!
//! ## Check Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Eligibility Checks (fixed order, first hit wins)           │
//! │                                                                         │
//! │  1. activity window      ──► NotStarted / Expired                      │
//! │  2. usage headroom       ──► ExhaustedUses  (counts live reservations) │
//! │  3. once per customer    ──► AlreadyUsed                               │
//! │  4. minimum spend        ──► CurrencyMismatch / MinSpendNotMet         │
//! │  5. minimum item count   ──► MinItemsNotMet                            │
//! │  6. country restriction  ──► CountryNotCovered   (SHIPPING only)       │
//! │  7. product scope        ──► NoMatchingProducts  (SPECIFIC_PRODUCT)    │
//! │                                                                         │
//! │  The order is part of the contract: the same invalid cart always       │
//! │  reports the same rejection, so storefront messaging is stable.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A rejection is a result, not an error: the pipeline prices the cart
//! without the discount and returns the rejection beside it.
//!
//! ## Discount Buckets
//! ENTIRE_ORDER and SPECIFIC_PRODUCT discounts come out of the subtotal;
//! SHIPPING discounts come out of the shipping price. The bucket travels
//! with the amount so composition attributes it to the right total.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use atlas_core::error::VoucherRejection;
use atlas_core::money::{Money, TaxedMoney};
use atlas_core::types::{
    CartSnapshot, CountryCode, DiscountBucket, DiscountValueType, PricedLine, Voucher, VoucherType,
};

use crate::ledger::UsageView;

// =============================================================================
// Evaluation Context
// =============================================================================

/// Everything the evaluator reads about the cart being priced.
///
/// Subtotal and shipping are the *post-sale* taxed amounts: sales are
/// already embedded in unit prices by the time a voucher is judged.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// The cart under evaluation.
    pub cart: &'a CartSnapshot,
    /// Priced lines, parallel to `cart.lines`.
    pub lines: &'a [PricedLine],
    /// Post-sale taxed subtotal.
    pub subtotal: TaxedMoney,
    /// Taxed shipping price (zero when no method chosen).
    pub shipping: TaxedMoney,
    /// The instant of the pricing pass.
    pub at: DateTime<Utc>,
    /// Fallback country when the cart carries no address.
    pub default_country: Option<CountryCode>,
}

impl EvaluationContext<'_> {
    /// The country eligibility should use: shipping address, then
    /// billing address, then the configured default.
    pub fn country(&self) -> Option<CountryCode> {
        self.cart.country().or(self.default_country)
    }
}

// =============================================================================
// Discount
// =============================================================================

/// An applicable voucher discount, ready for composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discount {
    /// The granting voucher.
    pub voucher_id: atlas_core::VoucherId,
    /// Name shown on the checkout.
    pub name: String,
    /// Which total the amount reduces.
    pub bucket: DiscountBucket,
    /// The concrete amount, already clamped to the bucket it reduces.
    pub amount: Money,
}

// =============================================================================
// Evaluator
// =============================================================================

/// Judges `voucher` against the cart and computes its discount.
///
/// All checks pass through before any amount is computed, so a voucher
/// that *would* discount zero still reports its real rejection first.
pub fn evaluate(
    voucher: &Voucher,
    ctx: &EvaluationContext<'_>,
    usage: &dyn UsageView,
) -> Result<Discount, VoucherRejection> {
    check_window(voucher, ctx.at)?;
    check_headroom(voucher, usage)?;
    check_once_per_customer(voucher, ctx, usage)?;
    check_min_spent(voucher, ctx)?;
    check_min_items(voucher, ctx)?;
    check_country(voucher, ctx)?;
    check_scope(voucher, ctx)?;

    let amount = discount_amount(voucher, ctx);
    debug!(
        voucher = %voucher.code,
        amount = %amount,
        "voucher applicable"
    );
    Ok(Discount {
        voucher_id: voucher.id,
        name: voucher.display_name(),
        bucket: match voucher.voucher_type {
            VoucherType::Shipping => DiscountBucket::Shipping,
            VoucherType::EntireOrder | VoucherType::SpecificProduct => DiscountBucket::Subtotal,
        },
        amount,
    })
}

fn check_window(voucher: &Voucher, at: DateTime<Utc>) -> Result<(), VoucherRejection> {
    if at < voucher.start_date {
        return Err(VoucherRejection::NotStarted);
    }
    if let Some(end) = voucher.end_date {
        if at > end {
            return Err(VoucherRejection::Expired);
        }
    }
    Ok(())
}

fn check_headroom(voucher: &Voucher, usage: &dyn UsageView) -> Result<(), VoucherRejection> {
    if let Some(limit) = voucher.usage_limit {
        let totals = usage.usage(voucher);
        if totals.used + totals.reserved >= limit {
            return Err(VoucherRejection::ExhaustedUses);
        }
    }
    Ok(())
}

fn check_once_per_customer(
    voucher: &Voucher,
    ctx: &EvaluationContext<'_>,
    usage: &dyn UsageView,
) -> Result<(), VoucherRejection> {
    if !voucher.apply_once_per_customer {
        return Ok(());
    }
    if let Some(customer) = ctx.cart.customer_id {
        if usage.customer_has_used(voucher.id, customer) {
            return Err(VoucherRejection::AlreadyUsed);
        }
    }
    Ok(())
}

fn check_min_spent(voucher: &Voucher, ctx: &EvaluationContext<'_>) -> Result<(), VoucherRejection> {
    if let Some(min_spent) = voucher.min_spent {
        // The threshold is judged against the post-sale subtotal, so a
        // sale can push a cart below a voucher's minimum.
        let subtotal = ctx.subtotal.gross();
        if min_spent.currency() != subtotal.currency() {
            return Err(VoucherRejection::CurrencyMismatch);
        }
        if subtotal.amount() < min_spent.amount() {
            return Err(VoucherRejection::MinSpendNotMet { min_spent });
        }
    }
    Ok(())
}

fn check_min_items(voucher: &Voucher, ctx: &EvaluationContext<'_>) -> Result<(), VoucherRejection> {
    if let Some(min_quantity) = voucher.min_checkout_items_quantity {
        if ctx.cart.quantity_total() < min_quantity {
            return Err(VoucherRejection::MinItemsNotMet { min_quantity });
        }
    }
    Ok(())
}

fn check_country(voucher: &Voucher, ctx: &EvaluationContext<'_>) -> Result<(), VoucherRejection> {
    // Country lists only constrain shipping vouchers.
    if voucher.voucher_type != VoucherType::Shipping || voucher.countries.is_empty() {
        return Ok(());
    }
    match ctx.country() {
        Some(country) if voucher.countries.contains(&country) => Ok(()),
        _ => Err(VoucherRejection::CountryNotCovered),
    }
}

fn check_scope(voucher: &Voucher, ctx: &EvaluationContext<'_>) -> Result<(), VoucherRejection> {
    if voucher.voucher_type != VoucherType::SpecificProduct {
        return Ok(());
    }
    let any_match = ctx
        .lines
        .iter()
        .any(|priced| voucher.scope.matches(&priced.line.variant));
    if any_match {
        Ok(())
    } else {
        Err(VoucherRejection::NoMatchingProducts)
    }
}

// =============================================================================
// Amount Computation
// =============================================================================

fn discount_amount(voucher: &Voucher, ctx: &EvaluationContext<'_>) -> Money {
    let currency = ctx.subtotal.currency();
    match voucher.voucher_type {
        VoucherType::EntireOrder => amount_against(voucher, ctx.subtotal.gross()),
        VoucherType::Shipping => {
            // A shipping voucher on a cart without shipping applies with
            // a zero amount rather than being rejected.
            if ctx.cart.shipping_method.is_none() || !ctx.cart.is_shipping_required() {
                return Money::zero(currency);
            }
            amount_against(voucher, ctx.shipping.gross())
        }
        VoucherType::SpecificProduct => specific_product_amount(voucher, ctx),
    }
}

/// Fixed value capped at `base`; percentage taken of `base`.
fn amount_against(voucher: &Voucher, base: Money) -> Money {
    match voucher.discount_value_type {
        DiscountValueType::Fixed => {
            let value = fixed_value(voucher.discount_value, base);
            value.min_with(&base).unwrap_or(value)
        }
        DiscountValueType::Percentage => base.percentage(voucher.discount_value),
    }
}

/// Per-unit discount over matching lines, post-sale unit gross.
///
/// Each unit is discounted and rounded independently, then summed, so
/// the amount equals what per-line receipts would show. With
/// `apply_once_per_order`, only the single cheapest matching unit is
/// discounted.
fn specific_product_amount(voucher: &Voucher, ctx: &EvaluationContext<'_>) -> Money {
    let currency = ctx.subtotal.currency();
    let matching: Vec<&PricedLine> = ctx
        .lines
        .iter()
        .filter(|priced| voucher.scope.matches(&priced.line.variant))
        .collect();

    if voucher.apply_once_per_order {
        let cheapest = matching
            .iter()
            .map(|priced| priced.unit_price.gross())
            .min_by_key(|price| price.amount());
        return match cheapest {
            Some(unit) => per_unit_discount(voucher, unit),
            None => Money::zero(currency),
        };
    }

    let mut total = Money::zero(currency);
    for priced in matching {
        let per_unit = per_unit_discount(voucher, priced.unit_price.gross());
        let line_discount = per_unit.mul_quantity(priced.line.quantity);
        total = total.checked_add(&line_discount).unwrap_or(total);
    }
    total
}

fn per_unit_discount(voucher: &Voucher, unit_gross: Money) -> Money {
    match voucher.discount_value_type {
        DiscountValueType::Fixed => {
            let value = fixed_value(voucher.discount_value, unit_gross);
            value.min_with(&unit_gross).unwrap_or(value)
        }
        DiscountValueType::Percentage => unit_gross.percentage(voucher.discount_value),
    }
}

fn fixed_value(value: Decimal, reference: Money) -> Money {
    Money::new(value, reference.currency()).unwrap_or_else(|_| Money::zero(reference.currency()))
}

// =============================================================================
// Unit Tests
// =============================================================================
