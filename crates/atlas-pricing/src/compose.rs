//! # Discount Composition
//!
//! The rules for combining discounts into one checkout total.
//!
//! ## Composition Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Discounts Combine                                │
//! │                                                                         │
//! │  base prices                                                            │
//! │      │  sales: every applicable sale priced independently,             │
//! │      ▼         MINIMUM wins — sales never stack                        │
//! │  unit prices ──► line totals ──► subtotal        (+ shipping)          │
//! │      │                                                                  │
//! │      │  voucher: at most ONE per checkout, applied AFTER sales,        │
//! │      ▼           against post-sale amounts                             │
//! │  discount_total ──► clamped to subtotal + shipping                     │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  total = subtotal + shipping − discount_total    (never negative)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The emitted checkout either satisfies the total equation exactly or
//! the pass aborts; a malformed money record never leaves this module.

use atlas_core::money::{Money, TaxedMoney};
use atlas_core::types::{DiscountBucket, PricedCheckout, PricedLine};

use crate::error::{PricingError, PricingResult};
use crate::voucher::Discount;

/// Assembles the final checkout from priced components.
///
/// `discount` is the single voucher discount, already bucketed; its
/// amount is re-clamped here so no evaluator rounding path can push
/// `discount_total` past what the order is worth.
pub fn compose(
    lines: Vec<PricedLine>,
    subtotal: TaxedMoney,
    shipping_total: TaxedMoney,
    discount: Option<Discount>,
) -> PricingResult<PricedCheckout> {
    let undiscounted = subtotal.checked_add(&shipping_total)?;

    let (discount_total, discount_bucket, discount_name, voucher_id) = match discount {
        Some(d) => {
            let clamped = d.amount.min_with(&undiscounted.gross())?;
            (clamped, Some(d.bucket), Some(d.name), Some(d.voucher_id))
        }
        None => (
            Money::zero(undiscounted.currency()),
            None,
            None,
            None,
        ),
    };

    let total = undiscounted.apply_fixed_discount(&discount_total)?;
    check_total_equation(&subtotal, &shipping_total, &discount_total, &total)?;

    // shipping_total stays pre-voucher so the total equation reads off
    // the record; the charge field carries what the customer pays.
    let shipping_charge = match discount_bucket {
        Some(DiscountBucket::Shipping) => shipping_total
            .gross()
            .saturating_sub(&discount_total)?,
        _ => shipping_total.gross(),
    };

    Ok(PricedCheckout {
        lines,
        subtotal,
        shipping_total,
        shipping_charge,
        discount_total,
        discount_bucket,
        discount_name,
        voucher_id,
        total,
    })
}

/// `total.gross == subtotal.gross + shipping.gross − discount_total`.
///
/// Holds by construction once the discount is clamped; checked anyway
/// because emitting a checkout that breaks it would corrupt orders
/// downstream.
fn check_total_equation(
    subtotal: &TaxedMoney,
    shipping_total: &TaxedMoney,
    discount_total: &Money,
    total: &TaxedMoney,
) -> PricingResult<()> {
    let expected = subtotal
        .gross()
        .checked_add(&shipping_total.gross())?
        .saturating_sub(discount_total)?;
    if total.gross() != expected {
        return Err(PricingError::InvariantViolation(
            "total does not equal subtotal + shipping - discount",
        ));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_core::money::Currency;
    use atlas_core::types::DiscountBucket;
    use uuid::Uuid;

    fn usd(major: u32) -> Money {
        Money::from_major(major, Currency::USD)
    }

    fn discount(amount: Money, bucket: DiscountBucket) -> Discount {
        Discount {
            voucher_id: Uuid::from_u128(9),
            name: "save".into(),
            bucket,
            amount,
        }
    }

    #[test]
    fn test_compose_without_discount() {
        let checkout = compose(
            Vec::new(),
            TaxedMoney::from_net(usd(20)),
            TaxedMoney::from_net(usd(5)),
            None,
        )
        .unwrap();

        assert!(checkout.discount_total.is_zero());
        assert!(checkout.voucher_id.is_none());
        assert_eq!(checkout.total.gross(), usd(25));
    }

    #[test]
    fn test_compose_subtracts_discount_from_total() {
        let checkout = compose(
            Vec::new(),
            TaxedMoney::from_net(usd(20)),
            TaxedMoney::from_net(usd(5)),
            Some(discount(usd(4), DiscountBucket::Subtotal)),
        )
        .unwrap();

        assert_eq!(checkout.discount_total, usd(4));
        assert_eq!(checkout.total.gross(), usd(21));
        assert_eq!(checkout.shipping_charge, usd(5));
    }

    #[test]
    fn test_compose_clamps_discount_to_order_worth() {
        let checkout = compose(
            Vec::new(),
            TaxedMoney::from_net(usd(20)),
            TaxedMoney::from_net(usd(5)),
            Some(discount(usd(100), DiscountBucket::Subtotal)),
        )
        .unwrap();

        assert_eq!(checkout.discount_total, usd(25));
        assert!(checkout.total.gross().is_zero());
    }

    #[test]
    fn test_shipping_bucket_reports_discounted_shipping() {
        let checkout = compose(
            Vec::new(),
            TaxedMoney::from_net(usd(20)),
            TaxedMoney::from_net(usd(5)),
            Some(discount(usd(5), DiscountBucket::Shipping)),
        )
        .unwrap();

        // The pre-voucher shipping stays on the record for the total
        // equation; the charge field carries the discounted price.
        assert_eq!(checkout.shipping_total.gross(), usd(5));
        assert!(checkout.shipping_charge.is_zero());
        assert_eq!(checkout.total.gross(), usd(20));
    }
}
