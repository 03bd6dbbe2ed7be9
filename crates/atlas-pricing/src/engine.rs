//! # Pricing Engine
//!
//! The embedding-facing facade over the whole engine.
//!
//! ## Responsibilities
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PricingEngine                                    │
//! │                                                                         │
//! │   price_checkout(cart)          pure pass, repeatable, mutates nothing │
//! │   validate_voucher(code, cart)  judge a code without attaching it      │
//! │   attach_voucher(cart, raw)     normalize code, price with it attached │
//! │   detach_voucher(cart)          price with the code removed            │
//! │   place_order(cart, order)      price + reserve voucher usage          │
//! │   reserve/commit/release_voucher  drive the ledger by code             │
//! │                                                                         │
//! │   Collaborators:                                                        │
//! │     CatalogSource  (injected)   Clock       (injected, frozen in test) │
//! │     TaxAdapter     (injected)   UsageLedger (owned — the only state)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tracing::info;

use atlas_core::error::VoucherRejection;
use atlas_core::types::{
    CartLine, CartSnapshot, CustomerId, OrderId, VariantId, Voucher, VoucherCode,
};

use crate::catalog::{CatalogSource, Clock, SystemClock};
use crate::error::{PricingError, PricingResult};
use crate::ledger::UsageLedger;
use crate::pipeline::{self, EngineConfig, PricingOutcome};
use crate::tax::TaxAdapter;
use crate::voucher::{evaluate, Discount, EvaluationContext};

/// The pricing, discount and voucher engine.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct PricingEngine {
    catalog: Arc<dyn CatalogSource>,
    clock: Arc<dyn Clock>,
    tax: TaxAdapter,
    ledger: UsageLedger,
    config: EngineConfig,
}

impl PricingEngine {
    /// Creates an engine over `catalog` with wall-clock time, identity
    /// tax and default store config.
    pub fn new(catalog: Arc<dyn CatalogSource>) -> Self {
        PricingEngine {
            catalog,
            clock: Arc::new(SystemClock),
            tax: TaxAdapter::identity(),
            ledger: UsageLedger::new(),
            config: EngineConfig::default(),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the tax adapter.
    pub fn with_tax(mut self, tax: TaxAdapter) -> Self {
        self.tax = tax;
        self
    }

    /// Replaces the store defaults.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The usage ledger, for callers that drive reservations directly.
    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    /// Prices a cart at the current instant.
    ///
    /// Pure with respect to the cart and the ledger: pricing the same
    /// snapshot twice at a frozen clock yields identical outcomes.
    pub fn price_checkout(&self, cart: &CartSnapshot) -> PricingResult<PricingOutcome> {
        pipeline::run(
            cart,
            self.catalog.as_ref(),
            &self.tax,
            &self.ledger,
            &self.config,
            self.clock.now(),
        )
    }

    /// Judges a code against the cart without attaching it.
    ///
    /// Prices the cart sans voucher to obtain the post-sale amounts the
    /// eligibility checks need, then evaluates. The inner `Result` is
    /// the verdict: an applicable [`Discount`] or the typed rejection.
    pub fn validate_voucher(
        &self,
        raw_code: &str,
        cart: &CartSnapshot,
    ) -> PricingResult<Result<Discount, VoucherRejection>> {
        let code = VoucherCode::new(raw_code);
        let voucher = self
            .catalog
            .lookup_voucher(&code)
            .ok_or_else(|| PricingError::UnknownVoucherCode(code.to_string()))?;

        let mut bare = cart.clone();
        bare.voucher_code = None;
        let at = self.clock.now();
        let outcome = pipeline::run(
            &bare,
            self.catalog.as_ref(),
            &self.tax,
            &self.ledger,
            &self.config,
            at,
        )?;

        let ctx = EvaluationContext {
            cart,
            lines: &outcome.checkout.lines,
            subtotal: outcome.checkout.subtotal,
            shipping: outcome.checkout.shipping_total,
            at,
            default_country: Some(self.config.default_country),
        };
        Ok(evaluate(&voucher, &ctx, &self.ledger))
    }

    /// Attaches a raw voucher code and prices the result.
    ///
    /// The code is normalized before lookup; an unknown code fails with
    /// [`PricingError::UnknownVoucherCode`] and the cart is returned
    /// unchanged to the caller (the input is never mutated either way).
    pub fn attach_voucher(
        &self,
        cart: &CartSnapshot,
        raw_code: &str,
    ) -> PricingResult<(CartSnapshot, PricingOutcome)> {
        let code = VoucherCode::new(raw_code);
        if code.is_empty() || self.catalog.lookup_voucher(&code).is_none() {
            return Err(PricingError::UnknownVoucherCode(code.to_string()));
        }
        let mut attached = cart.clone();
        attached.voucher_code = Some(code);
        let outcome = self.price_checkout(&attached)?;
        Ok((attached, outcome))
    }

    /// Removes any attached voucher code and prices the result.
    pub fn detach_voucher(
        &self,
        cart: &CartSnapshot,
    ) -> PricingResult<(CartSnapshot, PricingOutcome)> {
        let mut detached = cart.clone();
        detached.voucher_code = None;
        let outcome = self.price_checkout(&detached)?;
        Ok((detached, outcome))
    }

    /// Prices the cart and, when a voucher applied, reserves one use
    /// for `order_id`.
    ///
    /// The reservation is atomic against the usage limit: under
    /// contention some placements fail with `Exhausted` and the caller
    /// should re-price without the voucher. A rejected or absent
    /// voucher places with no reservation.
    pub fn place_order(
        &self,
        cart: &CartSnapshot,
        order_id: OrderId,
    ) -> PricingResult<PricingOutcome> {
        let at = self.clock.now();
        let outcome = pipeline::run(
            cart,
            self.catalog.as_ref(),
            &self.tax,
            &self.ledger,
            &self.config,
            at,
        )?;

        if outcome.checkout.voucher_id.is_some() {
            if let Some(code) = &cart.voucher_code {
                if let Some(voucher) = self.catalog.lookup_voucher(code) {
                    self.ledger
                        .reserve(&voucher, order_id, cart.customer_id, at)?;
                    info!(voucher = %code, %order_id, "voucher usage reserved for order");
                }
            }
        }
        Ok(outcome)
    }

    /// Reserves one use of the coded voucher for `order_id`.
    ///
    /// Atomic against the usage limit; under contention the losers see
    /// `Ledger(Exhausted)`.
    pub fn reserve_voucher(
        &self,
        raw_code: &str,
        order_id: OrderId,
        customer_id: Option<CustomerId>,
    ) -> PricingResult<()> {
        let voucher = self.voucher_by_code(raw_code)?;
        self.ledger
            .reserve(&voucher, order_id, customer_id, self.clock.now())?;
        Ok(())
    }

    /// Finalizes a reservation once the order reaches a terminal state.
    pub fn commit_voucher(&self, raw_code: &str, order_id: OrderId) -> PricingResult<()> {
        let voucher = self.voucher_by_code(raw_code)?;
        self.ledger.commit(voucher.id, order_id)?;
        Ok(())
    }

    /// Refunds a reservation on cancellation or refund.
    pub fn release_voucher(&self, raw_code: &str, order_id: OrderId) -> PricingResult<()> {
        let voucher = self.voucher_by_code(raw_code)?;
        self.ledger.release(voucher.id, order_id)?;
        Ok(())
    }

    /// Builds a cart line from the catalog's current variant snapshot,
    /// freezing its price into the line.
    pub fn line_from_catalog(
        &self,
        variant_id: VariantId,
        quantity: u32,
    ) -> PricingResult<CartLine> {
        let variant = self
            .catalog
            .variant(variant_id)
            .ok_or(PricingError::UnknownVariant(variant_id))?;
        Ok(CartLine::new(variant, quantity))
    }

    fn voucher_by_code(&self, raw_code: &str) -> PricingResult<Voucher> {
        let code = VoucherCode::new(raw_code);
        self.catalog
            .lookup_voucher(&code)
            .ok_or_else(|| PricingError::UnknownVoucherCode(code.to_string()))
    }
}

impl std::fmt::Debug for PricingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FixedClock, InMemoryCatalog};
    use atlas_core::money::{Currency, Money};
    use atlas_core::types::{
        CartLine, DiscountScope, DiscountValueType, ProductVariantRef, ShippingMethod, Voucher,
        VoucherType,
    };
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn variant(product: u128, price_major: u32) -> ProductVariantRef {
        ProductVariantRef {
            id: Uuid::from_u128(product + 1000),
            product_id: Uuid::from_u128(product),
            product_type_id: Uuid::from_u128(1),
            category_ids: BTreeSet::new(),
            collection_ids: BTreeSet::new(),
            base_price: Money::from_major(price_major, Currency::USD),
            is_shipping_required: true,
            weight_grams: 100,
        }
    }

    fn ten_percent_voucher() -> Voucher {
        Voucher {
            id: Uuid::from_u128(9),
            code: VoucherCode::new("save10"),
            name: Some("Save 10%".into()),
            voucher_type: VoucherType::EntireOrder,
            discount_value_type: DiscountValueType::Percentage,
            discount_value: Decimal::from(10),
            start_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end_date: None,
            usage_limit: Some(2),
            used_count: 0,
            min_spent: None,
            min_checkout_items_quantity: None,
            countries: BTreeSet::new(),
            apply_once_per_order: false,
            apply_once_per_customer: false,
            scope: DiscountScope::default(),
        }
    }

    fn engine() -> (PricingEngine, Arc<InMemoryCatalog>) {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.upsert_voucher(ten_percent_voucher());
        let engine = PricingEngine::new(catalog.clone()).with_clock(Arc::new(FixedClock(at())));
        (engine, catalog)
    }

    fn cart() -> CartSnapshot {
        CartSnapshot {
            lines: vec![CartLine::new(variant(1, 10), 2)],
            shipping_method: Some(ShippingMethod {
                id: Uuid::from_u128(0x5),
                name: "standard".into(),
                price: Money::from_major(5, Currency::USD),
            }),
            ..CartSnapshot::default()
        }
    }

    #[test]
    fn test_attach_detach_round_trip() {
        let (engine, _) = engine();
        let base = cart();

        let (attached, outcome) = engine.attach_voucher(&base, "  SAVE10  ").unwrap();
        assert_eq!(outcome.checkout.discount_total, Money::from_major(2, Currency::USD));
        assert_eq!(outcome.checkout.discount_name.as_deref(), Some("Save 10%"));

        let (detached, outcome) = engine.detach_voucher(&attached).unwrap();
        assert!(detached.voucher_code.is_none());
        assert!(outcome.checkout.discount_total.is_zero());
        assert_eq!(outcome.checkout.total.gross(), Money::from_major(25, Currency::USD));

        // The original snapshot was never touched.
        assert!(base.voucher_code.is_none());
    }

    #[test]
    fn test_attach_unknown_code_fails() {
        let (engine, _) = engine();
        let err = engine.attach_voucher(&cart(), "nope").unwrap_err();
        assert!(matches!(err, PricingError::UnknownVoucherCode(_)));
    }

    #[test]
    fn test_pricing_is_repeatable_at_frozen_clock() {
        let (engine, _) = engine();
        let (attached, first) = engine.attach_voucher(&cart(), "save10").unwrap();
        let second = engine.price_checkout(&attached).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_place_order_reserves_and_limit_bites() {
        let (engine, _) = engine();
        let (attached, _) = engine.attach_voucher(&cart(), "save10").unwrap();

        engine.place_order(&attached, Uuid::from_u128(0x01)).unwrap();
        engine.place_order(&attached, Uuid::from_u128(0x02)).unwrap();

        // Limit 2: the third placement sees the voucher as exhausted
        // during evaluation, so it prices without the discount.
        let outcome = engine.place_order(&attached, Uuid::from_u128(0x03)).unwrap();
        assert!(matches!(
            outcome.rejection,
            Some(atlas_core::error::VoucherRejection::ExhaustedUses)
        ));
        assert!(outcome.checkout.discount_total.is_zero());
    }

    #[test]
    fn test_commit_and_release_round_trip() {
        let (engine, _) = engine();
        let (attached, outcome) = engine.attach_voucher(&cart(), "save10").unwrap();
        let voucher_id = outcome.checkout.voucher_id.unwrap();
        let order = Uuid::from_u128(0x01);

        engine.place_order(&attached, order).unwrap();
        engine.commit_voucher("save10", order).unwrap();
        assert_eq!(engine.ledger().used_count(voucher_id), Some(1));

        engine.release_voucher("save10", order).unwrap();
        assert_eq!(engine.ledger().used_count(voucher_id), Some(0));
    }

    #[test]
    fn test_line_from_catalog_freezes_the_current_price() {
        let (engine, catalog) = engine();
        let v = variant(7, 12);
        catalog.upsert_variant(v.clone());

        let line = engine.line_from_catalog(v.id, 3).unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(line.unit_base_price, Money::from_major(12, Currency::USD));

        let err = engine
            .line_from_catalog(Uuid::from_u128(0xDEAD), 1)
            .unwrap_err();
        assert!(matches!(err, PricingError::UnknownVariant(_)));
    }

    #[test]
    fn test_validate_voucher_judges_without_attaching() {
        let (engine, catalog) = engine();

        let verdict = engine.validate_voucher("  SAVE10 ", &cart()).unwrap();
        let discount = verdict.unwrap();
        // 10% of the 20.0000 subtotal.
        assert_eq!(discount.amount, Money::from_major(2, Currency::USD));

        let mut spent = ten_percent_voucher();
        spent.used_count = 2;
        catalog.upsert_voucher(spent);
        let verdict = engine.validate_voucher("save10", &cart()).unwrap();
        assert_eq!(
            verdict,
            Err(atlas_core::error::VoucherRejection::ExhaustedUses)
        );
    }

    #[test]
    fn test_reserve_voucher_by_code_respects_limit() {
        let (engine, _) = engine();

        engine.reserve_voucher("save10", Uuid::from_u128(1), None).unwrap();
        engine.reserve_voucher("save10", Uuid::from_u128(2), None).unwrap();
        let err = engine
            .reserve_voucher("save10", Uuid::from_u128(3), None)
            .unwrap_err();
        assert!(matches!(
            err,
            PricingError::Ledger(crate::error::LedgerError::Exhausted)
        ));

        assert!(matches!(
            engine.reserve_voucher("nope", Uuid::from_u128(4), None),
            Err(PricingError::UnknownVoucherCode(_))
        ));
    }

    #[test]
    fn test_place_order_without_voucher_reserves_nothing() {
        let (engine, _) = engine();
        let outcome = engine.place_order(&cart(), Uuid::from_u128(0x01)).unwrap();
        assert!(outcome.checkout.voucher_id.is_none());
        assert!(engine
            .ledger()
            .reservation(Uuid::from_u128(9), Uuid::from_u128(0x01))
            .is_none());
    }
}
