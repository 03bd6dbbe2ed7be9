//! End-to-end checkout scenarios run through the public engine API.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use atlas_core::error::VoucherRejection;
use atlas_core::money::{Currency, Money};
use atlas_core::types::{
    CartLine, CartSnapshot, DiscountScope, DiscountValueType, ProductVariantRef, Sale,
    ShippingMethod, Voucher, VoucherCode, VoucherType,
};
use atlas_pricing::catalog::{FixedClock, InMemoryCatalog};
use atlas_pricing::engine::PricingEngine;
use atlas_pricing::error::LedgerError;
use atlas_pricing::ledger::UsageLedger;

// =============================================================================
// Fixtures
// =============================================================================

fn frozen_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn usd(major: u32) -> Money {
    Money::from_major(major, Currency::USD)
}

fn variant(product: u128, price_major: u32) -> ProductVariantRef {
    ProductVariantRef {
        id: Uuid::from_u128(product + 1000),
        product_id: Uuid::from_u128(product),
        product_type_id: Uuid::from_u128(1),
        category_ids: BTreeSet::new(),
        collection_ids: BTreeSet::new(),
        base_price: usd(price_major),
        is_shipping_required: true,
        weight_grams: 200,
    }
}

fn shipping_method() -> ShippingMethod {
    ShippingMethod {
        id: Uuid::from_u128(0x51),
        name: "standard".into(),
        price: usd(5),
    }
}

/// 2 × variant A @ 10.0000 USD plus a 5.0000 shipping method.
fn base_cart() -> CartSnapshot {
    CartSnapshot {
        lines: vec![CartLine::new(variant(0xA, 10), 2)],
        shipping_method: Some(shipping_method()),
        ..CartSnapshot::default()
    }
}

fn ten_percent_sale_on_a() -> Sale {
    Sale {
        id: Uuid::from_u128(0x5A),
        name: "Ten Off A".into(),
        discount_type: DiscountValueType::Percentage,
        value: Decimal::from(10),
        start_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        end_date: None,
        scope: DiscountScope {
            product_ids: [Uuid::from_u128(0xA)].into_iter().collect(),
            ..DiscountScope::default()
        },
    }
}

fn voucher(code: &str, voucher_type: VoucherType) -> Voucher {
    Voucher {
        id: Uuid::new_v4(),
        code: VoucherCode::new(code),
        name: None,
        voucher_type,
        discount_value_type: DiscountValueType::Fixed,
        discount_value: Decimal::ZERO,
        start_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        end_date: None,
        usage_limit: None,
        used_count: 0,
        min_spent: None,
        min_checkout_items_quantity: None,
        countries: BTreeSet::new(),
        apply_once_per_order: false,
        apply_once_per_customer: false,
        scope: DiscountScope::default(),
    }
}

fn engine_over(catalog: Arc<InMemoryCatalog>) -> PricingEngine {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    PricingEngine::new(catalog).with_clock(Arc::new(FixedClock(frozen_at())))
}

// =============================================================================
// Literal Scenarios
// =============================================================================

#[test]
fn plain_cart_sums_to_twenty() {
    let engine = engine_over(Arc::new(InMemoryCatalog::new()));
    let mut cart = base_cart();
    cart.shipping_method = None; // no shipping in this scenario

    let outcome = engine.price_checkout(&cart).unwrap();
    assert_eq!(outcome.checkout.subtotal.gross(), usd(20));
    assert_eq!(outcome.checkout.total.gross(), usd(20));
    assert!(outcome.checkout.total.tax().is_zero());
}

#[test]
fn percentage_sale_discounts_each_unit() {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.upsert_sale(ten_percent_sale_on_a());
    let engine = engine_over(catalog);

    let mut cart = base_cart();
    cart.shipping_method = None;

    let outcome = engine.price_checkout(&cart).unwrap();
    assert_eq!(outcome.checkout.lines[0].unit_price.gross(), usd(9));
    assert_eq!(outcome.checkout.total.gross(), usd(18));
    assert_eq!(outcome.applied_sales, vec!["Ten Off A".to_string()]);
}

#[test]
fn shipping_voucher_zeroes_the_shipping_charge() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let mut freeship = voucher("FREESHIP", VoucherType::Shipping);
    freeship.discount_value = Decimal::from(5);
    catalog.upsert_voucher(freeship);
    let engine = engine_over(catalog);

    let (_, outcome) = engine.attach_voucher(&base_cart(), "FREESHIP").unwrap();
    let checkout = &outcome.checkout;

    assert!(checkout.shipping_charge.is_zero());
    assert_eq!(checkout.discount_total, usd(5));
    assert_eq!(checkout.total.gross(), usd(20));
    // The record keeps the pre-voucher shipping so the equation holds.
    assert_eq!(checkout.shipping_total.gross(), usd(5));

    // The zero charge is part of the persisted record, not derived.
    let json = serde_json::to_value(checkout).unwrap();
    let charge: Money = serde_json::from_value(json["shipping_charge"].clone()).unwrap();
    assert!(charge.is_zero());
}

#[test]
fn half_off_voucher_stacks_on_post_sale_subtotal() {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.upsert_sale(ten_percent_sale_on_a());
    let mut save50 = voucher("SAVE50", VoucherType::EntireOrder);
    save50.discount_value_type = DiscountValueType::Percentage;
    save50.discount_value = Decimal::from(50);
    catalog.upsert_voucher(save50);
    let engine = engine_over(catalog);

    let mut cart = base_cart();
    cart.shipping_method = None;

    let (_, outcome) = engine.attach_voucher(&cart, "SAVE50").unwrap();
    // Sale first: subtotal 18. Voucher second: 50% of 18 = 9.
    assert_eq!(outcome.checkout.subtotal.gross(), usd(18));
    assert_eq!(outcome.checkout.discount_total, usd(9));
    assert_eq!(outcome.checkout.total.gross(), usd(9));
}

#[test]
fn concurrent_reservations_against_limit_one() {
    let catalog = InMemoryCatalog::new();
    let mut limit1 = voucher("LIMIT1", VoucherType::EntireOrder);
    limit1.discount_value = Decimal::from(1);
    limit1.usage_limit = Some(1);
    catalog.upsert_voucher(limit1.clone());

    let ledger = Arc::new(UsageLedger::new());
    let handles: Vec<_> = (0..2)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            let v = limit1.clone();
            thread::spawn(move || ledger.reserve(&v, Uuid::from_u128(i), None, frozen_at()))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let granted = results.iter().filter(|r| r.is_ok()).count();
    let exhausted = results
        .iter()
        .filter(|r| **r == Err(LedgerError::Exhausted))
        .count();
    assert_eq!(granted, 1);
    assert_eq!(exhausted, 1);
}

#[test]
fn once_per_order_voucher_hits_one_cheap_unit() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let mut scoped = voucher("ONEB", VoucherType::SpecificProduct);
    scoped.discount_value = Decimal::from(3);
    scoped.apply_once_per_order = true;
    scoped.scope.product_ids.insert(Uuid::from_u128(0xB));
    catalog.upsert_voucher(scoped);
    let engine = engine_over(catalog);

    let mut cart = base_cart();
    cart.lines = vec![
        CartLine::new(variant(0xA, 10), 3),
        CartLine::new(variant(0xB, 5), 2),
    ];
    cart.shipping_method = None;

    let (_, outcome) = engine.attach_voucher(&cart, "oneb").unwrap();
    assert_eq!(outcome.checkout.discount_total, usd(3));
    assert_eq!(outcome.checkout.total.gross(), usd(37));
}

// =============================================================================
// Quantified Properties
// =============================================================================

#[test]
fn undiscounted_total_equals_lines_plus_shipping() {
    let engine = engine_over(Arc::new(InMemoryCatalog::new()));
    let mut cart = base_cart();
    cart.lines.push(CartLine::new(variant(0xB, 7), 3));

    let outcome = engine.price_checkout(&cart).unwrap();
    let line_sum = outcome
        .checkout
        .lines
        .iter()
        .fold(Money::zero(Currency::USD), |acc, l| {
            acc.checked_add(&l.unit_price.gross().mul_quantity(l.line.quantity))
                .unwrap()
        });
    let expected = line_sum
        .checked_add(&outcome.checkout.shipping_total.gross())
        .unwrap();
    assert_eq!(outcome.checkout.total.gross(), expected);
}

#[test]
fn voucher_never_raises_the_total_and_never_goes_negative() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let mut huge = voucher("HUGE", VoucherType::EntireOrder);
    huge.discount_value = Decimal::from(10_000);
    catalog.upsert_voucher(huge);
    let engine = engine_over(catalog);

    let cart = base_cart();
    let baseline = engine.price_checkout(&cart).unwrap();
    let (_, discounted) = engine.attach_voucher(&cart, "HUGE").unwrap();

    assert!(discounted.checkout.total.gross() <= baseline.checkout.total.gross());
    assert!(discounted.checkout.total.gross().amount() >= Decimal::ZERO);
    // A discount worth more than the order clamps to the order.
    assert!(discounted.checkout.total.gross().is_zero());
}

#[test]
fn zero_value_sales_change_nothing() {
    let plain = engine_over(Arc::new(InMemoryCatalog::new()));
    let baseline = plain.price_checkout(&base_cart()).unwrap();

    let catalog = Arc::new(InMemoryCatalog::new());
    let mut zero_pct = ten_percent_sale_on_a();
    zero_pct.value = Decimal::ZERO;
    catalog.upsert_sale(zero_pct);
    let mut zero_fixed = ten_percent_sale_on_a();
    zero_fixed.id = Uuid::from_u128(0x5B);
    zero_fixed.discount_type = DiscountValueType::Fixed;
    zero_fixed.value = Decimal::ZERO;
    catalog.upsert_sale(zero_fixed);

    let with_sales = engine_over(catalog).price_checkout(&base_cart()).unwrap();
    assert_eq!(baseline.checkout, with_sales.checkout);
}

#[test]
fn frozen_clock_makes_pricing_byte_identical() {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.upsert_sale(ten_percent_sale_on_a());
    let mut save = voucher("SAVE", VoucherType::EntireOrder);
    save.discount_value = Decimal::from(2);
    catalog.upsert_voucher(save);
    let engine = engine_over(catalog);

    let (cart, first) = engine.attach_voucher(&base_cart(), "save").unwrap();
    let second = engine.price_checkout(&cart).unwrap();

    let a = serde_json::to_string(&first.checkout).unwrap();
    let b = serde_json::to_string(&second.checkout).unwrap();
    assert_eq!(a, b);
}

#[test]
fn concurrent_reserves_grant_exactly_min_of_n_and_k() {
    let mut limited = voucher("K3", VoucherType::EntireOrder);
    limited.discount_value = Decimal::from(1);
    limited.usage_limit = Some(3);

    let ledger = Arc::new(UsageLedger::new());
    let handles: Vec<_> = (0..12)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            let v = limited.clone();
            thread::spawn(move || ledger.reserve(&v, Uuid::from_u128(i), None, frozen_at()).is_ok())
        })
        .collect();

    let granted = handles
        .into_iter()
        .map(|h| h.join().unwrap_or(false))
        .filter(|&granted| granted)
        .count();
    assert_eq!(granted, 3);
}

#[test]
fn release_after_commit_restores_used_count() {
    let mut limited = voucher("RC", VoucherType::EntireOrder);
    limited.discount_value = Decimal::from(1);
    limited.usage_limit = Some(10);
    limited.used_count = 4;

    let ledger = UsageLedger::new();
    let order = Uuid::from_u128(0x77);
    ledger.reserve(&limited, order, None, frozen_at()).unwrap();
    ledger.commit(limited.id, order).unwrap();
    assert_eq!(ledger.used_count(limited.id), Some(5));

    ledger.release(limited.id, order).unwrap();
    assert_eq!(ledger.used_count(limited.id), Some(4));
}

// =============================================================================
// Round-Trips
// =============================================================================

#[test]
fn attach_then_detach_restores_the_baseline() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let mut save = voucher("SAVE", VoucherType::EntireOrder);
    save.discount_value = Decimal::from(4);
    catalog.upsert_voucher(save);
    let engine = engine_over(catalog);

    let baseline = engine.price_checkout(&base_cart()).unwrap();
    let (attached, _) = engine.attach_voucher(&base_cart(), "SAVE").unwrap();
    let (_, restored) = engine.detach_voucher(&attached).unwrap();

    assert_eq!(baseline.checkout, restored.checkout);
}

#[test]
fn adding_then_removing_a_sale_reverts_prices_exactly() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let engine = engine_over(catalog.clone());

    let baseline = engine.price_checkout(&base_cart()).unwrap();

    let sale = ten_percent_sale_on_a();
    let sale_id = sale.id;
    catalog.upsert_sale(sale);
    let during = engine.price_checkout(&base_cart()).unwrap();
    assert_eq!(during.checkout.subtotal.gross(), usd(18));

    catalog.remove_sale(sale_id);
    let after = engine.price_checkout(&base_cart()).unwrap();
    assert_eq!(baseline.checkout, after.checkout);
}

// =============================================================================
// Rejection Flow
// =============================================================================

#[test]
fn exhausted_voucher_reports_rejection_but_prices_the_cart() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let mut spent = voucher("GONE", VoucherType::EntireOrder);
    spent.discount_value = Decimal::from(5);
    spent.usage_limit = Some(10);
    spent.used_count = 10;
    catalog.upsert_voucher(spent);
    let engine = engine_over(catalog);

    let (_, outcome) = engine.attach_voucher(&base_cart(), "GONE").unwrap();
    assert_eq!(outcome.rejection, Some(VoucherRejection::ExhaustedUses));
    assert!(outcome.checkout.discount_total.is_zero());
    assert_eq!(outcome.checkout.total.gross(), usd(25));
}

#[test]
fn placement_pipeline_reserve_commit_refund() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let mut save = voucher("FLOW", VoucherType::EntireOrder);
    save.discount_value = Decimal::from(2);
    save.usage_limit = Some(5);
    catalog.upsert_voucher(save);
    let engine = engine_over(catalog);

    let (cart, _) = engine.attach_voucher(&base_cart(), "FLOW").unwrap();
    let order = Uuid::from_u128(0x88);
    let outcome = engine.place_order(&cart, order).unwrap();
    let voucher_id = outcome.checkout.voucher_id.unwrap();

    engine.commit_voucher("FLOW", order).unwrap();
    assert_eq!(engine.ledger().used_count(voucher_id), Some(1));

    // Refund: the slot comes back.
    engine.release_voucher("FLOW", order).unwrap();
    assert_eq!(engine.ledger().used_count(voucher_id), Some(0));
}
