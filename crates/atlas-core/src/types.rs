//! # Domain Types
//!
//! Core domain types used throughout the Atlas pricing engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌─────────────────┐   ┌─────────────────┐      │
//! │  │ ProductVariantRef│   │      Sale       │   │    Voucher      │      │
//! │  │  ──────────────  │   │  ─────────────  │   │  ─────────────  │      │
//! │  │  id, product_id  │   │  id, name       │   │  id, code       │      │
//! │  │  category ids    │   │  fixed | pct    │   │  type, value    │      │
//! │  │  collection ids  │   │  activity window│   │  min spend, cap │      │
//! │  │  base_price      │   │  scope          │   │  scope, limits  │      │
//! │  └──────────────────┘   └─────────────────┘   └─────────────────┘      │
//! │                                                                         │
//! │  CartLine ──► CartSnapshot ──► (pricing pass) ──► PricedLine           │
//! │                                                    └► PricedCheckout   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `CartSnapshot` and `PricedCheckout` are immutable value objects: a
//! pricing pass never mutates its input, and the priced checkout it emits
//! is the canonical money record shown to the customer and persisted on
//! order placement.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::money::{Currency, Money, TaxedMoney};

// =============================================================================
// Identifiers
// =============================================================================

/// Product variant identity.
pub type VariantId = Uuid;
/// Product identity.
pub type ProductId = Uuid;
/// Product type identity.
pub type ProductTypeId = Uuid;
/// Category identity.
pub type CategoryId = Uuid;
/// Collection identity.
pub type CollectionId = Uuid;
/// Sale identity.
pub type SaleId = Uuid;
/// Voucher identity.
pub type VoucherId = Uuid;
/// Order identity (assigned by the caller on placement).
pub type OrderId = Uuid;
/// Customer identity.
pub type CustomerId = Uuid;

// =============================================================================
// Country Code
// =============================================================================

/// An ISO-3166 alpha-2 country code (two uppercase ASCII letters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CountryCode([u8; 2]);

impl CountryCode {
    /// United States.
    pub const US: CountryCode = CountryCode(*b"US");
    /// Germany.
    pub const DE: CountryCode = CountryCode(*b"DE");
    /// United Kingdom.
    pub const GB: CountryCode = CountryCode(*b"GB");

    /// Parses a two-letter code; accepts lowercase input.
    pub fn from_code(code: &str) -> Option<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return None;
        }
        Some(CountryCode([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
        ]))
    }

    /// Returns the code as text, e.g. `"US"`.
    pub fn code(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for CountryCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for CountryCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        CountryCode::from_code(&code)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid country code: {code}")))
    }
}

// =============================================================================
// Catalog References
// =============================================================================

/// A snapshot of the variant facts the engine needs to price a line.
///
/// The catalog owns the real product graph; the engine only ever sees
/// this flat reference, so there are no cycles in the in-memory model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariantRef {
    /// Variant identity.
    pub id: VariantId,
    /// Owning product.
    pub product_id: ProductId,
    /// Product type (used as a tax-category hint by tax plugins).
    pub product_type_id: ProductTypeId,
    /// Categories the owning product belongs to.
    pub category_ids: BTreeSet<CategoryId>,
    /// Collections the owning product belongs to.
    pub collection_ids: BTreeSet<CollectionId>,
    /// Undiscounted unit price.
    pub base_price: Money,
    /// Whether this variant needs physical shipping.
    pub is_shipping_required: bool,
    /// Shipping weight in grams (zero for digital goods).
    pub weight_grams: u32,
}

// =============================================================================
// Discount Definitions
// =============================================================================

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountValueType {
    /// A fixed amount in the cart currency.
    Fixed,
    /// A percentage in [0, 100].
    Percentage,
}

/// Which catalog objects a Sale or product-scoped Voucher touches.
///
/// A variant matches if its product is listed, or any of its categories
/// or collections is listed. An empty scope matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountScope {
    /// Directly targeted products.
    pub product_ids: BTreeSet<ProductId>,
    /// Targeted categories.
    pub category_ids: BTreeSet<CategoryId>,
    /// Targeted collections.
    pub collection_ids: BTreeSet<CollectionId>,
}

impl DiscountScope {
    /// True when no products, categories or collections are listed.
    pub fn is_empty(&self) -> bool {
        self.product_ids.is_empty()
            && self.category_ids.is_empty()
            && self.collection_ids.is_empty()
    }

    /// Checks whether `variant` falls inside this scope.
    pub fn matches(&self, variant: &ProductVariantRef) -> bool {
        if self.product_ids.contains(&variant.product_id) {
            return true;
        }
        if variant
            .category_ids
            .iter()
            .any(|c| self.category_ids.contains(c))
        {
            return true;
        }
        variant
            .collection_ids
            .iter()
            .any(|c| self.collection_ids.contains(c))
    }
}

/// A time-bounded catalog discount, always embedded into the displayed
/// unit price (never code-activated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    /// Sale identity; also the deterministic tie-break key.
    pub id: SaleId,
    /// Human-readable name, surfaced on discounted checkouts.
    pub name: String,
    /// Fixed amount or percentage.
    pub discount_type: DiscountValueType,
    /// Discount value; meaning depends on `discount_type`.
    pub value: Decimal,
    /// Start of the activity window.
    pub start_date: DateTime<Utc>,
    /// Optional end of the activity window (open-ended when absent).
    pub end_date: Option<DateTime<Utc>>,
    /// Catalog objects this sale touches.
    pub scope: DiscountScope,
}

impl Sale {
    /// Whether the sale is active at `at`.
    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        if at < self.start_date {
            return false;
        }
        match self.end_date {
            Some(end) => at <= end,
            None => true,
        }
    }

    /// Applies this sale to a unit price, clamping at zero.
    ///
    /// A fixed discount larger than the price makes the unit free; a
    /// percentage keeps `100 − value` percent of the price.
    pub fn apply_to(&self, price: &Money) -> Money {
        match self.discount_type {
            DiscountValueType::Fixed => {
                let discount = Money::new(self.value, price.currency())
                    .unwrap_or_else(|_| Money::zero(price.currency()));
                price
                    .saturating_sub(&discount)
                    .unwrap_or_else(|_| Money::zero(price.currency()))
            }
            DiscountValueType::Percentage => {
                price.percentage(Decimal::ONE_HUNDRED - self.value)
            }
        }
    }
}

// =============================================================================
// Voucher
// =============================================================================

/// What a voucher discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherType {
    /// Discounts the whole order subtotal.
    EntireOrder,
    /// Discounts the shipping price.
    Shipping,
    /// Discounts matching product units only.
    SpecificProduct,
}

/// A normalized voucher code: trimmed, lowercased, compared
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoucherCode(String);

impl VoucherCode {
    /// Normalizes raw user input into a code.
    pub fn new(raw: &str) -> Self {
        VoucherCode(raw.trim().to_lowercase())
    }

    /// The normalized code text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for an empty (blank) code.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for VoucherCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A code-activated discount applied at most once per checkout, subject
/// to eligibility checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    /// Voucher identity.
    pub id: VoucherId,
    /// Unique, case-insensitive activation code.
    pub code: VoucherCode,
    /// Display name; falls back to the code when absent.
    pub name: Option<String>,
    /// What the voucher discounts.
    pub voucher_type: VoucherType,
    /// Fixed amount or percentage.
    pub discount_value_type: DiscountValueType,
    /// Discount value; meaning depends on `discount_value_type`.
    pub discount_value: Decimal,
    /// Start of the activity window.
    pub start_date: DateTime<Utc>,
    /// Optional end of the activity window.
    pub end_date: Option<DateTime<Utc>>,
    /// Maximum number of committed + reserved uses, when limited.
    pub usage_limit: Option<u32>,
    /// Uses recorded so far.
    pub used_count: u32,
    /// Minimum post-sale subtotal required, when set.
    pub min_spent: Option<Money>,
    /// Minimum total item quantity required, when set.
    pub min_checkout_items_quantity: Option<u32>,
    /// Shipping-country restriction (SHIPPING vouchers only; empty
    /// means unrestricted).
    pub countries: BTreeSet<CountryCode>,
    /// For product-scoped vouchers: discount only the cheapest
    /// matching unit instead of every matching unit.
    pub apply_once_per_order: bool,
    /// Each customer may hold at most one live reservation.
    pub apply_once_per_customer: bool,
    /// Scope for `SpecificProduct` vouchers.
    pub scope: DiscountScope,
}

impl Voucher {
    /// The name shown on checkouts: explicit name, else the code.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.code.to_string())
    }
}

// =============================================================================
// Cart Snapshot
// =============================================================================

/// A postal address, reduced to the single field the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Destination country.
    pub country: CountryCode,
}

/// A shipping method chosen for the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    /// Method identity.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Untaxed base price.
    pub price: Money,
}

/// A single cart line: a variant snapshot plus quantity.
///
/// `unit_base_price` freezes the price at the moment the line entered
/// the cart, so later catalog edits cannot shift a cart under the
/// customer mid-checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// The variant being bought.
    pub variant: ProductVariantRef,
    /// Units of the variant (≥ 1).
    pub quantity: u32,
    /// Frozen undiscounted unit price.
    pub unit_base_price: Money,
}

impl CartLine {
    /// Creates a line, freezing the variant's current base price.
    pub fn new(variant: ProductVariantRef, quantity: u32) -> Self {
        let unit_base_price = variant.base_price;
        CartLine {
            variant,
            quantity,
            unit_base_price,
        }
    }
}

/// The immutable input of one pricing pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Cart lines, in customer order.
    pub lines: Vec<CartLine>,
    /// Shipping destination, when known.
    pub shipping_address: Option<Address>,
    /// Billing address, when known.
    pub billing_address: Option<Address>,
    /// Chosen shipping method, when any line needs shipping.
    pub shipping_method: Option<ShippingMethod>,
    /// Attached voucher code, when any.
    pub voucher_code: Option<VoucherCode>,
    /// Authenticated customer, when any.
    pub customer_id: Option<CustomerId>,
}

impl CartSnapshot {
    /// Total quantity across all lines.
    pub fn quantity_total(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Whether any line needs physical shipping.
    pub fn is_shipping_required(&self) -> bool {
        self.lines.iter().any(|l| l.variant.is_shipping_required)
    }

    /// The cart currency, taken from the first line.
    pub fn currency(&self) -> Option<Currency> {
        self.lines.first().map(|l| l.unit_base_price.currency())
    }

    /// The country pricing should use: shipping address first, then
    /// billing address.
    pub fn country(&self) -> Option<CountryCode> {
        self.shipping_address
            .map(|a| a.country)
            .or_else(|| self.billing_address.map(|a| a.country))
    }
}

// =============================================================================
// Priced Output
// =============================================================================

/// One priced cart line: unit price after sales (pre-voucher) and the
/// taxed line total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLine {
    /// The input line this was priced from.
    pub line: CartLine,
    /// Post-sale, pre-voucher taxed unit price.
    pub unit_price: TaxedMoney,
    /// `unit_price × quantity`.
    pub line_total: TaxedMoney,
}

/// Which total a voucher discount was attributed to, so tax
/// recomputation uses the right net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountBucket {
    /// The discount reduces the line subtotal.
    Subtotal,
    /// The discount reduces the shipping price.
    Shipping,
}

/// The immutable output of one pricing pass.
///
/// ## Invariants
/// - `total.gross == subtotal.gross + shipping_total.gross − discount_total`,
///   never below zero
/// - `discount_total ≤ subtotal.gross + shipping_total.gross`
/// - `shipping_charge == shipping_total.gross` unless a shipping-bucket
///   discount applied, in which case it is the discounted charge
/// - every money value shares one currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedCheckout {
    /// Priced lines, in input order.
    pub lines: Vec<PricedLine>,
    /// Sum of line totals (post-sale, pre-voucher).
    pub subtotal: TaxedMoney,
    /// Taxed shipping price, pre-voucher.
    pub shipping_total: TaxedMoney,
    /// Shipping actually charged: gross shipping minus any
    /// shipping-bucket discount, clamped at zero.
    pub shipping_charge: Money,
    /// Applied voucher discount; zero when none applied.
    pub discount_total: Money,
    /// Where the discount was attributed.
    pub discount_bucket: Option<DiscountBucket>,
    /// Display name of the applied discount.
    pub discount_name: Option<String>,
    /// The applied voucher, when any.
    pub voucher_id: Option<VoucherId>,
    /// Grand total after the voucher discount.
    pub total: TaxedMoney,
}

// =============================================================================
// Usage Reservation
// =============================================================================

/// Lifecycle state of a voucher usage reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationState {
    /// Held against the usage limit; order not yet final.
    Reserved,
    /// Order reached a terminal state; counted in `used_count`.
    Committed,
    /// Cancelled or refunded; no longer counted.
    Released,
}

/// One voucher usage held for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReservation {
    /// The voucher being used.
    pub voucher_id: VoucherId,
    /// The order holding the use.
    pub order_id: OrderId,
    /// Customer who placed the order, when known (drives the
    /// once-per-customer check).
    pub customer_id: Option<CustomerId>,
    /// Current lifecycle state.
    pub state: ReservationState,
    /// When the reservation was created.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
