//! # Cart Pricing Pipeline
//!
//! One deterministic pass from a cart snapshot to a priced checkout.
//!
//! ## Pass Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       One Pricing Pass                                  │
//! │                                                                         │
//! │  CartSnapshot                                                           │
//! │      │                                                                  │
//! │      ├─ 1. build SaleIndex from sales active now                       │
//! │      ├─ 2. per line: base price ──sales──► unit ──tax──► TaxedMoney    │
//! │      ├─ 3. subtotal = Σ line totals;  shipping priced & taxed          │
//! │      ├─ 4. voucher looked up & judged against post-sale amounts        │
//! │      └─ 5. compose: clamp discount, check the total equation           │
//! │      ▼                                                                  │
//! │  PricingOutcome { checkout, rejection?, sale names, degraded_tax }     │
//! │                                                                         │
//! │  Same snapshot + same instant + same catalog ⇒ identical outcome.      │
//! │  The pass never mutates anything: reservation happens separately,      │
//! │  at order placement.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use tracing::debug;

use atlas_core::error::VoucherRejection;
use atlas_core::money::{Currency, TaxedMoney};
use atlas_core::types::{CartSnapshot, CountryCode, PricedCheckout, PricedLine};

use crate::catalog::CatalogSource;
use crate::compose::compose;
use crate::error::{PricingError, PricingResult};
use crate::ledger::UsageView;
use crate::sales::{resolve_unit, SaleIndex};
use crate::tax::TaxAdapter;
use crate::voucher::{evaluate, EvaluationContext};

// =============================================================================
// Engine Config
// =============================================================================

/// Store-level defaults the pipeline falls back on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Currency of an empty cart (every non-empty cart dictates its own).
    pub currency: Currency,
    /// Tax/eligibility country when the cart carries no address.
    pub default_country: CountryCode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            currency: Currency::USD,
            default_country: CountryCode::US,
        }
    }
}

// =============================================================================
// Pricing Outcome
// =============================================================================

/// Everything one pricing pass produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingOutcome {
    /// The canonical money record for this cart.
    pub checkout: PricedCheckout,
    /// Why the attached voucher did not apply; `None` when it applied
    /// or no code was attached. The checkout is valid either way.
    pub rejection: Option<VoucherRejection>,
    /// Names of sales that won on at least one line, deduplicated, in
    /// line order. Storefronts show these beside the prices.
    pub applied_sales: Vec<String>,
    /// True when the tax plugin failed and identity tax was substituted.
    pub degraded_tax: bool,
}

// =============================================================================
// The Pass
// =============================================================================

/// Runs one pricing pass.
///
/// Fails only on malformed input (unknown voucher code) or an internal
/// invariant breach; voucher ineligibility is reported in the outcome,
/// never as an error.
pub fn run(
    cart: &CartSnapshot,
    catalog: &dyn CatalogSource,
    tax: &TaxAdapter,
    usage: &dyn UsageView,
    config: &EngineConfig,
    at: DateTime<Utc>,
) -> PricingResult<PricingOutcome> {
    let currency = cart.currency().unwrap_or(config.currency);
    let country = cart.country().unwrap_or(config.default_country);
    let index = SaleIndex::build(catalog.list_active_sales(at), at);

    let mut degraded_tax = false;
    let mut applied_sales: Vec<String> = Vec::new();
    let mut lines: Vec<PricedLine> = Vec::with_capacity(cart.lines.len());
    let mut subtotal = TaxedMoney::zero(currency);

    for line in &cart.lines {
        let resolved = resolve_unit(&line.variant, line.unit_base_price, &index);
        if let Some(sale) = resolved.winning_sale {
            if !applied_sales.iter().any(|name| name == &sale.name) {
                applied_sales.push(sale.name.clone());
            }
        }

        let tax_code = line.variant.product_type_id.to_string();
        let (unit_price, unit_degraded) =
            tax.apply(resolved.price, country, Some(tax_code.as_str()));
        degraded_tax |= unit_degraded;

        let line_total = unit_price.mul_quantity(line.quantity);
        subtotal = subtotal.checked_add(&line_total)?;
        lines.push(PricedLine {
            line: line.clone(),
            unit_price,
            line_total,
        });
    }

    let shipping_total = price_shipping(cart, tax, country, currency, &mut degraded_tax);

    let (discount, rejection) = match &cart.voucher_code {
        None => (None, None),
        Some(code) => {
            let voucher = catalog
                .lookup_voucher(code)
                .ok_or_else(|| PricingError::UnknownVoucherCode(code.to_string()))?;
            let ctx = EvaluationContext {
                cart,
                lines: &lines,
                subtotal,
                shipping: shipping_total,
                at,
                default_country: Some(config.default_country),
            };
            match evaluate(&voucher, &ctx, usage) {
                Ok(discount) => (Some(discount), None),
                Err(rejection) => {
                    debug!(voucher = %code, %rejection, "voucher rejected");
                    (None, Some(rejection))
                }
            }
        }
    };

    let checkout = compose(lines, subtotal, shipping_total, discount)?;
    Ok(PricingOutcome {
        checkout,
        rejection,
        applied_sales,
        degraded_tax,
    })
}

/// Shipping is priced only when some line needs it and a method is
/// chosen; digital carts ship for zero.
fn price_shipping(
    cart: &CartSnapshot,
    tax: &TaxAdapter,
    country: CountryCode,
    currency: Currency,
    degraded_tax: &mut bool,
) -> TaxedMoney {
    if !cart.is_shipping_required() {
        return TaxedMoney::zero(currency);
    }
    match &cart.shipping_method {
        Some(method) => {
            let (taxed, degraded) = tax.apply(method.price, country, None);
            *degraded_tax |= degraded;
            taxed
        }
        None => TaxedMoney::zero(currency),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
