//! # Tax Adapter
//!
//! The single seam between the engine and whatever computes taxes.
//!
//! ## Degrade-and-Flag
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Tax Call Flow                                     │
//! │                                                                         │
//! │  net Money ──► TaxAdapter::apply ──► TaxPlugin::apply_taxes            │
//! │                      │                     │                            │
//! │                      │          Ok(TaxedMoney) ──► pass through        │
//! │                      │                     │                            │
//! │                      │          Err(Timeout / Plugin) ──► WARN log     │
//! │                      │                     │                            │
//! │                      └──────── {net, gross = net} + degraded flag      │
//! │                                                                         │
//! │  A tax outage slows nobody's checkout: the pass completes untaxed      │
//! │  and the outcome carries `degraded_tax = true` for the caller.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The adapter is stateless from the engine's perspective; plugin
//! discovery, caching and the bounded call timeout live inside the
//! plugin implementation.

use rust_decimal::Decimal;
use tracing::warn;

use atlas_core::money::{quantize, Money, TaxedMoney};
use atlas_core::types::CountryCode;

use crate::error::TaxError;

// =============================================================================
// Tax Plugin
// =============================================================================

/// Converts a net amount into a net/gross pair for a destination country.
///
/// `tax_code` is an optional product-category hint (e.g. reduced-rate
/// goods); plugins may ignore it.
pub trait TaxPlugin: Send + Sync {
    /// Grosses up `net` for `country`.
    fn apply_taxes(
        &self,
        net: Money,
        country: CountryCode,
        tax_code: Option<&str>,
    ) -> Result<TaxedMoney, TaxError>;
}

/// The default plugin: no taxes, `gross == net`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTax;

impl TaxPlugin for IdentityTax {
    fn apply_taxes(
        &self,
        net: Money,
        _country: CountryCode,
        _tax_code: Option<&str>,
    ) -> Result<TaxedMoney, TaxError> {
        Ok(TaxedMoney::from_net(net))
    }
}

/// A VAT-style plugin: one flat rate for every country and category.
///
/// `gross = round(net × (1 + rate), 4)` where `rate` is a fraction
/// (`0.23` for 23% VAT).
#[derive(Debug, Clone, Copy)]
pub struct FlatRateTax {
    rate: Decimal,
}

impl FlatRateTax {
    /// Creates a flat-rate plugin from a fractional rate.
    pub fn new(rate: Decimal) -> Self {
        FlatRateTax { rate }
    }

    /// Creates a flat-rate plugin from a percentage, e.g. `23` for 23%.
    pub fn from_percentage(pct: Decimal) -> Self {
        FlatRateTax {
            rate: pct / Decimal::ONE_HUNDRED,
        }
    }
}

impl TaxPlugin for FlatRateTax {
    fn apply_taxes(
        &self,
        net: Money,
        _country: CountryCode,
        _tax_code: Option<&str>,
    ) -> Result<TaxedMoney, TaxError> {
        let gross_amount = quantize(net.amount() * (Decimal::ONE + self.rate));
        let gross = Money::new(gross_amount, net.currency())?;
        Ok(TaxedMoney::new(net, gross)?)
    }
}

impl From<atlas_core::MoneyError> for TaxError {
    fn from(err: atlas_core::MoneyError) -> Self {
        TaxError::Plugin(err.to_string())
    }
}

// =============================================================================
// Tax Adapter
// =============================================================================

/// Wraps a plugin with the engine's failure policy.
///
/// Every plugin failure, timeout or otherwise, degrades to identity
/// tax; the returned flag tells the pipeline to mark the outcome.
pub struct TaxAdapter {
    plugin: Box<dyn TaxPlugin>,
}

impl TaxAdapter {
    /// Wraps a plugin.
    pub fn new(plugin: Box<dyn TaxPlugin>) -> Self {
        TaxAdapter { plugin }
    }

    /// The identity adapter (no plugin configured).
    pub fn identity() -> Self {
        TaxAdapter {
            plugin: Box::new(IdentityTax),
        }
    }

    /// Taxes `net`, degrading on plugin failure.
    ///
    /// Returns the taxed pair and whether degradation happened.
    pub fn apply(
        &self,
        net: Money,
        country: CountryCode,
        tax_code: Option<&str>,
    ) -> (TaxedMoney, bool) {
        match self.plugin.apply_taxes(net, country, tax_code) {
            Ok(taxed) => (taxed, false),
            Err(err) => {
                warn!(country = %country, error = %err, "tax plugin failed, degrading to identity");
                (TaxedMoney::from_net(net), true)
            }
        }
    }
}

impl std::fmt::Debug for TaxAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxAdapter").finish_non_exhaustive()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
