//! # Money Module
//!
//! Provides `Money`, `TaxedMoney` and `TaxedMoneyRange` for handling
//! monetary values safely.
//!
//! ## Why Fixed Decimals?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: decimal(12,4) via rust_decimal                          │
//! │    Every amount is a fixed-precision decimal quantized to 4 places.    │
//! │    Rounding happens at exactly one place (`quantize`), half-up,        │
//! │    and only after percentage multiplication.                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use atlas_core::money::{Currency, Money};
//! use rust_decimal::Decimal;
//!
//! let price = Money::new(Decimal::new(100000, 4), Currency::USD).unwrap();
//! let line = price.mul_quantity(2);
//! assert_eq!(line.to_string(), "20.0000 USD");
//!
//! // Mixed currencies are rejected, never silently converted:
//! let euros = Money::new(Decimal::ONE, Currency::EUR).unwrap();
//! assert!(line.checked_add(&euros).is_err());
//! ```

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{MoneyError, MoneyResult};

/// Decimal places carried by every money amount (decimal(12,4)).
pub const MONEY_SCALE: u32 = 4;

/// Rounds a raw decimal to money scale, half-up.
///
/// This is the single rounding site for the whole engine. Percentage
/// discounts, tax grossing-up and everything else funnel through here.
#[inline]
pub fn quantize(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Currency
// =============================================================================

/// An ISO-4217 currency code (three uppercase ASCII letters).
///
/// Stored as raw bytes so `Money` stays `Copy`-cheap and hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency([u8; 3]);

impl Currency {
    /// United States dollar.
    pub const USD: Currency = Currency(*b"USD");
    /// Euro.
    pub const EUR: Currency = Currency(*b"EUR");
    /// Pound sterling.
    pub const GBP: Currency = Currency(*b"GBP");

    /// Parses a three-letter code; accepts lowercase input.
    pub fn from_code(code: &str) -> Option<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return None;
        }
        let mut out = [0u8; 3];
        for (slot, b) in out.iter_mut().zip(bytes) {
            *slot = b.to_ascii_uppercase();
        }
        Some(Currency(out))
    }

    /// Returns the code as text, e.g. `"USD"`.
    pub fn code(&self) -> &str {
        // Constructor guarantees ASCII letters.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Currency::from_code(&code)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid currency code: {code}")))
    }
}

// =============================================================================
// Money
// =============================================================================

/// A monetary value: fixed-precision amount plus currency.
///
/// ## Arithmetic Contract
/// - Equality is exact decimal equality; ordering is total, by
///   currency first and amount second.
/// - Mixed-currency operations fail with [`MoneyError::CurrencyMismatch`].
/// - Multiplication by an integer quantity is exact.
/// - Multiplication by a percentage rounds half-up at 4 places.
/// - Division is deliberately not exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    currency: Currency,
    amount: Decimal,
}

impl Money {
    /// Creates a money value, quantized to 4 decimal places.
    ///
    /// Fails with [`MoneyError::NegativeAmount`]: only discount paths may
    /// go below zero, and those clamp instead.
    pub fn new(amount: Decimal, currency: Currency) -> MoneyResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::NegativeAmount { amount });
        }
        Ok(Money {
            currency,
            amount: quantize(amount),
        })
    }

    /// Creates a money value from whole major units, e.g. `from_major(10)`
    /// is `10.0000`.
    pub fn from_major(major: u32, currency: Currency) -> Self {
        Money {
            currency,
            amount: Decimal::from(major),
        }
    }

    /// Zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Money {
            currency,
            amount: Decimal::ZERO,
        }
    }

    /// The decimal amount.
    #[inline]
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// The currency.
    #[inline]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Fails unless `other` is in the same currency.
    fn require_same_currency(&self, other: &Money) -> MoneyResult<()> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        Ok(())
    }

    /// Adds two amounts of the same currency.
    pub fn checked_add(&self, other: &Money) -> MoneyResult<Money> {
        self.require_same_currency(other)?;
        Ok(Money {
            currency: self.currency,
            amount: self.amount + other.amount,
        })
    }

    /// Subtracts `other`, failing with `NegativeAmount` if the result
    /// would drop below zero. Discount paths use [`Money::saturating_sub`].
    pub fn checked_sub(&self, other: &Money) -> MoneyResult<Money> {
        self.require_same_currency(other)?;
        let amount = self.amount - other.amount;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::NegativeAmount { amount });
        }
        Ok(Money {
            currency: self.currency,
            amount,
        })
    }

    /// Subtracts `other`, clamping at zero.
    ///
    /// This is the discount primitive: a discount larger than the price
    /// yields a free unit, never a negative one.
    pub fn saturating_sub(&self, other: &Money) -> MoneyResult<Money> {
        self.require_same_currency(other)?;
        let amount = (self.amount - other.amount).max(Decimal::ZERO);
        Ok(Money {
            currency: self.currency,
            amount,
        })
    }

    /// Multiplies by an integer quantity. Exact: no rounding occurs.
    pub fn mul_quantity(&self, quantity: u32) -> Money {
        Money {
            currency: self.currency,
            amount: self.amount * Decimal::from(quantity),
        }
    }

    /// Takes a percentage of this amount: `round_half_up(amount × pct / 100, 4)`.
    ///
    /// The result clamps at zero, so a negative `pct` (a keep-fraction
    /// derived from a discount above 100%) yields a free amount rather
    /// than a negative one.
    pub fn percentage(&self, pct: Decimal) -> Money {
        Money {
            currency: self.currency,
            amount: quantize(self.amount * pct / Decimal::ONE_HUNDRED).max(Decimal::ZERO),
        }
    }

    /// The smaller of two amounts in the same currency.
    pub fn min_with(&self, other: &Money) -> MoneyResult<Money> {
        self.require_same_currency(other)?;
        Ok(if other.amount < self.amount {
            *other
        } else {
            *self
        })
    }
}

/// Display renders the amount at money scale followed by the code,
/// e.g. `10.0000 USD`. Locale-aware formatting is a caller concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} {}", self.amount, self.currency)
    }
}

// =============================================================================
// TaxedMoney
// =============================================================================

/// A net/gross pair in one currency, with `net ≤ gross`.
///
/// Both sides always move together: discounts and percentage scaling
/// apply to net and gross alike, so the pair never diverges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxedMoney {
    net: Money,
    gross: Money,
}

impl TaxedMoney {
    /// Creates a pair, enforcing same-currency and `net ≤ gross`.
    pub fn new(net: Money, gross: Money) -> MoneyResult<Self> {
        net.require_same_currency(&gross)?;
        if net.amount > gross.amount {
            return Err(MoneyError::NetAboveGross {
                net: net.amount,
                gross: gross.amount,
            });
        }
        Ok(TaxedMoney { net, gross })
    }

    /// An untaxed pair: `gross == net`.
    pub fn from_net(net: Money) -> Self {
        TaxedMoney { net, gross: net }
    }

    /// Zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        TaxedMoney::from_net(Money::zero(currency))
    }

    /// The net side.
    #[inline]
    pub fn net(&self) -> Money {
        self.net
    }

    /// The gross side.
    #[inline]
    pub fn gross(&self) -> Money {
        self.gross
    }

    /// The tax portion: `gross − net`.
    pub fn tax(&self) -> Money {
        Money {
            currency: self.gross.currency,
            amount: self.gross.amount - self.net.amount,
        }
    }

    /// The currency shared by both sides.
    #[inline]
    pub fn currency(&self) -> Currency {
        self.net.currency
    }

    /// Adds two pairs componentwise.
    pub fn checked_add(&self, other: &TaxedMoney) -> MoneyResult<TaxedMoney> {
        Ok(TaxedMoney {
            net: self.net.checked_add(&other.net)?,
            gross: self.gross.checked_add(&other.gross)?,
        })
    }

    /// Multiplies both sides by an integer quantity. Exact.
    pub fn mul_quantity(&self, quantity: u32) -> TaxedMoney {
        TaxedMoney {
            net: self.net.mul_quantity(quantity),
            gross: self.gross.mul_quantity(quantity),
        }
    }

    /// Subtracts a fixed discount from both sides, clamping at zero.
    ///
    /// Net is additionally capped at gross so the pair invariant holds
    /// even when the clamp bites only one side.
    pub fn apply_fixed_discount(&self, discount: &Money) -> MoneyResult<TaxedMoney> {
        let gross = self.gross.saturating_sub(discount)?;
        let net = self.net.saturating_sub(discount)?.min_with(&gross)?;
        Ok(TaxedMoney { net, gross })
    }

    /// Keeps `pct` percent *off*: both sides are reduced by the
    /// percentage and rounded at the end.
    pub fn apply_percentage_discount(&self, pct: Decimal) -> TaxedMoney {
        let keep = Decimal::ONE_HUNDRED - pct;
        TaxedMoney {
            net: self.net.percentage(keep),
            gross: self.gross.percentage(keep),
        }
    }
}

impl fmt::Display for TaxedMoney {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net {} / gross {}", self.net, self.gross)
    }
}

// =============================================================================
// TaxedMoneyRange
// =============================================================================

/// A price range between two taxed amounts, ordered on gross.
///
/// Used for catalog listings ("from X to Y") where variants of one
/// product carry different discounted prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxedMoneyRange {
    start: TaxedMoney,
    stop: TaxedMoney,
}

impl TaxedMoneyRange {
    /// Creates a range, enforcing same-currency and `start ≤ stop` on gross.
    pub fn new(start: TaxedMoney, stop: TaxedMoney) -> MoneyResult<Self> {
        start.gross.require_same_currency(&stop.gross)?;
        if start.gross.amount > stop.gross.amount {
            return Err(MoneyError::RangeInverted {
                start: start.gross.amount,
                stop: stop.gross.amount,
            });
        }
        Ok(TaxedMoneyRange { start, stop })
    }

    /// The cheapest end of the range.
    #[inline]
    pub fn start(&self) -> TaxedMoney {
        self.start
    }

    /// The most expensive end of the range.
    #[inline]
    pub fn stop(&self) -> TaxedMoney {
        self.stop
    }

    /// Widens the range to include `price`.
    pub fn expand(&self, price: TaxedMoney) -> MoneyResult<TaxedMoneyRange> {
        self.start.gross.require_same_currency(&price.gross)?;
        let start = if price.gross.amount < self.start.gross.amount {
            price
        } else {
            self.start
        };
        let stop = if price.gross.amount > self.stop.gross.amount {
            price
        } else {
            self.stop
        };
        Ok(TaxedMoneyRange { start, stop })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
