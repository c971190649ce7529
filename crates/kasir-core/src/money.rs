//! # Money Module
//!
//! Provides the `Money` type for every monetary field in Kasir POS.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (cents)                              │
//! │    12500.50 is stored as 1_250_050                                      │
//! │    Every price, line total and change amount is exact to the cent      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pricing in this system only ever adds, subtracts and multiplies by whole
//! quantities, so no operation here needs rounding.
//!
//! ## Usage
//! ```rust
//! use kasir_core::money::Money;
//!
//! let price = Money::from_cents(350_000); // 3500.00
//! let line = price * 3;                   // 10500.00
//! let change = (Money::from_cents(1_000_000) - line).clamp_to_zero();
//! assert_eq!(change, Money::zero()); // paid 10000.00 against 10500.00
//!
//! let parsed: Money = "12.50".parse().unwrap();
//! assert_eq!(parsed.cents(), 1250);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in minor units (cents), exposed with two fractional digits.
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate values such as `payment - total` may go
///   negative before being clamped; stored fields never are
/// - **Single field tuple struct**: zero-cost wrapper over i64
/// - **Serialized as integer cents**: the wire never carries floats
///
/// ## Where Money Flows
/// ```text
/// Item.retail_selling_price ──┐
/// Item.wholesale_selling_price┴─► LineItem.unit_price ──► LineItem.total_price
///                                                              │
///                       Transaction.subtotal ◄─────────────────┘
///                              │
///            + tax_amount − discount_amount ──► total_amount
///                              │
///            max(0, payment_amount − total_amount) ──► change_amount
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns `max(0, self)`.
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// let short = Money::from_cents(1000) - Money::from_cents(1600);
    /// assert_eq!(short.clamp_to_zero(), Money::zero());
    /// ```
    #[inline]
    pub const fn clamp_to_zero(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Multiplies money by a quantity, returning `None` on overflow.
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Adds two amounts, returning `None` on overflow.
    ///
    /// Totals built from caller-supplied amounts go through here; the `+`
    /// operator is for values already known to be in range.
    ///
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(150).checked_add(Money::from_cents(50)), Some(Money::from_cents(200)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
    /// ```
    #[inline]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Subtracts `other`, returning `None` on overflow.
    #[inline]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal with exactly two fractional digits: `1234.50`, `-5.50`.
///
/// Currency symbols and grouping are a presentation concern.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

/// Parses decimal text such as `"15000"`, `"12.5"` or `"-3.75"`.
///
/// More than two fractional digits is rejected rather than rounded.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (digits, ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a decimal number"));
        }
        if frac.len() > 2 {
            return Err(invalid("at most 2 fractional digits are allowed"));
        }
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a decimal number"));
        }

        let major: i64 = whole.parse().map_err(|_| invalid("amount is too large"))?;
        let minor: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid("expected a decimal number"))? * 10,
            _ => frac.parse().map_err(|_| invalid("expected a decimal number"))?,
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
