//! Money type for representing currency amounts
//!
//! Internally stores amounts as an integer count of minor units (cents) at a
//! fixed scale of two fractional digits, so arithmetic never touches binary
//! floating point. Division is only exposed through [`Money::mul_div_round`],
//! which rounds half-up (ties move away from zero, as BigDecimal's HALF_UP).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg};

use crate::error::{FintraxError, FintraxResult};

/// Number of fractional digits carried by every [`Money`] value
pub const SCALE: u32 = 2;

const MINOR_PER_MAJOR: i64 = 100;

/// Divide rounding half-up, ties away from zero. `den` must be non-zero.
pub(crate) fn div_round_half_up(num: i128, den: i128) -> i128 {
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    let quotient = num / den;
    let remainder = num % den;
    if 2 * remainder.abs() >= den {
        if num >= 0 {
            quotient + 1
        } else {
            quotient - 1
        }
    } else {
        quotient
    }
}

/// Represents a monetary amount stored as cents (hundredths of the currency unit)
///
/// The value itself may be negative (net balances, deltas). Amounts entered by
/// a user go through [`Money::amount`] or [`Money::parse_amount`], which only
/// accept strictly positive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a Money value from cents, any sign
    ///
    /// # Examples
    /// ```
    /// use fintrax::models::Money;
    /// let amount = Money::from_cents(1050); // $10.50
    /// assert_eq!(amount.to_decimal_string(), "10.50");
    /// ```
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create a strictly positive transaction amount from cents
    pub fn amount(cents: i64) -> FintraxResult<Self> {
        if cents <= 0 {
            return Err(FintraxError::InvalidAmount(format!(
                "amount must be greater than zero, got {}",
                Self(cents).to_decimal_string()
            )));
        }
        Ok(Self(cents))
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in cents
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Get the whole units portion (truncated toward zero)
    pub const fn units(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Get the cents portion (0-99)
    pub const fn cents_part(&self) -> i64 {
        (self.0 % MINOR_PER_MAJOR).abs()
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub const fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Addition that reports overflow instead of wrapping
    pub fn checked_add(self, other: Self) -> FintraxResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| FintraxError::InvalidAmount("addition overflow".into()))
    }

    /// Subtraction that reports overflow instead of wrapping
    pub fn checked_sub(self, other: Self) -> FintraxResult<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or_else(|| FintraxError::InvalidAmount("subtraction overflow".into()))
    }

    /// Sum every value, failing on the first overflow
    pub fn checked_sum<I: IntoIterator<Item = Self>>(values: I) -> FintraxResult<Self> {
        values
            .into_iter()
            .try_fold(Self::zero(), |acc, m| acc.checked_add(m))
    }

    /// Multiply by a scalar exactly
    pub fn checked_mul(self, factor: i64) -> FintraxResult<Self> {
        self.0
            .checked_mul(factor)
            .map(Self)
            .ok_or_else(|| FintraxError::InvalidAmount("multiplication overflow".into()))
    }

    /// Compute `self * numerator / denominator`, rounded half-up to the cent
    ///
    /// The product is formed in 128 bits so no precision is lost before the
    /// single rounding step.
    pub fn mul_div_round(self, numerator: i64, denominator: i64) -> FintraxResult<Self> {
        if denominator == 0 {
            return Err(FintraxError::InvalidAmount("division by zero".into()));
        }
        let scaled = div_round_half_up(
            i128::from(self.0) * i128::from(numerator),
            i128::from(denominator),
        );
        i64::try_from(scaled)
            .map(Self)
            .map_err(|_| FintraxError::InvalidAmount("division result out of range".into()))
    }

    /// Parse a signed decimal amount
    ///
    /// Accepts formats: "10.50", "-10.50", "$10.50", "10", "10.5". More than
    /// two fractional digits is rejected rather than silently truncated.
    pub fn parse(s: &str) -> FintraxResult<Self> {
        let malformed = || FintraxError::InvalidAmount(format!("malformed amount: '{}'", s));
        let trimmed = s.trim();

        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, trimmed),
        };
        let rest = rest.strip_prefix('$').unwrap_or(rest);

        let (whole, fraction) = match rest.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (rest, ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }
        if fraction.len() > SCALE as usize || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }

        let units: i64 = whole.parse().map_err(|_| malformed())?;
        let fraction_cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| malformed())? * 10,
            _ => fraction.parse().map_err(|_| malformed())?,
        };

        let cents = units
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|c| c.checked_add(fraction_cents))
            .ok_or_else(malformed)?;

        Ok(Self(if negative { -cents } else { cents }))
    }

    /// Parse a strictly positive transaction amount
    pub fn parse_amount(s: &str) -> FintraxResult<Self> {
        let parsed = Self::parse(s)?;
        Self::amount(parsed.0)
    }

    /// Render with exactly two fractional digits and no symbol ("-12.05")
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }

    /// Format with a currency symbol
    pub fn format_with_symbol(&self, symbol: &str) -> String {
        if self.is_negative() {
            format!("-{}{}", symbol, self.abs().to_decimal_string())
        } else {
            format!("{}{}", symbol, self.to_decimal_string())
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with_symbol("$"))
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

/// A percentage stored in hundredths of a percent (basis points)
///
/// `Percentage::from_basis_points(1234)` is 12.34%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(i64);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);
    pub const HUNDRED: Percentage = Percentage(10_000);

    pub const fn from_basis_points(bp: i64) -> Self {
        Self(bp)
    }

    pub const fn basis_points(&self) -> i64 {
        self.0
    }

    /// `part / whole * 100`, rounded half-up to 0.01%; `None` when `whole` is zero
    pub fn ratio(part: Money, whole: Money) -> Option<Self> {
        if whole.is_zero() {
            return None;
        }
        let bp = div_round_half_up(
            i128::from(part.cents()) * 10_000,
            i128::from(whole.cents()),
        );
        i64::try_from(bp).ok().map(Self)
    }

    /// Change from `previous` to `current` relative to `|previous|`
    ///
    /// Computed in 128 bits; `None` when `previous` is zero or the result
    /// does not fit.
    pub fn change(current: Money, previous: Money) -> Option<Self> {
        if previous.is_zero() {
            return None;
        }
        let delta = i128::from(current.cents()) - i128::from(previous.cents());
        let bp = div_round_half_up(delta * 10_000, i128::from(previous.cents()).abs());
        i64::try_from(bp).ok().map(Self)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}%", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Add for Percentage {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl std::iter::Sum for Percentage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Percentage::ZERO, |acc, p| acc + p)
    }
}
