use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;

/// internal precision kept on every money value before presentation rounding
pub const INTERNAL_SCALE: u32 = 8;

/// presentation precision for currency amounts
pub const CURRENCY_SCALE: u32 = 2;

/// largest principal or single payment, in major units
///
/// Keeps every derived figure (flat interest, moratory interest over the
/// whole calendar range, ledger sums) far inside the 96-bit decimal range.
pub const MAX_AMOUNT_MAJOR: i64 = 1_000_000_000_000_000;

/// largest annual rate accepted anywhere, in percent
pub const MAX_RATE_PERCENT: u32 = 10_000;

/// Money type backed by a decimal, never a binary float
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);
    pub const CENT: Money = Money(Decimal::from_parts(1, 0, 0, false, 2));

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(INTERNAL_SCALE))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?.round_dp(INTERNAL_SCALE)))
    }

    /// create from integer amount (pesos, dollars, etc)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// create from minor amount (cents); scales above 28 are rejected
    pub fn from_minor(amount: i64, scale: u32) -> Result<Self, rust_decimal::Error> {
        Ok(Money::from_decimal(Decimal::try_new(amount, scale)?))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// above [`MAX_AMOUNT_MAJOR`]
    pub fn exceeds_max_amount(&self) -> bool {
        self.0 > Decimal::from(MAX_AMOUNT_MAJOR)
    }

    /// round half-up (midpoint away from zero) to the given scale
    pub fn round_half_up(&self, dp: u32) -> Self {
        Money(self.0.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
    }

    /// round half-up to whole cents
    pub fn round_cents(&self) -> Self {
        self.round_half_up(CURRENCY_SCALE)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// strictly less than zero
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// subtraction floored at zero
    pub fn saturating_sub(self, other: Self) -> Self {
        (self - other).max(Money::ZERO)
    }

    /// apply a rate to this amount (e.g., 10% of 1000 is 100)
    pub fn percentage(&self, rate: Rate) -> Self {
        Money::from_decimal(self.0 * rate.as_decimal())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl From<u32> for Money {
    fn from(i: u32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money((self.0 + other.0).round_dp(INTERNAL_SCALE))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = (self.0 + other.0).round_dp(INTERNAL_SCALE);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money((self.0 - other.0).round_dp(INTERNAL_SCALE))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 = (self.0 - other.0).round_dp(INTERNAL_SCALE);
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money((self.0 * other).round_dp(INTERNAL_SCALE))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money((self.0 / other).round_dp(INTERNAL_SCALE))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

/// rate type for interest rates, stored as a fraction (0.12 is 12%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);
    pub const ONE: Rate = Rate(Decimal::ONE);

    /// create from decimal fraction (e.g., 0.05 for 5%)
    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from whole percentage (e.g., 5 for 5%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::from(100))
    }

    /// create from a decimal percentage (e.g., 12.5 for 12.5%)
    pub fn from_percent_decimal(p: Decimal) -> Self {
        Rate(p / Decimal::from(100))
    }

    /// create from basis points (e.g., 500 for 5%)
    pub fn from_bps(bps: u32) -> Self {
        Rate(Decimal::from(bps) / Decimal::from(10000))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::from(100)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// above [`MAX_RATE_PERCENT`]
    pub fn exceeds_max_rate(&self) -> bool {
        self.as_percentage() > Decimal::from(MAX_RATE_PERCENT)
    }

    /// daily rate from annual rate on the given day-count basis
    pub fn daily_rate(&self, basis: u32) -> Rate {
        Rate(self.0 / Decimal::from(basis))
    }

    /// monthly rate from annual rate
    pub fn monthly_rate(&self) -> Rate {
        Rate(self.0 / Decimal::from(12))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_decimal(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.123456789").unwrap();
        assert_eq!(m.to_string(), "100.12345679"); // rounded to 8 places
    }

    #[test]
    fn test_half_up_rounding() {
        // banker's rounding would give 0.12 here
        assert_eq!(Money::from_decimal(dec!(0.125)).round_cents(), Money::from_decimal(dec!(0.13)));
        assert_eq!(Money::from_decimal(dec!(0.135)).round_cents(), Money::from_decimal(dec!(0.14)));
        assert_eq!(Money::from_decimal(dec!(88.84878867)).round_cents(), Money::from_decimal(dec!(88.85)));
    }

    #[test]
    fn test_cent_constant() {
        assert_eq!(Money::from_minor(1, 2).unwrap(), Money::CENT);
        assert_eq!(Money::from_minor(110_000, 2).unwrap(), Money::from_major(1_100));
        assert!(Money::from_minor(1, 29).is_err());
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        let owed = Money::from_major(50);
        assert_eq!(owed.saturating_sub(Money::from_major(80)), Money::ZERO);
        assert_eq!(owed.saturating_sub(Money::from_major(20)), Money::from_major(30));
    }

    #[test]
    fn test_percentage() {
        let principal = Money::from_major(1_000);
        let flat = Rate::from_percent_decimal(dec!(10));
        assert_eq!(principal.percentage(flat), Money::from_major(100));
    }

    #[test]
    fn test_rate_conversions() {
        let rate = Rate::from_percent_decimal(dec!(12));
        assert_eq!(rate.monthly_rate().as_decimal(), dec!(0.01));
        assert_eq!(rate, Rate::from_percentage(12));
        assert_eq!(Rate::from_bps(1200), rate);
        assert_eq!(rate.to_string(), "12%");
    }

    #[test]
    fn test_limits() {
        assert!(!Money::from_major(MAX_AMOUNT_MAJOR).exceeds_max_amount());
        assert!((Money::from_major(MAX_AMOUNT_MAJOR) + Money::CENT).exceeds_max_amount());
        assert!(!Rate::from_percentage(MAX_RATE_PERCENT).exceeds_max_rate());
        assert!(Rate::from_percent_decimal(dec!(10000.01)).exceeds_max_rate());
    }

    #[test]
    fn test_sum() {
        let amounts = vec![Money::from_major(100), Money::from_minor(5050, 2).unwrap()];
        let total: Money = amounts.iter().sum();
        assert_eq!(total, Money::from_decimal(dec!(150.50)));
    }
}
