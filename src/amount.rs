use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use std::fmt::{self, Display};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// An exact monetary quantity.
///
/// Every money field of the model is carried as an `Amount` from the
/// moment it is deserialized, plain numbers are never used for
/// arithmetic after ingestion.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub fn new(d: Decimal) -> Amount {
        Amount(d)
    }

    /// Returns the underlying decimal.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Return the amount in absolute value
    pub fn abs(self) -> Amount {
        Amount(self.0.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// True for amounts strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// -1, 0 or 1.
    pub fn signum(&self) -> Amount {
        if self.is_negative() {
            Amount(Decimal::NEGATIVE_ONE)
        } else if self.is_positive() {
            Amount(Decimal::ONE)
        } else {
            Amount::ZERO
        }
    }

    /// The single place where a missing value becomes zero. Reducers
    /// that may index past the end of a series go through here before
    /// doing any arithmetic.
    pub fn or_zero(a: Option<Amount>) -> Amount {
        a.unwrap_or(Amount::ZERO)
    }

    /// Like `or_zero` but for borrowed lookups.
    pub fn or_zero_ref(a: Option<&Amount>) -> Amount {
        a.copied().unwrap_or(Amount::ZERO)
    }
}

impl From<Decimal> for Amount {
    fn from(d: Decimal) -> Self {
        Amount(d)
    }
}

impl From<i64> for Amount {
    fn from(n: i64) -> Self {
        Amount(Decimal::from(n))
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Amount)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Self::Output {
        Amount(-self.0)
    }
}

impl Add<Amount> for Amount {
    type Output = Amount;
    fn add(self, rhs: Amount) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl Add<&Amount> for Amount {
    type Output = Amount;
    fn add(self, rhs: &Amount) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl Sub<Amount> for Amount {
    type Output = Amount;
    fn sub(self, rhs: Amount) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl Sub<&Amount> for Amount {
    type Output = Amount;
    fn sub(self, rhs: &Amount) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl AddAssign<Amount> for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl AddAssign<&Amount> for Amount {
    fn add_assign(&mut self, rhs: &Amount) {
        self.0 += rhs.0;
    }
}

impl SubAssign<Amount> for Amount {
    fn sub_assign(&mut self, rhs: Amount) {
        self.0 -= rhs.0;
    }
}

impl Sum<Amount> for Amount {
    fn sum<I>(iter: I) -> Self
    where
        I: Iterator<Item = Amount>,
    {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I>(iter: I) -> Self
    where
        I: Iterator<Item = &'a Amount>,
    {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

/// Serializes an `Amount` as a plain JSON number, for chart consumers
/// that only understand floats. Use with `#[serde(with = ...)]`.
pub mod float {
    use rust_decimal::Decimal;
    use serde::{Deserializer, Serializer};

    use super::Amount;

    pub fn serialize<S>(a: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        rust_decimal::serde::float::serialize(&a.0, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        let d: Decimal = rust_decimal::serde::float::deserialize(deserializer)?;
        Ok(Amount(d))
    }
}
