use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const BASE_CURRENCY_CODE: &str = "USD";
pub const MICROS_PER_UNIT: i64 = 1_000_000;

//--------------------------------------        Money        ---------------------------------------------------------
/// An amount of the base currency, stored as a whole number of micro-units (1e-6 USD).
///
/// All balance arithmetic is done on the integer representation. Floating point only enters the picture when a
/// percentage or an exchange rate is applied, and the result is rounded half away from zero to the nearest micro-unit.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as Money: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<f64> for Money {
    type Error = MoneyConversionError;

    /// Converts a decimal amount of the base currency (e.g. `4.50`) into `Money`.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let micros = (value * MICROS_PER_UNIT as f64).round();
        if !micros.is_finite() || micros.abs() > i64::MAX as f64 {
            return Err(MoneyConversionError(format!("{value} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(micros as i64))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:0.2}", self.to_f64())
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Create an amount from whole base-currency units
    pub fn from_units(units: i64) -> Self {
        Self(units * MICROS_PER_UNIT)
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / MICROS_PER_UNIT as f64
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `self * percent / 100`, rounded to the nearest micro-unit.
    pub fn percent(&self, percent: f64) -> Self {
        Self::scale(self.0, percent / 100.0)
    }

    /// Multiply by an exchange rate, e.g. to express a USD amount in RUB micro-units.
    pub fn convert_at(&self, rate: f64) -> Self {
        Self::scale(self.0, rate)
    }

    /// Divide by an exchange rate, e.g. to bring a RUB amount back into the base currency.
    /// A non-positive rate yields zero.
    pub fn convert_from(&self, rate: f64) -> Self {
        if rate <= 0.0 || !rate.is_finite() {
            return Self::default();
        }
        Self::scale(self.0, 1.0 / rate)
    }

    /// Exact `self * numerator / denominator` on the integer representation, rounded half away from zero.
    pub fn mul_div(&self, numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return Self::default();
        }
        let product = i128::from(self.0) * i128::from(numerator);
        let den = i128::from(denominator);
        let sign = product.signum() * den.signum();
        let quotient = (product.abs() + den.abs() / 2) / den.abs();
        #[allow(clippy::cast_possible_truncation)]
        Self((sign * quotient) as i64)
    }

    fn scale(micros: i64, factor: f64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self((micros as f64 * factor).round() as i64)
    }
}
