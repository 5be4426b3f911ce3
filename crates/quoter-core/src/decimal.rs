//! Exact-decimal newtypes for prices and quantities.
//!
//! Ledgers, limits, and quotes never see binary floating point. The two
//! wrappers share their plumbing through `decimal_newtype!` and differ only
//! in the domain helpers below it.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

macro_rules! decimal_newtype {
    ($name:ident) => {
        impl $name {
            pub const ZERO: Self = Self(Decimal::ZERO);
            pub const ONE: Self = Self(Decimal::ONE);

            #[inline]
            pub fn new(value: Decimal) -> Self {
                Self(value)
            }

            #[inline]
            pub fn inner(&self) -> Decimal {
                self.0
            }

            #[inline]
            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            /// Strictly greater than zero.
            #[inline]
            pub fn is_positive(&self) -> bool {
                self.0 > Decimal::ZERO
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self> {
                Ok(Self(Decimal::from_str(s.trim())?))
            }
        }

        impl From<Decimal> for $name {
            fn from(value: Decimal) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Decimal {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }
    };
}

/// Quote-asset price per unit of base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

/// Base-asset quantity. Direction lives on `OrderSide`, never in the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(pub Decimal);

decimal_newtype!(Price);
decimal_newtype!(Size);

impl Price {
    /// Reject zero and negative prices.
    pub fn try_positive(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(CoreError::InvalidPrice(value.to_string()))
        }
    }

    /// Largest multiple of `tick` not above this price. A zero tick is a no-op.
    #[inline]
    pub fn floor_to_tick(&self, tick: Price) -> Self {
        if tick.is_zero() {
            *self
        } else {
            Self((self.0 / tick.0).floor() * tick.0)
        }
    }

    /// Smallest multiple of `tick` not below this price. A zero tick is a no-op.
    #[inline]
    pub fn ceil_to_tick(&self, tick: Price) -> Self {
        if tick.is_zero() {
            *self
        } else {
            Self((self.0 / tick.0).ceil() * tick.0)
        }
    }

    /// Arithmetic midpoint of two prices.
    #[inline]
    pub fn midpoint(a: Price, b: Price) -> Self {
        Self((a.0 + b.0) / Decimal::TWO)
    }
}

impl Size {
    /// Reject zero and negative quantities.
    pub fn try_positive(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(CoreError::InvalidSize(value.to_string()))
        }
    }

    /// Quote-asset value of this quantity at `price`.
    #[inline]
    pub fn notional(&self, price: Price) -> Result<Decimal> {
        self.0
            .checked_mul(price.0)
            .ok_or_else(|| CoreError::Overflow(format!("{} * {}", self.0, price.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tick_rounding_directions() {
        let price = Price::new(dec!(0.123456));
        let tick = Price::new(dec!(0.0001));

        assert_eq!(price.floor_to_tick(tick).inner(), dec!(0.1234));
        assert_eq!(price.ceil_to_tick(tick).inner(), dec!(0.1235));

        let on_tick = Price::new(dec!(0.1234));
        assert_eq!(on_tick.floor_to_tick(tick), on_tick);
        assert_eq!(on_tick.ceil_to_tick(tick), on_tick);
    }

    #[test]
    fn test_zero_tick_is_identity() {
        let price = Price::new(dec!(1.23456));
        assert_eq!(price.floor_to_tick(Price::ZERO), price);
        assert_eq!(price.ceil_to_tick(Price::ZERO), price);
    }

    #[test]
    fn test_midpoint() {
        let mid = Price::midpoint(Price::new(dec!(50000)), Price::new(dec!(50100)));
        assert_eq!(mid.inner(), dec!(50050));
    }

    #[test]
    fn test_notional() {
        assert_eq!(
            Size::new(dec!(0.5)).notional(Price::new(dec!(50000))).unwrap(),
            dec!(25000)
        );
        assert_eq!(Size::ZERO.notional(Price::new(dec!(3))).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_notional_overflow_is_error() {
        let huge = Size::new(Decimal::MAX);
        assert!(matches!(
            huge.notional(Price::new(dec!(2))),
            Err(CoreError::Overflow(_))
        ));
    }

    #[test]
    fn test_try_positive() {
        assert!(Price::try_positive(dec!(0.01)).is_ok());
        assert!(matches!(
            Price::try_positive(Decimal::ZERO),
            Err(CoreError::InvalidPrice(_))
        ));
        assert!(matches!(
            Size::try_positive(dec!(-1)),
            Err(CoreError::InvalidSize(_))
        ));
    }

    #[test]
    fn test_parse() {
        let price: Price = " 0.00000001 ".parse().unwrap();
        assert_eq!(price.inner(), dec!(0.00000001));
        assert!(matches!(
            "abc".parse::<Size>(),
            Err(CoreError::DecimalParse(_))
        ));
    }

    #[test]
    fn test_positive_excludes_zero() {
        assert!(Price::new(dec!(1)).is_positive());
        assert!(!Price::ZERO.is_positive());
        assert!(!Size::new(dec!(-2)).is_positive());
    }
}
