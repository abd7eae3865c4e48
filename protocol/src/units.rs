//! # Units & Identifiers
//!
//! Every quantity the lending engine touches is a raw fixed-point integer
//! with [`UNIT_DECIMALS`] fractional digits, the same scale the observed
//! token contracts use. `"500"` principal is stored as `500 * 10^18`.
//!
//! Two fungible units exist and they are deliberately type-distinct:
//!
//! - [`ValueAmount`]: the unit loans are disbursed and repaid in.
//! - [`RewardAmount`]: the unit interest is denominated in.
//!
//! There is no `From` between them. Any conversion goes through
//! [`Amount::raw`] / [`Amount::from_raw`] at the call site.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{UNIT_DECIMALS, WAD};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identity of an account on the collaborating ledgers.
pub type AccountId = String;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Opaque identifier of a collateral asset, assigned by the registry at mint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub u64);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a loan record. Assigned monotonically by the loan ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(pub u64);

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Amount trait
// ---------------------------------------------------------------------------

/// Common arithmetic surface of the fungible units.
///
/// All arithmetic is checked. Wrapping arithmetic and money do not mix.
pub trait Amount:
    Copy + Clone + Default + Ord + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// The zero amount.
    const ZERO: Self;

    /// Short name of the unit, used in error messages and logs.
    const UNIT: &'static str;

    /// Wraps a raw fixed-point integer.
    fn from_raw(raw: u128) -> Self;

    /// Returns the raw fixed-point integer.
    fn raw(&self) -> u128;

    /// Scales a whole number of units into raw fixed-point form.
    ///
    /// Cannot overflow: `u64::MAX * 10^18` fits comfortably in a `u128`.
    fn from_whole(whole: u64) -> Self {
        Self::from_raw(whole as u128 * WAD)
    }

    fn checked_add(self, rhs: Self) -> Option<Self> {
        self.raw().checked_add(rhs.raw()).map(Self::from_raw)
    }

    fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.raw().checked_sub(rhs.raw()).map(Self::from_raw)
    }

    fn saturating_sub(self, rhs: Self) -> Self {
        Self::from_raw(self.raw().saturating_sub(rhs.raw()))
    }

    fn is_zero(&self) -> bool {
        self.raw() == 0
    }
}

/// Errors produced when parsing a decimal amount string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    /// The string was empty or contained something other than digits and
    /// at most one decimal point.
    #[error("invalid amount literal: {0:?}")]
    Invalid(String),

    /// More fractional digits than the unit scale supports.
    #[error("too many fractional digits in {0:?} (max {max})", max = UNIT_DECIMALS)]
    TooPrecise(String),

    /// The value does not fit in the raw representation.
    #[error("amount out of range: {0:?}")]
    OutOfRange(String),
}

/// Parses `"500"`, `"0.25"` or `"12."` into raw fixed-point form.
fn parse_units(s: &str) -> Result<u128, AmountParseError> {
    let trimmed = s.trim();
    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };

    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
        return Err(AmountParseError::Invalid(s.to_string()));
    }
    if frac.len() > UNIT_DECIMALS as usize {
        return Err(AmountParseError::TooPrecise(s.to_string()));
    }

    let out_of_range = || AmountParseError::OutOfRange(s.to_string());

    let whole_raw = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().map_err(|_| out_of_range())?
    };
    let frac_raw = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = UNIT_DECIMALS as usize);
        padded.parse::<u128>().map_err(|_| out_of_range())?
    };

    whole_raw
        .checked_mul(WAD)
        .and_then(|w| w.checked_add(frac_raw))
        .ok_or_else(out_of_range)
}

/// Renders raw fixed-point form the way `formatEther` does: `500.0`,
/// `0.25`, `1.000000000000000001`.
fn format_units(raw: u128, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let whole = raw / WAD;
    let frac = raw % WAD;
    if frac == 0 {
        return write!(f, "{}.0", whole);
    }
    let digits = format!("{:0>width$}", frac, width = UNIT_DECIMALS as usize);
    write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
}

/// Accepts the raw integer either as a decimal string (the serialized
/// form, safe for JSON consumers without big-integer support) or as a
/// plain number.
struct RawAmountVisitor;

impl<'de> Visitor<'de> for RawAmountVisitor {
    type Value = u128;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a raw fixed-point amount as a decimal string or unsigned integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
        v.parse::<u128>().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
        Ok(v as u128)
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
        Ok(v)
    }
}

macro_rules! define_amount {
    ($(#[$meta:meta])* $name:ident, $unit:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u128);

        impl Amount for $name {
            const ZERO: Self = Self(0);
            const UNIT: &'static str = $unit;

            fn from_raw(raw: u128) -> Self {
                Self(raw)
            }

            fn raw(&self) -> u128 {
                self.0
            }
        }

        impl $name {
            /// The zero amount.
            pub const ZERO: Self = Self(0);

            /// Wraps a raw fixed-point integer.
            pub const fn new(raw: u128) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                format_units(self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = AmountParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_units(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(RawAmountVisitor).map(Self)
            }
        }
    };
}

define_amount!(
    /// A quantity of the value unit: loan principal, disbursements, repayments.
    ValueAmount,
    "value"
);

define_amount!(
    /// A quantity of the reward unit: accrued and settled interest.
    RewardAmount,
    "reward"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_whole_scales_by_wad() {
        let amount = ValueAmount::from_whole(500);
        assert_eq!(amount.raw(), 500 * 10u128.pow(18));
    }

    #[test]
    fn display_matches_format_ether() {
        assert_eq!(ValueAmount::from_whole(500).to_string(), "500.0");
        assert_eq!(ValueAmount::ZERO.to_string(), "0.0");
        assert_eq!(RewardAmount::new(WAD / 4).to_string(), "0.25");
        assert_eq!(RewardAmount::new(WAD + 1).to_string(), "1.000000000000000001");
    }

    #[test]
    fn parse_whole_and_fractional() {
        assert_eq!("500".parse::<ValueAmount>().unwrap(), ValueAmount::from_whole(500));
        assert_eq!("0.25".parse::<RewardAmount>().unwrap(), RewardAmount::new(WAD / 4));
        assert_eq!(".5".parse::<ValueAmount>().unwrap(), ValueAmount::new(WAD / 2));
        assert_eq!("12.".parse::<ValueAmount>().unwrap(), ValueAmount::from_whole(12));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            "".parse::<ValueAmount>(),
            Err(AmountParseError::Invalid(_))
        ));
        assert!(matches!(
            "1.2.3".parse::<ValueAmount>(),
            Err(AmountParseError::Invalid(_))
        ));
        assert!(matches!(
            "-5".parse::<ValueAmount>(),
            Err(AmountParseError::Invalid(_))
        ));
        assert!(matches!(
            "0.0000000000000000001".parse::<ValueAmount>(),
            Err(AmountParseError::TooPrecise(_))
        ));
    }

    #[test]
    fn parse_rejects_overflow() {
        let huge = "9".repeat(40);
        assert!(matches!(
            huge.parse::<ValueAmount>(),
            Err(AmountParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn checked_arithmetic() {
        let a = ValueAmount::from_whole(5);
        let b = ValueAmount::from_whole(3);
        assert_eq!(a.checked_sub(b), Some(ValueAmount::from_whole(2)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(b.saturating_sub(a), ValueAmount::ZERO);
        assert_eq!(ValueAmount::new(u128::MAX).checked_add(ValueAmount::new(1)), None);
    }

    #[test]
    fn amounts_serialize_as_raw_strings() {
        let amount = ValueAmount::from_whole(500);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"500000000000000000000\"");
        let back: ValueAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn amounts_deserialize_from_plain_numbers() {
        let back: RewardAmount = serde_json::from_str("42").unwrap();
        assert_eq!(back, RewardAmount::new(42));
        assert!(serde_json::from_str::<RewardAmount>("\"abc\"").is_err());
    }
}
