//! Exact conversion between human-entered NEAR amounts and yoctoNEAR.
//!
//! Stakes travel as text until the moment they become a deposit, and the
//! conversion is done on digit strings so that no floating point value ever
//! sits between what the user typed and what the ledger receives.

use std::{
    fmt,
    str::FromStr,
};
use thiserror::Error;

/// Number of fractional digits in one NEAR.
pub const NEAR_NOMINATION_EXP: usize = 24;
/// One NEAR in yoctoNEAR.
pub const ONE_NEAR: u128 = 10u128.pow(NEAR_NOMINATION_EXP as u32);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("`{0}` is not a decimal amount")]
    Malformed(String),
    #[error("`{0}` has more than {NEAR_NOMINATION_EXP} fractional digits")]
    TooPrecise(String),
    #[error("`{0}` does not fit in a ledger amount")]
    Overflow(String),
}

/// An amount in the ledger's smallest unit (yoctoNEAR).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LedgerAmount(u128);

impl LedgerAmount {
    pub const ZERO: Self = Self(0);

    pub const fn from_yocto(yocto: u128) -> Self {
        Self(yocto)
    }

    pub const fn as_yocto(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parses a decimal NEAR amount such as `"1.5"`, `".25"` or `"1,000"`.
    pub fn parse_near(raw: &str) -> Result<Self, AmountError> {
        let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
        if cleaned.is_empty() {
            return Err(AmountError::Empty);
        }
        let (whole, fraction) = match cleaned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (cleaned.as_str(), ""),
        };
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty())
            || !all_digits(whole)
            || !all_digits(fraction)
        {
            return Err(AmountError::Malformed(raw.to_string()));
        }
        if fraction.len() > NEAR_NOMINATION_EXP {
            return Err(AmountError::TooPrecise(raw.to_string()));
        }

        let mut digits = String::with_capacity(whole.len() + NEAR_NOMINATION_EXP);
        digits.push_str(whole);
        digits.push_str(fraction);
        digits.extend(std::iter::repeat_n('0', NEAR_NOMINATION_EXP - fraction.len()));
        let significant = digits.trim_start_matches('0');
        if significant.is_empty() {
            return Ok(Self::ZERO);
        }
        significant
            .parse::<u128>()
            .map(Self)
            .map_err(|_| AmountError::Overflow(raw.to_string()))
    }

    /// Renders the amount in NEAR with trailing fractional zeros removed.
    pub fn to_near_string(self) -> String {
        let whole = self.0 / ONE_NEAR;
        let fractional = self.0 % ONE_NEAR;
        if fractional == 0 {
            format!("{}", whole)
        } else {
            format!(
                "{}.{}",
                whole,
                format!("{:0width$}", fractional, width = NEAR_NOMINATION_EXP)
                    .trim_end_matches('0')
            )
        }
    }
}

impl FromStr for LedgerAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_near(s)
    }
}

impl fmt::Display for LedgerAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} NEAR", self.to_near_string())
    }
}
