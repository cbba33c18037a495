use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{GovernanceError, Result};

pub type MultisigId = u32;

/// Account address as rendered by the chain (SS58, hex, ...).
///
/// Ordering is lexical on the rendered form, which is what ranking tie-breaks use.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(GovernanceError::InvalidArgument("empty address".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

macro_rules! define_digest {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = GovernanceError;

            fn from_str(s: &str) -> Result<Self> {
                let raw = s.trim().trim_start_matches("0x");
                let bytes = hex::decode(raw).map_err(|e| {
                    let name = stringify!($name);
                    GovernanceError::InvalidArgument(format!("invalid {} {}: {}", name, s, e))
                })?;
                let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
                    let name = stringify!($name);
                    GovernanceError::InvalidArgument(format!("{} must be 32 bytes: {}", name, s))
                })?;
                Ok(Self(bytes))
            }
        }
    };
}

define_digest!(CallHash);
define_digest!(TxHash);

/// Whole percentage in `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const HUNDRED: Percent = Percent(100);

    pub fn new(value: u8) -> Result<Self> {
        if value > 100 {
            return Err(GovernanceError::InvalidArgument(format!(
                "percentage must be within 0..=100, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// `floor(part * 100 / whole)`, clamped to 100. Zero when `whole` is zero.
    pub fn of(part: u128, whole: u128) -> Self {
        Self(ratio_floor(part, whole, 100) as u8)
    }
}

impl TryFrom<u8> for Percent {
    type Error = GovernanceError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Percent> for u8 {
    fn from(p: Percent) -> u8 {
        p.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Share of total group weight in basis points (`0..=10_000`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Power(u16);

impl Power {
    pub const MAX: u16 = 10_000;

    pub fn of(weight: u128, total: u128) -> Self {
        Self(ratio_floor(weight, total, Self::MAX as u128) as u16)
    }

    pub fn basis_points(&self) -> u16 {
        self.0
    }

    pub fn as_fraction(&self) -> f64 {
        self.0 as f64 / Self::MAX as f64
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stance {
    Approve,
    Reject,
}

impl FromStr for Stance {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "approve" | "aye" | "yes" => Ok(Stance::Approve),
            "reject" | "nay" | "no" => Ok(Stance::Reject),
            other => Err(GovernanceError::InvalidArgument(format!("unknown stance {}", other))),
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stance::Approve => write!(f, "approve"),
            Stance::Reject => write!(f, "reject"),
        }
    }
}

// floor(part * scale / whole) without overflowing for realistic balances, clamped to scale
fn ratio_floor(part: u128, whole: u128, scale: u128) -> u128 {
    if whole == 0 {
        return 0;
    }
    let ratio = match part.checked_mul(scale) {
        Some(scaled) => scaled / whole,
        None => part / (whole / scale).max(1),
    };
    ratio.min(scale)
}
