//! Explicit money unit types.
//!
//! The whole engine works in integer minor units (`MinorUnits`); the
//! disbursement boundary is the single place where a decimal major-unit
//! amount (`MajorAmount`) is produced, converting exactly once.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MinorUnits(pub i64);

impl MinorUnits {
    pub fn to_major(self) -> MajorAmount {
        MajorAmount(BigDecimal::from(self.0) / BigDecimal::from(100))
    }
}

impl std::fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decimal major-unit amount, only ever handed to the disbursement
/// primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MajorAmount(pub BigDecimal);

impl std::fmt::Display for MajorAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
