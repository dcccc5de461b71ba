//! Decimal value data model: an unscaled integer magnitude plus a scale, in three widths.
//!
//! The writer picks the smallest of [Decimal32]/[Decimal64]/[Decimal128] that fits a given value
//! (spec invariant); this module only defines the three fixed-width containers and their range
//! checks, construction is left to the writer (`writer.rs`).

use crate::error::{Error, ErrorKind, Result};

fn range_err(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::Range(msg.into()), Default::default())
}

/// 7-nines unscaled magnitude, fits in 4 bytes on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decimal32 {
    pub unscaled: i32,
    pub scale: i32,
}

impl Decimal32 {
    pub const MAX_UNSCALED: i32 = 9_999_999;

    pub fn new(unscaled: i32, scale: i32) -> Result<Self> {
        if unscaled.unsigned_abs() > Self::MAX_UNSCALED as u32 {
            return Err(range_err(format!(
                "unscaled magnitude {} exceeds Decimal32's 7-nines limit",
                unscaled
            )));
        }
        Ok(Self { unscaled, scale })
    }
}

/// 16-nines unscaled magnitude, fits in 8 bytes on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decimal64 {
    pub unscaled: i64,
    pub scale: i32,
}

impl Decimal64 {
    pub const MAX_UNSCALED: i64 = 9_999_999_999_999_999;

    pub fn new(unscaled: i64, scale: i32) -> Result<Self> {
        if unscaled.unsigned_abs() > Self::MAX_UNSCALED as u64 {
            return Err(range_err(format!(
                "unscaled magnitude {} exceeds Decimal64's 16-nines limit",
                unscaled
            )));
        }
        Ok(Self { unscaled, scale })
    }
}

/// Up to 34-nines unscaled magnitude, fits in 16 bytes on the wire. `i128`'s own range
/// (~1.7 * 10^38) comfortably covers the 34-nines requirement (~1 * 10^34), see DESIGN.md.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decimal128 {
    pub unscaled: i128,
    pub scale: i32,
}

impl Decimal128 {
    pub const MAX_UNSCALED: i128 = 9_999_999_999_999_999_999_999_999_999_999_999;

    pub fn new(unscaled: i128, scale: i32) -> Result<Self> {
        if unscaled.unsigned_abs() > Self::MAX_UNSCALED as u128 {
            return Err(range_err(format!(
                "unscaled magnitude {} exceeds Decimal128's 34-nines limit",
                unscaled
            )));
        }
        Ok(Self { unscaled, scale })
    }
}

/// Any one of the three decimal widths, as returned by a reader and accepted by a writer that
/// wants to pick the smallest representation itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decimal {
    D32(Decimal32),
    D64(Decimal64),
    D128(Decimal128),
}

impl Decimal {
    /// Builds the smallest-width [Decimal] that can hold `unscaled`/`scale`, per the writer's
    /// "picks the smallest" invariant.
    pub fn smallest_fit(unscaled: i128, scale: i32) -> Result<Self> {
        if let Ok(i) = i32::try_from(unscaled) {
            if let Ok(d) = Decimal32::new(i, scale) {
                return Ok(Decimal::D32(d));
            }
        }
        if let Ok(i) = i64::try_from(unscaled) {
            if let Ok(d) = Decimal64::new(i, scale) {
                return Ok(Decimal::D64(d));
            }
        }
        Decimal128::new(unscaled, scale).map(Decimal::D128)
    }

    pub fn unscaled(&self) -> i128 {
        match self {
            Decimal::D32(d) => d.unscaled as i128,
            Decimal::D64(d) => d.unscaled as i128,
            Decimal::D128(d) => d.unscaled,
        }
    }

    pub fn scale(&self) -> i32 {
        match self {
            Decimal::D32(d) => d.scale,
            Decimal::D64(d) => d.scale,
            Decimal::D128(d) => d.scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallest_fit_picks_the_narrowest_width() {
        assert!(matches!(
            Decimal::smallest_fit(42, 2).unwrap(),
            Decimal::D32(_)
        ));
        assert!(matches!(
            Decimal::smallest_fit(50_000_000_000, 2).unwrap(),
            Decimal::D64(_)
        ));
        assert!(matches!(
            Decimal::smallest_fit(Decimal128::MAX_UNSCALED, 2).unwrap(),
            Decimal::D128(_)
        ));
    }

    #[test]
    fn out_of_range_unscaled_is_rejected() {
        assert!(Decimal32::new(Decimal32::MAX_UNSCALED + 1, 0).is_err());
        assert!(Decimal64::new(Decimal64::MAX_UNSCALED, 0).is_ok());
    }
}
