//! 17.14 signed fixed-point arithmetic.
//!
//! The MLFQS accounting formulas work on fractional quantities (system load,
//! decayed CPU usage) on a machine model without floating point. [`Fixed`]
//! packs a signed value into an `i32` with 14 fraction bits and provides the
//! usual arithmetic with the standard scale adjustments: a product of two
//! fixed-point values widens to `i64` before shifting the scale back out,
//! and a fixed-by-fixed quotient pre-shifts the dividend so the scale
//! survives the division.
//!
//! Conversions back to integers come in two flavors: [`Fixed::trunc`]
//! (toward zero) and [`Fixed::round_nearest`] (ties away from zero). The
//! scheduler uses truncation for priority recomputation and
//! nearest-rounding for the `×100` load/CPU readouts.

use core::fmt;
use core::ops::{Add, Div, Mul, Sub};

/// Number of fraction bits.
const SHIFT: u32 = 14;

/// The fixed-point scale, `2^14`.
const SCALE: i32 = 1 << SHIFT;

/// A signed 17.14 fixed-point number.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fixed(i32);

impl Fixed {
    /// The value zero.
    pub const ZERO: Self = Self(0);

    /// The value one.
    pub const ONE: Self = Self(SCALE);

    /// Converts an integer to fixed point.
    #[must_use]
    pub const fn from_int(n: i32) -> Self {
        Self(n * SCALE)
    }

    /// Builds a value directly from its raw 17.14 representation.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw 17.14 representation.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Converts to an integer, truncating toward zero.
    #[must_use]
    pub const fn trunc(self) -> i32 {
        // Signed division truncates toward zero; a shift would floor.
        self.0 / SCALE
    }

    /// Converts to the nearest integer, ties rounding away from zero.
    #[must_use]
    pub const fn round_nearest(self) -> i32 {
        if self.0 >= 0 {
            (self.0 + SCALE / 2) / SCALE
        } else {
            (self.0 - SCALE / 2) / SCALE
        }
    }
}

impl Add for Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Add<i32> for Fixed {
    type Output = Self;

    fn add(self, rhs: i32) -> Self {
        Self(self.0 + rhs * SCALE)
    }
}

impl Sub<i32> for Fixed {
    type Output = Self;

    fn sub(self, rhs: i32) -> Self {
        Self(self.0 - rhs * SCALE)
    }
}

impl Mul for Fixed {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        // Widen before rescaling so intermediate products cannot overflow.
        Self(((i64::from(self.0) * i64::from(rhs.0)) >> SHIFT) as i32)
    }
}

impl Div for Fixed {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self(((i64::from(self.0) << SHIFT) / i64::from(rhs.0)) as i32)
    }
}

impl Mul<i32> for Fixed {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<i32> for Fixed {
    type Output = Self;

    fn div(self, rhs: i32) -> Self {
        Self(self.0 / rhs)
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({}/{SCALE})", self.0)
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scaled = i64::from(self.0) * 100 / i64::from(SCALE);
        write!(f, "{}.{:02}", scaled / 100, (scaled % 100).abs())
    }
}
