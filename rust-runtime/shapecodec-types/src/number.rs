/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! A number type that implements JavaScript / JSON semantics.

use std::error::Error;
use std::fmt;
use std::num::TryFromIntError;

/// A JSON-style number: unsigned, negative, or floating point.
///
/// Decoders read every integer into the widest representation first and narrow afterwards, so the
/// overflow policy for all integer widths lives in the `TryFrom` impls below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Unsigned 64-bit integer value.
    PosInt(u64),
    /// Signed 64-bit integer value. Only negative values are expected in this variant.
    NegInt(i64),
    /// 64-bit floating-point value.
    Float(f64),
}

impl Number {
    /// Converts to an `f64`, possibly losing precision for very large integers.
    pub fn to_f64_lossy(self) -> f64 {
        match self {
            Number::PosInt(v) => v as f64,
            Number::NegInt(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    /// Converts to an `f32`, possibly losing precision.
    pub fn to_f32_lossy(self) -> f32 {
        self.to_f64_lossy() as f32
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        if value < 0 {
            Number::NegInt(value)
        } else {
            Number::PosInt(value as u64)
        }
    }
}

#[derive(Debug)]
enum TryFromNumberErrorKind {
    OutsideIntegerRange(TryFromIntError),
    FloatToIntegerLossyConversion(f64),
}

/// The error returned when narrowing a [`Number`] would lose information.
#[derive(Debug)]
pub struct TryFromNumberError {
    kind: TryFromNumberErrorKind,
}

impl fmt::Display for TryFromNumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TryFromNumberErrorKind::OutsideIntegerRange(_) => write!(f, "integer out of range"),
            TryFromNumberErrorKind::FloatToIntegerLossyConversion(v) => write!(
                f,
                "cannot convert floating point number {} into an integer",
                v
            ),
        }
    }
}

impl Error for TryFromNumberError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            TryFromNumberErrorKind::OutsideIntegerRange(err) => Some(err),
            TryFromNumberErrorKind::FloatToIntegerLossyConversion(_) => None,
        }
    }
}

impl From<TryFromIntError> for TryFromNumberError {
    fn from(err: TryFromIntError) -> Self {
        TryFromNumberError {
            kind: TryFromNumberErrorKind::OutsideIntegerRange(err),
        }
    }
}

impl TryFrom<Number> for i64 {
    type Error = TryFromNumberError;

    fn try_from(value: Number) -> Result<Self, Self::Error> {
        match value {
            Number::PosInt(v) => Ok(i64::try_from(v)?),
            Number::NegInt(v) => Ok(v),
            Number::Float(v) => {
                // integral floats inside the i64 range narrow exactly
                if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
                    Ok(v as i64)
                } else {
                    Err(TryFromNumberError {
                        kind: TryFromNumberErrorKind::FloatToIntegerLossyConversion(v),
                    })
                }
            }
        }
    }
}

macro_rules! narrow_from_i64 {
    ($($typ:ident),*) => {
        $(
            impl TryFrom<Number> for $typ {
                type Error = TryFromNumberError;

                fn try_from(value: Number) -> Result<Self, Self::Error> {
                    let wide = i64::try_from(value)?;
                    Ok($typ::try_from(wide)?)
                }
            }
        )*
    };
}

narrow_from_i64!(i8, i16, i32);

impl From<Number> for f64 {
    fn from(value: Number) -> Self {
        value.to_f64_lossy()
    }
}

impl From<Number> for f32 {
    fn from(value: Number) -> Self {
        value.to_f32_lossy()
    }
}
