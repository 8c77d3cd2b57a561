/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Text encoding and parsing of scalar values for XML, Query and HTTP header framing.
//!
//! Smithy represents non-finite floats as `NaN`, `Infinity` and `-Infinity` in text formats.
//!
//! # Examples
//! ```rust
//! use shapecodec_types::primitive::{Encoder, Parse};
//! assert_eq!(i32::parse_smithy_primitive("42").unwrap(), 42);
//! assert_eq!(Encoder::from(f64::INFINITY).encode(), "Infinity");
//! ```

use std::error::Error;
use std::fmt;

#[derive(Debug)]
enum PrimitiveParseErrorKind {
    InvalidBoolean,
    InvalidInteger,
    IntegerOutOfRange,
    InvalidFloat,
}

/// Failure to parse a scalar from text.
#[derive(Debug)]
pub struct PrimitiveParseError {
    kind: PrimitiveParseErrorKind,
    type_name: &'static str,
}

impl PrimitiveParseError {
    fn new(type_name: &'static str, kind: PrimitiveParseErrorKind) -> Self {
        PrimitiveParseError { kind, type_name }
    }
}

impl fmt::Display for PrimitiveParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            PrimitiveParseErrorKind::InvalidBoolean => "expected `true` or `false`",
            PrimitiveParseErrorKind::InvalidInteger => "invalid integer",
            PrimitiveParseErrorKind::IntegerOutOfRange => "integer out of range",
            PrimitiveParseErrorKind::InvalidFloat => "invalid floating point number",
        };
        write!(f, "failed to parse {}: {}", self.type_name, reason)
    }
}

impl Error for PrimitiveParseError {}

/// Parses a scalar from its Smithy text representation.
pub trait Parse: Sized {
    /// Parses `input`.
    fn parse_smithy_primitive(input: &str) -> Result<Self, PrimitiveParseError>;
}

impl Parse for bool {
    fn parse_smithy_primitive(input: &str) -> Result<Self, PrimitiveParseError> {
        match input {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(PrimitiveParseError::new(
                "bool",
                PrimitiveParseErrorKind::InvalidBoolean,
            )),
        }
    }
}

impl Parse for i64 {
    fn parse_smithy_primitive(input: &str) -> Result<Self, PrimitiveParseError> {
        input
            .parse::<i64>()
            .map_err(|_| PrimitiveParseError::new("i64", PrimitiveParseErrorKind::InvalidInteger))
    }
}

macro_rules! parse_narrowed_integer {
    ($($typ:ident),*) => {
        $(
            impl Parse for $typ {
                fn parse_smithy_primitive(input: &str) -> Result<Self, PrimitiveParseError> {
                    let wide = i64::parse_smithy_primitive(input).map_err(|_| {
                        PrimitiveParseError::new(stringify!($typ), PrimitiveParseErrorKind::InvalidInteger)
                    })?;
                    $typ::try_from(wide).map_err(|_| {
                        PrimitiveParseError::new(stringify!($typ), PrimitiveParseErrorKind::IntegerOutOfRange)
                    })
                }
            }
        )*
    };
}

parse_narrowed_integer!(i8, i16, i32);

impl Parse for f64 {
    fn parse_smithy_primitive(input: &str) -> Result<Self, PrimitiveParseError> {
        match input {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            // Rust accepts `inf` and `nan` spellings that Smithy does not
            other if other.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E') => {
                Err(PrimitiveParseError::new("f64", PrimitiveParseErrorKind::InvalidFloat))
            }
            other => other
                .parse::<f64>()
                .map_err(|_| PrimitiveParseError::new("f64", PrimitiveParseErrorKind::InvalidFloat)),
        }
    }
}

impl Parse for f32 {
    fn parse_smithy_primitive(input: &str) -> Result<Self, PrimitiveParseError> {
        f64::parse_smithy_primitive(input)
            .map(|wide| wide as f32)
            .map_err(|_| PrimitiveParseError::new("f32", PrimitiveParseErrorKind::InvalidFloat))
    }
}

enum Inner {
    Bool(bool),
    Integer(i64, itoa::Buffer),
    F32(f32, ryu::Buffer),
    F64(f64, ryu::Buffer),
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inner::Bool(v) => write!(f, "Bool({})", v),
            Inner::Integer(v, _) => write!(f, "Integer({})", v),
            Inner::F32(v, _) => write!(f, "F32({})", v),
            Inner::F64(v, _) => write!(f, "F64({})", v),
        }
    }
}

/// Renders a scalar into its Smithy text representation without allocating.
#[derive(Debug)]
pub struct Encoder {
    value: Inner,
}

impl Encoder {
    /// Returns the text representation.
    pub fn encode(&mut self) -> &str {
        match &mut self.value {
            Inner::Bool(true) => "true",
            Inner::Bool(false) => "false",
            Inner::Integer(v, buf) => buf.format(*v),
            Inner::F32(v, buf) => {
                match encode_float(v.is_nan(), *v == f32::INFINITY, *v == f32::NEG_INFINITY) {
                    Some(text) => text,
                    None => buf.format_finite(*v),
                }
            }
            Inner::F64(v, buf) => {
                match encode_float(v.is_nan(), *v == f64::INFINITY, *v == f64::NEG_INFINITY) {
                    Some(text) => text,
                    None => buf.format_finite(*v),
                }
            }
        }
    }
}

fn encode_float(nan: bool, inf: bool, neg_inf: bool) -> Option<&'static str> {
    if nan {
        Some("NaN")
    } else if inf {
        Some("Infinity")
    } else if neg_inf {
        Some("-Infinity")
    } else {
        None
    }
}

impl From<bool> for Encoder {
    fn from(value: bool) -> Self {
        Encoder {
            value: Inner::Bool(value),
        }
    }
}

macro_rules! encode_integer {
    ($($typ:ident),*) => {
        $(
            impl From<$typ> for Encoder {
                fn from(value: $typ) -> Self {
                    Encoder { value: Inner::Integer(i64::from(value), itoa::Buffer::new()) }
                }
            }
        )*
    };
}

encode_integer!(i8, i16, i32, i64);

impl From<f32> for Encoder {
    fn from(value: f32) -> Self {
        Encoder {
            value: Inner::F32(value, ryu::Buffer::new()),
        }
    }
}

impl From<f64> for Encoder {
    fn from(value: f64) -> Self {
        Encoder {
            value: Inner::F64(value, ryu::Buffer::new()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Encoder, Parse};
    use proptest::prelude::*;

    #[test]
    fn parse_booleans() {
        assert!(bool::parse_smithy_primitive("true").unwrap());
        assert!(!bool::parse_smithy_primitive("false").unwrap());
        assert!(bool::parse_smithy_primitive("True").is_err());
        assert!(bool::parse_smithy_primitive("1").is_err());
    }

    #[test]
    fn parse_integers_narrow_through_i64() {
        assert_eq!(127, i8::parse_smithy_primitive("127").unwrap());
        assert!(i8::parse_smithy_primitive("128").is_err());
        assert!(i32::parse_smithy_primitive("1.5").is_err());
        assert_eq!(i64::MIN, i64::parse_smithy_primitive("-9223372036854775808").unwrap());
    }

    #[test]
    fn parse_floats() {
        assert!(f64::parse_smithy_primitive("NaN").unwrap().is_nan());
        assert_eq!(f64::INFINITY, f64::parse_smithy_primitive("Infinity").unwrap());
        assert_eq!(f32::NEG_INFINITY, f32::parse_smithy_primitive("-Infinity").unwrap());
        assert_eq!(1e21, f64::parse_smithy_primitive("1e21").unwrap());
        assert!(f64::parse_smithy_primitive("inf").is_err());
        assert!(f64::parse_smithy_primitive("nan").is_err());
    }

    #[test]
    fn encode_values() {
        assert_eq!("true", Encoder::from(true).encode());
        assert_eq!("-12", Encoder::from(-12i8).encode());
        assert_eq!("0.1", Encoder::from(0.1f32).encode());
        assert_eq!("NaN", Encoder::from(f64::NAN).encode());
        assert_eq!("-Infinity", Encoder::from(f32::NEG_INFINITY).encode());
    }

    proptest! {
        #[test]
        fn f64_text_round_trip(value in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            let text = Encoder::from(value).encode().to_string();
            prop_assert_eq!(value, f64::parse_smithy_primitive(&text).unwrap());
        }

        #[test]
        fn i64_text_round_trip(value: i64) {
            let text = Encoder::from(value).encode().to_string();
            prop_assert_eq!(value, i64::parse_smithy_primitive(&text).unwrap());
        }
    }
}
