/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::escape::EscapeError;
use shapecodec_types::base64::DecodeError;
use shapecodec_types::date_time::DateTimeParseError;
use shapecodec_types::error::DecodeOffset;
use shapecodec_types::TryFromNumberError;
use std::borrow::Cow;
use std::fmt;

#[derive(Debug)]
pub(in crate::deserialize) enum DeserializeErrorKind {
    Custom(Cow<'static, str>),
    ExpectedLiteral(String),
    InvalidBase64(DecodeError),
    InvalidEscape(char),
    InvalidNumber,
    InvalidTimestamp(DateTimeParseError),
    InvalidUtf8,
    NumberOutOfRange(TryFromNumberError),
    TrailingData,
    UnescapeFailed(EscapeError),
    UnexpectedControlCharacter(u8),
    UnexpectedEos,
    UnexpectedToken(char, &'static str),
}

/// An error that occurred while reading or interpreting JSON tokens.
#[derive(Debug)]
pub struct DeserializeError {
    kind: DeserializeErrorKind,
    offset: Option<usize>,
}

impl DeserializeError {
    pub(in crate::deserialize) fn new(kind: DeserializeErrorKind, offset: Option<usize>) -> Self {
        Self { kind, offset }
    }

    /// Returns a custom error without an offset.
    pub fn custom(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(DeserializeErrorKind::Custom(message.into()), None)
    }

    /// Returns a custom error at the given byte offset.
    pub fn custom_at(message: impl Into<Cow<'static, str>>, offset: usize) -> Self {
        Self::new(DeserializeErrorKind::Custom(message.into()), Some(offset))
    }

    /// Byte offset of the failure in the input, when known.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub(in crate::deserialize) fn with_offset(mut self, offset: usize) -> Self {
        self.offset.get_or_insert(offset);
        self
    }
}

impl DecodeOffset for DeserializeError {
    fn decode_offset(&self) -> Option<usize> {
        self.offset
    }
}

impl std::error::Error for DeserializeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use DeserializeErrorKind::*;
        match &self.kind {
            UnescapeFailed(source) => Some(source),
            InvalidBase64(source) => Some(source),
            InvalidTimestamp(source) => Some(source),
            NumberOutOfRange(source) => Some(source),
            Custom(_)
            | ExpectedLiteral(_)
            | InvalidEscape(_)
            | InvalidNumber
            | InvalidUtf8
            | TrailingData
            | UnexpectedControlCharacter(_)
            | UnexpectedToken(..)
            | UnexpectedEos => None,
        }
    }
}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DeserializeErrorKind::*;
        if let Some(offset) = self.offset {
            write!(f, "Error at offset {}: ", offset)?;
        }
        match &self.kind {
            Custom(msg) => write!(f, "failed to parse JSON: {}", msg),
            ExpectedLiteral(literal) => write!(f, "expected literal: {}", literal),
            InvalidBase64(_) => write!(f, "invalid base64 in JSON string"),
            InvalidEscape(escape) => write!(f, "invalid JSON escape: \\{}", escape),
            InvalidNumber => write!(f, "invalid number"),
            InvalidTimestamp(_) => write!(f, "invalid timestamp"),
            InvalidUtf8 => write!(f, "invalid UTF-8 codepoint in JSON stream"),
            NumberOutOfRange(_) => write!(f, "number out of range for the target type"),
            TrailingData => write!(f, "found more JSON tokens after the top-level value"),
            UnescapeFailed(_) => write!(f, "failed to unescape JSON string"),
            UnexpectedControlCharacter(value) => write!(
                f,
                "encountered unescaped control character in string: 0x{:X}",
                value
            ),
            UnexpectedToken(token, expected) => {
                write!(f, "unexpected token '{}'. Expected one of {}", token, expected)
            }
            UnexpectedEos => write!(f, "unexpected end of stream"),
        }
    }
}

impl From<EscapeError> for DeserializeError {
    fn from(err: EscapeError) -> Self {
        Self::new(DeserializeErrorKind::UnescapeFailed(err), None)
    }
}

impl From<TryFromNumberError> for DeserializeError {
    fn from(err: TryFromNumberError) -> Self {
        Self::new(DeserializeErrorKind::NumberOutOfRange(err), None)
    }
}

impl From<std::num::TryFromIntError> for DeserializeError {
    fn from(_: std::num::TryFromIntError) -> Self {
        Self::new(DeserializeErrorKind::InvalidNumber, None)
    }
}

impl From<DateTimeParseError> for DeserializeError {
    fn from(err: DateTimeParseError) -> Self {
        Self::new(DeserializeErrorKind::InvalidTimestamp(err), None)
    }
}

impl From<DecodeError> for DeserializeError {
    fn from(err: DecodeError) -> Self {
        Self::new(DeserializeErrorKind::InvalidBase64(err), None)
    }
}
