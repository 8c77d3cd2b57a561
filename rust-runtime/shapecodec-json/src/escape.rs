/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::borrow::Cow;
use std::fmt;
use std::fmt::Write;

#[derive(Debug, PartialEq, Eq)]
enum EscapeErrorKind {
    ExpectedSurrogatePair(String),
    InvalidEscapeCharacter(char),
    InvalidSurrogatePair(u16, u16),
    InvalidUnicodeEscape(String),
    UnexpectedEndOfString,
}

/// Failure to unescape a JSON string literal.
#[derive(Debug, PartialEq, Eq)]
pub struct EscapeError {
    kind: EscapeErrorKind,
}

impl std::error::Error for EscapeError {}

impl fmt::Display for EscapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use EscapeErrorKind::*;
        match &self.kind {
            ExpectedSurrogatePair(low) => write!(
                f,
                "expected a UTF-16 surrogate pair, but got {} as the low word",
                low
            ),
            InvalidEscapeCharacter(chr) => write!(f, "invalid JSON escape: \\{}", chr),
            InvalidSurrogatePair(high, low) => {
                write!(f, "invalid surrogate pair: \\u{:04X}\\u{:04X}", high, low)
            }
            InvalidUnicodeEscape(escape) => write!(f, "invalid JSON Unicode escape: \\u{}", escape),
            UnexpectedEndOfString => write!(f, "unexpected end of string"),
        }
    }
}

impl From<EscapeErrorKind> for EscapeError {
    fn from(kind: EscapeErrorKind) -> Self {
        Self { kind }
    }
}

fn needs_escape(byte: u8) -> bool {
    byte < 0x20 || byte == b'"' || byte == b'\\'
}

/// Escapes a string for embedding in a JSON string value.
pub(crate) fn escape_string(value: &str) -> Cow<'_, str> {
    let first = match value.bytes().position(needs_escape) {
        Some(first) => first,
        None => return Cow::Borrowed(value),
    };
    let mut escaped = String::with_capacity(value.len() + 8);
    escaped.push_str(&value[..first]);
    for chr in value[first..].chars() {
        match chr {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\u{08}' => escaped.push_str("\\b"),
            '\u{0C}' => escaped.push_str("\\f"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            chr if (chr as u32) < 0x20 => {
                // writing into a String cannot fail
                let _ = write!(escaped, "\\u{:04x}", chr as u32);
            }
            chr => escaped.push(chr),
        }
    }
    Cow::Owned(escaped)
}

/// Unescapes a JSON-escaped string, borrowing the input when it has no escape sequences.
pub(crate) fn unescape_string(value: &str) -> Result<Cow<'_, str>, EscapeError> {
    let first = match value.find('\\') {
        Some(first) => first,
        None => return Ok(Cow::Borrowed(value)),
    };
    let mut unescaped = String::with_capacity(value.len());
    unescaped.push_str(&value[..first]);
    let mut rest = &value[first..];
    while let Some(backslash) = rest.find('\\') {
        unescaped.push_str(&rest[..backslash]);
        let escape = &rest[backslash + 1..];
        let consumed = match escape.chars().next() {
            None => return Err(EscapeErrorKind::UnexpectedEndOfString.into()),
            Some('u') => {
                let (chr, len) = read_unicode_escape(&escape[1..])?;
                unescaped.push(chr);
                1 + len
            }
            Some(chr) => {
                unescaped.push(match chr {
                    '"' => '"',
                    '\\' => '\\',
                    '/' => '/',
                    'b' => '\u{08}',
                    'f' => '\u{0C}',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => return Err(EscapeErrorKind::InvalidEscapeCharacter(other).into()),
                });
                chr.len_utf8()
            }
        };
        rest = &escape[consumed..];
    }
    unescaped.push_str(rest);
    Ok(Cow::Owned(unescaped))
}

fn is_utf16_high_surrogate(codepoint: u16) -> bool {
    codepoint & 0xFC00 == 0xD800
}

fn is_utf16_low_surrogate(codepoint: u16) -> bool {
    codepoint & 0xFC00 == 0xDC00
}

/// Reads the four hex digits following `\u`.
fn read_hex_quad(digits: &str) -> Result<u16, EscapeError> {
    let quad = match digits.get(..4) {
        Some(quad) => quad,
        None if digits.len() < 4 => return Err(EscapeErrorKind::UnexpectedEndOfString.into()),
        None => return Err(EscapeErrorKind::InvalidUnicodeEscape(digits.chars().take(4).collect()).into()),
    };
    // `from_str_radix` would otherwise accept a leading `+`
    if !quad.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return Err(EscapeErrorKind::InvalidUnicodeEscape(quad.into()).into());
    }
    u16::from_str_radix(quad, 16).map_err(|_| EscapeErrorKind::InvalidUnicodeEscape(quad.into()).into())
}

/// Reads a `\u` escape (the `\u` already consumed), including the low half of a surrogate pair.
/// Returns the character and the number of bytes consumed after the initial `\u`.
fn read_unicode_escape(digits: &str) -> Result<(char, usize), EscapeError> {
    let high = read_hex_quad(digits)?;
    if !is_utf16_high_surrogate(high) {
        let chr = char::from_u32(u32::from(high))
            .ok_or_else(|| EscapeErrorKind::InvalidUnicodeEscape(format!("{:04x}", high)))?;
        return Ok((chr, 4));
    }
    let rest = &digits[4..];
    let low_digits = match rest.strip_prefix("\\u") {
        Some(low_digits) => low_digits,
        None => {
            return Err(
                EscapeErrorKind::ExpectedSurrogatePair(rest.chars().take(6).collect()).into(),
            )
        }
    };
    let low = read_hex_quad(low_digits)?;
    if !is_utf16_low_surrogate(low) {
        return Err(EscapeErrorKind::InvalidSurrogatePair(high, low).into());
    }
    let codepoint = 0x10000 + (u32::from(high - 0xD800) << 10) + u32::from(low - 0xDC00);
    let chr = char::from_u32(codepoint).ok_or(EscapeErrorKind::InvalidSurrogatePair(high, low))?;
    Ok((chr, 10))
}
