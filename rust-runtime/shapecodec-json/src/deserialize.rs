/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Pull-based JSON reader.
//!
//! [`json_token_iter`] produces a stream of [`Token`]s over a byte slice without building a tree.
//! Generated decoders walk the stream with the helpers in [`token`] and skip whatever they
//! don't recognize.

use crate::deserialize::error::{DeserializeError as Error, DeserializeErrorKind as ErrorKind};
use shapecodec_types::Number;

mod error;
pub mod token;

pub use error::DeserializeError;
pub use token::{EscapedStr, Offset, Token};

/// Returns an iterator over the JSON tokens in `input`.
///
/// Exactly one top-level value is accepted. Empty (or all-whitespace) input produces no tokens.
pub fn json_token_iter(input: &[u8]) -> JsonTokenIterator<'_> {
    JsonTokenIterator {
        input,
        index: 0,
        state_stack: vec![State::Initial],
        failed: false,
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum State {
    Initial,
    ArrayFirstValueOrEnd,
    ArrayNextValueOrEnd,
    ObjectFirstKeyOrEnd,
    ObjectNextKeyOrEnd,
    ObjectFieldValue,
}

/// Iterator over JSON tokens. Stops after the first error.
#[derive(Debug)]
pub struct JsonTokenIterator<'a> {
    input: &'a [u8],
    index: usize,
    state_stack: Vec<State>,
    failed: bool,
}

impl<'a> JsonTokenIterator<'a> {
    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.index).copied()
    }

    fn peek_expect(&self) -> Result<u8, Error> {
        self.peek_byte()
            .ok_or_else(|| Error::new(ErrorKind::UnexpectedEos, Some(self.index)))
    }

    fn advance(&mut self) {
        if self.index < self.input.len() {
            self.index += 1;
        }
    }

    fn next_expect(&mut self) -> Result<u8, Error> {
        let next = self.peek_expect()?;
        self.advance();
        Ok(next)
    }

    fn error_at(&self, offset: usize, kind: ErrorKind) -> Error {
        Error::new(kind, Some(offset))
    }

    fn error(&self, kind: ErrorKind) -> Error {
        self.error_at(self.index, kind)
    }

    fn discard_whitespace(&mut self) {
        while let Some(byte) = self.peek_byte() {
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' => self.advance(),
                _ => break,
            }
        }
    }

    fn state(&self) -> State {
        self.state_stack.last().copied().unwrap_or(State::Initial)
    }

    fn replace_state(&mut self, state: State) {
        self.state_stack.pop();
        self.state_stack.push(state);
    }

    /// Pops the current state and lets the parent know a value has completed.
    fn end_value(&mut self) {
        self.state_stack.pop();
        match self.state() {
            State::ObjectFieldValue => self.replace_state(State::ObjectNextKeyOrEnd),
            State::ArrayFirstValueOrEnd => self.replace_state(State::ArrayNextValueOrEnd),
            // the top-level value is complete
            State::Initial => {
                self.state_stack.pop();
            }
            State::ArrayNextValueOrEnd | State::ObjectFirstKeyOrEnd | State::ObjectNextKeyOrEnd => {}
        }
    }

    /// Called after a scalar value has been read in the current state.
    fn scalar_done(&mut self) {
        match self.state() {
            State::Initial => {
                self.state_stack.pop();
            }
            State::ArrayFirstValueOrEnd => self.replace_state(State::ArrayNextValueOrEnd),
            State::ObjectFieldValue => self.replace_state(State::ObjectNextKeyOrEnd),
            State::ArrayNextValueOrEnd | State::ObjectFirstKeyOrEnd | State::ObjectNextKeyOrEnd => {}
        }
    }

    fn start_array(&mut self, offset: usize) -> Token<'a> {
        self.state_stack.push(State::ArrayFirstValueOrEnd);
        Token::StartArray {
            offset: Offset(offset),
        }
    }

    fn end_array(&mut self, offset: usize) -> Token<'a> {
        self.end_value();
        Token::EndArray {
            offset: Offset(offset),
        }
    }

    fn start_object(&mut self, offset: usize) -> Token<'a> {
        self.state_stack.push(State::ObjectFirstKeyOrEnd);
        Token::StartObject {
            offset: Offset(offset),
        }
    }

    fn end_object(&mut self, offset: usize) -> Token<'a> {
        self.end_value();
        Token::EndObject {
            offset: Offset(offset),
        }
    }

    /// Reads a value in a position where any value may appear.
    fn read_value(&mut self) -> Result<Token<'a>, Error> {
        self.discard_whitespace();
        let offset = self.index;
        match self.peek_expect()? {
            b'{' => {
                self.advance();
                Ok(self.start_object(offset))
            }
            b'[' => {
                self.advance();
                Ok(self.start_array(offset))
            }
            b'"' => {
                let value = self.read_string()?;
                self.scalar_done();
                Ok(Token::ValueString {
                    offset: Offset(offset),
                    value: EscapedStr::new(value),
                })
            }
            byte => {
                let token = match byte {
                    b'n' => {
                        self.expect_literal(b"null")?;
                        Token::ValueNull {
                            offset: Offset(offset),
                        }
                    }
                    b't' => {
                        self.expect_literal(b"true")?;
                        Token::ValueBool {
                            offset: Offset(offset),
                            value: true,
                        }
                    }
                    b'f' => {
                        self.expect_literal(b"false")?;
                        Token::ValueBool {
                            offset: Offset(offset),
                            value: false,
                        }
                    }
                    b'-' | b'0'..=b'9' => Token::ValueNumber {
                        offset: Offset(offset),
                        value: self.read_number()?,
                    },
                    byte => {
                        return Err(self.error(ErrorKind::UnexpectedToken(
                            byte as char,
                            "'{', '[', '\"', 'null', 'true', 'false', <number>",
                        )))
                    }
                };
                self.scalar_done();
                Ok(token)
            }
        }
    }

    fn expect_literal(&mut self, literal: &'static [u8]) -> Result<(), Error> {
        let end = self.index + literal.len();
        match self.input.get(self.index..end) {
            Some(found) if found == literal => {
                self.index = end;
                Ok(())
            }
            _ => Err(self.error(ErrorKind::ExpectedLiteral(
                String::from_utf8_lossy(literal).into(),
            ))),
        }
    }

    /// Reads a string and returns the still-escaped contents between the quotes.
    fn read_string(&mut self) -> Result<&'a str, Error> {
        let quote = self.next_expect()?;
        debug_assert_eq!(b'"', quote);
        let start = self.index;
        loop {
            match self.peek_expect()? {
                b'"' => {
                    let value = std::str::from_utf8(&self.input[start..self.index])
                        .map_err(|_| self.error_at(start, ErrorKind::InvalidUtf8))?;
                    self.advance();
                    return Ok(value);
                }
                b'\\' => {
                    self.advance();
                    match self.next_expect()? {
                        b'\\' | b'/' | b'"' | b'b' | b'f' | b'n' | b'r' | b't' | b'u' => {}
                        byte => {
                            return Err(self.error_at(
                                self.index - 1,
                                ErrorKind::InvalidEscape(byte as char),
                            ))
                        }
                    }
                }
                byte @ 0x00..=0x1F => {
                    return Err(self.error(ErrorKind::UnexpectedControlCharacter(byte)))
                }
                _ => self.advance(),
            }
        }
    }

    fn scan_digits(&mut self) {
        while let Some(b'0'..=b'9') = self.peek_byte() {
            self.advance();
        }
    }

    fn read_number(&mut self) -> Result<Number, Error> {
        let start = self.index;
        let mut negative = false;
        let mut floating = false;
        if self.peek_byte() == Some(b'-') {
            negative = true;
            self.advance();
        }
        let digits_start = self.index;
        self.scan_digits();
        if self.index == digits_start {
            return Err(self.error_at(start, ErrorKind::InvalidNumber));
        }
        if self.peek_byte() == Some(b'.') {
            floating = true;
            self.advance();
            let fraction_start = self.index;
            self.scan_digits();
            if self.index == fraction_start {
                return Err(self.error_at(start, ErrorKind::InvalidNumber));
            }
        }
        if let Some(b'e' | b'E') = self.peek_byte() {
            floating = true;
            self.advance();
            if let Some(b'+' | b'-') = self.peek_byte() {
                self.advance();
            }
            let exponent_start = self.index;
            self.scan_digits();
            if self.index == exponent_start {
                return Err(self.error_at(start, ErrorKind::InvalidNumber));
            }
        }
        // only ASCII digits and signs were consumed above
        let text = std::str::from_utf8(&self.input[start..self.index])
            .map_err(|_| self.error_at(start, ErrorKind::InvalidUtf8))?;
        let invalid = || Error::new(ErrorKind::InvalidNumber, Some(start));
        if floating {
            text.parse::<f64>().map(Number::Float).map_err(|_| invalid())
        } else if negative {
            match text.parse::<i64>() {
                Ok(value) => Ok(Number::NegInt(value)),
                // integers too large for i64 degrade to a float
                Err(_) => text.parse::<f64>().map(Number::Float).map_err(|_| invalid()),
            }
        } else {
            match text.parse::<u64>() {
                Ok(value) => Ok(Number::PosInt(value)),
                Err(_) => text.parse::<f64>().map(Number::Float).map_err(|_| invalid()),
            }
        }
    }

    fn state_array_next_value_or_end(&mut self) -> Result<Token<'a>, Error> {
        self.discard_whitespace();
        let offset = self.index;
        match self.peek_expect()? {
            b']' => {
                self.advance();
                Ok(self.end_array(offset))
            }
            b',' => {
                self.advance();
                self.read_value()
            }
            byte => Err(self.error(ErrorKind::UnexpectedToken(byte as char, "']', ','"))),
        }
    }

    fn read_object_key(&mut self) -> Result<Token<'a>, Error> {
        self.discard_whitespace();
        let offset = self.index;
        match self.peek_expect()? {
            b'"' => {
                let key = self.read_string()?;
                self.discard_whitespace();
                match self.next_expect()? {
                    b':' => {}
                    byte => {
                        return Err(self.error_at(
                            self.index - 1,
                            ErrorKind::UnexpectedToken(byte as char, "':'"),
                        ))
                    }
                }
                self.replace_state(State::ObjectFieldValue);
                Ok(Token::ObjectKey {
                    offset: Offset(offset),
                    key: EscapedStr::new(key),
                })
            }
            byte => Err(self.error(ErrorKind::UnexpectedToken(byte as char, "'\"'"))),
        }
    }

    fn state_object_first_key_or_end(&mut self) -> Result<Token<'a>, Error> {
        self.discard_whitespace();
        let offset = self.index;
        match self.peek_expect()? {
            b'}' => {
                self.advance();
                Ok(self.end_object(offset))
            }
            _ => self.read_object_key(),
        }
    }

    fn state_object_next_key_or_end(&mut self) -> Result<Token<'a>, Error> {
        self.discard_whitespace();
        let offset = self.index;
        match self.peek_expect()? {
            b'}' => {
                self.advance();
                Ok(self.end_object(offset))
            }
            b',' => {
                self.advance();
                self.read_object_key()
            }
            byte => Err(self.error(ErrorKind::UnexpectedToken(byte as char, "'}', ','"))),
        }
    }

    fn next_token(&mut self) -> Option<Result<Token<'a>, Error>> {
        if self.state_stack.is_empty() {
            self.discard_whitespace();
            return match self.peek_byte() {
                None => None,
                Some(_) => Some(Err(self.error(ErrorKind::TrailingData))),
            };
        }
        let result = match self.state() {
            State::Initial => {
                self.discard_whitespace();
                if self.peek_byte().is_none() {
                    self.state_stack.pop();
                    return None;
                }
                self.read_value()
            }
            State::ArrayFirstValueOrEnd => {
                self.discard_whitespace();
                let offset = self.index;
                match self.peek_byte() {
                    Some(b']') => {
                        self.advance();
                        Ok(self.end_array(offset))
                    }
                    _ => self.read_value(),
                }
            }
            State::ArrayNextValueOrEnd => self.state_array_next_value_or_end(),
            State::ObjectFirstKeyOrEnd => self.state_object_first_key_or_end(),
            State::ObjectNextKeyOrEnd => self.state_object_next_key_or_end(),
            State::ObjectFieldValue => self.read_value(),
        };
        Some(result)
    }
}

impl<'a> Iterator for JsonTokenIterator<'a> {
    type Item = Result<Token<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.next_token();
        if let Some(Err(_)) = next {
            self.failed = true;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::json_token_iter;
    use crate::deserialize::token::test::{
        end_array, end_object, object_key, start_array, start_object, value_bool, value_null,
        value_number, value_string,
    };
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use shapecodec_types::Number;

    #[test]
    fn test_empty() {
        assert!(json_token_iter(b"").next().is_none());
        assert!(json_token_iter(b" ").next().is_none());
        assert!(json_token_iter(b"\t").next().is_none());
    }

    #[test]
    fn test_empty_string() {
        let mut iter = json_token_iter(b"\"\"");
        assert_eq!(value_string(0, ""), iter.next());
        assert_eq!(None, iter.next());

        let mut iter = json_token_iter(b" \r\n\t \"\"  ");
        assert_eq!(value_string(5, ""), iter.next());
        assert_eq!(None, iter.next());
    }

    #[test]
    fn test_empty_array() {
        let mut iter = json_token_iter(b"[]");
        assert_eq!(start_array(0), iter.next());
        assert_eq!(end_array(1), iter.next());
        assert_eq!(None, iter.next());
    }

    #[test]
    fn test_empty_object() {
        let mut iter = json_token_iter(b"{ }");
        assert_eq!(start_object(0), iter.next());
        assert_eq!(end_object(2), iter.next());
        assert_eq!(None, iter.next());
    }

    #[test]
    fn test_literals() {
        assert_eq!(value_null(0), json_token_iter(b"null").next());
        assert_eq!(value_bool(0, true), json_token_iter(b"true").next());
        assert_eq!(value_bool(0, false), json_token_iter(b"false").next());
        assert!(json_token_iter(b"nul").next().unwrap().is_err());
    }

    #[test]
    fn test_numbers() {
        let parse = |input: &str| match json_token_iter(input.as_bytes()).next() {
            Some(Ok(super::Token::ValueNumber { value, .. })) => value,
            other => panic!("expected number, got {:?}", other),
        };
        assert_eq!(Number::PosInt(0), parse("0"));
        assert_eq!(Number::PosInt(u64::MAX), parse("18446744073709551615"));
        assert_eq!(Number::NegInt(-5), parse("-5"));
        assert_eq!(Number::Float(1.5), parse("1.5"));
        assert_eq!(Number::Float(-1e21), parse("-1e21"));
        assert_eq!(Number::Float(2.5e-3), parse("2.5E-3"));
        assert_eq!(Number::Float(1e20), parse("100000000000000000000"));
        assert!(json_token_iter(b"-").next().unwrap().is_err());
        assert!(json_token_iter(b"1.").next().unwrap().is_err());
        assert!(json_token_iter(b"1e").next().unwrap().is_err());
    }

    #[test]
    fn test_object_with_values() {
        let input = br#"{"a": 1, "b": [true, null], "c": {"d": "e"}}"#;
        let mut iter = json_token_iter(input);
        assert_eq!(start_object(0), iter.next());
        assert_eq!(object_key(1, "a"), iter.next());
        assert_eq!(value_number(6, Number::PosInt(1)), iter.next());
        assert_eq!(object_key(9, "b"), iter.next());
        assert_eq!(start_array(14), iter.next());
        assert_eq!(value_bool(15, true), iter.next());
        assert_eq!(value_null(21), iter.next());
        assert_eq!(end_array(25), iter.next());
        assert_eq!(object_key(28, "c"), iter.next());
        assert_eq!(start_object(33), iter.next());
        assert_eq!(object_key(34, "d"), iter.next());
        assert_eq!(value_string(39, "e"), iter.next());
        assert_eq!(end_object(42), iter.next());
        assert_eq!(end_object(43), iter.next());
        assert_eq!(None, iter.next());
    }

    #[test]
    fn test_escaped_string_stays_escaped() {
        let mut iter = json_token_iter(br#""a\"bA""#);
        assert_eq!(value_string(0, r#"a\"bA"#), iter.next());
    }

    #[test]
    fn test_errors_stop_iteration() {
        let mut iter = json_token_iter(b"[1 2]");
        assert_eq!(start_array(0), iter.next());
        assert_eq!(value_number(1, Number::PosInt(1)), iter.next());
        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(Some(3), err.offset());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_malformed_input() {
        let fails = |input: &[u8]| json_token_iter(input).any(|token| token.is_err());
        assert!(fails(b"{"));
        assert!(fails(b"["));
        assert!(fails(b"{\"a\"}"));
        assert!(fails(b"{\"a\": 1,}"));
        assert!(fails(b"[1,]"));
        assert!(fails(b"{1: 2}"));
        assert!(fails(b"\"unterminated"));
        assert!(fails(b"\"bad\\xescape\""));
        assert!(fails(b"\"\x01\""));
        assert!(fails(b"{} {}"));
        assert!(fails(b"]"));
    }

    #[test]
    fn test_invalid_utf8() {
        let err = json_token_iter(b"\"\xff\"").next().unwrap().unwrap_err();
        assert!(err.to_string().contains("UTF-8"), "{}", err);
    }

    proptest! {
        #[test]
        fn never_panics(input in proptest::collection::vec(any::<u8>(), 0..64)) {
            for _ in json_token_iter(&input) {}
        }

        #[test]
        fn serde_json_values_tokenize(value in "[a-z]{0,8}", number: i64, flag: bool) {
            let json = serde_json::json!({ "s": value, "n": number, "b": flag, "l": [number, null] });
            let text = serde_json::to_string(&json).unwrap();
            prop_assert!(json_token_iter(text.as_bytes()).all(|token| token.is_ok()));
        }
    }
}
