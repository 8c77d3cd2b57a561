/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::deserialize::error::{DeserializeError as Error, DeserializeErrorKind as ErrorKind};
use crate::escape::{unescape_string, EscapeError};
use shapecodec_types::date_time::Format;
use shapecodec_types::{base64, Blob, DateTime, Document, Number};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::iter::Peekable;

/// New-type around `&str` that indicates the string is an escaped JSON string.
/// Provides functions for retrieving the string in either form.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct EscapedStr<'a>(&'a str);

impl<'a> EscapedStr<'a> {
    /// Wraps an escaped string slice.
    pub fn new(value: &'a str) -> EscapedStr<'a> {
        EscapedStr(value)
    }

    /// Returns the escaped string value
    pub fn as_escaped_str(&self) -> &'a str {
        self.0
    }

    /// Unescapes the string and returns it.
    /// If the string doesn't need unescaping, it will be returned directly.
    pub fn to_unescaped(&self) -> Result<Cow<'a, str>, EscapeError> {
        unescape_string(self.0)
    }
}

/// Byte offset of a token in the input
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct Offset(pub usize);

impl Offset {
    /// Creates a custom error from the offset
    pub fn error(&self, msg: Cow<'static, str>) -> Error {
        Error::custom_at(msg, self.0)
    }
}

/// JSON tokens produced by [`json_token_iter`](crate::deserialize::json_token_iter).
#[derive(Debug, PartialEq)]
pub enum Token<'a> {
    /// `[`
    StartArray {
        /// Location of the token
        offset: Offset,
    },
    /// `]`
    EndArray {
        /// Location of the token
        offset: Offset,
    },
    /// An object key, including its trailing `:`
    ObjectKey {
        /// Location of the token
        offset: Offset,
        /// The still-escaped key
        key: EscapedStr<'a>,
    },
    /// `{`
    StartObject {
        /// Location of the token
        offset: Offset,
    },
    /// `}`
    EndObject {
        /// Location of the token
        offset: Offset,
    },
    /// `true` or `false`
    ValueBool {
        /// Location of the token
        offset: Offset,
        /// The literal value
        value: bool,
    },
    /// `null`
    ValueNull {
        /// Location of the token
        offset: Offset,
    },
    /// A number
    ValueNumber {
        /// Location of the token
        offset: Offset,
        /// The parsed number
        value: Number,
    },
    /// A string
    ValueString {
        /// Location of the token
        offset: Offset,
        /// The still-escaped string
        value: EscapedStr<'a>,
    },
}

impl<'a> Token<'a> {
    /// Location of this token in the input.
    pub fn offset(&self) -> Offset {
        use Token::*;
        *match self {
            StartArray { offset } => offset,
            EndArray { offset } => offset,
            ObjectKey { offset, .. } => offset,
            StartObject { offset } => offset,
            EndObject { offset } => offset,
            ValueBool { offset, .. } => offset,
            ValueNull { offset } => offset,
            ValueNumber { offset, .. } => offset,
            ValueString { offset, .. } => offset,
        }
    }

    /// Builds an error from the token's offset
    pub fn error(&self, msg: Cow<'static, str>) -> Error {
        self.offset().error(msg)
    }
}

fn missing(expected: &'static str) -> Error {
    Error::custom(format!("expected {}, found end of stream", expected))
}

macro_rules! expect_fn {
    ($name:ident, $typ:ident, $doc:literal) => {
        #[doc = $doc]
        pub fn $name(token_result: Option<Result<Token<'_>, Error>>) -> Result<(), Error> {
            match token_result.transpose()? {
                Some(Token::$typ { .. }) => Ok(()),
                Some(token) => Err(token.error(Cow::Borrowed(concat!(
                    "expected ",
                    stringify!($typ)
                )))),
                None => Err(Error::custom(concat!("expected ", stringify!($typ)))),
            }
        }
    };
}

expect_fn!(expect_start_object, StartObject, "Fails unless the next token opens an object.");
expect_fn!(expect_start_array, StartArray, "Fails unless the next token opens an array.");

/// Expects a boolean or null token.
pub fn expect_bool_or_null(token: Option<Result<Token<'_>, Error>>) -> Result<Option<bool>, Error> {
    match token.transpose()? {
        Some(Token::ValueNull { .. }) => Ok(None),
        Some(Token::ValueBool { value, .. }) => Ok(Some(value)),
        Some(token) => Err(token.error("expected null or boolean value".into())),
        None => Err(missing("null or boolean value")),
    }
}

/// Expects a number or null token.
///
/// Non-finite floats travel as the strings `"NaN"`, `"Infinity"` and `"-Infinity"`, which are
/// accepted here as well.
pub fn expect_number_or_null(
    token: Option<Result<Token<'_>, Error>>,
) -> Result<Option<Number>, Error> {
    match token.transpose()? {
        Some(Token::ValueNull { .. }) => Ok(None),
        Some(Token::ValueNumber { value, .. }) => Ok(Some(value)),
        Some(Token::ValueString { value, offset }) => match value.as_escaped_str() {
            "NaN" => Ok(Some(Number::Float(f64::NAN))),
            "Infinity" => Ok(Some(Number::Float(f64::INFINITY))),
            "-Infinity" => Ok(Some(Number::Float(f64::NEG_INFINITY))),
            other => Err(offset.error(
                format!("only `Infinity`, `-Infinity`, `NaN` can represent a float as a string but found `{}`", other).into(),
            )),
        },
        Some(token) => Err(token.error("expected null or number value".into())),
        None => Err(missing("null or number value")),
    }
}

/// Expects a string or null token. The string is returned still escaped.
pub fn expect_string_or_null(
    token: Option<Result<Token<'_>, Error>>,
) -> Result<Option<EscapedStr<'_>>, Error> {
    match token.transpose()? {
        Some(Token::ValueNull { .. }) => Ok(None),
        Some(Token::ValueString { value, .. }) => Ok(Some(value)),
        Some(token) => Err(token.error("expected null or string value".into())),
        None => Err(missing("null or string value")),
    }
}

/// Expects a base64-encoded string or null token and decodes it.
pub fn expect_blob_or_null(token: Option<Result<Token<'_>, Error>>) -> Result<Option<Blob>, Error> {
    match token.transpose()? {
        Some(Token::ValueNull { .. }) => Ok(None),
        Some(Token::ValueString { value, offset }) => {
            let decoded = base64::decode(value.to_unescaped()?.as_ref())
                .map_err(|err| Error::from(err).with_offset(offset.0))?;
            Ok(Some(Blob::new(decoded)))
        }
        Some(token) => Err(token.error("expected null or base64 string value".into())),
        None => Err(missing("null or base64 string value")),
    }
}

/// Expects a timestamp in the given format or null.
///
/// Epoch seconds are read from a number token; the other formats from a string token. A value in
/// any other format is an error.
pub fn expect_timestamp_or_null(
    token: Option<Result<Token<'_>, Error>>,
    format: Format,
) -> Result<Option<DateTime>, Error> {
    match (token.transpose()?, format) {
        (Some(Token::ValueNull { .. }), _) => Ok(None),
        (Some(Token::ValueNumber { value, .. }), Format::EpochSeconds) => {
            Ok(Some(DateTime::from_secs_f64(value.to_f64_lossy())))
        }
        (Some(Token::ValueString { value, offset }), Format::DateTime | Format::HttpDate) => {
            let parsed = DateTime::from_str(value.to_unescaped()?.as_ref(), format)
                .map_err(|err| Error::from(err).with_offset(offset.0))?;
            Ok(Some(parsed))
        }
        (Some(token), Format::EpochSeconds) => {
            Err(token.error("expected null or epoch-seconds number".into()))
        }
        (Some(token), _) => Err(token.error("expected null or timestamp string".into())),
        (None, _) => Err(missing("null or timestamp")),
    }
}

/// Reads one complete JSON value of any type as a [`Document`].
pub fn expect_document<'a, I>(tokens: &mut Peekable<I>) -> Result<Document, Error>
where
    I: Iterator<Item = Result<Token<'a>, Error>>,
{
    expect_document_inner(tokens, 0)
}

/// Deepest nesting of aggregates a decoder descends into before giving up.
pub const MAX_NESTING_DEPTH: usize = 256;

const MAX_DOCUMENT_RECURSION: usize = MAX_NESTING_DEPTH;

/// Fails once a decoder is `depth` aggregates deep and `depth` passes [`MAX_NESTING_DEPTH`].
///
/// The error carries the offset of the next token so body snapshots can point at it.
pub fn check_depth<'a, I>(tokens: &mut Peekable<I>, depth: usize) -> Result<(), Error>
where
    I: Iterator<Item = Result<Token<'a>, Error>>,
{
    if depth <= MAX_NESTING_DEPTH {
        return Ok(());
    }
    let msg = format!("exceeded max nesting depth of {}", MAX_NESTING_DEPTH);
    Err(match tokens.peek() {
        Some(Ok(token)) => token.error(msg.into()),
        _ => Error::custom(msg),
    })
}

fn expect_document_inner<'a, I>(tokens: &mut Peekable<I>, depth: usize) -> Result<Document, Error>
where
    I: Iterator<Item = Result<Token<'a>, Error>>,
{
    if depth >= MAX_DOCUMENT_RECURSION {
        return Err(Error::custom(
            "exceeded max recursion depth while parsing document",
        ));
    }
    match tokens.next().transpose()? {
        Some(Token::ValueNull { .. }) => Ok(Document::Null),
        Some(Token::ValueBool { value, .. }) => Ok(Document::Bool(value)),
        Some(Token::ValueNumber { value, .. }) => Ok(Document::Number(value)),
        Some(Token::ValueString { value, .. }) => {
            Ok(Document::String(value.to_unescaped()?.into_owned()))
        }
        Some(Token::StartObject { .. }) => {
            let mut object = BTreeMap::new();
            loop {
                match tokens.next().transpose()? {
                    Some(Token::EndObject { .. }) => break,
                    Some(Token::ObjectKey { key, .. }) => {
                        let key = key.to_unescaped()?.into_owned();
                        let value = expect_document_inner(tokens, depth + 1)?;
                        object.insert(key, value);
                    }
                    _ => return Err(Error::custom("expected object key or end object")),
                }
            }
            Ok(Document::Object(object))
        }
        Some(Token::StartArray { .. }) => {
            let mut array = Vec::new();
            loop {
                match tokens.peek() {
                    Some(Ok(Token::EndArray { .. })) => {
                        tokens.next().transpose()?;
                        break;
                    }
                    _ => array.push(expect_document_inner(tokens, depth + 1)?),
                }
            }
            Ok(Document::Array(array))
        }
        Some(Token::EndObject { .. }) | Some(Token::ObjectKey { .. }) => {
            unreachable!("end object and object key are handled in the object branch")
        }
        Some(Token::EndArray { .. }) => unreachable!("end array is handled in the array branch"),
        None => Err(Error::custom("expected value")),
    }
}

/// Skips an entire value in the token stream. Errors if it isn't a value.
pub fn skip_value<'a>(
    tokens: &mut impl Iterator<Item = Result<Token<'a>, Error>>,
) -> Result<(), Error> {
    skip_inner(0, tokens)
}

/// Consumes the rest of the enclosing object or array, including its end token.
pub fn skip_to_end<'a>(
    tokens: &mut impl Iterator<Item = Result<Token<'a>, Error>>,
) -> Result<(), Error> {
    skip_inner(1, tokens)
}

fn skip_inner<'a>(
    mut depth: usize,
    tokens: &mut impl Iterator<Item = Result<Token<'a>, Error>>,
) -> Result<(), Error> {
    // iterative so deeply nested input can't exhaust the stack
    loop {
        match tokens.next().transpose()? {
            Some(Token::StartObject { .. }) | Some(Token::StartArray { .. }) => depth += 1,
            Some(token @ Token::EndObject { .. }) | Some(token @ Token::EndArray { .. }) => {
                if depth == 0 {
                    return Err(token.error("expected value".into()));
                }
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Some(Token::ValueNull { .. })
            | Some(Token::ValueBool { .. })
            | Some(Token::ValueNumber { .. })
            | Some(Token::ValueString { .. }) => {
                if depth == 0 {
                    return Ok(());
                }
            }
            Some(Token::ObjectKey { .. }) => {}
            None => return Err(Error::custom("expected value")),
        }
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::deserialize::json_token_iter;

    pub fn start_array<'a>(offset: usize) -> Option<Result<Token<'a>, Error>> {
        Some(Ok(Token::StartArray {
            offset: Offset(offset),
        }))
    }

    pub fn end_array<'a>(offset: usize) -> Option<Result<Token<'a>, Error>> {
        Some(Ok(Token::EndArray {
            offset: Offset(offset),
        }))
    }

    pub fn start_object<'a>(offset: usize) -> Option<Result<Token<'a>, Error>> {
        Some(Ok(Token::StartObject {
            offset: Offset(offset),
        }))
    }

    pub fn end_object<'a>(offset: usize) -> Option<Result<Token<'a>, Error>> {
        Some(Ok(Token::EndObject {
            offset: Offset(offset),
        }))
    }

    pub fn object_key(offset: usize, key: &str) -> Option<Result<Token<'_>, Error>> {
        Some(Ok(Token::ObjectKey {
            offset: Offset(offset),
            key: EscapedStr::new(key),
        }))
    }

    pub fn value_bool<'a>(offset: usize, boolean: bool) -> Option<Result<Token<'a>, Error>> {
        Some(Ok(Token::ValueBool {
            offset: Offset(offset),
            value: boolean,
        }))
    }

    pub fn value_number<'a>(offset: usize, number: Number) -> Option<Result<Token<'a>, Error>> {
        Some(Ok(Token::ValueNumber {
            offset: Offset(offset),
            value: number,
        }))
    }

    pub fn value_null<'a>(offset: usize) -> Option<Result<Token<'a>, Error>> {
        Some(Ok(Token::ValueNull {
            offset: Offset(offset),
        }))
    }

    pub fn value_string(offset: usize, string: &str) -> Option<Result<Token<'_>, Error>> {
        Some(Ok(Token::ValueString {
            offset: Offset(offset),
            value: EscapedStr::new(string),
        }))
    }

    #[test]
    fn skip_simple_value() {
        let mut tokens = json_token_iter(b"null true");
        skip_value(&mut tokens).unwrap();
        assert!(matches!(
            tokens.next(),
            Some(Err(_)),
        ), "trailing data after the top-level value is rejected");
    }

    #[test]
    fn skip_array() {
        let mut tokens = json_token_iter(b"[1, 2, 3, 4] true");
        skip_value(&mut tokens).unwrap();
        assert!(tokens.next().unwrap().is_err());

        let mut tokens = json_token_iter(b"[[1], [], [3, [true]]]");
        skip_value(&mut tokens).unwrap();
        assert!(tokens.next().is_none());
    }

    #[test]
    fn skip_nested_inside_object() {
        let input = br#"{"one": {"a": [1, {"b": []}]}, "two": 2}"#;
        let mut tokens = json_token_iter(input);
        assert_eq!(start_object(0), tokens.next());
        assert_eq!(object_key(1, "one"), tokens.next());
        skip_value(&mut tokens).unwrap();
        assert_eq!(object_key(31, "two"), tokens.next());
        assert_eq!(value_number(38, Number::PosInt(2)), tokens.next());
        assert_eq!(end_object(39), tokens.next());
        assert_eq!(None, tokens.next());
    }

    #[test]
    fn skip_handles_very_deep_nesting() {
        let mut input = Vec::new();
        input.extend(std::iter::repeat(b'[').take(200_000));
        input.extend(std::iter::repeat(b']').take(200_000));
        let mut tokens = json_token_iter(&input);
        skip_value(&mut tokens).unwrap();
        assert!(tokens.next().is_none());

        // unterminated nesting is an error, not a crash
        let mut tokens = json_token_iter(&input[..200_000]);
        assert!(skip_value(&mut tokens).is_err());
    }

    #[test]
    fn depth_check_points_at_the_next_token() {
        let mut tokens = json_token_iter(b"  [1]").peekable();
        assert!(check_depth(&mut tokens, MAX_NESTING_DEPTH).is_ok());
        let err = check_depth(&mut tokens, MAX_NESTING_DEPTH + 1).unwrap_err();
        assert_eq!(Some(2), err.offset());
        assert!(err.to_string().contains("max nesting depth"), "{}", err);
    }

    #[test]
    fn skip_rest_of_object() {
        let mut tokens = json_token_iter(br#"{"a": 1, "b": [true], "c": {}}"#);
        assert_eq!(start_object(0), tokens.next());
        skip_to_end(&mut tokens).unwrap();
        assert_eq!(None, tokens.next());
    }

    #[test]
    fn mismatched_delimiters_fail_fast() {
        assert!(expect_start_object(start_array(0)).is_err());
        assert!(expect_start_array(start_object(0)).is_err());
        assert!(expect_start_object(None).is_err());
        let err = expect_start_object(value_null(5)).unwrap_err();
        assert_eq!(Some(5), err.offset());
        expect_start_object(start_object(0)).unwrap();
        expect_start_array(start_array(3)).unwrap();
    }

    #[test]
    fn test_expect_string_or_null() {
        assert_eq!(None, expect_string_or_null(value_null(0)).unwrap());
        assert_eq!(
            Some(EscapedStr::new("test\\n")),
            expect_string_or_null(value_string(0, "test\\n")).unwrap()
        );
        assert!(expect_string_or_null(value_bool(0, true)).is_err());
    }

    #[test]
    fn test_expect_number_or_null() {
        assert_eq!(None, expect_number_or_null(value_null(0)).unwrap());
        assert_eq!(
            Some(Number::PosInt(5)),
            expect_number_or_null(value_number(0, Number::PosInt(5))).unwrap()
        );
        match expect_number_or_null(value_string(0, "NaN")).unwrap() {
            Some(Number::Float(v)) => assert!(v.is_nan()),
            other => panic!("expected NaN, got {:?}", other),
        }
        assert_eq!(
            Some(Number::Float(f64::NEG_INFINITY)),
            expect_number_or_null(value_string(0, "-Infinity")).unwrap()
        );
        assert!(expect_number_or_null(value_string(0, "1")).is_err());
        assert!(expect_number_or_null(value_bool(0, true)).is_err());
    }

    #[test]
    fn test_expect_blob_or_null() {
        assert_eq!(None, expect_blob_or_null(value_null(0)).unwrap());
        assert_eq!(
            Some(Blob::new(b"hello!".to_vec())),
            expect_blob_or_null(value_string(0, "aGVsbG8h")).unwrap()
        );
        let err = expect_blob_or_null(value_string(7, "not base64!")).unwrap_err();
        assert_eq!(Some(7), err.offset());
    }

    #[test]
    fn test_expect_timestamp_or_null() {
        assert_eq!(
            None,
            expect_timestamp_or_null(value_null(0), Format::HttpDate).unwrap()
        );
        assert_eq!(
            Some(DateTime::from_secs_and_nanos(1576540098, 520_000_000)),
            expect_timestamp_or_null(
                value_number(0, Number::Float(1576540098.52)),
                Format::EpochSeconds
            )
            .unwrap()
        );
        assert_eq!(
            Some(DateTime::from_secs(1576540098)),
            expect_timestamp_or_null(
                value_string(0, "Mon, 16 Dec 2019 23:48:18 GMT"),
                Format::HttpDate
            )
            .unwrap()
        );
        assert_eq!(
            Some(DateTime::from_secs(1576540098)),
            expect_timestamp_or_null(value_string(0, "2019-12-16T23:48:18Z"), Format::DateTime)
                .unwrap()
        );
        // a value in the wrong format is a hard failure
        assert!(expect_timestamp_or_null(
            value_string(0, "2019-12-16T23:48:18Z"),
            Format::HttpDate
        )
        .is_err());
        assert!(expect_timestamp_or_null(
            value_number(0, Number::PosInt(1576540098)),
            Format::DateTime
        )
        .is_err());
    }

    #[test]
    fn test_document_recursion_limit() {
        let mut value = String::new();
        value.extend(std::iter::repeat('[').take(300));
        value.extend(std::iter::repeat(']').take(300));
        expect_document(&mut json_token_iter(value.as_bytes()).peekable())
            .expect_err("recursion limit exceeded");
    }

    #[test]
    fn test_document() {
        let input = br#"{"a": [1, -2, 3.5, "x", null, true], "b": {}}"#;
        let document = expect_document(&mut json_token_iter(input).peekable()).unwrap();
        let mut expected = BTreeMap::new();
        expected.insert(
            "a".to_string(),
            Document::Array(vec![
                Document::Number(Number::PosInt(1)),
                Document::Number(Number::NegInt(-2)),
                Document::Number(Number::Float(3.5)),
                Document::String("x".into()),
                Document::Null,
                Document::Bool(true),
            ]),
        );
        expected.insert("b".to_string(), Document::Object(BTreeMap::new()));
        assert_eq!(Document::Object(expected), document);
    }
}
