/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Utilities for parsing bound members out of response headers

use shapecodec_types::date_time::Format;
use shapecodec_types::primitive::Parse;
use shapecodec_types::DateTime;
use std::borrow::Cow;
use thiserror::Error;

/// A header value could not be parsed into the bound member type.
#[derive(Debug, Error)]
#[error("failed to parse header `{header}`: {message}")]
pub struct ParseError {
    header: String,
    message: Cow<'static, str>,
}

impl ParseError {
    fn new(header: &str, message: impl Into<Cow<'static, str>>) -> Self {
        ParseError {
            header: header.to_owned(),
            message: message.into(),
        }
    }
}

/// Read all the dates from the header map at `key` according the `format`
///
/// This is separate from `read_many` below because `http-date` values contain commas, so
/// parsing must be driven by [`DateTime::read`].
pub fn many_dates(
    headers: &http::HeaderMap,
    key: &str,
    format: Format,
) -> Result<Vec<DateTime>, ParseError> {
    let mut out = vec![];
    for header in headers.get_all(key).iter() {
        let mut header = header
            .to_str()
            .map_err(|_| ParseError::new(key, "header value is not ASCII"))?;
        while !header.is_empty() {
            let (v, next) = DateTime::read(header.trim_start(), format, ',')
                .map_err(|err| ParseError::new(key, err.to_string()))?;
            out.push(v);
            header = next;
        }
    }
    Ok(out)
}

/// Read many comma / header delimited values from HTTP headers for smithy primitive types
pub fn read_many<T>(headers: &http::HeaderMap, key: &str) -> Result<Vec<T>, ParseError>
where
    T: Parse,
{
    let mut out = vec![];
    for header in headers.get_all(key).iter() {
        let mut header = header.as_bytes();
        while !header.is_empty() {
            let (v, next) = read_one::<T>(header).map_err(|msg| ParseError::new(key, msg))?;
            out.push(v);
            header = next;
        }
    }
    Ok(out)
}

/// Read many comma / header delimited strings. Surrounding whitespace is dropped.
pub fn read_many_strings(headers: &http::HeaderMap, key: &str) -> Result<Vec<String>, ParseError> {
    let mut out = vec![];
    for header in headers.get_all(key).iter() {
        let header = header
            .to_str()
            .map_err(|_| ParseError::new(key, "header value is not ASCII"))?;
        out.extend(header.split(',').map(|s| s.trim().to_owned()));
    }
    Ok(out)
}

/// Reads exactly zero or one value for a scalar bound to `key`.
pub fn one_or_none<T>(headers: &http::HeaderMap, key: &str) -> Result<Option<T>, ParseError>
where
    T: Parse,
{
    let mut values = read_many::<T>(headers, key)?;
    match values.len() {
        0 | 1 => Ok(values.pop()),
        n => Err(ParseError::new(
            key,
            format!("expected one value but found {}", n),
        )),
    }
}

/// Reads the raw value of a string header bound to `key`.
pub fn one_string(headers: &http::HeaderMap, key: &str) -> Result<Option<String>, ParseError> {
    headers
        .get(key)
        .map(|value| {
            value
                .to_str()
                .map(str::to_owned)
                .map_err(|_| ParseError::new(key, "header value is not ASCII"))
        })
        .transpose()
}

/// Reads a single timestamp bound to `key`.
pub fn one_date(
    headers: &http::HeaderMap,
    key: &str,
    format: Format,
) -> Result<Option<DateTime>, ParseError> {
    let mut values = many_dates(headers, key, format)?;
    match values.len() {
        0 | 1 => Ok(values.pop()),
        n => Err(ParseError::new(
            key,
            format!("expected one timestamp but found {}", n),
        )),
    }
}

/// Read one comma delimited value for smithy primitive types
fn read_one<T>(s: &[u8]) -> Result<(T, &[u8]), Cow<'static, str>>
where
    T: Parse,
{
    let (head, rest) = split_at_delim(s);
    let head = std::str::from_utf8(head).map_err(|_| "header value is not UTF-8")?;
    let value = T::parse_smithy_primitive(head.trim()).map_err(|err| err.to_string())?;
    Ok((value, rest))
}

fn split_at_delim(s: &[u8]) -> (&[u8], &[u8]) {
    match s.iter().position(|b| b == &b',') {
        Some(idx) => (&s[..idx], &s[idx + 1..]),
        None => (s, &[]),
    }
}

#[cfg(test)]
mod test {
    use super::{many_dates, one_date, one_or_none, read_many, read_many_strings};
    use pretty_assertions::assert_eq;
    use shapecodec_types::date_time::Format;
    use shapecodec_types::DateTime;

    fn headers(pairs: &[(&'static str, &'static str)]) -> http::HeaderMap {
        let mut map = http::HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, v.parse().unwrap());
        }
        map
    }

    #[test]
    fn read_many_bools() {
        let headers = headers(&[
            ("X-Bool-Multi", "true,false"),
            ("X-Bool-Multi", "true"),
            ("X-Bool", "true"),
            ("X-Bool-Invalid", "truth,falsy"),
            ("X-Bool-Single", "true, false,true,true"),
        ]);
        assert_eq!(
            read_many::<bool>(&headers, "X-Bool-Multi").expect("valid"),
            vec![true, false, true]
        );
        assert_eq!(read_many::<bool>(&headers, "X-Bool").unwrap(), vec![true]);
        assert_eq!(
            read_many::<bool>(&headers, "X-Bool-Single").unwrap(),
            vec![true, false, true, true]
        );
        read_many::<bool>(&headers, "X-Bool-Invalid").expect_err("invalid");
    }

    #[test]
    fn read_many_integers() {
        let headers = headers(&[
            ("X-Multi", "123,456"),
            ("X-Multi", "789"),
            ("X-Num-Invalid", "12ef3"),
        ]);
        assert_eq!(
            read_many::<i32>(&headers, "X-Multi").expect("valid"),
            vec![123, 456, 789]
        );
        read_many::<i32>(&headers, "X-Num-Invalid").expect_err("invalid");
        assert_eq!(read_many::<i32>(&headers, "X-Missing").unwrap(), vec![]);
    }

    #[test]
    fn single_values() {
        let headers = headers(&[("X-One", "7"), ("X-Two", "1,2")]);
        assert_eq!(one_or_none::<i64>(&headers, "X-One").unwrap(), Some(7));
        assert_eq!(one_or_none::<i64>(&headers, "X-None").unwrap(), None);
        one_or_none::<i64>(&headers, "X-Two").expect_err("two values");
    }

    #[test]
    fn strings_split_on_commas() {
        let headers = headers(&[("X-Strings", "a, b"), ("X-Strings", "c")]);
        assert_eq!(
            read_many_strings(&headers, "X-Strings").unwrap(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn http_dates_contain_commas() {
        let headers = headers(&[(
            "X-Dates",
            "Mon, 16 Dec 2019 23:48:18 GMT, Tue, 17 Dec 2019 23:48:18 GMT",
        )]);
        let dates = many_dates(&headers, "X-Dates", Format::HttpDate).unwrap();
        assert_eq!(
            dates,
            vec![
                DateTime::from_secs(1576540098),
                DateTime::from_secs(1576626498)
            ]
        );
        one_date(&headers, "X-Dates", Format::HttpDate).expect_err("two dates");
        many_dates(&headers, "X-Dates", Format::DateTime).expect_err("wrong format");
    }
}
