/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Error discriminator extraction for the JSON protocols.

use crate::deserialize::token::skip_value;
use crate::deserialize::{json_token_iter, DeserializeError, Token};
use http::HeaderMap;
use shapecodec_types::error::{Builder as ErrorMetadataBuilder, REQUEST_ID};
use shapecodec_types::ErrorMetadata;
use std::borrow::Cow;

/// Header carrying the error discriminator unless the service configures another one.
pub const DEFAULT_ERROR_TYPE_HEADER: &str = "X-Amzn-Errortype";

/// Header carrying the request id on JSON responses.
pub const REQUEST_ID_HEADER: &str = "x-amzn-requestid";

/// Code and message found in a JSON error body.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ErrorBody<'a> {
    /// Value of the `code` field, falling back to `__type`.
    pub code: Option<Cow<'a, str>>,
    /// Value of `message`, `Message` or `errorMessage`.
    pub message: Option<Cow<'a, str>>,
}

/// Reduces a raw discriminator to the bare shape name.
///
/// Text after a `:` is dropped (some services append a URL), then any namespace ending in `#`.
pub fn sanitize_error_code(error_code: &str) -> &str {
    // Trim a trailing URL from the error code, beginning with a `:`
    let error_code = match error_code.find(':') {
        Some(idx) => &error_code[..idx],
        None => error_code,
    };

    // Trim a prefixing namespace from the error code, beginning with a `#`
    match error_code.find('#') {
        Some(idx) => &error_code[idx + 1..],
        None => error_code,
    }
}

/// Reads the top-level `code`, `__type` and message fields from an error body.
///
/// An empty body yields an empty [`ErrorBody`]. Nested values are skipped.
pub fn parse_error_body(bytes: &[u8]) -> Result<ErrorBody<'_>, DeserializeError> {
    let mut tokens = json_token_iter(bytes).peekable();
    let (mut typ, mut code, mut message) = (None, None, None);
    if let Some(Token::StartObject { .. }) = tokens.next().transpose()? {
        loop {
            match tokens.next().transpose()? {
                Some(Token::EndObject { .. }) => break,
                Some(Token::ObjectKey { key, .. }) => {
                    if let Some(Ok(Token::ValueString { value, .. })) = tokens.peek() {
                        match key.as_escaped_str() {
                            "code" => code = Some(value.to_unescaped()?),
                            "__type" => typ = Some(value.to_unescaped()?),
                            "message" | "Message" | "errorMessage" => {
                                message = Some(value.to_unescaped()?)
                            }
                            _ => {}
                        }
                    }
                    skip_value(&mut tokens)?;
                }
                _ => return Err(DeserializeError::custom("expected object key or end object")),
            }
        }
        if tokens.next().is_some() {
            return Err(DeserializeError::custom(
                "found more JSON tokens after completing parsing",
            ));
        }
    }
    Ok(ErrorBody {
        code: code.or(typ),
        message,
    })
}

/// Builds error metadata from a JSON error response.
///
/// The discriminator comes from `error_type_header` when present, otherwise from the body.
pub fn parse_error_metadata(
    payload: &[u8],
    headers: &HeaderMap,
    error_type_header: &str,
) -> Result<ErrorMetadataBuilder, DeserializeError> {
    let ErrorBody { code, message } = parse_error_body(payload)?;
    let mut builder = error_metadata_from_headers(headers, error_type_header);
    if let (None, Some(code)) = (builder.peek_code(), code) {
        builder = builder.code(sanitize_error_code(&code));
    }
    if let Some(message) = message {
        builder = builder.message(message);
    }
    Ok(builder)
}

/// Builds error metadata from response headers alone.
///
/// Used directly when the error body can't be parsed: the discriminator in
/// `error_type_header` still names the error, and the request id is kept for diagnostics.
pub fn error_metadata_from_headers(
    headers: &HeaderMap,
    error_type_header: &str,
) -> ErrorMetadataBuilder {
    let mut builder = ErrorMetadata::builder();
    if let Some(code) = headers
        .get(error_type_header)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    {
        builder = builder.code(sanitize_error_code(code));
    }
    match headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(request_id) => builder.custom(REQUEST_ID, request_id),
        None => builder,
    }
}

#[cfg(test)]
mod test {
    use super::{
        error_metadata_from_headers, parse_error_body, parse_error_metadata, sanitize_error_code,
        ErrorBody,
    };
    use super::{DEFAULT_ERROR_TYPE_HEADER, REQUEST_ID_HEADER};
    use http::{HeaderMap, HeaderValue};
    use pretty_assertions::assert_eq;
    use std::borrow::Cow;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn error_metadata() {
        let metadata = parse_error_metadata(
            br#"{ "__type": "FooError", "message": "Go to foo" }"#,
            &HeaderMap::new(),
            DEFAULT_ERROR_TYPE_HEADER,
        )
        .unwrap()
        .build();
        assert_eq!(Some("FooError"), metadata.code());
        assert_eq!(Some("Go to foo"), metadata.message());
    }

    #[test]
    fn error_type_precedence() {
        // the header wins over both body fields
        let metadata = parse_error_metadata(
            br#"{ "code": "BodyCode", "__type": "TypeCode" }"#,
            &headers(&[(DEFAULT_ERROR_TYPE_HEADER, "HeaderCode:http://internal.amazon.com/")]),
            DEFAULT_ERROR_TYPE_HEADER,
        )
        .unwrap()
        .build();
        assert_eq!(Some("HeaderCode"), metadata.code());

        // `code` wins over `__type`
        let metadata = parse_error_metadata(
            br#"{ "__type": "TypeCode", "code": "BodyCode" }"#,
            &HeaderMap::new(),
            DEFAULT_ERROR_TYPE_HEADER,
        )
        .unwrap()
        .build();
        assert_eq!(Some("BodyCode"), metadata.code());
    }

    #[test]
    fn custom_error_type_header() {
        let metadata = parse_error_metadata(
            b"{}",
            &headers(&[("X-Error-Type", "ThrottlingException")]),
            "X-Error-Type",
        )
        .unwrap()
        .build();
        assert_eq!(Some("ThrottlingException"), metadata.code());
    }

    #[test]
    fn request_id_from_header() {
        let metadata = parse_error_metadata(
            b"",
            &headers(&[(REQUEST_ID_HEADER, "1234")]),
            DEFAULT_ERROR_TYPE_HEADER,
        )
        .unwrap()
        .build();
        assert_eq!(Some("1234"), metadata.request_id());
        assert_eq!(None, metadata.code());
    }

    #[test]
    fn header_code_survives_an_unparseable_body() {
        let headers = headers(&[
            (DEFAULT_ERROR_TYPE_HEADER, "aws.api#ThrottlingException:http://internal/"),
            (REQUEST_ID_HEADER, "abc"),
        ]);
        assert!(parse_error_metadata(b"<html>Bad Gateway</html>", &headers, DEFAULT_ERROR_TYPE_HEADER).is_err());
        let metadata = error_metadata_from_headers(&headers, DEFAULT_ERROR_TYPE_HEADER).build();
        assert_eq!(Some("ThrottlingException"), metadata.code());
        assert_eq!(Some("abc"), metadata.request_id());

        let metadata = error_metadata_from_headers(&HeaderMap::new(), DEFAULT_ERROR_TYPE_HEADER).build();
        assert_eq!(None, metadata.code());
    }

    #[test]
    fn error_body_message_variants() {
        for key in ["message", "Message", "errorMessage"] {
            let body = format!(r#"{{"{}": "hello", "other": {{"nested": [1]}}}}"#, key);
            assert_eq!(
                ErrorBody {
                    code: None,
                    message: Some(Cow::Borrowed("hello")),
                },
                parse_error_body(body.as_bytes()).unwrap()
            );
        }
    }

    #[test]
    fn error_body_unescapes() {
        let body = parse_error_body(br#"{"code": "FooError", "message": "a\nb"}"#).unwrap();
        assert_eq!(Some("FooError"), body.code.as_deref());
        assert_eq!(Some("a\nb"), body.message.as_deref());
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_error_body(br#"{"code": "#).is_err());
        assert!(parse_error_body(br#"{"code": "a"} {}"#).is_err());
    }

    #[test]
    fn sanitize_namespace_and_url() {
        assert_eq!(
            sanitize_error_code("aws.protocoltests.restjson#FooError:http://internal.amazon.com/coral/com.amazon.coral.validate/"),
            "FooError"
        );
        assert_eq!(sanitize_error_code("FooError:http://internal.amazon.com/"), "FooError");
        assert_eq!(sanitize_error_code("aws.protocoltests.restjson#FooError"), "FooError");
        assert_eq!(sanitize_error_code("FooError"), "FooError");
    }
}
