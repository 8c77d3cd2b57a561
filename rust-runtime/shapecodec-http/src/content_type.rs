/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Fixed request content types.

/// `awsJson1_0`
pub const AWS_JSON_1_0: &str = "application/x-amz-json-1.0";
/// `awsJson1_1`
pub const AWS_JSON_1_1: &str = "application/x-amz-json-1.1";
/// `restJson1` document bodies
pub const JSON: &str = "application/json";
/// `restXml` document bodies
pub const XML: &str = "application/xml";
/// `awsQuery` requests
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// Blob payloads without a `mediaType`
pub const OCTET_STREAM: &str = "application/octet-stream";
/// String payloads without a `mediaType`
pub const TEXT_PLAIN: &str = "text/plain";

/// Returns true when the `Content-Type` of `headers` has the media type `expected`, ignoring
/// parameters such as `charset` and ASCII case.
pub fn is_content_type(headers: &http::HeaderMap, expected: &str) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let essence = value.split(';').next().unwrap_or_default().trim();
            essence.eq_ignore_ascii_case(expected)
        })
        .unwrap_or(false)
}
