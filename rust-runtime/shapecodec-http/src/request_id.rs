/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Request ids carried in response headers.

use shapecodec_types::error::{Builder as ErrorMetadataBuilder, EXTENDED_REQUEST_ID, REQUEST_ID};

/// S3 request id header
pub const AMZ_REQUEST_ID_HEADER: &str = "x-amz-request-id";
/// S3 extended request id (host id) header
pub const AMZ_ID_2_HEADER: &str = "x-amz-id-2";

fn header_str<'a>(headers: &'a http::HeaderMap, key: &str) -> Option<&'a str> {
    headers.get(key).and_then(|value| value.to_str().ok())
}

/// Applies the S3 request id headers onto `builder`. Header values replace ids read from the
/// body.
pub fn apply_s3_request_ids(
    builder: ErrorMetadataBuilder,
    headers: &http::HeaderMap,
) -> ErrorMetadataBuilder {
    let builder = match header_str(headers, AMZ_REQUEST_ID_HEADER) {
        Some(id) => builder.custom(REQUEST_ID, id),
        None => builder,
    };
    match header_str(headers, AMZ_ID_2_HEADER) {
        Some(id) => builder.custom(EXTENDED_REQUEST_ID, id),
        None => builder,
    }
}
