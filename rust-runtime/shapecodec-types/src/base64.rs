/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Standard base64 with padding, as used for blobs in textual wire formats.

use base64_simd::STANDARD;
use std::error::Error;
use std::fmt;

/// Failure to decode base64 input.
#[derive(Debug)]
pub struct DecodeError(base64_simd::Error);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode base64")
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

/// Decodes a base64 string into bytes. Surrounding whitespace is ignored.
pub fn decode<T: AsRef<[u8]>>(input: T) -> Result<Vec<u8>, DecodeError> {
    let input = input.as_ref();
    let trimmed = input.trim_ascii();
    STANDARD
        .decode_to_vec(trimmed)
        .map_err(DecodeError)
}

/// Encodes bytes as a base64 string.
pub fn encode<T: AsRef<[u8]>>(input: T) -> String {
    STANDARD.encode_to_string(input.as_ref())
}

/// Returns the base64 representation's length for the given `length` of data.
pub fn encoded_length(length: usize) -> usize {
    STANDARD.encoded_length(length)
}
