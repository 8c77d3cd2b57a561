/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Generic error metadata and the runtime error types raised by generated codecs.

use std::collections::HashMap;
use std::fmt;

pub mod operation;
pub mod validation;

/// Key for the request id stored in [`ErrorMetadata`] extras.
pub const REQUEST_ID: &str = "request_id";

/// Key for the extended request id (`HostId`) stored in [`ErrorMetadata`] extras.
pub const EXTENDED_REQUEST_ID: &str = "s3_extended_request_id";

/// Trait to retrieve error metadata from an error.
pub trait ProvideErrorMetadata {
    /// Returns the error metadata, which includes the error code, message and extras.
    fn meta(&self) -> &ErrorMetadata;

    /// Returns the error code, if it's available.
    fn code(&self) -> Option<&str> {
        self.meta().code()
    }

    /// Returns the error message, if there is one.
    fn message(&self) -> Option<&str> {
        self.meta().message()
    }
}

/// A decode failure that knows how far into its input decoding got.
pub trait DecodeOffset {
    /// Byte offset of the failure in the decoded input, when known.
    fn decode_offset(&self) -> Option<usize>;
}

/// Untyped error information extracted from a failed response.
///
/// An error response whose discriminator does not match any modeled error still carries an
/// actionable code and message; dispatch returns it in this form instead of failing.
#[derive(Debug, Eq, PartialEq, Default, Clone)]
pub struct ErrorMetadata {
    code: Option<String>,
    message: Option<String>,
    extras: Option<HashMap<&'static str, String>>,
}

/// Builder for [`ErrorMetadata`].
#[derive(Debug, Default, Clone)]
pub struct Builder {
    inner: ErrorMetadata,
}

impl Builder {
    /// Sets the error message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.inner.message = Some(message.into());
        self
    }

    /// Sets the error code.
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.inner.code = Some(code.into());
        self
    }

    /// Sets a custom field, such as [`REQUEST_ID`].
    pub fn custom(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.inner
            .extras
            .get_or_insert_with(HashMap::new)
            .insert(key, value.into());
        self
    }

    /// Returns the code set so far.
    pub fn peek_code(&self) -> Option<&str> {
        self.inner.code()
    }

    /// Creates the error metadata.
    pub fn build(self) -> ErrorMetadata {
        self.inner
    }
}

impl ErrorMetadata {
    /// Returns the error code.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Returns the error message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the request id, if one was present on the response.
    pub fn request_id(&self) -> Option<&str> {
        self.extra(REQUEST_ID)
    }

    /// Returns additional information about the error if it's present.
    pub fn extra(&self, key: &'static str) -> Option<&str> {
        self.extras
            .as_ref()
            .and_then(|extras| extras.get(key).map(|value| value.as_str()))
    }

    /// Creates an `ErrorMetadata` builder.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Converts back into a builder.
    pub fn into_builder(self) -> Builder {
        Builder { inner: self }
    }
}

impl ProvideErrorMetadata for ErrorMetadata {
    fn meta(&self) -> &ErrorMetadata {
        self
    }
}

impl fmt::Display for ErrorMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fmt = f.debug_struct("Error");
        if let Some(code) = &self.code {
            fmt.field("code", code);
        }
        if let Some(message) = &self.message {
            fmt.field("message", message);
        }
        if let Some(extras) = &self.extras {
            let mut keys: Vec<_> = extras.keys().collect();
            keys.sort();
            for key in keys {
                fmt.field(key, &extras[key]);
            }
        }
        fmt.finish()
    }
}

impl std::error::Error for ErrorMetadata {}
