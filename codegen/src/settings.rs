/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Generator configuration.

use crate::protocol::Protocol;
use shapecodec_json::errors::DEFAULT_ERROR_TYPE_HEADER;
use shapecodec_types::date_time::Format;

/// Per-service behavior that deviates from the protocol defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCustomizations {
    /// S3: unwrapped XML error bodies, plus request ids read from `x-amz-request-id` and
    /// `x-amz-id-2`.
    pub s3: bool,
}

/// Configuration for code generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenSettings {
    /// Generate for this protocol instead of the service's protocol trait.
    pub protocol: Option<Protocol>,
    /// Module holding the generated shape types.
    pub model_module: String,
    /// Module holding the generated error types.
    pub error_module: String,
    /// Header carrying the JSON error discriminator.
    pub error_type_header: String,
    /// Whether `restJson1` honors the `@jsonName` trait for member names.
    pub use_json_name: bool,
    /// Overrides the protocol's default timestamp format.
    pub default_timestamp_format: Option<Format>,
    /// Service-specific behavior.
    pub customizations: ServiceCustomizations,
}

impl Default for CodegenSettings {
    fn default() -> Self {
        Self {
            protocol: None,
            model_module: "crate::types".to_owned(),
            error_module: "crate::types::error".to_owned(),
            error_type_header: DEFAULT_ERROR_TYPE_HEADER.to_owned(),
            use_json_name: true,
            default_timestamp_format: None,
            customizations: ServiceCustomizations::default(),
        }
    }
}

impl CodegenSettings {
    /// Returns a builder starting from the defaults.
    pub fn builder() -> CodegenSettingsBuilder {
        CodegenSettingsBuilder::default()
    }

    /// The timestamp format used when no `@timestampFormat` applies.
    pub fn timestamp_default(&self, protocol: Protocol) -> Format {
        self.default_timestamp_format
            .unwrap_or_else(|| protocol.default_timestamp_format())
    }
}

/// Builder for [`CodegenSettings`].
#[derive(Debug, Clone, Default)]
pub struct CodegenSettingsBuilder {
    inner: CodegenSettings,
}

impl CodegenSettingsBuilder {
    /// Forces a protocol.
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.inner.protocol = Some(protocol);
        self
    }

    /// Sets the module holding shape types.
    pub fn model_module(mut self, module: impl Into<String>) -> Self {
        self.inner.model_module = module.into();
        self
    }

    /// Sets the module holding error types.
    pub fn error_module(mut self, module: impl Into<String>) -> Self {
        self.inner.error_module = module.into();
        self
    }

    /// Sets the JSON error discriminator header.
    pub fn error_type_header(mut self, header: impl Into<String>) -> Self {
        self.inner.error_type_header = header.into();
        self
    }

    /// Sets whether `@jsonName` is honored.
    pub fn use_json_name(mut self, use_json_name: bool) -> Self {
        self.inner.use_json_name = use_json_name;
        self
    }

    /// Overrides the default timestamp format.
    pub fn default_timestamp_format(mut self, format: Format) -> Self {
        self.inner.default_timestamp_format = Some(format);
        self
    }

    /// Enables the S3 customizations.
    pub fn s3(mut self, s3: bool) -> Self {
        self.inner.customizations.s3 = s3;
        self
    }

    /// Builds the settings.
    pub fn build(self) -> CodegenSettings {
        self.inner
    }
}
