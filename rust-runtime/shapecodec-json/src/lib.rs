/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! JSON framing for generated shape codecs: a token-streaming reader with delimiter validation,
//! allocation-light writers, and error-discriminator extraction for failed responses.

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    rust_2018_idioms
)]

pub mod deserialize;
pub mod errors;
mod escape;
pub mod serialize;

pub use escape::EscapeError;
