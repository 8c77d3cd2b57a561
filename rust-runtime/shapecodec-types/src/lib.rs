/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Value types shared by the JSON, XML and Query shape codecs.
//!
//! Generated encoders and decoders only ever exchange these types with the wire crates, which keeps
//! the numeric narrowing, timestamp and base64 rules in one place for every protocol.

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    rust_2018_idioms
)]

pub mod base64;
pub mod date_time;
pub mod error;
pub mod primitive;

mod blob;
mod document;
mod number;

pub use blob::Blob;
pub use date_time::DateTime;
pub use document::Document;
pub use error::ErrorMetadata;
pub use number::{Number, TryFromNumberError};
