/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! HTTP-level helpers for generated shape codecs.

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    rust_2018_idioms
)]

pub mod content_type;
pub mod header;
pub mod request_id;
pub mod ring_buffer;
pub mod snapshot;

pub use snapshot::{with_snapshot, DeserializationError, SnapshotReader};
