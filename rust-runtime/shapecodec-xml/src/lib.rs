/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Abstractions for the Smithy XML binding traits: element and attribute placement, namespaces,
//! and flattened collections.

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    rust_2018_idioms
)]

pub mod decode;
pub mod encode;
pub mod errors;
mod escape;
mod unescape;
