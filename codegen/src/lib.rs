/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Derives wire codecs from a Smithy shape model.
//!
//! For every shape reachable from a service's operations the generator plans one encoder and
//! one decoder per protocol (`awsJson1_0`, `awsJson1_1`, `restJson1`, `restXml` and `awsQuery`),
//! plus operation body codecs, error body decoders, an error dispatcher per operation and
//! required-member validators. Plans are rendered as Rust source that targets the
//! `shapecodec-*` runtime crates.
//!
//! ```no_run
//! use shapecodec_codegen::model::{loader, ShapeId};
//! use shapecodec_codegen::{generate, CodegenSettings};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = loader::load_json_ast(&std::fs::read("model.json")?)?;
//! let module = generate(
//!     &model,
//!     &ShapeId::new("example.weather#Weather"),
//!     &CodegenSettings::default(),
//! )?;
//! std::fs::write("protocol_serde.rs", module.source())?;
//! # Ok(())
//! # }
//! ```
//!
//! The [`interpret`] module runs the same plans against dynamic [`interpret::Value`]s, which is
//! how generated behavior is tested without compiling the generated text.

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    rust_2018_idioms
)]

mod dispatch;
mod error;
mod generate;
pub mod interpret;
pub mod ir;
pub mod model;
pub mod naming;
pub mod protocol;
mod settings;
mod writer;

pub use error::{CodegenError, Issue};
pub use generate::{generate, plan, render, GeneratedModule};
pub use protocol::Protocol;
pub use settings::{CodegenSettings, CodegenSettingsBuilder, ServiceCustomizations};
