/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Abstractions for the Smithy Query protocol: a writer that flattens a value into dotted key
//! paths (`Items.member.1.Name=x`) and a reader that rebuilds the tree from those paths.

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    rust_2018_idioms
)]

use shapecodec_types::date_time::{DateTimeFormatError, Format};
use shapecodec_types::primitive::Encoder;
use shapecodec_types::{DateTime, Number};
use std::borrow::Cow;
use urlencoding::encode;

mod reader;

pub use reader::{
    QueryDecodeError, QueryReader, QueryScope, MAX_KEY_SEGMENTS, MAX_NESTING_DEPTH,
};

/// Writes the top-level `Action` and `Version` parameters, then the operation input.
#[derive(Debug)]
pub struct QueryWriter<'a> {
    output: &'a mut String,
}

impl<'a> QueryWriter<'a> {
    /// Starts a request body. `Action` and `Version` always come first.
    pub fn new(output: &'a mut String, action: &str, version: &str) -> Self {
        output.push_str("Action=");
        output.push_str(&encode(action));
        output.push_str("&Version=");
        output.push_str(&encode(version));
        QueryWriter { output }
    }

    /// Starts a top-level member.
    pub fn prefix<'b>(&'b mut self, prefix: &'b str) -> QueryValueWriter<'b> {
        QueryValueWriter::new(self.output, Cow::Borrowed(prefix))
    }

    /// Finishes the body.
    pub fn finish(self) {
        // Calling this drops self
    }
}

/// Writes a list, one entry at a time. See [`QueryValueWriter::start_list`].
#[must_use]
#[derive(Debug)]
pub struct QueryListWriter<'a> {
    output: &'a mut String,
    prefix: Cow<'a, str>,
    flat: bool,
    member_override: Option<&'a str>,
    next_index: usize,
}

impl<'a> QueryListWriter<'a> {
    fn new(
        output: &'a mut String,
        prefix: Cow<'a, str>,
        flat: bool,
        member_override: Option<&'a str>,
    ) -> Self {
        QueryListWriter {
            output,
            prefix,
            flat,
            member_override,
            next_index: 1,
        }
    }

    /// Starts the next list entry.
    pub fn entry(&mut self) -> QueryValueWriter<'_> {
        let prefix = if self.flat {
            format!("{}.{}", self.prefix, self.next_index)
        } else {
            format!(
                "{}.{}.{}",
                self.prefix,
                self.member_override.unwrap_or("member"),
                self.next_index
            )
        };
        self.next_index += 1;
        QueryValueWriter::new(self.output, Cow::Owned(prefix))
    }

    /// Finishes the list. An empty list is written as `Prefix=`.
    pub fn finish(self) {
        if self.next_index == 1 {
            QueryValueWriter::new(self.output, self.prefix).write_param_name();
        }
    }
}

/// Writes a map, one entry at a time. See [`QueryValueWriter::start_map`].
#[must_use]
#[derive(Debug)]
pub struct QueryMapWriter<'a> {
    output: &'a mut String,
    prefix: Cow<'a, str>,
    flat: bool,
    key_name: &'a str,
    value_name: &'a str,
    next_index: usize,
}

impl<'a> QueryMapWriter<'a> {
    fn new(
        output: &'a mut String,
        prefix: Cow<'a, str>,
        flat: bool,
        key_name: &'a str,
        value_name: &'a str,
    ) -> QueryMapWriter<'a> {
        QueryMapWriter {
            prefix,
            output,
            flat,
            key_name,
            value_name,
            next_index: 1,
        }
    }

    /// Writes the key of the next entry and returns a writer for its value.
    pub fn entry(&mut self, key: &str) -> QueryValueWriter<'_> {
        let entry = if self.flat {
            format!("{}.{}", self.prefix, self.next_index)
        } else {
            format!("{}.entry.{}", self.prefix, self.next_index)
        };
        self.next_index += 1;
        self.output.push('&');
        self.output.push_str(&entry);
        self.output.push('.');
        self.output.push_str(self.key_name);
        self.output.push('=');
        self.output.push_str(&encode(key));
        QueryValueWriter::new(
            self.output,
            Cow::Owned(format!("{}.{}", entry, self.value_name)),
        )
    }

    /// Finishes the map. An empty map is written as `Prefix=`.
    pub fn finish(self) {
        if self.next_index == 1 {
            QueryValueWriter::new(self.output, self.prefix).write_param_name();
        }
    }
}

/// Writes one value at a key path.
#[must_use]
#[derive(Debug)]
pub struct QueryValueWriter<'a> {
    output: &'a mut String,
    prefix: Cow<'a, str>,
}

impl<'a> QueryValueWriter<'a> {
    /// Creates a writer for the key path `prefix`.
    pub fn new(output: &'a mut String, prefix: Cow<'a, str>) -> QueryValueWriter<'a> {
        QueryValueWriter { output, prefix }
    }

    /// Starts a new prefix: `Prefix.name`.
    pub fn prefix(&mut self, prefix: &str) -> QueryValueWriter<'_> {
        QueryValueWriter::new(
            self.output,
            Cow::Owned(format!("{}.{}", self.prefix, prefix)),
        )
    }

    /// Writes the query boolean `value`.
    pub fn boolean(mut self, value: bool) {
        self.write_param_name();
        self.output.push_str(match value {
            true => "true",
            _ => "false",
        });
    }

    /// Writes a query string `value`.
    pub fn string(mut self, value: &str) {
        self.write_param_name();
        self.output.push_str(&encode(value));
    }

    /// Writes a query number `value`. Non-finite floats are written as `NaN`, `Infinity` and
    /// `-Infinity`.
    pub fn number(mut self, value: Number) {
        self.write_param_name();
        match value {
            Number::PosInt(value) => self.output.push_str(itoa::Buffer::new().format(value)),
            Number::NegInt(value) => self.output.push_str(itoa::Buffer::new().format(value)),
            Number::Float(value) => self.output.push_str(Encoder::from(value).encode()),
        }
    }

    /// Writes a date-time `value` with the given `format`.
    pub fn date_time(
        mut self,
        date_time: &DateTime,
        format: Format,
    ) -> Result<(), DateTimeFormatError> {
        let formatted = date_time.fmt(format)?;
        self.write_param_name();
        self.output.push_str(&encode(&formatted));
        Ok(())
    }

    /// Starts a list. A flattened list is written as `Prefix.N`; otherwise as
    /// `Prefix.member.N`, where `member` can be overridden.
    pub fn start_list(self, flat: bool, member_override: Option<&'a str>) -> QueryListWriter<'a> {
        QueryListWriter::new(self.output, self.prefix, flat, member_override)
    }

    /// Starts a map. A flattened map is written as `Prefix.N.key`; otherwise as
    /// `Prefix.entry.N.key`.
    pub fn start_map(
        self,
        flat: bool,
        key_name: &'a str,
        value_name: &'a str,
    ) -> QueryMapWriter<'a> {
        QueryMapWriter::new(self.output, self.prefix, flat, key_name, value_name)
    }

    fn write_param_name(&mut self) {
        self.output.push('&');
        self.output.push_str(&self.prefix);
        self.output.push('=');
    }
}
