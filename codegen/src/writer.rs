/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! An indenting writer for generated Rust source.

const INDENT: &str = "    ";

/// Accumulates source text one line at a time.
#[derive(Debug, Default)]
pub(crate) struct RustWriter {
    out: String,
    depth: usize,
}

impl RustWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Writes `text` at the current indentation. Embedded newlines are indented too.
    pub(crate) fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        for line in text.as_ref().split('\n') {
            if line.trim().is_empty() {
                self.out.push('\n');
                continue;
            }
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.out.push_str(line);
            self.out.push('\n');
        }
        self
    }

    /// Writes an empty line.
    pub(crate) fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    /// Writes `open`, the indented body, then `close`.
    pub(crate) fn block(
        &mut self,
        open: impl AsRef<str>,
        close: impl AsRef<str>,
        body: impl FnOnce(&mut Self),
    ) -> &mut Self {
        self.line(open);
        self.depth += 1;
        body(self);
        self.depth -= 1;
        self.line(close)
    }

    pub(crate) fn into_string(self) -> String {
        self.out
    }
}
