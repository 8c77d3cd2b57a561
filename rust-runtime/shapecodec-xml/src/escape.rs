/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::borrow::Cow;
use std::fmt::Write;

const ESCAPES: &[char] = &[
    '&', '\'', '\"', '<', '>', '\u{00D}', '\u{00A}', '\u{0085}', '\u{2028}',
];

/// Escapes text for element content and attribute values.
///
/// Line breaks are written as character references so they survive attribute normalization.
pub(crate) fn escape(s: &str) -> Cow<'_, str> {
    let mut remaining = s;
    if !s.contains(ESCAPES) {
        return Cow::Borrowed(s);
    }
    let mut out = String::new();
    while let Some(idx) = remaining.find(ESCAPES) {
        out.push_str(&remaining[..idx]);
        remaining = &remaining[idx..];
        let mut idxs = remaining.char_indices();
        let (_, chr) = match idxs.next() {
            Some(next) => next,
            None => break,
        };
        match chr {
            '>' => out.push_str("&gt;"),
            '<' => out.push_str("&lt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            // writing into a String cannot fail
            other => {
                let _ = write!(&mut out, "&#x{:X};", other as u32);
            }
        }
        // move `remaining` forward to the next character boundary
        remaining = match idxs.next() {
            None => "",
            Some((idx, _)) => &remaining[idx..],
        }
    }
    out.push_str(remaining);
    Cow::Owned(out)
}
