/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use shapecodec_types::error::DecodeOffset;
use std::borrow::Cow;
use thiserror::Error;

/// Most `.`-separated segments a key path may have.
pub const MAX_KEY_SEGMENTS: usize = 1024;

/// Deepest nesting of aggregates a decoder descends into before giving up.
pub const MAX_NESTING_DEPTH: usize = 256;

#[derive(Debug, Error)]
enum QueryDecodeErrorKind {
    #[error("body is not UTF-8")]
    InvalidUtf8(#[source] std::str::Utf8Error),
    #[error("invalid percent-encoding in `{0}`")]
    InvalidEncoding(String),
    #[error("key path has too many segments")]
    KeyTooDeep,
    #[error("error parsing query body: {0}")]
    Custom(Cow<'static, str>),
}

/// Failure to decode a form-encoded Query body.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct QueryDecodeError {
    kind: QueryDecodeErrorKind,
}

impl QueryDecodeError {
    /// Creates an error with a custom message.
    pub fn custom(msg: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: QueryDecodeErrorKind::Custom(msg.into()),
        }
    }
}

// query values are decoded from a tree, so failures have no single position in the body
impl DecodeOffset for QueryDecodeError {
    fn decode_offset(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug, Default)]
struct Node {
    value: Option<String>,
    children: Vec<(String, Node)>,
}

static EMPTY: Node = Node {
    value: None,
    children: Vec::new(),
};

impl Node {
    fn child_mut(&mut self, name: &str) -> &mut Node {
        let idx = match self.children.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.children.push((name.to_owned(), Node::default()));
                self.children.len() - 1
            }
        };
        &mut self.children[idx].1
    }
}

fn decode_component(component: &str) -> Result<String, QueryDecodeError> {
    let plus_decoded = component.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map(Cow::into_owned)
        .map_err(|_| QueryDecodeError {
            kind: QueryDecodeErrorKind::InvalidEncoding(component.to_owned()),
        })
}

/// A parsed Query body: every `Key.Path=value` pair folded into a tree keyed by path segment.
///
/// Parameters the caller never asks for are ignored. A repeated key keeps its last value.
#[derive(Debug)]
pub struct QueryReader {
    root: Node,
}

impl QueryReader {
    /// Parses a form-encoded body.
    pub fn parse(body: &[u8]) -> Result<QueryReader, QueryDecodeError> {
        let body = std::str::from_utf8(body).map_err(|err| QueryDecodeError {
            kind: QueryDecodeErrorKind::InvalidUtf8(err),
        })?;
        let mut root = Node::default();
        for pair in body.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key)?;
            if key.split('.').nth(MAX_KEY_SEGMENTS).is_some() {
                return Err(QueryDecodeError {
                    kind: QueryDecodeErrorKind::KeyTooDeep,
                });
            }
            let value = decode_component(value)?;
            let mut node = &mut root;
            for segment in key.split('.') {
                node = node.child_mut(segment);
            }
            node.value = Some(value);
        }
        Ok(QueryReader { root })
    }

    /// The `Action` parameter, if present.
    pub fn action(&self) -> Option<&str> {
        self.root().child("Action").and_then(|scope| scope.value())
    }

    /// The `Version` parameter, if present.
    pub fn version(&self) -> Option<&str> {
        self.root().child("Version").and_then(|scope| scope.value())
    }

    /// The top-level scope, holding the operation input members.
    pub fn root(&self) -> QueryScope<'_> {
        QueryScope { node: &self.root }
    }
}

/// A view of every parameter under one key path prefix.
#[derive(Debug, Clone, Copy)]
pub struct QueryScope<'a> {
    node: &'a Node,
}

impl<'a> QueryScope<'a> {
    /// A scope with no value and no children.
    pub fn empty() -> QueryScope<'static> {
        QueryScope { node: &EMPTY }
    }

    /// The value written at exactly this key path.
    pub fn value(&self) -> Option<&'a str> {
        self.node.value.as_deref()
    }

    /// Returns the scope at `Prefix.name`. Names match ignoring ASCII case.
    pub fn child(&self, name: &str) -> Option<QueryScope<'a>> {
        self.node
            .children
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, node)| QueryScope { node })
    }

    /// Every direct child, in the order first seen.
    pub fn children(&self) -> impl Iterator<Item = (&'a str, QueryScope<'a>)> + 'a {
        let node = self.node;
        node.children
            .iter()
            .map(|(name, node)| (name.as_str(), QueryScope { node }))
    }

    /// True when nothing was written at or below this path.
    pub fn is_empty(&self) -> bool {
        self.node.children.is_empty() && self.node.value.as_deref().unwrap_or_default().is_empty()
    }

    /// Children with a numeric name, sorted by that index.
    fn indexed(&self) -> Vec<(usize, QueryScope<'a>)> {
        let mut indexed: Vec<_> = self
            .node
            .children
            .iter()
            .filter_map(|(name, node)| {
                name.parse::<usize>()
                    .ok()
                    .map(|idx| (idx, QueryScope { node }))
            })
            .collect();
        indexed.sort_by_key(|(idx, _)| *idx);
        indexed
    }

    /// The items of a list written at this path, in index order.
    ///
    /// A flattened list is read from `Prefix.N`; otherwise from `Prefix.member.N` (or the
    /// overridden member name). `Prefix=` is an empty list.
    pub fn list_items(&self, flattened: bool, member_name: Option<&str>) -> Vec<QueryScope<'a>> {
        let container = if flattened {
            Some(*self)
        } else {
            self.child(member_name.unwrap_or("member"))
        };
        container
            .map(|container| {
                container
                    .indexed()
                    .into_iter()
                    .map(|(_, item)| item)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The entries of a map written at this path, in index order.
    ///
    /// A flattened map is read from `Prefix.N.key`; otherwise from `Prefix.entry.N.key`. An entry
    /// without a value yields [`QueryScope::empty`].
    pub fn map_entries(
        &self,
        flattened: bool,
        key_name: &str,
        value_name: &str,
    ) -> Result<Vec<(&'a str, QueryScope<'a>)>, QueryDecodeError> {
        let container = if flattened {
            Some(*self)
        } else {
            self.child("entry")
        };
        let container = match container {
            Some(container) => container,
            None => return Ok(Vec::new()),
        };
        container
            .indexed()
            .into_iter()
            .map(|(idx, entry)| {
                let key = entry
                    .child(key_name)
                    .and_then(|key| key.value())
                    .ok_or_else(|| {
                        QueryDecodeError::custom(format!("map entry {} has no `{}`", idx, key_name))
                    })?;
                let value = entry.child(value_name).unwrap_or_else(|| QueryScope::empty());
                Ok((key, value))
            })
            .collect()
    }
}
