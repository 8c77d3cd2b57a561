/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

/// A Smithy Shape ID.
///
/// Shape IDs uniquely identify shapes in a Smithy model.
/// Format: `namespace#shapeName` or `namespace#shapeName$memberName`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId {
    value: String,
}

impl ShapeId {
    /// Creates a new ShapeId from a string.
    ///
    /// # Examples
    /// ```
    /// use shapecodec_codegen::model::ShapeId;
    ///
    /// let shape_id = ShapeId::new("smithy.api#String");
    /// assert_eq!(shape_id.name(), "String");
    /// ```
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Returns the string representation of this ShapeId.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns the namespace portion of the ShapeId.
    pub fn namespace(&self) -> Option<&str> {
        self.value.split_once('#').map(|(ns, _)| ns)
    }

    /// Returns the shape name, without namespace or member.
    ///
    /// An id without a namespace is treated as a bare name.
    pub fn name(&self) -> &str {
        let rest = self
            .value
            .split_once('#')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.value);
        rest.split_once('$').map(|(name, _)| name).unwrap_or(rest)
    }

    /// Returns the member name if this is a member shape ID.
    pub fn member_name(&self) -> Option<&str> {
        self.value
            .split_once('#')
            .and_then(|(_, rest)| rest.split_once('$').map(|(_, member)| member))
    }

    /// Returns the id of `member` within this shape: `namespace#Name$member`.
    pub fn with_member(&self, member: &str) -> ShapeId {
        ShapeId::new(format!("{}${}", self.value, member))
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<String> for ShapeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for ShapeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&ShapeId> for ShapeId {
    fn from(value: &ShapeId) -> Self {
        value.clone()
    }
}
