/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Aggregated client-side parameter validation errors.

use std::error::Error;
use std::fmt;

/// The reason a single parameter failed validation.
#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum ViolationKind {
    /// A required member was not set.
    MissingRequired,
}

/// One failed parameter, addressed by its path from the validated input.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParamViolation {
    path: String,
    kind: ViolationKind,
}

impl ParamViolation {
    /// Path of the offending member, e.g. `Items[2].Name`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Why the member failed validation.
    pub fn kind(&self) -> &ViolationKind {
        &self.kind
    }
}

/// Every parameter violation found in one input, reported together.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InvalidParamsError {
    context: String,
    violations: Vec<ParamViolation>,
}

fn join_path(prefix: &str, path: &str) -> String {
    if path.starts_with('[') {
        format!("{}{}", prefix, path)
    } else {
        format!("{}.{}", prefix, path)
    }
}

impl InvalidParamsError {
    /// Creates an empty error for the named input shape.
    pub fn new(context: impl Into<String>) -> Self {
        InvalidParamsError {
            context: context.into(),
            violations: Vec::new(),
        }
    }

    /// Records a missing required member.
    pub fn add_required(&mut self, field: impl Into<String>) {
        self.violations.push(ParamViolation {
            path: field.into(),
            kind: ViolationKind::MissingRequired,
        });
    }

    /// Records every violation of a nested value under `field` (a member name or `[index]`).
    pub fn add_nested(&mut self, field: &str, nested: InvalidParamsError) {
        for violation in nested.violations {
            self.violations.push(ParamViolation {
                path: join_path(field, &violation.path),
                kind: violation.kind,
            });
        }
    }

    /// The name of the validated shape.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// All recorded violations in discovery order.
    pub fn violations(&self) -> &[ParamViolation] {
        &self.violations
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True if nothing failed.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for InvalidParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s) found.", self.violations.len())?;
        for violation in &self.violations {
            match violation.kind {
                ViolationKind::MissingRequired => write!(
                    f,
                    "\n- missing required field, {}.",
                    join_path(&self.context, &violation.path)
                )?,
            }
        }
        Ok(())
    }
}

impl Error for InvalidParamsError {}

#[cfg(test)]
mod test {
    use super::InvalidParamsError;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_paths() {
        let mut item = InvalidParamsError::new("Item");
        item.add_required("Name");
        let mut items = InvalidParamsError::new("ItemList");
        items.add_nested("[2]", item);
        let mut input = InvalidParamsError::new("PutItemsInput");
        input.add_required("Owner");
        input.add_nested("Items", items);

        let paths: Vec<_> = input.violations().iter().map(|v| v.path()).collect();
        assert_eq!(vec!["Owner", "Items[2].Name"], paths);
        assert_eq!(
            "2 validation error(s) found.\n\
             - missing required field, PutItemsInput.Owner.\n\
             - missing required field, PutItemsInput.Items[2].Name.",
            input.to_string()
        );
    }

    #[test]
    fn empty_is_ok() {
        assert_eq!(Ok(()), InvalidParamsError::new("Input").into_result());
    }
}
