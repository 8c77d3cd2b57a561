/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Generation-time failures.

use crate::model::ShapeId;
use crate::protocol::Protocol;
use std::fmt;
use thiserror::Error;

/// One reason a shape, member or operation cannot be generated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Issue {
    /// The shape kind has no encoding in the protocol.
    #[error("`{shape}`: {kind} shapes are not supported by {protocol}")]
    Unsupported {
        /// Offending shape (or member)
        shape: ShapeId,
        /// AST type name of the kind
        kind: &'static str,
        /// Protocol being generated
        protocol: Protocol,
    },
    /// A member targets a shape that is not in the model.
    #[error("`{member}` targets `{target}`, which is not defined")]
    MissingTarget {
        /// Member id
        member: ShapeId,
        /// Missing target
        target: ShapeId,
    },
    /// An operation, service, input, output or error is not in the model.
    #[error("`{0}` is not defined")]
    MissingShape(ShapeId),
    /// Two shapes reduce to the same routine name.
    #[error("`{first}` and `{second}` both generate `{name}`")]
    NameCollision {
        /// Routine name
        name: String,
        /// First shape claiming the name
        first: ShapeId,
        /// Second shape claiming the name
        second: ShapeId,
    },
    /// The shape is structurally valid but can't be used where it appears.
    #[error("`{shape}`: {message}")]
    Invalid {
        /// Offending shape (or member)
        shape: ShapeId,
        /// What is wrong
        message: String,
    },
}

/// Generation failed. Every issue found is listed, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("code generation failed with {} issue(s):{}", .issues.len(), IssueList(.issues))]
pub struct CodegenError {
    issues: Vec<Issue>,
}

struct IssueList<'a>(&'a [Issue]);

impl fmt::Display for IssueList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in self.0 {
            write!(f, "\n- {}", issue)?;
        }
        Ok(())
    }
}

impl CodegenError {
    pub(crate) fn new(issues: Vec<Issue>) -> Self {
        CodegenError { issues }
    }

    /// Every issue, in discovery order.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

#[cfg(test)]
mod test {
    use super::{CodegenError, Issue};
    use crate::model::ShapeId;
    use crate::protocol::Protocol;

    #[test]
    fn display_lists_every_issue() {
        let err = CodegenError::new(vec![
            Issue::Unsupported {
                shape: ShapeId::new("ns#Big"),
                kind: "bigInteger",
                protocol: Protocol::RestXml,
            },
            Issue::MissingShape(ShapeId::new("ns#Gone")),
        ]);
        assert_eq!(
            err.to_string(),
            "code generation failed with 2 issue(s):\n\
             - `ns#Big`: bigInteger shapes are not supported by restXml\n\
             - `ns#Gone` is not defined"
        );
    }
}
