/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Errors raised while encoding operation input.

use crate::date_time::DateTimeFormatError;
use std::borrow::Cow;
use std::error::Error;
use std::fmt;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug)]
enum SerializationErrorKind {
    CannotSerializeUnknownVariant { union: Cow<'static, str> },
    MissingRequiredMember { shape: Cow<'static, str>, member: Cow<'static, str> },
    DateTimeFormatError { cause: DateTimeFormatError },
    Custom { message: Cow<'static, str> },
    Other { cause: BoxError },
}

/// An error that occurs while encoding a value; no partial request is produced.
#[derive(Debug)]
pub struct SerializationError {
    kind: SerializationErrorKind,
}

impl SerializationError {
    /// The value being encoded was a union's unknown variant, which has no wire form.
    pub fn unknown_variant(union: impl Into<Cow<'static, str>>) -> Self {
        SerializationError {
            kind: SerializationErrorKind::CannotSerializeUnknownVariant {
                union: union.into(),
            },
        }
    }

    /// A required member had no value.
    pub fn missing_required_member(
        shape: impl Into<Cow<'static, str>>,
        member: impl Into<Cow<'static, str>>,
    ) -> Self {
        SerializationError {
            kind: SerializationErrorKind::MissingRequiredMember {
                shape: shape.into(),
                member: member.into(),
            },
        }
    }

    /// Creates an error with a static message.
    pub fn custom(message: impl Into<Cow<'static, str>>) -> Self {
        SerializationError {
            kind: SerializationErrorKind::Custom {
                message: message.into(),
            },
        }
    }

    /// Wraps another error as the cause.
    pub fn other(cause: impl Into<BoxError>) -> Self {
        SerializationError {
            kind: SerializationErrorKind::Other {
                cause: cause.into(),
            },
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SerializationErrorKind::CannotSerializeUnknownVariant { union } => write!(
                f,
                "Cannot serialize `{}::Unknown`. Unknown union variants cannot be serialized. \
                This can occur when round-tripping a response from the server that was not \
                recognized by the SDK. Consider upgrading to the latest version of the SDK.",
                union
            ),
            SerializationErrorKind::MissingRequiredMember { shape, member } => {
                write!(f, "required member `{}` of `{}` was not set", member, shape)
            }
            SerializationErrorKind::DateTimeFormatError { .. } => {
                write!(f, "failed to serialize timestamp")
            }
            SerializationErrorKind::Custom { message } => f.write_str(message),
            SerializationErrorKind::Other { .. } => write!(f, "failed to serialize value"),
        }
    }
}

impl Error for SerializationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            SerializationErrorKind::DateTimeFormatError { cause } => Some(cause as _),
            SerializationErrorKind::Other { cause } => Some(cause.as_ref() as _),
            _ => None,
        }
    }
}

impl From<DateTimeFormatError> for SerializationError {
    fn from(cause: DateTimeFormatError) -> Self {
        SerializationError {
            kind: SerializationErrorKind::DateTimeFormatError { cause },
        }
    }
}
