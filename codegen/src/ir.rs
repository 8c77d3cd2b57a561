/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Routine plans: the wire-neutral description of every generated routine.
//!
//! The dispatcher produces a [`CodecPlan`]. The renderers turn each [`Routine`] into Rust source
//! and the [interpreter](crate::interpret) executes the same plans against dynamic values, so what
//! is generated and what is tested can't drift apart.

use crate::model::{ErrorFault, ShapeId, ShapeKind, XmlNamespace};
use crate::protocol::Protocol;
use shapecodec_types::date_time::Format;
use shapecodec_xml::errors::ErrorWrapping;
use std::collections::{BTreeMap, HashMap};

/// Which way a routine moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Value to wire
    Encode,
    /// Wire to value
    Decode,
}

/// The kind of a per-shape routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoutineKind {
    /// `ser_*`
    Encode,
    /// `de_*`
    Decode,
    /// `de_*_unwrapped`: one element (or entry) of a flattened XML collection
    DecodeUnwrapped,
}

impl RoutineKind {
    /// Direction of the routine.
    pub fn direction(self) -> Direction {
        match self {
            RoutineKind::Encode => Direction::Encode,
            RoutineKind::Decode | RoutineKind::DecodeUnwrapped => Direction::Decode,
        }
    }
}

/// Which operation structure a payload routine handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PayloadSide {
    /// Request body
    Input,
    /// Response body
    Output,
}

/// Memo key: exactly one routine exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoutineKey {
    /// Per-shape codec routine
    Shape(ShapeId, RoutineKind),
    /// Operation input or output body
    Payload(ShapeId, PayloadSide, Direction),
    /// Modeled error body decoder
    ErrorBody(ShapeId),
    /// Operation error dispatcher
    ErrorDispatch(ShapeId),
    /// Required-member validator
    Validate(ShapeId),
}

impl RoutineKey {
    /// Direction of a codec routine; `None` for validators.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            RoutineKey::Shape(_, kind) => Some(kind.direction()),
            RoutineKey::Payload(_, _, direction) => Some(*direction),
            RoutineKey::ErrorBody(_) | RoutineKey::ErrorDispatch(_) => Some(Direction::Decode),
            RoutineKey::Validate(_) => None,
        }
    }
}

/// One generated routine.
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    /// Deterministic routine name
    pub name: String,
    /// What the routine was generated for
    pub key: RoutineKey,
    /// The plan
    pub body: RoutineBody,
}

/// Plan bodies, one variant per routine family.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutineBody {
    /// Structure codec
    Structure(StructurePlan),
    /// Union codec; every member is a variant
    Union(StructurePlan),
    /// List or set codec
    List(ListPlan),
    /// Map codec
    Map(MapPlan),
    /// Operation body codec
    Payload(PayloadPlan),
    /// Modeled error body decoder
    ErrorBody(ErrorBodyPlan),
    /// Operation error dispatcher
    ErrorDispatch(ErrorDispatchPlan),
    /// Required-member validator
    Validate(ValidationPlan),
}

/// How a scalar is carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `integer` and `intEnum`
    Integer,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `string`
    String,
    /// `string` with `@enum`, or an `enum` shape
    Enum,
    /// `blob`
    Blob,
    /// `timestamp` in a resolved format
    Timestamp(Format),
    /// `document` (JSON protocols only)
    Document,
}

/// A scalar value slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarPlan {
    /// Wire representation
    pub kind: ScalarKind,
    /// Target shape
    pub shape: ShapeId,
}

/// An aggregate value slot, handled by another routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatePlan {
    /// Target shape
    pub shape: ShapeId,
    /// Target kind
    pub kind: ShapeKind,
    /// Routine for the containing routine's direction
    pub routine: String,
    /// Decoder for one element of a flattened XML collection
    pub unwrapped: Option<String>,
}

/// What a member, list element or map value holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuePlan {
    /// Encoded inline
    Scalar(ScalarPlan),
    /// Delegated to another routine
    Aggregate(AggregatePlan),
}

impl ValuePlan {
    /// Target shape of the slot.
    pub fn shape(&self) -> &ShapeId {
        match self {
            ValuePlan::Scalar(scalar) => &scalar.shape,
            ValuePlan::Aggregate(aggregate) => &aggregate.shape,
        }
    }

    /// True for enum strings, which JSON lists skip rather than writing `null`.
    pub fn is_enum(&self) -> bool {
        matches!(
            self,
            ValuePlan::Scalar(ScalarPlan {
                kind: ScalarKind::Enum,
                ..
            })
        )
    }
}

/// Where an XML member lives relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XmlLocation {
    /// Child element
    Element,
    /// Attribute on the parent's start tag
    Attribute,
}

/// A member of a structure, union or operation payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPlan {
    /// Member name in the model
    pub name: String,
    /// Field name in generated Rust
    pub field: String,
    /// Name on the wire: JSON key, XML element or attribute, Query key segment
    pub wire_name: String,
    /// `@required`
    pub required: bool,
    /// XML placement
    pub location: XmlLocation,
    /// `@xmlFlattened`
    pub flattened: bool,
    /// `@xmlNamespace` from the member, falling back to its target
    pub namespace: Option<XmlNamespace>,
    /// Value slot
    pub value: ValuePlan,
}

/// Structure or union codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructurePlan {
    /// The shape
    pub shape: ShapeId,
    /// Members sorted by name, without `@noSerialize` members
    pub members: Vec<MemberPlan>,
}

/// List or set codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPlan {
    /// The shape
    pub shape: ShapeId,
    /// Element slot
    pub element: ValuePlan,
    /// XML element name (`member` unless the list member has `@xmlName`); also the Query
    /// `member` segment
    pub element_name: String,
    /// `@xmlNamespace` of the list member
    pub element_namespace: Option<XmlNamespace>,
    /// `@sparse`
    pub sparse: bool,
}

/// Map codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapPlan {
    /// The shape
    pub shape: ShapeId,
    /// Key slot, always a string or enum
    pub key: ScalarPlan,
    /// Value slot
    pub value: ValuePlan,
    /// XML and Query key element name
    pub key_name: String,
    /// XML and Query value element name
    pub value_name: String,
    /// `@sparse`
    pub sparse: bool,
}

/// Body framing for an operation payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    /// A JSON object
    JsonObject,
    /// An XML root element
    XmlRoot {
        /// Element name: the structure's `@xmlName`, else its name
        name: String,
        /// `@xmlNamespace` of the structure
        namespace: Option<XmlNamespace>,
    },
    /// `Action=Op&Version=v&...`
    QueryRequest {
        /// Operation name
        action: String,
        /// Service version
        version: String,
    },
    /// `<OpResponse><OpResult>...</OpResult></OpResponse>`
    QueryResponse {
        /// Name of the outer element
        response: String,
        /// Name of the inner element
        result: String,
    },
}

/// What fills an operation body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadBody {
    /// Document-bound members, framed per [`Framing`]
    Members(Vec<MemberPlan>),
    /// The `@httpPayload` member is the entire body
    Member(MemberPlan),
}

/// A value bound to a response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// One value
    Scalar(ScalarPlan),
    /// Comma-separated values
    List(ScalarPlan),
}

/// A member bound to an HTTP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBinding {
    /// Member name
    pub name: String,
    /// Field name in generated Rust
    pub field: String,
    /// Header name
    pub header: String,
    /// Value slot
    pub value: HeaderValue,
}

/// Operation input or output body codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadPlan {
    /// The operation
    pub operation: ShapeId,
    /// Input or output
    pub side: PayloadSide,
    /// The input or output structure, if the operation has one
    pub structure: Option<ShapeId>,
    /// Body framing
    pub framing: Framing,
    /// Body content
    pub body: PayloadBody,
    /// Response header bindings
    pub headers: Vec<HeaderBinding>,
    /// Member bound to the response status code
    pub response_code: Option<String>,
    /// Content type of the body
    pub content_type: String,
}

/// Where a modeled error's members are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFraming {
    /// The JSON error object
    Json,
    /// The `<Error>` element
    Xml(ErrorWrapping),
}

/// Modeled error body decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBodyPlan {
    /// The error shape
    pub error: ShapeId,
    /// Body framing
    pub framing: ErrorFraming,
    /// Document-bound members
    pub members: Vec<MemberPlan>,
    /// Header-bound members
    pub headers: Vec<HeaderBinding>,
}

/// Where the error discriminator is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discriminator {
    /// Header first, then the body's `code` and `__type`
    Json {
        /// Header carrying the discriminator
        header: String,
    },
    /// `<Code>` in the XML error body
    Xml(ErrorWrapping),
}

/// One declared error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCase {
    /// Discriminator value: the error shape name
    pub code: String,
    /// The error shape
    pub error: ShapeId,
    /// Error body decoder
    pub decoder: String,
    /// `@httpError`
    pub status: Option<u16>,
    /// `@error`
    pub fault: Option<ErrorFault>,
}

/// Operation error dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDispatchPlan {
    /// The operation
    pub operation: ShapeId,
    /// Discriminator location
    pub discriminator: Discriminator,
    /// Read `x-amz-request-id` and `x-amz-id-2`
    pub s3_request_ids: bool,
    /// Declared errors, sorted by code
    pub cases: Vec<ErrorCase>,
    /// Status codes claimed by exactly one declared error, sorted by status
    pub status_fallback: Vec<(u16, String)>,
}

impl ErrorDispatchPlan {
    /// Finds the case for a discriminator.
    pub fn case(&self, code: &str) -> Option<&ErrorCase> {
        self.cases.iter().find(|case| case.code == code)
    }

    /// Finds the code a bare status maps to.
    pub fn code_for_status(&self, status: u16) -> Option<&str> {
        self.status_fallback
            .iter()
            .find(|(candidate, _)| *candidate == status)
            .map(|(_, code)| code.as_str())
    }
}

/// A member checked by a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMember {
    /// Member name, used in violation paths
    pub name: String,
    /// Field name in generated Rust
    pub field: String,
    /// `@required`
    pub required: bool,
    /// Validator for an aggregate target
    pub nested: Option<String>,
}

/// Required-member validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationPlan {
    /// Checks members and recurses into aggregates
    Structure {
        /// The shape
        shape: ShapeId,
        /// Members sorted by name
        members: Vec<ValidatedMember>,
    },
    /// Recurses into the set variant
    Union {
        /// The shape
        shape: ShapeId,
        /// Variants sorted by name
        variants: Vec<ValidatedMember>,
    },
    /// Recurses into every element
    List {
        /// The shape
        shape: ShapeId,
        /// Element validator
        element: Option<String>,
        /// `@sparse`
        sparse: bool,
    },
    /// Recurses into every value
    Map {
        /// The shape
        shape: ShapeId,
        /// Value validator
        value: Option<String>,
        /// `@sparse`
        sparse: bool,
    },
}

/// Routine names generated for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPlan {
    /// The operation
    pub operation: ShapeId,
    /// Input structure
    pub input: Option<ShapeId>,
    /// Output structure
    pub output: Option<ShapeId>,
    /// Error dispatcher
    pub http_error: String,
    /// Input validator
    pub validate: Option<String>,
}

/// Every routine derived for one service and protocol.
#[derive(Debug, Clone)]
pub struct CodecPlan {
    pub(crate) protocol: Protocol,
    pub(crate) service: ShapeId,
    pub(crate) model_module: String,
    pub(crate) error_module: String,
    pub(crate) routines: BTreeMap<String, Routine>,
    pub(crate) index: HashMap<RoutineKey, String>,
    pub(crate) operations: BTreeMap<ShapeId, OperationPlan>,
}

impl CodecPlan {
    /// A plan without routines, for renderer tests.
    #[cfg(test)]
    pub(crate) fn empty(protocol: Protocol) -> CodecPlan {
        CodecPlan {
            protocol,
            service: ShapeId::new("ns#Svc"),
            model_module: "crate::types".to_owned(),
            error_module: "crate::types::error".to_owned(),
            routines: BTreeMap::new(),
            index: HashMap::new(),
            operations: BTreeMap::new(),
        }
    }

    /// Protocol the plan targets.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Service the plan was derived from.
    pub fn service(&self) -> &ShapeId {
        &self.service
    }

    /// Every routine, ordered by name.
    pub fn routines(&self) -> impl Iterator<Item = &Routine> {
        self.routines.values()
    }

    /// Looks a routine up by name.
    pub fn routine_named(&self, name: &str) -> Option<&Routine> {
        self.routines.get(name)
    }

    /// Looks a routine up by what it was generated for.
    pub fn routine(&self, key: &RoutineKey) -> Option<&Routine> {
        self.index.get(key).and_then(|name| self.routines.get(name))
    }

    /// Per-operation routine names, ordered by operation id.
    pub fn operations(&self) -> impl Iterator<Item = &OperationPlan> {
        self.operations.values()
    }

    /// Looks an operation up.
    pub fn operation(&self, id: &ShapeId) -> Option<&OperationPlan> {
        self.operations.get(id)
    }

    /// Path of the generated type for `shape`.
    pub(crate) fn type_path(&self, shape: &ShapeId) -> String {
        format!("{}::{}", self.model_module, shape.name())
    }

    /// Path of the builder for `shape`.
    pub(crate) fn builder_path(&self, shape: &ShapeId) -> String {
        format!("{}::builders::{}Builder", self.model_module, shape.name())
    }

    /// Path of the generated error type for `shape`.
    pub(crate) fn error_path(&self, shape: &ShapeId) -> String {
        format!("{}::{}", self.error_module, shape.name())
    }

    /// Path of the builder for the error type `shape`.
    pub(crate) fn error_builder_path(&self, shape: &ShapeId) -> String {
        format!("{}::builders::{}Builder", self.error_module, shape.name())
    }

    /// Path of the error enum of `operation`.
    pub(crate) fn operation_error_path(&self, operation: &ShapeId) -> String {
        format!("{}::{}Error", self.error_module, operation.name())
    }
}
