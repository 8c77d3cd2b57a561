/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The shape graph codecs are derived from.
//!
//! A [`Model`] is an arena of shapes keyed by [`ShapeId`]. Members point at their targets by id,
//! so cyclic schemas need no special representation. The model is built once, either with
//! [`ModelBuilder`] or by [`loader::load_json_ast`], and is read-only afterwards.

use crate::protocol::Protocol;
use std::collections::BTreeMap;
use thiserror::Error;

pub mod loader;
mod shape_id;
mod traits;

pub use shape_id::ShapeId;
pub use traits::{ApplyTraits, ErrorFault, Traits, XmlNamespace};

/// Enumeration of Smithy shape types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    /// Structure type
    Structure,
    /// Union type
    Union,
    /// List type
    List,
    /// Set type, encoded like a list
    Set,
    /// Map type
    Map,
    /// Boolean type
    Boolean,
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// Arbitrary precision integer
    BigInteger,
    /// Arbitrary precision decimal
    BigDecimal,
    /// UTF-8 string
    String,
    /// Binary data
    Blob,
    /// Timestamp
    Timestamp,
    /// Document type
    Document,
}

impl ShapeKind {
    /// Returns true if this is an aggregate type.
    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            Self::Structure | Self::Union | Self::List | Self::Set | Self::Map
        )
    }

    /// The type name used in the Smithy JSON AST.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Union => "union",
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "map",
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::BigInteger => "bigInteger",
            Self::BigDecimal => "bigDecimal",
            Self::String => "string",
            Self::Blob => "blob",
            Self::Timestamp => "timestamp",
            Self::Document => "document",
        }
    }

    /// Parses a JSON AST type name. `enum` and `intEnum` map to their underlying kinds.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Some(match name {
            "structure" => Self::Structure,
            "union" => Self::Union,
            "list" => Self::List,
            "set" => Self::Set,
            "map" => Self::Map,
            "boolean" => Self::Boolean,
            "byte" => Self::Byte,
            "short" => Self::Short,
            "integer" | "intEnum" => Self::Integer,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "bigInteger" => Self::BigInteger,
            "bigDecimal" => Self::BigDecimal,
            "string" | "enum" => Self::String,
            "blob" => Self::Blob,
            "timestamp" => Self::Timestamp,
            "document" => Self::Document,
            _ => return None,
        })
    }
}

/// A named edge from an aggregate shape to its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    name: String,
    target: ShapeId,
    traits: Traits,
}

impl Member {
    /// Creates a member named `name` targeting `target`.
    pub fn new(name: impl Into<String>, target: impl Into<ShapeId>) -> Self {
        Member {
            name: name.into(),
            target: target.into(),
            traits: Traits::default(),
        }
    }

    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target shape id
    pub fn target(&self) -> &ShapeId {
        &self.target
    }

    /// Traits applied to the member
    pub fn traits(&self) -> &Traits {
        &self.traits
    }
}

impl ApplyTraits for Member {
    fn traits_mut(&mut self) -> &mut Traits {
        &mut self.traits
    }
}

/// A schema node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    id: ShapeId,
    kind: ShapeKind,
    members: Vec<Member>,
    traits: Traits,
}

impl Shape {
    /// Creates a shape with no members.
    pub fn new(id: impl Into<ShapeId>, kind: ShapeKind) -> Self {
        Shape {
            id: id.into(),
            kind,
            members: Vec::new(),
            traits: Traits::default(),
        }
    }

    /// Creates an empty structure.
    pub fn structure(id: impl Into<ShapeId>) -> Self {
        Self::new(id, ShapeKind::Structure)
    }

    /// Creates an empty union.
    pub fn union(id: impl Into<ShapeId>) -> Self {
        Self::new(id, ShapeKind::Union)
    }

    /// Creates a list of `element`.
    pub fn list(id: impl Into<ShapeId>, element: impl Into<ShapeId>) -> Self {
        Self::new(id, ShapeKind::List).member(Member::new("member", element))
    }

    /// Creates a list of `element` with a customized member.
    pub fn list_of(id: impl Into<ShapeId>, member: Member) -> Self {
        Self::new(id, ShapeKind::List).member(member)
    }

    /// Creates a set of `element`.
    pub fn set(id: impl Into<ShapeId>, element: impl Into<ShapeId>) -> Self {
        Self::new(id, ShapeKind::Set).member(Member::new("member", element))
    }

    /// Creates a map from `key` to `value`.
    pub fn map(id: impl Into<ShapeId>, key: impl Into<ShapeId>, value: impl Into<ShapeId>) -> Self {
        Self::map_of(id, Member::new("key", key), Member::new("value", value))
    }

    /// Creates a map with customized key and value members.
    pub fn map_of(id: impl Into<ShapeId>, key: Member, value: Member) -> Self {
        Self::new(id, ShapeKind::Map).member(key).member(value)
    }

    /// Adds a member.
    pub fn member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Shape id
    pub fn id(&self) -> &ShapeId {
        &self.id
    }

    /// Shape kind
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Members, sorted by name once the model is built.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Looks up a member by name.
    pub fn member_named(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Traits applied to the shape
    pub fn traits(&self) -> &Traits {
        &self.traits
    }
}

impl ApplyTraits for Shape {
    fn traits_mut(&mut self) -> &mut Traits {
        &mut self.traits
    }
}

/// An API operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    id: ShapeId,
    input: Option<ShapeId>,
    output: Option<ShapeId>,
    errors: Vec<ShapeId>,
}

impl Operation {
    /// Creates an operation with no input, output or errors.
    pub fn new(id: impl Into<ShapeId>) -> Self {
        Operation {
            id: id.into(),
            input: None,
            output: None,
            errors: Vec::new(),
        }
    }

    /// Sets the input structure.
    pub fn input(mut self, input: impl Into<ShapeId>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Sets the output structure.
    pub fn output(mut self, output: impl Into<ShapeId>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Declares an error.
    pub fn error(mut self, error: impl Into<ShapeId>) -> Self {
        self.errors.push(error.into());
        self
    }

    /// Operation id
    pub fn id(&self) -> &ShapeId {
        &self.id
    }

    /// Input structure id
    pub fn input_shape(&self) -> Option<&ShapeId> {
        self.input.as_ref()
    }

    /// Output structure id
    pub fn output_shape(&self) -> Option<&ShapeId> {
        self.output.as_ref()
    }

    /// Declared errors
    pub fn errors(&self) -> &[ShapeId] {
        &self.errors
    }
}

/// A service: the unit code is generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    id: ShapeId,
    version: String,
    protocol: Protocol,
    operations: Vec<ShapeId>,
    no_error_wrapping: bool,
}

impl Service {
    /// Creates a service with no operations.
    pub fn new(id: impl Into<ShapeId>, version: impl Into<String>, protocol: Protocol) -> Self {
        Service {
            id: id.into(),
            version: version.into(),
            protocol,
            operations: Vec::new(),
            no_error_wrapping: false,
        }
    }

    /// Adds an operation.
    pub fn operation(mut self, operation: impl Into<ShapeId>) -> Self {
        self.operations.push(operation.into());
        self
    }

    /// Sets the `restXml` `noErrorWrapping` flag.
    pub fn no_error_wrapping(mut self) -> Self {
        self.no_error_wrapping = true;
        self
    }

    /// Service id
    pub fn id(&self) -> &ShapeId {
        &self.id
    }

    /// API version, written as `Version` by the Query protocol
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Wire protocol
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Operation ids, sorted once the model is built
    pub fn operations(&self) -> &[ShapeId] {
        &self.operations
    }

    /// True when XML error bodies are not wrapped in `<ErrorResponse>`
    pub fn has_no_error_wrapping(&self) -> bool {
        self.no_error_wrapping
    }
}

/// A structural problem found while building a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Two shapes, operations or services share an id.
    #[error("shape `{0}` is defined more than once")]
    DuplicateShape(ShapeId),
    /// Two members of one shape share a name.
    #[error("shape `{shape}` has more than one member named `{member}`")]
    DuplicateMember {
        /// Shape with the duplicate
        shape: ShapeId,
        /// Duplicated member name
        member: String,
    },
    /// A collection or simple shape has the wrong members.
    #[error("{kind} shape `{shape}` must have {expected}")]
    InvalidMembers {
        /// Offending shape
        shape: ShapeId,
        /// The shape's AST type name
        kind: &'static str,
        /// Description of the required members
        expected: &'static str,
    },
    /// The JSON AST could not be parsed.
    #[error("invalid JSON model")]
    InvalidJson(#[from] serde_json::Error),
    /// The JSON AST is well-formed JSON but not a valid model.
    #[error("invalid model at `{location}`: {message}")]
    InvalidAst {
        /// Shape id or path of the problem
        location: String,
        /// What is wrong
        message: String,
    },
}

const PRELUDE: &[(&str, ShapeKind)] = &[
    ("smithy.api#Boolean", ShapeKind::Boolean),
    ("smithy.api#PrimitiveBoolean", ShapeKind::Boolean),
    ("smithy.api#Byte", ShapeKind::Byte),
    ("smithy.api#PrimitiveByte", ShapeKind::Byte),
    ("smithy.api#Short", ShapeKind::Short),
    ("smithy.api#PrimitiveShort", ShapeKind::Short),
    ("smithy.api#Integer", ShapeKind::Integer),
    ("smithy.api#PrimitiveInteger", ShapeKind::Integer),
    ("smithy.api#Long", ShapeKind::Long),
    ("smithy.api#PrimitiveLong", ShapeKind::Long),
    ("smithy.api#Float", ShapeKind::Float),
    ("smithy.api#PrimitiveFloat", ShapeKind::Float),
    ("smithy.api#Double", ShapeKind::Double),
    ("smithy.api#PrimitiveDouble", ShapeKind::Double),
    ("smithy.api#BigInteger", ShapeKind::BigInteger),
    ("smithy.api#BigDecimal", ShapeKind::BigDecimal),
    ("smithy.api#String", ShapeKind::String),
    ("smithy.api#Blob", ShapeKind::Blob),
    ("smithy.api#Timestamp", ShapeKind::Timestamp),
    ("smithy.api#Document", ShapeKind::Document),
    ("smithy.api#Unit", ShapeKind::Structure),
];

/// An immutable shape graph.
#[derive(Debug, Clone)]
pub struct Model {
    shapes: BTreeMap<ShapeId, Shape>,
    operations: BTreeMap<ShapeId, Operation>,
    services: BTreeMap<ShapeId, Service>,
}

impl Model {
    /// Creates a builder seeded with the Smithy prelude.
    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// Looks up a shape.
    pub fn shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    /// Every shape, ordered by id.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    /// Looks up an operation.
    pub fn operation(&self, id: &ShapeId) -> Option<&Operation> {
        self.operations.get(id)
    }

    /// Every operation, ordered by id.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Looks up a service.
    pub fn service(&self, id: &ShapeId) -> Option<&Service> {
        self.services.get(id)
    }

    /// Every service, ordered by id.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }
}

/// Builds a [`Model`], checking member invariants.
#[derive(Debug)]
pub struct ModelBuilder {
    shapes: Vec<Shape>,
    operations: Vec<Operation>,
    services: Vec<Service>,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        ModelBuilder {
            shapes: PRELUDE
                .iter()
                .map(|(id, kind)| Shape::new(*id, *kind))
                .collect(),
            operations: Vec::new(),
            services: Vec::new(),
        }
    }
}

impl ModelBuilder {
    /// Adds a shape.
    pub fn shape(mut self, shape: Shape) -> Self {
        self.push_shape(shape);
        self
    }

    /// Adds a shape in place.
    pub fn push_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Adds an operation.
    pub fn operation(mut self, operation: Operation) -> Self {
        self.push_operation(operation);
        self
    }

    /// Adds an operation in place.
    pub fn push_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Adds a service.
    pub fn service(mut self, service: Service) -> Self {
        self.push_service(service);
        self
    }

    /// Adds a service in place.
    pub fn push_service(&mut self, service: Service) {
        self.services.push(service);
    }

    /// Checks every shape and freezes the model.
    ///
    /// Member targets are not resolved here: a dangling target is reported by the generator
    /// along with every other issue it finds.
    pub fn build(self) -> Result<Model, ModelError> {
        let mut shapes = BTreeMap::new();
        for mut shape in self.shapes {
            check_members(&shape)?;
            shape.members.sort_by(|a, b| a.name.cmp(&b.name));
            let id = shape.id.clone();
            if shapes.insert(id.clone(), shape).is_some() && !is_prelude(&id) {
                return Err(ModelError::DuplicateShape(id));
            }
        }
        let mut operations = BTreeMap::new();
        for operation in self.operations {
            let id = operation.id.clone();
            if shapes.contains_key(&id) || operations.insert(id.clone(), operation).is_some() {
                return Err(ModelError::DuplicateShape(id));
            }
        }
        let mut services = BTreeMap::new();
        for mut service in self.services {
            service.operations.sort();
            service.operations.dedup();
            let id = service.id.clone();
            if shapes.contains_key(&id)
                || operations.contains_key(&id)
                || services.insert(id.clone(), service).is_some()
            {
                return Err(ModelError::DuplicateShape(id));
            }
        }
        Ok(Model {
            shapes,
            operations,
            services,
        })
    }
}

fn is_prelude(id: &ShapeId) -> bool {
    PRELUDE.iter().any(|(prelude, _)| *prelude == id.as_str())
}

fn check_members(shape: &Shape) -> Result<(), ModelError> {
    let invalid = |expected| ModelError::InvalidMembers {
        shape: shape.id.clone(),
        kind: shape.kind.type_name(),
        expected,
    };
    let names: Vec<&str> = shape.members.iter().map(|m| m.name.as_str()).collect();
    match shape.kind {
        ShapeKind::Structure | ShapeKind::Union => {
            let mut sorted = names.clone();
            sorted.sort_unstable();
            if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
                return Err(ModelError::DuplicateMember {
                    shape: shape.id.clone(),
                    member: pair[0].to_owned(),
                });
            }
        }
        ShapeKind::List | ShapeKind::Set => {
            if names != ["member"] {
                return Err(invalid("exactly one member named `member`"));
            }
        }
        ShapeKind::Map => {
            let mut sorted = names.clone();
            sorted.sort_unstable();
            if sorted != ["key", "value"] {
                return Err(invalid("exactly the members `key` and `value`"));
            }
        }
        _ => {
            if !names.is_empty() {
                return Err(invalid("no members"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{ApplyTraits, Member, Model, ModelError, Operation, Service, Shape, ShapeId};
    use crate::protocol::Protocol;

    #[test]
    fn members_are_sorted_by_name() {
        let model = Model::builder()
            .shape(
                Shape::structure("ns#Foo")
                    .member(Member::new("b", "smithy.api#String"))
                    .member(Member::new("a", "smithy.api#Integer").required()),
            )
            .build()
            .unwrap();
        let foo = model.shape(&ShapeId::new("ns#Foo")).unwrap();
        let names: Vec<_> = foo.members().iter().map(|m| m.name()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(foo.member_named("a").unwrap().traits().required);
    }

    #[test]
    fn prelude_is_present() {
        let model = Model::builder().build().unwrap();
        assert!(model.shape(&ShapeId::new("smithy.api#Timestamp")).is_some());
    }

    #[test]
    fn duplicate_members_are_rejected() {
        let err = Model::builder()
            .shape(
                Shape::structure("ns#Foo")
                    .member(Member::new("a", "smithy.api#String"))
                    .member(Member::new("a", "smithy.api#String")),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateMember { .. }), "{}", err);
    }

    #[test]
    fn collection_members_are_checked() {
        let err = Model::builder()
            .shape(Shape::new("ns#L", super::ShapeKind::List))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidMembers { .. }));
        let err = Model::builder()
            .shape(Shape::map("ns#M", "smithy.api#String", "smithy.api#String").member(
                Member::new("extra", "smithy.api#String"),
            ))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidMembers { .. }));
    }

    #[test]
    fn ids_are_unique_across_tables() {
        let err = Model::builder()
            .shape(Shape::structure("ns#Op"))
            .operation(Operation::new("ns#Op"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateShape(_)));
        let model = Model::builder()
            .operation(Operation::new("ns#B"))
            .operation(Operation::new("ns#A"))
            .service(
                Service::new("ns#Svc", "2020-01-01", Protocol::AwsJson11)
                    .operation("ns#B")
                    .operation("ns#A"),
            )
            .build()
            .unwrap();
        let service = model.service(&ShapeId::new("ns#Svc")).unwrap();
        assert_eq!(service.operations(), [ShapeId::new("ns#A"), ShapeId::new("ns#B")]);
    }
}
