/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The dispatcher: maps every (shape, protocol, direction) to exactly one routine plan.
//!
//! Routine names are registered in the memo *before* their bodies are planned. A shape that
//! reaches itself through its members therefore resolves to a call of the routine that is still
//! being planned, and cyclic models produce one routine per (shape, kind).
//!
//! Problems are collected as [`Issue`]s instead of aborting, so a single run reports everything
//! wrong with a model.

use crate::error::{CodegenError, Issue};
use crate::ir::{
    AggregatePlan, CodecPlan, Direction, Discriminator, ErrorBodyPlan, ErrorCase,
    ErrorDispatchPlan, ErrorFraming, Framing, HeaderBinding, HeaderValue, ListPlan, MapPlan,
    MemberPlan, OperationPlan, PayloadBody, PayloadPlan, PayloadSide, Routine, RoutineBody,
    RoutineKey, RoutineKind, ScalarKind, ScalarPlan, StructurePlan, ValidatedMember,
    ValidationPlan, ValuePlan, XmlLocation,
};
use crate::model::{Member, Model, Operation, Service, Shape, ShapeId, ShapeKind, Traits};
use crate::naming;
use crate::protocol::{self, Protocol, WireFamily};
use crate::settings::CodegenSettings;
use shapecodec_http::content_type;
use shapecodec_types::date_time::Format;
use shapecodec_xml::errors::ErrorWrapping;
use std::collections::{BTreeMap, HashMap};

pub(crate) struct Dispatcher<'m> {
    model: &'m Model,
    service: &'m Service,
    protocol: Protocol,
    settings: &'m CodegenSettings,
    routines: BTreeMap<String, Routine>,
    index: HashMap<RoutineKey, String>,
    owners: HashMap<String, RoutineKey>,
    operations: BTreeMap<ShapeId, OperationPlan>,
    issues: Vec<Issue>,
}

/// Payload routines generated per operation.
///
/// Query requests and responses use different wire formats, so only the client halves exist:
/// a form-encoded request writer and an XML response reader.
fn payload_routines(family: WireFamily) -> &'static [(PayloadSide, Direction)] {
    const ALL: &[(PayloadSide, Direction)] = &[
        (PayloadSide::Input, Direction::Encode),
        (PayloadSide::Input, Direction::Decode),
        (PayloadSide::Output, Direction::Encode),
        (PayloadSide::Output, Direction::Decode),
    ];
    const CLIENT: &[(PayloadSide, Direction)] = &[
        (PayloadSide::Input, Direction::Encode),
        (PayloadSide::Output, Direction::Decode),
    ];
    match family {
        WireFamily::Json | WireFamily::Xml => ALL,
        WireFamily::Query => CLIENT,
    }
}

fn key_shape(key: &RoutineKey) -> &ShapeId {
    match key {
        RoutineKey::Shape(id, _)
        | RoutineKey::Payload(id, _, _)
        | RoutineKey::ErrorBody(id)
        | RoutineKey::ErrorDispatch(id)
        | RoutineKey::Validate(id) => id,
    }
}

impl<'m> Dispatcher<'m> {
    pub(crate) fn new(
        model: &'m Model,
        service: &'m Service,
        protocol: Protocol,
        settings: &'m CodegenSettings,
    ) -> Self {
        Dispatcher {
            model,
            service,
            protocol,
            settings,
            routines: BTreeMap::new(),
            index: HashMap::new(),
            owners: HashMap::new(),
            operations: BTreeMap::new(),
            issues: Vec::new(),
        }
    }

    pub(crate) fn issue(&mut self, issue: Issue) {
        if !self.issues.contains(&issue) {
            tracing::debug!(%issue, "generation issue");
            self.issues.push(issue);
        }
    }

    fn family(&self) -> WireFamily {
        self.protocol.family()
    }

    /// Returns the memoized routine name for `key`.
    fn memoized(&self, key: &RoutineKey) -> Option<String> {
        let name = self.index.get(key)?;
        tracing::trace!(routine = %name, "memo hit");
        Some(name.clone())
    }

    /// Registers `name` for `key`. Fails if another key already generates the same name.
    fn claim(&mut self, key: &RoutineKey, name: &str) -> Option<()> {
        if let Some(owner) = self.owners.get(name) {
            let first = key_shape(owner).clone();
            self.issue(Issue::NameCollision {
                name: name.to_owned(),
                first,
                second: key_shape(key).clone(),
            });
            return None;
        }
        self.owners.insert(name.to_owned(), key.clone());
        self.index.insert(key.clone(), name.to_owned());
        Some(())
    }

    fn emit(&mut self, name: String, key: RoutineKey, body: RoutineBody) {
        tracing::debug!(routine = %name, "planned routine");
        self.routines.insert(name.clone(), Routine { name, key, body });
    }

    fn shape(&mut self, id: &ShapeId) -> Option<&'m Shape> {
        let model = self.model;
        match model.shape(id) {
            Some(shape) => Some(shape),
            None => {
                self.issue(Issue::MissingShape(id.clone()));
                None
            }
        }
    }

    fn target(&mut self, member_id: &ShapeId, member: &Member) -> Option<&'m Shape> {
        let model = self.model;
        match model.shape(member.target()) {
            Some(shape) => Some(shape),
            None => {
                self.issue(Issue::MissingTarget {
                    member: member_id.clone(),
                    target: member.target().clone(),
                });
                None
            }
        }
    }

    fn unsupported(&mut self, shape: &ShapeId, kind: ShapeKind) -> Option<ValuePlan> {
        self.issue(Issue::Unsupported {
            shape: shape.clone(),
            kind: kind.type_name(),
            protocol: self.protocol,
        });
        None
    }

    /// Returns the routine for `shape`, planning it on first use.
    pub(crate) fn dispatch(&mut self, shape_id: &ShapeId, kind: RoutineKind) -> Option<String> {
        let key = RoutineKey::Shape(shape_id.clone(), kind);
        if let Some(name) = self.memoized(&key) {
            return Some(name);
        }
        let shape = self.shape(shape_id)?;
        let name = naming::shape_routine(self.protocol, shape_id, kind);
        self.claim(&key, &name)?;
        tracing::debug!(routine = %name, shape = %shape_id, "dispatching");
        let direction = kind.direction();
        let body = match (shape.kind(), kind) {
            (ShapeKind::Structure, RoutineKind::Encode | RoutineKind::Decode) => self
                .plan_structure(shape, direction)
                .map(RoutineBody::Structure),
            (ShapeKind::Union, RoutineKind::Encode | RoutineKind::Decode) => {
                self.plan_structure(shape, direction).map(RoutineBody::Union)
            }
            (ShapeKind::List | ShapeKind::Set, _) => {
                self.plan_list(shape, direction).map(RoutineBody::List)
            }
            (ShapeKind::Map, _) => self.plan_map(shape, direction).map(RoutineBody::Map),
            (ShapeKind::Structure | ShapeKind::Union, RoutineKind::DecodeUnwrapped) => {
                self.issue(Issue::Invalid {
                    shape: shape_id.clone(),
                    message: "only collections can be flattened".to_owned(),
                });
                None
            }
            (
                ShapeKind::Boolean
                | ShapeKind::Byte
                | ShapeKind::Short
                | ShapeKind::Integer
                | ShapeKind::Long
                | ShapeKind::Float
                | ShapeKind::Double
                | ShapeKind::BigInteger
                | ShapeKind::BigDecimal
                | ShapeKind::String
                | ShapeKind::Blob
                | ShapeKind::Timestamp
                | ShapeKind::Document,
                _,
            ) => {
                self.issue(Issue::Invalid {
                    shape: shape_id.clone(),
                    message: format!(
                        "{} shapes are encoded inline and have no routine",
                        shape.kind().type_name()
                    ),
                });
                None
            }
        };
        if let Some(body) = body {
            self.emit(name.clone(), key, body);
        }
        Some(name)
    }

    fn timestamp_format(&self, member: &Traits, target: &Shape, default: Format) -> Format {
        member
            .timestamp_format
            .or(target.traits().timestamp_format)
            .unwrap_or(default)
    }

    fn scalar_kind(&self, member: &Traits, target: &Shape, default: Format) -> Option<ScalarKind> {
        Some(match target.kind() {
            ShapeKind::Boolean => ScalarKind::Boolean,
            ShapeKind::Byte => ScalarKind::Byte,
            ShapeKind::Short => ScalarKind::Short,
            ShapeKind::Integer => ScalarKind::Integer,
            ShapeKind::Long => ScalarKind::Long,
            ShapeKind::Float => ScalarKind::Float,
            ShapeKind::Double => ScalarKind::Double,
            ShapeKind::String if target.traits().enum_values.is_some() => ScalarKind::Enum,
            ShapeKind::String => ScalarKind::String,
            ShapeKind::Blob => ScalarKind::Blob,
            ShapeKind::Timestamp => {
                ScalarKind::Timestamp(self.timestamp_format(member, target, default))
            }
            ShapeKind::Document => ScalarKind::Document,
            ShapeKind::Structure
            | ShapeKind::Union
            | ShapeKind::List
            | ShapeKind::Set
            | ShapeKind::Map
            | ShapeKind::BigInteger
            | ShapeKind::BigDecimal => return None,
        })
    }

    /// Plans the slot a member (or list element, or map value) fills.
    fn plan_value(
        &mut self,
        member_id: &ShapeId,
        member: &Member,
        direction: Direction,
    ) -> Option<ValuePlan> {
        let target = self.target(member_id, member)?;
        match target.kind() {
            kind @ (ShapeKind::BigInteger | ShapeKind::BigDecimal) => {
                self.unsupported(member_id, kind)
            }
            ShapeKind::Document if self.family() != WireFamily::Json => {
                self.unsupported(member_id, ShapeKind::Document)
            }
            kind @ (ShapeKind::Structure
            | ShapeKind::Union
            | ShapeKind::List
            | ShapeKind::Set
            | ShapeKind::Map) => {
                let routine_kind = match direction {
                    Direction::Encode => RoutineKind::Encode,
                    Direction::Decode => RoutineKind::Decode,
                };
                let routine = self.dispatch(target.id(), routine_kind)?;
                let collection = matches!(kind, ShapeKind::List | ShapeKind::Set | ShapeKind::Map);
                let unwrapped = if direction == Direction::Decode
                    && collection
                    && member.traits().xml_flattened
                    && self.family() != WireFamily::Json
                {
                    Some(self.dispatch(target.id(), RoutineKind::DecodeUnwrapped)?)
                } else {
                    None
                };
                Some(ValuePlan::Aggregate(AggregatePlan {
                    shape: target.id().clone(),
                    kind,
                    routine,
                    unwrapped,
                }))
            }
            _ => {
                let default = self.settings.timestamp_default(self.protocol);
                let kind = self.scalar_kind(member.traits(), target, default)?;
                Some(ValuePlan::Scalar(ScalarPlan {
                    kind,
                    shape: target.id().clone(),
                }))
            }
        }
    }

    fn plan_member(
        &mut self,
        owner: &Shape,
        member: &Member,
        direction: Direction,
    ) -> Option<MemberPlan> {
        let member_id = owner.id().with_member(member.name());
        let value = self.plan_value(&member_id, member, direction)?;
        let traits = member.traits();
        let location = if traits.xml_attribute {
            XmlLocation::Attribute
        } else {
            XmlLocation::Element
        };
        if location == XmlLocation::Attribute
            && self.family() != WireFamily::Json
            && !matches!(value, ValuePlan::Scalar(_))
        {
            self.issue(Issue::Invalid {
                shape: member_id,
                message: "only scalar members can be XML attributes".to_owned(),
            });
            return None;
        }
        let namespace = traits.xml_namespace.clone().or_else(|| {
            self.model
                .shape(member.target())
                .and_then(|target| target.traits().xml_namespace.clone())
        });
        Some(MemberPlan {
            name: member.name().to_owned(),
            field: naming::field_name(member.name()),
            wire_name: protocol::wire_name(self.protocol, self.settings, member),
            required: traits.required,
            location,
            flattened: traits.xml_flattened,
            namespace,
            value,
        })
    }

    /// Plans every serialized member accepted by `include`, reporting all failures.
    fn plan_members(
        &mut self,
        shape: &Shape,
        direction: Direction,
        include: impl Fn(&Member) -> bool,
    ) -> Option<Vec<MemberPlan>> {
        let mut members = Vec::new();
        let mut failed = false;
        for member in shape.members() {
            if member.traits().no_serialize || !include(member) {
                continue;
            }
            match self.plan_member(shape, member, direction) {
                Some(plan) => members.push(plan),
                None => failed = true,
            }
        }
        if failed {
            None
        } else {
            Some(members)
        }
    }

    fn plan_structure(&mut self, shape: &Shape, direction: Direction) -> Option<StructurePlan> {
        let members = self.plan_members(shape, direction, |_| true)?;
        Some(StructurePlan {
            shape: shape.id().clone(),
            members,
        })
    }

    fn collection_member<'s>(&mut self, shape: &'s Shape, name: &str) -> Option<&'s Member> {
        let member = shape.member_named(name);
        if member.is_none() {
            self.issue(Issue::Invalid {
                shape: shape.id().clone(),
                message: format!("missing the `{}` member", name),
            });
        }
        member
    }

    fn plan_list(&mut self, shape: &Shape, direction: Direction) -> Option<ListPlan> {
        let member = self.collection_member(shape, "member")?;
        let element = self.plan_value(&shape.id().with_member("member"), member, direction)?;
        Some(ListPlan {
            shape: shape.id().clone(),
            element,
            element_name: member
                .traits()
                .xml_name
                .clone()
                .unwrap_or_else(|| "member".to_owned()),
            element_namespace: member.traits().xml_namespace.clone(),
            sparse: shape.traits().sparse,
        })
    }

    fn plan_map(&mut self, shape: &Shape, direction: Direction) -> Option<MapPlan> {
        let key_member = self.collection_member(shape, "key")?;
        let value_member = self.collection_member(shape, "value")?;
        let key_id = shape.id().with_member("key");
        let key = match self.plan_value(&key_id, key_member, direction)? {
            ValuePlan::Scalar(
                scalar @ ScalarPlan {
                    kind: ScalarKind::String | ScalarKind::Enum,
                    ..
                },
            ) => scalar,
            _ => {
                self.issue(Issue::Invalid {
                    shape: key_id,
                    message: "map keys must target a string shape".to_owned(),
                });
                return None;
            }
        };
        let value = self.plan_value(&shape.id().with_member("value"), value_member, direction)?;
        Some(MapPlan {
            shape: shape.id().clone(),
            key,
            value,
            key_name: key_member
                .traits()
                .xml_name
                .clone()
                .unwrap_or_else(|| "key".to_owned()),
            value_name: value_member
                .traits()
                .xml_name
                .clone()
                .unwrap_or_else(|| "value".to_owned()),
            sparse: shape.traits().sparse,
        })
    }

    /// Header-bound members. Header timestamps default to `http-date`.
    fn plan_headers(&mut self, shape: &Shape) -> Option<Vec<HeaderBinding>> {
        let mut headers = Vec::new();
        let mut failed = false;
        for member in shape.members() {
            let header = match &member.traits().http_header {
                Some(header) if !member.traits().no_serialize => header.clone(),
                _ => continue,
            };
            let member_id = shape.id().with_member(member.name());
            match self.plan_header_value(&member_id, member) {
                Some(value) => headers.push(HeaderBinding {
                    name: member.name().to_owned(),
                    field: naming::field_name(member.name()),
                    header,
                    value,
                }),
                None => failed = true,
            }
        }
        if failed {
            None
        } else {
            Some(headers)
        }
    }

    fn plan_header_value(&mut self, member_id: &ShapeId, member: &Member) -> Option<HeaderValue> {
        let target = self.target(member_id, member)?;
        let (member, target, list) = match target.kind() {
            ShapeKind::List | ShapeKind::Set => {
                let element = self.collection_member(target, "member")?;
                let element_target = self.target(&target.id().with_member("member"), element)?;
                (element, element_target, true)
            }
            _ => (member, target, false),
        };
        let kind = match self.scalar_kind(member.traits(), target, Format::HttpDate) {
            Some(ScalarKind::Document) | None => {
                self.issue(Issue::Invalid {
                    shape: member_id.clone(),
                    message: format!(
                        "{} shapes can't be bound to a header",
                        target.kind().type_name()
                    ),
                });
                return None;
            }
            Some(kind) => kind,
        };
        let scalar = ScalarPlan {
            kind,
            shape: target.id().clone(),
        };
        Some(if list {
            HeaderValue::List(scalar)
        } else {
            HeaderValue::Scalar(scalar)
        })
    }

    fn xml_error_wrapping(&self) -> ErrorWrapping {
        if self.service.has_no_error_wrapping() || self.settings.customizations.s3 {
            ErrorWrapping::Unwrapped
        } else {
            ErrorWrapping::Wrapped
        }
    }

    fn payload_content_type(&self, body: &PayloadBody) -> String {
        let member = match body {
            PayloadBody::Member(member) => member,
            PayloadBody::Members(_) => return self.protocol.content_type().to_owned(),
        };
        let target = self.model.shape(member.value.shape());
        let media_type = target.and_then(|target| target.traits().media_type.clone());
        match (&member.value, media_type) {
            (_, Some(media_type)) => media_type,
            (
                ValuePlan::Scalar(ScalarPlan {
                    kind: ScalarKind::Blob,
                    ..
                }),
                None,
            ) => content_type::OCTET_STREAM.to_owned(),
            (
                ValuePlan::Scalar(ScalarPlan {
                    kind: ScalarKind::String | ScalarKind::Enum,
                    ..
                }),
                None,
            ) => content_type::TEXT_PLAIN.to_owned(),
            _ => self.protocol.content_type().to_owned(),
        }
    }

    fn framing(
        &self,
        operation: &Operation,
        side: PayloadSide,
        structure: Option<&Shape>,
        body: &PayloadBody,
    ) -> Framing {
        match self.family() {
            WireFamily::Json => Framing::JsonObject,
            WireFamily::Xml => {
                let root = match body {
                    PayloadBody::Member(member) => self.model.shape(member.value.shape()),
                    PayloadBody::Members(_) => structure,
                };
                let name = root
                    .and_then(|root| root.traits().xml_name.clone())
                    .or_else(|| root.map(|root| root.id().name().to_owned()))
                    .unwrap_or_else(|| operation.id().name().to_owned());
                Framing::XmlRoot {
                    name,
                    namespace: root.and_then(|root| root.traits().xml_namespace.clone()),
                }
            }
            WireFamily::Query => match side {
                PayloadSide::Input => Framing::QueryRequest {
                    action: operation.id().name().to_owned(),
                    version: self.service.version().to_owned(),
                },
                PayloadSide::Output => Framing::QueryResponse {
                    response: format!("{}Response", operation.id().name()),
                    result: format!("{}Result", operation.id().name()),
                },
            },
        }
    }

    fn plan_payload(
        &mut self,
        operation: &Operation,
        side: PayloadSide,
        direction: Direction,
    ) -> Option<String> {
        let key = RoutineKey::Payload(operation.id().clone(), side, direction);
        if let Some(name) = self.memoized(&key) {
            return Some(name);
        }
        let name = naming::payload_routine(self.protocol, operation.id(), side, direction);
        self.claim(&key, &name)?;
        let structure_id = match side {
            PayloadSide::Input => operation.input_shape(),
            PayloadSide::Output => operation.output_shape(),
        };
        let structure = match structure_id {
            Some(id) => Some(self.shape(id)?),
            None => None,
        };
        let rest = self.protocol.is_rest();
        let (body, headers, response_code) = match structure {
            Some(structure) if structure.kind() == ShapeKind::Structure => {
                let payload_member = structure
                    .members()
                    .iter()
                    .find(|member| rest && member.traits().http_payload);
                let body = match payload_member {
                    Some(member) => {
                        PayloadBody::Member(self.plan_member(structure, member, direction)?)
                    }
                    None => PayloadBody::Members(self.plan_members(
                        structure,
                        direction,
                        |member| !rest || !member.traits().is_http_bound(),
                    )?),
                };
                let response_side = rest && side == PayloadSide::Output;
                let headers = if response_side {
                    self.plan_headers(structure)?
                } else {
                    Vec::new()
                };
                let response_code = structure
                    .members()
                    .iter()
                    .find(|member| response_side && member.traits().http_response_code)
                    .map(|member| member.name().to_owned());
                (body, headers, response_code)
            }
            Some(structure) => {
                self.issue(Issue::Invalid {
                    shape: structure.id().clone(),
                    message: format!(
                        "operation {} must be a structure",
                        match side {
                            PayloadSide::Input => "input",
                            PayloadSide::Output => "output",
                        }
                    ),
                });
                return None;
            }
            None => (PayloadBody::Members(Vec::new()), Vec::new(), None),
        };
        let framing = self.framing(operation, side, structure, &body);
        let content_type = self.payload_content_type(&body);
        self.emit(
            name.clone(),
            key,
            RoutineBody::Payload(PayloadPlan {
                operation: operation.id().clone(),
                side,
                structure: structure_id.cloned(),
                framing,
                body,
                headers,
                response_code,
                content_type,
            }),
        );
        Some(name)
    }

    fn plan_error_body(&mut self, error_id: &ShapeId) -> Option<String> {
        let key = RoutineKey::ErrorBody(error_id.clone());
        if let Some(name) = self.memoized(&key) {
            return Some(name);
        }
        let error = self.shape(error_id)?;
        let name = naming::error_body_routine(self.protocol, error_id);
        self.claim(&key, &name)?;
        let framing = match self.family() {
            WireFamily::Json => ErrorFraming::Json,
            WireFamily::Xml => ErrorFraming::Xml(self.xml_error_wrapping()),
            WireFamily::Query => ErrorFraming::Xml(ErrorWrapping::Wrapped),
        };
        let rest = self.protocol.is_rest();
        let members = self.plan_members(error, Direction::Decode, |member| {
            !rest || !member.traits().is_http_bound()
        })?;
        let headers = if rest {
            self.plan_headers(error)?
        } else {
            Vec::new()
        };
        self.emit(
            name.clone(),
            key,
            RoutineBody::ErrorBody(ErrorBodyPlan {
                error: error_id.clone(),
                framing,
                members,
                headers,
            }),
        );
        Some(name)
    }

    fn plan_error_dispatch(&mut self, operation: &Operation) -> Option<String> {
        let key = RoutineKey::ErrorDispatch(operation.id().clone());
        if let Some(name) = self.memoized(&key) {
            return Some(name);
        }
        let name = naming::http_error_routine(self.protocol, operation.id());
        self.claim(&key, &name)?;
        let mut cases = Vec::new();
        let mut failed = false;
        for error_id in operation.errors() {
            let error = match self.shape(error_id) {
                Some(error) => error,
                None => {
                    failed = true;
                    continue;
                }
            };
            if error.kind() != ShapeKind::Structure || error.traits().error.is_none() {
                self.issue(Issue::Invalid {
                    shape: error_id.clone(),
                    message: "operation errors must be structures with the error trait"
                        .to_owned(),
                });
                failed = true;
                continue;
            }
            match self.plan_error_body(error_id) {
                Some(decoder) => cases.push(ErrorCase {
                    code: error_id.name().to_owned(),
                    error: error_id.clone(),
                    decoder,
                    status: error.traits().http_error,
                    fault: error.traits().error,
                }),
                None => failed = true,
            }
        }
        if failed {
            return None;
        }
        cases.sort_by(|a, b| a.code.cmp(&b.code));
        let mut by_status: BTreeMap<u16, Vec<&str>> = BTreeMap::new();
        for case in &cases {
            if let Some(status) = case.status {
                by_status.entry(status).or_default().push(&case.code);
            }
        }
        let status_fallback = by_status
            .into_iter()
            .filter(|(_, codes)| codes.len() == 1)
            .map(|(status, codes)| (status, codes[0].to_owned()))
            .collect();
        let discriminator = match self.family() {
            WireFamily::Json => Discriminator::Json {
                header: self.settings.error_type_header.clone(),
            },
            WireFamily::Xml => Discriminator::Xml(self.xml_error_wrapping()),
            WireFamily::Query => Discriminator::Xml(ErrorWrapping::Wrapped),
        };
        tracing::debug!(
            operation = %operation.id(),
            errors = cases.len(),
            "planned error dispatch"
        );
        self.emit(
            name.clone(),
            key,
            RoutineBody::ErrorDispatch(ErrorDispatchPlan {
                operation: operation.id().clone(),
                discriminator,
                s3_request_ids: self.settings.customizations.s3,
                cases,
                status_fallback,
            }),
        );
        Some(name)
    }

    fn validated_member(
        &mut self,
        owner: &Shape,
        member: &Member,
        required: bool,
    ) -> Option<ValidatedMember> {
        let member_id = owner.id().with_member(member.name());
        let target = self.target(&member_id, member)?;
        let nested = if target.kind().is_aggregate() {
            Some(self.plan_validation(target.id())?)
        } else {
            None
        };
        Some(ValidatedMember {
            name: member.name().to_owned(),
            field: naming::field_name(member.name()),
            required,
            nested,
        })
    }

    /// Returns the validator for an aggregate shape, planning it on first use.
    fn plan_validation(&mut self, shape_id: &ShapeId) -> Option<String> {
        let key = RoutineKey::Validate(shape_id.clone());
        if let Some(name) = self.memoized(&key) {
            return Some(name);
        }
        let shape = self.shape(shape_id)?;
        let name = naming::validate_routine(shape_id);
        self.claim(&key, &name)?;
        let plan = match shape.kind() {
            ShapeKind::Structure | ShapeKind::Union => {
                let union = shape.kind() == ShapeKind::Union;
                let mut members = Vec::new();
                for member in shape.members() {
                    let required = !union && member.traits().required;
                    members.push(self.validated_member(shape, member, required)?);
                }
                if union {
                    ValidationPlan::Union {
                        shape: shape_id.clone(),
                        variants: members,
                    }
                } else {
                    ValidationPlan::Structure {
                        shape: shape_id.clone(),
                        members,
                    }
                }
            }
            ShapeKind::List | ShapeKind::Set => {
                let member = self.collection_member(shape, "member")?;
                ValidationPlan::List {
                    shape: shape_id.clone(),
                    element: self.validated_member(shape, member, false)?.nested,
                    sparse: shape.traits().sparse,
                }
            }
            ShapeKind::Map => {
                let member = self.collection_member(shape, "value")?;
                ValidationPlan::Map {
                    shape: shape_id.clone(),
                    value: self.validated_member(shape, member, false)?.nested,
                    sparse: shape.traits().sparse,
                }
            }
            other => {
                self.issue(Issue::Invalid {
                    shape: shape_id.clone(),
                    message: format!("{} shapes have no validator", other.type_name()),
                });
                return None;
            }
        };
        self.emit(name.clone(), key, RoutineBody::Validate(plan));
        Some(name)
    }

    /// Plans every routine an operation needs.
    pub(crate) fn plan_operation(&mut self, operation: &Operation) {
        let _span = tracing::debug_span!("operation", operation = %operation.id()).entered();
        let mut planned = true;
        for &(side, direction) in payload_routines(self.family()) {
            planned &= self.plan_payload(operation, side, direction).is_some();
        }
        let http_error = self.plan_error_dispatch(operation);
        let validate = match operation.input_shape() {
            Some(input) => match self.plan_validation(input) {
                Some(name) => Some(name),
                None => {
                    planned = false;
                    None
                }
            },
            None => None,
        };
        if let (true, Some(http_error)) = (planned, http_error) {
            self.operations.insert(
                operation.id().clone(),
                OperationPlan {
                    operation: operation.id().clone(),
                    input: operation.input_shape().cloned(),
                    output: operation.output_shape().cloned(),
                    http_error,
                    validate,
                },
            );
        }
    }

    pub(crate) fn finish(self) -> Result<CodecPlan, CodegenError> {
        if !self.issues.is_empty() {
            return Err(CodegenError::new(self.issues));
        }
        Ok(CodecPlan {
            protocol: self.protocol,
            service: self.service.id().clone(),
            model_module: self.settings.model_module.clone(),
            error_module: self.settings.error_module.clone(),
            routines: self.routines,
            index: self.index,
            operations: self.operations,
        })
    }
}

#[cfg(test)]
mod test {
    use super::Dispatcher;
    use crate::error::Issue;
    use crate::ir::{RoutineBody, RoutineKey, RoutineKind, ValuePlan};
    use crate::model::{ApplyTraits, Member, Model, Service, Shape, ShapeId, ShapeKind};
    use crate::protocol::Protocol;
    use crate::settings::CodegenSettings;

    fn recursive_model() -> Model {
        Model::builder()
            .shape(
                Shape::structure("ns#Node")
                    .member(Member::new("next", "ns#Node"))
                    .member(Member::new("children", "ns#Nodes"))
                    .member(Member::new("value", "smithy.api#String")),
            )
            .shape(Shape::list("ns#Nodes", "ns#Node"))
            .build()
            .unwrap()
    }

    #[test]
    fn cycles_produce_one_routine_per_kind() {
        let model = recursive_model();
        let service = Service::new("ns#Svc", "1", Protocol::AwsJson11);
        let settings = CodegenSettings::default();
        let mut dispatcher = Dispatcher::new(&model, &service, Protocol::AwsJson11, &settings);
        let node = ShapeId::new("ns#Node");
        let first = dispatcher.dispatch(&node, RoutineKind::Encode).unwrap();
        let second = dispatcher.dispatch(&node, RoutineKind::Encode).unwrap();
        assert_eq!(first, "ser_aws_json_11_node");
        assert_eq!(first, second);
        let plan = dispatcher.finish().unwrap();
        let names: Vec<_> = plan.routines().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["ser_aws_json_11_node", "ser_aws_json_11_nodes"]);
        let routine = plan
            .routine(&RoutineKey::Shape(node, RoutineKind::Encode))
            .unwrap();
        match &routine.body {
            RoutineBody::Structure(structure) => {
                let next = &structure.members[1];
                assert_eq!(next.name, "next");
                assert!(
                    matches!(&next.value, ValuePlan::Aggregate(agg) if agg.routine == "ser_aws_json_11_node")
                );
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn unsupported_shapes_are_all_reported() {
        let model = Model::builder()
            .shape(
                Shape::structure("ns#Numbers")
                    .member(Member::new("big", "smithy.api#BigInteger"))
                    .member(Member::new("doc", "smithy.api#Document"))
                    .member(Member::new("gone", "ns#Missing")),
            )
            .build()
            .unwrap();
        let service = Service::new("ns#Svc", "1", Protocol::RestXml);
        let settings = CodegenSettings::default();
        let mut dispatcher = Dispatcher::new(&model, &service, Protocol::RestXml, &settings);
        dispatcher.dispatch(&ShapeId::new("ns#Numbers"), RoutineKind::Decode);
        let err = dispatcher.finish().unwrap_err();
        assert_eq!(
            err.issues(),
            [
                Issue::Unsupported {
                    shape: ShapeId::new("ns#Numbers$big"),
                    kind: ShapeKind::BigInteger.type_name(),
                    protocol: Protocol::RestXml,
                },
                Issue::Unsupported {
                    shape: ShapeId::new("ns#Numbers$doc"),
                    kind: ShapeKind::Document.type_name(),
                    protocol: Protocol::RestXml,
                },
                Issue::MissingTarget {
                    member: ShapeId::new("ns#Numbers$gone"),
                    target: ShapeId::new("ns#Missing"),
                },
            ]
        );
    }

    #[test]
    fn flattened_xml_members_get_unwrapped_decoders() {
        let model = Model::builder()
            .shape(
                Shape::structure("ns#Holder")
                    .member(Member::new("Items", "ns#Items").xml_flattened()),
            )
            .shape(Shape::list("ns#Items", "smithy.api#String"))
            .build()
            .unwrap();
        let service = Service::new("ns#Svc", "1", Protocol::RestXml);
        let settings = CodegenSettings::default();
        let mut dispatcher = Dispatcher::new(&model, &service, Protocol::RestXml, &settings);
        dispatcher.dispatch(&ShapeId::new("ns#Holder"), RoutineKind::Decode);
        let plan = dispatcher.finish().unwrap();
        assert!(plan.routine_named("de_rest_xml_items_unwrapped").is_some());
        assert!(plan.routine_named("de_rest_xml_items").is_some());
    }

    #[test]
    fn colliding_names_are_reported() {
        let model = Model::builder()
            .shape(
                Shape::structure("ns#Holder")
                    .member(Member::new("a", "ns#FooBar"))
                    .member(Member::new("b", "other#FooBar")),
            )
            .shape(Shape::structure("ns#FooBar"))
            .shape(Shape::structure("other#FooBar"))
            .build()
            .unwrap();
        let service = Service::new("ns#Svc", "1", Protocol::AwsJson10);
        let settings = CodegenSettings::default();
        let mut dispatcher = Dispatcher::new(&model, &service, Protocol::AwsJson10, &settings);
        dispatcher.dispatch(&ShapeId::new("ns#Holder"), RoutineKind::Encode);
        let err = dispatcher.finish().unwrap_err();
        assert!(matches!(
            &err.issues()[0],
            Issue::NameCollision { name, .. } if name == "ser_aws_json_10_foo_bar"
        ));
    }
}
