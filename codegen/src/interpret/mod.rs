/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Runs a [`CodecPlan`] against dynamic [`Value`]s.
//!
//! The interpreter walks the same routine plans the renderers turn into source, using the same
//! runtime crates, so a plan can be exercised end to end (encode, decode, error dispatch and
//! validation) without compiling generated code.
//!
//! Structures are keyed by member name. `Value::Null` as a structure member means the member is
//! unset; inside a `@sparse` collection it is an explicit null.

use crate::ir::{
    CodecPlan, Direction, Framing, HeaderBinding, HeaderValue, MemberPlan, PayloadBody,
    PayloadPlan, PayloadSide, RoutineBody, RoutineKey, ScalarKind, ScalarPlan, ValuePlan,
};
use crate::model::ShapeId;
use crate::protocol::{self, WireFamily};
use shapecodec_http::{header, with_snapshot, DeserializationError};
use shapecodec_types::error::operation::SerializationError;
use shapecodec_types::error::validation::InvalidParamsError;
use shapecodec_types::primitive::{Encoder, Parse};
use shapecodec_types::{base64, Blob, DateTime, Document};
use std::collections::BTreeMap;
use std::error::Error as StdError;

mod errors;
mod json;
mod query;
mod validate;
mod xml;

pub use errors::OperationError;

type BoxError = Box<dyn StdError + Send + Sync>;

/// A dynamically typed value of any modeled shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An explicit null in a sparse collection, or an unset member
    Null,
    /// `boolean`
    Boolean(bool),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// `integer` and `intEnum`
    Integer(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// `string` and enums
    String(String),
    /// `blob`
    Blob(Blob),
    /// `timestamp`
    Timestamp(DateTime),
    /// `document`
    Document(Document),
    /// `list` and `set`
    List(Vec<Value>),
    /// `map`
    Map(BTreeMap<String, Value>),
    /// `structure`, keyed by member name
    Structure(BTreeMap<String, Value>),
    /// `union`: the variant's member name and its value
    Union(String, Box<Value>),
    /// A union variant this model doesn't know about
    UnknownVariant,
}

impl Value {
    /// Builds a structure from `(member, value)` pairs.
    pub fn structure<K: Into<String>>(members: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Structure(
            members
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// A structure with no members set.
    pub fn empty_structure() -> Value {
        Value::Structure(BTreeMap::new())
    }

    /// Builds a union value.
    pub fn union(variant: impl Into<String>, value: Value) -> Value {
        Value::Union(variant.into(), Box::new(value))
    }

    /// A string value.
    pub fn string(value: impl Into<String>) -> Value {
        Value::String(value.into())
    }

    /// The members of a structure.
    pub fn as_structure(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Structure(members) => Some(members),
            _ => None,
        }
    }

    /// A set member of a structure.
    pub fn member(&self, name: &str) -> Option<&Value> {
        self.as_structure()
            .and_then(|members| members.get(name))
            .filter(|value| !matches!(value, Value::Null))
    }

    /// Name of the variant, used in mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Integer(_) => "integer",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Blob(_) => "blob",
            Value::Timestamp(_) => "timestamp",
            Value::Document(_) => "document",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Structure(_) => "structure",
            Value::Union(..) => "union",
            Value::UnknownVariant => "unknown union variant",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<DateTime> for Value {
    fn from(value: DateTime) -> Self {
        Value::Timestamp(value)
    }
}

impl From<Blob> for Value {
    fn from(value: Blob) -> Self {
        Value::Blob(value)
    }
}

/// Encodes an operation's request body.
pub fn encode_input(
    plan: &CodecPlan,
    operation: &ShapeId,
    input: &Value,
) -> Result<Vec<u8>, SerializationError> {
    let payload = payload(plan, operation, PayloadSide::Input, Direction::Encode)
        .ok_or_else(|| no_routine(operation, "request encoder"))?;
    encode_payload(plan, payload, input)
}

/// Encodes an operation's response body. Header and status code bindings are not written.
pub fn encode_output(
    plan: &CodecPlan,
    operation: &ShapeId,
    output: &Value,
) -> Result<Vec<u8>, SerializationError> {
    // Query responses are XML; the response decoder plan describes them.
    let direction = match plan.protocol().family() {
        WireFamily::Query => Direction::Decode,
        WireFamily::Json | WireFamily::Xml => Direction::Encode,
    };
    let payload = payload(plan, operation, PayloadSide::Output, direction)
        .ok_or_else(|| no_routine(operation, "response encoder"))?;
    encode_payload(plan, payload, output)
}

/// Decodes an operation's request body.
pub fn decode_input(
    plan: &CodecPlan,
    operation: &ShapeId,
    body: &[u8],
) -> Result<Value, DeserializationError> {
    // Query requests are form encoded; the request encoder plan describes them.
    let direction = match plan.protocol().family() {
        WireFamily::Query => Direction::Encode,
        WireFamily::Json | WireFamily::Xml => Direction::Decode,
    };
    let payload = payload(plan, operation, PayloadSide::Input, direction).ok_or_else(|| {
        DeserializationError::from_body(no_routine_message(operation, "request decoder"), body)
    })?;
    let mut members = BTreeMap::new();
    decode_body(plan, payload, body, &mut members)?;
    Ok(Value::Structure(members))
}

/// Decodes a successful response: bound headers, the status code member and the body.
pub fn decode_output<B: AsRef<[u8]>>(
    plan: &CodecPlan,
    operation: &ShapeId,
    response: &http::Response<B>,
) -> Result<Value, DeserializationError> {
    let body = response.body().as_ref();
    let payload = payload(plan, operation, PayloadSide::Output, Direction::Decode).ok_or_else(
        || DeserializationError::from_body(no_routine_message(operation, "response decoder"), body),
    )?;
    let mut members = BTreeMap::new();
    if payload.structure.is_some() {
        read_headers(response.headers(), &payload.headers, &mut members)
            .map_err(|err| DeserializationError::from_body(err, body))?;
        if let Some(member) = &payload.response_code {
            members.insert(
                member.clone(),
                Value::Integer(i32::from(response.status().as_u16())),
            );
        }
    }
    decode_body(plan, payload, body, &mut members)?;
    Ok(Value::Structure(members))
}

/// Maps an error response to a modeled error, or to its generic metadata.
pub fn dispatch_error<B: AsRef<[u8]>>(
    plan: &CodecPlan,
    operation: &ShapeId,
    response: &http::Response<B>,
) -> OperationError {
    errors::dispatch(plan, operation, response)
}

/// Checks every required member of an operation input, recursing into nested aggregates.
///
/// Operations without an input always pass.
pub fn validate(
    plan: &CodecPlan,
    operation: &ShapeId,
    input: &Value,
) -> Result<(), InvalidParamsError> {
    match plan
        .operation(operation)
        .and_then(|operation| operation.validate.as_deref())
    {
        Some(routine) => validate::run(plan, routine, input),
        None => Ok(()),
    }
}

fn payload<'p>(
    plan: &'p CodecPlan,
    operation: &ShapeId,
    side: PayloadSide,
    direction: Direction,
) -> Option<&'p PayloadPlan> {
    match plan.routine(&RoutineKey::Payload(operation.clone(), side, direction)) {
        Some(routine) => match &routine.body {
            RoutineBody::Payload(payload) => Some(payload),
            _ => None,
        },
        None => None,
    }
}

fn no_routine_message(operation: &ShapeId, what: &str) -> String {
    format!("no {} was planned for {}", what, operation)
}

fn no_routine(operation: &ShapeId, what: &str) -> SerializationError {
    SerializationError::custom(no_routine_message(operation, what))
}

/// The plan of a shape routine, looked up by name.
fn body<'p>(plan: &'p CodecPlan, routine: &str) -> Result<&'p RoutineBody, String> {
    plan.routine_named(routine)
        .map(|routine| &routine.body)
        .ok_or_else(|| format!("routine {} is not in the plan", routine))
}

fn encode_payload(
    plan: &CodecPlan,
    payload: &PayloadPlan,
    input: &Value,
) -> Result<Vec<u8>, SerializationError> {
    if let PayloadBody::Member(member) = &payload.body {
        if let Some(raw) = raw_kind(member) {
            let owner = payload.structure.as_ref().map(ShapeId::name).unwrap_or_default();
            return match present(owner, member, members_of(owner, input)?)? {
                Some(Value::Blob(blob)) if raw == ScalarKind::Blob => Ok(blob.as_ref().to_vec()),
                Some(Value::String(text)) if raw != ScalarKind::Blob => {
                    Ok(text.as_bytes().to_vec())
                }
                Some(other) => Err(mismatch_kind(raw_name(raw), other)),
                None => Ok(Vec::new()),
            };
        }
    }
    match (plan.protocol().family(), &payload.framing) {
        (WireFamily::Json, _) => json::write_payload(plan, payload, input),
        (WireFamily::Query, Framing::QueryRequest { .. }) => {
            query::write_payload(plan, payload, input)
        }
        (WireFamily::Xml | WireFamily::Query, _) => xml::write_payload(plan, payload, input),
    }
}

fn decode_body(
    plan: &CodecPlan,
    payload: &PayloadPlan,
    body: &[u8],
    out: &mut BTreeMap<String, Value>,
) -> Result<(), DeserializationError> {
    if payload.structure.is_none() {
        return Ok(());
    }
    if let PayloadBody::Member(member) = &payload.body {
        if let Some(raw) = raw_kind(member) {
            if !body.is_empty() {
                let value = match raw {
                    ScalarKind::Blob => Value::Blob(Blob::new(body)),
                    _ => Value::String(
                        std::str::from_utf8(body)
                            .map_err(|err| DeserializationError::from_body(err, body))?
                            .to_owned(),
                    ),
                };
                out.insert(member.name.clone(), value);
            }
            return Ok(());
        }
    }
    let decoded = match (plan.protocol().family(), &payload.framing) {
        (WireFamily::Json, _) => with_snapshot(body, |body| json::read_payload(plan, payload, body)),
        (WireFamily::Query, Framing::QueryRequest { .. }) => {
            with_snapshot(body, |body| query::read_payload(plan, payload, body))
        }
        (WireFamily::Xml | WireFamily::Query, _) => {
            with_snapshot(body, |body| xml::read_payload(plan, payload, body))
        }
    }?;
    out.extend(decoded);
    Ok(())
}

/// Blob and string `@httpPayload` members are the raw body.
fn raw_kind(member: &MemberPlan) -> Option<ScalarKind> {
    match &member.value {
        ValuePlan::Scalar(ScalarPlan {
            kind: kind @ (ScalarKind::Blob | ScalarKind::String | ScalarKind::Enum),
            ..
        }) => Some(*kind),
        _ => None,
    }
}

fn raw_name(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Blob => "blob",
        _ => "string",
    }
}

/// The members of `value`, which must be a structure.
fn members_of<'v>(
    shape: &str,
    value: &'v Value,
) -> Result<&'v BTreeMap<String, Value>, SerializationError> {
    value.as_structure().ok_or_else(|| {
        SerializationError::custom(format!(
            "expected a structure for {} but found a {}",
            shape,
            value.kind_name()
        ))
    })
}

/// The set value of `member`, failing if a required member is unset.
fn present<'v>(
    owner: &str,
    member: &MemberPlan,
    values: &'v BTreeMap<String, Value>,
) -> Result<Option<&'v Value>, SerializationError> {
    match values.get(&member.name) {
        Some(Value::Null) | None if member.required => Err(
            SerializationError::missing_required_member(owner.to_owned(), member.name.clone()),
        ),
        Some(Value::Null) | None => Ok(None),
        Some(value) => Ok(Some(value)),
    }
}

fn mismatch_kind(expected: &str, found: &Value) -> SerializationError {
    SerializationError::custom(format!(
        "expected a {} value but found a {}",
        expected,
        found.kind_name()
    ))
}

fn mismatch(scalar: &ScalarPlan, found: &Value) -> SerializationError {
    SerializationError::custom(format!(
        "{} for {} but found a {}",
        protocol::expected(scalar),
        scalar.shape,
        found.kind_name()
    ))
}

fn null_in_dense(shape: &ShapeId) -> SerializationError {
    SerializationError::custom(format!("{} is not sparse but holds a null", shape))
}

/// Text form of a scalar, as XML and Query carry it.
fn scalar_text(scalar: &ScalarPlan, value: &Value) -> Result<String, SerializationError> {
    Ok(match (scalar.kind, value) {
        (ScalarKind::Boolean, Value::Boolean(v)) => Encoder::from(*v).encode().to_owned(),
        (ScalarKind::Byte, Value::Byte(v)) => Encoder::from(*v).encode().to_owned(),
        (ScalarKind::Short, Value::Short(v)) => Encoder::from(*v).encode().to_owned(),
        (ScalarKind::Integer, Value::Integer(v)) => Encoder::from(*v).encode().to_owned(),
        (ScalarKind::Long, Value::Long(v)) => Encoder::from(*v).encode().to_owned(),
        (ScalarKind::Float, Value::Float(v)) => Encoder::from(*v).encode().to_owned(),
        (ScalarKind::Double, Value::Double(v)) => Encoder::from(*v).encode().to_owned(),
        (ScalarKind::String | ScalarKind::Enum, Value::String(v)) => v.clone(),
        (ScalarKind::Blob, Value::Blob(v)) => base64::encode(v),
        (ScalarKind::Timestamp(format), Value::Timestamp(v)) => v.fmt(format)?,
        (ScalarKind::Document, _) => {
            return Err(SerializationError::custom(
                "document values have no text encoding",
            ))
        }
        (_, other) => return Err(mismatch(scalar, other)),
    })
}

/// Parses the text form of a scalar.
fn parse_text(scalar: &ScalarPlan, text: &str) -> Result<Value, String> {
    fn primitive<T: Parse>(scalar: &ScalarPlan, text: &str) -> Result<T, String> {
        T::parse_smithy_primitive(text)
            .map_err(|_| format!("{} but found `{}`", protocol::expected(scalar), text))
    }
    Ok(match scalar.kind {
        ScalarKind::Boolean => Value::Boolean(primitive(scalar, text)?),
        ScalarKind::Byte => Value::Byte(primitive(scalar, text)?),
        ScalarKind::Short => Value::Short(primitive(scalar, text)?),
        ScalarKind::Integer => Value::Integer(primitive(scalar, text)?),
        ScalarKind::Long => Value::Long(primitive(scalar, text)?),
        ScalarKind::Float => Value::Float(primitive(scalar, text)?),
        ScalarKind::Double => Value::Double(primitive(scalar, text)?),
        ScalarKind::String | ScalarKind::Enum => Value::String(text.to_owned()),
        ScalarKind::Blob => Value::Blob(Blob::new(
            base64::decode(text).map_err(|err| format!("invalid base64: {}", err))?,
        )),
        ScalarKind::Timestamp(format) => Value::Timestamp(
            DateTime::from_str(text, format).map_err(|err| err.to_string())?,
        ),
        ScalarKind::Document => return Err("document values have no text encoding".to_owned()),
    })
}

/// Reads header-bound members. Empty header lists leave the member unset.
fn read_headers(
    headers: &http::HeaderMap,
    bindings: &[HeaderBinding],
    out: &mut BTreeMap<String, Value>,
) -> Result<(), BoxError> {
    for binding in bindings {
        let name = binding.header.as_str();
        let value = match &binding.value {
            HeaderValue::Scalar(scalar) => match scalar.kind {
                ScalarKind::String | ScalarKind::Enum => {
                    header::one_string(headers, name)?.map(Value::String)
                }
                ScalarKind::Blob => header::one_string(headers, name)?
                    .map(|value| base64::decode(value).map(|bytes| Value::Blob(Blob::new(bytes))))
                    .transpose()?,
                ScalarKind::Timestamp(format) => {
                    header::one_date(headers, name, format)?.map(Value::Timestamp)
                }
                ScalarKind::Boolean => header::one_or_none(headers, name)?.map(Value::Boolean),
                ScalarKind::Byte => header::one_or_none(headers, name)?.map(Value::Byte),
                ScalarKind::Short => header::one_or_none(headers, name)?.map(Value::Short),
                ScalarKind::Integer => header::one_or_none(headers, name)?.map(Value::Integer),
                ScalarKind::Long => header::one_or_none(headers, name)?.map(Value::Long),
                ScalarKind::Float => header::one_or_none(headers, name)?.map(Value::Float),
                ScalarKind::Double => header::one_or_none(headers, name)?.map(Value::Double),
                ScalarKind::Document => {
                    return Err(format!("header {} can't carry a document", name).into())
                }
            },
            HeaderValue::List(scalar) => {
                let items: Vec<Value> = match scalar.kind {
                    ScalarKind::String | ScalarKind::Enum => header::read_many_strings(headers, name)?
                        .into_iter()
                        .map(Value::String)
                        .collect(),
                    ScalarKind::Blob => header::read_many_strings(headers, name)?
                        .into_iter()
                        .map(|value| base64::decode(value).map(|bytes| Value::Blob(Blob::new(bytes))))
                        .collect::<Result<_, _>>()?,
                    ScalarKind::Timestamp(format) => header::many_dates(headers, name, format)?
                        .into_iter()
                        .map(Value::Timestamp)
                        .collect(),
                    ScalarKind::Boolean => many(headers, name, Value::Boolean)?,
                    ScalarKind::Byte => many(headers, name, Value::Byte)?,
                    ScalarKind::Short => many(headers, name, Value::Short)?,
                    ScalarKind::Integer => many(headers, name, Value::Integer)?,
                    ScalarKind::Long => many(headers, name, Value::Long)?,
                    ScalarKind::Float => many(headers, name, Value::Float)?,
                    ScalarKind::Double => many(headers, name, Value::Double)?,
                    ScalarKind::Document => {
                        return Err(format!("header {} can't carry a document", name).into())
                    }
                };
                (!items.is_empty()).then_some(Value::List(items))
            }
        };
        if let Some(value) = value {
            out.insert(binding.name.clone(), value);
        }
    }
    Ok(())
}

fn many<T: Parse>(
    headers: &http::HeaderMap,
    name: &str,
    wrap: fn(T) -> Value,
) -> Result<Vec<Value>, header::ParseError> {
    Ok(header::read_many::<T>(headers, name)?
        .into_iter()
        .map(wrap)
        .collect())
}

#[cfg(test)]
mod test {
    use super::{parse_text, scalar_text, Value};
    use crate::ir::{ScalarKind, ScalarPlan};
    use crate::model::ShapeId;
    use pretty_assertions::assert_eq;
    use shapecodec_types::date_time::Format;
    use shapecodec_types::{Blob, DateTime};

    fn scalar(kind: ScalarKind) -> ScalarPlan {
        ScalarPlan {
            kind,
            shape: ShapeId::new("smithy.api#Unit"),
        }
    }

    #[test]
    fn unset_and_null_members_are_absent() {
        let value = Value::structure([("a", Value::Null), ("b", Value::from(1))]);
        assert_eq!(value.member("a"), None);
        assert_eq!(value.member("b"), Some(&Value::Integer(1)));
        assert_eq!(value.member("c"), None);
    }

    #[test]
    fn scalar_text_forms() {
        assert_eq!(
            scalar_text(&scalar(ScalarKind::Double), &Value::Double(f64::NAN)).unwrap(),
            "NaN"
        );
        assert_eq!(
            scalar_text(&scalar(ScalarKind::Blob), &Value::Blob(Blob::new("hi"))).unwrap(),
            "aGk="
        );
        assert_eq!(
            scalar_text(
                &scalar(ScalarKind::Timestamp(Format::EpochSeconds)),
                &Value::Timestamp(DateTime::from_secs(1_576_540_098))
            )
            .unwrap(),
            "1576540098"
        );
        scalar_text(&scalar(ScalarKind::Integer), &Value::Long(1)).expect_err("wrong width");
    }

    #[test]
    fn parse_text_rejects_malformed_numbers() {
        assert_eq!(
            parse_text(&scalar(ScalarKind::Short), "-12").unwrap(),
            Value::Short(-12)
        );
        let err = parse_text(&scalar(ScalarKind::Integer), "twelve").unwrap_err();
        assert!(err.starts_with("expected (integer: `i32`)"), "{}", err);
        parse_text(&scalar(ScalarKind::Timestamp(Format::DateTime)), "1576540098")
            .expect_err("epoch seconds are not a date-time");
    }
}
