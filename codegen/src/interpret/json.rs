/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use super::{body, members_of, mismatch, null_in_dense, present, Value};
use crate::ir::{
    CodecPlan, ErrorBodyPlan, MemberPlan, PayloadBody, PayloadPlan, RoutineBody, ScalarKind,
    ScalarPlan, StructurePlan, ValuePlan,
};
use shapecodec_json::deserialize::{json_token_iter, token, DeserializeError, JsonTokenIterator, Token};
use shapecodec_json::serialize::{JsonObjectWriter, JsonValueWriter};
use shapecodec_types::error::operation::SerializationError;
use shapecodec_types::Number;
use std::collections::BTreeMap;
use std::iter::Peekable;

type Tokens<'a> = Peekable<JsonTokenIterator<'a>>;

pub(super) fn write_payload(
    plan: &CodecPlan,
    payload: &PayloadPlan,
    input: &Value,
) -> Result<Vec<u8>, SerializationError> {
    let rest = plan.protocol().is_rest();
    let structure = match &payload.structure {
        Some(structure) => structure,
        None if rest => return Ok(Vec::new()),
        None => return Ok(b"{}".to_vec()),
    };
    let values = members_of(structure.name(), input)?;
    match &payload.body {
        PayloadBody::Members(members) if members.is_empty() && rest => Ok(Vec::new()),
        PayloadBody::Members(members) => {
            let mut out = String::new();
            let mut object = JsonObjectWriter::new(&mut out);
            write_members(plan, structure.name(), members, values, &mut object)?;
            object.finish();
            Ok(out.into_bytes())
        }
        PayloadBody::Member(member) => match present(structure.name(), member, values)? {
            Some(value) => {
                let mut out = String::new();
                write_value(plan, &member.value, value, JsonValueWriter::new(&mut out))?;
                Ok(out.into_bytes())
            }
            None => Ok(Vec::new()),
        },
    }
}

fn write_members(
    plan: &CodecPlan,
    owner: &str,
    members: &[MemberPlan],
    values: &BTreeMap<String, Value>,
    object: &mut JsonObjectWriter<'_>,
) -> Result<(), SerializationError> {
    for member in members {
        if let Some(value) = present(owner, member, values)? {
            write_value(plan, &member.value, value, object.key(&member.wire_name))?;
        }
    }
    Ok(())
}

fn write_scalar(
    scalar: &ScalarPlan,
    value: &Value,
    destination: JsonValueWriter<'_>,
) -> Result<(), SerializationError> {
    match (scalar.kind, value) {
        (ScalarKind::Boolean, Value::Boolean(v)) => destination.boolean(*v),
        (ScalarKind::Byte, Value::Byte(v)) => destination.number(Number::from(i64::from(*v))),
        (ScalarKind::Short, Value::Short(v)) => destination.number(Number::from(i64::from(*v))),
        (ScalarKind::Integer, Value::Integer(v)) => {
            destination.number(Number::from(i64::from(*v)))
        }
        (ScalarKind::Long, Value::Long(v)) => destination.number(Number::from(*v)),
        (ScalarKind::Float, Value::Float(v)) => destination.number(Number::Float(f64::from(*v))),
        (ScalarKind::Double, Value::Double(v)) => destination.number(Number::Float(*v)),
        (ScalarKind::String | ScalarKind::Enum, Value::String(v)) => destination.string(v),
        (ScalarKind::Blob, Value::Blob(v)) => destination.blob(v.as_ref()),
        (ScalarKind::Timestamp(format), Value::Timestamp(v)) => destination.date_time(v, format)?,
        (ScalarKind::Document, Value::Document(v)) => destination.document(v),
        (_, other) => return Err(mismatch(scalar, other)),
    }
    Ok(())
}

fn write_value(
    plan: &CodecPlan,
    slot: &ValuePlan,
    value: &Value,
    destination: JsonValueWriter<'_>,
) -> Result<(), SerializationError> {
    let aggregate = match slot {
        ValuePlan::Scalar(scalar) => return write_scalar(scalar, value, destination),
        ValuePlan::Aggregate(aggregate) => aggregate,
    };
    match body(plan, &aggregate.routine).map_err(SerializationError::custom)? {
        RoutineBody::Structure(structure) => {
            let values = members_of(structure.shape.name(), value)?;
            let mut object = destination.start_object();
            write_members(plan, structure.shape.name(), &structure.members, values, &mut object)?;
            object.finish();
        }
        RoutineBody::Union(union) => {
            let mut object = destination.start_object();
            write_union(plan, union, value, &mut object)?;
            object.finish();
        }
        RoutineBody::List(list) => {
            let items = match value {
                Value::List(items) => items,
                other => return Err(super::mismatch_kind("list", other)),
            };
            let mut array = destination.start_array();
            for item in items {
                match item {
                    // enum lists skip nulls instead of writing them
                    Value::Null if list.sparse && list.element.is_enum() => {}
                    Value::Null if list.sparse => array.value().null(),
                    Value::Null => return Err(null_in_dense(&list.shape)),
                    item => write_value(plan, &list.element, item, array.value())?,
                }
            }
            array.finish();
        }
        RoutineBody::Map(map) => {
            let entries = match value {
                Value::Map(entries) => entries,
                other => return Err(super::mismatch_kind("map", other)),
            };
            let mut object = destination.start_object();
            for (key, value) in entries {
                match value {
                    Value::Null if map.sparse => object.key(key).null(),
                    Value::Null => return Err(null_in_dense(&map.shape)),
                    value => write_value(plan, &map.value, value, object.key(key))?,
                }
            }
            object.finish();
        }
        _ => {
            return Err(SerializationError::custom(format!(
                "{} is not a shape routine",
                aggregate.routine
            )))
        }
    }
    Ok(())
}

fn write_union(
    plan: &CodecPlan,
    union: &StructurePlan,
    value: &Value,
    object: &mut JsonObjectWriter<'_>,
) -> Result<(), SerializationError> {
    match value {
        Value::Union(variant, inner) => {
            let member = union
                .members
                .iter()
                .find(|member| &member.name == variant)
                .ok_or_else(|| SerializationError::unknown_variant(union.shape.name().to_owned()))?;
            write_value(plan, &member.value, inner, object.key(&member.wire_name))
        }
        Value::UnknownVariant => Err(SerializationError::unknown_variant(
            union.shape.name().to_owned(),
        )),
        other => Err(super::mismatch_kind("union", other)),
    }
}

/// Decodes a JSON document body. An empty body reads as `{}`.
pub(super) fn read_payload(
    plan: &CodecPlan,
    payload: &PayloadPlan,
    body: &[u8],
) -> Result<BTreeMap<String, Value>, DeserializeError> {
    let mut out = BTreeMap::new();
    match &payload.body {
        PayloadBody::Members(members) => {
            let body = if body.is_empty() { &b"{}"[..] } else { body };
            let mut tokens = json_token_iter(body).peekable();
            token::expect_start_object(tokens.next())?;
            read_members(plan, members, &mut tokens, &mut out, 0)?;
            reject_trailing_tokens(&mut tokens)?;
        }
        PayloadBody::Member(member) if !body.is_empty() => {
            let mut tokens = json_token_iter(body).peekable();
            let value = read_value(plan, &member.value, &mut tokens, 0)?;
            reject_trailing_tokens(&mut tokens)?;
            if let Some(value) = value {
                out.insert(member.name.clone(), value);
            }
        }
        PayloadBody::Member(_) => {}
    }
    Ok(out)
}

/// Decodes the members of a modeled error from its JSON body.
pub(super) fn read_error(
    plan: &CodecPlan,
    error: &ErrorBodyPlan,
    body: &[u8],
) -> Result<BTreeMap<String, Value>, DeserializeError> {
    let body = if body.is_empty() { &b"{}"[..] } else { body };
    let mut tokens = json_token_iter(body).peekable();
    token::expect_start_object(tokens.next())?;
    let mut out = BTreeMap::new();
    read_members(plan, &error.members, &mut tokens, &mut out, 0)?;
    Ok(out)
}

fn reject_trailing_tokens(tokens: &mut Tokens<'_>) -> Result<(), DeserializeError> {
    match tokens.next() {
        Some(_) => Err(DeserializeError::custom(
            "found more JSON tokens after completing parsing",
        )),
        None => Ok(()),
    }
}

/// Reads the rest of an object whose start token was consumed. Unknown keys are skipped.
fn read_members(
    plan: &CodecPlan,
    members: &[MemberPlan],
    tokens: &mut Tokens<'_>,
    out: &mut BTreeMap<String, Value>,
    depth: usize,
) -> Result<(), DeserializeError> {
    loop {
        match tokens.next().transpose()? {
            Some(Token::EndObject { .. }) => return Ok(()),
            Some(Token::ObjectKey { key, .. }) => {
                let key = key.to_unescaped()?;
                match members.iter().find(|member| member.wire_name == key) {
                    Some(member) => {
                        if let Some(value) = read_value(plan, &member.value, tokens, depth)? {
                            out.insert(member.name.clone(), value);
                        }
                    }
                    None => token::skip_value(tokens)?,
                }
            }
            other => {
                return Err(DeserializeError::custom(format!(
                    "expected object key or end object, found: {:?}",
                    other
                )))
            }
        }
    }
}

fn read_scalar(
    scalar: &ScalarPlan,
    tokens: &mut Tokens<'_>,
) -> Result<Option<Value>, DeserializeError> {
    let number = |tokens: &mut Tokens<'_>| token::expect_number_or_null(tokens.next());
    Ok(match scalar.kind {
        ScalarKind::Boolean => token::expect_bool_or_null(tokens.next())?.map(Value::Boolean),
        ScalarKind::Byte => number(tokens)?.map(i8::try_from).transpose()?.map(Value::Byte),
        ScalarKind::Short => number(tokens)?.map(i16::try_from).transpose()?.map(Value::Short),
        ScalarKind::Integer => number(tokens)?
            .map(i32::try_from)
            .transpose()?
            .map(Value::Integer),
        ScalarKind::Long => number(tokens)?.map(i64::try_from).transpose()?.map(Value::Long),
        ScalarKind::Float => number(tokens)?.map(|v| Value::Float(v.to_f32_lossy())),
        ScalarKind::Double => number(tokens)?.map(|v| Value::Double(v.to_f64_lossy())),
        ScalarKind::String | ScalarKind::Enum => token::expect_string_or_null(tokens.next())?
            .map(|s| s.to_unescaped().map(|u| Value::String(u.into_owned())))
            .transpose()?,
        ScalarKind::Blob => token::expect_blob_or_null(tokens.next())?.map(Value::Blob),
        ScalarKind::Timestamp(format) => {
            token::expect_timestamp_or_null(tokens.next(), format)?.map(Value::Timestamp)
        }
        ScalarKind::Document => Some(Value::Document(token::expect_document(tokens)?)),
    })
}

/// Decodes one value; `Ok(None)` for `null`. `depth` counts the aggregates around it.
fn read_value(
    plan: &CodecPlan,
    slot: &ValuePlan,
    tokens: &mut Tokens<'_>,
    depth: usize,
) -> Result<Option<Value>, DeserializeError> {
    let aggregate = match slot {
        ValuePlan::Scalar(scalar) => return read_scalar(scalar, tokens),
        ValuePlan::Aggregate(aggregate) => aggregate,
    };
    token::check_depth(tokens, depth)?;
    let routine = body(plan, &aggregate.routine).map_err(DeserializeError::custom)?;
    match (tokens.next().transpose()?, routine) {
        (Some(Token::ValueNull { .. }), _) => Ok(None),
        (Some(Token::StartObject { .. }), RoutineBody::Structure(structure)) => {
            let mut members = BTreeMap::new();
            read_members(plan, &structure.members, tokens, &mut members, depth + 1)?;
            Ok(Some(Value::Structure(members)))
        }
        (Some(Token::StartObject { .. }), RoutineBody::Union(union)) => {
            read_union(plan, union, tokens, depth + 1)
        }
        (Some(Token::StartArray { .. }), RoutineBody::List(list)) => {
            let mut items = Vec::new();
            loop {
                if let Some(Ok(Token::EndArray { .. })) = tokens.peek() {
                    tokens.next().transpose()?;
                    break;
                }
                match read_value(plan, &list.element, tokens, depth + 1)? {
                    Some(item) => items.push(item),
                    None if list.sparse => items.push(Value::Null),
                    None => {}
                }
            }
            Ok(Some(Value::List(items)))
        }
        (Some(Token::StartObject { .. }), RoutineBody::Map(map)) => {
            let mut entries = BTreeMap::new();
            loop {
                match tokens.next().transpose()? {
                    Some(Token::EndObject { .. }) => break,
                    Some(Token::ObjectKey { key, .. }) => {
                        let key = key.to_unescaped()?.into_owned();
                        match read_value(plan, &map.value, tokens, depth + 1)? {
                            Some(value) => {
                                entries.insert(key, value);
                            }
                            None if map.sparse => {
                                entries.insert(key, Value::Null);
                            }
                            None => {}
                        }
                    }
                    other => {
                        return Err(DeserializeError::custom(format!(
                            "expected object key or end object, found: {:?}",
                            other
                        )))
                    }
                }
            }
            Ok(Some(Value::Map(entries)))
        }
        (_, RoutineBody::List(_)) => Err(DeserializeError::custom("expected start array or null")),
        (_, _) => Err(DeserializeError::custom("expected start object or null")),
    }
}

/// The first non-null variant wins; `__type` and later keys are skipped.
fn read_union(
    plan: &CodecPlan,
    union: &StructurePlan,
    tokens: &mut Tokens<'_>,
    depth: usize,
) -> Result<Option<Value>, DeserializeError> {
    let mut variant = None;
    loop {
        match tokens.next().transpose()? {
            Some(Token::EndObject { .. }) => return Ok(variant),
            Some(Token::ObjectKey { key, .. }) => {
                if let Some(Ok(Token::ValueNull { .. })) = tokens.peek() {
                    let _ = tokens.next();
                    continue;
                }
                let key = key.to_unescaped()?;
                if key == "__type" || variant.is_some() {
                    token::skip_value(tokens)?;
                    continue;
                }
                variant = match union.members.iter().find(|member| member.wire_name == key) {
                    Some(member) => {
                        let value = read_value(plan, &member.value, tokens, depth)?.ok_or_else(|| {
                            DeserializeError::custom(format!(
                                "value for '{}' cannot be null",
                                member.wire_name
                            ))
                        })?;
                        Some(Value::Union(member.name.clone(), Box::new(value)))
                    }
                    None => {
                        token::skip_value(tokens)?;
                        Some(Value::UnknownVariant)
                    }
                };
            }
            other => {
                return Err(DeserializeError::custom(format!(
                    "expected object key or end object, found: {:?}",
                    other
                )))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{read_payload, write_payload};
    use crate::interpret::Value;
    use crate::ir::{
        AggregatePlan, CodecPlan, Framing, MemberPlan, PayloadBody, PayloadPlan,
        PayloadSide, Routine, RoutineBody, RoutineKey, RoutineKind, ScalarKind, ScalarPlan,
        StructurePlan, ValuePlan, XmlLocation,
    };
    use crate::model::{ShapeId, ShapeKind};
    use crate::protocol::Protocol;
    use pretty_assertions::assert_eq;

    fn member(name: &str, value: ValuePlan) -> MemberPlan {
        MemberPlan {
            name: name.to_owned(),
            field: name.to_owned(),
            wire_name: name.to_owned(),
            required: false,
            location: XmlLocation::Element,
            flattened: false,
            namespace: None,
            value,
        }
    }

    fn string() -> ValuePlan {
        ValuePlan::Scalar(ScalarPlan {
            kind: ScalarKind::String,
            shape: ShapeId::new("smithy.api#String"),
        })
    }

    /// `Echo(message: String, shape: Shape)` where `Shape` is a union of `name` and `size`.
    fn plan() -> (CodecPlan, PayloadPlan) {
        let mut plan = CodecPlan::empty(Protocol::AwsJson10);
        let union = Routine {
            name: "ser_aws_json_10_shape".to_owned(),
            key: RoutineKey::Shape(ShapeId::new("ns#Shape"), RoutineKind::Encode),
            body: RoutineBody::Union(StructurePlan {
                shape: ShapeId::new("ns#Shape"),
                members: vec![
                    member("name", string()),
                    member(
                        "size",
                        ValuePlan::Scalar(ScalarPlan {
                            kind: ScalarKind::Integer,
                            shape: ShapeId::new("smithy.api#Integer"),
                        }),
                    ),
                ],
            }),
        };
        plan.routines.insert(union.name.clone(), union);
        let payload = PayloadPlan {
            operation: ShapeId::new("ns#Echo"),
            side: PayloadSide::Input,
            structure: Some(ShapeId::new("ns#EchoInput")),
            framing: Framing::JsonObject,
            body: PayloadBody::Members(vec![
                member("message", string()),
                member(
                    "shape",
                    ValuePlan::Aggregate(AggregatePlan {
                        shape: ShapeId::new("ns#Shape"),
                        kind: ShapeKind::Union,
                        routine: "ser_aws_json_10_shape".to_owned(),
                        unwrapped: None,
                    }),
                ),
            ]),
            headers: Vec::new(),
            response_code: None,
            content_type: "application/x-amz-json-1.0".to_owned(),
        };
        (plan, payload)
    }

    #[test]
    fn unknown_keys_are_skipped() {
        let (plan, payload) = plan();
        let members = read_payload(
            &plan,
            &payload,
            br#"{"extra": {"nested": [1, 2]}, "message": "hi"}"#,
        )
        .unwrap();
        assert_eq!(members.get("message"), Some(&Value::string("hi")));
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn union_skips_type_and_nulls() {
        let (plan, payload) = plan();
        let members = read_payload(
            &plan,
            &payload,
            br#"{"shape": {"__type": "ns#Shape", "name": null, "size": 3}}"#,
        )
        .unwrap();
        assert_eq!(
            members.get("shape"),
            Some(&Value::union("size", Value::Integer(3)))
        );
        let members = read_payload(&plan, &payload, br#"{"shape": {"other": true}}"#).unwrap();
        assert_eq!(members.get("shape"), Some(&Value::UnknownVariant));
    }

    #[test]
    fn deeply_nested_unknown_values_are_skipped() {
        let (plan, payload) = plan();
        let depth = 200_000;
        let mut body = br#"{"extra": "#.to_vec();
        body.extend(std::iter::repeat(b'[').take(depth));
        body.extend(std::iter::repeat(b']').take(depth));
        body.extend(br#", "message": "hi"}"#);
        let members = read_payload(&plan, &payload, &body).unwrap();
        assert_eq!(members.get("message"), Some(&Value::string("hi")));

        // cut off mid-nesting: an error, not a crash
        read_payload(&plan, &payload, &body[..10 + depth]).unwrap_err();
    }

    #[test]
    fn recursion_past_the_nesting_limit_is_an_error() {
        let mut plan = CodecPlan::empty(Protocol::AwsJson10);
        let node = ValuePlan::Aggregate(AggregatePlan {
            shape: ShapeId::new("ns#Node"),
            kind: ShapeKind::Structure,
            routine: "de_aws_json_10_node".to_owned(),
            unwrapped: None,
        });
        let routine = Routine {
            name: "de_aws_json_10_node".to_owned(),
            key: RoutineKey::Shape(ShapeId::new("ns#Node"), RoutineKind::Decode),
            body: RoutineBody::Structure(StructurePlan {
                shape: ShapeId::new("ns#Node"),
                members: vec![member("next", node.clone())],
            }),
        };
        plan.routines.insert(routine.name.clone(), routine);
        let payload = PayloadPlan {
            operation: ShapeId::new("ns#Walk"),
            side: PayloadSide::Input,
            structure: Some(ShapeId::new("ns#WalkInput")),
            framing: Framing::JsonObject,
            body: PayloadBody::Members(vec![member("root", node)]),
            headers: Vec::new(),
            response_code: None,
            content_type: "application/x-amz-json-1.0".to_owned(),
        };
        let nested = |levels: usize| {
            format!(
                "{{\"root\": {}{{}}{}}}",
                "{\"next\": ".repeat(levels),
                "}".repeat(levels)
            )
        };

        read_payload(&plan, &payload, nested(100).as_bytes()).unwrap();
        let err = read_payload(&plan, &payload, nested(100_000).as_bytes()).unwrap_err();
        assert!(err.to_string().contains("max nesting depth"), "{}", err);
        assert!(err.offset().is_some());
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let (plan, payload) = plan();
        let err = read_payload(&plan, &payload, br#"{"message": "a"} {}"#).unwrap_err();
        assert!(err.to_string().contains("more JSON tokens"), "{}", err);
    }

    #[test]
    fn unknown_variant_cannot_be_encoded() {
        let (plan, payload) = plan();
        let input = Value::structure([("shape", Value::UnknownVariant)]);
        write_payload(&plan, &payload, &input).expect_err("unknown variant");
        let input = Value::structure([("message", Value::string("a\"b"))]);
        assert_eq!(
            write_payload(&plan, &payload, &input).unwrap(),
            br#"{"message":"a\"b"}"#.to_vec()
        );
    }
}
