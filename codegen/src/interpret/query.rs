/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Form-encoded `awsQuery` request bodies.

use super::{body, members_of, mismatch, mismatch_kind, null_in_dense, parse_text, present, Value};
use crate::ir::{CodecPlan, Framing, MemberPlan, PayloadBody, PayloadPlan, RoutineBody, ScalarKind, ScalarPlan, ValuePlan};
use shapecodec_query::{
    QueryDecodeError, QueryReader, QueryScope, QueryValueWriter, QueryWriter, MAX_NESTING_DEPTH,
};
use shapecodec_types::error::operation::SerializationError;
use shapecodec_types::{base64, Number};
use std::collections::BTreeMap;

fn members(payload: &PayloadPlan) -> &[MemberPlan] {
    match &payload.body {
        PayloadBody::Members(members) => members,
        PayloadBody::Member(member) => std::slice::from_ref(member),
    }
}

pub(super) fn write_payload(
    plan: &CodecPlan,
    payload: &PayloadPlan,
    input: &Value,
) -> Result<Vec<u8>, SerializationError> {
    let (action, version) = match &payload.framing {
        Framing::QueryRequest { action, version } => (action.as_str(), version.as_str()),
        _ => (payload.operation.name(), ""),
    };
    let mut out = String::new();
    let mut writer = QueryWriter::new(&mut out, action, version);
    if let Some(structure) = &payload.structure {
        let values = members_of(structure.name(), input)?;
        for member in members(payload) {
            if let Some(value) = present(structure.name(), member, values)? {
                write_value(
                    plan,
                    &member.value,
                    member.flattened,
                    value,
                    writer.prefix(&member.wire_name),
                )?;
            }
        }
    }
    writer.finish();
    Ok(out.into_bytes())
}

fn write_scalar(
    scalar: &ScalarPlan,
    value: &Value,
    writer: QueryValueWriter<'_>,
) -> Result<(), SerializationError> {
    match (scalar.kind, value) {
        (ScalarKind::Boolean, Value::Boolean(v)) => writer.boolean(*v),
        (ScalarKind::Byte, Value::Byte(v)) => writer.number(Number::from(i64::from(*v))),
        (ScalarKind::Short, Value::Short(v)) => writer.number(Number::from(i64::from(*v))),
        (ScalarKind::Integer, Value::Integer(v)) => writer.number(Number::from(i64::from(*v))),
        (ScalarKind::Long, Value::Long(v)) => writer.number(Number::from(*v)),
        (ScalarKind::Float, Value::Float(v)) => writer.number(Number::Float(f64::from(*v))),
        (ScalarKind::Double, Value::Double(v)) => writer.number(Number::Float(*v)),
        (ScalarKind::String | ScalarKind::Enum, Value::String(v)) => writer.string(v),
        (ScalarKind::Blob, Value::Blob(v)) => writer.string(&base64::encode(v)),
        (ScalarKind::Timestamp(format), Value::Timestamp(v)) => writer.date_time(v, format)?,
        (ScalarKind::Document, _) => {
            return Err(SerializationError::custom(
                "document values have no query encoding",
            ))
        }
        (_, other) => return Err(mismatch(scalar, other)),
    }
    Ok(())
}

/// Writes `value` at the key path `writer` holds. Null collection items are not written.
fn write_value(
    plan: &CodecPlan,
    slot: &ValuePlan,
    flattened: bool,
    value: &Value,
    mut writer: QueryValueWriter<'_>,
) -> Result<(), SerializationError> {
    let routine = match slot {
        ValuePlan::Scalar(scalar) => return write_scalar(scalar, value, writer),
        ValuePlan::Aggregate(aggregate) => {
            body(plan, &aggregate.routine).map_err(SerializationError::custom)?
        }
    };
    match routine {
        RoutineBody::Structure(structure) => {
            let owner = structure.shape.name();
            let values = members_of(owner, value)?;
            for member in &structure.members {
                if let Some(value) = present(owner, member, values)? {
                    write_value(
                        plan,
                        &member.value,
                        member.flattened,
                        value,
                        writer.prefix(&member.wire_name),
                    )?;
                }
            }
        }
        RoutineBody::Union(union) => {
            let (variant, inner) = match value {
                Value::Union(variant, inner) => (variant, inner),
                Value::UnknownVariant => {
                    return Err(SerializationError::unknown_variant(
                        union.shape.name().to_owned(),
                    ))
                }
                other => return Err(mismatch_kind("union", other)),
            };
            let member = union
                .members
                .iter()
                .find(|member| &member.name == variant)
                .ok_or_else(|| {
                    SerializationError::unknown_variant(union.shape.name().to_owned())
                })?;
            write_value(
                plan,
                &member.value,
                member.flattened,
                inner,
                writer.prefix(&member.wire_name),
            )?;
        }
        RoutineBody::List(list) => {
            let items = match value {
                Value::List(items) => items,
                other => return Err(mismatch_kind("list", other)),
            };
            let mut entries = writer.start_list(flattened, Some(&list.element_name));
            for item in items {
                match item {
                    Value::Null if list.sparse => continue,
                    Value::Null => return Err(null_in_dense(&list.shape)),
                    item => write_value(plan, &list.element, false, item, entries.entry())?,
                }
            }
            entries.finish();
        }
        RoutineBody::Map(map) => {
            let values = match value {
                Value::Map(values) => values,
                other => return Err(mismatch_kind("map", other)),
            };
            let mut entries = writer.start_map(flattened, &map.key_name, &map.value_name);
            for (key, value) in values {
                match value {
                    Value::Null if map.sparse => continue,
                    Value::Null => return Err(null_in_dense(&map.shape)),
                    value => write_value(plan, &map.value, false, value, entries.entry(key))?,
                }
            }
            entries.finish();
        }
        _ => {
            return Err(SerializationError::custom(format!(
                "{} is not a shape routine",
                slot.shape()
            )))
        }
    }
    Ok(())
}

/// Decodes a request body. The `Action` parameter must name the operation.
pub(super) fn read_payload(
    plan: &CodecPlan,
    payload: &PayloadPlan,
    body: &[u8],
) -> Result<BTreeMap<String, Value>, QueryDecodeError> {
    let reader = QueryReader::parse(body)?;
    if let Framing::QueryRequest { action, .. } = &payload.framing {
        match reader.action() {
            Some(found) if found == action => {}
            found => {
                return Err(QueryDecodeError::custom(format!(
                    "expected action {} but found {}",
                    action,
                    found.unwrap_or("none")
                )))
            }
        }
    }
    let mut out = BTreeMap::new();
    read_members(plan, members(payload), reader.root(), &mut out, 0)?;
    Ok(out)
}

fn read_members(
    plan: &CodecPlan,
    members: &[MemberPlan],
    scope: QueryScope<'_>,
    out: &mut BTreeMap<String, Value>,
    depth: usize,
) -> Result<(), QueryDecodeError> {
    for member in members {
        if let Some(child) = scope.child(&member.wire_name) {
            if let Some(value) = read_value(plan, &member.value, member.flattened, child, depth)? {
                out.insert(member.name.clone(), value);
            }
        }
    }
    Ok(())
}

/// Reads the value at `scope`, or `None` when nothing was written there.
fn read_value(
    plan: &CodecPlan,
    slot: &ValuePlan,
    flattened: bool,
    scope: QueryScope<'_>,
    depth: usize,
) -> Result<Option<Value>, QueryDecodeError> {
    let routine = match slot {
        ValuePlan::Scalar(scalar) => {
            return scope
                .value()
                .map(|text| parse_text(scalar, text).map_err(QueryDecodeError::custom))
                .transpose()
        }
        ValuePlan::Aggregate(aggregate) => {
            body(plan, &aggregate.routine).map_err(QueryDecodeError::custom)?
        }
    };
    if depth > MAX_NESTING_DEPTH {
        return Err(QueryDecodeError::custom(format!(
            "exceeded max nesting depth of {}",
            MAX_NESTING_DEPTH
        )));
    }
    let depth = depth + 1;
    Ok(Some(match routine {
        RoutineBody::Structure(structure) => {
            let mut members = BTreeMap::new();
            read_members(plan, &structure.members, scope, &mut members, depth)?;
            Value::Structure(members)
        }
        RoutineBody::Union(union) => {
            // the earliest variant on the wire wins
            let mut variant = None;
            for (name, child) in scope.children() {
                let member = union
                    .members
                    .iter()
                    .find(|member| member.wire_name.eq_ignore_ascii_case(name));
                if let Some(member) = member {
                    if let Some(value) =
                        read_value(plan, &member.value, member.flattened, child, depth)?
                    {
                        variant = Some(Value::union(member.name.clone(), value));
                        break;
                    }
                }
            }
            match variant {
                Some(variant) => variant,
                None if scope.is_empty() => return Ok(None),
                None => Value::UnknownVariant,
            }
        }
        RoutineBody::List(list) => {
            let mut items = Vec::new();
            for item in scope.list_items(flattened, Some(&list.element_name)) {
                match read_value(plan, &list.element, false, item, depth)? {
                    Some(value) => items.push(value),
                    None if list.sparse => items.push(Value::Null),
                    None => {}
                }
            }
            Value::List(items)
        }
        RoutineBody::Map(map) => {
            let mut values = BTreeMap::new();
            for (key, value) in scope.map_entries(flattened, &map.key_name, &map.value_name)? {
                match read_value(plan, &map.value, false, value, depth)? {
                    Some(value) => {
                        values.insert(key.to_owned(), value);
                    }
                    None if map.sparse => {
                        values.insert(key.to_owned(), Value::Null);
                    }
                    None => {}
                }
            }
            Value::Map(values)
        }
        _ => {
            return Err(QueryDecodeError::custom(format!(
                "{} is not a shape routine",
                slot.shape()
            )))
        }
    }))
}

#[cfg(test)]
mod test {
    use super::{read_payload, write_payload};
    use crate::interpret::Value;
    use crate::ir::{
        AggregatePlan, CodecPlan, Framing, ListPlan, MapPlan, MemberPlan, PayloadBody,
        PayloadPlan, PayloadSide, Routine, RoutineBody, RoutineKey, RoutineKind, ScalarKind,
        ScalarPlan, StructurePlan, ValuePlan, XmlLocation,
    };
    use crate::model::{ShapeId, ShapeKind};
    use crate::protocol::Protocol;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn string() -> ScalarPlan {
        ScalarPlan {
            kind: ScalarKind::String,
            shape: ShapeId::new("smithy.api#String"),
        }
    }

    fn member(name: &str, flattened: bool, value: ValuePlan) -> MemberPlan {
        MemberPlan {
            name: name.to_owned(),
            field: name.to_lowercase(),
            wire_name: name.to_owned(),
            required: false,
            location: XmlLocation::Element,
            flattened,
            namespace: None,
            value,
        }
    }

    fn aggregate(shape: &str, kind: ShapeKind, routine: &str) -> ValuePlan {
        ValuePlan::Aggregate(AggregatePlan {
            shape: ShapeId::new(shape),
            kind,
            routine: routine.to_owned(),
            unwrapped: None,
        })
    }

    fn plan() -> (CodecPlan, PayloadPlan) {
        let mut plan = CodecPlan::empty(Protocol::AwsQuery);
        for routine in [
            Routine {
                name: "ser_aws_query_names".to_owned(),
                key: RoutineKey::Shape(ShapeId::new("ns#Names"), RoutineKind::Encode),
                body: RoutineBody::List(ListPlan {
                    shape: ShapeId::new("ns#Names"),
                    element: ValuePlan::Scalar(string()),
                    element_name: "member".to_owned(),
                    element_namespace: None,
                    sparse: false,
                }),
            },
            Routine {
                name: "ser_aws_query_attributes".to_owned(),
                key: RoutineKey::Shape(ShapeId::new("ns#Attributes"), RoutineKind::Encode),
                body: RoutineBody::Map(MapPlan {
                    shape: ShapeId::new("ns#Attributes"),
                    key: string(),
                    value: ValuePlan::Scalar(string()),
                    key_name: "key".to_owned(),
                    value_name: "value".to_owned(),
                    sparse: true,
                }),
            },
        ] {
            plan.routines.insert(routine.name.clone(), routine);
        }
        let payload = PayloadPlan {
            operation: ShapeId::new("ns#Greet"),
            side: PayloadSide::Input,
            structure: Some(ShapeId::new("ns#GreetInput")),
            framing: Framing::QueryRequest {
                action: "Greet".to_owned(),
                version: "2020-01-08".to_owned(),
            },
            body: PayloadBody::Members(vec![
                member("Name", false, ValuePlan::Scalar(string())),
                member("Names", false, aggregate("ns#Names", ShapeKind::List, "ser_aws_query_names")),
                member("Flat", true, aggregate("ns#Names", ShapeKind::List, "ser_aws_query_names")),
                member(
                    "Attributes",
                    false,
                    aggregate("ns#Attributes", ShapeKind::Map, "ser_aws_query_attributes"),
                ),
            ]),
            headers: Vec::new(),
            response_code: None,
            content_type: "application/x-www-form-urlencoded".to_owned(),
        };
        (plan, payload)
    }

    #[test]
    fn wrapped_and_flattened_lists() {
        let (plan, payload) = plan();
        let input = Value::structure([
            ("Name", Value::string("a&b")),
            ("Names", Value::List(vec![Value::string("x"), Value::string("y")])),
            ("Flat", Value::List(vec![Value::string("z")])),
            (
                "Attributes",
                Value::Map(BTreeMap::from([("k".to_owned(), Value::string("v"))])),
            ),
        ]);
        let body = write_payload(&plan, &payload, &input).unwrap();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "Action=Greet&Version=2020-01-08&Name=a%26b&Names.member.1=x&Names.member.2=y&Flat.1=z&Attributes.entry.1.key=k&Attributes.entry.1.value=v"
        );
        assert_eq!(
            Value::Structure(read_payload(&plan, &payload, &body).unwrap()),
            input
        );
    }

    #[test]
    fn empty_list_is_a_bare_prefix() {
        let (plan, payload) = plan();
        let input = Value::structure([("Names", Value::List(Vec::new()))]);
        let body = write_payload(&plan, &payload, &input).unwrap();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "Action=Greet&Version=2020-01-08&Names="
        );
        assert_eq!(
            Value::Structure(read_payload(&plan, &payload, &body).unwrap()),
            input
        );
    }

    #[test]
    fn sparse_map_entry_without_value_reads_as_null() {
        let (plan, payload) = plan();
        let members = read_payload(
            &plan,
            &payload,
            b"Action=Greet&Version=2020-01-08&Attributes.entry.1.key=k",
        )
        .unwrap();
        assert_eq!(
            members.get("Attributes"),
            Some(&Value::Map(BTreeMap::from([("k".to_owned(), Value::Null)])))
        );
    }

    #[test]
    fn action_must_match() {
        let (plan, payload) = plan();
        let err = read_payload(&plan, &payload, b"Action=Other&Version=2020-01-08").unwrap_err();
        assert!(err.to_string().contains("expected action Greet"), "{}", err);
    }

    /// A `Greet` input with a single aggregate member `member` handled by `routine`.
    fn single_member(plan: &mut CodecPlan, routine: Routine, kind: ShapeKind, member_name: &str) -> PayloadPlan {
        let shape = match &routine.key {
            RoutineKey::Shape(shape, _) => shape.as_str().to_owned(),
            other => panic!("not a shape routine: {:?}", other),
        };
        let value = aggregate(&shape, kind, &routine.name);
        plan.routines.insert(routine.name.clone(), routine);
        PayloadPlan {
            operation: ShapeId::new("ns#Greet"),
            side: PayloadSide::Input,
            structure: Some(ShapeId::new("ns#GreetInput")),
            framing: Framing::QueryRequest {
                action: "Greet".to_owned(),
                version: "2020-01-08".to_owned(),
            },
            body: PayloadBody::Members(vec![member(member_name, false, value)]),
            headers: Vec::new(),
            response_code: None,
            content_type: "application/x-www-form-urlencoded".to_owned(),
        }
    }

    #[test]
    fn union_takes_the_earliest_variant_on_the_wire() {
        let mut plan = CodecPlan::empty(Protocol::AwsQuery);
        let choice = Routine {
            name: "ser_aws_query_choice".to_owned(),
            key: RoutineKey::Shape(ShapeId::new("ns#Choice"), RoutineKind::Encode),
            body: RoutineBody::Union(StructurePlan {
                shape: ShapeId::new("ns#Choice"),
                members: vec![
                    member("a", false, ValuePlan::Scalar(string())),
                    member("b", false, ValuePlan::Scalar(string())),
                ],
            }),
        };
        let payload = single_member(&mut plan, choice, ShapeKind::Union, "Choice");
        let members = read_payload(
            &plan,
            &payload,
            b"Action=Greet&Version=2020-01-08&Choice.b=second&Choice.a=first",
        )
        .unwrap();
        assert_eq!(members.get("Choice"), Some(&Value::union("b", Value::string("second"))));

        let members = read_payload(
            &plan,
            &payload,
            b"Action=Greet&Version=2020-01-08&Choice.other=x&Choice.a=first",
        )
        .unwrap();
        assert_eq!(members.get("Choice"), Some(&Value::union("a", Value::string("first"))));
    }

    #[test]
    fn recursion_past_the_nesting_limit_is_an_error() {
        let mut plan = CodecPlan::empty(Protocol::AwsQuery);
        let node = Routine {
            name: "ser_aws_query_node".to_owned(),
            key: RoutineKey::Shape(ShapeId::new("ns#Node"), RoutineKind::Encode),
            body: RoutineBody::Structure(StructurePlan {
                shape: ShapeId::new("ns#Node"),
                members: vec![
                    member("Name", false, ValuePlan::Scalar(string())),
                    member("Next", false, aggregate("ns#Node", ShapeKind::Structure, "ser_aws_query_node")),
                ],
            }),
        };
        let payload = single_member(&mut plan, node, ShapeKind::Structure, "Root");
        let nested = |levels: usize| {
            format!(
                "Action=Greet&Version=2020-01-08&Root{}.Name=leaf",
                ".Next".repeat(levels)
            )
        };

        let members = read_payload(&plan, &payload, nested(3).as_bytes()).unwrap();
        let leaf = Value::structure([("Name", Value::string("leaf"))]);
        let expected = (0..3).fold(leaf, |inner, _| Value::structure([("Next", inner)]));
        assert_eq!(members.get("Root"), Some(&expected));

        let err = read_payload(&plan, &payload, nested(500).as_bytes()).unwrap_err();
        assert!(err.to_string().contains("max nesting depth"), "{}", err);
    }
}
