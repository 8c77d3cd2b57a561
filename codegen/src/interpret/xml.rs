/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! XML bodies for `restXml`, and `awsQuery` responses and errors.
//!
//! Sparse collections have no null form in XML: null elements are not written and absent
//! values are never read back as nulls, except for a map entry without a value element.

use super::{
    body, members_of, mismatch_kind, null_in_dense, parse_text, present, scalar_text, Value,
};
use crate::ir::{
    CodecPlan, ErrorBodyPlan, ErrorFraming, Framing, ListPlan, MapPlan, MemberPlan, PayloadBody,
    PayloadPlan, RoutineBody, ScalarKind, StructurePlan, ValuePlan, XmlLocation,
};
use crate::model::{ShapeKind, XmlNamespace};
use shapecodec_types::error::operation::SerializationError;
use shapecodec_xml::decode::{try_data, Document, ScopedDecoder, XmlDecodeError};
use shapecodec_xml::encode::{ElWriter, ListWriter, MapWriter, Namespace, ScopeWriter, XmlWriter};
use shapecodec_xml::errors::{error_scope, ErrorWrapping};
use std::collections::BTreeMap;

fn namespace(namespace: Option<&XmlNamespace>) -> Option<Namespace<'_>> {
    namespace.map(|ns| Namespace {
        uri: &ns.uri,
        prefix: ns.prefix.as_deref(),
    })
}

fn shape_routine<'p>(
    plan: &'p CodecPlan,
    slot: &ValuePlan,
) -> Result<Option<&'p RoutineBody>, String> {
    match slot {
        ValuePlan::Scalar(_) => Ok(None),
        ValuePlan::Aggregate(aggregate) => body(plan, &aggregate.routine).map(Some),
    }
}

fn is_collection(slot: &ValuePlan) -> bool {
    matches!(
        slot,
        ValuePlan::Aggregate(aggregate)
            if matches!(aggregate.kind, ShapeKind::List | ShapeKind::Set | ShapeKind::Map)
    )
}

pub(super) fn write_payload(
    plan: &CodecPlan,
    payload: &PayloadPlan,
    input: &Value,
) -> Result<Vec<u8>, SerializationError> {
    let structure = match &payload.structure {
        Some(structure) => structure,
        None => return Ok(Vec::new()),
    };
    let values = members_of(structure.name(), input)?;
    let mut out = String::new();
    match (&payload.body, &payload.framing) {
        (PayloadBody::Members(members), Framing::QueryResponse { response, result }) => {
            let mut writer = XmlWriter::new(&mut out);
            let mut response = writer.start_el(response).finish();
            write_structure(plan, structure.name(), members, values, response.start_el(result))?;
            response.finish();
        }
        (PayloadBody::Members(members), _) if members.is_empty() => return Ok(Vec::new()),
        (PayloadBody::Members(members), framing) => {
            let (root, ns) = root_of(framing, structure.name());
            let mut writer = XmlWriter::new(&mut out);
            let root = writer.start_el(root).namespace(namespace(ns));
            write_structure(plan, structure.name(), members, values, root)?;
        }
        (PayloadBody::Member(member), framing) => {
            let value = match present(structure.name(), member, values)? {
                Some(value) => value,
                None => return Ok(Vec::new()),
            };
            let (root, ns) = root_of(framing, member.value.shape().name());
            let mut writer = XmlWriter::new(&mut out);
            let root = writer.start_el(root).namespace(namespace(ns));
            match shape_routine(plan, &member.value).map_err(SerializationError::custom)? {
                Some(RoutineBody::Structure(target)) => write_structure(
                    plan,
                    target.shape.name(),
                    &target.members,
                    members_of(target.shape.name(), value)?,
                    root,
                )?,
                Some(RoutineBody::Union(union)) => write_union(plan, union, value, root)?,
                _ => {
                    return Err(SerializationError::custom(format!(
                        "{} can't be an XML payload",
                        member.value.shape()
                    )))
                }
            }
        }
    }
    Ok(out.into_bytes())
}

fn root_of<'p>(framing: &'p Framing, fallback: &'p str) -> (&'p str, Option<&'p XmlNamespace>) {
    match framing {
        Framing::XmlRoot { name, namespace } => (name.as_str(), namespace.as_ref()),
        _ => (fallback, None),
    }
}

/// Writes attributes onto `el`, then every element member inside it.
fn write_structure(
    plan: &CodecPlan,
    owner: &str,
    members: &[MemberPlan],
    values: &BTreeMap<String, Value>,
    mut el: ElWriter<'_, '_>,
) -> Result<(), SerializationError> {
    for member in members
        .iter()
        .filter(|member| member.location == XmlLocation::Attribute)
    {
        if let (Some(value), ValuePlan::Scalar(scalar)) =
            (present(owner, member, values)?, &member.value)
        {
            el.write_attribute(&member.wire_name, &scalar_text(scalar, value)?);
        }
    }
    let mut scope = el.finish();
    for member in members
        .iter()
        .filter(|member| member.location == XmlLocation::Element)
    {
        if let Some(value) = present(owner, member, values)? {
            write_member(plan, member, value, &mut scope)?;
        }
    }
    scope.finish();
    Ok(())
}

fn write_member(
    plan: &CodecPlan,
    member: &MemberPlan,
    value: &Value,
    scope: &mut ScopeWriter<'_, '_>,
) -> Result<(), SerializationError> {
    let ns = namespace(member.namespace.as_ref());
    match shape_routine(plan, &member.value).map_err(SerializationError::custom)? {
        Some(RoutineBody::List(list)) => {
            let mut writer = scope.start_list(&member.wire_name, member.flattened, ns);
            write_list(plan, list, value, &mut writer)?;
            writer.finish();
        }
        Some(RoutineBody::Map(map)) => {
            let mut writer = scope.start_map(&member.wire_name, member.flattened, ns);
            write_map(plan, map, value, &mut writer)?;
            writer.finish();
        }
        _ => {
            let el = scope.start_el(&member.wire_name).namespace(ns);
            write_content(plan, &member.value, value, el)?;
        }
    }
    Ok(())
}

/// Writes `value` as the content of the element `el` opens.
fn write_content(
    plan: &CodecPlan,
    slot: &ValuePlan,
    value: &Value,
    el: ElWriter<'_, '_>,
) -> Result<(), SerializationError> {
    let routine = match slot {
        ValuePlan::Scalar(scalar) => {
            let text = scalar_text(scalar, value)?;
            let mut scope = el.finish();
            scope.data(&text);
            scope.finish();
            return Ok(());
        }
        ValuePlan::Aggregate(aggregate) => {
            body(plan, &aggregate.routine).map_err(SerializationError::custom)?
        }
    };
    match routine {
        RoutineBody::Structure(structure) => write_structure(
            plan,
            structure.shape.name(),
            &structure.members,
            members_of(structure.shape.name(), value)?,
            el,
        ),
        RoutineBody::Union(union) => write_union(plan, union, value, el),
        RoutineBody::List(list) => {
            let mut scope = el.finish();
            let mut writer = scope.nested_list();
            write_list(plan, list, value, &mut writer)?;
            writer.finish();
            scope.finish();
            Ok(())
        }
        RoutineBody::Map(map) => {
            let mut scope = el.finish();
            let mut writer = scope.nested_map();
            write_map(plan, map, value, &mut writer)?;
            writer.finish();
            scope.finish();
            Ok(())
        }
        _ => Err(SerializationError::custom(format!(
            "{} is not a shape routine",
            slot.shape()
        ))),
    }
}

fn write_union(
    plan: &CodecPlan,
    union: &StructurePlan,
    value: &Value,
    el: ElWriter<'_, '_>,
) -> Result<(), SerializationError> {
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
        .ok_or_else(|| SerializationError::unknown_variant(union.shape.name().to_owned()))?;
    let mut scope = el.finish();
    write_member(plan, member, inner, &mut scope)?;
    scope.finish();
    Ok(())
}

fn write_list(
    plan: &CodecPlan,
    list: &ListPlan,
    value: &Value,
    writer: &mut ListWriter<'_>,
) -> Result<(), SerializationError> {
    let items = match value {
        Value::List(items) => items,
        other => return Err(mismatch_kind("list", other)),
    };
    for item in items {
        match item {
            Value::Null if list.sparse => continue,
            Value::Null => return Err(null_in_dense(&list.shape)),
            _ => {}
        }
        let el = writer
            .element(&list.element_name)
            .namespace(namespace(list.element_namespace.as_ref()));
        write_content(plan, &list.element, item, el)?;
    }
    Ok(())
}

fn write_map(
    plan: &CodecPlan,
    map: &MapPlan,
    value: &Value,
    writer: &mut MapWriter<'_>,
) -> Result<(), SerializationError> {
    let entries = match value {
        Value::Map(entries) => entries,
        other => return Err(mismatch_kind("map", other)),
    };
    for (key, value) in entries {
        match value {
            Value::Null if map.sparse => continue,
            Value::Null => return Err(null_in_dense(&map.shape)),
            _ => {}
        }
        let mut entry = writer.entry();
        let mut key_scope = entry.start_el(&map.key_name).finish();
        key_scope.data(key);
        key_scope.finish();
        write_content(plan, &map.value, value, entry.start_el(&map.value_name))?;
        entry.finish();
    }
    Ok(())
}

fn expect_root(decoder: &ScopedDecoder<'_, '_>, root: &str) -> Result<(), XmlDecodeError> {
    if decoder.start_el().matches(root) {
        Ok(())
    } else {
        Err(XmlDecodeError::custom(format!(
            "invalid root, expected {} but found {}",
            root,
            decoder.start_el().local()
        )))
    }
}

/// Decodes an XML document body. An empty body has no members.
pub(super) fn read_payload(
    plan: &CodecPlan,
    payload: &PayloadPlan,
    body: &[u8],
) -> Result<BTreeMap<String, Value>, XmlDecodeError> {
    let mut out = BTreeMap::new();
    if body.is_empty() {
        return Ok(out);
    }
    match &payload.body {
        PayloadBody::Members(members) if members.is_empty() => {}
        PayloadBody::Members(members) => {
            Document::try_from(body)?.decode_with(|doc| {
                let mut decoder = doc.root_element()?;
                match &payload.framing {
                    Framing::QueryResponse { response, result } => {
                        expect_root(&decoder, response)?;
                        if let Some(mut result_tag) = decoder.next_tag() {
                            expect_root(&result_tag, result)?;
                            read_members(plan, members, &mut result_tag, &mut out)?;
                        }
                        Ok(())
                    }
                    Framing::XmlRoot { name, .. } => {
                        expect_root(&decoder, name)?;
                        read_members(plan, members, &mut decoder, &mut out)
                    }
                    _ => read_members(plan, members, &mut decoder, &mut out),
                }
            })?;
        }
        PayloadBody::Member(member) => {
            let value = Document::try_from(body)?.decode_with(|doc| {
                let mut decoder = doc.root_element()?;
                if let Framing::XmlRoot { name, .. } = &payload.framing {
                    expect_root(&decoder, name)?;
                }
                read_value(plan, &member.value, &mut decoder)
            })?;
            out.insert(member.name.clone(), value);
        }
    }
    Ok(out)
}

/// Decodes the members of a modeled error from its `<Error>` element.
pub(super) fn read_error(
    plan: &CodecPlan,
    error: &ErrorBodyPlan,
    body: &[u8],
) -> Result<BTreeMap<String, Value>, XmlDecodeError> {
    let mut out = BTreeMap::new();
    if error.members.is_empty() || body.is_empty() {
        return Ok(out);
    }
    let wrapping = match error.framing {
        ErrorFraming::Xml(wrapping) => wrapping,
        ErrorFraming::Json => ErrorWrapping::Wrapped,
    };
    Document::try_from(body)?.decode_with(|doc| {
        let mut decoder = error_scope(doc, wrapping)?;
        read_members(plan, &error.members, &mut decoder, &mut out)
    })?;
    Ok(out)
}

/// Reads attributes, then child elements. Unknown elements are skipped and elements of a
/// flattened collection accumulate onto the member.
fn read_members(
    plan: &CodecPlan,
    members: &[MemberPlan],
    decoder: &mut ScopedDecoder<'_, '_>,
    out: &mut BTreeMap<String, Value>,
) -> Result<(), XmlDecodeError> {
    for member in members
        .iter()
        .filter(|member| member.location == XmlLocation::Attribute)
    {
        if let ValuePlan::Scalar(scalar) = &member.value {
            if let Some(text) = decoder.start_el().attr(&member.wire_name) {
                let value = parse_text(scalar, text).map_err(XmlDecodeError::custom)?;
                out.insert(member.name.clone(), value);
            }
        }
    }
    while let Some(mut tag) = decoder.next_tag() {
        let member = members.iter().find(|member| {
            member.location == XmlLocation::Element && tag.start_el().matches(&member.wire_name)
        });
        let member = match member {
            Some(member) => member,
            None => continue,
        };
        if member.flattened && is_collection(&member.value) {
            read_flattened(plan, member, &mut tag, out)?;
        } else {
            let value = read_value(plan, &member.value, &mut tag)?;
            out.insert(member.name.clone(), value);
        }
    }
    Ok(())
}

/// Reads one element of a flattened list, or one entry of a flattened map, into `out`.
fn read_flattened(
    plan: &CodecPlan,
    member: &MemberPlan,
    tag: &mut ScopedDecoder<'_, '_>,
    out: &mut BTreeMap<String, Value>,
) -> Result<(), XmlDecodeError> {
    match shape_routine(plan, &member.value).map_err(XmlDecodeError::custom)? {
        Some(RoutineBody::List(list)) => {
            let item = read_value(plan, &list.element, tag)?;
            if let Value::List(items) = out
                .entry(member.name.clone())
                .or_insert_with(|| Value::List(Vec::new()))
            {
                items.push(item);
            }
        }
        Some(RoutineBody::Map(map)) => {
            if let Some((key, value)) = read_entry(plan, map, tag)? {
                if let Value::Map(entries) = out
                    .entry(member.name.clone())
                    .or_insert_with(|| Value::Map(BTreeMap::new()))
                {
                    entries.insert(key, value);
                }
            }
        }
        _ => {
            let value = read_value(plan, &member.value, tag)?;
            out.insert(member.name.clone(), value);
        }
    }
    Ok(())
}

fn read_value(
    plan: &CodecPlan,
    slot: &ValuePlan,
    decoder: &mut ScopedDecoder<'_, '_>,
) -> Result<Value, XmlDecodeError> {
    let routine = match slot {
        ValuePlan::Scalar(scalar) => {
            let text = try_data(decoder)?;
            return match scalar.kind {
                ScalarKind::String | ScalarKind::Enum => Ok(Value::String(text.into_owned())),
                _ => parse_text(scalar, text.as_ref()).map_err(XmlDecodeError::custom),
            };
        }
        ValuePlan::Aggregate(aggregate) => {
            body(plan, &aggregate.routine).map_err(XmlDecodeError::custom)?
        }
    };
    decoder.check_depth()?;
    match routine {
        RoutineBody::Structure(structure) => {
            let mut members = BTreeMap::new();
            read_members(plan, &structure.members, decoder, &mut members)?;
            Ok(Value::Structure(members))
        }
        RoutineBody::Union(union) => read_union(plan, union, decoder),
        RoutineBody::List(list) => {
            let mut items = Vec::new();
            while let Some(mut tag) = decoder.next_tag() {
                if tag.start_el().matches(&list.element_name) {
                    items.push(read_value(plan, &list.element, &mut tag)?);
                }
            }
            Ok(Value::List(items))
        }
        RoutineBody::Map(map) => {
            let mut entries = BTreeMap::new();
            while let Some(mut entry) = decoder.next_tag() {
                if !entry.start_el().matches("entry") {
                    continue;
                }
                if let Some((key, value)) = read_entry(plan, map, &mut entry)? {
                    entries.insert(key, value);
                }
            }
            Ok(Value::Map(entries))
        }
        _ => Err(XmlDecodeError::custom(format!(
            "{} is not a shape routine",
            slot.shape()
        ))),
    }
}

/// Reads one `<key>`/`<value>` pair. A missing value drops the entry unless the map is sparse.
fn read_entry(
    plan: &CodecPlan,
    map: &MapPlan,
    entry: &mut ScopedDecoder<'_, '_>,
) -> Result<Option<(String, Value)>, XmlDecodeError> {
    let mut key = None;
    let mut value = None;
    while let Some(mut tag) = entry.next_tag() {
        if tag.start_el().matches(&map.key_name) {
            key = Some(try_data(&mut tag)?.into_owned());
        } else if tag.start_el().matches(&map.value_name) {
            value = Some(read_value(plan, &map.value, &mut tag)?);
        }
    }
    let key = key.ok_or_else(|| XmlDecodeError::custom("map entry is missing its key"))?;
    Ok(match value {
        Some(value) => Some((key, value)),
        None if map.sparse => Some((key, Value::Null)),
        None => None,
    })
}

/// The first variant wins; later elements of a flattened variant extend it. Any other element
/// after the first variant is skipped without being decoded.
fn read_union(
    plan: &CodecPlan,
    union: &StructurePlan,
    decoder: &mut ScopedDecoder<'_, '_>,
) -> Result<Value, XmlDecodeError> {
    let mut base: Option<Value> = None;
    while let Some(mut tag) = decoder.next_tag() {
        let member = union
            .members
            .iter()
            .find(|member| tag.start_el().matches(&member.wire_name));
        let member = match member {
            Some(member) => member,
            None => {
                if base.is_none() {
                    base = Some(Value::UnknownVariant);
                }
                continue;
            }
        };
        if member.flattened && is_collection(&member.value) {
            let mut slot = BTreeMap::new();
            match base.take() {
                None => {}
                Some(Value::Union(name, existing)) if name == member.name => {
                    slot.insert(name, *existing);
                }
                other => {
                    base = other;
                    continue;
                }
            }
            read_flattened(plan, member, &mut tag, &mut slot)?;
            if let Some(value) = slot.remove(&member.name) {
                base = Some(Value::Union(member.name.clone(), Box::new(value)));
            }
        } else if base.is_none() {
            let value = read_value(plan, &member.value, &mut tag)?;
            base = Some(Value::Union(member.name.clone(), Box::new(value)));
        }
    }
    base.ok_or_else(|| XmlDecodeError::custom("expected a union variant, found none"))
}
