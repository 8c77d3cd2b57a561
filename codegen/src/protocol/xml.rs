/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! `restXml` routines, also used for `awsQuery` responses and errors.
//!
//! Structure and union encoders receive the [`ElWriter`] for their own element so they can add
//! attributes before opening the scope. List and map encoders receive a `ListWriter` or
//! `MapWriter` started by the caller, since only the caller knows whether the member is
//! flattened. Decoders receive a `ScopedDecoder` positioned on the shape's element; flattened
//! collections are decoded one element at a time by the `_unwrapped` routines and accumulated on
//! the builder.
//!
//! [`ElWriter`]: shapecodec_xml::encode::ElWriter

use crate::ir::{
    CodecPlan, Direction, ErrorBodyPlan, ErrorFraming, Framing, ListPlan, MapPlan, MemberPlan,
    PayloadBody, PayloadPlan, Routine, RoutineBody, RoutineKey, RoutineKind, ScalarKind,
    ScalarPlan, StructurePlan, ValuePlan, XmlLocation,
};
use crate::model::{ShapeId, ShapeKind, XmlNamespace};
use crate::naming;
use crate::protocol::{
    error_dispatch, expected, format_path, http_binding, literal, rust_type, scalar_type,
    validator, Bindings, RenderRoutine, ScalarStrategy,
};
use crate::writer::RustWriter;
use shapecodec_xml::errors::ErrorWrapping;

const DE_ERROR: &str = "::shapecodec_xml::decode::XmlDecodeError";
const SER_ERROR: &str = "::shapecodec_types::error::operation::SerializationError";
const TRY_DATA: &str = "::shapecodec_xml::decode::try_data";
const SCOPED_DECODER: &str = "::shapecodec_xml::decode::ScopedDecoder<'_, '_>";

/// `.write_ns(..)` for a namespace, or nothing.
fn write_ns(namespace: Option<&XmlNamespace>) -> String {
    match namespace {
        Some(ns) => format!(
            ".write_ns({}, {})",
            literal(&ns.uri),
            match &ns.prefix {
                Some(prefix) => format!("Some({})", literal(prefix)),
                None => "None".to_owned(),
            }
        ),
        None => String::new(),
    }
}

/// An `Option<Namespace>` expression.
fn namespace_expr(namespace: Option<&XmlNamespace>) -> String {
    match namespace {
        Some(ns) => format!(
            "Some(::shapecodec_xml::encode::Namespace {{ uri: {}, prefix: {} }})",
            literal(&ns.uri),
            match &ns.prefix {
                Some(prefix) => format!("Some({})", literal(prefix)),
                None => "None".to_owned(),
            }
        ),
        None => "None".to_owned(),
    }
}

fn wrapping_path(wrapping: ErrorWrapping) -> &'static str {
    match wrapping {
        ErrorWrapping::Wrapped => "::shapecodec_xml::errors::ErrorWrapping::Wrapped",
        ErrorWrapping::Unwrapped => "::shapecodec_xml::errors::ErrorWrapping::Unwrapped",
    }
}

pub(crate) struct XmlRenderer<'a> {
    plan: &'a CodecPlan,
    vars: Bindings,
}

impl ScalarStrategy for XmlRenderer<'_> {
    fn encode_scalar(
        &self,
        w: &mut RustWriter,
        scalar: &ScalarPlan,
        source: &str,
        destination: &str,
    ) {
        match self.text(scalar, source) {
            Some(text) => w.line(format!("{}.data({});", destination, text)),
            None => w.line(format!(
                "return Err({}::custom(\"document values have no XML encoding\"));",
                SER_ERROR
            )),
        };
    }

    fn decode_scalar(&self, scalar: &ScalarPlan, source: &str) -> String {
        match scalar.kind {
            ScalarKind::String => format!("{}({})?.into_owned()", TRY_DATA, source),
            _ => self.from_text(scalar, &format!("{}({})?.as_ref()", TRY_DATA, source)),
        }
    }
}

impl<'a> XmlRenderer<'a> {
    pub(crate) fn new(plan: &'a CodecPlan) -> Self {
        XmlRenderer {
            plan,
            vars: Bindings::default(),
        }
    }

    /// A `&str` expression with the text form of the scalar bound to `source`.
    fn text(&self, scalar: &ScalarPlan, source: &str) -> Option<String> {
        Some(match scalar.kind {
            ScalarKind::Boolean
            | ScalarKind::Byte
            | ScalarKind::Short
            | ScalarKind::Integer
            | ScalarKind::Long
            | ScalarKind::Float
            | ScalarKind::Double => format!(
                "::shapecodec_types::primitive::Encoder::from(*{}).encode()",
                source
            ),
            ScalarKind::String | ScalarKind::Enum => format!("{}.as_str()", source),
            ScalarKind::Blob => format!("&::shapecodec_types::base64::encode({})", source),
            ScalarKind::Timestamp(format) => format!("&{}.fmt({})?", source, format_path(format)),
            ScalarKind::Document => return None,
        })
    }

    /// An expression parsing the scalar from the `&str` expression `text`.
    fn from_text(&self, scalar: &ScalarPlan, text: &str) -> String {
        let invalid = format!("{}::custom({})", DE_ERROR, literal(&expected(scalar)));
        match scalar.kind {
            ScalarKind::String => format!("{}.to_owned()", text),
            ScalarKind::Enum => format!("{}::from({})", scalar_type(self.plan, scalar), text),
            ScalarKind::Timestamp(format) => format!(
                "::shapecodec_types::DateTime::from_str({}, {}).map_err(|_| {})?",
                text,
                format_path(format),
                invalid
            ),
            ScalarKind::Blob => format!(
                "::shapecodec_types::Blob::new(::shapecodec_types::base64::decode({}).map_err(|_| {})?)",
                text, invalid
            ),
            ScalarKind::Document => format!(
                "return Err({}::custom(\"document values have no XML encoding\"))",
                DE_ERROR
            ),
            _ => format!(
                "<{} as ::shapecodec_types::primitive::Parse>::parse_smithy_primitive({}).map_err(|_| {})?",
                scalar_type(self.plan, scalar),
                text,
                invalid
            ),
        }
    }

    /// An expression decoding the value from the `&mut ScopedDecoder` expression `source`.
    fn decode_value(&self, value: &ValuePlan, source: &str) -> String {
        match value {
            ValuePlan::Scalar(scalar) => self.decode_scalar(scalar, source),
            ValuePlan::Aggregate(aggregate) => format!("{}({})?", aggregate.routine, source),
        }
    }

    /// The list or map plan an aggregate encoder was planned from.
    fn collection_plan(&self, shape: &ShapeId) -> Option<&'a RoutineBody> {
        let kind = RoutineKind::Encode;
        self.plan
            .routine(&RoutineKey::Shape(shape.clone(), kind))
            .map(|routine| &routine.body)
    }

    /// Writes the value bound to `source` as the child element `name` of the scope `scope`.
    #[allow(clippy::too_many_arguments)]
    fn encode_element(
        &self,
        w: &mut RustWriter,
        value: &ValuePlan,
        source: &str,
        scope: &str,
        name: &str,
        flattened: bool,
        namespace: Option<&XmlNamespace>,
    ) {
        match value {
            ValuePlan::Scalar(scalar) => {
                let inner = self.vars.fresh("inner_writer");
                w.line(format!(
                    "let mut {} = {}.start_el({}){}.finish();",
                    inner,
                    scope,
                    literal(name),
                    write_ns(namespace)
                ));
                self.encode_scalar(w, scalar, source, &inner);
                w.line(format!("{}.finish();", inner));
            }
            ValuePlan::Aggregate(aggregate) => match aggregate.kind {
                ShapeKind::List | ShapeKind::Set => {
                    let list = self.vars.fresh("list_writer");
                    w.line(format!(
                        "let mut {} = {}.start_list({}, {}, {});",
                        list,
                        scope,
                        literal(name),
                        flattened,
                        namespace_expr(namespace)
                    ));
                    w.line(format!("{}({}, &mut {})?;", aggregate.routine, source, list));
                    w.line(format!("{}.finish();", list));
                }
                ShapeKind::Map => {
                    let map = self.vars.fresh("map_writer");
                    w.line(format!(
                        "let mut {} = {}.start_map({}, {}, {});",
                        map,
                        scope,
                        literal(name),
                        flattened,
                        namespace_expr(namespace)
                    ));
                    w.line(format!("{}({}, &mut {})?;", aggregate.routine, source, map));
                    w.line(format!("{}.finish();", map));
                }
                _ => {
                    w.line(format!(
                        "{}({}, {}.start_el({}){})?;",
                        aggregate.routine,
                        source,
                        scope,
                        literal(name),
                        write_ns(namespace)
                    ));
                }
            },
        }
    }

    /// Binds `member` of `input` and runs `body` on the binding, failing when a required member
    /// is unset.
    fn with_member(
        &self,
        w: &mut RustWriter,
        owner: &str,
        member: &MemberPlan,
        input: &str,
        body: impl FnOnce(&mut RustWriter, &str),
    ) {
        let var = self.vars.fresh("var");
        if member.required {
            w.block(format!("match &{}.{} {{", input, member.field), "}", |w| {
                w.block(format!("Some({}) => {{", var), "}", |w| body(w, &var));
                w.line(format!(
                    "None => return Err({}::missing_required_member({}, {})),",
                    SER_ERROR,
                    literal(owner),
                    literal(&member.name)
                ));
            });
        } else {
            w.block(
                format!("if let Some({}) = &{}.{} {{", var, input, member.field),
                "}",
                |w| body(w, &var),
            );
        }
    }

    /// Attributes on `writer`, then the element members inside its scope.
    fn encode_members(
        &self,
        w: &mut RustWriter,
        owner: &str,
        members: &[MemberPlan],
        input: &str,
        writer: &str,
    ) {
        for member in members
            .iter()
            .filter(|m| m.location == XmlLocation::Attribute)
        {
            if let ValuePlan::Scalar(scalar) = &member.value {
                self.with_member(w, owner, member, input, |w, var| {
                    match self.text(scalar, var) {
                        Some(text) => w.line(format!(
                            "{}.write_attribute({}, {});",
                            writer,
                            literal(&member.wire_name),
                            text
                        )),
                        None => w.line(format!(
                            "return Err({}::custom(\"document values have no XML encoding\"));",
                            SER_ERROR
                        )),
                    };
                });
            }
        }
        w.line("#[allow(unused_mut)]");
        w.line(format!("let mut scope = {}.finish();", writer));
        for member in members.iter().filter(|m| m.location == XmlLocation::Element) {
            self.with_member(w, owner, member, input, |w, var| {
                self.encode_element(
                    w,
                    &member.value,
                    var,
                    "scope",
                    &member.wire_name,
                    member.flattened,
                    member.namespace.as_ref(),
                )
            });
        }
        w.line("scope.finish();");
    }

    fn has_attributes(members: &[MemberPlan]) -> bool {
        members
            .iter()
            .any(|member| member.location == XmlLocation::Attribute)
    }

    /// Reads attributes from `decoder`, then every child element, into `builder`.
    fn decode_members(&self, w: &mut RustWriter, members: &[MemberPlan], decoder: &str) {
        for member in members
            .iter()
            .filter(|m| m.location == XmlLocation::Attribute)
        {
            if let ValuePlan::Scalar(scalar) = &member.value {
                w.block(
                    format!(
                        "if let Some(attrib) = {}.start_el().attr({}) {{",
                        decoder,
                        literal(&member.wire_name)
                    ),
                    "}",
                    |w| {
                        let var = self.vars.fresh("var");
                        w.line(format!("let {} = Some({});", var, self.from_text(scalar, "attrib")));
                        w.line(format!(
                            "builder = builder.{}({});",
                            naming::setter(&member.field),
                            var
                        ));
                    },
                );
            }
        }
        let elements: Vec<_> = members
            .iter()
            .filter(|m| m.location == XmlLocation::Element)
            .collect();
        if elements.is_empty() {
            return;
        }
        w.block(
            format!("while let Some(mut tag) = {}.next_tag() {{", decoder),
            "}",
            |w| {
                w.block("match tag.start_el() {", "}", |w| {
                    for member in elements {
                        w.block(
                            format!("s if s.matches({}) => {{", literal(&member.wire_name)),
                            "}",
                            |w| self.decode_member(w, member),
                        );
                    }
                    w.line("_ => {}");
                });
            },
        );
    }

    fn decode_member(&self, w: &mut RustWriter, member: &MemberPlan) {
        let var = self.vars.fresh("var");
        let unwrapped = match &member.value {
            ValuePlan::Aggregate(aggregate) if member.flattened => aggregate
                .unwrapped
                .as_ref()
                .map(|routine| (aggregate.kind, routine)),
            _ => None,
        };
        match unwrapped {
            Some((ShapeKind::Map, routine)) => {
                w.block(format!("let {} = Some({{", var), "});", |w| {
                    let map = self.vars.fresh("map");
                    w.line(format!(
                        "let mut {} = builder.{}.take().unwrap_or_default();",
                        map, member.field
                    ));
                    w.block(
                        format!("if let Some((key, value)) = {}(&mut tag)? {{", routine),
                        "}",
                        |w| {
                            w.line(format!("{}.insert(key, value);", map));
                        },
                    );
                    w.line(map);
                });
            }
            Some((_, routine)) => {
                w.block(format!("let {} = Some({{", var), "});", |w| {
                    let list = self.vars.fresh("list");
                    w.line(format!(
                        "let mut {} = builder.{}.take().unwrap_or_default();",
                        list, member.field
                    ));
                    w.line(format!("{}.push({}(&mut tag)?);", list, routine));
                    w.line(list);
                });
            }
            None => {
                w.line(format!(
                    "let {} = Some({});",
                    var,
                    self.decode_value(&member.value, "&mut tag")
                ));
            }
        }
        w.line(format!(
            "builder = builder.{}({});",
            naming::setter(&member.field),
            var
        ));
    }

    fn ser_structure(&self, w: &mut RustWriter, name: &str, structure: &StructurePlan) {
        let writer = if Self::has_attributes(&structure.members) {
            "mut writer"
        } else {
            "writer"
        };
        w.block(
            format!(
                "pub fn {}(input: &{}, {}: ::shapecodec_xml::encode::ElWriter<'_, '_>) -> ::std::result::Result<(), {}> {{",
                name,
                self.plan.type_path(&structure.shape),
                writer,
                SER_ERROR
            ),
            "}",
            |w| {
                self.encode_members(w, structure.shape.name(), &structure.members, "input", "writer");
                w.line("Ok(())");
            },
        );
    }

    fn de_structure(&self, w: &mut RustWriter, name: &str, structure: &StructurePlan) {
        w.block(
            format!(
                "pub fn {}(decoder: &mut {}) -> ::std::result::Result<{}, {}> {{",
                name,
                SCOPED_DECODER,
                self.plan.type_path(&structure.shape),
                DE_ERROR
            ),
            "}",
            |w| {
                w.line("decoder.check_depth()?;");
                w.line("#[allow(unused_mut)]");
                w.line(format!(
                    "let mut builder = {}::default();",
                    self.plan.builder_path(&structure.shape)
                ));
                self.decode_members(w, &structure.members, "decoder");
                w.line("Ok(builder.build())");
            },
        );
    }

    fn ser_union(&self, w: &mut RustWriter, name: &str, union: &StructurePlan) {
        let ty = self.plan.type_path(&union.shape);
        w.block(
            format!(
                "pub fn {}(input: &{}, writer: ::shapecodec_xml::encode::ElWriter<'_, '_>) -> ::std::result::Result<(), {}> {{",
                name, ty, SER_ERROR
            ),
            "}",
            |w| {
                w.line("let mut scope_writer = writer.finish();");
                w.block("match input {", "}", |w| {
                    for member in &union.members {
                        let inner = self.vars.fresh("inner");
                        w.block(
                            format!("{}::{}({}) => {{", ty, naming::to_pascal_case(&member.name), inner),
                            "}",
                            |w| {
                                self.encode_element(
                                    w,
                                    &member.value,
                                    &inner,
                                    "scope_writer",
                                    &member.wire_name,
                                    member.flattened,
                                    member.namespace.as_ref(),
                                )
                            },
                        );
                    }
                    w.line(format!(
                        "{}::Unknown => return Err({}::unknown_variant({})),",
                        ty,
                        SER_ERROR,
                        literal(union.shape.name())
                    ));
                });
                w.line("scope_writer.finish();");
                w.line("Ok(())");
            },
        );
    }

    fn de_union(&self, w: &mut RustWriter, name: &str, union: &StructurePlan) {
        let ty = self.plan.type_path(&union.shape);
        w.block(
            format!(
                "pub fn {}(decoder: &mut {}) -> ::std::result::Result<{}, {}> {{",
                name, SCOPED_DECODER, ty, DE_ERROR
            ),
            "}",
            |w| {
                w.line("decoder.check_depth()?;");
                w.line(format!("let mut base: Option<{}> = None;", ty));
                w.block("while let Some(mut tag) = decoder.next_tag() {", "}", |w| {
                    w.block("match tag.start_el() {", "}", |w| {
                        for member in &union.members {
                            let variant = format!("{}::{}", ty, naming::to_pascal_case(&member.name));
                            w.block(
                                format!("s if s.matches({}) => {{", literal(&member.wire_name)),
                                "}",
                                |w| self.decode_variant(w, member, &variant),
                            );
                        }
                        w.block("_ => {", "}", |w| {
                            w.block("if base.is_none() {", "}", |w| {
                                w.line(format!("base = Some({}::Unknown);", ty));
                            });
                        });
                    });
                });
                w.line(format!(
                    "base.ok_or_else(|| {}::custom(\"expected a union variant, found none\"))",
                    DE_ERROR
                ));
            },
        );
    }

    /// The first variant wins; later elements of a flattened variant extend it. Elements of any
    /// other variant after that are dropped undecoded.
    fn decode_variant(&self, w: &mut RustWriter, member: &MemberPlan, variant: &str) {
        let unwrapped = match &member.value {
            ValuePlan::Aggregate(aggregate) if member.flattened => aggregate
                .unwrapped
                .as_ref()
                .map(|routine| (aggregate.kind, routine)),
            _ => None,
        };
        match unwrapped {
            Some((ShapeKind::Map, routine)) => {
                w.block(format!("if matches!(base, None | Some({}(_))) {{", variant), "}", |w| {
                    w.block(
                        format!("if let Some((key, value)) = {}(&mut tag)? {{", routine),
                        "}",
                        |w| {
                            w.block("match base.as_mut() {", "}", |w| {
                                w.block(format!("Some({}(map)) => {{", variant), "}", |w| {
                                    w.line("map.insert(key, value);");
                                });
                                w.line(format!(
                                    "None => base = Some({}(::std::collections::HashMap::from([(key, value)]))),",
                                    variant
                                ));
                                w.line("Some(_) => {}");
                            });
                        },
                    );
                });
            }
            Some((_, routine)) => {
                w.block(format!("if matches!(base, None | Some({}(_))) {{", variant), "}", |w| {
                    w.line(format!("let value = {}(&mut tag)?;", routine));
                    w.block("match base.as_mut() {", "}", |w| {
                        w.line(format!("Some({}(items)) => items.push(value),", variant));
                        w.line(format!("None => base = Some({}(vec![value])),", variant));
                        w.line("Some(_) => {}");
                    });
                });
            }
            None => {
                w.block("if base.is_none() {", "}", |w| {
                    w.line(format!(
                        "let value = {};",
                        self.decode_value(&member.value, "&mut tag")
                    ));
                    w.line(format!("base = Some({}(value));", variant));
                });
            }
        }
    }

    /// Writes one list element bound to `source` through `list`.
    fn encode_list_element(&self, w: &mut RustWriter, list: &ListPlan, source: &str) {
        let element = format!(
            "list.element({}){}",
            literal(&list.element_name),
            write_ns(list.element_namespace.as_ref())
        );
        match &list.element {
            ValuePlan::Scalar(scalar) => {
                let inner = self.vars.fresh("inner_writer");
                w.line(format!("let mut {} = {}.finish();", inner, element));
                self.encode_scalar(w, scalar, source, &inner);
                w.line(format!("{}.finish();", inner));
            }
            ValuePlan::Aggregate(aggregate) => match aggregate.kind {
                ShapeKind::List | ShapeKind::Set | ShapeKind::Map => {
                    let inner = self.vars.fresh("inner_writer");
                    let (nested, start) = match aggregate.kind {
                        ShapeKind::Map => (self.vars.fresh("map_writer"), "nested_map"),
                        _ => (self.vars.fresh("list_writer"), "nested_list"),
                    };
                    w.line(format!("let mut {} = {}.finish();", inner, element));
                    w.line(format!("let mut {} = {}.{}();", nested, inner, start));
                    w.line(format!("{}({}, &mut {})?;", aggregate.routine, source, nested));
                    w.line(format!("{}.finish();", nested));
                    w.line(format!("{}.finish();", inner));
                }
                _ => {
                    w.line(format!("{}({}, {})?;", aggregate.routine, source, element));
                }
            },
        }
    }

    fn ser_list(&self, w: &mut RustWriter, name: &str, list: &ListPlan) {
        w.block(
            format!(
                "pub fn {}(input: &{}, list: &mut ::shapecodec_xml::encode::ListWriter<'_>) -> ::std::result::Result<(), {}> {{",
                name,
                self.plan.type_path(&list.shape),
                SER_ERROR
            ),
            "}",
            |w| {
                let item = self.vars.fresh("item");
                w.block(format!("for {} in input {{", item), "}", |w| {
                    if list.sparse {
                        // null elements have no XML form
                        let var = self.vars.fresh("var");
                        w.block(format!("if let Some({}) = {} {{", var, item), "}", |w| {
                            self.encode_list_element(w, list, &var)
                        });
                    } else {
                        self.encode_list_element(w, list, &item);
                    }
                });
                w.line("Ok(())");
            },
        );
    }

    /// The element type a list decoder pushes.
    fn stored(&self, value: &ValuePlan, sparse: bool) -> String {
        if sparse {
            format!("::std::option::Option<{}>", rust_type(self.plan, value))
        } else {
            rust_type(self.plan, value)
        }
    }

    fn wrap_stored(value: String, sparse: bool) -> String {
        if sparse {
            format!("Some({})", value)
        } else {
            value
        }
    }

    fn de_list(&self, w: &mut RustWriter, name: &str, list: &ListPlan) {
        w.block(
            format!(
                "pub fn {}(decoder: &mut {}) -> ::std::result::Result<{}, {}> {{",
                name,
                SCOPED_DECODER,
                self.plan.type_path(&list.shape),
                DE_ERROR
            ),
            "}",
            |w| {
                w.line("decoder.check_depth()?;");
                w.line("let mut out = ::std::vec::Vec::new();");
                w.block("while let Some(mut tag) = decoder.next_tag() {", "}", |w| {
                    w.block("match tag.start_el() {", "}", |w| {
                        w.block(
                            format!("s if s.matches({}) => {{", literal(&list.element_name)),
                            "}",
                            |w| {
                                let value = self.decode_value(&list.element, "&mut tag");
                                w.line(format!("out.push({});", Self::wrap_stored(value, list.sparse)));
                            },
                        );
                        w.line("_ => {}");
                    });
                });
                w.line("Ok(out)");
            },
        );
    }

    fn de_list_unwrapped(&self, w: &mut RustWriter, name: &str, list: &ListPlan) {
        w.line("/// Decodes one element of a flattened list.");
        w.block(
            format!(
                "pub fn {}(decoder: &mut {}) -> ::std::result::Result<{}, {}> {{",
                name,
                SCOPED_DECODER,
                self.stored(&list.element, list.sparse),
                DE_ERROR
            ),
            "}",
            |w| {
                let value = self.decode_value(&list.element, "decoder");
                w.line(format!("Ok({})", Self::wrap_stored(value, list.sparse)));
            },
        );
    }

    fn ser_map(&self, w: &mut RustWriter, name: &str, map: &MapPlan) {
        w.block(
            format!(
                "pub fn {}(input: &{}, map: &mut ::shapecodec_xml::encode::MapWriter<'_>) -> ::std::result::Result<(), {}> {{",
                name,
                self.plan.type_path(&map.shape),
                SER_ERROR
            ),
            "}",
            |w| {
                w.line("let mut entries: ::std::vec::Vec<_> = input.iter().collect();");
                w.line("entries.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));");
                let key = self.vars.fresh("key");
                let value = self.vars.fresh("value");
                w.block(format!("for ({}, {}) in entries {{", key, value), "}", |w| {
                    w.line("#[allow(unused_mut)]");
                    w.line("let mut entry = map.entry();");
                    self.encode_element(
                        w,
                        &ValuePlan::Scalar(map.key.clone()),
                        &key,
                        "entry",
                        &map.key_name,
                        false,
                        None,
                    );
                    if map.sparse {
                        let var = self.vars.fresh("var");
                        w.block(format!("if let Some({}) = {} {{", var, value), "}", |w| {
                            self.encode_element(w, &map.value, &var, "entry", &map.value_name, false, None)
                        });
                    } else {
                        self.encode_element(w, &map.value, &value, "entry", &map.value_name, false, None);
                    }
                    w.line("entry.finish();");
                });
                w.line("Ok(())");
            },
        );
    }

    /// Reads the key and value elements of one entry scoped by `entry`.
    fn decode_entry(&self, w: &mut RustWriter, map: &MapPlan, entry: &str) {
        w.line("let mut key = None;");
        w.line("let mut value = None;");
        w.block(
            format!("while let Some(mut tag) = {}.next_tag() {{", entry),
            "}",
            |w| {
                w.block("match tag.start_el() {", "}", |w| {
                    w.block(format!("s if s.matches({}) => {{", literal(&map.key_name)), "}", |w| {
                        w.line(format!("key = Some({});", self.decode_scalar(&map.key, "&mut tag")));
                    });
                    w.block(format!("s if s.matches({}) => {{", literal(&map.value_name)), "}", |w| {
                        w.line(format!(
                            "value = Some({});",
                            self.decode_value(&map.value, "&mut tag")
                        ));
                    });
                    w.line("_ => {}");
                });
            },
        );
        w.line(format!(
            "let key = key.ok_or_else(|| {}::custom(\"map entry is missing its key\"))?;",
            DE_ERROR
        ));
    }

    fn de_map(&self, w: &mut RustWriter, name: &str, map: &MapPlan) {
        w.block(
            format!(
                "pub fn {}(decoder: &mut {}) -> ::std::result::Result<{}, {}> {{",
                name,
                SCOPED_DECODER,
                self.plan.type_path(&map.shape),
                DE_ERROR
            ),
            "}",
            |w| {
                w.line("decoder.check_depth()?;");
                w.line("let mut out = ::std::collections::HashMap::new();");
                w.block("while let Some(mut entry) = decoder.next_tag() {", "}", |w| {
                    w.block("if !entry.start_el().matches(\"entry\") {", "}", |w| {
                        w.line("continue;");
                    });
                    self.decode_entry(w, map, "entry");
                    if map.sparse {
                        w.line("out.insert(key, value);");
                    } else {
                        w.block("if let Some(value) = value {", "}", |w| {
                            w.line("out.insert(key, value);");
                        });
                    }
                });
                w.line("Ok(out)");
            },
        );
    }

    fn de_map_unwrapped(&self, w: &mut RustWriter, name: &str, map: &MapPlan) {
        w.line("/// Decodes one entry of a flattened map.");
        w.block(
            format!(
                "pub fn {}(decoder: &mut {}) -> ::std::result::Result<Option<({}, {})>, {}> {{",
                name,
                SCOPED_DECODER,
                scalar_type(self.plan, &map.key),
                self.stored(&map.value, map.sparse),
                DE_ERROR
            ),
            "}",
            |w| {
                self.decode_entry(w, map, "decoder");
                if map.sparse {
                    w.line("Ok(Some((key, value)))");
                } else {
                    w.line("Ok(value.map(|value| (key, value)))");
                }
            },
        );
    }

    fn ser_payload(&self, w: &mut RustWriter, name: &str, payload: &PayloadPlan) {
        w.line(format!(
            "/// Serializes the {} body of `{}`.",
            http_binding::message(payload.side),
            payload.operation.name()
        ));
        let structure = match &payload.structure {
            Some(structure) => structure,
            None => {
                w.block(
                    format!(
                        "pub fn {}() -> ::std::result::Result<::std::vec::Vec<u8>, {}> {{",
                        name, SER_ERROR
                    ),
                    "}",
                    |w| {
                        w.line("Ok(::std::vec::Vec::new())");
                    },
                );
                return;
            }
        };
        let (root, namespace) = match &payload.framing {
            Framing::XmlRoot { name, namespace } => (name.as_str(), namespace.as_ref()),
            _ => (structure.name(), None),
        };
        let empty = matches!(&payload.body, PayloadBody::Members(members) if members.is_empty());
        if empty {
            w.line("#[allow(unused_variables)]");
        }
        w.block(
            format!(
                "pub fn {}(input: &{}) -> ::std::result::Result<::std::vec::Vec<u8>, {}> {{",
                name,
                self.plan.type_path(structure),
                SER_ERROR
            ),
            "}",
            |w| match &payload.body {
                PayloadBody::Members(_) if empty => {
                    w.line("Ok(::std::vec::Vec::new())");
                }
                PayloadBody::Members(members) => {
                    w.line("let mut out = ::std::string::String::new();");
                    w.block("{", "}", |w| {
                        w.line("let mut writer = ::shapecodec_xml::encode::XmlWriter::new(&mut out);");
                        w.line("#[allow(unused_mut)]");
                        w.line(format!(
                            "let mut root = writer.start_el({}){};",
                            literal(root),
                            write_ns(namespace)
                        ));
                        self.encode_members(w, structure.name(), members, "input", "root");
                    });
                    w.line("Ok(out.into_bytes())");
                }
                PayloadBody::Member(member) => {
                    self.ser_payload_member(w, structure, member, root, namespace)
                }
            },
        );
    }

    fn ser_payload_member(
        &self,
        w: &mut RustWriter,
        structure: &ShapeId,
        member: &MemberPlan,
        root: &str,
        namespace: Option<&XmlNamespace>,
    ) {
        let var = self.vars.fresh("var");
        w.block(format!("match &input.{} {{", member.field), "}", |w| {
            match (http_binding::raw_payload_arm(member, &var), &member.value) {
                (Some(arm), _) => {
                    w.line(arm);
                }
                (None, ValuePlan::Aggregate(aggregate))
                    if matches!(aggregate.kind, ShapeKind::Structure | ShapeKind::Union) =>
                {
                    w.block(format!("Some({}) => {{", var), "}", |w| {
                        w.line("let mut out = ::std::string::String::new();");
                        w.block("{", "}", |w| {
                            w.line("let mut writer = ::shapecodec_xml::encode::XmlWriter::new(&mut out);");
                            w.line(format!(
                                "{}({}, writer.start_el({}){})?;",
                                aggregate.routine,
                                var,
                                literal(root),
                                write_ns(namespace)
                            ));
                        });
                        w.line("Ok(out.into_bytes())");
                    });
                }
                (None, _) => {
                    w.line(format!(
                        "Some(_) => Err({}::custom(\"only structures, unions, blobs and strings can be XML payloads\")),",
                        SER_ERROR
                    ));
                }
            }
            if member.required {
                w.line(format!(
                    "None => Err({}::missing_required_member({}, {})),",
                    SER_ERROR,
                    literal(structure.name()),
                    literal(&member.name)
                ));
            } else {
                w.line("None => Ok(::std::vec::Vec::new()),");
            }
        });
    }

    /// Checks the root element bound to `decoder`.
    fn expect_root(&self, w: &mut RustWriter, decoder: &str, root: &str) {
        w.block(
            format!("if !{}.start_el().matches({}) {{", decoder, literal(root)),
            "}",
            |w| {
                w.block(format!("return Err({}::custom(format!(", DE_ERROR), ")));", |w| {
                    w.line(format!(
                        "\"invalid root, expected {} but found {{}}\",",
                        root
                    ));
                    w.line(format!("{}.start_el().local()", decoder));
                });
            },
        );
    }

    fn de_payload(&self, w: &mut RustWriter, name: &str, payload: &PayloadPlan) {
        w.line(format!(
            "/// Deserializes the {} of `{}`.",
            http_binding::message(payload.side),
            payload.operation.name()
        ));
        w.line("#[allow(unused_variables)]");
        let structure = match &payload.structure {
            Some(structure) => structure,
            None => {
                w.block(http_binding::payload_decoder_open(payload, name, "()"), "}", |w| {
                    w.line("Ok(())");
                });
                return;
            }
        };
        let open = http_binding::payload_decoder_open(payload, name, &self.plan.type_path(structure));
        w.block(open, "}", |w| {
            w.line("#[allow(unused_mut)]");
            w.line(format!(
                "let mut builder = {}::default();",
                self.plan.builder_path(structure)
            ));
            http_binding::render_header_reads(w, self.plan, &self.vars, &payload.headers);
            http_binding::render_response_code(w, payload.response_code.as_deref());
            match &payload.body {
                PayloadBody::Members(members) if members.is_empty() => {}
                PayloadBody::Members(members) => {
                    self.with_document(w, |w| match &payload.framing {
                        Framing::QueryResponse { response, result } => {
                            self.expect_root(w, "decoder", response);
                            w.block("if let Some(mut result_tag) = decoder.next_tag() {", "}", |w| {
                                self.expect_root(w, "result_tag", result);
                                self.decode_members(w, members, "result_tag");
                            });
                            w.line("Ok(builder)");
                        }
                        Framing::XmlRoot { name, .. } => {
                            self.expect_root(w, "decoder", name);
                            self.decode_members(w, members, "decoder");
                            w.line("Ok(builder)");
                        }
                        _ => {
                            self.decode_members(w, members, "decoder");
                            w.line("Ok(builder)");
                        }
                    });
                }
                PayloadBody::Member(member) => {
                    if !http_binding::render_raw_payload_read(w, self.plan, member) {
                        self.with_document(w, |w| {
                            if let Framing::XmlRoot { name, .. } = &payload.framing {
                                self.expect_root(w, "decoder", name);
                            }
                            w.line(format!(
                                "Ok(builder.{}(Some({})))",
                                naming::setter(&member.field),
                                self.decode_value(&member.value, "&mut decoder")
                            ));
                        });
                    }
                }
            }
            w.line("Ok(builder.build())");
        });
    }

    /// Parses a non-empty body and binds its root element as `decoder`.
    fn with_document(&self, w: &mut RustWriter, body: impl FnOnce(&mut RustWriter)) {
        w.block(
            format!(
                "builder = ::shapecodec_http::with_snapshot(body, |body| -> ::std::result::Result<_, {}> {{",
                DE_ERROR
            ),
            "})?;",
            |w| {
                w.block("if body.is_empty() {", "}", |w| {
                    w.line("return Ok(builder);");
                });
                w.block(
                    "::shapecodec_xml::decode::Document::try_from(body)?.decode_with(|doc| {",
                    "})",
                    |w| {
                        w.line("#[allow(unused_mut)]");
                        w.line("let mut decoder = doc.root_element()?;");
                        body(w);
                    },
                );
            },
        );
    }

    fn de_error_body(&self, w: &mut RustWriter, name: &str, error: &ErrorBodyPlan) {
        let builder = self.plan.error_builder_path(&error.error);
        let wrapping = match error.framing {
            ErrorFraming::Xml(wrapping) => wrapping,
            ErrorFraming::Json => ErrorWrapping::Wrapped,
        };
        w.line("#[allow(unused_variables, unused_mut)]");
        w.block(
            format!(
                "pub(crate) fn {}(headers: &::http::HeaderMap, body: &[u8], mut builder: {}) -> ::std::result::Result<{}, ::shapecodec_http::DeserializationError> {{",
                name, builder, builder
            ),
            "}",
            |w| {
                http_binding::render_header_reads(w, self.plan, &self.vars, &error.headers);
                if error.members.is_empty() {
                    w.line("Ok(builder)");
                    return;
                }
                w.block(
                    format!(
                        "::shapecodec_http::with_snapshot(body, |body| -> ::std::result::Result<_, {}> {{",
                        DE_ERROR
                    ),
                    "})",
                    |w| {
                        w.block("if body.is_empty() {", "}", |w| {
                            w.line("return Ok(builder);");
                        });
                        w.block(
                            "::shapecodec_xml::decode::Document::try_from(body)?.decode_with(|doc| {",
                            "})",
                            |w| {
                                w.line("#[allow(unused_mut)]");
                                w.line(format!(
                                    "let mut decoder = ::shapecodec_xml::errors::error_scope(doc, {})?;",
                                    wrapping_path(wrapping)
                                ));
                                self.decode_members(w, &error.members, "decoder");
                                w.line("Ok(builder)");
                            },
                        );
                    },
                );
            },
        );
    }

    /// Renders routines for an encoder plan even when it was planned for the other direction;
    /// used by the Query renderer for XML response bodies.
    pub(crate) fn render_decoder(&self, w: &mut RustWriter, routine: &Routine) {
        self.vars.reset();
        let name = routine.name.as_str();
        let unwrapped = matches!(
            routine.key,
            RoutineKey::Shape(_, RoutineKind::DecodeUnwrapped)
        );
        match &routine.body {
            RoutineBody::Structure(structure) => self.de_structure(w, name, structure),
            RoutineBody::Union(union) => self.de_union(w, name, union),
            RoutineBody::List(list) if unwrapped => self.de_list_unwrapped(w, name, list),
            RoutineBody::List(list) => self.de_list(w, name, list),
            RoutineBody::Map(map) if unwrapped => self.de_map_unwrapped(w, name, map),
            RoutineBody::Map(map) => self.de_map(w, name, map),
            RoutineBody::Payload(payload) => self.de_payload(w, name, payload),
            RoutineBody::ErrorBody(error) => self.de_error_body(w, name, error),
            RoutineBody::ErrorDispatch(dispatch) => {
                error_dispatch::render_error_dispatch(w, self.plan, name, dispatch)
            }
            RoutineBody::Validate(validation) => {
                validator::render_validator(w, self.plan, name, validation)
            }
        }
    }

    /// Looks up the list plan behind an aggregate encoder.
    pub(crate) fn list_plan(&self, shape: &ShapeId) -> Option<&'a ListPlan> {
        match self.collection_plan(shape) {
            Some(RoutineBody::List(list)) => Some(list),
            _ => None,
        }
    }

    /// Looks up the map plan behind an aggregate encoder.
    pub(crate) fn map_plan(&self, shape: &ShapeId) -> Option<&'a MapPlan> {
        match self.collection_plan(shape) {
            Some(RoutineBody::Map(map)) => Some(map),
            _ => None,
        }
    }
}

impl RenderRoutine for XmlRenderer<'_> {
    fn render(&self, w: &mut RustWriter, routine: &Routine) {
        if routine.key.direction() != Some(Direction::Encode) {
            return self.render_decoder(w, routine);
        }
        self.vars.reset();
        let name = routine.name.as_str();
        match &routine.body {
            RoutineBody::Structure(structure) => self.ser_structure(w, name, structure),
            RoutineBody::Union(union) => self.ser_union(w, name, union),
            RoutineBody::List(list) => self.ser_list(w, name, list),
            RoutineBody::Map(map) => self.ser_map(w, name, map),
            RoutineBody::Payload(payload) => self.ser_payload(w, name, payload),
            RoutineBody::ErrorBody(_)
            | RoutineBody::ErrorDispatch(_)
            | RoutineBody::Validate(_) => self.render_decoder(w, routine),
        }
    }
}

#[cfg(test)]
mod test {
    use super::XmlRenderer;
    use crate::ir::{
        AggregatePlan, CodecPlan, MemberPlan, Routine, RoutineBody, RoutineKey, RoutineKind,
        ScalarKind, ScalarPlan, StructurePlan, ValuePlan, XmlLocation,
    };
    use crate::model::{ShapeId, ShapeKind, XmlNamespace};
    use crate::protocol::{Protocol, RenderRoutine};
    use crate::writer::RustWriter;
    use pretty_assertions::assert_eq;
    use shapecodec_types::date_time::Format;

    fn scalar(kind: ScalarKind, shape: &str) -> ValuePlan {
        ValuePlan::Scalar(ScalarPlan {
            kind,
            shape: ShapeId::new(shape),
        })
    }

    fn member(name: &str, location: XmlLocation, value: ValuePlan) -> MemberPlan {
        MemberPlan {
            name: name.to_owned(),
            field: name.to_lowercase(),
            wire_name: name.to_owned(),
            required: false,
            location,
            flattened: false,
            namespace: None,
            value,
        }
    }

    fn book(kind: RoutineKind) -> Routine {
        let shape = ShapeId::new("ns#Book");
        let mut tags = member(
            "Tags",
            XmlLocation::Element,
            ValuePlan::Aggregate(AggregatePlan {
                shape: ShapeId::new("ns#Tags"),
                kind: ShapeKind::List,
                routine: match kind {
                    RoutineKind::Encode => "ser_rest_xml_tags".to_owned(),
                    _ => "de_rest_xml_tags".to_owned(),
                },
                unwrapped: match kind {
                    RoutineKind::Encode => None,
                    _ => Some("de_rest_xml_tags_unwrapped".to_owned()),
                },
            }),
        );
        tags.flattened = true;
        tags.namespace = Some(XmlNamespace {
            uri: "https://example.com".to_owned(),
            prefix: None,
        });
        Routine {
            name: match kind {
                RoutineKind::Encode => "ser_rest_xml_book".to_owned(),
                _ => "de_rest_xml_book".to_owned(),
            },
            key: RoutineKey::Shape(shape.clone(), kind),
            body: RoutineBody::Structure(StructurePlan {
                shape,
                members: vec![
                    member(
                        "Id",
                        XmlLocation::Attribute,
                        scalar(ScalarKind::Integer, "smithy.api#Integer"),
                    ),
                    member(
                        "Published",
                        XmlLocation::Element,
                        scalar(ScalarKind::Timestamp(Format::DateTime), "smithy.api#Timestamp"),
                    ),
                    tags,
                ],
            }),
        }
    }

    fn render(routine: &Routine) -> String {
        let plan = CodecPlan::empty(Protocol::RestXml);
        let mut w = RustWriter::new();
        XmlRenderer::new(&plan).render(&mut w, routine);
        w.into_string()
    }

    #[test]
    fn structure_encoder_writes_attributes_before_children() {
        let out = render(&book(RoutineKind::Encode));
        assert!(out.contains("mut writer: ::shapecodec_xml::encode::ElWriter<'_, '_>"));
        assert!(out.contains(
            "writer.write_attribute(\"Id\", ::shapecodec_types::primitive::Encoder::from(*var_1).encode());"
        ));
        assert!(out.contains("let mut scope = writer.finish();"));
        assert!(out.contains(
            ".data(&var_2.fmt(::shapecodec_types::date_time::Format::DateTime)?);"
        ));
        assert!(out.contains(
            "scope.start_list(\"Tags\", true, Some(::shapecodec_xml::encode::Namespace { uri: \"https://example.com\", prefix: None }));"
        ));
        let attribute = out.find("write_attribute").unwrap();
        let scope = out.find("writer.finish()").unwrap();
        assert!(attribute < scope);
    }

    #[test]
    fn flattened_members_accumulate_on_the_builder() {
        let out = render(&book(RoutineKind::Decode));
        assert!(out.contains("if let Some(attrib) = decoder.start_el().attr(\"Id\") {"));
        assert!(out.contains("s if s.matches(\"Tags\") => {"));
        assert!(out.contains("builder.tags.take().unwrap_or_default();"));
        assert!(out.contains(".push(de_rest_xml_tags_unwrapped(&mut tag)?);"));
        assert!(out.contains(
            "::shapecodec_types::DateTime::from_str(::shapecodec_xml::decode::try_data(&mut tag)?.as_ref(), ::shapecodec_types::date_time::Format::DateTime)"
        ));
    }

    const CHOICE_DECODER: &str = r#"pub fn de_rest_xml_choice(decoder: &mut ::shapecodec_xml::decode::ScopedDecoder<'_, '_>) -> ::std::result::Result<crate::types::Choice, ::shapecodec_xml::decode::XmlDecodeError> {
    decoder.check_depth()?;
    let mut base: Option<crate::types::Choice> = None;
    while let Some(mut tag) = decoder.next_tag() {
        match tag.start_el() {
            s if s.matches("a") => {
                if base.is_none() {
                    let value = ::shapecodec_xml::decode::try_data(&mut tag)?.into_owned();
                    base = Some(crate::types::Choice::A(value));
                }
            }
            s if s.matches("b") => {
                if base.is_none() {
                    let value = de_rest_xml_nested(&mut tag)?;
                    base = Some(crate::types::Choice::B(value));
                }
            }
            _ => {
                if base.is_none() {
                    base = Some(crate::types::Choice::Unknown);
                }
            }
        }
    }
    base.ok_or_else(|| ::shapecodec_xml::decode::XmlDecodeError::custom("expected a union variant, found none"))
}
"#;

    #[test]
    fn union_decoder_leaves_later_variants_undecoded() {
        let shape = ShapeId::new("ns#Choice");
        let routine = Routine {
            name: "de_rest_xml_choice".to_owned(),
            key: RoutineKey::Shape(shape.clone(), RoutineKind::Decode),
            body: RoutineBody::Union(StructurePlan {
                shape,
                members: vec![
                    member(
                        "a",
                        XmlLocation::Element,
                        scalar(ScalarKind::String, "smithy.api#String"),
                    ),
                    member(
                        "b",
                        XmlLocation::Element,
                        ValuePlan::Aggregate(AggregatePlan {
                            shape: ShapeId::new("ns#Nested"),
                            kind: ShapeKind::Structure,
                            routine: "de_rest_xml_nested".to_owned(),
                            unwrapped: None,
                        }),
                    ),
                ],
            }),
        };
        assert_eq!(CHOICE_DECODER, render(&routine));
    }

    #[test]
    fn structure_decoder_checks_depth_first() {
        let out = render(&book(RoutineKind::Decode));
        assert_eq!(Some("    decoder.check_depth()?;"), out.lines().nth(1));
    }
}
