/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! `awsQuery` routines. Requests are form encoded by these encoders; responses and errors are XML
//! and go through [`XmlRenderer`].

use crate::ir::{
    CodecPlan, Direction, Framing, ListPlan, MapPlan, MemberPlan, PayloadBody, PayloadPlan,
    Routine, RoutineBody, ScalarKind, ScalarPlan, StructurePlan, ValuePlan,
};
use crate::model::ShapeKind;
use crate::naming;
use crate::protocol::xml::XmlRenderer;
use crate::protocol::{format_path, literal, Bindings, RenderRoutine, ScalarStrategy};
use crate::writer::RustWriter;

const SER_ERROR: &str = "::shapecodec_types::error::operation::SerializationError";

pub(crate) struct QueryRenderer<'a> {
    plan: &'a CodecPlan,
    xml: XmlRenderer<'a>,
    vars: Bindings,
}

impl ScalarStrategy for QueryRenderer<'_> {
    fn encode_scalar(
        &self,
        w: &mut RustWriter,
        scalar: &ScalarPlan,
        source: &str,
        destination: &str,
    ) {
        let call = match scalar.kind {
            ScalarKind::Boolean => format!("{}.boolean(*{});", destination, source),
            ScalarKind::Byte | ScalarKind::Short | ScalarKind::Integer | ScalarKind::Long => {
                format!(
                    "{}.number(::shapecodec_types::Number::from(i64::from(*{})));",
                    destination, source
                )
            }
            ScalarKind::Float | ScalarKind::Double => format!(
                "{}.number(::shapecodec_types::Number::Float(f64::from(*{})));",
                destination, source
            ),
            ScalarKind::String | ScalarKind::Enum => {
                format!("{}.string({}.as_str());", destination, source)
            }
            ScalarKind::Blob => format!(
                "{}.string(&::shapecodec_types::base64::encode({}));",
                destination, source
            ),
            ScalarKind::Timestamp(format) => format!(
                "{}.date_time({}, {})?;",
                destination,
                source,
                format_path(format)
            ),
            ScalarKind::Document => format!(
                "return Err({}::custom(\"document values have no query encoding\"));",
                SER_ERROR
            ),
        };
        w.line(call);
    }

    fn decode_scalar(&self, scalar: &ScalarPlan, source: &str) -> String {
        self.xml.decode_scalar(scalar, source)
    }
}

impl<'a> QueryRenderer<'a> {
    pub(crate) fn new(plan: &'a CodecPlan) -> Self {
        QueryRenderer {
            plan,
            xml: XmlRenderer::new(plan),
            vars: Bindings::default(),
        }
    }

    /// Writes the value bound to `source` into the `QueryValueWriter` expression `destination`.
    fn encode_value(
        &self,
        w: &mut RustWriter,
        value: &ValuePlan,
        source: &str,
        destination: &str,
        flattened: bool,
    ) {
        match value {
            ValuePlan::Scalar(scalar) => self.encode_scalar(w, scalar, source, destination),
            ValuePlan::Aggregate(aggregate) => match aggregate.kind {
                ShapeKind::List | ShapeKind::Set => {
                    let element = self
                        .xml
                        .list_plan(&aggregate.shape)
                        .map(|list| list.element_name.as_str())
                        .unwrap_or("member");
                    let list = self.vars.fresh("list");
                    w.line(format!(
                        "let mut {} = {}.start_list({}, Some({}));",
                        list,
                        destination,
                        flattened,
                        literal(element)
                    ));
                    w.line(format!("{}(&mut {}, {})?;", aggregate.routine, list, source));
                    w.line(format!("{}.finish();", list));
                }
                ShapeKind::Map => {
                    let (key, value) = self
                        .xml
                        .map_plan(&aggregate.shape)
                        .map(|map| (map.key_name.as_str(), map.value_name.as_str()))
                        .unwrap_or(("key", "value"));
                    let map = self.vars.fresh("map");
                    w.line(format!(
                        "let mut {} = {}.start_map({}, {}, {});",
                        map,
                        destination,
                        flattened,
                        literal(key),
                        literal(value)
                    ));
                    w.line(format!("{}(&mut {}, {})?;", aggregate.routine, map, source));
                    w.line(format!("{}.finish();", map));
                }
                _ => {
                    w.line(format!("{}({}, {})?;", aggregate.routine, destination, source));
                }
            },
        }
    }

    /// Writes every set member of `input` under `writer`, a `QueryWriter` or `QueryValueWriter`.
    fn encode_members(
        &self,
        w: &mut RustWriter,
        owner: &str,
        members: &[MemberPlan],
        input: &str,
        writer: &str,
    ) {
        for member in members {
            let scope = self.vars.fresh("scope");
            let var = self.vars.fresh("var");
            w.line(format!(
                "let {} = {}.prefix({});",
                scope,
                writer,
                literal(&member.wire_name)
            ));
            let body = |w: &mut RustWriter| {
                self.encode_value(w, &member.value, &var, &scope, member.flattened)
            };
            if member.required {
                w.block(format!("match &{}.{} {{", input, member.field), "}", |w| {
                    w.block(format!("Some({}) => {{", var), "}", body);
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
                    body,
                );
            }
        }
    }

    fn ser_structure(&self, w: &mut RustWriter, name: &str, structure: &StructurePlan) {
        w.line("#[allow(unused_mut)]");
        w.block(
            format!(
                "pub fn {}(mut writer: ::shapecodec_query::QueryValueWriter<'_>, input: &{}) -> ::std::result::Result<(), {}> {{",
                name,
                self.plan.type_path(&structure.shape),
                SER_ERROR
            ),
            "}",
            |w| {
                self.encode_members(w, structure.shape.name(), &structure.members, "input", "writer");
                w.line("Ok(())");
            },
        );
    }

    fn ser_union(&self, w: &mut RustWriter, name: &str, union: &StructurePlan) {
        let ty = self.plan.type_path(&union.shape);
        w.block(
            format!(
                "pub fn {}(mut writer: ::shapecodec_query::QueryValueWriter<'_>, input: &{}) -> ::std::result::Result<(), {}> {{",
                name, ty, SER_ERROR
            ),
            "}",
            |w| {
                w.block("match input {", "}", |w| {
                    for member in &union.members {
                        let inner = self.vars.fresh("inner");
                        w.block(
                            format!("{}::{}({}) => {{", ty, naming::to_pascal_case(&member.name), inner),
                            "}",
                            |w| {
                                let scope = self.vars.fresh("scope");
                                w.line(format!(
                                    "let {} = writer.prefix({});",
                                    scope,
                                    literal(&member.wire_name)
                                ));
                                self.encode_value(w, &member.value, &inner, &scope, member.flattened);
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
                w.line("Ok(())");
            },
        );
    }

    fn ser_list(&self, w: &mut RustWriter, name: &str, list: &ListPlan) {
        w.block(
            format!(
                "pub fn {}(list: &mut ::shapecodec_query::QueryListWriter<'_>, input: &{}) -> ::std::result::Result<(), {}> {{",
                name,
                self.plan.type_path(&list.shape),
                SER_ERROR
            ),
            "}",
            |w| {
                let item = self.vars.fresh("item");
                w.block(format!("for {} in input {{", item), "}", |w| {
                    let entry = self.vars.fresh("entry");
                    if list.sparse {
                        let var = self.vars.fresh("var");
                        w.block(format!("if let Some({}) = {} {{", var, item), "}", |w| {
                            w.line(format!("let {} = list.entry();", entry));
                            self.encode_value(w, &list.element, &var, &entry, false);
                        });
                    } else {
                        w.line(format!("let {} = list.entry();", entry));
                        self.encode_value(w, &list.element, &item, &entry, false);
                    }
                });
                w.line("Ok(())");
            },
        );
    }

    fn ser_map(&self, w: &mut RustWriter, name: &str, map: &MapPlan) {
        w.block(
            format!(
                "pub fn {}(map: &mut ::shapecodec_query::QueryMapWriter<'_>, input: &{}) -> ::std::result::Result<(), {}> {{",
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
                    let entry = self.vars.fresh("entry");
                    if map.sparse {
                        let var = self.vars.fresh("var");
                        w.block(format!("if let Some({}) = {} {{", var, value), "}", |w| {
                            w.line(format!("let {} = map.entry({}.as_str());", entry, key));
                            self.encode_value(w, &map.value, &var, &entry, false);
                        });
                    } else {
                        w.line(format!("let {} = map.entry({}.as_str());", entry, key));
                        self.encode_value(w, &map.value, &value, &entry, false);
                    }
                });
                w.line("Ok(())");
            },
        );
    }

    fn ser_payload(&self, w: &mut RustWriter, name: &str, payload: &PayloadPlan) {
        let (action, version) = match &payload.framing {
            Framing::QueryRequest { action, version } => (action.as_str(), version.as_str()),
            _ => (payload.operation.name(), ""),
        };
        w.line(format!(
            "/// Serializes the request body of `{}`.",
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
                        w.line("let mut out = ::std::string::String::new();");
                        w.line(format!(
                            "let writer = ::shapecodec_query::QueryWriter::new(&mut out, {}, {});",
                            literal(action),
                            literal(version)
                        ));
                        w.line("writer.finish();");
                        w.line("Ok(out.into_bytes())");
                    },
                );
                return;
            }
        };
        let members = match &payload.body {
            PayloadBody::Members(members) => members.as_slice(),
            PayloadBody::Member(member) => std::slice::from_ref(member),
        };
        w.block(
            format!(
                "pub fn {}(input: &{}) -> ::std::result::Result<::std::vec::Vec<u8>, {}> {{",
                name,
                self.plan.type_path(structure),
                SER_ERROR
            ),
            "}",
            |w| {
                w.line("let mut out = ::std::string::String::new();");
                w.line("#[allow(unused_mut)]");
                w.line(format!(
                    "let mut writer = ::shapecodec_query::QueryWriter::new(&mut out, {}, {});",
                    literal(action),
                    literal(version)
                ));
                self.encode_members(w, structure.name(), members, "input", "writer");
                w.line("writer.finish();");
                w.line("Ok(out.into_bytes())");
            },
        );
    }
}

impl RenderRoutine for QueryRenderer<'_> {
    fn render(&self, w: &mut RustWriter, routine: &Routine) {
        if routine.key.direction() != Some(Direction::Encode) {
            return self.xml.render_decoder(w, routine);
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
            | RoutineBody::Validate(_) => self.xml.render_decoder(w, routine),
        }
    }
}
