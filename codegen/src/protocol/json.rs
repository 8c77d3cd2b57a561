/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! JSON routines for `awsJson1_0`, `awsJson1_1` and `restJson1`.
//!
//! Encoders write through `JsonObjectWriter` / `JsonArrayWriter`. Decoders pull tokens from a
//! `Peekable` token iterator, skip keys they don't know, and return `Ok(None)` for `null`.

use crate::ir::{
    CodecPlan, Direction, ErrorBodyPlan, ListPlan, MapPlan, MemberPlan, PayloadBody,
    PayloadPlan, Routine, RoutineBody, ScalarKind, ScalarPlan, StructurePlan,
    ValuePlan,
};
use crate::model::{ShapeId, ShapeKind};
use crate::naming;
use crate::protocol::{
    error_dispatch, format_path, http_binding, literal, scalar_type, validator, Bindings,
    RenderRoutine, ScalarStrategy,
};
use crate::writer::RustWriter;

const TOKEN: &str = "::shapecodec_json::deserialize::Token";
const TOKEN_FNS: &str = "::shapecodec_json::deserialize::token";
const DE_ERROR: &str = "::shapecodec_json::deserialize::DeserializeError";
const SER_ERROR: &str = "::shapecodec_types::error::operation::SerializationError";
const HTTP_DE_ERROR: &str = "::shapecodec_http::DeserializationError";

pub(crate) struct JsonRenderer<'a> {
    plan: &'a CodecPlan,
    vars: Bindings,
}

impl ScalarStrategy for JsonRenderer<'_> {
    fn encode_scalar(
        &self,
        w: &mut RustWriter,
        scalar: &ScalarPlan,
        source: &str,
        destination: &str,
    ) {
        w.line(match scalar.kind {
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
            ScalarKind::Blob => format!("{}.blob({}.as_ref());", destination, source),
            ScalarKind::Timestamp(format) => format!(
                "{}.date_time({}, {})?;",
                destination,
                source,
                format_path(format)
            ),
            ScalarKind::Document => format!("{}.document({});", destination, source),
        });
    }

    fn decode_scalar(&self, scalar: &ScalarPlan, source: &str) -> String {
        let number = |target: &str| {
            format!(
                "{}::expect_number_or_null({}.next())?.map({}::try_from).transpose()?",
                TOKEN_FNS, source, target
            )
        };
        match scalar.kind {
            ScalarKind::Boolean => format!("{}::expect_bool_or_null({}.next())?", TOKEN_FNS, source),
            ScalarKind::Byte => number("i8"),
            ScalarKind::Short => number("i16"),
            ScalarKind::Integer => number("i32"),
            ScalarKind::Long => number("i64"),
            ScalarKind::Float => format!(
                "{}::expect_number_or_null({}.next())?.map(|v| v.to_f32_lossy())",
                TOKEN_FNS, source
            ),
            ScalarKind::Double => format!(
                "{}::expect_number_or_null({}.next())?.map(|v| v.to_f64_lossy())",
                TOKEN_FNS, source
            ),
            ScalarKind::String => format!(
                "{}::expect_string_or_null({}.next())?.map(|s| s.to_unescaped().map(|u| u.into_owned())).transpose()?",
                TOKEN_FNS, source
            ),
            ScalarKind::Enum => format!(
                "{}::expect_string_or_null({}.next())?.map(|s| s.to_unescaped().map(|u| {}::from(u.as_ref()))).transpose()?",
                TOKEN_FNS,
                source,
                scalar_type(self.plan, scalar)
            ),
            ScalarKind::Blob => format!("{}::expect_blob_or_null({}.next())?", TOKEN_FNS, source),
            ScalarKind::Timestamp(format) => format!(
                "{}::expect_timestamp_or_null({}.next(), {})?",
                TOKEN_FNS,
                source,
                format_path(format)
            ),
            ScalarKind::Document => format!("Some({}::expect_document({})?)", TOKEN_FNS, source),
        }
    }
}

impl<'a> JsonRenderer<'a> {
    pub(crate) fn new(plan: &'a CodecPlan) -> Self {
        JsonRenderer {
            plan,
            vars: Bindings::default(),
        }
    }

    /// Writes the value bound to `source` into the `JsonValueWriter` expression `destination`.
    fn encode_value(&self, w: &mut RustWriter, value: &ValuePlan, source: &str, destination: &str) {
        let aggregate = match value {
            ValuePlan::Scalar(scalar) => return self.encode_scalar(w, scalar, source, destination),
            ValuePlan::Aggregate(aggregate) => aggregate,
        };
        let (writer, start) = match aggregate.kind {
            ShapeKind::List | ShapeKind::Set => (self.vars.fresh("array"), "start_array"),
            _ => (self.vars.fresh("object"), "start_object"),
        };
        w.line("#[allow(unused_mut)]");
        w.line(format!("let mut {} = {}.{}();", writer, destination, start));
        w.line(format!("{}(&mut {}, {})?;", aggregate.routine, writer, source));
        w.line(format!("{}.finish();", writer));
    }

    /// An expression decoding an `Option` of the value from `tokens`. `depth` is the nesting
    /// depth expression handed to aggregate decoders.
    fn decode_value(&self, value: &ValuePlan, depth: &str) -> String {
        match value {
            ValuePlan::Scalar(scalar) => self.decode_scalar(scalar, "tokens"),
            ValuePlan::Aggregate(aggregate) => format!("{}(tokens, {})?", aggregate.routine, depth),
        }
    }

    fn encode_member(
        &self,
        w: &mut RustWriter,
        owner: &str,
        member: &MemberPlan,
        input: &str,
        object: &str,
    ) {
        let var = self.vars.fresh("var");
        let destination = format!("{}.key({})", object, literal(&member.wire_name));
        if member.required {
            w.block(format!("match &{}.{} {{", input, member.field), "}", |w| {
                w.block(format!("Some({}) => {{", var), "}", |w| {
                    self.encode_value(w, &member.value, &var, &destination)
                });
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
                |w| self.encode_value(w, &member.value, &var, &destination),
            );
        }
    }

    /// The key loop of an object whose members are set on `builder`.
    fn decode_members(&self, w: &mut RustWriter, members: &[MemberPlan], depth: &str) {
        w.block("loop {", "}", |w| {
            w.block("match tokens.next().transpose()? {", "}", |w| {
                w.line(format!("Some({}::EndObject {{ .. }}) => break,", TOKEN));
                if members.is_empty() {
                    w.line(format!(
                        "Some({}::ObjectKey {{ .. }}) => {}::skip_value(tokens)?,",
                        TOKEN, TOKEN_FNS
                    ));
                } else {
                    w.block(
                        format!(
                            "Some({}::ObjectKey {{ key, .. }}) => match key.to_unescaped()?.as_ref() {{",
                            TOKEN
                        ),
                        "},",
                        |w| {
                            for member in members {
                                w.block(format!("{} => {{", literal(&member.wire_name)), "}", |w| {
                                    w.line(format!(
                                        "builder = builder.{}({});",
                                        naming::setter(&member.field),
                                        self.decode_value(&member.value, depth)
                                    ));
                                });
                            }
                            w.line(format!("_ => {}::skip_value(tokens)?,", TOKEN_FNS));
                        },
                    );
                }
                w.block("other => {", "}", |w| {
                    w.block(format!("return Err({}::custom(format!(", DE_ERROR), ")));", |w| {
                        w.line("\"expected object key or end object, found: {:?}\",");
                        w.line("other");
                    });
                });
            });
        });
    }

    fn decoder_signature(&self, w: &mut RustWriter, name: &str, output: &str) {
        w.line(format!("pub(crate) fn {}<'a, I>(", name));
        w.line("    tokens: &mut ::std::iter::Peekable<I>,");
        w.line("    depth: usize,");
        w.line(format!(
            ") -> ::std::result::Result<Option<{}>, {}>",
            output, DE_ERROR
        ));
        w.line("where");
        w.line(format!(
            "    I: Iterator<Item = ::std::result::Result<{}<'a>, {}>>,",
            TOKEN, DE_ERROR
        ));
    }

    fn ser_structure(&self, w: &mut RustWriter, name: &str, structure: &StructurePlan) {
        w.block(
            format!(
                "pub fn {}(object: &mut ::shapecodec_json::serialize::JsonObjectWriter<'_>, input: &{}) -> ::std::result::Result<(), {}> {{",
                name,
                self.plan.type_path(&structure.shape),
                SER_ERROR
            ),
            "}",
            |w| {
                for member in &structure.members {
                    self.encode_member(w, structure.shape.name(), member, "input", "object");
                }
                w.line("Ok(())");
            },
        );
    }

    fn check_depth(&self, w: &mut RustWriter) {
        w.line(format!("{}::check_depth(tokens, depth)?;", TOKEN_FNS));
    }

    fn de_structure(&self, w: &mut RustWriter, name: &str, structure: &StructurePlan) {
        self.decoder_signature(w, name, &self.plan.type_path(&structure.shape));
        w.block("{", "}", |w| {
            self.check_depth(w);
            w.block("match tokens.next().transpose()? {", "}", |w| {
                w.line(format!("Some({}::ValueNull {{ .. }}) => Ok(None),", TOKEN));
                w.block(format!("Some({}::StartObject {{ .. }}) => {{", TOKEN), "}", |w| {
                    w.line("#[allow(unused_mut)]");
                    w.line(format!(
                        "let mut builder = {}::default();",
                        self.plan.builder_path(&structure.shape)
                    ));
                    self.decode_members(w, &structure.members, "depth + 1");
                    w.line("Ok(Some(builder.build()))");
                });
                w.line(format!(
                    "_ => Err({}::custom(\"expected start object or null\")),",
                    DE_ERROR
                ));
            });
        });
    }

    fn ser_union(&self, w: &mut RustWriter, name: &str, union: &StructurePlan) {
        let ty = self.plan.type_path(&union.shape);
        w.block(
            format!(
                "pub fn {}(object: &mut ::shapecodec_json::serialize::JsonObjectWriter<'_>, input: &{}) -> ::std::result::Result<(), {}> {{",
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
                                let destination = format!("object.key({})", literal(&member.wire_name));
                                self.encode_value(w, &member.value, &inner, &destination);
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

    fn de_union(&self, w: &mut RustWriter, name: &str, union: &StructurePlan) {
        let ty = self.plan.type_path(&union.shape);
        self.decoder_signature(w, name, &ty);
        w.block("{", "}", |w| {
            self.check_depth(w);
            w.block("match tokens.next().transpose()? {", "}", |w| {
                w.line(format!("Some({}::ValueNull {{ .. }}) => Ok(None),", TOKEN));
                w.block(format!("Some({}::StartObject {{ .. }}) => {{", TOKEN), "}", |w| {
                    w.line("let mut variant = None;");
                    w.block("loop {", "}", |w| {
                        w.block("match tokens.next().transpose()? {", "}", |w| {
                            w.line(format!("Some({}::EndObject {{ .. }}) => break,", TOKEN));
                            w.block(format!("Some({}::ObjectKey {{ key, .. }}) => {{", TOKEN), "}", |w| {
                                w.block(
                                    format!("if let Some(Ok({}::ValueNull {{ .. }})) = tokens.peek() {{", TOKEN),
                                    "}",
                                    |w| {
                                        w.line("let _ = tokens.next();");
                                        w.line("continue;");
                                    },
                                );
                                w.line("let key = key.to_unescaped()?;");
                                w.block("if key == \"__type\" || variant.is_some() {", "}", |w| {
                                    w.line(format!("{}::skip_value(tokens)?;", TOKEN_FNS));
                                    w.line("continue;");
                                });
                                w.block("variant = match key.as_ref() {", "};", |w| {
                                    for member in &union.members {
                                        w.line(format!(
                                            "{} => Some({}::{}(",
                                            literal(&member.wire_name),
                                            ty,
                                            naming::to_pascal_case(&member.name)
                                        ));
                                        w.line(format!(
                                            "    {}.ok_or_else(|| {}::custom({}))?,",
                                            self.decode_value(&member.value, "depth + 1"),
                                            DE_ERROR,
                                            literal(&format!("value for '{}' cannot be null", member.wire_name))
                                        ));
                                        w.line(")),");
                                    }
                                    w.block("_ => {", "}", |w| {
                                        w.line(format!("{}::skip_value(tokens)?;", TOKEN_FNS));
                                        w.line(format!("Some({}::Unknown)", ty));
                                    });
                                });
                            });
                            w.block("other => {", "}", |w| {
                                w.block(format!("return Err({}::custom(format!(", DE_ERROR), ")));", |w| {
                                    w.line("\"expected object key or end object, found: {:?}\",");
                                    w.line("other");
                                });
                            });
                        });
                    });
                    w.line("Ok(variant)");
                });
                w.line(format!(
                    "_ => Err({}::custom(\"expected start object or null\")),",
                    DE_ERROR
                ));
            });
        });
    }

    fn ser_list(&self, w: &mut RustWriter, name: &str, list: &ListPlan) {
        w.block(
            format!(
                "pub fn {}(array: &mut ::shapecodec_json::serialize::JsonArrayWriter<'_>, input: &{}) -> ::std::result::Result<(), {}> {{",
                name,
                self.plan.type_path(&list.shape),
                SER_ERROR
            ),
            "}",
            |w| {
                let item = self.vars.fresh("item");
                w.block(format!("for {} in input {{", item), "}", |w| {
                    if list.sparse {
                        let var = self.vars.fresh("var");
                        w.block(format!("if let Some({}) = {} {{", var, item), "}", |w| {
                            self.encode_value(w, &list.element, &var, "array.value()")
                        });
                        // enum lists skip nulls instead of writing them
                        if !list.element.is_enum() {
                            w.block("else {", "}", |w| {
                                w.line("array.value().null();");
                            });
                        }
                    } else {
                        self.encode_value(w, &list.element, &item, "array.value()");
                    }
                });
                w.line("Ok(())");
            },
        );
    }

    fn de_list(&self, w: &mut RustWriter, name: &str, list: &ListPlan) {
        self.decoder_signature(w, name, &self.plan.type_path(&list.shape));
        w.block("{", "}", |w| {
            self.check_depth(w);
            w.block("match tokens.next().transpose()? {", "}", |w| {
                w.line(format!("Some({}::ValueNull {{ .. }}) => Ok(None),", TOKEN));
                w.block(format!("Some({}::StartArray {{ .. }}) => {{", TOKEN), "}", |w| {
                    w.line("let mut items = ::std::vec::Vec::new();");
                    w.block("loop {", "}", |w| {
                        w.block("match tokens.peek() {", "}", |w| {
                            w.block(format!("Some(Ok({}::EndArray {{ .. }})) => {{", TOKEN), "}", |w| {
                                w.line("tokens.next().transpose()?;");
                                w.line("break;");
                            });
                            w.block("_ => {", "}", |w| {
                                w.line(format!(
                                    "let value = {};",
                                    self.decode_value(&list.element, "depth + 1")
                                ));
                                if list.sparse {
                                    w.line("items.push(value);");
                                } else {
                                    w.block("if let Some(value) = value {", "}", |w| {
                                        w.line("items.push(value);");
                                    });
                                }
                            });
                        });
                    });
                    w.line("Ok(Some(items))");
                });
                w.line(format!(
                    "_ => Err({}::custom(\"expected start array or null\")),",
                    DE_ERROR
                ));
            });
        });
    }

    fn ser_map(&self, w: &mut RustWriter, name: &str, map: &MapPlan) {
        w.block(
            format!(
                "pub fn {}(object: &mut ::shapecodec_json::serialize::JsonObjectWriter<'_>, input: &{}) -> ::std::result::Result<(), {}> {{",
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
                    let destination = format!("object.key({}.as_str())", key);
                    if map.sparse {
                        let var = self.vars.fresh("var");
                        w.block(format!("if let Some({}) = {} {{", var, value), "}", |w| {
                            self.encode_value(w, &map.value, &var, &destination)
                        });
                        w.block("else {", "}", |w| {
                            w.line(format!("{}.null();", destination));
                        });
                    } else {
                        self.encode_value(w, &map.value, &value, &destination);
                    }
                });
                w.line("Ok(())");
            },
        );
    }

    fn de_map(&self, w: &mut RustWriter, name: &str, map: &MapPlan) {
        self.decoder_signature(w, name, &self.plan.type_path(&map.shape));
        w.block("{", "}", |w| {
            self.check_depth(w);
            w.block("match tokens.next().transpose()? {", "}", |w| {
                w.line(format!("Some({}::ValueNull {{ .. }}) => Ok(None),", TOKEN));
                w.block(format!("Some({}::StartObject {{ .. }}) => {{", TOKEN), "}", |w| {
                    w.line("let mut map = ::std::collections::HashMap::new();");
                    w.block("loop {", "}", |w| {
                        w.block("match tokens.next().transpose()? {", "}", |w| {
                            w.line(format!("Some({}::EndObject {{ .. }}) => break,", TOKEN));
                            w.block(format!("Some({}::ObjectKey {{ key, .. }}) => {{", TOKEN), "}", |w| {
                                w.line(match map.key.kind {
                                    ScalarKind::Enum => format!(
                                        "let key = key.to_unescaped().map(|u| {}::from(u.as_ref()))?;",
                                        scalar_type(self.plan, &map.key)
                                    ),
                                    _ => "let key = key.to_unescaped().map(|u| u.into_owned())?;".to_owned(),
                                });
                                w.line(format!(
                                    "let value = {};",
                                    self.decode_value(&map.value, "depth + 1")
                                ));
                                if map.sparse {
                                    w.line("map.insert(key, value);");
                                } else {
                                    w.block("if let Some(value) = value {", "}", |w| {
                                        w.line("map.insert(key, value);");
                                    });
                                }
                            });
                            w.block("other => {", "}", |w| {
                                w.block(format!("return Err({}::custom(format!(", DE_ERROR), ")));", |w| {
                                    w.line("\"expected object key or end object, found: {:?}\",");
                                    w.line("other");
                                });
                            });
                        });
                    });
                    w.line("Ok(Some(map))");
                });
                w.line(format!(
                    "_ => Err({}::custom(\"expected start object or null\")),",
                    DE_ERROR
                ));
            });
        });
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
                        if self.plan.protocol().is_rest() {
                            w.line("Ok(::std::vec::Vec::new())");
                        } else {
                            w.line("Ok(b\"{}\".to_vec())");
                        }
                    },
                );
                return;
            }
        };
        let rest = self.plan.protocol().is_rest();
        if matches!(&payload.body, PayloadBody::Members(members) if members.is_empty() && rest) {
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
                PayloadBody::Members(members) if members.is_empty() && rest => {
                    w.line("Ok(::std::vec::Vec::new())");
                }
                PayloadBody::Members(members) => {
                    w.line("let mut out = ::std::string::String::new();");
                    w.line("#[allow(unused_mut)]");
                    w.line("let mut object = ::shapecodec_json::serialize::JsonObjectWriter::new(&mut out);");
                    for member in members {
                        self.encode_member(w, structure.name(), member, "input", "object");
                    }
                    w.line("object.finish();");
                    w.line("Ok(out.into_bytes())");
                }
                PayloadBody::Member(member) => {
                    self.ser_payload_member(w, structure, member);
                }
            },
        );
    }

    fn ser_payload_member(&self, w: &mut RustWriter, structure: &ShapeId, member: &MemberPlan) {
        let var = self.vars.fresh("var");
        w.block(format!("match &input.{} {{", member.field), "}", |w| {
            match http_binding::raw_payload_arm(member, &var) {
                Some(arm) => {
                    w.line(arm);
                }
                None => {
                    w.block(format!("Some({}) => {{", var), "}", |w| {
                        w.line("let mut out = ::std::string::String::new();");
                        self.encode_value(
                            w,
                            &member.value,
                            &var,
                            "::shapecodec_json::serialize::JsonValueWriter::new(&mut out)",
                        );
                        w.line("Ok(out.into_bytes())");
                    });
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
                PayloadBody::Members(members) => {
                    w.block(
                        format!(
                            "builder = ::shapecodec_http::with_snapshot(body, |body| -> ::std::result::Result<_, {}> {{",
                            DE_ERROR
                        ),
                        "})?;",
                        |w| {
                            w.line("let body = if body.is_empty() { &b\"{}\"[..] } else { body };");
                            w.line("let mut tokens_owned = ::shapecodec_json::deserialize::json_token_iter(body).peekable();");
                            w.line("let tokens = &mut tokens_owned;");
                            w.line(format!("{}::expect_start_object(tokens.next())?;", TOKEN_FNS));
                            self.decode_members(w, members, "0");
                            self.reject_trailing_tokens(w);
                            w.line("Ok(builder)");
                        },
                    );
                }
                PayloadBody::Member(member) => self.de_payload_member(w, member),
            }
            w.line("Ok(builder.build())");
        });
    }

    fn reject_trailing_tokens(&self, w: &mut RustWriter) {
        w.block("if tokens.next().is_some() {", "}", |w| {
            w.line(format!(
                "return Err({}::custom(\"found more JSON tokens after completing parsing\"));",
                DE_ERROR
            ));
        });
    }

    fn de_payload_member(&self, w: &mut RustWriter, member: &MemberPlan) {
        if http_binding::render_raw_payload_read(w, self.plan, member) {
            return;
        }
        w.block("if !body.is_empty() {", "}", |w| {
            w.block(
                format!(
                    "builder = ::shapecodec_http::with_snapshot(body, |body| -> ::std::result::Result<_, {}> {{",
                    DE_ERROR
                ),
                "})?;",
                |w| {
                    w.line("let mut tokens_owned = ::shapecodec_json::deserialize::json_token_iter(body).peekable();");
                    w.line("let tokens = &mut tokens_owned;");
                    w.line(format!("let value = {};", self.decode_value(&member.value, "0")));
                    self.reject_trailing_tokens(w);
                    w.line(format!("Ok(builder.{}(value))", naming::setter(&member.field)));
                },
            );
        });
    }

    fn de_error_body(&self, w: &mut RustWriter, name: &str, error: &ErrorBodyPlan) {
        let builder = self.plan.error_builder_path(&error.error);
        w.line("#[allow(unused_variables, unused_mut)]");
        w.block(
            format!(
                "pub(crate) fn {}(headers: &::http::HeaderMap, body: &[u8], mut builder: {}) -> ::std::result::Result<{}, {}> {{",
                name, builder, builder, HTTP_DE_ERROR
            ),
            "}",
            |w| {
                http_binding::render_header_reads(w, self.plan, &self.vars, &error.headers);
                w.block(
                    format!(
                        "::shapecodec_http::with_snapshot(body, |body| -> ::std::result::Result<_, {}> {{",
                        DE_ERROR
                    ),
                    "})",
                    |w| {
                        w.line("let body = if body.is_empty() { &b\"{}\"[..] } else { body };");
                        w.line("let mut tokens_owned = ::shapecodec_json::deserialize::json_token_iter(body).peekable();");
                        w.line("let tokens = &mut tokens_owned;");
                        w.line(format!("{}::expect_start_object(tokens.next())?;", TOKEN_FNS));
                        self.decode_members(w, &error.members, "0");
                        w.line("Ok(builder)");
                    },
                );
            },
        );
    }
}

impl RenderRoutine for JsonRenderer<'_> {
    fn render(&self, w: &mut RustWriter, routine: &Routine) {
        self.vars.reset();
        let name = routine.name.as_str();
        let direction = routine.key.direction();
        match (&routine.body, direction) {
            (RoutineBody::Structure(structure), Some(Direction::Encode)) => {
                self.ser_structure(w, name, structure)
            }
            (RoutineBody::Structure(structure), _) => self.de_structure(w, name, structure),
            (RoutineBody::Union(union), Some(Direction::Encode)) => self.ser_union(w, name, union),
            (RoutineBody::Union(union), _) => self.de_union(w, name, union),
            (RoutineBody::List(list), Some(Direction::Encode)) => self.ser_list(w, name, list),
            (RoutineBody::List(list), _) => self.de_list(w, name, list),
            (RoutineBody::Map(map), Some(Direction::Encode)) => self.ser_map(w, name, map),
            (RoutineBody::Map(map), _) => self.de_map(w, name, map),
            (RoutineBody::Payload(payload), Some(Direction::Encode)) => {
                self.ser_payload(w, name, payload)
            }
            (RoutineBody::Payload(payload), _) => self.de_payload(w, name, payload),
            (RoutineBody::ErrorBody(error), _) => self.de_error_body(w, name, error),
            (RoutineBody::ErrorDispatch(dispatch), _) => {
                error_dispatch::render_error_dispatch(w, self.plan, name, dispatch)
            }
            (RoutineBody::Validate(validation), _) => {
                validator::render_validator(w, self.plan, name, validation)
            }
        }
    }
}
