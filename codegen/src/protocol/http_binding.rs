/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Response members bound to headers and the status code.
//!
//! The emitted statements expect `headers: &::http::HeaderMap`, `body: &[u8]`, `status: u16` and
//! a mutable `builder` in scope.

use crate::ir::{
    CodecPlan, HeaderBinding, HeaderValue, MemberPlan, PayloadPlan, PayloadSide, ScalarKind,
    ScalarPlan, ValuePlan,
};
use crate::naming;
use crate::protocol::{format_path, literal, scalar_type, Bindings};
use crate::writer::RustWriter;

const TO_DESERIALIZATION_ERROR: &str =
    ".map_err(|err| ::shapecodec_http::DeserializationError::from_body(err, body))?";

fn read_one(scalar: &ScalarPlan, header: &str) -> String {
    match scalar.kind {
        ScalarKind::String | ScalarKind::Enum | ScalarKind::Blob => format!(
            "::shapecodec_http::header::one_string(headers, {})",
            header
        ),
        ScalarKind::Timestamp(format) => format!(
            "::shapecodec_http::header::one_date(headers, {}, {})",
            header,
            format_path(format)
        ),
        _ => format!(
            "::shapecodec_http::header::one_or_none::<{}>(headers, {})",
            primitive(scalar),
            header
        ),
    }
}

fn read_many(scalar: &ScalarPlan, header: &str) -> String {
    match scalar.kind {
        ScalarKind::String | ScalarKind::Enum | ScalarKind::Blob => format!(
            "::shapecodec_http::header::read_many_strings(headers, {})",
            header
        ),
        ScalarKind::Timestamp(format) => format!(
            "::shapecodec_http::header::many_dates(headers, {}, {})",
            header,
            format_path(format)
        ),
        _ => format!(
            "::shapecodec_http::header::read_many::<{}>(headers, {})",
            primitive(scalar),
            header
        ),
    }
}

fn primitive(scalar: &ScalarPlan) -> &'static str {
    match scalar.kind {
        ScalarKind::Boolean => "bool",
        ScalarKind::Byte => "i8",
        ScalarKind::Short => "i16",
        ScalarKind::Integer => "i32",
        ScalarKind::Long => "i64",
        ScalarKind::Float => "f32",
        _ => "f64",
    }
}

/// Emits one read per header binding.
pub(crate) fn render_header_reads(
    w: &mut RustWriter,
    plan: &CodecPlan,
    vars: &Bindings,
    headers: &[HeaderBinding],
) {
    for binding in headers {
        let header = literal(&binding.header);
        let raw = vars.fresh("var");
        let value = match &binding.value {
            HeaderValue::Scalar(scalar) => {
                w.line(format!(
                    "let {} = {}{};",
                    raw,
                    read_one(scalar, &header),
                    TO_DESERIALIZATION_ERROR
                ));
                match scalar.kind {
                    ScalarKind::Enum => format!(
                        "{}.map(|value| {}::from(value.as_str()))",
                        raw,
                        scalar_type(plan, scalar)
                    ),
                    ScalarKind::Blob => {
                        let decoded = vars.fresh("var");
                        w.line(format!(
                            "let {} = {}.map(|value| ::shapecodec_types::base64::decode(value).map(::shapecodec_types::Blob::new)).transpose(){};",
                            decoded, raw, TO_DESERIALIZATION_ERROR
                        ));
                        decoded
                    }
                    _ => raw,
                }
            }
            HeaderValue::List(scalar) => {
                w.line(format!(
                    "let {} = {}{};",
                    raw,
                    read_many(scalar, &header),
                    TO_DESERIALIZATION_ERROR
                ));
                let items = match scalar.kind {
                    ScalarKind::Enum => {
                        let converted = vars.fresh("var");
                        w.line(format!(
                            "let {}: ::std::vec::Vec<{}> = {}.iter().map(|value| {}::from(value.as_str())).collect();",
                            converted,
                            scalar_type(plan, scalar),
                            raw,
                            scalar_type(plan, scalar)
                        ));
                        converted
                    }
                    ScalarKind::Blob => {
                        let decoded = vars.fresh("var");
                        w.line(format!(
                            "let {} = {}.into_iter().map(|value| ::shapecodec_types::base64::decode(value).map(::shapecodec_types::Blob::new)).collect::<::std::result::Result<::std::vec::Vec<_>, _>>(){};",
                            decoded, raw, TO_DESERIALIZATION_ERROR
                        ));
                        decoded
                    }
                    _ => raw,
                };
                format!("(!{}.is_empty()).then_some({})", items, items)
            }
        };
        w.line(format!(
            "builder = builder.{}({});",
            naming::setter(&binding.field),
            value
        ));
    }
}

/// Emits the status code binding, if there is one.
pub(crate) fn render_response_code(w: &mut RustWriter, member: Option<&str>) {
    if let Some(member) = member {
        w.line(format!(
            "builder = builder.{}(Some(i32::from(status)));",
            naming::setter(&naming::field_name(member))
        ));
    }
}

/// `request` or `response`.
pub(crate) fn message(side: PayloadSide) -> &'static str {
    match side {
        PayloadSide::Input => "request",
        PayloadSide::Output => "response",
    }
}

/// Opens a payload decoder. Request decoders only see the body.
pub(crate) fn payload_decoder_open(payload: &PayloadPlan, name: &str, output: &str) -> String {
    match payload.side {
        PayloadSide::Input => format!(
            "pub fn {}(body: &[u8]) -> ::std::result::Result<{}, ::shapecodec_http::DeserializationError> {{",
            name, output
        ),
        PayloadSide::Output => format!(
            "pub fn {}(status: u16, headers: &::http::HeaderMap, body: &[u8]) -> ::std::result::Result<{}, ::shapecodec_http::DeserializationError> {{",
            name, output
        ),
    }
}

/// The match arm returning a blob or string `@httpPayload` member as the raw body.
pub(crate) fn raw_payload_arm(member: &MemberPlan, var: &str) -> Option<String> {
    match &member.value {
        ValuePlan::Scalar(ScalarPlan {
            kind: ScalarKind::Blob,
            ..
        }) => Some(format!("Some({}) => Ok({}.as_ref().to_vec()),", var, var)),
        ValuePlan::Scalar(ScalarPlan {
            kind: ScalarKind::String | ScalarKind::Enum,
            ..
        }) => Some(format!(
            "Some({}) => Ok({}.as_str().as_bytes().to_vec()),",
            var, var
        )),
        _ => None,
    }
}

/// Reads a blob or string `@httpPayload` member from the raw body. Returns `false` for members
/// the body codec has to decode.
pub(crate) fn render_raw_payload_read(
    w: &mut RustWriter,
    plan: &CodecPlan,
    member: &MemberPlan,
) -> bool {
    let setter = naming::setter(&member.field);
    match &member.value {
        ValuePlan::Scalar(ScalarPlan {
            kind: ScalarKind::Blob,
            ..
        }) => {
            w.block("if !body.is_empty() {", "}", |w| {
                w.line(format!(
                    "builder = builder.{}(Some(::shapecodec_types::Blob::new(body)));",
                    setter
                ));
            });
            true
        }
        ValuePlan::Scalar(
            scalar @ ScalarPlan {
                kind: ScalarKind::String | ScalarKind::Enum,
                ..
            },
        ) => {
            w.block("if !body.is_empty() {", "}", |w| {
                w.line(format!(
                    "let text = ::std::str::from_utf8(body){};",
                    TO_DESERIALIZATION_ERROR
                ));
                let value = match scalar.kind {
                    ScalarKind::Enum => format!("{}::from(text)", scalar_type(plan, scalar)),
                    _ => "text.to_owned()".to_owned(),
                };
                w.line(format!("builder = builder.{}(Some({}));", setter, value));
            });
            true
        }
        _ => false,
    }
}
