/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Renders `de_*_http_error`: error response to modeled error.

use crate::ir::{CodecPlan, Discriminator, ErrorDispatchPlan};
use crate::protocol::literal;
use crate::writer::RustWriter;
use shapecodec_xml::errors::ErrorWrapping;

fn wrapping_path(wrapping: ErrorWrapping) -> &'static str {
    match wrapping {
        ErrorWrapping::Wrapped => "::shapecodec_xml::errors::ErrorWrapping::Wrapped",
        ErrorWrapping::Unwrapped => "::shapecodec_xml::errors::ErrorWrapping::Unwrapped",
    }
}

pub(crate) fn render_error_dispatch(
    w: &mut RustWriter,
    plan: &CodecPlan,
    name: &str,
    dispatch: &ErrorDispatchPlan,
) {
    let error_enum = plan.operation_error_path(&dispatch.operation);
    w.line(format!(
        "/// Maps an error response of `{}` to its modeled error.",
        dispatch.operation.name()
    ));
    w.line("#[allow(clippy::unnecessary_wraps, unused_variables)]");
    w.block(
        format!(
            "pub fn {}(status: u16, headers: &::http::HeaderMap, body: &[u8]) -> {} {{",
            name, error_enum
        ),
        "}",
        |w| {
            w.line("#[allow(unused_mut)]");
            match &dispatch.discriminator {
                Discriminator::Json { header } => {
                    w.block(
                        format!(
                            "let mut generic_builder = match ::shapecodec_json::errors::parse_error_metadata(body, headers, {}) {{",
                            literal(header)
                        ),
                        "};",
                        |w| {
                            w.line("Ok(builder) => builder,");
                            w.block("Err(err) => {", "}", |w| {
                                w.line("::tracing::debug!(error = %err, \"error body is not a JSON object\");");
                                w.line(format!(
                                    "::shapecodec_json::errors::error_metadata_from_headers(headers, {})",
                                    literal(header)
                                ));
                            });
                        },
                    );
                }
                Discriminator::Xml(wrapping) => {
                    w.block(
                        format!(
                            "let mut generic_builder = match ::shapecodec_xml::errors::parse_error_metadata(body, {}) {{",
                            wrapping_path(*wrapping)
                        ),
                        "};",
                        |w| {
                            w.line("Ok(builder) => builder,");
                            w.block("Err(err) => {", "}", |w| {
                                w.line("::tracing::debug!(error = %err, \"error body is not an XML error\");");
                                w.line("::shapecodec_types::ErrorMetadata::builder()");
                            });
                        },
                    );
                }
            }
            if dispatch.s3_request_ids {
                w.line("generic_builder = ::shapecodec_http::request_id::apply_s3_request_ids(generic_builder, headers);");
            }
            w.line("let generic = generic_builder.build();");
            w.block("let error_code = match generic.code() {", "};", |w| {
                w.line("Some(code) => code,");
                if dispatch.status_fallback.is_empty() {
                    w.line(format!("None => return {}::generic(generic),", error_enum));
                } else {
                    w.block("None => match status {", "},", |w| {
                        for (status, code) in &dispatch.status_fallback {
                            w.line(format!("{} => {},", status, literal(code)));
                        }
                        w.line(format!("_ => return {}::generic(generic),", error_enum));
                    });
                }
            });
            w.block("match error_code {", "}", |w| {
                for case in &dispatch.cases {
                    w.block(
                        format!(
                            "{} => match {}(headers, body, {}::default()) {{",
                            literal(&case.code),
                            case.decoder,
                            plan.error_builder_path(&case.error)
                        ),
                        "},",
                        |w| {
                            w.line(format!(
                                "Ok(builder) => {}::{}(builder.meta(generic.clone()).build()),",
                                error_enum,
                                case.error.name()
                            ));
                            w.block("Err(err) => {", "}", |w| {
                                w.line(format!(
                                    "::tracing::debug!(error = %err, code = {}, \"failed to decode modeled error\");",
                                    literal(&case.code)
                                ));
                                w.line(format!("{}::generic(generic.clone())", error_enum));
                            });
                        },
                    );
                }
                w.line(format!("_ => {}::generic(generic.clone()),", error_enum));
            });
        },
    );
}
