/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Renders `validate_*`: every missing `@required` member, collected before anything is sent.

use crate::ir::{CodecPlan, ValidationPlan};
use crate::naming;
use crate::protocol::literal;
use crate::writer::RustWriter;

const ERROR: &str = "::shapecodec_types::error::validation::InvalidParamsError";

fn nested_check(w: &mut RustWriter, validator: &str, value: &str, path: &str) {
    w.block(
        format!("if let Err(nested) = {}({}) {{", validator, value),
        "}",
        |w| {
            w.line(format!("errors.add_nested({}, nested);", path));
        },
    );
}

pub(crate) fn render_validator(
    w: &mut RustWriter,
    plan: &CodecPlan,
    name: &str,
    validation: &ValidationPlan,
) {
    let shape = match validation {
        ValidationPlan::Structure { shape, .. }
        | ValidationPlan::Union { shape, .. }
        | ValidationPlan::List { shape, .. }
        | ValidationPlan::Map { shape, .. } => shape,
    };
    w.line("#[allow(unused_variables)]");
    w.block(
        format!(
            "pub fn {}(input: &{}) -> ::std::result::Result<(), {}> {{",
            name,
            plan.type_path(shape),
            ERROR
        ),
        "}",
        |w| {
            w.line("#[allow(unused_mut)]");
            w.line(format!(
                "let mut errors = {}::new({});",
                ERROR,
                literal(shape.name())
            ));
            match validation {
                ValidationPlan::Structure { members, .. } => {
                    for member in members {
                        if member.required {
                            w.block(
                                format!("if input.{}.is_none() {{", member.field),
                                "}",
                                |w| {
                                    w.line(format!(
                                        "errors.add_required({});",
                                        literal(&member.name)
                                    ));
                                },
                            );
                        }
                        if let Some(nested) = &member.nested {
                            w.block(
                                format!("if let Some(value) = &input.{} {{", member.field),
                                "}",
                                |w| nested_check(w, nested, "value", &literal(&member.name)),
                            );
                        }
                    }
                }
                ValidationPlan::Union { variants, .. } => {
                    let checked: Vec<_> = variants
                        .iter()
                        .filter_map(|v| v.nested.as_ref().map(|nested| (v, nested)))
                        .collect();
                    if !checked.is_empty() {
                        w.block("match input {", "}", |w| {
                            for (variant, nested) in checked {
                                w.block(
                                    format!(
                                        "{}::{}(value) => {{",
                                        plan.type_path(shape),
                                        naming::to_pascal_case(&variant.name)
                                    ),
                                    "}",
                                    |w| nested_check(w, nested, "value", &literal(&variant.name)),
                                );
                            }
                            w.line("_ => {}");
                        });
                    }
                }
                ValidationPlan::List {
                    element: Some(element),
                    sparse,
                    ..
                } => {
                    w.block(
                        "for (index, item) in input.iter().enumerate() {",
                        "}",
                        |w| {
                            let path = "&format!(\"[{}]\", index)";
                            if *sparse {
                                w.block("if let Some(item) = item {", "}", |w| {
                                    nested_check(w, element, "item", path)
                                });
                            } else {
                                nested_check(w, element, "item", path);
                            }
                        },
                    );
                }
                ValidationPlan::Map {
                    value: Some(validator),
                    sparse,
                    ..
                } => {
                    w.line("let mut entries: ::std::vec::Vec<_> = input.iter().collect();");
                    w.line("entries.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));");
                    w.block("for (key, value) in entries {", "}", |w| {
                        let path = "&format!(\"[{}]\", key.as_str())";
                        if *sparse {
                            w.block("if let Some(value) = value {", "}", |w| {
                                nested_check(w, validator, "value", path)
                            });
                        } else {
                            nested_check(w, validator, "value", path);
                        }
                    });
                }
                ValidationPlan::List { element: None, .. }
                | ValidationPlan::Map { value: None, .. } => {}
            }
            w.line("errors.into_result()");
        },
    );
}

#[cfg(test)]
mod test {
    use super::render_validator;
    use crate::ir::{CodecPlan, ValidatedMember, ValidationPlan};
    use crate::model::ShapeId;
    use crate::protocol::Protocol;
    use crate::writer::RustWriter;

    #[test]
    fn structure_validator() {
        let plan = CodecPlan::empty(Protocol::AwsJson10);
        let validation = ValidationPlan::Structure {
            shape: ShapeId::new("ns#PutInput"),
            members: vec![
                ValidatedMember {
                    name: "Items".to_owned(),
                    field: "items".to_owned(),
                    required: false,
                    nested: Some("validate_items".to_owned()),
                },
                ValidatedMember {
                    name: "Name".to_owned(),
                    field: "name".to_owned(),
                    required: true,
                    nested: None,
                },
            ],
        };
        let mut w = RustWriter::new();
        render_validator(&mut w, &plan, "validate_put_input", &validation);
        let out = w.into_string();
        assert!(out.contains("pub fn validate_put_input(input: &crate::types::PutInput)"));
        assert!(out.contains("if input.name.is_none() {\n        errors.add_required(\"Name\");"));
        assert!(out.contains("if let Err(nested) = validate_items(value) {"));
        assert!(out.contains("errors.add_nested(\"Items\", nested);"));
    }
}
