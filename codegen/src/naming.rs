/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Deterministic names for generated routines and fields.

use crate::ir::{Direction, PayloadSide, RoutineKind};
use crate::model::ShapeId;
use crate::protocol::Protocol;

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Converts a shape or member name to `snake_case`.
///
/// Acronyms stay together (`HTTPResponse` becomes `http_response`) and digits stick to the word
/// before them (`S3Key` becomes `s3_key`).
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Converts a member name to `PascalCase`, for union variants.
pub fn to_pascal_case(name: &str) -> String {
    to_snake_case(name)
        .split('_')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Field name for a member, escaped when it collides with a Rust keyword.
pub fn field_name(member: &str) -> String {
    let snake = to_snake_case(member);
    if RUST_KEYWORDS.contains(&snake.as_str()) {
        match snake.as_str() {
            // raw identifiers can't spell these
            "self" | "Self" | "crate" | "super" => format!("{}_value", snake),
            _ => format!("r#{}", snake),
        }
    } else {
        snake
    }
}

/// Builder setter for a field, e.g. `set_type` for `r#type`.
pub(crate) fn setter(field: &str) -> String {
    format!("set_{}", field.trim_start_matches("r#"))
}

/// `ser_{protocol}_{shape}`, `de_{protocol}_{shape}` or `de_{protocol}_{shape}_unwrapped`.
pub fn shape_routine(protocol: Protocol, shape: &ShapeId, kind: RoutineKind) -> String {
    let snake = to_snake_case(shape.name());
    match kind {
        RoutineKind::Encode => format!("ser_{}_{}", protocol.slug(), snake),
        RoutineKind::Decode => format!("de_{}_{}", protocol.slug(), snake),
        RoutineKind::DecodeUnwrapped => format!("de_{}_{}_unwrapped", protocol.slug(), snake),
    }
}

/// `ser_{protocol}_{operation}_input`, `de_{protocol}_{operation}_output` and so on.
pub fn payload_routine(
    protocol: Protocol,
    operation: &ShapeId,
    side: PayloadSide,
    direction: Direction,
) -> String {
    let prefix = match direction {
        Direction::Encode => "ser",
        Direction::Decode => "de",
    };
    let suffix = match side {
        PayloadSide::Input => "input",
        PayloadSide::Output => "output",
    };
    format!(
        "{}_{}_{}_{}",
        prefix,
        protocol.slug(),
        to_snake_case(operation.name()),
        suffix
    )
}

/// `de_{protocol}_{error}_error_body`
pub fn error_body_routine(protocol: Protocol, error: &ShapeId) -> String {
    format!(
        "de_{}_{}_error_body",
        protocol.slug(),
        to_snake_case(error.name())
    )
}

/// `de_{protocol}_{operation}_http_error`
pub fn http_error_routine(protocol: Protocol, operation: &ShapeId) -> String {
    format!(
        "de_{}_{}_http_error",
        protocol.slug(),
        to_snake_case(operation.name())
    )
}

/// `validate_{shape}`
pub fn validate_routine(shape: &ShapeId) -> String {
    format!("validate_{}", to_snake_case(shape.name()))
}

#[cfg(test)]
mod test {
    use super::{field_name, shape_routine, to_pascal_case, to_snake_case};
    use crate::ir::RoutineKind;
    use crate::model::ShapeId;
    use crate::protocol::Protocol;

    #[test]
    fn snake_case() {
        assert_eq!(to_snake_case("GetFooInput"), "get_foo_input");
        assert_eq!(to_snake_case("HTTPResponse"), "http_response");
        assert_eq!(to_snake_case("S3Key"), "s3_key");
        assert_eq!(to_snake_case("fooBar"), "foo_bar");
        assert_eq!(to_snake_case("Items2"), "items2");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("with-dash"), "with_dash");
        assert_eq!(to_snake_case("ListOfXMLs"), "list_of_xm_ls");
    }

    #[test]
    fn pascal_case() {
        assert_eq!(to_pascal_case("stringValue"), "StringValue");
        assert_eq!(to_pascal_case("s3_key"), "S3Key");
        assert_eq!(to_pascal_case("Unit"), "Unit");
    }

    #[test]
    fn keywords_are_escaped() {
        assert_eq!(field_name("Type"), "r#type");
        assert_eq!(field_name("Self"), "self_value");
        assert_eq!(field_name("Name"), "name");
    }

    #[test]
    fn routine_names() {
        let id = ShapeId::new("ns#RecursiveShapes");
        assert_eq!(
            shape_routine(Protocol::AwsJson11, &id, RoutineKind::Encode),
            "ser_aws_json_11_recursive_shapes"
        );
        assert_eq!(
            shape_routine(Protocol::RestXml, &id, RoutineKind::DecodeUnwrapped),
            "de_rest_xml_recursive_shapes_unwrapped"
        );
    }
}
