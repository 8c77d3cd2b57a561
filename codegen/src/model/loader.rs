/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Loads a model from the Smithy JSON AST.
//!
//! Only the parts of the AST the codec generator reads are interpreted: shapes, members, the
//! traits listed on [`Traits`], operations, services (including operations reachable through
//! resources) and the protocol trait of each service. Everything else is ignored.

use super::{
    ApplyTraits, ErrorFault, Member, Model, ModelError, Operation, Service, Shape, ShapeKind,
    Traits, XmlNamespace,
};
use crate::protocol::Protocol;
use serde_json::{Map, Value};
use shapecodec_types::date_time::Format;
use std::collections::{BTreeSet, HashMap};

type JsonObject = Map<String, Value>;

fn invalid(location: &str, message: impl Into<String>) -> ModelError {
    ModelError::InvalidAst {
        location: location.to_owned(),
        message: message.into(),
    }
}

/// Parses `input` as a Smithy JSON AST document.
pub fn load_json_ast(input: &[u8]) -> Result<Model, ModelError> {
    let document: Value = serde_json::from_slice(input)?;
    let shapes = document
        .get("shapes")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("$", "missing `shapes` object"))?;

    let mut builder = Model::builder();
    let mut resources: HashMap<&str, &JsonObject> = HashMap::new();
    let mut services = Vec::new();
    for (id, shape) in shapes {
        let shape = shape
            .as_object()
            .ok_or_else(|| invalid(id, "shape must be an object"))?;
        let type_name = shape
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(id, "missing `type`"))?;
        match type_name {
            "operation" => builder.push_operation(load_operation(id, shape)?),
            "service" => services.push((id.as_str(), shape)),
            "resource" => {
                resources.insert(id.as_str(), shape);
            }
            other => match ShapeKind::from_type_name(other) {
                Some(kind) => builder.push_shape(load_shape(id, kind, type_name, shape)?),
                None => tracing::debug!(shape = %id, type_name = other, "ignoring unsupported shape type"),
            },
        }
    }
    for (id, service) in services {
        builder.push_service(load_service(id, service, &resources)?);
    }
    builder.build()
}

fn target<'a>(location: &str, value: &'a Value) -> Result<&'a str, ModelError> {
    value
        .get("target")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(location, "missing `target`"))
}

fn targets(location: &str, value: Option<&Value>) -> Result<Vec<String>, ModelError> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| target(location, item).map(str::to_owned))
            .collect(),
        Some(_) => Err(invalid(location, "expected an array of targets")),
    }
}

fn load_shape(
    id: &str,
    kind: ShapeKind,
    type_name: &str,
    shape: &JsonObject,
) -> Result<Shape, ModelError> {
    let mut out = Shape::new(id, kind).with_traits(load_traits(id, shape.get("traits"))?);
    match kind {
        ShapeKind::List | ShapeKind::Set => {
            let member = shape
                .get("member")
                .ok_or_else(|| invalid(id, "missing `member`"))?;
            out = out.member(load_member(id, "member", member)?);
        }
        ShapeKind::Map => {
            for name in ["key", "value"] {
                let member = shape
                    .get(name)
                    .ok_or_else(|| invalid(id, format!("missing `{}`", name)))?;
                out = out.member(load_member(id, name, member)?);
            }
        }
        _ => {}
    }
    if let Some(members) = shape.get("members").and_then(Value::as_object) {
        if type_name == "enum" {
            let values = members
                .iter()
                .map(|(name, member)| {
                    member
                        .pointer("/traits/smithy.api#enumValue")
                        .and_then(Value::as_str)
                        .unwrap_or(name)
                        .to_owned()
                })
                .collect::<Vec<_>>();
            out = out.enum_values(values);
        } else if type_name != "intEnum" {
            for (name, member) in members {
                out = out.member(load_member(id, name, member)?);
            }
        }
    }
    Ok(out)
}

fn load_member(shape_id: &str, name: &str, member: &Value) -> Result<Member, ModelError> {
    let location = format!("{}${}", shape_id, name);
    let target = target(&location, member)?;
    Ok(Member::new(name, target).with_traits(load_traits(&location, member.get("traits"))?))
}

fn load_traits(location: &str, traits: Option<&Value>) -> Result<Traits, ModelError> {
    let mut out = Traits::default();
    let traits = match traits {
        None => return Ok(out),
        Some(Value::Object(traits)) => traits,
        Some(_) => return Err(invalid(location, "`traits` must be an object")),
    };
    let string = |value: &Value, name: &str| -> Result<String, ModelError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| invalid(location, format!("`{}` must be a string", name)))
    };
    for (id, value) in traits {
        match id.as_str() {
            "smithy.api#required" => out.required = true,
            "smithy.api#enum" => {
                let values = value
                    .as_array()
                    .ok_or_else(|| invalid(location, "`enum` must be an array"))?
                    .iter()
                    .map(|def| {
                        def.get("value")
                            .and_then(Value::as_str)
                            .map(str::to_owned)
                            .ok_or_else(|| invalid(location, "enum definition without `value`"))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                out.enum_values = Some(values);
            }
            "smithy.api#timestampFormat" => {
                let format = string(value, "timestampFormat")?;
                out.timestamp_format = Some(Format::from_trait_value(&format).ok_or_else(
                    || invalid(location, format!("unknown timestamp format `{}`", format)),
                )?);
            }
            "smithy.api#xmlName" => out.xml_name = Some(string(value, "xmlName")?),
            "smithy.api#xmlAttribute" => out.xml_attribute = true,
            "smithy.api#xmlFlattened" => out.xml_flattened = true,
            "smithy.api#xmlNamespace" => {
                let uri = value
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid(location, "`xmlNamespace` without `uri`"))?;
                out.xml_namespace = Some(XmlNamespace {
                    uri: uri.to_owned(),
                    prefix: value.get("prefix").and_then(Value::as_str).map(str::to_owned),
                });
            }
            "smithy.api#jsonName" => out.json_name = Some(string(value, "jsonName")?),
            "smithy.api#noSerialize" => out.no_serialize = true,
            "smithy.api#sparse" => out.sparse = true,
            "smithy.api#error" => {
                out.error = Some(match string(value, "error")?.as_str() {
                    "client" => ErrorFault::Client,
                    "server" => ErrorFault::Server,
                    other => return Err(invalid(location, format!("unknown error fault `{}`", other))),
                })
            }
            "smithy.api#httpError" => {
                let status = value
                    .as_u64()
                    .and_then(|status| u16::try_from(status).ok())
                    .ok_or_else(|| invalid(location, "`httpError` must be a status code"))?;
                out.http_error = Some(status);
            }
            "smithy.api#httpHeader" => out.http_header = Some(string(value, "httpHeader")?),
            "smithy.api#httpQuery" => out.http_query = Some(string(value, "httpQuery")?),
            "smithy.api#httpLabel" => out.http_label = true,
            "smithy.api#httpPayload" => out.http_payload = true,
            "smithy.api#httpResponseCode" => out.http_response_code = true,
            "smithy.api#mediaType" => out.media_type = Some(string(value, "mediaType")?),
            _ => {}
        }
    }
    Ok(out)
}

fn load_operation(id: &str, shape: &JsonObject) -> Result<Operation, ModelError> {
    let mut operation = Operation::new(id);
    if let Some(input) = shape.get("input") {
        operation = operation.input(target(id, input)?);
    }
    if let Some(output) = shape.get("output") {
        operation = operation.output(target(id, output)?);
    }
    for error in targets(id, shape.get("errors"))? {
        operation = operation.error(error);
    }
    Ok(operation)
}

fn load_service(
    id: &str,
    shape: &JsonObject,
    resources: &HashMap<&str, &JsonObject>,
) -> Result<Service, ModelError> {
    let traits = shape.get("traits").and_then(Value::as_object);
    let (protocol, protocol_trait) = traits
        .into_iter()
        .flatten()
        .find_map(|(trait_id, value)| {
            Protocol::from_trait_id(trait_id).map(|protocol| (protocol, value))
        })
        .ok_or_else(|| invalid(id, "service has no supported protocol trait"))?;
    let version = shape.get("version").and_then(Value::as_str).unwrap_or_default();
    let mut service = Service::new(id, version, protocol);
    if protocol_trait
        .get("noErrorWrapping")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        service = service.no_error_wrapping();
    }

    let mut operations = BTreeSet::new();
    operations.extend(targets(id, shape.get("operations"))?);
    let mut pending = targets(id, shape.get("resources"))?;
    let mut seen = BTreeSet::new();
    while let Some(resource_id) = pending.pop() {
        if !seen.insert(resource_id.clone()) {
            continue;
        }
        let resource = resources
            .get(resource_id.as_str())
            .ok_or_else(|| invalid(&resource_id, "resource is not defined"))?;
        for lifecycle in ["create", "put", "read", "update", "delete", "list"] {
            if let Some(operation) = resource.get(lifecycle) {
                operations.insert(target(&resource_id, operation)?.to_owned());
            }
        }
        operations.extend(targets(&resource_id, resource.get("operations"))?);
        operations.extend(targets(&resource_id, resource.get("collectionOperations"))?);
        pending.extend(targets(&resource_id, resource.get("resources"))?);
    }
    for operation in operations {
        service = service.operation(operation);
    }
    Ok(service)
}

#[cfg(test)]
mod test {
    use super::load_json_ast;
    use crate::model::{ErrorFault, ModelError, ShapeId, ShapeKind};
    use crate::protocol::Protocol;
    use shapecodec_types::date_time::Format;

    const MODEL: &str = r##"{
        "smithy": "2.0",
        "shapes": {
            "example#Weather": {
                "type": "service",
                "version": "2006-03-01",
                "operations": [{ "target": "example#GetCity" }],
                "resources": [{ "target": "example#Forecast" }],
                "traits": { "aws.protocols#restXml": { "noErrorWrapping": true } }
            },
            "example#Forecast": {
                "type": "resource",
                "read": { "target": "example#GetForecast" }
            },
            "example#GetForecast": { "type": "operation" },
            "example#GetCity": {
                "type": "operation",
                "input": { "target": "example#GetCityInput" },
                "errors": [{ "target": "example#NoSuchCity" }]
            },
            "example#GetCityInput": {
                "type": "structure",
                "members": {
                    "cityId": {
                        "target": "smithy.api#String",
                        "traits": { "smithy.api#required": {}, "smithy.api#xmlName": "CityId" }
                    },
                    "since": {
                        "target": "smithy.api#Timestamp",
                        "traits": { "smithy.api#timestampFormat": "http-date" }
                    },
                    "tags": { "target": "example#Tags" }
                },
                "traits": { "smithy.api#xmlNamespace": { "uri": "https://example.com", "prefix": "ex" } }
            },
            "example#Tags": {
                "type": "map",
                "key": { "target": "smithy.api#String" },
                "value": { "target": "example#Color" }
            },
            "example#Color": {
                "type": "enum",
                "members": {
                    "RED": { "target": "smithy.api#Unit", "traits": { "smithy.api#enumValue": "red" } },
                    "BLUE": { "target": "smithy.api#Unit" }
                }
            },
            "example#NoSuchCity": {
                "type": "structure",
                "members": {},
                "traits": { "smithy.api#error": "client", "smithy.api#httpError": 404 }
            },
            "example#Ignored": { "type": "mixin-ish" }
        }
    }"##;

    #[test]
    fn load_model() {
        let model = load_json_ast(MODEL.as_bytes()).unwrap();
        let service = model.service(&ShapeId::new("example#Weather")).unwrap();
        assert_eq!(service.protocol(), Protocol::RestXml);
        assert!(service.has_no_error_wrapping());
        assert_eq!(service.version(), "2006-03-01");
        assert_eq!(
            service.operations(),
            [ShapeId::new("example#GetCity"), ShapeId::new("example#GetForecast")]
        );

        let input = model.shape(&ShapeId::new("example#GetCityInput")).unwrap();
        let city = input.member_named("cityId").unwrap();
        assert!(city.traits().required);
        assert_eq!(city.traits().xml_name.as_deref(), Some("CityId"));
        assert_eq!(
            input.member_named("since").unwrap().traits().timestamp_format,
            Some(Format::HttpDate)
        );
        let ns = input.traits().xml_namespace.as_ref().unwrap();
        assert_eq!(ns.prefix.as_deref(), Some("ex"));

        let color = model.shape(&ShapeId::new("example#Color")).unwrap();
        assert_eq!(color.kind(), ShapeKind::String);
        // members without an explicit `enumValue` use their name
        assert_eq!(
            color.traits().enum_values.as_deref(),
            Some(&["BLUE".to_owned(), "red".to_owned()][..])
        );

        let error = model.shape(&ShapeId::new("example#NoSuchCity")).unwrap();
        assert_eq!(error.traits().error, Some(ErrorFault::Client));
        assert_eq!(error.traits().http_error, Some(404));
    }

    #[test]
    fn service_without_protocol_is_rejected() {
        let err = load_json_ast(
            br#"{"shapes": {"a#S": {"type": "service", "version": "1"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidAst { .. }), "{}", err);
    }

    #[test]
    fn invalid_json_is_rejected() {
        let err = load_json_ast(b"{").unwrap_err();
        assert!(matches!(err, ModelError::InvalidJson(_)));
    }
}
