/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use super::{json, read_headers, xml, Value};
use crate::ir::{CodecPlan, Discriminator, ErrorCase, ErrorFraming, RoutineBody};
use crate::model::ShapeId;
use shapecodec_http::request_id::apply_s3_request_ids;
use shapecodec_http::{with_snapshot, DeserializationError};
use shapecodec_types::ErrorMetadata;
use std::collections::BTreeMap;
use thiserror::Error;

/// An error response, after dispatch.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The response matched a declared error and its body decoded.
    #[error("{error}: {}", .meta.message().unwrap_or("no message"))]
    Modeled {
        /// The matched error shape
        error: ShapeId,
        /// The decoded error members
        value: Value,
        /// Code, message and request ids
        meta: ErrorMetadata,
    },
    /// The code was missing, unknown, or its body failed to decode.
    #[error("unhandled error (code: {})", .0.code().unwrap_or("none"))]
    Unhandled(ErrorMetadata),
}

impl OperationError {
    /// Generic metadata of either variant.
    pub fn meta(&self) -> &ErrorMetadata {
        match self {
            OperationError::Modeled { meta, .. } => meta,
            OperationError::Unhandled(meta) => meta,
        }
    }

    /// The error code, if the response carried one.
    pub fn code(&self) -> Option<&str> {
        self.meta().code()
    }

    /// The matched error shape and its members.
    pub fn modeled(&self) -> Option<(&ShapeId, &Value)> {
        match self {
            OperationError::Modeled { error, value, .. } => Some((error, value)),
            OperationError::Unhandled(_) => None,
        }
    }
}

pub(super) fn dispatch<B: AsRef<[u8]>>(
    plan: &CodecPlan,
    operation: &ShapeId,
    response: &http::Response<B>,
) -> OperationError {
    let body = response.body().as_ref();
    let headers = response.headers();
    let dispatch = match plan
        .operation(operation)
        .and_then(|operation| plan.routine_named(&operation.http_error))
        .map(|routine| &routine.body)
    {
        Some(RoutineBody::ErrorDispatch(dispatch)) => dispatch,
        _ => {
            tracing::debug!(operation = %operation, "no error dispatcher was planned");
            return OperationError::Unhandled(ErrorMetadata::default());
        }
    };

    let mut generic_builder = match &dispatch.discriminator {
        Discriminator::Json { header } => {
            match shapecodec_json::errors::parse_error_metadata(body, headers, header) {
                Ok(builder) => builder,
                Err(err) => {
                    tracing::debug!(error = %err, "error body is not a JSON object");
                    shapecodec_json::errors::error_metadata_from_headers(headers, header)
                }
            }
        }
        Discriminator::Xml(wrapping) => {
            match shapecodec_xml::errors::parse_error_metadata(body, *wrapping) {
                Ok(builder) => builder,
                Err(err) => {
                    tracing::debug!(error = %err, "error body is not an XML error");
                    ErrorMetadata::builder()
                }
            }
        }
    };
    if dispatch.s3_request_ids {
        generic_builder = apply_s3_request_ids(generic_builder, headers);
    }
    let generic = generic_builder.build();

    let code = match generic
        .code()
        .or_else(|| dispatch.code_for_status(response.status().as_u16()))
    {
        Some(code) => code.to_owned(),
        None => return OperationError::Unhandled(generic),
    };
    let case = match dispatch.case(&code) {
        Some(case) => case,
        None => return OperationError::Unhandled(generic),
    };
    match decode_error(plan, case, headers, body) {
        Ok(value) => OperationError::Modeled {
            error: case.error.clone(),
            value,
            meta: generic,
        },
        Err(err) => {
            tracing::debug!(error = %err, code = %case.code, "failed to decode modeled error");
            OperationError::Unhandled(generic)
        }
    }
}

fn decode_error(
    plan: &CodecPlan,
    case: &ErrorCase,
    headers: &http::HeaderMap,
    body: &[u8],
) -> Result<Value, DeserializationError> {
    let error = match plan.routine_named(&case.decoder).map(|routine| &routine.body) {
        Some(RoutineBody::ErrorBody(error)) => error,
        _ => {
            return Err(DeserializationError::from_body(
                format!("routine {} is not in the plan", case.decoder),
                body,
            ))
        }
    };
    let mut members = BTreeMap::new();
    read_headers(headers, &error.headers, &mut members)
        .map_err(|err| DeserializationError::from_body(err, body))?;
    let decoded = match error.framing {
        ErrorFraming::Json => with_snapshot(body, |body| json::read_error(plan, error, body)),
        ErrorFraming::Xml(_) => with_snapshot(body, |body| xml::read_error(plan, error, body)),
    }?;
    members.extend(decoded);
    Ok(Value::Structure(members))
}

#[cfg(test)]
mod test {
    use super::{dispatch, OperationError};
    use crate::interpret::Value;
    use crate::ir::{
        CodecPlan, Discriminator, ErrorBodyPlan, ErrorCase, ErrorDispatchPlan, ErrorFraming,
        MemberPlan, OperationPlan, Routine, RoutineBody, RoutineKey, ScalarKind, ScalarPlan,
        ValuePlan, XmlLocation,
    };
    use crate::model::{ErrorFault, ShapeId};
    use crate::protocol::Protocol;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn plan() -> CodecPlan {
        let mut plan = CodecPlan::empty(Protocol::RestJson1);
        let operation = ShapeId::new("ns#GetThing");
        let body = Routine {
            name: "de_throttling_exception_json_err".to_owned(),
            key: RoutineKey::ErrorBody(ShapeId::new("ns#ThrottlingException")),
            body: RoutineBody::ErrorBody(ErrorBodyPlan {
                error: ShapeId::new("ns#ThrottlingException"),
                framing: ErrorFraming::Json,
                members: vec![MemberPlan {
                    name: "message".to_owned(),
                    field: "message".to_owned(),
                    wire_name: "message".to_owned(),
                    required: false,
                    location: XmlLocation::Element,
                    flattened: false,
                    namespace: None,
                    value: ValuePlan::Scalar(ScalarPlan {
                        kind: ScalarKind::String,
                        shape: ShapeId::new("smithy.api#String"),
                    }),
                }],
                headers: Vec::new(),
            }),
        };
        let dispatcher = Routine {
            name: "de_get_thing_http_error".to_owned(),
            key: RoutineKey::ErrorDispatch(operation.clone()),
            body: RoutineBody::ErrorDispatch(ErrorDispatchPlan {
                operation: operation.clone(),
                discriminator: Discriminator::Json {
                    header: "x-amzn-errortype".to_owned(),
                },
                s3_request_ids: false,
                cases: vec![ErrorCase {
                    code: "ThrottlingException".to_owned(),
                    error: ShapeId::new("ns#ThrottlingException"),
                    decoder: "de_throttling_exception_json_err".to_owned(),
                    status: Some(429),
                    fault: Some(ErrorFault::Client),
                }],
                status_fallback: vec![(429, "ThrottlingException".to_owned())],
            }),
        };
        for routine in [body, dispatcher] {
            plan.routines.insert(routine.name.clone(), routine);
        }
        plan.operations.insert(
            operation.clone(),
            OperationPlan {
                operation,
                input: None,
                output: None,
                http_error: "de_get_thing_http_error".to_owned(),
                validate: None,
            },
        );
        plan
    }

    fn response(status: u16, header: Option<&str>, body: &str) -> http::Response<Vec<u8>> {
        let mut builder = http::Response::builder().status(status);
        if let Some(code) = header {
            builder = builder.header("x-amzn-errortype", code);
        }
        builder.body(body.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn header_discriminator_selects_the_modeled_error() {
        let error = dispatch(
            &plan(),
            &ShapeId::new("ns#GetThing"),
            &response(
                400,
                Some("ThrottlingException:http://internal.amazon.com/coral/ns/"),
                r#"{"message":"slow down"}"#,
            ),
        );
        let (shape, value) = error.modeled().expect("modeled");
        assert_eq!(shape, &ShapeId::new("ns#ThrottlingException"));
        assert_eq!(value, &Value::structure([("message", Value::string("slow down"))]));
        assert_eq!(error.meta().message(), Some("slow down"));
    }

    #[test]
    fn unknown_code_is_unhandled() {
        let error = dispatch(
            &plan(),
            &ShapeId::new("ns#GetThing"),
            &response(400, None, r#"{"__type":"ns#Other","message":"nope"}"#),
        );
        assert!(matches!(error, OperationError::Unhandled(_)));
        assert_eq!(error.code(), Some("Other"));
        assert_eq!(error.meta().message(), Some("nope"));
    }

    #[test]
    fn bare_status_falls_back_to_the_declared_error() {
        let error = dispatch(&plan(), &ShapeId::new("ns#GetThing"), &response(429, None, ""));
        assert_eq!(
            error.modeled().map(|(shape, _)| shape.name()),
            Some("ThrottlingException")
        );
        assert_eq!(error.code(), None);
    }

    #[test]
    #[traced_test]
    fn gateway_page_keeps_the_header_code() {
        let error = dispatch(
            &plan(),
            &ShapeId::new("ns#GetThing"),
            &response(400, Some("ThrottlingException"), "<html>Bad Gateway</html>"),
        );
        assert!(matches!(error, OperationError::Unhandled(_)));
        assert_eq!(error.code(), Some("ThrottlingException"));
        assert!(logs_contain("error body is not a JSON object"));
    }

    #[test]
    #[traced_test]
    fn undecodable_modeled_body_is_unhandled() {
        let error = dispatch(
            &plan(),
            &ShapeId::new("ns#GetThing"),
            &response(400, Some("ThrottlingException"), r#"{"message":5}"#),
        );
        assert!(matches!(error, OperationError::Unhandled(_)));
        assert_eq!(error.code(), Some("ThrottlingException"));
        assert!(logs_contain("failed to decode modeled error"));
    }
}
