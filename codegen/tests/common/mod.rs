/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

#![allow(dead_code)]

use shapecodec_codegen::ir::CodecPlan;
use shapecodec_codegen::model::{ApplyTraits, ErrorFault, Member, Model, Operation, Service, Shape, ShapeId};
use shapecodec_codegen::{plan, CodegenSettings, Protocol};

pub const SERVICE: &str = "example.things#Things";
pub const PUT_THING: &str = "example.things#PutThing";

/// A service with one operation whose input and output both carry a nested `Thing`.
///
/// `flatten_tags` marks `Thing$tags` `@xmlFlattened`.
pub fn things_model(protocol: Protocol, flatten_tags: bool) -> Model {
    let tags = Member::new("tags", "example.things#Tags");
    let tags = if flatten_tags { tags.xml_flattened() } else { tags };
    Model::builder()
        .shape(
            Shape::structure("example.things#Thing")
                .member(Member::new("name", "smithy.api#String"))
                .member(Member::new("count", "smithy.api#Integer"))
                .member(Member::new("enabled", "smithy.api#Boolean"))
                .member(tags)
                .member(Member::new("attributes", "example.things#Attributes"))
                .member(Member::new("created", "smithy.api#Timestamp"))
                .member(Member::new("next", "example.things#Thing")),
        )
        .shape(Shape::list("example.things#Tags", "smithy.api#String"))
        .shape(Shape::map(
            "example.things#Attributes",
            "smithy.api#String",
            "smithy.api#Integer",
        ))
        .shape(
            Shape::list("example.things#SparseTags", "smithy.api#String").sparse(),
        )
        .shape(
            Shape::structure("example.things#PutThingInput")
                .member(Member::new("id", "smithy.api#String").required())
                .member(Member::new("thing", "example.things#Thing"))
                .member(Member::new("labels", "example.things#SparseTags")),
        )
        .shape(
            Shape::structure("example.things#PutThingOutput")
                .member(Member::new("thing", "example.things#Thing")),
        )
        .shape(
            Shape::structure("example.things#ThrottlingException")
                .error(ErrorFault::Client)
                .http_error(429)
                .member(Member::new("message", "smithy.api#String")),
        )
        .shape(
            Shape::structure("example.things#NoSuchThing")
                .error(ErrorFault::Client)
                .http_error(404)
                .member(Member::new("Message", "smithy.api#String"))
                .member(Member::new("thingId", "smithy.api#String")),
        )
        .operation(
            Operation::new(PUT_THING)
                .input("example.things#PutThingInput")
                .output("example.things#PutThingOutput")
                .error("example.things#ThrottlingException")
                .error("example.things#NoSuchThing"),
        )
        .service(Service::new(SERVICE, "2024-01-01", protocol).operation(PUT_THING))
        .build()
        .unwrap()
}

pub fn things_plan(protocol: Protocol) -> CodecPlan {
    plan_with(protocol, false, &CodegenSettings::default())
}

pub fn plan_with(protocol: Protocol, flatten_tags: bool, settings: &CodegenSettings) -> CodecPlan {
    plan(
        &things_model(protocol, flatten_tags),
        &ShapeId::new(SERVICE),
        settings,
    )
    .unwrap()
}

pub fn put_thing() -> ShapeId {
    ShapeId::new(PUT_THING)
}
