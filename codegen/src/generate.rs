/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Entry points: derive the [`CodecPlan`] of a service, then render it as one Rust module.

use crate::dispatch::Dispatcher;
use crate::error::{CodegenError, Issue};
use crate::ir::CodecPlan;
use crate::model::{Model, ShapeId};
use crate::protocol::{self, Protocol};
use crate::settings::CodegenSettings;
use crate::writer::RustWriter;

/// Rendered source for one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedModule {
    protocol: Protocol,
    source: String,
    routines: Vec<String>,
}

impl GeneratedModule {
    /// Protocol the module was generated for.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The module text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of the rendered routines, in output order.
    pub fn routines(&self) -> &[String] {
        &self.routines
    }

    /// Consumes the module, returning its text.
    pub fn into_source(self) -> String {
        self.source
    }
}

/// Derives every routine `service` needs.
///
/// The protocol comes from [`CodegenSettings::protocol`] when set, else from the service. All
/// issues found along the way are reported together.
pub fn plan(
    model: &Model,
    service: &ShapeId,
    settings: &CodegenSettings,
) -> Result<CodecPlan, CodegenError> {
    let service = model
        .service(service)
        .ok_or_else(|| CodegenError::new(vec![Issue::MissingShape(service.clone())]))?;
    let protocol = settings.protocol.unwrap_or_else(|| service.protocol());
    let _span =
        tracing::debug_span!("plan", service = %service.id(), protocol = %protocol).entered();

    let mut dispatcher = Dispatcher::new(model, service, protocol, settings);
    let mut operations: Vec<&ShapeId> = service.operations().iter().collect();
    operations.sort();
    operations.dedup();
    for id in operations {
        match model.operation(id) {
            Some(operation) => dispatcher.plan_operation(operation),
            None => dispatcher.issue(Issue::MissingShape(id.clone())),
        }
    }
    let plan = dispatcher.finish()?;
    tracing::debug!(routines = plan.routines().count(), "planned service");
    Ok(plan)
}

/// Plans and renders `service`.
pub fn generate(
    model: &Model,
    service: &ShapeId,
    settings: &CodegenSettings,
) -> Result<GeneratedModule, CodegenError> {
    let plan = plan(model, service, settings)?;
    Ok(render(&plan))
}

/// Renders a plan: a fixed header, then every routine ordered by name.
pub fn render(plan: &CodecPlan) -> GeneratedModule {
    let renderer = protocol::renderer(plan);
    let mut w = RustWriter::new();
    w.line("// Code generated by shapecodec-codegen. DO NOT EDIT.");
    w.line(format!(
        "// Service: {}, protocol: {}",
        plan.service(),
        plan.protocol()
    ));
    let mut routines = Vec::new();
    for routine in plan.routines() {
        tracing::trace!(routine = %routine.name, "rendering");
        w.blank();
        renderer.render(&mut w, routine);
        routines.push(routine.name.clone());
    }
    GeneratedModule {
        protocol: plan.protocol(),
        source: w.into_string(),
        routines,
    }
}

#[cfg(test)]
mod test {
    use super::{generate, plan};
    use crate::error::Issue;
    use crate::model::{Model, Operation, Service, Shape, ShapeId};
    use crate::protocol::Protocol;
    use crate::settings::CodegenSettings;

    fn model(protocol: Protocol) -> Model {
        Model::builder()
            .shape(
                Shape::structure("ns#EchoInput")
                    .member(crate::model::Member::new("message", "smithy.api#String")),
            )
            .operation(Operation::new("ns#Echo").input("ns#EchoInput"))
            .service(Service::new("ns#Svc", "2020-01-08", protocol).operation("ns#Echo"))
            .build()
            .unwrap()
    }

    #[test]
    fn unknown_service() {
        let err = plan(
            &model(Protocol::AwsJson10),
            &ShapeId::new("ns#Other"),
            &CodegenSettings::default(),
        )
        .unwrap_err();
        assert_eq!(err.issues(), [Issue::MissingShape(ShapeId::new("ns#Other"))]);
    }

    #[test]
    fn routines_are_rendered_in_name_order() {
        let module = generate(
            &model(Protocol::AwsJson10),
            &ShapeId::new("ns#Svc"),
            &CodegenSettings::default(),
        )
        .unwrap();
        assert!(module
            .source()
            .starts_with("// Code generated by shapecodec-codegen. DO NOT EDIT.\n"));
        let mut sorted = module.routines().to_vec();
        sorted.sort();
        assert_eq!(module.routines(), sorted.as_slice());
        for name in module.routines() {
            assert!(module.source().contains(&format!("fn {}(", name)));
        }
    }

    #[test]
    fn settings_override_the_service_protocol() {
        let settings = CodegenSettings::builder().protocol(Protocol::RestXml).build();
        let module = generate(
            &model(Protocol::AwsJson10),
            &ShapeId::new("ns#Svc"),
            &settings,
        )
        .unwrap();
        assert_eq!(module.protocol(), Protocol::RestXml);
        assert!(module.source().contains("::shapecodec_xml::"));
    }
}
