/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use anyhow::{bail, Context};
use clap::Parser;
use shapecodec_codegen::model::{loader, Model, ShapeId};
use shapecodec_codegen::{generate, CodegenSettings, Protocol};
use shapecodec_types::date_time::Format;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(
    name = "shapecodec",
    about = "Generates protocol codecs for a Smithy service from its JSON AST model",
    version
)]
struct Args {
    /// Path to the Smithy JSON AST model
    model: PathBuf,

    /// Service to generate, e.g. `example.weather#Weather`. May be omitted when the model has
    /// exactly one service.
    #[clap(long)]
    service: Option<String>,

    /// Generate for this protocol instead of the service's protocol trait
    #[clap(long)]
    protocol: Option<Protocol>,

    /// Where to write the generated module. Defaults to stdout.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Module holding the generated shape types
    #[clap(long, default_value = "crate::types")]
    model_module: String,

    /// Module holding the generated error types
    #[clap(long, default_value = "crate::types::error")]
    error_module: String,

    /// Header carrying the JSON error discriminator
    #[clap(long)]
    error_type_header: Option<String>,

    /// Ignore `@jsonName` when naming restJson1 members
    #[clap(long)]
    ignore_json_name: bool,

    /// Default timestamp format: `date-time`, `http-date` or `epoch-seconds`
    #[clap(long, value_parser = parse_format)]
    timestamp_format: Option<Format>,

    /// Apply the S3 customizations
    #[clap(long)]
    s3: bool,
}

fn parse_format(value: &str) -> Result<Format, String> {
    Format::from_trait_value(value).ok_or_else(|| {
        format!(
            "unknown timestamp format `{}`; expected date-time, http-date or epoch-seconds",
            value
        )
    })
}

impl Args {
    fn settings(&self) -> CodegenSettings {
        let mut builder = CodegenSettings::builder()
            .model_module(&self.model_module)
            .error_module(&self.error_module)
            .use_json_name(!self.ignore_json_name)
            .s3(self.s3);
        if let Some(protocol) = self.protocol {
            builder = builder.protocol(protocol);
        }
        if let Some(header) = &self.error_type_header {
            builder = builder.error_type_header(header);
        }
        if let Some(format) = self.timestamp_format {
            builder = builder.default_timestamp_format(format);
        }
        builder.build()
    }

    fn service(&self, model: &Model) -> anyhow::Result<ShapeId> {
        if let Some(service) = &self.service {
            return Ok(ShapeId::new(service.as_str()));
        }
        let mut services = model.services();
        match (services.next(), services.next()) {
            (Some(service), None) => Ok(service.id().clone()),
            (None, _) => bail!("the model defines no service"),
            (Some(_), Some(_)) => bail!("the model defines several services; pick one with --service"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let input = fs::read(&args.model)
        .with_context(|| format!("failed to read {}", args.model.display()))?;
    let model = loader::load_json_ast(&input)
        .with_context(|| format!("failed to load {}", args.model.display()))?;
    let service = args.service(&model)?;
    let module = generate(&model, &service, &args.settings())
        .with_context(|| format!("failed to generate {}", service))?;
    tracing::info!(
        service = %service,
        protocol = %module.protocol(),
        routines = module.routines().len(),
        "generated"
    );

    match &args.output {
        Some(path) => fs::write(path, module.source())
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{}", module.source()),
    }
    Ok(())
}
