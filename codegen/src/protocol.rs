/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Wire protocols and the per-protocol scalar strategies and renderers.

use crate::ir::{CodecPlan, Routine, ScalarKind, ScalarPlan, ValuePlan};
use crate::model::Member;
use crate::settings::CodegenSettings;
use crate::writer::RustWriter;
use shapecodec_http::content_type;
use shapecodec_types::date_time::Format;
use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

pub(crate) mod error_dispatch;
pub(crate) mod http_binding;
pub(crate) mod json;
pub(crate) mod query;
pub(crate) mod validator;
pub(crate) mod xml;

/// A supported wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    /// `aws.protocols#awsJson1_0`
    AwsJson10,
    /// `aws.protocols#awsJson1_1`
    AwsJson11,
    /// `aws.protocols#restJson1`
    RestJson1,
    /// `aws.protocols#restXml`
    RestXml,
    /// `aws.protocols#awsQuery`
    AwsQuery,
}

/// Wire formats sharing one set of aggregate rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFamily {
    /// JSON bodies
    Json,
    /// XML bodies
    Xml,
    /// Form-encoded requests with XML responses
    Query,
}

const ALL: [Protocol; 5] = [
    Protocol::AwsJson10,
    Protocol::AwsJson11,
    Protocol::RestJson1,
    Protocol::RestXml,
    Protocol::AwsQuery,
];

impl Protocol {
    /// Every supported protocol.
    pub fn all() -> [Protocol; 5] {
        ALL
    }

    /// Identifier used in routine names, e.g. `aws_json_11`.
    pub fn slug(self) -> &'static str {
        match self {
            Protocol::AwsJson10 => "aws_json_10",
            Protocol::AwsJson11 => "aws_json_11",
            Protocol::RestJson1 => "rest_json_1",
            Protocol::RestXml => "rest_xml",
            Protocol::AwsQuery => "aws_query",
        }
    }

    /// Shape id of the protocol trait.
    pub fn trait_id(self) -> &'static str {
        match self {
            Protocol::AwsJson10 => "aws.protocols#awsJson1_0",
            Protocol::AwsJson11 => "aws.protocols#awsJson1_1",
            Protocol::RestJson1 => "aws.protocols#restJson1",
            Protocol::RestXml => "aws.protocols#restXml",
            Protocol::AwsQuery => "aws.protocols#awsQuery",
        }
    }

    /// Looks a protocol up by its trait id.
    pub fn from_trait_id(id: &str) -> Option<Protocol> {
        ALL.into_iter().find(|protocol| protocol.trait_id() == id)
    }

    /// The wire family whose aggregate rules apply.
    pub fn family(self) -> WireFamily {
        match self {
            Protocol::AwsJson10 | Protocol::AwsJson11 | Protocol::RestJson1 => WireFamily::Json,
            Protocol::RestXml => WireFamily::Xml,
            Protocol::AwsQuery => WireFamily::Query,
        }
    }

    /// Content type of a document request body.
    pub fn content_type(self) -> &'static str {
        match self {
            Protocol::AwsJson10 => content_type::AWS_JSON_1_0,
            Protocol::AwsJson11 => content_type::AWS_JSON_1_1,
            Protocol::RestJson1 => content_type::JSON,
            Protocol::RestXml => content_type::XML,
            Protocol::AwsQuery => content_type::FORM_URLENCODED,
        }
    }

    /// Timestamp format used when neither the member nor its target sets one.
    pub fn default_timestamp_format(self) -> Format {
        match self.family() {
            WireFamily::Json => Format::EpochSeconds,
            WireFamily::Xml | WireFamily::Query => Format::DateTime,
        }
    }

    /// True for protocols that bind members to HTTP headers, query strings and status codes.
    pub fn is_rest(self) -> bool {
        matches!(self, Protocol::RestJson1 | Protocol::RestXml)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .trait_id()
            .split_once('#')
            .map(|(_, name)| name)
            .unwrap_or_default();
        f.write_str(name)
    }
}

/// The string did not name a supported protocol.
#[derive(Debug, thiserror::Error)]
#[error("unknown protocol `{0}`; expected one of awsJson1_0, awsJson1_1, restJson1, restXml, awsQuery")]
pub struct UnknownProtocol(String);

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    /// Accepts the trait id, its short name (`restJson1`) or the slug (`rest_json_1`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.into_iter()
            .find(|protocol| {
                protocol.trait_id() == s || protocol.to_string() == s || protocol.slug() == s
            })
            .ok_or_else(|| UnknownProtocol(s.to_owned()))
    }
}

/// Name of a member on the wire.
///
/// `restJson1` honors `@jsonName` (unless disabled); the other JSON protocols use the member
/// name. XML and Query use `@xmlName`.
pub(crate) fn wire_name(protocol: Protocol, settings: &CodegenSettings, member: &Member) -> String {
    let traits = member.traits();
    let renamed = match protocol.family() {
        WireFamily::Json if protocol == Protocol::RestJson1 && settings.use_json_name => {
            traits.json_name.as_ref()
        }
        WireFamily::Json => None,
        WireFamily::Xml | WireFamily::Query => traits.xml_name.as_ref(),
    };
    renamed.cloned().unwrap_or_else(|| member.name().to_owned())
}

/// Emits the code for one scalar on one wire family.
///
/// Scalars never get routines of their own: every use site calls into the strategy, and the
/// emitted code only refers to the bindings it was handed.
pub(crate) trait ScalarStrategy {
    /// Statements writing the scalar bound (by reference) to `source` into `destination`.
    fn encode_scalar(
        &self,
        w: &mut RustWriter,
        scalar: &ScalarPlan,
        source: &str,
        destination: &str,
    );

    /// An expression decoding the scalar from `source`.
    fn decode_scalar(&self, scalar: &ScalarPlan, source: &str) -> String;
}

/// Renders routine plans as Rust source.
pub(crate) trait RenderRoutine {
    /// Writes one complete function for `routine`.
    fn render(&self, w: &mut RustWriter, routine: &Routine);
}

/// Returns the renderer for the plan's wire family.
pub(crate) fn renderer(plan: &CodecPlan) -> Box<dyn RenderRoutine + '_> {
    match plan.protocol().family() {
        WireFamily::Json => Box::new(json::JsonRenderer::new(plan)),
        WireFamily::Xml => Box::new(xml::XmlRenderer::new(plan)),
        WireFamily::Query => Box::new(query::QueryRenderer::new(plan)),
    }
}

/// Hands out binding names that are unique within one routine.
#[derive(Debug, Default)]
pub(crate) struct Bindings {
    next: Cell<usize>,
}

impl Bindings {
    /// Starts numbering again; called at the top of every routine.
    pub(crate) fn reset(&self) {
        self.next.set(0);
    }

    /// A fresh binding such as `var_3`.
    pub(crate) fn fresh(&self, prefix: &str) -> String {
        let next = self.next.get() + 1;
        self.next.set(next);
        format!("{}_{}", prefix, next)
    }
}

/// Rust expression for a timestamp format.
pub(crate) fn format_path(format: Format) -> &'static str {
    match format {
        Format::DateTime => "::shapecodec_types::date_time::Format::DateTime",
        Format::HttpDate => "::shapecodec_types::date_time::Format::HttpDate",
        Format::EpochSeconds => "::shapecodec_types::date_time::Format::EpochSeconds",
    }
}

/// Rust type of a scalar slot.
pub(crate) fn scalar_type(plan: &CodecPlan, scalar: &ScalarPlan) -> String {
    match scalar.kind {
        ScalarKind::Boolean => "bool".to_owned(),
        ScalarKind::Byte => "i8".to_owned(),
        ScalarKind::Short => "i16".to_owned(),
        ScalarKind::Integer => "i32".to_owned(),
        ScalarKind::Long => "i64".to_owned(),
        ScalarKind::Float => "f32".to_owned(),
        ScalarKind::Double => "f64".to_owned(),
        ScalarKind::String => "::std::string::String".to_owned(),
        ScalarKind::Enum => plan.type_path(&scalar.shape),
        ScalarKind::Blob => "::shapecodec_types::Blob".to_owned(),
        ScalarKind::Timestamp(_) => "::shapecodec_types::DateTime".to_owned(),
        ScalarKind::Document => "::shapecodec_types::Document".to_owned(),
    }
}

/// Rust type of any slot. Lists and maps are named type aliases in the model module.
pub(crate) fn rust_type(plan: &CodecPlan, value: &ValuePlan) -> String {
    match value {
        ValuePlan::Scalar(scalar) => scalar_type(plan, scalar),
        ValuePlan::Aggregate(aggregate) => plan.type_path(&aggregate.shape),
    }
}

/// The primitive name used in parse failure messages, e.g. ``(integer: `i32`)``.
pub(crate) fn expected(scalar: &ScalarPlan) -> String {
    let name = match scalar.kind {
        ScalarKind::Boolean => "boolean: `bool`",
        ScalarKind::Byte => "byte: `i8`",
        ScalarKind::Short => "short: `i16`",
        ScalarKind::Integer => "integer: `i32`",
        ScalarKind::Long => "long: `i64`",
        ScalarKind::Float => "float: `f32`",
        ScalarKind::Double => "double: `f64`",
        ScalarKind::String | ScalarKind::Enum => "string",
        ScalarKind::Blob => "blob",
        ScalarKind::Timestamp(_) => "timestamp",
        ScalarKind::Document => "document",
    };
    format!("expected ({})", name)
}

/// Escapes `s` for a Rust string literal.
pub(crate) fn literal(s: &str) -> String {
    format!("{:?}", s)
}

#[cfg(test)]
mod test {
    use super::{wire_name, Protocol, WireFamily};
    use crate::model::{ApplyTraits, Member};
    use crate::settings::CodegenSettings;
    use shapecodec_types::date_time::Format;

    #[test]
    fn names() {
        assert_eq!(Protocol::AwsJson11.slug(), "aws_json_11");
        assert_eq!(Protocol::RestXml.to_string(), "restXml");
        assert_eq!("awsQuery".parse::<Protocol>().unwrap(), Protocol::AwsQuery);
        assert_eq!("rest_json_1".parse::<Protocol>().unwrap(), Protocol::RestJson1);
        assert_eq!(
            "aws.protocols#awsJson1_0".parse::<Protocol>().unwrap(),
            Protocol::AwsJson10
        );
        "smithyRpcV2".parse::<Protocol>().expect_err("unsupported");
    }

    #[test]
    fn families_and_defaults() {
        assert_eq!(Protocol::RestJson1.family(), WireFamily::Json);
        assert_eq!(Protocol::AwsQuery.family(), WireFamily::Query);
        assert_eq!(Protocol::AwsJson10.default_timestamp_format(), Format::EpochSeconds);
        assert_eq!(Protocol::RestXml.default_timestamp_format(), Format::DateTime);
        assert_eq!(Protocol::AwsJson10.content_type(), "application/x-amz-json-1.0");
        assert_eq!(Protocol::AwsQuery.content_type(), "application/x-www-form-urlencoded");
    }

    #[test]
    fn json_name_only_applies_to_rest_json() {
        let member = Member::new("fooBar", "smithy.api#String")
            .json_name("FOO")
            .xml_name("Foo");
        let settings = CodegenSettings::default();
        assert_eq!(wire_name(Protocol::RestJson1, &settings, &member), "FOO");
        assert_eq!(wire_name(Protocol::AwsJson11, &settings, &member), "fooBar");
        assert_eq!(wire_name(Protocol::RestXml, &settings, &member), "Foo");
        assert_eq!(wire_name(Protocol::AwsQuery, &settings, &member), "Foo");
        let settings = CodegenSettings::builder().use_json_name(false).build();
        assert_eq!(wire_name(Protocol::RestJson1, &settings, &member), "fooBar");
    }
}
