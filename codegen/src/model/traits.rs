/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use shapecodec_types::date_time::Format;

/// Which side of a call an `error` shape blames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorFault {
    /// `@error("client")`
    Client,
    /// `@error("server")`
    Server,
}

/// `@xmlNamespace`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XmlNamespace {
    /// Namespace URI
    pub uri: String,
    /// Optional prefix bound to the URI
    pub prefix: Option<String>,
}

/// The traits the codec generator understands, attached to a shape or a member.
///
/// Traits are inert data: nothing here changes behavior until a generator reads it. Unrecognized
/// traits are dropped when the model is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Traits {
    /// `@required`
    pub required: bool,
    /// Values of a string `@enum`, or the members of an `enum` shape
    pub enum_values: Option<Vec<String>>,
    /// `@timestampFormat`
    pub timestamp_format: Option<Format>,
    /// `@xmlName`
    pub xml_name: Option<String>,
    /// `@xmlAttribute`
    pub xml_attribute: bool,
    /// `@xmlNamespace`
    pub xml_namespace: Option<XmlNamespace>,
    /// `@xmlFlattened`
    pub xml_flattened: bool,
    /// `@jsonName`
    pub json_name: Option<String>,
    /// Excluded from every wire encode and decode
    pub no_serialize: bool,
    /// `@sparse`
    pub sparse: bool,
    /// `@error`
    pub error: Option<ErrorFault>,
    /// `@httpError`
    pub http_error: Option<u16>,
    /// `@httpHeader`
    pub http_header: Option<String>,
    /// `@httpQuery`
    pub http_query: Option<String>,
    /// `@httpLabel`
    pub http_label: bool,
    /// `@httpPayload`
    pub http_payload: bool,
    /// `@httpResponseCode`
    pub http_response_code: bool,
    /// `@mediaType`
    pub media_type: Option<String>,
}

impl Traits {
    /// True when the member is bound somewhere other than the document body.
    pub fn is_http_bound(&self) -> bool {
        self.http_header.is_some()
            || self.http_query.is_some()
            || self.http_label
            || self.http_payload
            || self.http_response_code
    }
}

/// Chainable trait setters shared by [`Shape`](super::Shape) and [`Member`](super::Member).
pub trait ApplyTraits: Sized {
    /// Mutable access to the traits being built.
    fn traits_mut(&mut self) -> &mut Traits;

    /// Replaces every trait at once.
    fn with_traits(mut self, traits: Traits) -> Self {
        *self.traits_mut() = traits;
        self
    }

    /// Marks the member `@required`.
    fn required(mut self) -> Self {
        self.traits_mut().required = true;
        self
    }

    /// Restricts a string to a set of values.
    fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.traits_mut().enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Sets `@timestampFormat`.
    fn timestamp_format(mut self, format: Format) -> Self {
        self.traits_mut().timestamp_format = Some(format);
        self
    }

    /// Sets `@xmlName`.
    fn xml_name(mut self, name: impl Into<String>) -> Self {
        self.traits_mut().xml_name = Some(name.into());
        self
    }

    /// Sets `@xmlAttribute`.
    fn xml_attribute(mut self) -> Self {
        self.traits_mut().xml_attribute = true;
        self
    }

    /// Sets `@xmlNamespace`.
    fn xml_namespace(mut self, uri: impl Into<String>, prefix: Option<&str>) -> Self {
        self.traits_mut().xml_namespace = Some(XmlNamespace {
            uri: uri.into(),
            prefix: prefix.map(str::to_owned),
        });
        self
    }

    /// Sets `@xmlFlattened`.
    fn xml_flattened(mut self) -> Self {
        self.traits_mut().xml_flattened = true;
        self
    }

    /// Sets `@jsonName`.
    fn json_name(mut self, name: impl Into<String>) -> Self {
        self.traits_mut().json_name = Some(name.into());
        self
    }

    /// Excludes the member from the wire.
    fn no_serialize(mut self) -> Self {
        self.traits_mut().no_serialize = true;
        self
    }

    /// Sets `@sparse`.
    fn sparse(mut self) -> Self {
        self.traits_mut().sparse = true;
        self
    }

    /// Sets `@error`.
    fn error(mut self, fault: ErrorFault) -> Self {
        self.traits_mut().error = Some(fault);
        self
    }

    /// Sets `@httpError`.
    fn http_error(mut self, status: u16) -> Self {
        self.traits_mut().http_error = Some(status);
        self
    }

    /// Sets `@httpHeader`.
    fn http_header(mut self, name: impl Into<String>) -> Self {
        self.traits_mut().http_header = Some(name.into());
        self
    }

    /// Sets `@httpQuery`.
    fn http_query(mut self, name: impl Into<String>) -> Self {
        self.traits_mut().http_query = Some(name.into());
        self
    }

    /// Sets `@httpLabel`.
    fn http_label(mut self) -> Self {
        self.traits_mut().http_label = true;
        self
    }

    /// Sets `@httpPayload`.
    fn http_payload(mut self) -> Self {
        self.traits_mut().http_payload = true;
        self
    }

    /// Sets `@httpResponseCode`.
    fn http_response_code(mut self) -> Self {
        self.traits_mut().http_response_code = true;
        self
    }

    /// Sets `@mediaType`.
    fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.traits_mut().media_type = Some(media_type.into());
        self
    }
}
