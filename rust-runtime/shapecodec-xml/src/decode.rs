/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Scoped, pull-based XML decoding.
//!
//! A [`ScopedDecoder`] only yields tokens inside its own element. Dropping it consumes the rest of
//! the element, so a decoder that ignores an unknown child never desynchronizes its parent.

use crate::unescape::unescape;
use shapecodec_types::error::DecodeOffset;
use std::borrow::Cow;
use thiserror::Error;
use xmlparser::{ElementEnd, Token, Tokenizer};

/// Nesting depth of a token; the root element is at depth 0.
pub type Depth = usize;

/// Deepest element a decoder descends into before giving up.
pub const MAX_NESTING_DEPTH: Depth = 256;

// in general, these errors are just for reporting what happened, there isn't
// much value in lots of different match variants

#[derive(Debug, Error)]
enum XmlDecodeErrorKind {
    #[error("invalid XML: {0}")]
    InvalidXml(#[source] xmlparser::Error),
    #[error("invalid XML escape: {esc}")]
    InvalidEscape { esc: String },
    #[error("mismatched tags: expected </{expected}>, found </{found}>")]
    MismatchedTag { expected: String, found: String },
    #[error("unexpected end of document")]
    UnexpectedEof,
    #[error("document is not UTF-8")]
    InvalidUtf8(#[source] std::str::Utf8Error),
    #[error("error parsing XML: {0}")]
    Custom(Cow<'static, str>),
}

/// Failure to decode an XML document.
#[derive(Debug)]
pub struct XmlDecodeError {
    kind: XmlDecodeErrorKind,
    offset: Option<usize>,
}

impl std::fmt::Display for XmlDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for XmlDecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl XmlDecodeError {
    fn new(kind: XmlDecodeErrorKind) -> Self {
        Self { kind, offset: None }
    }

    pub(crate) fn invalid_escape(esc: impl Into<String>) -> Self {
        Self::new(XmlDecodeErrorKind::InvalidEscape { esc: esc.into() })
    }

    /// Creates an error with a custom message.
    pub fn custom(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::new(XmlDecodeErrorKind::Custom(msg.into()))
    }

    /// Byte offset in the document where decoding stopped, when known.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    fn or_offset(mut self, offset: usize) -> Self {
        self.offset.get_or_insert(offset);
        self
    }
}

impl DecodeOffset for XmlDecodeError {
    fn decode_offset(&self) -> Option<usize> {
        self.offset
    }
}

impl From<xmlparser::Error> for XmlDecodeError {
    fn from(error: xmlparser::Error) -> Self {
        Self::new(XmlDecodeErrorKind::InvalidXml(error))
    }
}

/// A qualified element or attribute name.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Name<'a> {
    /// Namespace prefix, empty when there is none
    pub prefix: &'a str,
    /// Local name
    pub local: &'a str,
}

impl Name<'_> {
    /// Returns true if `tag_name` matches this name, ignoring ASCII case.
    ///
    /// A `tag_name` without a prefix matches any prefix.
    pub fn matches(&self, tag_name: &str) -> bool {
        match tag_name.split_once(':') {
            Some((prefix, local)) => {
                self.prefix.eq_ignore_ascii_case(prefix) && self.local.eq_ignore_ascii_case(local)
            }
            None => self.local.eq_ignore_ascii_case(tag_name),
        }
    }
}

/// An attribute on a start element.
#[derive(Debug, PartialEq)]
pub struct Attr<'a> {
    name: Name<'a>,
    // attribute values can be escaped (e.g. with double quotes, so we need a Cow)
    value: Cow<'a, str>,
}

/// An opening tag with its attributes.
#[derive(Debug, PartialEq)]
pub struct StartEl<'a> {
    name: Name<'a>,
    attributes: Vec<Attr<'a>>,
    closed: bool,
    depth: Depth,
}

impl<'a> StartEl<'a> {
    /// Nesting depth of the element.
    pub fn depth(&self) -> Depth {
        self.depth
    }

    fn new(local: &'a str, prefix: &'a str, depth: Depth) -> Self {
        Self {
            name: Name { prefix, local },
            attributes: vec![],
            closed: false,
            depth,
        }
    }

    /// Retrieves an attribute with a given key, ignoring ASCII case.
    ///
    /// key `prefix:local` combined as a str, joined by a `:`
    pub fn attr<'b>(&'b self, key: &'b str) -> Option<&'b str> {
        self.attributes
            .iter()
            .find(|attr| attr.name.matches(key))
            .map(|attr| attr.value.as_ref())
    }

    /// Returns whether this `StartEl` matches a given name
    /// in `prefix:local` form.
    pub fn matches(&self, pat: &str) -> bool {
        self.name.matches(pat)
    }

    /// Local component of this element's name
    ///
    /// ```xml
    /// <foo:bar>
    ///      ^^^
    /// ```
    pub fn local(&self) -> &str {
        self.name.local
    }

    /// Prefix component of this element's name (or empty string)
    /// ```xml
    /// <foo:bar>
    ///  ^^^
    /// ```
    pub fn prefix(&self) -> &str {
        self.name.prefix
    }

    /// Returns true of `el` at `depth` is a match for this `start_el`
    fn end_el(&self, el: ElementEnd<'_>, depth: Depth) -> bool {
        if depth != self.depth {
            return false;
        }
        match el {
            ElementEnd::Open => false,
            ElementEnd::Close(prefix, local) => {
                prefix.as_str() == self.name.prefix && local.as_str() == self.name.local
            }
            ElementEnd::Empty => false,
        }
    }
}

/// Xml Document abstraction
///
/// This document wraps a lazy tokenizer with depth tracking.
/// Constructing a document with [`Document::try_from`] validates that the input is well-formed
/// before any decoding starts, so later traversal never observes a tokenizer error.
pub struct Document<'a> {
    tokenizer: Tokenizer<'a>,
    depth: Depth,
    // end of the last token a scoped decoder read
    offset: usize,
}

impl std::fmt::Debug for Document<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("depth", &self.depth)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl<'a> TryFrom<&'a [u8]> for Document<'a> {
    type Error = XmlDecodeError;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        let text = std::str::from_utf8(value).map_err(|err| {
            XmlDecodeError::new(XmlDecodeErrorKind::InvalidUtf8(err)).or_offset(err.valid_up_to())
        })?;
        validate(text)?;
        Ok(Document::new(text))
    }
}

/// Checks that every element is closed by a tag of the same name.
fn validate(text: &str) -> Result<(), XmlDecodeError> {
    let mut open: Vec<(&str, &str)> = vec![];
    let mut offset = 0;
    for token in Tokenizer::from(text) {
        let token = token.map_err(|err| XmlDecodeError::from(err).or_offset(offset))?;
        offset = token.span().end();
        match token {
            Token::ElementStart { prefix, local, .. } => open.push((prefix.as_str(), local.as_str())),
            Token::ElementEnd {
                end: ElementEnd::Close(prefix, local),
                ..
            } => match open.pop() {
                Some(expected) if expected == (prefix.as_str(), local.as_str()) => {}
                Some((_, expected)) => {
                    return Err(XmlDecodeError::new(XmlDecodeErrorKind::MismatchedTag {
                        expected: expected.into(),
                        found: local.as_str().into(),
                    })
                    .or_offset(offset))
                }
                None => {
                    return Err(
                        XmlDecodeError::custom("close tag without a start tag").or_offset(offset)
                    )
                }
            },
            Token::ElementEnd {
                end: ElementEnd::Empty,
                ..
            } => {
                open.pop();
            }
            _ => {}
        }
    }
    if open.is_empty() {
        Ok(())
    } else {
        Err(XmlDecodeError::new(XmlDecodeErrorKind::UnexpectedEof).or_offset(offset))
    }
}

impl<'inp> Document<'inp> {
    /// Wraps `doc` without validating it up front.
    pub fn new(doc: &'inp str) -> Self {
        Document {
            tokenizer: Tokenizer::from(doc),
            depth: 0,
            offset: 0,
        }
    }

    /// Runs `decode` over this document.
    ///
    /// A failure without an offset of its own is tagged with the end of the last token a
    /// decoder read, before the unwinding scopes skipped the rest of their elements.
    pub fn decode_with<T>(
        &mut self,
        decode: impl FnOnce(&mut Document<'inp>) -> Result<T, XmlDecodeError>,
    ) -> Result<T, XmlDecodeError> {
        decode(self).map_err(|err| err.or_offset(self.offset))
    }

    /// "Depth first" iterator
    ///
    /// Unlike [`next_tag()`](ScopedDecoder::next_tag), this method returns the next
    /// start element regardless of depth. This is useful to give a pointer into the middle
    /// of a document to start reading.
    ///
    /// ```xml
    /// <Response> <-- first call returns this:
    ///    <A> <-- next call
    ///      <Nested /> <-- next call returns this
    ///      <MoreNested>hello</MoreNested> <-- then this:
    ///    </A>
    ///    <B/> <-- second call to next_tag returns this
    /// </Response>
    /// ```
    pub fn next_start_element<'a>(&'a mut self) -> Option<StartEl<'inp>> {
        next_start_element(self)
    }

    /// A scoped reader for the entire document
    pub fn root_element<'a>(&'a mut self) -> Result<ScopedDecoder<'inp, 'a>, XmlDecodeError> {
        let start_el = self
            .next_start_element()
            .ok_or_else(|| XmlDecodeError::custom("no root element"))?;
        Ok(ScopedDecoder {
            doc: self,
            start_el,
            terminated: false,
        })
    }

    /// A scoped reader for a specific tag
    ///
    /// This method is necessary for when you need to return a ScopedDecoder from a function
    /// since normally the stacked-ownership that `next_tag()` uses would prevent returning a
    /// reference to a field owned by the current struct.
    pub fn scoped_to<'a>(&'a mut self, start_el: StartEl<'inp>) -> ScopedDecoder<'inp, 'a> {
        ScopedDecoder {
            doc: self,
            start_el,
            terminated: false,
        }
    }
}

/// A new-type wrapper around `Token` to prevent the wrapped third party type from showing up in
/// public API
#[derive(Debug)]
pub struct XmlToken<'inp>(Token<'inp>);

/// Token Iterator
///
/// Note: Document also supports `next_start_element` which provides a higher level
/// interface for finding start elements.
impl<'inp> Iterator for Document<'inp> {
    type Item = Result<(XmlToken<'inp>, Depth), XmlDecodeError>;

    fn next<'a>(&'a mut self) -> Option<Result<(XmlToken<'inp>, Depth), XmlDecodeError>> {
        let tok = self.tokenizer.next()?;
        let tok = match tok {
            Err(e) => return Some(Err(e.into())),
            Ok(tok) => tok,
        };
        // depth bookkeeping
        match tok {
            Token::ElementEnd {
                end: ElementEnd::Close(_, _),
                ..
            } => {
                self.depth = self.depth.saturating_sub(1);
            }
            Token::ElementEnd {
                end: ElementEnd::Empty,
                ..
            } => self.depth = self.depth.saturating_sub(1),
            t @ Token::ElementStart { .. } => {
                self.depth += 1;
                // We want the startel and endel to have the same depth, but after the opener,
                // the parser will be at depth 1. Return the previous depth:
                return Some(Ok((XmlToken(t), self.depth - 1)));
            }
            _ => {}
        }
        Some(Ok((XmlToken(tok), self.depth)))
    }
}

/// XmlTag Abstraction
///
/// ScopedDecoder represents a tag-scoped view into an XML document. Methods
/// on `ScopedDecoder` return `None` when the current tag has been exhausted.
#[derive(Debug)]
pub struct ScopedDecoder<'inp, 'a> {
    doc: &'a mut Document<'inp>,
    start_el: StartEl<'inp>,
    terminated: bool,
}

/// When a scoped decoder is dropped, its entire scope is consumed so that the
/// next read begins at the next tag at the same depth.
impl Drop for ScopedDecoder<'_, '_> {
    fn drop(&mut self) {
        while self.advance().is_some() {}
    }
}

impl<'inp> ScopedDecoder<'inp, '_> {
    /// The start element for this scope
    pub fn start_el<'a>(&'a self) -> &'a StartEl<'inp> {
        &self.start_el
    }

    /// Returns the next top-level tag in this scope
    /// The returned reader will fully read the tag during its lifetime. If it is dropped without
    /// the data being read, the reader will be advanced until the matching close tag. If you read
    /// an element with `next_tag()` and you want to ignore it, simply drop the resulting
    /// `ScopeDecoder`.
    ///
    /// ```xml
    /// <Response> <-- scoped reader on this tag
    ///    <A> <-- first call to next_tag returns this
    ///      <Nested /> <-- to get inner data, call `next_tag` on the returned decoder for `A`
    ///      <MoreNested>hello</MoreNested>
    ///    </A>
    ///    <B/> <-- second call to next_tag returns this
    /// </Response>
    /// ```
    pub fn next_tag<'a>(&'a mut self) -> Option<ScopedDecoder<'inp, 'a>> {
        let next_tag = next_start_element(self)?;
        Some(self.nested_decoder(next_tag))
    }

    /// Fails when this element is nested deeper than [`MAX_NESTING_DEPTH`].
    pub fn check_depth(&self) -> Result<(), XmlDecodeError> {
        if self.start_el.depth <= MAX_NESTING_DEPTH {
            return Ok(());
        }
        Err(XmlDecodeError::custom(format!(
            "exceeded max nesting depth of {}",
            MAX_NESTING_DEPTH
        ))
        .or_offset(self.doc.offset))
    }

    fn nested_decoder<'a>(&'a mut self, start_el: StartEl<'inp>) -> ScopedDecoder<'inp, 'a> {
        ScopedDecoder {
            doc: self.doc,
            start_el,
            terminated: false,
        }
    }
}

impl<'inp, 'a> Iterator for ScopedDecoder<'inp, 'a> {
    type Item = Result<(XmlToken<'inp>, Depth), XmlDecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.advance();
        if let Some(Ok((token, _))) = &next {
            self.doc.offset = token.0.span().end();
        }
        next
    }
}

impl<'inp> ScopedDecoder<'inp, '_> {
    // Drop drains through here so skipped tokens don't move the recorded offset.
    fn advance(&mut self) -> Option<Result<(XmlToken<'inp>, Depth), XmlDecodeError>> {
        if self.start_el.closed {
            self.terminated = true;
        }
        if self.terminated {
            return None;
        }
        let (tok, depth) = match self.doc.next() {
            Some(Ok((tok, depth))) => (tok, depth),
            other => return other,
        };

        match tok.0 {
            Token::ElementEnd { end, .. } if self.start_el.end_el(end, depth) => {
                self.terminated = true;
                return None;
            }
            _ => {}
        }
        Some(Ok((tok, depth)))
    }
}

/// Load the next start element out of a depth-tagged token iterator
fn next_start_element<'a, 'inp>(
    tokens: &'a mut impl Iterator<Item = Result<(XmlToken<'inp>, Depth), XmlDecodeError>>,
) -> Option<StartEl<'inp>> {
    let mut out = StartEl::new("", "", 0);
    loop {
        match tokens.next()? {
            Ok((XmlToken(Token::ElementStart { local, prefix, .. }), depth)) => {
                out.name.local = local.as_str();
                out.name.prefix = prefix.as_str();
                out.depth = depth;
            }
            Ok((
                XmlToken(Token::Attribute {
                    prefix,
                    local,
                    value,
                    ..
                }),
                _,
            )) => out.attributes.push(Attr {
                name: Name {
                    local: local.as_str(),
                    prefix: prefix.as_str(),
                },
                value: unescape(value.as_str()).ok()?,
            }),
            Ok((
                XmlToken(Token::ElementEnd {
                    end: ElementEnd::Open,
                    ..
                }),
                _,
            )) => break,
            Ok((
                XmlToken(Token::ElementEnd {
                    end: ElementEnd::Empty,
                    ..
                }),
                _,
            )) => {
                out.closed = true;
                break;
            }
            _ => {}
        }
    }
    Some(out)
}

/// Returns the data element at the current position
///
/// If the current position is not a data element (and is instead a `<start-element>`) an error
/// will be returned. Text and CDATA sections are concatenated; an empty element yields `""`.
pub fn try_data<'a, 'inp>(
    tokens: &'a mut impl Iterator<Item = Result<(XmlToken<'inp>, Depth), XmlDecodeError>>,
) -> Result<Cow<'inp, str>, XmlDecodeError> {
    let mut data: Option<Cow<'inp, str>> = None;
    loop {
        let piece = match tokens.next().map(|opt| opt.map(|opt| opt.0)) {
            None => return Ok(data.unwrap_or(Cow::Borrowed(""))),
            Some(Ok(XmlToken(Token::Text { text }))) => unescape(text.as_str())?,
            Some(Ok(XmlToken(Token::Cdata { text, .. }))) => Cow::Borrowed(text.as_str()),
            Some(Ok(e @ XmlToken(Token::ElementStart { .. }))) => {
                return Err(XmlDecodeError::custom(format!(
                    "looking for a data element, found: {:?}",
                    e
                )))
            }
            Some(Err(e)) => return Err(e),
            _ => continue,
        };
        data = Some(match data {
            None => piece,
            Some(existing) => Cow::Owned(existing.into_owned() + &piece),
        });
    }
}

#[cfg(test)]
mod test {
    use crate::decode::{
        try_data, Attr, Depth, Document, Name, ScopedDecoder, StartEl, XmlDecodeError,
        MAX_NESTING_DEPTH,
    };

    // test helper to create a closed startel
    fn closed<'a>(local: &'a str, prefix: &'a str, depth: Depth) -> StartEl<'a> {
        let mut s = StartEl::new(local, prefix, depth);
        s.closed = true;
        s
    }

    #[test]
    fn scoped_tokens() {
        let xml = r#"<Response><A></A></Response>"#;
        let mut doc = Document::new(xml);
        let mut root = doc.root_element().expect("valid document");
        assert_eq!(root.start_el().local(), "Response");
        assert_eq!(root.next_tag().expect("tag exists").start_el().local(), "A");
        assert!(root.next_tag().is_none());
    }

    #[test]
    fn handle_depth_properly() {
        let xml = r#"<Response><Response></Response><A/></Response>"#;
        let mut doc = Document::new(xml);
        let mut scoped = doc.root_element().expect("valid document");
        assert_eq!(
            scoped.next_tag().unwrap().start_el(),
            &StartEl::new("Response", "", 1)
        );
        let closed_a = closed("A", "", 1);
        assert_eq!(scoped.next_tag().unwrap().start_el(), &closed_a);
        assert!(scoped.next_tag().is_none())
    }

    #[test]
    fn self_closing() {
        let xml = r#"<Response/>"#;
        let mut doc = Document::new(xml);
        let mut scoped = doc.root_element().expect("valid doc");
        assert!(scoped.start_el.closed);
        assert!(scoped.next_tag().is_none())
    }

    #[test]
    fn terminate_scope() {
        let xml = r#"<Response><Struct><A></A><Also/></Struct><More/></Response>"#;
        let mut doc = Document::new(xml);
        let mut response_iter = doc.root_element().expect("valid doc");
        let mut struct_iter = response_iter.next_tag().unwrap();
        assert_eq!(
            struct_iter.next_tag().as_ref().map(|t| t.start_el()),
            Some(&StartEl::new("A", "", 2))
        );
        // When the inner iter is dropped, it will read to the end of its scope
        // prevent accidental behavior where we didn't read a full node
        drop(struct_iter);
        assert_eq!(
            response_iter.next_tag().unwrap().start_el(),
            &closed("More", "", 1)
        );
    }

    #[test]
    fn read_data_invalid() {
        let xml = r#"<Response><A></A></Response>"#;
        let mut doc = Document::new(xml);
        let mut resp = doc.root_element().unwrap();
        try_data(&mut resp).expect_err("no data");
    }

    #[test]
    fn read_data() {
        let xml = r#"<Response>hello</Response>"#;
        let mut doc = Document::new(xml);
        let mut scoped = doc.root_element().unwrap();
        assert_eq!(try_data(&mut scoped).unwrap(), "hello");
    }

    /// Whitespace within an element is preserved
    #[test]
    fn read_data_whitespace() {
        let xml = r#"<Response> hello </Response>"#;
        let mut doc = Document::new(xml);
        let mut scoped = doc.root_element().unwrap();
        assert_eq!(try_data(&mut scoped).unwrap(), " hello ");
    }

    #[test]
    fn read_data_escaped_and_cdata() {
        let xml = r#"<Response>a &amp; <![CDATA[<b>]]></Response>"#;
        let mut doc = Document::new(xml);
        let mut scoped = doc.root_element().unwrap();
        assert_eq!(try_data(&mut scoped).unwrap(), "a & <b>");
    }

    #[test]
    fn empty_element_has_empty_data() {
        let mut doc = Document::new("<Response/>");
        let mut scoped = doc.root_element().unwrap();
        assert_eq!(try_data(&mut scoped).unwrap(), "");
    }

    #[test]
    fn ignore_insignificant_whitespace() {
        let xml = r#"<Response>   <A>  </A>    </Response>"#;
        let mut doc = Document::new(xml);
        let mut resp = doc.root_element().unwrap();
        let mut a = resp.next_tag().expect("should be a");
        let data = try_data(&mut a).expect("valid");
        assert_eq!(data, "  ");
    }

    #[test]
    fn read_attributes() {
        let xml = r#"<Response xsi:type="CanonicalUser">hello</Response>"#;
        let mut tokenizer = Document::new(xml);
        let root = tokenizer.root_element().unwrap();

        assert_eq!(
            root.start_el().attributes,
            vec![Attr {
                name: Name {
                    prefix: "xsi",
                    local: "type"
                },
                value: "CanonicalUser".into()
            }]
        );
        assert_eq!(root.start_el().attr("xsi:type"), Some("CanonicalUser"));
        assert_eq!(root.start_el().attr("XSI:Type"), Some("CanonicalUser"));
    }

    #[test]
    fn unescape_data() {
        let xml = r#"<Response key="&quot;hey&quot;>">&gt;</Response>"#;
        let mut doc = Document::new(xml);
        let mut root = doc.root_element().unwrap();
        assert_eq!(try_data(&mut root).unwrap(), ">");
        assert_eq!(root.start_el().attr("key"), Some("\"hey\">"));
    }

    #[test]
    fn nested_self_closer() {
        let xml = r#"<XmlListsInputOutput>
                <stringList/>
                <stringSet></stringSet>
        </XmlListsInputOutput>"#;
        let mut doc = Document::new(xml);
        let mut root = doc.root_element().unwrap();
        let mut string_list = root.next_tag().unwrap();
        assert_eq!(string_list.start_el(), &closed("stringList", "", 1));
        assert!(string_list.next_tag().is_none());
        drop(string_list);
        assert_eq!(
            root.next_tag().unwrap().start_el(),
            &StartEl::new("stringSet", "", 1)
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut doc = Document::new("<a:Foo/>");
        let root = doc.root_element().unwrap();
        assert!(root.start_el().matches("foo"));
        assert!(root.start_el().matches("A:FOO"));
        assert!(!root.start_el().matches("b:Foo"));
        assert!(!root.start_el().matches("Bar"));
    }

    #[test]
    fn confusing_nested_same_name_tag() {
        // an inner b which could be confused as closing the outer b if depth
        // is not properly tracked:
        let root_tags = &["a", "b", "c", "d"];
        let xml = r#"<XmlListsInputOutput>
                <a/>
                <b>
                  <c/>
                  <b></b>
                  <here/>
                </b>
                <c></c>
                <d>more</d>
        </XmlListsInputOutput>"#;
        let mut doc = Document::new(xml);
        let mut root = doc.root_element().unwrap();
        let mut cmp = vec![];
        while let Some(tag) = root.next_tag() {
            cmp.push(tag.start_el().local().to_owned());
        }
        assert_eq!(root_tags, cmp.as_slice());
    }

    #[test]
    fn validation_rejects_malformed_documents() {
        Document::try_from(&b"<A><B></A></B>"[..]).expect_err("mismatched tags");
        Document::try_from(&b"<A><B></B>"[..]).expect_err("unclosed root");
        Document::try_from(&b"<A></A></B>"[..]).expect_err("stray close tag");
        Document::try_from(&b"<A attr=></A>"[..]).expect_err("bad attribute");
        Document::try_from(&b"\xff"[..]).expect_err("not utf-8");
        Document::try_from(&b"<?xml version=\"1.0\"?><A><B/></A>"[..]).expect("valid");
    }

    #[test]
    fn failures_point_at_the_last_token_read() {
        let xml = b"<A><ok>1</ok><ratio>BROKEN</ratio><pad>xxxxxxxx</pad></A>";
        let mut doc = Document::try_from(&xml[..]).unwrap();
        let err = doc
            .decode_with(|doc| {
                let mut root = doc.root_element()?;
                while let Some(mut tag) = root.next_tag() {
                    let text = try_data(&mut tag)?;
                    if text.parse::<u32>().is_err() {
                        return Err(XmlDecodeError::custom("not a number"));
                    }
                }
                Ok(())
            })
            .unwrap_err();
        // the dropped scopes drained to the end without moving the offset
        let offset = err.offset().unwrap();
        assert_eq!("<A><ok>1</ok><ratio>BROKEN", std::str::from_utf8(&xml[..offset]).unwrap());
    }

    #[test]
    fn validation_failures_carry_an_offset() {
        let err = Document::try_from(&b"<A><B></A></B>"[..]).unwrap_err();
        assert_eq!(Some(10), err.offset());
    }

    fn descend(decoder: &mut ScopedDecoder<'_, '_>) -> Result<Depth, XmlDecodeError> {
        decoder.check_depth()?;
        let depth = decoder.start_el().depth();
        match decoder.next_tag() {
            Some(mut tag) => descend(&mut tag),
            None => Ok(depth),
        }
    }

    #[test]
    fn nesting_past_the_limit_is_an_error() {
        let nested = |depth: usize| format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));

        let xml = nested(MAX_NESTING_DEPTH + 1);
        let mut doc = Document::try_from(xml.as_bytes()).unwrap();
        assert_eq!(MAX_NESTING_DEPTH, descend(&mut doc.root_element().unwrap()).unwrap());

        let xml = nested(MAX_NESTING_DEPTH + 2);
        let mut doc = Document::try_from(xml.as_bytes()).unwrap();
        let err = descend(&mut doc.root_element().unwrap()).unwrap_err();
        assert!(err.to_string().contains("max nesting depth"), "{}", err);
        assert!(err.offset().is_some());
    }
}
