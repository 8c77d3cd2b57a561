/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! XML Encoding module that uses Rust lifetimes to make
//! generating malformed XML a compile error

use crate::escape::escape;
use std::fmt::Write;

/// XML namespace declaration: `xmlns="uri"` or `xmlns:prefix="uri"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespace<'a> {
    /// Namespace URI
    pub uri: &'a str,
    /// Optional prefix bound to the URI
    pub prefix: Option<&'a str>,
}

/// XmlWriter Abstraction
///
/// XmlWriter (and friends) make generating an invalid XML document a type error. Nested branches
/// of the Xml document mutable borrow from the root. You cannot continue writing to the root
/// until the nested branch is dropped and dropping the nested branch writes the terminator (e.g.
/// closing element).
///
/// The one exception to this rule is names: it is possible to construct an invalid Xml Name.
/// Names come from the model, so they are known ahead of time.
///
/// # Example
///
/// ```rust
/// use shapecodec_xml::encode::XmlWriter;
/// let mut s = String::new();
/// let mut doc = XmlWriter::new(&mut s);
/// let start_el = doc.start_el("Root")
///     .write_ns("http://example.com", None);
/// let mut start_tag = start_el.finish();
/// start_tag.data("hello");
/// start_tag.finish();
/// assert_eq!(s, "<Root xmlns=\"http://example.com\">hello</Root>");
/// ```
#[derive(Debug)]
pub struct XmlWriter<'a> {
    doc: &'a mut String,
}

impl<'a> XmlWriter<'a> {
    /// Creates a writer that appends to `doc`.
    pub fn new(doc: &'a mut String) -> Self {
        Self { doc }
    }
}

impl XmlWriter<'_> {
    /// Starts the root element.
    pub fn start_el<'b, 'c>(&'c mut self, tag: &'b str) -> ElWriter<'c, 'b> {
        ElWriter::new(self.doc, tag)
    }
}

/// A start tag that can still receive attributes and namespaces.
///
/// Call [`finish`](ElWriter::finish) to close the start tag and write content.
#[derive(Debug)]
#[must_use]
pub struct ElWriter<'a, 'b> {
    start: &'b str,
    doc: &'a mut String,
}

impl<'a, 'b> ElWriter<'a, 'b> {
    fn new(doc: &'a mut String, start: &'b str) -> ElWriter<'a, 'b> {
        write!(doc, "<{}", start).unwrap_or_default();
        ElWriter { start, doc }
    }

    /// Closes the start tag without opening a scope; the caller writes the close tag.
    fn close_start_tag(self) {
        self.doc.push('>');
    }

    /// Writes an attribute. The value is escaped.
    pub fn write_attribute(&mut self, key: &str, value: &str) -> &mut Self {
        write!(self.doc, " {}=\"{}\"", key, escape(value)).unwrap_or_default();
        self
    }

    /// Writes a namespace declaration.
    pub fn write_ns(self, namespace: &str, prefix: Option<&str>) -> Self {
        match prefix {
            Some(prefix) => {
                write!(self.doc, " xmlns:{}=\"{}\"", prefix, escape(namespace)).unwrap_or_default()
            }
            None => write!(self.doc, " xmlns=\"{}\"", escape(namespace)).unwrap_or_default(),
        }
        self
    }

    /// Writes an optional namespace declaration.
    pub fn namespace(self, namespace: Option<Namespace<'_>>) -> Self {
        match namespace {
            Some(ns) => self.write_ns(ns.uri, ns.prefix),
            None => self,
        }
    }

    /// Closes the start tag and returns a writer for the element's content.
    pub fn finish(self) -> ScopeWriter<'a, 'b> {
        self.doc.push('>');
        ScopeWriter {
            doc: self.doc,
            start: self.start,
        }
    }
}

/// Writer for the content of an element. Dropping it writes the close tag.
#[derive(Debug)]
pub struct ScopeWriter<'a, 'b> {
    doc: &'a mut String,
    start: &'b str,
}

impl Drop for ScopeWriter<'_, '_> {
    fn drop(&mut self) {
        write!(self.doc, "</{}>", self.start).unwrap_or_default();
    }
}

impl<'a, 'b> ScopeWriter<'a, 'b> {
    /// Writes escaped text content.
    pub fn data(&mut self, data: &str) {
        self.doc.write_str(escape(data).as_ref()).unwrap_or_default();
    }

    /// Closes the element.
    pub fn finish(self) {
        // drop will be called which writes the closer to the document
    }

    /// Starts a child element.
    pub fn start_el<'b1, 'c>(&'c mut self, tag: &'b1 str) -> ElWriter<'c, 'b1> {
        ElWriter::new(self.doc, tag)
    }

    /// Starts a list bound to the member named `name`.
    ///
    /// A flattened list has no wrapper: every element is written as a repeated `<name>` sibling.
    /// Otherwise the elements are nested inside `<name>` and named by the list member.
    pub fn start_list<'c>(
        &'c mut self,
        name: &'c str,
        flattened: bool,
        namespace: Option<Namespace<'c>>,
    ) -> ListWriter<'c> {
        if !flattened {
            ElWriter::new(&mut *self.doc, name)
                .namespace(namespace)
                .close_start_tag();
        }
        ListWriter {
            doc: &mut *self.doc,
            name,
            flattened,
            wrapped: !flattened,
            namespace,
        }
    }

    /// Starts a list whose wrapper is this element, as for a list nested in another list.
    pub fn nested_list<'c>(&'c mut self) -> ListWriter<'c> {
        ListWriter {
            doc: &mut *self.doc,
            name: "",
            flattened: false,
            wrapped: false,
            namespace: None,
        }
    }

    /// Starts a map bound to the member named `name`.
    ///
    /// A flattened map writes each entry as a repeated `<name>` sibling; otherwise entries are
    /// `<entry>` elements inside `<name>`.
    pub fn start_map<'c>(
        &'c mut self,
        name: &'c str,
        flattened: bool,
        namespace: Option<Namespace<'c>>,
    ) -> MapWriter<'c> {
        if !flattened {
            ElWriter::new(&mut *self.doc, name)
                .namespace(namespace)
                .close_start_tag();
        }
        MapWriter {
            doc: &mut *self.doc,
            name,
            flattened,
            wrapped: !flattened,
            namespace,
        }
    }

    /// Starts a map whose `<entry>` elements are written directly into this element.
    pub fn nested_map<'c>(&'c mut self) -> MapWriter<'c> {
        MapWriter {
            doc: &mut *self.doc,
            name: "",
            flattened: false,
            wrapped: false,
            namespace: None,
        }
    }
}

/// Writer for the elements of a list. See [`ScopeWriter::start_list`].
#[derive(Debug)]
pub struct ListWriter<'a> {
    doc: &'a mut String,
    name: &'a str,
    flattened: bool,
    wrapped: bool,
    namespace: Option<Namespace<'a>>,
}

impl<'a> ListWriter<'a> {
    /// Starts one element. `member_name` names the element unless the list is flattened.
    pub fn element<'c>(&'c mut self, member_name: &'c str) -> ElWriter<'c, 'c> {
        let tag: &'c str = if self.flattened { self.name } else { member_name };
        let el = ElWriter::new(&mut *self.doc, tag);
        if self.flattened {
            el.namespace(self.namespace)
        } else {
            el
        }
    }

    /// Finishes the list.
    pub fn finish(self) {
        if self.wrapped {
            write!(self.doc, "</{}>", self.name).unwrap_or_default();
        }
    }
}

/// Writer for the entries of a map. See [`ScopeWriter::start_map`].
#[derive(Debug)]
pub struct MapWriter<'a> {
    doc: &'a mut String,
    name: &'a str,
    flattened: bool,
    wrapped: bool,
    namespace: Option<Namespace<'a>>,
}

impl<'a> MapWriter<'a> {
    /// Starts one entry. The returned scope receives the key and value elements.
    pub fn entry<'c>(&'c mut self) -> ScopeWriter<'c, 'c> {
        let tag: &'c str = if self.flattened { self.name } else { "entry" };
        let el = ElWriter::new(&mut *self.doc, tag);
        if self.flattened {
            el.namespace(self.namespace).finish()
        } else {
            el.finish()
        }
    }

    /// Finishes the map.
    pub fn finish(self) {
        if self.wrapped {
            write!(self.doc, "</{}>", self.name).unwrap_or_default();
        }
    }
}

#[cfg(test)]
mod test {
    use crate::encode::{Namespace, XmlWriter};
    use crate::escape::escape;
    use pretty_assertions::assert_eq;

    #[test]
    fn forgot_finish() {
        let mut out = String::new();

        fn writer(out: &mut String) {
            let mut doc_writer = XmlWriter::new(out);
            doc_writer.start_el("Hello").finish();
            // if we didn't call `finish()` on ScopeWriter, drop closes the tag
        }
        writer(&mut out);

        assert_eq!(out, r#"<Hello></Hello>"#);
    }

    #[test]
    fn basic_document_encoding() {
        let mut out = String::new();
        let mut doc_writer = XmlWriter::new(&mut out);
        let mut start_el = doc_writer
            .start_el("Hello")
            .write_ns("http://example.com", None);
        start_el.write_attribute("key", "foo");
        let mut tag = start_el.finish();
        let mut inner = tag.start_el("inner").finish();
        inner.data("hello world!");
        inner.finish();
        let more_inner = tag.start_el("inner").finish();
        more_inner.finish();
        tag.finish();

        assert_eq!(
            out,
            r#"<Hello xmlns="http://example.com" key="foo"><inner>hello world!</inner><inner></inner></Hello>"#
        );
    }

    #[test]
    fn escape_data() {
        let mut s = String::new();
        {
            let mut doc_writer = XmlWriter::new(&mut s);
            let mut start_el = doc_writer.start_el("Hello");
            start_el.write_attribute("key", "<key=\"value\">");
            let mut tag = start_el.finish();
            tag.data("\n\r&");
        }
        assert_eq!(
            s,
            r#"<Hello key="&lt;key=&quot;value&quot;&gt;">&#xA;&#xD;&amp;</Hello>"#
        )
    }

    #[test]
    fn prefixed_namespace() {
        let mut s = String::new();
        let mut doc_writer = XmlWriter::new(&mut s);
        doc_writer
            .start_el("Hello")
            .write_ns("https://example.com", Some("ex"))
            .finish();
        drop(doc_writer);
        assert_eq!(s, r#"<Hello xmlns:ex="https://example.com"></Hello>"#);
    }

    #[test]
    fn wrapped_list() {
        let mut s = String::new();
        let mut doc_writer = XmlWriter::new(&mut s);
        let mut root = doc_writer.start_el("Root").finish();
        let mut list = root.start_list("Items", false, None);
        list.element("member").finish().data("a");
        list.element("member").finish().data("b");
        list.finish();
        root.finish();
        assert_eq!(
            s,
            "<Root><Items><member>a</member><member>b</member></Items></Root>"
        );
    }

    #[test]
    fn flattened_list_repeats_member_name() {
        let ns = Namespace {
            uri: "https://example.com",
            prefix: None,
        };
        let mut s = String::new();
        let mut doc_writer = XmlWriter::new(&mut s);
        let mut root = doc_writer.start_el("Root").finish();
        let mut list = root.start_list("Item", true, Some(ns));
        list.element("member").finish().data("a");
        list.element("member").finish().data("b");
        list.finish();
        root.finish();
        assert_eq!(
            s,
            r#"<Root><Item xmlns="https://example.com">a</Item><Item xmlns="https://example.com">b</Item></Root>"#
        );
    }

    #[test]
    fn empty_wrapped_list_keeps_wrapper() {
        let mut s = String::new();
        let mut doc_writer = XmlWriter::new(&mut s);
        let mut root = doc_writer.start_el("Root").finish();
        root.start_list("Items", false, None).finish();
        root.finish();
        assert_eq!(s, "<Root><Items></Items></Root>");
    }

    #[test]
    fn nested_collections_reuse_the_enclosing_element() {
        let mut s = String::new();
        let mut doc_writer = XmlWriter::new(&mut s);
        let mut root = doc_writer.start_el("Root").finish();
        let mut outer = root.start_list("Grid", false, None);
        let mut row = outer.element("member").finish();
        let mut inner = row.nested_list();
        inner.element("member").finish().data("a");
        inner.finish();
        row.finish();
        let mut cell = outer.element("member").finish();
        let mut map = cell.nested_map();
        let mut entry = map.entry();
        entry.start_el("key").finish().data("k");
        entry.finish();
        map.finish();
        cell.finish();
        outer.finish();
        root.finish();
        assert_eq!(
            s,
            "<Root><Grid><member><member>a</member></member><member><entry><key>k</key></entry></member></Grid></Root>"
        );
    }

    #[test]
    fn maps() {
        let mut s = String::new();
        let mut doc_writer = XmlWriter::new(&mut s);
        let mut root = doc_writer.start_el("Root").finish();
        let mut map = root.start_map("Attrs", false, None);
        let mut entry = map.entry();
        entry.start_el("key").finish().data("k");
        entry.start_el("value").finish().data("v");
        entry.finish();
        map.finish();
        let mut map = root.start_map("Flat", true, None);
        let mut entry = map.entry();
        entry.start_el("K").finish().data("k");
        entry.start_el("V").finish().data("v");
        entry.finish();
        map.finish();
        root.finish();
        assert_eq!(
            s,
            "<Root><Attrs><entry><key>k</key><value>v</value></entry></Attrs><Flat><K>k</K><V>v</V></Flat></Root>"
        );
    }

    #[test]
    fn escape_round_trip_through_decoder() {
        let value = "a<b>&\"c'\r\n";
        let mut s = String::new();
        XmlWriter::new(&mut s)
            .start_el("A")
            .finish()
            .data(value);
        let mut doc = crate::decode::Document::new(&s);
        let mut root = doc.root_element().unwrap();
        assert_eq!(crate::decode::try_data(&mut root).unwrap(), value);
        assert_eq!(escape("plain"), "plain");
    }
}
