/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::escape::escape_string;
use shapecodec_types::date_time::{DateTimeFormatError, Format};
use shapecodec_types::{base64, DateTime, Document, Number};

/// Writes exactly one JSON value into the output.
#[derive(Debug)]
pub struct JsonValueWriter<'a> {
    output: &'a mut String,
}

impl<'a> JsonValueWriter<'a> {
    /// Creates a writer that appends to `output`.
    pub fn new(output: &'a mut String) -> Self {
        JsonValueWriter { output }
    }

    /// Writes a null value.
    pub fn null(self) {
        self.output.push_str("null");
    }

    /// Writes the boolean `value`.
    pub fn boolean(self, value: bool) {
        self.output.push_str(match value {
            true => "true",
            _ => "false",
        });
    }

    /// Writes a string `value`.
    pub fn string(self, value: &str) {
        append_string(self.output, value);
    }

    /// Writes a string `value` without escaping it.
    pub fn string_unchecked(self, value: &str) {
        append_string_unchecked(self.output, value);
    }

    /// Writes a number `value`.
    ///
    /// JSON has no literal for non-finite floats, so those are written as the strings `"NaN"`,
    /// `"Infinity"` and `"-Infinity"`.
    pub fn number(self, value: Number) {
        match value {
            Number::PosInt(value) => {
                // itoa::Buffer is a fixed-size stack allocation, so this is cheap
                self.output.push_str(itoa::Buffer::new().format(value));
            }
            Number::NegInt(value) => {
                self.output.push_str(itoa::Buffer::new().format(value));
            }
            Number::Float(value) => {
                if value.is_nan() {
                    self.output.push_str("\"NaN\"");
                } else if value == f64::INFINITY {
                    self.output.push_str("\"Infinity\"");
                } else if value == f64::NEG_INFINITY {
                    self.output.push_str("\"-Infinity\"");
                } else {
                    // ryu::Buffer is a fixed-size stack allocation, so this is cheap
                    self.output.push_str(ryu::Buffer::new().format_finite(value));
                }
            }
        }
    }

    /// Writes a blob as a base64 string.
    pub fn blob(self, value: &[u8]) {
        self.string_unchecked(&base64::encode(value));
    }

    /// Writes a timestamp `value` in the given `format`.
    ///
    /// Epoch seconds are written as a number; the other formats as strings.
    pub fn date_time(self, value: &DateTime, format: Format) -> Result<(), DateTimeFormatError> {
        let formatted = value.fmt(format)?;
        match format {
            Format::EpochSeconds => self.output.push_str(&formatted),
            _ => append_string(self.output, &formatted),
        }
        Ok(())
    }

    /// Writes an arbitrary document.
    pub fn document(self, value: &Document) {
        match value {
            Document::Array(values) => {
                let mut array = self.start_array();
                for value in values {
                    array.value().document(value);
                }
                array.finish();
            }
            Document::Bool(value) => self.boolean(*value),
            Document::Null => self.null(),
            Document::Number(value) => self.number(*value),
            Document::Object(values) => {
                let mut object = self.start_object();
                for (key, value) in values {
                    object.key(key).document(value);
                }
                object.finish();
            }
            Document::String(value) => self.string(value),
        }
    }

    /// Starts an array.
    pub fn start_array(self) -> JsonArrayWriter<'a> {
        JsonArrayWriter::new(self.output)
    }

    /// Starts an object.
    pub fn start_object(self) -> JsonObjectWriter<'a> {
        JsonObjectWriter::new(self.output)
    }
}

/// Writes the members of a JSON object.
#[derive(Debug)]
pub struct JsonObjectWriter<'a> {
    json: &'a mut String,
    started: bool,
}

impl<'a> JsonObjectWriter<'a> {
    /// Opens an object in `output`.
    pub fn new(output: &'a mut String) -> Self {
        output.push('{');
        Self {
            json: output,
            started: false,
        }
    }

    /// Starts a value with the given `key`.
    pub fn key(&mut self, key: &str) -> JsonValueWriter<'_> {
        if self.started {
            self.json.push(',');
        }
        self.started = true;

        self.json.push('"');
        self.json.push_str(&escape_string(key));
        self.json.push_str("\":");

        JsonValueWriter::new(self.json)
    }

    /// Finishes the object.
    pub fn finish(self) {
        self.json.push('}');
    }
}

/// Writes the elements of a JSON array.
#[derive(Debug)]
pub struct JsonArrayWriter<'a> {
    json: &'a mut String,
    started: bool,
}

impl<'a> JsonArrayWriter<'a> {
    /// Opens an array in `output`.
    pub fn new(output: &'a mut String) -> Self {
        output.push('[');
        Self {
            json: output,
            started: false,
        }
    }

    /// Starts a new value in the array.
    pub fn value(&mut self) -> JsonValueWriter<'_> {
        self.comma_delimit();
        JsonValueWriter::new(self.json)
    }

    /// Finishes the array.
    pub fn finish(self) {
        self.json.push(']');
    }

    fn comma_delimit(&mut self) {
        if self.started {
            self.json.push(',');
        }
        self.started = true;
    }
}

fn append_string(json: &mut String, value: &str) {
    append_string_unchecked(json, &escape_string(value));
}

fn append_string_unchecked(json: &mut String, value: &str) {
    json.push('"');
    json.push_str(value);
    json.push('"');
}

#[cfg(test)]
mod tests {
    use super::{JsonArrayWriter, JsonObjectWriter, JsonValueWriter};
    use pretty_assertions::assert_eq;
    use proptest::proptest;
    use shapecodec_types::date_time::Format;
    use shapecodec_types::{DateTime, Document, Number};
    use std::collections::BTreeMap;

    #[test]
    fn empty() {
        let mut output = String::new();
        JsonObjectWriter::new(&mut output).finish();
        assert_eq!("{}", &output);

        let mut output = String::new();
        JsonArrayWriter::new(&mut output).finish();
        assert_eq!("[]", &output);
    }

    #[test]
    fn object_inside_array() {
        let mut output = String::new();
        let mut array = JsonArrayWriter::new(&mut output);
        array.value().start_object().finish();
        array.value().start_object().finish();
        array.value().start_object().finish();
        array.finish();
        assert_eq!("[{},{},{}]", &output);
    }

    #[test]
    fn object_inside_object() {
        let mut output = String::new();
        let mut obj_1 = JsonObjectWriter::new(&mut output);

        let mut obj_2 = obj_1.key("nested").start_object();
        obj_2.key("test").string("test");
        obj_2.finish();

        obj_1.finish();
        assert_eq!(r#"{"nested":{"test":"test"}}"#, &output);
    }

    #[test]
    fn array_inside_object() {
        let mut output = String::new();
        let mut object = JsonObjectWriter::new(&mut output);
        object.key("foo").start_array().finish();
        object.key("ba\nr").start_array().finish();
        object.finish();
        assert_eq!(r#"{"foo":[],"ba\nr":[]}"#, &output);
    }

    #[test]
    fn object() {
        let mut output = String::new();
        let mut object = JsonObjectWriter::new(&mut output);
        object.key("true_val").boolean(true);
        object.key("false_val").boolean(false);
        object.key("some_string").string("some\nstring\nvalue");
        object.key("unchecked_str").string_unchecked("unchecked");
        object.key("some_number").number(Number::Float(3.5));
        object.key("some_null").null();

        let mut array = object.key("some_mixed_array").start_array();
        array.value().string("1");
        array.value().number(Number::NegInt(-2));
        array.value().boolean(true);
        array.value().null();
        array.finish();

        object.finish();

        assert_eq!(
            r#"{"true_val":true,"false_val":false,"some_string":"some\nstring\nvalue","unchecked_str":"unchecked","some_number":3.5,"some_null":null,"some_mixed_array":["1",-2,true,null]}"#,
            &output
        );
    }

    #[test]
    fn object_date_times() {
        let mut output = String::new();

        let mut object = JsonObjectWriter::new(&mut output);
        object
            .key("epoch_seconds")
            .date_time(&DateTime::from_secs_f64(5.2), Format::EpochSeconds)
            .unwrap();
        object
            .key("date_time")
            .date_time(
                &DateTime::from_str("2021-05-24T15:34:50.123Z", Format::DateTime).unwrap(),
                Format::DateTime,
            )
            .unwrap();
        object
            .key("http_date")
            .date_time(
                &DateTime::from_str("Wed, 21 Oct 2015 07:28:00 GMT", Format::HttpDate).unwrap(),
                Format::HttpDate,
            )
            .unwrap();
        object.finish();

        assert_eq!(
            r#"{"epoch_seconds":5.2,"date_time":"2021-05-24T15:34:50.123Z","http_date":"Wed, 21 Oct 2015 07:28:00 GMT"}"#,
            &output,
        )
    }

    #[test]
    fn blob_is_base64() {
        let mut output = String::new();
        JsonValueWriter::new(&mut output).blob(b"hello!");
        assert_eq!(r#""aGVsbG8h""#, &output);
    }

    #[test]
    fn document() {
        let mut object = BTreeMap::new();
        object.insert("b".to_string(), Document::Array(vec![Document::Null, Document::Bool(false)]));
        object.insert("a".to_string(), Document::Number(Number::NegInt(-1)));
        object.insert("c".to_string(), Document::String("x\"y".into()));
        let mut output = String::new();
        JsonValueWriter::new(&mut output).document(&Document::Object(object));
        assert_eq!(r#"{"a":-1,"b":[null,false],"c":"x\"y"}"#, &output);
    }

    fn format_number(number: Number) -> String {
        let mut formatted = String::new();
        JsonValueWriter::new(&mut formatted).number(number);
        formatted
    }

    #[test]
    fn number_formatting() {
        assert_eq!("1", format_number(Number::PosInt(1)));
        assert_eq!("-1", format_number(Number::NegInt(-1)));
        assert_eq!("1", format_number(Number::NegInt(1)));
        assert_eq!("0.0", format_number(Number::Float(0.0)));
        assert_eq!("10000000000.0", format_number(Number::Float(1e10)));
        assert_eq!("-1.2", format_number(Number::Float(-1.2)));
        assert_eq!("\"NaN\"", format_number(Number::Float(f64::NAN)));
        assert_eq!("\"Infinity\"", format_number(Number::Float(f64::INFINITY)));
        assert_eq!("\"-Infinity\"", format_number(Number::Float(f64::NEG_INFINITY)));
    }

    proptest! {
        #[test]
        fn matches_serde_json_pos_int_format(value: u64) {
            assert_eq!(
                serde_json::to_string(&value).unwrap(),
                format_number(Number::PosInt(value)),
            )
        }

        #[test]
        fn matches_serde_json_neg_int_format(value: i64) {
            assert_eq!(
                serde_json::to_string(&value).unwrap(),
                format_number(Number::NegInt(value)),
            )
        }

        #[test]
        fn finite_floats_parse_back(value in proptest::num::f64::NORMAL) {
            let formatted = format_number(Number::Float(value));
            let parsed: f64 = serde_json::from_str(&formatted).unwrap();
            assert_eq!(value, parsed);
        }

        #[test]
        fn strings_match_serde_json(value in ".*") {
            let mut output = String::new();
            JsonValueWriter::new(&mut output).string(&value);
            assert_eq!(serde_json::to_string(&value).unwrap(), output);
        }
    }
}
