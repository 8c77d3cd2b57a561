/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Error bodies for the XML and Query protocols.
//!
//! Wrapped:
//! ```xml
//! <ErrorResponse>
//!   <Error><Type>Sender</Type><Code>InvalidGreeting</Code><Message>Hi</Message></Error>
//!   <RequestId>foo-id</RequestId>
//! </ErrorResponse>
//! ```
//!
//! Unwrapped:
//! ```xml
//! <Error><Code>NoSuchKey</Code><Message>Gone</Message><RequestId>a</RequestId><HostId>b</HostId></Error>
//! ```

use crate::decode::{try_data, Document, ScopedDecoder, XmlDecodeError};
use shapecodec_types::error::{Builder as ErrorMetadataBuilder, EXTENDED_REQUEST_ID, REQUEST_ID};
use shapecodec_types::ErrorMetadata;

/// Whether error details are nested inside an `<ErrorResponse>` wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorWrapping {
    /// `<ErrorResponse><Error>...</Error><RequestId/></ErrorResponse>`
    Wrapped,
    /// `<Error>...<RequestId/><HostId/></Error>`
    Unwrapped,
}

/// Reads the code, message, request id and host id from an error body.
pub fn parse_error_metadata(
    body: &[u8],
    wrapping: ErrorWrapping,
) -> Result<ErrorMetadataBuilder, XmlDecodeError> {
    let mut doc = Document::try_from(body)?;
    let mut root = doc.root_element()?;
    let mut builder = ErrorMetadata::builder();
    match wrapping {
        ErrorWrapping::Wrapped => {
            if !root.start_el().matches("ErrorResponse") {
                return Err(XmlDecodeError::custom(format!(
                    "expected ErrorResponse as the root, found {}",
                    root.start_el().local()
                )));
            }
            while let Some(mut tag) = root.next_tag() {
                if tag.start_el().matches("Error") {
                    builder = read_error_fields(&mut tag, builder)?;
                } else if tag.start_el().matches("RequestId") {
                    builder = builder.custom(REQUEST_ID, try_data(&mut tag)?);
                }
            }
        }
        ErrorWrapping::Unwrapped => {
            if !root.start_el().matches("Error") {
                return Err(XmlDecodeError::custom(format!(
                    "expected Error as the root, found {}",
                    root.start_el().local()
                )));
            }
            builder = read_error_fields(&mut root, builder)?;
        }
    }
    Ok(builder)
}

fn read_error_fields(
    error: &mut ScopedDecoder<'_, '_>,
    mut builder: ErrorMetadataBuilder,
) -> Result<ErrorMetadataBuilder, XmlDecodeError> {
    while let Some(mut tag) = error.next_tag() {
        let start_el = tag.start_el();
        if start_el.matches("Code") {
            builder = builder.code(try_data(&mut tag)?);
        } else if start_el.matches("Message") {
            builder = builder.message(try_data(&mut tag)?);
        } else if start_el.matches("RequestId") {
            builder = builder.custom(REQUEST_ID, try_data(&mut tag)?);
        } else if start_el.matches("HostId") {
            builder = builder.custom(EXTENDED_REQUEST_ID, try_data(&mut tag)?);
        }
    }
    Ok(builder)
}

/// Returns a decoder scoped to the `<Error>` element holding the modeled error members.
pub fn error_scope<'a, 'b>(
    doc: &'a mut Document<'b>,
    wrapping: ErrorWrapping,
) -> Result<ScopedDecoder<'b, 'a>, XmlDecodeError> {
    let root = doc
        .next_start_element()
        .ok_or_else(|| XmlDecodeError::custom("no root found searching for an Error"))?;
    match wrapping {
        ErrorWrapping::Unwrapped => {
            if !root.matches("Error") {
                return Err(XmlDecodeError::custom("expected Error as root tag"));
            }
            Ok(doc.scoped_to(root))
        }
        ErrorWrapping::Wrapped => {
            if !root.matches("ErrorResponse") {
                return Err(XmlDecodeError::custom("expected ErrorResponse as root tag"));
            }
            while let Some(el) = doc.next_start_element() {
                if el.matches("Error") && el.depth() == 1 {
                    return Ok(doc.scoped_to(el));
                }
                // otherwise, ignore it
            }
            Err(XmlDecodeError::custom(
                "no Error found inside of ErrorResponse",
            ))
        }
    }
}

#[cfg(test)]
mod test {
    use super::{error_scope, parse_error_metadata, ErrorWrapping};
    use crate::decode::{try_data, Document};
    use shapecodec_types::error::EXTENDED_REQUEST_ID;

    const WRAPPED: &[u8] = br#"<ErrorResponse>
           <Error>
              <Type>Sender</Type>
              <Code>InvalidGreeting</Code>
              <Message>Hi</Message>
              <AnotherSetting>setting</AnotherSetting>
              <Ignore><This/></Ignore>
           </Error>
           <RequestId>foo-id</RequestId>
        </ErrorResponse>"#;

    const UNWRAPPED: &[u8] = br#"<Error>
            <Type>Sender</Type>
            <Code>NoSuchKey</Code>
            <Message>The resource you requested does not exist</Message>
            <RequestId>4442587FB7D0A2F9</RequestId>
            <HostId>host-id</HostId>
        </Error>"#;

    #[test]
    fn parse_wrapped_error() {
        let metadata = parse_error_metadata(WRAPPED, ErrorWrapping::Wrapped)
            .unwrap()
            .build();
        assert_eq!(metadata.code(), Some("InvalidGreeting"));
        assert_eq!(metadata.message(), Some("Hi"));
        assert_eq!(metadata.request_id(), Some("foo-id"));
    }

    #[test]
    fn parse_unwrapped_error() {
        let metadata = parse_error_metadata(UNWRAPPED, ErrorWrapping::Unwrapped)
            .unwrap()
            .build();
        assert_eq!(metadata.code(), Some("NoSuchKey"));
        assert_eq!(
            metadata.message(),
            Some("The resource you requested does not exist")
        );
        assert_eq!(metadata.request_id(), Some("4442587FB7D0A2F9"));
        assert_eq!(metadata.extra(EXTENDED_REQUEST_ID), Some("host-id"));
    }

    #[test]
    fn wrapping_mismatch_is_an_error() {
        parse_error_metadata(UNWRAPPED, ErrorWrapping::Wrapped).expect_err("no wrapper");
        parse_error_metadata(WRAPPED, ErrorWrapping::Unwrapped).expect_err("unexpected wrapper");
        parse_error_metadata(b"<ErrorResponse><Error>", ErrorWrapping::Wrapped)
            .expect_err("truncated");
    }

    #[test]
    fn find_wrapped_error_scope() {
        let mut doc = Document::try_from(WRAPPED).unwrap();
        let mut error = error_scope(&mut doc, ErrorWrapping::Wrapped).expect("contains error");
        let mut seen = vec![];
        while let Some(mut tag) = error.next_tag() {
            if tag.start_el().matches("AnotherSetting") {
                assert_eq!(try_data(&mut tag).unwrap(), "setting");
            }
            seen.push(tag.start_el().local().to_owned());
        }
        assert_eq!(seen, ["Type", "Code", "Message", "AnotherSetting", "Ignore"]);
    }

    #[test]
    fn find_unwrapped_error_scope() {
        let mut doc = Document::try_from(UNWRAPPED).unwrap();
        let error = error_scope(&mut doc, ErrorWrapping::Unwrapped).expect("contains error");
        assert!(error.start_el().matches("Error"));
    }

    #[test]
    fn no_error_in_response() {
        let mut doc = Document::try_from(&b"<ErrorResponse><Other/></ErrorResponse>"[..]).unwrap();
        error_scope(&mut doc, ErrorWrapping::Wrapped).expect_err("no error");
    }
}
