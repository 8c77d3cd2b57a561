/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Decode diagnostics: a failed decode reports the bytes leading up to the point where the
//! decoder gave up, bounded by a [`RingBuffer`].

use crate::ring_buffer::RingBuffer;
use bytes::Bytes;
use shapecodec_types::error::DecodeOffset;
use std::error::Error as StdError;
use std::io::{self, Read};
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Bytes past the failure offset kept in a snapshot, so the offending token is visible.
pub const SNAPSHOT_LOOKAHEAD: usize = 32;

/// A request or response body failed to decode.
///
/// The snapshot holds at most [`RING_BUFFER_CAPACITY`](crate::ring_buffer::RING_BUFFER_CAPACITY)
/// bytes: the input up to the failure when the decoder reports where it stopped, otherwise the
/// tail of the input.
#[derive(Debug, Error)]
#[error("failed to decode body ({} byte snapshot: {:?})", .snapshot.len(), String::from_utf8_lossy(.snapshot))]
pub struct DeserializationError {
    #[source]
    cause: BoxError,
    snapshot: Bytes,
}

impl DeserializationError {
    /// Wraps `cause` with a snapshot taken from `ring`.
    pub fn new(cause: impl Into<BoxError>, ring: &RingBuffer) -> Self {
        DeserializationError {
            cause: cause.into(),
            snapshot: Bytes::from(ring.contents()),
        }
    }

    /// Wraps `cause`, snapshotting the tail of a fully buffered `body`.
    pub fn from_body(cause: impl Into<BoxError>, body: &[u8]) -> Self {
        let mut ring = RingBuffer::new();
        ring.push(body);
        Self::new(cause, &ring)
    }

    /// The underlying decode error.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// The captured tail of the input.
    pub fn snapshot(&self) -> &Bytes {
        &self.snapshot
    }
}

/// A reader that remembers the last bytes it yielded.
#[derive(Debug)]
pub struct SnapshotReader<R> {
    inner: R,
    ring: RingBuffer,
}

impl<R: Read> SnapshotReader<R> {
    /// Wraps `inner`.
    pub fn new(inner: R) -> Self {
        SnapshotReader {
            inner,
            ring: RingBuffer::new(),
        }
    }

    /// The bytes most recently read.
    pub fn ring(&self) -> &RingBuffer {
        &self.ring
    }
}

impl<R: Read> Read for SnapshotReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.ring.push(&buf[..n]);
        Ok(n)
    }
}

/// Reads `body` through a [`SnapshotReader`] and runs `decode` over it.
///
/// Reader errors and decode errors are both returned as a [`DeserializationError`] carrying a
/// snapshot. A decode error that knows its offset is snapshotted at that offset, plus
/// [`SNAPSHOT_LOOKAHEAD`] bytes; otherwise the snapshot is the tail of the body.
pub fn with_snapshot<R, T, E, F>(body: R, decode: F) -> Result<T, DeserializationError>
where
    R: Read,
    E: Into<BoxError> + DecodeOffset,
    F: FnOnce(&[u8]) -> Result<T, E>,
{
    let mut reader = SnapshotReader::new(body);
    let mut bytes = Vec::new();
    if let Err(err) = reader.read_to_end(&mut bytes) {
        return Err(DeserializationError::new(err, reader.ring()));
    }
    decode(&bytes).map_err(|err| {
        let offset = err.decode_offset();
        let err = match offset {
            Some(offset) => {
                let end = offset.saturating_add(SNAPSHOT_LOOKAHEAD).min(bytes.len());
                let mut ring = RingBuffer::new();
                ring.push(&bytes[..end]);
                DeserializationError::new(err, &ring)
            }
            None => DeserializationError::new(err, reader.ring()),
        };
        tracing::debug!(
            snapshot_len = err.snapshot().len(),
            failure_offset = ?offset,
            "body failed to decode"
        );
        err
    })
}
