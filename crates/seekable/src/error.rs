//! Error types for the seekable writer and reader.
//!
//! ## Categories
//!
//! - Construction: `Codec(CodecError::Init)`, `InvalidFrameSize`
//! - Format: `Table(..)`, `InconsistentTable`, `FrameSizeMismatch`, `EmptyFrame`
//! - I/O: `Io { context, .. }` names the step that failed
//! - Range: `NegativeOffset`, `OutOfRange`
//! - Lookup: `FrameNotFound` (an in-range offset the table cannot place)
//! - State: `Closed`, `SinkFailed` (an earlier frame write left the sink truncated)

use seektable::SeekTableError;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SeekableError>;

/// Failures reported by a [`BlockCodec`](crate::BlockCodec).
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to create {codec} context: {source}")]
    Init {
        codec: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{codec} failed to encode frame: {source}")]
    Encode {
        codec: &'static str,
        #[source]
        source: io::Error,
    },

    /// Malformed or truncated compressed input.
    #[error("{codec} failed to decode frame (corrupt data?): {source}")]
    Decode {
        codec: &'static str,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SeekableError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid frame size {0}: must be between 1 and {max}", max = u32::MAX)]
    InvalidFrameSize(usize),

    #[error("failed to read seek table: {0}")]
    Table(#[from] SeekTableError),

    #[error(
        "seek table does not match stream: frames need {expected} bytes, stream holds {actual}"
    )]
    InconsistentTable { expected: u64, actual: u64 },

    #[error("frame {index} decoded to {actual} bytes, seek table says {expected}")]
    FrameSizeMismatch {
        index: usize,
        expected: u32,
        actual: usize,
    },

    #[error("codec produced an unusable frame of {size} bytes")]
    EmptyFrame { size: usize },

    #[error("error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("negative seek position")]
    NegativeOffset,

    #[error("offset {offset} is beyond end of data ({size} bytes)")]
    OutOfRange { offset: u64, size: u64 },

    #[error("no frame contains offset {0}")]
    FrameNotFound(u64),

    #[error("stream is closed")]
    Closed,

    /// A frame write failed earlier; the sink may hold a truncated frame.
    #[error("an earlier write to the sink failed ({kind}); the stream is incomplete")]
    SinkFailed { kind: io::ErrorKind },

    /// A write failed part-way; `consumed` input bytes were accepted before it.
    #[error("write failed after consuming {consumed} input bytes: {source}")]
    PartialWrite {
        consumed: usize,
        #[source]
        source: Box<SeekableError>,
    },
}

impl SeekableError {
    pub(crate) fn io(context: &'static str, source: io::Error) -> Self {
        SeekableError::Io { context, source }
    }

    pub(crate) fn partial(consumed: usize, source: SeekableError) -> Self {
        SeekableError::PartialWrite {
            consumed,
            source: Box::new(source),
        }
    }

    /// Input bytes accepted by the writer before this error, if it came from a write.
    #[must_use]
    pub fn consumed(&self) -> Option<usize> {
        match self {
            SeekableError::PartialWrite { consumed, .. } => Some(*consumed),
            _ => None,
        }
    }

    fn kind(&self) -> io::ErrorKind {
        match self {
            SeekableError::Io { source, .. } => source.kind(),
            SeekableError::Table(SeekTableError::Io { source, .. }) => source.kind(),
            SeekableError::Table(SeekTableError::PartialWrite { source, .. }) => source.kind(),
            SeekableError::PartialWrite { source, .. } => source.kind(),
            SeekableError::SinkFailed { kind } => *kind,
            SeekableError::NegativeOffset
            | SeekableError::OutOfRange { .. }
            | SeekableError::InvalidFrameSize(_) => io::ErrorKind::InvalidInput,
            SeekableError::Closed => io::ErrorKind::BrokenPipe,
            SeekableError::Codec(CodecError::Init { .. }) => io::ErrorKind::Other,
            _ => io::ErrorKind::InvalidData,
        }
    }
}

impl From<SeekableError> for io::Error {
    fn from(e: SeekableError) -> Self {
        io::Error::new(e.kind(), e)
    }
}
