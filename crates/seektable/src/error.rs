use std::io;

use thiserror::Error;

/// Errors produced while reading or writing a seek table.
#[derive(Debug, Error)]
pub enum SeekTableError {
    /// The 4 bytes at the start of the table are not [`HEADER_MAGIC`](crate::HEADER_MAGIC).
    #[error("invalid seek table: bad header magic {found:#010x}")]
    HeaderMagic { found: u32 },

    /// The last 4 bytes of the stream are not [`FOOTER_MAGIC`](crate::FOOTER_MAGIC).
    #[error("invalid seek table: bad footer magic {found:#010x}")]
    FooterMagic { found: u32 },

    /// The header's declared size disagrees with the footer's entry count.
    #[error("invalid seek table: declared size {declared} but {entries} entries need {expected}")]
    SizeMismatch {
        declared: u32,
        expected: u64,
        entries: u32,
    },

    /// An entry claims a zero-length compressed frame.
    #[error("invalid seek table: entry {index} has an empty compressed frame")]
    EmptyEntry { index: usize },

    /// The footer descriptor asks for per-entry checksums, which this format
    /// does not carry.
    #[error("unsupported seek table descriptor {descriptor:#04x}")]
    UnsupportedDescriptor { descriptor: u8 },

    /// The table has more entries than the u32 header and footer fields can describe.
    #[error("seek table too large: {entries} entries")]
    TooManyEntries { entries: usize },

    /// An underlying read or seek failed.
    #[error("error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// Writing the table failed after `written` bytes reached the sink.
    #[error("error while {context} ({written} bytes written): {source}")]
    PartialWrite {
        context: &'static str,
        written: u64,
        #[source]
        source: io::Error,
    },
}

impl SeekTableError {
    pub(crate) fn io(context: &'static str, source: io::Error) -> Self {
        SeekTableError::Io { context, source }
    }

    /// Returns `true` for errors caused by malformed table bytes rather than I/O.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        !matches!(
            self,
            SeekTableError::Io { .. } | SeekTableError::PartialWrite { .. }
        )
    }

    /// Bytes that reached the sink before a failed [`write_table`](crate::write_table).
    #[must_use]
    pub fn bytes_written(&self) -> Option<u64> {
        match self {
            SeekTableError::PartialWrite { written, .. } => Some(*written),
            _ => None,
        }
    }
}
