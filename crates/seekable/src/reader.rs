use seektable::{read_table, Table};
use std::io::{self, Read, Seek, SeekFrom};
use tracing::{debug, trace};

use crate::codec::{BlockCodec, ZstdCodec};
use crate::error::{Result, SeekableError};

/// Random-access reader over a seekable stream.
///
/// On construction the seek table is loaded from the tail of the source and
/// checked against the source length. Reads decode one whole frame at a time,
/// lazily: seeking never decodes anything, and seeking inside the frame that
/// is already decoded only moves a cursor.
///
/// The reader is meant for use from one thread at a time; it does no internal
/// locking.
pub struct SeekableReader<R: Read + Seek, C: BlockCodec = ZstdCodec> {
    inner: R,
    /// `None` once the reader is closed.
    codec: Option<C>,
    table: Table,

    /// Absolute position in the decompressed data.
    offset: u64,
    decompressed_size: u64,
    /// Stream length minus the seek table.
    compressed_data_size: u64,

    frame_index: usize,
    frame_loaded: bool,
    frame_buf: Vec<u8>,
    /// Bytes of `frame_buf` already handed out.
    frame_pos: usize,

    /// Reusable buffer for the compressed bytes of one frame.
    compressed_buf: Vec<u8>,
}

impl<R: Read + Seek> SeekableReader<R> {
    /// Opens a zstd-compressed seekable stream.
    ///
    /// # Errors
    ///
    /// See [`SeekableReader::with_codec`].
    pub fn new(inner: R) -> Result<Self> {
        Self::with_codec(inner, ZstdCodec::decoder()?)
    }
}

impl<R: Read + Seek, C: BlockCodec> SeekableReader<R, C> {
    /// Opens a seekable stream whose frames are decoded by `codec`.
    ///
    /// # Errors
    ///
    /// - a [`SeekableError::Table`] format or I/O error if the seek table is
    ///   missing or malformed;
    /// - [`SeekableError::InconsistentTable`] if the frames listed in the
    ///   table need more bytes than precede the table;
    /// - [`SeekableError::Io`] if the stream length cannot be determined.
    pub fn with_codec(mut inner: R, codec: C) -> Result<Self> {
        let table = read_table(&mut inner)?;
        table.cache_offsets();

        let decompressed_size = table.total_decompressed_size();
        let stream_len = inner
            .seek(SeekFrom::End(0))
            .map_err(|e| SeekableError::io("seeking to end to measure stream", e))?;
        let compressed_data_size = stream_len.saturating_sub(table.serialized_size() as u64);

        // Trailing bytes between the last frame and the table are tolerated.
        let expected = table.total_compressed_size();
        if expected > compressed_data_size {
            return Err(SeekableError::InconsistentTable {
                expected,
                actual: compressed_data_size,
            });
        }

        debug!(
            frames = table.len(),
            decompressed_size,
            compressed_data_size,
            "seekable stream opened"
        );

        Ok(Self {
            inner,
            codec: Some(codec),
            table,
            offset: 0,
            decompressed_size,
            compressed_data_size,
            frame_index: 0,
            frame_loaded: false,
            frame_buf: Vec::new(),
            frame_pos: 0,
            compressed_buf: Vec::new(),
        })
    }

    /// Total size of the decompressed data.
    #[must_use]
    pub fn decompressed_size(&self) -> u64 {
        self.decompressed_size
    }

    /// Size of the stream without its seek table.
    #[must_use]
    pub fn compressed_data_size(&self) -> u64 {
        self.compressed_data_size
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Current position in the decompressed data.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Releases the codec. Later reads fail with [`SeekableError::Closed`];
    /// calling `close` again is a no-op.
    pub fn close(&mut self) {
        self.codec = None;
    }

    /// Returns the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Copies decoded bytes into `buf`, loading the frame under the current
    /// offset if needed. Returns 0 at end of data.
    fn read_frames(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.codec.is_none() {
            return Err(SeekableError::Closed);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if self.frame_index >= self.table.len() || self.offset >= self.decompressed_size {
            return Ok(0);
        }

        if !self.frame_loaded {
            self.load_frame()?;
        }

        let available = &self.frame_buf[self.frame_pos..];
        let n = buf.len().min(available.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.frame_pos += n;
        self.offset += n as u64;

        // Frame exhausted: the next one loads on the next call.
        if self.frame_pos >= self.frame_buf.len() {
            self.frame_index += 1;
            self.frame_loaded = false;
            self.frame_pos = 0;
        }

        Ok(n)
    }

    fn load_frame(&mut self) -> Result<()> {
        let at = self
            .table
            .find(self.offset)
            .ok_or(SeekableError::FrameNotFound(self.offset))?;
        let entry = self.table.entry(at.entry_index);

        self.inner
            .seek(SeekFrom::Start(at.entry_offset_in_compressed))
            .map_err(|e| SeekableError::io("seeking to frame", e))?;
        self.compressed_buf.resize(entry.compressed_size as usize, 0);
        self.inner
            .read_exact(&mut self.compressed_buf)
            .map_err(|e| SeekableError::io("reading compressed frame", e))?;

        let codec = self.codec.as_mut().ok_or(SeekableError::Closed)?;
        codec.decode(
            &self.compressed_buf,
            entry.decompressed_size as usize,
            &mut self.frame_buf,
        )?;
        if self.frame_buf.len() != entry.decompressed_size as usize {
            return Err(SeekableError::FrameSizeMismatch {
                index: at.entry_index,
                expected: entry.decompressed_size,
                actual: self.frame_buf.len(),
            });
        }

        // A seek may have left the cursor inside this frame.
        self.frame_pos = (self.offset - at.entry_offset_in_decompressed) as usize;
        self.frame_index = at.entry_index;
        self.frame_loaded = true;

        trace!(
            frame = at.entry_index,
            compressed_size = entry.compressed_size,
            decompressed_size = entry.decompressed_size,
            "frame loaded"
        );
        Ok(())
    }

    /// Moves to `pos`, resolving `SeekFrom` against the decompressed data.
    fn seek_to(&mut self, pos: SeekFrom) -> Result<u64> {
        let size = self.decompressed_size;
        let target = match pos {
            SeekFrom::Start(n) => n,
            // Always answers "where am I", even past the end.
            SeekFrom::Current(0) => return Ok(self.offset),
            SeekFrom::Current(n) => resolve_relative(self.offset, n, size)?,
            SeekFrom::End(n) => resolve_relative(size, n, size)?,
        };

        if target > self.decompressed_size {
            return Err(SeekableError::OutOfRange {
                offset: target,
                size: self.decompressed_size,
            });
        }

        if target == self.decompressed_size {
            self.frame_index = self.table.len();
            self.frame_loaded = false;
            self.frame_pos = 0;
            self.offset = target;
            return Ok(target);
        }

        let at = self
            .table
            .find(target)
            .ok_or(SeekableError::FrameNotFound(target))?;
        if at.entry_index != self.frame_index {
            self.frame_index = at.entry_index;
            self.frame_loaded = false;
        }
        self.frame_pos = (target - at.entry_offset_in_decompressed) as usize;
        self.offset = target;

        Ok(target)
    }
}

/// Applies a relative seek of `delta` to `base` in data of `size` bytes.
pub(crate) fn resolve_relative(base: u64, delta: i64, size: u64) -> Result<u64> {
    base.checked_add_signed(delta).ok_or(if delta < 0 {
        SeekableError::NegativeOffset
    } else {
        SeekableError::OutOfRange {
            offset: u64::MAX,
            size,
        }
    })
}

impl<R: Read + Seek, C: BlockCodec> Read for SeekableReader<R, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_frames(buf)?)
    }
}

impl<R: Read + Seek, C: BlockCodec> Seek for SeekableReader<R, C> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.seek_to(pos)?)
    }
}
