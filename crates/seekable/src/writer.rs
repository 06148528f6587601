use config::Config;
use seektable::{write_table, Table, TableEntry};
use std::io::{self, Write};
use tracing::{debug, trace, warn};

use crate::codec::{BlockCodec, ZstdCodec};
use crate::error::{Result, SeekableError};

/// Splits its input into fixed-size frames, compresses each one independently
/// and appends a seek table on [`close`](SeekableWriter::close).
///
/// Frame boundaries depend only on the total input and the frame size, never
/// on how the input is chunked across calls: every frame except the last one
/// holds exactly `frame_size` decompressed bytes.
///
/// The writer is meant for use from one thread at a time; it does no internal
/// locking.
pub struct SeekableWriter<W: Write, C: BlockCodec = ZstdCodec> {
    inner: W,
    frame_size: usize,
    /// Bytes of the frame being filled; always shorter than `frame_size`
    /// between calls.
    frame_buf: Vec<u8>,
    /// Reusable output buffer for the codec.
    encode_buf: Vec<u8>,
    /// `None` once the writer is closed.
    codec: Option<C>,
    table: Table,
    closed: bool,
    /// Set when a frame write to the sink failed. The sink may then hold a
    /// truncated frame the table does not describe, so nothing more is written.
    failed: Option<io::ErrorKind>,
}

impl<W: Write> SeekableWriter<W> {
    /// Creates a zstd writer at the default compression level.
    ///
    /// # Errors
    ///
    /// Returns an error if `frame_size` is 0 or above `u32::MAX`, or if the
    /// zstd context cannot be created.
    pub fn new(inner: W, frame_size: usize) -> Result<Self> {
        Self::with_level(inner, frame_size, config::DEFAULT_LEVEL)
    }

    /// Creates a zstd writer at compression level `level`.
    ///
    /// # Errors
    ///
    /// Same as [`SeekableWriter::new`].
    pub fn with_level(inner: W, frame_size: usize, level: i32) -> Result<Self> {
        Self::with_codec(inner, frame_size, ZstdCodec::new(level)?)
    }

    /// Creates a zstd writer using the frame size and level from `cfg`.
    ///
    /// # Errors
    ///
    /// Same as [`SeekableWriter::new`].
    pub fn from_config(inner: W, cfg: &Config) -> Result<Self> {
        Self::with_level(inner, cfg.frame_size, cfg.level)
    }
}

impl<W: Write, C: BlockCodec> SeekableWriter<W, C> {
    /// Creates a writer around an already constructed codec.
    ///
    /// # Errors
    ///
    /// Returns [`SeekableError::InvalidFrameSize`] if `frame_size` is 0 or
    /// does not fit the u32 size fields of the seek table.
    pub fn with_codec(inner: W, frame_size: usize, codec: C) -> Result<Self> {
        if frame_size == 0 || u32::try_from(frame_size).is_err() {
            return Err(SeekableError::InvalidFrameSize(frame_size));
        }
        Ok(Self {
            inner,
            frame_size,
            frame_buf: Vec::with_capacity(frame_size),
            encode_buf: Vec::new(),
            codec: Some(codec),
            table: Table::new(),
            closed: false,
            failed: None,
        })
    }

    /// Decompressed bytes per frame.
    #[must_use]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Entries for every frame written so far.
    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Returns a reference to the underlying sink.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Returns `true` once [`close`](SeekableWriter::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Feeds `data` into the writer, emitting a frame each time `frame_size`
    /// bytes have accumulated. Returns `data.len()` on success.
    ///
    /// # Errors
    ///
    /// Returns [`SeekableError::Closed`] after close. A codec or sink failure
    /// is wrapped in [`SeekableError::PartialWrite`], whose `consumed` count
    /// says exactly how many bytes of `data` were taken (written as frames or
    /// buffered). After a sink failure the sink may hold a truncated frame,
    /// and every later `append` or `close` fails with
    /// [`SeekableError::SinkFailed`].
    pub fn append(&mut self, mut data: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(SeekableError::Closed);
        }
        if let Some(kind) = self.failed {
            return Err(SeekableError::SinkFailed { kind });
        }

        let mut consumed = 0usize;
        while !data.is_empty() {
            // Nothing buffered and a whole frame available: encode straight from `data`.
            if self.frame_buf.is_empty() && data.len() >= self.frame_size {
                let (frame, rest) = data.split_at(self.frame_size);
                self.emit_frame(frame)
                    .map_err(|e| SeekableError::partial(consumed, e))?;
                consumed += frame.len();
                data = rest;
                continue;
            }

            let take = (self.frame_size - self.frame_buf.len()).min(data.len());
            self.frame_buf.extend_from_slice(&data[..take]);

            if self.frame_buf.len() == self.frame_size {
                let frame = std::mem::take(&mut self.frame_buf);
                let res = self.emit_frame(&frame);
                self.frame_buf = frame;
                if let Err(e) = res {
                    // Hand the bytes from this call back to the caller.
                    self.frame_buf.truncate(self.frame_size - take);
                    return Err(SeekableError::partial(consumed, e));
                }
                self.frame_buf.clear();
            }

            consumed += take;
            data = &data[take..];
        }

        Ok(consumed)
    }

    /// Compresses `frame`, writes it to the sink and records its entry.
    fn emit_frame(&mut self, frame: &[u8]) -> Result<()> {
        let codec = self.codec.as_mut().ok_or(SeekableError::Closed)?;
        codec.encode(frame, &mut self.encode_buf)?;

        let compressed_size = u32::try_from(self.encode_buf.len())
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| SeekableError::EmptyFrame {
                size: self.encode_buf.len(),
            })?;
        let decompressed_size =
            u32::try_from(frame.len()).map_err(|_| SeekableError::InvalidFrameSize(frame.len()))?;

        if let Err(e) = self.inner.write_all(&self.encode_buf) {
            self.failed = Some(e.kind());
            return Err(SeekableError::io("writing frame", e));
        }

        self.table
            .append_entry(TableEntry::new(compressed_size, decompressed_size));
        trace!(
            frame = self.table.len() - 1,
            compressed_size,
            decompressed_size,
            "frame written"
        );
        Ok(())
    }

    /// Flushes the last (possibly short) frame, writes the seek table and
    /// releases the codec.
    ///
    /// Only the first call does any work. Later calls return `Ok(())` even if
    /// the first one failed, so the first result is the only place a
    /// truncated stream shows up.
    ///
    /// # Errors
    ///
    /// Returns the codec, sink or seek table error of the first call.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let res = self.finish_stream();
        self.codec = None;
        if let Err(ref e) = res {
            warn!(error = %e, frames = self.table.len(), "seekable writer close failed");
        }
        res
    }

    fn finish_stream(&mut self) -> Result<()> {
        if let Some(kind) = self.failed {
            return Err(SeekableError::SinkFailed { kind });
        }
        if !self.frame_buf.is_empty() {
            let frame = std::mem::take(&mut self.frame_buf);
            self.emit_frame(&frame)?;
        }

        let table_bytes = write_table(&self.table, &mut self.inner)?;
        self.inner
            .flush()
            .map_err(|e| SeekableError::io("flushing sink", e))?;

        debug!(
            frames = self.table.len(),
            decompressed = self.table.total_decompressed_size(),
            compressed = self.table.total_compressed_size(),
            table_bytes,
            "seekable stream finished"
        );
        Ok(())
    }

    /// Closes the writer and returns the underlying sink.
    ///
    /// # Errors
    ///
    /// Returns the error of [`close`](SeekableWriter::close); the sink is
    /// dropped in that case.
    pub fn finish(mut self) -> Result<W> {
        self.close()?;
        Ok(self.inner)
    }
}

impl<W: Write, C: BlockCodec> Write for SeekableWriter<W, C> {
    /// Accepts `buf` through [`SeekableWriter::append`].
    ///
    /// If a failure happens after some bytes were taken, those bytes are
    /// reported as written. A sink failure is remembered, so the next call
    /// (and `close`) surfaces it instead of writing past a truncated frame.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.append(buf) {
            Ok(n) => Ok(n),
            Err(SeekableError::PartialWrite { consumed, .. }) if consumed > 0 => Ok(consumed),
            Err(e) => Err(e.into()),
        }
    }

    /// Flushes the sink. Never cuts a frame: frame boundaries stay
    /// independent of when callers flush.
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
