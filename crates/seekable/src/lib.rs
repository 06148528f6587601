//! # Seekable - random-access compressed streams
//!
//! [`SeekableWriter`] splits input into fixed-size frames, compresses each one
//! independently with a [`BlockCodec`] (zstd by default) and appends a
//! [`seektable`] on close. [`SeekableReader`] loads that table from the tail
//! of the stream and serves `Read + Seek` over the decompressed data,
//! decoding only the frame that holds the requested offset.
//!
//! ```text
//! write:  bytes -> frame buffer -> codec.encode -> sink      (+ table entry)
//!         close -> last frame -> seek table -> sink
//!
//! read:   tail -> seek table -> find(offset) -> seek sink
//!         -> read compressed frame -> codec.decode -> caller
//! ```
//!
//! Frames are regular zstd frames and the seek table is a zstd skippable
//! frame, so any zstd decoder can still decompress the whole stream.
//!
//! ## Example
//!
//! ```rust
//! use seekable::{SeekableReader, SeekableWriter};
//! use std::io::{Cursor, Read, Seek, SeekFrom, Write};
//!
//! let data: Vec<u8> = (0..10_000u32).flat_map(|i| i.to_le_bytes()).collect();
//!
//! let mut w = SeekableWriter::new(Vec::new(), 4096).unwrap();
//! w.write_all(&data).unwrap();
//! let compressed = w.finish().unwrap();
//!
//! let mut r = SeekableReader::new(Cursor::new(compressed)).unwrap();
//! r.seek(SeekFrom::Start(20_000)).unwrap();
//! let mut buf = [0u8; 8];
//! r.read_exact(&mut buf).unwrap();
//! assert_eq!(&buf, &data[20_000..20_008]);
//! ```

mod codec;
mod error;
mod reader;
mod writer;

pub use codec::{BlockCodec, ZstdCodec};
pub use error::{CodecError, Result, SeekableError};
pub use reader::SeekableReader;
pub use writer::SeekableWriter;

#[cfg(test)]
mod tests;
