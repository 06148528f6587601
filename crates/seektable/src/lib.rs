//! # Seek Table
//!
//! Trailing frame index for seekable compressed streams.
//!
//! A seekable stream is a sequence of independently compressed frames. The
//! seek table records each frame's compressed and decompressed size so that a
//! decompressed offset can be resolved to an exact byte range of the
//! compressed stream without decoding anything else.
//!
//! ## Stream layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ FRAMES (independently decodable compressed blocks)            │
//! │                                                               │
//! │ frame 0 | frame 1 | ... | frame N-1                            │
//! ├───────────────────────────────────────────────────────────────┤
//! │ SEEK TABLE HEADER (8 bytes)                                   │
//! │                                                               │
//! │ magic (u32 LE) 0x184D2A5E | declared_size (u32 LE)            │
//! ├───────────────────────────────────────────────────────────────┤
//! │ ENTRIES (8 bytes each, frame order)                           │
//! │                                                               │
//! │ compressed_size (u32 LE) | decompressed_size (u32 LE)         │
//! ├───────────────────────────────────────────────────────────────┤
//! │ FOOTER (always last 9 bytes)                                  │
//! │                                                               │
//! │ entry_count (u32 LE) | descriptor (u8) | magic (u32 LE)       │
//! │ 0x8F92EAB1                                                    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! `declared_size` counts everything after the header: the entries plus the
//! 9-byte footer. The header magic is a zstd skippable-frame magic, so plain
//! zstd decoders step over the table.
//!
//! ## Example
//!
//! ```rust
//! use seektable::{read_table, write_table, Table, TableEntry};
//! use std::io::Cursor;
//!
//! let mut table = Table::new();
//! table.append_entry(TableEntry::new(120, 1000));
//! table.append_entry(TableEntry::new(80, 500));
//!
//! let mut buf = Vec::new();
//! write_table(&table, &mut buf).unwrap();
//!
//! let read_back = read_table(&mut Cursor::new(buf)).unwrap();
//! let hit = read_back.find(1200).unwrap();
//! assert_eq!(hit.entry_index, 1);
//! assert_eq!(hit.entry_offset_in_decompressed, 1000);
//! ```

mod error;
mod format;
mod table;

pub use error::SeekTableError;
pub use format::{
    encode_table, read_table, write_table, DESCRIPTOR_CHECKSUM_FLAG, ENTRY_BYTES, FOOTER_BYTES,
    FOOTER_MAGIC, HEADER_BYTES, HEADER_MAGIC,
};
pub use table::{Table, TableEntry, TableOffset, LINEAR_SEARCH_THRESHOLD};
