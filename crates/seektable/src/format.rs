//! Seek table binary format constants and read/write helpers.
//!
//! ```text
//! [magic: u32 LE = 0x184D2A5E][declared_size: u32 LE]
//! [compressed_size: u32 LE][decompressed_size: u32 LE]   x entry_count
//! [entry_count: u32 LE][descriptor: u8][magic: u32 LE = 0x8F92EAB1]
//! ```
//!
//! The table is anchored at the tail of the stream. The reader parses the
//! footer first, derives the table size from the entry count, then seeks back
//! to the header.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::SeekTableError;
use crate::table::{Table, TableEntry};

/// Header magic. Falls in the zstd skippable-frame range, so standard zstd
/// decoders skip the whole table.
pub const HEADER_MAGIC: u32 = 0x184D_2A5E;

/// Footer magic, the last 4 bytes of every seekable stream.
pub const FOOTER_MAGIC: u32 = 0x8F92_EAB1;

/// Header size: 4 (`magic`) + 4 (`declared_size`).
pub const HEADER_BYTES: usize = 4 + 4;

/// Entry size: 4 (`compressed_size`) + 4 (`decompressed_size`).
pub const ENTRY_BYTES: usize = 4 + 4;

/// Footer size: 4 (`entry_count`) + 1 (`descriptor`) + 4 (`magic`).
pub const FOOTER_BYTES: usize = 4 + 1 + 4;

/// Descriptor bit 7. When set, entries would carry a checksum and be 12 bytes
/// wide; this format never sets it.
pub const DESCRIPTOR_CHECKSUM_FLAG: u8 = 0x80;

/// Value of the header's `declared_size` field for `entries` entries.
fn declared_size(entries: u64) -> u64 {
    entries * ENTRY_BYTES as u64 + FOOTER_BYTES as u64
}

/// Serializes `table` into its on-disk form.
///
/// # Errors
///
/// Returns [`SeekTableError::TooManyEntries`] if the entry count or the
/// declared size does not fit the u32 fields.
pub fn encode_table(table: &Table) -> Result<Vec<u8>, SeekTableError> {
    let too_many = || SeekTableError::TooManyEntries {
        entries: table.len(),
    };
    let entry_count = u32::try_from(table.len()).map_err(|_| too_many())?;
    let declared = u32::try_from(declared_size(u64::from(entry_count))).map_err(|_| too_many())?;

    let mut buf = vec![0u8; table.serialized_size()];
    let (header, rest) = buf.split_at_mut(HEADER_BYTES);
    let (entries, footer) = rest.split_at_mut(table.entries_byte_len());

    LittleEndian::write_u32(&mut header[0..4], HEADER_MAGIC);
    LittleEndian::write_u32(&mut header[4..8], declared);

    for (chunk, entry) in entries.chunks_exact_mut(ENTRY_BYTES).zip(table.entries()) {
        LittleEndian::write_u32(&mut chunk[0..4], entry.compressed_size);
        LittleEndian::write_u32(&mut chunk[4..8], entry.decompressed_size);
    }

    LittleEndian::write_u32(&mut footer[0..4], entry_count);
    footer[4] = 0; // descriptor: no checksums, reserved bits clear
    LittleEndian::write_u32(&mut footer[5..9], FOOTER_MAGIC);

    Ok(buf)
}

/// Names the section that byte `pos` of a serialized table belongs to.
fn section_at(pos: usize, entries_len: usize) -> &'static str {
    if pos < HEADER_BYTES {
        "writing seek table header"
    } else if pos < HEADER_BYTES + entries_len {
        "writing seek table entries"
    } else {
        "writing seek table footer"
    }
}

/// Writes `table` to `w` and returns the number of bytes written.
///
/// # Errors
///
/// On an I/O failure returns [`SeekTableError::PartialWrite`] carrying the
/// exact number of bytes that reached `w`, so callers can tell how much of
/// the stream tail is missing.
pub fn write_table<W: Write>(table: &Table, w: &mut W) -> Result<u64, SeekTableError> {
    let buf = encode_table(table)?;
    let entries_len = table.entries_byte_len();

    let mut written = 0usize;
    while written < buf.len() {
        match w.write(&buf[written..]) {
            Ok(0) => {
                return Err(SeekTableError::PartialWrite {
                    context: section_at(written, entries_len),
                    written: written as u64,
                    source: io::Error::from(io::ErrorKind::WriteZero),
                })
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                return Err(SeekTableError::PartialWrite {
                    context: section_at(written, entries_len),
                    written: written as u64,
                    source: e,
                })
            }
        }
    }

    Ok(written as u64)
}

/// Reads and validates the seek table at the tail of `r`.
///
/// # Validation
///
/// - The footer magic must be [`FOOTER_MAGIC`].
/// - The descriptor must not request checksums.
/// - The header magic must be [`HEADER_MAGIC`].
/// - The header's declared size must equal `entry_count * 8 + 9`.
/// - Every entry's compressed size must be non-zero.
///
/// The position of `r` is left somewhere inside the table.
///
/// # Errors
///
/// Returns a format variant of [`SeekTableError`] for malformed bytes and
/// [`SeekTableError::Io`] (naming the failed step) for I/O failures,
/// including a stream too short to hold the table.
pub fn read_table<R: Read + Seek>(r: &mut R) -> Result<Table, SeekTableError> {
    r.seek(SeekFrom::End(-(FOOTER_BYTES as i64)))
        .map_err(|e| SeekTableError::io("seeking to seek table footer", e))?;
    let mut footer = [0u8; FOOTER_BYTES];
    r.read_exact(&mut footer)
        .map_err(|e| SeekTableError::io("reading seek table footer", e))?;

    let entry_count = LittleEndian::read_u32(&footer[0..4]);
    let descriptor = footer[4];
    let footer_magic = LittleEndian::read_u32(&footer[5..9]);
    if footer_magic != FOOTER_MAGIC {
        return Err(SeekTableError::FooterMagic {
            found: footer_magic,
        });
    }
    if descriptor & DESCRIPTOR_CHECKSUM_FLAG != 0 {
        return Err(SeekTableError::UnsupportedDescriptor { descriptor });
    }

    let expected = declared_size(u64::from(entry_count));
    let table_size = HEADER_BYTES as u64 + expected;
    r.seek(SeekFrom::End(-(table_size as i64)))
        .map_err(|e| SeekTableError::io("seeking to seek table start", e))?;

    let header_magic = r
        .read_u32::<LittleEndian>()
        .map_err(|e| SeekTableError::io("reading seek table header", e))?;
    if header_magic != HEADER_MAGIC {
        return Err(SeekTableError::HeaderMagic {
            found: header_magic,
        });
    }
    let declared = r
        .read_u32::<LittleEndian>()
        .map_err(|e| SeekTableError::io("reading seek table header", e))?;
    if u64::from(declared) != expected {
        return Err(SeekTableError::SizeMismatch {
            declared,
            expected,
            entries: entry_count,
        });
    }

    let mut raw = vec![0u8; entry_count as usize * ENTRY_BYTES];
    r.read_exact(&mut raw)
        .map_err(|e| SeekTableError::io("reading seek table entries", e))?;

    let mut entries = Vec::with_capacity(entry_count as usize);
    for (index, mut chunk) in raw.chunks_exact(ENTRY_BYTES).enumerate() {
        let compressed_size = chunk
            .read_u32::<LittleEndian>()
            .map_err(|e| SeekTableError::io("decoding seek table entry", e))?;
        let decompressed_size = chunk
            .read_u32::<LittleEndian>()
            .map_err(|e| SeekTableError::io("decoding seek table entry", e))?;
        // Empty frames are not allowed; a zero here means corruption.
        if compressed_size == 0 {
            return Err(SeekTableError::EmptyEntry { index });
        }
        entries.push(TableEntry::new(compressed_size, decompressed_size));
    }

    Ok(Table::from_entries(entries))
}

/// Writes a single entry in its on-disk form. Used by tests that hand-craft tables.
#[cfg(test)]
pub(crate) fn write_entry<W: Write>(w: &mut W, entry: TableEntry) -> io::Result<()> {
    use byteorder::WriteBytesExt;

    w.write_u32::<LittleEndian>(entry.compressed_size)?;
    w.write_u32::<LittleEndian>(entry.decompressed_size)?;
    Ok(())
}
