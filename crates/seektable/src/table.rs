//! In-memory seek table with a lazily built cumulative-offset index.

use std::sync::OnceLock;

/// Tables with fewer entries than this are searched linearly; larger ones use
/// binary search. Both strategies return the same result.
pub const LINEAR_SEARCH_THRESHOLD: usize = 32;

/// Sizes of one frame, as recorded in the seek table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableEntry {
    /// Size of the frame in the compressed stream.
    pub compressed_size: u32,
    /// Size of the frame once decoded.
    pub decompressed_size: u32,
}

impl TableEntry {
    #[must_use]
    pub fn new(compressed_size: u32, decompressed_size: u32) -> Self {
        Self {
            compressed_size,
            decompressed_size,
        }
    }
}

/// Location of one entry: its index plus the sum of all preceding entries'
/// compressed and decompressed sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableOffset {
    pub entry_index: usize,
    pub entry_offset_in_compressed: u64,
    pub entry_offset_in_decompressed: u64,
}

/// Ordered frame index. Entry `i` describes the `i`-th frame of the stream.
///
/// The cumulative offsets are computed once, on first lookup, and reused
/// afterwards. Lookups take `&self` and may run from several threads; any
/// mutation takes `&mut self` and drops the cached offsets, so a stale or
/// half-built cache is never observed.
#[derive(Debug, Clone, Default)]
pub struct Table {
    entries: Vec<TableEntry>,
    offsets: OnceLock<Vec<TableOffset>>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: Vec<TableEntry>) -> Self {
        Self {
            entries,
            offsets: OnceLock::new(),
        }
    }

    /// Returns entry `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn entry(&self, index: usize) -> TableEntry {
        self.entries[index]
    }

    /// Overwrites entry `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn set_entry(&mut self, index: usize, entry: TableEntry) {
        self.entries[index] = entry;
        self.offsets.take();
    }

    /// Appends an entry for the next frame.
    pub fn append_entry(&mut self, entry: TableEntry) {
        self.entries.push(entry);
        self.offsets.take();
    }

    /// Returns all entries in frame order.
    #[must_use]
    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the entry section in bytes.
    #[must_use]
    pub fn entries_byte_len(&self) -> usize {
        self.entries.len() * crate::ENTRY_BYTES
    }

    /// Size of the serialized table: header + entries + footer.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        crate::HEADER_BYTES + self.entries_byte_len() + crate::FOOTER_BYTES
    }

    /// Sum of all decompressed sizes.
    #[must_use]
    pub fn total_decompressed_size(&self) -> u64 {
        match self.entries.last() {
            Some(last) => {
                let offset = self.offsets_by_index(self.entries.len() - 1);
                offset.entry_offset_in_decompressed + u64::from(last.decompressed_size)
            }
            None => 0,
        }
    }

    /// Sum of all compressed sizes.
    #[must_use]
    pub fn total_compressed_size(&self) -> u64 {
        match self.entries.last() {
            Some(last) => {
                let offset = self.offsets_by_index(self.entries.len() - 1);
                offset.entry_offset_in_compressed + u64::from(last.compressed_size)
            }
            None => 0,
        }
    }

    /// Builds the cumulative offset index if it does not exist yet.
    pub fn cache_offsets(&self) {
        self.cached_offsets();
    }

    /// Returns the cumulative offsets of entry `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn offsets_by_index(&self, index: usize) -> TableOffset {
        self.cached_offsets()[index]
    }

    /// Resolves the entry whose decompressed range `[start, start + size)`
    /// contains `offset`.
    ///
    /// Returns `None` for an empty table or when `offset` lies at or past the
    /// end of the decompressed data.
    #[must_use]
    pub fn find(&self, offset: u64) -> Option<TableOffset> {
        let offsets = self.cached_offsets();
        if offsets.len() < LINEAR_SEARCH_THRESHOLD {
            self.find_linear(offsets, offset)
        } else {
            self.find_binary(offsets, offset)
        }
    }

    fn cached_offsets(&self) -> &[TableOffset] {
        self.offsets.get_or_init(|| {
            let mut offsets = Vec::with_capacity(self.entries.len());
            let mut compressed = 0u64;
            let mut decompressed = 0u64;
            for (entry_index, entry) in self.entries.iter().enumerate() {
                offsets.push(TableOffset {
                    entry_index,
                    entry_offset_in_compressed: compressed,
                    entry_offset_in_decompressed: decompressed,
                });
                compressed += u64::from(entry.compressed_size);
                decompressed += u64::from(entry.decompressed_size);
            }
            offsets
        })
    }

    fn contains(&self, at: &TableOffset, offset: u64) -> bool {
        let size = u64::from(self.entries[at.entry_index].decompressed_size);
        at.entry_offset_in_decompressed <= offset && offset < at.entry_offset_in_decompressed + size
    }

    fn find_linear(&self, offsets: &[TableOffset], offset: u64) -> Option<TableOffset> {
        offsets.iter().find(|at| self.contains(at, offset)).copied()
    }

    fn find_binary(&self, offsets: &[TableOffset], offset: u64) -> Option<TableOffset> {
        // Starts are non-decreasing, so the last entry starting at or before
        // `offset` is the only candidate with a non-empty range around it.
        let after = offsets.partition_point(|at| at.entry_offset_in_decompressed <= offset);
        let candidate = offsets.get(after.checked_sub(1)?)?;
        self.contains(candidate, offset).then_some(*candidate)
    }

    #[cfg(test)]
    pub(crate) fn find_with(&self, offset: u64, linear: bool) -> Option<TableOffset> {
        let offsets = self.cached_offsets();
        if linear {
            self.find_linear(offsets, offset)
        } else {
            self.find_binary(offsets, offset)
        }
    }
}

impl FromIterator<TableEntry> for Table {
    fn from_iter<I: IntoIterator<Item = TableEntry>>(iter: I) -> Self {
        Self::from_entries(iter.into_iter().collect())
    }
}
