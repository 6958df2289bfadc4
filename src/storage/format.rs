//! Container format
//!
//! Byte layout of the header and of each entry.
//!
//! All integers are native machine words in native byte order, so a
//! container is only readable on a platform with the same word size and
//! endianness as the one that wrote it.

use std::mem::size_of;

use crate::error::{MapError, Result};

// =============================================================================
// Layout Constants
// =============================================================================

/// Size of one native machine word
pub const WORD: usize = size_of::<usize>();

/// Format tag at offset 0
pub const TAG: &[u8; 3] = b"OFL";

/// Offset of the logical size field (tag is padded to one word)
pub const SIZE_OFFSET: usize = WORD;

/// Offset of the entry count field
pub const COUNT_OFFSET: usize = 2 * WORD;

/// Header size: Tag + padding (1 word) + LogicalSize (1 word) + Count (1 word, padded)
pub const HEADER_SIZE: usize = 3 * WORD;

/// Entry metadata size: DataSize (1 word) + NameLen (1 word)
pub const ENTRY_META_SIZE: usize = 2 * WORD;

/// Number of whole pages needed to hold `size` bytes
pub fn pages_for(size: usize, page_size: usize) -> usize {
    size.div_ceil(page_size)
}

fn read_word(bytes: &[u8], at: usize) -> usize {
    let mut raw = [0u8; WORD];
    raw.copy_from_slice(&bytes[at..at + WORD]);
    usize::from_ne_bytes(raw)
}

fn write_word(bytes: &mut [u8], at: usize, value: usize) {
    bytes[at..at + WORD].copy_from_slice(&value.to_ne_bytes());
}

// =============================================================================
// Header
// =============================================================================

/// Fixed header at the start of every container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// End of valid data: header plus every entry footprint
    pub logical_size: usize,
    /// Number of live entries
    pub entry_count: u32,
}

impl Header {
    /// Header of an empty container
    pub fn fresh() -> Self {
        Self {
            logical_size: HEADER_SIZE,
            entry_count: 0,
        }
    }

    /// Decode and validate a header from the start of `bytes`
    ///
    /// `file_len` is the on-disk length; a logical size beyond it means the
    /// file was cut short.
    pub fn decode(bytes: &[u8], file_len: usize) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(MapError::InvalidFormat(format!(
                "Truncated header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        if &bytes[0..TAG.len()] != TAG {
            return Err(MapError::InvalidFormat(format!(
                "Invalid tag: expected OFL, got {:?}",
                &bytes[0..TAG.len()]
            )));
        }

        let logical_size = read_word(bytes, SIZE_OFFSET);
        let mut count = [0u8; 4];
        count.copy_from_slice(&bytes[COUNT_OFFSET..COUNT_OFFSET + 4]);
        let entry_count = u32::from_ne_bytes(count);

        if logical_size < HEADER_SIZE || logical_size > file_len {
            return Err(MapError::InvalidFormat(format!(
                "Logical size {} outside [{}, {}]",
                logical_size, HEADER_SIZE, file_len
            )));
        }

        Ok(Self {
            logical_size,
            entry_count,
        })
    }

    /// Encode the full header, reserved padding zeroed
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        self.encode_into(&mut bytes);
        bytes
    }

    /// Write the header over the first `HEADER_SIZE` bytes of `bytes`
    pub fn encode_into(&self, bytes: &mut [u8]) {
        let header = &mut bytes[..HEADER_SIZE];
        header.fill(0);
        header[0..TAG.len()].copy_from_slice(TAG);
        write_word(header, SIZE_OFFSET, self.logical_size);
        header[COUNT_OFFSET..COUNT_OFFSET + 4].copy_from_slice(&self.entry_count.to_ne_bytes());
    }
}

// =============================================================================
// Entry Metadata
// =============================================================================

/// Metadata preceding each entry's name and data
///
/// ```text
/// ┌──────────────┬──────────────┬──────────────────┬──────────────┐
/// │ DataSize (W) │ NameLen (W)  │ Name + NUL       │ Data         │
/// └──────────────┴──────────────┴──────────────────┴──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub data_size: usize,
    /// Name length without the NUL terminator
    pub name_len: usize,
}

impl EntryMeta {
    pub fn new(name: &str, data_size: usize) -> Self {
        Self {
            data_size,
            name_len: name.len(),
        }
    }

    /// Read metadata at `offset`; the caller guarantees it is in bounds
    pub fn decode(bytes: &[u8], offset: usize) -> Self {
        Self {
            data_size: read_word(bytes, offset),
            name_len: read_word(bytes, offset + WORD),
        }
    }

    /// Total bytes the entry occupies: metadata + name + NUL + data
    pub fn footprint(&self) -> usize {
        ENTRY_META_SIZE + self.name_len + 1 + self.data_size
    }

    /// Byte range of the name (without terminator) for an entry at `offset`
    pub fn name_range(&self, offset: usize) -> std::ops::Range<usize> {
        let start = offset + ENTRY_META_SIZE;
        start..start + self.name_len
    }

    /// Byte range of the data for an entry at `offset`
    pub fn data_range(&self, offset: usize) -> std::ops::Range<usize> {
        let start = offset + ENTRY_META_SIZE + self.name_len + 1;
        start..start + self.data_size
    }

    /// Like [`EntryMeta::data_range`], but `None` on overflow
    ///
    /// For metadata read at an untrusted offset.
    pub fn checked_data_range(&self, offset: usize) -> Option<std::ops::Range<usize>> {
        let start = offset
            .checked_add(ENTRY_META_SIZE)?
            .checked_add(self.name_len)?
            .checked_add(1)?;
        let end = start.checked_add(self.data_size)?;
        Some(start..end)
    }

    /// Write metadata, name and terminator at `offset`
    pub fn encode_prefix(&self, bytes: &mut [u8], offset: usize, name: &str) {
        write_word(bytes, offset, self.data_size);
        write_word(bytes, offset + WORD, self.name_len);
        let name_range = self.name_range(offset);
        let terminator = name_range.end;
        bytes[name_range].copy_from_slice(name.as_bytes());
        bytes[terminator] = 0;
    }
}

// =============================================================================
// Entry Scanner
// =============================================================================

/// One entry found by [`EntryScanner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedEntry<'a> {
    pub offset: usize,
    pub name: &'a str,
    pub meta: EntryMeta,
}

/// Forward scan over the entries of a container
///
/// Stops after `entry_count` entries or at the logical end, whichever comes
/// first. Yields an error (and then stops) for an entry that does not fit
/// inside the logical size or whose name is not NUL-terminated UTF-8.
pub struct EntryScanner<'a> {
    bytes: &'a [u8],
    offset: usize,
    remaining: u32,
    failed: bool,
}

impl<'a> EntryScanner<'a> {
    /// `bytes` must be exactly the logical range of the container
    pub fn new(bytes: &'a [u8], entry_count: u32) -> Self {
        Self {
            bytes,
            offset: HEADER_SIZE,
            remaining: entry_count,
            failed: false,
        }
    }

    /// Entries announced by the header but not reached before the logical end
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    fn read_entry(&self) -> Result<ScannedEntry<'a>> {
        let end = self.bytes.len();
        let offset = self.offset;

        if offset + ENTRY_META_SIZE > end {
            return Err(MapError::InvalidFormat(format!(
                "Entry metadata at {} runs past logical end {}",
                offset, end
            )));
        }

        let meta = EntryMeta::decode(self.bytes, offset);
        let fits = meta
            .name_len
            .checked_add(meta.data_size)
            .and_then(|n| n.checked_add(ENTRY_META_SIZE + 1))
            .and_then(|n| n.checked_add(offset))
            .is_some_and(|entry_end| entry_end <= end);
        if !fits {
            return Err(MapError::InvalidFormat(format!(
                "Entry at {} (name {} bytes, data {} bytes) runs past logical end {}",
                offset, meta.name_len, meta.data_size, end
            )));
        }

        let name_range = meta.name_range(offset);
        if self.bytes[name_range.end] != 0 {
            return Err(MapError::InvalidFormat(format!(
                "Entry name at {} is not NUL-terminated",
                offset
            )));
        }

        let name = std::str::from_utf8(&self.bytes[name_range]).map_err(|e| {
            MapError::InvalidFormat(format!("Entry name at {} is not UTF-8: {}", offset, e))
        })?;

        Ok(ScannedEntry { offset, name, meta })
    }
}

impl<'a> Iterator for EntryScanner<'a> {
    type Item = Result<ScannedEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 || self.offset >= self.bytes.len() {
            return None;
        }

        match self.read_entry() {
            Ok(entry) => {
                self.offset += entry.meta.footprint();
                self.remaining -= 1;
                Some(Ok(entry))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
