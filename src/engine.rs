//! Engine Module
//!
//! The storage engine that keeps the mapped container and the name index
//! consistent.
//!
//! ## Responsibilities
//! - Open or create a container and rebuild the index with one forward scan
//! - Append entries at the logical end
//! - Compact the file on delete, shifting later entries left
//! - Rename in place or by append-then-delete
//!
//! ## Index Values
//! The index stores `EntrySlot { offset, name_len }` per entry. Data and names
//! are always derived from the current view at that offset, so a remap that
//! moves the view needs no fixup; only compaction rewrites offsets.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::config::{Config, DuplicatePolicy, OpenMode};
use crate::error::{MapError, Result};
use crate::index::{Cursor, HashIndex};
use crate::storage::{pages_for, EntryMeta, EntryScanner, Header, MappedRegion, ENTRY_META_SIZE, HEADER_SIZE};

/// Location of one entry inside the container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySlot {
    /// Byte offset of the entry metadata; never 0 (the header lives there)
    pub offset: usize,
    /// Cached name length, used to pick the in-place rename path
    pub name_len: usize,
}

/// Snapshot of one entry for listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub offset: u64,
    pub size: usize,
}

/// One open container file
///
/// ## Concurrency Model
///
/// Single-threaded: every mutation takes `&mut self`, so the borrow checker
/// serializes writers and no slice returned by [`Container::read`] can
/// outlive a mutation. For multithreaded access wrap it in
/// [`SharedContainer`](crate::shared::SharedContainer).
///
/// ## Failure Model
///
/// A mapping or resize failure in the middle of a mutation cannot be undone;
/// the container is then poisoned and every later call fails with
/// [`MapError::Poisoned`].
#[derive(Debug)]
pub struct Container {
    /// Open configuration
    config: Config,

    /// File + mapped view
    region: MappedRegion,

    /// Mirror of the on-disk header, written through on every change
    header: Header,

    /// Entry name → location
    index: HashIndex<EntrySlot>,

    /// Set after an unrecoverable failure
    poisoned: bool,
}

impl Container {
    /// Open or create a container
    ///
    /// On open:
    /// 1. Create the file with a fresh header if it is missing (writable only)
    /// 2. Reset it to a fresh header when truncation was requested
    /// 3. Validate tag and logical size
    /// 4. Scan entries into the index
    pub fn open(config: Config) -> Result<Self> {
        if config.page_size == 0 {
            return Err(MapError::Config("page_size must be non-zero".to_string()));
        }

        let mode = config.mode;
        let existed = config.path.try_exists()?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(mode.is_writable())
            .create(mode.is_writable())
            .open(&config.path)?;

        if !existed || mode.is_truncate() {
            tracing::info!(path = %config.path.display(), "Creating new container");
            Self::write_fresh_header(&mut file)?;
        }

        let file_len = file.metadata()?.len() as usize;
        if file_len < HEADER_SIZE {
            return Err(MapError::InvalidFormat(format!(
                "File is {} bytes, smaller than the {} byte header",
                file_len, HEADER_SIZE
            )));
        }

        let region = MappedRegion::new(file, mode.is_writable(), config.page_size)?;
        let header = Header::decode(region.bytes(), file_len)?;
        let index = HashIndex::with_capacity(config.bucket_count);

        let mut container = Self {
            config,
            region,
            header,
            index,
            poisoned: false,
        };

        if container.header.entry_count > 0 {
            container.load_entries()?;
        }

        tracing::info!(
            path = %container.config.path.display(),
            mode = %mode,
            entries = container.index.len(),
            logical_size = container.header.logical_size,
            "Container opened"
        );

        Ok(container)
    }

    /// Open with a path and a mode string such as `"rw"`
    ///
    /// Uses default config for everything else
    pub fn open_path(path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        let config = Config::builder()
            .path(path.as_ref())
            .mode(OpenMode::parse(mode))
            .build();
        Self::open(config)
    }

    /// Close the container, flushing a writable view first
    pub fn close(self) -> Result<()> {
        if self.is_writable() && !self.poisoned {
            self.region.flush()?;
        }

        tracing::info!(path = %self.config.path.display(), "Container closed");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Borrow an entry's data directly from the mapped view
    pub fn read(&self, name: &str) -> Result<&[u8]> {
        self.check_usable()?;
        let slot = self.slot(name)?;
        self.data_at(slot.offset)
            .ok_or_else(|| MapError::InvalidFormat(format!("Entry {} points outside the container", name)))
    }

    /// Copy an entry's data into `buf`, returning the number of bytes copied
    ///
    /// Always copies the whole entry; `buf` must be at least
    /// [`Container::entry_size`] bytes long.
    pub fn read_into(&self, name: &str, buf: &mut [u8]) -> Result<usize> {
        let data = self.read(name)?;
        if buf.len() < data.len() {
            return Err(MapError::BufferTooSmall {
                needed: data.len(),
                available: buf.len(),
            });
        }

        buf[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    /// Size of an entry's data without reading it
    pub fn entry_size(&self, name: &str) -> Result<usize> {
        self.check_usable()?;
        let slot = self.slot(name)?;
        Ok(EntryMeta::decode(self.valid_bytes(), slot.offset).data_size)
    }

    /// Raw stored offset of an entry; 0 means "not found"
    ///
    /// Offset 0 always holds the header, so it is never a live entry.
    pub fn get_offset(&self, name: &str) -> u64 {
        if self.poisoned {
            return 0;
        }
        self.index.get(name).map_or(0, |slot| slot.offset as u64)
    }

    /// Data view of the entry starting at `offset`
    ///
    /// Returns `None` for offsets inside the header, beyond the logical end,
    /// or whose entry does not fit in the container.
    pub fn materialize(&self, offset: u64) -> Option<&[u8]> {
        if self.poisoned {
            return None;
        }
        self.data_at(usize::try_from(offset).ok()?)
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.poisoned && self.index.contains(name)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Append a new entry, returning the number of data bytes written
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<usize> {
        self.check_writable()?;
        validate_name(name)?;
        if data.is_empty() {
            return Err(MapError::EmptyValue);
        }

        let slot = EntrySlot {
            offset: self.header.logical_size,
            name_len: name.len(),
        };
        if self.index.add(name, slot).is_none() {
            return Err(MapError::AlreadyExists(name.to_string()));
        }

        let result = self.append_entry(name, data.len()).and_then(|offset| {
            let meta = EntryMeta::new(name, data.len());
            self.region.bytes_mut()?[meta.data_range(offset)].copy_from_slice(data);
            Ok(())
        });
        if let Err(e) = result {
            self.index.take(name);
            return Err(self.poison(e));
        }

        tracing::debug!(name, offset = slot.offset, size = data.len(), "Entry written");
        Ok(data.len())
    }

    /// Delete an entry and compact everything after it
    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.check_writable()?;
        let slot = self
            .index
            .take(name)
            .ok_or_else(|| MapError::NotFound(name.to_string()))?;

        let footprint = self.compact(slot.offset).map_err(|e| self.poison(e))?;

        tracing::debug!(name, offset = slot.offset, footprint, "Entry deleted");
        Ok(())
    }

    /// Rename an entry
    ///
    /// Equal-length names are rewritten in place. Otherwise the entry is
    /// re-appended under the new name and the original is deleted, so a
    /// readable copy exists at every step.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        self.check_writable()?;
        validate_name(new)?;
        if !self.index.contains(old) {
            return Err(MapError::NotFound(old.to_string()));
        }

        let slot = self
            .index
            .change_key(old, new)
            .copied()
            .ok_or_else(|| MapError::AlreadyExists(new.to_string()))?;

        let result = if slot.name_len == new.len() {
            self.rename_in_place(slot, new)
        } else {
            self.rename_by_append(slot, new)
        };
        result.map_err(|e| self.poison(e))?;

        tracing::debug!(old, new, "Entry renamed");
        Ok(())
    }

    /// Delete every entry
    ///
    /// Takes the first indexed entry and deletes it until the index is empty.
    pub fn clean_up(&mut self) -> Result<()> {
        self.check_writable()?;

        let mut removed = 0usize;
        while let Some(name) = self.index.first().map(|(name, _)| name.to_string()) {
            self.delete(&name)?;
            removed += 1;
        }
        self.index.clear();

        tracing::debug!(removed, "Container cleaned up");
        Ok(())
    }

    /// Flush dirty pages to the file
    pub fn sync(&self) -> Result<()> {
        self.check_usable()?;
        self.region.flush()
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Next entry name after `cursor` (bucket order, then chain order)
    pub fn list(&self, cursor: &mut Cursor) -> Option<&str> {
        if self.poisoned {
            return None;
        }
        self.index.list(cursor).map(|(name, _)| name)
    }

    /// Snapshot of every entry name
    ///
    /// Later mutations do not affect the returned list.
    pub fn names(&self) -> Vec<String> {
        if self.poisoned {
            return Vec::new();
        }
        self.index.iter().map(|(name, _)| name.to_string()).collect()
    }

    /// Snapshot of every entry with its offset and data size
    pub fn entries(&self) -> Vec<EntryInfo> {
        if self.poisoned {
            return Vec::new();
        }
        let bytes = self.valid_bytes();
        self.index
            .iter()
            .map(|(name, slot)| EntryInfo {
                name: name.to_string(),
                offset: slot.offset as u64,
                size: EntryMeta::decode(bytes, slot.offset).data_size,
            })
            .collect()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Entry count recorded in the header
    pub fn entry_count(&self) -> u32 {
        self.header.entry_count
    }

    /// End of valid data: header plus every entry footprint
    pub fn logical_size(&self) -> usize {
        self.header.logical_size
    }

    pub fn mode(&self) -> OpenMode {
        self.config.mode
    }

    pub fn is_writable(&self) -> bool {
        self.config.mode.is_writable()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Pages currently mapped
    pub fn mapped_pages(&self) -> usize {
        self.region.pages()
    }

    /// Number of remaps that moved the view to a new base address
    pub fn remap_generation(&self) -> u64 {
        self.region.generation()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_fresh_header(file: &mut File) -> Result<()> {
        file.set_len(0)?;
        file.write_all(&Header::fresh().encode())?;
        Ok(())
    }

    /// Rebuild the index with one forward scan from the first entry
    fn load_entries(&mut self) -> Result<()> {
        let bytes = &self.region.bytes()[..self.header.logical_size];
        let mut scanner = EntryScanner::new(bytes, self.header.entry_count);

        for entry in scanner.by_ref() {
            let entry = entry?;
            let slot = EntrySlot {
                offset: entry.offset,
                name_len: entry.meta.name_len,
            };

            if self.index.add(entry.name, slot).is_none() {
                match self.config.duplicate_policy {
                    DuplicatePolicy::Warn => {
                        tracing::warn!(
                            name = entry.name,
                            offset = entry.offset,
                            "Duplicate entry name while loading, later entry is unreachable"
                        );
                    }
                    DuplicatePolicy::Reject => {
                        return Err(MapError::InvalidFormat(format!(
                            "Duplicate entry name {:?} at offset {}",
                            entry.name, entry.offset
                        )));
                    }
                }
            }
        }

        if scanner.remaining() > 0 {
            tracing::warn!(
                missing = scanner.remaining(),
                "Header announces more entries than the logical size holds"
            );
        }

        Ok(())
    }

    /// Grow the file by one entry and write its metadata and name
    ///
    /// Returns the entry offset. Data bytes are left for the caller.
    fn append_entry(&mut self, name: &str, data_size: usize) -> Result<usize> {
        let meta = EntryMeta::new(name, data_size);
        let offset = self.header.logical_size;
        let new_size = offset + meta.footprint();

        self.region.resize_file(new_size)?;
        self.region
            .ensure_pages(pages_for(new_size, self.region.page_size()))?;

        meta.encode_prefix(self.region.bytes_mut()?, offset, name);

        self.header.logical_size = new_size;
        self.header.entry_count += 1;
        self.store_header()?;

        Ok(offset)
    }

    /// Remove the entry at `offset` by shifting every later byte left
    ///
    /// Index offsets past `offset` drop by the footprint. Returns the footprint.
    fn compact(&mut self, offset: usize) -> Result<usize> {
        let footprint = EntryMeta::decode(self.valid_bytes(), offset).footprint();
        let end = self.header.logical_size;
        let new_size = end - footprint;

        self.region
            .bytes_mut()?
            .copy_within(offset + footprint..end, offset);

        self.header.logical_size = new_size;
        self.header.entry_count = self.header.entry_count.saturating_sub(1);
        self.store_header()?;

        self.region.resize_file(new_size)?;

        for slot in self.index.values_mut() {
            if slot.offset > offset {
                slot.offset -= footprint;
            }
        }

        self.region
            .ensure_pages(pages_for(new_size, self.region.page_size()))?;

        Ok(footprint)
    }

    fn rename_in_place(&mut self, slot: EntrySlot, new: &str) -> Result<()> {
        let meta = EntryMeta::decode(self.valid_bytes(), slot.offset);
        self.region.bytes_mut()?[meta.name_range(slot.offset)].copy_from_slice(new.as_bytes());
        Ok(())
    }

    fn rename_by_append(&mut self, slot: EntrySlot, new: &str) -> Result<()> {
        let old_meta = EntryMeta::decode(self.valid_bytes(), slot.offset);
        let old_footprint = old_meta.footprint();
        let end = self.header.logical_size;

        // Copy first, then delete the original
        let new_offset = self.append_entry(new, old_meta.data_size)?;
        let new_meta = EntryMeta::new(new, old_meta.data_size);
        self.region.bytes_mut()?.copy_within(
            old_meta.data_range(slot.offset),
            new_meta.data_range(new_offset).start,
        );

        // The renamed node still holds the old offset, so compaction leaves it alone
        self.compact(slot.offset)?;

        if let Some(renamed) = self.index.get_mut(new) {
            *renamed = EntrySlot {
                offset: end - old_footprint,
                name_len: new.len(),
            };
        }
        Ok(())
    }

    fn store_header(&mut self) -> Result<()> {
        let header = self.header;
        header.encode_into(self.region.bytes_mut()?);
        Ok(())
    }

    fn valid_bytes(&self) -> &[u8] {
        &self.region.bytes()[..self.header.logical_size]
    }

    fn slot(&self, name: &str) -> Result<EntrySlot> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| MapError::NotFound(name.to_string()))
    }

    fn data_at(&self, offset: usize) -> Option<&[u8]> {
        let bytes = self.valid_bytes();
        if offset < HEADER_SIZE || offset.checked_add(ENTRY_META_SIZE)? > bytes.len() {
            return None;
        }

        let range = EntryMeta::decode(bytes, offset).checked_data_range(offset)?;
        bytes.get(range)
    }

    fn check_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(MapError::Poisoned);
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        self.check_usable()?;
        if !self.is_writable() {
            return Err(MapError::ReadOnly);
        }
        Ok(())
    }

    /// Mark the container unusable when `error` is fatal
    fn poison(&mut self, error: MapError) -> MapError {
        if error.is_fatal() {
            self.poisoned = true;
            tracing::error!(path = %self.config.path.display(), %error, "Container poisoned");
        }
        error
    }
}

/// Names must be non-empty and must not contain NUL (the on-disk terminator)
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MapError::InvalidName("name is empty".to_string()));
    }
    if name.contains('\0') {
        return Err(MapError::InvalidName(format!("{:?} contains a NUL byte", name)));
    }
    Ok(())
}
