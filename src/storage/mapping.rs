//! Mapping Manager
//!
//! Owns the container file and its memory-mapped view.
//!
//! ## Responsibilities
//! - Keep the view covering exactly `ceil(logical_size / page_size)` pages
//! - Grow/shrink the backing file as the logical size changes
//! - Track when a remap moved the view to a different base address
//!
//! Callers never hold raw pointers into the view: every access goes through
//! [`MappedRegion::bytes`] / [`MappedRegion::bytes_mut`] at an offset, so a
//! moved base address needs no fixup beyond bumping [`MappedRegion::generation`].

use std::fs::File;

use memmap2::{Mmap, MmapMut, MmapOptions};

use crate::error::{MapError, Result};

use super::format::pages_for;

/// The mapped view, read-only or writable depending on the open mode
#[derive(Debug)]
enum View {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

impl View {
    fn as_slice(&self) -> &[u8] {
        match self {
            View::ReadOnly(map) => &map[..],
            View::ReadWrite(map) => &map[..],
        }
    }

    fn as_ptr(&self) -> *const u8 {
        self.as_slice().as_ptr()
    }

    fn len(&self) -> usize {
        self.as_slice().len()
    }
}

/// Memory-mapped view over a container file
#[derive(Debug)]
pub struct MappedRegion {
    /// Backing file, kept open for resizes and remaps
    file: File,
    /// Current view, always `pages * page_size` bytes long
    view: View,
    /// Mapping granularity
    page_size: usize,
    /// Pages currently mapped
    pages: usize,
    /// Current on-disk length of the file
    file_len: usize,
    /// Bumped every time a remap changed the base address
    generation: u64,
}

impl MappedRegion {
    /// Map `file` covering its current length rounded up to whole pages
    pub fn new(file: File, writable: bool, page_size: usize) -> Result<Self> {
        let file_len = file.metadata()?.len() as usize;
        let pages = pages_for(file_len, page_size).max(1);
        let view = Self::map_view(&file, writable, pages * page_size)?;

        Ok(Self {
            file,
            view,
            page_size,
            pages,
            file_len,
            generation: 0,
        })
    }

    /// Grow or shrink the view to exactly `pages` pages
    ///
    /// The platform may move the view; when it does the generation counter
    /// is bumped. Offsets stay valid across a move.
    pub fn ensure_pages(&mut self, pages: usize) -> Result<()> {
        let pages = pages.max(1);
        if pages == self.pages {
            return Ok(());
        }

        let new_len = pages * self.page_size;
        let old_base = self.view.as_ptr();
        self.remap(new_len)?;

        if self.view.as_ptr() != old_base {
            self.generation += 1;
            tracing::trace!(
                generation = self.generation,
                pages,
                "Container view moved to a new base address"
            );
        }

        self.pages = pages;
        Ok(())
    }

    /// Set the backing file length
    pub fn resize_file(&mut self, len: usize) -> Result<()> {
        self.file.set_len(len as u64).map_err(|e| {
            MapError::Mapping(format!("Failed to resize container file to {} bytes: {}", len, e))
        })?;
        self.file_len = len;
        Ok(())
    }

    /// Valid bytes: the mapped view clipped to the file length
    pub fn bytes(&self) -> &[u8] {
        let valid = self.file_len.min(self.view.len());
        &self.view.as_slice()[..valid]
    }

    /// Writable valid bytes; fails on a read-only view
    pub fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        let valid = self.file_len.min(self.view.len());
        match &mut self.view {
            View::ReadWrite(map) => Ok(&mut map[..valid]),
            View::ReadOnly(_) => Err(MapError::ReadOnly),
        }
    }

    /// Flush dirty pages of a writable view to the file
    pub fn flush(&self) -> Result<()> {
        match &self.view {
            View::ReadWrite(map) => map.flush().map_err(MapError::Io),
            View::ReadOnly(_) => Ok(()),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_writable(&self) -> bool {
        matches!(self.view, View::ReadWrite(_))
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn mapped_len(&self) -> usize {
        self.view.len()
    }

    pub fn file_len(&self) -> usize {
        self.file_len
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn map_view(file: &File, writable: bool, len: usize) -> Result<View> {
        // SAFETY: the container is the only writer of this file for as long
        // as it is open; concurrent external writers are unsupported.
        let view = unsafe {
            let mut options = MmapOptions::new();
            options.len(len);
            if writable {
                options.map_mut(file).map(View::ReadWrite)
            } else {
                options.map(file).map(View::ReadOnly)
            }
        };

        view.map_err(|e| MapError::Mapping(format!("Failed to map {} bytes: {}", len, e)))
    }

    /// Resize the view in place when possible, letting the kernel move it
    #[cfg(target_os = "linux")]
    fn remap(&mut self, new_len: usize) -> Result<()> {
        use memmap2::RemapOptions;

        let options = RemapOptions::new().may_move(true);
        // SAFETY: no references into the old view survive this call; all
        // access goes through `bytes()`/`bytes_mut()` borrows of `self`.
        let result = unsafe {
            match &mut self.view {
                View::ReadOnly(map) => map.remap(new_len, options),
                View::ReadWrite(map) => map.remap(new_len, options),
            }
        };

        result.map_err(|e| MapError::Mapping(format!("Failed to remap to {} bytes: {}", new_len, e)))
    }

    /// Without mremap, map a fresh view and drop the old one
    #[cfg(not(target_os = "linux"))]
    fn remap(&mut self, new_len: usize) -> Result<()> {
        let writable = self.is_writable();
        self.view = Self::map_view(&self.file, writable, new_len)?;
        Ok(())
    }
}
