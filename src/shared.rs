//! Shared Container
//!
//! Thread-safe handle over a single [`Container`].
//!
//! ## Concurrency Model: Single-Writer / Multiple-Reader
//!
//! - **Mutations** (write/delete/rename/clean_up): hold the write lock for the
//!   whole call, including the compaction shift and the offset fixup walk
//! - **Reads**: hold the read lock only while copying data out, so callers
//!   get owned bytes that stay valid after later mutations

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::engine::{Container, EntryInfo};
use crate::error::Result;

/// Cloneable, lock-protected container handle
#[derive(Clone)]
pub struct SharedContainer {
    inner: Arc<RwLock<Container>>,
}

impl SharedContainer {
    pub fn new(container: Container) -> Self {
        Self {
            inner: Arc::new(RwLock::new(container)),
        }
    }

    /// Open a container and wrap it
    pub fn open(config: Config) -> Result<Self> {
        Container::open(config).map(Self::new)
    }

    // =========================================================================
    // Reads (read lock)
    // =========================================================================

    /// Copy an entry's data out of the view
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.inner.read().read(name).map(<[u8]>::to_vec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.read().names()
    }

    pub fn entries(&self) -> Vec<EntryInfo> {
        self.inner.read().entries()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Run `f` with shared access to the container
    pub fn with_read<R>(&self, f: impl FnOnce(&Container) -> R) -> R {
        f(&self.inner.read())
    }

    // =========================================================================
    // Mutations (write lock)
    // =========================================================================

    pub fn write(&self, name: &str, data: &[u8]) -> Result<usize> {
        self.inner.write().write(name, data)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        self.inner.write().delete(name)
    }

    pub fn rename(&self, old: &str, new: &str) -> Result<()> {
        self.inner.write().rename(old, new)
    }

    pub fn clean_up(&self) -> Result<()> {
        self.inner.write().clean_up()
    }

    pub fn sync(&self) -> Result<()> {
        self.inner.read().sync()
    }

    /// Take the container back once this is the last handle
    ///
    /// Returns `self` unchanged when other clones are still alive.
    pub fn into_inner(self) -> std::result::Result<Container, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}
