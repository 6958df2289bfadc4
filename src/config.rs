//! Configuration for mapkv
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;

/// Default number of hash index buckets for a container
pub const DEFAULT_BUCKET_COUNT: usize = 32;

/// Default mapping granularity in bytes
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Main configuration for opening a container
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the container file
    pub path: PathBuf,

    /// Access mode (read-only / read-write, optional truncate)
    pub mode: OpenMode,

    /// Mapping granularity; the view always covers whole pages
    pub page_size: usize,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Bucket count of the name index, fixed for the container's lifetime
    pub bucket_count: usize,

    /// What to do when reloading finds two entries with the same name
    pub duplicate_policy: DuplicatePolicy,
}

/// How the reload scan treats a name that is already indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Log a warning and keep scanning; the first entry wins the name
    #[default]
    Warn,

    /// Refuse to open the container
    Reject,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./store.ofl"),
            mode: OpenMode::read_only(),
            page_size: DEFAULT_PAGE_SIZE,
            bucket_count: DEFAULT_BUCKET_COUNT,
            duplicate_policy: DuplicatePolicy::Warn,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the container file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the access mode
    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the page size (in bytes)
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set the index bucket count
    pub fn bucket_count(mut self, count: usize) -> Self {
        self.config.bucket_count = count;
        self
    }

    /// Set the duplicate-name policy used while reloading
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// Open Mode
// =============================================================================

/// Access flags for a container
///
/// Built from a mode string of independent characters:
/// `r` readable, `w` read-write, `t` truncate. Order does not matter,
/// duplicates are harmless and unknown characters are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode {
    writable: bool,
    truncate: bool,
}

impl OpenMode {
    /// Mode flag: readable
    pub const READ: char = 'r';
    /// Mode flag: read-write
    pub const WRITE: char = 'w';
    /// Mode flag: truncate an existing container on open
    pub const TRUNCATE: char = 't';

    pub fn read_only() -> Self {
        Self::default()
    }

    pub fn read_write() -> Self {
        Self {
            writable: true,
            truncate: false,
        }
    }

    /// Toggle truncate-on-open
    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Parse a mode string such as `"rw"` or `"wt"`
    pub fn parse(mode: &str) -> Self {
        let mut parsed = Self::default();
        for c in mode.chars() {
            match c {
                Self::WRITE => parsed.writable = true,
                Self::TRUNCATE => parsed.truncate = true,
                // Readable is implied by every mode
                Self::READ => {}
                _ => {}
            }
        }
        parsed
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Truncation only takes effect on writable opens
    pub fn is_truncate(&self) -> bool {
        self.writable && self.truncate
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("r")?;
        if self.writable {
            f.write_str("w")?;
        }
        if self.truncate {
            f.write_str("t")?;
        }
        Ok(())
    }
}
