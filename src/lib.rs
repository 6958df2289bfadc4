//! # mapkv
//!
//! An embedded, single-file key-value store backed by a memory-mapped
//! container:
//! - Named byte blobs ("entries") packed back to back in one file
//! - Case-insensitive name index rebuilt from the file on open
//! - Zero-copy reads straight out of the mapped view
//! - Delete compacts the file; there is no free-space reuse
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Shell / SharedContainer                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Container (engine)                          │
//! │       write / read / delete / rename / clean_up              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │  HashIndex  │          │ MappedRegion │
//!   │ name→offset │          │ (file+mmap)  │
//!   └─────────────┘          └──────┬───────┘
//!                                   │
//!                                   ▼
//!                           ┌──────────────┐
//!                           │   Format     │
//!                           │(header+entry)│
//!                           └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use mapkv::Container;
//!
//! let mut store = Container::open_path("notes.ofl", "rw")?;
//! store.write("greeting", b"hello")?;
//! assert_eq!(store.read("GREETING")?, b"hello");
//! store.close()?;
//! # Ok::<(), mapkv::MapError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod index;
pub mod storage;
pub mod engine;
pub mod shared;
pub mod shell;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MapError, Result};
pub use config::{Config, DuplicatePolicy, OpenMode};
pub use engine::{Container, EntryInfo, EntrySlot};
pub use index::{Cursor, HashIndex};
pub use shared::SharedContainer;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of mapkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
