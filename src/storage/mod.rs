//! Storage Module
//!
//! On-disk container layout and the memory-mapped view over it.
//!
//! ## Responsibilities
//! - Define the byte-exact header and entry layout
//! - Scan existing containers entry by entry
//! - Map, grow and shrink the container file
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ Header (3 words)                           │
//! │ ┌──────────────┬─────────────┬───────────┐ │
//! │ │"OFL" + pad   │LogicalSize  │EntryCount │ │
//! │ └──────────────┴─────────────┴───────────┘ │
//! ├────────────────────────────────────────────┤
//! │ Entries (append order, no padding)         │
//! │ ┌─────────┬─────────┬────────────┬───────┐ │
//! │ │DataSize │NameLen  │ Name + NUL │ Data  │ │
//! │ └─────────┴─────────┴────────────┴───────┘ │
//! │ ... (repeated for each entry)              │
//! └────────────────────────────────────────────┘
//! ```
//!
//! Words are native-endian `usize`; the entry count is a native-endian `u32`
//! padded to one word.

pub mod format;
mod mapping;

pub use format::{
    pages_for, EntryMeta, EntryScanner, Header, ScannedEntry, ENTRY_META_SIZE, HEADER_SIZE, TAG,
};
pub use mapping::MappedRegion;
