//! Index Module
//!
//! Chained hash index mapping case-insensitive names to values.
//!
//! ## Responsibilities
//! - Resolve entry names to their location in the container
//! - Reject case-insensitive duplicates on insert and re-key
//! - Restartable traversal over every live node
//!
//! ## Data Structure Choice
//! A fixed vector of buckets, each holding a small `Vec` chain:
//! - Bucket = `hash_name(name) % bucket_count`, never resized
//! - Chains keep insertion order; traversal is bucket order then chain order
//! - Names are compared with ASCII case folding (`"Key" == "KEY"`)

mod table;

pub use table::{Cursor, HashIndex, ReleaseHook};

/// Bucket count used when a caller asks for zero buckets
pub const DEFAULT_CAPACITY: usize = 16;

/// Polynomial string hash over the ASCII-lowercased bytes of `name`
///
/// `h = c + 31 * h`, wrapping, so names differing only in case
/// always land in the same bucket.
pub fn hash_name(name: &str) -> u32 {
    name.bytes().fold(0u32, |h, c| {
        u32::from(c.to_ascii_lowercase()).wrapping_add(h.wrapping_mul(31))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_ignores_case() {
        assert_eq!(hash_name("Hello"), hash_name("hELLO"));
        assert_eq!(hash_name("ABC"), hash_name("abc"));
    }

    #[test]
    fn test_hash_known_values() {
        assert_eq!(hash_name(""), 0);
        assert_eq!(hash_name("a"), 97);
        // 'a' * 31 + 'b'
        assert_eq!(hash_name("ab"), 97 * 31 + 98);
    }

    #[test]
    fn test_hash_wraps_on_long_names() {
        let long = "z".repeat(10_000);
        // Must not panic on overflow
        let _ = hash_name(&long);
    }
}
