//! Specialised byte-slice set wrapper over the hashtable core (section
//! 4.C, "specialised wrapper: a byte-slice set that owns copies of the
//! bytes, null-terminated for ergonomic interop with C-shaped
//! consumers").
//!
//! Unlike [`crate::hashtable::HashTable`] (an arbitrary key→value store),
//! `ByteSet` only tracks membership, and stores each owned copy with a
//! trailing NUL so a consumer across an FFI boundary can treat an
//! entry's pointer as a C string without a further copy.

use crate::hashtable::HashTable;

#[derive(Default)]
pub struct ByteSet {
    table: HashTable<Box<[u8]>>,
}

impl ByteSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: HashTable::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    #[must_use]
    pub fn contains(&self, bytes: &[u8]) -> bool {
        self.table.contains(bytes)
    }

    /// Insert `bytes`, returning the set's owned, NUL-terminated copy.
    /// Returns the same copy on repeat insertion of an equal slice.
    pub fn insert(&mut self, bytes: &[u8]) -> &[u8] {
        let (stored, _fresh) = self.table.get_or_insert_with(bytes, || {
            let mut owned = Vec::with_capacity(bytes.len() + 1);
            owned.extend_from_slice(bytes);
            owned.push(0);
            owned.into_boxed_slice()
        });
        // Hand back the slice without its trailing NUL; callers that
        // want the C-interop view reach for `as_ptr()` directly.
        &stored[..stored.len() - 1]
    }

    /// Remove `bytes` from the set. Returns whether it was present.
    pub fn remove(&mut self, bytes: &[u8]) -> bool {
        self.table.remove(bytes).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_dedupes_equal_slices() {
        let mut set = ByteSet::new();
        let a = set.insert(b"hello").to_vec();
        let b = set.insert(b"hello").to_vec();
        assert_eq!(a, b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn stored_copy_is_nul_terminated() {
        let mut set = ByteSet::new();
        set.insert(b"abc");
        assert!(set.table.get(b"abc").unwrap().ends_with(&[0]));
    }

    #[test]
    fn remove_then_contains_is_false() {
        let mut set = ByteSet::new();
        set.insert(b"x");
        assert!(set.remove(b"x"));
        assert!(!set.contains(b"x"));
    }
}
