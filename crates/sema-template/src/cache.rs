//! Template-instance cache (component D, section 4.D).
//!
//! Keyed by "template pointer bytes ++ concatenated argument typeids".
//! This workspace represents every node by its arena `NodeId` rather
//! than a raw pointer (section 3: "nodes are allocated from an arena …
//! and are never freed individually", which is exactly the stable-slot
//! guarantee a raw pointer would otherwise be used for), so the "pointer
//! bytes" here are the template definition's `NodeId` index, which plays
//! the same role: stable for the arena's lifetime and unique per
//! template definition.
//!
//! Backed directly by `sema_intern::HashTable`, the same hashtable core
//! (component C) that backs the typeid interner — section 4.D notes the
//! cache "reuses the same hashtable core as component B".

use rustc_hash::FxHashMap;
use sema_ast::{NodeId, TypeIdHandle};
use sema_intern::HashTable;

/// Build the cache key for a template instantiation: the template
/// definition's id, followed by each argument's typeid bytes in order.
/// Two instantiations of the same template with pointer-equal argument
/// typeids produce byte-identical keys, so the underlying hashtable's
/// equal-key lookup is exactly the "does an instance already exist"
/// check section 4.D specifies.
#[must_use]
pub fn instance_key(template: NodeId, arg_typeids: &[TypeIdHandle]) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + arg_typeids.iter().map(|t| t.bytes().len()).sum::<usize>());
    key.extend_from_slice(&(template.index() as u32).to_le_bytes());
    for arg in arg_typeids {
        key.extend_from_slice(arg.bytes());
    }
    key
}

/// The instance cache itself: `instance_key(...) -> instantiated node`.
///
/// Section 4.F.5 requires the self-reference-breaking discipline: the
/// checker must `insert` a freshly allocated (not-yet-checked) instance
/// *before* recursing into its body, so a template that refers to its
/// own instantiation (directly or through a cycle of templates) finds
/// itself already cached on the way back in rather than looping
/// forever. This type only stores the mapping; the insert-before-check
/// ordering is the checker's responsibility (`sema-checker::template`).
#[derive(Default)]
pub struct TemplateCache {
    table: HashTable<NodeId>,
}

impl TemplateCache {
    #[must_use]
    pub fn new() -> Self {
        Self { table: HashTable::new() }
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
    pub fn get(&self, key: &[u8]) -> Option<NodeId> {
        self.table.get(key).copied()
    }

    #[must_use]
    pub fn get_by_args(&self, template: NodeId, arg_typeids: &[TypeIdHandle]) -> Option<NodeId> {
        self.get(&instance_key(template, arg_typeids))
    }

    /// Pre-insert `instance` under `key`, to be called before the
    /// instance's body is recursively checked (section 4.F.5). Returns
    /// the previous occupant, if `key` was already present — callers
    /// should treat that as a bug (an instantiation must be looked up
    /// with `get`/`get_by_args` before ever calling `insert`).
    pub fn insert(&mut self, key: Vec<u8>, instance: NodeId) -> Option<NodeId> {
        self.table.insert(&key, instance)
    }
}

/// Non-structural in-memory map from a template instance's own id back
/// to the distinct instantiations it owns, used by `postanalyze`
/// (section 4.F.6) to revisit every live instantiation of a template
/// once the template itself is found to transitively own a resource.
/// Kept separate from `TemplateCache` because it is indexed by
/// `NodeId`, not by the encoded byte key.
pub type InstancesByTemplate = FxHashMap<NodeId, Vec<NodeId>>;
