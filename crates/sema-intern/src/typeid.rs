//! The typeid encoder and global interner (component B, section 4.B).

use std::sync::RwLock;

use once_cell::sync::Lazy;
use sema_ast::{NodeArena, NodeId, TypeIdHandle};
use sema_reflect::{FieldValue, reflect_fields};

use crate::hashtable::HashTable;

fn write_leb128(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// The result of encoding one node's subtree: its canonical bytes, and
/// (if the subtree contains a back-reference) the shallowest stack
/// position any back-reference inside it points at.
///
/// `min_backref` is what lets [`Interner`] decide whether a nested
/// type's encoding is safe to cache on its own: a back-reference only
/// has meaning relative to the in-progress stack at the moment it was
/// emitted (section 4.B step 6), so a subtree is reusable in any
/// context only if every back-reference inside it resolves to a node
/// that is itself inside the subtree (index `>=` the subtree's own
/// start). A subtree whose back-reference escapes to an ancestor above
/// it (a mutual cycle between two distinct named types, not a single
/// self-referential one) is only ever valid inlined at the position it
/// was produced, so it is not cached.
struct Encoded {
    bytes: Vec<u8>,
    min_backref: Option<usize>,
}

struct Encoder<'a> {
    arena: &'a NodeArena,
    interner: &'a Interner,
    stack: Vec<NodeId>,
}

impl<'a> Encoder<'a> {
    fn encode(&mut self, id: NodeId) -> Encoded {
        let subtree_start = self.stack.len();
        self.stack.push(id);

        let node = self.arena.get(id);
        let mut body = Vec::new();

        // Step 2: the kind's 4-byte tag.
        body.extend_from_slice(&sema_reflect::tag_of(node.kind));

        // Step 3: length-prefixed LEB128 of typeid-relevant flags.
        let flags_bits = u64::from(node.flags.get().typeid_relevant().bits());
        let mut flag_bytes = Vec::new();
        write_leb128(&mut flag_bytes, flags_bits);
        write_leb128(&mut body, flag_bytes.len() as u64);
        body.extend_from_slice(&flag_bytes);

        // Step 4 (+7: header fields come first, via `reflect_fields`'s
        // own `push_header` convention): fields in reflection order,
        // skipping non-identity fields.
        let mut min_backref = None;
        for field in reflect_fields(node) {
            if field.identity {
                self.encode_field(&mut body, &field.value, &mut min_backref);
            }
        }

        self.stack.pop();

        // Step 1: 4-byte length prefix, little-endian (section 6).
        let mut full = Vec::with_capacity(body.len() + 4);
        full.extend_from_slice(&(u32::try_from(body.len()).unwrap_or(u32::MAX)).to_le_bytes());
        full.extend(body);

        let _ = subtree_start;
        Encoded {
            bytes: full,
            min_backref,
        }
    }

    fn encode_field(&mut self, out: &mut Vec<u8>, value: &FieldValue, min_backref: &mut Option<usize>) {
        match value {
            FieldValue::U8(v) => write_leb128(out, u64::from(*v)),
            FieldValue::U16(v) => write_leb128(out, u64::from(*v)),
            FieldValue::U32(v) => write_leb128(out, u64::from(*v)),
            FieldValue::U64(v) => write_leb128(out, *v),
            FieldValue::F64(v) => write_leb128(out, v.to_bits()),
            FieldValue::Sym(s) => Self::encode_symbol(out, Some(s.as_str())),
            FieldValue::SymOpt(s) => Self::encode_symbol(out, s.as_ref().map(sema_ast::Symbol::as_str)),
            FieldValue::Str(s) => Self::encode_str(out, Some(s)),
            FieldValue::StrOpt(s) => Self::encode_str(out, s.as_deref()),
            FieldValue::Node(id) => self.encode_node_ref(out, Some(*id), min_backref),
            FieldValue::NodeOpt(id) => self.encode_node_ref(out, *id, min_backref),
            FieldValue::NodeArray(ids) => {
                out.push(b'[');
                write_leb128(out, ids.len() as u64);
                for id in ids {
                    self.encode_node_ref(out, Some(*id), min_backref);
                }
            }
        }
    }

    // Step 4: "symbol/string field -> tag byte (# or "), LEB128 length,
    // bytes"; "null node/sym/str -> emit nothing".
    fn encode_symbol(out: &mut Vec<u8>, sym: Option<&str>) {
        if let Some(text) = sym {
            out.push(b'#');
            write_leb128(out, text.len() as u64);
            out.extend_from_slice(text.as_bytes());
        }
    }

    fn encode_str(out: &mut Vec<u8>, s: Option<&str>) {
        if let Some(text) = s {
            out.push(b'"');
            write_leb128(out, text.len() as u64);
            out.extend_from_slice(text.as_bytes());
        }
    }

    fn encode_node_ref(&mut self, out: &mut Vec<u8>, id: Option<NodeId>, min_backref: &mut Option<usize>) {
        let Some(id) = id else { return };

        // Step 6: a node still in progress (an ancestor) is emitted as
        // a back-reference, not re-encoded.
        if let Some(pos) = self.stack.iter().position(|&s| s == id) {
            out.push(b'&');
            write_leb128(out, pos as u64);
            *min_backref = Some(min_backref.map_or(pos, |m| m.min(pos)));
            return;
        }

        let node = self.arena.get(id);

        // Step 5: a composite referent that is itself a type, and
        // already has a cached typeid, contributes that typeid instead
        // of its structure.
        if node.kind.is_type() {
            if let Some(cached) = node.type_meta().and_then(sema_ast::TypeMeta::typeid) {
                out.extend_from_slice(cached.bytes());
                return;
            }
        }

        let sub = self.encode(id);
        out.extend_from_slice(&sub.bytes);
        if let Some(pos) = sub.min_backref {
            *min_backref = Some(min_backref.map_or(pos, |m| m.min(pos)));
        }

        // The child's own encoding is safe to promote into the global
        // interner (and cache on its node) only if no back-reference
        // inside it escapes above this call's position in the stack —
        // see `Encoded::min_backref`'s doc comment.
        if node.kind.is_type() {
            let self_contained = sub.min_backref.is_none_or(|p| p >= self.stack.len());
            if self_contained {
                let handle = self.interner.intern_bytes(&sub.bytes);
                if let Some(meta) = node.type_meta() {
                    meta.set_typeid(handle);
                }
            }
        }
    }
}

/// The global typeid interner (section 1: "the `typeid` interner is
/// the one component that must be safe for concurrent readers with
/// exclusive writers, because it is shared across packages").
pub struct Interner {
    table: RwLock<HashTable<TypeIdHandle>>,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: RwLock::new(HashTable::new()),
        }
    }

    /// `intern_bytes(bytes) -> typeid`, pure (section 4.B). Lookup
    /// holds a read lock; on miss, upgrades to a write lock and
    /// re-checks for a race-winning concurrent inserter before
    /// installing (section 4.B's "Concurrency" paragraph).
    pub fn intern_bytes(&self, bytes: &[u8]) -> TypeIdHandle {
        {
            let table = self.table.read().expect("typeid interner poisoned");
            if let Some(existing) = table.get(bytes) {
                return existing.clone();
            }
        }
        let mut table = self.table.write().expect("typeid interner poisoned");
        if let Some(existing) = table.get(bytes) {
            return existing.clone();
        }
        let handle = TypeIdHandle(std::sync::Arc::from(bytes));
        table.insert(bytes, handle.clone());
        handle
    }

    /// `intern(type) -> typeid` (section 4.B), with the side effect of
    /// caching the result into the node's own `TypeMeta`.
    pub fn intern_type(&self, arena: &NodeArena, id: NodeId) -> TypeIdHandle {
        if let Some(cached) = arena.get(id).type_meta().and_then(sema_ast::TypeMeta::typeid) {
            return cached;
        }
        let mut encoder = Encoder {
            arena,
            interner: self,
            stack: Vec::new(),
        };
        let encoded = encoder.encode(id);
        let handle = self.intern_bytes(&encoded.bytes);
        if let Some(meta) = arena.get(id).type_meta() {
            meta.set_typeid(handle.clone());
        }
        handle
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().expect("typeid interner poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-wide interner shared across packages (section 1). Checker
/// sessions that need isolation (tests, `CheckerOptions::isolated`)
/// should construct their own [`Interner`] instead of reaching for this.
pub static GLOBAL: Lazy<Interner> = Lazy::new(Interner::new);

#[cfg(test)]
mod tests {
    use super::*;
    use sema_ast::{Node, NodeFlags, NodeKind, NodePayload, TypeMeta, UserTypeHeader};
    use sema_common::Span;

    fn primitive(arena: &mut NodeArena, kind: NodeKind) -> NodeId {
        arena.alloc(Node::new(
            kind,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Primitive(TypeMeta::default()),
        ))
    }

    #[test]
    fn idempotence_of_typeid() {
        let mut arena = NodeArena::new();
        let i32_ty = primitive(&mut arena, NodeKind::I32);
        let interner = Interner::new();
        let a = interner.intern_type(&arena, i32_ty);
        let b = interner.intern_type(&arena, i32_ty);
        assert!(a == b);
    }

    #[test]
    fn sharing_implies_equal_reencoding() {
        let mut arena = NodeArena::new();
        let a_inner = primitive(&mut arena, NodeKind::I32);
        let b_inner = primitive(&mut arena, NodeKind::I32);
        let interner = Interner::new();
        let a = interner.intern_type(&arena, a_inner);
        let b = interner.intern_type(&arena, b_inner);
        assert!(a == b, "two structurally equal i32 nodes must share a typeid");
    }

    #[test]
    fn distinct_primitives_differ() {
        let mut arena = NodeArena::new();
        let i32_ty = primitive(&mut arena, NodeKind::I32);
        let i64_ty = primitive(&mut arena, NodeKind::I64);
        let interner = Interner::new();
        let a = interner.intern_type(&arena, i32_ty);
        let b = interner.intern_type(&arena, i64_ty);
        assert!(a != b);
    }

    #[test]
    fn self_referential_struct_terminates_with_one_backref() {
        let mut arena = NodeArena::new();
        let struct_id = arena.alloc(Node::new(
            NodeKind::Struct,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Struct {
                meta: TypeMeta::default(),
                header: UserTypeHeader::default(),
                name: None,
                fields: Vec::new(),
            },
        ));
        let ptr_id = arena.alloc(Node::new(
            NodeKind::Pointer,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Pointer {
                meta: TypeMeta::default(),
                header: UserTypeHeader::default(),
                pointee: struct_id,
            },
        ));
        // Wire the struct's single field's type to point at the pointer
        // node, making the struct self-referential through it.
        if let NodePayload::Struct { fields, .. } = &mut arena.get_mut(struct_id).payload {
            fields.push(sema_ast::StructField::new(
                sema_ast::Symbol::intern("next"),
                ptr_id,
                NodeFlags::empty(),
            ));
        }

        let interner = Interner::new();
        let handle = interner.intern_type(&arena, struct_id);
        let backref_count = handle.bytes().iter().filter(|&&b| b == b'&').count();
        assert_eq!(backref_count, 1, "exactly one back-reference expected");
    }

    #[test]
    fn mutual_cycle_between_two_named_structs_terminates() {
        let mut arena = NodeArena::new();
        let a = arena.alloc(Node::new(
            NodeKind::Struct,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Struct {
                meta: TypeMeta::default(),
                header: UserTypeHeader::default(),
                name: Some(sema_ast::Symbol::intern("A")),
                fields: Vec::new(),
            },
        ));
        let b = arena.alloc(Node::new(
            NodeKind::Struct,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Struct {
                meta: TypeMeta::default(),
                header: UserTypeHeader::default(),
                name: Some(sema_ast::Symbol::intern("B")),
                fields: Vec::new(),
            },
        ));
        let ptr_to_b = arena.alloc(Node::new(
            NodeKind::Pointer,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Pointer {
                meta: TypeMeta::default(),
                header: UserTypeHeader::default(),
                pointee: b,
            },
        ));
        let ptr_to_a = arena.alloc(Node::new(
            NodeKind::Pointer,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Pointer {
                meta: TypeMeta::default(),
                header: UserTypeHeader::default(),
                pointee: a,
            },
        ));
        if let NodePayload::Struct { fields, .. } = &mut arena.get_mut(a).payload {
            fields.push(sema_ast::StructField::new(
                sema_ast::Symbol::intern("b"),
                ptr_to_b,
                NodeFlags::empty(),
            ));
        }
        if let NodePayload::Struct { fields, .. } = &mut arena.get_mut(b).payload {
            fields.push(sema_ast::StructField::new(
                sema_ast::Symbol::intern("a"),
                ptr_to_a,
                NodeFlags::empty(),
            ));
        }

        let interner = Interner::new();
        // Must terminate (the test itself is the assertion: a buggy
        // encoder loops forever here).
        let handle = interner.intern_type(&arena, a);
        assert!(!handle.bytes().is_empty());
    }
}
