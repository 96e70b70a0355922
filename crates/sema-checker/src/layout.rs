//! Struct layout computation (section 4.F: the checker "resolve[s]
//! names, check[s]/propagate[s] types, compute[s] struct layout"; section
//! 8 scenario 5: a struct's size, alignment, and per-field byte offset
//! are checkable properties of a checked type).
//!
//! Grounded in `typecheck.c`'s `structtype()`, which walks a struct's
//! fields in declaration order accumulating natural alignment and
//! trailing padding the same way (`ALIGN2(size, align)` here is
//! `align_up`); `mkreftype()` for pointer/reference sizing and
//! `opttype()` for optional sizing are folded in the same way. This
//! module generalizes the algorithm to every composite type kind so
//! `meta.size`/`meta.align` are populated for *any* checked type, not
//! only structs, matching section 3's invariant ("every checked type has
//! size > 0 and align > 0 except unknown and the unit type void").

use sema_ast::{NodeId, NodeKind, NodePayload};
use sema_common::limits::TARGET_POINTER_SIZE;

use crate::context::CheckerContext;

/// Size and alignment, in bytes, of every primitive kind (section 3).
/// `Void` and `Unknown` are the two kinds the size/align invariant
/// explicitly excludes; they report `(0, 1)` so alignment arithmetic
/// elsewhere never divides or masks by zero, while `size == 0` still
/// signals "carries no storage" to any caller that checks it.
#[must_use]
pub(crate) fn primitive_size_align(kind: NodeKind) -> (u32, u32) {
    match kind {
        NodeKind::Void | NodeKind::Unknown => (0, 1),
        NodeKind::Bool | NodeKind::I8 | NodeKind::U8 => (1, 1),
        NodeKind::I16 | NodeKind::U16 => (2, 2),
        NodeKind::I32 | NodeKind::U32 | NodeKind::F32 => (4, 4),
        NodeKind::I64 | NodeKind::U64 | NodeKind::F64 | NodeKind::Int | NodeKind::Uint => (8, 8),
        other => panic!("primitive_size_align called on non-primitive kind {other:?}"),
    }
}

/// Round `value` up to the nearest multiple of `align` (`align` a power
/// of two, matching the hashtable core's own capacity discipline).
#[must_use]
fn align_up(value: u32, align: u32) -> u32 {
    if align <= 1 {
        return value;
    }
    (value + align - 1) & !(align - 1)
}

impl<'a> CheckerContext<'a> {
    /// Compute (and cache, via `meta.size`/`meta.align`) the layout of
    /// `ty`. Idempotent: a type whose alignment is already non-zero has
    /// already been computed and is returned as-is, so a type referenced
    /// from many sites across a unit is only laid out once.
    ///
    /// Panics only if `ty` does not name a type node at all; expression
    /// and statement nodes never reach this path because every call site
    /// gates on `NodeKind::is_type`.
    pub(crate) fn ensure_layout(&mut self, ty: NodeId) -> (u32, u32) {
        if let Some(meta) = self.arena.get(ty).payload.type_meta() {
            if meta.align.get() != 0 {
                return (meta.size.get(), meta.align.get());
            }
        }

        if self.layout_depth >= self.options.max_checker_recursion_depth {
            tracing::warn!(depth = self.layout_depth, "struct layout recursion depth exceeded");
            return (0, 1);
        }

        self.layout_depth += 1;
        let (size, align) = self.compute_layout(ty);
        self.layout_depth -= 1;

        if let Some(meta) = self.arena.get(ty).payload.type_meta() {
            meta.size.set(size);
            meta.align.set(align.max(1));
        }
        (size, align.max(1))
    }

    fn compute_layout(&mut self, ty: NodeId) -> (u32, u32) {
        let kind = self.arena.get(ty).kind;
        if kind.is_primitive_type() {
            return primitive_size_align(kind);
        }

        match &self.arena.get(ty).payload {
            NodePayload::Pointer { .. } | NodePayload::Reference { .. } | NodePayload::MutReference { .. } => {
                (TARGET_POINTER_SIZE, TARGET_POINTER_SIZE)
            }

            // A fat pointer: data pointer followed by a length word, the
            // same shape `string_type` (section 4.F.1's default string
            // representation) and every other slice use. `Slice`/
            // `MutSlice` are borrowed views with no capacity of their
            // own (distinct from the original's growable, capacity-
            // tracking dynamic array, which carries a third word), so
            // this is two words rather than three.
            NodePayload::Slice { .. } | NodePayload::MutSlice { .. } => (TARGET_POINTER_SIZE * 2, TARGET_POINTER_SIZE),

            // A sized array's storage is `len` copies of its element,
            // with the element's own alignment; an unsized array type
            // (no literal length attached, e.g. an inferred literal
            // shape before assignment) carries no storage of its own.
            NodePayload::Array { elem, len, .. } => {
                let elem = *elem;
                let len = *len;
                let (elem_size, elem_align) = self.ensure_layout(elem);
                match len {
                    Some(len) => (elem_size.saturating_mul(u32::try_from(len).unwrap_or(u32::MAX)), elem_align),
                    None => (0, elem_align),
                }
            }

            // A function value is a code pointer; the callee's own
            // parameter/result layout is not part of this component
            // (code generation's concern, an explicit non-goal here).
            NodePayload::FunType { .. } => (TARGET_POINTER_SIZE, TARGET_POINTER_SIZE),

            NodePayload::Struct { fields, .. } => {
                let field_types: Vec<NodeId> = fields.iter().map(|f| f.type_node).collect();
                self.layout_struct(ty, &field_types)
            }

            NodePayload::Alias { target, .. } => {
                let target = *target;
                self.check_type_ref(target);
                self.ensure_layout(target)
            }

            // `opttype()`: the presence flag is folded into the value's
            // own storage rather than appended as a trailing byte, so an
            // optional is simply twice its inner type's larger of
            // size/align, at the inner type's own alignment.
            NodePayload::Optional { inner, .. } => {
                let inner = *inner;
                let (inner_size, inner_align) = self.ensure_layout(inner);
                (inner_size.max(inner_align) * 2, inner_align)
            }

            // `Template`/`TemplateInstance` (unresolved, before
            // expansion)/`Namespace`/`Placeholder`/`Unresolved` carry no
            // storage of their own; an instance's *resolved* clone is a
            // `Struct`/`Alias`/`FunType` node handled by the arms above.
            _ => (0, 1),
        }
    }

    /// Natural C-like layout: fields placed in declaration order, each
    /// padded up to its own alignment; the struct's overall alignment is
    /// the maximum field alignment, and its size is padded up to a
    /// multiple of that alignment so an array of the struct packs
    /// correctly (section 8 scenario 5: `{a i8; b i32; c i8}` lays out
    /// at offsets 0/4/8 with size >= 12, align 4 — the trailing `i8` at
    /// offset 8 plus its three bytes of tail padding).
    fn layout_struct(&mut self, ty: NodeId, field_types: &[NodeId]) -> (u32, u32) {
        let mut offset: u32 = 0;
        let mut max_align: u32 = 1;
        let mut offsets = Vec::with_capacity(field_types.len());

        for &field_ty in field_types {
            self.check_type_ref(field_ty);
            let (fsize, falign) = self.ensure_layout(field_ty);
            let falign = falign.max(1);
            offset = align_up(offset, falign);
            offsets.push(offset);
            offset += fsize;
            max_align = max_align.max(falign);
        }

        let size = align_up(offset, max_align);

        if let NodePayload::Struct { fields, .. } = &self.arena.get(ty).payload {
            for (field, off) in fields.iter().zip(offsets.iter()) {
                field.offset.set(*off);
            }
        }

        (size, max_align)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sema_ast::{Node, NodeArena, NodeFlags, StructField, Symbol, UserTypeHeader};
    use sema_common::{CheckerOptions, Span};

    fn alloc_primitive(arena: &mut NodeArena, kind: NodeKind) -> NodeId {
        arena.alloc(Node::new(kind, NodeFlags::CHECKED, Span::dummy(), NodePayload::Primitive(Default::default())))
    }

    #[test]
    fn primitive_layout_matches_fixed_width() {
        let mut arena = NodeArena::new();
        let i8_ty = alloc_primitive(&mut arena, NodeKind::I8);
        let i32_ty = alloc_primitive(&mut arena, NodeKind::I32);
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        assert_eq!(ctx.ensure_layout(i8_ty), (1, 1));
        assert_eq!(ctx.ensure_layout(i32_ty), (4, 4));
    }

    #[test]
    fn void_and_unknown_have_zero_size() {
        let mut arena = NodeArena::new();
        let void_ty = alloc_primitive(&mut arena, NodeKind::Void);
        let unknown_ty = alloc_primitive(&mut arena, NodeKind::Unknown);
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        let (size, _) = ctx.ensure_layout(void_ty);
        assert_eq!(size, 0);
        let (size, _) = ctx.ensure_layout(unknown_ty);
        assert_eq!(size, 0);
    }

    /// Section 8 scenario 5: `type S { a i8 ; b i32 ; c i8 }` — size >=
    /// 12, align 4, `a.offset == 0`, `b.offset == 4`, `c.offset == 8`.
    #[test]
    fn struct_layout_pads_fields_to_their_own_alignment() {
        let mut arena = NodeArena::new();
        let i8_ty = alloc_primitive(&mut arena, NodeKind::I8);
        let i32_ty = alloc_primitive(&mut arena, NodeKind::I32);
        let a = StructField::new(Symbol::intern("a"), i8_ty, NodeFlags::empty());
        let b = StructField::new(Symbol::intern("b"), i32_ty, NodeFlags::empty());
        let c = StructField::new(Symbol::intern("c"), i8_ty, NodeFlags::empty());
        let struct_ty = arena.alloc(Node::new(
            NodeKind::Struct,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Struct { meta: Default::default(), header: UserTypeHeader::default(), name: Some(Symbol::intern("S")), fields: vec![a, b, c] },
        ));

        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        let (size, align) = ctx.ensure_layout(struct_ty);
        assert_eq!(align, 4);
        assert!(size >= 12);

        match &ctx.arena.get(struct_ty).payload {
            NodePayload::Struct { fields, .. } => {
                assert_eq!(fields[0].offset.get(), 0);
                assert_eq!(fields[1].offset.get(), 4);
                assert_eq!(fields[2].offset.get(), 8);
            }
            other => panic!("expected Struct, got {other:?}"),
        }
    }

    #[test]
    fn layout_is_memoized_across_repeated_calls() {
        let mut arena = NodeArena::new();
        let i32_ty = alloc_primitive(&mut arena, NodeKind::I32);
        let field = StructField::new(Symbol::intern("v"), i32_ty, NodeFlags::empty());
        let struct_ty = arena.alloc(Node::new(
            NodeKind::Struct,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Struct { meta: Default::default(), header: UserTypeHeader::default(), name: None, fields: vec![field] },
        ));
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        let first = ctx.ensure_layout(struct_ty);
        let second = ctx.ensure_layout(struct_ty);
        assert_eq!(first, second);
        assert_eq!(first, (4, 4));
    }

    #[test]
    fn slice_is_a_fat_pointer() {
        let mut arena = NodeArena::new();
        let u8_ty = alloc_primitive(&mut arena, NodeKind::U8);
        let slice_ty = arena.alloc(Node::new(
            NodeKind::Slice,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Slice { meta: Default::default(), header: UserTypeHeader::default(), elem: u8_ty },
        ));
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        assert_eq!(ctx.ensure_layout(slice_ty), (16, 8));
    }

    #[test]
    fn optional_of_a_reference_doubles_the_pointer_width() {
        let mut arena = NodeArena::new();
        let i32_ty = alloc_primitive(&mut arena, NodeKind::I32);
        let reference_ty = arena.alloc(Node::new(
            NodeKind::Reference,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Reference { meta: Default::default(), header: UserTypeHeader::default(), referent: i32_ty },
        ));
        let optional_ty = arena.alloc(Node::new(
            NodeKind::Optional,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Optional { meta: Default::default(), header: UserTypeHeader::default(), inner: reference_ty },
        ));
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        assert_eq!(ctx.ensure_layout(optional_ty), (16, 8));
    }

    #[test]
    fn optional_of_a_value_type_is_twice_its_size() {
        let mut arena = NodeArena::new();
        let i32_ty = alloc_primitive(&mut arena, NodeKind::I32);
        let optional_ty = arena.alloc(Node::new(
            NodeKind::Optional,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Optional { meta: Default::default(), header: UserTypeHeader::default(), inner: i32_ty },
        ));
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        let (size, align) = ctx.ensure_layout(optional_ty);
        assert_eq!(align, 4);
        assert_eq!(size, 8);
    }
}
