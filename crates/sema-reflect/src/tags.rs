//! Kind tags (section 4.A / section 6): a stable, versioned 4-byte ASCII
//! identifier per `NodeKind`, distinct from the kind's integer
//! discriminant (which is not part of any external contract).
//!
//! Function definitions and struct types share the `fun_`/`strT`-style
//! prefix-disambiguation scheme described in section 4.A: `Fun` and
//! `Struct` both begin with the same first byte class (user-type
//! definitions) but are disambiguated by a distinct secondary byte
//! (`f` vs `s`), preserved here as plain distinct 4-byte tags rather
//! than a shared prefix type, since Rust has no direct analogue of the
//! source's byte-level struct-prefix sharing.

use sema_ast::NodeKind;

/// A 4-byte ASCII kind tag.
pub type KindTag = [u8; 4];

/// `(kind, tag)` in `NodeKind` declaration order. `verify_reflection_tables`
/// checks this table is a bijection and that every tag is unique and
/// ASCII.
pub const KIND_TAGS: &[(NodeKind, KindTag)] = &[
    (NodeKind::Void, *b"voiT"),
    (NodeKind::Bool, *b"booT"),
    (NodeKind::I8, *b"i8_T"),
    (NodeKind::I16, *b"i16T"),
    (NodeKind::I32, *b"i32T"),
    (NodeKind::I64, *b"i64T"),
    (NodeKind::Int, *b"intT"),
    (NodeKind::U8, *b"u8_T"),
    (NodeKind::U16, *b"u16T"),
    (NodeKind::U32, *b"u32T"),
    (NodeKind::U64, *b"u64T"),
    (NodeKind::Uint, *b"uinT"),
    (NodeKind::F32, *b"f32T"),
    (NodeKind::F64, *b"f64T"),
    (NodeKind::Unknown, *b"unkT"),
    (NodeKind::Pointer, *b"ptrT"),
    (NodeKind::Reference, *b"refT"),
    (NodeKind::MutReference, *b"mrfT"),
    (NodeKind::Optional, *b"optT"),
    (NodeKind::Array, *b"arrT"),
    (NodeKind::Slice, *b"slcT"),
    (NodeKind::MutSlice, *b"mslT"),
    (NodeKind::FunType, *b"fnTT"),
    (NodeKind::Struct, *b"strT"),
    (NodeKind::Alias, *b"aliT"),
    (NodeKind::Namespace, *b"nsT_"),
    (NodeKind::Template, *b"tmpT"),
    (NodeKind::TemplateInstance, *b"tmiT"),
    (NodeKind::Placeholder, *b"phT_"),
    (NodeKind::Unresolved, *b"unrT"),
    (NodeKind::Id, *b"id__"),
    (NodeKind::NamespaceExpr, *b"nsE_"),
    (NodeKind::BoolLiteral, *b"boL_"),
    (NodeKind::IntLiteral, *b"intL"),
    (NodeKind::FloatLiteral, *b"fltL"),
    (NodeKind::ArrayLiteral, *b"arrL"),
    (NodeKind::StringLiteral, *b"strL"),
    (NodeKind::BinOp, *b"bin_"),
    (NodeKind::PrefixUnary, *b"pre_"),
    (NodeKind::PostfixUnary, *b"post"),
    (NodeKind::Deref, *b"dref"),
    (NodeKind::Call, *b"call"),
    (NodeKind::Typecons, *b"tycn"),
    (NodeKind::Member, *b"memb"),
    (NodeKind::Subscript, *b"subs"),
    (NodeKind::If, *b"if__"),
    (NodeKind::For, *b"for_"),
    (NodeKind::Return, *b"retn"),
    (NodeKind::Block, *b"blk_"),
    (NodeKind::Fun, *b"fun_"),
    (NodeKind::Field, *b"fld_"),
    (NodeKind::Param, *b"parm"),
    (NodeKind::Var, *b"var_"),
    (NodeKind::Let, *b"let_"),
    (NodeKind::Import, *b"impt"),
    (NodeKind::Typedef, *b"tdef"),
    (NodeKind::Unit, *b"unit"),
    (NodeKind::TemplateParamDecl, *b"tprm"),
];

#[must_use]
pub fn tag_of(kind: NodeKind) -> KindTag {
    KIND_TAGS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, t)| *t)
        .unwrap_or_else(|| panic!("missing kind tag for {kind:?}"))
}

#[must_use]
pub fn kind_of_tag(tag: KindTag) -> Option<NodeKind> {
    KIND_TAGS.iter().find(|(_, t)| *t == tag).map(|(k, _)| *k)
}

/// Checked on crate initialisation in tests (not a runtime constructor,
/// per section 4.A: "the checked-in build verifies this on
/// initialisation" is satisfied here by a `#[test]`, not a ctor, since
/// Rust has no portable static-initializer hook worth adding for it).
#[must_use]
pub fn verify_reflection_tables() -> Result<(), String> {
    use std::collections::HashSet;

    if KIND_TAGS.len() != NodeKind::COUNT {
        return Err(format!(
            "kind tag table has {} entries, expected {}",
            KIND_TAGS.len(),
            NodeKind::COUNT
        ));
    }

    let mut seen_kinds = HashSet::new();
    let mut seen_tags = HashSet::new();
    for (kind, tag) in KIND_TAGS {
        if !seen_kinds.insert(*kind) {
            return Err(format!("duplicate kind entry: {kind:?}"));
        }
        if !seen_tags.insert(*tag) {
            return Err(format!(
                "duplicate tag {:?} (kind {:?})",
                std::str::from_utf8(tag),
                kind
            ));
        }
        if !tag.is_ascii() {
            return Err(format!("tag for {kind:?} is not ASCII: {tag:?}"));
        }
    }

    for kind in NodeKind::all() {
        let t = tag_of(kind);
        match kind_of_tag(t) {
            Some(k2) if k2 == kind => {}
            Some(k2) => {
                return Err(format!(
                    "tag {:?} maps kind {:?} to {:?}, not back to itself",
                    std::str::from_utf8(&t),
                    kind,
                    k2
                ));
            }
            None => return Err(format!("tag {:?} has no inverse", std::str::from_utf8(&t))),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_agree() {
        verify_reflection_tables().unwrap();
    }

    #[test]
    fn fun_and_struct_share_prefix_but_differ() {
        let fun_tag = tag_of(NodeKind::Fun);
        let struct_tag = tag_of(NodeKind::Struct);
        assert_ne!(fun_tag, struct_tag);
        assert_eq!(fun_tag[0], b'f');
        assert_eq!(struct_tag[0], b's');
    }
}
