//! The generic AST transform (component E, section 4.E).
//!
//! This is the sole substrate for template expansion (section 4.F.5):
//! given a root node and a `visit` callback, it produces a (possibly
//! new) root such that whatever `visit` replaces is swapped in, and
//! every ancestor on the path down to a replaced node is cloned
//! (shallow) with its fields repointed at the new children. It is the
//! only code path in the workspace allowed to clone a node and repoint
//! its fields — the checker itself never does this directly (see
//! sections 4.D/4.E).
//!
//! Unlike `sema-reflect::reflect_fields` (read-only: it hands back
//! `FieldValue`s for the typeid encoder to consume), this module needs
//! to *rebuild* a node's payload with some children repointed, so it
//! walks `NodePayload`'s variants directly rather than going back
//! through the read-only reflection values. The set of variants walked
//! here exactly mirrors `reflect_fields`'s match.

use rustc_hash::FxHashMap;
use sema_ast::{
    Node, NodeArena, NodeFlags, NodeId, NodeKind, NodePayload, StructField, TemplateParam,
    TypeMeta, UserTypeHeader,
};
use sema_common::limits::MAX_AST_TRANSFORM_DEPTH;

/// Apply `visit` to every node reachable from `root`, returning the
/// (possibly unchanged) root id.
///
/// `visit` is consulted before descent at every node: if it returns
/// `Some(other)` with `other != id`, that replacement is used directly
/// and the transform does not descend into `id`'s own children (section
/// 4.E: "if visit returns a different pointer, that pointer replaces
/// the input at its slot"). Otherwise the transform recurses into every
/// `node`/`node-array` field; if none of them changed, `id` itself is
/// returned verbatim, otherwise a shallow clone with repointed fields
/// is allocated and returned.
pub fn transform_tree(
    arena: &mut NodeArena,
    root: NodeId,
    visit: &mut dyn FnMut(&NodeArena, NodeId) -> Option<NodeId>,
) -> NodeId {
    let mut memo = FxHashMap::default();
    go(arena, root, visit, &mut memo, 0)
}

fn go(
    arena: &mut NodeArena,
    id: NodeId,
    visit: &mut dyn FnMut(&NodeArena, NodeId) -> Option<NodeId>,
    memo: &mut FxHashMap<NodeId, NodeId>,
    depth: u32,
) -> NodeId {
    if let Some(&cached) = memo.get(&id) {
        return cached;
    }
    if depth > MAX_AST_TRANSFORM_DEPTH {
        tracing::warn!(depth, "sema_template: AST transform depth limit hit, leaving node as-is");
        return id;
    }

    if let Some(replacement) = visit(arena, id) {
        if replacement != id {
            memo.insert(id, replacement);
            return replacement;
        }
    }

    let kind = arena.get(id).kind;
    // Primitive and placeholder-type nodes carry no `node` fields, so
    // they fall straight through the "nothing changed" path below;
    // calling this out explicitly documents the "never scrubbed"
    // guarantee from section 4.E rather than leaving it as an emergent
    // property of an empty child list.
    if kind.is_primitive_type() || kind == NodeKind::Placeholder {
        memo.insert(id, id);
        return id;
    }

    let mut subst: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut changed = false;
    for child in structural_children(arena.get(id)) {
        let new_child = go(arena, child, visit, memo, depth + 1);
        if new_child != child {
            changed = true;
        }
        subst.insert(child, new_child);
    }

    let result = if changed {
        let new_payload = substitute_payload(&arena.get(id).payload, &subst);
        let old = arena.get(id);
        let new_flags = old.flags.get() & !NodeFlags::CHECKED;
        let new_node = Node::new(old.kind, new_flags, old.span, new_payload);
        arena.alloc(new_node)
    } else {
        id
    };
    memo.insert(id, result);
    result
}

/// The ids a node structurally owns (its `node`/`node?`/`node-array`
/// fields), in no particular order — unlike `reflect_fields`, transform
/// descent does not need declaration order, only completeness.
fn structural_children(node: &Node) -> Vec<NodeId> {
    let mut out = Vec::new();
    let push_header = |out: &mut Vec<NodeId>, h: &UserTypeHeader| out.extend(h.template_list.iter().copied());

    match &node.payload {
        NodePayload::Primitive(_) | NodePayload::Unresolved | NodePayload::Placeholder { .. } => {}
        NodePayload::Pointer { header, pointee, .. } => {
            push_header(&mut out, header);
            out.push(*pointee);
        }
        NodePayload::Reference { header, referent, .. } => {
            push_header(&mut out, header);
            out.push(*referent);
        }
        NodePayload::MutReference { referent, .. } => out.push(*referent),
        NodePayload::Optional { header, inner, .. } => {
            push_header(&mut out, header);
            out.push(*inner);
        }
        NodePayload::Array { header, elem, .. } => {
            push_header(&mut out, header);
            out.push(*elem);
        }
        NodePayload::Slice { header, elem, .. } => {
            push_header(&mut out, header);
            out.push(*elem);
        }
        NodePayload::MutSlice { elem, .. } => out.push(*elem),
        NodePayload::FunType {
            header, params, result, ..
        } => {
            push_header(&mut out, header);
            out.extend(params.iter().copied());
            out.push(*result);
        }
        NodePayload::Struct { header, fields, .. } => {
            push_header(&mut out, header);
            out.extend(fields.iter().map(|f| f.type_node));
        }
        NodePayload::Alias { header, target, .. } => {
            push_header(&mut out, header);
            out.push(*target);
        }
        NodePayload::Namespace { exports, .. } => out.extend(exports.values().copied()),
        NodePayload::Template { header, definition, .. } => {
            push_header(&mut out, header);
            out.push(*definition);
        }
        NodePayload::TemplateInstance {
            header,
            template,
            arg_exprs,
            ..
        } => {
            push_header(&mut out, header);
            out.push(*template);
            out.extend(arg_exprs.iter().copied());
        }
        NodePayload::Id { .. } | NodePayload::NamespaceExpr { .. } => {}
        NodePayload::BoolLiteral { .. }
        | NodePayload::IntLiteral { .. }
        | NodePayload::FloatLiteral { .. }
        | NodePayload::StringLiteral { .. } => {}
        NodePayload::ArrayLiteral { elements } => out.extend(elements.iter().copied()),
        NodePayload::BinOp { lhs, rhs, .. } => {
            out.push(*lhs);
            out.push(*rhs);
        }
        NodePayload::PrefixUnary { operand, .. } | NodePayload::PostfixUnary { operand, .. } => {
            out.push(*operand);
        }
        NodePayload::Deref { operand } => out.push(*operand),
        NodePayload::Call { callee, args } => {
            out.push(*callee);
            out.extend(args.iter().copied());
        }
        NodePayload::Typecons { target, args } => {
            out.push(*target);
            out.extend(args.iter().copied());
        }
        NodePayload::Member { receiver, .. } => out.push(*receiver),
        NodePayload::Subscript { receiver, index } => {
            out.push(*receiver);
            out.push(*index);
        }
        NodePayload::If {
            cond,
            then_branch,
            else_branch,
        } => {
            out.push(*cond);
            out.push(*then_branch);
            if let Some(e) = else_branch {
                out.push(*e);
            }
        }
        NodePayload::For {
            binding,
            iterable,
            cond,
            step,
            body,
        } => {
            out.extend(binding.iter().copied());
            out.extend(iterable.iter().copied());
            out.extend(cond.iter().copied());
            out.extend(step.iter().copied());
            out.push(*body);
        }
        NodePayload::Return { value } => out.extend(value.iter().copied()),
        NodePayload::Block { stmts } => out.extend(stmts.iter().copied()),
        NodePayload::Fun {
            header,
            params,
            result,
            body,
            ..
        } => {
            push_header(&mut out, header);
            out.extend(params.iter().copied());
            out.push(*result);
            out.extend(body.iter().copied());
        }
        NodePayload::Field {
            type_annotation,
            default,
            ..
        } => {
            out.push(*type_annotation);
            out.extend(default.iter().copied());
        }
        NodePayload::Param {
            type_annotation,
            default,
            ..
        } => {
            out.push(*type_annotation);
            out.extend(default.iter().copied());
        }
        NodePayload::Var {
            type_annotation,
            init,
            ..
        } => {
            out.extend(type_annotation.iter().copied());
            out.extend(init.iter().copied());
        }
        NodePayload::Let {
            type_annotation,
            init,
            ..
        } => {
            out.extend(type_annotation.iter().copied());
            out.push(*init);
        }
        NodePayload::Import { .. } => {}
        NodePayload::Typedef { header, target, .. } => {
            push_header(&mut out, header);
            out.push(*target);
        }
        NodePayload::Unit { decls } => out.extend(decls.iter().copied()),
        NodePayload::TemplateParamDecl(TemplateParam { default, .. }) => {
            out.extend(default.iter().copied());
        }
    }
    out
}

fn sub(subst: &FxHashMap<NodeId, NodeId>, id: NodeId) -> NodeId {
    subst.get(&id).copied().unwrap_or(id)
}

fn sub_opt(subst: &FxHashMap<NodeId, NodeId>, id: Option<NodeId>) -> Option<NodeId> {
    id.map(|id| sub(subst, id))
}

fn sub_vec(subst: &FxHashMap<NodeId, NodeId>, ids: &[NodeId]) -> Vec<NodeId> {
    ids.iter().map(|&id| sub(subst, id)).collect()
}

fn sub_header(subst: &FxHashMap<NodeId, NodeId>, header: &UserTypeHeader) -> UserTypeHeader {
    UserTypeHeader {
        parent_namespace: header.parent_namespace,
        template_list: sub_vec(subst, &header.template_list),
    }
}

/// Rebuild `payload` with every structural child looked up in `subst`
/// (falling back to itself when absent, i.e. unchanged). Cached type
/// metadata (`TypeMeta`) is reset rather than cloned: a structural
/// substitution can change a type's size/alignment/typeid, so a stale
/// copy would be actively wrong, not merely redundant. Non-reflected
/// resolution caches (`Id::resolved`, `Member::resolved`,
/// `NamespaceExpr::resolved`, `TemplateInstance::resolved`,
/// `StructField::offset`) are reset to their empty state for the same
/// reason, even though `structural_children` does not descend into
/// them.
fn substitute_payload(payload: &NodePayload, subst: &FxHashMap<NodeId, NodeId>) -> NodePayload {
    match payload {
        NodePayload::Primitive(_) => NodePayload::Primitive(TypeMeta::default()),
        NodePayload::Pointer { header, pointee, .. } => NodePayload::Pointer {
            meta: TypeMeta::default(),
            header: sub_header(subst, header),
            pointee: sub(subst, *pointee),
        },
        NodePayload::Reference { header, referent, .. } => NodePayload::Reference {
            meta: TypeMeta::default(),
            header: sub_header(subst, header),
            referent: sub(subst, *referent),
        },
        NodePayload::MutReference { referent, .. } => NodePayload::MutReference {
            meta: TypeMeta::default(),
            referent: sub(subst, *referent),
        },
        NodePayload::Optional { header, inner, .. } => NodePayload::Optional {
            meta: TypeMeta::default(),
            header: sub_header(subst, header),
            inner: sub(subst, *inner),
        },
        NodePayload::Array { header, elem, len, .. } => NodePayload::Array {
            meta: TypeMeta::default(),
            header: sub_header(subst, header),
            elem: sub(subst, *elem),
            len: *len,
        },
        NodePayload::Slice { header, elem, .. } => NodePayload::Slice {
            meta: TypeMeta::default(),
            header: sub_header(subst, header),
            elem: sub(subst, *elem),
        },
        NodePayload::MutSlice { elem, .. } => NodePayload::MutSlice {
            meta: TypeMeta::default(),
            elem: sub(subst, *elem),
        },
        NodePayload::FunType {
            header, params, result, ..
        } => NodePayload::FunType {
            meta: TypeMeta::default(),
            header: sub_header(subst, header),
            params: sub_vec(subst, params),
            result: sub(subst, *result),
        },
        NodePayload::Struct {
            header, name, fields, ..
        } => NodePayload::Struct {
            meta: TypeMeta::default(),
            header: sub_header(subst, header),
            name: name.clone(),
            fields: fields
                .iter()
                .map(|f| StructField::new(f.name.clone(), sub(subst, f.type_node), f.flags))
                .collect(),
        },
        NodePayload::Alias {
            header, name, target, ..
        } => NodePayload::Alias {
            meta: TypeMeta::default(),
            header: sub_header(subst, header),
            name: name.clone(),
            target: sub(subst, *target),
        },
        NodePayload::Namespace { name, exports } => NodePayload::Namespace {
            name: name.clone(),
            exports: exports
                .iter()
                .map(|(k, &v)| (k.clone(), sub(subst, v)))
                .collect(),
        },
        NodePayload::Template {
            header, name, definition,
        } => NodePayload::Template {
            header: sub_header(subst, header),
            name: name.clone(),
            definition: sub(subst, *definition),
        },
        NodePayload::TemplateInstance {
            header,
            template,
            arg_exprs,
            ..
        } => NodePayload::TemplateInstance {
            header: sub_header(subst, header),
            template: sub(subst, *template),
            arg_exprs: sub_vec(subst, arg_exprs),
            resolved: std::cell::Cell::new(None),
        },
        NodePayload::Placeholder { name } => NodePayload::Placeholder { name: name.clone() },
        NodePayload::Unresolved => NodePayload::Unresolved,

        NodePayload::Id { name, .. } => NodePayload::Id {
            name: name.clone(),
            resolved: std::cell::Cell::new(None),
        },
        NodePayload::NamespaceExpr { path, .. } => NodePayload::NamespaceExpr {
            path: path.clone(),
            resolved: std::cell::Cell::new(None),
        },
        NodePayload::BoolLiteral { value } => NodePayload::BoolLiteral { value: *value },
        NodePayload::IntLiteral { text, value } => NodePayload::IntLiteral {
            text: text.clone(),
            value: *value,
        },
        NodePayload::FloatLiteral { text, value } => NodePayload::FloatLiteral {
            text: text.clone(),
            value: *value,
        },
        NodePayload::ArrayLiteral { elements } => NodePayload::ArrayLiteral {
            elements: sub_vec(subst, elements),
        },
        NodePayload::StringLiteral { value } => NodePayload::StringLiteral { value: value.clone() },
        NodePayload::BinOp { op, lhs, rhs } => NodePayload::BinOp {
            op: *op,
            lhs: sub(subst, *lhs),
            rhs: sub(subst, *rhs),
        },
        NodePayload::PrefixUnary { op, operand } => NodePayload::PrefixUnary {
            op: *op,
            operand: sub(subst, *operand),
        },
        NodePayload::PostfixUnary { op, operand } => NodePayload::PostfixUnary {
            op: *op,
            operand: sub(subst, *operand),
        },
        NodePayload::Deref { operand } => NodePayload::Deref {
            operand: sub(subst, *operand),
        },
        NodePayload::Call { callee, args } => NodePayload::Call {
            callee: sub(subst, *callee),
            args: sub_vec(subst, args),
        },
        NodePayload::Typecons { target, args } => NodePayload::Typecons {
            target: sub(subst, *target),
            args: sub_vec(subst, args),
        },
        NodePayload::Member { receiver, name, .. } => NodePayload::Member {
            receiver: sub(subst, *receiver),
            name: name.clone(),
            resolved: std::cell::Cell::new(None),
        },
        NodePayload::Subscript { receiver, index } => NodePayload::Subscript {
            receiver: sub(subst, *receiver),
            index: sub(subst, *index),
        },
        NodePayload::If {
            cond,
            then_branch,
            else_branch,
        } => NodePayload::If {
            cond: sub(subst, *cond),
            then_branch: sub(subst, *then_branch),
            else_branch: sub_opt(subst, *else_branch),
        },
        NodePayload::For {
            binding,
            iterable,
            cond,
            step,
            body,
        } => NodePayload::For {
            binding: sub_opt(subst, *binding),
            iterable: sub_opt(subst, *iterable),
            cond: sub_opt(subst, *cond),
            step: sub_opt(subst, *step),
            body: sub(subst, *body),
        },
        NodePayload::Return { value } => NodePayload::Return {
            value: sub_opt(subst, *value),
        },
        NodePayload::Block { stmts } => NodePayload::Block {
            stmts: sub_vec(subst, stmts),
        },
        NodePayload::Fun {
            name,
            header,
            params,
            result,
            body,
        } => NodePayload::Fun {
            name: name.clone(),
            header: sub_header(subst, header),
            params: sub_vec(subst, params),
            result: sub(subst, *result),
            body: sub_opt(subst, *body),
        },
        NodePayload::Field {
            name,
            type_annotation,
            default,
        } => NodePayload::Field {
            name: name.clone(),
            type_annotation: sub(subst, *type_annotation),
            default: sub_opt(subst, *default),
        },
        NodePayload::Param {
            name,
            type_annotation,
            default,
            mutable,
        } => NodePayload::Param {
            name: name.clone(),
            type_annotation: sub(subst, *type_annotation),
            default: sub_opt(subst, *default),
            mutable: *mutable,
        },
        NodePayload::Var {
            name,
            type_annotation,
            init,
            mutable,
        } => NodePayload::Var {
            name: name.clone(),
            type_annotation: sub_opt(subst, *type_annotation),
            init: sub_opt(subst, *init),
            mutable: *mutable,
        },
        NodePayload::Let {
            name,
            type_annotation,
            init,
        } => NodePayload::Let {
            name: name.clone(),
            type_annotation: sub_opt(subst, *type_annotation),
            init: sub(subst, *init),
        },
        NodePayload::Import { path, alias } => NodePayload::Import {
            path: path.clone(),
            alias: alias.clone(),
        },
        NodePayload::Typedef { name, header, target } => NodePayload::Typedef {
            name: name.clone(),
            header: sub_header(subst, header),
            target: sub(subst, *target),
        },
        NodePayload::Unit { decls } => NodePayload::Unit {
            decls: sub_vec(subst, decls),
        },
        NodePayload::TemplateParamDecl(param) => NodePayload::TemplateParamDecl(TemplateParam {
            name: param.name.clone(),
            default: sub_opt(subst, param.default),
        }),
    }
}
