//! Function checking (section 4.F.4): receiver by-value/reference
//! promotion, `drop`/`main` signature validation, and the
//! result-type/`this`-enclosing-function context a `return` or bare
//! `this` expression consults.
//!
//! Pushes a result-type and enclosing-function stack on entry and pops
//! them on exit rather than threading them through every recursive call.

use sema_ast::{Node, NodeFlags, NodeId, NodeKind, NodePayload, Symbol};
use sema_common::diagnostics::codes;
use sema_common::limits::TARGET_POINTER_SIZE;

use crate::context::CheckerContext;
use crate::scope::Narrow;

impl<'a> CheckerContext<'a> {
    /// Check one function declaration: its parameter types, its
    /// `drop`/`main` signature if named as such, and its body.
    pub(crate) fn check_fun(&mut self, fun: NodeId) {
        if self.arena.get(fun).is_checked() {
            return;
        }
        let (name, params, result, body) = match &self.arena.get(fun).payload {
            NodePayload::Fun { name, params, result, body, .. } => (name.clone(), params.clone(), *result, *body),
            other => panic!("check_fun called on non-Fun payload: {other:?}"),
        };

        self.check_type_ref(result);
        self.push_scope();
        self.enclosing_function.push(fun);
        self.result_type_stack.push(result);

        for (index, &param) in params.iter().enumerate() {
            self.register_param(index, param);
        }

        if let Some(name) = &name {
            match name.as_str() {
                "drop" => self.check_drop_signature(fun, &params, result),
                "main" if self.enclosing_function.len() == 1 => self.check_main_signature(fun, &params, result),
                _ => {}
            }
        }

        if let Some(body) = body {
            if self.arena.get(result).kind != NodeKind::Void {
                let flags = self.arena.get(body).flags.get();
                self.arena.get(body).flags.set(flags | NodeFlags::RVALUE);
            }
            self.check_expr_with_ctx(body, Some(result));
        }

        self.result_type_stack.pop();
        self.enclosing_function.pop();
        self.pop_scope();
        self.arena.get(fun).mark_checked();
    }

    /// Register `param`'s name in the function's scope. The generic
    /// expression-checking path for a bare `Param` node (section 4.F.1)
    /// only checks its type annotation; it does not bind a name, since
    /// outside a function header a `Param` node never needs one.
    fn register_param(&mut self, index: usize, param: NodeId) {
        let (name, type_annotation) = match &self.arena.get(param).payload {
            NodePayload::Param { name, type_annotation, .. } => (name.clone(), *type_annotation),
            other => panic!("register_param called on non-Param payload: {other:?}"),
        };
        self.check_type_ref(type_annotation);

        if index == 0 && name.as_str() == "this" {
            self.apply_this_receiver_rule(param);
        }

        self.scopes.declare(name, param);
        self.scopes.set_narrow(param, Narrow::Maybe);
    }

    /// Promote a `this` receiver to pass-by-reference unless it is
    /// immutable and either a primitive or a small struct, leaving it
    /// by value otherwise (section 4.F.4).
    ///
    /// Grounded in the original's `this_type`: a struct qualifies only
    /// when `align <= ptrsize && size <= ptrsize * 2`; primitives always
    /// qualify. Struct `size`/`align` are read from the type's cached
    /// `TypeMeta` — layout computation itself is a backend concern
    /// outside this subsystem's components, so the cache is trusted to
    /// already hold whatever an earlier stage computed.
    fn apply_this_receiver_rule(&mut self, param: NodeId) {
        let (recvt, mutable) = match &self.arena.get(param).payload {
            NodePayload::Param { type_annotation, mutable, .. } => (*type_annotation, *mutable),
            other => panic!("apply_this_receiver_rule called on non-Param payload: {other:?}"),
        };

        if !mutable && self.receiver_passes_by_value(recvt) {
            return;
        }

        let reference = self.arena.alloc(Node::new(
            NodeKind::Reference,
            NodeFlags::CHECKED,
            sema_common::Span::dummy(),
            NodePayload::Reference {
                meta: sema_ast::TypeMeta::default(),
                header: sema_ast::UserTypeHeader::default(),
                referent: recvt,
            },
        ));
        self.ensure_layout(reference);
        self.arena.get(param).resolved_type.set(Some(reference));
        self.arena.get(param).mark_checked();
    }

    fn receiver_passes_by_value(&self, recvt: NodeId) -> bool {
        if self.arena.get(recvt).kind.is_primitive_type() {
            return true;
        }
        if let NodePayload::Struct { meta, .. } = &self.arena.get(recvt).payload {
            let max_size = u64::from(TARGET_POINTER_SIZE) * 2;
            return u64::from(meta.align.get()) <= u64::from(TARGET_POINTER_SIZE) && u64::from(meta.size.get()) <= max_size;
        }
        false
    }

    /// `drop` must take exactly one `mut this` parameter and return
    /// `void`; on success the receiver's type gets `NodeFlags::DROP`
    /// (section 4.F.4, grounded in the original's drop-signature check
    /// in `typecheck.c`, which sets `NF_DROP` on the receiver type).
    fn check_drop_signature(&mut self, fun: NodeId, params: &[NodeId], result: NodeId) {
        let valid = params.len() == 1 && self.arena.get(result).kind == NodeKind::Void && {
            match &self.arena.get(params[0]).payload {
                NodePayload::Param { name, mutable, .. } => name.as_str() == "this" && *mutable,
                _ => false,
            }
        };

        if !valid {
            let type_name = match params.first() {
                Some(&p) => match &self.arena.get(p).payload {
                    NodePayload::Param { type_annotation, .. } => format!("{:?}", self.arena.get(*type_annotation).kind),
                    _ => "?".to_string(),
                },
                None => "?".to_string(),
            };
            self.error_at_node_msg(fun, codes::INVALID_DROP_SIGNATURE, &[&type_name]);
            return;
        }

        let recvt = match &self.arena.get(params[0]).payload {
            NodePayload::Param { type_annotation, .. } => *type_annotation,
            _ => unreachable!(),
        };
        let receiver_type = self.underlying_receiver_type(recvt);
        let flags = self.arena.get(receiver_type).flags.get();
        self.arena.get(receiver_type).flags.set(flags | NodeFlags::DROP);
    }

    /// `main` must take no parameters and return `void`; the first valid
    /// `main` at the package root becomes `self.main_fun`, a later one
    /// is a duplicate definition (section 4.F.0's duplicate-name rule
    /// already catches same-name collisions; this additionally catches
    /// the case where `main` is declared once but mis-signatured).
    fn check_main_signature(&mut self, fun: NodeId, params: &[NodeId], result: NodeId) {
        if !params.is_empty() || self.arena.get(result).kind != NodeKind::Void {
            self.error_at_node_msg(fun, codes::INVALID_MAIN_SIGNATURE, &[]);
            return;
        }
        if self.main_fun.is_none() {
            self.main_fun = Some(fun);
        }
    }

    /// Strip reference wrapping the `this`-promotion rule may have added
    /// around `recvt`, to reach the actual receiver type that `DROP`
    /// gets set on.
    fn underlying_receiver_type(&self, recvt: NodeId) -> NodeId {
        match &self.arena.get(recvt).payload {
            NodePayload::Reference { referent, .. } | NodePayload::MutReference { referent, .. } => *referent,
            _ => recvt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sema_ast::{Node as AstNode, NodeArena};
    use sema_common::{CheckerOptions, Span};

    fn alloc_primitive(arena: &mut NodeArena, kind: NodeKind) -> NodeId {
        arena.alloc(AstNode::new(kind, NodeFlags::CHECKED, Span::dummy(), NodePayload::Primitive(Default::default())))
    }

    fn alloc_param(arena: &mut NodeArena, name: &str, type_annotation: NodeId, mutable: bool) -> NodeId {
        arena.alloc(AstNode::new(
            NodeKind::Param,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Param { name: Symbol::intern(name), type_annotation, default: None, mutable },
        ))
    }

    #[test]
    fn immutable_primitive_this_stays_by_value() {
        let mut arena = NodeArena::new();
        let i32_ty = alloc_primitive(&mut arena, NodeKind::I32);
        let this_param = alloc_param(&mut arena, "this", i32_ty, false);
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.push_scope();
        ctx.register_param(0, this_param);
        ctx.pop_scope();
        assert_eq!(ctx.arena.get(this_param).resolved_type.get(), None);
    }

    #[test]
    fn mutable_this_is_promoted_to_reference() {
        let mut arena = NodeArena::new();
        let i32_ty = alloc_primitive(&mut arena, NodeKind::I32);
        let this_param = alloc_param(&mut arena, "this", i32_ty, true);
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.push_scope();
        ctx.register_param(0, this_param);
        ctx.pop_scope();
        let resolved = ctx.arena.get(this_param).resolved_type.get().expect("promoted to a reference");
        assert!(matches!(ctx.arena.get(resolved).payload, NodePayload::Reference { .. }));
    }

    #[test]
    fn large_struct_this_is_promoted_to_reference() {
        let mut arena = NodeArena::new();
        let struct_ty = arena.alloc(AstNode::new(
            NodeKind::Struct,
            NodeFlags::CHECKED,
            Span::dummy(),
            NodePayload::Struct { meta: Default::default(), header: Default::default(), name: None, fields: Vec::new() },
        ));
        if let NodePayload::Struct { meta, .. } = &arena.get(struct_ty).payload {
            meta.size.set(64);
            meta.align.set(8);
        }
        let this_param = alloc_param(&mut arena, "this", struct_ty, false);
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.push_scope();
        ctx.register_param(0, this_param);
        ctx.pop_scope();
        let resolved = ctx.arena.get(this_param).resolved_type.get().expect("promoted to a reference");
        assert!(matches!(ctx.arena.get(resolved).payload, NodePayload::Reference { .. }));
    }
}
