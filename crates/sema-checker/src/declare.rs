//! Declaration checking (section 4.F.0): two-pass registration of a
//! unit's top-level names so forward references between declarations
//! resolve regardless of textual order, followed by body checking.
//!
//! Follows a "bind every name up front, then check" split so e.g. one
//! function can call another declared later in the same file.

use sema_ast::{NodeId, NodePayload, Symbol};
use sema_common::diagnostics::codes;

use crate::context::CheckerContext;

impl<'a> CheckerContext<'a> {
    /// Check an entire unit (section 5: units are checked one at a time,
    /// each to completion, in parse order).
    pub fn check_unit(&mut self, unit: NodeId) {
        self.push_scope();

        let decls = match &self.arena.get(unit).payload {
            NodePayload::Unit { decls } => decls.clone(),
            other => panic!("check_unit called on non-Unit payload: {other:?}"),
        };

        for &decl in &decls {
            self.register_decl(decl);
        }
        for &decl in &decls {
            self.check_decl(decl);
        }

        self.pop_scope();

        if self.options.run_postanalyze {
            self.run_postanalyze();
        }
    }

    /// Bind `decl`'s name in the current scope, reporting
    /// `DUPLICATE_DEFINITION` at the *second* occurrence while keeping
    /// the first binding for lookups (section 4.F.0).
    fn register_decl(&mut self, decl: NodeId) {
        let Some(name) = decl_name(self.arena.get(decl)) else {
            return;
        };
        if !self.scopes.declare(name.clone(), decl) {
            self.error_at_node_msg(decl, codes::DUPLICATE_DEFINITION, &[name.as_str()]);
        }
    }

    /// Check `decl`'s body now that every top-level name is bound.
    fn check_decl(&mut self, decl: NodeId) {
        match &self.arena.get(decl).payload {
            NodePayload::Fun { .. } => self.check_fun(decl),
            NodePayload::Var { .. } | NodePayload::Let { .. } => {
                self.check_expr(decl);
            }
            NodePayload::Typedef { target, .. } => {
                let target = *target;
                self.check_type_ref(target);
            }
            NodePayload::Template { .. } | NodePayload::Import { .. } => {
                // Template definitions are checked lazily on first
                // instantiation (section 4.F.5); imports carry no body.
            }
            _ => {}
        }
    }

    /// Resolve and validate a type reference appearing in declaration
    /// position (a typedef's target, a field's annotation, ...),
    /// distinct from `check_expr` because a bare type name is not an
    /// expression.
    pub(crate) fn check_type_ref(&mut self, type_node: NodeId) {
        if self.arena.get(type_node).is_checked() {
            return;
        }
        if let NodePayload::TemplateInstance { .. } = &self.arena.get(type_node).payload {
            self.expand_template_instance(type_node);
            return;
        }
        self.arena.get(type_node).mark_checked();
        if self.arena.get(type_node).kind.is_type() {
            self.ensure_layout(type_node);
        }
    }
}

fn decl_name(node: &sema_ast::Node) -> Option<Symbol> {
    match &node.payload {
        NodePayload::Fun { name, .. } => name.clone(),
        NodePayload::Var { name, .. } | NodePayload::Let { name, .. } => Some(name.clone()),
        NodePayload::Typedef { name, .. } => Some(name.clone()),
        NodePayload::Template { name, .. } => Some(name.clone()),
        NodePayload::Struct { name, .. } => name.clone(),
        NodePayload::Alias { name, .. } => Some(name.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sema_ast::{Node, NodeFlags, NodeArena};
    use sema_common::{diagnostics::codes, CheckerOptions, Span};

    fn alloc_typedef(arena: &mut NodeArena, name: &str, target: NodeId) -> NodeId {
        arena.alloc(Node::new(
            sema_ast::NodeKind::Typedef,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Typedef { name: Symbol::intern(name), header: sema_ast::UserTypeHeader::default(), target },
        ))
    }

    /// A package's top-level names are all bound before any declaration's
    /// body is checked, so a function may call another function declared
    /// later in the same unit's source order (section 4.F.0).
    #[test]
    fn forward_reference_between_top_level_declarations_resolves() {
        let mut arena = NodeArena::new();
        let void_ty = arena.alloc(Node::new(sema_ast::NodeKind::Void, NodeFlags::CHECKED, Span::dummy(), NodePayload::Primitive(Default::default())));
        let later_name = Symbol::intern("later");
        let later_callee = arena.alloc(Node::new(
            sema_ast::NodeKind::Id,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Id { name: later_name.clone(), resolved: Default::default() },
        ));
        let call = arena.alloc(Node::new(
            sema_ast::NodeKind::Call,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Call { callee: later_callee, args: Vec::new() },
        ));
        let earlier = arena.alloc(Node::new(
            sema_ast::NodeKind::Fun,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Fun { name: Some(Symbol::intern("earlier")), header: Default::default(), params: Vec::new(), result: void_ty, body: Some(call) },
        ));
        let later = arena.alloc(Node::new(
            sema_ast::NodeKind::Fun,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Fun { name: Some(later_name), header: Default::default(), params: Vec::new(), result: void_ty, body: None },
        ));
        let unit = arena.alloc(Node::new(
            sema_ast::NodeKind::Unit,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Unit { decls: vec![earlier, later] },
        ));
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.check_unit(unit);
        assert!(!ctx.reported_any_error);
    }

    #[test]
    fn redeclaring_the_same_top_level_name_is_a_duplicate_definition() {
        let mut arena = NodeArena::new();
        let i32_ty = arena.alloc(Node::new(sema_ast::NodeKind::I32, NodeFlags::CHECKED, Span::dummy(), NodePayload::Primitive(Default::default())));
        let first = alloc_typedef(&mut arena, "Id", i32_ty);
        let second = alloc_typedef(&mut arena, "Id", i32_ty);
        let unit = arena.alloc(Node::new(
            sema_ast::NodeKind::Unit,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Unit { decls: vec![first, second] },
        ));
        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.check_unit(unit);
        assert!(ctx.diagnostics.iter().any(|d| d.code == codes::DUPLICATE_DEFINITION));
    }
}
