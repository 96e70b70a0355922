//! Ownership propagation (section 4.F.6): after the main checking pass,
//! every struct type seen during it is re-examined for fields whose own
//! "owning" status only became final after the struct itself was first
//! checked — a forward reference to another struct, or a template
//! instance's field.
//!
//! Defers this propagation to a post-pass queue rather than trying to
//! order struct checking topologically.

use sema_ast::{NodeFlags, NodeId, NodePayload};

use crate::context::CheckerContext;

impl<'a> CheckerContext<'a> {
    /// Queue `struct_id` for ownership re-examination, recording it as a
    /// dependent of any struct type its fields embed directly or
    /// through an alias chain, so a later change to that struct's
    /// `SUBOWNERS` bit re-queues `struct_id` too.
    pub(crate) fn enqueue_struct_for_postanalyze(&mut self, struct_id: NodeId) {
        let fields = match &self.arena.get(struct_id).payload {
            NodePayload::Struct { fields, .. } => fields.clone(),
            _ => return,
        };
        for field in &fields {
            if let Some(root) = self.owning_dependency_root(field.type_node) {
                self.struct_dependents.entry(root).or_default().push(struct_id);
            }
        }
        self.postanalyze_queue.push_back(struct_id);
    }

    /// The struct type, if any, whose own `SUBOWNERS` bit a change to
    /// `type_node`'s ownership would need to re-propagate through: a
    /// direct struct field, or the terminal struct at the end of an
    /// alias chain. A pointer field is unconditionally owning regardless
    /// of what it points to, so it carries no dependency edge.
    fn owning_dependency_root(&self, type_node: NodeId) -> Option<NodeId> {
        match &self.arena.get(type_node).payload {
            NodePayload::Struct { .. } => Some(type_node),
            NodePayload::Alias { target, .. } => self.owning_dependency_root(*target),
            _ => None,
        }
    }

    /// Drain the postanalyze queue, recomputing each struct's
    /// `SUBOWNERS` bit and re-queuing whatever depends on it whenever
    /// that bit newly becomes set (section 4.F.6: "additions to the
    /// queue during drain are honoured until the queue is empty").
    pub(crate) fn run_postanalyze(&mut self) {
        while let Some(struct_id) = self.postanalyze_queue.pop_front() {
            if self.recompute_subowners(struct_id) {
                if let Some(dependents) = self.struct_dependents.get(&struct_id).cloned() {
                    for dep in dependents {
                        self.postanalyze_queue.push_back(dep);
                    }
                }
            }
        }
    }

    /// `SUBOWNERS` only ever gets set, never cleared: ownership is
    /// discovered monotonically as more of the program is checked.
    fn recompute_subowners(&mut self, struct_id: NodeId) -> bool {
        let flags = self.arena.get(struct_id).flags.get();
        if flags.contains(NodeFlags::SUBOWNERS) {
            return false;
        }
        let fields = match &self.arena.get(struct_id).payload {
            NodePayload::Struct { fields, .. } => fields.clone(),
            _ => return false,
        };
        let owning = fields.iter().any(|f| self.type_is_owning(f.type_node));
        if owning {
            self.arena.get(struct_id).flags.set(flags | NodeFlags::SUBOWNERS);
            true
        } else {
            false
        }
    }

    fn type_is_owning(&self, type_node: NodeId) -> bool {
        let flags = self.arena.get(type_node).flags.get();
        if flags.contains(NodeFlags::DROP) || flags.contains(NodeFlags::SUBOWNERS) {
            return true;
        }
        match &self.arena.get(type_node).payload {
            NodePayload::Pointer { .. } => true,
            NodePayload::Alias { target, .. } => self.type_is_owning(*target),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sema_ast::{Node, NodeArena, StructField, Symbol, UserTypeHeader};
    use sema_common::{CheckerOptions, Span};

    fn alloc_struct(arena: &mut NodeArena, name: &str, fields: Vec<StructField>, flags: NodeFlags) -> NodeId {
        arena.alloc(Node::new(
            sema_ast::NodeKind::Struct,
            flags,
            Span::dummy(),
            NodePayload::Struct { meta: Default::default(), header: UserTypeHeader::default(), name: Some(Symbol::intern(name)), fields },
        ))
    }

    #[test]
    fn struct_with_drop_field_gains_subowners() {
        let mut arena = NodeArena::new();
        let owning = alloc_struct(&mut arena, "Owning", Vec::new(), NodeFlags::CHECKED | NodeFlags::DROP);
        let field = StructField::new(Symbol::intern("v"), owning, NodeFlags::empty());
        let outer = alloc_struct(&mut arena, "Outer", vec![field], NodeFlags::CHECKED);

        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.enqueue_struct_for_postanalyze(outer);
        ctx.run_postanalyze();

        assert!(ctx.arena.get(outer).flags.get().contains(NodeFlags::SUBOWNERS));
    }

    #[test]
    fn forward_referenced_struct_propagates_once_checked() {
        let mut arena = NodeArena::new();
        let inner = alloc_struct(&mut arena, "Inner", Vec::new(), NodeFlags::CHECKED);
        let field = StructField::new(Symbol::intern("v"), inner, NodeFlags::empty());
        let outer = alloc_struct(&mut arena, "Outer", vec![field], NodeFlags::CHECKED);

        let mut ctx = CheckerContext::new(&mut arena, CheckerOptions::isolated(), "test".to_string());
        ctx.enqueue_struct_for_postanalyze(outer);
        ctx.enqueue_struct_for_postanalyze(inner);
        ctx.run_postanalyze();
        assert!(!ctx.arena.get(outer).flags.get().contains(NodeFlags::SUBOWNERS));

        let flags = ctx.arena.get(inner).flags.get();
        ctx.arena.get(inner).flags.set(flags | NodeFlags::DROP);
        ctx.postanalyze_queue.push_back(inner);
        ctx.run_postanalyze();

        assert!(ctx.arena.get(outer).flags.get().contains(NodeFlags::SUBOWNERS));
    }
}
