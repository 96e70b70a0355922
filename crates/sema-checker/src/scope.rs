//! Component H: namespace/scope machinery — a lexical scope stack plus a
//! parallel narrow-info scope stack that pop together (section 4.H,
//! design note "Scope chains").
//!
//! Scope frames use a flat `FxHashMap` per frame rather than per-frame
//! allocations of a more elaborate structure. The narrow-info frame is
//! kept as its own parallel stack rather than folded into the lexical
//! frame, since its lifetime is strictly scope-bound (invariant:
//! "narrow-info entries are valid only within the lexical scope that
//! installed them; they never outlive it").

use rustc_hash::FxHashMap;
use sema_ast::{NodeId, Symbol};

/// Availability of an optional's value at a storage node, within the
/// current condition or scope (section 4.F.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Narrow {
    Maybe,
    Yes,
    No,
}

#[derive(Default)]
struct LexicalFrame {
    names: FxHashMap<Symbol, NodeId>,
}

#[derive(Default)]
struct NarrowFrame {
    info: FxHashMap<NodeId, Narrow>,
}

/// The parallel scope stacks threaded through the checker (section 4.F's
/// state list: "a stack of lexical scopes" and "a parallel stack of
/// narrow-info scopes").
#[derive(Default)]
pub struct ScopeStack {
    lexical: Vec<LexicalFrame>,
    narrow: Vec<NarrowFrame>,
}

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.lexical.push(LexicalFrame::default());
        self.narrow.push(NarrowFrame::default());
    }

    pub fn pop(&mut self) {
        self.lexical.pop();
        self.narrow.pop();
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.lexical.len()
    }

    /// Declare `name -> node` in the innermost frame. Returns `true` if
    /// this is a fresh binding; `false` if `name` was already bound in
    /// the *same* frame, in which case the existing binding is left in
    /// place (section 4.F.0: "the first declaration wins for subsequent
    /// lookups").
    ///
    /// # Panics
    /// Panics if no scope is currently pushed.
    pub fn declare(&mut self, name: Symbol, node: NodeId) -> bool {
        let frame = self.lexical.last_mut().expect("declare called outside any scope");
        if frame.names.contains_key(&name) {
            false
        } else {
            frame.names.insert(name, node);
            true
        }
    }

    /// Resolve `name` searching from the innermost frame outward.
    #[must_use]
    pub fn lookup(&self, name: &Symbol) -> Option<NodeId> {
        self.lexical.iter().rev().find_map(|f| f.names.get(name).copied())
    }

    /// All names visible from the innermost frame outward, for "did you
    /// mean" suggestion (section 4.G).
    pub fn visible_names(&self) -> impl Iterator<Item = &Symbol> {
        self.lexical.iter().flat_map(|f| f.names.keys())
    }

    /// Record `storage`'s availability in the innermost narrow-info
    /// frame.
    ///
    /// # Panics
    /// Panics if no scope is currently pushed.
    pub fn set_narrow(&mut self, storage: NodeId, state: Narrow) {
        let frame = self.narrow.last_mut().expect("set_narrow called outside any scope");
        frame.info.insert(storage, state);
    }

    /// `storage`'s availability, searching from the innermost frame
    /// outward; `Maybe` if no frame has narrowed it.
    #[must_use]
    pub fn narrow_of(&self, storage: NodeId) -> Narrow {
        self.narrow
            .iter()
            .rev()
            .find_map(|f| f.info.get(&storage).copied())
            .unwrap_or(Narrow::Maybe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sema_ast::{Node, NodeFlags, NodeKind, NodePayload};
    use sema_common::Span;

    fn dummy_node_id(n: u32) -> NodeId {
        let mut arena = sema_ast::NodeArena::new();
        let mut id = arena.alloc(Node::new(NodeKind::Unresolved, NodeFlags::empty(), Span::dummy(), NodePayload::Unresolved));
        for _ in 1..=n {
            id = arena.alloc(Node::new(NodeKind::Unresolved, NodeFlags::empty(), Span::dummy(), NodePayload::Unresolved));
        }
        id
    }

    #[test]
    fn declare_then_lookup_finds_innermost() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        let outer = dummy_node_id(1);
        assert!(scopes.declare(Symbol::intern("x"), outer));
        scopes.push();
        let inner = dummy_node_id(2);
        assert!(scopes.declare(Symbol::intern("x"), inner));
        assert_eq!(scopes.lookup(&Symbol::intern("x")), Some(inner));
        scopes.pop();
        assert_eq!(scopes.lookup(&Symbol::intern("x")), Some(outer));
    }

    #[test]
    fn duplicate_in_same_frame_keeps_first() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        let first = dummy_node_id(1);
        let second = dummy_node_id(2);
        assert!(scopes.declare(Symbol::intern("dup"), first));
        assert!(!scopes.declare(Symbol::intern("dup"), second));
        assert_eq!(scopes.lookup(&Symbol::intern("dup")), Some(first));
    }

    #[test]
    fn narrow_info_does_not_outlive_its_scope() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        let storage = dummy_node_id(1);
        scopes.push();
        scopes.set_narrow(storage, Narrow::Yes);
        assert_eq!(scopes.narrow_of(storage), Narrow::Yes);
        scopes.pop();
        assert_eq!(scopes.narrow_of(storage), Narrow::Maybe);
    }
}
