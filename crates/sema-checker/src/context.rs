//! Holds the state threaded through every checking pass, separated from
//! the pass logic itself (sections 4.F/4.H).
//!
//! One struct owns scopes, caches, and diagnostics, with the actual
//! checking behavior implemented as `impl` blocks spread across sibling
//! modules. This module only owns the struct, its constructor, and
//! small state-management helpers; `diag.rs`,
//! `declare.rs`, `expr.rs`, `narrow.rs`, `construct.rs`, `func.rs`,
//! `template.rs`, and `postanalyze.rs` each add their own `impl<'a>
//! CheckerContext<'a>` block.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use sema_ast::{NodeArena, NodeId, NodeKind};
use sema_common::diagnostics::Diagnostic;
use sema_common::CheckerOptions;
use sema_template::{InstancesByTemplate, TemplateCache};

use crate::scope::ScopeStack;

/// All state the checker needs for one unit (section 5: "single-threaded
/// per package" — one `CheckerContext` never crosses a thread boundary).
pub struct CheckerContext<'a> {
    pub arena: &'a mut NodeArena,
    pub options: CheckerOptions,
    pub file: String,

    pub diagnostics: Vec<Diagnostic>,
    /// Set once any error (not warning) has been reported. Error
    /// recovery consults this to decide whether a *further* error about
    /// the same expression would just be noise cascading from the first
    /// (section 7).
    pub reported_any_error: bool,

    pub(crate) scopes: ScopeStack,
    /// What each condition expression proved, keyed by the condition
    /// node itself, so `apply_narrowing` can consume the facts
    /// `check_condition` already derived instead of re-walking the AST
    /// (section 4.F.2).
    pub(crate) condition_info: FxHashMap<NodeId, crate::narrow::ConditionInfo>,
    /// Expression type-checking recursion depth (section 4.F.1's depth
    /// guard, `options.max_expr_check_depth`).
    pub(crate) expr_depth: u32,
    /// Nested template-instantiation depth (section 4.F.5's depth guard,
    /// `options.max_instantiation_depth`). Distinct from `expr_depth`:
    /// instantiating `Box<Box<Box<T>>>` is one expression but three
    /// nested instantiations.
    pub(crate) template_nest: u32,
    /// Struct-layout recursion depth (section 4.F's "compute struct
    /// layout"; `options.max_checker_recursion_depth` bounds a
    /// self-referential-by-value struct chain rather than overflowing
    /// the stack).
    pub(crate) layout_depth: u32,
    /// Result type of the innermost enclosing function, pushed so a
    /// `return`/trailing-block-rvalue check has its target type without
    /// needing to walk back up to the `Fun` node (section 4.F.4).
    pub(crate) result_type_stack: Vec<NodeId>,
    /// The innermost enclosing `Fun` node, for `this`-receiver lookups
    /// and `drop`/`main` signature checks.
    pub(crate) enclosing_function: Vec<NodeId>,
    /// Node currently being checked, for `error_at_current_node`'s
    /// fallback when no explicit node is available at the error site.
    pub(crate) node_stack: Vec<NodeId>,

    /// The package's `main` function, if one has been declared and
    /// validated (section 4.F.4).
    pub main_fun: Option<NodeId>,

    /// One arena slot per primitive `NodeKind`, allocated lazily the
    /// first time a pass needs to hand back a primitive type node
    /// (e.g. a comparison's `bool` result, a promoted literal's
    /// default type). Memoized so repeated uses share one node id,
    /// matching the "pointer-identity implies type identity" invariant.
    pub(crate) primitives: FxHashMap<NodeKind, NodeId>,
    /// A synthesized `FunType` node per `Fun` declaration, built the
    /// first time the function's own type is needed (e.g. as the type
    /// of an `Id` expression naming it).
    pub(crate) fun_types: FxHashMap<NodeId, NodeId>,

    /// Template instantiation cache (component D) and the reverse index
    /// `postanalyze` walks to revisit every live instantiation of a
    /// template newly found to own a resource (section 4.F.6).
    pub(crate) template_cache: TemplateCache,
    pub(crate) instances_by_template: InstancesByTemplate,
    pub(crate) postanalyze_queue: VecDeque<NodeId>,
    /// Reverse index from a struct type to every struct queued for
    /// postanalyze whose ownership depends on it, so recomputing one
    /// struct's `SUBOWNERS` bit can re-queue just the structs that
    /// embed it (section 4.F.6).
    pub(crate) struct_dependents: FxHashMap<NodeId, Vec<NodeId>>,
}

impl<'a> CheckerContext<'a> {
    #[must_use]
    pub fn new(arena: &'a mut NodeArena, options: CheckerOptions, file: String) -> Self {
        Self {
            arena,
            options,
            file,
            diagnostics: Vec::new(),
            reported_any_error: false,
            scopes: ScopeStack::new(),
            condition_info: FxHashMap::default(),
            expr_depth: 0,
            template_nest: 0,
            layout_depth: 0,
            result_type_stack: Vec::new(),
            enclosing_function: Vec::new(),
            node_stack: Vec::new(),
            main_fun: None,
            primitives: FxHashMap::default(),
            fun_types: FxHashMap::default(),
            template_cache: TemplateCache::new(),
            instances_by_template: InstancesByTemplate::default(),
            postanalyze_queue: VecDeque::new(),
            struct_dependents: FxHashMap::default(),
        }
    }

    /// The arena node for primitive type `kind`, allocating it the first
    /// time it is requested and reusing it on every later call.
    ///
    /// # Panics
    /// Panics if `kind` is not a primitive type kind.
    pub fn primitive_type(&mut self, kind: NodeKind) -> NodeId {
        assert!(kind.is_primitive_type(), "{kind:?} is not a primitive type");
        if let Some(&id) = self.primitives.get(&kind) {
            return id;
        }
        let id = self.arena.alloc(sema_ast::Node::new(
            kind,
            sema_ast::NodeFlags::CHECKED,
            sema_common::Span::dummy(),
            sema_ast::NodePayload::Primitive(sema_ast::TypeMeta::default()),
        ));
        self.primitives.insert(kind, id);
        self.ensure_layout(id);
        id
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push();
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub(crate) fn enter_node(&mut self, id: NodeId) {
        self.node_stack.push(id);
    }

    pub(crate) fn exit_node(&mut self) {
        self.node_stack.pop();
    }

    #[must_use]
    pub(crate) fn current_result_type(&self) -> Option<NodeId> {
        self.result_type_stack.last().copied()
    }

    #[must_use]
    pub(crate) fn enclosing_function(&self) -> Option<NodeId> {
        self.enclosing_function.last().copied()
    }
}
