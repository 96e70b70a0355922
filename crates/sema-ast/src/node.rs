//! The node header and per-kind payloads (section 3).

use std::cell::Cell;
use std::sync::Arc;

use indexmap::IndexMap;
use sema_common::Span;

use crate::arena::NodeId;
use crate::flags::NodeFlags;
use crate::kind::NodeKind;
use crate::op::{BinaryOp, UnaryOp};
use crate::symbol::Symbol;

/// An interned `typeid` byte string (component B). Lives in `sema-ast`
/// rather than `sema-intern` because `Node`'s type-meta cache needs a
/// concrete handle type and `sema-intern` depends on `sema-ast`, not the
/// reverse; `sema-intern::Interner` is what actually knows how to build
/// and canonicalise one of these.
///
/// Equality and hashing are by pointer (section 3, "sharing implies
/// equality"): two handles are equal iff they were produced by the same
/// `intern` call, i.e. share the backing allocation.
#[derive(Clone)]
pub struct TypeIdHandle(pub Arc<[u8]>);

impl TypeIdHandle {
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for TypeIdHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for TypeIdHandle {}

impl std::hash::Hash for TypeIdHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const u8 as usize).hash(state);
    }
}

impl std::fmt::Debug for TypeIdHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "typeid[{}B]", self.0.len())
    }
}

/// Per-type cached metadata (section 3: "types additionally carry size,
/// alignment, and a lazily computed typeid pointer").
///
/// Wrapped in `Cell`/a plain `Option` behind `Cell` so the generic AST
/// transform (component E) can scrub the cache on a node it did not
/// itself clone-and-own outright, mirroring the checker's single
/// exclusive-writer discipline described in section 5.
#[derive(Debug, Default)]
pub struct TypeMeta {
    pub size: Cell<u32>,
    pub align: Cell<u32>,
    typeid: std::cell::RefCell<Option<TypeIdHandle>>,
}

impl TypeMeta {
    #[must_use]
    pub fn typeid(&self) -> Option<TypeIdHandle> {
        self.typeid.borrow().clone()
    }

    pub fn set_typeid(&self, handle: TypeIdHandle) {
        *self.typeid.borrow_mut() = Some(handle);
    }

    /// Scrub the cached typeid (section 4.E: cloning along an altered
    /// path invalidates the cache of every ancestor).
    pub fn scrub_typeid(&self) {
        *self.typeid.borrow_mut() = None;
    }
}

impl Clone for TypeMeta {
    fn clone(&self) -> Self {
        Self {
            size: Cell::new(self.size.get()),
            align: Cell::new(self.align.get()),
            typeid: std::cell::RefCell::new(self.typeid.borrow().clone()),
        }
    }
}

/// Shared header carried by every user type (section 3): a
/// parent-namespace pointer, and the template-parameter list (for a
/// definition) or argument list (for an instance) — "for a defined
/// template the list is parameters, for an instance the list is
/// concrete arguments" (section 4.D).
#[derive(Debug, Clone, Default)]
pub struct UserTypeHeader {
    pub parent_namespace: Option<NodeId>,
    pub template_list: Vec<NodeId>,
}

/// One parameter of a template definition (`TemplateParamDecl` payload).
#[derive(Debug, Clone)]
pub struct TemplateParam {
    pub name: Symbol,
    pub default: Option<NodeId>,
}

/// One field of a struct type.
#[derive(Debug, Clone)]
pub struct StructField {
    pub name: Symbol,
    pub type_node: NodeId,
    pub offset: Cell<u32>,
    pub flags: NodeFlags,
}

impl StructField {
    #[must_use]
    pub fn new(name: Symbol, type_node: NodeId, flags: NodeFlags) -> Self {
        Self {
            name,
            type_node,
            offset: Cell::new(0),
            flags,
        }
    }
}

/// The AST node header plus kind-specific payload (section 3).
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub flags: Cell<NodeFlags>,
    pub span: Span,
    pub use_count: Cell<u32>,
    /// The node's own resolved type, when it is an expression. Types
    /// (primitive/composite kinds) leave this `None` and carry their
    /// `size`/`align`/`typeid` in `NodePayload`'s embedded `TypeMeta`
    /// instead.
    pub resolved_type: Cell<Option<NodeId>>,
    pub payload: NodePayload,
}

impl Node {
    #[must_use]
    pub fn new(kind: NodeKind, flags: NodeFlags, span: Span, payload: NodePayload) -> Self {
        Self {
            kind,
            flags: Cell::new(flags),
            span,
            use_count: Cell::new(0),
            resolved_type: Cell::new(None),
            payload,
        }
    }

    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.flags.get().contains(NodeFlags::CHECKED)
    }

    pub fn mark_checked(&self) {
        self.flags.set(self.flags.get() | NodeFlags::CHECKED);
    }

    pub fn bump_use_count(&self) {
        self.use_count.set(self.use_count.get() + 1);
    }

    /// Per-kind cached type metadata, for kinds that carry one. `None`
    /// for expressions, statements, and the never-sized kinds
    /// (`Namespace`, `Placeholder`, `Unresolved`, `MutReference`,
    /// `MutSlice` share the pointee/element's metadata rather than
    /// their own).
    #[must_use]
    pub fn type_meta(&self) -> Option<&TypeMeta> {
        self.payload.type_meta()
    }

    #[must_use]
    pub fn user_type_header(&self) -> Option<&UserTypeHeader> {
        self.payload.user_type_header()
    }
}

/// Kind-specific payload (section 3's per-kind partition).
///
/// This is the structural counterpart reflection (component A) walks:
/// `sema-reflect`'s field table describes, for each `NodeKind`, which
/// `NodePayload` fields participate in identity and in what order,
/// using accessor functions rather than raw byte offsets (the
/// idiomatic-Rust equivalent of the source's direct struct-offset
/// reflection, since a tagged enum's variants are not layout-uniform).
#[derive(Debug)]
pub enum NodePayload {
    /// `void`, `bool`, `i8..i64`, `int`, `u8..u64`, `uint`, `f32`,
    /// `f64`, `unknown` — singleton-shaped, distinguished by `kind`.
    Primitive(TypeMeta),

    Pointer {
        meta: TypeMeta,
        header: UserTypeHeader,
        pointee: NodeId,
    },
    Reference {
        meta: TypeMeta,
        header: UserTypeHeader,
        referent: NodeId,
    },
    MutReference {
        meta: TypeMeta,
        referent: NodeId,
    },
    Optional {
        meta: TypeMeta,
        header: UserTypeHeader,
        inner: NodeId,
    },
    Array {
        meta: TypeMeta,
        header: UserTypeHeader,
        elem: NodeId,
        /// `None` for an unsized array type (e.g. used only as a
        /// literal's inferred shape before assignment).
        len: Option<u64>,
    },
    Slice {
        meta: TypeMeta,
        header: UserTypeHeader,
        elem: NodeId,
    },
    MutSlice {
        meta: TypeMeta,
        elem: NodeId,
    },
    FunType {
        meta: TypeMeta,
        header: UserTypeHeader,
        params: Vec<NodeId>,
        result: NodeId,
    },
    Struct {
        meta: TypeMeta,
        header: UserTypeHeader,
        name: Option<Symbol>,
        fields: Vec<StructField>,
    },
    Alias {
        meta: TypeMeta,
        header: UserTypeHeader,
        name: Symbol,
        target: NodeId,
    },
    Namespace {
        name: Option<Symbol>,
        exports: IndexMap<Symbol, NodeId>,
    },
    /// A name binding for a generic user type, e.g. the `Box` bound by
    /// `type Box<T> { v T }`. `header.template_list` holds the template
    /// *parameters* (`TemplateParamDecl` nodes); `definition` points at
    /// the underlying `Struct`/`Alias`/`FunType` node, which itself
    /// carries the `TEMPLATE` flag and the same parameter list.
    Template {
        header: UserTypeHeader,
        name: Symbol,
        definition: NodeId,
    },
    /// A use-site reference `Foo<Args>` as parsed, before checking.
    /// `header.template_list` holds the concrete argument nodes once
    /// evaluated (empty beforehand). Checking resolves the instance —
    /// a clone of `template`'s definition with `TEMPLATEI` set, cached
    /// by component D — and records it in `resolved`.
    TemplateInstance {
        header: UserTypeHeader,
        template: NodeId,
        arg_exprs: Vec<NodeId>,
        resolved: Cell<Option<NodeId>>,
    },
    /// An unresolved placeholder type, substituted by the generic AST
    /// transform during template expansion (section 4.E).
    Placeholder {
        name: Symbol,
    },
    Unresolved,

    // --- expressions ---
    Id {
        name: Symbol,
        resolved: Cell<Option<NodeId>>,
    },
    NamespaceExpr {
        path: Vec<Symbol>,
        resolved: Cell<Option<NodeId>>,
    },
    BoolLiteral {
        value: bool,
    },
    IntLiteral {
        text: String,
        value: i128,
    },
    FloatLiteral {
        text: String,
        value: f64,
    },
    ArrayLiteral {
        elements: Vec<NodeId>,
    },
    StringLiteral {
        value: String,
    },
    BinOp {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    PrefixUnary {
        op: UnaryOp,
        operand: NodeId,
    },
    PostfixUnary {
        op: UnaryOp,
        operand: NodeId,
    },
    Deref {
        operand: NodeId,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    Typecons {
        target: NodeId,
        args: Vec<NodeId>,
    },
    Member {
        receiver: NodeId,
        name: Symbol,
        resolved: Cell<Option<NodeId>>,
    },
    Subscript {
        receiver: NodeId,
        index: NodeId,
    },
    If {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    For {
        binding: Option<NodeId>,
        iterable: Option<NodeId>,
        cond: Option<NodeId>,
        step: Option<NodeId>,
        body: NodeId,
    },
    Return {
        value: Option<NodeId>,
    },
    Block {
        stmts: Vec<NodeId>,
    },
    Fun {
        name: Option<Symbol>,
        header: UserTypeHeader,
        params: Vec<NodeId>,
        result: NodeId,
        body: Option<NodeId>,
    },
    Field {
        name: Symbol,
        type_annotation: NodeId,
        default: Option<NodeId>,
    },
    Param {
        name: Symbol,
        type_annotation: NodeId,
        default: Option<NodeId>,
        mutable: bool,
    },
    Var {
        name: Symbol,
        type_annotation: Option<NodeId>,
        init: Option<NodeId>,
        mutable: bool,
    },
    Let {
        name: Symbol,
        type_annotation: Option<NodeId>,
        init: NodeId,
    },

    // --- statements ---
    Import {
        path: Vec<Symbol>,
        alias: Option<Symbol>,
    },
    Typedef {
        name: Symbol,
        header: UserTypeHeader,
        target: NodeId,
    },
    Unit {
        decls: Vec<NodeId>,
    },
    TemplateParamDecl(TemplateParam),
}

impl NodePayload {
    #[must_use]
    pub fn type_meta(&self) -> Option<&TypeMeta> {
        match self {
            Self::Primitive(m)
            | Self::Pointer { meta: m, .. }
            | Self::Reference { meta: m, .. }
            | Self::MutReference { meta: m, .. }
            | Self::Optional { meta: m, .. }
            | Self::Array { meta: m, .. }
            | Self::Slice { meta: m, .. }
            | Self::MutSlice { meta: m, .. }
            | Self::FunType { meta: m, .. }
            | Self::Struct { meta: m, .. }
            | Self::Alias { meta: m, .. } => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn user_type_header(&self) -> Option<&UserTypeHeader> {
        match self {
            Self::Pointer { header, .. }
            | Self::Reference { header, .. }
            | Self::Optional { header, .. }
            | Self::Array { header, .. }
            | Self::Slice { header, .. }
            | Self::FunType { header, .. }
            | Self::Struct { header, .. }
            | Self::Alias { header, .. }
            | Self::Fun { header, .. }
            | Self::Typedef { header, .. }
            | Self::Template { header, .. }
            | Self::TemplateInstance { header, .. } => Some(header),
            _ => None,
        }
    }

    #[must_use]
    pub fn user_type_header_mut(&mut self) -> Option<&mut UserTypeHeader> {
        match self {
            Self::Pointer { header, .. }
            | Self::Reference { header, .. }
            | Self::Optional { header, .. }
            | Self::Array { header, .. }
            | Self::Slice { header, .. }
            | Self::FunType { header, .. }
            | Self::Struct { header, .. }
            | Self::Alias { header, .. }
            | Self::Fun { header, .. }
            | Self::Typedef { header, .. }
            | Self::Template { header, .. }
            | Self::TemplateInstance { header, .. } => Some(header),
            _ => None,
        }
    }
}
