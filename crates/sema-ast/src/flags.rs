use bitflags::bitflags;

bitflags! {
    /// Per-node flags word (section 3). 16 bits, matching the source's
    /// packed flags field.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u16 {
        /// Node has been visited by the checker; gates re-checking.
        const CHECKED    = 1 << 0;
        /// Placeholder / unresolved-type marker.
        const UNKNOWN    = 1 << 1;
        /// Node appears in value (rvalue) position.
        const RVALUE     = 1 << 2;
        /// An optional's type has been refined by a condition on this path.
        const NARROWED   = 1 << 3;
        /// User type is a template definition (non-empty parameter list,
        /// parameters not yet substituted).
        const TEMPLATE   = 1 << 4;
        /// User type is a template instance (parameters substituted with
        /// concrete arguments).
        const TEMPLATEI  = 1 << 5;
        /// Struct transitively contains an owning field.
        const SUBOWNERS  = 1 << 6;
        /// Type has a user-defined `drop` function.
        const DROP       = 1 << 7;
        /// Declaration is `pub`.
        const VIS_PUB    = 1 << 8;
        /// Declaration is package-visible (narrower than `pub`).
        const VIS_PKG    = 1 << 9;
        /// Block unconditionally returns (all control-flow paths exit).
        const EXIT       = 1 << 10;
        /// Node is compile-time evaluable.
        const CONST      = 1 << 11;
        /// Unit-level namespace marker (this unit contributes to the
        /// package root namespace).
        const PKGNS      = 1 << 12;
    }
}

impl NodeFlags {
    /// The subset of flags that participate in typeid encoding
    /// (section 4.B step 3). Bookkeeping flags set by the checker after
    /// the fact (`CHECKED`, `NARROWED`, `SUBOWNERS`, `EXIT`) and
    /// visibility/value-position flags (`VIS_PUB`, `VIS_PKG`, `RVALUE`,
    /// `PKGNS`) do not change a type's structural meaning and are
    /// excluded; whether a type is a template or a concrete instance,
    /// and whether it is compile-time-const, does.
    pub const TYPEID_MASK: NodeFlags = NodeFlags::TEMPLATE
        .union(NodeFlags::TEMPLATEI)
        .union(NodeFlags::CONST)
        .union(NodeFlags::DROP);

    #[must_use]
    pub const fn typeid_relevant(self) -> NodeFlags {
        self.intersection(Self::TYPEID_MASK)
    }
}
