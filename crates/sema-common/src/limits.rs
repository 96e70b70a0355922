//! Centralized recursion and capacity limits for the semantic-analysis
//! passes.
//!
//! Every recursive algorithm in the checker, the template expander, and
//! the generic AST transform is guarded by one of these limits rather than
//! an ad-hoc magic number at the call site. Centralizing them documents
//! the rationale for each bound and keeps tuning them in one place.

/// Maximum depth for expression type checking.
///
/// The checker resolves an expression's type by recursing into its
/// subexpressions; a deeply nested chain of binary operators, calls, or
/// member accesses could otherwise overflow the stack. At this depth the
/// checker bails out with a diagnostic instead of recursing further.
pub const MAX_EXPR_CHECK_DEPTH: u32 = 500;

/// Maximum nesting depth for template instantiation.
///
/// The instance cache already breaks direct self-reference (the instance
/// is inserted before its body is checked), but a chain of distinct
/// templates instantiating each other in turn needs an independent depth
/// guard. Exceeding this depth is reported as excessively deep
/// instantiation rather than allowed to recurse without bound.
pub const MAX_INSTANTIATION_DEPTH: u32 = 64;

/// Maximum depth for general checker recursion guards (type reference
/// resolution, member lookup through nested aliases, and similar).
pub const MAX_CHECKER_RECURSION_DEPTH: u32 = 50;

/// Maximum depth for alias resolution chains (`type A = B; type B = C;
/// ...`). Aliases are checked for cycles eagerly during resolution; this
/// bound exists as a backstop against pathologically long (but acyclic)
/// chains.
pub const MAX_ALIAS_RESOLUTION_DEPTH: u32 = 128;

/// Maximum depth for qualified namespace path resolution (`a::b::c::d`).
pub const MAX_QUALIFIED_NAME_DEPTH: u32 = 128;

/// Maximum recursion depth for the generic AST transform (component E)
/// when it descends into `node` and `node-array` fields.
pub const MAX_AST_TRANSFORM_DEPTH: u32 = 500;

/// Maximum edit distance considered by the "did you mean" fuzzy name
/// suggestion (section 4.G). Names further than this are not suggested.
pub const MAX_SUGGESTION_EDIT_DISTANCE: u32 = 2;

/// Initial capacity drawn for a freshly created hashtable-backed interner,
/// expressed as a power of two.
pub const DEFAULT_HASHTABLE_CAPACITY: usize = 16;

/// Target pointer size in bytes, for the `this`-receiver pass-by-value
/// rule (section 4.F.4): an immutable receiver whose alignment is at most
/// one pointer and whose size is at most two pointers is passed by value
/// instead of by reference.
pub const TARGET_POINTER_SIZE: u32 = 8;
