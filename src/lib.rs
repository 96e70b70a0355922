//! Thin embedder-facing facade over the semantic-analysis workspace
//! (section 1: a structural type-identity engine, a template expansion
//! engine, a flow-sensitive type checker, and the AST reflection table
//! that drives both).
//!
//! This crate owns no algorithm of its own — every component lives in
//! its dedicated crate (`sema-reflect`, `sema-ast`, `sema-alloc`,
//! `sema-intern`, `sema-template`, `sema-checker`) and is re-exported
//! here for a single import path. The one piece of behavior it adds is
//! [`check_package`], a convenience driver over `sema-checker`'s
//! per-unit `check_unit` entry point that threads units through in
//! parse order (section 5) and collects their diagnostics — CLI/driver
//! glue beyond that (argument parsing, source loading, output
//! formatting) is an explicit non-goal (section 1).

pub use sema_alloc::{AllocError, BumpAllocator, Slab, SlabSource, VecSlabSource};
pub use sema_ast::{
    BinaryOp, Node, NodeArena, NodeFlags, NodeId, NodeKind, NodePayload, StructField,
    Symbol, TemplateParam, TypeIdHandle, TypeMeta, UnaryOp, UserTypeHeader,
};
pub use sema_checker::{CheckerContext, Narrow, ScopeStack};
pub use sema_common::diagnostics::{Diagnostic, DiagnosticCategory};
pub use sema_common::{CheckerOptions, Span};
pub use sema_intern::{Interner, GLOBAL};
pub use sema_reflect::{reflect_fields, verify_reflection_tables, KindTag};
pub use sema_template::{instance_key, transform_tree, TemplateCache};

/// The outcome of checking one package (section 5: "package-scoped
/// declarations are looked up lazily, so forward references within a
/// package are resolved correctly regardless of declaration order").
#[derive(Debug, Default)]
pub struct PackageCheckResult {
    /// All diagnostics collected across every unit, in unit order.
    pub diagnostics: Vec<Diagnostic>,
    /// The package's `main` function, if one was declared and validated
    /// (section 4.F.4), keyed by the unit it was found in.
    pub main_fun: Option<NodeId>,
}

impl PackageCheckResult {
    /// `true` iff any unit reported at least one error-category
    /// diagnostic.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.category == DiagnosticCategory::Error)
    }
}

/// Type-check every unit of one package, in the order given (section 5:
/// "within a unit, checking follows AST source order; across units of a
/// package, units are checked in their parse order").
///
/// `units` pairs each unit's root `NodeId` with the source file name its
/// diagnostics should be attributed to. A single [`CheckerContext`] is
/// *not* reused across units — each unit gets its own scope stack and
/// postanalyze queue — but the interning and template-instance caches an
/// embedder constructs around the shared `NodeArena` naturally persist
/// declarations visible across units via the arena itself, matching the
/// package-scoped lazy lookup contract of section 5. An embedder that
/// needs forward references to resolve across the units of one package
/// should register every unit's top-level declarations into a shared
/// scope before calling this, or drive `CheckerContext::check_unit`
/// directly for finer control.
///
/// # Errors
/// Returns an error only if `units` is empty; per-unit type errors are
/// reported as [`Diagnostic`]s in the returned [`PackageCheckResult`],
/// not as a `Result` failure — diagnostics are the checker's primary
/// output channel.
#[tracing::instrument(skip(arena, units))]
pub fn check_package(
    arena: &mut NodeArena,
    options: &CheckerOptions,
    units: &[(NodeId, &str)],
) -> anyhow::Result<PackageCheckResult> {
    anyhow::ensure!(!units.is_empty(), "check_package called with no units");

    let mut result = PackageCheckResult::default();
    for &(unit, file) in units {
        let mut ctx = CheckerContext::new(arena, options.clone(), file.to_string());
        ctx.check_unit(unit);
        if result.main_fun.is_none() {
            result.main_fun = ctx.main_fun;
        }
        result.diagnostics.extend(ctx.diagnostics);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_package_rejects_empty_unit_list() {
        let mut arena = NodeArena::new();
        let options = CheckerOptions::isolated();
        let err = check_package(&mut arena, &options, &[]).unwrap_err();
        assert!(err.to_string().contains("no units"));
    }

    #[test]
    fn check_package_accepts_a_trivial_unit() {
        let mut arena = NodeArena::new();
        let unit = arena.alloc(Node::new(
            NodeKind::Unit,
            NodeFlags::empty(),
            Span::dummy(),
            NodePayload::Unit { decls: Vec::new() },
        ));
        let options = CheckerOptions::isolated();
        let result = check_package(&mut arena, &options, &[(unit, "main.sema")]).unwrap();
        assert!(!result.has_errors());
        assert!(result.main_fun.is_none());
    }
}
