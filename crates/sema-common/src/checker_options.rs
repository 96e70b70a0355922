//! Checker configuration.
//!
//! Lives in `sema-common` so that `sema-intern`, `sema-template`, and
//! `sema-checker` can all reference `CheckerOptions` without a circular
//! dependency between them.

use crate::limits;
use serde::{Deserialize, Serialize};

/// Configuration accepted by the type checker for a single package.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerOptions {
    /// Recursion bound for expression checking (section 4.F.1).
    pub max_expr_check_depth: u32,
    /// Recursion bound for template instantiation nesting (section 4.F.5).
    pub max_instantiation_depth: u32,
    /// Recursion bound for alias resolution chains.
    pub max_alias_resolution_depth: u32,
    /// Recursion bound for struct layout computation (section 4.F: a
    /// struct embedding itself by value rather than through a pointer
    /// cannot terminate and is bailed out of rather than overflowing the
    /// stack).
    pub max_checker_recursion_depth: u32,
    /// Maximum Levenshtein distance considered for "did you mean"
    /// suggestions on an unresolved identifier (section 4.G).
    pub max_suggestion_edit_distance: u32,
    /// Run the postanalyze pass (section 4.F.6) after the main checking
    /// pass. Disabling this is useful for isolating the main pass in
    /// tests; production checking always enables it.
    pub run_postanalyze: bool,
    /// Emit warnings in addition to errors (unused locals, unused owning
    /// results, unused if-as-rvalue — section 7).
    pub emit_warnings: bool,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            max_expr_check_depth: limits::MAX_EXPR_CHECK_DEPTH,
            max_instantiation_depth: limits::MAX_INSTANTIATION_DEPTH,
            max_alias_resolution_depth: limits::MAX_ALIAS_RESOLUTION_DEPTH,
            max_checker_recursion_depth: limits::MAX_CHECKER_RECURSION_DEPTH,
            max_suggestion_edit_distance: limits::MAX_SUGGESTION_EDIT_DISTANCE,
            run_postanalyze: true,
            emit_warnings: true,
        }
    }
}

impl CheckerOptions {
    /// Options suitable for unit tests of a single pass in isolation:
    /// no postanalyze, no warnings, so test expectations only have to
    /// account for the pass under test.
    #[must_use]
    pub fn isolated() -> Self {
        Self {
            run_postanalyze: false,
            emit_warnings: false,
            ..Self::default()
        }
    }
}
