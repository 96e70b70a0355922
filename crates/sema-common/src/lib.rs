//! Foundational types shared across the semantic-analysis crates.
//!
//! This crate provides the low-level building blocks every other crate in
//! the workspace depends on: source spans, line/column positions,
//! diagnostics, centralized recursion limits, and checker configuration.
//! Keeping these here avoids circular dependencies between `sema-reflect`,
//! `sema-intern`, `sema-template` and `sema-checker`.

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::{ByteSpan, Span, SpanBuilder, Spanned};

// Position/Range types for line/column source locations
pub mod position;
pub use position::{LineMap, Location, Position, Range, SourceLocation};

// Centralized recursion and capacity limits
pub mod limits;

// Numeric literal parsing helpers
pub mod numeric;

// Diagnostics: categories, codes, message formatting
pub mod diagnostics;

// Checker configuration
pub mod checker_options;
pub use checker_options::CheckerOptions;
