//! Flow-sensitive type checker (component F, section 4.F): name
//! resolution, expression and function checking, optional narrowing,
//! call-as-type construction, template expansion driving, and the
//! postanalyze pass (component G, section 4.F.6).
//!
//! This crate is organized with one `CheckerContext` struct
//! (`context.rs`) owning all threaded state, and every pass as its own
//! module adding an `impl<'a> CheckerContext<'a>` block rather than a
//! single monolithic file. `scope.rs` is the one
//! piece with a public type of its own (`ScopeStack`/`Narrow`) since
//! embedders inspecting narrow-info outside a check run need it; every
//! other module's checking entry points hang off `CheckerContext`.
//!
//! The single public entry point for a consumer driving a whole package
//! is [`CheckerContext::check_unit`], called once per translation unit
//! in parse order (section 5: "units of a package are checked in their
//! parse order").

mod construct;
mod context;
mod declare;
mod diag;
mod expr;
mod func;
mod layout;
mod narrow;
mod postanalyze;
mod scope;
mod template;

pub use context::CheckerContext;
pub use scope::{Narrow, ScopeStack};
