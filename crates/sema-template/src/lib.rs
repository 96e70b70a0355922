//! Template expansion's two supporting pieces (sections 4.D and 4.E):
//! the instance cache, and the generic AST transform it's built on top
//! of. `sema-checker` drives both from `template.rs` — this crate only
//! owns the mechanism, not the policy of *when* to instantiate or what
//! counts as a valid argument, which are checker concerns.

mod cache;
mod transform;

pub use cache::{instance_key, InstancesByTemplate, TemplateCache};
pub use transform::transform_tree;
