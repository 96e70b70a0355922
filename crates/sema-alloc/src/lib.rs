//! Concurrency-safe bump allocator (section 4.H).
//!
//! This is the one component that must stay safe for concurrent callers
//! even though type checking itself is single-threaded per package
//! (section 5): the allocator backs the AST arena shared across packages
//! checked concurrently by an embedder.
//!
//! The contract (section 4.H):
//!
//! - Allocation is an atomic compare-and-swap on a monotonic pointer
//!   advancing through the current slab.
//! - Exhaustion takes a mutex, maps a new slab (preferring an address
//!   contiguous with the prior slab, falling back to any), links it
//!   into the slab chain, and publishes the new pointer/end via release
//!   stores.
//! - Free of the tail allocation succeeds only if the current pointer is
//!   immediately past the allocation (a single CAS rollback); otherwise
//!   the memory is leaked until teardown.
//! - The allocator never unmaps individual slabs; dispose unmaps every
//!   slab in reverse link order.
//!
//! Virtual-memory sourcing (the `mmap`/`VirtualAlloc` syscall wrapper)
//! is a named non-goal; this crate is parameterised over a
//! [`SlabSource`] trait so a host can plug in a real VM-backed source.
//! [`VecSlabSource`] is a `Vec<u8>`-backed implementation for tests and
//! embedders that don't need raw pages.

mod slab;
mod source;

pub use slab::BumpAllocator;
pub use source::{Slab, SlabSource, VecSlabSource};

/// Small, explicit error enum (section 7's "internal/system errors" —
/// not `anyhow`, since embedders match on these).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    SizeExceedsSlab,
    SourceExhausted,
}

impl std::fmt::Display for AllocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SizeExceedsSlab => write!(f, "requested allocation size overflows a slab"),
            Self::SourceExhausted => write!(f, "the slab source failed to provide memory"),
        }
    }
}

impl std::error::Error for AllocError {}
