//! The pluggable slab-sourcing boundary (section 4.H: "the bump
//! allocator used for AST nodes" and its virtual-memory primitives are
//! named non-goals — only the allocator's own CAS/mutex discipline is
//! in scope).

/// A contiguous region of raw memory handed out by a [`SlabSource`].
/// Ownership is conceptual: the `BumpAllocator` never frees a slab
/// itself (section 4.H, "the allocator never unmaps individual
/// slabs"); only `SlabSource::unmap` at teardown does.
pub struct Slab {
    pub ptr: *mut u8,
    pub len: usize,
}

/// Safety: a `Slab`'s raw pointer is only ever read/written through the
/// allocator's own atomic/mutex discipline; the source that produced it
/// is responsible for the memory staying valid until `unmap`.
unsafe impl Send for Slab {}
unsafe impl Sync for Slab {}

/// Sources virtual-memory pages on demand. The real implementation (an
/// `mmap`/`VirtualAlloc` wrapper) is an explicit non-goal of this
/// subsystem; this trait is the seam a host plugs one into.
pub trait SlabSource: Send + Sync {
    /// Request a slab of at least `min_len` bytes. `prefer_after`, when
    /// given, is the end address of the previous slab — the source
    /// should try to place the new slab contiguous with it (section
    /// 4.H, "preferring an address contiguous with the prior slab,
    /// falling back to any") to let candidate allocators coalesce
    /// adjacent slabs, though nothing in this crate depends on that
    /// actually happening.
    fn map(&self, min_len: usize, prefer_after: Option<*mut u8>) -> Option<Slab>;

    /// Unmap a slab previously returned by `map`. Called only during
    /// `BumpAllocator::dispose`, in reverse link order.
    ///
    /// # Safety
    /// `slab` must be exactly as returned by a prior `map` call on this
    /// same source, not already unmapped.
    unsafe fn unmap(&self, slab: Slab);
}

/// A `Vec<u8>`-backed [`SlabSource`] for tests and embedders that don't
/// need real OS pages. Never attempts contiguous placement (a `Vec`'s
/// address is not something we control) and leaks its backing buffer on
/// `unmap` rather than calling into `libc` — acceptable for a test
/// double, not for production VM sourcing.
#[derive(Default)]
pub struct VecSlabSource;

impl VecSlabSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SlabSource for VecSlabSource {
    fn map(&self, min_len: usize, _prefer_after: Option<*mut u8>) -> Option<Slab> {
        let mut buf = vec![0u8; min_len].into_boxed_slice();
        let ptr = buf.as_mut_ptr();
        let len = buf.len();
        std::mem::forget(buf);
        Some(Slab { ptr, len })
    }

    unsafe fn unmap(&self, slab: Slab) {
        unsafe {
            drop(Box::from_raw(std::slice::from_raw_parts_mut(
                slab.ptr, slab.len,
            )));
        }
    }
}
