//! The bump allocator itself (section 4.H).

use std::sync::Mutex;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::AllocError;
use crate::source::{Slab, SlabSource};

/// Default size of a freshly mapped slab. Allocations larger than this
/// still succeed: `grow` maps a slab sized to fit the request.
const DEFAULT_SLAB_SIZE: usize = 64 * 1024;

struct SlabRecord {
    slab: Slab,
}

/// A thread-safe bump allocator (section 4.H).
///
/// `cur`/`end` are the live allocation cursor and the end of the
/// current slab; both are published with release stores on growth and
/// read with acquire loads on allocation, matching section 5's ordering
/// note ("allocation observes the latest published slab via acquire
/// load; growth publishes via release store").
pub struct BumpAllocator {
    cur: AtomicPtr<u8>,
    end: AtomicPtr<u8>,
    source: Box<dyn SlabSource>,
    /// Slab chain plus the growth mutex (section 4.H: "exhaustion takes
    /// a mutex ... and links it into the slab chain"). Growth holds
    /// this for the whole re-check-then-map-then-publish sequence, so
    /// two racing allocators never map two new slabs for the same
    /// exhaustion.
    slabs: Mutex<Vec<SlabRecord>>,
}

impl BumpAllocator {
    #[must_use]
    pub fn new(source: impl SlabSource + 'static) -> Self {
        Self {
            cur: AtomicPtr::new(std::ptr::null_mut()),
            end: AtomicPtr::new(std::ptr::null_mut()),
            source: Box::new(source),
            slabs: Mutex::new(Vec::new()),
        }
    }

    /// Allocate `size` bytes aligned to `align` (a power of two).
    pub fn alloc(&self, size: usize, align: usize) -> Result<*mut u8, AllocError> {
        debug_assert!(align.is_power_of_two());
        loop {
            let cur = self.cur.load(Ordering::Acquire);
            let end = self.end.load(Ordering::Acquire);

            if !cur.is_null() {
                let aligned = align_up(cur, align);
                // Pointer arithmetic stays in usize space so we never
                // construct an out-of-bounds pointer before the fits
                // check below.
                let aligned_addr = aligned as usize;
                let end_addr = end as usize;
                if let Some(new_addr) = aligned_addr.checked_add(size) {
                    if new_addr <= end_addr {
                        let new_cur = new_addr as *mut u8;
                        match self.cur.compare_exchange_weak(
                            cur,
                            new_cur,
                            Ordering::AcqRel,
                            Ordering::Acquire,
                        ) {
                            Ok(_) => return Ok(aligned),
                            Err(_) => continue,
                        }
                    }
                }
            }

            self.grow(size, align)?;
        }
    }

    fn grow(&self, size: usize, align: usize) -> Result<(), AllocError> {
        let mut slabs = self.slabs.lock().unwrap();

        // Re-check: another thread may have grown while we waited for
        // the lock.
        let cur = self.cur.load(Ordering::Acquire);
        let end = self.end.load(Ordering::Acquire);
        if !cur.is_null() {
            let aligned_addr = align_up(cur, align) as usize;
            if aligned_addr.checked_add(size).is_some_and(|n| n <= end as usize) {
                return Ok(());
            }
        }

        let needed = size.checked_add(align).ok_or(AllocError::SizeExceedsSlab)?;
        let slab_len = needed.max(DEFAULT_SLAB_SIZE);
        let prefer_after = if end.is_null() { None } else { Some(end) };
        let slab = self
            .source
            .map(slab_len, prefer_after)
            .ok_or(AllocError::SourceExhausted)?;
        if slab.len < size {
            return Err(AllocError::SizeExceedsSlab);
        }

        let new_cur = slab.ptr;
        // Safety: `slab.len` bytes starting at `slab.ptr` are valid per
        // the `SlabSource` contract.
        let new_end = unsafe { slab.ptr.add(slab.len) };
        slabs.push(SlabRecord { slab });

        self.end.store(new_end, Ordering::Release);
        self.cur.store(new_cur, Ordering::Release);
        tracing::trace!(slab_len, "sema_alloc: grew bump allocator by a new slab");
        Ok(())
    }

    /// Free the tail allocation `[ptr, ptr+size)`. Succeeds only if
    /// `cur` is still immediately past it (section 4.H: "a single CAS
    /// rollback"); otherwise the memory is leaked until `dispose`.
    pub fn free_tail(&self, ptr: *mut u8, size: usize) -> bool {
        // Safety: pointer arithmetic only, never dereferenced.
        let expected_cur = unsafe { ptr.add(size) };
        self.cur
            .compare_exchange(expected_cur, ptr, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Unmap every slab, in reverse link order (section 4.H: "dispose
    /// unmaps every slab in reverse link order").
    pub fn dispose(self) {
        let mut slabs = self.slabs.into_inner().unwrap();
        while let Some(record) = slabs.pop() {
            // Safety: each slab was obtained from `self.source` and has
            // not been unmapped before (we only pop once, at teardown).
            unsafe {
                self.source.unmap(record.slab);
            }
        }
    }
}

fn align_up(ptr: *mut u8, align: usize) -> *mut u8 {
    let addr = ptr as usize;
    let aligned = (addr + align - 1) & !(align - 1);
    aligned as *mut u8
}
