//! The allocator capability a table is constructed with.
//!
//! Tables never allocate through ambient global state directly: every
//! control/entry array is obtained from, and returned to, the [`Allocator`]
//! the table was built with. Any `allocator-api2` allocator can be supplied;
//! [`Global`] forwards to the global allocator.

use core::alloc::Layout;
use core::ptr::NonNull;

pub use allocator_api2::alloc::AllocError;
pub use allocator_api2::alloc::Allocator;
pub use allocator_api2::alloc::Global;

/// Allocates a block for `layout` and returns a pointer to its first byte.
#[inline]
pub(crate) fn do_alloc<A: Allocator + ?Sized>(
    alloc: &A,
    layout: Layout,
) -> Result<NonNull<u8>, AllocError> {
    alloc.allocate(layout).map(NonNull::cast)
}

#[cfg(test)]
pub(crate) mod testing {
    use core::cell::Cell;

    use super::*;

    /// An allocator that serves a fixed number of requests, then fails, and
    /// tracks how many blocks are outstanding.
    #[derive(Debug)]
    pub(crate) struct BudgetAllocator {
        pub(crate) remaining: Cell<usize>,
        pub(crate) live: Cell<usize>,
    }

    impl BudgetAllocator {
        pub(crate) fn new(budget: usize) -> Self {
            Self {
                remaining: Cell::new(budget),
                live: Cell::new(0),
            }
        }
    }

    // SAFETY: Forwards successful requests to `Global`.
    unsafe impl Allocator for BudgetAllocator {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            if self.remaining.get() == 0 {
                return Err(AllocError);
            }
            self.remaining.set(self.remaining.get() - 1);
            let block = Global.allocate(layout)?;
            self.live.set(self.live.get() + 1);
            Ok(block)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            self.live.set(self.live.get() - 1);
            // SAFETY: Forwarded caller guarantee.
            unsafe { Global.deallocate(ptr, layout) }
        }
    }

    #[test]
    fn budget_is_enforced() {
        let alloc = BudgetAllocator::new(1);
        let layout = Layout::from_size_align(64, 16).unwrap();
        let block = do_alloc(&alloc, layout).unwrap();
        assert!(do_alloc(&alloc, layout).is_err());
        assert_eq!(alloc.live.get(), 1);
        // SAFETY: `block` came from `alloc` with `layout`.
        unsafe { alloc.deallocate(block, layout) };
        assert_eq!(alloc.live.get(), 0);
    }

    #[test]
    fn shared_reference_is_an_allocator() {
        let alloc = BudgetAllocator::new(2);
        let layout = Layout::new::<[u64; 4]>();
        let block = do_alloc(&&alloc, layout).unwrap();
        assert_eq!(alloc.live.get(), 1);
        // SAFETY: `block` came from `alloc` with `layout`.
        unsafe { (&alloc).deallocate(block, layout) };
        assert_eq!(alloc.live.get(), 0);
        assert_eq!(alloc.remaining.get(), 1);
    }
}
