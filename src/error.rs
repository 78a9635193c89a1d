use core::alloc::Layout;

/// The error type for `try_reserve`, `try_rehash`, `try_insert` and the
/// other fallible growth paths.
///
/// When one of these operations fails the table is left exactly as it was:
/// no entry is moved, dropped, or inserted.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum TryReserveError {
    /// The requested capacity exceeds what can be addressed or laid out in
    /// memory.
    #[error("hash table capacity overflow")]
    CapacityOverflow,

    /// The allocator refused to provide storage.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocError {
        /// The layout of the allocation request that failed.
        layout: Layout,
    },
}
