#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod allocator;
mod control;
mod error;
mod group;
mod raw_table;

/// A HashMap built on the grouped-probing [`HashTable`].
///
/// This module provides a `HashMap` that plugs [`MapPolicy`](policy::MapPolicy)
/// into the `HashTable` and provides a standard key-value map interface with
/// configurable hashers.
pub mod hash_map;

pub mod hash_table;

/// A hash set built on the grouped-probing [`HashTable`].
///
/// This module provides a `HashSet` that plugs [`SetPolicy`](policy::SetPolicy)
/// into the `HashTable` and provides a standard set interface with
/// configurable hashers.
pub mod hash_set;

pub mod policy;

pub use allocator::AllocError;
pub use allocator::Allocator;
pub use allocator::Global;
pub use error::TryReserveError;
pub use group::GROUP_WIDTH;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::Entry;
pub use hash_table::HashTable;
pub use hash_table::Slot;
pub use raw_table::MAX_LOAD_FACTOR;
pub use raw_table::MIN_CAPACITY;
#[cfg(any(test, feature = "stats"))]
pub use raw_table::DebugStats;
#[cfg(any(test, feature = "stats"))]
pub use raw_table::ProbeHistogram;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder tables use unless another one is given.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder tables use unless another one is given.
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    } else {
        /// Placeholder used when neither `foldhash` nor `std` is enabled: a
        /// hasher builder must then always be supplied explicitly.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}
    }
}
