//! Entry policies and key equality.
//!
//! A [`HashTable`](crate::HashTable) stores opaque entries. The policy tells
//! it how to find the key inside an entry and, for policies that support it,
//! how to build an entry from a bare key. One probing engine therefore serves
//! both set semantics (the entry is the key) and map semantics (the entry is
//! a key/value pair).

use core::borrow::Borrow;
use core::fmt;
use core::marker::PhantomData;

/// Describes how a table extracts keys from its entries.
///
/// The key returned by [`key`](EntryPolicy::key) must stay the same, with
/// respect to the table's hasher and equality, for as long as the entry is
/// stored in a table.
pub trait EntryPolicy {
    /// The key type entries are looked up by.
    type Key;
    /// The type stored in each occupied slot.
    type Entry;

    /// Returns the key of `entry`.
    fn key(entry: &Self::Entry) -> &Self::Key;
}

/// Policies that can build a complete entry from a key alone.
///
/// Used by [`HashTable::find_or_insert`](crate::HashTable::find_or_insert).
pub trait ConstructFromKey: EntryPolicy {
    /// Builds the entry stored for `key` when nothing else is supplied.
    fn construct_from_key(key: Self::Key) -> Self::Entry;
}

/// Set semantics: the entry is its own key.
pub struct SetPolicy<K>(PhantomData<fn() -> K>);

impl<K> EntryPolicy for SetPolicy<K> {
    type Entry = K;
    type Key = K;

    #[inline(always)]
    fn key(entry: &K) -> &K {
        entry
    }
}

impl<K> ConstructFromKey for SetPolicy<K> {
    #[inline(always)]
    fn construct_from_key(key: K) -> K {
        key
    }
}

/// Map semantics: the entry is a `(key, value)` pair.
pub struct MapPolicy<K, V>(PhantomData<fn() -> (K, V)>);

impl<K, V> EntryPolicy for MapPolicy<K, V> {
    type Entry = (K, V);
    type Key = K;

    #[inline(always)]
    fn key(entry: &(K, V)) -> &K {
        &entry.0
    }
}

impl<K, V: Default> ConstructFromKey for MapPolicy<K, V> {
    #[inline(always)]
    fn construct_from_key(key: K) -> (K, V) {
        (key, V::default())
    }
}

impl<K> fmt::Debug for SetPolicy<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SetPolicy")
    }
}

impl<K, V> fmt::Debug for MapPolicy<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MapPolicy")
    }
}

/// The equality functor a table compares keys with.
///
/// `Q` is the form a lookup key arrives in. Whenever `equal(stored, probe)`
/// holds, the table's hasher must produce the same hash for `stored` and
/// `probe`.
pub trait KeyEqual<K: ?Sized, Q: ?Sized = K> {
    /// Returns `true` if the stored key matches the probe key.
    fn equal(&self, stored: &K, probe: &Q) -> bool;
}

/// Compares keys with [`Eq`], looking through [`Borrow`].
#[derive(Clone, Copy, Default, Debug)]
pub struct DefaultKeyEqual;

impl<K, Q> KeyEqual<K, Q> for DefaultKeyEqual
where
    K: Borrow<Q> + ?Sized,
    Q: Eq + ?Sized,
{
    #[inline(always)]
    fn equal(&self, stored: &K, probe: &Q) -> bool {
        stored.borrow() == probe
    }
}

/// Adapts a closure `Fn(&K, &K) -> bool` into a [`KeyEqual`].
///
/// ```rust
/// use std::hash::BuildHasherDefault;
///
/// use probe_hash::HashTable;
/// use probe_hash::policy::EqualFn;
/// use probe_hash::policy::SetPolicy;
/// use siphasher::sip::SipHasher;
///
/// let mut table: HashTable<SetPolicy<u64>, BuildHasherDefault<SipHasher>, _> =
///     HashTable::with_capacity_hasher_and_equal(
///         0,
///         BuildHasherDefault::default(),
///         EqualFn(|a: &u64, b: &u64| a == b),
///     );
/// table.insert(7);
/// assert!(table.contains(&7u64));
/// assert!(!table.contains(&8u64));
/// ```
#[derive(Clone, Copy, Default)]
pub struct EqualFn<F>(pub F);

impl<K: ?Sized, F> KeyEqual<K, K> for EqualFn<F>
where
    F: Fn(&K, &K) -> bool,
{
    #[inline(always)]
    fn equal(&self, stored: &K, probe: &K) -> bool {
        (self.0)(stored, probe)
    }
}

impl<F> fmt::Debug for EqualFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EqualFn")
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn set_policy_entry_is_key() {
        let entry = 42u32;
        assert_eq!(*SetPolicy::<u32>::key(&entry), 42);
        assert_eq!(SetPolicy::<u32>::construct_from_key(7), 7);
    }

    #[test]
    fn map_policy_key_is_first() {
        let entry = ("k".to_string(), 3);
        assert_eq!(MapPolicy::<String, i32>::key(&entry), "k");
        let built = MapPolicy::<String, Vec<u8>>::construct_from_key("x".to_string());
        assert_eq!(built, ("x".to_string(), Vec::new()));
    }

    #[test]
    fn default_equal_looks_through_borrow() {
        let stored = "hello".to_string();
        assert!(<DefaultKeyEqual as KeyEqual<String, str>>::equal(
            &DefaultKeyEqual,
            &stored,
            "hello"
        ));
        assert!(!DefaultKeyEqual.equal(&stored, &"world".to_string()));
    }

    #[test]
    fn closure_equal() {
        let eq = EqualFn(|a: &i32, b: &i32| a.abs() == b.abs());
        assert!(eq.equal(&-3, &3));
        assert!(!eq.equal(&-3, &4));
    }
}
