use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::Chain;
use core::iter::FusedIterator;
use core::mem;

use crate::DefaultHashBuilder;
use crate::error::TryReserveError;
use crate::hash_table;
use crate::hash_table::HashTable;
use crate::policy::SetPolicy;
#[cfg(any(test, feature = "stats"))]
use crate::raw_table::DebugStats;
#[cfg(any(test, feature = "stats"))]
use crate::raw_table::ProbeHistogram;
use crate::raw_table::max_load;
use crate::raw_table::slots_for_entries;

/// A hash set backed by a [`HashTable`] with [`SetPolicy`] entries.
///
/// `HashSet<T, S>` stores values of type `T` where `T` implements `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash values. Capacities are
/// counted in values, like `std::collections::HashSet`.
///
/// # Performance Characteristics
///
/// - **Memory**: 1 control byte per slot, plus the size of `T`; at most 7/8
///   of all slots are occupied.
pub struct HashSet<T, S = DefaultHashBuilder> {
    table: HashTable<SetPolicy<T>, S>,
}

impl<T, S> Clone for HashSet<T, S>
where
    T: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<T, S> PartialEq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S> Eq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

impl<T, S> Debug for HashSet<T, S>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S> HashSet<T, S> {
    /// Creates a new hash set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::collections::hash_map::RandomState;
    ///
    /// use probe_hash::HashSet;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_hasher(RandomState::new());
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a new hash set that can hold at least `capacity` values
    /// without reallocating, using `hash_builder` to hash values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::collections::hash_map::RandomState;
    ///
    /// use probe_hash::HashSet;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_capacity_and_hasher(100, RandomState::new());
    /// assert!(set.capacity() >= 100);
    /// # }
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity_and_hasher(slots_for_entries(capacity), hash_builder),
        }
    }

    /// Returns the number of values in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no values.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of values the set can hold before it needs to grow.
    pub fn capacity(&self) -> usize {
        max_load(self.table.capacity())
    }

    /// Removes all values from the set, keeping the allocated memory.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert(1);
    /// set.clear();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        self.table.hasher()
    }

    /// An iterator visiting all values in arbitrary order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Clears the set, returning all values as an iterator. Keeps the
    /// allocated memory for reuse.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = [1, 2, 3].into_iter().collect();
    /// let mut drained: Vec<_> = set.drain().collect();
    /// drained.sort();
    /// assert_eq!(drained, [1, 2, 3]);
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the values specified by the predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = (1..=4).collect();
    /// set.retain(|&x| x % 2 == 0);
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(&2));
    /// assert!(set.contains(&4));
    /// # }
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table.retain(|v| f(v));
    }

    /// Returns detailed statistics about the underlying table.
    ///
    /// Only available in tests or with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        self.table.debug_stats()
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Shrinks the capacity of the set as much as possible.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Reserves capacity for at least `additional` more values.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows `usize`.
    pub fn reserve(&mut self, additional: usize) {
        let total = self
            .len()
            .checked_add(additional)
            .unwrap_or_else(|| panic!("Hash table capacity overflow"));
        self.table.reserve(total);
    }

    /// Tries to reserve capacity for at least `additional` more values.
    ///
    /// On error the set is unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        let total = self
            .len()
            .checked_add(additional)
            .ok_or(TryReserveError::CapacityOverflow)?;
        self.table.try_reserve(total)
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. An equal value already
    /// in the set is kept and `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert!(set.insert(2));
    /// assert!(!set.insert(2));
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        self.table.insert(value).1
    }

    /// Adds a value to the set, replacing the existing equal value, if any.
    /// Returns the replaced value.
    pub fn replace(&mut self, value: T) -> Option<T> {
        match self.table.find_mut(&value) {
            Some(existing) => Some(mem::replace(existing, value)),
            None => {
                self.table.insert(value);
                None
            }
        }
    }

    /// Returns `true` if the set contains a value equal to `value`.
    ///
    /// The value may be any borrowed form of the set's value type.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.contains(value)
    }

    /// Returns a reference to the value in the set, if any, that is equal to
    /// the given value.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.find(value)
    }

    /// Removes a value from the set. Returns whether the value was present.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.erase(value) == 1
    }

    /// Removes and returns the value in the set, if any, that is equal to the
    /// given one.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.remove(value)
    }

    /// Returns `true` if `self` has no values in common with `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_hash::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2, 3].into_iter().collect();
    /// let mut b: HashSet<i32> = [4, 5].into_iter().collect();
    /// assert!(a.is_disjoint(&b));
    /// b.insert(3);
    /// assert!(!a.is_disjoint(&b));
    /// # }
    /// ```
    pub fn is_disjoint(&self, other: &HashSet<T, S>) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().all(|v| !large.contains(v))
    }

    /// Returns `true` if every value of `self` is also in `other`.
    pub fn is_subset(&self, other: &HashSet<T, S>) -> bool {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if every value of `other` is also in `self`.
    pub fn is_superset(&self, other: &HashSet<T, S>) -> bool {
        other.is_subset(self)
    }

    /// Visits the values in `self` or `other`, without duplicates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_hash::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2, 3].into_iter().collect();
    /// let b: HashSet<i32> = [3, 4].into_iter().collect();
    /// let mut union: Vec<_> = a.union(&b).copied().collect();
    /// union.sort();
    /// assert_eq!(union, [1, 2, 3, 4]);
    /// # }
    /// ```
    pub fn union<'a>(&'a self, other: &'a HashSet<T, S>) -> Union<'a, T, S> {
        Union {
            iter: self.iter().chain(other.difference(self)),
        }
    }

    /// Visits the values in both `self` and `other`.
    pub fn intersection<'a>(&'a self, other: &'a HashSet<T, S>) -> Intersection<'a, T, S> {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        Intersection {
            iter: small.iter(),
            other: large,
        }
    }

    /// Visits the values in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a HashSet<T, S>) -> Difference<'a, T, S> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Visits the values in exactly one of `self` and `other`.
    pub fn symmetric_difference<'a>(
        &'a self,
        other: &'a HashSet<T, S>,
    ) -> SymmetricDifference<'a, T, S> {
        SymmetricDifference {
            iter: self.difference(other).chain(other.difference(self)),
        }
    }

    /// Returns a histogram of probe distances in the underlying table.
    ///
    /// Only available in tests or with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        self.table.probe_histogram()
    }
}

impl<T, S> HashSet<T, S>
where
    S: Default,
{
    /// Creates a new hash set using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash set that can hold at least `capacity` values
    /// without reallocating, using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use probe_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::with_capacity(100);
    /// assert!(set.capacity() >= 100);
    /// # }
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<T, S> Default for HashSet<T, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// An iterator over the values of a `HashSet`.
pub struct Iter<'a, T> {
    inner: hash_table::Iter<'a, T>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// A draining iterator over the values of a `HashSet`.
pub struct Drain<'a, T> {
    inner: hash_table::Drain<'a, T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

/// A consuming iterator over the values of a `HashSet`.
pub struct IntoIter<T> {
    inner: hash_table::IntoIter<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T, S> IntoIterator for HashSet<T, S> {
    type IntoIter = IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, S> IntoIterator for &'a HashSet<T, S> {
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = HashSet::new();
        set.extend(iter);
        set
    }
}

impl<T, S> Extend<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.table.extend(iter);
    }
}

impl<'a, T, S> Extend<&'a T> for HashSet<T, S>
where
    T: Hash + Eq + Copy + 'a,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.table.extend(iter.into_iter().copied());
    }
}

/// An iterator over the union of two sets.
pub struct Union<'a, T, S> {
    iter: Chain<Iter<'a, T>, Difference<'a, T, S>>,
}

impl<'a, T, S> Iterator for Union<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

/// An iterator over the intersection of two sets.
pub struct Intersection<'a, T, S> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S>,
}

impl<'a, T, S> Iterator for Intersection<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the difference of two sets.
pub struct Difference<'a, T, S> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S>,
}

impl<'a, T, S> Iterator for Difference<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if !self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the symmetric difference of two sets.
pub struct SymmetricDifference<'a, T, S> {
    iter: Chain<Difference<'a, T, S>, Difference<'a, T, S>>,
}

impl<'a, T, S> Iterator for SymmetricDifference<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            Self {
                k1: OsRng.try_next_u64().unwrap_or(0),
                k2: OsRng.try_next_u64().unwrap_or(0),
            }
        }
    }

    type Set<T> = HashSet<T, SipHashBuilder>;

    fn set_of(values: &[i32]) -> Set<i32> {
        values.iter().copied().collect()
    }

    fn sorted<'a>(values: impl Iterator<Item = &'a i32>) -> Vec<i32> {
        let mut values: Vec<i32> = values.copied().collect();
        values.sort();
        values
    }

    #[test]
    fn test_new_and_with_capacity() {
        let set: Set<i32> = HashSet::new();
        assert!(set.is_empty());
        assert_eq!(set.capacity(), 0);

        let set: Set<i32> = HashSet::with_capacity(100);
        assert!(set.capacity() >= 100);
        assert!(set.is_empty());

        let set = HashSet::<i32, _>::with_capacity_and_hasher(200, SipHashBuilder::default());
        assert!(set.capacity() >= 200);
    }

    #[test]
    fn test_insert_and_contains() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        assert!(set.insert(1));
        assert!(!set.insert(1));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&1));

        assert!(set.insert(2));
        assert_eq!(set.len(), 2);
        assert!(!set.contains(&3));
    }

    #[test]
    fn test_remove_take_get() {
        let mut set = set_of(&[1, 2, 3, 42]);

        assert!(set.remove(&2));
        assert!(!set.remove(&2));
        assert_eq!(set.len(), 3);

        assert_eq!(set.take(&1), Some(1));
        assert_eq!(set.take(&1), None);

        assert_eq!(set.get(&42), Some(&42));
        assert_eq!(set.get(&7), None);
        assert_eq!(sorted(set.iter()), [3, 42]);
    }

    #[test]
    fn test_replace() {
        #[derive(Debug)]
        struct Tagged(u32, &'static str);

        impl PartialEq for Tagged {
            fn eq(&self, other: &Self) -> bool {
                self.0 == other.0
            }
        }

        impl Eq for Tagged {}

        impl core::hash::Hash for Tagged {
            fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        assert!(set.replace(Tagged(1, "first")).is_none());
        assert_eq!(set.replace(Tagged(1, "second")).map(|t| t.1), Some("first"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&Tagged(1, "")).map(|t| t.1), Some("second"));
    }

    #[test]
    fn test_clear_and_drain() {
        let mut set = set_of(&[1, 2, 3]);
        let capacity = set.capacity();

        assert_eq!(sorted(set.drain().collect::<Vec<_>>().iter()), [1, 2, 3]);
        assert!(set.is_empty());
        assert_eq!(set.capacity(), capacity);

        set.extend([4, 5]);
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(&4));
        assert_eq!(set.drain().count(), 0);
    }

    #[test]
    fn test_reserve() {
        let mut set = HashSet::<i32, _>::with_hasher(SipHashBuilder::default());
        let initial_capacity = set.capacity();

        set.reserve(1000);
        assert!(set.capacity() >= initial_capacity + 1000);
        assert!(set.try_reserve(10).is_ok());
        assert_eq!(
            set.try_reserve(usize::MAX),
            Err(TryReserveError::CapacityOverflow)
        );
    }

    #[test]
    fn test_iteration() {
        let set = set_of(&[1, 2, 3]);
        assert_eq!(set.iter().len(), 3);
        assert_eq!(sorted(set.iter()), [1, 2, 3]);
        assert_eq!(sorted((&set).into_iter()), [1, 2, 3]);

        let mut owned: Vec<i32> = set.into_iter().collect();
        owned.sort();
        assert_eq!(owned, [1, 2, 3]);
    }

    #[test]
    fn test_collision_handling() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        for i in 0..1000 {
            assert!(set.insert(i));
        }
        for i in (0..1000).step_by(2) {
            assert!(set.remove(&i));
        }

        assert_eq!(set.len(), 500);
        for i in 0..1000 {
            assert_eq!(set.contains(&i), i % 2 == 1);
        }

        let stats = set.debug_stats();
        assert!(stats.populated + stats.tombstones <= stats.max_load, "{stats:#?}");
        assert_eq!(set.probe_histogram().bins.iter().sum::<usize>(), 500);
    }

    #[test]
    fn test_string_values() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        assert!(set.insert("hello".to_string()));
        assert!(set.insert("world".to_string()));

        assert!(set.contains("hello"));
        assert!(!set.contains("missing"));
        assert!(!set.insert("hello".to_string()));
        assert_eq!(set.take("world"), Some("world".to_string()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_complex_values() {
        let mut set: Set<Vec<i32>> = HashSet::default();

        assert!(set.insert(vec![1, 2, 3]));
        assert!(set.insert(vec![4, 5, 6]));
        assert!(!set.insert(vec![1, 2, 3]));

        assert_eq!(set.len(), 2);
        assert!(set.contains([1, 2, 3].as_slice()));
    }

    #[test]
    fn test_insert_remove_cycle() {
        let mut set: Set<i32> = HashSet::with_capacity(50);
        let capacity = set.capacity();

        for _ in 0..10 {
            for i in 0..25 {
                assert!(set.insert(i));
            }
            assert_eq!(set.len(), 25);

            for i in 0..25 {
                assert!(set.remove(&i));
            }
            assert!(set.is_empty());
        }

        // At most half full, so churn is absorbed by purging tombstones.
        assert_eq!(set.capacity(), capacity);
    }

    #[test]
    fn test_large_values() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        for i in 0..100 {
            let large_string = "x".repeat(1000) + &i.to_string();
            assert!(set.insert(large_string.clone()));
            assert!(set.contains(&large_string))
        }

        assert_eq!(set.len(), 100);
    }

    #[test]
    fn test_retain_and_shrink() {
        let mut set: Set<i32> = (0..1000).collect();
        set.retain(|v| v % 100 == 0);
        assert_eq!(set.len(), 10);

        set.shrink_to_fit();
        assert!(set.capacity() >= 10);
        assert!(set.capacity() < 100);
        assert_eq!(sorted(set.iter()), (0..10).map(|i| i * 100).collect::<Vec<_>>());
    }

    #[test]
    fn test_is_disjoint() {
        let a = set_of(&[1, 2, 3]);
        let mut b = set_of(&[4, 5, 6]);

        assert!(a.is_disjoint(&b));
        assert!(b.is_disjoint(&a));

        b.insert(2);
        assert!(!a.is_disjoint(&b));
        assert!(!b.is_disjoint(&a));
    }

    #[test]
    fn test_subset_and_superset() {
        let a = set_of(&[1, 2]);
        let b = set_of(&[1, 2, 3]);

        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
        assert!(a.is_subset(&a));

        assert!(b.is_superset(&a));
        assert!(!a.is_superset(&b));
        assert!(b.is_superset(&b));
    }

    #[test]
    fn test_set_algebra() {
        let a = set_of(&[1, 2, 3]);
        let b = set_of(&[2, 3, 4]);

        assert_eq!(sorted(a.union(&b)), [1, 2, 3, 4]);
        assert_eq!(sorted(a.intersection(&b)), [2, 3]);
        assert_eq!(sorted(a.difference(&b)), [1]);
        assert_eq!(sorted(b.difference(&a)), [4]);
        assert_eq!(sorted(a.symmetric_difference(&b)), [1, 4]);

        let empty = set_of(&[]);
        assert_eq!(sorted(a.union(&empty)), [1, 2, 3]);
        assert_eq!(a.intersection(&empty).count(), 0);
    }

    #[test]
    fn test_equality_and_clone() {
        let a = set_of(&[1, 2, 3]);
        let mut b = a.clone();
        assert_eq!(a, b);

        b.remove(&1);
        b.insert(7);
        assert_ne!(a, b);
        assert!(a.contains(&1));

        let mut c: Set<i32> = HashSet::default();
        c.extend(&[3, 2, 1]);
        assert_eq!(a, c);
    }

    #[test]
    fn test_debug_format() {
        let set = set_of(&[5]);
        assert_eq!(format!("{set:?}"), "{5}");
        let empty: Set<String> = HashSet::default();
        assert_eq!(format!("{empty:?}"), "{}");
    }
}
