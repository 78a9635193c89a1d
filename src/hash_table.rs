//! A policy-driven open-addressing hash table.
//!
//! [`HashTable`] is the engine shared by [`HashMap`](crate::HashMap) and
//! [`HashSet`](crate::HashSet). It stores opaque entries and learns how to
//! find their keys from an [`EntryPolicy`]; the policy decides whether the
//! table behaves like a set or like a map.
//!
//! Slots are addressed by [`Slot`] positions. A slot stays valid until the
//! next structural change: an insertion that grows or purges the table,
//! [`rehash`](HashTable::rehash), [`reserve`](HashTable::reserve),
//! [`clear`](HashTable::clear) or [`reset`](HashTable::reset). Erasing an
//! entry only invalidates that entry's own slot.

use core::borrow::Borrow;
use core::convert::Infallible;
use core::fmt;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ptr;

use crate::DefaultHashBuilder;
use crate::allocator::Allocator;
use crate::allocator::Global;
use crate::error::TryReserveError;
use crate::policy::ConstructFromKey;
use crate::policy::DefaultKeyEqual;
use crate::policy::EntryPolicy;
use crate::policy::KeyEqual;
use crate::raw_table::Fallibility;
use crate::raw_table::Lookup;
use crate::raw_table::MAX_LOAD_FACTOR;
use crate::raw_table::RawTable;
#[cfg(any(test, feature = "stats"))]
use crate::raw_table::DebugStats;
#[cfg(any(test, feature = "stats"))]
use crate::raw_table::ProbeHistogram;
use crate::raw_table::infallible;

/// A position in a [`HashTable`]'s slot array.
///
/// Obtained from [`HashTable::find_slot`], [`Iter::slot`] or
/// [`HashTable::erase_slot`]. Using a slot after a structural change of its
/// table, or with a different table, is a logic error.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Slot(usize);

impl Slot {
    /// Returns the raw slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

#[inline]
fn make_hasher<P, S>(hash_builder: &S) -> impl Fn(&P::Entry) -> u64 + '_
where
    P: EntryPolicy,
    P::Key: Hash,
    S: BuildHasher,
{
    move |entry| hash_builder.hash_one(P::key(entry))
}

/// An open-addressing hash table with grouped control-byte probing.
///
/// - `P` is the [`EntryPolicy`] describing the stored entries.
/// - `S` builds the hasher keys are hashed with.
/// - `E` is the [`KeyEqual`] functor keys are compared with.
/// - `A` is the [`Allocator`] all storage comes from.
///
/// The table never holds more than `capacity() * 7/8` entries; inserting
/// past that bound grows the table first.
///
/// # Examples
///
/// ```rust
/// use std::hash::BuildHasherDefault;
///
/// use probe_hash::HashTable;
/// use probe_hash::policy::MapPolicy;
/// use siphasher::sip::SipHasher;
///
/// let mut table: HashTable<MapPolicy<String, u32>, BuildHasherDefault<SipHasher>> =
///     HashTable::new();
///
/// let (entry, inserted) = table.insert(("apples".to_string(), 3));
/// assert!(inserted);
/// entry.1 += 1;
///
/// assert_eq!(table.find("apples"), Some(&("apples".to_string(), 4)));
/// assert_eq!(table.erase("apples"), 1);
/// assert!(table.is_empty());
/// ```
pub struct HashTable<
    P: EntryPolicy,
    S = DefaultHashBuilder,
    E = DefaultKeyEqual,
    A: Allocator = Global,
> {
    raw: RawTable<P::Entry, A>,
    hash_builder: S,
    key_equal: E,
    _policy: PhantomData<fn() -> P>,
}

impl<P: EntryPolicy, S: Default, E: Default> HashTable<P, S, E, Global> {
    /// Creates an empty table with zero capacity. Nothing is allocated until
    /// the first insertion.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty table with at least `min_capacity` slots.
    ///
    /// A request of 0 allocates nothing; any other request is rounded up to
    /// a power of two of at least [`MIN_CAPACITY`](crate::MIN_CAPACITY).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasherDefault;
    /// #
    /// # use probe_hash::HashTable;
    /// # use probe_hash::policy::SetPolicy;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// let table: HashTable<SetPolicy<u64>, BuildHasherDefault<SipHasher>> =
    ///     HashTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 128);
    /// ```
    pub fn with_capacity(min_capacity: usize) -> Self {
        Self::with_capacity_hasher_and_equal(min_capacity, S::default(), E::default())
    }
}

impl<P: EntryPolicy, S, E: Default> HashTable<P, S, E, Global> {
    /// Creates an empty table that hashes keys with `hash_builder`.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates an empty table with at least `min_capacity` slots that hashes
    /// keys with `hash_builder`.
    pub fn with_capacity_and_hasher(min_capacity: usize, hash_builder: S) -> Self {
        Self::with_capacity_hasher_and_equal(min_capacity, hash_builder, E::default())
    }
}

impl<P: EntryPolicy, S, E> HashTable<P, S, E, Global> {
    /// Creates an empty table with at least `min_capacity` slots, the given
    /// hasher builder, and the given key equality functor.
    pub fn with_capacity_hasher_and_equal(min_capacity: usize, hash_builder: S, key_equal: E) -> Self {
        Self::with_capacity_in(min_capacity, hash_builder, key_equal, Global)
    }
}

impl<P: EntryPolicy, S, E, A: Allocator> HashTable<P, S, E, A> {
    /// Creates an empty table whose storage comes from `alloc`.
    ///
    /// # Panics
    ///
    /// Panics if the capacity overflows, and aborts via
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if `alloc`
    /// fails.
    pub fn with_capacity_in(min_capacity: usize, hash_builder: S, key_equal: E, alloc: A) -> Self {
        Self {
            raw: infallible(RawTable::try_with_capacity_in(
                min_capacity,
                alloc,
                Fallibility::Infallible,
            )),
            hash_builder,
            key_equal,
            _policy: PhantomData,
        }
    }

    /// Fallible version of [`with_capacity_in`](Self::with_capacity_in).
    pub fn try_with_capacity_in(
        min_capacity: usize,
        hash_builder: S,
        key_equal: E,
        alloc: A,
    ) -> Result<Self, TryReserveError> {
        Ok(Self {
            raw: RawTable::try_with_capacity_in(min_capacity, alloc, Fallibility::Fallible)?,
            hash_builder,
            key_equal,
            _policy: PhantomData,
        })
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    /// Returns the number of slots: 0, or a power of two of at least
    /// [`MIN_CAPACITY`](crate::MIN_CAPACITY).
    ///
    /// At most `capacity() * 7/8` of them are ever occupied.
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Returns `len() / capacity()`, or 0 for a zero-capacity table.
    pub fn load_factor(&self) -> f32 {
        if self.capacity() == 0 {
            0.0
        } else {
            self.len() as f32 / self.capacity() as f32
        }
    }

    /// Returns the fixed maximum load factor, 7/8.
    pub fn max_load_factor(&self) -> f32 {
        MAX_LOAD_FACTOR
    }

    /// Returns the table's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns the table's key equality functor.
    pub fn key_equal(&self) -> &E {
        &self.key_equal
    }

    /// Returns the table's allocator.
    pub fn allocator(&self) -> &A {
        self.raw.allocator()
    }

    /// Drops every entry and marks every slot empty. The capacity is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasherDefault;
    /// #
    /// # use probe_hash::HashTable;
    /// # use probe_hash::policy::SetPolicy;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// let mut table: HashTable<SetPolicy<u64>, BuildHasherDefault<SipHasher>> = HashTable::new();
    /// table.insert(1);
    /// let capacity = table.capacity();
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), capacity);
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Drops every entry and releases the storage, returning the table to
    /// the zero-capacity state.
    pub fn reset(&mut self) {
        self.raw.reset();
    }

    /// Keeps only the entries for which `keep` returns `true`.
    pub fn retain(&mut self, keep: impl FnMut(&mut P::Entry) -> bool) {
        self.raw.retain(keep);
    }

    /// Returns a cursor over the live entries, positioned at the first one.
    ///
    /// The order is unspecified and may change after any structural change.
    pub fn iter(&self) -> Iter<'_, P::Entry, A> {
        Iter {
            raw: &self.raw,
            current: self.raw.next_full(0),
            remaining: self.raw.len(),
        }
    }

    /// Returns an iterator yielding mutable references to every entry.
    ///
    /// Entries must not be modified in a way that changes their key's hash
    /// or equality.
    pub fn iter_mut(&mut self) -> IterMut<'_, P::Entry, A> {
        IterMut {
            remaining: self.raw.len(),
            raw: &self.raw,
            cursor: 0,
            _marker: PhantomData,
        }
    }

    /// Removes and yields every entry. The capacity is kept.
    ///
    /// Entries not consumed when the iterator is dropped are dropped too.
    pub fn drain(&mut self) -> Drain<'_, P::Entry, A> {
        Drain {
            raw: &mut self.raw,
            cursor: 0,
        }
    }

    /// Returns the entry stored at `slot`, or `None` if the slot is not
    /// occupied.
    pub fn get_slot(&self, slot: Slot) -> Option<&P::Entry> {
        if self.raw.is_occupied(slot.0) {
            // SAFETY: Checked above.
            Some(unsafe { self.raw.get(slot.0) })
        } else {
            None
        }
    }

    /// Mutable version of [`get_slot`](Self::get_slot).
    pub fn get_slot_mut(&mut self, slot: Slot) -> Option<&mut P::Entry> {
        if self.raw.is_occupied(slot.0) {
            // SAFETY: Checked above.
            Some(unsafe { self.raw.get_mut(slot.0) })
        } else {
            None
        }
    }

    /// Erases the entry at `slot` and returns the position of the next live
    /// entry in iteration order, or `None` at the end.
    ///
    /// `slot` must be occupied; this is checked in debug builds, and an
    /// unoccupied slot erases nothing otherwise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasherDefault;
    /// #
    /// # use probe_hash::HashTable;
    /// # use probe_hash::policy::SetPolicy;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// let mut table: HashTable<SetPolicy<u64>, BuildHasherDefault<SipHasher>> =
    ///     (0..10).collect();
    ///
    /// // Erase every odd key in one pass.
    /// let mut cursor = table.iter().slot();
    /// while let Some(slot) = cursor {
    ///     cursor = if table.get_slot(slot).is_some_and(|k| k % 2 == 1) {
    ///         table.erase_slot(slot)
    ///     } else {
    ///         table.next_slot(slot)
    ///     };
    /// }
    /// assert_eq!(table.len(), 5);
    /// assert!(!table.contains(&3));
    /// ```
    pub fn erase_slot(&mut self, slot: Slot) -> Option<Slot> {
        drop(self.remove_slot(slot));
        self.next_slot(slot)
    }

    /// Removes the entry at `slot` and returns it.
    ///
    /// `slot` must be occupied; this is checked in debug builds, and `None`
    /// is returned otherwise.
    pub fn remove_slot(&mut self, slot: Slot) -> Option<P::Entry> {
        debug_assert!(self.raw.is_occupied(slot.0), "{slot:?} is not occupied");
        if self.raw.is_occupied(slot.0) {
            // SAFETY: Checked above.
            Some(unsafe { self.raw.erase_at(slot.0) })
        } else {
            None
        }
    }

    /// Returns the position of the first live entry after `slot` in iteration
    /// order.
    pub fn next_slot(&self, slot: Slot) -> Option<Slot> {
        self.raw.next_full(slot.0 + 1).map(Slot)
    }

    /// Returns detailed statistics about the table's utilization.
    ///
    /// Only available in tests or with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        self.raw.debug_stats()
    }
}

impl<P, S, E, A> HashTable<P, S, E, A>
where
    P: EntryPolicy,
    P::Key: Hash,
    S: BuildHasher,
    A: Allocator,
{
    fn find_index<Q>(&self, key: &Q) -> Option<usize>
    where
        P::Key: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEqual<P::Key, Q>,
    {
        if self.raw.len() == 0 {
            return None;
        }
        let hash = self.hash_builder.hash_one(key);
        self.raw
            .find(hash, |entry| self.key_equal.equal(P::key(entry), key))
    }

    /// Returns the entry whose key equals `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasherDefault;
    /// #
    /// # use probe_hash::HashTable;
    /// # use probe_hash::policy::SetPolicy;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// let mut table: HashTable<SetPolicy<String>, BuildHasherDefault<SipHasher>> = HashTable::new();
    /// table.insert("hello".to_string());
    ///
    /// assert_eq!(table.find("hello").map(String::as_str), Some("hello"));
    /// assert!(table.find("world").is_none());
    /// ```
    pub fn find<Q>(&self, key: &Q) -> Option<&P::Entry>
    where
        P::Key: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEqual<P::Key, Q>,
    {
        let index = self.find_index(key)?;
        // SAFETY: `find_index` only returns occupied slots.
        Some(unsafe { self.raw.get(index) })
    }

    /// Returns a mutable reference to the entry whose key equals `key`.
    ///
    /// The key must not be modified in a way that changes its hash or
    /// equality.
    pub fn find_mut<Q>(&mut self, key: &Q) -> Option<&mut P::Entry>
    where
        P::Key: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEqual<P::Key, Q>,
    {
        let index = self.find_index(key)?;
        // SAFETY: `find_index` only returns occupied slots.
        Some(unsafe { self.raw.get_mut(index) })
    }

    /// Returns the slot holding the entry whose key equals `key`.
    pub fn find_slot<Q>(&self, key: &Q) -> Option<Slot>
    where
        P::Key: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEqual<P::Key, Q>,
    {
        self.find_index(key).map(Slot)
    }

    /// Returns `true` if an entry with `key` is present.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        P::Key: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEqual<P::Key, Q>,
    {
        self.find_index(key).is_some()
    }

    /// Returns the number of entries with `key`: 0 or 1.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        P::Key: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEqual<P::Key, Q>,
    {
        usize::from(self.contains(key))
    }

    /// Removes the entry with `key` and returns it.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<P::Entry>
    where
        P::Key: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEqual<P::Key, Q>,
    {
        let index = self.find_index(key)?;
        // SAFETY: `find_index` only returns occupied slots.
        Some(unsafe { self.raw.erase_at(index) })
    }

    /// Drops the entry with `key` and returns the number of entries erased:
    /// 0 or 1.
    ///
    /// Erasure never moves other entries or shrinks the table.
    pub fn erase<Q>(&mut self, key: &Q) -> usize
    where
        P::Key: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEqual<P::Key, Q>,
    {
        usize::from(self.remove(key).is_some())
    }

    fn prepare_insert(
        &mut self,
        hash: u64,
        key: &P::Key,
        fallibility: Fallibility,
    ) -> Result<Lookup, TryReserveError>
    where
        E: KeyEqual<P::Key>,
    {
        let key_equal = &self.key_equal;
        self.raw.find_or_prepare_insert(
            hash,
            |entry| key_equal.equal(P::key(entry), key),
            make_hasher::<P, S>(&self.hash_builder),
            fallibility,
        )
    }

    fn insert_inner(
        &mut self,
        entry: P::Entry,
        fallibility: Fallibility,
    ) -> Result<(&mut P::Entry, bool), TryReserveError>
    where
        E: KeyEqual<P::Key>,
    {
        let hash = self.hash_builder.hash_one(P::key(&entry));
        match self.prepare_insert(hash, P::key(&entry), fallibility)? {
            // SAFETY: `prepare_insert` returned an occupied slot.
            Lookup::Occupied(index) => Ok((unsafe { self.raw.get_mut(index) }, false)),
            // SAFETY: `prepare_insert` returned a free slot for `hash`.
            Lookup::Vacant(index) => Ok((unsafe { self.raw.insert_at(index, hash, entry) }, true)),
        }
    }

    /// Inserts `entry` unless an entry with an equal key is present.
    ///
    /// Returns the stored entry and whether `entry` was inserted. When the
    /// key is already present `entry` is dropped and the table is left
    /// unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasherDefault;
    /// #
    /// # use probe_hash::HashTable;
    /// # use probe_hash::policy::MapPolicy;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// let mut table: HashTable<MapPolicy<u32, &str>, BuildHasherDefault<SipHasher>> =
    ///     HashTable::new();
    ///
    /// assert!(table.insert((1, "one")).1);
    /// let (existing, inserted) = table.insert((1, "uno"));
    /// assert!(!inserted);
    /// assert_eq!(existing.1, "one");
    /// ```
    pub fn insert(&mut self, entry: P::Entry) -> (&mut P::Entry, bool)
    where
        E: KeyEqual<P::Key>,
    {
        infallible(self.insert_inner(entry, Fallibility::Infallible))
    }

    /// Fallible version of [`insert`](Self::insert).
    ///
    /// If growing the table fails, `entry` is dropped and the table is left
    /// unchanged.
    pub fn try_insert(&mut self, entry: P::Entry) -> Result<(&mut P::Entry, bool), TryReserveError>
    where
        E: KeyEqual<P::Key>,
    {
        self.insert_inner(entry, Fallibility::Fallible)
    }

    /// Returns the entry for `key`, inserting the policy's default entry for
    /// it first if it is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasherDefault;
    /// #
    /// # use probe_hash::HashTable;
    /// # use probe_hash::policy::MapPolicy;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// let mut counts: HashTable<MapPolicy<&str, u32>, BuildHasherDefault<SipHasher>> =
    ///     HashTable::new();
    /// for word in ["a", "b", "a"] {
    ///     counts.find_or_insert(word).1 += 1;
    /// }
    /// assert_eq!(counts.find("a").map(|e| e.1), Some(2));
    /// ```
    pub fn find_or_insert(&mut self, key: P::Key) -> &mut P::Entry
    where
        P: ConstructFromKey,
        E: KeyEqual<P::Key>,
    {
        let hash = self.hash_builder.hash_one(&key);
        match infallible(self.prepare_insert(hash, &key, Fallibility::Infallible)) {
            // SAFETY: `prepare_insert` returned an occupied slot.
            Lookup::Occupied(index) => unsafe { self.raw.get_mut(index) },
            // SAFETY: `prepare_insert` returned a free slot for `hash`.
            Lookup::Vacant(index) => unsafe {
                self.raw
                    .insert_at(index, hash, P::construct_from_key(key))
            },
        }
    }

    /// Builds an entry with `construct` and inserts it unless its key is
    /// already present, in which case the new entry is dropped.
    ///
    /// The entry is always constructed, and before the table is touched.
    pub fn emplace(&mut self, construct: impl FnOnce() -> P::Entry) -> (&mut P::Entry, bool)
    where
        E: KeyEqual<P::Key>,
    {
        self.insert(construct())
    }

    /// Builds and inserts an entry for `key` only if `key` is absent.
    ///
    /// `construct` receives the key and must return an entry whose key is
    /// equal to it.
    pub fn try_emplace(
        &mut self,
        key: P::Key,
        construct: impl FnOnce(P::Key) -> P::Entry,
    ) -> (&mut P::Entry, bool)
    where
        E: KeyEqual<P::Key>,
    {
        match self.try_emplace_with(key, |key| Ok::<_, Infallible>(construct(key))) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Like [`try_emplace`](Self::try_emplace), with a constructor that can
    /// fail.
    ///
    /// The constructor runs before the table is modified; its error is
    /// returned verbatim and leaves the table unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasherDefault;
    /// #
    /// # use probe_hash::HashTable;
    /// # use probe_hash::policy::MapPolicy;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// let mut table: HashTable<MapPolicy<&str, u8>, BuildHasherDefault<SipHasher>> =
    ///     HashTable::new();
    ///
    /// let parsed = table.try_emplace_with("x", |k| "300".parse().map(|v| (k, v)));
    /// assert!(parsed.is_err());
    /// assert!(table.is_empty());
    ///
    /// let (entry, inserted) = table
    ///     .try_emplace_with("y", |k| "42".parse().map(|v| (k, v)))
    ///     .unwrap();
    /// assert!(inserted);
    /// assert_eq!(entry.1, 42);
    /// ```
    pub fn try_emplace_with<Err>(
        &mut self,
        key: P::Key,
        construct: impl FnOnce(P::Key) -> Result<P::Entry, Err>,
    ) -> Result<(&mut P::Entry, bool), Err>
    where
        E: KeyEqual<P::Key>,
    {
        let hash = self.hash_builder.hash_one(&key);
        let key_equal = &self.key_equal;
        if let Some(index) = self
            .raw
            .find(hash, |entry| key_equal.equal(P::key(entry), &key))
        {
            // SAFETY: `find` only returns occupied slots.
            return Ok((unsafe { self.raw.get_mut(index) }, false));
        }

        let entry = construct(key)?;
        Ok(self.insert(entry))
    }

    /// Gets the entry for `key` for in-place manipulation.
    ///
    /// If the key is absent the table makes room for it before returning the
    /// vacant view, so inserting through the view never reallocates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasherDefault;
    /// #
    /// # use probe_hash::HashTable;
    /// # use probe_hash::hash_table::Entry;
    /// # use probe_hash::policy::MapPolicy;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// let mut table: HashTable<MapPolicy<String, Vec<u32>>, BuildHasherDefault<SipHasher>> =
    ///     HashTable::new();
    ///
    /// match table.entry("evens".to_string()) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert_with(|key| (key, vec![2]));
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    /// table
    ///     .entry("evens".to_string())
    ///     .or_insert_with(|key| (key, Vec::new()))
    ///     .1
    ///     .push(4);
    ///
    /// assert_eq!(table.find("evens").unwrap().1, [2, 4]);
    /// ```
    pub fn entry(&mut self, key: P::Key) -> Entry<'_, P, A>
    where
        E: KeyEqual<P::Key>,
    {
        let hash = self.hash_builder.hash_one(&key);
        match infallible(self.prepare_insert(hash, &key, Fallibility::Infallible)) {
            Lookup::Occupied(index) => Entry::Occupied(OccupiedEntry {
                raw: &mut self.raw,
                index,
            }),
            Lookup::Vacant(index) => Entry::Vacant(VacantEntry {
                raw: &mut self.raw,
                index,
                hash,
                key,
            }),
        }
    }

    /// Changes the capacity to the smallest valid capacity of at least
    /// `min_capacity` slots that can hold the current entries.
    ///
    /// The table may shrink. Rehashing an empty table to 0 releases its
    /// storage. If the capacity does not change nothing happens; otherwise
    /// every slot is invalidated and tombstones are purged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasherDefault;
    /// #
    /// # use probe_hash::HashTable;
    /// # use probe_hash::policy::SetPolicy;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// let mut table: HashTable<SetPolicy<u64>, BuildHasherDefault<SipHasher>> =
    ///     (0..10).collect();
    /// table.rehash(1000);
    /// assert_eq!(table.capacity(), 1024);
    /// assert!((0..10).all(|k| table.contains(&k)));
    ///
    /// table.rehash(0);
    /// assert_eq!(table.capacity(), probe_hash::MIN_CAPACITY);
    /// ```
    pub fn rehash(&mut self, min_capacity: usize) {
        infallible(
            self.raw
                .rehash(min_capacity, make_hasher::<P, S>(&self.hash_builder), Fallibility::Infallible),
        )
    }

    /// Fallible version of [`rehash`](Self::rehash). On error the table is
    /// unchanged.
    pub fn try_rehash(&mut self, min_capacity: usize) -> Result<(), TryReserveError> {
        self.raw
            .rehash(min_capacity, make_hasher::<P, S>(&self.hash_builder), Fallibility::Fallible)
    }

    /// Makes sure `num_entries` entries in total fit without growing, i.e.
    /// `rehash(ceil(num_entries * 8/7))` if that is larger than the current
    /// capacity. Never shrinks.
    pub fn reserve(&mut self, num_entries: usize) {
        infallible(
            self.raw
                .reserve(num_entries, make_hasher::<P, S>(&self.hash_builder), Fallibility::Infallible),
        )
    }

    /// Fallible version of [`reserve`](Self::reserve). On error the table is
    /// unchanged.
    pub fn try_reserve(&mut self, num_entries: usize) -> Result<(), TryReserveError> {
        self.raw
            .reserve(num_entries, make_hasher::<P, S>(&self.hash_builder), Fallibility::Fallible)
    }

    /// Shrinks the capacity as far as the current entries allow.
    pub fn shrink_to_fit(&mut self) {
        self.rehash(0);
    }

    /// Returns a histogram of how many groups past its home group each entry
    /// lives.
    ///
    /// Only available in tests or with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        self.raw
            .probe_histogram(make_hasher::<P, S>(&self.hash_builder))
    }
}

impl<P, S, E, A> Clone for HashTable<P, S, E, A>
where
    P: EntryPolicy,
    P::Entry: Clone,
    S: Clone,
    E: Clone,
    A: Allocator + Clone,
{
    /// Deep copy: the clone owns copies of every entry and shares nothing
    /// with `self`.
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            hash_builder: self.hash_builder.clone(),
            key_equal: self.key_equal.clone(),
            _policy: PhantomData,
        }
    }
}

impl<P, S, E, A> Debug for HashTable<P, S, E, A>
where
    P: EntryPolicy,
    P::Entry: Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<P: EntryPolicy, S: Default, E: Default> Default for HashTable<P, S, E, Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, S, E, A> PartialEq for HashTable<P, S, E, A>
where
    P: EntryPolicy,
    P::Key: Hash,
    P::Entry: PartialEq,
    S: BuildHasher,
    E: KeyEqual<P::Key>,
    A: Allocator,
{
    /// Two tables are equal if they hold the same number of entries and
    /// every entry of one is found, and equal, in the other.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|entry| other.find(P::key(entry)) == Some(entry))
    }
}

impl<P, S, E, A> Eq for HashTable<P, S, E, A>
where
    P: EntryPolicy,
    P::Key: Hash,
    P::Entry: Eq,
    S: BuildHasher,
    E: KeyEqual<P::Key>,
    A: Allocator,
{
}

impl<P, S, E, A> Extend<P::Entry> for HashTable<P, S, E, A>
where
    P: EntryPolicy,
    P::Key: Hash,
    S: BuildHasher,
    E: KeyEqual<P::Key>,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = P::Entry>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        // Duplicates are likely when extending a populated table.
        let additional = if self.is_empty() {
            lower
        } else {
            lower.div_ceil(2)
        };
        self.reserve(self.len().saturating_add(additional));
        for entry in iter {
            self.insert(entry);
        }
    }
}

impl<P, S, E> FromIterator<P::Entry> for HashTable<P, S, E, Global>
where
    P: EntryPolicy,
    P::Key: Hash,
    S: BuildHasher + Default,
    E: KeyEqual<P::Key> + Default,
{
    fn from_iter<I: IntoIterator<Item = P::Entry>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

impl<'a, P: EntryPolicy, S, E, A: Allocator> IntoIterator for &'a HashTable<P, S, E, A> {
    type IntoIter = Iter<'a, P::Entry, A>;
    type Item = &'a P::Entry;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, P: EntryPolicy, S, E, A: Allocator> IntoIterator for &'a mut HashTable<P, S, E, A> {
    type IntoIter = IterMut<'a, P::Entry, A>;
    type Item = &'a mut P::Entry;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<P: EntryPolicy, S, E, A: Allocator> IntoIterator for HashTable<P, S, E, A> {
    type IntoIter = IntoIter<P::Entry, A>;
    type Item = P::Entry;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            raw: self.raw,
            cursor: 0,
        }
    }
}

/// A view into a single slot of a [`HashTable`], which is either occupied
/// or vacant.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, P: EntryPolicy, A: Allocator = Global> {
    /// The key is present.
    Occupied(OccupiedEntry<'a, P, A>),
    /// The key is absent; room for it has been made.
    Vacant(VacantEntry<'a, P, A>),
}

impl<'a, P: EntryPolicy, A: Allocator> Entry<'a, P, A> {
    /// Returns the key this entry was looked up with, or the stored key.
    pub fn key(&self) -> &P::Key {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }

    /// Returns the stored entry, building it from the key with `construct`
    /// if it is vacant.
    pub fn or_insert_with(self, construct: impl FnOnce(P::Key) -> P::Entry) -> &'a mut P::Entry {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert_with(construct),
        }
    }

    /// Runs `f` on the stored entry if it is occupied.
    pub fn and_modify(self, f: impl FnOnce(&mut P::Entry)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }
}

impl<'a, P: ConstructFromKey, A: Allocator> Entry<'a, P, A> {
    /// Returns the stored entry, inserting the policy's default entry for the
    /// key if it is vacant.
    pub fn or_insert(self) -> &'a mut P::Entry {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(),
        }
    }
}

/// A view into an occupied slot of a [`HashTable`].
pub struct OccupiedEntry<'a, P: EntryPolicy, A: Allocator = Global> {
    raw: &'a mut RawTable<P::Entry, A>,
    index: usize,
}

impl<'a, P: EntryPolicy, A: Allocator> OccupiedEntry<'a, P, A> {
    /// Returns the stored key.
    pub fn key(&self) -> &P::Key {
        P::key(self.get())
    }

    /// Returns the stored entry.
    pub fn get(&self) -> &P::Entry {
        // SAFETY: Occupied entries always point at an occupied slot.
        unsafe { self.raw.get(self.index) }
    }

    /// Returns the stored entry mutably.
    pub fn get_mut(&mut self) -> &mut P::Entry {
        // SAFETY: Occupied entries always point at an occupied slot.
        unsafe { self.raw.get_mut(self.index) }
    }

    /// Converts the view into a mutable reference bound to the table.
    pub fn into_mut(self) -> &'a mut P::Entry {
        // SAFETY: Occupied entries always point at an occupied slot.
        unsafe { self.raw.get_mut(self.index) }
    }

    /// Returns the slot the entry is stored in.
    pub fn slot(&self) -> Slot {
        Slot(self.index)
    }

    /// Removes the entry from the table and returns it.
    pub fn remove(self) -> P::Entry {
        // SAFETY: Occupied entries always point at an occupied slot.
        unsafe { self.raw.erase_at(self.index) }
    }
}

/// A view into a vacant slot of a [`HashTable`], reserved for one key.
pub struct VacantEntry<'a, P: EntryPolicy, A: Allocator = Global> {
    raw: &'a mut RawTable<P::Entry, A>,
    index: usize,
    hash: u64,
    key: P::Key,
}

impl<'a, P: EntryPolicy, A: Allocator> VacantEntry<'a, P, A> {
    /// Returns the key that was looked up.
    pub fn key(&self) -> &P::Key {
        &self.key
    }

    /// Gives the key back without inserting anything.
    pub fn into_key(self) -> P::Key {
        self.key
    }

    /// Builds the entry from the key with `construct` and stores it.
    ///
    /// `construct` must return an entry whose key equals the given key.
    pub fn insert_with(self, construct: impl FnOnce(P::Key) -> P::Entry) -> &'a mut P::Entry {
        let entry = construct(self.key);
        // SAFETY: `index` is the free slot prepared for `hash`, and the table
        // has been exclusively borrowed since.
        unsafe { self.raw.insert_at(self.index, self.hash, entry) }
    }
}

impl<'a, P: ConstructFromKey, A: Allocator> VacantEntry<'a, P, A> {
    /// Stores the policy's default entry for the key.
    pub fn insert(self) -> &'a mut P::Entry {
        self.insert_with(P::construct_from_key)
    }
}

/// A forward cursor over the live entries of a [`HashTable`].
///
/// Two cursors are equal if they point at the same slot of the same table,
/// or if both are past the end.
///
/// This struct is created by the [`iter`] method on [`HashTable`].
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, T, A: Allocator = Global> {
    raw: &'a RawTable<T, A>,
    current: Option<usize>,
    remaining: usize,
}

impl<'a, T, A: Allocator> Iter<'a, T, A> {
    /// Returns the slot the cursor points at, or `None` past the end.
    pub fn slot(&self) -> Option<Slot> {
        self.current.map(Slot)
    }

    /// Returns the entry the cursor points at without advancing.
    pub fn peek(&self) -> Option<&'a T> {
        // SAFETY: `current` is always an occupied slot.
        self.current.map(|index| unsafe { self.raw.get(index) })
    }
}

impl<'a, T, A: Allocator> Iterator for Iter<'a, T, A> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.current?;
        self.current = self.raw.next_full(index + 1);
        self.remaining -= 1;
        // SAFETY: `current` is always an occupied slot.
        Some(unsafe { self.raw.get(index) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, A: Allocator> ExactSizeIterator for Iter<'_, T, A> {}

impl<T, A: Allocator> FusedIterator for Iter<'_, T, A> {}

impl<T, A: Allocator> Clone for Iter<'_, T, A> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw,
            current: self.current,
            remaining: self.remaining,
        }
    }
}

impl<T, A: Allocator> PartialEq for Iter<'_, T, A> {
    fn eq(&self, other: &Self) -> bool {
        match (self.current, other.current) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b && ptr::eq(self.raw, other.raw),
            _ => false,
        }
    }
}

impl<T, A: Allocator> Eq for Iter<'_, T, A> {}

impl<T, A: Allocator> Debug for Iter<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("slot", &self.current)
            .field("remaining", &self.remaining)
            .finish()
    }
}

/// An iterator yielding mutable references to the entries of a
/// [`HashTable`].
pub struct IterMut<'a, T, A: Allocator = Global> {
    raw: &'a RawTable<T, A>,
    cursor: usize,
    remaining: usize,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T, A: Allocator> Iterator for IterMut<'a, T, A> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: The cursor only moves forward, so each slot is handed out
        // once, and the table is exclusively borrowed for `'a`.
        let entry = unsafe { self.raw.next_mut(&mut self.cursor) }?;
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, A: Allocator> ExactSizeIterator for IterMut<'_, T, A> {}

impl<T, A: Allocator> FusedIterator for IterMut<'_, T, A> {}

/// A draining iterator over the entries of a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
/// It yields owned entries and empties the table as it iterates.
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, T, A: Allocator = Global> {
    raw: &'a mut RawTable<T, A>,
    cursor: usize,
}

impl<T, A: Allocator> Iterator for Drain<'_, T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.raw.take_next(&mut self.cursor)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.raw.len(), Some(self.raw.len()))
    }
}

impl<T, A: Allocator> ExactSizeIterator for Drain<'_, T, A> {}

impl<T, A: Allocator> FusedIterator for Drain<'_, T, A> {}

impl<T, A: Allocator> Drop for Drain<'_, T, A> {
    fn drop(&mut self) {
        self.raw.clear();
    }
}

/// An owning iterator over the entries of a [`HashTable`].
pub struct IntoIter<T, A: Allocator = Global> {
    raw: RawTable<T, A>,
    cursor: usize,
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.raw.take_next(&mut self.cursor)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.raw.len(), Some(self.raw.len()))
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}
