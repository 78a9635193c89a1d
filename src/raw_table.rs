//! The storage and probing engine underneath [`HashTable`](crate::HashTable).
//!
//! A `RawTable<T>` owns one allocation holding two index-aligned arrays: one
//! control byte per slot, followed by one `T`-sized slot per control byte.
//! The control byte is the only record of whether a slot holds a live value.
//!
//! The raw table knows nothing about keys. Every lookup is driven by a
//! precomputed 64-bit hash and an equality predicate, and every operation
//! that may move entries takes a `hasher` closure that recomputes an entry's
//! hash.

use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr;
use core::ptr::NonNull;

use scopeguard::ScopeGuard;
use scopeguard::guard;

use crate::allocator::Allocator;
use crate::allocator::do_alloc;
use crate::control;
use crate::control::EMPTY;
use crate::control::ERASED;
use crate::error::TryReserveError;
use crate::group::Group;

/// The smallest non-zero capacity of a table: two groups of slots.
pub const MIN_CAPACITY: usize = 2 * Group::WIDTH;

/// The fixed maximum ratio of live entries to slots.
pub const MAX_LOAD_FACTOR: f32 = 0.875;

/// Number of entries a table with `capacity` slots may hold.
#[inline(always)]
pub(crate) fn max_load(capacity: usize) -> usize {
    capacity - capacity / 8
}

/// Smallest valid non-zero capacity able to hold `entries` entries.
///
/// Returns `None` on overflow.
pub(crate) fn capacity_for_entries(entries: usize) -> Option<usize> {
    let slots = entries.checked_mul(8)?.div_ceil(7);
    slots.max(MIN_CAPACITY).checked_next_power_of_two()
}

/// Slot count to request so that `entries` entries fit without growing.
///
/// # Panics
///
/// Panics if the slot count overflows `usize`.
pub(crate) fn slots_for_entries(entries: usize) -> usize {
    if entries == 0 {
        return 0;
    }
    match capacity_for_entries(entries) {
        Some(capacity) => capacity,
        None => panic!("Hash table capacity overflow"),
    }
}

/// Capacity `rehash(min_capacity)` settles on for a table holding `len`
/// entries.
pub(crate) fn normalize_capacity(min_capacity: usize, len: usize) -> Option<usize> {
    if min_capacity == 0 && len == 0 {
        return Some(0);
    }
    let requested = min_capacity.max(MIN_CAPACITY).checked_next_power_of_two()?;
    Some(requested.max(capacity_for_entries(len)?))
}

/// Whether memory allocation errors should return an error or abort.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Fallibility {
    Fallible,
    Infallible,
}

impl Fallibility {
    /// Error to return on capacity overflow.
    #[inline]
    pub(crate) fn capacity_overflow(self) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::CapacityOverflow,
            Fallibility::Infallible => panic!("Hash table capacity overflow"),
        }
    }

    /// Error to return on allocation error.
    #[inline]
    pub(crate) fn alloc_err(self, layout: Layout) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::AllocError { layout },
            Fallibility::Infallible => handle_alloc_error(layout),
        }
    }
}

/// Unwraps the result of an operation run with [`Fallibility::Infallible`],
/// which reports failures by panicking or aborting instead.
#[inline(always)]
pub(crate) fn infallible<T>(result: Result<T, TryReserveError>) -> T {
    match result {
        Ok(value) => value,
        Err(_) => unreachable!("infallible table operation returned an error"),
    }
}

/// Result of looking a hash up with the intent to insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Lookup {
    /// The matching entry lives at this index.
    Occupied(usize),
    /// No match; the entry may be written at this free index.
    Vacant(usize),
}

/// Triangular walk over the groups of a table.
///
/// Group `g_{i+1} = g_i + i + 1 (mod group_count)`; for a power-of-two group
/// count the first `group_count` positions visit every group exactly once.
struct ProbeSeq {
    group: usize,
    stride: usize,
}

impl ProbeSeq {
    #[inline(always)]
    fn move_next(&mut self, group_mask: usize) {
        self.stride += 1;
        self.group = (self.group + self.stride) & group_mask;
    }
}

#[derive(Clone, Copy, Debug)]
struct DataLayout {
    layout: Layout,
    entries_offset: usize,
}

impl DataLayout {
    fn new<T>(capacity: usize) -> Option<Self> {
        let ctrl_layout = Layout::from_size_align(capacity, Group::WIDTH).ok()?;
        let entries_layout = Layout::array::<T>(capacity).ok()?;
        let (layout, entries_offset) = ctrl_layout.extend(entries_layout).ok()?;

        Some(DataLayout {
            layout: layout.pad_to_align(),
            entries_offset,
        })
    }
}

/// One control+entry allocation, or none for the zero-capacity state.
struct Storage {
    ptr: NonNull<u8>,
    layout: DataLayout,
    capacity: usize,
    group_shift: u32,
}

impl Storage {
    fn empty() -> Self {
        Storage {
            ptr: NonNull::dangling(),
            layout: DataLayout {
                layout: Layout::new::<()>(),
                entries_offset: 0,
            },
            capacity: 0,
            group_shift: 0,
        }
    }

    fn allocate<T, A: Allocator>(
        capacity: usize,
        alloc: &A,
        fallibility: Fallibility,
    ) -> Result<Self, TryReserveError> {
        debug_assert!(capacity >= MIN_CAPACITY && capacity.is_power_of_two());

        let layout = DataLayout::new::<T>(capacity).ok_or_else(|| fallibility.capacity_overflow())?;
        let ptr =
            do_alloc(alloc, layout.layout).map_err(|_| fallibility.alloc_err(layout.layout))?;

        // SAFETY: The allocation starts with `capacity` control bytes.
        unsafe { ptr::write_bytes(ptr.as_ptr(), EMPTY, capacity) };

        let groups = capacity / Group::WIDTH;
        Ok(Storage {
            ptr,
            layout,
            capacity,
            group_shift: u64::BITS - groups.trailing_zeros(),
        })
    }

    /// Returns the allocation to `alloc` without touching any entry.
    ///
    /// # Safety
    ///
    /// `alloc` must be the allocator (or a clone of it) this storage came
    /// from, and the storage must not be used afterwards.
    unsafe fn free<A: Allocator>(&self, alloc: &A) {
        if self.capacity != 0 {
            // SAFETY: Caller guarantees `alloc` produced this block with this layout.
            unsafe { alloc.deallocate(self.ptr, self.layout.layout) };
        }
    }

    #[inline(always)]
    fn group_mask(&self) -> usize {
        self.capacity / Group::WIDTH - 1
    }

    /// Group a probe for `hash` starts at: the top bits of the hash, so they
    /// are independent of the hashlet in the low bits.
    #[inline(always)]
    fn home_group(&self, hash: u64) -> usize {
        debug_assert!(self.capacity != 0);
        (hash >> self.group_shift) as usize
    }

    #[inline(always)]
    fn probe_seq(&self, hash: u64) -> ProbeSeq {
        ProbeSeq {
            group: self.home_group(hash),
            stride: 0,
        }
    }

    /// # Safety
    ///
    /// `group_index` must be below `capacity / Group::WIDTH`.
    #[inline(always)]
    unsafe fn group(&self, group_index: usize) -> Group {
        // SAFETY: Caller guarantees the group lies within the control array,
        // whose start is aligned to `Group::WIDTH`.
        unsafe { Group::load_aligned(self.ptr.as_ptr().add(group_index * Group::WIDTH)) }
    }

    /// # Safety
    ///
    /// `index` must be below `capacity`.
    #[inline(always)]
    unsafe fn ctrl(&self, index: usize) -> u8 {
        debug_assert!(index < self.capacity);
        // SAFETY: Caller ensures `index` is within the control array.
        unsafe { *self.ptr.as_ptr().add(index) }
    }

    /// # Safety
    ///
    /// `index` must be below `capacity`.
    #[inline(always)]
    unsafe fn set_ctrl(&mut self, index: usize, tag: u8) {
        debug_assert!(index < self.capacity);
        // SAFETY: Caller ensures `index` is within the control array.
        unsafe { *self.ptr.as_ptr().add(index) = tag };
    }

    #[inline(always)]
    fn entry_ptr<T>(&self, index: usize) -> *mut T {
        debug_assert!(index < self.capacity);
        // SAFETY: The entries array starts at `entries_offset` and holds
        // `capacity` slots; callers stay below `capacity`.
        unsafe {
            self.ptr
                .as_ptr()
                .add(self.layout.entries_offset)
                .cast::<T>()
                .add(index)
        }
    }

    /// First free (`EMPTY` or `ERASED`) slot on the probe path of `hash`.
    ///
    /// The table must have a non-zero capacity and at least one free slot.
    fn find_insert_slot(&self, hash: u64) -> usize {
        let mut probe = self.probe_seq(hash);
        for _ in 0..=self.group_mask() {
            // SAFETY: `probe.group` is always masked to the group count.
            let group = unsafe { self.group(probe.group) };
            if let Some(bit) = group.match_empty_or_erased().lowest_set_bit() {
                return probe.group * Group::WIDTH + bit;
            }
            probe.move_next(self.group_mask());
        }

        unreachable!("hash table below its maximum load has no free slot")
    }

    fn ctrl_bytes(&self) -> &[u8] {
        // SAFETY: The first `capacity` bytes of the allocation are initialized
        // control bytes; for the empty storage this is a zero-length slice.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.capacity) }
    }
}

pub(crate) struct RawTable<T, A: Allocator> {
    storage: Storage,
    populated: usize,
    erased: usize,
    alloc: A,
    _phantom: PhantomData<T>,
}

// SAFETY: The table owns its entries exclusively; sending it sends the
// entries and the allocator.
unsafe impl<T: Send, A: Allocator + Send> Send for RawTable<T, A> {}
// SAFETY: Shared access only hands out `&T` and `&A`.
unsafe impl<T: Sync, A: Allocator + Sync> Sync for RawTable<T, A> {}

impl<T, A: Allocator> RawTable<T, A> {
    pub(crate) fn new_in(alloc: A) -> Self {
        Self {
            storage: Storage::empty(),
            populated: 0,
            erased: 0,
            alloc,
            _phantom: PhantomData,
        }
    }

    pub(crate) fn try_with_capacity_in(
        min_capacity: usize,
        alloc: A,
        fallibility: Fallibility,
    ) -> Result<Self, TryReserveError> {
        let capacity =
            normalize_capacity(min_capacity, 0).ok_or_else(|| fallibility.capacity_overflow())?;
        if capacity == 0 {
            return Ok(Self::new_in(alloc));
        }

        log::trace!("allocating hash table storage of {capacity} slots");
        let storage = Storage::allocate::<T, A>(capacity, &alloc, fallibility)?;

        Ok(Self {
            storage,
            populated: 0,
            erased: 0,
            alloc,
            _phantom: PhantomData,
        })
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.populated
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.storage.capacity
    }

    #[inline(always)]
    pub(crate) fn tombstones(&self) -> usize {
        self.erased
    }

    #[inline(always)]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Slots that may still turn from `EMPTY` into used without a rebuild.
    #[inline(always)]
    fn growth_left(&self) -> usize {
        max_load(self.capacity()) - self.populated - self.erased
    }

    /// Returns `true` if `index` is in range and holds a live entry.
    #[inline]
    pub(crate) fn is_occupied(&self, index: usize) -> bool {
        // SAFETY: Bounds checked first.
        index < self.capacity() && control::is_full(unsafe { self.storage.ctrl(index) })
    }

    /// # Safety
    ///
    /// `index` must refer to an occupied slot.
    #[inline(always)]
    pub(crate) unsafe fn get(&self, index: usize) -> &T {
        debug_assert!(self.is_occupied(index));
        // SAFETY: Caller guarantees the slot is occupied, hence initialized.
        unsafe { &*self.storage.entry_ptr::<T>(index) }
    }

    /// # Safety
    ///
    /// `index` must refer to an occupied slot.
    #[inline(always)]
    pub(crate) unsafe fn get_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(self.is_occupied(index));
        // SAFETY: Caller guarantees the slot is occupied, hence initialized.
        unsafe { &mut *self.storage.entry_ptr::<T>(index) }
    }

    /// # Safety
    ///
    /// `index` must refer to an occupied slot, and the returned reference must
    /// not alias another live reference to the same slot.
    #[inline(always)]
    unsafe fn get_unchecked_mut<'a>(&self, index: usize) -> &'a mut T {
        // SAFETY: Caller guarantees the slot is occupied and unaliased.
        unsafe { &mut *self.storage.entry_ptr::<T>(index) }
    }

    /// Finds the index of the entry with `hash` for which `eq` holds.
    #[inline]
    pub(crate) fn find(&self, hash: u64, mut eq: impl FnMut(&T) -> bool) -> Option<usize> {
        if self.populated == 0 {
            return None;
        }

        let tag = control::hashlet(hash);
        let group_mask = self.storage.group_mask();
        let mut probe = self.storage.probe_seq(hash);
        for _ in 0..=group_mask {
            // SAFETY: `probe.group` is masked to the group count.
            let group = unsafe { self.storage.group(probe.group) };
            let base = probe.group * Group::WIDTH;

            for bit in group.match_tag(tag) {
                // SAFETY: A matching hashlet marks an occupied slot in range.
                if eq(unsafe { self.get(base + bit) }) {
                    return Some(base + bit);
                }
            }

            if group.match_empty().any_bit_set() {
                return None;
            }
            probe.move_next(group_mask);
        }

        None
    }

    /// Like [`find`](Self::find), but on a miss also reports the first free
    /// slot seen on the probe path.
    fn find_or_candidate(
        &self,
        hash: u64,
        mut eq: impl FnMut(&T) -> bool,
    ) -> Result<usize, Option<usize>> {
        if self.capacity() == 0 {
            return Err(None);
        }

        let tag = control::hashlet(hash);
        let group_mask = self.storage.group_mask();
        let mut probe = self.storage.probe_seq(hash);
        let mut candidate = None;
        for _ in 0..=group_mask {
            // SAFETY: `probe.group` is masked to the group count.
            let group = unsafe { self.storage.group(probe.group) };
            let base = probe.group * Group::WIDTH;

            for bit in group.match_tag(tag) {
                // SAFETY: A matching hashlet marks an occupied slot in range.
                if eq(unsafe { self.get(base + bit) }) {
                    return Ok(base + bit);
                }
            }

            if candidate.is_none() {
                candidate = group
                    .match_empty_or_erased()
                    .lowest_set_bit()
                    .map(|bit| base + bit);
            }
            if group.match_empty().any_bit_set() {
                return Err(candidate);
            }
            probe.move_next(group_mask);
        }

        Err(candidate)
    }

    /// Looks `hash` up and, if absent, makes sure there is room to insert it.
    ///
    /// A hit never changes the table. A miss may rebuild the table first (to
    /// grow, or to purge tombstones when no `EMPTY` slot may be consumed),
    /// in which case the returned slot is recomputed for the new storage.
    pub(crate) fn find_or_prepare_insert(
        &mut self,
        hash: u64,
        eq: impl FnMut(&T) -> bool,
        hasher: impl Fn(&T) -> u64,
        fallibility: Fallibility,
    ) -> Result<Lookup, TryReserveError> {
        match self.find_or_candidate(hash, eq) {
            Ok(index) => Ok(Lookup::Occupied(index)),
            Err(Some(index)) if !self.needs_rebuild_to_use(index) => Ok(Lookup::Vacant(index)),
            Err(_) => {
                self.reserve_for_insert(&hasher, fallibility)?;
                Ok(Lookup::Vacant(self.storage.find_insert_slot(hash)))
            }
        }
    }

    #[inline]
    fn needs_rebuild_to_use(&self, index: usize) -> bool {
        if self.populated + 1 > max_load(self.capacity()) {
            return true;
        }
        // SAFETY: `index` came from a probe of the current storage.
        let reuses_tombstone = unsafe { self.storage.ctrl(index) } == ERASED;
        !reuses_tombstone && self.growth_left() == 0
    }

    #[cold]
    #[inline(never)]
    fn reserve_for_insert(
        &mut self,
        hasher: &impl Fn(&T) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        let new_items = self
            .populated
            .checked_add(1)
            .ok_or_else(|| fallibility.capacity_overflow())?;
        let full_capacity = max_load(self.capacity());

        if new_items <= full_capacity / 2 {
            // Plenty of room once the tombstones are gone.
            self.resize(self.capacity(), hasher, fallibility)
        } else {
            let target = capacity_for_entries(new_items.max(full_capacity + 1))
                .ok_or_else(|| fallibility.capacity_overflow())?;
            self.resize(target, hasher, fallibility)
        }
    }

    /// Writes `value` into the free slot `index`.
    ///
    /// # Safety
    ///
    /// `index` must be a free slot returned by
    /// [`find_or_prepare_insert`](Self::find_or_prepare_insert) for `hash`,
    /// with no intervening mutation of the table.
    #[inline]
    pub(crate) unsafe fn insert_at(&mut self, index: usize, hash: u64, value: T) -> &mut T {
        // SAFETY: Caller guarantees `index` is a free slot in range.
        unsafe {
            let old = self.storage.ctrl(index);
            debug_assert!(control::is_special(old));
            if old == ERASED {
                self.erased -= 1;
            }
            debug_assert!(old == ERASED || self.growth_left() > 0);

            let slot = self.storage.entry_ptr::<T>(index);
            slot.write(value);
            self.storage.set_ctrl(index, control::hashlet(hash));
            self.populated += 1;
            debug_assert!(self.populated <= max_load(self.capacity()));
            &mut *slot
        }
    }

    /// Moves the entry at `index` out and leaves a tombstone behind.
    ///
    /// # Safety
    ///
    /// `index` must refer to an occupied slot.
    #[inline]
    pub(crate) unsafe fn erase_at(&mut self, index: usize) -> T {
        debug_assert!(self.is_occupied(index));
        // SAFETY: Caller guarantees the slot is occupied, hence initialized.
        // The tombstone is written right after the read, so the value can
        // never be observed or dropped twice.
        unsafe {
            let value = self.storage.entry_ptr::<T>(index).read();
            self.storage.set_ctrl(index, ERASED);
            self.populated -= 1;
            self.erased += 1;
            value
        }
    }

    /// Index of the first occupied slot at or after `from`.
    pub(crate) fn next_full(&self, from: usize) -> Option<usize> {
        if from >= self.capacity() || self.populated == 0 {
            return None;
        }

        let mut group_index = from / Group::WIDTH;
        let mut offset = from % Group::WIDTH;
        while group_index <= self.storage.group_mask() {
            // SAFETY: `group_index` is bounded by the group count.
            let group = unsafe { self.storage.group(group_index) };
            if let Some(bit) = group.match_full().from_offset(offset).lowest_set_bit() {
                return Some(group_index * Group::WIDTH + bit);
            }
            group_index += 1;
            offset = 0;
        }

        None
    }

    /// Moves out the first entry at or after `*cursor` and advances the
    /// cursor past it.
    pub(crate) fn take_next(&mut self, cursor: &mut usize) -> Option<T> {
        let index = self.next_full(*cursor)?;
        *cursor = index + 1;
        // SAFETY: `next_full` only returns occupied slots.
        Some(unsafe { self.erase_at(index) })
    }

    /// Hands out `&mut` to the entry at the first occupied slot at or after
    /// `*cursor`, advancing the cursor past it.
    ///
    /// # Safety
    ///
    /// Each slot must be handed out at most once while the references live,
    /// and the table must not be mutated through other paths meanwhile.
    pub(crate) unsafe fn next_mut<'a>(&self, cursor: &mut usize) -> Option<&'a mut T> {
        let index = self.next_full(*cursor)?;
        *cursor = index + 1;
        // SAFETY: Occupied slot; uniqueness guaranteed by the caller.
        Some(unsafe { self.get_unchecked_mut(index) })
    }

    /// Changes the capacity according to `rehash(min_capacity)` semantics.
    pub(crate) fn rehash(
        &mut self,
        min_capacity: usize,
        hasher: impl Fn(&T) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        let target = normalize_capacity(min_capacity, self.populated)
            .ok_or_else(|| fallibility.capacity_overflow())?;
        if target == self.capacity() {
            return Ok(());
        }
        if target == 0 {
            debug_assert_eq!(self.populated, 0);
            self.release();
            return Ok(());
        }

        self.resize(target, &hasher, fallibility)
    }

    /// Grows, if needed, so that `entries` entries fit without a rebuild.
    pub(crate) fn reserve(
        &mut self,
        entries: usize,
        hasher: impl Fn(&T) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        if entries <= max_load(self.capacity()) {
            return Ok(());
        }
        let target = capacity_for_entries(entries).ok_or_else(|| fallibility.capacity_overflow())?;
        self.rehash(target, hasher, fallibility)
    }

    /// Moves every live entry into fresh storage of `new_capacity` slots.
    ///
    /// Entries are copied bitwise, and until the final swap the old storage
    /// still owns all of them: if `hasher` unwinds, only the new block is
    /// released and the table is untouched.
    fn resize(
        &mut self,
        new_capacity: usize,
        hasher: &impl Fn(&T) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), TryReserveError> {
        debug_assert!(self.populated <= max_load(new_capacity));

        let new_storage = Storage::allocate::<T, A>(new_capacity, &self.alloc, fallibility)?;
        log::trace!(
            "resizing hash table from {} to {} slots ({} entries, {} tombstones purged)",
            self.capacity(),
            new_capacity,
            self.populated,
            self.tombstones()
        );

        let alloc = &self.alloc;
        // SAFETY: The new storage came from `alloc` and is dropped only here.
        let mut new_storage = guard(new_storage, |storage| unsafe { storage.free(alloc) });

        let mut cursor = 0;
        while let Some(index) = self.next_full(cursor) {
            cursor = index + 1;
            // SAFETY: `next_full` only returns occupied slots.
            let hash = hasher(unsafe { self.get(index) });
            let dst = new_storage.find_insert_slot(hash);
            // SAFETY: `dst` is a free slot of the new storage and `index` an
            // occupied slot of the old; the two blocks never overlap.
            unsafe {
                ptr::copy_nonoverlapping(
                    self.storage.entry_ptr::<T>(index),
                    new_storage.entry_ptr::<T>(dst),
                    1,
                );
                new_storage.set_ctrl(dst, control::hashlet(hash));
            }
        }

        let new_storage = ScopeGuard::into_inner(new_storage);
        let old_storage = mem::replace(&mut self.storage, new_storage);
        self.erased = 0;
        // SAFETY: Every entry of the old storage now lives in the new one, so
        // the block is released without dropping anything.
        unsafe { old_storage.free(&self.alloc) };

        Ok(())
    }

    /// Marks every slot `EMPTY` without dropping anything.
    fn clear_no_drop(&mut self) {
        if self.capacity() != 0 {
            // SAFETY: The control array has `capacity` bytes.
            unsafe { ptr::write_bytes(self.storage.ptr.as_ptr(), EMPTY, self.capacity()) };
        }
        self.populated = 0;
        self.erased = 0;
    }

    /// Drops every live entry in place.
    ///
    /// # Safety
    ///
    /// Afterwards the control bytes still claim the dropped slots; callers
    /// must reset or free the storage.
    unsafe fn drop_elements(&mut self) {
        if mem::needs_drop::<T>() && self.populated != 0 {
            let mut cursor = 0;
            while let Some(index) = self.next_full(cursor) {
                cursor = index + 1;
                // SAFETY: Occupied slot, dropped exactly once.
                unsafe { ptr::drop_in_place(self.storage.entry_ptr::<T>(index)) };
            }
        }
    }

    /// Drops all entries and resets all slots to `EMPTY`, keeping the
    /// storage.
    pub(crate) fn clear(&mut self) {
        if self.populated == 0 && self.erased == 0 {
            return;
        }
        // Even if a destructor unwinds, the control bytes end up `EMPTY` and
        // the remaining entries are leaked rather than double-dropped.
        let mut self_ = guard(self, |self_| self_.clear_no_drop());
        // SAFETY: The guard resets the control bytes afterwards.
        unsafe { self_.drop_elements() };
    }

    /// Releases the storage of an empty table.
    fn release(&mut self) {
        debug_assert_eq!(self.populated, 0);
        if self.capacity() != 0 {
            log::trace!("releasing hash table storage of {} slots", self.capacity());
        }
        let old_storage = mem::replace(&mut self.storage, Storage::empty());
        self.erased = 0;
        // SAFETY: The table holds no entries; the block came from `self.alloc`.
        unsafe { old_storage.free(&self.alloc) };
    }

    /// Drops all entries and returns to the zero-capacity state.
    pub(crate) fn reset(&mut self) {
        self.clear();
        self.release();
    }

    /// Erases every entry for which `keep` returns `false`.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&mut T) -> bool) {
        let mut cursor = 0;
        while let Some(index) = self.next_full(cursor) {
            cursor = index + 1;
            // SAFETY: `next_full` only returns occupied slots.
            if !keep(unsafe { self.get_mut(index) }) {
                // SAFETY: Still occupied; `keep` cannot reach the table.
                drop(unsafe { self.erase_at(index) });
            }
        }
    }

    /// Per-entry number of extra groups probed past the home group.
    #[cfg(any(test, feature = "stats"))]
    pub(crate) fn probe_histogram(&self, hasher: impl Fn(&T) -> u64) -> ProbeHistogram {
        let mut bins = alloc::vec::Vec::new();
        let mut cursor = 0;
        while let Some(index) = self.next_full(cursor) {
            cursor = index + 1;
            // SAFETY: `next_full` only returns occupied slots.
            let hash = hasher(unsafe { self.get(index) });
            let target = index / Group::WIDTH;

            let mut probe = self.storage.probe_seq(hash);
            let mut distance = 0;
            while probe.group != target {
                probe.move_next(self.storage.group_mask());
                distance += 1;
            }

            if bins.len() <= distance {
                bins.resize(distance + 1, 0);
            }
            bins[distance] += 1;
        }

        ProbeHistogram {
            bins,
            populated: self.populated,
        }
    }

    /// Returns detailed utilization statistics.
    #[cfg(any(test, feature = "stats"))]
    pub(crate) fn debug_stats(&self) -> DebugStats {
        let capacity = self.capacity();
        let empty_slots = capacity - self.populated - self.erased;
        let groups_with_empty = (0..capacity / Group::WIDTH)
            // SAFETY: Bounded by the group count.
            .filter(|&g| unsafe { self.storage.group(g) }.match_empty().any_bit_set())
            .count();

        DebugStats {
            populated: self.populated,
            capacity,
            max_load: max_load(capacity),
            tombstones: self.tombstones(),
            empty_slots,
            groups: capacity / Group::WIDTH,
            groups_with_empty,
            load_factor: if capacity == 0 {
                0.0
            } else {
                self.populated as f64 / capacity as f64
            },
            total_bytes: if capacity == 0 {
                0
            } else {
                self.storage.layout.layout.size()
            },
            wasted_bytes: (capacity - self.populated) * mem::size_of::<T>(),
        }
    }
}

impl<T, A: Allocator> Drop for RawTable<T, A> {
    fn drop(&mut self) {
        // SAFETY: The storage is released right after; nothing reads the
        // stale control bytes.
        unsafe {
            self.drop_elements();
            self.storage.free(&self.alloc);
        }
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for RawTable<T, A> {
    /// Deep copy with identical geometry: every entry is cloned into the
    /// same slot index, and tombstones are preserved.
    fn clone(&self) -> Self {
        let mut new_table = infallible(Self::try_with_capacity_in(
            self.capacity(),
            self.alloc.clone(),
            Fallibility::Infallible,
        ));
        debug_assert_eq!(new_table.capacity(), self.capacity());

        // The new table only claims an entry once it has been written, so a
        // panicking `clone` drops exactly the entries cloned so far.
        for (index, &tag) in self.storage.ctrl_bytes().iter().enumerate() {
            if control::is_full(tag) {
                // SAFETY: `tag` marks an occupied slot.
                let value = unsafe { self.get(index) }.clone();
                // SAFETY: Same geometry; the slot is still `EMPTY` in the copy.
                unsafe {
                    new_table.storage.entry_ptr::<T>(index).write(value);
                    new_table.storage.set_ctrl(index, tag);
                }
                new_table.populated += 1;
            } else if tag == ERASED {
                // SAFETY: Same geometry.
                unsafe { new_table.storage.set_ctrl(index, ERASED) };
                new_table.erased += 1;
            }
        }

        debug_assert_eq!(new_table.populated, self.populated);
        new_table
    }
}

impl<T, A: Allocator> fmt::Debug for RawTable<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use alloc::format;
        use alloc::string::String;
        use alloc::vec::Vec;

        let groups = self
            .storage
            .ctrl_bytes()
            .chunks(Group::WIDTH)
            .map(|group| {
                group
                    .iter()
                    .map(|&tag| match tag {
                        EMPTY => String::from(".."),
                        ERASED => String::from("xx"),
                        tag => format!("{tag:02x}"),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>();

        f.debug_struct("RawTable")
            .field("control", &groups)
            .field("populated", &self.populated)
            .field("tombstones", &self.erased)
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Debug statistics for hash table analysis.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live entries.
    pub populated: usize,
    /// Number of slots.
    pub capacity: usize,
    /// Number of entries the table may hold before it grows.
    pub max_load: usize,
    /// Number of erased slots awaiting reuse.
    pub tombstones: usize,
    /// Number of never-used slots.
    pub empty_slots: usize,
    /// Number of control groups.
    pub groups: usize,
    /// Groups that still contain an `EMPTY` slot (where misses stop).
    pub groups_with_empty: usize,
    /// `populated / capacity`.
    pub load_factor: f64,
    /// Bytes held by the control and entry arrays.
    pub total_bytes: usize,
    /// Bytes of entry slots not holding a live entry.
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} slots ({:.2}% load factor, grows past {})",
            self.populated,
            self.capacity,
            self.load_factor * 100.0,
            self.max_load
        );
        println!(
            "Free slots: {} empty, {} tombstones",
            self.empty_slots, self.tombstones
        );
        println!(
            "Groups: {}/{} still hold an empty slot",
            self.groups_with_empty, self.groups
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// Histogram of probe distances, in groups past each entry's home group.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    /// `bins[d]` is the number of entries found `d` groups past their home
    /// group.
    pub bins: alloc::vec::Vec<usize>,
    /// Number of entries counted.
    pub populated: usize,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Largest probe distance of any entry.
    pub fn max_distance(&self) -> usize {
        self.bins.len().saturating_sub(1)
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.bins.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("probe histogram ({} entries):", self.populated);

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = match units % 8 {
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                7 => Some('▉'),
                _ => None,
            };
            bar.extend(partial);
            bar
        };

        for (distance, &count) in self.bins.iter().enumerate() {
            println!("{:>3} | {} ({})", distance, make_bar(count), count);
        }
    }
}
