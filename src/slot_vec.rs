//! Provides [`SlotVec`] - growable storage addressed by generation-checked handles.
//!
//! # Example
//!
//! ```rust
//! use slotted::{Error, SlotVec};
//!
//! let mut nodes = SlotVec::with_capacity(2);
//! let a = nodes.push("a");
//! let b = nodes.push("b");
//! let c = nodes.push("c"); // Grows the buffer, `a` and `b` stay valid.
//!
//! assert_eq!(nodes[a], "a");
//! assert_eq!(nodes.pop(b), Ok("b"));
//! assert!(matches!(nodes.at(b), Err(Error::InvalidHandle { .. })));
//!
//! // Slot of "b" is reused, but the new value goes to the end of iteration order.
//! let d = nodes.push("d");
//! assert_eq!(d.index(), b.index());
//! assert!(nodes.at(b).is_err());
//! assert_eq!(nodes.iter().copied().collect::<Vec<_>>(), ["a", "c", "d"]);
//! # let _ = c;
//! ```

use core::{
    fmt,
    hash::{Hash, Hasher},
    iter::FusedIterator,
    ops::{Index, IndexMut},
};

use allocator_api2::alloc::{Allocator, Global};

use crate::{
    alloc_failure,
    cursor::{Cursor, CursorMut},
    error::Error,
    handle::Handle,
    invalid_handle,
    iter::{Entries, EntriesMut, Handles, Iter, IterMut},
    raw::RawSlots,
    slot::{NIL, Slot},
};

/// Vector-like container that addresses its values by [`Handle`]s.
///
/// Values live in a contiguous buffer of slots that grows geometrically.
/// Removing a value frees its slot for reuse in O(1),
/// and a per-slot generation counter makes sure that handles of removed values
/// never resolve to values inserted later into the same slot.
///
/// Growing the buffer moves slot records index-for-index,
/// so it never invalidates handles, only borrows, which the borrow checker already rules out.
///
/// Iteration follows insertion order rather than slot order.
/// Value inserted into a reused slot is placed after all values inserted before it.
pub struct SlotVec<T, A: Allocator = Global> {
    raw: RawSlots<T, A>,
}

impl<T> SlotVec<T> {
    /// Creates new empty container.
    /// Does not allocate.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        SlotVec {
            raw: RawSlots::new_in(Global),
        }
    }

    /// Creates new empty container with space for at least `cap` values.
    ///
    /// # Panics
    ///
    /// Panics if capacity overflows, calls allocation error handler if allocation fails.
    #[inline]
    #[must_use]
    pub fn with_capacity(cap: usize) -> Self {
        SlotVec::with_capacity_in(cap, Global)
    }
}

impl<T> Default for SlotVec<T> {
    #[inline]
    fn default() -> Self {
        SlotVec::new()
    }
}

impl<T, A> SlotVec<T, A>
where
    A: Allocator,
{
    /// Creates new empty container that allocates from `alloc`.
    /// Does not allocate.
    #[inline]
    pub const fn new_in(alloc: A) -> Self {
        SlotVec {
            raw: RawSlots::new_in(alloc),
        }
    }

    /// Creates new empty container with space for at least `cap` values
    /// that allocates from `alloc`.
    ///
    /// # Panics
    ///
    /// Panics if capacity overflows, calls allocation error handler if allocation fails.
    #[inline]
    pub fn with_capacity_in(cap: usize, alloc: A) -> Self {
        match SlotVec::try_with_capacity_in(cap, alloc) {
            Ok(vec) => vec,
            Err(err) => alloc_failure(err),
        }
    }

    /// Creates new empty container with space for at least `cap` values
    /// that allocates from `alloc`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] or [`Error::CapacityOverflow`]
    /// if the buffer cannot be allocated.
    #[inline]
    pub fn try_with_capacity_in(cap: usize, alloc: A) -> Result<Self, Error> {
        Ok(SlotVec {
            raw: RawSlots::try_with_capacity_in(cap, alloc)?,
        })
    }

    /// Creates container with `n` clones of `value` and capacity for exactly `n` values.
    #[must_use]
    pub fn from_elem_in(value: T, n: usize, alloc: A) -> Self
    where
        T: Clone,
    {
        let mut vec = SlotVec::with_capacity_in(n, alloc);
        if n > 0 {
            for _ in 1..n {
                vec.push(value.clone());
            }
            vec.push(value);
        }
        vec
    }

    /// Returns reference to the allocator.
    #[inline(always)]
    pub fn allocator(&self) -> &A {
        self.raw.allocator()
    }

    /// Returns number of values in the container.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    /// Returns number of slots the buffer holds.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Returns number of slots that ever held a value.
    ///
    /// Handles with index at or above this value are reported as [`Error::OutOfRange`].
    #[inline(always)]
    pub fn slots_initialized(&self) -> usize {
        self.raw.initialized()
    }

    /// Grows the buffer to hold at least `cap` slots in total.
    /// Does nothing if capacity is already sufficient.
    ///
    /// Handles stay valid.
    ///
    /// # Panics
    ///
    /// Panics if capacity overflows, calls allocation error handler if allocation fails.
    pub fn reserve(&mut self, cap: usize) {
        if let Err(err) = self.raw.try_reserve(cap) {
            alloc_failure(err);
        }
    }

    /// Grows the buffer to hold at least `cap` slots in total.
    /// Does nothing if capacity is already sufficient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] or [`Error::CapacityOverflow`]
    /// if the buffer cannot be grown. The container is left unchanged.
    #[inline]
    pub fn try_reserve(&mut self, cap: usize) -> Result<(), Error> {
        self.raw.try_reserve(cap)
    }

    /// Shrinks the buffer down to slots that ever held a value.
    ///
    /// Handles stay valid.
    ///
    /// # Panics
    ///
    /// Calls allocation error handler if allocation fails.
    pub fn shrink_to_fit(&mut self) {
        if let Err(err) = self.raw.try_shrink_to_fit() {
            alloc_failure(err);
        }
    }

    /// Shrinks the buffer down to slots that ever held a value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] if the smaller buffer cannot be allocated.
    /// The container keeps its current buffer in this case.
    #[inline]
    pub fn try_shrink_to_fit(&mut self) -> Result<(), Error> {
        self.raw.try_shrink_to_fit()
    }

    /// Inserts value produced by `f` and returns its handle.
    ///
    /// The buffer is grown before `f` is called.
    /// If `f` panics, no slot is claimed.
    ///
    /// # Panics
    ///
    /// Panics if capacity overflows, calls allocation error handler if allocation fails.
    #[inline]
    pub fn insert_with(&mut self, f: impl FnOnce() -> T) -> Handle<T> {
        self.insert_with_handle(|_| f())
    }

    /// Inserts value produced by `f` and returns its handle.
    ///
    /// `f` receives the handle the value will have.
    /// It allows values to store handles to themselves.
    ///
    /// # Panics
    ///
    /// Panics if capacity overflows, calls allocation error handler if allocation fails.
    pub fn insert_with_handle(&mut self, f: impl FnOnce(Handle<T>) -> T) -> Handle<T> {
        match self.try_insert_with_handle(f) {
            Ok(handle) => handle,
            Err(err) => alloc_failure(err),
        }
    }

    /// Inserts value produced by `f` and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] or [`Error::CapacityOverflow`]
    /// if the buffer cannot be grown. `f` is not called in this case.
    #[inline]
    pub fn try_insert_with(&mut self, f: impl FnOnce() -> T) -> Result<Handle<T>, Error> {
        self.try_insert_with_handle(|_| f())
    }

    /// Inserts value produced by `f` and returns its handle.
    /// `f` receives the handle the value will have.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllocationFailure`] or [`Error::CapacityOverflow`]
    /// if the buffer cannot be grown. `f` is not called in this case.
    pub fn try_insert_with_handle(
        &mut self,
        f: impl FnOnce(Handle<T>) -> T,
    ) -> Result<Handle<T>, Error> {
        self.raw.try_reserve_for_insert()?;

        let (index, generation) = self.raw.next_vacancy(0);
        let handle = make_handle(index, generation);

        // Nothing is modified until value is constructed.
        let value = f(handle);

        let inserted = self.raw.insert(value, 0);
        debug_assert_eq!(inserted, (index, generation));
        Ok(handle)
    }

    /// Inserts value and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if capacity overflows, calls allocation error handler if allocation fails.
    #[inline]
    pub fn push(&mut self, value: T) -> Handle<T> {
        self.insert_with(move || value)
    }

    /// Inserts value and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns the value back if the buffer cannot be grown.
    pub fn try_push(&mut self, value: T) -> Result<Handle<T>, T> {
        if self.raw.try_reserve_for_insert().is_err() {
            return Err(value);
        }
        let (index, generation) = self.raw.insert(value, 0);
        Ok(make_handle(index, generation))
    }

    /// Removes value referred by handle and returns it.
    ///
    /// Slot is freed for reuse, the handle never resolves again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] or [`Error::InvalidHandle`]
    /// if handle does not refer to a live value. The container is left unchanged.
    pub fn pop(&mut self, handle: Handle<T>) -> Result<T, Error> {
        let index = self.raw.locate(handle.index(), handle.generation())?;
        Ok(self.raw.take(index))
    }

    /// Removes and drops value referred by handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] or [`Error::InvalidHandle`]
    /// if handle does not refer to a live value.
    #[inline]
    pub fn remove(&mut self, handle: Handle<T>) -> Result<(), Error> {
        self.pop(handle).map(drop)
    }

    /// Drops all values.
    ///
    /// Keeps capacity. All previously issued handles become invalid,
    /// freed slots are reused starting from the lowest index.
    #[inline]
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Keeps only values for which `f` returns `true`.
    /// Values are visited in iteration order.
    pub fn retain(&mut self, mut f: impl FnMut(Handle<T>, &mut T) -> bool) {
        let mut index = self.raw.head();
        while index != NIL {
            let slot = &mut self.raw.slots_mut()[index];
            let next = slot.next;
            let handle = make_handle(index, slot.generation());

            // Safety: chain contains only active slots.
            let keep = f(handle, unsafe { slot.occupied_mut() });
            if !keep {
                drop(self.raw.take(index));
            }
            index = next;
        }
    }

    /// Removes all values and returns them in iteration order.
    ///
    /// Values not consumed before the iterator is dropped are dropped with it.
    /// Keeps capacity.
    pub fn drain(&mut self) -> Drain<'_, T, A> {
        Drain { raw: &mut self.raw }
    }

    /// Checks whether handle refers to a live value.
    #[inline]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.raw.locate(handle.index(), handle.generation()).is_ok()
    }

    /// Returns reference to the value referred by handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if handle index is outside of initialized slots
    /// and [`Error::InvalidHandle`] if the slot is vacant or was reused.
    #[inline]
    pub fn at(&self, handle: Handle<T>) -> Result<&T, Error> {
        let index = self.raw.locate(handle.index(), handle.generation())?;
        // Safety: `locate` returns active slots only.
        Ok(unsafe { self.raw.slots()[index].occupied_ref() })
    }

    /// Returns mutable reference to the value referred by handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] if handle index is outside of initialized slots
    /// and [`Error::InvalidHandle`] if the slot is vacant or was reused.
    #[inline]
    pub fn at_mut(&mut self, handle: Handle<T>) -> Result<&mut T, Error> {
        let index = self.raw.locate(handle.index(), handle.generation())?;
        // Safety: `locate` returns active slots only.
        Ok(unsafe { self.raw.slots_mut()[index].occupied_mut() })
    }

    /// Returns reference to the value referred by handle,
    /// or `None` if handle does not resolve.
    #[inline]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.at(handle).ok()
    }

    /// Returns mutable reference to the value referred by handle,
    /// or `None` if handle does not resolve.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.at_mut(handle).ok()
    }

    /// Returns reference to the value referred by handle without any checks.
    ///
    /// # Safety
    ///
    /// Handle must refer to a live value of this container.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, handle: Handle<T>) -> &T {
        debug_assert!(self.contains(handle));
        unsafe {
            self.raw
                .slots()
                .get_unchecked(handle.index())
                .occupied_ref()
        }
    }

    /// Returns mutable reference to the value referred by handle without any checks.
    ///
    /// # Safety
    ///
    /// Handle must refer to a live value of this container.
    #[inline(always)]
    pub unsafe fn get_unchecked_mut(&mut self, handle: Handle<T>) -> &mut T {
        debug_assert!(self.contains(handle));
        unsafe {
            self.raw
                .slots_mut()
                .get_unchecked_mut(handle.index())
                .occupied_mut()
        }
    }

    /// Returns mutable references to values referred by several handles at once.
    ///
    /// # Errors
    ///
    /// Fails if any handle does not resolve,
    /// or with [`Error::Aliased`] if two handles refer to the same slot.
    pub fn get_disjoint_mut<const N: usize>(
        &mut self,
        handles: [Handle<T>; N],
    ) -> Result<[&mut T; N], Error> {
        let mut indices = [0; N];
        for (i, handle) in handles.iter().enumerate() {
            let index = self.raw.locate(handle.index(), handle.generation())?;
            if indices[..i].contains(&index) {
                return Err(Error::Aliased { index });
            }
            indices[i] = index;
        }

        let ptr = self.raw.as_mut_ptr();

        // Safety: all indices refer to distinct active slots.
        Ok(indices.map(|index| unsafe { &mut *Slot::value_ptr(ptr.add(index)) }))
    }

    /// Returns handle of the live value at slot `index`.
    ///
    /// This is reverse lookup for positions obtained from cursors or raw indices.
    #[inline]
    pub fn get_handle(&self, index: usize) -> Option<Handle<T>> {
        match self.raw.slots().get(index) {
            Some(slot) if slot.is_active() => Some(make_handle(index, slot.generation())),
            _ => None,
        }
    }

    /// Returns handle of the first value in iteration order.
    #[inline]
    pub fn first(&self) -> Option<Handle<T>> {
        self.get_handle(self.raw.head())
    }

    /// Returns handle of the last value in iteration order.
    #[inline]
    pub fn last(&self) -> Option<Handle<T>> {
        self.get_handle(self.raw.tail())
    }

    /// Returns iterator over values in insertion order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.raw)
    }

    /// Returns iterator over mutable values in insertion order.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(&mut self.raw)
    }

    /// Returns iterator over handles in insertion order.
    #[inline]
    pub fn handles(&self) -> Handles<'_, T> {
        Handles::new(&self.raw)
    }

    /// Returns iterator over handles and values in insertion order.
    #[inline]
    pub fn iter_with_handles(&self) -> Entries<'_, T> {
        Entries::new(&self.raw)
    }

    /// Returns iterator over handles and mutable values in insertion order.
    #[inline]
    pub fn iter_mut_with_handles(&mut self) -> EntriesMut<'_, T> {
        EntriesMut::new(&mut self.raw)
    }

    /// Returns cursor pointing to the first value,
    /// or to the ghost position if container is empty.
    #[inline]
    pub fn cursor_front(&self) -> Cursor<'_, T, A> {
        Cursor::new(&self.raw, self.raw.head())
    }

    /// Returns cursor pointing to the last value,
    /// or to the ghost position if container is empty.
    #[inline]
    pub fn cursor_back(&self) -> Cursor<'_, T, A> {
        Cursor::new(&self.raw, self.raw.tail())
    }

    /// Returns cursor pointing to the value referred by handle.
    ///
    /// # Errors
    ///
    /// Fails if handle does not resolve.
    #[inline]
    pub fn cursor_at(&self, handle: Handle<T>) -> Result<Cursor<'_, T, A>, Error> {
        let index = self.raw.locate(handle.index(), handle.generation())?;
        Ok(Cursor::new(&self.raw, index))
    }

    /// Returns mutable cursor pointing to the first value,
    /// or to the ghost position if container is empty.
    #[inline]
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T, A> {
        let head = self.raw.head();
        CursorMut::new(&mut self.raw, head)
    }

    /// Returns mutable cursor pointing to the last value,
    /// or to the ghost position if container is empty.
    #[inline]
    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, T, A> {
        let tail = self.raw.tail();
        CursorMut::new(&mut self.raw, tail)
    }

    /// Returns mutable cursor pointing to the value referred by handle.
    ///
    /// # Errors
    ///
    /// Fails if handle does not resolve.
    #[inline]
    pub fn cursor_at_mut(&mut self, handle: Handle<T>) -> Result<CursorMut<'_, T, A>, Error> {
        let index = self.raw.locate(handle.index(), handle.generation())?;
        Ok(CursorMut::new(&mut self.raw, index))
    }

    /// Clones values of `source` into this container in iteration order.
    ///
    /// Generations of filled slots are lifted above every generation `source` issued,
    /// so handles of `source` do not resolve here.
    fn extend_cloned<B>(&mut self, source: &SlotVec<T, B>)
    where
        T: Clone,
        B: Allocator,
    {
        let floor = source.raw.max_generation().saturating_add(1);
        for value in source {
            if let Err(err) = self.raw.try_reserve_for_insert() {
                alloc_failure(err);
            }
            self.raw.insert(value.clone(), floor);
        }
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        self.raw.check_invariants();
    }
}

#[inline(always)]
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn make_handle<T>(index: usize, generation: u32) -> Handle<T> {
    debug_assert!(index < u32::MAX as usize);
    Handle::from_raw_parts(index as u32, generation)
}

/// Cloning produces an independent container with its own handle space.
///
/// Values are packed into slots `0..len` in iteration order, capacity equals length.
/// Handles of the source do not resolve in the clone.
impl<T, A> Clone for SlotVec<T, A>
where
    T: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        let mut vec = SlotVec::with_capacity_in(self.len(), self.allocator().clone());
        // If a clone panics, `vec` drops values cloned so far.
        vec.extend_cloned(self);
        vec
    }

    /// Reuses existing buffer.
    ///
    /// Both handles of this container and handles of `source` are invalid afterwards.
    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.reserve(source.len());
        self.extend_cloned(source);
    }
}

impl<T, A> Index<Handle<T>> for SlotVec<T, A>
where
    A: Allocator,
{
    type Output = T;

    #[inline]
    fn index(&self, handle: Handle<T>) -> &T {
        match self.at(handle) {
            Ok(value) => value,
            Err(err) => invalid_handle(err),
        }
    }
}

impl<T, A> IndexMut<Handle<T>> for SlotVec<T, A>
where
    A: Allocator,
{
    #[inline]
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        match self.at_mut(handle) {
            Ok(value) => value,
            Err(err) => invalid_handle(err),
        }
    }
}

impl<T, A> fmt::Debug for SlotVec<T, A>
where
    T: fmt::Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter_with_handles()).finish()
    }
}

impl<T, U, A, B> PartialEq<SlotVec<U, B>> for SlotVec<T, A>
where
    T: PartialEq<U>,
    A: Allocator,
    B: Allocator,
{
    /// Compares values in iteration order, slots and generations are ignored.
    fn eq(&self, other: &SlotVec<U, B>) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<T, A> Eq for SlotVec<T, A>
where
    T: Eq,
    A: Allocator,
{
}

impl<T, A> Hash for SlotVec<T, A>
where
    T: Hash,
    A: Allocator,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for value in self {
            value.hash(state);
        }
    }
}

impl<T> FromIterator<T> for SlotVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut vec = SlotVec::new();
        vec.extend(iter);
        vec
    }
}

impl<T, A> Extend<T> for SlotVec<T, A>
where
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        if let Err(err) = self.raw.try_reserve_amortized(lower) {
            alloc_failure(err);
        }
        for value in iter {
            self.push(value);
        }
    }
}

impl<'a, T, A> Extend<&'a T> for SlotVec<T, A>
where
    T: Copy + 'a,
    A: Allocator,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<'a, T, A> IntoIterator for &'a SlotVec<T, A>
where
    A: Allocator,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A> IntoIterator for &'a mut SlotVec<T, A>
where
    A: Allocator,
{
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    #[inline]
    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

impl<T, A> IntoIterator for SlotVec<T, A>
where
    A: Allocator,
{
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    #[inline]
    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter { raw: self.raw }
    }
}

/// Owning iterator over values of [`SlotVec`] in insertion order.
pub struct IntoIter<T, A: Allocator = Global> {
    raw: RawSlots<T, A>,
}

impl<T, A> Iterator for IntoIter<T, A>
where
    A: Allocator,
{
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        match self.raw.head() {
            NIL => None,
            head => Some(self.raw.take(head)),
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.raw.len(), Some(self.raw.len()))
    }
}

impl<T, A> DoubleEndedIterator for IntoIter<T, A>
where
    A: Allocator,
{
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        match self.raw.tail() {
            NIL => None,
            tail => Some(self.raw.take(tail)),
        }
    }
}

impl<T, A> ExactSizeIterator for IntoIter<T, A>
where
    A: Allocator,
{
    #[inline]
    fn len(&self) -> usize {
        self.raw.len()
    }
}

impl<T, A> FusedIterator for IntoIter<T, A> where A: Allocator {}

/// Draining iterator returned by [`SlotVec::drain`].
#[must_use = "iterator does nothing unless consumed"]
pub struct Drain<'a, T, A: Allocator = Global> {
    raw: &'a mut RawSlots<T, A>,
}

impl<T, A> Drop for Drain<'_, T, A>
where
    A: Allocator,
{
    fn drop(&mut self) {
        self.raw.clear();
    }
}

impl<T, A> Iterator for Drain<'_, T, A>
where
    A: Allocator,
{
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        match self.raw.head() {
            NIL => None,
            head => Some(self.raw.take(head)),
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.raw.len(), Some(self.raw.len()))
    }
}

impl<T, A> DoubleEndedIterator for Drain<'_, T, A>
where
    A: Allocator,
{
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        match self.raw.tail() {
            NIL => None,
            tail => Some(self.raw.take(tail)),
        }
    }
}

impl<T, A> ExactSizeIterator for Drain<'_, T, A>
where
    A: Allocator,
{
    #[inline]
    fn len(&self) -> usize {
        self.raw.len()
    }
}

impl<T, A> FusedIterator for Drain<'_, T, A> where A: Allocator {}

#[cfg(all(test, feature = "std"))]
mod tests {
    use core::{alloc::Layout, cell::Cell, ptr::NonNull};
    use std::{
        collections::hash_map::DefaultHasher,
        panic::{AssertUnwindSafe, catch_unwind},
        rc::Rc,
    };

    use allocator_api2::alloc::{AllocError, Allocator, Global};
    use proptest::prelude::*;

    use super::*;

    /// Counts drops of values sharing the counter.
    struct Tracked {
        value: u32,
        drops: Rc<Cell<usize>>,
        panic_on_clone: bool,
    }

    impl Tracked {
        fn new(value: u32, drops: &Rc<Cell<usize>>) -> Self {
            Tracked {
                value,
                drops: drops.clone(),
                panic_on_clone: false,
            }
        }
    }

    impl Clone for Tracked {
        fn clone(&self) -> Self {
            assert!(!self.panic_on_clone, "clone of {} failed", self.value);
            Tracked::new(self.value, &self.drops)
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    /// Allocator that serves limited number of allocations.
    #[derive(Clone)]
    struct Limited(Rc<Cell<usize>>);

    impl Limited {
        fn new(budget: usize) -> Self {
            Limited(Rc::new(Cell::new(budget)))
        }
    }

    unsafe impl Allocator for Limited {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            match self.0.get() {
                0 => Err(AllocError),
                left => {
                    self.0.set(left - 1);
                    Global.allocate(layout)
                }
            }
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            unsafe { Global.deallocate(ptr, layout) }
        }
    }

    fn values<T: Clone, A: Allocator>(vec: &SlotVec<T, A>) -> Vec<T> {
        vec.iter().cloned().collect()
    }

    fn abc() -> (SlotVec<&'static str>, [Handle<&'static str>; 3]) {
        let mut vec = SlotVec::with_capacity(2);
        let h1 = vec.insert_with(|| "a");
        let h2 = vec.insert_with(|| "b");
        let h3 = vec.insert_with(|| "c");
        (vec, [h1, h2, h3])
    }

    #[test]
    fn test_growth_keeps_handles() {
        let (vec, [h1, h2, h3]) = abc();

        assert!(vec.capacity() > 2);
        assert_eq!(vec.at(h1), Ok(&"a"));
        assert_eq!(vec.at(h2), Ok(&"b"));
        assert_eq!(vec.at(h3), Ok(&"c"));
        assert_eq!(vec.len(), 3);
        vec.check_invariants();
    }

    #[test]
    fn test_pop_invalidates_handle() {
        let (mut vec, [h1, h2, h3]) = abc();

        assert_eq!(vec.pop(h2), Ok("b"));
        assert_eq!(
            vec.at(h2),
            Err(Error::InvalidHandle {
                index: h2.index(),
                generation: h2.generation()
            })
        );
        assert_eq!(vec.len(), 2);
        assert_eq!(values(&vec), ["a", "c"]);
        assert!(vec.contains(h1) && vec.contains(h3));
        vec.check_invariants();
    }

    #[test]
    fn test_reused_slot_goes_to_tail() {
        let (mut vec, [_, h2, _]) = abc();
        vec.pop(h2).unwrap();

        let h4 = vec.push("d");
        assert_eq!(h4.index(), h2.index());
        assert_ne!(h4.generation(), h2.generation());

        assert!(matches!(vec.at(h2), Err(Error::InvalidHandle { .. })));
        assert_eq!(vec.at(h4), Ok(&"d"));
        assert_eq!(values(&vec), ["a", "c", "d"]);
        assert_eq!(vec.iter().rev().copied().collect::<Vec<_>>(), ["d", "c", "a"]);
        vec.check_invariants();
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let (mut vec, handles) = abc();
        let capacity = vec.capacity();

        vec.clear();
        assert_eq!(vec.len(), 0);
        assert!(vec.is_empty());
        assert_eq!(vec.capacity(), capacity);
        for handle in handles {
            assert!(matches!(vec.at(handle), Err(Error::InvalidHandle { .. })));
        }
        assert_eq!(vec.iter().next(), None);
        vec.check_invariants();

        // Slots are reused from the lowest index.
        let h = vec.push("e");
        assert_eq!(h.index(), 0);
        assert!(!handles.contains(&h));
        assert_eq!(vec.capacity(), capacity);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut a = SlotVec::new();
        let a1 = a.push(String::from("one"));
        let a2 = a.push(String::from("two"));

        let mut b = a.clone();
        assert_eq!(b.capacity(), 2);
        assert_eq!(a, b);

        let b1 = b.first().unwrap();
        b[b1].push_str("!!");
        assert_eq!(a[a1], "one");
        assert_eq!(b[b1], "one!!");

        // Handles of the source never resolve in the clone.
        for handle in [a1, a2] {
            assert!(matches!(
                b.at(handle),
                Err(Error::InvalidHandle { .. } | Error::OutOfRange { .. })
            ));
        }

        a.pop(a2).unwrap();
        assert_eq!(b.len(), 2);
        a.check_invariants();
        b.check_invariants();
    }

    #[test]
    fn test_clone_of_sparse_vec_is_packed() {
        let mut a = SlotVec::with_capacity(8);
        let handles = (0..8).map(|i| a.push(i)).collect::<Vec<_>>();
        for &h in handles.iter().step_by(2) {
            a.remove(h).unwrap();
        }

        let b = a.clone();
        assert_eq!(b.capacity(), 4);
        assert_eq!(b.slots_initialized(), 4);
        assert_eq!(values(&b), [1, 3, 5, 7]);
        assert_eq!(
            b.handles().map(|h| h.index()).collect::<Vec<_>>(),
            [0, 1, 2, 3]
        );
        for &h in &handles {
            assert!(b.get(h).is_none());
        }
    }

    #[test]
    fn test_clone_from_reuses_buffer() {
        let mut a = SlotVec::new();
        a.extend([1, 2, 3]);
        let mut b = SlotVec::with_capacity(16);
        let old = b.push(10);

        b.clone_from(&a);
        assert_eq!(b.capacity(), 16);
        assert_eq!(values(&b), [1, 2, 3]);
        assert!(b.get(old).is_none());
        for h in a.handles() {
            assert!(b.get(h).is_none());
        }
        b.check_invariants();
    }

    #[test]
    fn test_invalid_handles() {
        let mut vec = SlotVec::new();
        let h = vec.push(1u8);

        assert_eq!(vec.pop(h), Ok(1));
        assert_eq!(
            vec.pop(h),
            Err(Error::InvalidHandle {
                index: 0,
                generation: 1
            })
        );

        let far = Handle::from_raw_parts(5, 1);
        assert_eq!(
            vec.pop(far),
            Err(Error::OutOfRange {
                index: 5,
                initialized: 1
            })
        );
        assert_eq!(vec.remove(Handle::DANGLING).unwrap_err(), Error::OutOfRange {
            index: u32::MAX as usize,
            initialized: 1
        });
        vec.check_invariants();
    }

    #[test]
    #[should_panic(expected = "does not refer to a live value")]
    fn test_index_stale_handle_panics() {
        let mut vec = SlotVec::new();
        let h = vec.push(1);
        vec.remove(h).unwrap();
        let _ = vec[h];
    }

    #[test]
    fn test_panicking_constructor_leaves_vec_unchanged() {
        let mut vec = SlotVec::new();
        let a = vec.push(1);
        let b = vec.push(2);
        vec.remove(a).unwrap();

        let result = catch_unwind(AssertUnwindSafe(|| {
            vec.insert_with(|| panic!("constructor failed"));
        }));
        assert!(result.is_err());

        assert_eq!(vec.len(), 1);
        assert_eq!(values(&vec), [2]);
        vec.check_invariants();

        // Next insertion gets the slot the failed one would have.
        let c = vec.push(3);
        assert_eq!(c.index(), a.index());
        assert_eq!(c.generation(), a.generation() + 1);
        assert_eq!(vec[b], 2);
    }

    #[test]
    fn test_every_value_dropped_once() {
        let drops = Rc::new(Cell::new(0));

        {
            let mut vec = SlotVec::new();
            let handles = (0..10)
                .map(|i| vec.push(Tracked::new(i, &drops)))
                .collect::<Vec<_>>();

            vec.remove(handles[0]).unwrap();
            let popped = vec.pop(handles[1]).unwrap();
            assert_eq!(popped.value, 1);
            assert_eq!(drops.get(), 1);
            drop(popped);
            assert_eq!(drops.get(), 2);

            vec.retain(|_, value| value.value % 2 == 0);
            assert_eq!(drops.get(), 6);

            vec.drain().next();
            assert_eq!(drops.get(), 10);
            assert!(vec.is_empty());

            vec.push(Tracked::new(10, &drops));
            vec.push(Tracked::new(11, &drops));
            vec.clear();
            assert_eq!(drops.get(), 12);

            vec.push(Tracked::new(12, &drops));
        }

        assert_eq!(drops.get(), 13);
    }

    #[test]
    fn test_panicking_clone_does_not_leak_or_double_drop() {
        let drops = Rc::new(Cell::new(0));
        let mut vec = SlotVec::new();
        vec.push(Tracked::new(0, &drops));
        vec.push(Tracked::new(1, &drops));
        let mut poisoned = Tracked::new(2, &drops);
        poisoned.panic_on_clone = true;
        vec.push(poisoned);

        let result = catch_unwind(AssertUnwindSafe(|| vec.clone()));
        assert!(result.is_err());

        // Two clones were made and dropped during unwinding.
        assert_eq!(drops.get(), 2);
        assert_eq!(vec.len(), 3);

        drop(vec);
        assert_eq!(drops.get(), 5);
    }

    #[test]
    fn test_retain_keeps_order_and_handles() {
        let mut vec = (0..6).collect::<SlotVec<i32>>();
        let kept = vec.handles().collect::<Vec<_>>();

        vec.retain(|_, value| {
            *value *= 10;
            *value % 20 == 0
        });

        assert_eq!(values(&vec), [0, 20, 40]);
        assert_eq!(vec[kept[2]], 20);
        assert!(vec.get(kept[1]).is_none());
        vec.check_invariants();
    }

    #[test]
    fn test_drain_and_into_iter() {
        let mut vec = SlotVec::with_capacity(4);
        vec.extend(["a", "b", "c", "d"]);

        let mut drain = vec.drain();
        assert_eq!(drain.len(), 4);
        assert_eq!(drain.next(), Some("a"));
        assert_eq!(drain.next_back(), Some("d"));
        drop(drain);

        assert!(vec.is_empty());
        assert_eq!(vec.capacity(), 4);
        vec.check_invariants();

        vec.extend(["x", "y", "z"]);
        let mut iter = vec.into_iter();
        assert_eq!(iter.next_back(), Some("z"));
        assert_eq!(iter.collect::<Vec<_>>(), ["x", "y"]);
    }

    #[test]
    fn test_iterators_are_double_ended() {
        let mut vec = SlotVec::new();
        let handles = (0..5).map(|i| vec.push(i)).collect::<Vec<_>>();
        vec.remove(handles[2]).unwrap();

        let mut iter = vec.iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next(), Some(&0));
        assert_eq!(iter.next_back(), Some(&4));
        assert_eq!(iter.next(), Some(&1));
        assert_eq!(iter.next_back(), Some(&3));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);

        for value in vec.iter_mut().rev() {
            *value += 100;
        }
        assert_eq!(values(&vec), [100, 101, 103, 104]);

        for (handle, value) in vec.iter_mut_with_handles() {
            *value = i32::try_from(handle.index()).unwrap();
        }
        assert_eq!(values(&vec), [0, 1, 3, 4]);

        let entries = vec.iter_with_handles().collect::<Vec<_>>();
        assert_eq!(entries[2], (handles[3], &3));
        assert_eq!(vec.handles().next_back(), Some(handles[4]));
        assert_eq!(vec.iter().count(), vec.len());
    }

    #[test]
    fn test_cursor_navigation() {
        let mut vec = SlotVec::new();
        let handles = ['a', 'b', 'c'].map(|c| vec.push(c));

        let mut cursor = vec.cursor_front();
        assert_eq!(cursor.current(), Some(&'a'));
        assert_eq!(cursor.peek_prev(), None);
        cursor.move_next();
        assert_eq!(cursor.handle(), Some(handles[1]));
        cursor.move_next();
        cursor.move_next();
        assert_eq!(cursor.index(), None);
        cursor.move_next();
        assert_eq!(cursor.current(), Some(&'a'));

        let cursor = vec.cursor_at(handles[2]).unwrap();
        assert_eq!(cursor.peek_prev(), Some(&'b'));
        assert_eq!(cursor.peek_next(), None);

        // Position from a cursor turns back into a durable handle.
        let index = vec.cursor_back().index().unwrap();
        assert_eq!(vec.get_handle(index), Some(handles[2]));
        assert_eq!(vec.get_handle(17), None);
    }

    #[test]
    fn test_cursor_mut_removes() {
        let mut vec = (1..=6).collect::<SlotVec<u32>>();

        let mut cursor = vec.cursor_front_mut();
        while cursor.index().is_some() {
            if *cursor.current().unwrap() % 3 == 0 {
                cursor.remove_current();
            } else {
                *cursor.current().unwrap() *= 2;
                cursor.move_next();
            }
        }

        assert_eq!(values(&vec), [2, 4, 8, 10]);
        vec.check_invariants();

        let h = vec.last().unwrap();
        let mut cursor = vec.cursor_at_mut(h).unwrap();
        cursor.move_prev();
        assert_eq!(cursor.as_cursor().current(), Some(&8));
        assert_eq!(cursor.remove_current(), Some(8));
        assert_eq!(cursor.handle(), Some(h));
    }

    #[test]
    fn test_cursor_mut_peeks() {
        let mut vec = SlotVec::new();
        let a = vec.push('a');
        vec.push('b');
        vec.push('c');

        let mut cursor = vec.cursor_at_mut(a).unwrap();
        assert_eq!(cursor.peek_prev(), None);
        assert_eq!(cursor.peek_next(), Some(&'b'));

        cursor.move_next();
        *cursor.current().unwrap() = 'B';
        assert_eq!(cursor.peek_prev(), Some(&'a'));
        assert_eq!(cursor.peek_next(), Some(&'c'));

        cursor.move_prev();
        cursor.move_prev();
        assert_eq!(cursor.index(), None);
        assert_eq!(cursor.peek_next(), Some(&'a'));
        assert_eq!(cursor.peek_prev(), Some(&'c'));
        assert_eq!(values(&vec), ['a', 'B', 'c']);
    }

    #[test]
    fn test_get_disjoint_mut() {
        let mut vec = SlotVec::new();
        let a = vec.push(1);
        let b = vec.push(2);

        let [x, y] = vec.get_disjoint_mut([a, b]).unwrap();
        core::mem::swap(x, y);
        assert_eq!((vec[a], vec[b]), (2, 1));

        assert_eq!(
            vec.get_disjoint_mut([a, a]).unwrap_err(),
            Error::Aliased { index: a.index() }
        );

        vec.remove(b).unwrap();
        assert!(vec.get_disjoint_mut([a, b]).is_err());
    }

    #[test]
    fn test_insert_with_handle_stores_self_reference() {
        struct Node {
            me: Handle<Node>,
            parent: Option<Handle<Node>>,
        }

        let mut tree = SlotVec::new();
        let root = tree.insert_with_handle(|me| Node { me, parent: None });
        tree.pop(root).unwrap();

        let root = tree.insert_with_handle(|me| Node { me, parent: None });
        let child = tree.insert_with_handle(|me| Node {
            me,
            parent: Some(root),
        });

        assert_eq!(tree[root].me, root);
        assert_eq!(tree[child].me, child);
        assert_eq!(tree[child].parent, Some(root));
        tree.check_invariants();
    }

    #[test]
    fn test_allocation_failure_is_reported() {
        let alloc = Limited::new(1);
        let mut vec = SlotVec::try_with_capacity_in(1, alloc.clone()).unwrap();
        let a = vec.push(1u64);

        let mut called = false;
        let err = vec
            .try_insert_with(|| {
                called = true;
                2
            })
            .unwrap_err();
        assert!(!called);
        assert!(matches!(err, Error::AllocationFailure { .. }));

        assert_eq!(vec.try_push(3), Err(3));
        assert!(vec.try_reserve(64).is_err());
        assert_eq!(vec.capacity(), 1);
        assert_eq!(values(&vec), [1]);
        assert_eq!(vec[a], 1);

        alloc.0.set(1);
        let b = vec.try_push(4).unwrap();
        assert_eq!(vec[a], 1);
        assert_eq!(vec[b], 4);
        vec.check_invariants();
    }

    #[test]
    fn test_capacity_overflow_is_reported() {
        let mut vec = SlotVec::<u8>::new();
        assert_eq!(vec.try_reserve(usize::MAX), Err(Error::CapacityOverflow));
        assert_eq!(vec.capacity(), 0);
    }

    #[test]
    fn test_shrink_to_fit_keeps_handles() {
        let mut vec = SlotVec::with_capacity(32);
        let a = vec.push('a');
        let b = vec.push('b');
        vec.remove(a).unwrap();

        vec.shrink_to_fit();
        assert_eq!(vec.capacity(), 2);
        assert_eq!(vec[b], 'b');

        vec.push('c');
        assert_eq!(vec.capacity(), 2);
    }

    #[test]
    fn test_extend_grows_like_push() {
        let mut pushed = SlotVec::new();
        let mut extended = SlotVec::new();
        let mut push_caps = Vec::new();
        let mut extend_caps = Vec::new();

        for i in 0..10 {
            pushed.push(i);
            push_caps.push(pushed.capacity());
            extended.extend(core::iter::once(i));
            extend_caps.push(extended.capacity());
        }

        assert_eq!(push_caps, [1, 2, 4, 4, 8, 8, 8, 8, 16, 16]);
        assert_eq!(extend_caps, push_caps);
        assert_eq!(pushed, extended);
    }

    #[test]
    fn test_extend_uses_free_slots() {
        let mut vec = SlotVec::with_capacity(4);
        let handles = (0..4).map(|i| vec.push(i)).collect::<Vec<_>>();
        vec.remove(handles[0]).unwrap();
        vec.remove(handles[3]).unwrap();

        vec.extend(&[7, 8]);
        assert_eq!(vec.capacity(), 4);
        assert_eq!(values(&vec), [1, 2, 7, 8]);

        vec.extend(&[9]);
        assert_eq!(vec.capacity(), 8);
        vec.check_invariants();
    }

    #[test]
    fn test_get_unchecked() {
        let mut vec = SlotVec::new();
        let a = vec.push(1);
        let b = vec.push(2);

        assert_eq!(unsafe { *vec.get_unchecked(b) }, 2);
        unsafe { *vec.get_unchecked_mut(a) += 10 };
        assert_eq!(vec[a], 11);
    }

    #[test]
    fn test_shrink_failure_keeps_buffer() {
        let alloc = Limited::new(1);
        let mut vec = SlotVec::try_with_capacity_in(8, alloc.clone()).unwrap();
        let a = vec.push('a');

        assert!(matches!(
            vec.try_shrink_to_fit(),
            Err(Error::AllocationFailure { .. })
        ));
        assert_eq!(vec.capacity(), 8);
        assert_eq!(vec[a], 'a');

        alloc.0.set(1);
        vec.try_shrink_to_fit().unwrap();
        assert_eq!(vec.capacity(), 1);
        assert_eq!(vec[a], 'a');
        vec.check_invariants();
    }

    #[test]
    fn test_from_elem_in() {
        let vec = SlotVec::from_elem_in(vec![0u8; 2], 3, Global);
        assert_eq!(vec.len(), 3);
        assert_eq!(vec.capacity(), 3);
        assert!(vec.iter().all(|v| *v == [0, 0]));

        let empty = SlotVec::from_elem_in(String::new(), 0, Global);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_eq_and_hash_ignore_layout() {
        fn hash_of(vec: &SlotVec<i32>) -> u64 {
            let mut hasher = DefaultHasher::new();
            vec.hash(&mut hasher);
            hasher.finish()
        }

        let mut a = SlotVec::new();
        let h = a.push(0);
        a.extend([1, 2]);
        a.remove(h).unwrap();

        let b = [1, 2].into_iter().collect::<SlotVec<_>>();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        a.push(3);
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_lists_handles() {
        let mut vec = SlotVec::new();
        let h = vec.push(1);
        vec.push(2);
        vec.remove(h).unwrap();
        vec.push(3);

        assert_eq!(format!("{vec:?}"), "{Handle(1v1): 2, Handle(0v2): 3}");
    }

    #[test]
    fn test_take_and_swap() {
        let mut a = SlotVec::new();
        let h = a.push(1);
        let mut b = SlotVec::new();
        b.push(2);
        b.push(3);

        core::mem::swap(&mut a, &mut b);
        assert_eq!(values(&a), [2, 3]);
        assert_eq!(b[h], 1);

        let taken = core::mem::take(&mut a);
        assert!(a.is_empty());
        assert_eq!(a.capacity(), 0);
        assert_eq!(values(&taken), [2, 3]);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Push(u16),
        Pop(prop::sample::Index),
        PopStale(prop::sample::Index),
        Clear,
        Reserve(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            6 => any::<u16>().prop_map(Op::Push),
            4 => any::<prop::sample::Index>().prop_map(Op::Pop),
            1 => any::<prop::sample::Index>().prop_map(Op::PopStale),
            1 => Just(Op::Clear),
            1 => any::<u8>().prop_map(Op::Reserve),
        ]
    }

    proptest! {
        #[test]
        fn prop_behaves_like_ordered_model(ops in prop::collection::vec(op(), 0..256)) {
            let mut vec = SlotVec::new();
            let mut live: Vec<(Handle<u16>, u16)> = Vec::new();
            let mut dead: Vec<Handle<u16>> = Vec::new();
            let mut pushed = 0usize;
            let mut popped = 0usize;

            for op in ops {
                match op {
                    Op::Push(value) => {
                        let handle = vec.push(value);
                        prop_assert!(live.iter().all(|(h, _)| *h != handle));
                        prop_assert!(!dead.contains(&handle));
                        live.push((handle, value));
                        pushed += 1;
                    }
                    Op::Pop(index) if !live.is_empty() => {
                        let (handle, value) = live.remove(index.index(live.len()));
                        prop_assert_eq!(vec.pop(handle), Ok(value));
                        dead.push(handle);
                        popped += 1;
                    }
                    Op::PopStale(index) if !dead.is_empty() => {
                        let handle = dead[index.index(dead.len())];
                        prop_assert!(vec.pop(handle).is_err());
                    }
                    Op::Clear => {
                        vec.clear();
                        popped += live.len();
                        dead.extend(live.drain(..).map(|(h, _)| h));
                    }
                    Op::Reserve(extra) => {
                        let capacity = vec.capacity();
                        vec.reserve(capacity + usize::from(extra));
                        prop_assert!(vec.capacity() >= capacity + usize::from(extra));
                    }
                    Op::Pop(_) | Op::PopStale(_) => {}
                }

                vec.check_invariants();
                prop_assert_eq!(vec.len(), pushed - popped);
                prop_assert_eq!(vec.len(), live.len());

                let forward = vec.iter().copied().collect::<Vec<_>>();
                let expected = live.iter().map(|(_, v)| *v).collect::<Vec<_>>();
                prop_assert_eq!(&forward, &expected);

                let mut backward = vec.iter().rev().copied().collect::<Vec<_>>();
                backward.reverse();
                prop_assert_eq!(&backward, &expected);

                for (handle, value) in &live {
                    prop_assert_eq!(vec.at(*handle), Ok(value));
                }
                for handle in &dead {
                    prop_assert!(vec.at(*handle).is_err());
                }
            }
        }

        #[test]
        fn prop_clone_never_resolves_source_handles(
            values in prop::collection::vec(any::<i64>(), 1..64),
            removed in prop::collection::vec(any::<prop::sample::Index>(), 0..32),
        ) {
            let mut source = SlotVec::new();
            let mut handles = values.iter().map(|v| source.push(*v)).collect::<Vec<_>>();
            for index in removed {
                if handles.is_empty() {
                    break;
                }
                let handle = handles.swap_remove(index.index(handles.len()));
                source.remove(handle).unwrap();
                source.push(0);
            }

            let copy = source.clone();
            copy.check_invariants();
            prop_assert_eq!(&copy, &source);
            for handle in source.handles() {
                prop_assert!(copy.get(handle).is_none());
            }
        }
    }
}
