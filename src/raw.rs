//! Raw storage of the slotted vector.
//!
//! Owns allocator-obtained buffer of slot records,
//! threads active slots into a doubly-linked chain anchored at the sentinel
//! and keeps vacant slots in a singly-linked free list.
//!
//! It knows nothing about handles, callers validate indices before
//! passing them here.

use core::{
    alloc::Layout,
    marker::PhantomData,
    mem::{align_of, size_of},
    ptr::{NonNull, copy_nonoverlapping},
    slice::{from_raw_parts, from_raw_parts_mut},
};

use allocator_api2::alloc::Allocator;

use crate::{
    error::Error,
    slot::{NIL, Slot},
};

/// Slot indices must fit into handle index, `u32::MAX` is left for dangling handles.
const MAX_SLOTS: usize = if usize::BITS > u32::BITS {
    u32::MAX as usize
} else {
    usize::MAX - 1
};

const MIN_NON_ZERO_CAP: usize = 1;

/// Anchor of the active chain.
/// Stands for a slot that is never stored in the buffer.
#[derive(Clone, Copy, Debug)]
struct Sentinel {
    head: usize,
    tail: usize,
    len: usize,
}

impl Sentinel {
    const EMPTY: Self = Sentinel {
        head: NIL,
        tail: NIL,
        len: 0,
    };
}

pub(crate) struct RawSlots<T, A: Allocator> {
    ptr: NonNull<Slot<T>>,
    cap: usize,

    /// Number of slot records ever written.
    /// Records above are uninitialized memory.
    init: usize,

    sentinel: Sentinel,

    /// Head of the free list.
    free: usize,

    /// Largest generation this storage has handed out.
    max_generation: u32,

    alloc: A,
    marker: PhantomData<Slot<T>>,
}

unsafe impl<T, A> Send for RawSlots<T, A>
where
    T: Send,
    A: Allocator + Send,
{
}

unsafe impl<T, A> Sync for RawSlots<T, A>
where
    T: Sync,
    A: Allocator + Sync,
{
}

impl<T, A> Drop for RawSlots<T, A>
where
    A: Allocator,
{
    fn drop(&mut self) {
        struct Dealloc<'a, T, A: Allocator>(&'a mut RawSlots<T, A>);

        impl<T, A: Allocator> Drop for Dealloc<'_, T, A> {
            fn drop(&mut self) {
                let raw = &mut *self.0;
                unsafe { raw.deallocate(raw.ptr, raw.cap) }
            }
        }

        // Buffer is released even if a value destructor panics.
        let mut dealloc = Dealloc(self);
        dealloc.0.clear();
    }
}

impl<T, A> RawSlots<T, A>
where
    A: Allocator,
{
    pub(crate) const fn new_in(alloc: A) -> Self {
        RawSlots {
            ptr: NonNull::dangling(),
            cap: 0,
            init: 0,
            sentinel: Sentinel::EMPTY,
            free: NIL,
            max_generation: 0,
            alloc,
            marker: PhantomData,
        }
    }

    pub(crate) fn try_with_capacity_in(cap: usize, alloc: A) -> Result<Self, Error> {
        let mut raw = RawSlots::new_in(alloc);
        raw.ptr = raw.allocate(cap)?;
        raw.cap = cap;
        Ok(raw)
    }

    /// Obtains storage for `n` slot records.
    fn allocate(&self, n: usize) -> Result<NonNull<Slot<T>>, Error> {
        if n > MAX_SLOTS {
            return Err(Error::CapacityOverflow);
        }

        let layout = Layout::array::<Slot<T>>(n).map_err(|_| Error::CapacityOverflow)?;
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }

        match self.alloc.allocate(layout) {
            Ok(ptr) => Ok(ptr.cast()),
            Err(_) => Err(Error::AllocationFailure { layout }),
        }
    }

    /// Releases storage obtained from `allocate`.
    ///
    /// # Safety
    ///
    /// `ptr` must be returned by `allocate(n)` of this storage
    /// and contain no live values.
    unsafe fn deallocate(&self, ptr: NonNull<Slot<T>>, n: usize) {
        let size = size_of::<Slot<T>>() * n;
        if size == 0 {
            return;
        }

        unsafe {
            // Same layout was successfully computed by `allocate`.
            let layout = Layout::from_size_align_unchecked(size, align_of::<Slot<T>>());
            self.alloc.deallocate(ptr.cast(), layout);
        }
    }

    #[inline(always)]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.cap
    }

    #[inline(always)]
    pub(crate) fn initialized(&self) -> usize {
        self.init
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.sentinel.len
    }

    #[inline(always)]
    pub(crate) fn head(&self) -> usize {
        self.sentinel.head
    }

    #[inline(always)]
    pub(crate) fn tail(&self) -> usize {
        self.sentinel.tail
    }

    #[inline(always)]
    pub(crate) fn max_generation(&self) -> u32 {
        self.max_generation
    }

    /// Returns initialized slot records.
    #[inline(always)]
    pub(crate) fn slots(&self) -> &[Slot<T>] {
        // Safety: first `init` records are initialized.
        unsafe { from_raw_parts(self.ptr.as_ptr(), self.init) }
    }

    #[inline(always)]
    pub(crate) fn slots_mut(&mut self) -> &mut [Slot<T>] {
        // Safety: first `init` records are initialized.
        unsafe { from_raw_parts_mut(self.ptr.as_ptr(), self.init) }
    }

    /// Pointer to the first slot record.
    /// Used by iterators that hand out mutable references to distinct values.
    #[inline(always)]
    pub(crate) fn as_mut_ptr(&mut self) -> *mut Slot<T> {
        self.ptr.as_ptr()
    }

    /// Returns index of the active slot with specified generation.
    pub(crate) fn locate(&self, index: usize, generation: u32) -> Result<usize, Error> {
        match self.slots().get(index) {
            None => Err(Error::OutOfRange {
                index,
                initialized: self.init,
            }),
            Some(slot) if slot.matches(generation) => Ok(index),
            Some(_) => Err(Error::InvalidHandle { index, generation }),
        }
    }

    /// Checks whether a value can be inserted without growing.
    #[inline(always)]
    pub(crate) fn has_vacancy(&self) -> bool {
        self.free != NIL || self.init < self.cap
    }

    /// Reallocates buffer to hold `new_cap` slot records.
    /// Initialized records keep their indices.
    fn reallocate(&mut self, new_cap: usize) -> Result<(), Error> {
        debug_assert!(new_cap >= self.init);

        let new_ptr = self.allocate(new_cap)?;

        unsafe {
            // Moving slot records is bitwise copy, links are indices and survive it.
            copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.init);
            self.deallocate(self.ptr, self.cap);
        }

        self.ptr = new_ptr;
        self.cap = new_cap;
        Ok(())
    }

    /// Grows buffer to hold at least `cap` slot records.
    pub(crate) fn try_reserve(&mut self, cap: usize) -> Result<(), Error> {
        if cap <= self.cap {
            return Ok(());
        }
        self.reallocate(cap)
    }

    /// Ensures that next insertion does not need to grow.
    pub(crate) fn try_reserve_for_insert(&mut self) -> Result<(), Error> {
        if self.has_vacancy() {
            return Ok(());
        }
        self.grow()
    }

    /// Ensures that `additional` more values can be inserted,
    /// growing at least geometrically when buffer is too small.
    ///
    /// Retired slots are counted as free, insertion still checks for vacancy.
    pub(crate) fn try_reserve_amortized(&mut self, additional: usize) -> Result<(), Error> {
        if additional <= self.cap - self.sentinel.len {
            return Ok(());
        }

        let required = self
            .sentinel
            .len
            .checked_add(additional)
            .ok_or(Error::CapacityOverflow)?;
        self.reallocate(self.amortized_cap(required))
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self) -> Result<(), Error> {
        if self.cap >= MAX_SLOTS {
            return Err(Error::CapacityOverflow);
        }
        self.reallocate(self.amortized_cap(self.cap + 1))
    }

    /// New capacity for growing to at least `required` slot records.
    #[inline(always)]
    fn amortized_cap(&self, required: usize) -> usize {
        let doubled = self.cap.saturating_mul(2).min(MAX_SLOTS);
        required.max(doubled).max(MIN_NON_ZERO_CAP)
    }

    /// Shrinks buffer to initialized slot records.
    /// Keeps current buffer if allocator fails.
    pub(crate) fn try_shrink_to_fit(&mut self) -> Result<(), Error> {
        if self.cap > self.init {
            self.reallocate(self.init)?;
        }
        Ok(())
    }

    /// Returns index and generation the next inserted value will get.
    ///
    /// There must be a vacancy.
    pub(crate) fn next_vacancy(&self, floor: u32) -> (usize, u32) {
        debug_assert!(self.has_vacancy());

        if self.free == NIL {
            (self.init, 1.max(floor))
        } else {
            let generation = self.slots()[self.free].next_generation(floor);
            (self.free, generation)
        }
    }

    /// Inserts value into a vacant slot and links it to the tail of the chain.
    /// Generation of the slot becomes at least `floor`.
    ///
    /// There must be a vacancy. Does not panic.
    pub(crate) fn insert(&mut self, value: T, floor: u32) -> (usize, u32) {
        debug_assert!(self.has_vacancy());

        let index = if self.free == NIL {
            unsafe {
                // Safety: `init < cap`.
                self.ptr.as_ptr().add(self.init).write(Slot::vacant());
            }
            self.init += 1;
            self.init - 1
        } else {
            let index = self.free;
            self.free = self.slots()[index].next;
            index
        };

        let generation = self.slots_mut()[index].occupy(value, floor);
        self.max_generation = self.max_generation.max(generation);

        self.link_back(index);
        self.sentinel.len += 1;

        (index, generation)
    }

    /// Moves value out of active slot, unlinks it and puts it into the free list.
    pub(crate) fn take(&mut self, index: usize) -> T {
        assert!(self.slots()[index].is_active(), "slot is not occupied");

        self.unlink(index);
        self.sentinel.len -= 1;

        let slot = &mut self.slots_mut()[index];
        let value = unsafe { slot.vacate() };
        self.release(index);
        value
    }

    /// Drops all values.
    ///
    /// Free list is rebuilt so that vacant slots are reused from lowest index.
    /// Generations are kept, so no outstanding handle resolves again.
    pub(crate) fn clear(&mut self) {
        struct Reset<'a, T, A: Allocator>(&'a mut RawSlots<T, A>);

        impl<T, A: Allocator> Drop for Reset<'_, T, A> {
            fn drop(&mut self) {
                self.0.reset();
            }
        }

        // If a destructor panics remaining values are leaked.
        let mut reset = Reset(self);
        let mut index = reset.0.sentinel.head;
        while index != NIL {
            let slot = &mut reset.0.slots_mut()[index];
            index = slot.next;
            unsafe { slot.vacate_drop() };
        }
    }

    /// Marks every slot vacant without dropping values
    /// and rebuilds empty chain and full free list.
    fn reset(&mut self) {
        self.sentinel = Sentinel::EMPTY;
        self.free = NIL;

        for index in (0..self.init).rev() {
            let slot = &mut self.slots_mut()[index];
            slot.vacate_leak();
            slot.prev = NIL;
            slot.next = NIL;
            self.release(index);
        }
    }

    /// Puts vacant slot into free list unless it is retired.
    fn release(&mut self, index: usize) {
        let free = self.free;
        let slot = &mut self.slots_mut()[index];
        debug_assert!(!slot.is_active());

        slot.prev = NIL;
        if slot.is_retired() {
            slot.next = NIL;
        } else {
            slot.next = free;
            self.free = index;
        }
    }

    fn link_back(&mut self, index: usize) {
        let tail = self.sentinel.tail;

        let slot = &mut self.slots_mut()[index];
        slot.prev = tail;
        slot.next = NIL;

        if tail == NIL {
            self.sentinel.head = index;
        } else {
            self.slots_mut()[tail].next = index;
        }
        self.sentinel.tail = index;
    }

    fn unlink(&mut self, index: usize) {
        let slot = &self.slots()[index];
        let (prev, next) = (slot.prev, slot.next);

        if prev == NIL {
            self.sentinel.head = next;
        } else {
            self.slots_mut()[prev].next = next;
        }

        if next == NIL {
            self.sentinel.tail = prev;
        } else {
            self.slots_mut()[next].prev = prev;
        }
    }

    /// Panics if any structural invariant is broken.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let slots = self.slots();
        assert!(self.sentinel.len <= self.init && self.init <= self.cap);

        // Walk the chain both ways.
        let mut count = 0;
        let mut prev = NIL;
        let mut index = self.sentinel.head;
        while index != NIL {
            let slot = &slots[index];
            assert!(slot.is_active(), "vacant slot {index} in the chain");
            assert_eq!(slot.prev, prev, "broken back link at slot {index}");
            assert!(slot.generation() <= self.max_generation);
            count += 1;
            assert!(count <= self.sentinel.len, "chain is longer than len");
            prev = index;
            index = slot.next;
        }
        assert_eq!(prev, self.sentinel.tail);
        assert_eq!(count, self.sentinel.len);

        let active = slots.iter().filter(|slot| slot.is_active()).count();
        assert_eq!(active, self.sentinel.len);

        let mut vacant = 0;
        let mut index = self.free;
        while index != NIL {
            let slot = &slots[index];
            assert!(!slot.is_active() && !slot.is_retired());
            vacant += 1;
            assert!(vacant <= self.init, "free list has a cycle");
            index = slot.next;
        }
        let retired = slots.iter().filter(|slot| slot.is_retired()).count();
        assert_eq!(active + vacant + retired, self.init);
    }
}

#[cfg(test)]
type TestRaw<T> = RawSlots<T, allocator_api2::alloc::Global>;

#[test]
fn test_raw_growth_keeps_indices() {
    let mut raw = TestRaw::new_in(allocator_api2::alloc::Global);
    let mut caps = [0; 6];

    for i in 0..6 {
        raw.try_reserve_for_insert().unwrap();
        assert_eq!(raw.insert(i * 10, 0), (i, 1));
        caps[i] = raw.capacity();
    }
    assert_eq!(caps, [1, 2, 4, 4, 8, 8]);

    for i in 0..6 {
        assert_eq!(raw.locate(i, 1), Ok(i));
        assert_eq!(unsafe { *raw.slots()[i].occupied_ref() }, i * 10);
    }
    raw.check_invariants();
}

#[test]
fn test_raw_free_list_reuse() {
    let mut raw = TestRaw::try_with_capacity_in(4, allocator_api2::alloc::Global).unwrap();
    for i in 0..4 {
        raw.insert(i, 0);
    }
    assert!(!raw.has_vacancy());

    assert_eq!(raw.take(1), 1);
    assert_eq!(raw.take(2), 2);
    raw.check_invariants();

    // Last freed slot is reused first, its generation is bumped.
    assert_eq!(raw.next_vacancy(0), (2, 2));
    assert_eq!(raw.insert(20, 0), (2, 2));
    assert_eq!(raw.insert(10, 0), (1, 2));
    assert_eq!(raw.locate(1, 1), Err(Error::InvalidHandle { index: 1, generation: 1 }));
    assert_eq!(
        raw.locate(9, 1),
        Err(Error::OutOfRange {
            index: 9,
            initialized: 4
        })
    );

    // Reused slots are appended at the tail.
    let mut order = [0; 4];
    let mut index = raw.head();
    for value in &mut order {
        *value = unsafe { *raw.slots()[index].occupied_ref() };
        index = raw.slots()[index].next;
    }
    assert_eq!(order, [0, 3, 20, 10]);
    raw.check_invariants();
}

#[test]
fn test_raw_clear_rebuilds_free_list() {
    let mut raw = TestRaw::try_with_capacity_in(3, allocator_api2::alloc::Global).unwrap();
    for i in 0..3 {
        raw.insert(i, 0);
    }
    raw.take(0);
    raw.clear();
    raw.check_invariants();
    assert_eq!(raw.len(), 0);
    assert_eq!(raw.capacity(), 3);

    // Lowest index comes first, generation continues.
    assert_eq!(raw.insert(7, 0), (0, 2));
    assert_eq!(raw.insert(8, 0), (1, 2));
    assert_eq!(raw.insert(9, 0), (2, 2));
    raw.check_invariants();
}

#[test]
fn test_raw_retired_slot() {
    let mut raw = TestRaw::new_in(allocator_api2::alloc::Global);
    raw.try_reserve_for_insert().unwrap();
    assert_eq!(raw.insert(1, u32::MAX), (0, u32::MAX));
    raw.take(0);
    raw.check_invariants();

    // Exhausted slot is not reused.
    assert!(!raw.has_vacancy());
    raw.try_reserve_for_insert().unwrap();
    assert_eq!(raw.insert(2, 0), (1, 1));
    raw.check_invariants();
}

#[test]
fn test_raw_shrink_to_fit() {
    let mut raw = TestRaw::try_with_capacity_in(16, allocator_api2::alloc::Global).unwrap();
    raw.insert("a", 0);
    raw.insert("b", 0);
    raw.take(0);
    raw.try_shrink_to_fit().unwrap();
    assert_eq!(raw.capacity(), 2);
    assert_eq!(raw.locate(1, 1), Ok(1));
    raw.check_invariants();
}

#[test]
fn test_raw_reserve_amortized() {
    let mut raw = TestRaw::new_in(allocator_api2::alloc::Global);
    raw.try_reserve_amortized(3).unwrap();
    assert_eq!(raw.capacity(), 3);

    for i in 0..3 {
        raw.insert(i, 0);
    }
    raw.take(1);

    // Freed slot covers the request.
    raw.try_reserve_amortized(1).unwrap();
    assert_eq!(raw.capacity(), 3);

    // Buffer at least doubles.
    raw.try_reserve_amortized(2).unwrap();
    assert_eq!(raw.capacity(), 6);
    raw.try_reserve_amortized(10).unwrap();
    assert_eq!(raw.capacity(), 12);

    assert_eq!(
        raw.try_reserve_amortized(usize::MAX),
        Err(Error::CapacityOverflow)
    );
    assert_eq!(raw.capacity(), 12);
    raw.check_invariants();
}
