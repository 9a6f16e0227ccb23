//! Borrowing iterators over [`SlotVec`](crate::SlotVec).
//!
//! All of them walk the active chain from both ends
//! and stop when the ends meet, vacant slots are never visited.

use core::{iter::FusedIterator, marker::PhantomData};

use allocator_api2::alloc::Allocator;

use crate::{
    handle::Handle,
    raw::RawSlots,
    slot::{NIL, Slot},
    slot_vec::make_handle,
};

/// Two-ended position in the active chain.
#[derive(Clone, Copy)]
pub(crate) struct Walk {
    front: usize,
    back: usize,
    len: usize,
}

impl Walk {
    #[inline(always)]
    fn new<T, A: Allocator>(raw: &RawSlots<T, A>) -> Self {
        Walk {
            front: raw.head(),
            back: raw.tail(),
            len: raw.len(),
        }
    }

    #[inline(always)]
    fn empty() -> Self {
        Walk {
            front: NIL,
            back: NIL,
            len: 0,
        }
    }

    /// # Safety
    ///
    /// `slots` must point to the buffer the walk was created for,
    /// and the chain must not be modified since.
    #[inline(always)]
    unsafe fn next<T>(&mut self, slots: *const Slot<T>) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let index = self.front;
        debug_assert_ne!(index, NIL);
        self.front = unsafe { (*slots.add(index)).next };
        self.len -= 1;
        Some(index)
    }

    /// # Safety
    ///
    /// Same as for `next`.
    #[inline(always)]
    unsafe fn next_back<T>(&mut self, slots: *const Slot<T>) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let index = self.back;
        debug_assert_ne!(index, NIL);
        self.back = unsafe { (*slots.add(index)).prev };
        self.len -= 1;
        Some(index)
    }
}

/// Iterator over values of [`SlotVec`](crate::SlotVec) in insertion order.
#[must_use = "iterator does nothing unless consumed"]
pub struct Iter<'a, T> {
    slots: &'a [Slot<T>],
    walk: Walk,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new<A: Allocator>(raw: &'a RawSlots<T, A>) -> Self {
        Iter {
            slots: raw.slots(),
            walk: Walk::new(raw),
        }
    }

    #[inline(always)]
    fn value(&self, index: usize) -> &'a T {
        let slots: &'a [Slot<T>] = self.slots;
        // Safety: chain contains only active slots.
        unsafe { slots.get_unchecked(index).occupied_ref() }
    }
}

impl<T> Clone for Iter<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        Iter {
            slots: self.slots,
            walk: self.walk,
        }
    }
}

impl<T> Default for Iter<'_, T> {
    #[inline]
    fn default() -> Self {
        Iter {
            slots: &[],
            walk: Walk::empty(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        let index = unsafe { self.walk.next(self.slots.as_ptr()) }?;
        Some(self.value(index))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.walk.len, Some(self.walk.len))
    }

    #[inline]
    fn count(self) -> usize {
        self.walk.len
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a T> {
        let index = unsafe { self.walk.next_back(self.slots.as_ptr()) }?;
        Some(self.value(index))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {
    #[inline]
    fn len(&self) -> usize {
        self.walk.len
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

/// Iterator over handles and values of [`SlotVec`](crate::SlotVec) in insertion order.
#[must_use = "iterator does nothing unless consumed"]
pub struct Entries<'a, T> {
    iter: Iter<'a, T>,
}

impl<'a, T> Entries<'a, T> {
    pub(crate) fn new<A: Allocator>(raw: &'a RawSlots<T, A>) -> Self {
        Entries {
            iter: Iter::new(raw),
        }
    }

    #[inline(always)]
    fn entry(&self, index: usize) -> (Handle<T>, &'a T) {
        let generation = self.iter.slots[index].generation();
        (make_handle(index, generation), self.iter.value(index))
    }
}

impl<T> Clone for Entries<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        Entries {
            iter: self.iter.clone(),
        }
    }
}

impl<'a, T> Iterator for Entries<'a, T> {
    type Item = (Handle<T>, &'a T);

    #[inline]
    fn next(&mut self) -> Option<(Handle<T>, &'a T)> {
        let index = unsafe { self.iter.walk.next(self.iter.slots.as_ptr()) }?;
        Some(self.entry(index))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a, T> DoubleEndedIterator for Entries<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<(Handle<T>, &'a T)> {
        let index = unsafe { self.iter.walk.next_back(self.iter.slots.as_ptr()) }?;
        Some(self.entry(index))
    }
}

impl<T> ExactSizeIterator for Entries<'_, T> {
    #[inline]
    fn len(&self) -> usize {
        self.iter.len()
    }
}

impl<T> FusedIterator for Entries<'_, T> {}

/// Iterator over handles of [`SlotVec`](crate::SlotVec) in insertion order.
///
/// Handles can be collected and later used to mutate or remove values.
#[must_use = "iterator does nothing unless consumed"]
pub struct Handles<'a, T> {
    entries: Entries<'a, T>,
}

impl<'a, T> Handles<'a, T> {
    pub(crate) fn new<A: Allocator>(raw: &'a RawSlots<T, A>) -> Self {
        Handles {
            entries: Entries::new(raw),
        }
    }
}

impl<T> Clone for Handles<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        Handles {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Iterator for Handles<'_, T> {
    type Item = Handle<T>;

    #[inline]
    fn next(&mut self) -> Option<Handle<T>> {
        self.entries.next().map(|(handle, _)| handle)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<T> DoubleEndedIterator for Handles<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Handle<T>> {
        self.entries.next_back().map(|(handle, _)| handle)
    }
}

impl<T> ExactSizeIterator for Handles<'_, T> {
    #[inline]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<T> FusedIterator for Handles<'_, T> {}

/// Iterator over mutable values of [`SlotVec`](crate::SlotVec) in insertion order.
#[must_use = "iterator does nothing unless consumed"]
pub struct IterMut<'a, T> {
    slots: *mut Slot<T>,
    walk: Walk,
    marker: PhantomData<&'a mut T>,
}

unsafe impl<T> Send for IterMut<'_, T> where T: Send {}
unsafe impl<T> Sync for IterMut<'_, T> where T: Sync {}

impl<'a, T> IterMut<'a, T> {
    pub(crate) fn new<A: Allocator>(raw: &'a mut RawSlots<T, A>) -> Self {
        IterMut {
            walk: Walk::new(raw),
            slots: raw.as_mut_ptr(),
            marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// Index must be yielded by the walk, each index is yielded once.
    #[inline(always)]
    unsafe fn value(&self, index: usize) -> &'a mut T {
        unsafe { &mut *Slot::value_ptr(self.slots.add(index)) }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        let index = unsafe { self.walk.next(self.slots) }?;
        Some(unsafe { self.value(index) })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.walk.len, Some(self.walk.len))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a mut T> {
        let index = unsafe { self.walk.next_back(self.slots) }?;
        Some(unsafe { self.value(index) })
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {
    #[inline]
    fn len(&self) -> usize {
        self.walk.len
    }
}

impl<T> FusedIterator for IterMut<'_, T> {}

/// Iterator over handles and mutable values of [`SlotVec`](crate::SlotVec) in insertion order.
#[must_use = "iterator does nothing unless consumed"]
pub struct EntriesMut<'a, T> {
    iter: IterMut<'a, T>,
}

impl<'a, T> EntriesMut<'a, T> {
    pub(crate) fn new<A: Allocator>(raw: &'a mut RawSlots<T, A>) -> Self {
        EntriesMut {
            iter: IterMut::new(raw),
        }
    }

    /// # Safety
    ///
    /// Same as for `IterMut::value`.
    #[inline(always)]
    unsafe fn entry(&self, index: usize) -> (Handle<T>, &'a mut T) {
        // Generation is read through raw pointer, value is never borrowed here.
        let generation = unsafe { (*self.iter.slots.add(index)).generation() };
        (make_handle(index, generation), unsafe { self.iter.value(index) })
    }
}

impl<'a, T> Iterator for EntriesMut<'a, T> {
    type Item = (Handle<T>, &'a mut T);

    #[inline]
    fn next(&mut self) -> Option<(Handle<T>, &'a mut T)> {
        let index = unsafe { self.iter.walk.next(self.iter.slots) }?;
        Some(unsafe { self.entry(index) })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a, T> DoubleEndedIterator for EntriesMut<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<(Handle<T>, &'a mut T)> {
        let index = unsafe { self.iter.walk.next_back(self.iter.slots) }?;
        Some(unsafe { self.entry(index) })
    }
}

impl<T> ExactSizeIterator for EntriesMut<'_, T> {
    #[inline]
    fn len(&self) -> usize {
        self.iter.len()
    }
}

impl<T> FusedIterator for EntriesMut<'_, T> {}
