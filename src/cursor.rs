//! Cursors over the active chain of [`SlotVec`](crate::SlotVec).
//!
//! Cursor points either to a value or to the "ghost" position
//! between the last and the first value.
//! Moving past either end lands on the ghost, moving further wraps around.

use allocator_api2::alloc::Allocator;

use crate::{
    handle::Handle,
    raw::RawSlots,
    slot::NIL,
    slot_vec::make_handle,
};

/// Read-only cursor.
pub struct Cursor<'a, T, A: Allocator> {
    raw: &'a RawSlots<T, A>,
    index: usize,
}

impl<T, A> Clone for Cursor<'_, T, A>
where
    A: Allocator,
{
    #[inline]
    fn clone(&self) -> Self {
        Cursor {
            raw: self.raw,
            index: self.index,
        }
    }
}

impl<'a, T, A> Cursor<'a, T, A>
where
    A: Allocator,
{
    pub(crate) fn new(raw: &'a RawSlots<T, A>, index: usize) -> Self {
        Cursor { raw, index }
    }

    /// Returns slot index of current value, `None` at the ghost position.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        (self.index != NIL).then_some(self.index)
    }

    /// Returns handle of current value, `None` at the ghost position.
    #[inline]
    pub fn handle(&self) -> Option<Handle<T>> {
        let index = self.index()?;
        Some(make_handle(index, self.raw.slots()[index].generation()))
    }

    /// Returns current value, `None` at the ghost position.
    #[inline]
    pub fn current(&self) -> Option<&'a T> {
        let raw: &'a RawSlots<T, A> = self.raw;
        let index = self.index()?;
        // Safety: cursor points to an active slot.
        Some(unsafe { raw.slots()[index].occupied_ref() })
    }

    /// Moves to the next value.
    #[inline]
    pub fn move_next(&mut self) {
        self.index = next_index(self.raw, self.index);
    }

    /// Moves to the previous value.
    #[inline]
    pub fn move_prev(&mut self) {
        self.index = prev_index(self.raw, self.index);
    }

    /// Returns the value after current one without moving.
    #[inline]
    pub fn peek_next(&self) -> Option<&'a T> {
        let mut next = self.clone();
        next.move_next();
        next.current()
    }

    /// Returns the value before current one without moving.
    #[inline]
    pub fn peek_prev(&self) -> Option<&'a T> {
        let mut prev = self.clone();
        prev.move_prev();
        prev.current()
    }
}

/// Cursor that can mutate and remove values.
pub struct CursorMut<'a, T, A: Allocator> {
    raw: &'a mut RawSlots<T, A>,
    index: usize,
}

impl<'a, T, A> CursorMut<'a, T, A>
where
    A: Allocator,
{
    pub(crate) fn new(raw: &'a mut RawSlots<T, A>, index: usize) -> Self {
        CursorMut { raw, index }
    }

    /// Returns slot index of current value, `None` at the ghost position.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        (self.index != NIL).then_some(self.index)
    }

    /// Returns handle of current value, `None` at the ghost position.
    #[inline]
    pub fn handle(&self) -> Option<Handle<T>> {
        let index = self.index()?;
        Some(make_handle(index, self.raw.slots()[index].generation()))
    }

    /// Returns current value, `None` at the ghost position.
    #[inline]
    pub fn current(&mut self) -> Option<&mut T> {
        let index = self.index()?;
        // Safety: cursor points to an active slot.
        Some(unsafe { self.raw.slots_mut()[index].occupied_mut() })
    }

    /// Moves to the next value.
    #[inline]
    pub fn move_next(&mut self) {
        self.index = next_index(self.raw, self.index);
    }

    /// Moves to the previous value.
    #[inline]
    pub fn move_prev(&mut self) {
        self.index = prev_index(self.raw, self.index);
    }

    /// Returns the value after current one without moving.
    #[inline]
    pub fn peek_next(&self) -> Option<&T> {
        self.as_cursor().peek_next()
    }

    /// Returns the value before current one without moving.
    #[inline]
    pub fn peek_prev(&self) -> Option<&T> {
        self.as_cursor().peek_prev()
    }

    /// Removes current value and moves to the next one.
    /// Returns `None` at the ghost position.
    pub fn remove_current(&mut self) -> Option<T> {
        let index = self.index()?;
        self.index = self.raw.slots()[index].next;
        Some(self.raw.take(index))
    }

    /// Reborrows as read-only cursor at the same position.
    #[inline]
    pub fn as_cursor(&self) -> Cursor<'_, T, A> {
        Cursor::new(&*self.raw, self.index)
    }
}

#[inline(always)]
fn next_index<T, A: Allocator>(raw: &RawSlots<T, A>, index: usize) -> usize {
    if index == NIL {
        raw.head()
    } else {
        raw.slots()[index].next
    }
}

#[inline(always)]
fn prev_index<T, A: Allocator>(raw: &RawSlots<T, A>, index: usize) -> usize {
    if index == NIL {
        raw.tail()
    } else {
        raw.slots()[index].prev
    }
}
