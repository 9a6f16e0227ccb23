use core::mem::MaybeUninit;

/// Link value that refers to the sentinel.
///
/// In the active chain it marks both ends, in the free list it marks the end.
pub(crate) const NIL: usize = usize::MAX;

/// Single storage cell of the slotted vector.
///
/// Value is initialized iff `active` is set.
/// While active, `prev` and `next` link the slot into the active chain.
/// While vacant, `next` links the slot into the free list.
pub(crate) struct Slot<T> {
    value: MaybeUninit<T>,
    generation: u32,
    active: bool,
    pub(crate) prev: usize,
    pub(crate) next: usize,
}

impl<T> Slot<T> {
    /// Fresh slot record that has never held a value.
    #[inline(always)]
    pub(crate) const fn vacant() -> Self {
        Slot {
            value: MaybeUninit::uninit(),
            generation: 0,
            active: false,
            prev: NIL,
            next: NIL,
        }
    }

    #[inline(always)]
    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    #[inline(always)]
    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }

    /// Slot that exhausted its generations is never reused.
    #[inline(always)]
    pub(crate) fn is_retired(&self) -> bool {
        !self.active && self.generation == u32::MAX
    }

    #[inline(always)]
    pub(crate) fn matches(&self, generation: u32) -> bool {
        self.active && self.generation == generation
    }

    /// Generation the slot will have after next `occupy` with the same `floor`.
    #[inline(always)]
    pub(crate) fn next_generation(&self, floor: u32) -> u32 {
        debug_assert!(!self.is_retired());
        (self.generation + 1).max(floor)
    }

    /// Writes the value and bumps generation.
    /// Returns new generation.
    #[inline(always)]
    pub(crate) fn occupy(&mut self, value: T, floor: u32) -> u32 {
        debug_assert!(!self.active, "slot is not vacant");
        let generation = self.next_generation(floor);
        self.value = MaybeUninit::new(value);
        self.generation = generation;
        self.active = true;
        generation
    }

    /// # Safety
    ///
    /// Slot must be active.
    #[inline(always)]
    pub(crate) unsafe fn occupied_ref(&self) -> &T {
        debug_assert!(self.active, "slot is not occupied");
        unsafe { self.value.assume_init_ref() }
    }

    /// # Safety
    ///
    /// Slot must be active.
    #[inline(always)]
    pub(crate) unsafe fn occupied_mut(&mut self) -> &mut T {
        debug_assert!(self.active, "slot is not occupied");
        unsafe { self.value.assume_init_mut() }
    }

    /// Moves value out of the slot and marks it vacant.
    /// Links are left untouched.
    ///
    /// # Safety
    ///
    /// Slot must be active.
    #[inline(always)]
    pub(crate) unsafe fn vacate(&mut self) -> T {
        debug_assert!(self.active, "slot is not occupied");
        self.active = false;
        unsafe { self.value.assume_init_read() }
    }

    /// Drops value in place and marks the slot vacant.
    ///
    /// Slot is marked vacant before the value is dropped,
    /// so a panicking destructor cannot cause a double drop.
    ///
    /// # Safety
    ///
    /// Slot must be active.
    #[inline(always)]
    pub(crate) unsafe fn vacate_drop(&mut self) {
        debug_assert!(self.active, "slot is not occupied");
        self.active = false;
        unsafe { self.value.assume_init_drop() }
    }

    /// Forgets the value without dropping it.
    #[inline(always)]
    pub(crate) fn vacate_leak(&mut self) {
        self.active = false;
    }

    /// Pointer to the value of the slot behind `slot`.
    ///
    /// Does not create a reference to the slot, so links may be read
    /// while the value is mutably borrowed elsewhere.
    ///
    /// # Safety
    ///
    /// `slot` must point to a live slot record.
    #[inline(always)]
    pub(crate) unsafe fn value_ptr(slot: *mut Slot<T>) -> *mut T {
        unsafe { (&raw mut (*slot).value).cast::<T>() }
    }
}

#[test]
fn test_slot_generations() {
    let mut slot = Slot::vacant();
    assert!(!slot.is_active());
    assert_eq!(slot.generation(), 0);

    assert_eq!(slot.occupy(5u32, 0), 1);
    assert!(slot.matches(1));
    assert_eq!(unsafe { *slot.occupied_ref() }, 5);

    *unsafe { slot.occupied_mut() } += 1;
    assert_eq!(unsafe { slot.vacate() }, 6);
    assert!(!slot.matches(1));

    // Floor lifts generation above anything issued elsewhere.
    assert_eq!(slot.occupy(7, 10), 10);
    assert_eq!(slot.generation(), 10);
    unsafe { slot.vacate_drop() };
    assert_eq!(slot.next_generation(0), 11);
}

#[test]
fn test_slot_retirement() {
    let mut slot = Slot::vacant();
    assert_eq!(slot.occupy((), u32::MAX), u32::MAX);
    assert!(!slot.is_retired());
    slot.vacate_leak();
    assert!(slot.is_retired());
}
