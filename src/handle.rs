//! Durable references into a [`SlotVec`](crate::SlotVec).

use core::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

/// Handle to a value stored in a [`SlotVec`](crate::SlotVec).
///
/// Consists of slot index and generation of the slot at the time value was inserted.
/// Handle stays valid until the value is removed, regardless of other insertions and removals
/// and of buffer reallocations.
/// Once the value is removed, the handle never resolves again,
/// even if the slot is reused for another value.
///
/// Handles do not own anything and are cheap to copy and store.
/// They are only meaningful for the container that issued them.
///
/// Element type is part of the handle type to prevent mixing handles of different containers
/// by accident. It does not affect auto traits.
#[repr(C)]
pub struct Handle<T> {
    index: u32,
    generation: u32,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Handle<T> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    #[inline(always)]
    fn cmp(&self, other: &Self) -> Ordering {
        (self.index, self.generation).cmp(&(other.index, other.generation))
    }
}

impl<T> Hash for Handle<T> {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bits().hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::DANGLING {
            f.write_str("Handle(dangling)")
        } else {
            write!(f, "Handle({}v{})", self.index, self.generation)
        }
    }
}

impl<T> Default for Handle<T> {
    #[inline(always)]
    fn default() -> Self {
        Self::DANGLING
    }
}

impl<T> Handle<T> {
    /// Handle that never resolves.
    ///
    /// Useful as placeholder for a reference that is not set yet.
    pub const DANGLING: Self = Handle::from_raw_parts(u32::MAX, 0);

    /// Reconstructs handle from its parts.
    ///
    /// Any pair of numbers is a valid handle,
    /// containers check whether it resolves on each access.
    #[inline(always)]
    #[must_use]
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Handle {
            index,
            generation,
            marker: PhantomData,
        }
    }

    /// Returns slot index of the handle.
    #[inline(always)]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index as usize
    }

    /// Returns generation of the slot the handle refers to.
    #[inline(always)]
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Packs the handle into single `u64`.
    /// Index occupies upper half, generation lower half.
    #[inline(always)]
    #[must_use]
    pub const fn to_bits(&self) -> u64 {
        ((self.index as u64) << 32) | self.generation as u64
    }

    /// Unpacks handle from `u64` produced by [`to_bits`](Self::to_bits).
    #[inline(always)]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_bits(bits: u64) -> Self {
        Handle::from_raw_parts((bits >> 32) as u32, bits as u32)
    }
}

#[test]
fn test_handle_bits() {
    let handle = Handle::<u8>::from_raw_parts(7, 3);
    assert_eq!(handle.index(), 7);
    assert_eq!(handle.generation(), 3);
    assert_eq!(handle.to_bits(), (7 << 32) | 3);
    assert_eq!(Handle::<u8>::from_bits(handle.to_bits()), handle);
}

#[test]
fn test_handle_ordering() {
    let a = Handle::<()>::from_raw_parts(1, 5);
    let b = Handle::<()>::from_raw_parts(1, 6);
    let c = Handle::<()>::from_raw_parts(2, 0);
    assert!(a < b && b < c);
    assert_ne!(a, b);
    assert_eq!(Handle::<()>::default(), Handle::DANGLING);
}

#[test]
#[cfg(feature = "std")]
fn test_handle_debug() {
    use std::format;

    assert_eq!(format!("{:?}", Handle::<i32>::from_raw_parts(4, 1)), "Handle(4v1)");
    assert_eq!(format!("{:?}", Handle::<i32>::DANGLING), "Handle(dangling)");
}
