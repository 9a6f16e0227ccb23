use core::alloc::Layout;

/// Errors reported by [`SlotVec`](crate::SlotVec) operations.
///
/// Handle validation happens before any mutation,
/// so the container is unchanged when one of these is returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Handle index is outside of the range of slots ever initialized.
    #[error("slot index {index} is out of range, {initialized} slots are initialized")]
    OutOfRange { index: usize, initialized: usize },

    /// Slot is vacant or holds a newer value than the handle refers to.
    #[error("handle {index}v{generation} does not refer to a live value")]
    InvalidHandle { index: usize, generation: u32 },

    /// Allocator failed to provide memory for the slot buffer.
    #[error(
        "failed to allocate {size} bytes aligned to {align}",
        size = .layout.size(),
        align = .layout.align()
    )]
    AllocationFailure { layout: Layout },

    /// Requested capacity cannot be represented.
    #[error("capacity overflow")]
    CapacityOverflow,

    /// Same slot was requested more than once for disjoint mutable access.
    #[error("slot {index} is requested more than once")]
    Aliased { index: usize },
}

#[test]
#[cfg(feature = "std")]
fn test_error_messages() {
    use std::string::ToString;

    let err = Error::InvalidHandle {
        index: 3,
        generation: 2,
    };
    assert_eq!(err.to_string(), "handle 3v2 does not refer to a live value");

    let err = Error::OutOfRange {
        index: 7,
        initialized: 4,
    };
    assert_eq!(
        err.to_string(),
        "slot index 7 is out of range, 4 slots are initialized"
    );

    let layout = Layout::from_size_align(48, 8).unwrap();
    let err = Error::AllocationFailure { layout };
    assert_eq!(err.to_string(), "failed to allocate 48 bytes aligned to 8");
}
