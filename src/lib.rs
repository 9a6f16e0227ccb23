//! # Slotted
//!
//! Slotted vector - storage for values that are referenced by durable handles
//! instead of pointers or indices.
//!
//! [`SlotVec`] stores values in a contiguous, geometrically growing buffer of slots
//! and returns a [`Handle`] for each inserted value.
//! A handle is a pair of slot index and slot generation.
//! Removing a value frees its slot for reuse in O(1) and
//! the generation makes sure that handle of a removed value is rejected
//! even after its slot is reused.
//!
//! ## Guarantees
//!
//! ### 🎟️ Handles survive growth
//! Growing the buffer keeps every value at the same slot index,
//! so handles stay valid across reallocations.
//!
//! ```rust
//! use slotted::SlotVec;
//!
//! let mut vec = SlotVec::with_capacity(1);
//! let first = vec.push(String::from("first"));
//!
//! for i in 0..100 {
//!     vec.push(i.to_string());
//! }
//!
//! assert!(vec.capacity() >= 101);
//! assert_eq!(vec[first], "first");
//! ```
//!
//! ### 🧟 Stale handles are rejected
//! Each slot counts how many times it was filled.
//! A handle remembers the count at insertion and is rejected once it differs.
//!
//! ```rust
//! use slotted::{Error, SlotVec};
//!
//! let mut vec = SlotVec::new();
//! let old = vec.push(1);
//! vec.pop(old).unwrap();
//!
//! let new = vec.push(2);
//! assert_eq!(new.index(), old.index());
//! assert_ne!(new.generation(), old.generation());
//!
//! assert_eq!(vec.at(old), Err(Error::InvalidHandle { index: 0, generation: 1 }));
//! assert_eq!(vec.at(new), Ok(&2));
//! ```
//!
//! ### 🔗 Stable iteration order
//! Values are threaded into a doubly-linked chain in insertion order.
//! Iteration follows the chain in either direction, skips freed slots for free,
//! and places values inserted into reused slots at the end.
//!
//! ```rust
//! use slotted::SlotVec;
//!
//! let mut vec = SlotVec::new();
//! let a = vec.push('a');
//! let b = vec.push('b');
//! let c = vec.push('c');
//!
//! vec.remove(a).unwrap();
//! vec.push('d');
//!
//! assert_eq!(vec.iter().collect::<String>(), "bcd");
//! assert_eq!(vec.iter().rev().collect::<String>(), "dcb");
//! # let _ = (b, c);
//! ```
//!
//! ### 🪞 Independent clones
//! Clone packs values into a fresh buffer with its own handle space.
//! Handles of the original are not valid for the clone.
//!
//! ```rust
//! use slotted::SlotVec;
//!
//! let mut original = SlotVec::new();
//! let h = original.push(vec![1, 2, 3]);
//!
//! let mut copy = original.clone();
//! assert!(copy.get(h).is_none());
//!
//! let h2 = copy.first().unwrap();
//! copy[h2].push(4);
//! assert_eq!(original[h], [1, 2, 3]);
//! ```
//!
//! ### 🧮 Custom allocators
//! Any [`Allocator`] can back the buffer.
//! Allocation failures are reported by `try_*` methods.
//!
//! ```rust
//! use slotted::{Global, SlotVec};
//!
//! let mut vec = SlotVec::<u64, _>::try_with_capacity_in(16, Global).unwrap();
//! let h = vec.try_insert_with(|| 42).unwrap();
//! assert_eq!(vec[h], 42);
//! ```
//!
//! ## `no-std` support
//!
//! The crate is `no-std` and needs only `alloc`.
//! Default `std` feature enables `std` support in `allocator-api2`.
//!

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(clippy::pedantic)]
#![allow(clippy::inline_always, clippy::module_name_repetitions)]

extern crate alloc;

pub mod cursor;
pub mod error;
pub mod handle;
pub mod iter;
pub mod slot_vec;

mod raw;
mod slot;

pub use allocator_api2::alloc::{AllocError, Allocator, Global};

pub use self::{error::Error, handle::Handle, slot_vec::SlotVec};

// Few central functions responsible for reporting failures of panicking methods.
// This keeps code generation related to these panics minimal as there's
// only one location for each that panics rather than a bunch throughout the crate.

#[cold]
#[inline(never)]
fn capacity_overflow() -> ! {
    panic!("capacity overflow");
}

#[cold]
#[inline(never)]
fn alloc_failure(err: Error) -> ! {
    match err {
        Error::AllocationFailure { layout } => alloc::alloc::handle_alloc_error(layout),
        _ => capacity_overflow(),
    }
}

#[cold]
#[inline(never)]
#[track_caller]
fn invalid_handle(err: Error) -> ! {
    panic!("{err}");
}
