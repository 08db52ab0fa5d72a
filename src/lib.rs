//! Persistent collections over a shareable byte arena.
//!
//! Every structure lives in a contiguous byte region (one [`Arena`] per
//! structure family) that can be handed, read-only, to other threads of
//! the same process without serialization. Updates never touch existing
//! nodes: the write path reallocates the nodes along the mutation path
//! and pointer-shares everything else, so each write returns a new
//! [handle](#handles) while every older handle keeps observing its own
//! version until the arena is reset.
//!
//! # Structures
//!
//! - [`SharedMap`] / [`SharedSet`] — hash array mapped trie
//! - [`SharedList`] — radix-32 vector trie with a tail buffer
//! - [`SharedOrderedMap`] / [`SharedOrderedSet`] — HAMT threaded by a
//!   doubly-linked insertion order
//! - [`SharedSortedMap`] / [`SharedSortedSet`] — red-black tree with the
//!   comparator inside the tree
//! - [`SharedPriorityQueue`] — persistent leftist heap (default) or an
//!   in-arena binary heap
//! - [`SharedStack`], [`SharedQueue`], [`SharedLinkedList`],
//!   [`SharedDoublyLinkedList`] — linked-node structures
//!
//! # Handles
//!
//! A handle is the small immutable record a caller holds to read and
//! extend one logical version: root pointers, sizes, a value-kind tag,
//! and a generation tag. Writes take `&mut Arena` and return a new
//! handle; reads take `&Arena`. Handles that predate an
//! [`Arena::reset`] are *stale*: reads return absent, writes start over
//! on a fresh empty structure.
//!
//! # Sharing
//!
//! One writer per arena per epoch; quiesced arenas are safe for any
//! number of concurrent readers because persistent nodes are written
//! exactly once. [`WorkerSnapshot`] packages an arena plus named handles
//! for another thread; the receiver attaches zero-copy or over a byte
//! copy ([`Arena::attach_to_memory`] / [`Arena::attach_to_buffer_copy`]).
//! Values can themselves be structures: a nested handle travels as a
//! JSON [`Envelope`] through the ordinary value path.
//!
//! The doubly-linked list's node links and the binary heap's entries are
//! the two documented in-place exceptions; neither may be shared across
//! epochs.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod arena;
pub mod envelope;
pub mod error;
pub mod hamt;
pub mod hash;
pub mod rbtree;
pub mod roots;
pub mod word;

mod list;
mod map;
mod ordered;
mod pqueue;
mod snapshot;
mod sorted;
mod value;
mod vector;

#[cfg(test)]
mod tests;

pub use arena::{AllocState, Arena, ArenaSnapshot, FixedClass};
pub use envelope::{Envelope, HandleFields};
pub use error::Error;
pub use list::{SharedDoublyLinkedList, SharedLinkedList, SharedQueue, SharedStack};
pub use map::{SharedMap, SharedSet};
pub use ordered::{SharedOrderedMap, SharedOrderedSet};
pub use pqueue::SharedPriorityQueue;
pub use rbtree::KeyOrder;
pub use roots::{RootSlots, SlotId};
pub use snapshot::{AnyHandle, WorkerSnapshot};
pub use sorted::{SharedSortedMap, SharedSortedSet};
pub use value::{StructureKind, Value, ValueKind};
pub use vector::SharedList;
pub use word::PackedWord;
