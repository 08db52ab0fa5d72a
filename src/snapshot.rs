//! Publisher → subscriber snapshots.
//!
//! The bytes crossing a thread boundary are the arena (shared or
//! copied), the allocator state, and a set of named structure handles.
//! The transport must establish a happens-before edge between the
//! sender's last write and the receiver's first read; the library
//! assumes one writer per arena per epoch.

use crate::arena::{Arena, ArenaSnapshot};
use crate::envelope::Envelope;
use crate::error::Error;
use crate::list::{SharedDoublyLinkedList, SharedLinkedList, SharedQueue, SharedStack};
use crate::map::{SharedMap, SharedSet};
use crate::ordered::{SharedOrderedMap, SharedOrderedSet};
use crate::pqueue::SharedPriorityQueue;
use crate::sorted::{SharedSortedMap, SharedSortedSet};
use crate::value::StructureKind;
use crate::vector::SharedList;

/// A handle of any structure kind; the runtime half of the registry.
#[derive(Clone, Debug)]
pub enum AnyHandle {
    /// Unordered map.
    Map(SharedMap),
    /// Unordered set.
    Set(SharedSet),
    /// Indexed list.
    List(SharedList),
    /// Stack.
    Stack(SharedStack),
    /// Queue.
    Queue(SharedQueue),
    /// Singly-linked list.
    LinkedList(SharedLinkedList),
    /// Doubly-linked list.
    DoublyLinkedList(SharedDoublyLinkedList),
    /// Insertion-ordered map.
    OrderedMap(SharedOrderedMap),
    /// Insertion-ordered set.
    OrderedSet(SharedOrderedSet),
    /// Sorted map.
    SortedMap(SharedSortedMap),
    /// Sorted set.
    SortedSet(SharedSortedSet),
    /// Priority queue.
    PriorityQueue(SharedPriorityQueue),
}

impl AnyHandle {
    /// The structure kind tag of this handle.
    #[must_use]
    pub const fn kind(&self) -> StructureKind {
        match self {
            Self::Map(_) => StructureKind::SharedMap,
            Self::Set(_) => StructureKind::SharedSet,
            Self::List(_) => StructureKind::SharedList,
            Self::Stack(_) => StructureKind::SharedStack,
            Self::Queue(_) => StructureKind::SharedQueue,
            Self::LinkedList(_) => StructureKind::SharedLinkedList,
            Self::DoublyLinkedList(_) => StructureKind::SharedDoublyLinkedList,
            Self::OrderedMap(_) => StructureKind::SharedOrderedMap,
            Self::OrderedSet(_) => StructureKind::SharedOrderedSet,
            Self::SortedMap(_) => StructureKind::SharedSortedMap,
            Self::SortedSet(_) => StructureKind::SharedSortedSet,
            Self::PriorityQueue(_) => StructureKind::SharedPriorityQueue,
        }
    }

    /// Packages the handle as an envelope.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        match self {
            Self::Map(h) => h.to_envelope(),
            Self::Set(h) => h.to_envelope(),
            Self::List(h) => h.to_envelope(),
            Self::Stack(h) => h.to_envelope(),
            Self::Queue(h) => h.to_envelope(),
            Self::LinkedList(h) => h.to_envelope(),
            Self::DoublyLinkedList(h) => h.to_envelope(),
            Self::OrderedMap(h) => h.to_envelope(),
            Self::OrderedSet(h) => h.to_envelope(),
            Self::SortedMap(h) => h.to_envelope(),
            Self::SortedSet(h) => h.to_envelope(),
            Self::PriorityQueue(h) => h.to_envelope(),
        }
    }

    /// Rebuilds a handle from an envelope against `arena`, dispatching
    /// through the registry.
    ///
    /// # Errors
    ///
    /// Codec errors from cache rebuilding during decode.
    pub fn from_envelope(arena: &Arena, env: &Envelope) -> Result<Self, Error> {
        Ok(match env.kind {
            StructureKind::SharedMap => Self::Map(SharedMap::from_envelope(arena, env)),
            StructureKind::SharedSet => Self::Set(SharedSet::from_envelope(arena, env)),
            StructureKind::SharedList => Self::List(SharedList::from_envelope(arena, env)),
            StructureKind::SharedStack => Self::Stack(SharedStack::from_envelope(arena, env)?),
            StructureKind::SharedQueue => Self::Queue(SharedQueue::from_envelope(arena, env)),
            StructureKind::SharedLinkedList => {
                Self::LinkedList(SharedLinkedList::from_envelope(arena, env))
            }
            StructureKind::SharedDoublyLinkedList => {
                Self::DoublyLinkedList(SharedDoublyLinkedList::from_envelope(arena, env))
            }
            StructureKind::SharedOrderedMap => {
                Self::OrderedMap(SharedOrderedMap::from_envelope(arena, env))
            }
            StructureKind::SharedOrderedSet => {
                Self::OrderedSet(SharedOrderedSet::from_envelope(arena, env))
            }
            StructureKind::SharedSortedMap => {
                Self::SortedMap(SharedSortedMap::from_envelope(arena, env))
            }
            StructureKind::SharedSortedSet => {
                Self::SortedSet(SharedSortedSet::from_envelope(arena, env))
            }
            StructureKind::SharedPriorityQueue => {
                Self::PriorityQueue(SharedPriorityQueue::from_envelope(arena, env)?)
            }
        })
    }
}

/// Everything a subscriber needs: the arena snapshot plus named
/// structure handles.
#[derive(Clone, Debug)]
pub struct WorkerSnapshot {
    arena: ArenaSnapshot,
    structures: Vec<(String, Envelope)>,
}

impl WorkerSnapshot {
    /// Packages `arena` and the named handles for another worker.
    /// Zero-copy; the arena bytes travel behind an `Arc`.
    #[must_use]
    pub fn publish<'a>(
        arena: &Arena,
        structures: impl IntoIterator<Item = (&'a str, &'a AnyHandle)>,
    ) -> Self {
        Self {
            arena: arena.snapshot(),
            structures: structures
                .into_iter()
                .map(|(name, handle)| (name.to_owned(), handle.to_envelope()))
                .collect(),
        }
    }

    /// Attaches over the shared backing memory (zero-copy), returning
    /// the worker-side arena and its decoded handles.
    ///
    /// # Errors
    ///
    /// Registry and codec errors from handle decoding.
    pub fn attach(&self) -> Result<(Arena, Vec<(String, AnyHandle)>), Error> {
        let arena = Arena::attach_to_memory(&self.arena);
        let handles = self.decode(&arena)?;
        Ok((arena, handles))
    }

    /// Attaches over a byte copy of the backing memory, for transports
    /// that cannot share it.
    ///
    /// # Errors
    ///
    /// Registry and codec errors from handle decoding.
    pub fn attach_to_copy(&self, bytes: Vec<u8>) -> Result<(Arena, Vec<(String, AnyHandle)>), Error> {
        let arena = Arena::attach_to_buffer_copy(bytes, self.arena.state());
        let handles = self.decode(&arena)?;
        Ok((arena, handles))
    }

    fn decode(&self, arena: &Arena) -> Result<Vec<(String, AnyHandle)>, Error> {
        self.structures
            .iter()
            .map(|(name, env)| Ok((name.clone(), AnyHandle::from_envelope(arena, env)?)))
            .collect()
    }
}
