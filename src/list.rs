//! Linked-list primitives and the stack / queue / list handles.
//!
//! Two node shapes, both 16 bytes:
//!
//! - Doubly-linked: `[prev: u32][next: u32][value: u64]`
//! - Singly-linked: `[next: u32][pad: u32][value: u64]`
//!
//! Unlike the tries, doubly-linked mutations rewrite node links in
//! place; persistence exists only at the handle layer, and older handles
//! stay valid only for prefixes/suffixes whose interior was not touched.
//! Removed doubly-linked nodes return to their free list. The
//! singly-linked list is different: stack pushes and pops are pure
//! cons-cell sharing, so stack handles are fully persistent; queue and
//! list appends mutate the old tail's `next` link in place.
//!
//! None of these nodes may be shared across arena epochs.

use std::fmt;

use crate::arena::{Arena, FixedClass};
use crate::envelope::{Envelope, HandleFields};
use crate::error::Error;
use crate::value::{StructureKind, Value, ValueKind};

const DL_PREV: u32 = 0;
const DL_NEXT: u32 = 4;
const DL_VALUE: u32 = 8;

const SL_NEXT: u32 = 0;
const SL_VALUE: u32 = 8;

// ---------------------------------------------------------------------------
// Doubly-linked node primitives
// ---------------------------------------------------------------------------

fn dl_alloc(arena: &mut Arena, prev: u32, next: u32, value: u64) -> Result<u32, Error> {
    let node = arena.alloc_fixed(FixedClass::DoublyNode)?;
    arena.write_u32(node + DL_PREV, prev);
    arena.write_u32(node + DL_NEXT, next);
    arena.write_u64(node + DL_VALUE, value);
    Ok(node)
}

fn dl_prev(arena: &Arena, node: u32) -> u32 {
    arena.read_u32(node + DL_PREV)
}

fn dl_next(arena: &Arena, node: u32) -> u32 {
    arena.read_u32(node + DL_NEXT)
}

fn dl_value(arena: &Arena, node: u32) -> u64 {
    arena.read_u64(node + DL_VALUE)
}

fn dl_set_prev(arena: &mut Arena, node: u32, v: u32) {
    arena.write_u32(node + DL_PREV, v);
}

fn dl_set_next(arena: &mut Arena, node: u32, v: u32) {
    arena.write_u32(node + DL_NEXT, v);
}

/// Walks `i` nodes forward from `from`. Returns `0` past the end.
fn dl_seek(arena: &Arena, from: u32, i: u32) -> u32 {
    let mut node = from;
    let mut left = i;
    while node != 0 && left > 0 {
        node = dl_next(arena, node);
        left -= 1;
    }
    node
}

/// Walks `i` nodes backward from `from`. Returns `0` past the front.
fn dl_seek_back(arena: &Arena, from: u32, i: u32) -> u32 {
    let mut node = from;
    let mut left = i;
    while node != 0 && left > 0 {
        node = dl_prev(arena, node);
        left -= 1;
    }
    node
}

// ---------------------------------------------------------------------------
// Singly-linked node primitives
// ---------------------------------------------------------------------------

fn sl_alloc(arena: &mut Arena, next: u32, value: u64) -> Result<u32, Error> {
    let node = arena.alloc_fixed(FixedClass::SinglyNode)?;
    arena.write_u32(node + SL_NEXT, next);
    arena.write_u64(node + SL_VALUE, value);
    Ok(node)
}

fn sl_next(arena: &Arena, node: u32) -> u32 {
    arena.read_u32(node + SL_NEXT)
}

fn sl_value(arena: &Arena, node: u32) -> u64 {
    arena.read_u64(node + SL_VALUE)
}

fn sl_set_next(arena: &mut Arena, node: u32, v: u32) {
    arena.write_u32(node + SL_NEXT, v);
}

// ---------------------------------------------------------------------------
// Doubly-linked list handle
// ---------------------------------------------------------------------------

/// Doubly-linked list handle: `(head, tail, size, value kind)`.
///
/// O(1) at the ends, O(i) at index `i`. Interior mutations rewrite links
/// in place; for a fully persistent ordered structure use
/// [`SharedOrderedMap`](crate::SharedOrderedMap) instead.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SharedDoublyLinkedList {
    head: u32,
    tail: u32,
    size: u32,
    kind: ValueKind,
    generation: u32,
}

impl SharedDoublyLinkedList {
    /// Creates an empty list whose elements decode under `kind`.
    #[must_use]
    pub fn new(arena: &Arena, kind: ValueKind) -> Self {
        Self { head: 0, tail: 0, size: 0, kind, generation: arena.generation() }
    }

    /// Number of elements in this version.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size as usize
    }

    /// Returns `true` if this version holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The element kind of this list.
    #[must_use]
    pub const fn value_kind(&self) -> &ValueKind {
        &self.kind
    }

    fn base(&self, arena: &Arena) -> Self {
        if arena.is_current(self.generation) {
            self.clone()
        } else {
            Self::new(arena, self.kind.clone())
        }
    }

    /// Returns a new version with `value` at the front.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn prepend(&self, arena: &mut Arena, value: &Value) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let v = value.encode_slot(arena)?;
        let node = dl_alloc(arena, 0, base.head, v)?;
        if base.head != 0 {
            dl_set_prev(arena, base.head, node);
        } else {
            base.tail = node;
        }
        base.head = node;
        base.size += 1;
        Ok(base)
    }

    /// Returns a new version with `value` at the back.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn append(&self, arena: &mut Arena, value: &Value) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let v = value.encode_slot(arena)?;
        let node = dl_alloc(arena, base.tail, 0, v)?;
        if base.tail != 0 {
            dl_set_next(arena, base.tail, node);
        } else {
            base.head = node;
        }
        base.tail = node;
        base.size += 1;
        Ok(base)
    }

    /// Returns a new version with `value` inserted before index `i`.
    /// An out-of-range index returns the same handle unchanged.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn insert_before(&self, arena: &mut Arena, i: usize, value: &Value) -> Result<Self, Error> {
        let base = self.base(arena);
        let Ok(i) = u32::try_from(i) else { return Ok(base) };
        if i >= base.size {
            return Ok(base);
        }
        if i == 0 {
            return base.prepend(arena, value);
        }
        let at = dl_seek(arena, base.head, i);
        base.link_before(arena, at, value)
    }

    /// Returns a new version with `value` inserted after index `i`.
    /// An out-of-range index returns the same handle unchanged.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn insert_after(&self, arena: &mut Arena, i: usize, value: &Value) -> Result<Self, Error> {
        let base = self.base(arena);
        let Ok(i) = u32::try_from(i) else { return Ok(base) };
        if i >= base.size {
            return Ok(base);
        }
        if i == base.size - 1 {
            return base.append(arena, value);
        }
        let at = dl_seek(arena, base.head, i + 1);
        base.link_before(arena, at, value)
    }

    fn link_before(mut self, arena: &mut Arena, at: u32, value: &Value) -> Result<Self, Error> {
        let v = value.encode_slot(arena)?;
        let prev = dl_prev(arena, at);
        let node = dl_alloc(arena, prev, at, v)?;
        dl_set_prev(arena, at, node);
        if prev != 0 {
            dl_set_next(arena, prev, node);
        } else {
            self.head = node;
        }
        self.size += 1;
        Ok(self)
    }

    /// Returns a new version without the first element. A no-op on an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Never fails today; `Result` for parity with the other writes.
    pub fn remove_first(&self, arena: &mut Arena) -> Result<Self, Error> {
        let mut base = self.base(arena);
        if base.head == 0 {
            return Ok(base);
        }
        base.unlink(arena, base.head);
        Ok(base)
    }

    /// Returns a new version without the last element. A no-op on an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Never fails today; `Result` for parity with the other writes.
    pub fn remove_last(&self, arena: &mut Arena) -> Result<Self, Error> {
        let mut base = self.base(arena);
        if base.tail == 0 {
            return Ok(base);
        }
        base.unlink(arena, base.tail);
        Ok(base)
    }

    /// Returns a new version without the element at index `i`. An
    /// out-of-range index returns the same handle unchanged.
    ///
    /// # Errors
    ///
    /// Never fails today; `Result` for parity with the other writes.
    pub fn remove_at(&self, arena: &mut Arena, i: usize) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let Ok(i) = u32::try_from(i) else { return Ok(base) };
        if i >= base.size {
            return Ok(base);
        }
        let node = dl_seek(arena, base.head, i);
        base.unlink(arena, node);
        Ok(base)
    }

    fn unlink(&mut self, arena: &mut Arena, node: u32) {
        let prev = dl_prev(arena, node);
        let next = dl_next(arena, node);
        if prev != 0 {
            dl_set_next(arena, prev, next);
        } else {
            self.head = next;
        }
        if next != 0 {
            dl_set_prev(arena, next, prev);
        } else {
            self.tail = prev;
        }
        self.size -= 1;
        arena.free_fixed(FixedClass::DoublyNode, node);
    }

    /// Reads the element at `i` from the head; out-of-range reads are
    /// absent.
    ///
    /// # Errors
    ///
    /// Codec errors from slot decoding.
    pub fn get(&self, arena: &Arena, i: usize) -> Result<Option<Value>, Error> {
        if !arena.is_current(self.generation) {
            return Ok(None);
        }
        let Ok(i) = u32::try_from(i) else { return Ok(None) };
        if i >= self.size {
            return Ok(None);
        }
        let node = dl_seek(arena, self.head, i);
        Value::decode_slot(&self.kind, arena, dl_value(arena, node)).map(Some)
    }

    /// Reads the element `i` places before the tail; out-of-range reads
    /// are absent.
    ///
    /// # Errors
    ///
    /// Codec errors from slot decoding.
    pub fn get_reverse(&self, arena: &Arena, i: usize) -> Result<Option<Value>, Error> {
        if !arena.is_current(self.generation) {
            return Ok(None);
        }
        let Ok(i) = u32::try_from(i) else { return Ok(None) };
        if i >= self.size {
            return Ok(None);
        }
        let node = dl_seek_back(arena, self.tail, i);
        Value::decode_slot(&self.kind, arena, dl_value(arena, node)).map(Some)
    }

    /// Visits elements head to tail.
    ///
    /// # Errors
    ///
    /// Codec errors from slot decoding.
    pub fn for_each(&self, arena: &Arena, mut f: impl FnMut(usize, Value)) -> Result<(), Error> {
        if !arena.is_current(self.generation) {
            return Ok(());
        }
        let mut node = self.head;
        let mut i = 0;
        while node != 0 && i < self.size {
            f(i as usize, Value::decode_slot(&self.kind, arena, dl_value(arena, node))?);
            node = dl_next(arena, node);
            i += 1;
        }
        Ok(())
    }

    /// Visits elements tail to head.
    ///
    /// # Errors
    ///
    /// Codec errors from slot decoding.
    pub fn for_each_reverse(
        &self,
        arena: &Arena,
        mut f: impl FnMut(usize, Value),
    ) -> Result<(), Error> {
        if !arena.is_current(self.generation) {
            return Ok(());
        }
        let mut node = self.tail;
        let mut i = 0;
        while node != 0 && i < self.size {
            f(i as usize, Value::decode_slot(&self.kind, arena, dl_value(arena, node))?);
            node = dl_prev(arena, node);
            i += 1;
        }
        Ok(())
    }

    /// Collects every element, head to tail.
    ///
    /// # Errors
    ///
    /// As for [`for_each`](Self::for_each).
    pub fn to_vec(&self, arena: &Arena) -> Result<Vec<Value>, Error> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each(arena, |_, v| out.push(v))?;
        Ok(out)
    }

    /// Packages this handle for a nested envelope or worker snapshot.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        Envelope {
            kind: StructureKind::SharedDoublyLinkedList,
            inner: self.kind.clone(),
            data: HandleFields {
                head: self.head,
                tail: self.tail,
                size: self.size,
                ..HandleFields::default()
            },
        }
    }

    /// Rebuilds a handle from envelope fields against `arena`.
    #[must_use]
    pub fn from_envelope(arena: &Arena, env: &Envelope) -> Self {
        Self {
            head: env.data.head,
            tail: env.data.tail,
            size: env.data.size,
            kind: env.inner.clone(),
            generation: arena.generation(),
        }
    }
}

impl fmt::Display for SharedDoublyLinkedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedDoublyLinkedList<{}>[{}]", self.kind, self.size)
    }
}

// ---------------------------------------------------------------------------
// Singly-linked list handle
// ---------------------------------------------------------------------------

/// Singly-linked list handle: `(head, tail, size, value kind)`.
///
/// Front pushes and pops share cons cells; back pushes rewrite the old
/// tail's `next` link in place.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SharedLinkedList {
    head: u32,
    tail: u32,
    size: u32,
    kind: ValueKind,
    generation: u32,
}

impl SharedLinkedList {
    /// Creates an empty list whose elements decode under `kind`.
    #[must_use]
    pub fn new(arena: &Arena, kind: ValueKind) -> Self {
        Self { head: 0, tail: 0, size: 0, kind, generation: arena.generation() }
    }

    /// Number of elements in this version.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size as usize
    }

    /// Returns `true` if this version holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The element kind of this list.
    #[must_use]
    pub const fn value_kind(&self) -> &ValueKind {
        &self.kind
    }

    fn base(&self, arena: &Arena) -> Self {
        if arena.is_current(self.generation) {
            self.clone()
        } else {
            Self::new(arena, self.kind.clone())
        }
    }

    /// Returns a new version with `value` at the front.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn push_front(&self, arena: &mut Arena, value: &Value) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let v = value.encode_slot(arena)?;
        let node = sl_alloc(arena, base.head, v)?;
        if base.tail == 0 {
            base.tail = node;
        }
        base.head = node;
        base.size += 1;
        Ok(base)
    }

    /// Returns a new version with `value` at the back.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn push_back(&self, arena: &mut Arena, value: &Value) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let v = value.encode_slot(arena)?;
        let node = sl_alloc(arena, 0, v)?;
        if base.tail != 0 {
            sl_set_next(arena, base.tail, node);
        } else {
            base.head = node;
        }
        base.tail = node;
        base.size += 1;
        Ok(base)
    }

    /// Returns a new version without the first element. A no-op on an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Never fails today; `Result` for parity with the other writes.
    pub fn pop_front(&self, arena: &mut Arena) -> Result<Self, Error> {
        let mut base = self.base(arena);
        if base.head == 0 {
            return Ok(base);
        }
        base.head = sl_next(arena, base.head);
        if base.head == 0 {
            base.tail = 0;
        }
        base.size -= 1;
        Ok(base)
    }

    /// Reads the element at `i`; out-of-range reads are absent.
    ///
    /// # Errors
    ///
    /// Codec errors from slot decoding.
    pub fn get(&self, arena: &Arena, i: usize) -> Result<Option<Value>, Error> {
        if !arena.is_current(self.generation) {
            return Ok(None);
        }
        let Ok(i) = u32::try_from(i) else { return Ok(None) };
        if i >= self.size {
            return Ok(None);
        }
        let mut node = self.head;
        for _ in 0..i {
            node = sl_next(arena, node);
        }
        Value::decode_slot(&self.kind, arena, sl_value(arena, node)).map(Some)
    }

    /// Visits elements front to back.
    ///
    /// # Errors
    ///
    /// Codec errors from slot decoding.
    pub fn for_each(&self, arena: &Arena, mut f: impl FnMut(usize, Value)) -> Result<(), Error> {
        if !arena.is_current(self.generation) {
            return Ok(());
        }
        let mut node = self.head;
        let mut i = 0;
        while node != 0 && i < self.size {
            f(i as usize, Value::decode_slot(&self.kind, arena, sl_value(arena, node))?);
            node = sl_next(arena, node);
            i += 1;
        }
        Ok(())
    }

    /// Collects every element, front to back.
    ///
    /// # Errors
    ///
    /// As for [`for_each`](Self::for_each).
    pub fn to_vec(&self, arena: &Arena) -> Result<Vec<Value>, Error> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each(arena, |_, v| out.push(v))?;
        Ok(out)
    }

    /// Packages this handle for a nested envelope or worker snapshot.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        Envelope {
            kind: StructureKind::SharedLinkedList,
            inner: self.kind.clone(),
            data: HandleFields {
                head: self.head,
                tail: self.tail,
                size: self.size,
                ..HandleFields::default()
            },
        }
    }

    /// Rebuilds a handle from envelope fields against `arena`.
    #[must_use]
    pub fn from_envelope(arena: &Arena, env: &Envelope) -> Self {
        Self {
            head: env.data.head,
            tail: env.data.tail,
            size: env.data.size,
            kind: env.inner.clone(),
            generation: arena.generation(),
        }
    }
}

impl fmt::Display for SharedLinkedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedLinkedList<{}>[{}]", self.kind, self.size)
    }
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

/// LIFO stack on cons cells: `(head, size, value kind, top cache)`.
///
/// Fully persistent: push and pop share every node below the top. The
/// top cache makes `peek` O(1) without touching the arena.
#[derive(Clone, PartialEq, Debug)]
pub struct SharedStack {
    head: u32,
    size: u32,
    kind: ValueKind,
    generation: u32,
    top: Option<Value>,
}

impl SharedStack {
    /// Creates an empty stack whose elements decode under `kind`.
    #[must_use]
    pub fn new(arena: &Arena, kind: ValueKind) -> Self {
        Self { head: 0, size: 0, kind, generation: arena.generation(), top: None }
    }

    /// Number of elements in this version.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size as usize
    }

    /// Returns `true` if this version holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The element kind of this stack.
    #[must_use]
    pub const fn value_kind(&self) -> &ValueKind {
        &self.kind
    }

    fn base(&self, arena: &Arena) -> Self {
        if arena.is_current(self.generation) {
            self.clone()
        } else {
            Self::new(arena, self.kind.clone())
        }
    }

    /// Returns a new version with `value` on top.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn push(&self, arena: &mut Arena, value: &Value) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let v = value.encode_slot(arena)?;
        base.head = sl_alloc(arena, base.head, v)?;
        base.size += 1;
        base.top = Some(value.clone());
        Ok(base)
    }

    /// Returns a new version without the top element. A no-op on an
    /// empty stack.
    ///
    /// # Errors
    ///
    /// Codec errors from refreshing the top cache.
    pub fn pop(&self, arena: &mut Arena) -> Result<Self, Error> {
        let mut base = self.base(arena);
        if base.head == 0 {
            return Ok(base);
        }
        base.head = sl_next(arena, base.head);
        base.size -= 1;
        base.top = if base.head == 0 {
            None
        } else {
            Some(Value::decode_slot(&base.kind, arena, sl_value(arena, base.head))?)
        };
        Ok(base)
    }

    /// Reads the top element without popping.
    #[must_use]
    pub fn peek(&self) -> Option<&Value> {
        self.top.as_ref()
    }

    /// Collects every element, top first.
    ///
    /// # Errors
    ///
    /// Codec errors from slot decoding.
    pub fn to_vec(&self, arena: &Arena) -> Result<Vec<Value>, Error> {
        if !arena.is_current(self.generation) {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(self.len());
        let mut node = self.head;
        while node != 0 && out.len() < self.len() {
            out.push(Value::decode_slot(&self.kind, arena, sl_value(arena, node))?);
            node = sl_next(arena, node);
        }
        Ok(out)
    }

    /// Packages this handle for a nested envelope or worker snapshot.
    /// The peek cache does not travel; it is rebuilt lazily.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        Envelope {
            kind: StructureKind::SharedStack,
            inner: self.kind.clone(),
            data: HandleFields { head: self.head, size: self.size, ..HandleFields::default() },
        }
    }

    /// Rebuilds a handle from envelope fields against `arena`.
    ///
    /// # Errors
    ///
    /// Codec errors from rebuilding the top cache.
    pub fn from_envelope(arena: &Arena, env: &Envelope) -> Result<Self, Error> {
        let top = if env.data.head == 0 {
            None
        } else {
            Some(Value::decode_slot(&env.inner, arena, sl_value(arena, env.data.head))?)
        };
        Ok(Self {
            head: env.data.head,
            size: env.data.size,
            kind: env.inner.clone(),
            generation: arena.generation(),
            top,
        })
    }
}

impl fmt::Display for SharedStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedStack<{}>[{}]", self.kind, self.size)
    }
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// FIFO queue on the singly-linked list: `(head, tail, size, value kind)`.
///
/// Dequeue shares the remaining suffix; enqueue rewrites the old tail's
/// `next` link in place (invisible to older handles, which stop at their
/// recorded size).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SharedQueue {
    head: u32,
    tail: u32,
    size: u32,
    kind: ValueKind,
    generation: u32,
}

impl SharedQueue {
    /// Creates an empty queue whose elements decode under `kind`.
    #[must_use]
    pub fn new(arena: &Arena, kind: ValueKind) -> Self {
        Self { head: 0, tail: 0, size: 0, kind, generation: arena.generation() }
    }

    /// Number of elements in this version.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size as usize
    }

    /// Returns `true` if this version holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The element kind of this queue.
    #[must_use]
    pub const fn value_kind(&self) -> &ValueKind {
        &self.kind
    }

    fn base(&self, arena: &Arena) -> Self {
        if arena.is_current(self.generation) {
            self.clone()
        } else {
            Self::new(arena, self.kind.clone())
        }
    }

    /// Returns a new version with `value` at the back.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn enqueue(&self, arena: &mut Arena, value: &Value) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let v = value.encode_slot(arena)?;
        let node = sl_alloc(arena, 0, v)?;
        if base.tail != 0 {
            sl_set_next(arena, base.tail, node);
        } else {
            base.head = node;
        }
        base.tail = node;
        base.size += 1;
        Ok(base)
    }

    /// Returns a new version without the front element. A no-op on an
    /// empty queue.
    ///
    /// # Errors
    ///
    /// Never fails today; `Result` for parity with the other writes.
    pub fn dequeue(&self, arena: &mut Arena) -> Result<Self, Error> {
        let mut base = self.base(arena);
        if base.head == 0 {
            return Ok(base);
        }
        base.head = sl_next(arena, base.head);
        if base.head == 0 {
            base.tail = 0;
        }
        base.size -= 1;
        Ok(base)
    }

    /// Reads the front element without dequeuing.
    ///
    /// # Errors
    ///
    /// Codec errors from slot decoding.
    pub fn peek(&self, arena: &Arena) -> Result<Option<Value>, Error> {
        if !arena.is_current(self.generation) || self.head == 0 {
            return Ok(None);
        }
        Value::decode_slot(&self.kind, arena, sl_value(arena, self.head)).map(Some)
    }

    /// Collects every element, front first.
    ///
    /// # Errors
    ///
    /// Codec errors from slot decoding.
    pub fn to_vec(&self, arena: &Arena) -> Result<Vec<Value>, Error> {
        if !arena.is_current(self.generation) {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(self.len());
        let mut node = self.head;
        while node != 0 && out.len() < self.len() {
            out.push(Value::decode_slot(&self.kind, arena, sl_value(arena, node))?);
            node = sl_next(arena, node);
        }
        Ok(out)
    }

    /// Packages this handle for a nested envelope or worker snapshot.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        Envelope {
            kind: StructureKind::SharedQueue,
            inner: self.kind.clone(),
            data: HandleFields {
                head: self.head,
                tail: self.tail,
                size: self.size,
                ..HandleFields::default()
            },
        }
    }

    /// Rebuilds a handle from envelope fields against `arena`.
    #[must_use]
    pub fn from_envelope(arena: &Arena, env: &Envelope) -> Self {
        Self {
            head: env.data.head,
            tail: env.data.tail,
            size: env.data.size,
            kind: env.inner.clone(),
            generation: arena.generation(),
        }
    }
}

impl fmt::Display for SharedQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedQueue<{}>[{}]", self.kind, self.size)
    }
}
