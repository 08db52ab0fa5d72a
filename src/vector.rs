//! Persistent vector trie (radix-32) with a tail buffer.
//!
//! Internal nodes are 32-wide arrays of child pointers; leaves (and the
//! tail) are 32-wide arrays of 8-byte value slots. The last `≤ 32`
//! elements live in the tail, so push path-copies only the tail until it
//! fills, then spills the full tail into the trie and starts a fresh one.
//!
//! `shift` is the root's bit shift: `0` means the trie root is a single
//! leaf, `5` a root over leaves, and so on. An empty trie has `root == 0`.

use std::fmt;

use crate::arena::{Arena, FixedClass};
use crate::envelope::{Envelope, HandleFields};
use crate::error::Error;
use crate::value::{StructureKind, Value, ValueKind};

const BITS: u32 = 5;
const WIDTH: u32 = 32;
const MASK: u32 = 31;

// ---------------------------------------------------------------------------
// Node primitives
// ---------------------------------------------------------------------------

fn child(arena: &Arena, node: u32, i: u32) -> u32 {
    arena.read_u32(node + 4 * i)
}

fn set_child(arena: &mut Arena, node: u32, i: u32, v: u32) {
    arena.write_u32(node + 4 * i, v);
}

fn slot(arena: &Arena, leaf: u32, i: u32) -> u64 {
    arena.read_u64(leaf + 8 * i)
}

fn set_slot(arena: &mut Arena, leaf: u32, i: u32, v: u64) {
    arena.write_u64(leaf + 8 * i, v);
}

fn clone_internal(arena: &mut Arena, node: u32) -> Result<u32, Error> {
    let kids: Vec<u32> = (0..WIDTH).map(|i| child(arena, node, i)).collect();
    let copy = arena.alloc_fixed(FixedClass::VecInternal)?;
    for (i, &c) in kids.iter().enumerate() {
        set_child(arena, copy, i as u32, c);
    }
    Ok(copy)
}

fn clone_leaf(arena: &mut Arena, leaf: u32) -> Result<u32, Error> {
    let slots: Vec<u64> = (0..WIDTH).map(|i| slot(arena, leaf, i)).collect();
    let copy = arena.alloc_fixed(FixedClass::VecLeaf)?;
    for (i, &s) in slots.iter().enumerate() {
        set_slot(arena, copy, i as u32, s);
    }
    Ok(copy)
}

/// First index held by the tail.
const fn tail_off(size: u32) -> u32 {
    if size < WIDTH {
        0
    } else {
        ((size - 1) >> BITS) << BITS
    }
}

/// Leaf holding index `i` in the trie portion.
fn leaf_for(arena: &Arena, root: u32, shift: u32, i: u32) -> u32 {
    let mut node = root;
    let mut s = shift;
    while s > 0 {
        node = child(arena, node, (i >> s) & MASK);
        s -= BITS;
    }
    node
}

/// Builds a single-child path of height `shift` down to `leaf`.
fn new_path(arena: &mut Arena, shift: u32, leaf: u32) -> Result<u32, Error> {
    if shift == 0 {
        return Ok(leaf);
    }
    let below = new_path(arena, shift - BITS, leaf)?;
    let node = arena.alloc_fixed(FixedClass::VecInternal)?;
    set_child(arena, node, 0, below);
    Ok(node)
}

/// Path-copies the trie to hang the spilled `tail` leaf at index `idx`.
fn push_tail(arena: &mut Arena, node: u32, shift: u32, idx: u32, tail: u32) -> Result<u32, Error> {
    let sub = (idx >> shift) & MASK;
    let copy = clone_internal(arena, node)?;
    let new_child = if shift == BITS {
        tail
    } else {
        let c = child(arena, node, sub);
        if c == 0 {
            new_path(arena, shift - BITS, tail)?
        } else {
            push_tail(arena, c, shift - BITS, idx, tail)?
        }
    };
    set_child(arena, copy, sub, new_child);
    Ok(copy)
}

/// Path-copies the trie with the leaf containing `idx` removed
/// (promoted back into the tail). Returns `0` when the subtree empties.
fn pop_tail(arena: &mut Arena, node: u32, shift: u32, idx: u32) -> Result<u32, Error> {
    if shift == 0 {
        return Ok(0);
    }
    let sub = (idx >> shift) & MASK;
    if shift == BITS {
        if sub == 0 {
            return Ok(0);
        }
        let copy = clone_internal(arena, node)?;
        set_child(arena, copy, sub, 0);
        return Ok(copy);
    }
    let new_child = pop_tail(arena, child(arena, node, sub), shift - BITS, idx)?;
    if new_child == 0 && sub == 0 {
        return Ok(0);
    }
    let copy = clone_internal(arena, node)?;
    set_child(arena, copy, sub, new_child);
    Ok(copy)
}

fn set_in_trie(arena: &mut Arena, node: u32, shift: u32, i: u32, v: u64) -> Result<u32, Error> {
    if shift == 0 {
        let copy = clone_leaf(arena, node)?;
        set_slot(arena, copy, i & MASK, v);
        return Ok(copy);
    }
    let sub = (i >> shift) & MASK;
    let new_child = set_in_trie(arena, child(arena, node, sub), shift - BITS, i, v)?;
    let copy = clone_internal(arena, node)?;
    set_child(arena, copy, sub, new_child);
    Ok(copy)
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Persistent indexed list backed by the vector trie.
///
/// The handle records `(root, shift, size, tail, value kind, generation)`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SharedList {
    root: u32,
    shift: u32,
    size: u32,
    tail: u32,
    kind: ValueKind,
    generation: u32,
}

impl SharedList {
    /// Creates an empty list whose elements decode under `kind`.
    #[must_use]
    pub fn new(arena: &Arena, kind: ValueKind) -> Self {
        Self { root: 0, shift: 0, size: 0, tail: 0, kind, generation: arena.generation() }
    }

    /// Number of elements in this version (tail included).
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

    /// Returns a new version with `value` appended.
    ///
    /// Amortized O(1): only the tail is copied until it spills.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn push(&self, arena: &mut Arena, value: &Value) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let v = value.encode_slot(arena)?;

        if base.size == 0 {
            let tail = arena.alloc_fixed(FixedClass::VecLeaf)?;
            set_slot(arena, tail, 0, v);
            base.tail = tail;
            base.size = 1;
            return Ok(base);
        }

        let tail_len = base.size - tail_off(base.size);
        if tail_len < WIDTH {
            let tail = clone_leaf(arena, base.tail)?;
            set_slot(arena, tail, tail_len, v);
            base.tail = tail;
            base.size += 1;
            return Ok(base);
        }

        // Tail is full: spill it into the trie, start a fresh tail.
        let idx = base.size - WIDTH;
        if base.root == 0 {
            base.root = base.tail;
            base.shift = 0;
        } else if idx == (WIDTH << base.shift) {
            // Root is full: grow a level.
            let path = new_path(arena, base.shift, base.tail)?;
            let new_root = arena.alloc_fixed(FixedClass::VecInternal)?;
            set_child(arena, new_root, 0, base.root);
            set_child(arena, new_root, 1, path);
            base.root = new_root;
            base.shift += BITS;
        } else {
            base.root = push_tail(arena, base.root, base.shift, idx, base.tail)?;
        }
        let tail = arena.alloc_fixed(FixedClass::VecLeaf)?;
        set_slot(arena, tail, 0, v);
        base.tail = tail;
        base.size += 1;
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
        let raw = if i >= tail_off(self.size) {
            slot(arena, self.tail, i - tail_off(self.size))
        } else {
            let leaf = leaf_for(arena, self.root, self.shift, i);
            slot(arena, leaf, i & MASK)
        };
        Value::decode_slot(&self.kind, arena, raw).map(Some)
    }

    /// Returns a new version with index `i` replaced. An out-of-range
    /// index returns the same handle unchanged.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn set(&self, arena: &mut Arena, i: usize, value: &Value) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let Ok(i) = u32::try_from(i) else { return Ok(base) };
        if i >= base.size {
            return Ok(base);
        }
        let v = value.encode_slot(arena)?;
        if i >= tail_off(base.size) {
            let tail = clone_leaf(arena, base.tail)?;
            set_slot(arena, tail, i - tail_off(base.size), v);
            base.tail = tail;
        } else {
            base.root = set_in_trie(arena, base.root, base.shift, i, v)?;
        }
        Ok(base)
    }

    /// Returns a new version without the last element. Popping an empty
    /// list returns the same handle.
    ///
    /// # Errors
    ///
    /// Propagates allocation errors from trie un-spilling.
    pub fn pop(&self, arena: &mut Arena) -> Result<Self, Error> {
        let mut base = self.base(arena);
        match base.size {
            0 => return Ok(base),
            1 => {
                base.root = 0;
                base.shift = 0;
                base.tail = 0;
                base.size = 0;
                return Ok(base);
            }
            _ => {}
        }

        let tail_len = base.size - tail_off(base.size);
        if tail_len > 1 {
            // The slot past the new length is simply never read again.
            base.size -= 1;
            return Ok(base);
        }

        // Tail empties: promote the trie's last leaf back into the tail.
        let new_size = base.size - 1;
        base.tail = leaf_for(arena, base.root, base.shift, new_size - 1);
        base.root = pop_tail(arena, base.root, base.shift, base.size - 2)?;
        if base.root == 0 {
            base.shift = 0;
        } else if base.shift >= BITS && child(arena, base.root, 1) == 0 {
            base.root = child(arena, base.root, 0);
            base.shift -= BITS;
        }
        base.size = new_size;
        Ok(base)
    }

    /// Visits every element in index order.
    ///
    /// # Errors
    ///
    /// Codec errors from slot decoding.
    pub fn for_each(&self, arena: &Arena, mut f: impl FnMut(usize, Value)) -> Result<(), Error> {
        if !arena.is_current(self.generation) {
            return Ok(());
        }
        for i in 0..self.size {
            let raw = if i >= tail_off(self.size) {
                slot(arena, self.tail, i - tail_off(self.size))
            } else {
                let leaf = leaf_for(arena, self.root, self.shift, i);
                slot(arena, leaf, i & MASK)
            };
            f(i as usize, Value::decode_slot(&self.kind, arena, raw)?);
        }
        Ok(())
    }

    /// Collects every element of this version in index order.
    ///
    /// # Errors
    ///
    /// As for [`for_each`](Self::for_each).
    pub fn to_vec(&self, arena: &Arena) -> Result<Vec<Value>, Error> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each(arena, |_, v| out.push(v))?;
        Ok(out)
    }

    // -- envelope plumbing --------------------------------------------------

    /// Packages this handle for a nested envelope or worker snapshot.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        Envelope {
            kind: StructureKind::SharedList,
            inner: self.kind.clone(),
            data: HandleFields {
                root: self.root,
                shift: self.shift,
                size: self.size,
                tail: self.tail,
                ..HandleFields::default()
            },
        }
    }

    /// Rebuilds a handle from envelope fields against `arena`.
    #[must_use]
    pub fn from_envelope(arena: &Arena, env: &Envelope) -> Self {
        Self {
            root: env.data.root,
            shift: env.data.shift,
            size: env.data.size,
            tail: env.data.tail,
            kind: env.inner.clone(),
            generation: arena.generation(),
        }
    }
}

impl fmt::Display for SharedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedList<{}>[{}]", self.kind, self.size)
    }
}
