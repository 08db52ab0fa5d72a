//! Priority queues: persistent leftist heap and in-arena binary heap.
//!
//! The leftist variant is the default: merges path-copy every touched
//! node, so old handles keep their version. Leftist node (32 bytes):
//! `[rank: u32][left: u32][right: u32][pad][priority: f64][value: u64]`.
//!
//! The binary variant trades persistence for speed: one region
//! `[capacity: u32][len: u32][(priority: f64, value: u64) × capacity]`
//! mutated in place, with capacity doubling that orphans the old region
//! until the next reset. Callers must not expect two binary-heap
//! handles to differ in contents.

use std::fmt;

use crate::arena::{Arena, FixedClass};
use crate::envelope::{Envelope, HandleFields};
use crate::error::Error;
use crate::value::{StructureKind, Value, ValueKind};

const LH_RANK: u32 = 0;
const LH_LEFT: u32 = 4;
const LH_RIGHT: u32 = 8;
const LH_PRIO: u32 = 16;
const LH_VAL: u32 = 24;

const BH_CAP: u32 = 0;
const BH_LEN: u32 = 4;
const BH_ENTRIES: u32 = 8;
const BH_ENTRY: u32 = 16;

fn better(a: f64, b: f64, is_max: bool) -> bool {
    if is_max { a >= b } else { a <= b }
}

// ---------------------------------------------------------------------------
// Leftist heap
// ---------------------------------------------------------------------------

fn lh_rank(arena: &Arena, node: u32) -> u32 {
    if node == 0 { 0 } else { arena.read_u32(node + LH_RANK) }
}

fn lh_prio(arena: &Arena, node: u32) -> f64 {
    arena.read_f64(node + LH_PRIO)
}

fn lh_val(arena: &Arena, node: u32) -> u64 {
    arena.read_u64(node + LH_VAL)
}

fn lh_store(
    arena: &mut Arena,
    left: u32,
    right: u32,
    prio: f64,
    val: u64,
) -> Result<u32, Error> {
    // rank(left) >= rank(right) must hold; the caller orders children.
    let node = arena.alloc_fixed(FixedClass::LeftistNode)?;
    arena.write_u32(node + LH_RANK, lh_rank(arena, right) + 1);
    arena.write_u32(node + LH_LEFT, left);
    arena.write_u32(node + LH_RIGHT, right);
    arena.write_f64(node + LH_PRIO, prio);
    arena.write_u64(node + LH_VAL, val);
    Ok(node)
}

/// Leftist merge: recurse on the right spine of the better root, then
/// swap children wherever the leftist rank invariant would break.
fn lh_merge(arena: &mut Arena, a: u32, b: u32, is_max: bool) -> Result<u32, Error> {
    if a == 0 {
        return Ok(b);
    }
    if b == 0 {
        return Ok(a);
    }
    let (top, other) = if better(lh_prio(arena, a), lh_prio(arena, b), is_max) {
        (a, b)
    } else {
        (b, a)
    };
    let top_left = arena.read_u32(top + LH_LEFT);
    let top_right = arena.read_u32(top + LH_RIGHT);
    let merged = lh_merge(arena, top_right, other, is_max)?;
    let (left, right) = if lh_rank(arena, top_left) >= lh_rank(arena, merged) {
        (top_left, merged)
    } else {
        (merged, top_left)
    };
    lh_store(arena, left, right, lh_prio(arena, top), lh_val(arena, top))
}

// ---------------------------------------------------------------------------
// Binary heap
// ---------------------------------------------------------------------------

fn bh_cap(arena: &Arena, heap: u32) -> u32 {
    arena.read_u32(heap + BH_CAP)
}

fn bh_len(arena: &Arena, heap: u32) -> u32 {
    arena.read_u32(heap + BH_LEN)
}

fn bh_entry(arena: &Arena, heap: u32, i: u32) -> (f64, u64) {
    let at = heap + BH_ENTRIES + i * BH_ENTRY;
    (arena.read_f64(at), arena.read_u64(at + 8))
}

fn bh_set_entry(arena: &mut Arena, heap: u32, i: u32, prio: f64, val: u64) {
    let at = heap + BH_ENTRIES + i * BH_ENTRY;
    arena.write_f64(at, prio);
    arena.write_u64(at + 8, val);
}

fn bh_create(arena: &mut Arena, cap: u32) -> Result<u32, Error> {
    let cap = cap.max(1);
    let heap = arena.alloc(BH_ENTRIES + cap * BH_ENTRY)?;
    arena.write_u32(heap + BH_CAP, cap);
    arena.write_u32(heap + BH_LEN, 0);
    Ok(heap)
}

/// In-place sift-up insert; doubles capacity into a fresh region when
/// full (the old region is orphaned until reset). Returns the heap
/// pointer, which changes only on growth.
fn bh_insert(arena: &mut Arena, heap: u32, prio: f64, val: u64, is_max: bool) -> Result<u32, Error> {
    let mut heap = heap;
    let len = bh_len(arena, heap);
    if len == bh_cap(arena, heap) {
        let grown = bh_create(arena, len * 2)?;
        for i in 0..len {
            let (p, v) = bh_entry(arena, heap, i);
            bh_set_entry(arena, grown, i, p, v);
        }
        arena.write_u32(grown + BH_LEN, len);
        heap = grown;
    }
    bh_set_entry(arena, heap, len, prio, val);
    arena.write_u32(heap + BH_LEN, len + 1);

    let mut i = len;
    while i > 0 {
        let parent = (i - 1) / 2;
        let (pi, vi) = bh_entry(arena, heap, i);
        let (pp, vp) = bh_entry(arena, heap, parent);
        if better(pp, pi, is_max) {
            break;
        }
        bh_set_entry(arena, heap, i, pp, vp);
        bh_set_entry(arena, heap, parent, pi, vi);
        i = parent;
    }
    Ok(heap)
}

/// In-place sift-down extract of the top entry.
fn bh_extract(arena: &mut Arena, heap: u32, is_max: bool) {
    let len = bh_len(arena, heap);
    if len == 0 {
        return;
    }
    let (pl, vl) = bh_entry(arena, heap, len - 1);
    bh_set_entry(arena, heap, 0, pl, vl);
    arena.write_u32(heap + BH_LEN, len - 1);
    let len = len - 1;

    let mut i = 0;
    loop {
        let l = 2 * i + 1;
        let r = 2 * i + 2;
        let mut best = i;
        let (mut pb, _) = bh_entry(arena, heap, best);
        if l < len {
            let (p, _) = bh_entry(arena, heap, l);
            if !better(pb, p, is_max) {
                best = l;
                pb = p;
            }
        }
        if r < len {
            let (p, _) = bh_entry(arena, heap, r);
            if !better(pb, p, is_max) {
                best = r;
            }
        }
        if best == i {
            break;
        }
        let (pi, vi) = bh_entry(arena, heap, i);
        let (pbv, vbv) = bh_entry(arena, heap, best);
        bh_set_entry(arena, heap, i, pbv, vbv);
        bh_set_entry(arena, heap, best, pi, vi);
        i = best;
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Which heap backs a priority queue.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Backing {
    /// Persistent leftist heap; the pointer is the tree root.
    Leftist(u32),
    /// In-arena binary heap; the pointer is the heap region.
    Binary(u32),
}

/// Priority queue handle: `(backing, size, value kind, direction, top
/// cache)`.
///
/// The peek cache makes `peek_priority` / `peek_value` O(1) after any
/// write without re-reading the arena.
#[derive(Clone, PartialEq, Debug)]
pub struct SharedPriorityQueue {
    backing: Backing,
    size: u32,
    kind: ValueKind,
    is_max: bool,
    generation: u32,
    top: Option<(f64, Value)>,
}

impl SharedPriorityQueue {
    /// Creates an empty persistent (leftist) queue. `is_max` picks the
    /// direction: `true` extracts the highest priority first.
    #[must_use]
    pub fn new(arena: &Arena, kind: ValueKind, is_max: bool) -> Self {
        Self {
            backing: Backing::Leftist(0),
            size: 0,
            kind,
            is_max,
            generation: arena.generation(),
            top: None,
        }
    }

    /// Creates an empty binary-heap queue with the given initial
    /// capacity. Faster on large queues, but mutated in place: handles
    /// of different versions share contents.
    ///
    /// # Errors
    ///
    /// Propagates allocation errors.
    pub fn new_binary(
        arena: &mut Arena,
        kind: ValueKind,
        is_max: bool,
        capacity: u32,
    ) -> Result<Self, Error> {
        let heap = bh_create(arena, capacity)?;
        Ok(Self {
            backing: Backing::Binary(heap),
            size: 0,
            kind,
            is_max,
            generation: arena.generation(),
            top: None,
        })
    }

    /// Number of entries in this version.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size as usize
    }

    /// Returns `true` if this version holds no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The value kind this queue decodes under.
    #[must_use]
    pub const fn value_kind(&self) -> &ValueKind {
        &self.kind
    }

    /// Extraction direction: `true` for max-first.
    #[must_use]
    pub const fn is_max(&self) -> bool {
        self.is_max
    }

    fn base(&self, arena: &mut Arena) -> Result<Self, Error> {
        if arena.is_current(self.generation) {
            return Ok(self.clone());
        }
        match self.backing {
            Backing::Leftist(_) => Ok(Self::new(arena, self.kind.clone(), self.is_max)),
            Backing::Binary(_) => Self::new_binary(arena, self.kind.clone(), self.is_max, 16),
        }
    }

    fn refresh_top(&mut self, arena: &Arena) -> Result<(), Error> {
        self.top = match self.backing {
            _ if self.size == 0 => None,
            Backing::Leftist(root) => Some((
                lh_prio(arena, root),
                Value::decode_slot(&self.kind, arena, lh_val(arena, root))?,
            )),
            Backing::Binary(heap) => {
                let (p, v) = bh_entry(arena, heap, 0);
                Some((p, Value::decode_slot(&self.kind, arena, v)?))
            }
        };
        Ok(())
    }

    /// Returns a new version with `(priority, value)` enqueued.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn enqueue(&self, arena: &mut Arena, priority: f64, value: &Value) -> Result<Self, Error> {
        let mut base = self.base(arena)?;
        let val = value.encode_slot(arena)?;
        base.backing = match base.backing {
            Backing::Leftist(root) => {
                let single = lh_store(arena, 0, 0, priority, val)?;
                Backing::Leftist(lh_merge(arena, root, single, base.is_max)?)
            }
            Backing::Binary(heap) => {
                Backing::Binary(bh_insert(arena, heap, priority, val, base.is_max)?)
            }
        };
        base.size += 1;
        base.refresh_top(arena)?;
        Ok(base)
    }

    /// Returns a new version without the top entry. A no-op when empty.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn dequeue(&self, arena: &mut Arena) -> Result<Self, Error> {
        let mut base = self.base(arena)?;
        if base.size == 0 {
            return Ok(base);
        }
        match base.backing {
            Backing::Leftist(root) => {
                let left = arena.read_u32(root + LH_LEFT);
                let right = arena.read_u32(root + LH_RIGHT);
                base.backing = Backing::Leftist(lh_merge(arena, left, right, base.is_max)?);
            }
            Backing::Binary(heap) => bh_extract(arena, heap, base.is_max),
        }
        base.size -= 1;
        base.refresh_top(arena)?;
        Ok(base)
    }

    /// Priority of the top entry, from the peek cache.
    #[must_use]
    pub fn peek_priority(&self) -> Option<f64> {
        self.top.as_ref().map(|(p, _)| *p)
    }

    /// Value of the top entry, from the peek cache.
    #[must_use]
    pub fn peek_value(&self) -> Option<&Value> {
        self.top.as_ref().map(|(_, v)| v)
    }

    /// Packages this handle for a nested envelope or worker snapshot.
    /// The peek cache is rebuilt on decode.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        let (root, heap, binary) = match self.backing {
            Backing::Leftist(root) => (root, 0, false),
            Backing::Binary(heap) => (0, heap, true),
        };
        Envelope {
            kind: StructureKind::SharedPriorityQueue,
            inner: self.kind.clone(),
            data: HandleFields {
                root,
                heap,
                size: self.size,
                is_max: self.is_max,
                binary,
                ..HandleFields::default()
            },
        }
    }

    /// Rebuilds a handle from envelope fields against `arena`.
    ///
    /// # Errors
    ///
    /// Codec errors from rebuilding the peek cache.
    pub fn from_envelope(arena: &Arena, env: &Envelope) -> Result<Self, Error> {
        let backing = if env.data.binary {
            Backing::Binary(env.data.heap)
        } else {
            Backing::Leftist(env.data.root)
        };
        let mut handle = Self {
            backing,
            size: env.data.size,
            kind: env.inner.clone(),
            is_max: env.data.is_max,
            generation: arena.generation(),
            top: None,
        };
        handle.refresh_top(arena)?;
        Ok(handle)
    }
}

impl fmt::Display for SharedPriorityQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self.backing {
            Backing::Leftist(_) => "leftist",
            Backing::Binary(_) => "binary",
        };
        write!(f, "SharedPriorityQueue<{}>[{}, {variant}]", self.kind, self.size)
    }
}
