//! Persistent red-black tree over arena nodes.
//!
//! Node layout (32 bytes): `[color: u32][left: u32][right: u32][pad]
//! [key: u64 slot][value: u64 slot]`. Byte keys live as packed-word
//! blobs in the key slot; numeric trees store the `f64` bit pattern
//! inline. `0` is the empty tree.
//!
//! There are no parent pointers: every mutation path-copies down from
//! the root and rebalances functionally (the Okasaki insert balance and
//! the Kahrs delete rotations), so old roots keep satisfying the
//! red-black invariants. Successor and predecessor queries descend from
//! the root instead of climbing.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::arena::{Arena, FixedClass};
use crate::error::Error;
use crate::word;

const RB_META: u32 = 0;
const RB_LEFT: u32 = 4;
const RB_RIGHT: u32 = 8;
const RB_KEY: u32 = 16;
const RB_VAL: u32 = 24;

// ---------------------------------------------------------------------------
// Key ordering
// ---------------------------------------------------------------------------

/// Comparator applied inside the tree.
///
/// Byte keys compare with `memcmp` semantics (shorter-is-smaller on a
/// shared prefix); numeric keys use IEEE-754 total order. A custom
/// comparator sees the raw key bytes of both sides.
#[derive(Clone)]
pub enum KeyOrder {
    /// Natural byte order.
    Bytes,
    /// Reversed byte order.
    BytesReverse,
    /// Numeric (`f64`) order; keys are stored inline.
    Numeric,
    /// Reversed numeric order.
    NumericReverse,
    /// Caller-supplied byte comparator.
    Custom(Arc<dyn Fn(&[u8], &[u8]) -> Ordering + Send + Sync>),
}

impl KeyOrder {
    /// Returns `true` when keys are stored as inline doubles.
    #[must_use]
    pub fn numeric(&self) -> bool {
        matches!(self, Self::Numeric | Self::NumericReverse)
    }

    /// Returns `true` for the reversed natural orders.
    #[must_use]
    pub fn reversed(&self) -> bool {
        matches!(self, Self::BytesReverse | Self::NumericReverse)
    }
}

impl std::fmt::Debug for KeyOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes => f.write_str("Bytes"),
            Self::BytesReverse => f.write_str("BytesReverse"),
            Self::Numeric => f.write_str("Numeric"),
            Self::NumericReverse => f.write_str("NumericReverse"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A probe key on its way into a comparison.
#[derive(Clone, Copy, Debug)]
pub enum Probe<'a> {
    /// Raw key bytes.
    Bytes(&'a [u8]),
    /// Inline numeric key.
    Num(f64),
}

impl Probe<'_> {
    /// Encodes the probe into a key slot, allocating a blob for bytes.
    pub(crate) fn to_slot(self, arena: &mut Arena) -> Result<u64, Error> {
        match self {
            Self::Bytes(b) => Ok(word::slot_from_word(arena.store_blob(b)?)),
            Self::Num(v) => Ok(word::slot_from_f64(v)),
        }
    }
}

fn compare(arena: &Arena, order: &KeyOrder, probe: Probe<'_>, key_slot: u64) -> Ordering {
    let natural = match probe {
        Probe::Num(v) => v.total_cmp(&word::f64_from_slot(key_slot)),
        Probe::Bytes(b) => {
            let stored = arena.blob(word::word_from_slot(key_slot));
            if let KeyOrder::Custom(f) = order {
                return f(b, stored);
            }
            b.cmp(stored)
        }
    };
    if order.reversed() { natural.reverse() } else { natural }
}

/// Reads the key slot back out as bytes or a number.
pub(crate) fn key_bytes(arena: &Arena, order: &KeyOrder, key_slot: u64) -> Vec<u8> {
    if order.numeric() {
        word::f64_from_slot(key_slot).to_le_bytes().to_vec()
    } else {
        arena.blob(word::word_from_slot(key_slot)).to_vec()
    }
}

// ---------------------------------------------------------------------------
// Node primitives
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct Node {
    red: bool,
    left: u32,
    right: u32,
    key: u64,
    val: u64,
}

fn load(arena: &Arena, ptr: u32) -> Node {
    Node {
        red: arena.read_u32(ptr + RB_META) != 0,
        left: arena.read_u32(ptr + RB_LEFT),
        right: arena.read_u32(ptr + RB_RIGHT),
        key: arena.read_u64(ptr + RB_KEY),
        val: arena.read_u64(ptr + RB_VAL),
    }
}

fn store(arena: &mut Arena, n: Node) -> Result<u32, Error> {
    let ptr = arena.alloc_fixed(FixedClass::RbNode)?;
    arena.write_u32(ptr + RB_META, u32::from(n.red));
    arena.write_u32(ptr + RB_LEFT, n.left);
    arena.write_u32(ptr + RB_RIGHT, n.right);
    arena.write_u64(ptr + RB_KEY, n.key);
    arena.write_u64(ptr + RB_VAL, n.val);
    Ok(ptr)
}

fn is_red(arena: &Arena, ptr: u32) -> bool {
    ptr != 0 && arena.read_u32(ptr + RB_META) != 0
}

fn is_black_node(arena: &Arena, ptr: u32) -> bool {
    ptr != 0 && arena.read_u32(ptr + RB_META) == 0
}

/// Copies a node with its color forced black (`0` stays `0`).
fn blacken(arena: &mut Arena, ptr: u32) -> Result<u32, Error> {
    if !is_red(arena, ptr) {
        return Ok(ptr);
    }
    let mut n = load(arena, ptr);
    n.red = false;
    store(arena, n)
}

/// Copies a black node with its color forced red.
fn redden(arena: &mut Arena, ptr: u32) -> Result<u32, Error> {
    let mut n = load(arena, ptr);
    debug_assert!(!n.red, "redden expects a black node");
    n.red = true;
    store(arena, n)
}

// ---------------------------------------------------------------------------
// Insert
// ---------------------------------------------------------------------------

/// Outcome of an insert.
pub struct InsertOutcome {
    /// New tree root.
    pub root: u32,
    /// `true` if the key already existed and its value was replaced.
    pub existed: bool,
}

/// Inserts `(key, value)` slots into the tree rooted at `root`.
///
/// # Errors
///
/// Propagates allocation errors from path copying.
pub fn insert(
    arena: &mut Arena,
    root: u32,
    order: &KeyOrder,
    probe: Probe<'_>,
    key_slot: u64,
    val_slot: u64,
) -> Result<InsertOutcome, Error> {
    let (node, existed) = ins(arena, root, order, probe, key_slot, val_slot)?;
    Ok(InsertOutcome { root: blacken(arena, node)?, existed })
}

fn ins(
    arena: &mut Arena,
    ptr: u32,
    order: &KeyOrder,
    probe: Probe<'_>,
    key_slot: u64,
    val_slot: u64,
) -> Result<(u32, bool), Error> {
    if ptr == 0 {
        let node = store(arena, Node { red: true, left: 0, right: 0, key: key_slot, val: val_slot })?;
        return Ok((node, false));
    }
    let n = load(arena, ptr);
    match compare(arena, order, probe, n.key) {
        Ordering::Equal => {
            let node = store(arena, Node { key: key_slot, val: val_slot, ..n })?;
            Ok((node, true))
        }
        Ordering::Less => {
            let (l, existed) = ins(arena, n.left, order, probe, key_slot, val_slot)?;
            let node = if n.red {
                store(arena, Node { left: l, ..n })?
            } else {
                balance(arena, l, n.key, n.val, n.right)?
            };
            Ok((node, existed))
        }
        Ordering::Greater => {
            let (r, existed) = ins(arena, n.right, order, probe, key_slot, val_slot)?;
            let node = if n.red {
                store(arena, Node { right: r, ..n })?
            } else {
                balance(arena, n.left, n.key, n.val, r)?
            };
            Ok((node, existed))
        }
    }
}

/// The black-node constructor that repairs a red-red violation in
/// either child, yielding a red root over two blacks (Okasaki).
fn balance(arena: &mut Arena, l: u32, key: u64, val: u64, r: u32) -> Result<u32, Error> {
    // Left child red with a red grandchild.
    if is_red(arena, l) {
        let ln = load(arena, l);
        if is_red(arena, ln.left) {
            let ll = load(arena, ln.left);
            let a = store(arena, Node { red: false, ..ll })?;
            let b = store(arena, Node { red: false, left: ln.right, right: r, key, val })?;
            return store(arena, Node { red: true, left: a, right: b, key: ln.key, val: ln.val });
        }
        if is_red(arena, ln.right) {
            let lr = load(arena, ln.right);
            let a = store(arena, Node { red: false, left: ln.left, right: lr.left, key: ln.key, val: ln.val })?;
            let b = store(arena, Node { red: false, left: lr.right, right: r, key, val })?;
            return store(arena, Node { red: true, left: a, right: b, key: lr.key, val: lr.val });
        }
    }
    // Right child red with a red grandchild.
    if is_red(arena, r) {
        let rn = load(arena, r);
        if is_red(arena, rn.left) {
            let rl = load(arena, rn.left);
            let a = store(arena, Node { red: false, left: l, right: rl.left, key, val })?;
            let b = store(arena, Node { red: false, left: rl.right, right: rn.right, key: rn.key, val: rn.val })?;
            return store(arena, Node { red: true, left: a, right: b, key: rl.key, val: rl.val });
        }
        if is_red(arena, rn.right) {
            let rr = load(arena, rn.right);
            let a = store(arena, Node { red: false, left: l, right: rn.left, key, val })?;
            let b = store(arena, Node { red: false, ..rr })?;
            return store(arena, Node { red: true, left: a, right: b, key: rn.key, val: rn.val });
        }
    }
    store(arena, Node { red: false, left: l, right: r, key, val })
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Removes `probe`'s entry from the tree rooted at `root`.
///
/// Returns `None` (tree unchanged) when the key is absent.
///
/// # Errors
///
/// Propagates allocation errors from path copying.
pub fn delete(
    arena: &mut Arena,
    root: u32,
    order: &KeyOrder,
    probe: Probe<'_>,
) -> Result<Option<u32>, Error> {
    if find(arena, root, order, probe).is_none() {
        return Ok(None);
    }
    let node = del(arena, root, order, probe)?;
    Ok(Some(blacken(arena, node)?))
}

fn del(arena: &mut Arena, ptr: u32, order: &KeyOrder, probe: Probe<'_>) -> Result<u32, Error> {
    let n = load(arena, ptr);
    match compare(arena, order, probe, n.key) {
        Ordering::Less => {
            let l = del(arena, n.left, order, probe)?;
            if is_black_node(arena, n.left) {
                bal_left(arena, l, n.key, n.val, n.right)
            } else {
                store(arena, Node { red: true, left: l, right: n.right, key: n.key, val: n.val })
            }
        }
        Ordering::Greater => {
            let r = del(arena, n.right, order, probe)?;
            if is_black_node(arena, n.right) {
                bal_right(arena, n.left, n.key, n.val, r)
            } else {
                store(arena, Node { red: true, left: n.left, right: r, key: n.key, val: n.val })
            }
        }
        Ordering::Equal => fuse(arena, n.left, n.right),
    }
}

/// Rebalances after the left subtree lost a black level.
fn bal_left(arena: &mut Arena, l: u32, key: u64, val: u64, r: u32) -> Result<u32, Error> {
    if is_red(arena, l) {
        let lb = blacken(arena, l)?;
        return store(arena, Node { red: true, left: lb, right: r, key, val });
    }
    if is_black_node(arena, r) {
        let rr = redden(arena, r)?;
        return balance(arena, l, key, val, rr);
    }
    // r is red with a black left child.
    let rn = load(arena, r);
    debug_assert!(is_black_node(arena, rn.left));
    let rl = load(arena, rn.left);
    let new_left = store(arena, Node { red: false, left: l, right: rl.left, key, val })?;
    let reddened = redden(arena, rn.right)?;
    let new_right = balance(arena, rl.right, rn.key, rn.val, reddened)?;
    store(arena, Node { red: true, left: new_left, right: new_right, key: rl.key, val: rl.val })
}

/// Rebalances after the right subtree lost a black level.
fn bal_right(arena: &mut Arena, l: u32, key: u64, val: u64, r: u32) -> Result<u32, Error> {
    if is_red(arena, r) {
        let rb = blacken(arena, r)?;
        return store(arena, Node { red: true, left: l, right: rb, key, val });
    }
    if is_black_node(arena, l) {
        let lr = redden(arena, l)?;
        return balance(arena, lr, key, val, r);
    }
    // l is red with a black right child.
    let ln = load(arena, l);
    debug_assert!(is_black_node(arena, ln.right));
    let lr = load(arena, ln.right);
    let reddened = redden(arena, ln.left)?;
    let new_left = balance(arena, reddened, ln.key, ln.val, lr.left)?;
    let new_right = store(arena, Node { red: false, left: lr.right, right: r, key, val })?;
    store(arena, Node { red: true, left: new_left, right: new_right, key: lr.key, val: lr.val })
}

/// Joins the two subtrees around a deleted node.
fn fuse(arena: &mut Arena, l: u32, r: u32) -> Result<u32, Error> {
    if l == 0 {
        return Ok(r);
    }
    if r == 0 {
        return Ok(l);
    }
    let ln = load(arena, l);
    let rn = load(arena, r);
    match (ln.red, rn.red) {
        (true, true) => {
            let m = fuse(arena, ln.right, rn.left)?;
            if is_red(arena, m) {
                let mn = load(arena, m);
                let a = store(arena, Node { red: true, left: ln.left, right: mn.left, key: ln.key, val: ln.val })?;
                let b = store(arena, Node { red: true, left: mn.right, right: rn.right, key: rn.key, val: rn.val })?;
                store(arena, Node { red: true, left: a, right: b, key: mn.key, val: mn.val })
            } else {
                let b = store(arena, Node { red: true, left: m, right: rn.right, key: rn.key, val: rn.val })?;
                store(arena, Node { red: true, left: ln.left, right: b, key: ln.key, val: ln.val })
            }
        }
        (false, false) => {
            let m = fuse(arena, ln.right, rn.left)?;
            if is_red(arena, m) {
                let mn = load(arena, m);
                let a = store(arena, Node { red: false, left: ln.left, right: mn.left, key: ln.key, val: ln.val })?;
                let b = store(arena, Node { red: false, left: mn.right, right: rn.right, key: rn.key, val: rn.val })?;
                store(arena, Node { red: true, left: a, right: b, key: mn.key, val: mn.val })
            } else {
                let b = store(arena, Node { red: false, left: m, right: rn.right, key: rn.key, val: rn.val })?;
                bal_left(arena, ln.left, ln.key, ln.val, b)
            }
        }
        (false, true) => {
            let a = fuse(arena, l, rn.left)?;
            store(arena, Node { red: true, left: a, right: rn.right, key: rn.key, val: rn.val })
        }
        (true, false) => {
            let b = fuse(arena, ln.right, r)?;
            store(arena, Node { red: true, left: ln.left, right: b, key: ln.key, val: ln.val })
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Finds the node holding `probe`, returning `(key_slot, val_slot)`.
#[must_use]
pub fn find(arena: &Arena, root: u32, order: &KeyOrder, probe: Probe<'_>) -> Option<(u64, u64)> {
    let mut ptr = root;
    while ptr != 0 {
        let n = load(arena, ptr);
        match compare(arena, order, probe, n.key) {
            Ordering::Equal => return Some((n.key, n.val)),
            Ordering::Less => ptr = n.left,
            Ordering::Greater => ptr = n.right,
        }
    }
    None
}

/// Smallest entry under the tree's order.
#[must_use]
pub fn get_min(arena: &Arena, root: u32) -> Option<(u64, u64)> {
    let mut ptr = root;
    let mut best = None;
    while ptr != 0 {
        let n = load(arena, ptr);
        best = Some((n.key, n.val));
        ptr = n.left;
    }
    best
}

/// Largest entry under the tree's order.
#[must_use]
pub fn get_max(arena: &Arena, root: u32) -> Option<(u64, u64)> {
    let mut ptr = root;
    let mut best = None;
    while ptr != 0 {
        let n = load(arena, ptr);
        best = Some((n.key, n.val));
        ptr = n.right;
    }
    best
}

/// Smallest entry strictly greater than `probe` (root descent; there
/// are no parent pointers to climb).
#[must_use]
pub fn get_next(
    arena: &Arena,
    root: u32,
    order: &KeyOrder,
    probe: Probe<'_>,
) -> Option<(u64, u64)> {
    let mut ptr = root;
    let mut best = None;
    while ptr != 0 {
        let n = load(arena, ptr);
        match compare(arena, order, probe, n.key) {
            Ordering::Less => {
                best = Some((n.key, n.val));
                ptr = n.left;
            }
            _ => ptr = n.right,
        }
    }
    best
}

/// Largest entry strictly smaller than `probe`.
#[must_use]
pub fn get_prev(
    arena: &Arena,
    root: u32,
    order: &KeyOrder,
    probe: Probe<'_>,
) -> Option<(u64, u64)> {
    let mut ptr = root;
    let mut best = None;
    while ptr != 0 {
        let n = load(arena, ptr);
        match compare(arena, order, probe, n.key) {
            Ordering::Greater => {
                best = Some((n.key, n.val));
                ptr = n.right;
            }
            _ => ptr = n.left,
        }
    }
    best
}

// ---------------------------------------------------------------------------
// In-order cursor
// ---------------------------------------------------------------------------

/// Single-pass in-order cursor carrying an explicit descent stack.
pub struct InOrder {
    stack: Vec<u32>,
}

impl InOrder {
    /// Creates a cursor positioned before the smallest entry.
    #[must_use]
    pub fn new(arena: &Arena, root: u32) -> Self {
        let mut cursor = Self { stack: Vec::new() };
        cursor.push_left(arena, root);
        cursor
    }

    fn push_left(&mut self, arena: &Arena, mut ptr: u32) {
        while ptr != 0 {
            self.stack.push(ptr);
            ptr = load(arena, ptr).left;
        }
    }

    /// Yields the next `(key_slot, val_slot)` in order.
    pub fn next_entry(&mut self, arena: &Arena) -> Option<(u64, u64)> {
        let ptr = self.stack.pop()?;
        let n = load(arena, ptr);
        self.push_left(arena, n.right);
        Some((n.key, n.val))
    }
}

/// Validates the red-black invariants below `root`; returns the black
/// height. Test support.
#[cfg(test)]
pub fn check_invariants(arena: &Arena, root: u32) -> usize {
    fn walk(arena: &Arena, ptr: u32, parent_red: bool) -> usize {
        if ptr == 0 {
            return 1;
        }
        let n = load(arena, ptr);
        assert!(!(parent_red && n.red), "red node with red parent");
        let lh = walk(arena, n.left, n.red);
        let rh = walk(arena, n.right, n.red);
        assert_eq!(lh, rh, "black height mismatch");
        lh + usize::from(!n.red)
    }
    assert!(!is_red(arena, root), "root must be black");
    walk(arena, root, false)
}
