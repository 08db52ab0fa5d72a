//! Hash array mapped trie over arena bytes.
//!
//! Node encodings:
//!
//! - **Internal**: `[bitmap: u32][child: u32 × popcount(bitmap)]`.
//!   The bitmap is never zero; children are packed densely and indexed
//!   by `popcount(bitmap & (bit - 1))`.
//! - **Leaf**: `[0: u32][key_hash: u32][key_len: u16 | val_len: u16]
//!   [chain: u32][key_bytes][val_bytes]`. The leading zero word is the
//!   leaf discriminator. `chain` links leaves whose full 32-bit hashes
//!   collide (the last-level linear fallback); `0` ends the chain.
//!
//! All writes are copy-on-write path copies: every node on the mutation
//! path is reallocated, untouched subtrees are pointer-shared, and old
//! roots stay valid until the arena resets.

use crate::arena::Arena;
use crate::error::Error;

mod get;
mod insert;
mod iter;
mod remove;

pub use get::find;
pub use insert::{insert, InsertOutcome};
pub use iter::Cursor;
pub use remove::{remove, RemoveOutcome};

const LEAF_HASH: u32 = 4;
const LEAF_LENS: u32 = 8;
const LEAF_CHAIN: u32 = 12;
const LEAF_HEADER: u32 = 16;

// ---------------------------------------------------------------------------
// Node accessors
// ---------------------------------------------------------------------------

/// Returns `true` if the node at `ptr` is a leaf (first word zero).
#[must_use]
pub fn is_leaf(arena: &Arena, ptr: u32) -> bool {
    arena.read_u32(ptr) == 0
}

/// Full 32-bit key hash stored in a leaf.
#[must_use]
pub fn leaf_hash(arena: &Arena, leaf: u32) -> u32 {
    arena.read_u32(leaf + LEAF_HASH)
}

/// `(key_len, val_len)` of a leaf payload.
#[must_use]
pub fn leaf_lens(arena: &Arena, leaf: u32) -> (u16, u16) {
    let lens = arena.read_u32(leaf + LEAF_LENS);
    (lens as u16, (lens >> 16) as u16)
}

/// Next leaf in the collision chain (`0` ends the chain).
#[must_use]
pub fn leaf_chain(arena: &Arena, leaf: u32) -> u32 {
    arena.read_u32(leaf + LEAF_CHAIN)
}

/// Key bytes of a leaf.
#[must_use]
pub fn leaf_key(arena: &Arena, leaf: u32) -> &[u8] {
    let (key_len, _) = leaf_lens(arena, leaf);
    arena.bytes(leaf + LEAF_HEADER, u32::from(key_len))
}

/// Value bytes of a leaf.
#[must_use]
pub fn leaf_val(arena: &Arena, leaf: u32) -> &[u8] {
    let (key_len, val_len) = leaf_lens(arena, leaf);
    arena.bytes(leaf + LEAF_HEADER + u32::from(key_len), u32::from(val_len))
}

/// Bitmap of an internal node.
#[must_use]
pub fn bitmap(arena: &Arena, node: u32) -> u32 {
    arena.read_u32(node)
}

/// `i`-th densely packed child pointer of an internal node.
#[must_use]
pub fn child(arena: &Arena, node: u32, i: usize) -> u32 {
    arena.read_u32(node + 4 + 4 * i as u32)
}

/// Reads every child pointer of an internal node.
#[must_use]
pub fn children(arena: &Arena, node: u32) -> Vec<u32> {
    let n = bitmap(arena, node).count_ones() as usize;
    (0..n).map(|i| child(arena, node, i)).collect()
}

// ---------------------------------------------------------------------------
// Node builders
// ---------------------------------------------------------------------------

/// Allocates a leaf node.
///
/// # Errors
///
/// Propagates [`Error::OutOfMemory`] from the arena.
pub fn alloc_leaf(
    arena: &mut Arena,
    hash: u32,
    key: &[u8],
    val: &[u8],
    chain: u32,
) -> Result<u32, Error> {
    let ptr = arena.alloc(LEAF_HEADER + key.len() as u32 + val.len() as u32)?;
    arena.write_u32(ptr, 0);
    arena.write_u32(ptr + LEAF_HASH, hash);
    arena.write_u32(ptr + LEAF_LENS, key.len() as u32 | ((val.len() as u32) << 16));
    arena.write_u32(ptr + LEAF_CHAIN, chain);
    arena.write_bytes(ptr + LEAF_HEADER, key);
    arena.write_bytes(ptr + LEAF_HEADER + key.len() as u32, val);
    Ok(ptr)
}

/// Clones a leaf, substituting its collision-chain link.
pub(crate) fn clone_leaf_with_chain(
    arena: &mut Arena,
    leaf: u32,
    chain: u32,
) -> Result<u32, Error> {
    let hash = leaf_hash(arena, leaf);
    let key = leaf_key(arena, leaf).to_vec();
    let val = leaf_val(arena, leaf).to_vec();
    alloc_leaf(arena, hash, &key, &val, chain)
}

/// Allocates an internal node from a bitmap and its dense children.
///
/// # Errors
///
/// Propagates [`Error::OutOfMemory`] from the arena.
pub fn alloc_internal(arena: &mut Arena, bitmap: u32, children: &[u32]) -> Result<u32, Error> {
    debug_assert_ne!(bitmap, 0, "internal bitmap must be nonzero");
    debug_assert_eq!(bitmap.count_ones() as usize, children.len());
    let ptr = arena.alloc(4 + 4 * children.len() as u32)?;
    arena.write_u32(ptr, bitmap);
    for (i, &c) in children.iter().enumerate() {
        arena.write_u32(ptr + 4 + 4 * i as u32, c);
    }
    Ok(ptr)
}
