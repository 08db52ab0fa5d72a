//! Insertion — COW path-copy insert.

use crate::arena::Arena;
use crate::error::Error;
use crate::hash;

use super::{
    alloc_internal, alloc_leaf, bitmap, children, clone_leaf_with_chain, is_leaf, leaf_chain,
    leaf_hash, leaf_key,
};

/// Outcome of an insert.
pub struct InsertOutcome {
    /// New root of the modified subtree.
    pub node: u32,
    /// `true` if a new key was added, `false` if a value was replaced.
    pub inserted: bool,
}

/// Inserts `(key, val)` into the subtree rooted at `node` via path copy.
///
/// Pass `node == 0` for an empty tree.
///
/// # Errors
///
/// Propagates [`Error::OutOfMemory`] from the arena.
pub fn insert(
    arena: &mut Arena,
    node: u32,
    key: &[u8],
    key_hash: u32,
    val: &[u8],
) -> Result<InsertOutcome, Error> {
    if node == 0 {
        let leaf = alloc_leaf(arena, key_hash, key, val, 0)?;
        return Ok(InsertOutcome { node: leaf, inserted: true });
    }
    insert_recursive(arena, node, key, key_hash, val, 0)
}

fn insert_recursive(
    arena: &mut Arena,
    node: u32,
    key: &[u8],
    key_hash: u32,
    val: &[u8],
    shift: u32,
) -> Result<InsertOutcome, Error> {
    if is_leaf(arena, node) {
        return insert_at_leaf(arena, node, key, key_hash, val, shift);
    }

    let map = bitmap(arena, node);
    let bit = hash::mask(hash::fragment(key_hash, shift));
    let pos = hash::index(map, bit);

    if map & bit != 0 {
        // Occupied position — recurse and replace the child.
        let old_child = super::child(arena, node, pos);
        let outcome =
            insert_recursive(arena, old_child, key, key_hash, val, shift + hash::BITS_PER_LEVEL)?;
        let mut kids = children(arena, node);
        kids[pos] = outcome.node;
        let new_node = alloc_internal(arena, map, &kids)?;
        Ok(InsertOutcome { node: new_node, inserted: outcome.inserted })
    } else {
        // Empty position — add a leaf child.
        let leaf = alloc_leaf(arena, key_hash, key, val, 0)?;
        let new_map = map | bit;
        let mut kids = children(arena, node);
        kids.insert(hash::index(new_map, bit), leaf);
        let new_node = alloc_internal(arena, new_map, &kids)?;
        Ok(InsertOutcome { node: new_node, inserted: true })
    }
}

// ---------------------------------------------------------------------------
// Leaf handling
// ---------------------------------------------------------------------------

fn insert_at_leaf(
    arena: &mut Arena,
    leaf: u32,
    key: &[u8],
    key_hash: u32,
    val: &[u8],
    shift: u32,
) -> Result<InsertOutcome, Error> {
    let existing_hash = leaf_hash(arena, leaf);

    if existing_hash == key_hash {
        // Same full hash: replace within the chain, or prepend.
        if let Some(node) = replace_in_chain(arena, leaf, key, val)? {
            return Ok(InsertOutcome { node, inserted: false });
        }
        let node = alloc_leaf(arena, key_hash, key, val, leaf)?;
        return Ok(InsertOutcome { node, inserted: true });
    }

    // Hashes diverge at some deeper level: split into subtree(s). The
    // existing leaf (and its chain) is shared as-is.
    let new_leaf = alloc_leaf(arena, key_hash, key, val, 0)?;
    let node = split(arena, leaf, existing_hash, new_leaf, key_hash, shift)?;
    Ok(InsertOutcome { node, inserted: true })
}

/// Rebuilds the collision chain with `key`'s entry replaced, sharing the
/// chain suffix past the replacement. Returns `None` if `key` is absent.
fn replace_in_chain(
    arena: &mut Arena,
    head: u32,
    key: &[u8],
    val: &[u8],
) -> Result<Option<u32>, Error> {
    let mut prefix = Vec::new();
    let mut cur = head;
    let mut found = None;
    while cur != 0 {
        if leaf_key(arena, cur) == key {
            found = Some(cur);
            break;
        }
        prefix.push(cur);
        cur = leaf_chain(arena, cur);
    }
    let Some(replaced) = found else {
        return Ok(None);
    };

    let hash = leaf_hash(arena, replaced);
    let suffix = leaf_chain(arena, replaced);
    let mut node = alloc_leaf(arena, hash, key, val, suffix)?;
    for &p in prefix.iter().rev() {
        node = clone_leaf_with_chain(arena, p, node)?;
    }
    Ok(Some(node))
}

/// Builds the internal node(s) separating two leaves whose hashes differ.
fn split(
    arena: &mut Arena,
    leaf_a: u32,
    hash_a: u32,
    leaf_b: u32,
    hash_b: u32,
    shift: u32,
) -> Result<u32, Error> {
    debug_assert_ne!(hash_a, hash_b);
    debug_assert!(shift <= hash::MAX_SHIFT);

    let frag_a = hash::fragment(hash_a, shift);
    let frag_b = hash::fragment(hash_b, shift);

    if frag_a == frag_b {
        let child = split(arena, leaf_a, hash_a, leaf_b, hash_b, shift + hash::BITS_PER_LEVEL)?;
        return alloc_internal(arena, hash::mask(frag_a), &[child]);
    }

    let map = hash::mask(frag_a) | hash::mask(frag_b);
    let kids = if frag_a < frag_b { [leaf_a, leaf_b] } else { [leaf_b, leaf_a] };
    alloc_internal(arena, map, &kids)
}
