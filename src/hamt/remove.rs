//! Removal — COW path-copy delete with path compression.

use crate::arena::Arena;
use crate::error::Error;
use crate::hash;

use super::{
    alloc_internal, bitmap, child, children, clone_leaf_with_chain, is_leaf, leaf_chain, leaf_hash,
    leaf_key,
};

/// Outcome of a remove.
pub enum RemoveOutcome {
    /// Key was not found — the tree is unchanged and the caller can keep
    /// its handle without reallocating anything.
    NotFound,
    /// Key was removed.
    Removed {
        /// New root of the modified subtree, or `0` if it is now empty.
        node: u32,
    },
}

/// Removes `key` from the subtree rooted at `node` via path copy.
///
/// Pass `node == 0` for an empty tree.
///
/// # Errors
///
/// Propagates [`Error::OutOfMemory`] from the arena.
pub fn remove(
    arena: &mut Arena,
    node: u32,
    key: &[u8],
    key_hash: u32,
) -> Result<RemoveOutcome, Error> {
    if node == 0 {
        return Ok(RemoveOutcome::NotFound);
    }
    remove_recursive(arena, node, key, key_hash, 0)
}

fn remove_recursive(
    arena: &mut Arena,
    node: u32,
    key: &[u8],
    key_hash: u32,
    shift: u32,
) -> Result<RemoveOutcome, Error> {
    if is_leaf(arena, node) {
        if leaf_hash(arena, node) != key_hash {
            return Ok(RemoveOutcome::NotFound);
        }
        return remove_from_chain(arena, node, key);
    }

    let map = bitmap(arena, node);
    let bit = hash::mask(hash::fragment(key_hash, shift));
    if map & bit == 0 {
        return Ok(RemoveOutcome::NotFound);
    }
    let pos = hash::index(map, bit);
    let old_child = child(arena, node, pos);

    match remove_recursive(arena, old_child, key, key_hash, shift + hash::BITS_PER_LEVEL)? {
        RemoveOutcome::NotFound => Ok(RemoveOutcome::NotFound),
        RemoveOutcome::Removed { node: 0 } => {
            // Child became empty — drop its slot.
            let new_map = map & !bit;
            if new_map == 0 {
                return Ok(RemoveOutcome::Removed { node: 0 });
            }
            let mut kids = children(arena, node);
            kids.remove(pos);
            // A lone leaf child is pulled up into the parent: the leaf
            // stores its full hash, so it is valid at any depth.
            if kids.len() == 1 && is_leaf(arena, kids[0]) {
                return Ok(RemoveOutcome::Removed { node: kids[0] });
            }
            let new_node = alloc_internal(arena, new_map, &kids)?;
            Ok(RemoveOutcome::Removed { node: new_node })
        }
        RemoveOutcome::Removed { node: new_child } => {
            if map.count_ones() == 1 && is_leaf(arena, new_child) {
                return Ok(RemoveOutcome::Removed { node: new_child });
            }
            let mut kids = children(arena, node);
            kids[pos] = new_child;
            let new_node = alloc_internal(arena, map, &kids)?;
            Ok(RemoveOutcome::Removed { node: new_node })
        }
    }
}

/// Rebuilds the collision chain without `key`'s entry, sharing the chain
/// suffix past the removal.
fn remove_from_chain(arena: &mut Arena, head: u32, key: &[u8]) -> Result<RemoveOutcome, Error> {
    let mut prefix = Vec::new();
    let mut cur = head;
    let mut found = false;
    while cur != 0 {
        if leaf_key(arena, cur) == key {
            found = true;
            break;
        }
        prefix.push(cur);
        cur = leaf_chain(arena, cur);
    }
    if !found {
        return Ok(RemoveOutcome::NotFound);
    }

    let mut node = leaf_chain(arena, cur);
    for &p in prefix.iter().rev() {
        node = clone_leaf_with_chain(arena, p, node)?;
    }
    Ok(RemoveOutcome::Removed { node })
}
