//! Lookup — traverses the trie to find a key's leaf.

use crate::arena::Arena;
use crate::hash;

use super::{bitmap, child, is_leaf, leaf_chain, leaf_hash, leaf_key};

/// Searches the subtree rooted at `node` for `key`.
///
/// Returns the leaf pointer if found. Pass `node == 0` for an empty tree.
#[must_use]
pub fn find(arena: &Arena, node: u32, key: &[u8], key_hash: u32) -> Option<u32> {
    let mut node = node;
    let mut shift = 0;
    while node != 0 {
        if is_leaf(arena, node) {
            if leaf_hash(arena, node) != key_hash {
                return None;
            }
            // Linear search through the collision chain.
            let mut leaf = node;
            while leaf != 0 {
                if leaf_key(arena, leaf) == key {
                    return Some(leaf);
                }
                leaf = leaf_chain(arena, leaf);
            }
            return None;
        }
        let bit = hash::mask(hash::fragment(key_hash, shift));
        let map = bitmap(arena, node);
        if map & bit == 0 {
            return None;
        }
        node = child(arena, node, hash::index(map, bit));
        shift += hash::BITS_PER_LEVEL;
    }
    None
}
