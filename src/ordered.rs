//! Insertion-ordered map and set.
//!
//! A HAMT keyed on the key hash whose terminal slots are sentinels
//! `[0: u32][count: u32][node_ptr × count]` pointing at list nodes; the
//! list nodes are additionally threaded `prev`/`next` so iteration
//! follows insertion order. The sentinel's leading zero word keeps the
//! leaf discriminator invariant; `count > 1` holds full-hash collisions.
//!
//! List node: `[prev: u32][next: u32][key_hash: u32]
//! [key_len: u16 | val_len: u16][key_bytes][val_bytes]`.
//!
//! The HAMT side is path-copied on every write. The order thread cannot
//! be spliced without touching nodes that older versions share, so
//! replacing or deleting a key reallocates every thread node and the
//! trie above them; older handles keep their own chain untouched.
//! Appending a new key links through the previous tail node, which
//! older handles never observe: their iteration stops at their recorded
//! size. When a sibling version has already appended through the same
//! tail, the append rebuilds too instead of rerouting that sibling.

use std::fmt;

use crate::arena::Arena;
use crate::envelope::{Envelope, HandleFields};
use crate::error::Error;
use crate::hamt::{alloc_internal, bitmap, child, children, is_leaf};
use crate::hash;
use crate::value::{StructureKind, Value, ValueKind};

const OM_PREV: u32 = 0;
const OM_NEXT: u32 = 4;
const OM_HASH: u32 = 8;
const OM_LENS: u32 = 12;
const OM_HEADER: u32 = 16;

// ---------------------------------------------------------------------------
// List node primitives
// ---------------------------------------------------------------------------

fn node_next(arena: &Arena, node: u32) -> u32 {
    arena.read_u32(node + OM_NEXT)
}

fn node_hash(arena: &Arena, node: u32) -> u32 {
    arena.read_u32(node + OM_HASH)
}

fn node_lens(arena: &Arena, node: u32) -> (u16, u16) {
    let lens = arena.read_u32(node + OM_LENS);
    (lens as u16, (lens >> 16) as u16)
}

fn node_key(arena: &Arena, node: u32) -> &[u8] {
    let (key_len, _) = node_lens(arena, node);
    arena.bytes(node + OM_HEADER, u32::from(key_len))
}

fn node_val(arena: &Arena, node: u32) -> &[u8] {
    let (key_len, val_len) = node_lens(arena, node);
    arena.bytes(node + OM_HEADER + u32::from(key_len), u32::from(val_len))
}

fn alloc_node(
    arena: &mut Arena,
    prev: u32,
    next: u32,
    key_hash: u32,
    key: &[u8],
    val: &[u8],
) -> Result<u32, Error> {
    let ptr = arena.alloc(OM_HEADER + key.len() as u32 + val.len() as u32)?;
    arena.write_u32(ptr + OM_PREV, prev);
    arena.write_u32(ptr + OM_NEXT, next);
    arena.write_u32(ptr + OM_HASH, key_hash);
    arena.write_u32(ptr + OM_LENS, key.len() as u32 | ((val.len() as u32) << 16));
    arena.write_bytes(ptr + OM_HEADER, key);
    arena.write_bytes(ptr + OM_HEADER + key.len() as u32, val);
    Ok(ptr)
}

// ---------------------------------------------------------------------------
// Sentinel primitives
// ---------------------------------------------------------------------------

fn sent_ptrs(arena: &Arena, sent: u32) -> Vec<u32> {
    let n = arena.read_u32(sent + 4);
    (0..n).map(|i| arena.read_u32(sent + 8 + 4 * i)).collect()
}

fn sent_hash(arena: &Arena, sent: u32) -> u32 {
    node_hash(arena, arena.read_u32(sent + 8))
}

fn alloc_sentinel(arena: &mut Arena, ptrs: &[u32]) -> Result<u32, Error> {
    debug_assert!(!ptrs.is_empty());
    let sent = arena.alloc(8 + 4 * ptrs.len() as u32)?;
    arena.write_u32(sent, 0);
    arena.write_u32(sent + 4, ptrs.len() as u32);
    for (i, &p) in ptrs.iter().enumerate() {
        arena.write_u32(sent + 8 + 4 * i as u32, p);
    }
    Ok(sent)
}

// ---------------------------------------------------------------------------
// Trie operations
// ---------------------------------------------------------------------------

fn find_node(arena: &Arena, root: u32, key: &[u8], key_hash: u32) -> Option<u32> {
    let mut node = root;
    let mut shift = 0;
    while node != 0 {
        if is_leaf(arena, node) {
            if sent_hash(arena, node) != key_hash {
                return None;
            }
            return sent_ptrs(arena, node)
                .into_iter()
                .find(|&p| node_key(arena, p) == key);
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

/// Path-copies the trie to add the brand-new list node `list_node`.
fn trie_insert(
    arena: &mut Arena,
    node: u32,
    key_hash: u32,
    list_node: u32,
    shift: u32,
) -> Result<u32, Error> {
    if is_leaf(arena, node) {
        let existing_hash = sent_hash(arena, node);
        if existing_hash == key_hash {
            // Full-hash collision joins the sentinel.
            let mut ptrs = sent_ptrs(arena, node);
            ptrs.push(list_node);
            return alloc_sentinel(arena, &ptrs);
        }
        let other = alloc_sentinel(arena, &[list_node])?;
        return split(arena, node, existing_hash, other, key_hash, shift);
    }

    let map = bitmap(arena, node);
    let bit = hash::mask(hash::fragment(key_hash, shift));
    let pos = hash::index(map, bit);
    if map & bit != 0 {
        let next = trie_insert(
            arena,
            child(arena, node, pos),
            key_hash,
            list_node,
            shift + hash::BITS_PER_LEVEL,
        )?;
        let mut kids = children(arena, node);
        kids[pos] = next;
        alloc_internal(arena, map, &kids)
    } else {
        let sent = alloc_sentinel(arena, &[list_node])?;
        let new_map = map | bit;
        let mut kids = children(arena, node);
        kids.insert(hash::index(new_map, bit), sent);
        alloc_internal(arena, new_map, &kids)
    }
}

/// One thread entry staged for a rebuild.
struct ThreadEntry {
    ptr: u32,
    hash: u32,
    key: Vec<u8>,
    val: Vec<u8>,
}

/// Allocates a fresh thread (nodes linked in order) and the trie above
/// it. Only nodes created here are linked to each other, so nothing a
/// previous version reaches is written.
fn rebuild_thread(arena: &mut Arena, entries: &[ThreadEntry]) -> Result<(u32, u32, u32), Error> {
    let mut root = 0;
    let mut head = 0;
    let mut prev = 0;
    for e in entries {
        let node = alloc_node(arena, prev, 0, e.hash, &e.key, &e.val)?;
        if prev != 0 {
            arena.write_u32(prev + OM_NEXT, node);
        } else {
            head = node;
        }
        root = if root == 0 {
            alloc_sentinel(arena, &[node])?
        } else {
            trie_insert(arena, root, e.hash, node, 0)?
        };
        prev = node;
    }
    Ok((root, head, prev))
}

// Mirrors the unordered trie's split; duplicated here because the
// terminals differ (small, private).
fn split(
    arena: &mut Arena,
    sent_a: u32,
    hash_a: u32,
    sent_b: u32,
    hash_b: u32,
    shift: u32,
) -> Result<u32, Error> {
    debug_assert_ne!(hash_a, hash_b);
    let frag_a = hash::fragment(hash_a, shift);
    let frag_b = hash::fragment(hash_b, shift);
    if frag_a == frag_b {
        let below = split(arena, sent_a, hash_a, sent_b, hash_b, shift + hash::BITS_PER_LEVEL)?;
        return alloc_internal(arena, hash::mask(frag_a), &[below]);
    }
    let map = hash::mask(frag_a) | hash::mask(frag_b);
    let kids = if frag_a < frag_b { [sent_a, sent_b] } else { [sent_b, sent_a] };
    alloc_internal(arena, map, &kids)
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Persistent insertion-ordered map.
///
/// The handle records `(root, head, tail, size, value kind, generation)`.
/// Iteration follows the insertion thread; replacing an existing key
/// keeps its position.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SharedOrderedMap {
    root: u32,
    head: u32,
    tail: u32,
    size: u32,
    kind: ValueKind,
    generation: u32,
}

impl SharedOrderedMap {
    /// Creates an empty map whose values decode under `kind`.
    #[must_use]
    pub fn new(arena: &Arena, kind: ValueKind) -> Self {
        Self { root: 0, head: 0, tail: 0, size: 0, kind, generation: arena.generation() }
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

    /// The value kind this map decodes under.
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

    /// Collects this version's thread entries, head to tail.
    fn thread_entries(&self, arena: &Arena) -> Vec<ThreadEntry> {
        let mut out = Vec::with_capacity(self.len());
        let mut node = self.head;
        while node != 0 && out.len() < self.len() {
            out.push(ThreadEntry {
                ptr: node,
                hash: node_hash(arena, node),
                key: node_key(arena, node).to_vec(),
                val: node_val(arena, node).to_vec(),
            });
            node = node_next(arena, node);
        }
        out
    }

    fn commit(mut self, arena: &mut Arena, entries: &[ThreadEntry]) -> Result<Self, Error> {
        let (root, head, tail) = rebuild_thread(arena, entries)?;
        self.root = root;
        self.head = head;
        self.tail = tail;
        self.size = entries.len() as u32;
        Ok(self)
    }

    /// Returns a new version with `(key, value)` set. A new key appends
    /// to the iteration order; an existing key keeps its position.
    ///
    /// Appending is O(log n). Replacing rebuilds the thread and its
    /// trie: the spliced neighbors would otherwise be nodes older
    /// versions still iterate.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn set(
        &self,
        arena: &mut Arena,
        key: impl AsRef<[u8]>,
        value: &Value,
    ) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let key_len = arena.stage_key(key.as_ref())?;
        let val_len = arena.stage_blob(&value.encode_bytes()?)?;
        let key = arena.key_scratch(key_len).to_vec();
        let val = arena.blob_scratch(val_len).to_vec();
        let key_hash = hash::hash_key(&key);

        if let Some(old) = find_node(arena, base.root, &key, key_hash) {
            let mut entries = base.thread_entries(arena);
            for e in &mut entries {
                if e.ptr == old {
                    e.val = val.clone();
                }
            }
            return base.commit(arena, &entries);
        }

        if base.tail != 0 && node_next(arena, base.tail) != 0 {
            // A sibling version already appended through this tail node;
            // linking in place would reroute its thread.
            let mut entries = base.thread_entries(arena);
            entries.push(ThreadEntry { ptr: 0, hash: key_hash, key, val });
            return base.commit(arena, &entries);
        }

        // First append through this tail: the fresh node is reachable
        // only past `size` of every older handle.
        let fresh = alloc_node(arena, base.tail, 0, key_hash, &key, &val)?;
        if base.tail != 0 {
            arena.write_u32(base.tail + OM_NEXT, fresh);
        } else {
            base.head = fresh;
        }
        base.tail = fresh;
        base.root = if base.root == 0 {
            alloc_sentinel(arena, &[fresh])?
        } else {
            trie_insert(arena, base.root, key_hash, fresh, 0)?
        };
        base.size += 1;
        Ok(base)
    }

    /// Returns a new version without `key`. Deleting an absent key
    /// returns an unchanged handle.
    ///
    /// Rebuilds the thread and its trie, like a replace: unlinking in
    /// place would edit nodes older versions still iterate.
    ///
    /// # Errors
    ///
    /// Allocation errors from the rebuild.
    pub fn delete(&self, arena: &mut Arena, key: impl AsRef<[u8]>) -> Result<Self, Error> {
        let base = self.base(arena);
        let key_len = arena.stage_key(key.as_ref())?;
        let key = arena.key_scratch(key_len).to_vec();
        let key_hash = hash::hash_key(&key);

        let Some(old) = find_node(arena, base.root, &key, key_hash) else {
            return Ok(base);
        };
        let mut entries = base.thread_entries(arena);
        entries.retain(|e| e.ptr != old);
        base.commit(arena, &entries)
    }

    /// Looks up `key`. Stale handles read as absent.
    ///
    /// # Errors
    ///
    /// Codec errors from value decoding.
    pub fn get(&self, arena: &Arena, key: impl AsRef<[u8]>) -> Result<Option<Value>, Error> {
        if !arena.is_current(self.generation) {
            return Ok(None);
        }
        let key = key.as_ref();
        match find_node(arena, self.root, key, hash::hash_key(key)) {
            Some(node) => Ok(Some(Value::decode_bytes(&self.kind, node_val(arena, node))?)),
            None => Ok(None),
        }
    }

    /// Returns `true` if `key` is present in this version.
    #[must_use]
    pub fn has(&self, arena: &Arena, key: impl AsRef<[u8]>) -> bool {
        if !arena.is_current(self.generation) {
            return false;
        }
        let key = key.as_ref();
        find_node(arena, self.root, key, hash::hash_key(key)).is_some()
    }

    /// Visits entries in insertion order.
    ///
    /// # Errors
    ///
    /// Codec errors from value decoding.
    pub fn for_each(&self, arena: &Arena, mut f: impl FnMut(&[u8], Value)) -> Result<(), Error> {
        if !arena.is_current(self.generation) {
            return Ok(());
        }
        let mut node = self.head;
        let mut seen = 0;
        while node != 0 && seen < self.size {
            let value = Value::decode_bytes(&self.kind, node_val(arena, node))?;
            f(node_key(arena, node), value);
            node = node_next(arena, node);
            seen += 1;
        }
        Ok(())
    }

    /// Collects keys in insertion order.
    #[must_use]
    pub fn keys(&self, arena: &Arena) -> Vec<Vec<u8>> {
        if !arena.is_current(self.generation) {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.len());
        let mut node = self.head;
        while node != 0 && out.len() < self.len() {
            out.push(node_key(arena, node).to_vec());
            node = node_next(arena, node);
        }
        out
    }

    /// Collects `(key, value)` pairs in insertion order.
    ///
    /// # Errors
    ///
    /// As for [`for_each`](Self::for_each).
    pub fn entries(&self, arena: &Arena) -> Result<Vec<(Vec<u8>, Value)>, Error> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each(arena, |k, v| out.push((k.to_vec(), v)))?;
        Ok(out)
    }

    /// Packages this handle for a nested envelope or worker snapshot.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        Envelope {
            kind: StructureKind::SharedOrderedMap,
            inner: self.kind.clone(),
            data: HandleFields {
                root: self.root,
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
            root: env.data.root,
            head: env.data.head,
            tail: env.data.tail,
            size: env.data.size,
            kind: env.inner.clone(),
            generation: arena.generation(),
        }
    }
}

impl fmt::Display for SharedOrderedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedOrderedMap<{}>[{}]", self.kind, self.size)
    }
}

/// Persistent insertion-ordered set. Elements are the map keys.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SharedOrderedSet {
    map: SharedOrderedMap,
}

impl SharedOrderedSet {
    /// Creates an empty set whose elements decode under `kind`.
    #[must_use]
    pub fn new(arena: &Arena, kind: ValueKind) -> Self {
        Self { map: SharedOrderedMap::new(arena, kind) }
    }

    /// Number of elements in this version.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if this version holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The element kind of this set.
    #[must_use]
    pub const fn value_kind(&self) -> &ValueKind {
        self.map.value_kind()
    }

    /// Returns a new version with `element` added (insertion position is
    /// kept if it already exists).
    ///
    /// # Errors
    ///
    /// As for [`SharedOrderedMap::set`].
    pub fn insert(&self, arena: &mut Arena, element: &Value) -> Result<Self, Error> {
        let key = element.encode_bytes()?;
        Ok(Self { map: self.map.set(arena, key, &Value::Bool(true))? })
    }

    /// Returns a new version without `element`.
    ///
    /// # Errors
    ///
    /// As for [`SharedOrderedMap::delete`].
    pub fn remove(&self, arena: &mut Arena, element: &Value) -> Result<Self, Error> {
        let key = element.encode_bytes()?;
        Ok(Self { map: self.map.delete(arena, key)? })
    }

    /// Returns `true` if `element` is present in this version.
    ///
    /// # Errors
    ///
    /// Encoding errors from the element codec.
    pub fn contains(&self, arena: &Arena, element: &Value) -> Result<bool, Error> {
        let key = element.encode_bytes()?;
        Ok(self.map.has(arena, key))
    }

    /// Collects elements in insertion order.
    ///
    /// # Errors
    ///
    /// Decoding errors from the element codec.
    pub fn elements(&self, arena: &Arena) -> Result<Vec<Value>, Error> {
        self.map
            .keys(arena)
            .iter()
            .map(|k| Value::decode_bytes(self.map.value_kind(), k))
            .collect()
    }

    /// Packages this handle for a nested envelope or worker snapshot.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        let mut env = self.map.to_envelope();
        env.kind = StructureKind::SharedOrderedSet;
        env
    }

    /// Rebuilds a handle from envelope fields against `arena`.
    #[must_use]
    pub fn from_envelope(arena: &Arena, env: &Envelope) -> Self {
        Self { map: SharedOrderedMap::from_envelope(arena, env) }
    }
}

impl fmt::Display for SharedOrderedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedOrderedSet<{}>[{}]", self.value_kind(), self.len())
    }
}
