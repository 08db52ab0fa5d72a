//! Unordered map and set handles over the HAMT.

use std::fmt;

use crate::arena::Arena;
use crate::envelope::{Envelope, HandleFields};
use crate::error::Error;
use crate::hamt::{self, Cursor};
use crate::hash;
use crate::value::{StructureKind, Value, ValueKind};

/// Persistent unordered hash map.
///
/// A handle records `(root, size, value kind, generation)`. Handles are
/// immutable: every write returns a new handle, and the old one keeps
/// observing its version until the arena resets.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SharedMap {
    root: u32,
    size: u32,
    kind: ValueKind,
    generation: u32,
}

impl SharedMap {
    /// Creates an empty map whose values decode under `kind`.
    #[must_use]
    pub fn new(arena: &Arena, kind: ValueKind) -> Self {
        Self { root: 0, size: 0, kind, generation: arena.generation() }
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

    /// Root node pointer (attach protocol and envelope plumbing).
    #[must_use]
    pub const fn root(&self) -> u32 {
        self.root
    }

    fn base(&self, arena: &Arena) -> Self {
        if arena.is_current(self.generation) {
            self.clone()
        } else {
            // Stale handle: writes land on a fresh empty map.
            Self::new(arena, self.kind.clone())
        }
    }

    fn stage(
        &self,
        arena: &mut Arena,
        key: &[u8],
        value: &Value,
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let key_len = arena.stage_key(key)?;
        let val_len = arena.stage_blob(&value.encode_bytes()?)?;
        Ok((
            arena.key_scratch(key_len).to_vec(),
            arena.blob_scratch(val_len).to_vec(),
        ))
    }

    /// Returns a new version with `(key, value)` inserted or replaced.
    ///
    /// # Errors
    ///
    /// [`Error::PayloadTooLarge`], [`Error::OutOfMemory`], or a codec
    /// error from value encoding.
    pub fn insert(
        &self,
        arena: &mut Arena,
        key: impl AsRef<[u8]>,
        value: &Value,
    ) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let (key, val) = self.stage(arena, key.as_ref(), value)?;
        let outcome = hamt::insert(arena, base.root, &key, hash::hash_key(&key), &val)?;
        base.root = outcome.node;
        if outcome.inserted {
            base.size += 1;
        }
        Ok(base)
    }

    /// Applies a batch of inserts as if in sequence, committing one new
    /// version.
    ///
    /// # Errors
    ///
    /// As for [`insert`](Self::insert).
    pub fn insert_many<K: AsRef<[u8]>>(
        &self,
        arena: &mut Arena,
        entries: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<Self, Error> {
        let mut base = self.base(arena);
        for (key, value) in entries {
            let (key, val) = self.stage(arena, key.as_ref(), &value)?;
            let outcome = hamt::insert(arena, base.root, &key, hash::hash_key(&key), &val)?;
            base.root = outcome.node;
            if outcome.inserted {
                base.size += 1;
            }
        }
        Ok(base)
    }

    /// Returns a new version without `key`. Removing an absent key
    /// returns an unchanged handle without allocating.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::OutOfMemory`] from path copying.
    pub fn remove(&self, arena: &mut Arena, key: impl AsRef<[u8]>) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let key_len = arena.stage_key(key.as_ref())?;
        let key = arena.key_scratch(key_len).to_vec();
        match hamt::remove(arena, base.root, &key, hash::hash_key(&key))? {
            hamt::RemoveOutcome::NotFound => Ok(base),
            hamt::RemoveOutcome::Removed { node } => {
                base.root = node;
                base.size -= 1;
                Ok(base)
            }
        }
    }

    /// Applies a batch of removals, committing one new version.
    ///
    /// # Errors
    ///
    /// As for [`remove`](Self::remove).
    pub fn remove_many<K: AsRef<[u8]>>(
        &self,
        arena: &mut Arena,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<Self, Error> {
        let mut base = self.base(arena);
        for key in keys {
            let key_len = arena.stage_key(key.as_ref())?;
            let key = arena.key_scratch(key_len).to_vec();
            if let hamt::RemoveOutcome::Removed { node } =
                hamt::remove(arena, base.root, &key, hash::hash_key(&key))?
            {
                base.root = node;
                base.size -= 1;
            }
        }
        Ok(base)
    }

    /// Looks up `key`, decoding the value under this map's kind.
    ///
    /// Stale handles read as absent.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownStructureKind`] / [`Error::Envelope`] from nested
    /// decoding.
    pub fn get(&self, arena: &Arena, key: impl AsRef<[u8]>) -> Result<Option<Value>, Error> {
        if !arena.is_current(self.generation) {
            return Ok(None);
        }
        let key = key.as_ref();
        match hamt::find(arena, self.root, key, hash::hash_key(key)) {
            Some(leaf) => {
                let bytes = hamt::leaf_val(arena, leaf);
                Ok(Some(Value::decode_bytes(&self.kind, bytes)?))
            }
            None => Ok(None),
        }
    }

    /// Batched lookup; one `Option` per probed key, in order.
    ///
    /// # Errors
    ///
    /// As for [`get`](Self::get).
    pub fn get_many<K: AsRef<[u8]>>(
        &self,
        arena: &Arena,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<Vec<Option<Value>>, Error> {
        keys.into_iter().map(|k| self.get(arena, k)).collect()
    }

    /// Returns `true` if `key` is present in this version.
    #[must_use]
    pub fn contains_key(&self, arena: &Arena, key: impl AsRef<[u8]>) -> bool {
        if !arena.is_current(self.generation) {
            return false;
        }
        let key = key.as_ref();
        hamt::find(arena, self.root, key, hash::hash_key(key)).is_some()
    }

    /// Visits every entry. Order is trie order, not insertion order.
    ///
    /// # Errors
    ///
    /// Decoding errors, as for [`get`](Self::get).
    pub fn for_each(&self, arena: &Arena, mut f: impl FnMut(&[u8], Value)) -> Result<(), Error> {
        if !arena.is_current(self.generation) {
            return Ok(());
        }
        let mut cursor = Cursor::new(arena, self.root);
        while let Some(leaf) = cursor.next_leaf(arena) {
            let value = Value::decode_bytes(&self.kind, hamt::leaf_val(arena, leaf))?;
            f(hamt::leaf_key(arena, leaf), value);
        }
        Ok(())
    }

    /// Collects every `(key, value)` pair of this version.
    ///
    /// # Errors
    ///
    /// As for [`for_each`](Self::for_each).
    pub fn entries(&self, arena: &Arena) -> Result<Vec<(Vec<u8>, Value)>, Error> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each(arena, |k, v| out.push((k.to_vec(), v)))?;
        Ok(out)
    }

    /// Collects every key of this version.
    #[must_use]
    pub fn keys(&self, arena: &Arena) -> Vec<Vec<u8>> {
        if !arena.is_current(self.generation) {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = Cursor::new(arena, self.root);
        while let Some(leaf) = cursor.next_leaf(arena) {
            out.push(hamt::leaf_key(arena, leaf).to_vec());
        }
        out
    }

    // -- envelope plumbing --------------------------------------------------

    /// Packages this handle for a nested envelope or worker snapshot.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        Envelope {
            kind: StructureKind::SharedMap,
            inner: self.kind.clone(),
            data: HandleFields { root: self.root, size: self.size, ..HandleFields::default() },
        }
    }

    /// Rebuilds a handle from envelope fields against `arena`.
    #[must_use]
    pub fn from_envelope(arena: &Arena, env: &Envelope) -> Self {
        Self {
            root: env.data.root,
            size: env.data.size,
            kind: env.inner.clone(),
            generation: arena.generation(),
        }
    }
}

impl fmt::Display for SharedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedMap<{}>[{}]", self.kind, self.size)
    }
}

// ---------------------------------------------------------------------------
// Set
// ---------------------------------------------------------------------------

/// Persistent unordered set. Elements are the map keys; payloads are
/// empty.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SharedSet {
    map: SharedMap,
}

impl SharedSet {
    /// Creates an empty set whose elements decode under `kind`.
    #[must_use]
    pub fn new(arena: &Arena, kind: ValueKind) -> Self {
        Self { map: SharedMap::new(arena, kind) }
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

    /// Returns a new version with `element` added.
    ///
    /// # Errors
    ///
    /// As for [`SharedMap::insert`].
    pub fn insert(&self, arena: &mut Arena, element: &Value) -> Result<Self, Error> {
        let key = element.encode_bytes()?;
        Ok(Self { map: self.map.insert(arena, key, &Value::Bool(true))? })
    }

    /// Returns a new version without `element`.
    ///
    /// # Errors
    ///
    /// As for [`SharedMap::remove`].
    pub fn remove(&self, arena: &mut Arena, element: &Value) -> Result<Self, Error> {
        let key = element.encode_bytes()?;
        Ok(Self { map: self.map.remove(arena, key)? })
    }

    /// Returns `true` if `element` is present in this version.
    ///
    /// # Errors
    ///
    /// Encoding errors from the element codec.
    pub fn contains(&self, arena: &Arena, element: &Value) -> Result<bool, Error> {
        let key = element.encode_bytes()?;
        Ok(self.map.contains_key(arena, key))
    }

    /// Collects every element of this version, decoded from its key
    /// bytes.
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
        env.kind = StructureKind::SharedSet;
        env
    }

    /// Rebuilds a handle from envelope fields against `arena`.
    #[must_use]
    pub fn from_envelope(arena: &Arena, env: &Envelope) -> Self {
        Self { map: SharedMap::from_envelope(arena, env) }
    }
}

impl fmt::Display for SharedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSet<{}>[{}]", self.value_kind(), self.len())
    }
}
