//! Sorted map and set handles over the red-black tree.
//!
//! The comparator lives inside the tree comparisons, so iteration is a
//! plain in-order walk under any order, including reversed and custom
//! ones.

use std::fmt;

use crate::arena::Arena;
use crate::envelope::{Envelope, HandleFields};
use crate::error::Error;
use crate::rbtree::{self, InOrder, KeyOrder, Probe};
use crate::value::{StructureKind, Value, ValueKind};

/// Persistent sorted map.
///
/// The handle records `(root, size, value kind, order, generation)`.
/// Byte keys decode as strings on the way out; under a numeric order,
/// keys are doubles stored inline in the nodes.
#[derive(Clone, Debug)]
pub struct SharedSortedMap {
    root: u32,
    size: u32,
    kind: ValueKind,
    key_kind: ValueKind,
    order: KeyOrder,
    generation: u32,
}

impl SharedSortedMap {
    /// Creates an empty map with the given value kind and key order.
    #[must_use]
    pub fn new(arena: &Arena, kind: ValueKind, order: KeyOrder) -> Self {
        let key_kind = if order.numeric() { ValueKind::Number } else { ValueKind::Str };
        Self { root: 0, size: 0, kind, key_kind, order, generation: arena.generation() }
    }

    pub(crate) fn with_key_kind(mut self, key_kind: ValueKind) -> Self {
        self.key_kind = key_kind;
        self
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

    /// The key order applied inside the tree.
    #[must_use]
    pub const fn order(&self) -> &KeyOrder {
        &self.order
    }

    fn base(&self, arena: &Arena) -> Self {
        if arena.is_current(self.generation) {
            self.clone()
        } else {
            Self { root: 0, size: 0, generation: arena.generation(), ..self.clone() }
        }
    }

    /// Encodes a probe key to match the tree's order. A key whose shape
    /// does not fit the order (a non-number under a numeric order) finds
    /// nothing and writes nothing.
    fn probe_bytes(&self, key: &Value) -> Result<Option<Vec<u8>>, Error> {
        if self.order.numeric() {
            return Ok(None);
        }
        Ok(Some(key.encode_bytes()?))
    }

    fn probe_num(&self, key: &Value) -> Option<f64> {
        if !self.order.numeric() {
            return None;
        }
        match key {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    fn decode_key(&self, arena: &Arena, key_slot: u64) -> Result<Value, Error> {
        let bytes = rbtree::key_bytes(arena, &self.order, key_slot);
        Value::decode_bytes(&self.key_kind, &bytes)
    }

    /// Returns a new version with `(key, value)` inserted or replaced.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn insert(&self, arena: &mut Arena, key: &Value, value: &Value) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let val_slot = value.encode_slot(arena)?;
        let outcome = if let Some(num) = base.probe_num(key) {
            let probe = Probe::Num(num);
            let key_slot = probe.to_slot(arena)?;
            rbtree::insert(arena, base.root, &base.order, probe, key_slot, val_slot)?
        } else if let Some(bytes) = base.probe_bytes(key)? {
            let key_slot = Probe::Bytes(&bytes).to_slot(arena)?;
            rbtree::insert(arena, base.root, &base.order, Probe::Bytes(&bytes), key_slot, val_slot)?
        } else {
            return Ok(base);
        };
        base.root = outcome.root;
        if !outcome.existed {
            base.size += 1;
        }
        Ok(base)
    }

    /// Returns a new version without `key`. Removing an absent key
    /// returns an unchanged handle.
    ///
    /// # Errors
    ///
    /// Allocation and codec errors.
    pub fn remove(&self, arena: &mut Arena, key: &Value) -> Result<Self, Error> {
        let mut base = self.base(arena);
        let removed = if let Some(num) = base.probe_num(key) {
            rbtree::delete(arena, base.root, &base.order, Probe::Num(num))?
        } else if let Some(bytes) = base.probe_bytes(key)? {
            rbtree::delete(arena, base.root, &base.order, Probe::Bytes(&bytes))?
        } else {
            None
        };
        if let Some(root) = removed {
            base.root = root;
            base.size -= 1;
        }
        Ok(base)
    }

    fn lookup(&self, arena: &Arena, key: &Value) -> Result<Option<(u64, u64)>, Error> {
        if !arena.is_current(self.generation) {
            return Ok(None);
        }
        if let Some(num) = self.probe_num(key) {
            Ok(rbtree::find(arena, self.root, &self.order, Probe::Num(num)))
        } else if let Some(bytes) = self.probe_bytes(key)? {
            Ok(rbtree::find(arena, self.root, &self.order, Probe::Bytes(&bytes)))
        } else {
            Ok(None)
        }
    }

    /// Looks up `key`. Stale handles read as absent.
    ///
    /// # Errors
    ///
    /// Codec errors from decoding.
    pub fn get(&self, arena: &Arena, key: &Value) -> Result<Option<Value>, Error> {
        match self.lookup(arena, key)? {
            Some((_, val_slot)) => Ok(Some(Value::decode_slot(&self.kind, arena, val_slot)?)),
            None => Ok(None),
        }
    }

    /// Returns `true` if `key` is present in this version.
    ///
    /// # Errors
    ///
    /// Codec errors from probe encoding.
    pub fn contains_key(&self, arena: &Arena, key: &Value) -> Result<bool, Error> {
        Ok(self.lookup(arena, key)?.is_some())
    }

    fn decode_entry(&self, arena: &Arena, entry: (u64, u64)) -> Result<(Value, Value), Error> {
        Ok((
            self.decode_key(arena, entry.0)?,
            Value::decode_slot(&self.kind, arena, entry.1)?,
        ))
    }

    /// Smallest entry under this map's order.
    ///
    /// # Errors
    ///
    /// Codec errors from decoding.
    pub fn get_min(&self, arena: &Arena) -> Result<Option<(Value, Value)>, Error> {
        if !arena.is_current(self.generation) {
            return Ok(None);
        }
        rbtree::get_min(arena, self.root)
            .map(|e| self.decode_entry(arena, e))
            .transpose()
    }

    /// Largest entry under this map's order.
    ///
    /// # Errors
    ///
    /// Codec errors from decoding.
    pub fn get_max(&self, arena: &Arena) -> Result<Option<(Value, Value)>, Error> {
        if !arena.is_current(self.generation) {
            return Ok(None);
        }
        rbtree::get_max(arena, self.root)
            .map(|e| self.decode_entry(arena, e))
            .transpose()
    }

    /// Smallest entry strictly after `key` under this map's order.
    ///
    /// # Errors
    ///
    /// Codec errors from decoding.
    pub fn next_entry(&self, arena: &Arena, key: &Value) -> Result<Option<(Value, Value)>, Error> {
        if !arena.is_current(self.generation) {
            return Ok(None);
        }
        let found = if let Some(num) = self.probe_num(key) {
            rbtree::get_next(arena, self.root, &self.order, Probe::Num(num))
        } else if let Some(bytes) = self.probe_bytes(key)? {
            rbtree::get_next(arena, self.root, &self.order, Probe::Bytes(&bytes))
        } else {
            None
        };
        found.map(|e| self.decode_entry(arena, e)).transpose()
    }

    /// Largest entry strictly before `key` under this map's order.
    ///
    /// # Errors
    ///
    /// Codec errors from decoding.
    pub fn prev_entry(&self, arena: &Arena, key: &Value) -> Result<Option<(Value, Value)>, Error> {
        if !arena.is_current(self.generation) {
            return Ok(None);
        }
        let found = if let Some(num) = self.probe_num(key) {
            rbtree::get_prev(arena, self.root, &self.order, Probe::Num(num))
        } else if let Some(bytes) = self.probe_bytes(key)? {
            rbtree::get_prev(arena, self.root, &self.order, Probe::Bytes(&bytes))
        } else {
            None
        };
        found.map(|e| self.decode_entry(arena, e)).transpose()
    }

    /// Visits entries in this map's order.
    ///
    /// # Errors
    ///
    /// Codec errors from decoding.
    pub fn for_each(&self, arena: &Arena, mut f: impl FnMut(Value, Value)) -> Result<(), Error> {
        if !arena.is_current(self.generation) {
            return Ok(());
        }
        let mut cursor = InOrder::new(arena, self.root);
        while let Some(entry) = cursor.next_entry(arena) {
            let (k, v) = self.decode_entry(arena, entry)?;
            f(k, v);
        }
        Ok(())
    }

    /// Collects `(key, value)` pairs in this map's order.
    ///
    /// # Errors
    ///
    /// As for [`for_each`](Self::for_each).
    pub fn entries(&self, arena: &Arena) -> Result<Vec<(Value, Value)>, Error> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each(arena, |k, v| out.push((k, v)))?;
        Ok(out)
    }

    /// Collects keys in this map's order.
    ///
    /// # Errors
    ///
    /// As for [`for_each`](Self::for_each).
    pub fn keys(&self, arena: &Arena) -> Result<Vec<Value>, Error> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each(arena, |k, _| out.push(k))?;
        Ok(out)
    }

    /// Packages this handle for a nested envelope or worker snapshot.
    ///
    /// A [`KeyOrder::Custom`] comparator cannot travel; the decoded
    /// handle falls back to the natural byte order.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        Envelope {
            kind: StructureKind::SharedSortedMap,
            inner: self.kind.clone(),
            data: HandleFields {
                root: self.root,
                size: self.size,
                reverse: self.order.reversed(),
                numeric: self.order.numeric(),
                ..HandleFields::default()
            },
        }
    }

    /// Rebuilds a handle from envelope fields against `arena`.
    #[must_use]
    pub fn from_envelope(arena: &Arena, env: &Envelope) -> Self {
        let order = match (env.data.numeric, env.data.reverse) {
            (true, false) => KeyOrder::Numeric,
            (true, true) => KeyOrder::NumericReverse,
            (false, false) => KeyOrder::Bytes,
            (false, true) => KeyOrder::BytesReverse,
        };
        let mut handle = Self::new(arena, env.inner.clone(), order);
        handle.root = env.data.root;
        handle.size = env.data.size;
        handle
    }
}

impl fmt::Display for SharedSortedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSortedMap<{}>[{}]", self.kind, self.size)
    }
}

// ---------------------------------------------------------------------------
// Set
// ---------------------------------------------------------------------------

/// Persistent sorted set. Elements are the tree keys; value slots stay
/// empty.
#[derive(Clone, Debug)]
pub struct SharedSortedSet {
    map: SharedSortedMap,
}

impl SharedSortedSet {
    /// Creates an empty set with the given element kind and order.
    #[must_use]
    pub fn new(arena: &Arena, kind: ValueKind, order: KeyOrder) -> Self {
        let map = SharedSortedMap::new(arena, kind.clone(), order).with_key_kind(kind);
        Self { map }
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
    /// As for [`SharedSortedMap::insert`].
    pub fn insert(&self, arena: &mut Arena, element: &Value) -> Result<Self, Error> {
        Ok(Self { map: self.map.insert(arena, element, &Value::Bool(true))? })
    }

    /// Returns a new version without `element`.
    ///
    /// # Errors
    ///
    /// As for [`SharedSortedMap::remove`].
    pub fn remove(&self, arena: &mut Arena, element: &Value) -> Result<Self, Error> {
        Ok(Self { map: self.map.remove(arena, element)? })
    }

    /// Returns `true` if `element` is present in this version.
    ///
    /// # Errors
    ///
    /// Codec errors from probe encoding.
    pub fn contains(&self, arena: &Arena, element: &Value) -> Result<bool, Error> {
        self.map.contains_key(arena, element)
    }

    /// Collects elements in this set's order.
    ///
    /// # Errors
    ///
    /// Codec errors from decoding.
    pub fn elements(&self, arena: &Arena) -> Result<Vec<Value>, Error> {
        self.map.keys(arena)
    }

    /// Packages this handle for a nested envelope or worker snapshot.
    #[must_use]
    pub fn to_envelope(&self) -> Envelope {
        let mut env = self.map.to_envelope();
        env.kind = StructureKind::SharedSortedSet;
        env
    }

    /// Rebuilds a handle from envelope fields against `arena`.
    #[must_use]
    pub fn from_envelope(arena: &Arena, env: &Envelope) -> Self {
        let map = SharedSortedMap::from_envelope(arena, env).with_key_kind(env.inner.clone());
        Self { map }
    }
}

impl fmt::Display for SharedSortedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSortedSet<{}>[{}]", self.value_kind(), self.len())
    }
}
