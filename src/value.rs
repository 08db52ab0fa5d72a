//! Handle-layer value codec.
//!
//! Node payloads are untyped bytes (or 8-byte slots); this module is the
//! only place value variants matter. A handle carries a [`ValueKind`] tag
//! and every read decodes through it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::envelope::Envelope;
use crate::error::Error;
use crate::word;

// ---------------------------------------------------------------------------
// Structure kinds
// ---------------------------------------------------------------------------

/// The closed set of structure kinds, as spelled in nested envelopes and
/// worker snapshots.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum StructureKind {
    /// Unordered hash map.
    SharedMap,
    /// Unordered hash set.
    SharedSet,
    /// Indexed list (vector trie).
    SharedList,
    /// LIFO stack.
    SharedStack,
    /// FIFO queue.
    SharedQueue,
    /// Singly-linked list.
    SharedLinkedList,
    /// Doubly-linked list.
    SharedDoublyLinkedList,
    /// Insertion-ordered map.
    SharedOrderedMap,
    /// Insertion-ordered set.
    SharedOrderedSet,
    /// Sorted map (red-black tree).
    SharedSortedMap,
    /// Sorted set (red-black tree).
    SharedSortedSet,
    /// Priority queue (leftist or binary heap).
    SharedPriorityQueue,
}

impl StructureKind {
    /// The envelope tag for this kind.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::SharedMap => "SharedMap",
            Self::SharedSet => "SharedSet",
            Self::SharedList => "SharedList",
            Self::SharedStack => "SharedStack",
            Self::SharedQueue => "SharedQueue",
            Self::SharedLinkedList => "SharedLinkedList",
            Self::SharedDoublyLinkedList => "SharedDoublyLinkedList",
            Self::SharedOrderedMap => "SharedOrderedMap",
            Self::SharedOrderedSet => "SharedOrderedSet",
            Self::SharedSortedMap => "SharedSortedMap",
            Self::SharedSortedSet => "SharedSortedSet",
            Self::SharedPriorityQueue => "SharedPriorityQueue",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for StructureKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Ok(match s {
            "SharedMap" => Self::SharedMap,
            "SharedSet" => Self::SharedSet,
            "SharedList" => Self::SharedList,
            "SharedStack" => Self::SharedStack,
            "SharedQueue" => Self::SharedQueue,
            "SharedLinkedList" => Self::SharedLinkedList,
            "SharedDoublyLinkedList" => Self::SharedDoublyLinkedList,
            "SharedOrderedMap" => Self::SharedOrderedMap,
            "SharedOrderedSet" => Self::SharedOrderedSet,
            "SharedSortedMap" => Self::SharedSortedMap,
            "SharedSortedSet" => Self::SharedSortedSet,
            "SharedPriorityQueue" => Self::SharedPriorityQueue,
            other => return Err(Error::UnknownStructureKind(other.to_owned())),
        })
    }
}

// ---------------------------------------------------------------------------
// Value kinds
// ---------------------------------------------------------------------------

/// Runtime tag describing what a structure's values are.
///
/// Spelled `number | boolean | string | object | <Kind><<inner>>` in
/// envelopes and snapshots.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ValueKind {
    /// IEEE-754 double.
    Number,
    /// Boolean.
    Bool,
    /// UTF-8 text.
    Str,
    /// JSON-serialized aggregate.
    Object,
    /// Another structure, carried as a nested envelope.
    Nested(StructureKind, Box<ValueKind>),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => f.write_str("number"),
            Self::Bool => f.write_str("boolean"),
            Self::Str => f.write_str("string"),
            Self::Object => f.write_str("object"),
            Self::Nested(kind, inner) => write!(f, "{kind}<{inner}>"),
        }
    }
}

impl FromStr for ValueKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Ok(match s {
            "number" => Self::Number,
            "boolean" => Self::Bool,
            "string" => Self::Str,
            "object" => Self::Object,
            other => {
                let (kind, rest) = other
                    .split_once('<')
                    .ok_or_else(|| Error::UnknownStructureKind(other.to_owned()))?;
                let inner = rest
                    .strip_suffix('>')
                    .ok_or_else(|| Error::UnknownStructureKind(other.to_owned()))?;
                Self::Nested(kind.parse()?, Box::new(inner.parse()?))
            }
        })
    }
}

impl Serialize for ValueKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ValueKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A decoded value.
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    /// IEEE-754 double.
    Number(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 text.
    Str(String),
    /// JSON aggregate.
    Object(serde_json::Value),
    /// A nested structure's envelope.
    Nested(Envelope),
}

impl Value {
    /// The kind tag this value decodes under.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Number(_) => ValueKind::Number,
            Self::Bool(_) => ValueKind::Bool,
            Self::Str(_) => ValueKind::Str,
            Self::Object(_) => ValueKind::Object,
            Self::Nested(env) => ValueKind::Nested(env.kind, Box::new(env.inner.clone())),
        }
    }

    /// Encodes the value as a byte payload (HAMT and ordered-map leaves
    /// inline these bytes).
    ///
    /// # Errors
    ///
    /// [`Error::Envelope`] if JSON serialization fails.
    pub fn encode_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(match self {
            Self::Number(v) => v.to_le_bytes().to_vec(),
            Self::Bool(v) => vec![u8::from(*v)],
            Self::Str(v) => v.clone().into_bytes(),
            Self::Object(v) => serde_json::to_vec(v)?,
            Self::Nested(env) => env.to_json_bytes()?,
        })
    }

    /// Decodes a byte payload under `kind`.
    ///
    /// Truncated numeric or boolean payloads decode to `0.0` / `false`
    /// rather than failing; the byte encodings are total.
    ///
    /// # Errors
    ///
    /// [`Error::Envelope`] on malformed JSON,
    /// [`Error::UnknownStructureKind`] on an unregistered envelope tag.
    pub fn decode_bytes(kind: &ValueKind, bytes: &[u8]) -> Result<Self, Error> {
        Ok(match kind {
            ValueKind::Number => {
                let mut raw = [0_u8; 8];
                let n = bytes.len().min(8);
                raw[..n].copy_from_slice(&bytes[..n]);
                Self::Number(f64::from_le_bytes(raw))
            }
            ValueKind::Bool => Self::Bool(bytes.first().is_some_and(|&b| b != 0)),
            ValueKind::Str => Self::Str(String::from_utf8_lossy(bytes).into_owned()),
            ValueKind::Object => Self::Object(serde_json::from_slice(bytes)?),
            ValueKind::Nested(..) => Self::Nested(Envelope::from_json_bytes(bytes)?),
        })
    }

    /// Encodes the value into an 8-byte node slot, allocating a blob for
    /// byte-backed variants.
    ///
    /// # Errors
    ///
    /// Allocation and serialization errors from the arena and codec.
    pub fn encode_slot(&self, arena: &mut Arena) -> Result<u64, Error> {
        Ok(match self {
            Self::Number(v) => word::slot_from_f64(*v),
            Self::Bool(v) => word::slot_from_bool(*v),
            Self::Str(_) | Self::Object(_) | Self::Nested(_) => {
                let bytes = self.encode_bytes()?;
                word::slot_from_word(arena.store_blob(&bytes)?)
            }
        })
    }

    /// Decodes an 8-byte node slot under `kind`.
    ///
    /// # Errors
    ///
    /// As for [`decode_bytes`](Self::decode_bytes).
    pub fn decode_slot(kind: &ValueKind, arena: &Arena, slot: u64) -> Result<Self, Error> {
        match kind {
            ValueKind::Number => Ok(Self::Number(word::f64_from_slot(slot))),
            ValueKind::Bool => Ok(Self::Bool(slot != 0)),
            ValueKind::Str | ValueKind::Object | ValueKind::Nested(..) => {
                let bytes = arena.blob(word::word_from_slot(slot)).to_vec();
                Self::decode_bytes(kind, &bytes)
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Envelope> for Value {
    fn from(env: Envelope) -> Self {
        Self::Nested(env)
    }
}
