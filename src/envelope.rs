//! Nested-structure envelope.
//!
//! A structure stored as a value travels as the JSON triple
//! `{"__t": kind, "__i": inner-value-kind, "__d": handle-fields}`. The
//! registry is the closed [`StructureKind`](crate::StructureKind) set;
//! decoding an unregistered tag fails with
//! [`Error::UnknownStructureKind`](crate::Error::UnknownStructureKind).
//!
//! The collections themselves never interpret the envelope; they see
//! bytes. Encoding and decoding happen at the handle layer.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::value::{StructureKind, ValueKind};

/// The handle fields carried in an envelope's `__d` member.
///
/// A superset of every structure's handle record; each structure reads
/// the fields it declared. Generation tags do not travel: a decoded
/// handle adopts the generation of the arena it is decoded against.
#[derive(Clone, Copy, Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct HandleFields {
    /// Trie / tree root pointer.
    #[serde(default)]
    pub root: u32,
    /// List head pointer.
    #[serde(default)]
    pub head: u32,
    /// List tail pointer (also the vector trie's tail buffer).
    #[serde(default)]
    pub tail: u32,
    /// Vector trie root shift.
    #[serde(default)]
    pub shift: u32,
    /// Binary heap region pointer.
    #[serde(default)]
    pub heap: u32,
    /// Element count.
    #[serde(default)]
    pub size: u32,
    /// Priority queue direction.
    #[serde(default)]
    pub is_max: bool,
    /// Priority queue variant: `true` for the in-arena binary heap.
    #[serde(default)]
    pub binary: bool,
    /// Sorted map/set natural-order reversal flag.
    #[serde(default)]
    pub reverse: bool,
    /// Sorted map/set numeric-key flag.
    #[serde(default)]
    pub numeric: bool,
}

/// A nested structure reference: kind, inner value kind, handle fields.
#[derive(Clone, PartialEq, Debug)]
pub struct Envelope {
    /// Which structure this is.
    pub kind: StructureKind,
    /// What the inner structure's values are.
    pub inner: ValueKind,
    /// The inner structure's handle fields.
    pub data: HandleFields,
}

/// Wire shape of the envelope. Kept separate so tag lookups can fail with
/// the registry error instead of a serde error.
#[derive(Serialize, Deserialize)]
struct Wire {
    #[serde(rename = "__t")]
    t: String,
    #[serde(rename = "__i")]
    i: String,
    #[serde(rename = "__d")]
    d: HandleFields,
}

impl Envelope {
    /// Serializes the envelope to JSON bytes.
    ///
    /// # Errors
    ///
    /// [`Error::Envelope`] if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, Error> {
        let wire = Wire {
            t: self.kind.tag().to_owned(),
            i: self.inner.to_string(),
            d: self.data,
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    /// Parses an envelope from JSON bytes, consulting the registry for
    /// the `__t` and `__i` tags.
    ///
    /// # Errors
    ///
    /// [`Error::Envelope`] on malformed JSON,
    /// [`Error::UnknownStructureKind`] on an unregistered tag.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let wire: Wire = serde_json::from_slice(bytes)?;
        Ok(Self {
            kind: wire.t.parse()?,
            inner: wire.i.parse()?,
            data: wire.d,
        })
    }
}
