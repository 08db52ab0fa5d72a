//! Byte-region arena with bump allocation, fixed-size free lists, and the
//! cross-worker attach protocol.
//!
//! One arena backs one structure family. The region is divided at fixed
//! offsets:
//!
//! ```text
//! [0 .. 4096)        key scratch   (caller stages the next key here)
//! [4096 .. 8192)     blob scratch  (caller stages the next value here)
//! [65536 ..)         node heap     (bump cursor + per-class free lists)
//! ```
//!
//! Workers must query [`Arena::key_buf`] / [`Arena::blob_buf`] /
//! [`Arena::heap_start`] instead of hard-coding these constants; the
//! offsets are part of the attach contract.
//!
//! The backing bytes live behind an [`Arc`], so publishing a snapshot to
//! another thread is zero-copy. A subscriber that allocates locally after
//! attaching triggers a copy-on-write of the whole region, which is what
//! makes its new versions visible only to itself.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::word::{self, PackedWord};

/// Offset of the key scratch region.
const KEY_SCRATCH: u32 = 0;

/// Size of the key scratch region.
const KEY_SCRATCH_SIZE: u32 = 4096;

/// Offset of the blob (value) scratch region.
const BLOB_SCRATCH: u32 = 4096;

/// Size of the blob scratch region.
const BLOB_SCRATCH_SIZE: u32 = 4096;

/// First heap offset. Offset `0` inside the heap address space is never a
/// valid node pointer, so `0` doubles as the null sentinel everywhere.
const HEAP_START: u32 = 65_536;

/// Growth quantum for the backing memory.
const PAGE: u32 = 65_536;

/// Default growth limit (64 MiB).
const DEFAULT_LIMIT: u32 = 64 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Fixed-size node classes
// ---------------------------------------------------------------------------

/// Fixed-size node classes, one free list each.
///
/// Released nodes are linked through their first word. Variable-size
/// nodes (HAMT internals, leaves, blobs) are bump-allocated only and
/// reclaimed by [`Arena::reset`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FixedClass {
    /// Doubly-linked list node (16 bytes).
    DoublyNode,
    /// Singly-linked list node (16 bytes).
    SinglyNode,
    /// Red-black tree node (32 bytes).
    RbNode,
    /// Leftist heap node (32 bytes).
    LeftistNode,
    /// Vector trie internal node (32 × u32 children, 128 bytes).
    VecInternal,
    /// Vector trie leaf / tail node (32 × u64 slots, 256 bytes).
    VecLeaf,
}

impl FixedClass {
    /// Number of classes (length of the free-list table).
    pub const COUNT: usize = 6;

    /// Byte size of one node of this class.
    #[must_use]
    pub const fn size(self) -> u32 {
        match self {
            Self::DoublyNode | Self::SinglyNode => 16,
            Self::RbNode | Self::LeftistNode => 32,
            Self::VecInternal => 128,
            Self::VecLeaf => 256,
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::DoublyNode => 0,
            Self::SinglyNode => 1,
            Self::RbNode => 2,
            Self::LeftistNode => 3,
            Self::VecInternal => 4,
            Self::VecLeaf => 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Allocator state (the bytes that cross a thread boundary)
// ---------------------------------------------------------------------------

/// Allocator state published alongside the backing memory.
///
/// A subscriber aligns its own view with the sender's by attaching with
/// this state; see [`Arena::attach_to_memory`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct AllocState {
    /// Bump cursor: next free heap offset.
    pub heap_end: u32,
    /// Free-list heads, indexed by [`FixedClass`].
    pub free_lists: [u32; FixedClass::COUNT],
    /// Generation counter at publish time.
    pub generation: u32,
}

/// A publishable view of an arena: shared backing bytes plus allocator
/// state. Cloning is cheap (`Arc` bump); the snapshot is `Send + Sync`.
#[derive(Clone, Debug)]
pub struct ArenaSnapshot {
    bytes: Arc<Vec<u8>>,
    state: AllocState,
    limit: u32,
}

impl ArenaSnapshot {
    /// The allocator state carried by this snapshot.
    #[must_use]
    pub const fn state(&self) -> AllocState {
        self.state
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// A contiguous byte region owned by one structure family.
///
/// All node and blob allocations for that family come from here. Writes
/// never touch previously allocated nodes (path copy), so a quiesced
/// arena is safe to read from any number of threads.
pub struct Arena {
    bytes: Arc<Vec<u8>>,
    heap_end: u32,
    free_lists: [u32; FixedClass::COUNT],
    generation: u32,
    limit: u32,
}

impl Arena {
    /// Creates an empty arena with the default 64 MiB growth limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_LIMIT)
    }

    /// Creates an empty arena that refuses to grow past `limit` bytes.
    #[must_use]
    pub fn with_limit(limit: u32) -> Self {
        Self {
            bytes: Arc::new(vec![0; HEAP_START as usize]),
            heap_end: HEAP_START,
            free_lists: [0; FixedClass::COUNT],
            generation: 0,
            limit: limit.max(HEAP_START),
        }
    }

    // -- region offsets (attach contract) -----------------------------------

    /// Offset of the key scratch region.
    #[must_use]
    pub const fn key_buf(&self) -> u32 {
        KEY_SCRATCH
    }

    /// Offset of the blob scratch region.
    #[must_use]
    pub const fn blob_buf(&self) -> u32 {
        BLOB_SCRATCH
    }

    /// First heap offset. Also the post-`reset` bump cursor.
    #[must_use]
    pub const fn heap_start(&self) -> u32 {
        HEAP_START
    }

    // -- generation ---------------------------------------------------------

    /// Current generation. Bumped by [`reset`](Self::reset); handles
    /// created before the bump are stale.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns `true` if a handle tagged with `generation` is still valid.
    #[must_use]
    pub const fn is_current(&self, generation: u32) -> bool {
        self.generation == generation
    }

    // -- scratch staging ----------------------------------------------------

    /// Copies the next key into the key scratch region.
    ///
    /// # Errors
    ///
    /// [`Error::PayloadTooLarge`] if the key exceeds the packed-word
    /// length cap or the scratch region.
    pub fn stage_key(&mut self, key: &[u8]) -> Result<u16, Error> {
        Self::stage(self.buf_mut(), KEY_SCRATCH, KEY_SCRATCH_SIZE, key)
    }

    /// Copies the next value into the blob scratch region.
    ///
    /// # Errors
    ///
    /// [`Error::PayloadTooLarge`] if the value exceeds the packed-word
    /// length cap or the scratch region.
    pub fn stage_blob(&mut self, value: &[u8]) -> Result<u16, Error> {
        Self::stage(self.buf_mut(), BLOB_SCRATCH, BLOB_SCRATCH_SIZE, value)
    }

    fn stage(buf: &mut [u8], at: u32, cap: u32, bytes: &[u8]) -> Result<u16, Error> {
        let len = bytes.len();
        if len as u64 > u64::from(cap.min(word::MAX_LEN)) {
            return Err(Error::PayloadTooLarge { len });
        }
        buf[at as usize..at as usize + len].copy_from_slice(bytes);
        Ok(len as u16)
    }

    /// Reads the first `len` staged key bytes.
    #[must_use]
    pub fn key_scratch(&self, len: u16) -> &[u8] {
        let at = KEY_SCRATCH as usize;
        &self.bytes[at..at + len as usize]
    }

    /// Reads the first `len` staged value bytes.
    #[must_use]
    pub fn blob_scratch(&self, len: u16) -> &[u8] {
        let at = BLOB_SCRATCH as usize;
        &self.bytes[at..at + len as usize]
    }

    // -- allocation ---------------------------------------------------------

    /// Bump-allocates `n` bytes, 8-byte aligned and zeroed.
    ///
    /// Grows the backing memory in 64 KiB pages as needed.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if growth would exceed the configured limit.
    pub fn alloc(&mut self, n: u32) -> Result<u32, Error> {
        let size = (n + 7) & !7;
        let ptr = self.heap_end;
        let new_end = ptr
            .checked_add(size)
            .ok_or(Error::OutOfMemory { limit: self.limit })?;
        if new_end as usize > self.bytes.len() {
            let target = new_end
                .checked_add(PAGE - 1)
                .ok_or(Error::OutOfMemory { limit: self.limit })?
                / PAGE
                * PAGE;
            if target > self.limit {
                return Err(Error::OutOfMemory { limit: self.limit });
            }
            Arc::make_mut(&mut self.bytes).resize(target as usize, 0);
        }
        // The range may hold pre-reset data; callers rely on zeroed nodes.
        self.buf_mut()[ptr as usize..new_end as usize].fill(0);
        self.heap_end = new_end;
        Ok(ptr)
    }

    /// Allocates one node of a fixed-size class: pops the class free list,
    /// falling back to [`alloc`](Self::alloc). The node is zeroed.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] on bump fallback past the growth limit.
    pub fn alloc_fixed(&mut self, class: FixedClass) -> Result<u32, Error> {
        let head = self.free_lists[class.slot()];
        if head == 0 {
            return self.alloc(class.size());
        }
        self.free_lists[class.slot()] = self.read_u32(head);
        let at = head as usize;
        self.buf_mut()[at..at + class.size() as usize].fill(0);
        Ok(head)
    }

    /// Returns a node to its class free list.
    ///
    /// The node's first word becomes the free-list link; the node must not
    /// be reachable from any live root.
    pub fn free_fixed(&mut self, class: FixedClass, ptr: u32) {
        let head = self.free_lists[class.slot()];
        self.write_u32(ptr, head);
        self.free_lists[class.slot()] = ptr;
    }

    /// Allocates a blob and fills it with the first `len` staged bytes of
    /// the blob scratch region.
    ///
    /// # Errors
    ///
    /// [`Error::PayloadTooLarge`] if `len` or the resulting offset exceed
    /// the packed-word caps; [`Error::OutOfMemory`] from the bump.
    pub fn alloc_blob(&mut self, len: u16) -> Result<u32, Error> {
        if u32::from(len) > word::MAX_LEN {
            return Err(Error::PayloadTooLarge { len: len as usize });
        }
        let dst = self.alloc(u32::from(len))?;
        if dst > word::MAX_PTR {
            return Err(Error::PayloadTooLarge { len: len as usize });
        }
        let src = BLOB_SCRATCH as usize;
        let buf = self.buf_mut();
        buf.copy_within(src..src + len as usize, dst as usize);
        Ok(dst)
    }

    /// Stages `bytes` in the blob scratch and allocates them as a blob,
    /// returning the packed reference.
    ///
    /// # Errors
    ///
    /// [`Error::PayloadTooLarge`] / [`Error::OutOfMemory`] as for
    /// [`stage_blob`](Self::stage_blob) and [`alloc_blob`](Self::alloc_blob).
    pub fn store_blob(&mut self, bytes: &[u8]) -> Result<PackedWord, Error> {
        let len = self.stage_blob(bytes)?;
        let ptr = self.alloc_blob(len)?;
        PackedWord::pack(ptr, u32::from(len))
    }

    /// Reads the bytes referenced by a packed word.
    #[must_use]
    pub fn blob(&self, word: PackedWord) -> &[u8] {
        let at = word.ptr() as usize;
        &self.bytes[at..at + word.len() as usize]
    }

    /// Discards every allocation: the bump cursor returns to
    /// [`heap_start`](Self::heap_start), all free lists empty, and the
    /// generation counter increments. Every handle issued before the call
    /// is now stale.
    pub fn reset(&mut self) {
        self.heap_end = HEAP_START;
        self.free_lists = [0; FixedClass::COUNT];
        self.generation = self.generation.wrapping_add(1);
    }

    // -- raw accessors ------------------------------------------------------

    /// Reads a little-endian u32 at `off`.
    #[must_use]
    pub fn read_u32(&self, off: u32) -> u32 {
        let at = off as usize;
        u32::from_le_bytes(self.bytes[at..at + 4].try_into().expect("4 bytes"))
    }

    /// Writes a little-endian u32 at `off`.
    pub fn write_u32(&mut self, off: u32, v: u32) {
        let at = off as usize;
        self.buf_mut()[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// Reads a little-endian u64 at `off`.
    #[must_use]
    pub fn read_u64(&self, off: u32) -> u64 {
        let at = off as usize;
        u64::from_le_bytes(self.bytes[at..at + 8].try_into().expect("8 bytes"))
    }

    /// Writes a little-endian u64 at `off`.
    pub fn write_u64(&mut self, off: u32, v: u64) {
        let at = off as usize;
        self.buf_mut()[at..at + 8].copy_from_slice(&v.to_le_bytes());
    }

    /// Reads an IEEE-754 double at `off`.
    #[must_use]
    pub fn read_f64(&self, off: u32) -> f64 {
        f64::from_bits(self.read_u64(off))
    }

    /// Writes an IEEE-754 double at `off`.
    pub fn write_f64(&mut self, off: u32, v: f64) {
        self.write_u64(off, v.to_bits());
    }

    /// Reads `len` raw bytes at `off`.
    #[must_use]
    pub fn bytes(&self, off: u32, len: u32) -> &[u8] {
        let at = off as usize;
        &self.bytes[at..at + len as usize]
    }

    /// Writes raw bytes at `off`.
    pub fn write_bytes(&mut self, off: u32, bytes: &[u8]) {
        let at = off as usize;
        self.buf_mut()[at..at + bytes.len()].copy_from_slice(bytes);
    }

    fn buf_mut(&mut self) -> &mut Vec<u8> {
        // Copy-on-write: unique owners mutate in place; a subscriber that
        // writes after a zero-copy attach clones the region first, so its
        // allocations stay local until published back.
        Arc::make_mut(&mut self.bytes)
    }

    // -- attach protocol ----------------------------------------------------

    /// Bump cursor (attach protocol only).
    #[must_use]
    pub const fn heap_end(&self) -> u32 {
        self.heap_end
    }

    /// Overrides the bump cursor (attach protocol only).
    pub fn set_heap_end(&mut self, v: u32) {
        self.heap_end = v.max(HEAP_START);
    }

    /// Free-list head for `class` (attach protocol only).
    #[must_use]
    pub fn free_list(&self, class: FixedClass) -> u32 {
        self.free_lists[class.slot()]
    }

    /// Overrides the free-list head for `class` (attach protocol only).
    pub fn set_free_list(&mut self, class: FixedClass, head: u32) {
        self.free_lists[class.slot()] = head;
    }

    /// Captures the allocator state for publication.
    #[must_use]
    pub const fn alloc_state(&self) -> AllocState {
        AllocState {
            heap_end: self.heap_end,
            free_lists: self.free_lists,
            generation: self.generation,
        }
    }

    /// Packages the backing memory and allocator state for another
    /// worker. Zero-copy; the receiver attaches with
    /// [`attach_to_memory`](Self::attach_to_memory).
    ///
    /// The transport delivering the snapshot must establish a
    /// happens-before edge between the sender's last write and the
    /// receiver's first read.
    #[must_use]
    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            bytes: Arc::clone(&self.bytes),
            state: self.alloc_state(),
            limit: self.limit,
        }
    }

    /// Returns a byte copy of the backing memory, for transports that
    /// cannot share memory. Pair with
    /// [`attach_to_buffer_copy`](Self::attach_to_buffer_copy).
    #[must_use]
    pub fn buffer_copy(&self) -> Vec<u8> {
        self.bytes.as_ref().clone()
    }

    /// Reconstructs a worker-side view over shared backing memory.
    ///
    /// The new arena reads the sender's nodes in place. Local allocations
    /// copy the region on first write and are visible only to this worker
    /// until published through a return snapshot.
    #[must_use]
    pub fn attach_to_memory(snapshot: &ArenaSnapshot) -> Self {
        Self {
            bytes: Arc::clone(&snapshot.bytes),
            heap_end: snapshot.state.heap_end.max(HEAP_START),
            free_lists: snapshot.state.free_lists,
            generation: snapshot.state.generation,
            limit: snapshot.limit,
        }
    }

    /// Reconstructs a worker-side view over a byte copy of the memory.
    #[must_use]
    pub fn attach_to_buffer_copy(bytes: Vec<u8>, state: AllocState) -> Self {
        let mut bytes = bytes;
        if bytes.len() < HEAP_START as usize {
            bytes.resize(HEAP_START as usize, 0);
        }
        let limit = DEFAULT_LIMIT.max(bytes.len() as u32);
        Self {
            bytes: Arc::new(bytes),
            heap_end: state.heap_end.max(HEAP_START),
            free_lists: state.free_lists,
            generation: state.generation,
            limit,
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("heap_end", &self.heap_end)
            .field("capacity", &self.bytes.len())
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
