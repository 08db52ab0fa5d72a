//! Root-slot table: per-version release ahead of a full reset.
//!
//! The table tracks individual structure roots so the caller can hand a
//! fixed-size top-level node back to its free list when the last handle
//! to a version goes away. Reclamation stays coarse — interior nodes are
//! only recovered by [`Arena::reset`] — but hot structures that churn
//! versions get their top nodes recycled.
//!
//! Every entry is stamped with the arena generation at registration; a
//! release after a reset is detected and dropped instead of poisoning
//! the new generation's free lists. Hosts that want release-on-drop
//! attach [`unregister_root`](RootSlots::unregister_root) to their
//! handle teardown.

use crate::arena::{Arena, FixedClass};

/// Identifier of a registered root slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SlotId(u32);

#[derive(Clone, Copy)]
struct RootEntry {
    ptr: u32,
    class: Option<FixedClass>,
    generation: u32,
}

/// Table of registered roots plus the pending-release list.
pub struct RootSlots {
    slots: Vec<Option<RootEntry>>,
    free: Vec<u32>,
    capacity: usize,
    pending: Vec<RootEntry>,
    ops_threshold: usize,
    memory_threshold: u32,
}

impl RootSlots {
    /// Creates a table holding at most `capacity` roots, draining the
    /// pending list every 64 releases or once the heap passes 1 MiB.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_thresholds(capacity, 64, 1 << 20)
    }

    /// Creates a table with explicit auto-release thresholds: the
    /// pending list drains when it reaches `ops_threshold` entries or
    /// when the arena's bump cursor passes `memory_threshold`.
    #[must_use]
    pub fn with_thresholds(capacity: usize, ops_threshold: usize, memory_threshold: u32) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
            pending: Vec::new(),
            ops_threshold: ops_threshold.max(1),
            memory_threshold,
        }
    }

    /// Registers a root. `class` names the root node's fixed-size class
    /// when it has one; classless roots are tracked but their nodes are
    /// only recovered by reset.
    ///
    /// Returns `None` when the table is exhausted — the structure stays
    /// usable, just not individually releasable.
    #[must_use]
    pub fn register_root(
        &mut self,
        arena: &Arena,
        ptr: u32,
        class: Option<FixedClass>,
    ) -> Option<SlotId> {
        let entry = RootEntry { ptr, class, generation: arena.generation() };
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(entry);
            return Some(SlotId(idx));
        }
        if self.slots.len() >= self.capacity {
            return None;
        }
        self.slots.push(Some(entry));
        Some(SlotId(self.slots.len() as u32 - 1))
    }

    /// Swaps a new root into `slot`. The previous root joins the
    /// pending-release list; other live roots are unaffected.
    pub fn update_root(&mut self, arena: &mut Arena, slot: SlotId, new_ptr: u32) {
        let Some(entry) = self.slots.get_mut(slot.0 as usize).and_then(Option::as_mut) else {
            return;
        };
        let old = *entry;
        entry.ptr = new_ptr;
        entry.generation = arena.generation();
        self.pending.push(old);
        self.maybe_drain(arena);
    }

    /// Frees `slot` and releases its root immediately.
    pub fn unregister_root(&mut self, arena: &mut Arena, slot: SlotId) {
        let Some(entry) = self.slots.get_mut(slot.0 as usize).and_then(Option::take) else {
            return;
        };
        self.free.push(slot.0);
        release(arena, entry);
    }

    /// Number of releases waiting on a threshold.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Releases everything on the pending list now.
    pub fn drain(&mut self, arena: &mut Arena) {
        for entry in self.pending.drain(..) {
            release(arena, entry);
        }
    }

    fn maybe_drain(&mut self, arena: &mut Arena) {
        if self.pending.len() >= self.ops_threshold || arena.heap_end() > self.memory_threshold {
            self.drain(arena);
        }
    }
}

/// Returns a fixed-size root node to its free list. Stale entries
/// (registered before the last reset) are dropped: their memory was
/// already reclaimed wholesale.
fn release(arena: &mut Arena, entry: RootEntry) {
    if !arena.is_current(entry.generation) || entry.ptr == 0 {
        return;
    }
    if let Some(class) = entry.class {
        arena.free_fixed(class, entry.ptr);
    }
}
