//! Recency Queue Module
//!
//! Min-heap of cached keys ordered by last access, used to pick the least
//! recently used order for eviction.
//!
//! Heap positions never leave this module. Callers hold an [`EntryHandle`]
//! returned by [`RecencyQueue::push`] and hand it back to
//! [`RecencyQueue::update_priority`].

use std::time::Instant;

// == Entry Handle ==
/// Opaque reference to one live entry in a [`RecencyQueue`].
///
/// A handle goes stale once its entry is popped; stale handles are rejected
/// rather than touching whatever entry reused the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle {
    slot: usize,
    generation: u64,
}

/// An entry removed from the queue by [`RecencyQueue::pop_min`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoppedEntry {
    pub key: String,
    pub accessed_at: Instant,
}

// Instants can compare equal; the sequence number keeps ordering total and
// makes equal-instant entries pop in access order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Stamp {
    at: Instant,
    seq: u64,
}

#[derive(Debug, Clone, Copy)]
struct HeapNode {
    stamp: Stamp,
    slot: usize,
}

#[derive(Debug)]
struct Slot {
    key: String,
    generation: u64,
    /// Position of this slot's node inside `heap`
    pos: usize,
}

// == Recency Queue ==
/// Binary min-heap over access stamps. Not synchronized, see
/// [`SharedRecencyQueue`](super::SharedRecencyQueue).
///
/// Does not check for duplicate keys: the caller guarantees a key is pushed
/// at most once while it is live.
#[derive(Debug, Default)]
pub struct RecencyQueue {
    heap: Vec<HeapNode>,
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    ticks: u64,
}

impl RecencyQueue {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            ticks: 0,
        }
    }

    // == Push ==
    /// Inserts `key` last accessed at `at`. O(log n).
    pub fn push(&mut self, key: String, at: Instant) -> EntryHandle {
        let tick = self.next_tick();
        let pos = self.heap.len();
        let slot = Slot {
            key,
            generation: tick,
            pos,
        };

        let slot_id = match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(slot);
                id
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };

        self.heap.push(HeapNode {
            stamp: Stamp { at, seq: tick },
            slot: slot_id,
        });
        self.sift_up(pos);

        EntryHandle {
            slot: slot_id,
            generation: tick,
        }
    }

    // == Pop Min ==
    /// Removes and returns the least recently accessed entry, None if empty.
    /// O(log n).
    pub fn pop_min(&mut self) -> Option<PoppedEntry> {
        if self.heap.is_empty() {
            return None;
        }

        let last = self.heap.len() - 1;
        self.swap(0, last);
        let node = self.heap.pop()?;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }

        let slot = self.slots[node.slot].take()?;
        self.free.push(node.slot);

        Some(PoppedEntry {
            key: slot.key,
            accessed_at: node.stamp.at,
        })
    }

    // == Update Priority ==
    /// Moves the entry behind `handle` to access time `at`. O(log n).
    ///
    /// Returns false, leaving the queue untouched, if the handle is stale.
    pub fn update_priority(&mut self, handle: EntryHandle, at: Instant) -> bool {
        let tick = self.next_tick();
        let pos = match self.slot(handle) {
            Some(slot) => slot.pos,
            None => return false,
        };
        self.heap[pos].stamp = Stamp { at, seq: tick };

        // The new stamp may be older or newer than the old one
        if !self.sift_up(pos) {
            self.sift_down(pos);
        }
        true
    }

    // == Accessors ==
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Key of the next entry [`pop_min`](Self::pop_min) would return.
    #[cfg(test)]
    pub(crate) fn peek_min(&self) -> Option<&str> {
        let node = self.heap.first()?;
        self.slots[node.slot].as_ref().map(|slot| slot.key.as_str())
    }

    /// Whether `handle` still refers to a live entry.
    #[cfg(test)]
    pub(crate) fn contains(&self, handle: EntryHandle) -> bool {
        self.slot(handle).is_some()
    }

    /// Keys of all live entries, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.heap
            .iter()
            .filter_map(|node| self.slots[node.slot].as_ref())
            .map(|slot| slot.key.as_str())
    }

    // == Heap Internals ==
    fn next_tick(&mut self) -> u64 {
        self.ticks += 1;
        self.ticks
    }

    fn slot(&self, handle: EntryHandle) -> Option<&Slot> {
        self.slots
            .get(handle.slot)?
            .as_ref()
            .filter(|slot| slot.generation == handle.generation)
    }

    fn stamp_at(&self, pos: usize) -> Stamp {
        self.heap[pos].stamp
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        for pos in [a, b] {
            if let Some(slot) = self.slots[self.heap[pos].slot].as_mut() {
                slot.pos = pos;
            }
        }
    }

    /// Returns true if the entry moved.
    fn sift_up(&mut self, mut pos: usize) -> bool {
        let start = pos;
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.stamp_at(pos) >= self.stamp_at(parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
        pos != start
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;

            if left < len && self.stamp_at(left) < self.stamp_at(smallest) {
                smallest = left;
            }
            if right < len && self.stamp_at(right) < self.stamp_at(smallest) {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.swap(pos, smallest);
            pos = smallest;
        }
    }

    /// Verifies heap order and position bookkeeping.
    #[cfg(test)]
    pub(crate) fn is_well_formed(&self) -> bool {
        let positions_ok = self.heap.iter().enumerate().all(|(pos, node)| {
            self.slots[node.slot]
                .as_ref()
                .map_or(false, |slot| slot.pos == pos)
        });
        let order_ok =
            (1..self.heap.len()).all(|pos| self.stamp_at((pos - 1) / 2) <= self.stamp_at(pos));
        positions_ok && order_ok
    }
}
