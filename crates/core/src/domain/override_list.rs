//! Priority-ordered override list with holes
//!
//! Each affected player owns one [`OverrideList`]. Entries are kept sorted by
//! priority (descending); among equal priorities the most recently inserted
//! entry comes first. Removal nulls the slot in place instead of shifting, so
//! the backing sequence may contain holes. Lookups walk past holes and a
//! compaction pass reclaims them once the list reaches its capacity.
//!
//! The slice-level functions ([`get_insert_index`], [`consolidate`],
//! [`copy_high_priority_overrides`], [`remove_from_slots`]) are the building
//! blocks of the list and can be used on any slot sequence.

use crate::domain::voice_override::{OverrideEntry, OverrideId};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors raised by override list and resolver operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverrideError {
    /// A player or override reference that cannot be used
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Removal or lookup of something that is not there
    #[error("Not present: {0}")]
    NotPresent(String),

    /// Insertion of something that is already there
    #[error("Already present: {0}")]
    AlreadyPresent(String),

    /// No slot could be found or created, even after compaction
    #[error("Capacity exceeded: all {capacity} slots in use")]
    CapacityExceeded { capacity: usize },
}

pub type Result<T> = std::result::Result<T, OverrideError>;

/// One position of the backing sequence, `None` is a hole
pub type Slot = Option<OverrideEntry>;

/// Logical position at which `record` would be inserted.
///
/// Counts the present entries at the front of `candidates` that strictly
/// outrank `record`; holes are skipped. An entry of equal priority does not
/// outrank, so the newcomer lands before every existing equal-priority entry.
/// Returns `None` when either argument is missing.
pub fn get_insert_index(
    candidates: Option<&[Slot]>,
    record: Option<&OverrideEntry>,
) -> Option<usize> {
    let (candidates, record) = candidates.zip(record)?;
    Some(
        candidates
            .iter()
            .flatten()
            .take_while(|entry| entry.priority > record.priority)
            .count(),
    )
}

/// Move every present entry to the front, preserving their order.
///
/// Holes end up at the back; the slice length is unchanged. Returns the
/// number of present entries.
pub fn consolidate(slots: &mut [Slot]) -> usize {
    let mut write = 0;
    for read in 0..slots.len() {
        if slots[read].is_some() {
            if read != write {
                slots[write] = slots[read].take();
            }
            write += 1;
        }
    }
    write
}

/// Copy the first `count` present entries of `source` to the front of `dest`.
///
/// Returns the span of `source` that was walked to find them, which exceeds
/// `count` by the number of holes inside that window. The corresponding
/// trailing positions of `dest` (between the copied entries and the span)
/// are written as holes.
pub fn copy_high_priority_overrides(source: &[Slot], dest: &mut [Slot], count: usize) -> usize {
    let mut copied = 0;
    let mut span = 0;

    while copied < count && span < source.len() && copied < dest.len() {
        if let Some(entry) = source[span] {
            dest[copied] = Some(entry);
            copied += 1;
        }
        span += 1;
    }

    let hole_end = span.min(dest.len());
    for slot in &mut dest[copied..hole_end] {
        *slot = None;
    }

    span
}

/// Null every slot holding `id`, returning whether anything was removed
pub fn remove_from_slots(slots: &mut [Slot], id: OverrideId) -> bool {
    let mut removed = false;
    for slot in slots.iter_mut() {
        if matches!(slot, Some(entry) if entry.id == id) {
            *slot = None;
            removed = true;
        }
    }
    removed
}

/// Fixed-capacity, priority-sorted list of override references
#[derive(Debug, Clone)]
pub struct OverrideList {
    slots: Vec<Slot>,
    /// Second buffer used when the list grows, swapped with `slots`
    scratch: Vec<Slot>,
    capacity: usize,
}

impl OverrideList {
    pub const DEFAULT_CAPACITY: usize = 16;

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            scratch: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of present entries
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Backing sequence, holes included
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn contains(&self, id: OverrideId) -> bool {
        self.slots.iter().flatten().any(|entry| entry.id == id)
    }

    /// The `index`-th present entry in priority order
    pub fn get(&self, index: usize) -> Option<OverrideEntry> {
        self.slots.iter().flatten().nth(index).copied()
    }

    /// The winning entry, if any
    pub fn first(&self) -> Option<OverrideEntry> {
        self.get(0)
    }

    /// Present entries in priority order
    pub fn iter(&self) -> impl Iterator<Item = OverrideEntry> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// Insert an entry at its priority position.
    ///
    /// Reuses a hole sitting exactly at the target position, otherwise grows
    /// the backing sequence by one slot. A full list is compacted first.
    pub fn insert(&mut self, entry: OverrideEntry) -> Result<()> {
        if self.contains(entry.id) {
            return Err(OverrideError::AlreadyPresent(format!(
                "{} is already in the list",
                entry.id
            )));
        }

        let rank = get_insert_index(Some(self.slots.as_slice()), Some(&entry)).unwrap_or(0);
        let target = self.position_after(rank);
        if matches!(self.slots.get(target), Some(None)) {
            self.slots[target] = Some(entry);
            trace!(override_id = %entry.id, slot = target, "Override placed into hole");
            return Ok(());
        }

        if self.slots.len() >= self.capacity {
            let survivors = self.compact();
            if survivors >= self.capacity {
                return Err(OverrideError::CapacityExceeded {
                    capacity: self.capacity,
                });
            }
        }

        self.grow(rank, entry);
        trace!(override_id = %entry.id, rank, "Override inserted");
        Ok(())
    }

    /// Vacate the slot holding `id` without shifting the other entries
    pub fn remove(&mut self, id: OverrideId) -> Result<()> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| matches!(slot, Some(entry) if entry.id == id))
            .ok_or_else(|| OverrideError::NotPresent(format!("{} is not in the list", id)))?;
        *slot = None;
        trace!(override_id = %id, "Override slot vacated");
        Ok(())
    }

    /// Remove `id` if present and return the number of remaining entries
    pub fn remove_override(&mut self, id: OverrideId) -> usize {
        if let Err(e) = self.remove(id) {
            debug!(error = %e, "Override not removed");
        }
        self.len()
    }

    /// Squeeze out all holes, keeping survivor order. Returns the survivors.
    pub fn compact(&mut self) -> usize {
        let survivors = consolidate(&mut self.slots);
        self.slots.truncate(survivors);
        trace!(survivors, "Override list compacted");
        survivors
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Physical index just after the `rank`-th present entry
    fn position_after(&self, rank: usize) -> usize {
        if rank == 0 {
            return 0;
        }
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .nth(rank - 1)
            .map(|(index, _)| index + 1)
            .unwrap_or(self.slots.len())
    }

    /// Rebuild into the scratch buffer with one extra slot for `entry`.
    ///
    /// Holes between the outranking entries are carried over behind them,
    /// right before the new entry.
    fn grow(&mut self, rank: usize, entry: OverrideEntry) {
        let len = self.slots.len();
        self.scratch.clear();
        self.scratch.resize(len + 1, None);

        let span = copy_high_priority_overrides(&self.slots, &mut self.scratch, rank);
        self.scratch[span] = Some(entry);
        self.scratch[span + 1..].copy_from_slice(&self.slots[span..]);

        std::mem::swap(&mut self.slots, &mut self.scratch);
    }
}

impl Default for OverrideList {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}
