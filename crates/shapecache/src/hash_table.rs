//! Fixed-capacity open-addressed hash table with built-in LRU eviction
//!
//! Slots are probed with double hashing: `h` picks the first slot, `h1` the
//! step. A walk that comes back to `h` is nudged one slot forward and the
//! step shrinks, so the double-hash walk never cycles and is capped at
//! `size` slots. A walk that exhausts that sequence without meeting an empty
//! slot carries on linearly from `h`, so it still reaches every slot; a
//! single lookup therefore visits at most `2 * size` slots.
//!
//! Live slots are threaded into a doubly linked recency list by index
//! (`older`/`newer`), with the table holding the `newest` and `oldest` ends.
//! Once the live count passes 80% of the table size, each insertion evicts
//! exactly one entry: the oldest.
//!
//! Evicted slots become tombstones. A tombstone ends nothing: probes walk
//! over it, and it is reused by the next insertion that passes it. When an
//! eviction leaves tombstones crowding out the never-used slots, the table
//! compacts itself before the insertion returns, reinserting live entries
//! from oldest to newest. Between insertions at least one slot is therefore
//! never-used, and a walk for a missing key stops there.

use serde::Serialize;
use shapecache_core::Result;

/// Largest table size; odd so a step always has a chance to be co-prime
pub const MAX_TABLE_SIZE: u16 = 0xFFFD;

/// Smallest table size; keeps the full threshold at 2 or more
pub const MIN_TABLE_SIZE: u16 = 3;

const MAX_PERCENT: u32 = 80;

/// What the table needs from its entries
pub trait HashElement {
    /// Exact key equality, used to resolve hash collisions
    fn key_eq(&self, other: &Self) -> bool;

    /// Two independent hashes reduced modulo `size`: slot and step
    fn hash_pair(&self, size: u16) -> (u16, u16);
}

/// Table size actually used for a requested capacity: odd, within bounds
pub fn table_size(requested: usize) -> u16 {
    let size = if requested >= MAX_TABLE_SIZE as usize {
        MAX_TABLE_SIZE
    } else if requested % 2 == 0 {
        requested as u16 + 1
    } else {
        requested as u16
    };
    size.max(MIN_TABLE_SIZE)
}

/// Live entry count above which an insertion evicts
pub fn full_threshold(size: u16) -> u16 {
    (size as u32 * MAX_PERCENT / 100) as u16
}

/// The probe walk for a key hashing to `(h, h1)` in a table of `size` slots
pub fn probe_sequence(h: u16, h1: u16, size: u16) -> ProbeSequence {
    let size = size.max(1) as u32;
    let step = match h1 as u32 % size {
        0 => 1,
        s => s,
    };
    ProbeSequence {
        home: h as u32 % size,
        current: h as u32 % size,
        step,
        size,
        remaining: size,
    }
}

/// Iterator over the slots a probe visits, at most `size` of them
#[derive(Debug, Clone)]
pub struct ProbeSequence {
    home: u32,
    current: u32,
    step: u32,
    size: u32,
    remaining: u32,
}

impl Iterator for ProbeSequence {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let slot = self.current;

        let mut next = (self.current + self.step) % self.size;
        if next == self.home {
            next = (next + 1) % self.size;
            self.step -= 1;
            if self.step == 0 {
                self.step = self.size - 1;
            }
        }
        self.current = next;
        Some(slot as u16)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

struct LiveSlot<T> {
    hash: u16,
    entry: T,
    older: Option<u16>,
    newer: Option<u16>,
}

enum Slot<T> {
    /// Never occupied: ends a probe walk
    Empty,
    /// Evicted: keeps probe walks going, free for reuse
    Tombstone,
    Live(LiveSlot<T>),
}

enum Probe {
    Found(u16),
    Vacant(u16),
    Exhausted,
}

/// Result of [`LruHashTable::insert`]
#[derive(Debug)]
pub enum Insertion<'a, T> {
    /// An equal entry was already stored; the candidate was dropped
    Existing(&'a T),
    /// The candidate is now stored as the newest entry
    Inserted(&'a T),
}

impl<'a, T> Insertion<'a, T> {
    pub fn entry(&self) -> &'a T {
        match self {
            Self::Existing(e) | Self::Inserted(e) => e,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, Self::Existing(_))
    }
}

/// Counters and occupancy of one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub live: usize,
    pub capacity: usize,
    pub full_threshold: usize,
    pub tombstones: usize,
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

impl TableStats {
    /// Fraction of lookups that found an entry (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Fold another table's numbers into this one
    pub fn merge(&mut self, other: &TableStats) {
        self.live += other.live;
        self.capacity += other.capacity;
        self.full_threshold += other.full_threshold;
        self.tombstones += other.tombstones;
        self.hits += other.hits;
        self.misses += other.misses;
        self.inserts += other.inserts;
        self.evictions += other.evictions;
    }
}

/// Bounded hash table whose entries age out least-recently-used first
pub struct LruHashTable<T> {
    slots: Vec<Slot<T>>,
    size: u16,
    full: u16,
    live: u16,
    tombstones: u16,
    newest: Option<u16>,
    oldest: Option<u16>,
    hits: u64,
    misses: u64,
    inserts: u64,
    evictions: u64,
}

impl<T: HashElement> LruHashTable<T> {
    /// Allocate a table for roughly `requested` slots
    ///
    /// The size is forced odd and clamped to `3..=0xFFFD`.
    pub fn try_new(requested: usize) -> Result<Self> {
        let size = table_size(requested);
        let mut slots = Vec::new();
        slots.try_reserve_exact(size as usize)?;
        slots.resize_with(size as usize, || Slot::Empty);

        Ok(Self {
            slots,
            size,
            full: full_threshold(size),
            live: 0,
            tombstones: 0,
            newest: None,
            oldest: None,
            hits: 0,
            misses: 0,
            inserts: 0,
            evictions: 0,
        })
    }

    /// Store `candidate` unless an equal entry exists; either way the stored
    /// entry becomes the newest
    ///
    /// A new entry that pushes the table past its full threshold evicts the
    /// single oldest entry.
    pub fn insert(&mut self, candidate: T) -> Insertion<'_, T> {
        if self.needs_compaction() {
            self.compact();
        }

        let (h, h1) = candidate.hash_pair(self.size);
        let slot = match self.probe(h, h1, &candidate) {
            Probe::Found(o) => {
                self.hits += 1;
                self.promote(o);
                return match self.live_slot(o) {
                    Some(s) => Insertion::Existing(&s.entry),
                    None => unreachable!("promoted slot is live"),
                };
            },
            Probe::Vacant(o) => o,
            Probe::Exhausted => {
                self.compact();
                match self.probe(h, h1, &candidate) {
                    Probe::Vacant(o) => o,
                    _ => self.first_free_slot(),
                }
            },
        };

        self.place(slot, h, candidate);
        self.inserts += 1;
        if self.live > self.full {
            self.evict_oldest();
            if self.needs_compaction() {
                self.compact();
            }
        }

        // compaction may have moved the new entry; it is still the newest
        match self.newest.and_then(|o| self.live_slot(o)) {
            Some(s) => Insertion::Inserted(&s.entry),
            None => unreachable!("newest entry is never the eviction victim"),
        }
    }

    /// Find an entry equal to `probe` and make it the newest
    pub fn find(&mut self, probe: &T) -> Option<&T> {
        let (h, h1) = probe.hash_pair(self.size);
        match self.probe(h, h1, probe) {
            Probe::Found(o) => {
                self.hits += 1;
                self.promote(o);
                self.live_slot(o).map(|s| &s.entry)
            },
            _ => {
                self.misses += 1;
                None
            },
        }
    }

    /// Whether an equal entry is stored, without touching recency
    pub fn contains(&self, probe: &T) -> bool {
        let (h, h1) = probe.hash_pair(self.size);
        matches!(self.probe(h, h1, probe), Probe::Found(_))
    }

    /// Entries from newest to oldest
    pub fn iter_recent(&self) -> RecentIter<'_, T> {
        RecentIter {
            table: self,
            cursor: self.newest,
        }
    }

    /// Drop every entry; counters are kept
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::Empty;
        }
        self.live = 0;
        self.tombstones = 0;
        self.newest = None;
        self.oldest = None;
    }

    pub fn len(&self) -> usize {
        self.live as usize
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots
    pub fn size(&self) -> usize {
        self.size as usize
    }

    pub fn full_threshold(&self) -> usize {
        self.full as usize
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            live: self.live as usize,
            capacity: self.size as usize,
            full_threshold: self.full as usize,
            tombstones: self.tombstones as usize,
            hits: self.hits,
            misses: self.misses,
            inserts: self.inserts,
            evictions: self.evictions,
        }
    }

    fn probe(&self, h: u16, h1: u16, candidate: &T) -> Probe {
        let mut reuse = None;
        let size = self.size as u32;
        let linear = (0..size).map(|i| ((h as u32 + i) % size) as u16);
        for o in probe_sequence(h, h1, self.size).chain(linear) {
            match &self.slots[o as usize] {
                Slot::Empty => return Probe::Vacant(reuse.unwrap_or(o)),
                Slot::Tombstone => {
                    if reuse.is_none() {
                        reuse = Some(o);
                    }
                },
                Slot::Live(s) => {
                    if s.hash == h && s.entry.key_eq(candidate) {
                        return Probe::Found(o);
                    }
                },
            }
        }
        reuse.map_or(Probe::Exhausted, Probe::Vacant)
    }

    fn first_free_slot(&self) -> u16 {
        // live <= full < size, so a non-live slot always exists
        self.slots
            .iter()
            .position(|s| !matches!(s, Slot::Live(_)))
            .unwrap_or(0) as u16
    }

    fn live_slot(&self, o: u16) -> Option<&LiveSlot<T>> {
        match self.slots.get(o as usize) {
            Some(Slot::Live(s)) => Some(s),
            _ => None,
        }
    }

    fn live_slot_mut(&mut self, o: u16) -> Option<&mut LiveSlot<T>> {
        match self.slots.get_mut(o as usize) {
            Some(Slot::Live(s)) => Some(s),
            _ => None,
        }
    }

    /// Put a new entry in slot `o` and make it the newest
    fn place(&mut self, o: u16, hash: u16, entry: T) {
        if matches!(self.slots[o as usize], Slot::Tombstone) {
            self.tombstones -= 1;
        }
        self.slots[o as usize] = Slot::Live(LiveSlot {
            hash,
            entry,
            older: None,
            newer: None,
        });
        self.link_newest(o);
        self.live += 1;
    }

    fn promote(&mut self, o: u16) {
        if self.newest == Some(o) {
            return;
        }
        self.unlink(o);
        self.link_newest(o);
    }

    fn unlink(&mut self, o: u16) {
        let Some((older, newer)) = self.live_slot(o).map(|s| (s.older, s.newer)) else {
            return;
        };
        match older.and_then(|a| self.live_slot_mut(a)) {
            Some(s) => s.newer = newer,
            None => self.oldest = newer,
        }
        match newer.and_then(|b| self.live_slot_mut(b)) {
            Some(s) => s.older = older,
            None => self.newest = older,
        }
        if let Some(s) = self.live_slot_mut(o) {
            s.older = None;
            s.newer = None;
        }
    }

    fn link_newest(&mut self, o: u16) {
        let previous = self.newest;
        if let Some(s) = self.live_slot_mut(o) {
            s.older = previous;
            s.newer = None;
        }
        if let Some(s) = previous.and_then(|n| self.live_slot_mut(n)) {
            s.newer = Some(o);
        }
        self.newest = Some(o);
        if self.oldest.is_none() {
            self.oldest = Some(o);
        }
    }

    fn evict_oldest(&mut self) {
        let Some(o) = self.oldest else {
            return;
        };
        self.unlink(o);
        self.slots[o as usize] = Slot::Tombstone;
        self.live -= 1;
        self.tombstones += 1;
        self.evictions += 1;
        log::trace!("Evicted slot {o}, {} entries remain", self.live);
    }

    /// True once never-used slots fall below half the headroom over `full`
    fn needs_compaction(&self) -> bool {
        let used = self.live as u32 + self.tombstones as u32;
        let headroom = (self.size - self.full) as u32;
        self.tombstones > 0 && (self.size as u32 - used) < headroom / 2 + 1
    }

    /// Rebuild the table without tombstones, keeping recency order
    fn compact(&mut self) {
        let mut order = Vec::new();
        let mut fresh = Vec::new();
        if order.try_reserve_exact(self.live as usize).is_err()
            || fresh.try_reserve_exact(self.size as usize).is_err()
        {
            log::warn!("Skipping hash table compaction: allocation failed");
            return;
        }
        fresh.resize_with(self.size as usize, || Slot::Empty);

        let mut old = std::mem::replace(&mut self.slots, fresh);
        let mut cursor = self.oldest;
        while let Some(o) = cursor {
            match std::mem::replace(&mut old[o as usize], Slot::Empty) {
                Slot::Live(s) => {
                    cursor = s.newer;
                    order.push(s.entry);
                },
                _ => break,
            }
        }

        log::trace!(
            "Compacting table of {} slots: {} live, {} tombstones",
            self.size,
            order.len(),
            self.tombstones
        );
        self.live = 0;
        self.tombstones = 0;
        self.newest = None;
        self.oldest = None;
        for entry in order {
            let (h, h1) = entry.hash_pair(self.size);
            let o = match self.probe(h, h1, &entry) {
                Probe::Vacant(o) => o,
                _ => self.first_free_slot(),
            };
            self.place(o, h, entry);
        }
    }
}

/// Newest-to-oldest walk over a table's entries
pub struct RecentIter<'a, T> {
    table: &'a LruHashTable<T>,
    cursor: Option<u16>,
}

impl<'a, T> Iterator for RecentIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let o = self.cursor?;
        match self.table.slots.get(o as usize) {
            Some(Slot::Live(s)) => {
                self.cursor = s.older;
                Some(&s.entry)
            },
            _ => {
                self.cursor = None;
                None
            },
        }
    }
}
