//! CoalescedHashMap: fixed-capacity map with coalesced collision chains.

use crate::storage::{ConstructionError, Storage};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use std::collections::hash_map::RandomState;

/// Share of capacity hashed into directly; ~0.86 is the classic choice
/// for coalesced hashing, leaving the rest as cellar.
pub const DEFAULT_ADDRESS_FACTOR: f64 = 0.86;

/// Placement policy for colliding entries, fixed per table.
///
/// The standard-coalesced modes (`Lisch`, `Eisch`) place overflow only
/// in the cellar and require one; the remaining modes may take any free
/// slot in the table.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum InsertionMode {
    /// Late insert, standard coalesced: overflow taken from the cellar
    /// top downward.
    Lisch,
    /// Early insert, standard coalesced: bounded forward probe from the
    /// cellar base, then as `Lisch`.
    Eisch,
    /// Late insert, coalesced: overflow taken from the table top
    /// downward.
    #[default]
    Lich,
    /// Early insert, coalesced: bounded forward probe from the home
    /// slot, then as `Lich`.
    Eich,
    /// Varied insert: late while overflow still lands in the cellar,
    /// early once the cursor has entered the address region.
    Vich,
}

impl InsertionMode {
    fn requires_cellar(self) -> bool {
        matches!(self, InsertionMode::Lisch | InsertionMode::Eisch)
    }
}

/// Outcome of [`CoalescedHashMap::insert`].
#[derive(Debug)]
pub enum InsertResult<'a, K, V> {
    /// The key was new; the iterator is positioned at the new entry.
    Inserted(Iter<'a, K, V>),
    /// The key already existed. The stored value is untouched, the
    /// offered pair is dropped, and the iterator is positioned at the
    /// existing entry.
    AlreadyPresent(Iter<'a, K, V>),
    /// No free slot under the active mode; the rejected pair is handed
    /// back so the caller can retry against a larger table.
    Full { key: K, value: V },
}

/// A fixed-capacity hash map using coalesced chaining.
///
/// Colliding entries live in the same slot array as everything else,
/// linked into per-bucket chains that may coalesce: once an overflow
/// entry lands in an address slot, chains rooted elsewhere can grow
/// through it and share their suffix. Capacity is fixed at
/// construction. There is no growth, no rehash and no removal; when
/// `insert` reports [`InsertResult::Full`] the caller decides what to
/// do with the rejected pair.
///
/// Lookups never mutate, so `find`/`get` take `&self` and `insert`
/// takes `&mut self`; a torn chain is unobservable in safe code.
pub struct CoalescedHashMap<K, V, S = RandomState> {
    storage: Storage<K, V>,
    hasher: S,
    mode: InsertionMode,
    // Bounded probe window for the early-insert modes: 5% of
    // capacity, at least one probe.
    probe_depth: u32,
    len: u32,
    order_head: u32,
    order_tail: u32,
}

impl<K, V> CoalescedHashMap<K, V>
where
    K: Eq + Hash,
{
    /// Creates a table of `capacity` slots with the default mode
    /// ([`InsertionMode::Lich`]), the default address factor and a
    /// randomly seeded hasher.
    pub fn new(capacity: u32) -> Result<Self, ConstructionError> {
        Self::with_mode_and_hasher(capacity, InsertionMode::default(), RandomState::new())
    }

    pub fn with_mode(capacity: u32, mode: InsertionMode) -> Result<Self, ConstructionError> {
        Self::with_mode_and_hasher(capacity, mode, RandomState::new())
    }
}

impl<K, V, S> CoalescedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(capacity: u32, hasher: S) -> Result<Self, ConstructionError> {
        Self::with_mode_and_hasher(capacity, InsertionMode::default(), hasher)
    }

    pub fn with_mode_and_hasher(
        capacity: u32,
        mode: InsertionMode,
        hasher: S,
    ) -> Result<Self, ConstructionError> {
        Self::with_address_factor(capacity, mode, DEFAULT_ADDRESS_FACTOR, hasher)
    }

    /// Creates a table with full control over the address/cellar split.
    ///
    /// `address_factor` is the fraction of `capacity` that is hashed
    /// into directly; the remaining slots form the cellar. It must lie
    /// in `(0.0, 1.0]` and leave at least one address slot, and the
    /// standard-coalesced modes additionally need a non-empty cellar.
    pub fn with_address_factor(
        capacity: u32,
        mode: InsertionMode,
        address_factor: f64,
        hasher: S,
    ) -> Result<Self, ConstructionError> {
        let storage = Storage::new(capacity, address_factor)?;
        if mode.requires_cellar() && storage.cellar_slots() == 0 {
            return Err(ConstructionError::NoCellar);
        }
        Ok(Self {
            storage,
            hasher,
            mode,
            probe_depth: (capacity / 20).max(1),
            len: 0,
            order_head: 0,
            order_tail: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn capacity(&self) -> u32 {
        self.storage.capacity()
    }
    pub fn address_slots(&self) -> u32 {
        self.storage.address_slots()
    }
    pub fn cellar_slots(&self) -> u32 {
        self.storage.cellar_slots()
    }
    pub fn mode(&self) -> InsertionMode {
        self.mode
    }

    /// Replaces the insertion mode. Succeeds only while the table is
    /// empty and the new mode's cellar requirement is met; entries
    /// already placed under one mode would not be findable under
    /// another bookkeeping regime, so the mode is frozen by the first
    /// insert.
    pub fn set_mode(&mut self, mode: InsertionMode) -> bool {
        if self.len != 0 {
            return false;
        }
        if mode.requires_cellar() && self.storage.cellar_slots() == 0 {
            return false;
        }
        self.mode = mode;
        true
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Inserts `key -> value`. An existing entry for `key` is left
    /// untouched (first writer wins) and reported as
    /// [`InsertResult::AlreadyPresent`].
    pub fn insert(&mut self, key: K, value: V) -> InsertResult<'_, K, V> {
        let home = self.storage.home_slot(self.make_hash(&key));
        if !self.storage.header(home).is_allocated() {
            self.storage.construct(home, key, value);
            let header = self.storage.header_mut(home);
            header.set_head();
            header.set_tail();
            self.link_order(home);
            self.len += 1;
            return InsertResult::Inserted(self.iter_at(home));
        }

        // Walk the bucket chain; stop on a match or at the tail.
        let mut slot = home;
        loop {
            match self.storage.entry(slot) {
                Some((k, _)) if *k == key => {
                    return InsertResult::AlreadyPresent(self.iter_at(slot));
                }
                _ => {}
            }
            let header = *self.storage.header(slot);
            if header.is_tail() {
                break;
            }
            slot = header.chain_next();
        }

        let free = match self.acquire_free_slot(home) {
            Some(free) => free,
            None => return InsertResult::Full { key, value },
        };
        self.storage.construct(free, key, value);
        let old_tail = self.storage.header_mut(slot);
        old_tail.reset_tail();
        if !old_tail.is_head() {
            old_tail.set_intermediate();
        }
        old_tail.set_chain_next(free);
        self.storage.header_mut(free).set_tail();
        self.link_order(free);
        self.len += 1;
        InsertResult::Inserted(self.iter_at(free))
    }

    // Free-slot acquisition under the active mode. Backward scans
    // consume the free-tail cursor; forward probes do not.
    fn acquire_free_slot(&mut self, home: u32) -> Option<u32> {
        let region = self.storage.address_slots();
        match self.mode {
            InsertionMode::Lich => self.storage.find_free_backward(0),
            InsertionMode::Eich => self
                .storage
                .find_free_forward(home, self.probe_depth)
                .or_else(|| self.storage.find_free_backward(0)),
            InsertionMode::Vich => {
                if self.storage.free_tail() > region {
                    self.storage.find_free_backward(0)
                } else {
                    self.storage
                        .find_free_forward(home, self.probe_depth)
                        .or_else(|| self.storage.find_free_backward(0))
                }
            }
            InsertionMode::Lisch => self.storage.find_free_backward(region),
            InsertionMode::Eisch => self
                .storage
                .find_free_forward(region + 1, self.probe_depth)
                .or_else(|| self.storage.find_free_backward(region)),
        }
    }

    // Appends a freshly allocated slot to the insertion-order thread.
    fn link_order(&mut self, slot: u32) {
        if self.order_head == 0 {
            self.order_head = slot;
        } else {
            self.storage.header_mut(self.order_tail).set_order_next(slot);
        }
        self.order_tail = slot;
    }

    fn find_slot<Q>(&self, key: &Q) -> Option<u32>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let mut slot = self.storage.home_slot(self.make_hash(key));
        loop {
            let (k, _) = self.storage.entry(slot)?;
            if k.borrow() == key {
                return Some(slot);
            }
            let header = self.storage.header(slot);
            if header.is_tail() {
                return None;
            }
            slot = header.chain_next();
        }
    }

    /// Returns an iterator positioned at `key`'s entry: it yields that
    /// entry first, then every entry inserted after it.
    pub fn find<Q>(&self, key: &Q) -> Option<Iter<'_, K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_slot(key).map(|slot| self.iter_at(slot))
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.find_slot(key)?;
        self.storage.entry(slot)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_slot(key).is_some()
    }

    /// Iterates all entries in insertion order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.iter_at(self.order_head)
    }

    fn iter_at(&self, slot: u32) -> Iter<'_, K, V> {
        Iter {
            storage: &self.storage,
            slot,
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a CoalescedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V, S> fmt::Debug for CoalescedHashMap<K, V, S>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Insertion-order iterator over a map's entries.
///
/// Returned by [`CoalescedHashMap::iter`] positioned at the first
/// entry, and by `insert`/`find` positioned at the entry they refer
/// to.
pub struct Iter<'a, K, V> {
    storage: &'a Storage<K, V>,
    slot: u32,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.slot == 0 {
            return None;
        }
        match self.storage.entry(self.slot) {
            Some(entry) => {
                self.slot = self.storage.header(self.slot).order_next();
                Some(entry)
            }
            None => {
                self.slot = 0;
                None
            }
        }
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            storage: self.storage,
            slot: self.slot,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

#[cfg(test)]
impl<K, V, S> CoalescedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn free_tail(&self) -> u32 {
        self.storage.free_tail()
    }

    /// Checks every structural invariant the table maintains. Test-only.
    pub(crate) fn assert_invariants(&self) {
        let capacity = self.storage.capacity();
        let mut allocated = Vec::new();
        for slot in 1..=capacity {
            let header = *self.storage.header(slot);
            if !header.is_allocated() {
                assert!(
                    !header.is_head() && !header.is_tail() && !header.is_intermediate(),
                    "free slot {} carries chain flags",
                    slot
                );
                continue;
            }
            allocated.push(slot);
            assert_eq!(
                header.is_intermediate(),
                !header.is_head() && !header.is_tail(),
                "slot {}: intermediate means neither head nor tail",
                slot
            );
            let (key, _) = self.storage.entry(slot).unwrap();
            let home = self.storage.home_slot(self.make_hash(key));
            assert_eq!(
                header.is_head(),
                home == slot,
                "slot {}: head flag disagrees with home slot {}",
                slot,
                home
            );
        }
        assert_eq!(allocated.len(), self.len());

        // Every allocated node sits on exactly one head's chain.
        let mut seen = vec![false; capacity as usize + 1];
        for &slot in &allocated {
            if !self.storage.header(slot).is_head() {
                continue;
            }
            let mut cursor = slot;
            let mut steps = 0u32;
            loop {
                assert!(
                    !seen[cursor as usize],
                    "slot {} reached from two chains",
                    cursor
                );
                seen[cursor as usize] = true;
                assert!(self.storage.header(cursor).is_allocated());
                steps += 1;
                assert!(steps <= capacity, "chain from head {} does not end", slot);
                let header = self.storage.header(cursor);
                if header.is_tail() {
                    break;
                }
                cursor = header.chain_next();
                assert_ne!(cursor, 0, "non-tail slot links to the sentinel");
            }
        }
        for &slot in &allocated {
            assert!(seen[slot as usize], "slot {} on no chain", slot);
        }

        // The order thread covers each allocated entry exactly once.
        let mut count = 0usize;
        let mut cursor = self.order_head;
        let mut in_order = vec![false; capacity as usize + 1];
        while cursor != 0 {
            assert!(
                !in_order[cursor as usize],
                "order thread revisits slot {}",
                cursor
            );
            in_order[cursor as usize] = true;
            assert!(self.storage.header(cursor).is_allocated());
            count += 1;
            assert!(count <= capacity as usize, "order thread does not end");
            let next = self.storage.header(cursor).order_next();
            if next == 0 {
                assert_eq!(cursor, self.order_tail);
            }
            cursor = next;
        }
        assert_eq!(count, self.len());

        // Slots above the free-tail cursor are all allocated.
        for slot in self.storage.free_tail() + 1..=capacity {
            assert!(
                self.storage.header(slot).is_allocated(),
                "free slot {} above the free-tail cursor",
                slot
            );
        }
    }
}
