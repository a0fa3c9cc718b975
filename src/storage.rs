//! Slot arena: owns the table's memory, the address/cellar split and
//! the free-tail cursor used to place overflow entries.

use crate::node::{NodeHeader, MAX_SLOT};

/// Construction parameter errors. The table never grows, so every
/// capacity problem is caught here rather than at insertion time.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum ConstructionError {
    #[error("capacity must be at least 1")]
    ZeroCapacity,
    #[error("capacity exceeds the 28-bit slot index limit")]
    CapacityOverflow,
    #[error("address factor {0} is outside (0.0, 1.0]")]
    InvalidAddressFactor(f64),
    #[error("address factor {0} yields an empty address region")]
    EmptyAddressRegion(f64),
    #[error("insertion mode requires a cellar, but the address region spans the whole table")]
    NoCellar,
}

struct Slot<K, V> {
    header: NodeHeader,
    // The allocated flag mirrors `pair.is_some()`: the flag is what the
    // scans read, the Option owns the data.
    pair: Option<(K, V)>,
}

impl<K, V> Slot<K, V> {
    fn free() -> Self {
        Slot {
            header: NodeHeader::default(),
            pair: None,
        }
    }
}

/// Fixed array of `capacity + 1` slots; slot 0 is the sentinel. Slots
/// `1..=address_slots` form the address region (the hash codomain), the
/// rest form the cellar, reachable only through chain links.
pub struct Storage<K, V> {
    slots: Vec<Slot<K, V>>,
    address_slots: u32,
    // Scan position for backward free-slot searches. Never increases:
    // without removal a consumed slot stays allocated forever.
    free_tail: u32,
}

impl<K, V> Storage<K, V> {
    pub fn new(capacity: u32, address_factor: f64) -> Result<Self, ConstructionError> {
        if capacity == 0 {
            return Err(ConstructionError::ZeroCapacity);
        }
        if capacity > MAX_SLOT {
            return Err(ConstructionError::CapacityOverflow);
        }
        if !(address_factor > 0.0 && address_factor <= 1.0) {
            return Err(ConstructionError::InvalidAddressFactor(address_factor));
        }
        let address_slots = (f64::from(capacity) * address_factor) as u32;
        if address_slots == 0 {
            return Err(ConstructionError::EmptyAddressRegion(address_factor));
        }
        let mut slots = Vec::new();
        slots.resize_with(capacity as usize + 1, Slot::free);
        Ok(Storage {
            slots,
            address_slots,
            free_tail: capacity,
        })
    }

    pub fn capacity(&self) -> u32 {
        (self.slots.len() - 1) as u32
    }
    pub fn address_slots(&self) -> u32 {
        self.address_slots
    }
    pub fn cellar_slots(&self) -> u32 {
        self.capacity() - self.address_slots
    }
    pub fn free_tail(&self) -> u32 {
        self.free_tail
    }

    /// Maps a hash onto the address region; the cellar is never a hash
    /// target.
    pub fn home_slot(&self, hash: u64) -> u32 {
        1 + (hash % u64::from(self.address_slots)) as u32
    }

    pub fn header(&self, slot: u32) -> &NodeHeader {
        &self.slots[slot as usize].header
    }
    pub fn header_mut(&mut self, slot: u32) -> &mut NodeHeader {
        &mut self.slots[slot as usize].header
    }

    /// The pair stored at `slot`, or `None` while the slot is free.
    pub fn entry(&self, slot: u32) -> Option<(&K, &V)> {
        let s = &self.slots[slot as usize];
        match &s.pair {
            Some((k, v)) if s.header.is_allocated() => Some((k, v)),
            _ => None,
        }
    }

    /// Stores a pair in a free slot and marks it allocated. Chain and
    /// order flags are the caller's to set.
    pub fn construct(&mut self, slot: u32, key: K, value: V) {
        let s = &mut self.slots[slot as usize];
        debug_assert!(!s.header.is_allocated());
        s.pair = Some((key, value));
        s.header.set_allocated();
    }

    /// First free slot at or below the cursor, stopping above `floor`.
    /// Consumes the cursor: slots it walks past are allocated and stay
    /// that way.
    pub fn find_free_backward(&mut self, floor: u32) -> Option<u32> {
        while self.free_tail > floor {
            if !self.slots[self.free_tail as usize].header.is_allocated() {
                return Some(self.free_tail);
            }
            self.free_tail -= 1;
        }
        None
    }

    /// First free slot within `depth` probes of `from`, clamped to the
    /// table end. Does not touch the cursor.
    pub fn find_free_forward(&self, from: u32, depth: u32) -> Option<u32> {
        debug_assert!(depth > 0);
        let last = self.capacity().min(from.saturating_add(depth) - 1);
        (from..=last).find(|&slot| !self.slots[slot as usize].header.is_allocated())
    }
}
