//! coalesced-hashmap: a fixed-capacity map that resolves collisions by
//! chaining colliding entries through spare slots of its own table.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: build CoalescedHashMap in small, verifiable layers so each
//!   piece can be reasoned about independently.
//! - Layers:
//!   - node::NodeHeader: packs a slot's chain flags, chain link and
//!     insertion-order link into two words.
//!   - storage::Storage<K, V>: owns the slot array, the address/cellar
//!     split and the free-slot scans; knows nothing about hashing
//!     policy.
//!   - CoalescedHashMap<K, V, S>: public API that drives the chain
//!     walk, duplicate detection and the per-mode placement of
//!     overflow entries.
//!
//! Constraints
//! - Capacity is fixed at construction: no growth, no rehashing and no
//!   removal. A full table rejects new keys and hands the offered pair
//!   back to the caller.
//! - Duplicate inserts never overwrite; the first writer wins.
//! - The whole map is one allocation. Chains thread through table
//!   slots, so collision handling never touches the heap.
//! - Slot indices are 28-bit, which bounds capacity; slot 0 is a
//!   sentinel meaning "no link".
//!
//! Why a cellar?
//! - The table splits into an address region (the hash codomain) and
//!   an optional cellar that the hash function never targets. Overflow
//!   placed in the cellar cannot collide with any future key's home
//!   slot, which is what keeps chains from coalescing early.
//!
//! Insertion modes
//! - Five placement policies (InsertionMode) trade lookup locality
//!   against how much of the table overflow may consume. The standard
//!   modes confine overflow to the cellar and require one; the others
//!   may claim any free slot. The mode is frozen by the first insert,
//!   since entries placed under one policy are not findable under
//!   another.
//!
//! Iteration
//! - A second per-slot link threads entries in insertion order,
//!   independent of the collision chains. `insert` and `find` return
//!   iterators positioned at the entry they refer to.
//!
//! Notes and non-goals
//! - Lookups never mutate: `find`/`get` take `&self`, `insert` takes
//!   `&mut self`.
//! - No removal (could be added later; it would need chain splicing
//!   and a free-list).
//! - No load-factor tracking and no automatic resize; capacity policy
//!   belongs to the caller.
//! - Public API surface is CoalescedHashMap and its result/iterator
//!   types; lower layers are implementation details.

mod coalesced_map;
mod coalesced_map_proptest;
mod node;
mod storage;

// Public surface
pub use coalesced_map::{
    CoalescedHashMap, InsertResult, InsertionMode, Iter, DEFAULT_ADDRESS_FACTOR,
};
pub use storage::ConstructionError;
