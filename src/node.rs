//! Packed per-slot node metadata.
//!
//! One word carries the four state flags in its top nibble plus the
//! 28-bit bucket-chain link; a second word carries the insertion-order
//! link. Slot 0 is reserved as the sentinel everywhere in the crate, so
//! a zero link reads as "none" and a zeroed header is a free slot.

const TAIL_FLAG: u32 = 0x8000_0000;
const HEAD_FLAG: u32 = 0x4000_0000;
const INTERMEDIATE_FLAG: u32 = 0x2000_0000;
const ALLOCATED_FLAG: u32 = 0x1000_0000;
const FLAG_MASK: u32 = 0xF000_0000;
const LINK_MASK: u32 = !FLAG_MASK;

/// Highest slot index a packed chain link can address.
pub const MAX_SLOT: u32 = LINK_MASK;

/// Per-slot flag and link state, two words wide.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeHeader {
    /// Flag nibble plus the bucket-chain link.
    bits: u32,
    /// Insertion-order link, full width.
    order: u32,
}

impl NodeHeader {
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.bits & ALLOCATED_FLAG != 0
    }
    #[inline]
    pub fn is_head(&self) -> bool {
        self.bits & HEAD_FLAG != 0
    }
    #[inline]
    pub fn is_tail(&self) -> bool {
        self.bits & TAIL_FLAG != 0
    }
    #[inline]
    pub fn is_intermediate(&self) -> bool {
        self.bits & INTERMEDIATE_FLAG != 0
    }

    #[inline]
    pub fn set_allocated(&mut self) {
        self.bits |= ALLOCATED_FLAG;
    }
    #[inline]
    pub fn set_head(&mut self) {
        self.bits |= HEAD_FLAG;
    }
    #[inline]
    pub fn set_tail(&mut self) {
        self.bits |= TAIL_FLAG;
    }
    #[inline]
    pub fn set_intermediate(&mut self) {
        self.bits |= INTERMEDIATE_FLAG;
    }

    #[inline]
    pub fn reset_tail(&mut self) {
        self.bits &= !TAIL_FLAG;
    }
    /// Clears all four flags, keeping both links intact. Free slots
    /// already read as unallocated, so nothing on the insert path needs
    /// this; it is the reset an eventual erase would use.
    #[allow(dead_code)]
    #[inline]
    pub fn reset_flags(&mut self) {
        self.bits &= !FLAG_MASK;
    }

    /// Next slot in this bucket's collision chain. Meaningful only while
    /// the tail flag is clear.
    #[inline]
    pub fn chain_next(&self) -> u32 {
        self.bits & LINK_MASK
    }
    #[inline]
    pub fn set_chain_next(&mut self, slot: u32) {
        debug_assert!(slot <= MAX_SLOT);
        self.bits = (self.bits & FLAG_MASK) | slot;
    }

    /// Next slot in global insertion order; 0 marks the end.
    #[inline]
    pub fn order_next(&self) -> u32 {
        self.order
    }
    #[inline]
    pub fn set_order_next(&mut self, slot: u32) {
        self.order = slot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: a zeroed header is a free slot with null links.
    #[test]
    fn zeroed_header_reads_free() {
        let h = NodeHeader::default();
        assert!(!h.is_allocated());
        assert!(!h.is_head());
        assert!(!h.is_tail());
        assert!(!h.is_intermediate());
        assert_eq!(h.chain_next(), 0);
        assert_eq!(h.order_next(), 0);
    }

    /// Invariant: each flag sets and reads independently of the others.
    #[test]
    fn flags_are_independent() {
        let mut h = NodeHeader::default();
        h.set_allocated();
        assert!(h.is_allocated() && !h.is_head() && !h.is_tail() && !h.is_intermediate());
        h.set_head();
        assert!(h.is_allocated() && h.is_head() && !h.is_tail());
        h.set_tail();
        assert!(h.is_head() && h.is_tail());
        h.set_intermediate();
        assert!(h.is_intermediate());
    }

    /// Invariant: the chain link and the flag nibble never clobber each
    /// other, up to the maximum representable slot.
    #[test]
    fn chain_link_and_flags_coexist() {
        let mut h = NodeHeader::default();
        h.set_chain_next(0x0ABC_DEF5);
        h.set_allocated();
        h.set_tail();
        assert_eq!(h.chain_next(), 0x0ABC_DEF5);
        assert!(h.is_allocated() && h.is_tail());

        h.set_chain_next(MAX_SLOT);
        assert_eq!(h.chain_next(), MAX_SLOT);
        assert!(h.is_allocated() && h.is_tail(), "link write must keep flags");

        h.set_chain_next(0);
        assert_eq!(h.chain_next(), 0);
        assert!(h.is_allocated() && h.is_tail());
    }

    /// Invariant: `reset_tail` clears only the tail flag; `reset_flags`
    /// clears all four and keeps both links.
    #[test]
    fn resets_are_scoped() {
        let mut h = NodeHeader::default();
        h.set_allocated();
        h.set_head();
        h.set_tail();
        h.set_chain_next(17);
        h.set_order_next(42);

        h.reset_tail();
        assert!(!h.is_tail());
        assert!(h.is_allocated() && h.is_head());
        assert_eq!(h.chain_next(), 17);

        h.reset_flags();
        assert!(!h.is_allocated() && !h.is_head() && !h.is_tail() && !h.is_intermediate());
        assert_eq!(h.chain_next(), 17);
        assert_eq!(h.order_next(), 42);
    }

    /// Invariant: the order link lives in its own word and is untouched
    /// by flag and chain-link writes.
    #[test]
    fn order_link_is_isolated() {
        let mut h = NodeHeader::default();
        h.set_order_next(u32::MAX);
        h.set_allocated();
        h.set_intermediate();
        h.set_chain_next(MAX_SLOT);
        assert_eq!(h.order_next(), u32::MAX);
        h.set_order_next(7);
        assert_eq!(h.chain_next(), MAX_SLOT);
        assert!(h.is_allocated() && h.is_intermediate());
        assert_eq!(h.order_next(), 7);
    }
}
