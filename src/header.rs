use std::{mem, ptr::NonNull};

use crate::rbtree::FreeNode;


/// Non-null pointer to `T`.
pub(crate) type Link<T> = Option<NonNull<T>>;

/// Header size of a block. Every block of the arena starts with one of
/// these, so this is the fixed overhead each allocation carries.
pub(crate) const HEADER_SIZE: usize = mem::size_of::<BlockHeader>();

/// Per-block metadata record. The payload is placed after this header.
///
/// Headers of neighboring blocks are threaded together in strictly
/// increasing address order, which gives O(1) neighbor lookup when a freed
/// block has to be merged:
///
/// ```text
/// +-----------+---------+    +-----------+----------------------+
/// | next|prev | payload | -> | next|prev | FreeNode + free mem  | -> ...
/// +-----------+---------+    +-----------+----------------------+
/// ```
///
/// `next` always points forward; the last block points at the end-of-arena
/// sentinel, a one-past-the-end address that is never dereferenced.
pub(crate) struct BlockHeader {
    /// Header of the next block in address order, or the end sentinel.
    pub next: NonNull<BlockHeader>,
    /// Header of the previous block, `None` for the first block.
    pub prev: Link<BlockHeader>,
    /// The block's tree node while it is free, `None` while allocated.
    pub node: Link<FreeNode>,
}

impl BlockHeader {
    pub fn new(next: NonNull<BlockHeader>, prev: Link<BlockHeader>) -> Self {
        Self { next, prev, node: None }
    }

    /// Usable bytes between the end of this header and the next header.
    pub fn payload_span(&self) -> usize {
        self.next.as_ptr() as usize - self as *const _ as usize - HEADER_SIZE
    }
}

/// Computes where the header of a block lives, given a pointer to the
/// payload (or free node) that follows it.
///
/// We get the earliest point where the header could be (right behind the
/// pointer), then move backwards to the first address that is a multiple of
/// the header size. Allocation and deallocation both derive header
/// positions through this one rule, so the two sides always agree on how
/// much padding a block carries.
pub(crate) fn header_placement(ptr: *mut u8) -> *mut BlockHeader {
    let earliest_unaligned = ptr.wrapping_sub(HEADER_SIZE);
    let align_offset = earliest_unaligned as usize % HEADER_SIZE;

    earliest_unaligned.wrapping_sub(align_offset) as *mut BlockHeader
}
