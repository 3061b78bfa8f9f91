use std::ptr::NonNull;

use log::{debug, trace};

use crate::base::RawAllocator;
use crate::error::AllocError;
use crate::header::{header_placement, BlockHeader, Link, HEADER_SIZE};
use crate::rbtree::{FreeNode, RbTree, NODE_SIZE};
use crate::utils::align_to_natural;


/// Worst-case bytes needed to place one aligned header.
pub(crate) const HEADER_MAX_PADDING: usize = 2 * HEADER_SIZE;

/// Worst-case bytes needed to place one aligned free node.
pub(crate) const NODE_MAX_PADDING: usize = 2 * NODE_SIZE;

/// Smallest arena that can host a single block's metadata with worst-case
/// alignment padding. Construction rejects anything below this, and carved
/// payloads are inflated up to it so freed blocks can always re-host a
/// header and node.
pub const MIN_INIT_SIZE: usize = HEADER_MAX_PADDING + NODE_MAX_PADDING;


/// Best-fit allocator over a single caller-provided memory region.
///
/// ```text
/// +-----------+-----------+-----------+----------------------+-----------+-----------+
/// | next|prev | allocated | next|prev | FreeNode + free mem  | next|prev | allocated |
/// +-----------+-----------+-----------+----------------------+-----------+-----------+
/// ```
///
/// Every block of memory starts with a header carrying a doubly-linked
/// list. The list connects neighboring blocks in address order, which is
/// what makes merging a freed block with its neighbors O(1).
///
/// For each free block there is additionally a red-black tree node
/// following the header. The nodes index the free blocks by size, so the
/// best-fitting block for a request is found in O(log n). They take up no
/// allocatable space because they are stored inside the free memory they
/// represent and are destroyed on allocation.
///
/// Not shown in the illustration is the padding needed for alignment: the
/// headers, the nodes and the returned payloads are all naturally aligned.
///
/// The allocator owns no memory of its own and never calls into the
/// operating system. The caller keeps the region alive for the allocator's
/// whole lifetime; [`crate::MappedArena`] is one way to produce such a
/// region.
pub struct FreeListAllocator {
    /// Start of the memory available to the allocator.
    pub(crate) base: NonNull<u8>,
    /// Total bytes available.
    pub(crate) size: usize,
    /// One-past-the-end sentinel. The last block's `next` points here; the
    /// address is never dereferenced.
    pub(crate) end_of_memory: NonNull<BlockHeader>,
    /// Free blocks indexed by size.
    pub(crate) tree: RbTree,
}

impl FreeListAllocator {
    /// Creates an allocator managing the `size` bytes starting at `base`.
    ///
    /// On success the whole region becomes one free block, ready for
    /// immediate use.
    ///
    /// # Safety
    ///
    /// `base..base + size` must be a readable and writable region that
    /// nothing else touches for the allocator's whole lifetime.
    pub unsafe fn new(base: *mut u8, size: usize) -> Result<Self, AllocError> {
        if size < MIN_INIT_SIZE {
            return Err(AllocError::ArenaTooSmall { size, min: MIN_INIT_SIZE });
        }
        let base = NonNull::new(base).ok_or(AllocError::NullArenaBase)?;

        let end_of_memory =
            unsafe { NonNull::new_unchecked(base.as_ptr().wrapping_add(size) as *mut BlockHeader) };

        let mut allocator = Self {
            base,
            size,
            end_of_memory,
            tree: RbTree::new(),
        };

        // Our first free block of memory uses the entire region
        unsafe { allocator.create_block(None, end_of_memory, base.as_ptr()) };

        debug!("new allocator over {} bytes at {:p}", size, base);

        Ok(allocator)
    }

    /// Total bytes of the region this allocator manages.
    pub fn capacity(&self) -> usize {
        self.size
    }

    /// Allocates `data_size` bytes, returning a pointer aligned to a
    /// multiple of `data_size`.
    ///
    /// Fails with [`AllocError::OutOfMemory`] when no free block is large
    /// enough, and rejects zero-sized and overflow-prone requests up front.
    /// A failed call leaves the allocator untouched.
    ///
    /// # Safety
    ///
    /// The arena handed to [`FreeListAllocator::new`] must still be alive.
    pub unsafe fn try_allocate_raw(&mut self, data_size: usize) -> Result<NonNull<u8>, AllocError> {
        if data_size == 0 {
            return Err(AllocError::ZeroSize);
        }
        // Smallest size that guarantees natural alignment on both ends.
        // The extra is trimmed off again further down.
        let search_size = data_size
            .checked_mul(2)
            .and_then(|doubled| doubled.checked_add(HEADER_MAX_PADDING))
            .ok_or(AllocError::SizeOverflow(data_size))?
            .max(MIN_INIT_SIZE);

        unsafe {
            let Some(free_node) = self.tree.search_best_fit(search_size) else {
                debug!("out of memory: no free block fits {search_size} bytes");
                return Err(AllocError::OutOfMemory(data_size));
            };
            let node_size = free_node.as_ref().size;
            let old_header = header_placement(free_node.as_ptr() as *mut u8);

            let mut space_left = node_size;
            let payload = align_to_natural(
                data_size,
                (old_header as *mut u8).wrapping_add(HEADER_SIZE),
                &mut space_left,
            );

            // The relocated header may land on the bytes the node occupies,
            // so the node has to leave the tree before anything is written.
            self.tree.remove_node(Some(free_node));

            // Move the header forward to the closest aligned position
            // behind the payload and point the neighbors at it.
            let next = (*old_header).next;
            let prev = (*old_header).prev;
            let header = header_placement(payload);
            header.write(BlockHeader::new(next, prev));
            let header = NonNull::new_unchecked(header);
            if let Some(mut prev) = prev {
                prev.as_mut().next = header;
            }
            if next != self.end_of_memory {
                (*next.as_ptr()).prev = Some(header);
            }

            // Make sure the block can host a header and node again once it
            // is freed later.
            let space_taken = node_size - space_left;
            let carved = if space_taken + data_size < MIN_INIT_SIZE {
                MIN_INIT_SIZE - space_taken
            } else {
                data_size
            };
            space_left -= carved;

            // Whatever is left over becomes a new free block, unless it is
            // too small to hold metadata; then it stays inside this block.
            self.create_block(Some(header), next, payload.wrapping_add(carved));

            trace!("allocated {data_size} bytes at {payload:p}");

            Ok(NonNull::new_unchecked(payload))
        }
    }

    /// Returns a block to the allocator, merging it with whichever
    /// neighbors are free.
    ///
    /// Does nothing when `ptr` is null.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a pointer previously returned by this
    /// allocator instance and not freed since.
    pub unsafe fn free_raw(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }

        unsafe {
            let header = header_placement(ptr);
            let left = (*header).prev;
            let right = (*header).next;
            let mut new_next = right;

            // The block on our right is free: absorb it and relink past it
            if right != self.end_of_memory && (*right.as_ptr()).node.is_some() {
                new_next = (*right.as_ptr()).next;
                self.tree.remove_node((*right.as_ptr()).node);

                (*header).next = new_next;
                if new_next != self.end_of_memory {
                    (*new_next.as_ptr()).prev = Some(NonNull::new_unchecked(header));
                }
            }

            match left {
                // The block on our left is free: it grows across our span.
                // Our own header simply becomes part of its payload.
                Some(mut left_header) if (*left_header.as_ptr()).node.is_some() => {
                    left_header.as_mut().next = new_next;
                    if new_next != self.end_of_memory {
                        (*new_next.as_ptr()).prev = Some(left_header);
                    }

                    // The tree is keyed by size, so the grown block has to
                    // be pulled out and reinserted under its new size.
                    let node = (*left_header.as_ptr()).node;
                    self.tree.remove_node(node);
                    if let Some(mut node) = node {
                        node.as_mut().size = left_header.as_ref().payload_span();
                    }
                    self.tree.insert_node(node);
                }
                _ => {
                    // No free neighbor on the left: rebuild a free block in
                    // place. With no left neighbor at all we rebuild from
                    // the arena base, reclaiming any leading padding.
                    let start = if left.is_none() {
                        self.base.as_ptr()
                    } else {
                        header as *mut u8
                    };
                    self.create_block(left, new_next, start);
                }
            }

            trace!("freed block at {ptr:p}");
        }
    }

    /// Creates a free block filling `start..next` and links it between
    /// `prev` and `next`. Both the header and the tree node are written
    /// into the block's own bytes at naturally aligned positions.
    ///
    /// Does nothing when the span is too small to hold the metadata.
    unsafe fn create_block(
        &mut self,
        prev: Link<BlockHeader>,
        next: NonNull<BlockHeader>,
        start: *mut u8,
    ) {
        let span = next.as_ptr() as usize - start as usize;
        if span < HEADER_MAX_PADDING + NODE_MAX_PADDING {
            return; // Not enough space for a new block
        }

        // Figure out where header and node go in an aligned way, then move
        // the header to the closest aligned position behind the node
        let mut space_left = span;
        let aligned_header = align_to_natural(HEADER_SIZE, start, &mut space_left);
        let node_ptr = align_to_natural(
            NODE_SIZE,
            aligned_header.wrapping_add(HEADER_SIZE),
            &mut space_left,
        ) as *mut FreeNode;
        let header = header_placement(node_ptr as *mut u8);

        // Bytes available behind the header, with the block's own padding
        // already paid for
        let node_size = span - (header as usize - start as usize) - HEADER_SIZE;

        unsafe {
            node_ptr.write(FreeNode::new(node_size));
            self.tree.insert_node(NonNull::new(node_ptr));

            header.write(BlockHeader::new(next, prev));
            (*header).node = NonNull::new(node_ptr);

            let header = NonNull::new_unchecked(header);
            if let Some(mut prev) = prev {
                prev.as_mut().next = header;
            }
            if next != self.end_of_memory {
                (*next.as_ptr()).prev = Some(header);
            }
        }
    }
}

impl RawAllocator for FreeListAllocator {
    unsafe fn allocate_raw(&mut self, data_size: usize) -> *mut u8 {
        unsafe {
            self.try_allocate_raw(data_size)
                .map_or(std::ptr::null_mut(), NonNull::as_ptr)
        }
    }

    unsafe fn free_raw(&mut self, ptr: *mut u8) {
        unsafe { FreeListAllocator::free_raw(self, ptr) }
    }
}
