//! fitalloc is a best-fit memory allocator that suballocates from a single,
//! caller-provided, contiguous byte region of fixed size.
//!
//! It owns no memory of its own and never calls into the operating system,
//! which makes it a good fit for embedded, games or systems workloads that
//! need bounded, predictable allocation over a preallocated arena.
//!
//! The internal structure of the allocator looks like this:
//!
//! ```text
//!                         Free-size tree (red-black, keyed by size)
//!
//!                               +--------+      +--------+
//!                               |  node  |      |  node  |
//!                               +---|----+      +---|----+
//!                                   |               |
//! +---------------------------------|---------------|--------------------+
//! | +--------+---------+ +--------+-v-------+ +-----v--+---------------+ |
//! | | Header | payload | | Header | free    | | Header | free          | |
//! | +--------+---------+ +--------+---------+ +--------+---------------+ |
//! |    Arena: every block starts with a header linking its neighbors     |
//! +-----------------------------------------------------------------------+
//! ```
//!
//! Every block, used or free, starts with a header carrying a doubly-linked
//! list threaded through the arena in address order; merging a freed block
//! with its neighbors is O(1). Free blocks additionally carry a red-black
//! tree node *inside the free memory itself*, indexing them by size so the
//! best-fitting block is found in O(log n). Metadata therefore consumes no
//! allocatable space beyond the per-block header.
//!
//! The main optimizations which are implemented are:
//! - **Best-fit search**: requests are served from the smallest free block
//!   that fits, keeping fragmentation low
//! - **Block splitting**: leftover space becomes a new free block instead
//!   of being wasted
//! - **Block merging**: adjacent free blocks are coalesced into bigger ones
//!
//! The allocator is deliberately single-threaded: operations on one
//! instance are totally ordered and fully deterministic, so identical call
//! sequences reproduce identical addresses and failure points. Callers that
//! need concurrency serialize access externally.
//!
//! The main structure is [`FreeListAllocator`], you can follow the codebase
//! from there. [`MappedArena`] produces page-aligned backing memory for
//! callers that don't already have a region reserved, and the
//! [`RawAllocator`] trait adds typed placement helpers on top of the raw
//! pointer interface.


mod arena;
mod base;
mod error;
mod freelist;
mod header;
mod rbtree;
mod utils;


pub use arena::MappedArena;
pub use base::RawAllocator;
pub use error::AllocError;
pub use freelist::{FreeListAllocator, MIN_INIT_SIZE};
