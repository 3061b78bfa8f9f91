use thiserror::Error;

/// Why an allocator call failed.
///
/// Every failure is soft: the arena, the block list and the free-size tree
/// are left exactly as they were before the failing call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    #[error("arena of {size} bytes is below the minimum of {min} bytes")]
    ArenaTooSmall { size: usize, min: usize },

    #[error("arena base address can't be null")]
    NullArenaBase,

    #[error("allocation size can't be 0")]
    ZeroSize,

    #[error("allocation of {0} bytes would overflow when padded")]
    SizeOverflow(usize),

    #[error("no free block large enough for {0} bytes")]
    OutOfMemory(usize),
}
