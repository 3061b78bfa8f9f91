use std::{mem, ptr};

/// Interface shared by every allocator in this crate.
///
/// The raw pair does the actual memory management; the typed helpers are
/// thin wrappers that construct and drop values in place. Implementations
/// only ever override the raw pair, and callers that don't care which
/// allocation strategy sits behind a pointer can work with
/// `&mut dyn RawAllocator`.
pub trait RawAllocator {
    /// Allocates `size` bytes aligned to a multiple of `size`, or returns
    /// null when the request can't be satisfied.
    ///
    /// # Safety
    ///
    /// The memory region backing the allocator must still be alive.
    unsafe fn allocate_raw(&mut self, size: usize) -> *mut u8;

    /// Releases an allocation. Must accept null as a no-op.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a pointer previously returned by
    /// [`RawAllocator::allocate_raw`] on this instance and not freed since.
    unsafe fn free_raw(&mut self, ptr: *mut u8);

    /// Moves `value` into freshly allocated memory.
    ///
    /// Returns null (and drops `value`) when the allocation fails.
    ///
    /// # Safety
    ///
    /// Same contract as [`RawAllocator::allocate_raw`].
    unsafe fn allocate_value<T>(&mut self, value: T) -> *mut T
    where
        Self: Sized,
    {
        unsafe {
            let ptr = self.allocate_raw(mem::size_of::<T>()) as *mut T;

            if !ptr.is_null() {
                ptr.write(value);
            }

            ptr
        }
    }

    /// Drops the value behind `ptr` and releases its memory.
    ///
    /// Does nothing when `ptr` is null.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a pointer previously returned by
    /// [`RawAllocator::allocate_value`] on this instance and not freed
    /// since.
    unsafe fn free_value<T>(&mut self, ptr: *mut T)
    where
        Self: Sized,
    {
        if ptr.is_null() {
            return;
        }

        unsafe {
            ptr::drop_in_place(ptr);
            self.free_raw(ptr as *mut u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::MappedArena;
    use crate::freelist::FreeListAllocator;
    use std::cell::Cell;

    // Sized so that misalignment would be obvious
    struct Large {
        number: i32,
        _filler: [usize; 20],
    }

    impl Large {
        fn new(number: i32) -> Self {
            Self { number, _filler: [0; 20] }
        }
    }

    #[test]
    fn typed_allocations_are_constructed_and_aligned() {
        let arena = MappedArena::new(65_536).unwrap();
        let mut allocator =
            unsafe { FreeListAllocator::new(arena.base(), 65_536) }.unwrap();

        unsafe {
            let first = allocator.allocate_value(Large::new(42));
            let second = allocator.allocate_value(Large::new(43));
            let third = allocator.allocate_value(Large::new(44));

            for (ptr, expected) in [(first, 42), (second, 43), (third, 44)] {
                assert!(!ptr.is_null());
                assert_eq!(ptr as usize % mem::size_of::<Large>(), 0);
                assert_eq!((*ptr).number, expected);
            }

            allocator.free_value(first);
            allocator.free_value(second);
            allocator.free_value(third);
        }
    }

    #[test]
    fn freeing_a_value_runs_its_destructor() {
        thread_local! {
            static DROPS: Cell<usize> = const { Cell::new(0) };
        }

        struct Tracked;

        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.with(|drops| drops.set(drops.get() + 1));
            }
        }

        let arena = MappedArena::new(65_536).unwrap();
        let mut allocator =
            unsafe { FreeListAllocator::new(arena.base(), 65_536) }.unwrap();

        unsafe {
            let ptr = allocator.allocate_value(Tracked);
            assert_eq!(DROPS.with(Cell::get), 0);

            allocator.free_value(ptr);
            assert_eq!(DROPS.with(Cell::get), 1);
        }
    }

    #[test]
    fn failed_typed_allocation_returns_null_and_drops_the_value() {
        thread_local! {
            static DROPS: Cell<usize> = const { Cell::new(0) };
        }

        struct Huge {
            _filler: [u8; 1 << 16],
        }

        impl Drop for Huge {
            fn drop(&mut self) {
                DROPS.with(|drops| drops.set(drops.get() + 1));
            }
        }

        let arena = MappedArena::new(4096).unwrap();
        let mut allocator = unsafe { FreeListAllocator::new(arena.base(), 4096) }.unwrap();

        unsafe {
            let ptr = allocator.allocate_value(Huge { _filler: [0; 1 << 16] });

            assert!(ptr.is_null());
            assert_eq!(DROPS.with(Cell::get), 1);
        }
    }

    #[test]
    fn null_typed_free_is_a_no_op() {
        let arena = MappedArena::new(4096).unwrap();
        let mut allocator = unsafe { FreeListAllocator::new(arena.base(), 4096) }.unwrap();

        unsafe { allocator.free_value::<Large>(ptr::null_mut()) };
    }
}
