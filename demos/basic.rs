use fitalloc::{FreeListAllocator, MappedArena, RawAllocator};

fn log_alloc(addr: *mut u8, size: usize) {
    println!("Requested {size} bytes of memory");
    println!("Received this address: {addr:?}");
}

fn main() {
    let arena = MappedArena::new(64 * 1024).expect("platform refused to map an arena");

    let mut allocator = unsafe { FreeListAllocator::new(arena.base(), arena.len()) }
        .expect("arena is big enough");

    unsafe {
        let addr1 = allocator.allocate_raw(8);
        log_alloc(addr1, 8);

        let addr2 = allocator.allocate_raw(1024);
        log_alloc(addr2, 1024);

        let addr3 = allocator.allocate_raw(4096);
        log_alloc(addr3, 4096);

        println!("Deallocating everything...");
        allocator.free_raw(addr1);
        allocator.free_raw(addr2);
        allocator.free_raw(addr3);

        // With everything merged back together the biggest request fits again
        match allocator.try_allocate_raw(16 * 1024) {
            Ok(big) => println!("Re-used the whole arena at {:?}", big.as_ptr()),
            Err(error) => println!("Allocation failed: {error}"),
        }
    }
}
