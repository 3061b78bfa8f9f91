//! This example exercises the typed helpers built on top of the raw
//! pointer interface: values are constructed in place inside the arena and
//! their destructors run when they are handed back.

use fitalloc::{FreeListAllocator, MappedArena, RawAllocator};

struct Particle {
    x: f64,
    y: f64,
    label: String,
}

impl Drop for Particle {
    fn drop(&mut self) {
        println!("Dropping particle '{}'", self.label);
    }
}

fn main() {
    let arena = MappedArena::new(16 * 1024).expect("platform refused to map an arena");

    let mut allocator = unsafe { FreeListAllocator::new(arena.base(), arena.len()) }
        .expect("arena is big enough");

    unsafe {
        let p1 = allocator.allocate_value(Particle {
            x: 1.5,
            y: -2.5,
            label: String::from("alpha"),
        });
        let p2 = allocator.allocate_value(Particle {
            x: 0.0,
            y: 4.25,
            label: String::from("beta"),
        });

        assert!(!p1.is_null() && !p2.is_null());
        println!("'{}' lives at {:p} ({}, {})", (*p1).label, p1, (*p1).x, (*p1).y);
        println!("'{}' lives at {:p} ({}, {})", (*p2).label, p2, (*p2).x, (*p2).y);

        allocator.free_value(p1);
        allocator.free_value(p2);

        // A request that can never fit simply comes back null
        let too_big = allocator.allocate_value([0u8; 64 * 1024]);
        assert!(too_big.is_null());
        println!("Oversized request correctly returned null");
    }
}
