use std::{ptr::NonNull, sync::OnceLock};

use log::debug;

use crate::utils::align;


/// Owned, page-aligned backing memory for an allocator, requested straight
/// from the platform:
///
/// [`mmap`](https://man7.org/linux/man-pages/man2/mmap.2.html) on Unix,
/// [`VirtualAlloc`](https://learn.microsoft.com/en-us/windows/win32/api/memoryapi/nf-memoryapi-virtualalloc)
/// on Windows.
///
/// The allocator itself never talks to the operating system; it only ever
/// sees the region the caller hands it. This type exists for callers that
/// don't already have a reserved spot in their memory map: request an arena
/// here once, run a [`crate::FreeListAllocator`] inside it, and the whole
/// region goes back to the system when the arena is dropped.
pub struct MappedArena {
    base: NonNull<u8>,
    len: usize,
}

/// This trait provides an abstraction to handle low level memory requests
/// and syscalls, as the arena has nothing to do with the concrete
/// implementations / APIs offered by each platform.
trait PlatformMemory {
    /// Request a memory region of size `len`. It returns a pointer to the
    /// given location or None if the underlying syscall fails.
    unsafe fn request_memory(len: usize) -> Option<NonNull<u8>>;

    /// Returns the memory of size `len` starting from `addr` back to the system.
    unsafe fn return_memory(addr: *mut u8, len: usize);

    /// Returns the virtual memory page size of the computer in bytes.
    unsafe fn query_page_size() -> usize;
}

/// Virtual memory page size of the computer. This is usually 4096, but we
/// can't know the value at compile time.
pub(crate) fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

    *PAGE_SIZE.get_or_init(|| unsafe { MappedArena::query_page_size() })
}

impl MappedArena {
    /// Requests a read-write region of at least `len` bytes from the
    /// platform, rounded up to whole pages. Returns `None` when the
    /// underlying syscall fails.
    pub fn new(len: usize) -> Option<Self> {
        let len = align(len.max(1), page_size());
        let base = unsafe { Self::request_memory(len)? };

        debug!("mapped {len} byte arena at {base:p}");

        Some(Self { base, len })
    }

    /// Start of the region.
    pub fn base(&self) -> *mut u8 {
        self.base.as_ptr()
    }

    /// Usable bytes in the region. At least what was asked for; whole
    /// pages, so usually a little more.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for MappedArena {
    fn drop(&mut self) {
        unsafe { Self::return_memory(self.base.as_ptr(), self.len) };
    }
}

#[cfg(unix)]
mod unix {
    use super::{MappedArena, PlatformMemory};

    use libc::{mmap, munmap, off_t, size_t};

    use std::{
        os::raw::{c_int, c_void},
        ptr::NonNull,
    };

    impl PlatformMemory for MappedArena {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // mmap parameters.
            const ADDR: *mut c_void = std::ptr::null_mut::<c_void>();
            // Read-Write only memory.
            const PROT: c_int = libc::PROT_READ | libc::PROT_WRITE;
            const FLAGS: c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
            const FD: c_int = -1;
            const OFFSET: off_t = 0;

            unsafe {
                let addr = mmap(ADDR, len as size_t, PROT, FLAGS, FD, OFFSET);

                match addr {
                    libc::MAP_FAILED => None,
                    addr => Some(NonNull::new_unchecked(addr).cast::<u8>()),
                }
            }
        }

        unsafe fn return_memory(addr: *mut u8, len: usize) {
            unsafe { munmap(addr as *mut c_void, len as size_t) };
        }

        unsafe fn query_page_size() -> usize {
            unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) as usize }
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::{mem::MaybeUninit, os::raw::c_void, ptr::NonNull};

    use super::{MappedArena, PlatformMemory};

    use windows::Win32::System::{Memory, SystemInformation};

    impl PlatformMemory for MappedArena {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // Read-Write only.
            let protection = Memory::PAGE_READWRITE;

            let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

            unsafe {
                let addr = Memory::VirtualAlloc(None, len, flags, protection);

                NonNull::new(addr.cast())
            }
        }

        unsafe fn return_memory(addr: *mut u8, _len: usize) {
            unsafe {
                let _ = Memory::VirtualFree(addr as *mut c_void, 0, Memory::MEM_RELEASE);
            }
        }

        unsafe fn query_page_size() -> usize {
            unsafe {
                let mut system_info = MaybeUninit::uninit();
                SystemInformation::GetSystemInfo(system_info.as_mut_ptr());

                system_info.assume_init().dwPageSize as usize
            }
        }
    }
}
