//! RAM buffer backing the simulated address space.
//!
//! This module provides a safe wrapper around the raw allocation holding the
//! modeled physical memory. On Unix it uses anonymous `mmap` with
//! `MAP_NORESERVE`, so the host only commits pages that the simulation
//! actually touches; multi-gigabyte simulated memories stay cheap at startup.
//! On other platforms it falls back to a heap allocation. The buffer is
//! allocated once at construction, zero-initialized, and never resized.

use std::slice;

/// A fixed-size, zero-initialized byte buffer for simulated physical RAM.
pub struct RamBuffer {
    ptr: *mut u8,
    size: usize,
    is_mmap: bool,
}

unsafe impl Send for RamBuffer {}
unsafe impl Sync for RamBuffer {}

impl RamBuffer {
    /// Allocates a buffer of the given size in bytes.
    ///
    /// On Unix this maps anonymous memory lazily; elsewhere it allocates a
    /// zeroed `Vec`. Panics if the host cannot provide the allocation, which
    /// mirrors an unrecoverable out-of-memory at simulator startup.
    pub fn new(size: usize) -> Self {
        #[cfg(unix)]
        {
            use std::ptr;
            let mem = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    size,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                    -1,
                    0,
                )
            };
            if mem == libc::MAP_FAILED {
                panic!("failed to mmap {} bytes of simulated memory", size);
            }
            Self {
                ptr: mem as *mut u8,
                size,
                is_mmap: true,
            }
        }

        #[cfg(not(unix))]
        {
            let mut vec = vec![0u8; size];
            let ptr = vec.as_mut_ptr();
            std::mem::forget(vec);
            Self {
                ptr,
                size,
                is_mmap: false,
            }
        }
    }

    /// Returns the buffer size in bytes.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.size
    }

    /// True if the buffer has zero size.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Reads one byte at the given offset.
    #[inline(always)]
    pub fn read_u8(&self, offset: usize) -> u8 {
        assert!(offset < self.size, "RAM read out of bounds");
        unsafe { *self.ptr.add(offset) }
    }

    /// Writes one byte at the given offset.
    #[inline(always)]
    pub fn write_u8(&mut self, offset: usize, val: u8) {
        assert!(offset < self.size, "RAM write out of bounds");
        unsafe {
            *self.ptr.add(offset) = val;
        }
    }

    /// Returns a shared view of `len` bytes starting at `offset`.
    #[inline(always)]
    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        assert!(
            offset <= self.size && len <= self.size - offset,
            "RAM read out of bounds"
        );
        unsafe { slice::from_raw_parts(self.ptr.add(offset), len) }
    }

    /// Returns a mutable view of `len` bytes starting at `offset`.
    #[inline(always)]
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        assert!(
            offset <= self.size && len <= self.size - offset,
            "RAM write out of bounds"
        );
        unsafe { slice::from_raw_parts_mut(self.ptr.add(offset), len) }
    }

    /// Copies `data` into the buffer starting at `offset`.
    pub fn write_slice(&mut self, offset: usize, data: &[u8]) {
        self.slice_mut(offset, data.len()).copy_from_slice(data);
    }

    /// Zeroes `len` bytes starting at `offset`.
    pub fn fill_zero(&mut self, offset: usize, len: usize) {
        self.slice_mut(offset, len).fill(0);
    }
}

impl Drop for RamBuffer {
    fn drop(&mut self) {
        if self.is_mmap {
            #[cfg(unix)]
            unsafe {
                libc::munmap(self.ptr as *mut _, self.size);
            }
        } else {
            #[cfg(not(unix))]
            unsafe {
                let _ = Vec::from_raw_parts(self.ptr, self.size, self.size);
            }
        }
    }
}
