//! The memory engine: construction, geometry, and access primitives.
//!
//! This module implements the heart of the subsystem. It provides:
//! 1. **Construction:** Geometry normalization (size, page, region) and the
//!    zero-initialized backing store.
//! 2. **Access engine:** Typed read/write/fetch primitives enforcing page
//!    attributes, boundary-crossing rules, and memory-mapped-register masking.
//! 3. **Debug access:** Untracked pokes and the access-check-bypassing byte
//!    writer used by the image loaders.
//!
//! Every access is O(1) in the access size; nothing suspends or blocks. The
//! `&mut self` receivers on the mutating primitives give the single-threaded
//! simulator core the indivisible load/update/store step the atomic
//! instructions require.

use std::collections::HashMap;

use log::warn;

use crate::attrib::PageAttribs;
use crate::buffer::RamBuffer;
use crate::config::{defaults, MemoryConfig};
use crate::error::{AccessKind, MemoryError};
use crate::journal::LastWrite;
use crate::loader::elf::ElfSymbol;
use crate::reservation::Reservation;
use crate::value::MemValue;

/// Model of the physical memory of a simulated SweRV-class system.
///
/// The address space is a single contiguous byte range partitioned into
/// regions (ICCM/DCCM/PIC configuration granularity) and pages (access
/// attribute granularity). Regions are configured once before execution;
/// during execution only the access, reservation, and journal primitives are
/// invoked.
pub struct Memory {
    size: usize,
    pub(crate) data: RamBuffer,

    page_size: usize,
    page_shift: u32,
    page_count: usize,

    region_size: usize,
    region_shift: u32,
    region_count: usize,

    /// One flag per region; set when an ICCM/DCCM/PIC definition first
    /// touches the region.
    pub(crate) region_configured: Vec<bool>,

    /// One packed attribute byte per page.
    pub(crate) attribs: Vec<PageAttribs>,

    /// Per-page write-mask vectors for memory-mapped-register pages. Empty
    /// outer vector until the first mask is defined; an empty inner vector
    /// reads as all-ones.
    pub(crate) masks: Vec<Vec<u32>>,

    /// Indices of pages holding memory-mapped registers.
    pub(crate) mmr_pages: Vec<usize>,

    /// When set, ELF bytes falling on unmapped pages fail the load.
    pub(crate) check_unmapped_elf: bool,

    /// Symbols collected from every loaded ELF file.
    pub(crate) symbols: HashMap<String, ElfSymbol>,

    /// One LR/SC reservation slot per hart.
    pub(crate) reservations: Vec<Reservation>,

    /// One last-write record per hart.
    pub(crate) last_write: Vec<LastWrite>,
}

impl Memory {
    /// Creates a memory from the given configuration.
    ///
    /// The requested size is truncated to a multiple of 4 and rounded up to a
    /// whole number of pages; page and region sizes are forced to powers of
    /// two with the region no smaller than the page. Each adjustment is
    /// logged. The whole space starts mapped, readable, writable, and
    /// executable; ICCM/DCCM/PIC definitions refine that before execution.
    ///
    /// # Arguments
    ///
    /// * `config` - Geometry settings; see [`MemoryConfig`].
    ///
    /// # Returns
    ///
    /// A zero-filled memory sized per the normalized geometry.
    pub fn new(config: &MemoryConfig) -> Self {
        let mut size = config.size;
        if size & 3 != 0 {
            size &= !3;
            warn!(
                "memory size ({:#x}) is not a multiple of 4; using {:#x}",
                config.size, size
            );
        }

        let mut page_size = config.page_size;
        if page_size == 0 {
            warn!(
                "memory page size cannot be zero; using {:#x}",
                defaults::PAGE_SIZE
            );
            page_size = defaults::PAGE_SIZE;
        }
        let page_shift = page_size.ilog2();
        if 1usize << page_shift != page_size {
            warn!(
                "memory page size ({:#x}) is not a power of 2; using {:#x}",
                page_size,
                1usize << page_shift
            );
            page_size = 1 << page_shift;
        }

        if size < page_size {
            warn!(
                "unreasonably small memory size ({:#x}); using one page ({:#x})",
                size, page_size
            );
            size = page_size;
        }

        let mut page_count = size / page_size;
        if page_count * page_size != size {
            page_count += 1;
            warn!(
                "memory size ({:#x}) is not a multiple of page size ({:#x}); using {:#x}",
                size,
                page_size,
                page_count * page_size
            );
            size = page_count * page_size;
        }

        let mut region_size = config.region_size;
        if region_size == 0 {
            region_size = page_size;
        }
        let mut region_shift = region_size.ilog2();
        if 1usize << region_shift != region_size {
            warn!(
                "memory region size ({:#x}) is not a power of 2; using {:#x}",
                region_size,
                1usize << region_shift
            );
            region_size = 1 << region_shift;
        }
        if region_size < page_size {
            warn!(
                "memory region size ({:#x}) is smaller than page size ({:#x}); using page size",
                region_size, page_size
            );
            region_size = page_size;
            region_shift = page_shift;
        }

        let mut region_count = size / region_size;
        if region_count * region_size < size {
            region_count += 1;
        }

        let hart_count = config.hart_count.max(1);

        Self {
            size,
            data: RamBuffer::new(size),
            page_size,
            page_shift,
            page_count,
            region_size,
            region_shift,
            region_count,
            region_configured: vec![false; region_count],
            attribs: vec![PageAttribs::rwx(); page_count],
            masks: Vec::new(),
            mmr_pages: Vec::new(),
            check_unmapped_elf: true,
            symbols: HashMap::new(),
            reservations: vec![Reservation::default(); hart_count],
            last_write: vec![LastWrite::default(); hart_count],
        }
    }

    /// Returns the memory size in bytes.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the page size in bytes.
    #[inline(always)]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the region size in bytes.
    pub fn region_size(&self) -> usize {
        self.region_size
    }

    /// Returns the number of pages.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Returns the number of regions.
    pub fn region_count(&self) -> usize {
        self.region_count
    }

    /// Returns the number of harts sharing this memory.
    pub fn hart_count(&self) -> usize {
        self.reservations.len()
    }

    /// Returns the index of the page containing the given address.
    #[inline(always)]
    pub(crate) fn page_index(&self, addr: usize) -> usize {
        addr >> self.page_shift
    }

    /// Returns the start address of the page containing the given address.
    #[inline(always)]
    pub(crate) fn page_start(&self, addr: usize) -> usize {
        (addr >> self.page_shift) << self.page_shift
    }

    /// Returns the index of the region containing the given address.
    #[inline(always)]
    pub fn region_index(&self, addr: usize) -> usize {
        addr >> self.region_shift
    }

    /// Returns the attributes of the page containing the given address, or
    /// an all-clear record for addresses outside the address space.
    #[inline(always)]
    pub(crate) fn attrib(&self, addr: usize) -> PageAttribs {
        let ix = self.page_index(addr);
        if ix < self.attribs.len() {
            self.attribs[ix]
        } else {
            PageAttribs::default()
        }
    }

    /// True if the given address is in a mapped page.
    pub fn is_addr_mapped(&self, addr: usize) -> bool {
        self.attrib(addr).is_mapped()
    }

    /// True if the given address is in a readable page.
    pub fn is_addr_readable(&self, addr: usize) -> bool {
        self.attrib(addr).is_read()
    }

    /// True if the given address is in data closely-coupled memory.
    pub fn is_addr_in_dccm(&self, addr: usize) -> bool {
        self.attrib(addr).is_dccm()
    }

    /// True if the given address is in instruction closely-coupled memory.
    pub fn is_addr_in_iccm(&self, addr: usize) -> bool {
        self.attrib(addr).is_iccm()
    }

    /// True if the given address is in a memory-mapped-register area.
    pub fn is_addr_in_mapped_regs(&self, addr: usize) -> bool {
        self.attrib(addr).is_mem_mapped_reg()
    }

    /// True if the given data address is external to the core (neither DCCM
    /// nor memory-mapped registers).
    pub fn is_data_addr_external(&self, addr: usize) -> bool {
        self.attrib(addr).is_external()
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Reads one byte. Bytes in memory-mapped-register pages are not byte
    /// readable; only word access is allowed there.
    pub fn read_u8(&self, addr: usize) -> Result<u8, MemoryError> {
        self.read_val::<u8>(addr)
    }

    /// Reads a half-word (2 bytes, little-endian).
    pub fn read_u16(&self, addr: usize) -> Result<u16, MemoryError> {
        self.read_val::<u16>(addr)
    }

    /// Reads a word (4 bytes, little-endian).
    pub fn read_u32(&self, addr: usize) -> Result<u32, MemoryError> {
        self.read_val::<u32>(addr)
    }

    /// Reads a double-word (8 bytes, little-endian).
    pub fn read_u64(&self, addr: usize) -> Result<u64, MemoryError> {
        self.read_val::<u64>(addr)
    }

    /// Reads a half-word for instruction fetch; requires `exec` permission.
    pub fn fetch_u16(&self, addr: usize) -> Result<u16, MemoryError> {
        self.fetch_val::<u16>(addr)
    }

    /// Reads a word for instruction fetch; requires `exec` permission.
    pub fn fetch_u32(&self, addr: usize) -> Result<u32, MemoryError> {
        self.fetch_val::<u32>(addr)
    }

    /// Typed read with the full access contract: a readable first page; on a
    /// misaligned page-crossing access a readable second page with matching
    /// DCCM and PIC tags; word-only, word-aligned access to memory-mapped
    /// registers.
    fn read_val<T: MemValue>(&self, addr: usize) -> Result<T, MemoryError> {
        self.check_bounds(addr, T::SIZE)?;

        let attrib = self.attrib(addr);
        if !attrib.is_read() {
            return Err(self.denied(AccessKind::Read, addr));
        }

        if addr & (T::SIZE - 1) != 0 {
            let last = addr + T::SIZE - 1;
            if self.page_start(addr) != self.page_start(last) {
                let attrib2 = self.attrib(last);
                if !attrib2.is_read() {
                    return Err(self.denied(AccessKind::Read, last));
                }
                if attrib.is_dccm() != attrib2.is_dccm() {
                    return Err(MemoryError::BoundaryViolation { addr });
                }
                if attrib.is_mem_mapped_reg() != attrib2.is_mem_mapped_reg() {
                    return Err(MemoryError::BoundaryViolation { addr });
                }
            }
        }

        if attrib.is_mem_mapped_reg() {
            if T::SIZE != 4 {
                return Err(MemoryError::MmrSizeViolation {
                    addr,
                    size: T::SIZE,
                });
            }
            if addr & 3 != 0 {
                return Err(MemoryError::MmrAlignment { addr });
            }
        }

        Ok(T::from_le(self.data.slice(addr, T::SIZE)))
    }

    /// Typed instruction fetch: requires `exec` on the first page and, when a
    /// misaligned fetch crosses pages, `exec` and a matching ICCM tag on the
    /// second page.
    fn fetch_val<T: MemValue>(&self, addr: usize) -> Result<T, MemoryError> {
        self.check_bounds(addr, T::SIZE)?;

        let attrib = self.attrib(addr);
        if !attrib.is_exec() {
            return Err(self.denied(AccessKind::Fetch, addr));
        }

        if addr & (T::SIZE - 1) != 0 {
            let last = addr + T::SIZE - 1;
            if self.page_start(addr) != self.page_start(last) {
                let attrib2 = self.attrib(last);
                if !attrib2.is_exec() {
                    return Err(self.denied(AccessKind::Fetch, last));
                }
                if attrib.is_iccm() != attrib2.is_iccm() {
                    return Err(MemoryError::BoundaryViolation { addr });
                }
            }
        }

        Ok(T::from_le(self.data.slice(addr, T::SIZE)))
    }

    // ── Writes ───────────────────────────────────────────────────────────

    /// Writes one byte on behalf of `hart`. Bytes in memory-mapped-register
    /// pages are not byte writable; only word access is allowed there.
    pub fn write_u8(&mut self, hart: usize, addr: usize, value: u8) -> Result<(), MemoryError> {
        self.write_val(hart, addr, value)
    }

    /// Writes a half-word (2 bytes, little-endian) on behalf of `hart`.
    pub fn write_u16(&mut self, hart: usize, addr: usize, value: u16) -> Result<(), MemoryError> {
        self.write_val(hart, addr, value)
    }

    /// Writes a word (4 bytes, little-endian) on behalf of `hart`. Writes to
    /// memory-mapped registers commit only the bits their write mask admits.
    pub fn write_u32(&mut self, hart: usize, addr: usize, value: u32) -> Result<(), MemoryError> {
        self.write_val(hart, addr, value)
    }

    /// Writes a double-word (8 bytes, little-endian) on behalf of `hart`.
    pub fn write_u64(&mut self, hart: usize, addr: usize, value: u64) -> Result<(), MemoryError> {
        self.write_val(hart, addr, value)
    }

    /// Typed write with the full access contract. On success the hart's
    /// journal holds the committed value and the previous bytes, and every
    /// other hart's overlapping reservation is invalidated.
    fn write_val<T: MemValue>(
        &mut self,
        hart: usize,
        addr: usize,
        value: T,
    ) -> Result<(), MemoryError> {
        self.check_bounds(addr, T::SIZE)?;

        let attrib = self.attrib(addr);
        if !attrib.is_write() {
            return Err(self.denied(AccessKind::Write, addr));
        }

        if addr & (T::SIZE - 1) != 0 {
            let last = addr + T::SIZE - 1;
            if self.page_start(addr) != self.page_start(last) {
                let attrib2 = self.attrib(last);
                if !attrib2.is_write() {
                    return Err(self.denied(AccessKind::Write, last));
                }
                if attrib.is_dccm() != attrib2.is_dccm() {
                    return Err(MemoryError::BoundaryViolation { addr });
                }
                if attrib.is_mem_mapped_reg() != attrib2.is_mem_mapped_reg() {
                    return Err(MemoryError::BoundaryViolation { addr });
                }
            }
        }

        if attrib.is_mem_mapped_reg() {
            if T::SIZE != 4 {
                return Err(MemoryError::MmrSizeViolation {
                    addr,
                    size: T::SIZE,
                });
            }
            let word: u64 = value.into();
            self.write_register(hart, addr, word as u32)?;
            self.invalidate_other_hart_lr(hart, addr, 4);
            return Ok(());
        }

        let prev = u64::from_le_bytes(self.read_padded(addr, T::SIZE));
        value.write_le(self.data.slice_mut(addr, T::SIZE));
        self.record_write(hart, addr, T::SIZE, value.into(), prev);
        self.invalidate_other_hart_lr(hart, addr, T::SIZE);
        Ok(())
    }

    /// Dry-run of `write_u8`; reports whether the write would succeed.
    pub fn check_write_u8(&self, addr: usize, value: &mut u8) -> Result<(), MemoryError> {
        self.check_write_val(addr, value)
    }

    /// Dry-run of `write_u16`; reports whether the write would succeed.
    pub fn check_write_u16(&self, addr: usize, value: &mut u16) -> Result<(), MemoryError> {
        self.check_write_val(addr, value)
    }

    /// Dry-run of `write_u32`. If the target is a memory-mapped register,
    /// `value` is rewritten to the masked value the write would commit.
    pub fn check_write_u32(&self, addr: usize, value: &mut u32) -> Result<(), MemoryError> {
        self.check_write_val(addr, value)?;
        if self.attrib(addr).is_mem_mapped_reg() {
            *value &= self.mem_mapped_mask(addr);
        }
        Ok(())
    }

    /// Dry-run of `write_u64`; reports whether the write would succeed.
    pub fn check_write_u64(&self, addr: usize, value: &mut u64) -> Result<(), MemoryError> {
        self.check_write_val(addr, value)
    }

    /// Shared checks for the dry-run writes; mutates nothing.
    fn check_write_val<T: MemValue>(&self, addr: usize, _value: &mut T) -> Result<(), MemoryError> {
        self.check_bounds(addr, T::SIZE)?;

        let attrib = self.attrib(addr);
        if !attrib.is_write() {
            return Err(self.denied(AccessKind::Write, addr));
        }

        if addr & (T::SIZE - 1) != 0 {
            let last = addr + T::SIZE - 1;
            if self.page_start(addr) != self.page_start(last) {
                let attrib2 = self.attrib(last);
                if !attrib2.is_write() {
                    return Err(self.denied(AccessKind::Write, last));
                }
                if attrib.is_dccm() != attrib2.is_dccm() {
                    return Err(MemoryError::BoundaryViolation { addr });
                }
                if attrib.is_mem_mapped_reg() != attrib2.is_mem_mapped_reg() {
                    return Err(MemoryError::BoundaryViolation { addr });
                }
            }
        }

        if attrib.is_mem_mapped_reg() {
            if T::SIZE != 4 {
                return Err(MemoryError::MmrSizeViolation {
                    addr,
                    size: T::SIZE,
                });
            }
            if addr & 3 != 0 {
                return Err(MemoryError::MmrAlignment { addr });
            }
        }

        Ok(())
    }

    // ── Pokes ────────────────────────────────────────────────────────────

    /// Writes one byte without journaling; used by debuggers. Any mapped
    /// page is poke-writable except memory-mapped-register pages.
    pub fn poke_u8(&mut self, addr: usize, value: u8) -> Result<(), MemoryError> {
        self.poke_val(addr, value)
    }

    /// Writes a half-word without journaling.
    pub fn poke_u16(&mut self, addr: usize, value: u16) -> Result<(), MemoryError> {
        self.poke_val(addr, value)
    }

    /// Writes a word without journaling. Pokes bypass write masks, so debug
    /// tools can set read-only register bits.
    pub fn poke_u32(&mut self, addr: usize, value: u32) -> Result<(), MemoryError> {
        self.poke_val(addr, value)
    }

    /// Writes a double-word without journaling.
    pub fn poke_u64(&mut self, addr: usize, value: u64) -> Result<(), MemoryError> {
        self.poke_val(addr, value)
    }

    /// Typed poke: requires mapped pages only, never journals, and never
    /// invalidates reservations.
    fn poke_val<T: MemValue>(&mut self, addr: usize, value: T) -> Result<(), MemoryError> {
        self.check_bounds(addr, T::SIZE)?;

        let attrib = self.attrib(addr);
        if !attrib.is_mapped() {
            return Err(self.denied(AccessKind::Poke, addr));
        }

        let page_end = self.page_start(addr) + self.page_size;
        if addr + T::SIZE > page_end {
            let attrib2 = self.attrib(addr + T::SIZE - 1);
            if !attrib2.is_mapped() {
                return Err(self.denied(AccessKind::Poke, addr + T::SIZE - 1));
            }
        }

        if attrib.is_mem_mapped_reg() {
            if T::SIZE != 4 {
                return Err(MemoryError::MmrSizeViolation {
                    addr,
                    size: T::SIZE,
                });
            }
            if addr & 3 != 0 {
                return Err(MemoryError::MmrAlignment { addr });
            }
        }

        value.write_le(self.data.slice_mut(addr, T::SIZE));
        Ok(())
    }

    /// Writes one byte bypassing the write-permission check; used by the
    /// image loaders to initialize memory. The page must be mapped, and a
    /// byte landing on a memory-mapped-register word is masked by that
    /// word's byte lane.
    pub fn write_byte_no_access_check(
        &mut self,
        addr: usize,
        value: u8,
    ) -> Result<(), MemoryError> {
        if addr >= self.size {
            return Err(MemoryError::OutOfBounds { addr });
        }
        if !self.attrib(addr).is_mapped() {
            return Err(self.denied(AccessKind::Poke, addr));
        }

        let mask = self.mem_mapped_mask(addr);
        let lane = addr & 3;
        let masked = value & (mask >> (lane * 8)) as u8;

        self.data.write_u8(addr, masked);
        Ok(())
    }

    /// Copies data from `other` into this memory. If the two memories have
    /// different sizes, bytes are copied from location zero up to the
    /// smaller size.
    pub fn copy_from(&mut self, other: &Memory) {
        let n = self.size.min(other.size);
        let src = other.data.slice(0, n);
        self.data.write_slice(0, src);
    }

    // ── Memory-mapped register helpers ───────────────────────────────────

    /// Returns the write mask of the word containing the given address, or
    /// all-ones when no mask was defined for it.
    pub(crate) fn mem_mapped_mask(&self, addr: usize) -> u32 {
        if self.masks.is_empty() {
            return !0;
        }
        let page_ix = self.page_index(addr);
        let page_masks = &self.masks[page_ix];
        if page_masks.is_empty() {
            return !0;
        }
        let word_ix = (addr - self.page_start(addr)) / 4;
        page_masks[word_ix]
    }

    /// Commits a word to a memory-mapped register: applies the write mask,
    /// journals the masked value, and records the pre-write word.
    fn write_register(&mut self, hart: usize, addr: usize, value: u32) -> Result<(), MemoryError> {
        if addr & 3 != 0 {
            return Err(MemoryError::MmrAlignment { addr });
        }

        let masked = value & self.mem_mapped_mask(addr);
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.data.slice(addr, 4));
        let prev = u32::from_le_bytes(raw);
        masked.write_le(self.data.slice_mut(addr, 4));
        self.record_write(hart, addr, 4, masked as u64, prev as u64);
        Ok(())
    }

    // ── Internal plumbing ────────────────────────────────────────────────

    /// Fails with `OutOfBounds` unless `size` bytes at `addr` fit in memory.
    #[inline(always)]
    fn check_bounds(&self, addr: usize, size: usize) -> Result<(), MemoryError> {
        if addr >= self.size || self.size - addr < size {
            return Err(MemoryError::OutOfBounds { addr });
        }
        Ok(())
    }

    /// Maps a failed attribute check to the reported error kind.
    fn denied(&self, kind: AccessKind, addr: usize) -> MemoryError {
        if self.page_index(addr) >= self.page_count {
            MemoryError::OutOfBounds { addr }
        } else {
            MemoryError::AttributeDenied { kind, addr }
        }
    }

    /// Reads `size` bytes at `addr` zero-extended into a little-endian u64
    /// byte array; used to capture pre-write values for the journal.
    fn read_padded(&self, addr: usize, size: usize) -> [u8; 8] {
        let mut raw = [0u8; 8];
        raw[..size].copy_from_slice(self.data.slice(addr, size));
        raw
    }
}
