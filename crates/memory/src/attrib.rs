//! Per-page access attributes.
//!
//! Every page of the simulated address space owns one packed attribute byte
//! with six flag bits: `read`, `write`, `exec`, and the ICCM/DCCM/PIC tags.
//! One byte per page keeps the attribute table compact when the configured
//! page size is small (64-byte pages over a multi-gigabyte space produce tens
//! of millions of entries).

const READ: u8 = 1 << 0;
const WRITE: u8 = 1 << 1;
const EXEC: u8 = 1 << 2;
const REG: u8 = 1 << 3;
const ICCM: u8 = 1 << 4;
const DCCM: u8 = 1 << 5;

/// Packed access attributes of one page.
///
/// A default-constructed value has every flag clear, which is also the
/// attribute reported for addresses outside the simulated address space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageAttribs(u8);

impl PageAttribs {
    /// Returns attributes for an ordinary RAM page: readable, writable, and
    /// executable, with no ICCM/DCCM/PIC tagging. Fresh memory starts with
    /// every page in this state.
    pub fn rwx() -> Self {
        Self(READ | WRITE | EXEC)
    }

    /// True if the page can be read by load instructions.
    #[inline(always)]
    pub fn is_read(self) -> bool {
        self.0 & READ != 0
    }

    /// True if the page can be written by store instructions.
    #[inline(always)]
    pub fn is_write(self) -> bool {
        self.0 & WRITE != 0
    }

    /// True if the page can be used for instruction fetch.
    #[inline(always)]
    pub fn is_exec(self) -> bool {
        self.0 & EXEC != 0
    }

    /// True if the page contains memory-mapped (PIC) registers.
    #[inline(always)]
    pub fn is_mem_mapped_reg(self) -> bool {
        self.0 & REG != 0
    }

    /// True if the page belongs to an ICCM section.
    #[inline(always)]
    pub fn is_iccm(self) -> bool {
        self.0 & ICCM != 0
    }

    /// True if the page belongs to a DCCM section.
    #[inline(always)]
    pub fn is_dccm(self) -> bool {
        self.0 & DCCM != 0
    }

    /// True if the page is usable at all (readable, writable, or executable).
    #[inline(always)]
    pub fn is_mapped(self) -> bool {
        self.0 & (READ | WRITE | EXEC) != 0
    }

    /// True if the page is external to the core (neither DCCM nor PIC).
    #[inline(always)]
    pub fn is_external(self) -> bool {
        self.0 & (DCCM | REG) == 0
    }

    /// Mark the page readable or non-readable.
    pub fn set_read(&mut self, flag: bool) {
        self.set(READ, flag);
    }

    /// Mark the page writable or non-writable.
    pub fn set_write(&mut self, flag: bool) {
        self.set(WRITE, flag);
    }

    /// Mark the page usable or unusable for instruction fetch.
    pub fn set_exec(&mut self, flag: bool) {
        self.set(EXEC, flag);
    }

    /// Mark the page as holding memory-mapped registers.
    pub fn set_mem_mapped_reg(&mut self, flag: bool) {
        self.set(REG, flag);
    }

    /// Mark the page as belonging to an ICCM section.
    pub fn set_iccm(&mut self, flag: bool) {
        self.set(ICCM, flag);
    }

    /// Mark the page as belonging to a DCCM section.
    pub fn set_dccm(&mut self, flag: bool) {
        self.set(DCCM, flag);
    }

    #[inline(always)]
    fn set(&mut self, bit: u8, flag: bool) {
        if flag {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}
