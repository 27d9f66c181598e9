//! Error definitions for the memory subsystem.
//!
//! This module defines the single error type surfaced by all memory APIs. It covers:
//! 1. **Access faults:** Out-of-bounds, attribute denial, and CCM/PIC boundary crossing.
//! 2. **Memory-mapped registers:** Size and alignment violations on PIC pages.
//! 3. **Configuration:** Invalid or overlapping ICCM/DCCM/PIC definitions.
//! 4. **Image loading:** Malformed hex/ELF input, unmapped target bytes, class mismatch.
//!
//! The execution engine is expected to convert access faults into the matching
//! RISC-V exception (access fault or misaligned load/store).

use std::fmt;

use thiserror::Error;

/// The kind of memory operation that was attempted.
///
/// Carried inside [`MemoryError::AttributeDenied`] so diagnostics can name the
/// page permission that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    /// Data load (`read` permission).
    Read,
    /// Data store (`write` permission).
    Write,
    /// Instruction fetch (`exec` permission).
    Fetch,
    /// Debugger or loader poke (any mapping suffices).
    Poke,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Read => write!(f, "read"),
            AccessKind::Write => write!(f, "write"),
            AccessKind::Fetch => write!(f, "fetch"),
            AccessKind::Poke => write!(f, "poke"),
        }
    }
}

/// Errors reported by access primitives, configuration calls, and image loaders.
///
/// Access primitives never abort; every failure is reported to the caller
/// through this type. Configuration and loader failures additionally emit a
/// diagnostic on the log error channel.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    /// The access extends past the end of the simulated address space.
    #[error("address {addr:#x} is out of memory bounds")]
    OutOfBounds {
        /// First out-of-bounds byte address.
        addr: usize,
    },

    /// The page containing the address does not permit the attempted operation.
    #[error("{kind} access denied at address {addr:#x}")]
    AttributeDenied {
        /// Operation that was attempted.
        kind: AccessKind,
        /// Faulting byte address.
        addr: usize,
    },

    /// A misaligned access crosses a DCCM, ICCM, or PIC boundary.
    #[error("access at {addr:#x} crosses a closely-coupled memory boundary")]
    BoundaryViolation {
        /// Address of the offending access.
        addr: usize,
    },

    /// Non-word-sized access to a memory-mapped-register page.
    #[error("{size}-byte access to memory mapped register at {addr:#x}; only word access allowed")]
    MmrSizeViolation {
        /// Address of the offending access.
        addr: usize,
        /// Size of the offending access in bytes.
        size: usize,
    },

    /// Word access to a memory-mapped register at a non-word-aligned address.
    #[error("misaligned word access to memory mapped register at {addr:#x}")]
    MmrAlignment {
        /// Address of the offending access.
        addr: usize,
    },

    /// An ICCM/DCCM/PIC definition claims pages owned by an earlier definition.
    #[error("{tag} area at address {addr:#x} overlaps a previously defined area")]
    OverlapDefinition {
        /// Kind of area being defined ("ICCM", "DCCM", or "PIC memory").
        tag: &'static str,
        /// Start address of the rejected definition.
        addr: usize,
    },

    /// An ICCM/DCCM/PIC definition has a bad region, size, or alignment.
    #[error("invalid {tag} definition: {reason}")]
    InvalidCcmConfig {
        /// Kind of area being defined ("ICCM", "DCCM", or "PIC memory").
        tag: &'static str,
        /// Human-readable reason for the rejection.
        reason: String,
    },

    /// A hex or ELF image could not be read or parsed.
    #[error("malformed image file {path}: {reason}")]
    MalformedImage {
        /// Path of the offending file.
        path: String,
        /// Human-readable reason for the rejection.
        reason: String,
    },

    /// An image byte targets an unmapped page (with unmapped checking enabled).
    #[error("image byte at address {addr:#x} targets unmapped memory")]
    UnmappedImageByte {
        /// First unmapped target address.
        addr: usize,
    },

    /// ELF class (32/64-bit) does not match the configured register width.
    #[error("ELF file {path} is {found}; expecting {expected}-bit class")]
    ClassMismatch {
        /// Path of the offending file.
        path: String,
        /// Register width the memory was asked to load for.
        expected: u32,
        /// Class actually found in the file header.
        found: String,
    },

    /// `load_elf_file` was called with a register width other than 32 or 64.
    #[error("unsupported register width {0}; expecting 32 or 64")]
    UnsupportedRegisterWidth(u32),
}
