//! Physical memory subsystem for a SweRV-class RISC-V instruction-set simulator.
//!
//! This crate models a flat byte-addressable physical address space partitioned
//! into regions and pages, and provides everything the execution engine needs
//! to load, store, fetch, and run atomics against it:
//! 1. **Backing store:** Contiguous zero-initialized RAM buffer (`mmap`-backed on Unix).
//! 2. **Attributes:** Per-page access permissions plus ICCM/DCCM/PIC tagging.
//! 3. **Access engine:** Typed read/write/fetch/poke primitives with boundary,
//!    alignment, and memory-mapped-register masking checks.
//! 4. **LR/SC:** Per-hart reservations with cross-hart invalidation on stores.
//! 5. **Write journal:** Per-hart last-write records for rollback and tracing.
//! 6. **Image loading:** Intel-hex and ELF (32/64) loaders plus a symbol table.

/// Per-page access attributes (packed, one byte per page).
pub mod attrib;
/// Zero-initialized RAM buffer backing the simulated address space.
pub mod buffer;
/// Region, CCM, and memory-mapped-register configuration.
mod ccm;
/// Memory geometry configuration (sizes, hart count, JSON front-end).
pub mod config;
/// Error kinds surfaced by access, configuration, and image loading.
pub mod error;
/// Per-hart last-write journal.
mod journal;
/// Intel-hex and ELF image loaders and symbol queries.
pub mod loader;
/// The memory engine: construction, geometry, and access primitives.
pub mod memory;
/// Per-hart LR/SC reservation tracking.
mod reservation;
/// Little-endian value encoding for the typed access primitives.
mod value;

pub use attrib::PageAttribs;
pub use config::MemoryConfig;
pub use error::{AccessKind, MemoryError};
pub use loader::elf::{
    check_elf_file, elf_file_address_bounds, is_symbol_in_elf_file, ElfFileInfo, ElfSymbol,
};
pub use memory::Memory;
