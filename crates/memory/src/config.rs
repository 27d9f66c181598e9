//! Memory geometry configuration.
//!
//! This module defines the settings the memory subsystem is constructed from.
//! It provides:
//! 1. **Defaults:** Baseline geometry constants (memory, page, and region sizes).
//! 2. **`MemoryConfig`:** Deserializable settings struct for the JSON front-end.
//!
//! The constructor normalizes whatever it is given (power-of-two rounding,
//! minimum sizes) and logs each adjustment, so a slightly-off configuration
//! degrades to a usable geometry instead of failing.

use serde::Deserialize;

/// Default geometry constants used when a setting is absent.
pub mod defaults {
    /// Total simulated memory size (128 MiB).
    pub const MEMORY_SIZE: usize = 128 * 1024 * 1024;

    /// Page size: the granularity of access attributes and write masks (4 KiB).
    pub const PAGE_SIZE: usize = 4 * 1024;

    /// Region size: the granularity of ICCM/DCCM/PIC configuration (256 MiB).
    pub const REGION_SIZE: usize = 256 * 1024 * 1024;

    /// Number of hardware threads sharing the memory.
    pub const HART_COUNT: usize = 1;
}

/// Settings for constructing a [`Memory`](crate::Memory).
///
/// Deserialized from the simulator's JSON configuration; any field may be
/// omitted and falls back to the matching [`defaults`] constant.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MemoryConfig {
    /// Simulated memory size in bytes. Truncated to a multiple of 4 and
    /// rounded up to a whole number of pages at construction.
    pub size: usize,

    /// Page size in bytes; must be a power of two (rounded down otherwise).
    pub page_size: usize,

    /// Region size in bytes; must be a power of two no smaller than the page
    /// size (adjusted otherwise).
    pub region_size: usize,

    /// Number of harts; sizes the per-hart reservation and write-journal
    /// tables. Zero is treated as one.
    pub hart_count: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            size: defaults::MEMORY_SIZE,
            page_size: defaults::PAGE_SIZE,
            region_size: defaults::REGION_SIZE,
            hart_count: defaults::HART_COUNT,
        }
    }
}

impl MemoryConfig {
    /// Returns a config with the given memory size and default geometry.
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }
}
