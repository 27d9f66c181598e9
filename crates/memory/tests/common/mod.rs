//! Shared test infrastructure.
//!
//! Provides memory builders for the geometry the scenario tests use
//! (4 KiB pages, 256 MiB regions) and fixture writers for on-disk hex and
//! ELF images.


use std::io::Write;

use tempfile::NamedTempFile;

use swervsim_memory::{Memory, MemoryConfig};

/// One mebibyte.
pub const MB: usize = 1024 * 1024;

/// Builds a memory with the scenario geometry: 8 MiB total, 4 KiB pages,
/// 256 MiB regions, two harts.
pub fn mem_8mb_2harts() -> Memory {
    let _ = env_logger::builder().is_test(true).try_init();
    Memory::new(&MemoryConfig {
        size: 8 * MB,
        page_size: 4096,
        region_size: 256 * MB,
        hart_count: 2,
    })
}

/// Builds a memory with the scenario geometry and a single hart.
pub fn mem_8mb() -> Memory {
    let _ = env_logger::builder().is_test(true).try_init();
    Memory::new(&MemoryConfig {
        size: 8 * MB,
        page_size: 4096,
        region_size: 256 * MB,
        hart_count: 1,
    })
}

/// Writes `content` to a fresh temporary file and returns its handle; the
/// file lives until the handle is dropped.
pub fn temp_file(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(content).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

/// Path of a temporary file as a `&str`.
pub fn path_str(file: &NamedTempFile) -> &str {
    file.path().to_str().expect("utf-8 temp path")
}
