//! Image loader tests.
//!
//! Intel-hex parsing against on-disk fixtures, ELF loading through the real
//! parser with a hand-assembled ELF32 image, the static probes, and the
//! symbol queries.

use swervsim_memory::{
    check_elf_file, elf_file_address_bounds, is_symbol_in_elf_file, ElfSymbol, MemoryError,
};

use crate::common::elf_fixture::tiny_elf32;
use crate::common::{mem_8mb, mem_8mb_2harts, path_str, temp_file};

// ─── Intel hex ───────────────────────────────────────────

#[test]
fn hex_bytes_are_written_from_the_cursor() {
    let mut mem = mem_8mb();
    let file = temp_file(b"@1000\n01 02 03 04\nff\n");

    mem.load_hex_file(path_str(&file)).unwrap();

    assert_eq!(mem.read_u32(0x1000).unwrap(), 0x0403_0201);
    assert_eq!(mem.read_u8(0x1004).unwrap(), 0xff);
}

#[test]
fn hex_cursor_can_move_between_sections() {
    let mut mem = mem_8mb();
    let file = temp_file(b"@1000\naa\n@2000\nbb\n\n@1001\ncc\n");

    mem.load_hex_file(path_str(&file)).unwrap();

    assert_eq!(mem.read_u8(0x1000).unwrap(), 0xaa);
    assert_eq!(mem.read_u8(0x1001).unwrap(), 0xcc);
    assert_eq!(mem.read_u8(0x2000).unwrap(), 0xbb);
}

#[test]
fn hex_starts_writing_at_address_zero_by_default() {
    let mut mem = mem_8mb();
    let file = temp_file(b"12 34\n");

    mem.load_hex_file(path_str(&file)).unwrap();
    assert_eq!(mem.read_u8(0).unwrap(), 0x12);
    assert_eq!(mem.read_u8(1).unwrap(), 0x34);
}

#[test]
fn hex_rejects_bad_addresses_and_tokens() {
    let mut mem = mem_8mb();

    let file = temp_file(b"@zz\n01\n");
    assert!(matches!(
        mem.load_hex_file(path_str(&file)),
        Err(MemoryError::MalformedImage { .. })
    ));

    let file = temp_file(b"@1000\n01 xy 03\n");
    assert!(mem.load_hex_file(path_str(&file)).is_err());

    // A token wider than one byte is invalid data.
    let file = temp_file(b"@1000\n1ff\n");
    assert!(mem.load_hex_file(path_str(&file)).is_err());
}

#[test]
fn hex_bytes_before_the_first_error_stay_loaded() {
    let mut mem = mem_8mb();
    let file = temp_file(b"@1000\naa bb\nqq\n@2000\ncc\n");

    assert!(mem.load_hex_file(path_str(&file)).is_err());

    // Partial image stays in place; nothing after the error is written.
    assert_eq!(mem.read_u8(0x1000).unwrap(), 0xaa);
    assert_eq!(mem.read_u8(0x1001).unwrap(), 0xbb);
    assert_eq!(mem.read_u8(0x2000).unwrap(), 0);
}

#[test]
fn hex_rejects_out_of_bounds_addresses() {
    let mut mem = mem_8mb();
    let content = format!("@{:x}\n01 02\n", mem.size());
    let file = temp_file(content.as_bytes());

    assert!(mem.load_hex_file(path_str(&file)).is_err());
}

#[test]
fn hex_missing_file_fails() {
    let mut mem = mem_8mb();
    assert!(matches!(
        mem.load_hex_file("/nonexistent/image.hex"),
        Err(MemoryError::MalformedImage { .. })
    ));
}

// ─── ELF loading ─────────────────────────────────────────

/// NOP at 0x1000 with `_start` covering it.
fn nop_elf() -> Vec<u8> {
    tiny_elf32(
        0x1000,
        0x1000,
        &0x0000_0013u32.to_le_bytes(),
        &[("_start", 0x1000, 4)],
    )
}

#[test]
fn elf_load_reports_entry_and_end() {
    let mut mem = mem_8mb();
    let file = temp_file(&nop_elf());

    let (entry, end) = mem.load_elf_file(path_str(&file), 32).unwrap();

    assert_eq!(entry, 0x1000);
    assert_eq!(end, 0x1004);
    assert_eq!(mem.read_u32(0x1000).unwrap(), 0x0000_0013);
}

#[test]
fn elf_load_collects_symbols() {
    let mut mem = mem_8mb();
    let code = [0x13u8, 0, 0, 0, 0x13, 0, 0, 0];
    let image = tiny_elf32(
        0x1000,
        0x1000,
        &code,
        &[("_start", 0x1000, 4), ("main", 0x1004, 4)],
    );
    let file = temp_file(&image);

    mem.load_elf_file(path_str(&file), 32).unwrap();

    assert_eq!(
        mem.find_symbol("_start"),
        Some(ElfSymbol {
            addr: 0x1000,
            size: 4
        })
    );
    assert_eq!(
        mem.find_symbol("main"),
        Some(ElfSymbol {
            addr: 0x1004,
            size: 4
        })
    );
    assert_eq!(mem.find_symbol("missing"), None);
}

#[test]
fn elf_load_scrubs_every_journal() {
    let mut mem = mem_8mb_2harts();
    mem.write_u32(0, 0x4000, 1).unwrap();
    mem.write_u32(1, 0x4000, 2).unwrap();

    let file = temp_file(&nop_elf());
    mem.load_elf_file(path_str(&file), 32).unwrap();

    assert_eq!(mem.last_write_new(0).2, 0);
    assert_eq!(mem.last_write_new(1).2, 0);
}

#[test]
fn elf_class_must_match_register_width() {
    let mut mem = mem_8mb();
    let file = temp_file(&nop_elf());

    assert!(matches!(
        mem.load_elf_file(path_str(&file), 64),
        Err(MemoryError::ClassMismatch { expected: 64, .. })
    ));
    assert_eq!(
        mem.load_elf_file(path_str(&file), 16),
        Err(MemoryError::UnsupportedRegisterWidth(16))
    );
}

#[test]
fn elf_into_unmapped_page_fails_by_default() {
    let mut mem = mem_8mb();
    // Configure the region so the page at 0x1000 is unmapped.
    mem.define_dccm(0, 0x10000, 0x1000).unwrap();
    let file = temp_file(&nop_elf());

    assert_eq!(
        mem.load_elf_file(path_str(&file), 32),
        Err(MemoryError::UnmappedImageByte { addr: 0x1000 })
    );
}

#[test]
fn elf_into_unmapped_page_is_skipped_when_checking_is_off() {
    let mut mem = mem_8mb();
    mem.define_dccm(0, 0x10000, 0x1000).unwrap();
    mem.check_unmapped_elf(false);
    let file = temp_file(&nop_elf());

    let (entry, end) = mem.load_elf_file(path_str(&file), 32).unwrap();
    assert_eq!((entry, end), (0x1000, 0x1004));
    // The unmapped bytes were dropped, not written.
    assert!(mem.read_u32(0x1000).is_err());
}

#[test]
fn elf_rejects_garbage_files() {
    let mut mem = mem_8mb();
    let file = temp_file(b"this is not an elf file");

    assert!(matches!(
        mem.load_elf_file(path_str(&file), 32),
        Err(MemoryError::MalformedImage { .. })
    ));
}

// ─── Symbol queries ──────────────────────────────────────

#[test]
fn find_function_matches_containing_symbol() {
    let mut mem = mem_8mb();
    let code = [0u8; 16];
    let image = tiny_elf32(0x1000, 0x1000, &code, &[("outer", 0x1000, 16), ("inner", 0x1004, 4)]);
    let file = temp_file(&image);
    mem.load_elf_file(path_str(&file), 32).unwrap();

    let (name, sym) = mem.find_function(0x1002).unwrap();
    assert_eq!((name, sym.addr), ("outer", 0x1000));

    // Inside the nested symbol the smaller one wins.
    let (name, _) = mem.find_function(0x1005).unwrap();
    assert_eq!(name, "inner");

    assert!(mem.find_function(0x2000).is_none());
}

#[test]
fn print_symbols_lists_name_and_address() {
    let mut mem = mem_8mb();
    let file = temp_file(&nop_elf());
    mem.load_elf_file(path_str(&file), 32).unwrap();

    let mut out = Vec::new();
    mem.print_symbols(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("_start 0x1000"));
}

// ─── Static probes ───────────────────────────────────────

#[test]
fn probe_reports_class_and_machine() {
    let file = temp_file(&nop_elf());
    let info = check_elf_file(path_str(&file)).unwrap();

    assert!(info.is_32bit);
    assert!(!info.is_64bit);
    assert!(info.is_riscv);
}

#[test]
fn probe_reports_segment_bounds() {
    let file = temp_file(&nop_elf());
    let (min_addr, max_addr) = elf_file_address_bounds(path_str(&file)).unwrap();

    assert_eq!(min_addr, 0x1000);
    assert_eq!(max_addr, 0x1004);
}

#[test]
fn probe_finds_symbols_without_loading() {
    let file = temp_file(&nop_elf());

    assert!(is_symbol_in_elf_file(path_str(&file), "_start"));
    assert!(!is_symbol_in_elf_file(path_str(&file), "main"));
    assert!(!is_symbol_in_elf_file("/nonexistent/app.elf", "_start"));
}

#[test]
fn probe_rejects_non_elf_files() {
    let file = temp_file(b"plain text");
    assert!(check_elf_file(path_str(&file)).is_err());
    assert!(elf_file_address_bounds(path_str(&file)).is_err());
    assert!(!is_symbol_in_elf_file(path_str(&file), "_start"));
}
