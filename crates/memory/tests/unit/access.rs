//! Typed access primitive tests.
//!
//! Round trips for every access width, little-endian byte order, attribute
//! denial on unmapped and permission-restricted pages, out-of-bounds
//! reporting, and the poke paths that bypass write permissions.

use swervsim_memory::{AccessKind, MemoryError};

use crate::common::{mem_8mb, mem_8mb_2harts};

#[test]
fn round_trip_every_width() {
    let mut mem = mem_8mb();
    mem.write_u8(0, 0x1000, 0xab).unwrap();
    assert_eq!(mem.read_u8(0x1000).unwrap(), 0xab);

    mem.write_u16(0, 0x1002, 0xbeef).unwrap();
    assert_eq!(mem.read_u16(0x1002).unwrap(), 0xbeef);

    mem.write_u32(0, 0x1004, 0xdead_beef).unwrap();
    assert_eq!(mem.read_u32(0x1004).unwrap(), 0xdead_beef);

    mem.write_u64(0, 0x1008, 0x0123_4567_89ab_cdef).unwrap();
    assert_eq!(mem.read_u64(0x1008).unwrap(), 0x0123_4567_89ab_cdef);
}

#[test]
fn values_are_stored_little_endian() {
    let mut mem = mem_8mb();
    mem.write_u32(0, 0x2000, 0x1122_3344).unwrap();
    assert_eq!(mem.read_u8(0x2000).unwrap(), 0x44);
    assert_eq!(mem.read_u8(0x2001).unwrap(), 0x33);
    assert_eq!(mem.read_u8(0x2002).unwrap(), 0x22);
    assert_eq!(mem.read_u8(0x2003).unwrap(), 0x11);
}

#[test]
fn misaligned_access_within_page_is_allowed() {
    let mut mem = mem_8mb();
    mem.write_u32(0, 0x1001, 0xcafe_f00d).unwrap();
    assert_eq!(mem.read_u32(0x1001).unwrap(), 0xcafe_f00d);
    mem.write_u64(0, 0x1013, 0x1122_3344_5566_7788).unwrap();
    assert_eq!(mem.read_u64(0x1013).unwrap(), 0x1122_3344_5566_7788);
}

#[test]
fn out_of_bounds_accesses_fail() {
    let mut mem = mem_8mb();
    let size = mem.size();

    assert_eq!(
        mem.read_u8(size),
        Err(MemoryError::OutOfBounds { addr: size })
    );
    assert_eq!(
        mem.read_u32(size - 2),
        Err(MemoryError::OutOfBounds { addr: size - 2 })
    );
    assert_eq!(
        mem.write_u64(0, size - 4, 0),
        Err(MemoryError::OutOfBounds { addr: size - 4 })
    );
    assert_eq!(mem.poke_u8(size, 0), Err(MemoryError::OutOfBounds { addr: size }));
}

#[test]
fn last_word_of_memory_is_accessible() {
    let mut mem = mem_8mb();
    let size = mem.size();
    mem.write_u64(0, size - 8, 0x55aa_55aa_55aa_55aa).unwrap();
    assert_eq!(mem.read_u64(size - 8).unwrap(), 0x55aa_55aa_55aa_55aa);
}

#[test]
fn unconfigured_pages_deny_access_after_region_setup() {
    let mut mem = mem_8mb();
    // Configuring any window flips the rest of the region to unmapped.
    mem.define_dccm(0, 0x10000, 0x1000).unwrap();

    assert_eq!(
        mem.read_u8(0x5000),
        Err(MemoryError::AttributeDenied {
            kind: AccessKind::Read,
            addr: 0x5000
        })
    );
    assert_eq!(
        mem.write_u32(0, 0x5000, 1),
        Err(MemoryError::AttributeDenied {
            kind: AccessKind::Write,
            addr: 0x5000
        })
    );
    assert_eq!(
        mem.fetch_u32(0x5000),
        Err(MemoryError::AttributeDenied {
            kind: AccessKind::Fetch,
            addr: 0x5000
        })
    );
}

#[test]
fn fetch_requires_exec_permission() {
    let mut mem = mem_8mb();
    mem.define_dccm(0, 0x10000, 0x1000).unwrap();

    // DCCM pages are data-only.
    assert!(matches!(
        mem.fetch_u16(0x10000),
        Err(MemoryError::AttributeDenied {
            kind: AccessKind::Fetch,
            ..
        })
    ));
}

#[test]
fn fetch_reads_what_the_loader_wrote() {
    let mut mem = mem_8mb();
    mem.define_iccm(0, 0x4000, 0x1000).unwrap();

    mem.write_byte_no_access_check(0x4000, 0x13).unwrap();
    assert_eq!(mem.fetch_u32(0x4000).unwrap(), 0x0000_0013);
    assert_eq!(mem.fetch_u16(0x4000).unwrap(), 0x0013);
}

#[test]
fn iccm_pages_reject_stores() {
    let mut mem = mem_8mb();
    mem.define_iccm(0, 0x4000, 0x1000).unwrap();

    assert!(matches!(
        mem.write_u32(0, 0x4000, 1),
        Err(MemoryError::AttributeDenied {
            kind: AccessKind::Write,
            ..
        })
    ));
}

#[test]
fn poke_succeeds_where_write_is_denied() {
    let mut mem = mem_8mb();
    mem.define_iccm(0, 0x4000, 0x1000).unwrap();

    // ICCM is mapped but not writable; poke only needs the mapping.
    mem.poke_u32(0x4000, 0x0000_0013).unwrap();
    assert_eq!(mem.fetch_u32(0x4000).unwrap(), 0x0000_0013);
}

#[test]
fn poke_fails_on_unmapped_pages() {
    let mut mem = mem_8mb();
    mem.define_dccm(0, 0x10000, 0x1000).unwrap();

    assert!(matches!(
        mem.poke_u32(0x5000, 1),
        Err(MemoryError::AttributeDenied {
            kind: AccessKind::Poke,
            ..
        })
    ));
}

#[test]
fn poke_does_not_journal_and_does_not_invalidate() {
    let mut mem = mem_8mb_2harts();
    mem.make_lr(0, 0x1000, 4);

    mem.poke_u32(0x1000, 0xffff_ffff).unwrap();

    assert_eq!(mem.last_write_new(1).2, 0);
    assert!(mem.has_lr(0, 0x1000), "poke must not cancel reservations");
}

#[test]
fn check_write_reports_without_committing() {
    let mut mem = mem_8mb();
    mem.write_u32(0, 0x3000, 0x1111_1111).unwrap();
    mem.clear_last_write(0);

    let mut value = 0x2222_2222u32;
    mem.check_write_u32(0x3000, &mut value).unwrap();

    assert_eq!(value, 0x2222_2222);
    assert_eq!(mem.read_u32(0x3000).unwrap(), 0x1111_1111);
    assert_eq!(mem.last_write_new(0).2, 0);
}

#[test]
fn check_write_fails_like_write() {
    let mut mem = mem_8mb();
    mem.define_dccm(0, 0x10000, 0x1000).unwrap();

    let mut value = 5u32;
    assert!(matches!(
        mem.check_write_u32(0x5000, &mut value),
        Err(MemoryError::AttributeDenied {
            kind: AccessKind::Write,
            ..
        })
    ));

    let mut half = 5u16;
    assert!(mem.check_write_u16(mem.size(), &mut half).is_err());
}

#[test]
fn write_byte_no_access_check_ignores_write_permission() {
    let mut mem = mem_8mb();
    mem.define_iccm(0, 0x4000, 0x1000).unwrap();

    mem.write_byte_no_access_check(0x4001, 0x77).unwrap();
    assert_eq!(mem.read_u8(0x4001).unwrap(), 0x77);
}

#[test]
fn write_byte_no_access_check_requires_mapping() {
    let mut mem = mem_8mb();
    mem.define_dccm(0, 0x10000, 0x1000).unwrap();

    assert!(mem.write_byte_no_access_check(0x5000, 1).is_err());
    assert!(matches!(
        mem.write_byte_no_access_check(mem.size(), 1),
        Err(MemoryError::OutOfBounds { .. })
    ));
}

#[test]
fn copy_from_duplicates_contents() {
    let mut a = mem_8mb();
    let mut b = mem_8mb();
    a.write_u64(0, 0x1000, 0xfeed_face_dead_beef).unwrap();

    b.copy_from(&a);
    assert_eq!(b.read_u64(0x1000).unwrap(), 0xfeed_face_dead_beef);
}
