//! ELF image loading, probing, and symbol queries.
//!
//! Parses 32-bit and 64-bit little-endian RISC-V ELF executables with the
//! `elf` crate. Loading copies every `PT_LOAD` segment's file bytes to its
//! virtual address through the access-check-bypassing byte writer, records
//! the entry point and the highest written address, and collects every named
//! function/object symbol into the memory's symbol table. Static probes
//! answer class, bounds, and symbol-presence questions without touching
//! memory.

use std::fs;
use std::io;

use elf::abi::{EM_RISCV, PT_LOAD, STT_FUNC, STT_NOTYPE, STT_OBJECT};
use elf::endian::AnyEndian;
use elf::file::Class;
use elf::ElfBytes;
use log::{error, warn};

use crate::error::MemoryError;
use crate::memory::Memory;

/// Location and size of an ELF file symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ElfSymbol {
    /// Symbol value (address).
    pub addr: usize,
    /// Symbol size in bytes.
    pub size: usize,
}

/// Header facts reported by [`check_elf_file`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElfFileInfo {
    /// True if the file is a 32-bit ELF.
    pub is_32bit: bool,
    /// True if the file is a 64-bit ELF.
    pub is_64bit: bool,
    /// True if the file targets RISC-V.
    pub is_riscv: bool,
}

/// Logs and builds a `MalformedImage` error.
fn malformed(path: &str, reason: impl ToString) -> MemoryError {
    let reason = reason.to_string();
    error!("malformed ELF file {}: {}", path, reason);
    MemoryError::MalformedImage {
        path: path.to_string(),
        reason,
    }
}

impl Memory {
    /// Enables or disables errors on unmapped memory when loading ELF files.
    /// Enabled by default.
    pub fn check_unmapped_elf(&mut self, flag: bool) {
        self.check_unmapped_elf = flag;
    }

    /// Loads the given ELF file into memory.
    ///
    /// The file's class must match `register_width` (32 or 64) and its
    /// encoding must be little-endian; a non-RISC-V machine only warns.
    /// Every loadable segment is copied byte-wise through
    /// [`write_byte_no_access_check`](Memory::write_byte_no_access_check);
    /// with unmapped checking enabled (the default) a byte landing on an
    /// unmapped page fails the load. Loading scrubs every hart's write
    /// journal, since initialization traffic is not program traffic.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the ELF file.
    /// * `register_width` - Simulated register width; 32 or 64.
    ///
    /// # Returns
    ///
    /// `(entry_point, end)` on success, where `end` is one past the highest
    /// loaded address.
    pub fn load_elf_file(
        &mut self,
        path: &str,
        register_width: u32,
    ) -> Result<(usize, usize), MemoryError> {
        if register_width != 32 && register_width != 64 {
            error!(
                "load_elf_file called with an unsupported register width: {}",
                register_width
            );
            return Err(MemoryError::UnsupportedRegisterWidth(register_width));
        }

        let bytes = fs::read(path).map_err(|e| malformed(path, e))?;
        let file = ElfBytes::<AnyEndian>::minimal_parse(&bytes).map_err(|e| malformed(path, e))?;

        let is32 = file.ehdr.class == Class::ELF32;
        let is64 = file.ehdr.class == Class::ELF64;
        if (register_width == 32 && !is32) || (register_width == 64 && !is64) {
            let found = if is64 {
                "a 64-bit ELF"
            } else if is32 {
                "a 32-bit ELF"
            } else {
                "of unknown ELF class"
            };
            error!(
                "{} is {}; cannot load in {}-bit mode",
                path, found, register_width
            );
            return Err(MemoryError::ClassMismatch {
                path: path.to_string(),
                expected: register_width,
                found: found.to_string(),
            });
        }

        if !matches!(file.ehdr.endianness, AnyEndian::Little) {
            return Err(malformed(path, "only little-endian ELF is supported"));
        }
        if file.ehdr.e_machine != EM_RISCV {
            warn!("{} is not a RISC-V ELF file", path);
        }

        let segments = file
            .segments()
            .ok_or_else(|| malformed(path, "no program headers"))?;

        let mut max_end = 0usize;
        let mut loaded_segs = 0usize;
        let mut overwrites = 0usize;
        let mut first_error: Option<MemoryError> = None;

        for phdr in segments.iter() {
            if phdr.p_type != PT_LOAD {
                continue;
            }
            let vaddr = phdr.p_vaddr as usize;
            let seg_size = phdr.p_filesz as usize;
            let seg_data = file.segment_data(&phdr).map_err(|e| malformed(path, e))?;

            if vaddr.checked_add(seg_size).map_or(true, |e| e > self.size()) {
                error!(
                    "end of ELF segment ({:#x}) is beyond end of simulated memory ({:#x})",
                    vaddr.wrapping_add(seg_size),
                    self.size()
                );
                if self.check_unmapped_elf {
                    first_error.get_or_insert(MemoryError::OutOfBounds { addr: self.size() });
                    continue;
                }
            }

            let mut unmapped_count = 0usize;
            for (i, byte) in seg_data.iter().take(seg_size).enumerate() {
                let addr = vaddr + i;
                if addr < self.size() && self.data.read_u8(addr) != 0 {
                    overwrites += 1;
                }
                if self.write_byte_no_access_check(addr, *byte).is_err() {
                    if unmapped_count == 0 {
                        error!(
                            "failed to copy ELF byte at address {:#x}: \
                             corresponding location is not mapped",
                            addr
                        );
                    }
                    unmapped_count += 1;
                    if self.check_unmapped_elf {
                        first_error.get_or_insert(MemoryError::UnmappedImageByte { addr });
                        break;
                    }
                }
            }

            loaded_segs += 1;
            max_end = max_end.max(vaddr + seg_size);
        }

        if loaded_segs == 0 {
            first_error.get_or_insert(malformed(path, "no loadable segment"));
        }

        // Loading went through the raw byte writer; whatever the journal
        // held before the load is stale either way.
        for hart in 0..self.hart_count() {
            self.clear_last_write(hart);
        }

        if let Some((symtab, strtab)) = file.symbol_table().map_err(|e| malformed(path, e))? {
            for sym in symtab.iter() {
                if sym.st_name == 0 {
                    continue;
                }
                let name = match strtab.get(sym.st_name as usize) {
                    Ok(name) if !name.is_empty() => name,
                    _ => continue,
                };
                let kind = sym.st_symtype();
                if kind == STT_NOTYPE || kind == STT_FUNC || kind == STT_OBJECT {
                    self.symbols.insert(
                        name.to_string(),
                        ElfSymbol {
                            addr: sym.st_value as usize,
                            size: sym.st_size as usize,
                        },
                    );
                }
            }
        }

        if overwrites > 0 {
            warn!(
                "file {}: overwrote previously loaded data changing {} or more bytes",
                path, overwrites
            );
        }

        match first_error {
            None => Ok((file.ehdr.e_entry as usize, max_end)),
            Some(e) => Err(e),
        }
    }

    /// Looks up an ELF symbol by name. Symbols are collected from every ELF
    /// file loaded so far.
    pub fn find_symbol(&self, name: &str) -> Option<ElfSymbol> {
        self.symbols.get(name).copied()
    }

    /// Finds the function symbol whose `[addr, addr + size)` range contains
    /// the given address. When nested symbols match, the smallest one wins.
    pub fn find_function(&self, addr: usize) -> Option<(&str, ElfSymbol)> {
        self.symbols
            .iter()
            .filter(|(_, sym)| addr >= sym.addr && addr - sym.addr < sym.size)
            .min_by_key(|(_, sym)| sym.size)
            .map(|(name, sym)| (name.as_str(), *sym))
    }

    /// Prints the collected ELF symbols on the given stream, one
    /// `name address` pair per line.
    pub fn print_symbols<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        for (name, sym) in &self.symbols {
            writeln!(out, "{} 0x{:x}", name, sym.addr)?;
        }
        Ok(())
    }
}

/// Returns the minimum and maximum addresses covered by the loadable
/// segments of the given ELF file, without loading it.
pub fn elf_file_address_bounds(path: &str) -> Result<(usize, usize), MemoryError> {
    let bytes = fs::read(path).map_err(|e| malformed(path, e))?;
    let file = ElfBytes::<AnyEndian>::minimal_parse(&bytes).map_err(|e| malformed(path, e))?;
    let segments = file
        .segments()
        .ok_or_else(|| malformed(path, "no program headers"))?;

    let mut min_bound = usize::MAX;
    let mut max_bound = 0usize;
    let mut valid_segs = 0usize;
    for phdr in segments.iter() {
        if phdr.p_type != PT_LOAD {
            continue;
        }
        min_bound = min_bound.min(phdr.p_vaddr as usize);
        max_bound = max_bound.max((phdr.p_vaddr + phdr.p_filesz) as usize);
        valid_segs += 1;
    }

    if valid_segs == 0 {
        return Err(malformed(path, "no loadable segment"));
    }
    Ok((min_bound, max_bound))
}

/// Reads the header of the given file and reports its ELF class and machine.
/// Fails if the file does not exist or is not an ELF file.
pub fn check_elf_file(path: &str) -> Result<ElfFileInfo, MemoryError> {
    let bytes = fs::read(path).map_err(|e| malformed(path, e))?;
    let file = ElfBytes::<AnyEndian>::minimal_parse(&bytes).map_err(|e| malformed(path, e))?;
    Ok(ElfFileInfo {
        is_32bit: file.ehdr.class == Class::ELF32,
        is_64bit: file.ehdr.class == Class::ELF64,
        is_riscv: file.ehdr.e_machine == EM_RISCV,
    })
}

/// True if the given function/object/untyped symbol is present in the given
/// ELF file. Unreadable or non-ELF files simply report `false`.
pub fn is_symbol_in_elf_file(path: &str, target: &str) -> bool {
    let Ok(bytes) = fs::read(path) else {
        return false;
    };
    let Ok(file) = ElfBytes::<AnyEndian>::minimal_parse(&bytes) else {
        return false;
    };
    let Ok(Some((symtab, strtab))) = file.symbol_table() else {
        return false;
    };

    symtab.iter().any(|sym| {
        let kind = sym.st_symtype();
        (kind == STT_NOTYPE || kind == STT_FUNC || kind == STT_OBJECT)
            && sym.st_name != 0
            && strtab.get(sym.st_name as usize).ok() == Some(target)
    })
}
