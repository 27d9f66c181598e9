//! Memory subsystem CLI.
//!
//! This binary is thin glue over the memory library. It performs:
//! 1. **Load:** Build a memory from a JSON config and load an ELF or hex image into it.
//! 2. **Probe:** Answer static ELF questions (class, bounds, symbol presence) without loading.
//! 3. **Symbols:** Print the collected symbol table after an ELF load (`--symbols`).

use std::fs;
use std::io;
use std::process;

use clap::{Parser, Subcommand};

use swervsim_memory::{check_elf_file, elf_file_address_bounds, is_symbol_in_elf_file};
use swervsim_memory::{Memory, MemoryConfig};

#[derive(Parser, Debug)]
#[command(
    name = "swervsim",
    author,
    version,
    about = "SweRV-class simulator memory front-end",
    long_about = "Load an ELF or Intel-hex image into a simulated memory, or probe an ELF \
                  file without loading it.\n\nMemory geometry comes from a JSON config \
                  (size, page_size, region_size, hart_count); every field is optional.\n\n\
                  Examples:\n  swervsim load -f app.elf --width 32\n  swervsim load -f \
                  image.hex --hex --config mem.json\n  swervsim probe app.elf --symbol _start"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load an image into a fresh memory and report entry point and bounds.
    Load {
        /// Image file to load (ELF unless --hex is given).
        #[arg(short, long)]
        file: String,

        /// Treat the image as an Intel-hex dump.
        #[arg(long)]
        hex: bool,

        /// Register width for ELF class checking (32 or 64).
        #[arg(long, default_value_t = 64)]
        width: u32,

        /// JSON memory configuration file.
        #[arg(long)]
        config: Option<String>,

        /// Print the collected symbol table after loading.
        #[arg(long)]
        symbols: bool,
    },

    /// Probe an ELF file: class, machine, segment bounds, symbol presence.
    Probe {
        /// ELF file to inspect.
        file: String,

        /// Also report whether this symbol is present.
        #[arg(long)]
        symbol: Option<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Load {
            file,
            hex,
            width,
            config,
            symbols,
        } => cmd_load(&file, hex, width, config, symbols),
        Commands::Probe { file, symbol } => cmd_probe(&file, symbol),
    }
}

/// Builds a memory from the optional JSON config and loads the image.
fn cmd_load(file: &str, hex: bool, width: u32, config: Option<String>, symbols: bool) {
    let config = match config {
        Some(path) => {
            let text = fs::read_to_string(&path).unwrap_or_else(|e| {
                eprintln!("Error reading config {}: {}", path, e);
                process::exit(1);
            });
            serde_json::from_str::<MemoryConfig>(&text).unwrap_or_else(|e| {
                eprintln!("Error parsing config {}: {}", path, e);
                process::exit(1);
            })
        }
        None => MemoryConfig::default(),
    };

    let mut mem = Memory::new(&config);
    println!(
        "Memory: {} MB, {} byte pages, {} region(s), {} hart(s)",
        mem.size() / 1024 / 1024,
        mem.page_size(),
        mem.region_count(),
        mem.hart_count()
    );

    if hex {
        println!("[*] Loading hex image: {}", file);
        if let Err(e) = mem.load_hex_file(file) {
            eprintln!("\n[!] FATAL: {}", e);
            process::exit(1);
        }
        println!("[*] Done");
        return;
    }

    println!("[*] Loading ELF image: {}", file);
    match mem.load_elf_file(file, width) {
        Ok((entry, end)) => {
            println!("    entry: {:#x}", entry);
            println!("    end:   {:#x}", end);
        }
        Err(e) => {
            eprintln!("\n[!] FATAL: {}", e);
            process::exit(1);
        }
    }

    if symbols {
        let stdout = io::stdout();
        if let Err(e) = mem.print_symbols(&mut stdout.lock()) {
            eprintln!("Error printing symbols: {}", e);
            process::exit(1);
        }
    }
}

/// Prints ELF header facts, segment bounds, and optional symbol presence.
fn cmd_probe(file: &str, symbol: Option<String>) {
    let info = check_elf_file(file).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });
    let class = if info.is_64bit {
        "64-bit"
    } else if info.is_32bit {
        "32-bit"
    } else {
        "unknown class"
    };
    println!(
        "{}: {} {}",
        file,
        class,
        if info.is_riscv { "RISC-V" } else { "non-RISC-V" }
    );

    match elf_file_address_bounds(file) {
        Ok((min_addr, max_addr)) => {
            println!("    segments: [{:#x}, {:#x})", min_addr, max_addr)
        }
        Err(e) => eprintln!("    no segment bounds: {}", e),
    }

    if let Some(name) = symbol {
        let present = is_symbol_in_elf_file(file, &name);
        println!(
            "    symbol {}: {}",
            name,
            if present { "present" } else { "absent" }
        );
    }
}
