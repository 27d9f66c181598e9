//! Intel-hex image loader.
//!
//! File format: a line either contains `@address`, where `address` is a
//! hexadecimal write cursor, or one or more whitespace-separated tokens of
//! two hexadecimal digits written sequentially from the cursor. Bytes are
//! written directly into the backing store, bypassing access attributes.

use std::fs::File;
use std::io::{BufRead, BufReader};

use log::{error, warn};

use crate::error::MemoryError;
use crate::memory::Memory;

impl Memory {
    /// Loads the given hex file into memory.
    ///
    /// Diagnostics for every malformed line are logged; once any error has
    /// been seen no further bytes are written, but the rest of the file is
    /// still validated. Bytes written before the first error are left in
    /// place. Overwriting previously loaded (non-zero) bytes is reported
    /// with a single summary warning.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the hex file.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the whole file was consumed without errors.
    pub fn load_hex_file(&mut self, path: &str) -> Result<(), MemoryError> {
        let file = File::open(path).map_err(|e| {
            error!("failed to open hex file '{}': {}", path, e);
            MemoryError::MalformedImage {
                path: path.to_string(),
                reason: e.to_string(),
            }
        })?;
        let reader = BufReader::new(file);

        let mut address = 0usize;
        let mut errors = 0usize;
        let mut overwrites = 0usize;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| MemoryError::MalformedImage {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('@') {
                let token = rest.split_whitespace().next().unwrap_or("");
                match usize::from_str_radix(token, 16) {
                    Ok(addr) => address = addr,
                    Err(_) => {
                        error!(
                            "file {}, line {}: invalid hexadecimal address: {}",
                            path, line_num, line
                        );
                        errors += 1;
                    }
                }
                continue;
            }

            let mut tokens = line.split_whitespace().peekable();
            if tokens.peek().is_none() {
                error!("file {}, line {}: invalid data: {}", path, line_num, line);
                errors += 1;
                continue;
            }

            for token in tokens {
                let value = match u32::from_str_radix(token, 16) {
                    Ok(v) => v,
                    Err(_) => {
                        error!("file {}, line {}: invalid data: {}", path, line_num, line);
                        errors += 1;
                        break;
                    }
                };
                if value > 0xff {
                    error!(
                        "file {}, line {}: invalid value: {:#x}",
                        path, line_num, value
                    );
                    errors += 1;
                }
                if address < self.size() {
                    if errors == 0 {
                        if self.data.read_u8(address) != 0 {
                            overwrites += 1;
                        }
                        self.data.write_u8(address, value as u8);
                        address += 1;
                    }
                } else {
                    error!(
                        "file {}, line {}: address out of bounds: {:#x}",
                        path, line_num, address
                    );
                    errors += 1;
                    break;
                }
            }
        }

        if overwrites > 0 {
            warn!(
                "file {}: overwrote previously loaded data changing {} or more bytes",
                path, overwrites
            );
        }

        if errors == 0 {
            Ok(())
        } else {
            Err(MemoryError::MalformedImage {
                path: path.to_string(),
                reason: format!("{} malformed or out-of-bounds lines", errors),
            })
        }
    }
}
