//! Per-hart last-write journal.
//!
//! Each hart owns exactly one record describing its most recent committed
//! write: address, size, the committed value, and the bytes it replaced.
//! The record enables rollback and trace generation in the embedding
//! simulator; it is a single slot, not a log, so every write overwrites the
//! previous record.

use crate::memory::Memory;

/// Record of the most recent write performed by one hart.
///
/// A `size` of zero means no write has been tracked since construction or
/// the last [`Memory::clear_last_write`].
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct LastWrite {
    pub size: usize,
    pub addr: usize,
    pub value: u64,
    pub prev_value: u64,
}

impl Memory {
    /// Stores a new journal record for `hart`.
    pub(crate) fn record_write(
        &mut self,
        hart: usize,
        addr: usize,
        size: usize,
        value: u64,
        prev_value: u64,
    ) {
        let lwd = &mut self.last_write[hart];
        lwd.size = size;
        lwd.addr = addr;
        lwd.value = value;
        lwd.prev_value = prev_value;
    }

    /// Returns the address, committed value, and size of the hart's last
    /// write. A size of zero means no write since the last clear, in which
    /// case address and value are meaningless.
    pub fn last_write_new(&self, hart: usize) -> (usize, u64, usize) {
        let lwd = &self.last_write[hart];
        (lwd.addr, lwd.value, lwd.size)
    }

    /// Returns the address, pre-write value, and size of the hart's last
    /// write. A size of zero means no write since the last clear.
    pub fn last_write_old(&self, hart: usize) -> (usize, u64, usize) {
        let lwd = &self.last_write[hart];
        (lwd.addr, lwd.prev_value, lwd.size)
    }

    /// Clears the hart's journal record; subsequent queries report size zero
    /// until the hart writes again.
    pub fn clear_last_write(&mut self, hart: usize) {
        self.last_write[hart].size = 0;
    }
}
