//! Bus transaction queue shared between the stubs and the target side.
//!
//! The stubs only ever append. The target simulation pops transactions in
//! FIFO order and plays them onto the 6507 bus. [`BusTransactionQueue`] is a
//! plain in-memory implementation; hosts with their own buffering implement
//! [`TransactionQueue`] instead.

use std::collections::VecDeque;

use serde::Serialize;

use crate::debug_flags::{self, TraceFlags};
use crate::elf_env::ROM_BASE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionKind {
    /// Place `value` at the transaction address in the target's address space.
    Inject { value: u8 },
    /// The guest waits until the target has reached the transaction address.
    Yield,
    /// Replace the data bus with `value` on the next write to the address.
    Stuff { value: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusTransaction {
    pub address: u16,
    #[serde(flatten)]
    pub kind: TransactionKind,
    pub timestamp: u64,
}

pub trait TransactionQueue {
    /// Append `value` at the injection cursor and advance it.
    fn inject_rom(&mut self, value: u8) -> &mut Self;
    /// Append `value` at an explicit address; the cursor is unchanged.
    fn inject_rom_at(&mut self, value: u8, address: u16) -> &mut Self;
    fn yield_at(&mut self, address: u16) -> &mut Self;
    fn stuff_byte(&mut self, value: u8, address: u16) -> &mut Self;

    fn next_inject_address(&self) -> u16;
    fn set_next_inject_address(&mut self, address: u16) -> &mut Self;

    /// Stamp subsequently appended transactions with `timestamp`.
    fn set_timestamp(&mut self, timestamp: u64) -> &mut Self;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct BusTransactionQueue {
    queue: VecDeque<BusTransaction>,
    next_inject_address: u16,
    timestamp: u64,
}

impl Default for BusTransactionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl BusTransactionQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            next_inject_address: ROM_BASE,
            timestamp: 0,
        }
    }

    pub fn reset(&mut self) {
        self.queue.clear();
        self.next_inject_address = ROM_BASE;
        self.timestamp = 0;
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn pop(&mut self) -> Option<BusTransaction> {
        self.queue.pop_front()
    }

    pub fn peek(&self) -> Option<&BusTransaction> {
        self.queue.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BusTransaction> {
        self.queue.iter()
    }

    fn push(&mut self, address: u16, kind: TransactionKind) {
        let transaction = BusTransaction {
            address,
            kind,
            timestamp: self.timestamp,
        };
        if debug_flags::trace(TraceFlags::QUEUE) {
            log::trace!("queue <- {:?}", transaction);
        }
        self.queue.push_back(transaction);
    }
}

impl TransactionQueue for BusTransactionQueue {
    fn inject_rom(&mut self, value: u8) -> &mut Self {
        let address = self.next_inject_address;
        self.push(address, TransactionKind::Inject { value });
        self.next_inject_address = address.wrapping_add(1);
        self
    }

    fn inject_rom_at(&mut self, value: u8, address: u16) -> &mut Self {
        self.push(address, TransactionKind::Inject { value });
        self
    }

    fn yield_at(&mut self, address: u16) -> &mut Self {
        self.push(address, TransactionKind::Yield);
        self
    }

    fn stuff_byte(&mut self, value: u8, address: u16) -> &mut Self {
        self.push(address, TransactionKind::Stuff { value });
        self
    }

    fn next_inject_address(&self) -> u16 {
        self.next_inject_address
    }

    fn set_next_inject_address(&mut self, address: u16) -> &mut Self {
        self.next_inject_address = address;
        self
    }

    fn set_timestamp(&mut self, timestamp: u64) -> &mut Self {
        self.timestamp = timestamp;
        self
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}
