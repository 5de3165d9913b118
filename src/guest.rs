//! Trait representing the minimal view of the Cortex-M0 guest needed by the stubs.

use crate::error::GuestFault;

pub trait GuestCore {
    /// Decoded instruction form handed back alongside the synthesized word.
    type Op;

    fn register(&self, index: usize) -> u32;
    fn set_register(&mut self, index: usize, value: u32);

    /// Guest cycles elapsed so far.
    fn cycles(&self) -> u64;

    fn decode_instruction_word(&self, word: u16) -> Self::Op;

    fn write8(&mut self, addr: u32, value: u8) -> Result<(), GuestFault>;

    fn write16(&mut self, addr: u32, value: u16) -> Result<(), GuestFault> {
        self.write8(addr, (value & 0xFF) as u8)?;
        self.write8(addr.wrapping_add(1), (value >> 8) as u8)
    }

    fn write32(&mut self, addr: u32, value: u32) -> Result<(), GuestFault> {
        self.write16(addr, (value & 0xFFFF) as u16)?;
        self.write16(addr.wrapping_add(2), (value >> 16) as u16)
    }
}
