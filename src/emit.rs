//! 6507 code emitters used by the stubs.
//!
//! Byte sequences and their cycle counts are part of the stub ABI: guest
//! kernels count target cycles based on exactly these encodings.

use crate::elf_env::{
    OVERBLANK_PROGRAM, OVERBLANK_RAM_BASE, OVERBLANK_WAIT_ADDRESS, ROM_BASE, ROM_LAST_BYTE,
};
use crate::queue::TransactionQueue;

pub const LDA_IMM: u8 = 0xA9;
pub const LDA_ABS: u8 = 0xAD;
pub const STA_ZP: u8 = 0x85;
pub const JMP_ABS: u8 = 0x4C;
pub const NOP: u8 = 0xEA;

/// `sta zp` with the written value replaced through bus stuffing. 3 cycles.
pub fn write3<Q: TransactionQueue>(queue: &mut Q, zp_address: u8, value: u8) {
    queue
        .inject_rom(STA_ZP)
        .inject_rom(zp_address)
        .stuff_byte(value, zp_address as u16);
}

/// `lda #value` / `sta zp`, then wait for the store. 5 cycles.
pub fn write5<Q: TransactionQueue>(queue: &mut Q, zp_address: u8, value: u8) {
    queue
        .inject_rom(LDA_IMM)
        .inject_rom(value)
        .inject_rom(STA_ZP)
        .inject_rom(zp_address)
        .yield_at(zp_address as u16);
}

/// `jmp $1000`, restarting injection at the bottom of ROM space. 3 cycles.
pub fn jmp3<Q: TransactionQueue>(queue: &mut Q) {
    let [lo, hi] = ROM_BASE.to_le_bytes();
    queue
        .inject_rom(JMP_ABS)
        .inject_rom(lo)
        .inject_rom(hi)
        .set_next_inject_address(ROM_BASE);
}

pub fn nop2<Q: TransactionQueue>(queue: &mut Q) {
    queue.inject_rom(NOP);
}

/// `n` NOPs worth of cycles. Only the first opcode is injected; the
/// remaining `n - 1` bytes are skipped and must already hold NOP filler in
/// the cartridge image.
pub fn nop2n<Q: TransactionQueue>(queue: &mut Q, n: u16) {
    if n == 0 {
        return;
    }

    queue.inject_rom(NOP);
    let next = queue.next_inject_address().wrapping_add(n - 1);
    queue.set_next_inject_address(next);
}

/// `lda #value`. No yield; only a following store makes it observable.
pub fn lda2<Q: TransactionQueue>(queue: &mut Q, value: u8) {
    queue.inject_rom(LDA_IMM).inject_rom(value);
}

/// `sta zp`, then wait for the store.
pub fn sta3<Q: TransactionQueue>(queue: &mut Q, zp_address: u8) {
    queue
        .inject_rom(STA_ZP)
        .inject_rom(zp_address)
        .yield_at(zp_address as u16);
}

/// `lda abs`, then wait until the target has put `address` on the bus.
pub fn read4<Q: TransactionQueue>(queue: &mut Q, address: u16) {
    let [lo, hi] = address.to_le_bytes();
    queue
        .inject_rom(LDA_ABS)
        .inject_rom(lo)
        .inject_rom(hi)
        .yield_at(address);
}

pub fn copy_overblank_to_riot_ram<Q: TransactionQueue>(queue: &mut Q) {
    for (offset, &byte) in OVERBLANK_PROGRAM.iter().enumerate() {
        write5(queue, OVERBLANK_RAM_BASE as u8 + offset as u8, byte);
    }
}

/// `jmp $0080` into the overblank program.
pub fn start_overblank<Q: TransactionQueue>(queue: &mut Q) {
    let [lo, hi] = OVERBLANK_RAM_BASE.to_le_bytes();
    queue
        .inject_rom(JMP_ABS)
        .inject_rom(lo)
        .inject_rom(hi)
        .yield_at(OVERBLANK_RAM_BASE);
}

/// Release the overblank wait loop and resume injection at `$1000`.
pub fn end_overblank<Q: TransactionQueue>(queue: &mut Q) {
    queue
        .inject_rom_at(0x00, ROM_LAST_BYTE)
        .yield_at(OVERBLANK_WAIT_ADDRESS)
        .set_next_inject_address(ROM_BASE);
}
