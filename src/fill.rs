// Guest-side memset backing the `memset` stub
use crate::debug_flags::{self, TraceFlags};
use crate::error::GuestFault;
use crate::guest::GuestCore;

/// Fill `[base, base + size)` with `value`, using the widest aligned write
/// available at each position. Stops at the first failing write.
pub fn fill<C: GuestCore + ?Sized>(
    core: &mut C,
    base: u32,
    value: u8,
    size: u32,
) -> Result<(), GuestFault> {
    if debug_flags::trace(TraceFlags::FILL) {
        log::trace!("memset 0x{:08X} <- 0x{:02X} x {}", base, value, size);
    }

    let value16 = u16::from_le_bytes([value; 2]);
    let value32 = u32::from_le_bytes([value; 4]);

    let mut ptr = base;
    let mut remaining = size;

    while remaining > 0 {
        let step = if ptr & 0x03 == 0 && remaining >= 4 {
            core.write32(ptr, value32)?;
            4
        } else if ptr & 0x01 == 0 && remaining >= 2 {
            core.write16(ptr, value16)?;
            2
        } else {
            core.write8(ptr, value)?;
            1
        };

        ptr = ptr.wrapping_add(step);
        remaining -= step;
    }

    Ok(())
}
