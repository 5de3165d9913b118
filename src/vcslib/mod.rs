//! Stub dispatch for ELF binaries driving the VCS bus.
//!
//! The guest never executes code at stub addresses. Its fetch hook calls
//! [`VcsLib::fetch16`] first; a recognised address runs the intrinsic and
//! hands back a synthetic `bx lr`, so the guest's own return machinery takes
//! over as if a real subroutine had returned.

use crate::debug_flags::{self, TraceFlags};
use crate::elf_env::{Intrinsic, BX_LR, QUEUE_SIZE_LIMIT};
use crate::emit;
use crate::error::{PauseReason, StubError};
use crate::fill::fill;
use crate::guest::GuestCore;
use crate::queue::TransactionQueue;


/// Values substituted onto the data bus by the `vcsL?xForBusStuff2` stubs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStuffMasks {
    pub a: u8,
    pub x: u8,
    pub y: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadHandshake {
    #[default]
    Idle,
    AwaitingRead(u16),
}

/// Synthetic instruction handed back to the guest's fetch stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubReturn<Op> {
    pub word: u16,
    pub op: Op,
}

#[derive(Debug, Default)]
pub struct VcsLib {
    pub(crate) stuff_masks: BusStuffMasks,
    pub(crate) handshake: ReadHandshake,
    // Last address/value seen on the target bus
    pub(crate) current_address: u16,
    pub(crate) current_value: u8,
}

impl VcsLib {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.stuff_masks = BusStuffMasks::default();
        self.handshake = ReadHandshake::Idle;
        self.current_address = 0;
        self.current_value = 0;
    }

    pub fn stuff_masks(&self) -> BusStuffMasks {
        self.stuff_masks
    }

    pub fn set_stuff_masks(&mut self, masks: BusStuffMasks) {
        self.stuff_masks = masks;
    }

    pub fn handshake(&self) -> ReadHandshake {
        self.handshake
    }

    /// Latch the most recent target bus activity. Called by the target side on
    /// every bus cycle; only `vcsRead4` ever looks at it.
    pub fn update_bus(&mut self, address: u16, value: u8) {
        self.current_address = address;
        self.current_value = value;
    }

    pub fn bus_latch(&self) -> (u16, u8) {
        (self.current_address, self.current_value)
    }

    /// Instruction fetch hook.
    ///
    /// `Err(UnmappedFetch)` is the normal answer for ordinary guest code and
    /// means "execute as usual". `Err(StopExecution)` asks the driver to let
    /// the target run and retry on a later step.
    pub fn fetch16<C, Q>(
        &mut self,
        address: u32,
        core: &mut C,
        queue: &mut Q,
    ) -> Result<StubReturn<C::Op>, StubError>
    where
        C: GuestCore,
        Q: TransactionQueue,
    {
        // Stalls ordinary guest code too, so the target gets to drain the queue
        if queue.len() >= QUEUE_SIZE_LIMIT {
            return Err(StubError::StopExecution(PauseReason::QueueFull));
        }

        let intrinsic =
            Intrinsic::from_address(address).ok_or(StubError::UnmappedFetch(address))?;

        if !intrinsic.is_implemented() {
            log::error!("unimplemented: {}", intrinsic);
            return Err(StubError::Unimplemented(intrinsic));
        }

        if debug_flags::trace(TraceFlags::DISPATCH) {
            log::debug!(
                "stub {} r0=0x{:08X} r1=0x{:08X} cycles={}",
                intrinsic,
                core.register(0),
                core.register(1),
                core.cycles()
            );
        }

        queue.set_timestamp(core.cycles());

        match intrinsic {
            Intrinsic::Memset => {
                // r2 is not part of the calling convention
                let base = core.register(0);
                let value = core.register(1) as u8;
                let size = core.register(3);
                fill(core, base, value, size)?;
            }
            Intrinsic::VcsLdaForBusStuff2 => emit::lda2(queue, self.stuff_masks.a),
            Intrinsic::VcsLdxForBusStuff2 => emit::lda2(queue, self.stuff_masks.x),
            Intrinsic::VcsLdyForBusStuff2 => emit::lda2(queue, self.stuff_masks.y),
            Intrinsic::VcsWrite3 => {
                emit::write3(queue, core.register(0) as u8, core.register(1) as u8)
            }
            Intrinsic::VcsJmp3 => emit::jmp3(queue),
            Intrinsic::VcsNop2 => emit::nop2(queue),
            Intrinsic::VcsNop2n => emit::nop2n(queue, core.register(0) as u16),
            Intrinsic::VcsWrite5 => {
                emit::write5(queue, core.register(0) as u8, core.register(1) as u8)
            }
            Intrinsic::VcsLda2 => emit::lda2(queue, core.register(0) as u8),
            Intrinsic::VcsSta3 => emit::sta3(queue, core.register(0) as u8),
            Intrinsic::VcsCopyOverblankToRiotRam => emit::copy_overblank_to_riot_ram(queue),
            Intrinsic::VcsStartOverblank => emit::start_overblank(queue),
            Intrinsic::VcsEndOverblank => emit::end_overblank(queue),
            Intrinsic::VcsRead4 => self.read4(core, queue)?,
            other => unreachable!("{} passed the implemented check", other),
        }

        Ok(Self::return_from_stub(core))
    }

    fn read4<C, Q>(&mut self, core: &mut C, queue: &mut Q) -> Result<(), StubError>
    where
        C: GuestCore,
        Q: TransactionQueue,
    {
        let trace = debug_flags::trace(TraceFlags::READ);

        match self.handshake {
            ReadHandshake::AwaitingRead(address) => {
                if !queue.is_empty() || self.current_address != address {
                    return Err(StubError::StopExecution(PauseReason::AwaitingRead));
                }

                if trace {
                    log::debug!("read 0x{:04X} -> 0x{:02X}", address, self.current_value);
                }
                self.handshake = ReadHandshake::Idle;
                core.set_register(0, self.current_value as u32);
                Ok(())
            }
            ReadHandshake::Idle => {
                let address = core.register(0) as u16;
                if trace {
                    log::debug!("read 0x{:04X} requested", address);
                }

                self.handshake = ReadHandshake::AwaitingRead(address);
                emit::read4(queue, address);
                Err(StubError::StopExecution(PauseReason::AwaitingRead))
            }
        }
    }

    fn return_from_stub<C: GuestCore>(core: &C) -> StubReturn<C::Op> {
        StubReturn {
            word: BX_LR,
            op: core.decode_instruction_word(BX_LR),
        }
    }
}
