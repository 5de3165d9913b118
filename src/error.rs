use thiserror::Error;

use crate::elf_env::Intrinsic;

/// A guest memory write that the guest core refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("guest bus fault: {width}-byte write at 0x{address:08X}")]
pub struct GuestFault {
    pub address: u32,
    pub width: u8,
}

/// Why the guest has to stop for the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// The transaction queue is at its limit and needs draining.
    QueueFull,
    /// A `vcsRead4` is waiting for the target to perform the read.
    AwaitingRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StubError {
    #[error("execution stopped ({0:?})")]
    StopExecution(PauseReason),
    #[error("unimplemented: {0}")]
    Unimplemented(Intrinsic),
    #[error("unmapped fetch at 0x{0:08X}")]
    UnmappedFetch(u32),
    #[error(transparent)]
    Guest(#[from] GuestFault),
}

impl StubError {
    /// Terminates the emulation session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StubError::Unimplemented(_))
    }

    /// The driver should run the target and invoke the fetch hook again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StubError::StopExecution(_))
    }
}
