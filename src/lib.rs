//! Stub library bridging ELF binaries on an emulated Cortex-M0 to the VCS bus.
//!
//! The guest calls into fixed stub addresses; [`VcsLib::fetch16`] intercepts
//! those fetches, queues 6507 code and bus transactions, and fakes a return.

pub mod debug_flags;
pub mod elf_env;
pub mod emit;
pub mod error;
pub mod fill;
pub mod guest;
pub mod queue;
pub mod savestate;
pub mod vcslib;

pub use elf_env::{Intrinsic, BX_LR, QUEUE_SIZE_LIMIT};
pub use error::{GuestFault, PauseReason, StubError};
pub use guest::GuestCore;
pub use queue::{BusTransaction, BusTransactionQueue, TransactionKind, TransactionQueue};
pub use savestate::{BridgeSaveState, SaveStateError};
pub use vcslib::{BusStuffMasks, ReadHandshake, StubReturn, VcsLib};
