//! Fixed ABI shared with ELF binaries linked against the VCS stub library.
//!
//! Everything in here is baked into existing guest images: stub addresses,
//! the overblank program and the queue limit must never change meaning.

use std::fmt;

/// First stub address. Entries follow at `STUB_STRIDE` byte intervals.
pub const STUB_BASE: u32 = 0x0000_1000;
pub const STUB_STRIDE: u32 = 4;

/// Maximum number of queued bus transactions before the guest is stalled.
pub const QUEUE_SIZE_LIMIT: usize = 10;

/// Thumb `bx lr`.
pub const BX_LR: u16 = 0x4770;

/// RIOT RAM base, where the overblank program is copied.
pub const OVERBLANK_RAM_BASE: u16 = 0x0080;
/// Address the target reaches once it sits in the overblank wait loop.
pub const OVERBLANK_WAIT_ADDRESS: u16 = 0x00AC;
/// Last byte of cartridge ROM space, polled by the wait loop.
pub const ROM_LAST_BYTE: u16 = 0x1FFF;
/// Start of cartridge ROM space.
pub const ROM_BASE: u16 = 0x1000;

pub const OVERBLANK_PROGRAM: [u8; 49] = [
    0xA0, 0x00, // ldy #0
    0xA5, 0xE0, // lda $e0
    // OverblankLoop ($84):
    0x85, 0x02, // sta WSYNC
    0x85, 0x2D, // sta $2d (AUDV0 stand-in, audio stays muted)
    0x98, // tya
    0x18, // clc
    0x6A, // ror
    0xAA, // tax
    0xB5, 0xE0, // lda $e0,x
    0x90, 0x04, // bcc +4
    0x4A, // lsr
    0x4A, // lsr
    0x4A, // lsr
    0x4A, // lsr
    0xC8, // iny
    0xC0, 0x1D, // cpy #$1d
    0xD0, 0x04, // bne +4
    0xA2, 0x02, // ldx #2
    0x86, 0x00, // stx VSYNC
    0xC0, 0x20, // cpy #$20
    0xD0, 0x04, // bne SkipClearVSync
    0xA2, 0x00, // ldx #0
    0x86, 0x00, // stx VSYNC
    // SkipClearVSync ($A5):
    0xC0, 0x3F, // cpy #$3f
    0xD0, 0xDB, // bne OverblankLoop
    // WaitOverblankEnd ($A9):
    0xAD, 0xFF, 0x1F, // lda $1fff
    0xD0, 0xFB, // bne WaitOverblankEnd
    0x4C, 0x00, 0x10, // jmp $1000
];

macro_rules! intrinsics {
    ($( $variant:ident => $symbol:literal, $implemented:literal; )*) => {
        /// Intrinsic operations reachable through the stub table, in address order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Intrinsic {
            $( $variant, )*
        }

        impl Intrinsic {
            pub const ALL: &'static [Intrinsic] = &[ $( Intrinsic::$variant, )* ];

            /// Symbol name exported to the guest's linker.
            pub const fn symbol(self) -> &'static str {
                match self {
                    $( Intrinsic::$variant => $symbol, )*
                }
            }

            pub const fn is_implemented(self) -> bool {
                match self {
                    $( Intrinsic::$variant => $implemented, )*
                }
            }
        }
    };
}

intrinsics! {
    Memset => "memset", true;
    Memcpy => "memcpy", false;
    VcsLdaForBusStuff2 => "vcsLdaForBusStuff2", true;
    VcsLdxForBusStuff2 => "vcsLdxForBusStuff2", true;
    VcsLdyForBusStuff2 => "vcsLdyForBusStuff2", true;
    VcsWrite3 => "vcsWrite3", true;
    VcsJmp3 => "vcsJmp3", true;
    VcsNop2 => "vcsNop2", true;
    VcsNop2n => "vcsNop2n", true;
    VcsWrite5 => "vcsWrite5", true;
    VcsWrite6 => "vcsWrite6", false;
    VcsLda2 => "vcsLda2", true;
    VcsLdx2 => "vcsLdx2", false;
    VcsLdy2 => "vcsLdy2", false;
    VcsSax3 => "vcsSax3", false;
    VcsSta3 => "vcsSta3", true;
    VcsStx3 => "vcsStx3", false;
    VcsSty3 => "vcsSty3", false;
    VcsSta4 => "vcsSta4", false;
    VcsStx4 => "vcsStx4", false;
    VcsSty4 => "vcsSty4", false;
    VcsCopyOverblankToRiotRam => "vcsCopyOverblankToRiotRam", true;
    VcsStartOverblank => "vcsStartOverblank", true;
    VcsEndOverblank => "vcsEndOverblank", true;
    VcsRead4 => "vcsRead4", true;
    Randint => "randint", false;
    VcsTxs2 => "vcsTxs2", false;
    VcsJsr6 => "vcsJsr6", false;
    VcsPha3 => "vcsPha3", false;
    VcsPhp3 => "vcsPhp3", false;
    VcsPla4 => "vcsPla4", false;
    VcsPlp4 => "vcsPlp4", false;
    VcsPla4Ex => "vcsPla4Ex", false;
    VcsPlp4Ex => "vcsPlp4Ex", false;
    VcsJmpToRam3 => "vcsJmpToRam3", false;
    VcsWaitForAddress => "vcsWaitForAddress", false;
    VcsInjectDmaData => "vcsInjectDmaData", false;
}

impl Intrinsic {
    /// Fetch address of this stub (Thumb bit clear).
    pub const fn address(self) -> u32 {
        STUB_BASE + (self as u32) * STUB_STRIDE
    }

    /// Address the guest's linker resolves the symbol to (Thumb bit set).
    pub const fn symbol_address(self) -> u32 {
        self.address() | 1
    }

    /// Resolve a fetch address. Anything that is not exactly a stub entry is `None`.
    #[inline]
    pub fn from_address(address: u32) -> Option<Intrinsic> {
        let offset = address.checked_sub(STUB_BASE)?;
        if offset % STUB_STRIDE != 0 {
            return None;
        }
        Self::ALL.get((offset / STUB_STRIDE) as usize).copied()
    }

    pub fn from_symbol(symbol: &str) -> Option<Intrinsic> {
        Self::ALL.iter().copied().find(|i| i.symbol() == symbol)
    }
}

impl fmt::Display for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Stub table as `(symbol, linker address)` pairs, for the ELF loader's
/// external symbol list.
pub fn external_symbols() -> impl Iterator<Item = (&'static str, u32)> {
    Intrinsic::ALL
        .iter()
        .map(|&intrinsic| (intrinsic.symbol(), intrinsic.symbol_address()))
}

const fn table_is_strictly_increasing() -> bool {
    let mut i = 1;
    while i < Intrinsic::ALL.len() {
        if Intrinsic::ALL[i].address() <= Intrinsic::ALL[i - 1].address() {
            return false;
        }
        i += 1;
    }
    true
}

const _: () = assert!(table_is_strictly_increasing());
const _: () = assert!(Intrinsic::ALL.len() == 37);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_layout() {
        assert_eq!(Intrinsic::Memset.address(), 0x1000);
        assert_eq!(Intrinsic::VcsWrite5.address(), 0x1024);
        assert_eq!(Intrinsic::VcsRead4.address(), 0x1060);
        assert_eq!(Intrinsic::VcsInjectDmaData.address(), 0x1090);
    }

    #[test]
    fn test_every_entry_resolves_to_itself() {
        for &intrinsic in Intrinsic::ALL {
            assert_eq!(Intrinsic::from_address(intrinsic.address()), Some(intrinsic));
        }
    }

    #[test]
    fn test_addresses_between_entries_are_unmapped() {
        for &intrinsic in Intrinsic::ALL {
            let addr = intrinsic.address();
            for delta in 1..STUB_STRIDE {
                assert_eq!(Intrinsic::from_address(addr + delta), None);
            }
        }
        assert_eq!(Intrinsic::from_address(STUB_BASE - 4), None);
        assert_eq!(Intrinsic::from_address(0), None);
        let past_end = Intrinsic::VcsInjectDmaData.address() + STUB_STRIDE;
        assert_eq!(Intrinsic::from_address(past_end), None);
        assert_eq!(Intrinsic::from_address(u32::MAX), None);
    }

    #[test]
    fn test_symbols_are_unique_and_round_trip() {
        let names: HashSet<_> = Intrinsic::ALL.iter().map(|i| i.symbol()).collect();
        assert_eq!(names.len(), Intrinsic::ALL.len());

        for (name, addr) in external_symbols() {
            let intrinsic = Intrinsic::from_symbol(name).unwrap();
            assert_eq!(addr & 1, 1);
            assert_eq!(Intrinsic::from_address(addr & !1), Some(intrinsic));
        }
        assert_eq!(Intrinsic::from_symbol("vcsWrite7"), None);
    }

    #[test]
    fn test_overblank_program_layout() {
        let at = |addr: u16| (addr - OVERBLANK_RAM_BASE) as usize;
        // Wait loop: lda $1fff / bne at the yield address / jmp $1000
        assert_eq!(&OVERBLANK_PROGRAM[at(0xA9)..at(0xAC)], &[0xAD, 0xFF, 0x1F]);
        assert_eq!(OVERBLANK_PROGRAM[at(OVERBLANK_WAIT_ADDRESS)], 0xD0);
        assert_eq!(&OVERBLANK_PROGRAM[at(0xAE)..], &[0x4C, 0x00, 0x10]);
        // Main loop branch lands on the sta WSYNC at $84
        let bne = at(0xA7);
        let target = (0xA9i32 + OVERBLANK_PROGRAM[bne + 1] as i8 as i32) as u16;
        assert_eq!(target, 0x84);
    }
}
