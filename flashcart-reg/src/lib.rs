#![no_std]
#![deny(clippy::all)]
#![deny(clippy::missing_const_for_fn)]
#![deny(missing_debug_implementations)]
#![deny(missing_copy_implementations)]

//! This crate contains definitions of the registers used to talk to
//! flashcarts plugged into the Nintendo 64 cartridge port. It contains the
//! parallel interface (PI) registers of the console itself, as well as the
//! register files of the supported flashcarts.
//!
//! All addresses are physical. Turning them into something that can be
//! dereferenced (the uncached KSEG1 segment on real hardware) is the job of
//! whoever implements the bus.

use bilge::prelude::*;

/// Converts a physical address to its uncached KSEG1 alias.
pub const fn uncached(physical: u32) -> u32 {
    physical | 0xA000_0000
}

/// Strips the segment bits from a KSEG0 / KSEG1 address.
pub const fn physical(address: u32) -> u32 {
    address & 0x1FFF_FFFF
}

pub mod pi {
    //! The console's parallel interface, which performs all DMA between
    //! RDRAM and the cartridge port.

    use super::*;

    pub const BASE: u32 = 0x0460_0000;

    pub const DRAM_ADDR: u32 = BASE;
    pub const CART_ADDR: u32 = BASE + 0x04;
    /// Length register for RDRAM -> cartridge transfers.
    pub const RD_LEN: u32 = BASE + 0x08;
    /// Length register for cartridge -> RDRAM transfers.
    pub const WR_LEN: u32 = BASE + 0x0C;
    pub const STATUS: u32 = BASE + 0x10;

    /// Written to [`STATUS`] to reset the DMA controller.
    pub const STATUS_RESET: u32 = 0x01;
    /// Written to [`STATUS`] to acknowledge the PI interrupt.
    pub const STATUS_CLEAR_INTERRUPT: u32 = 0x02;

    #[bitsize(32)]
    #[derive(FromBits, Clone, Copy, PartialEq, Eq, DebugBits)]
    pub struct Status {
        pub dma_busy: bool,
        pub io_busy: bool,
        pub error: bool,
        pub interrupt: bool,
        reserved: u28,
    }

    impl Status {
        #[must_use]
        pub fn is_busy(self) -> bool {
            self.dma_busy() || self.io_busy()
        }
    }

    /// The two cartridge domains, each with their own bus timing.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub enum Domain {
        /// Cartridge ROM, and most flashcart register files.
        Dom1,
        /// SRAM and FlashRAM save memory.
        Dom2,
    }

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub enum TimingRegister {
        Latency,
        PulseWidth,
        PageSize,
        Release,
    }

    pub const fn timing_register(domain: Domain, register: TimingRegister) -> u32 {
        let domain_base = match domain {
            Domain::Dom1 => BASE + 0x14,
            Domain::Dom2 => BASE + 0x24,
        };

        domain_base + (register as u32) * 4
    }
}

pub mod d64 {
    //! The 64drive control interface (CI).

    use super::*;

    pub const BASE: u32 = 0x1800_0000;

    pub const BUFFER: u32 = BASE;
    pub const STATUS: u32 = BASE + 0x200;
    pub const COMMAND: u32 = BASE + 0x208;
    pub const SDRAM_SIZE: u32 = BASE + 0x2E8;
    pub const MAGIC: u32 = BASE + 0x2EC;
    pub const VARIANT: u32 = BASE + 0x2F0;
    pub const REVISION: u32 = BASE + 0x2FC;

    /// Start of the 2KiB EEPROM emulation buffer.
    pub const EEPROM: u32 = BASE + 0x1000;
    pub const EEPROM_LEN: usize = 2048;

    /// Start of the save write-back sector table.
    pub const WRITEBACK: u32 = BASE + 0x2000;
    pub const WRITEBACK_LEN: usize = 1024;

    /// "UDEV"
    pub const MAGIC_VALUE: u32 = 0x5544_4556;

    pub const STATUS_BUSY: u32 = 1 << 12;

    pub const VARIANT_A: u16 = 0x4100;
    pub const VARIANT_B: u16 = 0x4200;

    #[repr(u8)]
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub enum Command {
        SetSaveType = 0xD0,
        EnableSaveWriteback = 0xD1,
        DisableSaveWriteback = 0xD2,
        EnableCartromWrites = 0xF0,
        DisableCartromWrites = 0xF1,
        EnableExtendedMode = 0xF8,
        DisableExtendedMode = 0xF9,
    }

    /// Save emulation types understood by [`Command::SetSaveType`].
    #[repr(u32)]
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub enum SaveType {
        None = 0,
        Eeprom4K = 1,
        Eeprom16K = 2,
        Sram = 3,
        FlashRam = 4,
        SramBanked = 5,
        FlashRamPkst2 = 6,
    }

    #[bitsize(32)]
    #[derive(FromBits, Clone, Copy, PartialEq, Eq, DebugBits)]
    pub struct Revision {
        pub fpga: u16,
        pub bootloader: u16,
    }
}

pub mod ed64 {
    //! The EverDrive-64 configuration registers.

    use super::*;

    pub const BASE: u32 = 0x0804_0000;

    pub const ROM: u32 = 0x1000_0000;
    pub const SRAM: u32 = 0x0800_0000;

    /// Value written to [`Register::Key`] to unlock the register file.
    pub const KEY_UNLOCK: u32 = 0x1234;

    #[repr(u32)]
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub enum Register {
        Cfg = 0,
        Status = 1,
        Key = 8,
        SaveCfg = 9,
        FpgaVersion = 11,
    }

    impl Register {
        #[must_use]
        pub const fn address(self) -> u32 {
            BASE + (self as u32) * 4
        }
    }

    #[bitsize(16)]
    #[derive(FromBits, Clone, Copy, PartialEq, Eq, DebugBits)]
    pub struct SaveConfig {
        pub eeprom_on: bool,
        pub sram_on: bool,
        pub eeprom_size: bool,
        pub sram_size: bool,
        reserved: u3,
        pub ram_bank: bool,
        reserved: u7,
        pub apply: bool,
    }
}
