//! The 64drive, by Retroactive.
//!
//! The 64drive keeps the ROM and the emulated save memory in SDRAM, which is
//! reached through domain 1 with the normal ROM timing. It is controlled
//! through a command interface (CI) that takes a command, optionally reads an
//! argument from its buffer, and reports busy until the command is done.

use flashcart_reg::d64::{self, Command, Revision};
use log::{debug, trace, warn};

use super::{
    DeviceVariant, Features, Flashcart, Progress, SectorTable, load_file_region,
    load_rom_image, load_save_image,
};
use crate::dma::{DmaEngine, ScratchBuffer};
use crate::fs::FileSystem;
use crate::register::RegisterPort;
use crate::save::{AbstractSaveType, SaveType, SaveWindow};
use crate::timing::TimingProfile;
use crate::{Bus, Error, Timeout};

const ROM_ADDRESS: u32 = 0x1000_0000;
const SAVE_ADDRESS_DEV_A: u32 = 0x11FF_0000;
const SAVE_ADDRESS_DEV_A_PKST2: u32 = 0x10B0_32B0;
const SAVE_ADDRESS_DEV_B: u32 = 0x17FE_0000;

const MINIMUM_FPGA_REVISION: u16 = 205;

/// ROMs bigger than this only fit with extended address mode turned on.
const EXTENDED_MODE_THRESHOLD: u64 = 64 * 1024 * 1024;

impl DeviceVariant {
    fn from_64drive(variant: u16) -> Self {
        match variant {
            d64::VARIANT_A => DeviceVariant::A,
            d64::VARIANT_B => DeviceVariant::B,
            _ => DeviceVariant::Unknown,
        }
    }
}

fn command_save_type(save_type: SaveType) -> d64::SaveType {
    match save_type {
        SaveType::None => d64::SaveType::None,
        SaveType::Eeprom4K => d64::SaveType::Eeprom4K,
        SaveType::Eeprom16K => d64::SaveType::Eeprom16K,
        SaveType::Sram | SaveType::Sram128K => d64::SaveType::Sram,
        SaveType::SramBanked => d64::SaveType::SramBanked,
        SaveType::FlashRam => d64::SaveType::FlashRam,
        SaveType::FlashRamPkst2 => d64::SaveType::FlashRamPkst2,
    }
}

/// A 64drive, revision A or B.
pub struct SixtyFourDrive<B: Bus> {
    dma: DmaEngine<B>,
    variant: DeviceVariant,
    sdram_size: u32,
    save_type: SaveType,
    extended_mode_on_exit: bool,
}

impl<B: Bus> SixtyFourDrive<B> {
    /// Drives the 64drive behind `bus`. Call [`Flashcart::init`] before
    /// anything else.
    pub fn new(bus: B, timeout: Timeout) -> Self {
        Self::from_engine(DmaEngine::new(bus, timeout))
    }

    pub(crate) fn from_engine(dma: DmaEngine<B>) -> Self {
        SixtyFourDrive {
            dma,
            variant: DeviceVariant::Unknown,
            sdram_size: 0,
            save_type: SaveType::None,
            extended_mode_on_exit: false,
        }
    }

    /// Checks for the "UDEV" magic the 64drive puts in its register file.
    pub(crate) fn probe(dma: &mut DmaEngine<B>) -> bool {
        dma.register_port(d64::BASE, ROM_ADDRESS).read(d64::MAGIC) == d64::MAGIC_VALUE
    }

    /// The hardware revision, known once [`Flashcart::init`] has succeeded.
    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    /// The save memory currently being emulated.
    pub fn save_type(&self) -> SaveType {
        self.save_type
    }

    /// Gives the bus back.
    pub fn into_bus(self) -> B {
        self.dma.into_bus()
    }

    fn port(&mut self) -> RegisterPort<'_, B> {
        self.dma.register_port(d64::BASE, ROM_ADDRESS)
    }

    fn wait_for_ci(&mut self, command: Command) -> Result<(), Error> {
        let timeout = self.dma.timeout();
        let mut port = self.port();

        timeout
            .spin(|| port.read(d64::STATUS) & d64::STATUS_BUSY != 0)
            .map_err(|_| Error::CommandFailed(command as u8))
    }

    fn command(&mut self, command: Command, argument: Option<u32>) -> Result<(), Error> {
        trace!("64drive command {command:?} ({argument:?})");

        self.dma.wait_idle()?;
        self.wait_for_ci(command)?;

        let mut port = self.port();
        if let Some(argument) = argument {
            port.write(d64::BUFFER, argument);
        }
        port.write(d64::COMMAND, command as u32);

        self.wait_for_ci(command)
    }

    fn apply_save_type(&mut self, save_type: SaveType) -> Result<(), Error> {
        self.command(
            Command::SetSaveType,
            Some(command_save_type(save_type) as u32),
        )?;
        self.save_type = save_type;
        Ok(())
    }

    fn upload_writeback_table(&mut self, sectors: &SectorTable) -> Result<(), Error> {
        self.command(Command::DisableSaveWriteback, None)?;

        let mut table = ScratchBuffer::new(d64::WRITEBACK_LEN);
        table.copy_from_slice(sectors);
        self.dma.write(d64::WRITEBACK, &table)?;

        self.command(Command::EnableSaveWriteback, None)
    }

    fn save_window(&self) -> SaveWindow {
        let len = self.save_type.capacity();

        let address = if self.save_type.is_eeprom() {
            d64::EEPROM
        } else {
            match (self.variant, self.save_type) {
                (DeviceVariant::A, SaveType::FlashRamPkst2) => SAVE_ADDRESS_DEV_A_PKST2,
                (DeviceVariant::A, _) => SAVE_ADDRESS_DEV_A,
                _ => SAVE_ADDRESS_DEV_B,
            }
        };

        SaveWindow::Memory {
            address,
            len,
            profile: TimingProfile::Rom,
        }
    }

    fn rom_capacity(&self) -> u64 {
        u64::from(self.sdram_size)
    }
}

impl<B: Bus> Flashcart for SixtyFourDrive<B> {
    fn init(&mut self) -> Result<(), Error> {
        self.dma.wait_idle()?;

        let mut port = self.port();
        let variant = port.read(d64::VARIANT) as u16;
        let revision = Revision::from(port.read(d64::REVISION));

        debug!(
            "64drive variant {:#06x}, fpga revision {}, bootloader {:#06x}",
            variant,
            revision.fpga(),
            revision.bootloader()
        );

        if revision.fpga() < MINIMUM_FPGA_REVISION {
            warn!("64drive firmware is too old");
            return Err(Error::Outdated {
                found: revision.fpga().into(),
                minimum: MINIMUM_FPGA_REVISION.into(),
            });
        }

        let sdram_size = port.read(d64::SDRAM_SIZE);
        debug!("64drive sdram size {sdram_size:#x}");

        self.sdram_size = sdram_size;
        self.variant = DeviceVariant::from_64drive(variant);

        self.command(Command::DisableSaveWriteback, None)?;
        self.apply_save_type(SaveType::None)?;
        self.command(Command::DisableCartromWrites, None)
    }

    fn deinit(&mut self) -> Result<(), Error> {
        if self.extended_mode_on_exit {
            self.command(Command::EnableExtendedMode, None)?;
            self.extended_mode_on_exit = false;
        }

        Ok(())
    }

    fn has_feature(&self, _feature: Features) -> bool {
        false
    }

    fn load_rom(
        &mut self,
        fs: &mut dyn FileSystem,
        path: &str,
        progress: Progress<'_>,
    ) -> Option<Result<(), Error>> {
        let capacity = self.rom_capacity();

        Some(
            load_rom_image(&mut self.dma, fs, path, ROM_ADDRESS, capacity, progress).map(|size| {
                if size > EXTENDED_MODE_THRESHOLD {
                    debug!("rom needs extended mode");
                    self.extended_mode_on_exit = true;
                }
            }),
        )
    }

    fn load_file(
        &mut self,
        fs: &mut dyn FileSystem,
        path: &str,
        rom_offset: u32,
        file_offset: u64,
    ) -> Option<Result<(), Error>> {
        let capacity = self.rom_capacity();

        Some(load_file_region(
            &mut self.dma,
            fs,
            path,
            ROM_ADDRESS,
            rom_offset,
            file_offset,
            capacity,
        ))
    }

    fn load_save(&mut self, fs: &mut dyn FileSystem, path: &str) -> Option<Result<(), Error>> {
        let window = self.save_window();
        Some(load_save_image(&mut self.dma, fs, path, window))
    }

    fn set_save_type(&mut self, save_type: AbstractSaveType) -> Option<Result<(), Error>> {
        let save_type = match save_type {
            AbstractSaveType::None => SaveType::None,
            AbstractSaveType::Eeprom4K => SaveType::Eeprom4K,
            AbstractSaveType::Eeprom16K => SaveType::Eeprom16K,
            AbstractSaveType::Sram | AbstractSaveType::Sram128K => SaveType::Sram,
            AbstractSaveType::SramBanked => SaveType::SramBanked,
            AbstractSaveType::FlashRam => SaveType::FlashRam,
            AbstractSaveType::FlashRamPkst2 => SaveType::FlashRamPkst2,
        };

        Some(self.apply_save_type(save_type))
    }

    fn set_save_writeback(&mut self, sectors: &SectorTable) -> Option<Result<(), Error>> {
        Some(self.upload_writeback_table(sectors))
    }
}
