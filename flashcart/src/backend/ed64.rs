//! The EverDrive-64, by krikzz.
//!
//! The EverDrive keeps the ROM in 64 MiB of SDRAM and emulates SRAM and
//! FlashRAM in domain 2 at the usual cartridge address, so saves are moved
//! with the SRAM bus timing. EEPROM is emulated on the joybus. The register
//! file is locked until a key is written to it.

use flashcart_reg::ed64::{self, Register};
use log::{debug, warn};

use super::{
    Features, Flashcart, Progress, load_file_region, load_rom_image, load_save_image,
    store_save_image,
};
use crate::dma::DmaEngine;
use crate::fs::FileSystem;
use crate::register::RegisterPort;
use crate::save::{self, AbstractSaveType, SaveType, SaveWindow};
use crate::timing::TimingProfile;
use crate::{Bus, Error, Timeout};

const ROM_CAPACITY: u64 = 64 * 1024 * 1024;

const MINIMUM_FPGA_VERSION: u32 = 0x0100;

/// An EverDrive-64 V2.5 or V3.
pub struct EverDrive64<B: Bus> {
    dma: DmaEngine<B>,
    save_type: SaveType,
    sram_bank: bool,
    fpga_version: u32,
}

impl<B: Bus> EverDrive64<B> {
    /// Drives the EverDrive-64 behind `bus`. Call [`Flashcart::init`] before
    /// anything else.
    pub fn new(bus: B, timeout: Timeout) -> Self {
        Self::from_engine(DmaEngine::new(bus, timeout))
    }

    pub(crate) fn from_engine(dma: DmaEngine<B>) -> Self {
        EverDrive64 {
            dma,
            save_type: SaveType::None,
            sram_bank: false,
            fpga_version: 0,
        }
    }

    /// Unlocks the register file and reads the FPGA version.
    fn unlock(dma: &mut DmaEngine<B>) -> u32 {
        let mut port = dma.register_port(ed64::BASE, ed64::ROM);

        port.write(Register::Key.address(), ed64::KEY_UNLOCK);
        port.read(Register::FpgaVersion.address()) & 0xFFFF
    }

    /// Checks for a plausible FPGA version once the register file is unlocked.
    pub(crate) fn probe(dma: &mut DmaEngine<B>) -> bool {
        !matches!(Self::unlock(dma), 0 | 0xFFFF)
    }

    /// The FPGA version, known once [`Flashcart::init`] has succeeded.
    pub fn fpga_version(&self) -> u32 {
        self.fpga_version
    }

    /// The save memory currently being emulated.
    pub fn save_type(&self) -> SaveType {
        self.save_type
    }

    /// Selects which SRAM bank the next [`Flashcart::set_save_type`] maps in.
    /// Any non-zero `bank` selects bank 1.
    pub fn set_sram_bank(&mut self, bank: u8) {
        self.sram_bank = bank != 0;
    }

    /// Gives the bus back.
    pub fn into_bus(self) -> B {
        self.dma.into_bus()
    }

    fn port(&mut self) -> RegisterPort<'_, B> {
        self.dma.register_port(ed64::BASE, ed64::ROM)
    }

    fn apply_save_type(&mut self, save_type: SaveType) -> Result<(), Error> {
        self.dma.wait_idle()?;

        let bank = self.sram_bank;
        save::configure(&mut self.port(), save_type, bank);
        self.save_type = save_type;

        Ok(())
    }

    fn save_window(&self) -> SaveWindow {
        let len = self.save_type.capacity();

        if self.save_type.is_eeprom() {
            SaveWindow::Eeprom { len }
        } else {
            SaveWindow::Memory {
                address: ed64::SRAM,
                len,
                profile: TimingProfile::Sram,
            }
        }
    }
}

impl<B: Bus> Flashcart for EverDrive64<B> {
    fn init(&mut self) -> Result<(), Error> {
        self.dma.wait_idle()?;

        let version = Self::unlock(&mut self.dma);
        debug!("everdrive fpga version {version:#06x}");

        if version < MINIMUM_FPGA_VERSION {
            warn!("everdrive firmware is too old");
            return Err(Error::Outdated {
                found: version,
                minimum: MINIMUM_FPGA_VERSION,
            });
        }

        self.fpga_version = version;
        self.apply_save_type(SaveType::None)
    }

    fn deinit(&mut self) -> Result<(), Error> {
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
        Some(
            load_rom_image(&mut self.dma, fs, path, ed64::ROM, ROM_CAPACITY, progress)
                .map(|_| ()),
        )
    }

    fn load_file(
        &mut self,
        fs: &mut dyn FileSystem,
        path: &str,
        rom_offset: u32,
        file_offset: u64,
    ) -> Option<Result<(), Error>> {
        Some(load_file_region(
            &mut self.dma,
            fs,
            path,
            ed64::ROM,
            rom_offset,
            file_offset,
            ROM_CAPACITY,
        ))
    }

    fn load_save(&mut self, fs: &mut dyn FileSystem, path: &str) -> Option<Result<(), Error>> {
        let window = self.save_window();
        Some(load_save_image(&mut self.dma, fs, path, window))
    }

    fn store_save(&mut self, fs: &mut dyn FileSystem, path: &str) -> Option<Result<(), Error>> {
        if self.save_type == SaveType::None {
            return Some(Ok(()));
        }

        let window = self.save_window();
        Some(store_save_image(&mut self.dma, fs, path, window))
    }

    fn set_save_type(&mut self, save_type: AbstractSaveType) -> Option<Result<(), Error>> {
        let save_type = match save_type {
            AbstractSaveType::None => SaveType::None,
            AbstractSaveType::Eeprom4K => SaveType::Eeprom4K,
            AbstractSaveType::Eeprom16K => SaveType::Eeprom16K,
            AbstractSaveType::Sram => SaveType::Sram,
            AbstractSaveType::SramBanked | AbstractSaveType::Sram128K => SaveType::Sram128K,
            AbstractSaveType::FlashRam => SaveType::FlashRam,
            AbstractSaveType::FlashRamPkst2 => {
                return Some(Err(Error::UnsupportedSaveType(save_type)));
            }
        };

        Some(self.apply_save_type(save_type))
    }
}
