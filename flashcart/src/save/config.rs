//! The EverDrive-64 save configuration register.

use flashcart_reg::ed64::{Register, SaveConfig};

use crate::register::RegisterPort;
use crate::save::SaveType;
use crate::Bus;

/// Computes the save configuration word for `save_type`.
///
/// `bank` selects the upper SRAM bank. Types the cart has no emulation for
/// turn every save memory off and always select bank 1.
pub(crate) fn save_config(save_type: SaveType, bank: bool) -> SaveConfig {
    let mut config = SaveConfig::from(0u16);
    let mut ram_bank = bank;

    match save_type {
        SaveType::Eeprom16K => {
            config.set_eeprom_on(true);
            config.set_eeprom_size(true);
        }
        SaveType::Eeprom4K => config.set_eeprom_on(true),
        SaveType::Sram => config.set_sram_on(true),
        SaveType::Sram128K => {
            config.set_sram_on(true);
            config.set_sram_size(true);
        }
        SaveType::FlashRam => config.set_sram_size(true),
        SaveType::None | SaveType::SramBanked | SaveType::FlashRamPkst2 => ram_bank = true,
    }

    config.set_ram_bank(ram_bank);
    config.set_apply(true);
    config
}

/// Writes the save configuration for `save_type` to the cart.
///
/// Writing the same configuration twice leaves the register in the same state.
pub(crate) fn configure<B: Bus>(port: &mut RegisterPort<'_, B>, save_type: SaveType, bank: bool) {
    let config = save_config(save_type, bank);
    port.write(Register::SaveCfg.address(), u32::from(u16::from(config)));
}
