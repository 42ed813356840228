//! EEPROM saves.
//!
//! The cartridge EEPROM sits on the joybus, not the PI, and is accessed in
//! blocks of 8 bytes. Reads and writes that do not cover whole blocks read
//! the block first so that the bytes around them are preserved.

use core::cmp;

use crate::Bus;

const BLOCK_SHIFT: usize = 3;
const BLOCK_LEN: usize = 1 << BLOCK_SHIFT;
const BLOCK_MASK: usize = BLOCK_LEN - 1;

/// Writes a block, keeping any current contents outside `data`'s range.
fn write_block_safe(bus: &mut impl Bus, block: usize, data: &[u8], start: usize) {
    let mut buf = [0; BLOCK_LEN];
    bus.eeprom_read_block(block, &mut buf);
    buf[start..start + data.len()].copy_from_slice(data);
    bus.eeprom_write_block(block, &buf);
}

fn write_block(bus: &mut impl Bus, block: usize, data: &[u8], start: usize) {
    match <&[u8; BLOCK_LEN]>::try_from(data) {
        Ok(whole) if start == 0 => bus.eeprom_write_block(block, whole),
        _ => write_block_safe(bus, block, data, start),
    }
}

pub(super) fn read(bus: &mut impl Bus, mut offset: usize, mut buf: &mut [u8]) {
    while !buf.is_empty() {
        let start = offset & BLOCK_MASK;
        let end_len = cmp::min(BLOCK_LEN - start, buf.len());

        let mut block = [0; BLOCK_LEN];
        bus.eeprom_read_block(offset >> BLOCK_SHIFT, &mut block);
        buf[..end_len].copy_from_slice(&block[start..start + end_len]);

        buf = &mut buf[end_len..];
        offset += end_len;
    }
}

pub(super) fn write(bus: &mut impl Bus, mut offset: usize, mut buf: &[u8]) {
    while !buf.is_empty() {
        let start = offset & BLOCK_MASK;
        let end_len = cmp::min(BLOCK_LEN - start, buf.len());

        write_block(bus, offset >> BLOCK_SHIFT, &buf[..end_len], start);

        buf = &buf[end_len..];
        offset += end_len;
    }
}
