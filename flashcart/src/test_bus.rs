extern crate std;

use std::collections::BTreeMap;
use std::string::String;
use std::vec::Vec;
use std::{format, vec};

use flashcart_reg::{d64, ed64, pi};

use crate::Bus;

const PAGE_SIZE: usize = 0x1_0000;
const ROM_TIMING: [u32; 4] = [0x40, 0x12, 0x07, 0x03];
const TIMING_REGISTERS: [pi::TimingRegister; 4] = [
    pi::TimingRegister::Latency,
    pi::TimingRegister::PulseWidth,
    pi::TimingRegister::PageSize,
    pi::TimingRegister::Release,
];

/// Something the code under test did to a [`TestBus`].
///
/// Status register polls are not recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    PiWrite { register: u32, value: u32 },
    IoRead { address: u32 },
    IoWrite { address: u32, value: u32 },
    DmaRead { cart_address: u32, len: usize },
    DmaWrite { cart_address: u32, len: usize },
    CacheFlush { len: usize },
    EepromRead { block: usize },
    EepromWrite { block: usize },
}

/// The state of a simulated 64drive's cartridge interface.
pub struct D64Model {
    pub variant: u32,
    pub revision: u32,
    pub sdram_size: u32,
    pub save_type: u32,
    pub writeback: bool,
    pub cartrom_writes: bool,
    pub extended_mode: bool,
    pub commands: Vec<u8>,
    busy_polls: u32,
    stuck_command: Option<u8>,
    stuck: bool,
}

/// The state of a simulated EverDrive-64's configuration registers.
pub struct Ed64Model {
    pub fpga_version: u32,
    pub unlocked: bool,
    pub save_configs: Vec<u16>,
}

/// A test implementation of [`Bus`] which simulates the PI and a cartridge.
///
/// Cartridge space is sparse and reads as zero until written. Transfers
/// complete as soon as they are started, but the status register keeps
/// reporting busy for a few polls afterwards, and anything that touches the
/// bus while a transfer is still in flight is recorded as a violation.
pub struct TestBus {
    memory: BTreeMap<u32, std::boxed::Box<[u8]>>,
    pi: BTreeMap<u32, u32>,
    eeprom: Vec<u8>,
    d64: Option<D64Model>,
    ed64: Option<Ed64Model>,
    events: Vec<Event>,
    violations: Vec<String>,
    dma_latency: u32,
    dma_remaining: u32,
    transfers: usize,
    wedge_after_transfers: Option<usize>,
    wedged: bool,
}

impl TestBus {
    /// Creates an empty cartridge with the PI at its power-on ROM timing.
    pub fn new() -> Self {
        let mut pi = BTreeMap::new();
        for domain in [pi::Domain::Dom1, pi::Domain::Dom2] {
            for (register, value) in TIMING_REGISTERS.into_iter().zip(ROM_TIMING) {
                pi.insert(pi::timing_register(domain, register), value);
            }
        }

        Self {
            memory: BTreeMap::new(),
            pi,
            eeprom: vec![0xFF; 2048],
            d64: None,
            ed64: None,
            events: Vec::new(),
            violations: Vec::new(),
            dma_latency: 2,
            dma_remaining: 0,
            transfers: 0,
            wedge_after_transfers: None,
            wedged: false,
        }
    }

    /// Plugs in a 64drive.
    pub fn with_64drive(mut self, variant: u32, fpga_revision: u16, sdram_size: u32) -> Self {
        self.d64 = Some(D64Model {
            variant,
            revision: (2 << 16) | u32::from(fpga_revision),
            sdram_size,
            save_type: u32::MAX,
            writeback: true,
            cartrom_writes: true,
            extended_mode: false,
            commands: Vec::new(),
            busy_polls: 0,
            stuck_command: None,
            stuck: false,
        });
        self
    }

    /// Plugs in an EverDrive-64.
    pub fn with_ed64(mut self, fpga_version: u32) -> Self {
        self.ed64 = Some(Ed64Model {
            fpga_version,
            unlocked: false,
            save_configs: Vec::new(),
        });
        self
    }

    pub fn d64(&self) -> &D64Model {
        self.d64.as_ref().expect("no 64drive plugged in")
    }

    pub fn ed64(&self) -> &Ed64Model {
        self.ed64.as_ref().expect("no EverDrive-64 plugged in")
    }

    /// Makes the 64drive hang forever once it is sent `command`.
    pub fn stick_command(&mut self, command: u8) {
        self.d64
            .as_mut()
            .expect("no 64drive plugged in")
            .stuck_command = Some(command);
    }

    /// Makes the status register report busy forever.
    pub fn wedge(&mut self) {
        self.wedged = true;
    }

    /// Wedges the bus as soon as `transfers` more DMA transfers have started.
    pub fn wedge_after_transfers(&mut self, transfers: usize) {
        self.wedge_after_transfers = Some(self.transfers + transfers);
    }

    /// How many status polls a transfer stays busy for.
    pub fn set_dma_latency(&mut self, polls: u32) {
        self.dma_latency = polls;
    }

    pub fn is_busy(&self) -> bool {
        self.wedged || self.dma_remaining > 0
    }

    pub fn poke(&mut self, mut address: u32, mut data: &[u8]) {
        while !data.is_empty() {
            let (page, offset) = split(address);
            let len = data.len().min(PAGE_SIZE - offset);
            let page_data = self
                .memory
                .entry(page)
                .or_insert_with(|| vec![0; PAGE_SIZE].into_boxed_slice());

            page_data[offset..offset + len].copy_from_slice(&data[..len]);
            data = &data[len..];
            address += len as u32;
        }
    }

    pub fn peek(&self, address: u32, len: usize) -> Vec<u8> {
        let mut data = vec![0; len];
        self.peek_into(address, &mut data);
        data
    }

    fn peek_into(&self, mut address: u32, mut data: &mut [u8]) {
        while !data.is_empty() {
            let (page, offset) = split(address);
            let len = data.len().min(PAGE_SIZE - offset);

            match self.memory.get(&page) {
                Some(page_data) => data[..len].copy_from_slice(&page_data[offset..offset + len]),
                None => data[..len].fill(0),
            }

            data = &mut data[len..];
            address += len as u32;
        }
    }

    pub fn eeprom(&self) -> &[u8] {
        &self.eeprom
    }

    pub fn eeprom_mut(&mut self) -> &mut [u8] {
        &mut self.eeprom
    }

    pub fn pi_register(&self, register: u32) -> u32 {
        self.pi.get(&register).copied().unwrap_or(0)
    }

    /// Whether both domains are programmed with the ROM timing preset.
    pub fn has_rom_timing(&self) -> bool {
        [pi::Domain::Dom1, pi::Domain::Dom2].into_iter().all(|domain| {
            TIMING_REGISTERS
                .into_iter()
                .zip(ROM_TIMING)
                .all(|(register, value)| {
                    self.pi_register(pi::timing_register(domain, register)) == value
                })
        })
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn dma_events(&self) -> Vec<Event> {
        self.events
            .iter()
            .copied()
            .filter(|e| matches!(e, Event::DmaRead { .. } | Event::DmaWrite { .. }))
            .collect()
    }

    /// Every bus write of any kind. Reads and cache maintenance are left out.
    pub fn writes(&self) -> Vec<Event> {
        self.events
            .iter()
            .copied()
            .filter(|e| {
                matches!(
                    e,
                    Event::PiWrite { .. }
                        | Event::IoWrite { .. }
                        | Event::DmaWrite { .. }
                        | Event::EepromWrite { .. }
                )
            })
            .collect()
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    fn memory_word(&self, address: u32) -> u32 {
        let mut word = [0; 4];
        self.peek_into(address & !3, &mut word);
        u32::from_be_bytes(word)
    }

    fn check_idle(&mut self, what: &str) {
        if self.dma_remaining > 0 {
            self.violations
                .push(format!("{what} while a transfer was in flight"));
        }
    }

    fn start_transfer(&mut self) {
        self.check_idle("transfer started");
        self.transfers += 1;
        self.dma_remaining = self.dma_latency;

        if self.wedge_after_transfers == Some(self.transfers) {
            self.wedged = true;
        }
    }

    fn d64_register(&self, address: u32) -> Option<u32> {
        self.d64.as_ref()?;
        (d64::STATUS..d64::EEPROM).contains(&address).then_some(address)
    }

    fn d64_read(&mut self, register: u32) -> u32 {
        let Some(model) = self.d64.as_mut() else {
            return 0;
        };

        match register {
            d64::STATUS => {
                if model.stuck {
                    d64::STATUS_BUSY
                } else if model.busy_polls > 0 {
                    model.busy_polls -= 1;
                    d64::STATUS_BUSY
                } else {
                    0
                }
            }
            d64::SDRAM_SIZE => model.sdram_size,
            d64::MAGIC => d64::MAGIC_VALUE,
            d64::VARIANT => model.variant,
            d64::REVISION => model.revision,
            _ => 0,
        }
    }

    fn d64_write(&mut self, register: u32, value: u32) {
        let argument = self.memory_word(d64::BUFFER);
        let Some(model) = self.d64.as_mut() else {
            return;
        };

        if register != d64::COMMAND {
            return;
        }

        if model.busy_polls > 0 || model.stuck {
            self.violations
                .push(format!("64drive command {value:#04x} sent while busy"));
        }

        let command = value as u8;
        model.commands.push(command);

        if model.stuck_command == Some(command) {
            model.stuck = true;
            return;
        }

        model.busy_polls = 3;

        match command {
            0xD0 => model.save_type = argument,
            0xD1 => model.writeback = true,
            0xD2 => model.writeback = false,
            0xF0 => model.cartrom_writes = true,
            0xF1 => model.cartrom_writes = false,
            0xF8 => model.extended_mode = true,
            0xF9 => model.extended_mode = false,
            _ => self.violations.push(format!("unknown command {command:#04x}")),
        }
    }

    fn ed64_register(&self, address: u32) -> Option<u32> {
        self.ed64.as_ref()?;
        (ed64::BASE..ed64::BASE + 0x40)
            .contains(&address)
            .then_some((address - ed64::BASE) / 4)
    }

    fn ed64_read(&mut self, index: u32) -> u32 {
        let Some(model) = self.ed64.as_ref() else {
            return 0;
        };

        if index == ed64::Register::FpgaVersion as u32 {
            if model.unlocked {
                model.fpga_version
            } else {
                0xFFFF_FFFF
            }
        } else {
            0
        }
    }

    fn ed64_write(&mut self, index: u32, value: u32) {
        let Some(model) = self.ed64.as_mut() else {
            return;
        };

        if index == ed64::Register::Key as u32 {
            model.unlocked = value == ed64::KEY_UNLOCK;
        } else if index == ed64::Register::SaveCfg as u32 {
            model.save_configs.push(value as u16);
        }
    }
}

impl Default for TestBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for TestBus {
    fn pi_read(&mut self, register: u32) -> u32 {
        if register == pi::STATUS {
            if self.wedged {
                return 0b11;
            }
            if self.dma_remaining > 0 {
                self.dma_remaining -= 1;
                return 0b01;
            }
            return 0;
        }

        self.pi_register(register)
    }

    fn pi_write(&mut self, register: u32, value: u32) {
        self.events.push(Event::PiWrite { register, value });

        if register == pi::STATUS {
            if value & pi::STATUS_RESET != 0 {
                self.dma_remaining = 0;
            }
            return;
        }

        self.check_idle("PI register written");
        self.pi.insert(register, value);
    }

    fn io_read(&mut self, address: u32) -> u32 {
        self.events.push(Event::IoRead { address });
        self.check_idle("cartridge read");

        if let Some(register) = self.d64_register(address) {
            return self.d64_read(register);
        }
        if let Some(index) = self.ed64_register(address) {
            return self.ed64_read(index);
        }

        self.memory_word(address)
    }

    fn io_write(&mut self, address: u32, value: u32) {
        self.events.push(Event::IoWrite { address, value });
        self.check_idle("cartridge write");

        if let Some(register) = self.d64_register(address) {
            self.d64_write(register, value);
            return;
        }
        if let Some(index) = self.ed64_register(address) {
            self.ed64_write(index, value);
            return;
        }

        self.poke(address & !3, &value.to_be_bytes());
    }

    unsafe fn start_dma_read(&mut self, cart_address: u32, dram: &mut [u8]) {
        self.events.push(Event::DmaRead {
            cart_address,
            len: dram.len(),
        });
        check_transfer(&mut self.violations, dram.as_ptr(), cart_address, dram.len());
        self.start_transfer();

        self.peek_into(cart_address, dram);
    }

    unsafe fn start_dma_write(&mut self, cart_address: u32, dram: &[u8]) {
        self.events.push(Event::DmaWrite {
            cart_address,
            len: dram.len(),
        });
        check_transfer(&mut self.violations, dram.as_ptr(), cart_address, dram.len());
        self.start_transfer();

        self.poke(cart_address, dram);
    }

    fn cache_writeback_invalidate(&mut self, dram: &[u8]) {
        self.events.push(Event::CacheFlush { len: dram.len() });
    }

    fn eeprom_read_block(&mut self, block: usize, data: &mut [u8; 8]) {
        self.events.push(Event::EepromRead { block });
        data.copy_from_slice(&self.eeprom[block * 8..block * 8 + 8]);
    }

    fn eeprom_write_block(&mut self, block: usize, data: &[u8; 8]) {
        self.events.push(Event::EepromWrite { block });
        self.eeprom[block * 8..block * 8 + 8].copy_from_slice(data);
    }
}

fn split(address: u32) -> (u32, usize) {
    let page = address & !(PAGE_SIZE as u32 - 1);
    (page, (address - page) as usize)
}

fn check_transfer(violations: &mut Vec<String>, dram: *const u8, cart_address: u32, len: usize) {
    if dram as usize % 8 != 0 {
        violations.push(format!("unaligned RDRAM address {dram:p}"));
    }
    if cart_address % 2 != 0 {
        violations.push(format!("odd cartridge address {cart_address:#010x}"));
    }
    if len % 2 != 0 || len == 0 {
        violations.push(format!("bad transfer length {len}"));
    }
}
