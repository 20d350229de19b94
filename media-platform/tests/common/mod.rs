//! Simulated hardware behind the `embedded-hal` traits.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{self, I2c, NoAcknowledgeSource, Operation};
use embedded_hal::spi::{self, SpiBus};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Delay provider that returns at once and adds up what was asked for.
#[derive(Debug, Default)]
pub struct NoDelay {
    pub total_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

/// Chip-select failure injected by the simulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// Something that answers one SPI byte with another.
pub trait SpiDevice {
    fn select(&mut self, selected: bool);
    fn exchange(&mut self, input: u8) -> u8;
}

/// SPI bus half of a simulated device.
pub struct SimSpi<M> {
    model: Rc<RefCell<M>>,
}

impl<M> spi::ErrorType for SimSpi<M> {
    type Error = Infallible;
}

impl<M: SpiDevice> SpiBus<u8> for SimSpi<M> {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        let mut model = self.model.borrow_mut();
        for word in words {
            *word = model.exchange(0xFF);
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
        let mut model = self.model.borrow_mut();
        for &word in words {
            model.exchange(word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Infallible> {
        let mut model = self.model.borrow_mut();
        for i in 0..read.len().max(write.len()) {
            let out = model.exchange(write.get(i).copied().unwrap_or(0xFF));
            if let Some(slot) = read.get_mut(i) {
                *slot = out;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        let mut model = self.model.borrow_mut();
        for word in words {
            *word = model.exchange(*word);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Chip-select half of a simulated device.
pub struct SimCs<M> {
    model: Rc<RefCell<M>>,
    fault: Rc<RefCell<bool>>,
}

impl<M> digital::ErrorType for SimCs<M> {
    type Error = PinFault;
}

impl<M: SpiDevice> OutputPin for SimCs<M> {
    fn set_low(&mut self) -> Result<(), PinFault> {
        if *self.fault.borrow() {
            return Err(PinFault);
        }
        self.model.borrow_mut().select(true);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), PinFault> {
        if *self.fault.borrow() {
            return Err(PinFault);
        }
        self.model.borrow_mut().select(false);
        Ok(())
    }
}

/// Shared handle to a simulated SPI device for inspection after the
/// driver took ownership of the bus and pin.
pub struct SimHandle<M> {
    pub model: Rc<RefCell<M>>,
    fault: Rc<RefCell<bool>>,
}

impl<M: SpiDevice> SimHandle<M> {
    pub fn new(model: M) -> Self {
        Self {
            model: Rc::new(RefCell::new(model)),
            fault: Rc::new(RefCell::new(false)),
        }
    }

    pub fn bus(&self) -> (SimSpi<M>, SimCs<M>) {
        (
            SimSpi {
                model: Rc::clone(&self.model),
            },
            SimCs {
                model: Rc::clone(&self.model),
                fault: Rc::clone(&self.fault),
            },
        )
    }

    /// Make every chip-select operation fail from now on.
    pub fn break_chip_select(&self) {
        *self.fault.borrow_mut() = true;
    }
}

// SD card

/// What kind of card [`SimulatedCard`] pretends to be.
#[derive(Debug, Clone)]
pub struct CardProfile {
    /// Answers CMD8 with the check pattern.
    pub version2: bool,
    /// Sets the capacity bit in the OCR and uses block addressing.
    pub high_capacity: bool,
    /// Answers commands at all.
    pub responsive: bool,
    /// ACMD41 calls answered "idle" before the card is ready.
    pub acmd41_busy: u32,
    /// ACMD41 never completes, forcing the CMD1 fallback.
    pub acmd41_stuck: bool,
    /// CMD8 echoes a corrupted check pattern.
    pub bad_echo: bool,
    /// Extra R1 bits set in the CMD0 reply on top of IDLE.
    pub reset_flags: u8,
    /// Data blocks are answered with a write error token.
    pub reject_writes: bool,
    /// Capacity in 512 byte blocks.
    pub blocks: usize,
}

impl CardProfile {
    /// SDHC: version 2, block addressed.
    pub fn sdhc() -> Self {
        Self {
            version2: true,
            high_capacity: true,
            responsive: true,
            acmd41_busy: 2,
            acmd41_stuck: false,
            bad_echo: false,
            reset_flags: 0,
            reject_writes: false,
            blocks: 64,
        }
    }

    /// Version 2 standard capacity: byte addressed.
    pub fn sdsc_v2() -> Self {
        Self {
            high_capacity: false,
            ..Self::sdhc()
        }
    }

    /// Version 1: rejects CMD8, initialised with CMD1.
    pub fn v1() -> Self {
        Self {
            version2: false,
            high_capacity: false,
            ..Self::sdhc()
        }
    }
}

#[derive(Debug)]
enum Phase {
    Idle,
    Command(Vec<u8>),
    AwaitToken { multi: bool, address: u64 },
    Receiving { multi: bool, address: u64, data: Vec<u8> },
}

/// An SD card in SPI mode: command decoder, R1 responses, data tokens and a
/// byte store, with a log of every command index received.
#[derive(Debug)]
pub struct SimulatedCard {
    pub profile: CardProfile,
    selected: bool,
    outbox: VecDeque<u8>,
    phase: Phase,
    idle: bool,
    app_command: bool,
    acmd41_calls: u32,
    block_len: usize,
    memory: Vec<u8>,
    log: Vec<u8>,
    pub block_reads: usize,
    pub block_writes: usize,
    pub frames: Vec<[u8; 6]>,
}

impl SimulatedCard {
    pub fn new(profile: CardProfile) -> Self {
        let memory = vec![0; profile.blocks * 512];
        Self {
            profile,
            selected: false,
            outbox: VecDeque::new(),
            phase: Phase::Idle,
            idle: true,
            app_command: false,
            acmd41_calls: 0,
            block_len: 512,
            memory,
            log: Vec::new(),
            block_reads: 0,
            block_writes: 0,
            frames: Vec::new(),
        }
    }

    /// Command indices received since the last [`clear_log`](Self::clear_log).
    pub fn commands(&self) -> &[u8] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
        self.frames.clear();
        self.block_reads = 0;
        self.block_writes = 0;
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    fn r1(&self) -> u8 {
        u8::from(self.idle)
    }

    fn respond(&mut self, bytes: &[u8]) {
        // One byte of NCR before the response.
        self.outbox.push_back(0xFF);
        self.outbox.extend(bytes);
    }

    /// Byte offset for a data command argument, or `None` if misaligned or
    /// out of range.
    fn data_address(&self, arg: u32) -> Option<u64> {
        let address = if self.profile.high_capacity {
            u64::from(arg) * 512
        } else {
            if arg as usize % self.block_len != 0 {
                return None;
            }
            u64::from(arg)
        };
        (address as usize + self.block_len <= self.memory.len()).then_some(address)
    }

    fn execute(&mut self, frame: [u8; 6]) {
        self.frames.push(frame);
        let index = frame[0] & 0x3F;
        let arg = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
        self.log.push(index);
        if !self.profile.responsive {
            return;
        }

        let app = std::mem::take(&mut self.app_command);
        match (index, app) {
            (0, _) => {
                self.idle = true;
                self.acmd41_calls = 0;
                let r1 = 0x01 | self.profile.reset_flags;
                self.respond(&[r1]);
            }
            (8, _) if !self.profile.version2 => self.respond(&[0x05]),
            (8, _) => {
                let mut echo = (arg & 0xFFF).to_be_bytes();
                if self.profile.bad_echo {
                    echo[3] = 0x55;
                }
                let r1 = self.r1();
                self.respond(&[r1, echo[0], echo[1], echo[2], echo[3]]);
            }
            (55, _) => {
                self.app_command = true;
                let r1 = self.r1();
                self.respond(&[r1]);
            }
            (41, true) => {
                self.acmd41_calls += 1;
                if !self.profile.acmd41_stuck && self.acmd41_calls > self.profile.acmd41_busy {
                    self.idle = false;
                }
                let r1 = self.r1();
                self.respond(&[r1]);
            }
            (1, _) => {
                self.idle = false;
                self.respond(&[0x00]);
            }
            (58, _) => {
                let mut ocr: u32 = 0x80FF_8000;
                if self.profile.high_capacity {
                    ocr |= 0x4000_0000;
                }
                let r1 = self.r1();
                let ocr = ocr.to_be_bytes();
                self.respond(&[r1, ocr[0], ocr[1], ocr[2], ocr[3]]);
            }
            _ if self.idle => self.respond(&[0x01]),
            (16, _) => {
                if arg == 0 || (self.profile.high_capacity && arg != 512) {
                    self.respond(&[0x40]);
                } else {
                    self.block_len = arg as usize;
                    self.respond(&[0x00]);
                }
            }
            (17, _) => match self.data_address(arg) {
                Some(address) => {
                    self.block_reads += 1;
                    let start = address as usize;
                    let block = self.memory[start..start + self.block_len].to_vec();
                    let crc = crc16(&block);
                    self.respond(&[0x00, 0xFF, 0xFF, 0xFE]);
                    self.outbox.extend(block);
                    self.outbox.extend(crc.to_be_bytes());
                }
                None => self.respond(&[0x20]),
            },
            (24 | 25, _) => match self.data_address(arg) {
                Some(address) => {
                    self.respond(&[0x00]);
                    self.phase = Phase::AwaitToken {
                        multi: index == 25,
                        address,
                    };
                }
                None => self.respond(&[0x20]),
            },
            _ => {
                let r1 = self.r1() | 0x04;
                self.respond(&[r1]);
            }
        }
    }

    fn consume(&mut self, input: u8) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {
                if input & 0xC0 == 0x40 {
                    self.phase = Phase::Command(vec![input]);
                }
            }
            Phase::Command(mut bytes) => {
                bytes.push(input);
                if bytes.len() == 6 {
                    let mut frame = [0u8; 6];
                    frame.copy_from_slice(&bytes);
                    self.execute(frame);
                } else {
                    self.phase = Phase::Command(bytes);
                }
            }
            Phase::AwaitToken { multi, address } => match input {
                0xFE if !multi => {
                    self.phase = Phase::Receiving {
                        multi,
                        address,
                        data: Vec::new(),
                    }
                }
                0xFC if multi => {
                    self.phase = Phase::Receiving {
                        multi,
                        address,
                        data: Vec::new(),
                    }
                }
                0xFD if multi => {
                    // Stuff byte, then a little busy time.
                    self.outbox.extend([0xFF, 0x00, 0x00]);
                }
                _ => self.phase = Phase::AwaitToken { multi, address },
            },
            Phase::Receiving {
                multi,
                address,
                mut data,
            } => {
                data.push(input);
                if data.len() < self.block_len + 2 {
                    self.phase = Phase::Receiving {
                        multi,
                        address,
                        data,
                    };
                    return;
                }

                let block_len = self.block_len;
                let crc_ok = crc16(&data[..block_len]).to_be_bytes() == data[block_len..];
                let in_range = address as usize + block_len <= self.memory.len();
                if self.profile.reject_writes || !crc_ok || !in_range {
                    self.outbox.extend([0x0D, 0xFF]);
                } else {
                    let start = address as usize;
                    self.memory[start..start + block_len].copy_from_slice(&data[..block_len]);
                    self.block_writes += 1;
                    self.outbox.extend([0x05, 0x00, 0x00]);
                }
                if multi {
                    self.phase = Phase::AwaitToken {
                        multi,
                        address: address + block_len as u64,
                    };
                }
            }
        }
    }
}

impl SpiDevice for SimulatedCard {
    fn select(&mut self, selected: bool) {
        self.selected = selected;
        if !selected {
            self.outbox.clear();
            self.phase = Phase::Idle;
        }
    }

    fn exchange(&mut self, input: u8) -> u8 {
        if !self.selected {
            return 0xFF;
        }
        let out = self.outbox.pop_front().unwrap_or(0xFF);
        self.consume(input);
        out
    }
}

/// CRC-16/XMODEM, computed bitwise so the simulator does not share code
/// with the driver.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

// SRAM

/// A 23K256 in byte mode.
#[derive(Debug)]
pub struct SimulatedSram {
    pub memory: Vec<u8>,
    frame: Vec<u8>,
    selected: bool,
    pub transactions: usize,
}

impl SimulatedSram {
    pub fn new() -> Self {
        Self {
            memory: vec![0; 32 * 1024],
            frame: Vec::new(),
            selected: false,
            transactions: 0,
        }
    }

    fn address(&self) -> usize {
        usize::from(u16::from_be_bytes([self.frame[1], self.frame[2]])) % self.memory.len()
    }
}

impl SpiDevice for SimulatedSram {
    fn select(&mut self, selected: bool) {
        if selected && !self.selected {
            self.transactions += 1;
        }
        self.selected = selected;
        self.frame.clear();
    }

    fn exchange(&mut self, input: u8) -> u8 {
        if !self.selected {
            return 0xFF;
        }
        let mut out = 0x00;
        if self.frame.len() == 3 {
            let address = self.address();
            match self.frame[0] {
                0x03 => out = self.memory[address],
                0x02 => self.memory[address] = input,
                _ => {}
            }
        }
        self.frame.push(input);
        out
    }
}

// EEPROM

/// CAT24C64 chips on one I2C bus.
///
/// Writes roll over inside a 32 byte page like the real part, so a driver
/// that crosses a page boundary in one write corrupts data.
#[derive(Debug, Default)]
pub struct SimulatedEepromBus {
    pub chips: BTreeMap<u8, Vec<u8>>,
    pointers: BTreeMap<u8, usize>,
    /// `(bus address, data bytes)` of every write transaction.
    pub writes: Vec<(u8, usize)>,
}

impl SimulatedEepromBus {
    pub fn with_chips(addresses: &[u8]) -> Self {
        Self {
            chips: addresses.iter().map(|&a| (a, vec![0xFF; 8192])).collect(),
            ..Self::default()
        }
    }

    pub fn chip(&self, address: u8) -> &[u8] {
        &self.chips[&address]
    }
}

impl i2c::ErrorType for SimulatedEepromBus {
    type Error = i2c::ErrorKind;
}

impl I2c for SimulatedEepromBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let Some(memory) = self.chips.get_mut(&address) else {
            return Err(i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        };
        let pointer = self.pointers.entry(address).or_insert(0);

        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    if bytes.len() < 2 {
                        continue;
                    }
                    *pointer = usize::from(u16::from_be_bytes([bytes[0], bytes[1]]) & 0x1FFF);
                    let data = &bytes[2..];
                    if !data.is_empty() {
                        self.writes.push((address, data.len()));
                    }
                    for &byte in data {
                        memory[*pointer] = byte;
                        let page = *pointer & !0x1F;
                        *pointer = page | ((*pointer + 1) & 0x1F);
                    }
                }
                Operation::Read(buffer) => {
                    for slot in buffer.iter_mut() {
                        *slot = memory[*pointer];
                        *pointer = (*pointer + 1) % memory.len();
                    }
                }
            }
        }
        Ok(())
    }
}
