//! SD card over SPI.
//!
//! [`SdCard`] drives a card in SPI mode through the `embedded-hal` 1.0
//! blocking traits: a [`SpiBus`], a chip-select [`OutputPin`] and a
//! [`DelayNs`] provider. It implements [`BlockDevice`] for whole-block
//! transfers and [`StorageMedia`] for byte-addressed access, where unaligned
//! ranges go through the read-modify-write engine in
//! [`block_io`](media_adapters::block_io).
//!
//! Every polling loop is bounded by [`SdCardConfig`]; a card that never
//! answers produces an error instead of a hang.
//!
//! # Examples
//!
//! ```ignore
//! use media_platform::sdspi::SdCard;
//! use media_platform::{SharedBuffer, StorageMedia};
//!
//! let mut card = SdCard::new(spi, cs, delay);
//! if card.needs_initialization() {
//!     card.initialize()?;
//!     card.after_initialize()?;
//! }
//! card.write(&SharedBuffer::from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]), 2)?;
//! ```

pub mod command;
mod config;
mod error;
pub mod response;
mod state;

use alloc::vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, SpiBus};
use media_adapters::{
    BlockAddress, BlockDevice, BlockGeometry, SharedBuffer, StorageMedia, block_io,
};

use command::{
    ACMD41, CMD0, CMD1, CMD8, CMD16, CMD17, CMD24, CMD25, CMD55, CMD58, Command,
    DATA_RES_ACCEPTED, DATA_RES_MASK, DATA_START_BLOCK, HCS_ARGUMENT, IF_COND_ARGUMENT,
    STOP_TRAN_TOKEN, WRITE_MULTIPLE_TOKEN, data_crc,
};

pub use config::SdCardConfig;
pub use error::SdCardError;
pub use response::{Ocr, R1};
pub use state::{Addressing, CardState, CardVersion};

/// Largest block length accepted by [`SdCard::set_block_size`].
pub const MAX_BLOCK_SIZE: usize = 2048;

/// Echo of [`IF_COND_ARGUMENT`] expected from a version 2 card.
const IF_COND_ECHO: [u8; 4] = [0x00, 0x00, 0x01, 0xAA];

type Error<SPI, CS> =
    SdCardError<<SPI as spi::ErrorType>::Error, <CS as digital::ErrorType>::Error>;

/// An SD card attached to an SPI bus.
///
/// The card starts [`Uninitialized`](CardState::Uninitialized); run
/// [`init`](Self::init) (or [`StorageMedia::initialize`]) before block I/O.
pub struct SdCard<SPI, CS, D> {
    spi: SPI,
    cs: CS,
    delay: D,
    config: SdCardConfig,
    state: CardState,
    version: Option<CardVersion>,
    addressing: Option<Addressing>,
    block_size: usize,
}

impl<SPI, CS, D> SdCard<SPI, CS, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    D: DelayNs,
{
    /// Card with the default configuration.
    pub fn new(spi: SPI, cs: CS, delay: D) -> Self {
        Self::with_config(spi, cs, delay, SdCardConfig::default())
    }

    /// Card with explicit retry budgets and timings.
    ///
    /// # Panics
    ///
    /// Panics if `config.block_size` is zero or larger than
    /// [`MAX_BLOCK_SIZE`].
    pub fn with_config(spi: SPI, cs: CS, delay: D, config: SdCardConfig) -> Self {
        assert!(
            config.block_size > 0 && config.block_size <= MAX_BLOCK_SIZE,
            "invalid block size"
        );
        Self {
            spi,
            cs,
            delay,
            config,
            state: CardState::Uninitialized,
            version: None,
            addressing: None,
            block_size: config.block_size,
        }
    }

    /// Give back the bus, the chip-select pin and the delay provider.
    pub fn release(self) -> (SPI, CS, D) {
        (self.spi, self.cs, self.delay)
    }

    /// Current initialisation state.
    pub fn state(&self) -> CardState {
        self.state
    }

    /// Version detected during initialisation.
    pub fn card_version(&self) -> Option<CardVersion> {
        self.version
    }

    /// Addressing mode read from the OCR during initialisation.
    pub fn addressing(&self) -> Option<Addressing> {
        self.addressing
    }

    /// Current block length in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Active configuration.
    pub fn config(&self) -> &SdCardConfig {
        &self.config
    }

    /// Bring the card from power-up to [`Ready`](CardState::Ready).
    ///
    /// Can be called again to reset a card that went astray.
    ///
    /// # Errors
    ///
    /// Bus and pin failures are returned as they are. A phase that runs out
    /// of attempts yields [`SdCardError::InitializationFailed`] naming that
    /// phase, and the card is left in [`CardState::InitFailed`].
    pub fn init(&mut self) -> Result<(), Error<SPI, CS>> {
        self.version = None;
        self.addressing = None;

        match self.run_init() {
            Ok(()) => {
                self.state = CardState::Ready;
                debug!(
                    "SD card ready: {:?}, {:?} addressing, {} byte blocks",
                    self.version,
                    self.addressing,
                    self.block_size
                );
                Ok(())
            }
            Err(e) => {
                let stage = self.state;
                self.state = CardState::InitFailed;
                warn!("SD card initialization failed during {}", stage);
                if e.is_transport() {
                    Err(e)
                } else {
                    Err(SdCardError::InitializationFailed { stage })
                }
            }
        }
    }

    fn run_init(&mut self) -> Result<(), Error<SPI, CS>> {
        self.enter(CardState::Reset);
        self.cs.set_high().map_err(SdCardError::ChipSelect)?;
        self.delay.delay_us(self.config.power_up_delay_us);
        for _ in 0..self.config.idle_clock_bytes {
            self.exchange(0xFF)?;
        }
        self.delay.delay_us(self.config.power_up_delay_us);

        // Other status bits alongside IDLE do not hold up the reset.
        self.retry(|card| {
            let r1 = card.send_command(Command::new(CMD0, 0))?;
            if r1.contains(R1::IDLE) && !r1.contains(R1::ILLEGAL_COMMAND) {
                Ok(())
            } else {
                Err(SdCardError::Rejected {
                    command: CMD0,
                    response: r1,
                })
            }
        })?;

        self.enter(CardState::VersionProbe);
        let version = match self.retry(Self::probe_version) {
            Ok(version) => version,
            Err(e) if e.is_transport() => return Err(e),
            Err(_) => CardVersion::Unknown,
        };
        self.version = Some(version);
        debug!("SD card version: {:?}", version);

        self.enter(CardState::PowerUpPolling);
        let mut powered_up = false;
        if version == CardVersion::V2 {
            match self.retry(|card| {
                card.send_command(Command::new(CMD55, 0))?;
                let r1 = card.send_command(Command::new(ACMD41, HCS_ARGUMENT))?;
                expect(ACMD41, r1, R1::empty())
            }) {
                Ok(()) => powered_up = true,
                Err(e) if e.is_transport() => return Err(e),
                Err(_) => debug!("ACMD41 never reported ready, falling back to CMD1"),
            }
        }
        if !powered_up {
            self.retry(|card| {
                let r1 = card.send_command(Command::new(CMD1, 0))?;
                expect(CMD1, r1, R1::empty())
            })?;
        }

        let ocr = self.read_ocr()?;
        let addressing = if ocr.is_high_capacity() {
            Addressing::Block
        } else {
            Addressing::Byte
        };
        self.addressing = Some(addressing);
        self.enter(CardState::AddressingModeKnown);

        self.negotiate_block_size(self.config.block_size)
    }

    fn enter(&mut self, state: CardState) {
        debug!("SD card state: {} -> {}", self.state, state);
        self.state = state;
    }

    /// Run `attempt` until it succeeds or the per-phase budget is spent.
    ///
    /// Transport errors end the loop at once; anything else is retried after
    /// the configured delay and the last one is returned.
    fn retry<T>(
        &mut self,
        mut attempt: impl FnMut(&mut Self) -> Result<T, Error<SPI, CS>>,
    ) -> Result<T, Error<SPI, CS>> {
        let attempts = self.config.init_attempts.max(1);
        let mut failed = 0;
        loop {
            match attempt(self) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transport() => return Err(e),
                Err(e) => {
                    failed += 1;
                    if failed >= attempts {
                        return Err(e);
                    }
                    trace!("{}: attempt {} of {} failed", self.state, failed, attempts);
                    self.delay.delay_us(self.config.retry_delay_us);
                }
            }
        }
    }

    fn probe_version(&mut self) -> Result<CardVersion, Error<SPI, CS>> {
        self.transaction(|card| match card.command(Command::new(CMD8, IF_COND_ARGUMENT)) {
            // Version 1 cards may not answer CMD8 at all.
            Err(SdCardError::ResponseTimeout { .. }) => Ok(CardVersion::V1),
            Err(e) => Err(e),
            Ok(r1) if r1.contains(R1::ILLEGAL_COMMAND) => Ok(CardVersion::V1),
            Ok(r1) if r1 == R1::IDLE => {
                let mut echo = [0xFF; 4];
                card.receive(&mut echo)?;
                if echo == IF_COND_ECHO {
                    Ok(CardVersion::V2)
                } else {
                    trace!("CMD8 echo mismatch: {:?}", echo);
                    Err(SdCardError::Rejected {
                        command: CMD8,
                        response: r1,
                    })
                }
            }
            Ok(r1) => Err(SdCardError::Rejected {
                command: CMD8,
                response: r1,
            }),
        })
    }

    /// Read the operation conditions register (CMD58).
    ///
    /// # Errors
    ///
    /// Returns an error if the card rejects CMD58 or the bus fails.
    pub fn read_ocr(&mut self) -> Result<Ocr, Error<SPI, CS>> {
        self.transaction(|card| {
            card.start_data_command(Command::new(CMD58, 0))?;
            let mut ocr = [0xFF; 4];
            card.receive(&mut ocr)?;
            Ok(Ocr::from_bytes(ocr))
        })
    }

    /// Change the block length with CMD16.
    ///
    /// High capacity cards have a fixed 512 byte block and reject other
    /// lengths.
    ///
    /// # Errors
    ///
    /// Returns [`SdCardError::InvalidBlockSize`] for zero or sizes above
    /// [`MAX_BLOCK_SIZE`], [`SdCardError::NotInitialized`] before
    /// initialisation, or the card's rejection.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<(), Error<SPI, CS>> {
        if block_size == 0 || block_size > MAX_BLOCK_SIZE {
            return Err(SdCardError::InvalidBlockSize(block_size));
        }
        self.ensure_ready()?;
        self.negotiate_block_size(block_size)
    }

    fn negotiate_block_size(&mut self, block_size: usize) -> Result<(), Error<SPI, CS>> {
        self.retry(|card| {
            let r1 = card.send_command(Command::new(CMD16, block_size as u32))?;
            expect(CMD16, r1, R1::empty())
        })?;
        self.block_size = block_size;
        Ok(())
    }

    /// Read block `block` into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the card is not ready, rejects the read, never
    /// sends its data token, or the bus fails.
    pub fn read_single_block(
        &mut self,
        block: u32,
    ) -> Result<SharedBuffer<'static>, Error<SPI, CS>> {
        let mut data = vec![0u8; self.block_size];
        self.read_block_into(block, &mut data)?;
        Ok(SharedBuffer::from(data))
    }

    /// Write `buffer` to block `block`.
    ///
    /// # Errors
    ///
    /// Returns [`SdCardError::BlockSizeMismatch`] without touching the bus if
    /// `buffer` is not exactly one block long. Otherwise fails if the card is
    /// not ready, refuses the data, stays busy, or the bus fails.
    pub fn write_single_block(
        &mut self,
        buffer: &SharedBuffer<'_>,
        block: u32,
    ) -> Result<(), Error<SPI, CS>> {
        self.check_block_len(buffer.len())?;
        self.write_block_from(block, &buffer.to_vec())
    }

    /// Write consecutive blocks starting at `first_block` with one CMD25.
    ///
    /// # Errors
    ///
    /// Returns [`SdCardError::BlockSizeMismatch`] without touching the bus if
    /// `buffer` is empty or not a whole number of blocks. A failure part way
    /// leaves the earlier blocks written.
    pub fn write_multiple_blocks(
        &mut self,
        buffer: &SharedBuffer<'_>,
        first_block: u32,
    ) -> Result<(), Error<SPI, CS>> {
        let len = buffer.len();
        if len == 0 || len % self.block_size != 0 {
            return Err(SdCardError::BlockSizeMismatch {
                expected: self.block_size,
                actual: len,
            });
        }
        self.ensure_ready()?;

        let count = len / self.block_size;
        // The last block must be addressable too.
        let last = u32::try_from(count - 1)
            .ok()
            .and_then(|n| first_block.checked_add(n))
            .ok_or(SdCardError::AddressOverflow)?;
        self.device_address(last)?;
        let address = self.device_address(first_block)?;

        let data = buffer.to_vec();
        trace!("CMD25: {} blocks from {}", count, first_block);
        self.transaction(|card| {
            card.start_data_command(Command::new(CMD25, address))?;
            for chunk in data.chunks(card.block_size) {
                card.send_data_block(WRITE_MULTIPLE_TOKEN, chunk)?;
            }
            card.exchange(STOP_TRAN_TOKEN)?;
            // Stuff byte before the card signals busy.
            card.exchange(0xFF)?;
            card.wait_not_busy()
        })
    }

    fn read_block_into(&mut self, block: u32, dest: &mut [u8]) -> Result<(), Error<SPI, CS>> {
        self.check_block_len(dest.len())?;
        self.ensure_ready()?;
        let address = self.device_address(block)?;
        self.transaction(|card| {
            card.start_data_command(Command::new(CMD17, address))?;
            let token = card
                .poll(card.config.data_token_poll_limit, |b| b != 0xFF)?
                .ok_or(SdCardError::DataTokenTimeout)?;
            if token != DATA_START_BLOCK {
                return Err(SdCardError::DataError(token));
            }
            card.receive(dest)?;
            let mut crc = [0xFF; 2];
            card.receive(&mut crc)
        })
    }

    fn write_block_from(&mut self, block: u32, src: &[u8]) -> Result<(), Error<SPI, CS>> {
        self.check_block_len(src.len())?;
        self.ensure_ready()?;
        let address = self.device_address(block)?;
        self.transaction(|card| {
            card.start_data_command(Command::new(CMD24, address))?;
            card.send_data_block(DATA_START_BLOCK, src)
        })
    }

    fn check_block_len(&self, len: usize) -> Result<(), Error<SPI, CS>> {
        if len == self.block_size {
            Ok(())
        } else {
            Err(SdCardError::BlockSizeMismatch {
                expected: self.block_size,
                actual: len,
            })
        }
    }

    fn ensure_ready(&self) -> Result<(), Error<SPI, CS>> {
        if self.state.is_ready() {
            Ok(())
        } else {
            Err(SdCardError::NotInitialized)
        }
    }

    /// Command argument for `block`: a byte offset or the block number.
    fn device_address(&self, block: u32) -> Result<u32, Error<SPI, CS>> {
        let multiplier = self
            .addressing
            .unwrap_or(Addressing::Byte)
            .multiplier(self.block_size);
        block
            .checked_mul(multiplier)
            .ok_or(SdCardError::AddressOverflow)
    }

    // Transport

    /// Assert chip-select around `op`.
    ///
    /// Chip-select is raised and one idle byte clocked afterwards even when
    /// `op` fails, so the card releases the bus.
    fn transaction<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, Error<SPI, CS>>,
    ) -> Result<T, Error<SPI, CS>> {
        self.cs.set_low().map_err(SdCardError::ChipSelect)?;
        let result = op(self);
        let released = self
            .cs
            .set_high()
            .map_err(SdCardError::ChipSelect)
            .and_then(|()| self.exchange(0xFF).map(|_| ()));
        let value = result?;
        released?;
        Ok(value)
    }

    /// One command in its own transaction.
    fn send_command(&mut self, cmd: Command) -> Result<R1, Error<SPI, CS>> {
        self.transaction(|card| card.command(cmd))
    }

    /// Send a command frame and wait for its R1.
    fn command(&mut self, cmd: Command) -> Result<R1, Error<SPI, CS>> {
        self.exchange(0xFF)?;
        self.spi.write(&cmd.frame()).map_err(SdCardError::Spi)?;
        self.poll(self.config.response_poll_limit, |b| b & 0x80 == 0)?
            .map(R1::from_byte)
            .ok_or(SdCardError::ResponseTimeout {
                command: cmd.index(),
            })
    }

    /// Issue a data command until the card accepts it.
    ///
    /// Runs inside the caller's transaction.
    fn start_data_command(&mut self, cmd: Command) -> Result<(), Error<SPI, CS>> {
        let attempts = self.config.command_attempts.max(1);
        let mut last = None;
        for _ in 0..attempts {
            match self.command(cmd) {
                Ok(r1) if r1.is_ready() => return Ok(()),
                Ok(r1) => {
                    trace!("CMD{} answered {}", cmd.index(), r1.bits());
                    last = Some(r1);
                }
                Err(SdCardError::ResponseTimeout { .. }) => {
                    trace!("CMD{} unanswered", cmd.index());
                    last = None;
                }
                Err(e) => return Err(e),
            }
        }
        Err(match last {
            Some(response) => SdCardError::Rejected {
                command: cmd.index(),
                response,
            },
            None => SdCardError::ResponseTimeout {
                command: cmd.index(),
            },
        })
    }

    /// Send one data block with its start token and CRC, then wait for the
    /// card to accept and program it.
    fn send_data_block(&mut self, token: u8, data: &[u8]) -> Result<(), Error<SPI, CS>> {
        self.exchange(0xFF)?;
        self.exchange(token)?;
        self.spi.write(data).map_err(SdCardError::Spi)?;
        self.spi
            .write(&data_crc(data).to_be_bytes())
            .map_err(SdCardError::Spi)?;

        let response = self
            .poll(self.config.data_response_poll_limit, |b| b != 0xFF)?
            .ok_or(SdCardError::DataResponseTimeout)?;
        if response & DATA_RES_MASK != DATA_RES_ACCEPTED {
            warn!("SD card rejected data block: {}", response);
            return Err(SdCardError::WriteRejected(response));
        }
        self.wait_not_busy()
    }

    fn wait_not_busy(&mut self) -> Result<(), Error<SPI, CS>> {
        self.poll(self.config.busy_poll_limit, |b| b == 0xFF)?
            .map(|_| ())
            .ok_or(SdCardError::BusyTimeout)
    }

    /// Clock out `0xFF` up to `limit + 1` times until `done` accepts the
    /// byte read back.
    fn poll(
        &mut self,
        limit: u32,
        done: impl Fn(u8) -> bool,
    ) -> Result<Option<u8>, Error<SPI, CS>> {
        for _ in 0..=limit {
            let byte = self.exchange(0xFF)?;
            if done(byte) {
                return Ok(Some(byte));
            }
        }
        Ok(None)
    }

    /// Fill `dest` while keeping the data line high.
    fn receive(&mut self, dest: &mut [u8]) -> Result<(), Error<SPI, CS>> {
        dest.fill(0xFF);
        self.spi.transfer_in_place(dest).map_err(SdCardError::Spi)
    }

    fn exchange(&mut self, byte: u8) -> Result<u8, Error<SPI, CS>> {
        let mut buf = [byte];
        self.spi
            .transfer_in_place(&mut buf)
            .map_err(SdCardError::Spi)?;
        Ok(buf[0])
    }
}

fn expect<S, P>(command: u8, response: R1, wanted: R1) -> Result<(), SdCardError<S, P>> {
    if response == wanted {
        Ok(())
    } else {
        Err(SdCardError::Rejected { command, response })
    }
}

impl<SPI, CS, D> BlockDevice for SdCard<SPI, CS, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    D: DelayNs,
{
    type Error = Error<SPI, CS>;

    fn geometry(&self) -> BlockGeometry {
        BlockGeometry::new(self.block_size).unwrap_or_default()
    }

    fn read_block(&mut self, block: BlockAddress, dest: &mut [u8]) -> Result<(), Self::Error> {
        self.read_block_into(block.value(), dest)
    }

    fn write_block(&mut self, block: BlockAddress, src: &[u8]) -> Result<(), Self::Error> {
        self.write_block_from(block.value(), src)
    }
}

impl<SPI, CS, D> StorageMedia for SdCard<SPI, CS, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    D: DelayNs,
{
    type Error = Error<SPI, CS>;

    fn write(&mut self, buffer: &SharedBuffer<'_>, offset: u64) -> Result<(), Self::Error> {
        block_io::write_bytes(self, offset, buffer.cells()).map_err(SdCardError::from_media)
    }

    fn read_into(&mut self, offset: u64, buffer: &SharedBuffer<'_>) -> Result<(), Self::Error> {
        block_io::read_bytes(self, offset, buffer.cells()).map_err(SdCardError::from_media)
    }

    fn needs_initialization(&self) -> bool {
        !self.state.is_ready()
    }

    fn initialize(&mut self) -> Result<(), Self::Error> {
        self.init()
    }
}

impl<SPI, CS, D> core::fmt::Debug for SdCard<SPI, CS, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SdCard")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("addressing", &self.addressing)
            .field("block_size", &self.block_size)
            .finish_non_exhaustive()
    }
}
