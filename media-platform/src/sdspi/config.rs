//! Retry budgets and timings for the SD card driver.

use media_adapters::DEFAULT_BLOCK_SIZE;

/// Tunables for [`SdCard`](super::SdCard).
///
/// Timeouts are attempt counts rather than wall-clock deadlines; the delay
/// provider turns them into time where the protocol waits between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SdCardConfig {
    /// Attempts per initialisation phase (CMD0, CMD8, ACMD41, CMD1, CMD16).
    pub init_attempts: u32,
    /// Attempts to get a ready R1 for a data command (CMD17/24/25/58).
    pub command_attempts: u32,
    /// Extra bytes clocked while waiting for an R1 response.
    pub response_poll_limit: u32,
    /// Bytes clocked while waiting for a data start token.
    pub data_token_poll_limit: u32,
    /// Bytes clocked while waiting for a data response token.
    pub data_response_poll_limit: u32,
    /// Bytes clocked while the card signals busy after a write.
    pub busy_poll_limit: u32,
    /// Pause between initialisation attempts, in microseconds.
    pub retry_delay_us: u32,
    /// Pause after power-up before the first clocks, in microseconds.
    pub power_up_delay_us: u32,
    /// Idle bytes clocked with chip-select high before CMD0.
    pub idle_clock_bytes: usize,
    /// Block length negotiated with CMD16.
    pub block_size: usize,
}

impl SdCardConfig {
    /// Settings for simulated cards: no waiting between attempts.
    pub const fn without_delays() -> Self {
        Self {
            retry_delay_us: 0,
            power_up_delay_us: 0,
            ..Self::DEFAULT
        }
    }

    const DEFAULT: Self = Self {
        init_attempts: 100,
        command_attempts: 8,
        response_poll_limit: 255,
        data_token_poll_limit: 10_000,
        data_response_poll_limit: 255,
        busy_poll_limit: 250_000,
        retry_delay_us: 10_000,
        power_up_delay_us: 1_000,
        idle_clock_bytes: 80,
        block_size: DEFAULT_BLOCK_SIZE,
    };
}

impl Default for SdCardConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
