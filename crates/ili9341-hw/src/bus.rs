//! SPI bus transport over a Linux spidev character device.
//!
//! Every call to [`Bus::transfer`] becomes one `SPI_IOC_MESSAGE` ioctl, so
//! chip-select stays asserted across all of its segments. No retries happen
//! here; a failed transfer is reported and the caller decides what to resend.

use crate::{Error, Result};
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use std::path::Path;
use tracing::{info, trace};

/// Default SCLK rate.
pub const DEFAULT_SPEED_HZ: u32 = 32_000_000;

/// Default word size.
pub const DEFAULT_BITS_PER_WORD: u8 = 8;

/// One leg of a bus transaction.
#[derive(Debug)]
pub enum Segment<'a> {
    /// Clock bytes out, discard whatever comes back.
    Write(&'a [u8]),
    /// Clock the buffer's length in, sending nothing meaningful.
    Read(&'a mut [u8]),
}

impl Segment<'_> {
    /// Number of bytes this segment moves.
    pub fn len(&self) -> usize {
        match self {
            Segment::Write(tx) => tx.len(),
            Segment::Read(rx) => rx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A serial bus able to run multi-segment transactions atomically.
pub trait Bus {
    /// Runs all segments as a single transaction with chip-select held.
    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> Result<()>;

    /// Writes `bytes` as a single-segment transaction.
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.transfer(&mut [Segment::Write(bytes)])
    }

    /// Writes `header`, then reads `rx.len()` bytes, in one transaction.
    fn write_read(&mut self, header: &[u8], rx: &mut [u8]) -> Result<()> {
        self.transfer(&mut [Segment::Write(header), Segment::Read(rx)])
    }
}

/// Per-transfer bus parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Clock speed in Hz.
    pub speed_hz: u32,
    /// Bits per word.
    pub bits_per_word: u8,
    /// Delay after each segment in microseconds.
    pub delay_us: u16,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            speed_hz: DEFAULT_SPEED_HZ,
            bits_per_word: DEFAULT_BITS_PER_WORD,
            delay_us: 0,
        }
    }
}

/// spidev-backed bus.
pub struct SpidevBus {
    device: Spidev,
    config: BusConfig,
}

impl SpidevBus {
    /// Opens and configures the spidev device at `path` (SPI mode 0).
    pub fn open<P: AsRef<Path>>(path: P, config: BusConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |source| Error::DeviceUnavailable {
            path: path.clone(),
            source,
        };

        let mut device = Spidev::open(&path).map_err(unavailable)?;
        let options = SpidevOptions::new()
            .bits_per_word(config.bits_per_word)
            .max_speed_hz(config.speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        device.configure(&options).map_err(unavailable)?;

        info!(
            "SPI device opened at {} ({} Hz, {} bits/word)",
            path.display(),
            config.speed_hz,
            config.bits_per_word
        );

        Ok(Self { device, config })
    }
}

impl Bus for SpidevBus {
    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> Result<()> {
        let config = self.config;
        let mut transfers: Vec<SpidevTransfer> = segments
            .iter_mut()
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let mut transfer = match segment {
                    Segment::Write(tx) => SpidevTransfer::write(tx),
                    Segment::Read(rx) => SpidevTransfer::read(rx),
                };
                transfer.speed_hz = config.speed_hz;
                transfer.bits_per_word = config.bits_per_word;
                transfer.delay_usecs = config.delay_us;
                transfer
            })
            .collect();

        if transfers.is_empty() {
            return Ok(());
        }

        trace!("SPI transaction: {} segment(s)", transfers.len());
        self.device
            .transfer_multiple(&mut transfers)
            .map_err(Error::Transfer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BusConfig::default();
        assert_eq!(config.speed_hz, 32_000_000);
        assert_eq!(config.bits_per_word, 8);
        assert_eq!(config.delay_us, 0);
    }

    #[test]
    fn test_segment_len() {
        let tx = [0x2C, 0x00];
        let mut rx = [0u8; 4];
        assert_eq!(Segment::Write(&tx).len(), 2);
        assert_eq!(Segment::Read(&mut rx).len(), 4);
        assert!(Segment::Write(&[]).is_empty());
    }

    #[test]
    fn test_open_missing_device() {
        let err = SpidevBus::open("/nonexistent/spidev9.9", BusConfig::default())
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::DeviceUnavailable);
    }

    // Hardware tests are skipped by default
    #[test]
    #[ignore]
    fn test_device_open() {
        let bus = SpidevBus::open("/dev/spidev0.0", BusConfig::default());
        assert!(bus.is_ok());
    }
}
