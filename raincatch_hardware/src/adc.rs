//! MCP3008 ADC on SPI0 reading the rain sensor's analog output.
//!
//! The Pi has no analog inputs. Readings are scaled from 10 to 12 bits so
//! thresholds stay comparable with a 12-bit, full-range (0..3.3 V) ADC.

use raincatch_traits::{BoxError, RainSensor};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing::trace;

use crate::error::{HwError, Result};

const SPI_CLOCK_HZ: u32 = 1_000_000;

pub struct Mcp3008RainSensor {
    spi: Spi,
    channel: u8,
}

impl Mcp3008RainSensor {
    pub fn new(channel: u8) -> Result<Self> {
        if channel > 7 {
            return Err(HwError::AdcChannel(channel));
        }
        let spi = Spi::new(Bus::Spi0, SlaveSelect::Ss0, SPI_CLOCK_HZ, Mode::Mode0)
            .map_err(|e| HwError::Spi(format!("open spi0: {e}")))?;
        Ok(Self { spi, channel })
    }

    /// Single-ended conversion on the configured channel, 0..=1023.
    pub fn read_counts(&mut self) -> Result<u16> {
        let tx = [0x01, (0x08 | self.channel) << 4, 0x00];
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| HwError::Spi(format!("mcp3008 transfer: {e}")))?;
        let counts = (u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2]);
        trace!(channel = self.channel, counts, "mcp3008 sample");
        Ok(counts)
    }
}

impl RainSensor for Mcp3008RainSensor {
    fn read_raw(&mut self) -> std::result::Result<u16, BoxError> {
        Ok(self.read_counts()? << 2)
    }
}
