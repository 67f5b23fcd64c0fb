//! MCP3008 10-bit SPI converter reading the fader wiper.
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing::trace;

use crate::error::{HwError, Result};

pub struct Mcp3008 {
    spi: Spi,
    channel: u8,
}

impl Mcp3008 {
    pub fn new(bus: u8, slave_select: u8, clock_hz: u32, channel: u8) -> Result<Self> {
        if channel > 7 {
            return Err(HwError::InvalidChannel(channel));
        }
        let bus = match bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            other => return Err(HwError::Spi(format!("unsupported spi bus {other}"))),
        };
        let ss = match slave_select {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => return Err(HwError::Spi(format!("unsupported slave select {other}"))),
        };
        let spi = Spi::new(bus, ss, clock_hz, Mode::Mode0)
            .map_err(|e| HwError::Spi(format!("open spi: {e}")))?;
        Ok(Self { spi, channel })
    }

    /// Single-ended conversion on the configured channel, 0..=1023.
    pub fn read_raw(&mut self) -> Result<u16> {
        // Start bit, then SGL/DIFF=1 and the channel in the upper nibble.
        let tx = [0x01, 0x80 | (self.channel << 4), 0x00];
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| HwError::Spi(e.to_string()))?;
        let value = (u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2]);
        trace!(raw = value, "mcp3008 raw read");
        Ok(value)
    }
}

impl fader_traits::Adc for Mcp3008 {
    fn read(&mut self) -> fader_traits::HwResult<u16> {
        // Left-aligned to 16 bits, matching the core's divide-by-64 quantization.
        Ok(self.read_raw()? << 6)
    }
}
