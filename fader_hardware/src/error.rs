use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("spi error: {0}")]
    Spi(String),
    #[error("adc timeout")]
    Timeout,
    #[error("invalid adc channel {0} (expected 0..=7)")]
    InvalidChannel(u8),
    #[error("simulated fader state poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, HwError>;
