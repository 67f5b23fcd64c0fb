pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Trait-boundary error used by every hardware collaborator.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Analog-to-digital converter wired to the fader's potentiometer wiper.
pub trait Adc {
    /// One synchronous conversion, left-aligned to 16 bits (0..=65535).
    fn read(&mut self) -> HwResult<u16>;
}

/// Motor driver of the fader. Calls are commands; implementations must accept
/// redundant calls.
pub trait Motor {
    /// Wake (`true`) or sleep (`false`) the driver.
    fn enable(&mut self, on: bool) -> HwResult<()>;
    fn forward(&mut self) -> HwResult<()>;
    fn backward(&mut self) -> HwResult<()>;
    fn brake(&mut self) -> HwResult<()>;
    /// Duty in percent, 0..=100.
    fn set_speed(&mut self, percent: u8) -> HwResult<()>;
}

impl<T: Adc + ?Sized> Adc for Box<T> {
    fn read(&mut self) -> HwResult<u16> {
        (**self).read()
    }
}

impl<T: Adc + ?Sized> Adc for &mut T {
    fn read(&mut self) -> HwResult<u16> {
        (**self).read()
    }
}

impl<T: Motor + ?Sized> Motor for Box<T> {
    fn enable(&mut self, on: bool) -> HwResult<()> {
        (**self).enable(on)
    }
    fn forward(&mut self) -> HwResult<()> {
        (**self).forward()
    }
    fn backward(&mut self) -> HwResult<()> {
        (**self).backward()
    }
    fn brake(&mut self) -> HwResult<()> {
        (**self).brake()
    }
    fn set_speed(&mut self, percent: u8) -> HwResult<()> {
        (**self).set_speed(percent)
    }
}

impl<T: Motor + ?Sized> Motor for &mut T {
    fn enable(&mut self, on: bool) -> HwResult<()> {
        (**self).enable(on)
    }
    fn forward(&mut self) -> HwResult<()> {
        (**self).forward()
    }
    fn backward(&mut self) -> HwResult<()> {
        (**self).backward()
    }
    fn brake(&mut self) -> HwResult<()> {
        (**self).brake()
    }
    fn set_speed(&mut self, percent: u8) -> HwResult<()> {
        (**self).set_speed(percent)
    }
}
