use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FaderError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("calibration did not converge within {samples} samples")]
    CalibrationTimeout { samples: usize },
    #[error("safety stop at {position:.1}% while seeking {goal:.1}%")]
    SafetyStop { goal: f32, position: f32 },
    #[error("cancelled")]
    Cancelled,
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing adc")]
    MissingAdc,
    #[error("missing motor")]
    MissingMotor,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("invalid calibration table: {0}")]
    InvalidTable(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
