//! Error types for breadboard-devices.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("resistance must be positive, got {0}")]
    InvalidResistance(f64),

    #[error("forward voltage must be positive, got {0}")]
    InvalidForwardVoltage(f64),

    #[error("current limit must be positive, got {0}")]
    InvalidCurrentLimit(f64),

    #[error("operation requires pin mode {required}, pin is in {actual}")]
    WrongMode {
        required: &'static str,
        actual: &'static str,
    },

    #[error("pin does not support PWM")]
    NoPwm,
}

pub type Result<T> = std::result::Result<T, Error>;
