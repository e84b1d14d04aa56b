//! Error types for breadboard-mcu.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("unknown pin: {0}")]
    UnknownPin(usize),

    #[error("board is not powered on")]
    PoweredOff,

    #[error("mode not supported by this pin")]
    InvalidMode,

    #[error(transparent)]
    Device(#[from] breadboard_devices::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
