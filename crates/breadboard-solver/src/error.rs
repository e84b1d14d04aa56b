//! Error types for breadboard-solver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("singular matrix")]
    Singular,

    #[error("invalid matrix dimensions: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("circuit has no ground node")]
    NoGround,

    #[error("no circuit bound to the simulator")]
    NoCircuit,

    #[error(transparent)]
    Core(#[from] breadboard_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
