//! Arduino-like microcontroller board surface for Breadboard.
//!
//! A [`Board`] owns its pins and exposes the familiar sketch API:
//! `pin_mode`, `digital_write`, `digital_read`, `analog_write`,
//! `analog_read`, and `analog_reference`, plus power management. Pins are
//! registered in a circuit as external components, and every mutation is
//! funneled through the bound simulator's update scheduler.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use breadboard_core::Circuit;
//! use breadboard_devices::PinMode;
//! use breadboard_mcu::{Board, BoardModel, Level};
//!
//! let circuit = Rc::new(RefCell::new(Circuit::new()));
//! let mut board = Board::new(BoardModel::Uno);
//! board.attach(&circuit);
//! board.power_on();
//!
//! board.pin_mode(13, PinMode::Output).unwrap();
//! board.digital_write(13, Level::High).unwrap();
//! ```

pub mod board;
pub mod error;

pub use board::{AnalogReference, Board, BoardModel, Level};
pub use error::{Error, Result};
