//! Device models for the Breadboard circuit simulator.
//!
//! Every device implements [`breadboard_core::Element`] and is registered
//! in a [`breadboard_core::Circuit`] behind a shared handle. The set is
//! closed for this core:
//!
//! - [`Resistor`] - linear two-terminal resistor
//! - [`Led`] - non-linear light-emitting diode whose dynamic resistance
//!   drives the simulator's fixed-point iteration
//! - [`Pin`] - microcontroller I/O pin (voltage source in output modes,
//!   high impedance or pullup in input modes, PWM as time-averaged DC)
//! - [`PowerPin`] - fixed-voltage supply rail
//!
//! # Example
//!
//! ```rust
//! use breadboard_devices::{Led, LedColor, Pin, PinMode};
//! use breadboard_core::Element;
//!
//! let led = Led::new(LedColor::Red);
//! assert_eq!(led.forward_voltage(), 1.8);
//!
//! let mut pin = Pin::digital(13, false);
//! pin.set_mode(PinMode::Output);
//! pin.write_digital(true).unwrap();
//! assert_eq!(pin.driven_voltage(), Some(Pin::VCC));
//! ```

pub mod error;
pub mod led;
pub mod pin;
pub mod power;
pub mod resistor;

pub use error::{Error, Result};
pub use led::{Led, LedColor};
pub use pin::{Pin, PinKind, PinMode};
pub use power::{PowerPin, PowerRail};
pub use resistor::Resistor;
