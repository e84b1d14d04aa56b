//! # Breadboard
//!
//! An interactive simulator for small DC circuits built from Arduino-like
//! microcontroller pins, resistors, LEDs, and ideal wires.
//!
//! Breadboard provides:
//! - A mutable component/node circuit graph with connection, node-merging,
//!   and validation primitives
//! - Nodal-analysis matrix assembly and a dense LU solver
//! - A fixed-point simulator that handles the non-linear LED conduction
//!   model
//! - Debounced re-solve scheduling with re-entrancy control
//! - An Arduino-like board with the familiar sketch-facing pin API
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use breadboard::prelude::*;
//!
//! // Pin 13 -> LED -> 220 ohm resistor -> ground.
//! let circuit = Rc::new(RefCell::new(Circuit::new()));
//! let mut board = Board::new(BoardModel::Uno);
//! board.attach(&circuit);
//! board.power_on();
//!
//! let led = Rc::new(RefCell::new(Led::new(LedColor::Red)));
//! let resistor = Rc::new(RefCell::new(Resistor::new(220.0).unwrap()));
//!
//! {
//!     let mut c = circuit.borrow_mut();
//!     let ground = c.ground();
//!     // Board pins were registered by attach; re-adding a handle just
//!     // returns the existing id.
//!     let pin13 = c.add_component(board.digital_pin(13).unwrap().clone());
//!     let gnd_pin = c.add_component(board.ground_pin().clone());
//!     let led_id = c.add_component(led.clone());
//!     let r_id = c.add_component(resistor.clone());
//!
//!     let pin_node = c.create_node();
//!     c.connect_to_node(pin13, 0, pin_node).unwrap();
//!     c.connect_to_node(led_id, 0, pin_node).unwrap();
//!     c.connect(led_id, 1, r_id, 0).unwrap();
//!     c.connect_to_node(r_id, 1, ground).unwrap();
//!     c.connect_to_node(gnd_pin, 0, ground).unwrap();
//! }
//!
//! let mut sim = Simulator::with_circuit(Rc::clone(&circuit));
//! board.pin_mode(13, PinMode::Output).unwrap();
//! board.digital_write(13, Level::High).unwrap();
//! sim.step();
//!
//! assert!(led.borrow().is_on());
//! ```

// Re-export member crates
pub use breadboard_core as core;
pub use breadboard_devices as devices;
pub use breadboard_mcu as mcu;
pub use breadboard_solver as solver;

// ============================================================================
// Convenient re-exports from breadboard_core
// ============================================================================

pub use breadboard_core::{
    Circuit,
    ComponentId,
    ElectricalState,
    Element,
    // Errors
    Error as CoreError,
    NodalSystem,
    Node,
    NodeId,
    SharedElement,
    Terminals,
    Wire,
};

// ============================================================================
// Convenient re-exports from breadboard_devices
// ============================================================================

pub use breadboard_devices::{
    Error as DeviceError,
    Led,
    LedColor,
    Pin,
    PinKind,
    PinMode,
    PowerPin,
    PowerRail,
    Resistor,
};

// ============================================================================
// Convenient re-exports from breadboard_solver
// ============================================================================

pub use breadboard_solver::{
    solve_dense,
    Decision,
    Error as SolverError,
    SimEvent,
    Simulator,
    SimulatorConfig,
    UpdateScheduler,
    EPSILON,
};

// ============================================================================
// Convenient re-exports from breadboard_mcu
// ============================================================================

pub use breadboard_mcu::{AnalogReference, Board, BoardModel, Error as McuError, Level};

// ============================================================================
// Re-export commonly used external types
// ============================================================================

/// Re-export of nalgebra's dynamic matrix type.
pub use nalgebra::DMatrix;

/// Re-export of nalgebra's dynamic vector type.
pub use nalgebra::DVector;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Prelude module containing commonly used types and traits.
///
/// ```rust
/// use breadboard::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::{Circuit, ComponentId, ElectricalState, Element, NodeId, SharedElement};

    // Devices
    pub use crate::{Led, LedColor, Pin, PinMode, PowerPin, PowerRail, Resistor, Wire};

    // Solver
    pub use crate::{SimEvent, Simulator, SimulatorConfig};

    // Board
    pub use crate::{AnalogReference, Board, BoardModel, Level};

    // Common external types
    pub use crate::{DMatrix, DVector};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let led = Led::new(LedColor::Red);
        assert_eq!(led.forward_voltage(), 1.8);
        let _ = Circuit::new();
    }
}
