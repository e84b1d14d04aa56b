//! Solvers and simulation engine for Breadboard.
//!
//! This crate turns a [`breadboard_core::Circuit`] into numbers:
//!
//! - **Linear solve** - dense LU decomposition with partial pivoting
//!   ([`solve_dense`])
//! - **Fixed-point simulation** - the [`Simulator`] stamps the circuit,
//!   solves it, writes voltages and currents back into the components,
//!   and iterates until the non-linear elements (LEDs) stop moving
//! - **Update scheduling** - the [`UpdateScheduler`] coalesces bursts of
//!   mutations into at most one solve per minimum interval and guards
//!   against reentrant solves
//!
//! # Example: Solving a stamped system
//!
//! ```rust
//! use breadboard_core::nodal::NodalSystem;
//! use breadboard_solver::{solve_dense, EPSILON};
//!
//! // Node 0 pinned to 5 V, 100 ohm to node 1, 400 ohm to the reference.
//! let mut sys = NodalSystem::new(2);
//! sys.set_node_voltage(0, 5.0).unwrap();
//! sys.add_conductance(Some(0), Some(1), 1.0 / 100.0).unwrap();
//! sys.add_conductance(Some(1), None, 1.0 / 400.0).unwrap();
//!
//! let (a, b) = sys.assemble();
//! let v = solve_dense(&a, &b, EPSILON).unwrap();
//! assert!((v[0] - 5.0).abs() < 1e-9);
//! assert!((v[1] - 4.0).abs() < 1e-9);
//! ```
//!
//! # Simulation loop
//!
//! For each solve the [`Simulator`]:
//!
//! 1. Rebuilds the node index if topology changed (ground is index 0)
//! 2. Stamps every component into a fresh conductance matrix
//! 3. Solves the linear system
//! 4. Writes (voltage, current) pairs back into the components, letting
//!    non-linear elements recompute their operating point
//! 5. Repeats until no component's pair moved more than the tolerance,
//!    or the iteration cap is reached

pub mod error;
pub mod linear;
pub mod scheduler;
pub mod simulator;

pub use error::{Error, Result};
pub use linear::{solve_dense, EPSILON};
pub use scheduler::{Decision, UpdateScheduler};
pub use simulator::{SimEvent, Simulator, SimulatorConfig};
