//! Core circuit representation and nodal-analysis matrix structures for
//! Breadboard.
//!
//! This crate provides the fundamental data structures for representing
//! interactive DC circuits: nodes, elements, the mutable circuit graph,
//! and the conductance-matrix assembly the solver operates on.
//!
//! # Overview
//!
//! The core abstractions are:
//!
//! - [`NodeId`] / [`Node`] - An equipotential junction with its incidence
//!   list of (component, terminal) pairs
//! - [`Element`] - Trait implemented by every electrical element
//! - [`Circuit`] - The mutable component/node graph with connection,
//!   merging, and validation primitives
//! - [`NodalSystem`](nodal::NodalSystem) - The nodal equation G·v = i
//!
//! # Example: Building and stamping a voltage divider
//!
//! ```rust
//! use breadboard_core::nodal::NodalSystem;
//!
//! // Node 0 driven at 5 V, R1 = 100 ohm to node 1, R2 = 400 ohm to the
//! // reference.
//! let mut sys = NodalSystem::new(2);
//! sys.set_node_voltage(0, 5.0).unwrap();
//! sys.add_conductance(Some(0), Some(1), 1.0 / 100.0).unwrap();
//! sys.add_conductance(Some(1), None, 1.0 / 400.0).unwrap();
//!
//! let (matrix, rhs) = sys.assemble();
//! assert_eq!(matrix.nrows(), 2);
//! assert_eq!(rhs[0], 5.0);
//! ```
//!
//! # Example: Editing a circuit graph
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use breadboard_core::{Circuit, SharedElement, Wire};
//!
//! let mut circuit = Circuit::new();
//! let a: SharedElement = Rc::new(RefCell::new(Wire::new()));
//! let b: SharedElement = Rc::new(RefCell::new(Wire::new()));
//! let a = circuit.add_component(a);
//! let b = circuit.add_component(b);
//!
//! // Joining two unbound terminals creates a fresh shared node.
//! let node = circuit.connect(a, 0, b, 0).unwrap();
//! assert_eq!(circuit.node(node).unwrap().degree(), 2);
//! ```

pub mod circuit;
pub mod element;
pub mod error;
pub mod nodal;
pub mod node;
pub mod wire;

pub use circuit::Circuit;
pub use element::{ComponentId, ElectricalState, Element, SharedElement, Terminals};
pub use error::{Error, Result};
pub use nodal::{NodalSystem, SOURCE_THRESHOLD, STAMP_EPSILON};
pub use node::{Node, NodeId};
pub use wire::Wire;
