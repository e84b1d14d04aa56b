//! Near-ideal wire element.

use crate::element::{ElectricalState, Element, Terminals};
use crate::node::NodeId;

/// A wire connecting two nodes.
///
/// Wires are near-ideal conductors with a small fixed resistance for
/// numerical stability. They are created and deduplicated by
/// [`Circuit::add_wire`](crate::Circuit::add_wire); path geometry and
/// gauge-derived resistance are external concerns.
#[derive(Debug)]
pub struct Wire {
    name: String,
    terminals: Terminals,
    state: ElectricalState,
}

impl Wire {
    /// Resistance of an ideal jumper wire in ohms.
    pub const RESISTANCE: f64 = 1e-6;

    /// Create a new unconnected wire.
    pub fn new() -> Self {
        Self {
            name: "Wire".to_string(),
            terminals: Terminals::new(2),
            state: ElectricalState::default(),
        }
    }
}

impl Default for Wire {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for Wire {
    fn name(&self) -> &str {
        &self.name
    }

    fn terminal_count(&self) -> usize {
        2
    }

    fn node(&self, terminal: usize) -> Option<NodeId> {
        self.terminals.get(terminal)
    }

    fn attach(&mut self, terminal: usize, node: NodeId) {
        self.terminals.bind(terminal, node);
    }

    fn detach(&mut self, terminal: usize) {
        self.terminals.clear(terminal);
    }

    fn resistance(&self) -> f64 {
        Self::RESISTANCE
    }

    fn state(&self) -> ElectricalState {
        self.state
    }

    fn update_state(&mut self, voltage: f64, current: f64) {
        self.state = ElectricalState { voltage, current };
    }

    fn reset(&mut self) {
        self.state = ElectricalState::default();
    }
}
