//! Node representation for circuit graphs.

use std::fmt;

use crate::element::ComponentId;

/// Unique identifier for a node in the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// Create a new NodeId from a raw value.
    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    /// Get the raw node ID value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// An equipotential junction in the circuit graph.
///
/// A node tracks which (component, terminal) pairs meet at it. The list is
/// kept consistent with the components' terminal tables by [`Circuit`]
/// (bidirectional integrity): every pair here corresponds to a component
/// whose terminal table references this node, exactly once.
///
/// [`Circuit`]: crate::Circuit
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    /// Solved voltage. Zero until the owning circuit has been solved.
    voltage: f64,
    is_ground: bool,
    incidences: Vec<(ComponentId, usize)>,
}

impl Node {
    /// Create a new node with the given ID.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            voltage: 0.0,
            is_ground: false,
            incidences: Vec::new(),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the last-solved voltage at this node.
    pub fn voltage(&self) -> f64 {
        self.voltage
    }

    /// Set the solved voltage.
    pub fn set_voltage(&mut self, voltage: f64) {
        self.voltage = voltage;
    }

    /// Check if this is the ground node.
    pub fn is_ground(&self) -> bool {
        self.is_ground
    }

    /// Mark or unmark this node as ground. The ground node's voltage is
    /// pinned at 0 V.
    pub fn set_ground(&mut self, ground: bool) {
        self.is_ground = ground;
        if ground {
            self.voltage = 0.0;
        }
    }

    /// The (component, terminal) pairs meeting at this node.
    pub fn incidences(&self) -> &[(ComponentId, usize)] {
        &self.incidences
    }

    /// Number of incident terminals.
    pub fn degree(&self) -> usize {
        self.incidences.len()
    }

    /// Check if no terminals are attached.
    pub fn is_empty(&self) -> bool {
        self.incidences.is_empty()
    }

    pub(crate) fn attach(&mut self, component: ComponentId, terminal: usize) {
        if !self.incidences.contains(&(component, terminal)) {
            self.incidences.push((component, terminal));
        }
    }

    pub(crate) fn detach(&mut self, component: ComponentId, terminal: usize) {
        self.incidences.retain(|&(c, t)| c != component || t != terminal);
    }

    pub(crate) fn take_incidences(&mut self) -> Vec<(ComponentId, usize)> {
        std::mem::take(&mut self.incidences)
    }
}
