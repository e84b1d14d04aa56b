//! Circuit graph representation.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::element::{ComponentId, SharedElement};
use crate::error::{Error, Result};
use crate::node::{Node, NodeId};
use crate::wire::Wire;

/// A mutable circuit graph: components, nodes, and the wires between them.
///
/// The circuit owns the topology and preserves bidirectional integrity:
/// whenever a component's terminal references a node, that node's incidence
/// list contains the (component, terminal) pair, exactly once. All mutating
/// operations either succeed and bump the [`revision`](Circuit::revision)
/// counter or return an error without partial mutation.
///
/// Exactly one node is ground; it exists for the circuit's full lifetime
/// and is bound to the names "GND" and "GROUND".
#[derive(Debug)]
pub struct Circuit {
    components: IndexMap<ComponentId, SharedElement>,
    /// Components whose destruction is someone else's responsibility
    /// (a board's pins). Removal drops the circuit's handle only.
    external: HashSet<ComponentId>,
    nodes: IndexMap<NodeId, Node>,
    named: HashMap<String, NodeId>,
    wires: Vec<ComponentId>,
    ground: NodeId,
    next_component: u64,
    next_node: u64,
    revision: u64,
}

impl Circuit {
    /// Create a new circuit with a ground node bound to "GND" and "GROUND".
    pub fn new() -> Self {
        let mut circuit = Self {
            components: IndexMap::new(),
            external: HashSet::new(),
            nodes: IndexMap::new(),
            named: HashMap::new(),
            wires: Vec::new(),
            ground: NodeId(0),
            next_component: 0,
            next_node: 0,
            revision: 0,
        };
        let ground = circuit.create_node();
        circuit.ground = ground;
        circuit
            .nodes
            .get_mut(&ground)
            .expect("ground node just created")
            .set_ground(true);
        circuit.named.insert("GND".to_string(), ground);
        circuit.named.insert("GROUND".to_string(), ground);
        circuit
    }

    /// Mutation version counter. Bumped by every successful mutation; the
    /// simulator samples it to invalidate its node-index cache.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // ---- components ------------------------------------------------------

    /// Add a component, returning its id. Re-adding the same element (by
    /// handle identity) returns the existing id without mutation.
    pub fn add_component(&mut self, element: SharedElement) -> ComponentId {
        if let Some(existing) = self.find_by_identity(&element) {
            return existing;
        }
        let id = ComponentId(self.next_component);
        self.next_component += 1;
        self.components.insert(id, element);
        self.touch();
        id
    }

    /// Add an externally-owned component (e.g., a microcontroller pin).
    /// Removal drops only the circuit's handle; the owner keeps its own.
    pub fn add_external(&mut self, element: SharedElement) -> ComponentId {
        let id = self.add_component(element);
        self.external.insert(id);
        id
    }

    fn find_by_identity(&self, element: &SharedElement) -> Option<ComponentId> {
        // Compare data pointers only; vtable pointers are not stable across
        // coercion sites.
        let target = Rc::as_ptr(element) as *const ();
        self.components
            .iter()
            .find(|(_, existing)| Rc::as_ptr(existing) as *const () == target)
            .map(|(&id, _)| id)
    }

    /// Check if a component is externally owned.
    pub fn is_external(&self, id: ComponentId) -> bool {
        self.external.contains(&id)
    }

    /// Get a component handle by id.
    pub fn component(&self, id: ComponentId) -> Option<&SharedElement> {
        self.components.get(&id)
    }

    /// Iterate over all components in insertion order.
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &SharedElement)> {
        self.components.iter().map(|(&id, element)| (id, element))
    }

    /// Number of components.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Disconnect a component from every node and remove it from the
    /// circuit. Emptied non-ground nodes are pruned.
    pub fn remove_component(&mut self, id: ComponentId) -> Result<()> {
        let element = self
            .components
            .get(&id)
            .ok_or(Error::UnknownComponent(id))?
            .clone();

        let terminal_count = element.borrow().terminal_count();
        for terminal in 0..terminal_count {
            self.unbind(id, &element, terminal);
        }

        self.components.shift_remove(&id);
        self.external.remove(&id);
        self.wires.retain(|&w| w != id);
        self.touch();
        Ok(())
    }

    // ---- nodes -----------------------------------------------------------

    /// Create a fresh anonymous node.
    pub fn create_node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, Node::new(id));
        self.touch();
        id
    }

    /// Return the node bound to `name`, creating and binding a fresh one if
    /// absent.
    pub fn find_or_create_named(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.named.get(name) {
            return id;
        }
        let id = self.create_node();
        self.named.insert(name.to_string(), id);
        id
    }

    /// Look up a named node.
    pub fn named_node(&self, name: &str) -> Option<NodeId> {
        self.named.get(name).copied()
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Write a solved voltage into a node.
    pub fn set_node_voltage(&mut self, id: NodeId, voltage: f64) -> Result<()> {
        let node = self.nodes.get_mut(&id).ok_or(Error::UnknownNode(id))?;
        node.set_voltage(voltage);
        Ok(())
    }

    /// Iterate over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of nodes, ground included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The ground node id.
    pub fn ground(&self) -> NodeId {
        self.ground
    }

    /// Re-pin ground to another node. The old ground becomes ordinary and
    /// is pruned if empty; "GND" and "GROUND" are rebound.
    pub fn set_ground(&mut self, id: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&id) {
            return Err(Error::UnknownNode(id));
        }
        if id == self.ground {
            return Ok(());
        }
        let old = self.ground;
        if let Some(node) = self.nodes.get_mut(&old) {
            node.set_ground(false);
        }
        self.ground = id;
        let node = self.nodes.get_mut(&id).expect("checked above");
        node.set_ground(true);
        self.named.insert("GND".to_string(), id);
        self.named.insert("GROUND".to_string(), id);
        self.prune_if_empty(old);
        self.touch();
        Ok(())
    }

    fn prune_if_empty(&mut self, id: NodeId) {
        if id == self.ground {
            return;
        }
        let empty = self.nodes.get(&id).is_some_and(Node::is_empty);
        if empty {
            self.nodes.shift_remove(&id);
            self.named.retain(|_, &mut n| n != id);
        }
    }

    // ---- connections -----------------------------------------------------

    fn check_terminal(&self, id: ComponentId, terminal: usize) -> Result<SharedElement> {
        let element = self
            .components
            .get(&id)
            .ok_or(Error::UnknownComponent(id))?
            .clone();
        let count = element.borrow().terminal_count();
        if terminal >= count {
            return Err(Error::InvalidTerminal { terminal, count });
        }
        Ok(element)
    }

    /// Bind a terminal to a node, replacing any previous binding. Keeps
    /// both sides of the incidence relation in step.
    fn bind(&mut self, id: ComponentId, element: &SharedElement, terminal: usize, node: NodeId) {
        if element.borrow().node(terminal) == Some(node) {
            return;
        }
        self.unbind(id, element, terminal);
        element.borrow_mut().attach(terminal, node);
        if let Some(n) = self.nodes.get_mut(&node) {
            n.attach(id, terminal);
        }
    }

    fn unbind(&mut self, id: ComponentId, element: &SharedElement, terminal: usize) {
        let previous = element.borrow().node(terminal);
        if let Some(old) = previous {
            element.borrow_mut().detach(terminal);
            if let Some(n) = self.nodes.get_mut(&old) {
                n.detach(id, terminal);
            }
            self.prune_if_empty(old);
        }
    }

    /// Connect two component terminals, returning the node they share.
    ///
    /// One of five cases applies, deterministically:
    /// 1. Neither terminal bound: a fresh node is created and both bind.
    /// 2. Exactly one bound: the other binds to the same node.
    /// 3. Both bound to the same node: no-op.
    /// 4. Bound to different nodes: the nodes merge; the first terminal's
    ///    node survives, except that ground always survives a merge.
    /// 5. Invalid terminal index: [`Error::InvalidTerminal`].
    pub fn connect(
        &mut self,
        a: ComponentId,
        terminal_a: usize,
        b: ComponentId,
        terminal_b: usize,
    ) -> Result<NodeId> {
        let element_a = self.check_terminal(a, terminal_a)?;
        let element_b = self.check_terminal(b, terminal_b)?;

        let node_a = element_a.borrow().node(terminal_a);
        let node_b = element_b.borrow().node(terminal_b);

        match (node_a, node_b) {
            (None, None) => {
                let node = self.create_node();
                self.bind(a, &element_a, terminal_a, node);
                self.bind(b, &element_b, terminal_b, node);
                self.touch();
                Ok(node)
            }
            (Some(node), None) => {
                self.bind(b, &element_b, terminal_b, node);
                self.touch();
                Ok(node)
            }
            (None, Some(node)) => {
                self.bind(a, &element_a, terminal_a, node);
                self.touch();
                Ok(node)
            }
            (Some(na), Some(nb)) if na == nb => Ok(na),
            (Some(na), Some(nb)) => {
                let survivor = self.merge_nodes(na, nb)?;
                self.touch();
                Ok(survivor)
            }
        }
    }

    /// Merge `loser` into `survivor`: every incidence of the loser rebinds
    /// onto the survivor, then the loser is deleted. Ground always
    /// survives.
    fn merge_nodes(&mut self, survivor: NodeId, loser: NodeId) -> Result<NodeId> {
        let (survivor, loser) = if loser == self.ground {
            (loser, survivor)
        } else {
            (survivor, loser)
        };

        let moved = self
            .nodes
            .get_mut(&loser)
            .ok_or(Error::UnknownNode(loser))?
            .take_incidences();
        log::debug!("merging node {loser} into {survivor}");

        for &(id, terminal) in &moved {
            if let Some(element) = self.components.get(&id).cloned() {
                element.borrow_mut().attach(terminal, survivor);
            }
            if let Some(node) = self.nodes.get_mut(&survivor) {
                node.attach(id, terminal);
            }
        }

        self.nodes.shift_remove(&loser);
        for target in self.named.values_mut() {
            if *target == loser {
                *target = survivor;
            }
        }
        Ok(survivor)
    }

    /// Bind a component terminal to a specific node, replacing any previous
    /// binding. The old node is pruned if emptied and non-ground.
    pub fn connect_to_node(
        &mut self,
        id: ComponentId,
        terminal: usize,
        node: NodeId,
    ) -> Result<()> {
        let element = self.check_terminal(id, terminal)?;
        if !self.nodes.contains_key(&node) {
            return Err(Error::UnknownNode(node));
        }
        self.bind(id, &element, terminal, node);
        self.touch();
        Ok(())
    }

    /// Clear a terminal's binding. The old node is pruned if emptied and
    /// non-ground.
    pub fn disconnect(&mut self, id: ComponentId, terminal: usize) -> Result<()> {
        let element = self.check_terminal(id, terminal)?;
        self.unbind(id, &element, terminal);
        self.touch();
        Ok(())
    }

    // ---- wires -----------------------------------------------------------

    /// Create a wire across two existing nodes, deduplicated by unordered
    /// endpoint pair. Returns the existing wire's id when one already
    /// spans the pair.
    pub fn add_wire(&mut self, a: NodeId, b: NodeId) -> Result<ComponentId> {
        if !self.nodes.contains_key(&a) {
            return Err(Error::UnknownNode(a));
        }
        if !self.nodes.contains_key(&b) {
            return Err(Error::UnknownNode(b));
        }
        if a == b {
            return Err(Error::SelfLoop);
        }

        for &wire_id in &self.wires {
            if let Some(wire) = self.components.get(&wire_id) {
                let (wa, wb) = {
                    let w = wire.borrow();
                    (w.node(0), w.node(1))
                };
                if (wa == Some(a) && wb == Some(b)) || (wa == Some(b) && wb == Some(a)) {
                    return Ok(wire_id);
                }
            }
        }

        let wire: SharedElement = Rc::new(std::cell::RefCell::new(Wire::new()));
        let id = self.add_component(Rc::clone(&wire));
        self.bind(id, &wire, 0, a);
        self.bind(id, &wire, 1, b);
        self.wires.push(id);
        self.touch();
        Ok(id)
    }

    /// Ids of all wires in the circuit.
    pub fn wires(&self) -> &[ComponentId] {
        &self.wires
    }

    /// Remove a wire from the circuit.
    pub fn remove_wire(&mut self, id: ComponentId) -> Result<()> {
        if !self.wires.contains(&id) {
            return Err(Error::UnknownComponent(id));
        }
        self.remove_component(id)
    }

    // ---- validation ------------------------------------------------------

    /// Report connection issues without mutating: floating non-ground nodes
    /// (fewer than two incidences), fully disconnected components, and a
    /// missing ground node.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for node in self.nodes.values() {
            if node.degree() < 2 && !node.is_ground() {
                issues.push(format!("node {} is floating", node.id()));
            }
        }

        for (id, element) in &self.components {
            let element = element.borrow();
            let connected = (0..element.terminal_count()).any(|t| element.node(t).is_some());
            if !connected {
                issues.push(format!(
                    "component {} ({}) is not connected",
                    id,
                    element.name()
                ));
            }
        }

        if !self.nodes.contains_key(&self.ground) {
            issues.push("no ground node found".to_string());
        }

        issues
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn shared(wire: Wire) -> SharedElement {
        Rc::new(RefCell::new(wire))
    }

    fn two_terminal() -> SharedElement {
        shared(Wire::new())
    }

    /// Every (component, terminal, node) triple must appear on both sides
    /// of the incidence relation.
    fn assert_integrity(circuit: &Circuit) {
        for (id, element) in circuit.components() {
            let element = element.borrow();
            for terminal in 0..element.terminal_count() {
                if let Some(node_id) = element.node(terminal) {
                    let node = circuit.node(node_id).expect("terminal points at live node");
                    let count = node
                        .incidences()
                        .iter()
                        .filter(|&&(c, t)| c == id && t == terminal)
                        .count();
                    assert_eq!(count, 1, "incidence of {id} t{terminal} on {node_id}");
                }
            }
        }
        for node in circuit.nodes() {
            for &(id, terminal) in node.incidences() {
                let element = circuit.component(id).expect("incidence points at live component");
                assert_eq!(element.borrow().node(terminal), Some(node.id()));
            }
        }
    }

    #[test]
    fn test_new_circuit_has_ground() {
        let circuit = Circuit::new();
        assert_eq!(circuit.node_count(), 1);
        assert_eq!(circuit.named_node("GND"), Some(circuit.ground()));
        assert_eq!(circuit.named_node("GROUND"), Some(circuit.ground()));
        assert!(circuit.node(circuit.ground()).unwrap().is_ground());
    }

    #[test]
    fn test_add_component_dedup() {
        let mut circuit = Circuit::new();
        let r = two_terminal();
        let id1 = circuit.add_component(Rc::clone(&r));
        let id2 = circuit.add_component(r);
        assert_eq!(id1, id2);
        assert_eq!(circuit.component_count(), 1);
    }

    #[test]
    fn test_connect_fresh_node() {
        let mut circuit = Circuit::new();
        let a = circuit.add_component(two_terminal());
        let b = circuit.add_component(two_terminal());

        let node = circuit.connect(a, 0, b, 0).unwrap();
        assert_eq!(circuit.component(a).unwrap().borrow().node(0), Some(node));
        assert_eq!(circuit.component(b).unwrap().borrow().node(0), Some(node));
        assert_eq!(circuit.node(node).unwrap().degree(), 2);
        assert_integrity(&circuit);
    }

    #[test]
    fn test_connect_joins_existing_node() {
        let mut circuit = Circuit::new();
        let a = circuit.add_component(two_terminal());
        let b = circuit.add_component(two_terminal());
        let c = circuit.add_component(two_terminal());

        let node = circuit.connect(a, 0, b, 0).unwrap();
        let same = circuit.connect(a, 0, c, 0).unwrap();
        assert_eq!(node, same);
        assert_eq!(circuit.node(node).unwrap().degree(), 3);
    }

    #[test]
    fn test_connect_same_node_is_noop() {
        let mut circuit = Circuit::new();
        let a = circuit.add_component(two_terminal());
        let b = circuit.add_component(two_terminal());

        let node = circuit.connect(a, 0, b, 0).unwrap();
        let revision = circuit.revision();
        let same = circuit.connect(a, 0, b, 0).unwrap();
        assert_eq!(node, same);
        assert_eq!(circuit.revision(), revision);
    }

    #[test]
    fn test_connect_merges_nodes() {
        // Two components joined at terminal 0 via node X and at terminal 1
        // via node Y must end up as a parallel pair with exactly two nodes
        // and four incidences.
        let mut circuit = Circuit::new();
        let r1 = circuit.add_component(two_terminal());
        let r2 = circuit.add_component(two_terminal());

        // Give each terminal its own fresh node first.
        let x = circuit.create_node();
        let x2 = circuit.create_node();
        let y = circuit.create_node();
        let y2 = circuit.create_node();
        circuit.connect_to_node(r1, 0, x).unwrap();
        circuit.connect_to_node(r2, 0, x2).unwrap();
        circuit.connect_to_node(r1, 1, y).unwrap();
        circuit.connect_to_node(r2, 1, y2).unwrap();

        let merged_x = circuit.connect(r1, 0, r2, 0).unwrap();
        let merged_y = circuit.connect(r1, 1, r2, 1).unwrap();
        assert_eq!(merged_x, x);
        assert_eq!(merged_y, y);
        assert!(circuit.node(x2).is_none());
        assert!(circuit.node(y2).is_none());
        assert_eq!(circuit.node_count(), 3); // ground + X + Y
        assert_eq!(circuit.node(x).unwrap().degree(), 2);
        assert_eq!(circuit.node(y).unwrap().degree(), 2);
        assert_integrity(&circuit);

        // After connect, both terminals resolve to the same node.
        assert_eq!(
            circuit.component(r1).unwrap().borrow().node(0),
            circuit.component(r2).unwrap().borrow().node(0)
        );
    }

    #[test]
    fn test_merge_ground_survives() {
        let mut circuit = Circuit::new();
        let a = circuit.add_component(two_terminal());
        let b = circuit.add_component(two_terminal());
        let ground = circuit.ground();

        // a.0 on a fresh node, b.0 on ground; merging must keep ground.
        let fresh = circuit.create_node();
        circuit.connect_to_node(a, 0, fresh).unwrap();
        circuit.connect_to_node(b, 0, ground).unwrap();

        let survivor = circuit.connect(a, 0, b, 0).unwrap();
        assert_eq!(survivor, ground);
        assert!(circuit.node(fresh).is_none());
        assert_integrity(&circuit);
    }

    #[test]
    fn test_invalid_terminal() {
        let mut circuit = Circuit::new();
        let a = circuit.add_component(two_terminal());
        let b = circuit.add_component(two_terminal());

        let err = circuit.connect(a, 2, b, 0).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidTerminal {
                terminal: 2,
                count: 2
            }
        );
    }

    #[test]
    fn test_remove_component_prunes_nodes() {
        let mut circuit = Circuit::new();
        let a = circuit.add_component(two_terminal());
        let b = circuit.add_component(two_terminal());
        let shared_node = circuit.connect(a, 0, b, 0).unwrap();

        circuit.remove_component(a).unwrap();
        assert!(circuit.component(a).is_none());
        // The shared node keeps b's incidence.
        assert_eq!(circuit.node(shared_node).unwrap().degree(), 1);
        for node in circuit.nodes() {
            assert!(node.incidences().iter().all(|&(c, _)| c != a));
        }

        circuit.remove_component(b).unwrap();
        assert!(circuit.node(shared_node).is_none());
        assert_eq!(circuit.node_count(), 1); // ground remains
    }

    #[test]
    fn test_connect_to_node_replaces_binding() {
        let mut circuit = Circuit::new();
        let a = circuit.add_component(two_terminal());
        let n1 = circuit.create_node();
        let n2 = circuit.create_node();

        circuit.connect_to_node(a, 0, n1).unwrap();
        circuit.connect_to_node(a, 0, n2).unwrap();

        assert_eq!(circuit.component(a).unwrap().borrow().node(0), Some(n2));
        // n1 emptied and pruned.
        assert!(circuit.node(n1).is_none());
        assert_integrity(&circuit);
    }

    #[test]
    fn test_add_wire_dedup() {
        let mut circuit = Circuit::new();
        let n1 = circuit.create_node();
        let n2 = circuit.create_node();

        let w1 = circuit.add_wire(n1, n2).unwrap();
        let w2 = circuit.add_wire(n2, n1).unwrap();
        assert_eq!(w1, w2);
        assert_eq!(circuit.wires().len(), 1);

        assert_eq!(circuit.add_wire(n1, n1).unwrap_err(), Error::SelfLoop);
    }

    #[test]
    fn test_set_ground() {
        let mut circuit = Circuit::new();
        let a = circuit.add_component(two_terminal());
        let n = circuit.create_node();
        circuit.connect_to_node(a, 0, n).unwrap();

        let old = circuit.ground();
        circuit.set_ground(n).unwrap();
        assert_eq!(circuit.ground(), n);
        assert!(circuit.node(n).unwrap().is_ground());
        assert_eq!(circuit.named_node("GND"), Some(n));
        // Old ground was empty, so it is pruned.
        assert!(circuit.node(old).is_none());
    }

    #[test]
    fn test_validate_reports_issues() {
        let mut circuit = Circuit::new();
        let a = circuit.add_component(two_terminal());
        let b = circuit.add_component(two_terminal());
        let n = circuit.create_node();
        circuit.connect_to_node(a, 0, n).unwrap();

        let issues = circuit.validate();
        // n has one incidence, b is fully disconnected.
        assert!(issues.iter().any(|i| i.contains(&n.to_string())));
        assert!(issues.iter().any(|i| i.contains(&b.to_string())));
    }

    #[test]
    fn test_external_component_tracked() {
        let mut circuit = Circuit::new();
        let pin = two_terminal();
        let id = circuit.add_external(Rc::clone(&pin));
        assert!(circuit.is_external(id));

        circuit.remove_component(id).unwrap();
        // The external owner still holds the element.
        assert_eq!(Rc::strong_count(&pin), 1);
    }
}
