//! The circuit simulator: stamping, solving, write-back, and scheduling.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::time::{Duration, Instant};

use breadboard_core::{Circuit, ComponentId, NodalSystem, NodeId, STAMP_EPSILON};

use crate::error::{Error, Result};
use crate::linear::{solve_dense, EPSILON};
use crate::scheduler::{Decision, UpdateScheduler};

/// Simulator tuning parameters.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Maximum fixed-point iterations per solve.
    pub max_iterations: usize,
    /// Per-component convergence tolerance on voltage and current.
    pub tolerance: f64,
    /// Simulated time advanced per completed solve, in seconds. Purely
    /// advisory; no reactive components exist.
    pub time_step: f64,
    /// Minimum wall-clock interval between solves.
    pub min_interval: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            time_step: 1e-3,
            min_interval: Duration::from_millis(10),
        }
    }
}

/// Events emitted by the simulator, drained with
/// [`Simulator::take_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Started,
    Stopped,
    Reset,
    StepCompleted { iterations: usize, time: f64 },
    Error(String),
    Converged,
    ConvergenceFailed { iterations: usize },
    /// A component's overload flag went from clear to set.
    Overload { component: ComponentId },
}

/// Converts the bound circuit into a stamped nodal system, solves it, and
/// writes voltages and currents back into the components, iterating until
/// the non-linear elements converge.
///
/// One solve runs to completion without suspension; re-solves triggered by
/// external mutations are debounced and guarded against re-entry by the
/// [`UpdateScheduler`]. Deferred solves are executed by
/// [`poll`](Simulator::poll) from the host event loop.
#[derive(Debug)]
pub struct Simulator {
    circuit: Option<Rc<RefCell<Circuit>>>,
    config: SimulatorConfig,
    scheduler: UpdateScheduler,
    running: bool,
    /// Node to matrix index; ground is always index 0.
    node_index: HashMap<NodeId, usize>,
    /// Circuit revision the index was built against.
    indexed_revision: Option<u64>,
    /// Previous-iteration (voltage, current) per component.
    prev: HashMap<ComponentId, (f64, f64)>,
    /// Components whose overload flag was set after the last solve.
    overloaded: HashSet<ComponentId>,
    iteration_count: usize,
    sim_time: f64,
    events: VecDeque<SimEvent>,
}

impl Simulator {
    /// Create a simulator with no circuit bound.
    pub fn new() -> Self {
        Self::with_config(SimulatorConfig::default())
    }

    /// Create a simulator with custom configuration.
    pub fn with_config(config: SimulatorConfig) -> Self {
        let scheduler = UpdateScheduler::new(config.min_interval);
        Self {
            circuit: None,
            config,
            scheduler,
            running: false,
            node_index: HashMap::new(),
            indexed_revision: None,
            prev: HashMap::new(),
            overloaded: HashSet::new(),
            iteration_count: 0,
            sim_time: 0.0,
            events: VecDeque::new(),
        }
    }

    /// Create a simulator bound to a circuit.
    pub fn with_circuit(circuit: Rc<RefCell<Circuit>>) -> Self {
        let mut sim = Self::new();
        sim.bind_circuit(circuit);
        sim
    }

    /// Bind (or rebind) the circuit to simulate.
    pub fn bind_circuit(&mut self, circuit: Rc<RefCell<Circuit>>) {
        self.circuit = Some(circuit);
        self.indexed_revision = None;
    }

    // ---- configuration ---------------------------------------------------

    /// Current configuration.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Set the maximum fixed-point iterations per solve.
    pub fn set_max_iterations(&mut self, n: usize) {
        self.config.max_iterations = n;
    }

    /// Set the convergence tolerance.
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.config.tolerance = tolerance;
    }

    /// Set the advisory time step.
    pub fn set_time_step(&mut self, time_step: f64) {
        self.config.time_step = time_step;
    }

    /// Set the minimum interval between solves.
    pub fn set_min_interval(&mut self, min_interval: Duration) {
        self.config.min_interval = min_interval;
        self.scheduler.set_min_interval(min_interval);
    }

    // ---- lifecycle -------------------------------------------------------

    /// Whether the simulator is running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Iteration count of the last solve.
    pub fn iterations(&self) -> usize {
        self.iteration_count
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.sim_time
    }

    /// Drain the pending events.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        self.events.drain(..).collect()
    }

    fn emit(&mut self, event: SimEvent) {
        self.events.push_back(event);
    }

    /// Start the simulation and trigger an initial solve.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        if self.circuit.is_none() {
            self.emit(SimEvent::Error(Error::NoCircuit.to_string()));
            return;
        }
        self.running = true;
        self.emit(SimEvent::Started);
        self.trigger_update();
    }

    /// Stop the simulation; any pending deferred solve is dropped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.scheduler.cancel_pending();
        self.emit(SimEvent::Stopped);
    }

    /// Reset every component and all solver state.
    pub fn reset(&mut self) {
        if let Some(circuit) = self.circuit.clone() {
            let mut circuit = circuit.borrow_mut();
            let ids: Vec<ComponentId> = circuit.components().map(|(id, _)| id).collect();
            for id in ids {
                if let Some(element) = circuit.component(id) {
                    element.borrow_mut().reset();
                }
            }
            let node_ids: Vec<NodeId> = circuit.nodes().map(|n| n.id()).collect();
            for id in node_ids {
                let _ = circuit.set_node_voltage(id, 0.0);
            }
        }
        self.prev.clear();
        self.overloaded.clear();
        self.indexed_revision = None;
        self.iteration_count = 0;
        self.sim_time = 0.0;
        self.emit(SimEvent::Reset);
    }

    /// Perform a single solve immediately, bypassing the throttle.
    pub fn step(&mut self) {
        self.scheduler.begin_solve();
        self.solve();
        self.scheduler.finish_solve(Instant::now());
    }

    // ---- scheduling ------------------------------------------------------

    /// Request a re-solve. Requests are dropped while a solve is in
    /// progress, coalesced while one is pending, and deferred when the
    /// last solve completed less than the minimum interval ago.
    pub fn trigger_update(&mut self) {
        match self.scheduler.request(Instant::now()) {
            Decision::SolveNow => self.do_update(),
            Decision::Deferred(delay) => {
                log::debug!("throttling update, deferred {delay:?}");
            }
            Decision::AlreadyPending | Decision::Reentrant => {}
        }
    }

    /// Notify the simulator that circuit topology changed. Invalidates the
    /// node-index cache before triggering a re-solve.
    pub fn topology_changed(&mut self) {
        self.indexed_revision = None;
        if self.running {
            self.trigger_update();
        }
    }

    /// Run a deferred solve if one has come due. Call from the host event
    /// loop.
    pub fn poll(&mut self) {
        if self.scheduler.due(Instant::now()) {
            self.do_update();
        }
    }

    fn do_update(&mut self) {
        self.scheduler.begin_solve();
        if self.running {
            self.solve();
        }
        self.scheduler.finish_solve(Instant::now());
    }

    // ---- solving ---------------------------------------------------------

    /// Solve the circuit: stamp, solve the linear system, write back, and
    /// iterate until every component's (V, I) pair is stable.
    ///
    /// Returns true when the iteration converged. Errors surface as
    /// [`SimEvent::Error`] and leave previous component state intact.
    pub fn solve(&mut self) -> bool {
        let Some(circuit) = self.circuit.clone() else {
            self.emit(SimEvent::Error(Error::NoCircuit.to_string()));
            return false;
        };
        let mut circuit = circuit.borrow_mut();

        if let Err(e) = self.ensure_index(&circuit) {
            self.emit(SimEvent::Error(e.to_string()));
            return false;
        }

        let dimension = self.node_index.len();
        let mut system = NodalSystem::new(dimension);

        self.prev.clear();
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.config.max_iterations && !converged {
            system.clear();
            if let Err(e) = self.stamp(&circuit, &mut system) {
                self.emit(SimEvent::Error(e.to_string()));
                return false;
            }

            let (a, b) = system.assemble();
            match solve_dense(&a, &b, EPSILON) {
                Ok(solution) => {
                    if let Err(e) = system.store_solution(solution) {
                        self.emit(SimEvent::Error(e.to_string()));
                        return false;
                    }
                }
                Err(e) => {
                    log::warn!("solve failed: {e}");
                    self.emit(SimEvent::Error(e.to_string()));
                    return false;
                }
            }

            self.write_back(&mut circuit, &system);

            // The first iteration has no previous pair to compare against.
            let first = iterations == 0;
            converged = self.check_convergence(&circuit, first);
            iterations += 1;
        }

        self.iteration_count = iterations;
        if converged {
            self.emit(SimEvent::Converged);
        } else {
            log::warn!("convergence failed after {iterations} iterations");
            self.emit(SimEvent::ConvergenceFailed { iterations });
        }

        self.emit_overload_edges(&circuit);

        self.sim_time += self.config.time_step;
        self.emit(SimEvent::StepCompleted {
            iterations,
            time: self.sim_time,
        });
        converged
    }

    /// Rebuild the node-to-matrix-index mapping when topology changed:
    /// ground gets index 0, the remaining nodes follow in insertion order.
    fn ensure_index(&mut self, circuit: &Circuit) -> Result<()> {
        if self.indexed_revision == Some(circuit.revision()) {
            return Ok(());
        }

        let ground = circuit.ground();
        if circuit.node(ground).is_none() {
            return Err(Error::NoGround);
        }

        self.node_index.clear();
        self.node_index.insert(ground, 0);
        let mut next = 1;
        for node in circuit.nodes() {
            if node.id() != ground {
                self.node_index.insert(node.id(), next);
                next += 1;
            }
        }
        self.indexed_revision = Some(circuit.revision());
        Ok(())
    }

    fn matrix_index(&self, node: Option<NodeId>) -> Option<usize> {
        node.and_then(|n| self.node_index.get(&n).copied())
    }

    /// Effective resistance for stamping, clamped away from zero.
    fn effective_resistance(resistance: f64) -> f64 {
        resistance.max(STAMP_EPSILON)
    }

    /// One stamping pass over every component.
    ///
    /// Single-terminal elements stamp either a voltage source (output pins
    /// with a live set value) or a conductance to the reference. Two-
    /// terminal elements stamp a conductance between their nodes.
    /// Components with unbound terminals contribute nothing. Ground is
    /// pinned to 0 V last.
    fn stamp(&self, circuit: &Circuit, system: &mut NodalSystem) -> Result<()> {
        for (_, element) in circuit.components() {
            let element = element.borrow();
            let resistance = Self::effective_resistance(element.resistance());
            let conductance = 1.0 / resistance;

            match element.terminal_count() {
                1 => {
                    let Some(index) = self.matrix_index(element.node(0)) else {
                        continue;
                    };
                    if let Some(voltage) = element.driven_voltage() {
                        system.add_voltage_source(Some(index), None, voltage)?;
                    } else {
                        system.add_conductance(Some(index), None, conductance)?;
                    }
                }
                2 => {
                    let (Some(a), Some(b)) = (
                        self.matrix_index(element.node(0)),
                        self.matrix_index(element.node(1)),
                    ) else {
                        continue;
                    };
                    system.add_conductance(Some(a), Some(b), conductance)?;
                }
                n => {
                    log::debug!("{}: unsupported terminal count {n}", element.name());
                }
            }
        }

        // Ground reference, pinned after all component stamps.
        system.set_node_voltage(0, 0.0)?;
        Ok(())
    }

    /// Write solved node voltages and branch currents back into nodes and
    /// components.
    fn write_back(&self, circuit: &mut Circuit, system: &NodalSystem) {
        for (&node, &index) in &self.node_index {
            let _ = circuit.set_node_voltage(node, system.voltage(Some(index)));
        }

        for (_, element) in circuit.components() {
            let mut element = element.borrow_mut();
            let resistance = Self::effective_resistance(element.resistance());

            match element.terminal_count() {
                1 => {
                    let Some(index) = self.matrix_index(element.node(0)) else {
                        continue;
                    };
                    let voltage = system.voltage(Some(index));
                    // Elements stamped as sources carry the current their
                    // constraint injects; the rest obey Ohm's law.
                    let current = if element.driven_voltage().is_some() {
                        system.injected_current(index)
                    } else {
                        voltage / resistance
                    };
                    element.update_state(voltage, current);
                }
                2 => {
                    let (Some(a), Some(b)) = (
                        self.matrix_index(element.node(0)),
                        self.matrix_index(element.node(1)),
                    ) else {
                        continue;
                    };
                    let voltage = system.voltage(Some(a)) - system.voltage(Some(b));
                    let current = voltage / resistance;
                    element.update_state(voltage, current);
                }
                _ => {}
            }
        }
    }

    /// Converged iff every component's (V, I) moved by at most the
    /// tolerance since the previous iteration. The first iteration never
    /// converges.
    fn check_convergence(&mut self, circuit: &Circuit, first: bool) -> bool {
        let tolerance = self.config.tolerance;
        let mut stable = true;

        for (id, element) in circuit.components() {
            let state = element.borrow().state();
            match self.prev.get(&id) {
                Some(&(voltage, current)) => {
                    if (state.voltage - voltage).abs() > tolerance
                        || (state.current - current).abs() > tolerance
                    {
                        stable = false;
                    }
                }
                None => stable = false,
            }
            self.prev.insert(id, (state.voltage, state.current));
        }

        stable && !first
    }

    /// Emit an [`SimEvent::Overload`] for every component whose overload
    /// flag rose during this solve.
    fn emit_overload_edges(&mut self, circuit: &Circuit) {
        let mut now_overloaded = HashSet::new();
        for (id, element) in circuit.components() {
            if element.borrow().overloaded() {
                now_overloaded.insert(id);
            }
        }
        let mut edges: Vec<ComponentId> = now_overloaded
            .difference(&self.overloaded)
            .copied()
            .collect();
        edges.sort();
        for component in edges {
            self.emit(SimEvent::Overload { component });
        }
        self.overloaded = now_overloaded;
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}
