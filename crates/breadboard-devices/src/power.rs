//! Fixed-voltage power pins.

use breadboard_core::{ElectricalState, Element, NodeId, Terminals, SOURCE_THRESHOLD};

/// Supply rails available on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerRail {
    /// 0 V ground rail.
    Ground,
    /// 5 V supply rail.
    Vcc5,
    /// 3.3 V supply rail.
    Vcc3V3,
}

impl PowerRail {
    /// Rail voltage in volts.
    pub fn voltage(self) -> f64 {
        match self {
            PowerRail::Ground => 0.0,
            PowerRail::Vcc5 => 5.0,
            PowerRail::Vcc3V3 => 3.3,
        }
    }

    fn name(self) -> &'static str {
        match self {
            PowerRail::Ground => "GND",
            PowerRail::Vcc5 => "5V",
            PowerRail::Vcc3V3 => "3.3V",
        }
    }
}

/// A power pin: a single-terminal element with a fixed rail voltage behind
/// a very low output resistance.
///
/// The positive rails stamp as voltage sources; the ground rail falls
/// through to a stiff conductance to the reference.
#[derive(Debug)]
pub struct PowerPin {
    rail: PowerRail,
    terminals: Terminals,
    state: ElectricalState,
}

impl PowerPin {
    /// Output resistance of a power rail, in ohms.
    pub const RESISTANCE: f64 = 0.01;

    /// Create a power pin for the given rail.
    pub fn new(rail: PowerRail) -> Self {
        Self {
            rail,
            terminals: Terminals::new(1),
            state: ElectricalState::default(),
        }
    }

    /// The rail this pin exposes.
    pub fn rail(&self) -> PowerRail {
        self.rail
    }

    /// The fixed rail voltage.
    pub fn voltage(&self) -> f64 {
        self.rail.voltage()
    }
}

impl Element for PowerPin {
    fn name(&self) -> &str {
        self.rail.name()
    }

    fn terminal_count(&self) -> usize {
        1
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

    fn driven_voltage(&self) -> Option<f64> {
        let v = self.rail.voltage();
        (v > SOURCE_THRESHOLD).then_some(v)
    }

    fn state(&self) -> ElectricalState {
        self.state
    }

    fn update_state(&mut self, _voltage: f64, current: f64) {
        // A rail holds its fixed voltage regardless of load.
        self.state = ElectricalState {
            voltage: self.rail.voltage(),
            current,
        };
    }

    fn reset(&mut self) {
        self.state = ElectricalState::default();
    }
}
