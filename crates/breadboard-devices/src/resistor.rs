//! Resistor device model.

use breadboard_core::{ElectricalState, Element, NodeId, Terminals};

use crate::error::{Error, Result};

/// A linear two-terminal resistor.
#[derive(Debug)]
pub struct Resistor {
    name: String,
    resistance: f64,
    terminals: Terminals,
    state: ElectricalState,
}

impl Resistor {
    /// Create a new resistor. Resistance must be positive.
    pub fn new(resistance: f64) -> Result<Self> {
        if resistance <= 0.0 {
            return Err(Error::InvalidResistance(resistance));
        }
        Ok(Self {
            name: format!("{} ohm resistor", resistance),
            resistance,
            terminals: Terminals::new(2),
            state: ElectricalState::default(),
        })
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }

    /// Change the resistance. Non-positive values are rejected.
    pub fn set_resistance(&mut self, resistance: f64) -> Result<()> {
        if resistance <= 0.0 {
            return Err(Error::InvalidResistance(resistance));
        }
        self.resistance = resistance;
        Ok(())
    }

    /// Power dissipated at the last solve, in watts.
    pub fn power_dissipation(&self) -> f64 {
        (self.state.voltage * self.state.current).abs()
    }
}

impl Element for Resistor {
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
        self.resistance
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resistor_conductance() {
        let r = Resistor::new(220.0).unwrap();
        assert!((r.conductance() - 1.0 / 220.0).abs() < 1e-15);
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(Resistor::new(0.0).is_err());
        assert!(Resistor::new(-5.0).is_err());

        let mut r = Resistor::new(100.0).unwrap();
        assert_eq!(
            r.set_resistance(-1.0).unwrap_err(),
            Error::InvalidResistance(-1.0)
        );
        assert_eq!(r.resistance(), 100.0);
    }

    #[test]
    fn test_power_dissipation() {
        let mut r = Resistor::new(100.0).unwrap();
        r.update_state(2.0, 0.02);
        assert!((r.power_dissipation() - 0.04).abs() < 1e-15);
    }
}
