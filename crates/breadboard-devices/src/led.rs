//! LED device model with a non-linear conduction characteristic.

use breadboard_core::{ElectricalState, Element, NodeId, Terminals};

use crate::error::{Error, Result};

/// LED colors with their typical forward voltages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedColor {
    Red,
    Green,
    Blue,
    White,
    Yellow,
}

impl LedColor {
    /// Typical forward voltage for this color, in volts.
    pub fn forward_voltage(self) -> f64 {
        match self {
            LedColor::Red => 1.8,
            LedColor::Yellow => 2.0,
            LedColor::Green => 2.2,
            LedColor::Blue | LedColor::White => 3.2,
        }
    }

    /// Maximum safe continuous current for this color, in amperes.
    pub fn max_current(self) -> f64 {
        match self {
            LedColor::Blue | LedColor::White => 0.020,
            _ => 0.025,
        }
    }
}

/// A light-emitting diode.
///
/// The LED is non-linear: its effective resistance depends on the current
/// the last solve computed through it, which is what drives the simulator's
/// fixed-point iteration. Terminal 0 is the anode, terminal 1 the cathode.
#[derive(Debug)]
pub struct Led {
    name: String,
    color: LedColor,
    /// Minimum anode-to-cathode voltage for meaningful conduction.
    forward_voltage: f64,
    /// Nominal operating current at full brightness.
    nominal_current: f64,
    /// Maximum safe continuous current.
    max_current: f64,
    /// Maximum power dissipation in watts.
    thermal_limit: f64,
    dynamic_resistance: f64,
    is_on: bool,
    brightness: f64,
    overloaded: bool,
    terminals: Terminals,
    state: ElectricalState,
}

impl Led {
    /// Resistance presented when not conducting.
    pub const OFF_RESISTANCE: f64 = 1e6;
    /// Minimum detectable conduction current.
    pub const MIN_CONDUCTION_CURRENT: f64 = 1e-6;
    /// Empirical series resistance of the linearized diode curve.
    pub const SERIES_RESISTANCE: f64 = 25.0;
    /// Default thermal power limit in watts.
    pub const THERMAL_LIMIT: f64 = 0.1;

    /// Create an LED of the given color with that color's typical forward
    /// voltage and current limits.
    pub fn new(color: LedColor) -> Self {
        Self {
            name: format!("{:?} LED", color),
            color,
            forward_voltage: color.forward_voltage(),
            nominal_current: 0.020,
            max_current: color.max_current(),
            thermal_limit: Self::THERMAL_LIMIT,
            dynamic_resistance: Self::OFF_RESISTANCE,
            is_on: false,
            brightness: 0.0,
            overloaded: false,
            terminals: Terminals::new(2),
            state: ElectricalState::default(),
        }
    }

    /// The LED's color.
    pub fn color(&self) -> LedColor {
        self.color
    }

    /// Change the color, adopting its typical forward voltage and current
    /// limit.
    pub fn set_color(&mut self, color: LedColor) {
        self.color = color;
        self.forward_voltage = color.forward_voltage();
        self.max_current = color.max_current();
        self.name = format!("{:?} LED", color);
    }

    /// Forward voltage in volts.
    pub fn forward_voltage(&self) -> f64 {
        self.forward_voltage
    }

    /// Override the forward voltage. Must be positive.
    pub fn set_forward_voltage(&mut self, voltage: f64) -> Result<()> {
        if voltage <= 0.0 {
            return Err(Error::InvalidForwardVoltage(voltage));
        }
        self.forward_voltage = voltage;
        Ok(())
    }

    /// Override the maximum safe current. Must be positive.
    pub fn set_max_current(&mut self, current: f64) -> Result<()> {
        if current <= 0.0 {
            return Err(Error::InvalidCurrentLimit(current));
        }
        self.max_current = current;
        Ok(())
    }

    /// Whether the LED is currently emitting.
    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// Relative brightness in [0, 1].
    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    /// Power dissipated at the last solve, in watts.
    pub fn power_dissipation(&self) -> f64 {
        (self.state.voltage * self.state.current).abs()
    }

    /// Recompute conduction state from the last (voltage, current) pair.
    ///
    /// Forward-biased iff V > 0 and I > 0 and |V| >= V_f and
    /// |I| > the conduction threshold. When conducting, the dynamic
    /// resistance R(I) = R_series + V_f / I feeds the next iteration of the
    /// fixed-point loop; otherwise the LED reads as a large off-resistance.
    fn recompute(&mut self) {
        let abs_current = self.state.current.abs();
        let abs_voltage = self.state.voltage.abs();

        let forward_biased = self.state.voltage > 0.0 && self.state.current > 0.0;
        let above_threshold = abs_voltage >= self.forward_voltage;
        let conducting = abs_current > Self::MIN_CONDUCTION_CURRENT;

        self.is_on = forward_biased && above_threshold && conducting;

        if self.is_on {
            self.brightness = self.brightness_at(abs_current);
            self.dynamic_resistance = Self::SERIES_RESISTANCE + self.forward_voltage / abs_current;
        } else {
            self.brightness = 0.0;
            self.dynamic_resistance = Self::OFF_RESISTANCE;
        }
    }

    /// Brightness model: linear ramp up to the nominal current, logarithmic
    /// saturation beyond it, clamped to 1.
    fn brightness_at(&self, current: f64) -> f64 {
        if current <= Self::MIN_CONDUCTION_CURRENT {
            return 0.0;
        }
        if current <= self.nominal_current {
            return current / self.nominal_current;
        }
        let excess = current - self.nominal_current;
        let max_excess = self.max_current - self.nominal_current;
        if max_excess > 0.0 {
            let saturation = 1.0 + 0.3 * (1.0 + excess / max_excess).ln();
            saturation.min(1.0)
        } else {
            1.0
        }
    }

    fn check_overload(&mut self) {
        let was = self.overloaded;
        let abs_current = self.state.current.abs();

        self.overloaded =
            abs_current > self.max_current || self.power_dissipation() > self.thermal_limit;

        if !was && self.overloaded {
            log::warn!(
                "{}: overload, {:.1} mA / {:.1} mW",
                self.name,
                abs_current * 1e3,
                self.power_dissipation() * 1e3
            );
        }
    }
}

impl Element for Led {
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
        self.dynamic_resistance
    }

    fn state(&self) -> ElectricalState {
        self.state
    }

    fn update_state(&mut self, voltage: f64, current: f64) {
        self.state = ElectricalState { voltage, current };
        self.recompute();
        self.check_overload();
    }

    fn reset(&mut self) {
        self.state = ElectricalState::default();
        self.is_on = false;
        self.brightness = 0.0;
        self.dynamic_resistance = Self::OFF_RESISTANCE;
        self.overloaded = false;
    }

    fn overloaded(&self) -> bool {
        self.overloaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_forward_voltages() {
        assert_eq!(LedColor::Red.forward_voltage(), 1.8);
        assert_eq!(LedColor::Yellow.forward_voltage(), 2.0);
        assert_eq!(LedColor::Green.forward_voltage(), 2.2);
        assert_eq!(LedColor::Blue.forward_voltage(), 3.2);
        assert_eq!(LedColor::White.forward_voltage(), 3.2);
    }

    #[test]
    fn test_off_below_forward_voltage() {
        let mut led = Led::new(LedColor::Red);
        led.update_state(1.0, 0.005);
        assert!(!led.is_on());
        assert_eq!(led.brightness(), 0.0);
        assert_eq!(led.resistance(), Led::OFF_RESISTANCE);
    }

    #[test]
    fn test_off_when_reverse_biased() {
        let mut led = Led::new(LedColor::Red);
        led.update_state(-5.0, -0.01);
        assert!(!led.is_on());
    }

    #[test]
    fn test_conducting_at_nominal_current() {
        let mut led = Led::new(LedColor::Red);
        led.update_state(1.9, 0.014);

        assert!(led.is_on());
        assert!((led.brightness() - 0.7).abs() < 1e-12);
        // R(I) = 25 + 1.8 / 0.014
        assert!((led.resistance() - (25.0 + 1.8 / 0.014)).abs() < 1e-9);
        assert!(!led.overloaded());
    }

    #[test]
    fn test_brightness_saturates_at_one() {
        let mut led = Led::new(LedColor::Red);
        led.update_state(2.0, 0.022);
        assert!(led.is_on());
        assert_eq!(led.brightness(), 1.0);
    }

    #[test]
    fn test_current_overload() {
        let mut led = Led::new(LedColor::Red);
        led.update_state(2.0, 0.03); // above 25 mA limit
        assert!(led.overloaded());

        // Overload clears when the current drops back.
        led.update_state(1.9, 0.014);
        assert!(!led.overloaded());
    }

    #[test]
    fn test_thermal_overload() {
        let mut led = Led::new(LedColor::Red);
        // 6 V * 20 mA = 120 mW exceeds the 100 mW limit.
        led.update_state(6.0, 0.02);
        assert!(led.overloaded());
    }

    #[test]
    fn test_reset() {
        let mut led = Led::new(LedColor::Green);
        led.update_state(2.5, 0.02);
        assert!(led.is_on());

        led.reset();
        assert!(!led.is_on());
        assert_eq!(led.brightness(), 0.0);
        assert_eq!(led.resistance(), Led::OFF_RESISTANCE);
        assert_eq!(led.state(), ElectricalState::default());
    }
}
