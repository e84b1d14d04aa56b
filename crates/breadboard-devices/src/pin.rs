//! Microcontroller I/O pin device model.

use breadboard_core::{ElectricalState, Element, NodeId, Terminals, SOURCE_THRESHOLD};

use crate::error::{Error, Result};

/// Operating mode of a microcontroller pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinMode {
    Input,
    InputPullup,
    Output,
    AnalogInput,
    AnalogOutput,
}

impl PinMode {
    /// Whether the pin drives its node in this mode.
    pub fn is_output(self) -> bool {
        matches!(self, PinMode::Output | PinMode::AnalogOutput)
    }

    /// Whether the pin reads its node in this mode.
    pub fn is_input(self) -> bool {
        !self.is_output()
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            PinMode::Input => "INPUT",
            PinMode::InputPullup => "INPUT_PULLUP",
            PinMode::Output => "OUTPUT",
            PinMode::AnalogInput => "ANALOG_INPUT",
            PinMode::AnalogOutput => "ANALOG_OUTPUT",
        }
    }
}

/// Physical kind of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    /// Digital pin, optionally PWM-capable.
    Digital { pwm: bool },
    /// Analog pin with an ADC behind it.
    Analog,
}

/// A microcontroller I/O pin as a single-terminal circuit element.
///
/// In an output mode the pin models an ideal voltage source of the set
/// value behind a small output resistance; in the input modes it presents
/// a very high input impedance, or a pullup resistor to the supply rail.
/// PWM output is modeled as its time-averaged DC value.
#[derive(Debug)]
pub struct Pin {
    name: String,
    number: usize,
    kind: PinKind,
    mode: PinMode,
    /// Voltage the pin tries to drive in an output mode.
    set_voltage: f64,
    /// Active PWM duty cycle, if any.
    pwm_duty: Option<u8>,
    /// ADC reference voltage.
    reference_voltage: f64,
    /// ADC resolution in bits.
    adc_resolution: u32,
    overloaded: bool,
    terminals: Terminals,
    state: ElectricalState,
}

impl Pin {
    /// Supply voltage of the board, in volts.
    pub const VCC: f64 = 5.0;
    /// Output resistance in an output mode, in ohms.
    pub const OUTPUT_RESISTANCE: f64 = 25.0;
    /// Input impedance in a high-impedance input mode, in ohms.
    pub const INPUT_RESISTANCE: f64 = 1e9;
    /// Pullup resistance to the supply rail, in ohms.
    pub const PULLUP_RESISTANCE: f64 = 5e4;
    /// Per-pin current limit, in amperes.
    pub const MAX_CURRENT: f64 = 0.04;
    /// Default ADC resolution in bits.
    pub const ADC_RESOLUTION: u32 = 10;

    /// Create a digital pin. Digital pins start in `Input` mode.
    pub fn digital(number: usize, pwm: bool) -> Self {
        Self::new(
            format!("Digital Pin {number}"),
            number,
            PinKind::Digital { pwm },
            PinMode::Input,
        )
    }

    /// Create an analog pin. Analog pins start in `AnalogInput` mode.
    pub fn analog(number: usize) -> Self {
        Self::new(
            format!("Analog Pin A{number}"),
            number,
            PinKind::Analog,
            PinMode::AnalogInput,
        )
    }

    fn new(name: String, number: usize, kind: PinKind, mode: PinMode) -> Self {
        Self {
            name,
            number,
            kind,
            mode,
            set_voltage: 0.0,
            pwm_duty: None,
            reference_voltage: Self::VCC,
            adc_resolution: Self::ADC_RESOLUTION,
            overloaded: false,
            terminals: Terminals::new(1),
            state: ElectricalState::default(),
        }
    }

    /// Pin number on the board.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Physical kind of the pin.
    pub fn kind(&self) -> PinKind {
        self.kind
    }

    /// Current operating mode.
    pub fn mode(&self) -> PinMode {
        self.mode
    }

    /// Whether this pin can produce PWM output.
    pub fn pwm_capable(&self) -> bool {
        matches!(self.kind, PinKind::Digital { pwm: true })
    }

    /// Change the operating mode. Leaving an output mode clears the set
    /// voltage and any active PWM.
    pub fn set_mode(&mut self, mode: PinMode) {
        if self.mode == mode {
            return;
        }
        if self.mode.is_output() {
            self.set_voltage = 0.0;
            self.pwm_duty = None;
        }
        self.mode = mode;
    }

    /// Voltage the pin is set to drive.
    pub fn set_voltage(&self) -> f64 {
        self.set_voltage
    }

    /// Active PWM duty cycle, if any.
    pub fn pwm_duty(&self) -> Option<u8> {
        self.pwm_duty
    }

    /// Drive the pin high or low. Requires `Output` mode. Cancels PWM.
    pub fn write_digital(&mut self, high: bool) -> Result<()> {
        self.require_mode(PinMode::Output)?;
        self.set_voltage = if high { Self::VCC } else { 0.0 };
        self.pwm_duty = None;
        Ok(())
    }

    /// Drive a PWM duty cycle, modeled as its DC average
    /// duty/255 · VCC. Requires a PWM-capable pin in `Output` mode.
    pub fn write_pwm(&mut self, duty: u8) -> Result<()> {
        if !self.pwm_capable() {
            return Err(Error::NoPwm);
        }
        self.require_mode(PinMode::Output)?;
        self.pwm_duty = Some(duty);
        self.set_voltage = f64::from(duty) / 255.0 * Self::VCC;
        Ok(())
    }

    /// Drive an analog voltage, clamped to [0, VCC]. Requires
    /// `AnalogOutput` mode.
    pub fn write_analog(&mut self, volts: f64) -> Result<()> {
        self.require_mode(PinMode::AnalogOutput)?;
        self.set_voltage = volts.clamp(0.0, Self::VCC);
        Ok(())
    }

    /// Read the pin digitally: true iff the last-solved node voltage is
    /// above VCC/2. Requires an input mode.
    pub fn read_digital(&self) -> Result<bool> {
        if !self.mode.is_input() {
            return Err(Error::WrongMode {
                required: "an input mode",
                actual: self.mode.as_str(),
            });
        }
        Ok(self.state.voltage > Self::VCC / 2.0)
    }

    /// Read the ADC: the last-solved voltage quantized against the
    /// reference. Requires `AnalogInput` mode.
    pub fn read_analog(&self) -> Result<u32> {
        self.require_mode(PinMode::AnalogInput)?;
        let max = (1u32 << self.adc_resolution) - 1;
        let ratio = (self.state.voltage / self.reference_voltage).clamp(0.0, 1.0);
        Ok((ratio * f64::from(max)) as u32)
    }

    /// ADC reference voltage.
    pub fn reference_voltage(&self) -> f64 {
        self.reference_voltage
    }

    /// Change the ADC reference voltage.
    pub fn set_reference_voltage(&mut self, volts: f64) {
        self.reference_voltage = volts;
    }

    fn require_mode(&self, required: PinMode) -> Result<()> {
        if self.mode == required {
            Ok(())
        } else {
            Err(Error::WrongMode {
                required: required.as_str(),
                actual: self.mode.as_str(),
            })
        }
    }

    fn check_overload(&mut self) {
        let was = self.overloaded;
        self.overloaded = self.mode.is_output() && self.state.current.abs() > Self::MAX_CURRENT;
        if !was && self.overloaded {
            log::warn!(
                "{}: current overload, {:.1} mA (max {:.0} mA)",
                self.name,
                self.state.current.abs() * 1e3,
                Self::MAX_CURRENT * 1e3
            );
        }
    }
}

impl Element for Pin {
    fn name(&self) -> &str {
        &self.name
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
        match self.mode {
            PinMode::Output | PinMode::AnalogOutput => Self::OUTPUT_RESISTANCE,
            PinMode::InputPullup => Self::PULLUP_RESISTANCE,
            PinMode::Input | PinMode::AnalogInput => Self::INPUT_RESISTANCE,
        }
    }

    fn driven_voltage(&self) -> Option<f64> {
        if self.mode.is_output() && self.set_voltage > SOURCE_THRESHOLD {
            Some(self.set_voltage)
        } else {
            None
        }
    }

    fn state(&self) -> ElectricalState {
        self.state
    }

    fn update_state(&mut self, voltage: f64, current: f64) {
        self.state = ElectricalState { voltage, current };
        self.check_overload();
    }

    fn reset(&mut self) {
        self.state = ElectricalState::default();
        self.set_voltage = 0.0;
        self.pwm_duty = None;
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
    fn test_mode_resistances() {
        let mut pin = Pin::digital(13, false);
        assert_eq!(pin.resistance(), Pin::INPUT_RESISTANCE);

        pin.set_mode(PinMode::InputPullup);
        assert_eq!(pin.resistance(), Pin::PULLUP_RESISTANCE);

        pin.set_mode(PinMode::Output);
        assert_eq!(pin.resistance(), Pin::OUTPUT_RESISTANCE);
    }

    #[test]
    fn test_digital_write_requires_output() {
        let mut pin = Pin::digital(13, false);
        assert!(pin.write_digital(true).is_err());

        pin.set_mode(PinMode::Output);
        pin.write_digital(true).unwrap();
        assert_eq!(pin.set_voltage(), Pin::VCC);
        assert_eq!(pin.driven_voltage(), Some(Pin::VCC));

        pin.write_digital(false).unwrap();
        assert_eq!(pin.set_voltage(), 0.0);
        // 0 V output stamps as a conductance, not a source.
        assert_eq!(pin.driven_voltage(), None);
    }

    #[test]
    fn test_leaving_output_clears_drive() {
        let mut pin = Pin::digital(9, true);
        pin.set_mode(PinMode::Output);
        pin.write_pwm(128).unwrap();
        assert!(pin.pwm_duty().is_some());

        pin.set_mode(PinMode::Input);
        assert_eq!(pin.set_voltage(), 0.0);
        assert_eq!(pin.pwm_duty(), None);
        assert_eq!(pin.driven_voltage(), None);
    }

    #[test]
    fn test_pwm_voltage_average() {
        let mut pin = Pin::digital(9, true);
        pin.set_mode(PinMode::Output);

        pin.write_pwm(255).unwrap();
        assert!((pin.set_voltage() - 5.0).abs() < 1e-12);

        pin.write_pwm(51).unwrap();
        assert!((pin.set_voltage() - 1.0).abs() < 1e-12);

        // digitalWrite cancels PWM.
        pin.write_digital(true).unwrap();
        assert_eq!(pin.pwm_duty(), None);
    }

    #[test]
    fn test_pwm_requires_capable_pin() {
        let mut pin = Pin::digital(13, false);
        pin.set_mode(PinMode::Output);
        assert_eq!(pin.write_pwm(100).unwrap_err(), Error::NoPwm);
    }

    #[test]
    fn test_digital_read_threshold() {
        let mut pin = Pin::digital(2, false);
        pin.update_state(3.0, 0.0);
        assert!(pin.read_digital().unwrap());

        pin.update_state(2.0, 0.0);
        assert!(!pin.read_digital().unwrap());

        pin.set_mode(PinMode::Output);
        assert!(pin.read_digital().is_err());
    }

    #[test]
    fn test_analog_read_quantization() {
        let mut pin = Pin::analog(0);
        pin.update_state(2.5, 0.0);
        assert_eq!(pin.read_analog().unwrap(), 511);

        pin.update_state(5.0, 0.0);
        assert_eq!(pin.read_analog().unwrap(), 1023);

        // Out-of-range voltages clamp.
        pin.update_state(7.0, 0.0);
        assert_eq!(pin.read_analog().unwrap(), 1023);
        pin.update_state(-1.0, 0.0);
        assert_eq!(pin.read_analog().unwrap(), 0);
    }

    #[test]
    fn test_analog_read_with_reference() {
        let mut pin = Pin::analog(3);
        pin.set_reference_voltage(1.1);
        pin.update_state(1.1, 0.0);
        assert_eq!(pin.read_analog().unwrap(), 1023);
    }

    #[test]
    fn test_overload_in_output_mode_only() {
        let mut pin = Pin::digital(7, false);
        pin.set_mode(PinMode::Output);
        pin.write_digital(true).unwrap();
        pin.update_state(5.0, 0.5);
        assert!(pin.overloaded());

        pin.update_state(5.0, 0.01);
        assert!(!pin.overloaded());

        // Input pins never trip.
        let mut input = Pin::digital(8, false);
        input.update_state(5.0, 0.5);
        assert!(!input.overloaded());
    }

    #[test]
    fn test_reset_keeps_mode() {
        let mut pin = Pin::digital(13, false);
        pin.set_mode(PinMode::Output);
        pin.write_digital(true).unwrap();
        pin.update_state(5.0, 0.01);

        pin.reset();
        assert_eq!(pin.mode(), PinMode::Output);
        assert_eq!(pin.set_voltage(), 0.0);
        assert_eq!(pin.state(), ElectricalState::default());
    }
}
