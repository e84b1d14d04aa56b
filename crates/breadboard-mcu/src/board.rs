//! Arduino-like microcontroller board.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use breadboard_core::{Circuit, Element, SharedElement};
use breadboard_devices::{Pin, PinMode, PowerPin, PowerRail};
use breadboard_solver::Simulator;

use crate::error::{Error, Result};

/// Digital logic level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Whether this is the high level.
    pub fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// ADC reference source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogReference {
    /// The supply rail, 5.0 V.
    Default,
    /// The internal bandgap reference, 1.1 V.
    Internal,
    /// An external reference, assumed 3.3 V.
    External,
}

impl AnalogReference {
    /// Reference voltage in volts.
    pub fn voltage(self) -> f64 {
        match self {
            AnalogReference::Default => 5.0,
            AnalogReference::Internal => 1.1,
            AnalogReference::External => 3.3,
        }
    }
}

/// Board variant. Variants differ only in pin counts and which pins are
/// PWM-capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardModel {
    Uno,
    Nano,
    Mega,
}

impl BoardModel {
    /// Number of digital pins.
    pub fn digital_pin_count(self) -> usize {
        match self {
            BoardModel::Uno | BoardModel::Nano => 14,
            BoardModel::Mega => 54,
        }
    }

    /// Number of analog pins.
    pub fn analog_pin_count(self) -> usize {
        match self {
            BoardModel::Uno => 6,
            BoardModel::Nano => 8,
            BoardModel::Mega => 16,
        }
    }

    /// Whether a digital pin supports PWM.
    pub fn is_pwm_pin(self, pin: usize) -> bool {
        match self {
            BoardModel::Uno | BoardModel::Nano => matches!(pin, 3 | 5 | 6 | 9 | 10 | 11),
            BoardModel::Mega => (2..=13).contains(&pin),
        }
    }

    /// Human-readable board name.
    pub fn name(self) -> &'static str {
        match self {
            BoardModel::Uno => "Arduino Uno",
            BoardModel::Nano => "Arduino Nano",
            BoardModel::Mega => "Arduino Mega",
        }
    }
}

/// An Arduino-like board: a set of pins, power rails, and the sketch-facing
/// I/O surface that drives them.
///
/// The board owns its pins; [`attach`](Board::attach) registers shared
/// handles in a circuit as external components, so removing them from the
/// circuit never destroys them. Every mutation feeds the bound simulator's
/// `trigger_update`, which debounces and coalesces the resulting solves.
#[derive(Debug)]
pub struct Board {
    model: BoardModel,
    digital: Vec<Rc<RefCell<Pin>>>,
    analog: Vec<Rc<RefCell<Pin>>>,
    ground_pin: Rc<RefCell<PowerPin>>,
    vcc_pin: Rc<RefCell<PowerPin>>,
    powered: bool,
    reference: AnalogReference,
    simulator: Option<Weak<RefCell<Simulator>>>,
}

impl Board {
    /// Total current budget across all output pins, in amperes.
    pub const MAX_TOTAL_CURRENT: f64 = 0.5;

    /// Create a board with all pins of the given model.
    pub fn new(model: BoardModel) -> Self {
        let digital = (0..model.digital_pin_count())
            .map(|n| Rc::new(RefCell::new(Pin::digital(n, model.is_pwm_pin(n)))))
            .collect();
        let analog = (0..model.analog_pin_count())
            .map(|n| Rc::new(RefCell::new(Pin::analog(n))))
            .collect();
        Self {
            model,
            digital,
            analog,
            ground_pin: Rc::new(RefCell::new(PowerPin::new(PowerRail::Ground))),
            vcc_pin: Rc::new(RefCell::new(PowerPin::new(PowerRail::Vcc5))),
            powered: false,
            reference: AnalogReference::Default,
            simulator: None,
        }
    }

    /// The board model.
    pub fn model(&self) -> BoardModel {
        self.model
    }

    /// Handle to a digital pin.
    pub fn digital_pin(&self, pin: usize) -> Result<&Rc<RefCell<Pin>>> {
        self.digital.get(pin).ok_or(Error::UnknownPin(pin))
    }

    /// Handle to an analog pin.
    pub fn analog_pin(&self, pin: usize) -> Result<&Rc<RefCell<Pin>>> {
        self.analog.get(pin).ok_or(Error::UnknownPin(pin))
    }

    /// Handle to the ground power pin.
    pub fn ground_pin(&self) -> &Rc<RefCell<PowerPin>> {
        &self.ground_pin
    }

    /// Handle to the 5 V power pin.
    pub fn vcc_pin(&self) -> &Rc<RefCell<PowerPin>> {
        &self.vcc_pin
    }

    /// Register every pin in the circuit as an external component.
    pub fn attach(&self, circuit: &Rc<RefCell<Circuit>>) {
        let mut circuit = circuit.borrow_mut();
        for pin in self.digital.iter().chain(&self.analog) {
            let element: SharedElement = Rc::clone(pin) as SharedElement;
            circuit.add_external(element);
        }
        circuit.add_external(Rc::clone(&self.ground_pin) as SharedElement);
        circuit.add_external(Rc::clone(&self.vcc_pin) as SharedElement);
    }

    /// Bind the simulator that pin mutations should notify.
    pub fn bind_simulator(&mut self, simulator: &Rc<RefCell<Simulator>>) {
        self.simulator = Some(Rc::downgrade(simulator));
    }

    fn notify(&self) {
        if let Some(simulator) = self.simulator.as_ref().and_then(Weak::upgrade) {
            simulator.borrow_mut().trigger_update();
        }
    }

    fn require_power(&self) -> Result<()> {
        if self.powered {
            Ok(())
        } else {
            Err(Error::PoweredOff)
        }
    }

    // ---- sketch API ------------------------------------------------------

    /// Set a digital pin's mode. Only `Input`, `Output`, and `InputPullup`
    /// are reachable from the sketch API.
    pub fn pin_mode(&self, pin: usize, mode: PinMode) -> Result<()> {
        self.require_power()?;
        if !matches!(mode, PinMode::Input | PinMode::Output | PinMode::InputPullup) {
            return Err(Error::InvalidMode);
        }
        self.digital_pin(pin)?.borrow_mut().set_mode(mode);
        self.notify();
        Ok(())
    }

    /// Drive a digital pin high or low. Requires `Output` mode.
    pub fn digital_write(&self, pin: usize, level: Level) -> Result<()> {
        self.require_power()?;
        self.digital_pin(pin)?
            .borrow_mut()
            .write_digital(level.is_high())?;
        self.notify();
        Ok(())
    }

    /// Read a digital pin. Requires an input mode.
    pub fn digital_read(&self, pin: usize) -> Result<Level> {
        self.require_power()?;
        let high = self.digital_pin(pin)?.borrow().read_digital()?;
        Ok(Level::from(high))
    }

    /// Drive a PWM duty cycle on a PWM-capable digital pin in `Output`
    /// mode. Modeled as the time-averaged DC value duty/255 · VCC.
    pub fn analog_write(&self, pin: usize, duty: u8) -> Result<()> {
        self.require_power()?;
        self.digital_pin(pin)?.borrow_mut().write_pwm(duty)?;
        self.notify();
        Ok(())
    }

    /// Read an analog pin's ADC value. Requires `AnalogInput` mode.
    pub fn analog_read(&self, pin: usize) -> Result<u32> {
        self.require_power()?;
        Ok(self.analog_pin(pin)?.borrow().read_analog()?)
    }

    /// Select the ADC reference for all analog pins.
    pub fn analog_reference(&mut self, reference: AnalogReference) {
        self.reference = reference;
        for pin in &self.analog {
            pin.borrow_mut().set_reference_voltage(reference.voltage());
        }
    }

    /// The selected ADC reference.
    pub fn reference(&self) -> AnalogReference {
        self.reference
    }

    // ---- power management ------------------------------------------------

    /// Whether the board is powered.
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Power the board on.
    pub fn power_on(&mut self) {
        if !self.powered {
            self.powered = true;
            log::debug!("{} powered on", self.model.name());
        }
    }

    /// Power the board off, clearing all pin electrical state.
    pub fn power_off(&mut self) {
        if self.powered {
            self.powered = false;
            for pin in self.digital.iter().chain(&self.analog) {
                pin.borrow_mut().reset();
            }
            self.notify();
            log::debug!("{} powered off", self.model.name());
        }
    }

    /// Reset the board: digital pins return to `Input`, analog pins to
    /// `AnalogInput`, and all pre-solve state is cleared.
    pub fn reset(&self) {
        for pin in &self.digital {
            let mut pin = pin.borrow_mut();
            pin.set_mode(PinMode::Input);
            pin.reset();
        }
        for pin in &self.analog {
            let mut pin = pin.borrow_mut();
            pin.set_mode(PinMode::AnalogInput);
            pin.reset();
        }
        self.notify();
    }

    // ---- diagnostics -----------------------------------------------------

    /// Total current sourced by pins in output modes, in amperes.
    pub fn supply_current(&self) -> f64 {
        self.digital
            .iter()
            .chain(&self.analog)
            .filter(|pin| pin.borrow().mode().is_output())
            .map(|pin| pin.borrow().state().current.abs())
            .sum()
    }

    /// Whether the board as a whole exceeds its current budget.
    pub fn is_overloaded(&self) -> bool {
        self.supply_current() > Self::MAX_TOTAL_CURRENT
    }

    /// Numbers of the digital pins whose overload flag is set.
    pub fn overloaded_pins(&self) -> Vec<usize> {
        self.digital
            .iter()
            .filter(|pin| pin.borrow().overloaded())
            .map(|pin| pin.borrow().number())
            .collect()
    }
}
