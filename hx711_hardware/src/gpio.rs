//! Raspberry Pi GPIO backend over rppal.

use std::collections::HashMap;

use hx711_traits::{DigitalIo, Direction, Line};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::debug;

use crate::error::HwError;

/// [`DigitalIo`] over BCM pins. All fallible GPIO work happens in
/// `configure`; `write` and `read` are plain register pokes so they stay
/// inside the driver's pulse-width budget. Unconfigured lines write to
/// nothing and read high, matching a floating input.
pub struct RppalIo {
    gpio: Gpio,
    inputs: HashMap<u8, InputPin>,
    outputs: HashMap<u8, OutputPin>,
}

impl RppalIo {
    pub fn new() -> Result<Self, HwError> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        Ok(Self {
            gpio,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
        })
    }
}

impl DigitalIo for RppalIo {
    fn configure(
        &mut self,
        line: Line,
        direction: Direction,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let pin = self
            .gpio
            .get(line.0)
            .map_err(|e| HwError::Gpio(format!("{line}: {e}")))?;
        match direction {
            Direction::Input => {
                self.outputs.remove(&line.0);
                self.inputs.insert(line.0, pin.into_input());
            }
            Direction::Output => {
                self.inputs.remove(&line.0);
                // Clock lines idle low.
                self.outputs.insert(line.0, pin.into_output_low());
            }
        }
        debug!(%line, ?direction, "gpio configured");
        Ok(())
    }

    fn write(&mut self, line: Line, level: bool) {
        if let Some(pin) = self.outputs.get_mut(&line.0) {
            if level {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }
    }

    fn read(&mut self, line: Line) -> bool {
        match self.inputs.get(&line.0) {
            Some(pin) => pin.is_high(),
            None => true,
        }
    }
}
