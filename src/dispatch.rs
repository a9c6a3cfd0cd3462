use crate::config::LED_PIN;
use crate::effect::{Effect, Level};
use crate::service::{HandleTable, Slot};
use crate::telemetry::SharedTelemetry;

/// Command carried by the first byte of an LED write
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedCommand {
    On,
    Off,
}

impl LedCommand {
    /// `'0'` turns the LED on and `'1'` turns it off. Anything else is not a command.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload.first()? {
            b'0' => Some(Self::On),
            b'1' => Some(Self::Off),
            _ => None,
        }
    }

    pub fn is_on(self) -> bool {
        self == Self::On
    }

    /// The LED is active-low
    pub fn level(self) -> Level {
        match self {
            Self::On => Level::Low,
            Self::Off => Level::High,
        }
    }
}

/// Routes characteristic writes to their handler
pub struct WriteDispatcher<'a> {
    table: &'a HandleTable,
    telemetry: &'a SharedTelemetry,
}

impl<'a> WriteDispatcher<'a> {
    pub fn new(table: &'a HandleTable, telemetry: &'a SharedTelemetry) -> Self {
        Self { table, telemetry }
    }

    /// Apply a write to `handle`.
    ///
    /// Writes to handles other than the LED's, and payloads that are not an LED
    /// command, are ignored.
    pub fn dispatch(&self, handle: u16, payload: &[u8]) -> Option<Effect> {
        match self.table.slot_of(handle)? {
            Slot::Led => self.write_led(payload),
            slot => {
                trace!("Ignoring write to {:?}", slot);
                None
            }
        }
    }

    fn write_led(&self, payload: &[u8]) -> Option<Effect> {
        let Some(command) = LedCommand::parse(payload) else {
            trace!("Ignoring LED payload {:?}", payload);
            return None;
        };

        self.telemetry.set_led(command.is_on());

        if command.is_on() {
            info!("LED ON");
        } else {
            info!("LED OFF");
        }

        Some(Effect::SetOutputLevel {
            pin: LED_PIN,
            level: command.level(),
        })
    }
}
