use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::config::{
    BATTERY_DEFAULT, BATTERY_FLOOR, BATTERY_STEP, TEMPERATURE_DEFAULT, TEMPERATURE_STEP,
};

/// Values exposed by the sensor service
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    /// Simulated temperature in degrees Celsius
    pub temperature: f32,

    /// Simulated battery voltage
    pub battery_voltage: f32,

    /// Whether the LED is lit
    pub led_on: bool,
}

impl Telemetry {
    pub const DEFAULT: Self = Self {
        temperature: TEMPERATURE_DEFAULT,
        battery_voltage: BATTERY_DEFAULT,
        led_on: false,
    };
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Telemetry shared between the event dispatch context, the producer task and GATT readers.
///
/// Every access happens inside a critical section, so readers never observe a
/// half-written update.
pub struct SharedTelemetry {
    inner: Mutex<CriticalSectionRawMutex, Cell<Telemetry>>,
}

impl SharedTelemetry {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(Telemetry::DEFAULT)),
        }
    }

    pub fn snapshot(&self) -> Telemetry {
        self.inner.lock(|cell| cell.get())
    }

    /// Modify the telemetry in place and return whatever `f` returns
    pub fn update<R>(&self, f: impl FnOnce(&mut Telemetry) -> R) -> R {
        self.inner.lock(|cell| {
            let mut telemetry = cell.get();
            let result = f(&mut telemetry);
            cell.set(telemetry);
            result
        })
    }

    pub fn set_led(&self, on: bool) {
        self.update(|telemetry| telemetry.led_on = on);
    }
}

impl Default for SharedTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide telemetry
pub static TELEMETRY: SharedTelemetry = SharedTelemetry::new();

/// Source of the temperature random walk direction
pub trait StepSource {
    /// `true` to step the temperature up, `false` to step it down
    fn rising(&mut self) -> bool;
}

pub fn next_temperature(current: f32, rising: bool) -> f32 {
    if rising {
        current + TEMPERATURE_STEP
    } else {
        current - TEMPERATURE_STEP
    }
}

/// Battery sawtooth: drain by one step, or recharge once the floor would be reached
pub fn next_battery_voltage(current: f32) -> f32 {
    let next = current - BATTERY_STEP;
    if next <= BATTERY_FLOOR {
        BATTERY_DEFAULT
    } else {
        next
    }
}

/// Evolves the simulated sensor readings, one cycle at a time
pub struct TelemetryProducer<S> {
    source: S,
}

impl<S: StepSource> TelemetryProducer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Run a single cycle against `shared` and return the new readings
    pub fn cycle(&mut self, shared: &SharedTelemetry) -> Telemetry {
        let rising = self.source.rising();

        let readings = shared.update(|telemetry| {
            telemetry.temperature = next_temperature(telemetry.temperature, rising);
            telemetry.battery_voltage = next_battery_voltage(telemetry.battery_voltage);
            *telemetry
        });

        info!(
            "Temperature: {} C, Battery: {} V",
            readings.temperature,
            readings.battery_voltage
        );

        readings
    }
}

#[cfg(feature = "esp32")]
impl StepSource for esp_hal::rng::Rng {
    fn rising(&mut self) -> bool {
        self.random() % 2 == 0
    }
}

/// Telemetry producer task, runs for the lifetime of the firmware
#[cfg(feature = "esp32")]
#[embassy_executor::task]
pub async fn start(rng: esp_hal::rng::Rng) {
    use crate::config::TELEMETRY_PERIOD_SECS;

    defmt::info!("Starting telemetry task");

    let mut producer = TelemetryProducer::new(rng);

    loop {
        producer.cycle(&TELEMETRY);
        embassy_time::Timer::after_secs(TELEMETRY_PERIOD_SECS).await;
    }
}
