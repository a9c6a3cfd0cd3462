/// GPIO driving the LED. The LED is wired active-low.
pub const LED_PIN: u8 = 10;

/// Seconds between telemetry cycles
pub const TELEMETRY_PERIOD_SECS: u64 = 15;

pub const TEMPERATURE_DEFAULT: f32 = 25.0;
pub const TEMPERATURE_STEP: f32 = 0.1;

pub const BATTERY_DEFAULT: f32 = 5.0;
pub const BATTERY_STEP: f32 = 0.01;

/// The battery reading never reaches this value; it wraps back to `BATTERY_DEFAULT` instead
pub const BATTERY_FLOOR: f32 = 1.0;
