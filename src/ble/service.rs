use trouble_host::prelude::gatt_service;

use crate::service::{BATTERY_UUID, LED_UUID, SERVICE_UUID, TEMPERATURE_UUID};

/// Attribute layout handed to the host stack. Must match `service::build_descriptor`.
#[gatt_service(uuid = SERVICE_UUID)]
pub struct SensorService {
    #[characteristic(uuid = TEMPERATURE_UUID, read, notify)]
    pub temperature: f32,

    #[characteristic(uuid = BATTERY_UUID, read, notify)]
    pub battery: f32,

    #[characteristic(uuid = LED_UUID, read, write, notify)]
    pub led: u8,
}
