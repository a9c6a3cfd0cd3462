#![cfg_attr(not(any(test, feature = "std")), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod effect;
pub mod error;
pub mod router;
pub mod service;
pub mod telemetry;

// ESP32-specific modules
#[cfg(feature = "esp32")]
pub mod ble;

pub use error::Error;
