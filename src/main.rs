#![no_std]
#![no_main]

use ble_sensor::config::TELEMETRY_PERIOD_SECS;
use ble_sensor::{ble, telemetry};
use embassy_executor::Spawner;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use esp_println as _;

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(72 * 1024);

    defmt::info!("Starting BLE Server...");

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_hal_embassy::init(timg0.timer1);

    // The LED is active-low; start with it off
    let led = Output::new(peripherals.GPIO10, Level::High, OutputConfig::default());

    let rng = Rng::new(peripherals.RNG);
    let timg1 = TimerGroup::new(peripherals.TIMG1);
    let init = esp_wifi::init(timg1.timer0, rng, peripherals.RADIO_CLK)
        .expect("failed to initialize the radio");

    defmt::info!(
        "Simulated telemetry updates every {} seconds",
        TELEMETRY_PERIOD_SECS
    );

    spawner.must_spawn(telemetry::start(rng));
    spawner.must_spawn(ble::start(peripherals.BT, init, led));
}
