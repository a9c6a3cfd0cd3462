use bt_hci::controller::ExternalController;
use config::{Config, Resources};
use embassy_futures::select::{select, Either};
use embassy_time::Timer;
use embedded_hal::digital::OutputPin;
use error::Error;
use esp_hal::gpio::Output;
use esp_hal::peripherals::BT;
use esp_wifi::{ble::controller::BleConnector, EspWifiController};
use service::SensorService;
use trouble_host::prelude::*;

use crate::config::{LED_PIN, TELEMETRY_PERIOD_SECS};
use crate::effect::{execute, Collaborators, Level};
use crate::router::{Event, Router};
use crate::service::{ServiceDescriptor, SERVICE_UUID};
use crate::telemetry::{Telemetry, TELEMETRY};

mod config;
mod error;
mod service;

#[gatt_server]
pub struct Server {
    sensor_service: SensorService,
}

/// Executes router effects against the host stack and the LED pin
struct Board<P> {
    led: P,

    /// Set whenever the router asks for the peripheral to become discoverable
    advertise: bool,
}

impl<P: OutputPin> Board<P> {
    fn new(led: P) -> Self {
        Self {
            led,
            advertise: false,
        }
    }
}

impl<P: OutputPin> Collaborators for Board<P> {
    // The table itself is laid out by `#[gatt_service]` when the server is built
    fn register_service(&mut self, descriptor: &ServiceDescriptor) {
        defmt::info!(
            "Submitting attribute table with {} characteristics",
            descriptor.characteristics.len()
        );
    }

    fn start_advertising(&mut self) {
        self.advertise = true;
    }

    fn set_output_level(&mut self, pin: u8, level: Level) {
        if pin != LED_PIN {
            defmt::warn!("No output configured on pin {}", pin);
            return;
        }

        let result = match level {
            Level::Low => self.led.set_low(),
            Level::High => self.led.set_high(),
        };

        if result.is_err() {
            defmt::warn!("Failed to drive pin {} {}", pin, level);
        }
    }
}

/// Feed one stack event through the router and execute what it asks for
fn route<P: OutputPin>(router: &mut Router<'_>, board: &mut Board<P>, event: Event<'_>) {
    let effects = router.handle(event);
    execute(&effects, board);
}

/// Copy the shared telemetry into the attribute table so reads see current values
fn publish(server: &Server<'_>, telemetry: &Telemetry) {
    let service = &server.sensor_service;

    let results = [
        server.set(&service.temperature, &telemetry.temperature),
        server.set(&service.battery, &telemetry.battery_voltage),
        server.set(&service.led, &u8::from(telemetry.led_on)),
    ];

    if results.iter().any(Result::is_err) {
        defmt::warn!("[gatt] failed to update attribute values");
    }
}

/// BLE stack and the sensor service state machine
pub struct Ble<'a, C: Controller, P> {
    config: Config,
    peripheral: Peripheral<'a, C>,
    server: Server<'a>,
    router: Router<'static>,
    board: Board<P>,
}

impl<'a, C: Controller, P: OutputPin> Ble<'a, C, P> {
    /// Create a new BLE instance
    ///
    /// * `peripheral` - The BLE peripheral interface
    /// * `config` - BLE configuration parameters
    /// * `led` - Output pin driving the LED
    fn new(peripheral: Peripheral<'a, C>, config: Config, led: P) -> Result<Self, Error> {
        let mut router = Router::new(&TELEMETRY);
        let mut board = Board::new(led);

        route(&mut router, &mut board, Event::RegistrationRequested);

        let server = Server::new_with_config(GapConfig::Peripheral(PeripheralConfig {
            name: config.name,
            appearance: &appearance::sensor::GENERIC_SENSOR,
        }))
        .map_err(|_| Error::GattError)?;

        let handles = [
            server.sensor_service.temperature.handle,
            server.sensor_service.battery.handle,
            server.sensor_service.led.handle,
        ];
        route(&mut router, &mut board, Event::TableCreated(&handles));
        publish(&server, &TELEMETRY.snapshot());

        Ok(Self {
            config,
            peripheral,
            server,
            router,
            board,
        })
    }

    /// Start the BLE service and handle connections until the service becomes unusable
    ///
    /// * `stack` - Reference to the BLE stack
    /// * `config` - BLE configuration parameters
    /// * `led` - Output pin driving the LED
    async fn start(stack: &'a Stack<'a, C>, config: Config, led: P) -> Result<(), Error> {
        let Host {
            peripheral, runner, ..
        } = stack.build();

        let mut ble = Self::new(peripheral, config, led)?;

        match select(ble_task(runner), ble.run_connection_loop()).await {
            Either::First(()) => Ok(()),
            Either::Second(result) => result,
        }
    }

    /// Run the main BLE connection loop, advertising whenever the router asks for it
    async fn run_connection_loop(&mut self) -> Result<(), Error> {
        loop {
            embassy_futures::yield_now().await;

            if !core::mem::take(&mut self.board.advertise) {
                defmt::error!("Advertising not requested, service is not usable");
                return Err(Error::NotAdvertising);
            }

            match advertise(self.config.name, &mut self.peripheral).await {
                Ok(conn) => {
                    route(&mut self.router, &mut self.board, Event::Connected);

                    // Run all connection-dependent tasks
                    select(
                        gatt_events_task(&self.server, &mut self.router, &mut self.board, &conn),
                        notify_task(&self.server, &conn),
                    )
                    .await;

                    // Handle disconnection regardless of which task exited
                    route(&mut self.router, &mut self.board, Event::Disconnected);
                }
                Err(_) => {
                    defmt::error!("Error establishing a BLE connection");
                    self.board.advertise = true;
                    Timer::after_secs(self.config.advertise_retry_secs).await;
                }
            }
        }
    }
}

/// Handle GATT events for the BLE server until the connection closes
async fn gatt_events_task<P: OutputPin>(
    server: &Server<'_>,
    router: &mut Router<'_>,
    board: &mut Board<P>,
    conn: &Connection<'_>,
) {
    loop {
        match conn.next().await {
            ConnectionEvent::Disconnected { reason } => {
                defmt::info!("[gatt] disconnected: {:?}", defmt::Debug2Format(&reason));
                break;
            }
            ConnectionEvent::Gatt { data } => match data.process(server).await {
                Ok(Some(event)) => {
                    match &event {
                        GattEvent::Read(event) => {
                            publish(server, &TELEMETRY.snapshot());
                            route(router, board, Event::Read { handle: event.handle() });
                        }
                        GattEvent::Write(event) => {
                            route(
                                router,
                                board,
                                Event::Write {
                                    handle: event.handle(),
                                    payload: event.data(),
                                },
                            );
                        }
                    }

                    // This step is also performed at drop(), but writing it explicitly is necessary
                    // in order to ensure reply is sent.
                    match event.accept() {
                        Ok(reply) => reply.send().await,
                        Err(e) => {
                            defmt::warn!(
                                "[gatt] error sending response: {:?}",
                                defmt::Debug2Format(&e)
                            );
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    defmt::warn!(
                        "[gatt] error processing event: {:?}",
                        defmt::Debug2Format(&e)
                    );
                    break;
                }
            },
        }
    }
    defmt::info!("[gatt] task finished");
}

/// Notify the connected central of the current readings once per telemetry period
async fn notify_task(server: &Server<'_>, conn: &Connection<'_>) {
    let service = &server.sensor_service;

    loop {
        Timer::after_secs(TELEMETRY_PERIOD_SECS).await;

        let telemetry = TELEMETRY.snapshot();

        if service
            .temperature
            .notify(server, conn, &telemetry.temperature)
            .await
            .is_err()
            || service
                .battery
                .notify(server, conn, &telemetry.battery_voltage)
                .await
                .is_err()
        {
            defmt::info!("[notify] error notifying connection");
            break;
        }
    }
}

/// Run the BLE host stack task
async fn ble_task<C: Controller>(mut runner: Runner<'_, C>) {
    loop {
        if let Err(e) = runner.run().await {
            panic!("[ble_task] error: {:?}", e);
        }

        embassy_futures::yield_now().await;
    }
}

/// Advertise the BLE device for incoming connections
async fn advertise<'a, C: Controller>(
    name: &'a str,
    peripheral: &mut Peripheral<'a, C>,
) -> Result<Connection<'a>, BleHostError<C::Error>> {
    let mut advertiser_data = [0; 31];

    let adv_len = AdStructure::encode_slice(
        &[
            AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
            AdStructure::ServiceUuids128(&[SERVICE_UUID.into()]),
        ],
        &mut advertiser_data[..],
    )?;

    let mut scan_data = [0; 31];
    let scan_len = AdStructure::encode_slice(
        &[AdStructure::CompleteLocalName(name.as_bytes())],
        &mut scan_data[..],
    )?;

    let advertiser = peripheral
        .advertise(
            &Default::default(),
            Advertisement::ConnectableScannableUndirected {
                adv_data: &advertiser_data[..adv_len],
                scan_data: &scan_data[..scan_len],
            },
        )
        .await?;

    defmt::info!("[adv] advertising");
    let conn = advertiser.accept().await?;
    defmt::info!("[adv] connection established");
    Ok(conn)
}

/// Initialize and start the BLE module (entry point for the BLE module)
#[embassy_executor::task]
pub async fn start(bt: BT, init: EspWifiController<'static>, led: Output<'static>) {
    defmt::info!("starting BLE");
    let connector = BleConnector::new(&init, bt);

    let controller: ExternalController<_, 20> = ExternalController::new(connector);

    let mut resources = Resources::new();

    let config = Config::default();
    let stack = trouble_host::new(controller, &mut resources).set_random_address(config.address);

    if let Err(e) = Ble::start(&stack, config, led).await {
        defmt::error!("BLE stopped: {:?}", defmt::Debug2Format(&e));
    }
}
