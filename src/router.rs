use crate::connection::{ConnectionController, ConnectionState};
use crate::dispatch::WriteDispatcher;
use crate::effect::{single, Effect, Effects};
use crate::error::Error;
use crate::service::{build_descriptor, HandleTable};
use crate::telemetry::SharedTelemetry;

/// Callbacks delivered by the BLE stack
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event<'a> {
    /// The application was registered with the stack and may submit its attribute table
    RegistrationRequested,

    /// The stack built the attribute table and assigned these handles
    TableCreated(&'a [u16]),

    Connected,

    Disconnected,

    Write { handle: u16, payload: &'a [u8] },

    /// Served from the shared telemetry by the responder, nothing to route
    Read { handle: u16 },

    /// A stack event kind this service has no transition for, identified by its raw kind
    Other { kind: u16 },
}

/// Registration lifecycle of the service
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lifecycle {
    Unregistered,
    Registering,
    Ready,
}

/// Single entry point for stack callbacks.
///
/// [`Router::handle`] only changes router state and the shared telemetry; every
/// call into the stack or the board is returned as an [`Effect`] for the caller
/// to execute.
pub struct Router<'a> {
    lifecycle: Lifecycle,
    table: HandleTable,
    connection: ConnectionController,
    telemetry: &'a SharedTelemetry,
}

impl<'a> Router<'a> {
    pub fn new(telemetry: &'a SharedTelemetry) -> Self {
        Self {
            lifecycle: Lifecycle::Unregistered,
            table: HandleTable::new(),
            connection: ConnectionController::new(),
            telemetry,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn table(&self) -> &HandleTable {
        &self.table
    }

    pub fn handle(&mut self, event: Event<'_>) -> Effects {
        match (self.lifecycle, event) {
            (Lifecycle::Unregistered, Event::RegistrationRequested) => {
                info!("Registering service...");
                self.lifecycle = Lifecycle::Registering;
                single(Effect::RegisterService(build_descriptor()))
            }

            (Lifecycle::Registering, Event::TableCreated(handles)) => {
                self.on_table_created(handles)
            }

            (Lifecycle::Ready, Event::Connected) => {
                if let Err(e) = self.connection.on_connect() {
                    warn!("Ignoring connect event: {:?}", e);
                }
                Effects::new()
            }

            (_, Event::Disconnected) => single(self.connection.on_disconnect()),

            (Lifecycle::Ready, Event::Write { handle, payload }) => {
                if !self.connection.is_connected() {
                    trace!("Ignoring write to {} without a connection", handle);
                    return Effects::new();
                }

                WriteDispatcher::new(&self.table, self.telemetry)
                    .dispatch(handle, payload)
                    .map(single)
                    .unwrap_or_default()
            }

            (lifecycle, Event::Write { .. } | Event::Read { .. }) if lifecycle != Lifecycle::Ready => {
                debug!("Ignoring attribute access: {:?}", Error::NotReady);
                Effects::new()
            }

            (lifecycle, event) => {
                trace!("Ignoring {:?} while {:?}", event, lifecycle);
                Effects::new()
            }
        }
    }

    fn on_table_created(&mut self, handles: &[u16]) -> Effects {
        if let Err(e) = self.table.on_table_created(handles) {
            error!("Attribute table not created: {:?}", e);
            return Effects::new();
        }

        info!("Attribute table created: {:?}", handles);
        self.lifecycle = Lifecycle::Ready;
        self.connection = ConnectionController::new();
        single(Effect::StartAdvertising)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LED_PIN;
    use crate::effect::tests::Recorder;
    use crate::effect::{execute, Level};
    use crate::service::Slot;

    fn ready(telemetry: &SharedTelemetry) -> Router<'_> {
        let mut router = Router::new(telemetry);
        router.handle(Event::RegistrationRequested);
        router.handle(Event::TableCreated(&[10, 11, 12]));
        router
    }

    fn connected(telemetry: &SharedTelemetry) -> Router<'_> {
        let mut router = ready(telemetry);
        router.handle(Event::Connected);
        router
    }

    #[test]
    fn test_registration_submits_descriptor() {
        let telemetry = SharedTelemetry::new();
        let mut router = Router::new(&telemetry);

        let effects = router.handle(Event::RegistrationRequested);

        assert_eq!(effects, [Effect::RegisterService(build_descriptor())]);
        assert_eq!(router.lifecycle(), Lifecycle::Registering);
    }

    #[test]
    fn test_table_created_starts_advertising() {
        let telemetry = SharedTelemetry::new();
        let mut router = Router::new(&telemetry);
        router.handle(Event::RegistrationRequested);

        let effects = router.handle(Event::TableCreated(&[10, 11, 12]));

        assert_eq!(effects, [Effect::StartAdvertising]);
        assert_eq!(router.lifecycle(), Lifecycle::Ready);
        assert_eq!(router.connection_state(), ConnectionState::Advertising);
        assert_eq!(router.table().handles(), Some(&[10, 11, 12]));
        assert_eq!(router.table().handle(Slot::Led), Some(12));
    }

    #[test]
    fn test_misconfigured_table_leaves_service_unusable() {
        let telemetry = SharedTelemetry::new();
        let mut router = Router::new(&telemetry);
        router.handle(Event::RegistrationRequested);

        assert!(router.handle(Event::TableCreated(&[10, 11])).is_empty());
        assert_eq!(router.lifecycle(), Lifecycle::Registering);
        assert!(!router.table().is_populated());

        assert!(router.handle(Event::Connected).is_empty());
        assert!(router
            .handle(Event::Write {
                handle: 11,
                payload: b"0"
            })
            .is_empty());
        assert!(!telemetry.snapshot().led_on);
    }

    #[test]
    fn test_events_before_registration_are_ignored() {
        let telemetry = SharedTelemetry::new();
        let mut router = Router::new(&telemetry);

        assert!(router.handle(Event::TableCreated(&[1, 2, 3])).is_empty());
        assert!(router.handle(Event::Connected).is_empty());
        assert!(router
            .handle(Event::Write {
                handle: 3,
                payload: b"0"
            })
            .is_empty());

        assert_eq!(router.lifecycle(), Lifecycle::Unregistered);
        assert!(!router.table().is_populated());
        assert!(!telemetry.snapshot().led_on);
    }

    #[test]
    fn test_repeated_registration_is_ignored() {
        let telemetry = SharedTelemetry::new();
        let mut router = ready(&telemetry);

        assert!(router.handle(Event::RegistrationRequested).is_empty());
        assert!(router.handle(Event::TableCreated(&[20, 21, 22])).is_empty());
        assert_eq!(router.table().handles(), Some(&[10, 11, 12]));
    }

    #[test]
    fn test_connect_conflict_is_ignored() {
        let telemetry = SharedTelemetry::new();
        let mut router = connected(&telemetry);

        assert!(router.handle(Event::Connected).is_empty());
        assert_eq!(router.connection_state(), ConnectionState::Connected);
    }

    #[test]
    fn test_write_without_connection_is_ignored() {
        let telemetry = SharedTelemetry::new();
        let mut router = ready(&telemetry);

        let effects = router.handle(Event::Write {
            handle: 12,
            payload: b"0",
        });

        assert!(effects.is_empty());
        assert!(!telemetry.snapshot().led_on);
    }

    #[test]
    fn test_disconnect_always_restarts_advertising_once() {
        let telemetry = SharedTelemetry::new();

        let mut registering = Router::new(&telemetry);
        registering.handle(Event::RegistrationRequested);

        for mut router in [
            Router::new(&telemetry),
            registering,
            ready(&telemetry),
            connected(&telemetry),
        ] {
            let lifecycle = router.lifecycle();
            let mut recorder = Recorder::default();

            let effects = router.handle(Event::Disconnected);
            execute(&effects, &mut recorder);

            assert_eq!(router.connection_state(), ConnectionState::Advertising);
            assert_eq!(router.lifecycle(), lifecycle);
            assert_eq!(recorder.advertising_starts, 1);
            assert_eq!(recorder.calls(), 1);
        }
    }

    #[test]
    fn test_unknown_events_are_idempotent() {
        let telemetry = SharedTelemetry::new();

        for mut router in [
            Router::new(&telemetry),
            ready(&telemetry),
            connected(&telemetry),
        ] {
            let lifecycle = router.lifecycle();
            let connection = router.connection_state();
            let before = telemetry.snapshot();
            let mut recorder = Recorder::default();

            for _ in 0..5 {
                let effects = router.handle(Event::Other { kind: 0x17 });
                execute(&effects, &mut recorder);
            }

            assert_eq!(router.lifecycle(), lifecycle);
            assert_eq!(router.connection_state(), connection);
            assert_eq!(telemetry.snapshot(), before);
            assert_eq!(recorder.calls(), 0);
        }
    }

    #[test]
    fn test_reads_are_not_routed() {
        let telemetry = SharedTelemetry::new();
        let mut router = connected(&telemetry);

        assert!(router.handle(Event::Read { handle: 10 }).is_empty());
        assert_eq!(router.connection_state(), ConnectionState::Connected);
    }

    #[test]
    fn test_led_session() {
        let telemetry = SharedTelemetry::new();
        let mut router = Router::new(&telemetry);
        let mut recorder = Recorder::default();

        let effects = router.handle(Event::RegistrationRequested);
        execute(&effects, &mut recorder);
        assert_eq!(recorder.registrations.len(), 1);

        let effects = router.handle(Event::TableCreated(&[10, 11, 12]));
        execute(&effects, &mut recorder);
        assert_eq!(recorder.advertising_starts, 1);

        let effects = router.handle(Event::Connected);
        execute(&effects, &mut recorder);
        assert_eq!(router.connection_state(), ConnectionState::Connected);

        let effects = router.handle(Event::Write {
            handle: 12,
            payload: b"0",
        });
        execute(&effects, &mut recorder);
        assert!(telemetry.snapshot().led_on);
        assert_eq!(recorder.output_levels, [(LED_PIN, Level::Low)]);

        let effects = router.handle(Event::Disconnected);
        execute(&effects, &mut recorder);
        assert_eq!(router.connection_state(), ConnectionState::Advertising);
        assert_eq!(recorder.advertising_starts, 2);
        assert_eq!(recorder.output_levels.len(), 1);
    }

    #[test]
    fn test_led_off_after_reconnect() {
        let telemetry = SharedTelemetry::new();
        let mut router = connected(&telemetry);

        router.handle(Event::Write {
            handle: 12,
            payload: b"0",
        });
        router.handle(Event::Disconnected);
        router.handle(Event::Connected);

        let effects = router.handle(Event::Write {
            handle: 12,
            payload: b"1",
        });

        assert!(!telemetry.snapshot().led_on);
        assert_eq!(
            effects,
            [Effect::SetOutputLevel {
                pin: LED_PIN,
                level: Level::High
            }]
        );
    }
}
