use crate::effect::Effect;
use crate::error::Error;

/// Connection state of the single supported central
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    #[default]
    Advertising,
    Connected,
}

/// Tracks the lifecycle of the one peer connection
#[derive(Debug, Default)]
pub struct ConnectionController {
    state: ConnectionState,
}

impl ConnectionController {
    pub const fn new() -> Self {
        Self {
            state: ConnectionState::Advertising,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// A central connected. Fails without a transition if one already is.
    pub fn on_connect(&mut self) -> Result<(), Error> {
        if self.is_connected() {
            return Err(Error::ConnectionConflict);
        }

        self.state = ConnectionState::Connected;
        info!("Client connected");
        Ok(())
    }

    /// The central went away. Advertising must always be restarted.
    pub fn on_disconnect(&mut self) -> Effect {
        self.state = ConnectionState::Advertising;
        info!("Client disconnected, restarting advertising");
        Effect::StartAdvertising
    }
}
