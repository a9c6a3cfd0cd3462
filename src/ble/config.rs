use bt_hci::param::{AddrKind, BdAddr};
use trouble_host::{Address, HostResources};

const L2CAP_MTU: usize = 255;
const CONNECTIONS_MAX: usize = 1;
const L2CAP_CHANNELS_MAX: usize = 2; // Signal + att

pub type Resources = HostResources<CONNECTIONS_MAX, L2CAP_CHANNELS_MAX, L2CAP_MTU>;

pub struct Config {
    /// Name of the BLE device
    pub name: &'static str,

    /// Public address of the BLE device
    pub address: Address,

    /// Delay before advertising again after a failed attempt
    pub advertise_retry_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "ESP32 Sensor",
            address: Address {
                kind: AddrKind::PUBLIC,
                addr: BdAddr::new([0x48, 0xca, 0x43, 0x3b, 0x0f, 0xa9]),
            },
            advertise_retry_secs: 1,
        }
    }
}
