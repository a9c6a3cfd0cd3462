#[derive(Clone, Debug)]
pub enum Error {
    /// The GATT server could not be built
    GattError,
    /// The service never reached the point where it may advertise
    NotAdvertising,
}
