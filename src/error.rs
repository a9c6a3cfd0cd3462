#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The stack returned a handle count other than one per characteristic
    MisconfiguredTable { handles: usize },
    /// A connect event arrived while a central is already connected
    ConnectionConflict,
    /// An event referenced the attribute table before it was populated
    NotReady,
}
