use crate::error::Error;

pub const SERVICE_UUID: u128 = 0xda1a59b9_1125_4bd4_b72b_d15dc8057c53;
pub const TEMPERATURE_UUID: u128 = 0xc10aa881_8c74_4146_bc26_4834ffb2ce5f;
pub const BATTERY_UUID: u128 = 0x01234567_0123_4567_89ab_0123456789ef;
pub const LED_UUID: u128 = 0x28ecdcde_5541_4db2_982c_91bde176da5d;

/// One attribute handle per characteristic
pub const CHARACTERISTIC_COUNT: usize = 3;

/// Position of a characteristic in the service and in the handle table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    Temperature = 0,
    Battery = 1,
    Led = 2,
}

impl Slot {
    pub const ALL: [Slot; CHARACTERISTIC_COUNT] = [Slot::Temperature, Slot::Battery, Slot::Led];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Attribute access permissions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Permissions {
    pub readable: bool,
    pub writable: bool,
}

/// Characteristic properties advertised to the central
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Properties {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharacteristicDescriptor {
    pub uuid: u128,
    pub permissions: Permissions,
    pub properties: Properties,
    pub slot: Slot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceDescriptor {
    pub uuid: u128,
    pub characteristics: [CharacteristicDescriptor; CHARACTERISTIC_COUNT],
}

impl ServiceDescriptor {
    pub fn characteristic(&self, slot: Slot) -> &CharacteristicDescriptor {
        &self.characteristics[slot.index()]
    }
}

const READ_ONLY: Permissions = Permissions {
    readable: true,
    writable: false,
};

const READ_NOTIFY: Properties = Properties {
    read: true,
    write: false,
    notify: true,
};

/// Shape of the sensor service, in slot order
pub const fn build_descriptor() -> ServiceDescriptor {
    ServiceDescriptor {
        uuid: SERVICE_UUID,
        characteristics: [
            CharacteristicDescriptor {
                uuid: TEMPERATURE_UUID,
                permissions: READ_ONLY,
                properties: READ_NOTIFY,
                slot: Slot::Temperature,
            },
            CharacteristicDescriptor {
                uuid: BATTERY_UUID,
                permissions: READ_ONLY,
                properties: READ_NOTIFY,
                slot: Slot::Battery,
            },
            CharacteristicDescriptor {
                uuid: LED_UUID,
                permissions: Permissions {
                    readable: true,
                    writable: true,
                },
                properties: Properties {
                    read: true,
                    write: true,
                    notify: true,
                },
                slot: Slot::Led,
            },
        ],
    }
}

/// Attribute handles assigned by the stack, indexed by [`Slot`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandleTable {
    handles: Option<[u16; CHARACTERISTIC_COUNT]>,
}

impl HandleTable {
    pub const fn new() -> Self {
        Self { handles: None }
    }

    /// Store the handles returned by the stack, verbatim and in slot order.
    ///
    /// A count other than [`CHARACTERISTIC_COUNT`] leaves the table unset.
    pub fn on_table_created(&mut self, handles: &[u16]) -> Result<(), Error> {
        let handles: [u16; CHARACTERISTIC_COUNT] =
            handles.try_into().map_err(|_| Error::MisconfiguredTable {
                handles: handles.len(),
            })?;

        self.handles = Some(handles);
        Ok(())
    }

    pub fn is_populated(&self) -> bool {
        self.handles.is_some()
    }

    pub fn handle(&self, slot: Slot) -> Option<u16> {
        self.handles.map(|handles| handles[slot.index()])
    }

    pub fn handles(&self) -> Option<&[u16; CHARACTERISTIC_COUNT]> {
        self.handles.as_ref()
    }

    /// Slot owning `handle`, if the table is populated and knows it
    pub fn slot_of(&self, handle: u16) -> Option<Slot> {
        Slot::ALL
            .into_iter()
            .find(|&slot| self.handle(slot) == Some(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_is_deterministic() {
        assert_eq!(build_descriptor(), build_descriptor());
    }

    #[test]
    fn test_descriptor_shape() {
        let service = build_descriptor();
        assert_eq!(service.uuid, SERVICE_UUID);

        let uuids: [u128; 3] = core::array::from_fn(|i| service.characteristics[i].uuid);
        assert_eq!(uuids, [TEMPERATURE_UUID, BATTERY_UUID, LED_UUID]);

        for (index, characteristic) in service.characteristics.iter().enumerate() {
            assert_eq!(characteristic.slot.index(), index);
            assert!(characteristic.permissions.readable);
            assert!(characteristic.properties.read);
            assert!(characteristic.properties.notify);
        }
    }

    #[test]
    fn test_only_led_is_writable() {
        let service = build_descriptor();

        assert!(!service.characteristic(Slot::Temperature).permissions.writable);
        assert!(!service.characteristic(Slot::Battery).properties.write);

        let led = service.characteristic(Slot::Led);
        assert_eq!(led.uuid, LED_UUID);
        assert!(led.permissions.writable);
        assert!(led.properties.write);
    }

    #[test]
    fn test_table_stores_handles_in_order() {
        let mut table = HandleTable::new();
        table.on_table_created(&[40, 42, 44]).unwrap();

        assert_eq!(table.handles(), Some(&[40, 42, 44]));
        assert_eq!(table.handle(Slot::Temperature), Some(40));
        assert_eq!(table.handle(Slot::Led), Some(44));
        assert_eq!(table.slot_of(44), Some(Slot::Led));
        assert_eq!(table.slot_of(41), None);
    }

    #[test]
    fn test_table_rejects_wrong_handle_count() {
        let mut table = HandleTable::new();

        assert_eq!(
            table.on_table_created(&[1, 2]),
            Err(Error::MisconfiguredTable { handles: 2 })
        );
        assert_eq!(
            table.on_table_created(&[1, 2, 3, 4]),
            Err(Error::MisconfiguredTable { handles: 4 })
        );
        assert!(!table.is_populated());
        assert_eq!(table.slot_of(1), None);
    }
}
