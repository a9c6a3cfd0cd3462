use heapless::Vec;

use crate::service::ServiceDescriptor;

/// Most effects a single event can produce
pub const MAX_EFFECTS: usize = 2;

pub type Effects = Vec<Effect, MAX_EFFECTS>;

/// Digital output level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

/// Side effects requested from the BLE stack and the board
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    /// Submit the attribute table to the stack
    RegisterService(ServiceDescriptor),

    /// Make the peripheral discoverable again. Fire and forget.
    StartAdvertising,

    /// Drive a GPIO to the given level
    SetOutputLevel { pin: u8, level: Level },
}

/// The BLE stack and board services the core calls into
pub trait Collaborators {
    fn register_service(&mut self, descriptor: &ServiceDescriptor);

    fn start_advertising(&mut self);

    fn set_output_level(&mut self, pin: u8, level: Level);
}

/// Execute `effects` in order against `collaborators`
pub fn execute<C: Collaborators>(effects: &[Effect], collaborators: &mut C) {
    for effect in effects {
        match effect {
            Effect::RegisterService(descriptor) => collaborators.register_service(descriptor),
            Effect::StartAdvertising => collaborators.start_advertising(),
            Effect::SetOutputLevel { pin, level } => collaborators.set_output_level(*pin, *level),
        }
    }
}

/// Build an effect list holding a single effect
pub(crate) fn single(effect: Effect) -> Effects {
    let mut effects = Effects::new();
    // MAX_EFFECTS is never zero
    let _ = effects.push(effect);
    effects
}
