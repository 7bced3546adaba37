// MIT License - Copyright (c) 2026 Peter Wright

/// All events emitted by the console core.
///
/// Observers subscribe via `console.subscribe()` to receive a
/// `tokio::sync::broadcast::Receiver<ConsoleEvent>`. The binary uses
/// this for logging; nothing in the core depends on a receiver existing.
#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    /// The keypad controller reported its backlight on.
    LinkOnline,
    /// The keypad controller reported its backlight off.
    LinkOffline,
    /// A correct pin code was entered.
    PinAccepted,
    /// The daemon reported a connection status.
    DaemonStatus(String),
    /// A monitored device's value was resolved and persisted.
    DeviceUpdated { name: String, value: String },
    /// A toggle command was issued for a device.
    DeviceToggled {
        name: String,
        from: String,
        to: String,
    },
    /// An alarm fired and the system armed.
    AlarmTriggered { name: String },
    /// The armed alarm reported its reset value and the system disarmed.
    AlarmReset { name: String },
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<ConsoleEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<ConsoleEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
