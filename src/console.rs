// MIT License - Copyright (c) 2026 Peter Wright

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::alarm::{AlarmMachine, AlarmState};
use crate::config::ConsoleConfig;
use crate::event::{event_channel, ConsoleEvent, EventReceiver, EventSender};
use crate::protocol::{
    parse_daemon_document, DaemonCommand, DeviceUpdate, DisplayCommand, KeypadInput, ALERT_ROW,
    MODE_ALERT, MODE_BANNER, MODE_NORMAL, MODE_RESET,
};

/// Per-session link and authentication state.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Whether the keypad controller reports its backlight active.
    pub link_online: bool,
    /// True between a correct pin entry and the next link-offline event.
    pub pin_validated: bool,
    /// Most recent connection status reported by the daemon. Used as a
    /// one-time readiness gate during registration.
    pub last_daemon_status: Option<String>,
}

/// The console core: classifies framed lines from both sources, resolves
/// device updates against the configuration model, runs the alarm state
/// machine and the pin/toggle handler, and emits display and daemon
/// commands through the outbound channels.
///
/// All mutation happens on the single dispatch loop that feeds
/// [`handle_keypad_line`](Self::handle_keypad_line) and
/// [`handle_daemon_line`](Self::handle_daemon_line), so no locking is
/// needed.
pub struct Console {
    config: ConsoleConfig,
    alarm: AlarmMachine,
    session: SessionState,
    display_tx: UnboundedSender<DisplayCommand>,
    daemon_tx: UnboundedSender<DaemonCommand>,
    event_tx: EventSender,
}

impl Console {
    pub fn new(
        config: ConsoleConfig,
        display_tx: UnboundedSender<DisplayCommand>,
        daemon_tx: UnboundedSender<DaemonCommand>,
    ) -> Self {
        let (event_tx, _event_rx) = event_channel(64);
        Self {
            config,
            alarm: AlarmMachine::new(),
            session: SessionState::default(),
            display_tx,
            daemon_tx,
            event_tx,
        }
    }

    /// Subscribe to console events.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_tx.subscribe()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn alarm_state(&self) -> AlarmState {
        self.alarm.state()
    }

    pub fn last_triggered(&self) -> Option<&str> {
        self.alarm.last_triggered()
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Whether the daemon has acknowledged our registration.
    pub fn is_registered(&self) -> bool {
        self.session
            .last_daemon_status
            .as_deref()
            .is_some_and(|s| s.contains("success"))
    }

    /// Send the registration handshake document.
    pub fn send_identify(&self) {
        self.send_daemon(DaemonCommand::Identify);
    }

    /// Ask the daemon for a snapshot of all current values.
    pub fn request_values(&self) {
        self.send_daemon(DaemonCommand::RequestValues);
    }

    /// Wipe the display and show the startup banner.
    pub fn greet(&self) {
        self.send_display(DisplayCommand::Clear);
        self.send_display(DisplayCommand::Message {
            mode: MODE_BANNER,
            col: 0,
            row: 0,
            text: "pilight-console".to_string(),
        });
    }

    // -----------------------------------------------------------------
    // Keypad source
    // -----------------------------------------------------------------

    /// Process one framed line from the keypad/LCD controller.
    pub fn handle_keypad_line(&mut self, line: &str) {
        debug!("SERIAL: {}", line);
        match KeypadInput::classify(line) {
            KeypadInput::LinkOffline => {
                self.session.link_online = false;
                if self.session.pin_validated {
                    self.clear_toggle_menu();
                    self.session.pin_validated = false;
                }
                self.emit(ConsoleEvent::LinkOffline);
            }
            KeypadInput::LinkOnline => {
                self.session.link_online = true;
                self.emit(ConsoleEvent::LinkOnline);
            }
            KeypadInput::Keys(input) => self.handle_pin_or_toggle(&input),
        }
    }

    fn handle_pin_or_toggle(&mut self, input: &str) {
        if input == self.config.pin {
            info!("Pin code accepted");
            self.session.pin_validated = true;
            self.emit(ConsoleEvent::PinAccepted);

            if self.alarm.is_armed() {
                self.request_alarm_reset();
            } else {
                self.show_toggle_menu();
            }
            return;
        }

        // Toggle keys only work inside a validated pin window
        if !self.session.pin_validated {
            debug!("Ignoring keypad input without validated pin");
            return;
        }

        for (name, desc) in self.config.keyed_devices() {
            if desc.key.as_deref() != Some(input) {
                continue;
            }
            let Some(next) = desc.next_toggle() else {
                warn!("Device '{}' has a key but no toggles configured", name);
                return;
            };
            let from = desc.canonical_current().unwrap_or_default().to_string();
            info!("Device '{}' toggled from '{}' to '{}'", name, from, next);
            self.send_daemon(DaemonCommand::Control {
                device: name.to_string(),
                value_key: desc.value_key.clone(),
                value: next.to_string(),
            });
            self.emit(ConsoleEvent::DeviceToggled {
                name: name.to_string(),
                from,
                to: next.to_string(),
            });
            return;
        }
        debug!("Keypad input '{}' matches no configured toggle key", input);
    }

    /// Ask the daemon to set the last triggered alarm to its reset value.
    /// The disarm itself completes when the alarm's own state update
    /// arrives back through the normal update path.
    fn request_alarm_reset(&self) {
        let Some(name) = self.alarm.last_triggered() else {
            return;
        };
        let Some(desc) = self.config.alarms.get(name) else {
            warn!("Last triggered alarm '{}' is no longer configured", name);
            return;
        };
        self.send_daemon(DaemonCommand::Control {
            device: name.to_string(),
            value_key: desc.value_key.clone(),
            value: desc.reset_value.clone(),
        });
    }

    fn show_toggle_menu(&self) {
        for (_, desc) in self.config.keyed_devices() {
            if let Some(key) = &desc.key {
                self.send_display(DisplayCommand::menu_key(desc.line, key.clone()));
            }
        }
    }

    fn clear_toggle_menu(&self) {
        for (_, desc) in self.config.keyed_devices() {
            self.send_display(DisplayCommand::menu_clear(desc.line));
        }
    }

    // -----------------------------------------------------------------
    // Daemon source
    // -----------------------------------------------------------------

    /// Process one framed line from the pilight daemon. Malformed JSON
    /// is dropped; processing continues with the next line.
    pub fn handle_daemon_line(&mut self, line: &str) {
        debug!("SOCKET: {}", line);
        let Some(doc) = parse_daemon_document(line) else {
            debug!("Discarding unparseable daemon message");
            return;
        };

        if let Some(status) = doc.get("status").and_then(|v| v.as_str()) {
            info!("Daemon status: {}", status);
            self.session.last_daemon_status = Some(status.to_string());
            self.emit(ConsoleEvent::DaemonStatus(status.to_string()));
        }

        // Initial value snapshot: each array element is an independent update
        if doc.get("message").is_some() {
            if let Some(values) = doc.get("values").and_then(|v| v.as_array()) {
                for item in values {
                    self.handle_update(item);
                }
            }
        }

        // Incremental update: the whole document is one update
        let from_update = doc
            .get("origin")
            .and_then(|v| v.as_str())
            .is_some_and(|o| o.contains("update"));
        if from_update && doc.get("devices").is_some() {
            self.handle_update(&doc);
        }
    }

    // -----------------------------------------------------------------
    // Device state engine
    // -----------------------------------------------------------------

    /// Resolve every device name of an update. The device map is checked
    /// before the alarm map; names configured in neither are skipped, and
    /// one unresolvable entry never aborts the rest of the batch.
    fn handle_update(&mut self, doc: &serde_json::Value) {
        let Some(update) = DeviceUpdate::new(doc) else {
            return;
        };
        let names: Vec<String> = update.device_names().map(str::to_string).collect();
        for name in names {
            if self.config.devices.contains_key(&name) {
                self.apply_device_update(&name, &update);
            } else if self.config.alarms.contains_key(&name) {
                self.apply_alarm_update(&name, &update);
            } else {
                debug!("Update for unmonitored device '{}' skipped", name);
            }
        }
    }

    fn apply_device_update(&mut self, name: &str, update: &DeviceUpdate<'_>) {
        let Some(desc) = self.config.devices.get(name) else {
            return;
        };
        let Some(raw) = update.value(&desc.value_key) else {
            debug!("Update for '{}' carries no '{}' field", name, desc.value_key);
            return;
        };
        let Some(formatted) = desc.display_value(raw) else {
            debug!("Value for '{}' is not a displayable scalar", name);
            return;
        };
        let friendly = desc.friendly_name.clone();
        let row = desc.line;

        if let Some(desc) = self.config.devices.get_mut(name) {
            desc.current_value = Some(formatted.clone());
        }
        self.emit(ConsoleEvent::DeviceUpdated {
            name: name.to_string(),
            value: formatted.clone(),
        });

        // Routine rendering is suppressed while an alert is on screen
        if self.alarm.is_armed() {
            return;
        }
        self.send_display(DisplayCommand::pin_prompt(MODE_NORMAL));
        self.send_display(DisplayCommand::padded_message(
            MODE_NORMAL,
            row,
            format!("{}: {}", friendly, formatted),
        ));
    }

    /// Alarm-class resolution. Trigger/reset matching is substring
    /// containment on the formatted value; alarms never persist a
    /// current value.
    fn apply_alarm_update(&mut self, name: &str, update: &DeviceUpdate<'_>) {
        let Some(desc) = self.config.alarms.get(name) else {
            return;
        };
        let Some(raw) = update.value(&desc.value_key) else {
            debug!("Update for alarm '{}' carries no '{}' field", name, desc.value_key);
            return;
        };
        let Some(formatted) = desc.display_value(raw) else {
            return;
        };
        let friendly = desc.friendly_name.clone();
        let triggered = formatted.contains(&desc.trigger_value);
        let resets = formatted.contains(&desc.reset_value);

        if triggered {
            warn!("ALARM: '{}' reports '{}'", name, formatted);
            self.alarm.trigger(name);
            self.send_display(DisplayCommand::Clear);
            self.send_display(DisplayCommand::pin_prompt(MODE_ALERT));
            self.send_display(DisplayCommand::padded_message(
                MODE_ALERT,
                ALERT_ROW,
                format!("{} !!!", friendly),
            ));
            self.emit(ConsoleEvent::AlarmTriggered {
                name: name.to_string(),
            });
        }

        if resets && self.alarm.is_armed() {
            info!("Alarm '{}' reset ({})", name, formatted);
            self.alarm.reset();
            self.send_display(DisplayCommand::Clear);
            self.send_display(DisplayCommand::pin_prompt(MODE_ALERT));
            self.send_display(DisplayCommand::padded_message(
                MODE_RESET,
                ALERT_ROW,
                format!("{}: {}", friendly, formatted),
            ));
            // Resynchronize every monitored device after the alert clears
            self.send_daemon(DaemonCommand::RequestValues);
            self.emit(ConsoleEvent::AlarmReset {
                name: name.to_string(),
            });
        }
    }

    // -----------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------

    fn send_display(&self, command: DisplayCommand) {
        if self.display_tx.send(command).is_err() {
            warn!("Display channel closed; dropping command");
        }
    }

    fn send_daemon(&self, command: DaemonCommand) {
        if self.daemon_tx.send(command).is_err() {
            warn!("Daemon channel closed; dropping command");
        }
    }

    fn emit(&self, event: ConsoleEvent) {
        let _ = self.event_tx.send(event);
    }
}
