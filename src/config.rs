// MIT License - Copyright (c) 2026 Peter Wright

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;

/// A monitored device from the configuration file.
///
/// ```json
/// "feuerscharf": {
///     "friendlyname": "Feuermelder",
///     "value": "state",
///     "translate": { "on": "scharf", "off": "aus" },
///     "line": 1,
///     "key": "A",
///     "toggles": ["on", "off"]
/// }
/// ```
///
/// `current_value` is runtime state owned by the device state engine;
/// it never appears in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceDescriptor {
    #[serde(rename = "friendlyname")]
    pub friendly_name: String,
    /// Which field of an update's `values` object holds this device's value.
    #[serde(rename = "value")]
    pub value_key: String,
    /// Raw value → display string. Also used in reverse to recover the
    /// canonical token from a display string.
    #[serde(default)]
    pub translate: HashMap<String, String>,
    /// Display row for this device's status line.
    #[serde(default)]
    pub line: u8,
    /// Keypad character bound to this device for toggling.
    #[serde(default)]
    pub key: Option<String>,
    /// The two canonical values a bound key toggles between.
    #[serde(default)]
    pub toggles: Option<[String; 2]>,
    /// Last resolved display string, updated by the device state engine.
    #[serde(skip)]
    pub current_value: Option<String>,
}

impl DeviceDescriptor {
    /// Translate and format a raw update value into its display string.
    /// Returns `None` for values that are neither scalar nor translatable.
    pub fn display_value(&self, raw: &Value) -> Option<String> {
        display_value(&self.translate, raw)
    }

    /// Recover the canonical token for the current display value by
    /// reverse lookup through the translate table. A value with no
    /// translation entry is already canonical.
    pub fn canonical_current(&self) -> Option<&str> {
        let current = self.current_value.as_deref()?;
        for (token, display) in &self.translate {
            if display == current {
                return Some(token);
            }
        }
        Some(current)
    }

    /// The toggle value to request next: whichever of the two configured
    /// values the device is not currently at.
    pub fn next_toggle(&self) -> Option<&str> {
        let [first, second] = self.toggles.as_ref()?;
        if self.canonical_current() == Some(first.as_str()) {
            Some(second)
        } else {
            Some(first)
        }
    }
}

/// An alarm-class device. Alarms render on the fixed alert row and carry
/// trigger/reset semantics instead of a display line and toggle binding.
#[derive(Debug, Clone, Deserialize)]
pub struct AlarmDescriptor {
    #[serde(rename = "friendlyname")]
    pub friendly_name: String,
    #[serde(rename = "value")]
    pub value_key: String,
    /// The alarm fires when the formatted value contains this substring.
    #[serde(rename = "triggervalue")]
    pub trigger_value: String,
    /// The alarm resets when the formatted value contains this substring
    /// while armed.
    #[serde(rename = "resetvalue")]
    pub reset_value: String,
    #[serde(default)]
    pub translate: HashMap<String, String>,
}

impl AlarmDescriptor {
    pub fn display_value(&self, raw: &Value) -> Option<String> {
        display_value(&self.translate, raw)
    }
}

/// Connection parameters for the pilight daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct PilightEndpoint {
    pub server: String,
    pub port: u16,
}

/// The full configuration document, loaded once at startup.
///
/// Device and alarm names are expected to be disjoint; where they are
/// not, the device map takes precedence during update resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// Shared pin code for the keypad.
    pub pin: String,
    #[serde(default)]
    pub devices: HashMap<String, DeviceDescriptor>,
    #[serde(default)]
    pub alarms: HashMap<String, AlarmDescriptor>,
    pub pilight: PilightEndpoint,
    /// Serial device path of the keypad/LCD controller.
    #[serde(rename = "pinano")]
    pub serial_port: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
}

fn default_baud() -> u32 {
    57600
}

impl ConsoleConfig {
    /// Load and parse the configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        for name in config.devices.keys() {
            if config.alarms.contains_key(name) {
                warn!(
                    "'{}' is configured as both device and alarm; the device entry wins",
                    name
                );
            }
        }
        Ok(config)
    }

    /// Devices with a keypad character bound, ordered by display row.
    /// Used for rendering and clearing the toggle menu.
    pub fn keyed_devices(&self) -> Vec<(&str, &DeviceDescriptor)> {
        let mut keyed: Vec<(&str, &DeviceDescriptor)> = self
            .devices
            .iter()
            .filter(|(_, d)| d.key.is_some())
            .map(|(n, d)| (n.as_str(), d))
            .collect();
        keyed.sort_by_key(|(_, d)| d.line);
        keyed
    }
}

/// Format a raw JSON scalar for the display: floats to one decimal
/// place, integers plain, strings passed through. If the translate table
/// has an entry for a raw string value, the translated string wins.
fn display_value(translate: &HashMap<String, String>, raw: &Value) -> Option<String> {
    if let Value::String(s) = raw {
        if let Some(translated) = translate.get(s) {
            return Some(translated.clone());
        }
    }
    format_scalar(raw)
}

fn format_scalar(raw: &Value) -> Option<String> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_f64().map(|f| format!("{:.1}", f))
            }
        }
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
