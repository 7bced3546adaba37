// MIT License - Copyright (c) 2026 Peter Wright

use serde_json::{Map, Value};

/// Character width of the LCD.
pub const LCD_WIDTH: usize = 20;
/// Number of display rows.
pub const LCD_HEIGHT: u8 = 4;
/// The fixed row for alarm alerts.
pub const ALERT_ROW: u8 = 0;
/// The fixed row for the pincode entry prompt.
pub const STATUS_ROW: u8 = LCD_HEIGHT - 1;
/// Column where toggle menu keys are shown.
pub const MENU_COLUMN: u8 = (LCD_WIDTH - 1) as u8;

/// Routine device status line.
pub const MODE_NORMAL: u8 = 0;
/// Startup banner.
pub const MODE_BANNER: u8 = 1;
/// Alarm reset confirmation line.
pub const MODE_RESET: u8 = 2;
/// Alarm alert line.
pub const MODE_ALERT: u8 = 3;

/// Width of the `MESSAGE <mode> <col> <row> ` header for single-digit
/// fields; padded lines fill up to this plus [`LCD_WIDTH`] so stale
/// display content is fully overwritten.
const MESSAGE_HEADER_WIDTH: usize = "MESSAGE 0 0 1 ".len();

/// One framed line from the keypad/LCD controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeypadInput {
    /// The controller switched its backlight off.
    LinkOffline,
    /// The controller switched its backlight on.
    LinkOnline,
    /// Anything else: a pin code entry or a toggle keypress.
    Keys(String),
}

impl KeypadInput {
    pub fn classify(line: &str) -> Self {
        match line {
            "OFFLINE" => Self::LinkOffline,
            "ONLINE" => Self::LinkOnline,
            other => Self::Keys(other.to_string()),
        }
    }
}

/// Commands sent to the keypad/LCD controller over the serial line.
///
/// The terminating newline is added by the transport writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCommand {
    /// `CLEAR` — wipe the whole display.
    Clear,
    /// `MESSAGE <mode> <col> <row> <text>` — write text at a position.
    Message {
        mode: u8,
        col: u8,
        row: u8,
        text: String,
    },
}

impl DisplayCommand {
    /// A full-width status line at column 0, space-padded so the row's
    /// previous content is completely overwritten.
    pub fn padded_message(mode: u8, row: u8, text: impl Into<String>) -> Self {
        let header_len = format!("MESSAGE {} 0 {} ", mode, row).chars().count();
        let width = MESSAGE_HEADER_WIDTH + LCD_WIDTH - header_len;
        let text = text.into();
        let mut padded: String = text.chars().take(width).collect();
        while padded.chars().count() < width {
            padded.push(' ');
        }
        Self::Message {
            mode,
            col: 0,
            row,
            text: padded,
        }
    }

    /// The pincode entry prompt on the status row.
    pub fn pin_prompt(mode: u8) -> Self {
        Self::Message {
            mode,
            col: 0,
            row: STATUS_ROW,
            text: "PINCODE ->".to_string(),
        }
    }

    /// A toggle menu key in the rightmost column of a device's row.
    pub fn menu_key(row: u8, key: impl Into<String>) -> Self {
        Self::Message {
            mode: MODE_NORMAL,
            col: MENU_COLUMN,
            row,
            text: key.into(),
        }
    }

    /// Blank out a toggle menu cell.
    pub fn menu_clear(row: u8) -> Self {
        Self::menu_key(row, " ")
    }

    /// Convert the command to its wire string representation.
    pub fn to_wire_string(&self) -> String {
        match self {
            Self::Clear => "CLEAR".to_string(),
            Self::Message {
                mode,
                col,
                row,
                text,
            } => format!("MESSAGE {} {} {} {}", mode, col, row, text),
        }
    }
}

/// Commands sent to the pilight daemon as one-line JSON documents.
///
/// The `\r\n` terminator is added by the transport writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonCommand {
    /// Registration handshake, sent at startup and retried until the
    /// daemon reports a success status.
    Identify,
    /// Ask for a snapshot of all current values, sent after
    /// registration and after an alarm reset.
    RequestValues,
    /// Request a device's value field be set.
    Control {
        device: String,
        value_key: String,
        value: String,
    },
}

impl DaemonCommand {
    pub fn to_wire_string(&self) -> String {
        self.to_json().to_string()
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Identify => serde_json::json!({
                "action": "identify",
                "options": { "core": 0, "receiver": 0, "config": 1, "forward": 0 },
                "uuid": "0000-d0-63-00-101010",
                "media": "all"
            }),
            Self::RequestValues => serde_json::json!({ "action": "request values" }),
            Self::Control {
                device,
                value_key,
                value,
            } => {
                let mut code = Map::new();
                code.insert("device".to_string(), Value::String(device.clone()));
                code.insert(value_key.clone(), Value::String(value.clone()));
                serde_json::json!({ "action": "control", "code": code })
            }
        }
    }
}

/// Parse one daemon line into a JSON object. Non-JSON lines and
/// non-object documents are discarded by the dispatcher.
pub fn parse_daemon_document(line: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(line) {
        Ok(doc) if doc.is_object() => Some(doc),
        _ => None,
    }
}

/// Typed view of an update document: a `devices` array of names plus a
/// `values` object of field → scalar.
pub struct DeviceUpdate<'a> {
    devices: &'a [Value],
    values: Option<&'a Map<String, Value>>,
}

impl<'a> DeviceUpdate<'a> {
    /// Wrap a document carrying a `devices` array. Returns `None` for
    /// any other shape.
    pub fn new(doc: &'a Value) -> Option<Self> {
        let devices = doc.get("devices")?.as_array()?;
        let values = doc.get("values").and_then(Value::as_object);
        Some(Self {
            devices: devices.as_slice(),
            values,
        })
    }

    /// The referenced device names, in document order. Non-string array
    /// entries are skipped.
    pub fn device_names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.devices.iter().filter_map(Value::as_str)
    }

    /// The raw value for a field of the `values` object, if present.
    pub fn value(&self, key: &str) -> Option<&'a Value> {
        self.values?.get(key)
    }
}
