// End-to-end console scenarios through the public API
//
// These tests feed raw daemon and keypad byte streams through the line
// framer into the console, the same path the transport readers use, and
// assert on the wire strings that come out the other side.

use pilight_console::{
    Console, ConsoleConfig, DaemonCommand, DisplayCommand, LineFramer, Source, SourceLine,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

fn config() -> ConsoleConfig {
    ConsoleConfig::from_json_str(
        r#"{
            "pin": "4711",
            "devices": {
                "Aussensensor": {
                    "friendlyname": "Aussentemp.",
                    "value": "temperature",
                    "line": 0
                },
                "Flurlicht": {
                    "friendlyname": "Flurlicht",
                    "value": "state",
                    "translate": { "on": "an", "off": "aus" },
                    "line": 1,
                    "key": "A",
                    "toggles": ["on", "off"]
                },
                "feuerscharf": {
                    "friendlyname": "Melder scharf",
                    "value": "state",
                    "translate": { "on": "ja", "off": "nein" },
                    "line": 2,
                    "key": "B",
                    "toggles": ["on", "off"]
                }
            },
            "alarms": {
                "feuermelder": {
                    "friendlyname": "FEUER",
                    "value": "state",
                    "triggervalue": "on",
                    "resetvalue": "off"
                }
            },
            "pilight": { "server": "127.0.0.1", "port": 5000 },
            "pinano": "/dev/ttyUSB0"
        }"#,
    )
    .unwrap()
}

struct Harness {
    console: Console,
    display_rx: UnboundedReceiver<DisplayCommand>,
    daemon_rx: UnboundedReceiver<DaemonCommand>,
}

impl Harness {
    fn new() -> Self {
        let (display_tx, display_rx) = unbounded_channel();
        let (daemon_tx, daemon_rx) = unbounded_channel();
        Self {
            console: Console::new(config(), display_tx, daemon_tx),
            display_rx,
            daemon_rx,
        }
    }

    /// Run a chunked daemon byte stream through the framer and console,
    /// the same way the TCP reader does.
    fn feed_daemon_bytes(&mut self, chunks: &[&[u8]]) {
        let mut framer = LineFramer::new();
        for chunk in chunks {
            for line in framer.feed(chunk).unwrap() {
                self.console.handle_daemon_line(&line);
            }
        }
    }

    fn feed_keypad(&mut self, line: &str) {
        self.console.handle_keypad_line(line);
    }

    fn display_wire(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(cmd) = self.display_rx.try_recv() {
            out.push(cmd.to_wire_string());
        }
        out
    }

    fn daemon_wire(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(cmd) = self.daemon_rx.try_recv() {
            out.push(cmd.to_wire_string());
        }
        out
    }
}

#[test]
fn test_registration_then_snapshot_renders_all_rows() {
    let mut h = Harness::new();

    h.feed_daemon_bytes(&[b"{\"status\":\"success\"}\r\n"]);
    assert!(h.console.is_registered());

    // Snapshot response to "request values": one array element per device
    h.feed_daemon_bytes(&[
        br#"{"message":"values","values":[{"devices":["Aussensensor"],"values":{"timestamp":1510915637,"temperature":6.1,"humidity":74.0,"battery":0.0}},{"devices":["Flurlicht"],"values":{"state":"off"}}]}"#,
        b"\r\n",
    ]);

    let lines = h.display_wire();
    assert!(lines.contains(&"MESSAGE 0 0 3 PINCODE ->".to_string()));
    assert!(lines.iter().any(|l| l.starts_with("MESSAGE 0 0 0 Aussentemp.: 6.1")));
    assert!(lines.iter().any(|l| l.starts_with("MESSAGE 0 0 1 Flurlicht: aus")));
}

#[test]
fn test_update_split_across_tcp_reads() {
    let mut h = Harness::new();
    h.feed_daemon_bytes(&[
        br#"{"origin":"update","type":3,"devices":["Aussen"#,
        br#"sensor"],"values":{"temperature":-3.5}}"#,
        b"\r\n",
    ]);
    assert!(h
        .display_wire()
        .iter()
        .any(|l| l.starts_with("MESSAGE 0 0 0 Aussentemp.: -3.5")));
}

#[test]
fn test_alarm_trigger_pin_disarm_cycle() {
    let mut h = Harness::new();

    // Fire
    h.feed_daemon_bytes(&[br#"{"origin":"update","type":1,"devices":["feuermelder"],"values":{"state":"on"}}"#, b"\r\n"]);
    let lines = h.display_wire();
    assert_eq!(lines[0], "CLEAR");
    assert_eq!(lines[1], "MESSAGE 3 0 3 PINCODE ->");
    assert!(lines[2].starts_with("MESSAGE 3 0 0 FEUER !!!"));

    // Routine updates stay off the screen while armed
    h.feed_daemon_bytes(&[br#"{"origin":"update","devices":["Aussensensor"],"values":{"temperature":8.0}}"#, b"\r\n"]);
    assert!(h.display_wire().is_empty());

    // Pin entry requests the disarm from the daemon
    h.feed_keypad("4711");
    let commands = h.daemon_wire();
    assert_eq!(commands.len(), 1);
    let doc: serde_json::Value = serde_json::from_str(&commands[0]).unwrap();
    assert_eq!(doc["action"], "control");
    assert_eq!(doc["code"]["device"], "feuermelder");
    assert_eq!(doc["code"]["state"], "off");

    // The daemon echoes the state change back; now the console disarms,
    // confirms on the display and refreshes all values
    h.feed_daemon_bytes(&[br#"{"origin":"update","devices":["feuermelder"],"values":{"state":"off"}}"#, b"\r\n"]);
    let lines = h.display_wire();
    assert_eq!(lines[0], "CLEAR");
    assert!(lines[2].starts_with("MESSAGE 2 0 0 FEUER: off"));
    assert_eq!(h.daemon_wire(), vec![r#"{"action":"request values"}"#]);

    // Routine rendering resumes
    h.feed_daemon_bytes(&[br#"{"origin":"update","devices":["Aussensensor"],"values":{"temperature":8.5}}"#, b"\r\n"]);
    assert!(h
        .display_wire()
        .iter()
        .any(|l| l.starts_with("MESSAGE 0 0 0 Aussentemp.: 8.5")));
}

#[test]
fn test_pin_menu_and_toggle_round_trip() {
    let mut h = Harness::new();

    // Seed current values
    h.feed_daemon_bytes(&[
        br#"{"origin":"update","devices":["Flurlicht"],"values":{"state":"off"}}"#,
        b"\r\n",
        br#"{"origin":"update","devices":["feuerscharf"],"values":{"state":"on"}}"#,
        b"\r\n",
    ]);
    h.display_wire();

    // Pin entry shows one menu key per keyed device, ordered by row
    h.feed_keypad("4711");
    assert_eq!(
        h.display_wire(),
        vec!["MESSAGE 0 19 1 A".to_string(), "MESSAGE 0 19 2 B".to_string()]
    );

    // Each key toggles its device away from the current value
    h.feed_keypad("A");
    h.feed_keypad("B");
    let commands = h.daemon_wire();
    let docs: Vec<serde_json::Value> = commands
        .iter()
        .map(|c| serde_json::from_str(c).unwrap())
        .collect();
    assert_eq!(docs[0]["code"]["device"], "Flurlicht");
    assert_eq!(docs[0]["code"]["state"], "on");
    assert_eq!(docs[1]["code"]["device"], "feuerscharf");
    assert_eq!(docs[1]["code"]["state"], "off");

    // Backlight off ends the session and blanks the menu cells
    h.feed_keypad("OFFLINE");
    assert_eq!(
        h.display_wire(),
        vec!["MESSAGE 0 19 1  ".to_string(), "MESSAGE 0 19 2  ".to_string()]
    );
    h.feed_keypad("A");
    assert!(h.daemon_wire().is_empty());
}

#[test]
fn test_garbage_between_documents_is_skipped() {
    let mut h = Harness::new();
    h.feed_daemon_bytes(&[
        b"not json at all\r\n",
        br#"{"origin":"update","devices":["Aussensensor"],"values":{"temperature":1.0}}"#,
        b"\r\n",
    ]);
    assert!(h
        .display_wire()
        .iter()
        .any(|l| l.starts_with("MESSAGE 0 0 0 Aussentemp.: 1.0")));
}

#[test]
fn test_source_line_tagging() {
    let keypad = SourceLine::keypad("4711");
    assert_eq!(keypad.source, Source::Keypad);
    let daemon = SourceLine::daemon("{}");
    assert_eq!(daemon.source, Source::Daemon);
    assert_ne!(keypad, daemon);
}
