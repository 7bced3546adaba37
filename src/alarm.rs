// MIT License - Copyright (c) 2026 Peter Wright

/// Process-wide alarm state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    Disarmed,
    Armed,
}

/// Tracks armed/disarmed state and which alarm most recently fired.
///
/// Invariant: `last_triggered` is `Some` only while the state is Armed.
/// All transitions go through [`trigger`](Self::trigger) and
/// [`reset`](Self::reset), which maintain it.
#[derive(Debug)]
pub struct AlarmMachine {
    state: AlarmState,
    last_triggered: Option<String>,
}

impl Default for AlarmMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmMachine {
    pub fn new() -> Self {
        Self {
            state: AlarmState::Disarmed,
            last_triggered: None,
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == AlarmState::Armed
    }

    /// The alarm that most recently moved the state to Armed.
    pub fn last_triggered(&self) -> Option<&str> {
        self.last_triggered.as_deref()
    }

    /// Arm on behalf of the named alarm. A trigger while already armed
    /// re-points `last_triggered` at the most recent alarm.
    pub fn trigger(&mut self, alarm_name: &str) {
        self.state = AlarmState::Armed;
        self.last_triggered = Some(alarm_name.to_string());
    }

    /// Return to Disarmed and forget the last triggered alarm.
    pub fn reset(&mut self) {
        self.state = AlarmState::Disarmed;
        self.last_triggered = None;
    }
}
