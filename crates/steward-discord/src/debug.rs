//! Debug gate — process-wide maintenance mode.
//!
//! While active, the bot ignores messages and reactions from everyone
//! outside the authorized set, so a production instance can be poked at
//! live without responding to the whole guild. The toggle check runs
//! before the ignore check in the dispatcher, so the gate can always be
//! switched back off.

use std::sync::Mutex;

pub struct DebugGate {
    /// Full message text that flips the gate, e.g. `!debug`.
    trigger: String,
    /// Users who may toggle the gate and keep talking while it is active.
    authorized: Vec<u64>,
    active: Mutex<bool>,
}

impl DebugGate {
    pub fn new(prefix: char, authorized: Vec<u64>) -> Self {
        Self {
            trigger: format!("{prefix}debug"),
            authorized,
            active: Mutex::new(false),
        }
    }

    /// Whether this message is an authorized toggle request.
    pub fn is_toggle_trigger(&self, author_id: u64, content: &str) -> bool {
        content.trim() == self.trigger && self.authorized.contains(&author_id)
    }

    /// Flip the gate; returns the new state.
    pub fn toggle(&self) -> bool {
        let mut active = self.active.lock().unwrap();
        *active = !*active;
        *active
    }

    pub fn is_active(&self) -> bool {
        *self.active.lock().unwrap()
    }

    /// Whether a message from this author should be dropped.
    pub fn should_ignore(&self, author_id: u64) -> bool {
        self.is_active() && !self.authorized.contains(&author_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> DebugGate {
        DebugGate::new('!', vec![100])
    }

    #[test]
    fn trigger_requires_authorized_author() {
        let gate = gate();
        assert!(gate.is_toggle_trigger(100, "!debug"));
        assert!(!gate.is_toggle_trigger(200, "!debug"));
    }

    #[test]
    fn trigger_requires_exact_text() {
        let gate = gate();
        assert!(gate.is_toggle_trigger(100, "  !debug  "));
        assert!(!gate.is_toggle_trigger(100, "!debugging"));
        assert!(!gate.is_toggle_trigger(100, "debug"));
    }

    #[test]
    fn toggle_flips_state() {
        let gate = gate();
        assert!(!gate.is_active());
        assert!(gate.toggle());
        assert!(gate.is_active());
        assert!(!gate.toggle());
        assert!(!gate.is_active());
    }

    #[test]
    fn inactive_gate_ignores_no_one() {
        let gate = gate();
        assert!(!gate.should_ignore(200));
    }

    #[test]
    fn active_gate_filters_unauthorized_only() {
        let gate = gate();
        gate.toggle();
        assert!(gate.should_ignore(200));
        assert!(!gate.should_ignore(100));
    }
}
