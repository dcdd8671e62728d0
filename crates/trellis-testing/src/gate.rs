//! A gate that parks layout work so tests can interleave other calls with it.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// How long any side waits before giving up, so a broken test fails instead
/// of hanging.
const GATE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct GateState {
    entered: usize,
    open: bool,
}

/// Blocks layouts that reach it until [`LayoutGate::open`] is called.
#[derive(Debug, Default)]
pub struct LayoutGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl LayoutGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Called by the engine from inside a layout.
    pub(crate) fn pass(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entered += 1;
        self.changed.notify_all();
        let (_state, timeout) = self
            .changed
            .wait_timeout_while(state, GATE_TIMEOUT, |state| !state.open)
            .unwrap_or_else(PoisonError::into_inner);
        if timeout.timed_out() {
            log::warn!("layout gate was never opened, letting layout through");
        }
    }

    /// Waits until `count` layouts are parked at the gate.
    ///
    /// Returns false on timeout.
    pub fn wait_until_entered(&self, count: usize) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (_state, timeout) = self
            .changed
            .wait_timeout_while(state, GATE_TIMEOUT, |state| state.entered < count)
            .unwrap_or_else(PoisonError::into_inner);
        !timeout.timed_out()
    }

    /// Lets every parked and future layout through.
    pub fn open(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.open = true;
        self.changed.notify_all();
    }

    pub fn entered(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_gate_parks_until_opened() {
        let gate = LayoutGate::new();
        let worker_gate = Arc::clone(&gate);
        let worker = thread::spawn(move || worker_gate.pass());

        assert!(gate.wait_until_entered(1));
        assert_eq!(gate.entered(), 1);
        gate.open();
        worker.join().expect("worker finished");
    }

    #[test]
    fn test_open_gate_lets_layouts_through() {
        let gate = LayoutGate::new();
        gate.open();
        gate.pass();
        gate.pass();
        assert_eq!(gate.entered(), 2);
    }
}
