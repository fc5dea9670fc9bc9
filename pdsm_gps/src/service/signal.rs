use std::{
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

/// Lifecycle of the service threads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    #[default]
    Quit = 0,
    Init = 1,
    Started = 2,
}

#[derive(Debug, Default)]
struct Flags {
    state: SessionState,
    active: bool,
    started: bool,
    /// A position request is waiting for its DONE event.
    in_flight: bool,
}

/// Session flags shared by the control, polling and timer threads, with a
/// condition variable for every wait point.
#[derive(Debug, Default)]
pub struct SessionSignal {
    flags: Mutex<Flags>,
    cond: Condvar,
}

impl SessionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_started(&self) -> bool {
        self.lock().started
    }

    pub(crate) fn activate(&self) {
        let mut flags = self.lock();
        flags.active = true;
        flags.state = SessionState::Init;
    }

    /// Returns `false` when already started.
    pub(crate) fn start(&self) -> bool {
        let mut flags = self.lock();
        if flags.started || !flags.active {
            return false;
        }
        flags.started = true;
        flags.state = SessionState::Started;
        self.cond.notify_all();
        true
    }

    /// Returns `false` when not started.
    pub(crate) fn stop(&self) -> bool {
        let mut flags = self.lock();
        if !flags.started {
            return false;
        }
        flags.started = false;
        flags.in_flight = false;
        flags.state = SessionState::Init;
        self.cond.notify_all();
        true
    }

    pub(crate) fn quit(&self) {
        let mut flags = self.lock();
        flags.active = false;
        flags.started = false;
        flags.in_flight = false;
        flags.state = SessionState::Quit;
        self.cond.notify_all();
    }

    /// The engine finished the outstanding position request.
    pub fn position_ready(&self) {
        let mut flags = self.lock();
        flags.in_flight = false;
        self.cond.notify_all();
    }

    /// Blocks until a session starts; `false` once the service quits.
    pub(crate) fn wait_for_start(&self) -> bool {
        let flags = self.lock();
        let flags = self
            .cond
            .wait_while(flags, |f| f.active && !f.started)
            .unwrap_or_else(PoisonError::into_inner);
        flags.active
    }

    /// Marks a request in flight if the session is still running.
    pub(crate) fn begin_request(&self) -> bool {
        let mut flags = self.lock();
        if !(flags.active && flags.started) {
            return false;
        }
        flags.in_flight = true;
        true
    }

    /// Waits for the outstanding request to finish, the session to stop, or `timeout`.
    pub(crate) fn wait_position(&self, timeout: Duration) {
        let flags = self.lock();
        let (mut flags, result) = self
            .cond
            .wait_timeout_while(flags, timeout, |f| f.in_flight && f.started && f.active)
            .unwrap_or_else(PoisonError::into_inner);
        if result.timed_out() {
            flags.in_flight = false;
        }
    }

    /// Sleeps for `period` unless the session stops first. Returns whether it is still started.
    pub(crate) fn sleep_while_started(&self, period: Duration) -> bool {
        let flags = self.lock();
        let (flags, _) = self
            .cond
            .wait_timeout_while(flags, period, |f| f.started)
            .unwrap_or_else(PoisonError::into_inner);
        flags.started
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{sync::Arc, thread, time::Instant};

    #[test]
    fn start_requires_activation() {
        let signal = SessionSignal::new();
        assert!(!signal.start());
        signal.activate();
        assert!(signal.start());
        assert!(!signal.start());
        assert_eq!(signal.state(), SessionState::Started);
        assert!(signal.stop());
        assert_eq!(signal.state(), SessionState::Init);
    }

    #[test]
    fn ready_wakes_waiter() {
        let signal = Arc::new(SessionSignal::new());
        signal.activate();
        signal.start();
        assert!(signal.begin_request());

        let waker = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            waker.position_ready();
        });
        let begin = Instant::now();
        signal.wait_position(Duration::from_secs(10));
        assert!(begin.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn quit_releases_start_waiter() {
        let signal = Arc::new(SessionSignal::new());
        signal.activate();
        let waiter = Arc::clone(&signal);
        let handle = thread::spawn(move || waiter.wait_for_start());
        thread::sleep(Duration::from_millis(20));
        signal.quit();
        assert!(!handle.join().unwrap());
    }

    #[test]
    fn stop_interrupts_sleep() {
        let signal = Arc::new(SessionSignal::new());
        signal.activate();
        signal.start();
        let sleeper = Arc::clone(&signal);
        let handle = thread::spawn(move || sleeper.sleep_while_started(Duration::from_secs(30)));
        thread::sleep(Duration::from_millis(20));
        signal.stop();
        assert!(!handle.join().unwrap());
    }
}
