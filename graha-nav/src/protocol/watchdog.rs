//! Inbound silence watchdog.
//!
//! Tracks the time of the last inbound message. Once the link has been
//! quiet for longer than the threshold, [`Watchdog::poll`] reports it a
//! single time; it re-arms only when another message arrives.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Watchdog {
    threshold: Duration,
    last_message: Instant,
    alerted: bool,
    alerts: u64,
}

impl Watchdog {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_message: Instant::now(),
            alerted: false,
            alerts: 0,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Record an inbound message.
    pub fn touch(&mut self, now: Instant) {
        self.last_message = now;
        self.alerted = false;
    }

    pub fn last_message(&self) -> Instant {
        self.last_message
    }

    /// Returns the quiet time when an alert fires at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<Duration> {
        let quiet = now.saturating_duration_since(self.last_message);
        if self.alerted || quiet <= self.threshold {
            return None;
        }
        self.alerted = true;
        self.alerts += 1;
        Some(quiet)
    }

    /// Alerts raised so far.
    pub fn alerts(&self) -> u64 {
        self.alerts
    }
}
