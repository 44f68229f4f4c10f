// ABOUTME: Enquire_link keep-alive state machine
// ABOUTME: Reports when to ping and when the link should be declared dead

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Timing of the enquire_link keep-alive.
///
/// The SMSC is pinged once the link has been idle for `interval`. A ping
/// unanswered after `timeout` counts as a failure, and `max_failures`
/// consecutive failures tear the session down.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    pub interval: Duration,
    pub timeout: Duration,
    pub max_failures: u32,
    pub enabled: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            max_failures: 3,
            enabled: true,
        }
    }
}

impl KeepAliveConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures;
        self
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// What the listener should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveAction {
    Idle,
    Ping,
    /// Too many pings went unanswered
    LinkDead,
}

/// Counters for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeepAliveStatus {
    pub consecutive_failures: u32,
    pub total_pings: u64,
    pub total_pongs: u64,
}

/// Keep-alive state owned by the listener task
#[derive(Debug)]
pub struct KeepAliveManager {
    config: KeepAliveConfig,
    last_activity: Instant,
    // Sequence number and send time of the unanswered ping
    in_flight: Option<(u32, Instant)>,
    status: KeepAliveStatus,
}

impl KeepAliveManager {
    pub fn new(config: KeepAliveConfig, now: Instant) -> Self {
        Self {
            config,
            last_activity: now,
            in_flight: None,
            status: KeepAliveStatus::default(),
        }
    }

    /// Any inbound frame proves the link is alive
    pub fn on_activity(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn on_ping_sent(&mut self, sequence_number: u32, now: Instant) {
        self.in_flight = Some((sequence_number, now));
        self.status.total_pings += 1;
        debug!(sequence = sequence_number, "enquire_link sent");
    }

    /// Match an enquire_link_resp. Returns false if it answers no ping of ours.
    pub fn on_pong(&mut self, sequence_number: u32) -> bool {
        match self.in_flight {
            Some((expected, _)) if expected == sequence_number => {
                self.in_flight = None;
                self.status.total_pongs += 1;
                self.status.consecutive_failures = 0;
                true
            }
            _ => false,
        }
    }

    pub fn tick(&mut self, now: Instant) -> KeepAliveAction {
        if !self.config.enabled {
            return KeepAliveAction::Idle;
        }

        if let Some((sequence, sent_at)) = self.in_flight {
            if now.duration_since(sent_at) < self.config.timeout {
                return KeepAliveAction::Idle;
            }
            self.in_flight = None;
            self.status.consecutive_failures += 1;
            warn!(
                sequence,
                failures = self.status.consecutive_failures,
                "enquire_link unanswered"
            );
            if self.status.consecutive_failures >= self.config.max_failures {
                return KeepAliveAction::LinkDead;
            }
            return KeepAliveAction::Ping;
        }

        if now.duration_since(self.last_activity) >= self.config.interval {
            KeepAliveAction::Ping
        } else {
            KeepAliveAction::Idle
        }
    }

    pub fn status(&self) -> KeepAliveStatus {
        self.status
    }
}
